/// Expand `${ENV_VAR}` placeholders in a raw config file before parsing.
///
/// Unset variables and unterminated placeholders are kept verbatim so the
/// parser reports them in context.
pub fn substitute_env(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' || chars.peek() != Some(&'{') {
            out.push(ch);
            continue;
        }
        chars.next();

        let mut name = String::new();
        let mut closed = false;
        for c in chars.by_ref() {
            if c == '}' {
                closed = true;
                break;
            }
            name.push(c);
        }

        match std::env::var(&name) {
            Ok(val) if closed && !name.is_empty() => out.push_str(&val),
            _ => {
                out.push_str("${");
                out.push_str(&name);
                if closed {
                    out.push('}');
                }
            },
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_known_var() {
        // PATH is set in every environment the tests run in.
        let Ok(path) = std::env::var("PATH") else {
            return;
        };
        assert_eq!(substitute_env("p = \"${PATH}\""), format!("p = \"{path}\""));
    }

    #[test]
    fn leaves_unknown_var() {
        assert_eq!(
            substitute_env("${QTRADE_NONEXISTENT_XYZ}"),
            "${QTRADE_NONEXISTENT_XYZ}"
        );
    }

    #[test]
    fn unterminated_placeholder_is_literal() {
        assert_eq!(substitute_env("a ${OPEN"), "a ${OPEN");
    }

    #[test]
    fn no_placeholders() {
        assert_eq!(substitute_env("plain $text"), "plain $text");
    }
}
