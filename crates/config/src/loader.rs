use std::path::{Path, PathBuf};

use {
    anyhow::Context,
    tracing::{debug, warn},
};

use crate::{env_subst::substitute_env, schema::QtradeConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &["qtrade.toml", "qtrade.yaml", "qtrade.yml", "qtrade.json"];

/// File name of the credential record inside the config directory.
const CREDENTIALS_FILENAME: &str = "credentials.json";

/// Load config from the given path (any supported format), then apply
/// `QTRADE_*` environment overrides.
pub fn load_config(path: &Path) -> anyhow::Result<QtradeConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let raw = substitute_env(&raw);
    let mut config = parse_config(&raw, path)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    apply_overrides(&mut config, |key| std::env::var(key).ok())?;
    Ok(config)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./qtrade.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/qtrade/qtrade.{toml,yaml,yml,json}` (user-global)
///
/// Falls back to defaults (plus env overrides) when nothing is found or the
/// file fails to load.
pub fn discover_and_load() -> QtradeConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }

    let mut config = QtradeConfig::default();
    if let Err(e) = apply_overrides(&mut config, |key| std::env::var(key).ok()) {
        warn!(error = %e, "ignoring invalid environment override");
    }
    config
}

fn find_config_file() -> Option<PathBuf> {
    let local = CONFIG_FILENAMES.iter().map(PathBuf::from);
    let global = config_dir()
        .into_iter()
        .flat_map(|dir| CONFIG_FILENAMES.iter().map(move |name| dir.join(name)));
    local.chain(global).find(|p| p.exists())
}

/// Returns `~/.config/qtrade/` on all platforms.
pub fn config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.home_dir().join(".config").join("qtrade"))
}

/// Path of the credential record: the configured one, or
/// `~/.config/qtrade/credentials.json`.
pub fn credentials_path(config: &QtradeConfig) -> PathBuf {
    if let Some(path) = &config.store.path {
        return path.clone();
    }
    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CREDENTIALS_FILENAME)
}

/// Override individual fields from `QTRADE_*` variables.
fn apply_overrides(
    config: &mut QtradeConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<()> {
    if let Some(v) = lookup("QTRADE_AUTH_HOST") {
        config.auth.auth_host = v;
    }
    if let Some(v) = lookup("QTRADE_STORE_PATH") {
        config.store.path = Some(PathBuf::from(v));
    }
    if let Some(v) = lookup("QTRADE_HTTP_TIMEOUT_SECS") {
        config.http.timeout_secs = v
            .parse()
            .with_context(|| format!("QTRADE_HTTP_TIMEOUT_SECS is not a number: {v}"))?;
    }
    Ok(())
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<QtradeConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}
