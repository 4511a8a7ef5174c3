//! Authenticated dispatch of resource API requests.

use std::fmt;

use {
    reqwest::StatusCode,
    secrecy::ExposeSecret,
    serde_json::Value,
    tracing::{debug, warn},
};

use crate::{
    error::{Error, Result},
    manager::CredentialManager,
};

/// Methods the resource API accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Delete,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Delete => "DELETE",
        })
    }
}

impl std::str::FromStr for HttpMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "DELETE" => Ok(Self::Delete),
            other => Err(Error::InvalidParams(format!("unsupported method {other}"))),
        }
    }
}

impl CredentialManager {
    /// Send `method endpoint` to the current API server with a bearer token.
    ///
    /// `params` go in the query string for GET and DELETE and form the JSON
    /// body for POST. The response body is returned as parsed JSON (`null`
    /// when empty). A 401 is reported as [`Error::AuthRejected`] and is not
    /// retried.
    pub async fn invoke(
        &self,
        method: HttpMethod,
        endpoint: &str,
        params: Option<&Value>,
    ) -> Result<Value> {
        let access = self.get_access_data().await?;
        let url = join_url(&access.api_server, endpoint);

        let request = match method {
            HttpMethod::Get => self.http.get(&url).query(&query_pairs(params)?),
            HttpMethod::Delete => self.http.delete(&url).query(&query_pairs(params)?),
            HttpMethod::Post => match params {
                Some(body) => self.http.post(&url).json(body),
                None => self.http.post(&url),
            },
        };

        debug!(%method, endpoint, "dispatching API request");
        let resp = request
            .bearer_auth(access.access_token.expose_secret())
            .send()
            .await?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            warn!(endpoint, api_server = %access.api_server, "API server rejected access token");
            return Err(Error::AuthRejected {
                endpoint: endpoint.to_string(),
            });
        }

        let body = resp.text().await?;
        if !status.is_success() {
            return Err(Error::Api {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|source| Error::Decode {
            endpoint: endpoint.to_string(),
            source,
        })
    }
}

fn join_url(api_server: &str, endpoint: &str) -> String {
    format!(
        "{}/{}",
        api_server.trim_end_matches('/'),
        endpoint.trim_start_matches('/')
    )
}

/// Flatten a JSON object into query pairs. Arrays become comma-separated
/// lists and `null` members are dropped.
fn query_pairs(params: Option<&Value>) -> Result<Vec<(String, String)>> {
    let Some(params) = params else {
        return Ok(Vec::new());
    };
    let Value::Object(map) = params else {
        return Err(Error::InvalidParams(
            "query parameters must be a JSON object".into(),
        ));
    };

    let mut pairs = Vec::with_capacity(map.len());
    for (key, value) in map {
        let rendered = match value {
            Value::Null => continue,
            Value::Array(items) => items
                .iter()
                .map(|v| scalar(key, v))
                .collect::<Result<Vec<_>>>()?
                .join(","),
            other => scalar(key, other)?,
        };
        pairs.push((key.clone(), rendered));
    }
    Ok(pairs)
}

fn scalar(key: &str, value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(Error::InvalidParams(format!(
            "query parameter {key} must be a scalar or a list of scalars"
        ))),
    }
}
