//! Refresh-token redemption against the authorization server.

use std::time::Duration;

use {
    secrecy::{ExposeSecret, Secret},
    tracing::{debug, warn},
};

use crate::{error::RenewalError, types::TokenResponse};

/// The authorization server's token endpoint.
#[derive(Debug, Clone)]
pub struct TokenEndpoint {
    client: reqwest::Client,
    url: String,
    max_attempts: u32,
    initial_backoff: Duration,
}

impl TokenEndpoint {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            max_attempts: 1,
            initial_backoff: Duration::from_millis(500),
        }
    }

    /// Retry redemptions that never reached the server, up to `max_attempts`
    /// in total, doubling `initial_backoff` between attempts.
    pub fn with_retry(mut self, max_attempts: u32, initial_backoff: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.initial_backoff = initial_backoff;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub(crate) fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Exchange `refresh_token` for a new credential set. The token is spent
    /// as soon as the server accepts the request, so only connection failures
    /// are retried.
    pub async fn redeem(
        &self,
        refresh_token: &Secret<String>,
    ) -> Result<TokenResponse, RenewalError> {
        let mut backoff = self.initial_backoff;
        let mut attempt = 1;
        loop {
            match self.post(refresh_token).await {
                Err(RenewalError::Transport(e))
                    if e.is_connect() && attempt < self.max_attempts =>
                {
                    warn!(attempt, error = %e, "token endpoint unreachable, retrying");
                    tokio::time::sleep(backoff).await;
                    backoff = backoff.saturating_mul(2);
                    attempt += 1;
                },
                other => return other,
            }
        }
    }

    async fn post(&self, refresh_token: &Secret<String>) -> Result<TokenResponse, RenewalError> {
        debug!(url = %self.url, "redeeming refresh token");
        let resp = self
            .client
            .post(&self.url)
            .query(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.expose_secret().as_str()),
            ])
            .send()
            .await
            .map_err(RenewalError::Transport)?;

        let status = resp.status();
        let body = resp.text().await.map_err(RenewalError::Transport)?;
        if !status.is_success() {
            return Err(RenewalError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        serde_json::from_str(&body).map_err(RenewalError::MalformedBody)
    }
}

#[cfg(test)]
mod tests {
    use {mockito::Matcher, std::net::TcpListener};

    use super::*;

    #[tokio::test]
    async fn posts_grant_type_and_token_as_query() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/oauth2/token")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
                Matcher::UrlEncoded("refresh_token".into(), "old+token/=".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"access_token":"A","refresh_token":"R","api_server":"https://api01.iq.questrade.com/","expires_in":1800,"token_type":"Bearer"}"#,
            )
            .expect(1)
            .create_async()
            .await;

        let endpoint = TokenEndpoint::new(
            reqwest::Client::new(),
            format!("{}/oauth2/token", server.url()),
        );
        let resp = endpoint
            .redeem(&Secret::new("old+token/=".into()))
            .await
            .unwrap();

        assert_eq!(resp.access_token.expose_secret(), "A");
        assert_eq!(resp.refresh_token.expose_secret(), "R");
        assert_eq!(resp.expires_in, 1800);
        assert_eq!(resp.token_type, "Bearer");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn rejection_is_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/oauth2/token")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body("Bad Request")
            .expect(1)
            .create_async()
            .await;

        let endpoint = TokenEndpoint::new(
            reqwest::Client::new(),
            format!("{}/oauth2/token", server.url()),
        )
        .with_retry(3, Duration::from_millis(1));
        let err = endpoint.redeem(&Secret::new("t".into())).await.unwrap_err();

        match err {
            RenewalError::Rejected { status, body } => {
                assert_eq!(status, 400);
                assert_eq!(body, "Bad Request");
            },
            other => panic!("expected Rejected, got {other:?}"),
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn malformed_body_is_reported() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/oauth2/token")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"access_token":"A"}"#)
            .create_async()
            .await;

        let endpoint = TokenEndpoint::new(
            reqwest::Client::new(),
            format!("{}/oauth2/token", server.url()),
        );
        let err = endpoint.redeem(&Secret::new("t".into())).await.unwrap_err();
        assert!(matches!(err, RenewalError::MalformedBody(_)));
    }

    #[tokio::test]
    async fn unreachable_server_gives_up_after_max_attempts() {
        // Bind then drop to get a port nobody listens on.
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let endpoint = TokenEndpoint::new(
            reqwest::Client::new(),
            format!("http://127.0.0.1:{port}/oauth2/token"),
        )
        .with_retry(2, Duration::from_millis(1));

        let err = endpoint.redeem(&Secret::new("t".into())).await.unwrap_err();
        match err {
            RenewalError::Transport(e) => assert!(e.is_connect()),
            other => panic!("expected Transport, got {other:?}"),
        }
    }
}
