// # HTTP Transport
//
// One GET per lookup, bounded by the configured timeout.
//
// Status codes other than 200 become `Error::Provider` with a message
// chosen by the adapter (`StatusMessages`). Network failures become
// `Error::Transport`; timeouts are reported separately from other
// connectivity problems. No retries happen here.

use geolocate_core::{Error, Result};
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;

const USER_AGENT: &str = concat!("geolocate/", env!("CARGO_PKG_VERSION"));

/// Maps a non-200 status to a backend-specific message
pub(crate) type StatusMessages = fn(StatusCode) -> String;

/// How the credential travels with the request
pub(crate) enum Auth<'a> {
    None,
    Bearer(&'a str),
}

/// Shared HTTP plumbing for the remote adapters
#[derive(Clone)]
pub(crate) struct HttpTransport {
    provider: String,
    label: &'static str,
    client: reqwest::Client,
    messages: StatusMessages,
}

impl HttpTransport {
    /// Build a client with the lookup timeout
    ///
    /// `label` is the human name of the API used in error text
    /// (e.g. "IpInfo").
    pub(crate) fn new(
        provider: &str,
        label: &'static str,
        timeout: Duration,
        messages: StatusMessages,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            provider: provider.to_string(),
            label,
            client,
            messages,
        })
    }

    /// GET `url` with `query` and decode the JSON body
    pub(crate) async fn get_json(
        &self,
        url: &str,
        query: &[(&str, String)],
        auth: Auth<'_>,
    ) -> Result<Value> {
        let mut request = self
            .client
            .get(url)
            .header("Accept", "application/json");
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Auth::Bearer(token) = auth {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if status != StatusCode::OK {
            tracing::debug!(provider = %self.provider, status = status.as_u16(), "Backend rejected lookup");
            return Err(Error::provider(&self.provider, (self.messages)(status)));
        }

        let body = response.text().await.map_err(|e| self.transport_error(e))?;
        serde_json::from_str(&body).map_err(|_| {
            Error::provider(
                &self.provider,
                format!("Invalid JSON response from {} API", self.label),
            )
        })
    }

    fn transport_error(&self, e: reqwest::Error) -> Error {
        let message = if e.is_timeout() {
            "Connection timeout - please try again".to_string()
        } else if e.is_connect() {
            format!("Network error: {}", e)
        } else {
            format!("{} API request failed: {}", self.label, e)
        };
        Error::transport(&self.provider, message)
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("provider", &self.provider)
            .field("label", &self.label)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn messages(status: StatusCode) -> String {
        match status.as_u16() {
            429 => "Rate limit exceeded - too many requests".to_string(),
            code => format!("API returned HTTP error: {}", code),
        }
    }

    fn transport(timeout: Duration) -> HttpTransport {
        HttpTransport::new("test", "Test", timeout, messages).unwrap()
    }

    #[tokio::test]
    async fn test_get_json_sends_query_and_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/lookup"))
            .and(query_param("key", "abc"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ip": "1.1.1.1"})))
            .expect(1)
            .mount(&server)
            .await;

        let body = transport(Duration::from_secs(5))
            .get_json(
                &format!("{}/lookup", server.uri()),
                &[("key", "abc".to_string())],
                Auth::Bearer("tok"),
            )
            .await
            .unwrap();

        assert_eq!(body["ip"], "1.1.1.1");
    }

    #[tokio::test]
    async fn test_status_uses_adapter_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let err = transport(Duration::from_secs(5))
            .get_json(&server.uri(), &[], Auth::None)
            .await
            .unwrap_err();

        match err {
            Error::Provider { provider, message } => {
                assert_eq!(provider, "test");
                assert!(message.contains("Rate limit"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_json_is_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = transport(Duration::from_secs(5))
            .get_json(&server.uri(), &[], Auth::None)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("Invalid JSON response from Test API"));
    }

    #[tokio::test]
    async fn test_timeout_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let err = transport(Duration::from_millis(50))
            .get_json(&server.uri(), &[], Auth::None)
            .await
            .unwrap_err();

        match err {
            Error::Transport { message, .. } => assert!(message.contains("timeout")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        // Bind then drop to get a port nobody listens on
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();

        let err = transport(Duration::from_secs(2))
            .get_json(&format!("http://127.0.0.1:{}/", port), &[], Auth::None)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Transport { .. }));
    }
}
