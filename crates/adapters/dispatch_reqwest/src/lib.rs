//! # smarthome-adapter-dispatch-reqwest
//!
//! Calls device actions over plain HTTP.
//!
//! A device action is a `GET` on `http://<controller address>` joined with
//! the action path. Every failure (bad URL, connection error, timeout,
//! status 400 and above) is folded into a [`DispatchOutcome`] with
//! `ok = false`, so the engine never sees a transport error.
//!
//! ## Dependency rule
//! Depends on `smarthome-app` (for the `Dispatcher` port) and
//! `smarthome-domain`. Nothing depends on this adapter except the binary.

use std::time::Duration;

use reqwest::Client;
use url::{ParseError, Url};

use smarthome_app::ports::Dispatcher;
use smarthome_domain::dispatch::DispatchOutcome;

/// Configuration for [`HttpDispatcher`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Upper bound for a whole device call, body included.
    pub timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
        }
    }
}

/// Errors raised while building the dispatcher.
#[derive(Debug, thiserror::Error)]
pub enum DispatcherError {
    #[error("failed to build HTTP client")]
    Client(#[from] reqwest::Error),
}

/// Why a device URL could not be built.
#[derive(Debug, thiserror::Error)]
#[error("invalid device url {address:?} + {path:?}")]
pub struct InvalidUrl {
    address: String,
    path: String,
    #[source]
    source: ParseError,
}

/// [`Dispatcher`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpDispatcher {
    client: Client,
}

impl HttpDispatcher {
    /// # Errors
    ///
    /// Returns [`DispatcherError::Client`] when the TLS backend or the
    /// system resolver cannot be initialized.
    pub fn new(config: &Config) -> Result<Self, DispatcherError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client })
    }

    async fn call(&self, url: &Url) -> DispatchOutcome {
        let response = match self.client.get(url.clone()).send().await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(%url, error = %err, "device call failed");
                return DispatchOutcome::failed("");
            }
        };
        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(err) => {
                tracing::warn!(%url, %status, error = %err, "failed to read device response");
                return DispatchOutcome::failed("");
            }
        };
        if status.is_client_error() || status.is_server_error() {
            tracing::warn!(%url, %status, "device answered with an error status");
            return DispatchOutcome::failed(body);
        }
        tracing::debug!(%url, %status, "device call succeeded");
        DispatchOutcome::succeeded(body)
    }
}

impl Dispatcher for HttpDispatcher {
    async fn invoke(&self, address: &str, path: &str) -> DispatchOutcome {
        match device_url(address, path) {
            Ok(url) => self.call(&url).await,
            Err(err) => {
                tracing::warn!(error = %err, "device call skipped");
                DispatchOutcome::failed("")
            }
        }
    }
}

/// Resolve `path` against `http://<address>`, or against `address` itself
/// when it already carries a scheme.
///
/// # Errors
///
/// Returns [`InvalidUrl`] when the result is not a valid URL.
pub fn device_url(address: &str, path: &str) -> Result<Url, InvalidUrl> {
    let invalid = |source| InvalidUrl {
        address: address.to_owned(),
        path: path.to_owned(),
        source,
    };
    let base = if address.contains("://") {
        address.to_owned()
    } else {
        format!("http://{address}")
    };
    Url::parse(&base)
        .and_then(|base| base.join(path))
        .map_err(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn dispatcher(timeout: Duration) -> HttpDispatcher {
        HttpDispatcher::new(&Config { timeout }).unwrap()
    }

    fn address(server: &MockServer) -> String {
        server.address().to_string()
    }

    #[test]
    fn should_prefix_http_when_address_has_no_scheme() {
        let url = device_url("10.0.0.3", "/relay/on").unwrap();
        assert_eq!(url.as_str(), "http://10.0.0.3/relay/on");
    }

    #[test]
    fn should_keep_scheme_and_port_of_address() {
        let url = device_url("https://garden.local:8443", "/valve").unwrap();
        assert_eq!(url.as_str(), "https://garden.local:8443/valve");
    }

    #[test]
    fn should_reject_unparsable_address() {
        assert!(device_url("http://", "/valve").is_err());
    }

    #[tokio::test]
    async fn should_return_body_when_device_answers_ok() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/moisture"))
            .respond_with(ResponseTemplate::new(200).set_body_string("41.5"))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = dispatcher(Duration::from_secs(5))
            .invoke(&address(&server), "/moisture")
            .await;

        assert_eq!(outcome, DispatchOutcome::succeeded("41.5"));
    }

    #[tokio::test]
    async fn should_fail_with_body_when_device_answers_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/relay/on"))
            .respond_with(ResponseTemplate::new(500).set_body_string("relay stuck"))
            .mount(&server)
            .await;

        let outcome = dispatcher(Duration::from_secs(5))
            .invoke(&address(&server), "/relay/on")
            .await;

        assert_eq!(outcome, DispatchOutcome::failed("relay stuck"));
    }

    #[tokio::test]
    async fn should_fail_when_device_is_too_slow() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("true")
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let outcome = dispatcher(Duration::from_millis(100))
            .invoke(&address(&server), "/door")
            .await;

        assert_eq!(outcome, DispatchOutcome::failed(""));
    }

    #[tokio::test]
    async fn should_fail_when_device_is_unreachable() {
        let server = MockServer::start().await;
        let gone = address(&server);
        drop(server);

        let outcome = dispatcher(Duration::from_secs(1)).invoke(&gone, "/door").await;

        assert!(!outcome.ok);
    }

    #[tokio::test]
    async fn should_read_sensor_through_default_port_method() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/temp"))
            .respond_with(ResponseTemplate::new(200).set_body_string(" 19.25\n"))
            .mount(&server)
            .await;

        let reading = dispatcher(Duration::from_secs(5))
            .read_sensor(&address(&server), "/temp")
            .await
            .unwrap();

        assert!((reading - 19.25).abs() < f64::EPSILON);
    }
}
