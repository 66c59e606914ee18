use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::foundation::error::{CityPaperError, CityPaperResult};

/// Boxed, sendable future used at object-safe async seams.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Source of raw tile bytes for a fully expanded tile URL.
///
/// Implemented by [`HttpClient`] for real tiles; tests provide in-memory sources.
pub trait TileSource: Send + Sync {
    /// Fetch the encoded image behind `url`.
    fn fetch(&self, url: &str) -> BoxFuture<'static, CityPaperResult<Vec<u8>>>;
}

/// Async HTTP client shared by tile loading and reverse geocoding.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone, Debug)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    /// User agent sent when none is configured.
    pub const DEFAULT_USER_AGENT: &'static str =
        concat!("citypaper/", env!("CARGO_PKG_VERSION"));

    /// Build a client with a per-request timeout and user agent.
    pub fn new(timeout: Duration, user_agent: &str) -> CityPaperResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_nodelay(true)
            .build()
            .map_err(|e| CityPaperError::http(format!("failed to create http client: {e}")))?;
        Ok(Self { client })
    }

    /// GET `url` and return the body, failing on transport errors and non-2xx status.
    pub async fn get_bytes(&self, url: &str) -> CityPaperResult<Vec<u8>> {
        trace!(url, "http get");

        let response = match self.client.get(url).send().await {
            Ok(resp) => {
                debug!(url, status = resp.status().as_u16(), "http response");
                resp
            }
            Err(e) => {
                warn!(
                    url,
                    error = %e,
                    is_connect = e.is_connect(),
                    is_timeout = e.is_timeout(),
                    "http request failed"
                );
                return Err(CityPaperError::http(format!("request failed: {e}")));
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(url, status = status.as_u16(), "http error status");
            return Err(CityPaperError::http(format!("HTTP {status} from {url}")));
        }

        match response.bytes().await {
            Ok(bytes) => Ok(bytes.to_vec()),
            Err(e) => {
                warn!(url, error = %e, "failed to read response body");
                Err(CityPaperError::http(format!("failed to read response: {e}")))
            }
        }
    }
}

impl TileSource for HttpClient {
    fn fetch(&self, url: &str) -> BoxFuture<'static, CityPaperResult<Vec<u8>>> {
        let this = self.clone();
        let url = url.to_owned();
        Box::pin(async move { this.get_bytes(&url).await })
    }
}
