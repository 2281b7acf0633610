use std::time::{Duration, Instant};

use spider_client::shapes::request::{
    IdleNetwork, RequestType, ReturnFormat, ReturnFormatHandling, Timeout, WaitFor,
};
use spider_client::{RequestParams, Spider};
use thiserror::Error;
use tracing::debug;

const DETAIL_URL: &str = "https://www.swaminarayankirtan.org/Kirtan_Display.aspx?Kid=";
const HTTP_TIMEOUT: Duration = Duration::from_secs(60);
/// Upper bound on waiting for the page's network traffic to go quiet.
const NETWORK_IDLE_SECS: u64 = 30;

pub fn detail_url(kid: &str) -> String {
    format!("{}{}", DETAIL_URL, kid)
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to open session: {0}")]
    Session(String),
    #[error("request failed: {0}")]
    Request(String),
    #[error("server returned status {0}")]
    Status(i64),
    #[error("no content in response")]
    Empty,
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => FetchError::Status(status.as_u16() as i64),
            None => FetchError::Request(e.to_string()),
        }
    }
}

/// Source of rendering sessions. One session is opened per detail page.
#[allow(async_fn_in_trait)]
pub trait Renderer {
    type Session: RenderSession;

    async fn open(&self) -> Result<Self::Session, FetchError>;
}

/// A live page context. Callers must `close` it on every path.
#[allow(async_fn_in_trait)]
pub trait RenderSession {
    /// Navigate to `url` and return the settled DOM as HTML.
    async fn load(&mut self, url: &str) -> Result<String, FetchError>;

    async fn close(self);
}

// ── spider.cloud (headless Chrome) ──

pub struct SpiderRenderer {
    api_key: String,
}

impl SpiderRenderer {
    pub fn new(api_key: String) -> Self {
        Self { api_key }
    }

    pub fn from_env() -> anyhow::Result<Self> {
        let api_key = std::env::var("SPIDER_API_KEY")
            .map_err(|_| anyhow::anyhow!("SPIDER_API_KEY environment variable must be set"))?;
        Ok(Self::new(api_key))
    }
}

pub struct SpiderSession {
    spider: Spider,
    opened: Instant,
}

impl Renderer for SpiderRenderer {
    type Session = SpiderSession;

    async fn open(&self) -> Result<SpiderSession, FetchError> {
        let spider = Spider::new(Some(self.api_key.clone()))
            .map_err(|e| FetchError::Session(e.to_string()))?;
        Ok(SpiderSession {
            spider,
            opened: Instant::now(),
        })
    }
}

impl RenderSession for SpiderSession {
    async fn load(&mut self, url: &str) -> Result<String, FetchError> {
        let response = self
            .spider
            .scrape_url(url, Some(detail_params()), "application/json")
            .await
            .map_err(|e| FetchError::Request(e.to_string()))?;

        content_from_response(response)
    }

    async fn close(self) {
        debug!("Spider session closed after {:.1}s", self.opened.elapsed().as_secs_f64());
    }
}

/// Chrome rendering, returned once no more than two connections stay open.
fn detail_params() -> RequestParams {
    RequestParams {
        request: Some(RequestType::Chrome),
        return_format: Some(ReturnFormatHandling::Single(ReturnFormat::Raw)),
        wait_for: Some(WaitFor {
            almost_idle_network0: Some(IdleNetwork {
                timeout: Timeout {
                    secs: NETWORK_IDLE_SECS,
                    nanos: 0,
                },
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Pull the page HTML out of a spider.cloud scrape response.
fn content_from_response(response: serde_json::Value) -> Result<String, FetchError> {
    let parsed: serde_json::Value = match response.as_str() {
        Some(s) => serde_json::from_str(s).unwrap_or(response.clone()),
        None => response,
    };
    let first = parsed.as_array().and_then(|arr| arr.first());

    if let Some(status) = first.and_then(|obj| obj.get("status")).and_then(|s| s.as_i64()) {
        if !(200..300).contains(&status) {
            return Err(FetchError::Status(status));
        }
    }

    first
        .and_then(|obj| obj.get("content"))
        .and_then(|c| c.as_str())
        .filter(|c| !c.trim().is_empty())
        .map(str::to_string)
        .ok_or(FetchError::Empty)
}

// ── Plain HTTP (no client-side rendering) ──

/// Fetches the server-rendered HTML only. Page scripts never run and there is
/// no network-idle wait, so content filled in client-side is missing. Use the
/// spider engine for the live site.
pub struct HttpRenderer {
    timeout: Duration,
}

impl HttpRenderer {
    pub fn new() -> Self {
        Self {
            timeout: HTTP_TIMEOUT,
        }
    }
}

impl Default for HttpRenderer {
    fn default() -> Self {
        Self::new()
    }
}

pub struct HttpSession {
    client: reqwest::Client,
}

impl Renderer for HttpRenderer {
    type Session = HttpSession;

    async fn open(&self) -> Result<HttpSession, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| FetchError::Session(e.to_string()))?;
        Ok(HttpSession { client })
    }
}

impl RenderSession for HttpSession {
    async fn load(&mut self, url: &str) -> Result<String, FetchError> {
        let body = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        if body.trim().is_empty() {
            return Err(FetchError::Empty);
        }
        Ok(body)
    }

    async fn close(self) {
        debug!("HTTP session closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_template() {
        assert_eq!(
            detail_url("501"),
            "https://www.swaminarayankirtan.org/Kirtan_Display.aspx?Kid=501"
        );
    }

    #[test]
    fn detail_params_wait_for_network_idle() {
        let params = detail_params();
        assert!(matches!(params.request, Some(RequestType::Chrome)));
        let idle = params
            .wait_for
            .as_ref()
            .and_then(|w| w.almost_idle_network0.as_ref())
            .expect("network idle wait set");
        assert_eq!(idle.timeout.secs, NETWORK_IDLE_SECS);
    }

    #[test]
    fn spider_content_extracted() {
        let value = serde_json::json!([{ "content": "<html>ok</html>", "status": 200 }]);
        assert_eq!(content_from_response(value).unwrap(), "<html>ok</html>");
    }

    #[test]
    fn spider_string_payload_is_decoded() {
        let value = serde_json::Value::String(r#"[{"content":"<p>x</p>"}]"#.to_string());
        assert_eq!(content_from_response(value).unwrap(), "<p>x</p>");
    }

    #[test]
    fn spider_error_status() {
        let value = serde_json::json!([{ "content": "", "status": 504 }]);
        assert!(matches!(content_from_response(value), Err(FetchError::Status(504))));
    }

    #[test]
    fn spider_empty_content() {
        let value = serde_json::json!([{ "content": "   ", "status": 200 }]);
        assert!(matches!(content_from_response(value), Err(FetchError::Empty)));
        assert!(matches!(
            content_from_response(serde_json::json!({})),
            Err(FetchError::Empty)
        ));
    }

    #[test]
    fn error_messages() {
        assert_eq!(FetchError::Status(503).to_string(), "server returned status 503");
        assert_eq!(FetchError::Empty.to_string(), "no content in response");
    }
}
