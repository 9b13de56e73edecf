//! Browser-session acquisition with a bounded retry budget.
//!
//! A session is acquired for exactly one lookup and released before the
//! result is returned. Acquisition is the only retried operation in the whole
//! system; every page interaction after it is single-attempt.

use async_trait::async_trait;
use fantoccini::{Client, ClientBuilder};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use phonescout_shared::LookupConfig;

use crate::error::LookupError;
use crate::page::{PageDriver, WebDriverPage};

/// User agent presented to the target page. The page serves a degraded
/// document to sessions that announce themselves as automation, so this
/// matches a stock desktop Chrome build.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Scoped acquisition and release of one browser session per lookup.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    type Page: PageDriver;

    /// Acquire a fresh session. Bounded retries happen here and nowhere else.
    async fn acquire(&self, cancel: &CancellationToken) -> Result<Self::Page, LookupError>;

    /// Release a session. Failures are logged, never surfaced.
    async fn release(&self, page: Self::Page);
}

// ---------------------------------------------------------------------------
// WebDriverSessions
// ---------------------------------------------------------------------------

/// Session provider backed by a WebDriver endpoint (chromedriver).
pub struct WebDriverSessions {
    config: LookupConfig,
}

impl WebDriverSessions {
    pub fn new(config: LookupConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SessionProvider for WebDriverSessions {
    type Page = WebDriverPage;

    async fn acquire(&self, cancel: &CancellationToken) -> Result<WebDriverPage, LookupError> {
        let client = acquire_client(&self.config, cancel).await?;
        Ok(WebDriverPage::new(client))
    }

    async fn release(&self, page: WebDriverPage) {
        page.close().await;
    }
}

/// Probe the WebDriver endpoint's `/status` route.
pub async fn is_webdriver_ready(url: &str) -> bool {
    let status_url = format!("{}/status", url.trim_end_matches('/'));
    let response = match reqwest::get(&status_url).await {
        Ok(response) if response.status().is_success() => response,
        _ => return false,
    };
    if let Ok(body) = response.json::<serde_json::Value>().await {
        if let Some(version) = body.pointer("/value/build/version").and_then(|v| v.as_str()) {
            debug!(version, "WebDriver endpoint ready");
        }
    }
    true
}

/// Establish a WebDriver session, retrying up to the configured attempt
/// budget with a fixed backoff between attempts.
async fn acquire_client(
    config: &LookupConfig,
    cancel: &CancellationToken,
) -> Result<Client, LookupError> {
    let attempts = config.session_attempts.max(1);
    let mut last_failure = String::new();

    for attempt in 1..=attempts {
        if cancel.is_cancelled() {
            return Err(LookupError::Cancelled);
        }

        if !is_webdriver_ready(&config.webdriver_url).await {
            last_failure = format!(
                "no WebDriver endpoint responding at {}",
                config.webdriver_url
            );
            warn!(attempt, attempts, url = %config.webdriver_url, "WebDriver endpoint not ready");
        } else {
            let mut builder = ClientBuilder::rustls();
            builder.capabilities(chrome_capabilities(config));
            match builder.connect(&config.webdriver_url).await {
                Ok(client) => {
                    debug!(attempt, "browser session established");
                    return Ok(client);
                }
                Err(e) => {
                    last_failure = e.to_string();
                    warn!(attempt, attempts, error = %e, "browser session creation failed");
                }
            }
        }

        if attempt < attempts {
            tokio::select! {
                _ = cancel.cancelled() => return Err(LookupError::Cancelled),
                _ = tokio::time::sleep(config.session_backoff) => {}
            }
        }
    }

    Err(LookupError::Session {
        attempts,
        message: last_failure,
    })
}

fn chrome_capabilities(config: &LookupConfig) -> serde_json::map::Map<String, serde_json::Value> {
    let mut args = vec![
        "--no-sandbox".to_string(),
        "--disable-dev-shm-usage".to_string(),
        "--disable-gpu".to_string(),
        format!("--window-size={}", config.window_size),
        "--disable-extensions".to_string(),
        "--disable-setuid-sandbox".to_string(),
        "--disable-infobars".to_string(),
        "--disable-notifications".to_string(),
        "--ignore-certificate-errors".to_string(),
        format!("--user-agent={BROWSER_USER_AGENT}"),
    ];
    if config.headless {
        args.push("--headless=new".to_string());
    }

    let mut caps = serde_json::map::Map::new();
    caps.insert("browserName".to_string(), serde_json::json!("chrome"));
    caps.insert(
        "goog:chromeOptions".to_string(),
        serde_json::json!({ "args": args }),
    );
    caps
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use phonescout_shared::AppConfig;

    fn test_config(url: &str) -> LookupConfig {
        let mut config = LookupConfig::from(&AppConfig::default());
        config.webdriver_url = url.to_string();
        config.session_attempts = 3;
        config.session_backoff = Duration::from_millis(10);
        config
    }

    #[tokio::test]
    async fn readiness_probe_accepts_healthy_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "value": {
                    "ready": true,
                    "message": "ChromeDriver ready for new sessions.",
                    "build": { "version": "120.0.6099.109" }
                }
            })))
            .mount(&server)
            .await;

        assert!(is_webdriver_ready(&server.uri()).await);
    }

    #[tokio::test]
    async fn readiness_probe_rejects_unreachable_endpoint() {
        assert!(!is_webdriver_ready("http://127.0.0.1:1").await);
    }

    #[tokio::test]
    async fn acquire_exhausts_attempts_against_dead_endpoint() {
        let config = test_config("http://127.0.0.1:1");
        let cancel = CancellationToken::new();

        let err = acquire_client(&config, &cancel).await.unwrap_err();
        match err {
            LookupError::Session { attempts, .. } => assert_eq!(attempts, 3),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn acquire_retries_when_session_creation_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/session"))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&server)
            .await;

        let config = test_config(&server.uri());
        let cancel = CancellationToken::new();

        let err = acquire_client(&config, &cancel).await.unwrap_err();
        assert!(
            err.to_string()
                .starts_with("driver initialization failed after 3 attempts")
        );
    }

    #[tokio::test]
    async fn acquire_honors_cancellation() {
        let config = test_config("http://127.0.0.1:1");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = acquire_client(&config, &cancel).await.unwrap_err();
        assert!(matches!(err, LookupError::Cancelled));
    }
}
