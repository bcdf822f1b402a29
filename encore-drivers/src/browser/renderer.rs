use crate::browser::{driver::EncoreDriver, fingerprint::UserAgentManager};
use async_trait::async_trait;
use encore_common::{EncoreError, Result};
use encore_config::BrowserConfig;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use url::Url;

/// How long teardown may hold up the caller. A close that misses this is
/// still sent once the session's in-flight command returns.
const SESSION_CLOSE_GRACE: Duration = Duration::from_secs(2);

/// Turns a URL into fully rendered HTML.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Render `url`, giving up with [`EncoreError::RenderTimeout`] once
    /// `timeout` has elapsed.
    async fn render(&self, url: &Url, timeout: Duration) -> Result<String>;
}

/// Renderer backed by a fresh WebDriver session per call.
///
/// Sessions are never reused; each one is closed before `render` returns,
/// whether it succeeded or not.
pub struct BrowserRenderer {
    config: BrowserConfig,
    user_agents: UserAgentManager,
}

impl BrowserRenderer {
    pub fn new(config: BrowserConfig) -> Self {
        Self {
            config,
            user_agents: UserAgentManager::new(),
        }
    }

    async fn load(driver: &EncoreDriver, url: &Url, timeout: Duration) -> Result<String> {
        let page = driver.open(url.as_str()).await?;
        page.wait_for_body(timeout).await?;
        page.content().await
    }
}

#[async_trait]
impl Renderer for BrowserRenderer {
    async fn render(&self, url: &Url, timeout: Duration) -> Result<String> {
        let started = Instant::now();
        info!(target: "render", %url, timeout_ms = timeout.as_millis() as u64, "render.start");

        let driver = EncoreDriver::connect(&self.config, self.user_agents.pick(), timeout).await?;
        let outcome = tokio::time::timeout(timeout, Self::load(&driver, url, timeout))
            .await
            .unwrap_or(Err(EncoreError::RenderTimeout(timeout)));

        match tokio::time::timeout(SESSION_CLOSE_GRACE, driver.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                warn!(target: "render", %url, error = %err, "render.session.close_failed")
            }
            Err(_) => warn!(
                target: "render",
                %url,
                grace_ms = SESSION_CLOSE_GRACE.as_millis() as u64,
                "render.session.close_timed_out"
            ),
        }

        match &outcome {
            Ok(html) => info!(
                target: "render",
                %url,
                bytes = html.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "render.done"
            ),
            Err(err) => warn!(
                target: "render",
                %url,
                error = %err,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "render.failed"
            ),
        }
        outcome
    }
}
