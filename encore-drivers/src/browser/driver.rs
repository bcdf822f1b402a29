use crate::browser::{
    behavioral::BehavioralEngine, fingerprint::UserAgentProfile, page::EncorePage,
    stealth::build_stealth_arguments,
};
use encore_common::{EncoreError, Result};
use encore_config::BrowserConfig;
use fantoccini::{Client, ClientBuilder};
use serde_json::json;
use std::time::Duration;
use tracing::debug;
use webdriver::capabilities::Capabilities;

/// Thin wrapper around a `fantoccini` WebDriver session with stealth and
/// behavioral helpers.
pub struct EncoreDriver {
    client: Client,
    config: BrowserConfig,
    profile: UserAgentProfile,
}

impl EncoreDriver {
    /// Open a new session on the configured WebDriver service.
    ///
    /// `page_load` caps how long the browser itself may spend on navigation
    /// and injected scripts.
    pub async fn connect(
        config: &BrowserConfig,
        profile: UserAgentProfile,
        page_load: Duration,
    ) -> Result<Self> {
        let args = build_stealth_arguments(
            config.stealth,
            &profile,
            config.headless,
            &config.extra_args,
        );
        debug!(target: "render", webdriver = %config.webdriver_url, ?args, "render.session.open");

        let mut caps = Capabilities::new();
        caps.insert("goog:chromeOptions".to_string(), json!({ "args": args }));
        let page_load_ms = page_load.as_millis() as u64;
        caps.insert(
            "timeouts".to_string(),
            json!({ "pageLoad": page_load_ms, "script": page_load_ms }),
        );

        let client = ClientBuilder::native()
            .capabilities(caps)
            .connect(&config.webdriver_url)
            .await
            .map_err(|e| {
                EncoreError::RenderFailure(format!(
                    "could not start browser session at {}: {e}",
                    config.webdriver_url
                ))
            })?;

        Ok(Self {
            client,
            config: config.clone(),
            profile,
        })
    }

    /// Navigate to `url` and return a page with stealth scripts applied.
    pub async fn open(&self, url: &str) -> Result<EncorePage> {
        let mut page = EncorePage::new(
            self.client.clone(),
            self.config.stealth,
            self.profile.clone(),
            BehavioralEngine::new(self.config.navigation_jitter_ms),
        );
        page.goto(url).await?;
        Ok(page)
    }

    /// End the browser session.
    pub async fn close(self) -> Result<()> {
        self.client
            .close()
            .await
            .map_err(|e| EncoreError::RenderFailure(format!("closing browser session failed: {e}")))
    }
}
