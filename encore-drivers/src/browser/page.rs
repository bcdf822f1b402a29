use crate::browser::{
    behavioral::BehavioralEngine,
    fingerprint::UserAgentProfile,
    stealth::StealthScripts,
};
use encore_common::{EncoreError, Result};
use encore_config::StealthLevel;
use fantoccini::{error::CmdError, Client, Locator};
use std::time::Duration;
use tracing::{debug, warn};

/// Page handle bound to one WebDriver session.
pub struct EncorePage {
    pub(crate) client: Client,
    pub(crate) stealth: StealthLevel,
    pub(crate) profile: UserAgentProfile,
    pub(crate) behavioral_engine: BehavioralEngine,
}

impl EncorePage {
    pub fn new(
        client: Client,
        stealth: StealthLevel,
        profile: UserAgentProfile,
        behavioral_engine: BehavioralEngine,
    ) -> Self {
        Self {
            client,
            stealth,
            profile,
            behavioral_engine,
        }
    }

    /// Navigate to `url` and apply stealth/fingerprint scripts.
    pub async fn goto(&mut self, url: &str) -> Result<()> {
        self.behavioral_engine.before_navigation().await;
        self.client
            .goto(url)
            .await
            .map_err(|e| EncoreError::RenderFailure(format!("navigation to {url} failed: {e}")))?;

        self.apply_stealth().await;
        Ok(())
    }

    /// Evasions are best-effort: a page with a locked-down CSP may refuse them.
    async fn apply_stealth(&mut self) {
        let mut scripts: Vec<String> = StealthScripts::for_level(self.stealth)
            .into_iter()
            .map(str::to_string)
            .collect();
        if self.stealth == StealthLevel::Maximum {
            scripts.push(StealthScripts::platform(&self.profile));
        }
        for script in scripts {
            if let Err(err) = self.client.execute(&script, vec![]).await {
                warn!(target: "render", error = %err, "render.stealth_script_failed");
            }
        }
    }

    /// Block until the document body exists or `timeout` elapses.
    pub async fn wait_for_body(&self, timeout: Duration) -> Result<()> {
        match self
            .client
            .wait()
            .at_most(timeout)
            .for_element(Locator::Css("body"))
            .await
        {
            Ok(_) => {
                debug!(target: "render", "render.body_ready");
                Ok(())
            }
            Err(CmdError::WaitTimeout) => Err(EncoreError::RenderTimeout(timeout)),
            Err(e) => Err(EncoreError::RenderFailure(format!(
                "waiting for document body failed: {e}"
            ))),
        }
    }

    /// Return the full page HTML source.
    pub async fn content(&self) -> Result<String> {
        self.client
            .source()
            .await
            .map_err(|e| EncoreError::RenderFailure(format!("reading page source failed: {e}")))
    }
}
