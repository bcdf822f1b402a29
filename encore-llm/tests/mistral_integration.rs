#![cfg(feature = "mistral")]

mod common;

use encore_config::{LlmConfig, LlmProvider};
use encore_llm::{build_llm_client, EventExtractor, LlmEventExtractor};

fn config_or_skip() -> Option<LlmConfig> {
    let key = std::env::var("MISTRAL_API_KEY").ok()?;
    Some(LlmConfig {
        provider: LlmProvider::Mistral,
        model: None,
        auth_token: Some(key),
        endpoint: None,
        max_tokens: None,
        timeout_secs: Some(60),
        max_retries: 1,
    })
}

#[tokio::test]
#[ignore]
async fn mistral_extracts_a_real_event() {
    common::init_test_tracing();
    let Some(cfg) = config_or_skip() else {
        tracing::debug!("Skipping: MISTRAL_API_KEY not set");
        return;
    };
    let extractor = LlmEventExtractor::new(build_llm_client(&cfg).unwrap(), None);

    let event = extractor
        .extract(
            "Fall Gala | Symphony Hall Event: Fall Gala on 2024-10-05 at 7pm, Symphony Hall \
             Yo-Yo Ma , cello Beethoven: Symphony No. 5 Tickets on sale now",
        )
        .await
        .unwrap();

    tracing::debug!(?event, "live extraction");
    assert!(event.name.contains("Fall Gala"));
    assert!(event.artists.iter().any(|a| a.name.contains("Yo-Yo Ma")));
}
