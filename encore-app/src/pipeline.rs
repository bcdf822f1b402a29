use encore_common::{EncoreError, Result, StoredRecord};
use encore_drivers::Renderer;
use encore_llm::EventExtractor;
use encore_store::EventRepository;
use encore_web::normalize_html;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;
use url::Url;

/// Render, normalize, extract, persist. One pass per request, no retries.
pub struct Pipeline {
    renderer: Arc<dyn Renderer>,
    extractor: Arc<dyn EventExtractor>,
    repository: Arc<dyn EventRepository>,
    render_timeout: Duration,
}

impl Pipeline {
    pub fn new(
        renderer: Arc<dyn Renderer>,
        extractor: Arc<dyn EventExtractor>,
        repository: Arc<dyn EventRepository>,
        render_timeout: Duration,
    ) -> Self {
        Self {
            renderer,
            extractor,
            repository,
            render_timeout,
        }
    }

    /// Run the full pipeline for `url` and store the result.
    ///
    /// A failure at any stage stops the pipeline; nothing is written unless
    /// extraction succeeded.
    pub async fn save(&self, url: &Url) -> Result<StoredRecord> {
        let started = Instant::now();
        let html = self.renderer.render(url, self.render_timeout).await?;
        let text = normalize_html(&html);
        let event = self.extractor.extract(&text).await?;
        let record = self.repository.write(url.as_str(), &event).await?;
        info!(
            target: "pipeline",
            %url,
            record_id = %record.id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "pipeline.saved"
        );
        Ok(record)
    }

    pub async fn get(&self, url: &Url) -> Result<Option<StoredRecord>> {
        self.repository.read(url.as_str()).await
    }
}

/// Validate the `url` query value.
///
/// ```
/// use encore_app::pipeline::parse_target;
///
/// assert_eq!(
///     parse_target(Some(" https://example.org/concert ")).unwrap().as_str(),
///     "https://example.org/concert"
/// );
/// assert!(parse_target(None).is_err());
/// assert!(parse_target(Some("ftp://example.org/")).is_err());
/// ```
pub fn parse_target(raw: Option<&str>) -> Result<Url> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| EncoreError::Validation("URL parameter is required".into()))?;

    let url = Url::parse(raw)
        .map_err(|e| EncoreError::Validation(format!("Invalid URL {raw:?}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(EncoreError::Validation(format!(
            "Unsupported URL scheme {other:?}; expected http or https"
        ))),
    }
}
