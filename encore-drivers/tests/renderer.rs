use encore_common::EncoreError;
use encore_config::BrowserConfig;
use encore_drivers::{BrowserRenderer, Renderer};
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use url::Url;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init();
}

fn concert() -> Url {
    Url::parse("https://example.org/concert").unwrap()
}

fn renderer_for(server: &MockServer) -> BrowserRenderer {
    BrowserRenderer::new(BrowserConfig {
        webdriver_url: server.uri(),
        ..BrowserConfig::default()
    })
}

fn w3c(value: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "value": value }))
}

fn w3c_error(status: u16, error: &str, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(json!({
        "value": { "error": error, "message": message, "stacktrace": "" }
    }))
}

/// A chromedriver stand-in that hands out `session` and accepts the stealth
/// scripts. The session must be requested with the render timeout as its
/// page-load timeout.
async fn webdriver(session: &str, timeout: Duration) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/session"))
        .and(body_partial_json(json!({
            "capabilities": { "alwaysMatch": {
                "timeouts": { "pageLoad": timeout.as_millis() as u64 }
            }}
        })))
        .respond_with(w3c(json!({
            "sessionId": session,
            "capabilities": { "browserName": "chrome" }
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/session/{session}/execute/sync")))
        .respond_with(w3c(Value::Null))
        .mount(&server)
        .await;
    server
}

async fn expect_teardown(server: &MockServer, session: &str) {
    Mock::given(method("DELETE"))
        .and(path(format!("/session/{session}")))
        .respond_with(w3c(Value::Null))
        .expect(1)
        .named("session teardown")
        .mount(server)
        .await;
}

#[tokio::test]
async fn unreachable_webdriver_is_a_render_failure() {
    init_tracing();
    let config = BrowserConfig {
        // Port 9 (discard) is not a WebDriver endpoint on any sane test host.
        webdriver_url: "http://127.0.0.1:9".to_string(),
        ..BrowserConfig::default()
    };
    let renderer = BrowserRenderer::new(config);

    let err = renderer
        .render(&concert(), Duration::from_secs(5))
        .await
        .unwrap_err();
    assert!(matches!(err, EncoreError::RenderFailure(_)), "{err}");
    assert!(err.is_transient());
}

#[tokio::test]
async fn renders_page_source_and_closes_the_session() {
    init_tracing();
    let timeout = Duration::from_secs(5);
    let server = webdriver("render-ok", timeout).await;
    Mock::given(method("POST"))
        .and(path("/session/render-ok/url"))
        .and(body_partial_json(json!({ "url": "https://example.org/concert" })))
        .respond_with(w3c(Value::Null))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/session/render-ok/element"))
        .respond_with(w3c(json!({ "element-6066-11e4-a52e-4f735466cecf": "body-1" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/session/render-ok/source"))
        .respond_with(w3c(json!("<html><body><h1>Fall Gala</h1></body></html>")))
        .mount(&server)
        .await;
    expect_teardown(&server, "render-ok").await;

    let html = renderer_for(&server).render(&concert(), timeout).await.unwrap();
    assert!(html.contains("Fall Gala"));
}

#[tokio::test]
async fn navigation_error_closes_the_session() {
    init_tracing();
    let timeout = Duration::from_secs(5);
    let server = webdriver("nav-error", timeout).await;
    Mock::given(method("POST"))
        .and(path("/session/nav-error/url"))
        .respond_with(w3c_error(500, "unknown error", "net::ERR_NAME_NOT_RESOLVED"))
        .mount(&server)
        .await;
    expect_teardown(&server, "nav-error").await;

    let err = renderer_for(&server)
        .render(&concert(), timeout)
        .await
        .unwrap_err();
    assert!(matches!(err, EncoreError::RenderFailure(_)), "{err}");
    assert!(err.to_string().contains("ERR_NAME_NOT_RESOLVED"), "{err}");
}

#[tokio::test]
async fn missing_body_times_out_on_schedule_and_closes_the_session() {
    init_tracing();
    let timeout = Duration::from_secs(1);
    let server = webdriver("no-body", timeout).await;
    Mock::given(method("POST"))
        .and(path("/session/no-body/url"))
        .respond_with(w3c(Value::Null))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/session/no-body/element"))
        .respond_with(w3c_error(404, "no such element", "no such element: body"))
        .mount(&server)
        .await;
    expect_teardown(&server, "no-body").await;

    let started = Instant::now();
    let err = renderer_for(&server)
        .render(&concert(), timeout)
        .await
        .unwrap_err();
    let elapsed = started.elapsed();

    assert!(matches!(err, EncoreError::RenderTimeout(t) if t == timeout), "{err}");
    assert!(elapsed < timeout + Duration::from_secs(1), "took {elapsed:?}");
}

#[tokio::test]
async fn hung_navigation_does_not_hold_the_caller_past_the_close_grace() {
    init_tracing();
    let timeout = Duration::from_secs(1);
    let server = webdriver("hung-nav", timeout).await;
    Mock::given(method("POST"))
        .and(path("/session/hung-nav/url"))
        .respond_with(w3c(Value::Null).set_delay(Duration::from_secs(15)))
        .mount(&server)
        .await;

    let started = Instant::now();
    let err = renderer_for(&server)
        .render(&concert(), timeout)
        .await
        .unwrap_err();
    let elapsed = started.elapsed();

    assert!(matches!(err, EncoreError::RenderTimeout(_)), "{err}");
    // render timeout + 2s close grace, with slack for a loaded test host
    assert!(elapsed < Duration::from_secs(4), "took {elapsed:?}");
}

/// Requires a chromedriver listening on `ENCORE_TEST_WEBDRIVER` (e.g. http://localhost:9515).
#[tokio::test]
#[ignore]
async fn renders_a_live_page() {
    init_tracing();
    let Ok(webdriver_url) = std::env::var("ENCORE_TEST_WEBDRIVER") else {
        eprintln!("skipping: ENCORE_TEST_WEBDRIVER not set");
        return;
    };
    let renderer = BrowserRenderer::new(BrowserConfig {
        webdriver_url,
        ..BrowserConfig::default()
    });
    let url = Url::parse("https://example.org/").unwrap();

    let html = renderer.render(&url, Duration::from_secs(20)).await.unwrap();
    assert!(html.to_lowercase().contains("<body"));
}
