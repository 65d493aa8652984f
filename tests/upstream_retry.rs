//! Retry/backoff behavior of the RAWG client, driven through a scripted
//! transport under a paused tokio clock.

use async_trait::async_trait;
use memorycard_server::config::Settings;
use memorycard_server::rawg::{
    CatalogTransport, RawResponse, RawgClient, RawgError, TransportError,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tokio::time::{Duration, Instant};

struct StubTransport {
    calls: AtomicU32,
    script: Mutex<VecDeque<Result<RawResponse, TransportError>>>,
}

impl StubTransport {
    fn new(script: Vec<Result<RawResponse, TransportError>>) -> Arc<Self> {
        Arc::new(StubTransport {
            calls: AtomicU32::new(0),
            script: Mutex::new(script.into()),
        })
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogTransport for StubTransport {
    async fn get(
        &self,
        _url: &str,
        _query: &[(String, String)],
    ) -> Result<RawResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .expect("script exhausted")
    }
}

fn ok(status: u16, body: &str) -> Result<RawResponse, TransportError> {
    Ok(RawResponse {
        status,
        body: body.to_string(),
    })
}

fn test_settings() -> Settings {
    Settings {
        rawg_base_url: "https://rawg.test/api".into(),
        rawg_api_key: "test-key".into(),
        rawg_timeout: 10,
        rawg_max_retries: 3,
        cache_default_ttl: 86_400,
        cache_reference_ttl: 604_800,
        access_token_minutes: 15,
        refresh_token_days: 7,
    }
}

const GENRES_BODY: &str =
    r#"{"count":1,"results":[{"id":4,"name":"Action","slug":"action"}]}"#;

#[tokio::test(start_paused = true)]
async fn server_errors_are_retried_with_exponential_backoff() {
    let transport = StubTransport::new(vec![
        ok(500, "boom"),
        ok(502, "boom"),
        ok(200, GENRES_BODY),
    ]);
    let client = RawgClient::new(&test_settings(), transport.clone());

    let started = Instant::now();
    let genres = client.list_genres().await.unwrap();

    // Exactly three upstream calls, with 1s + 2s of backoff in between.
    assert_eq!(transport.calls(), 3);
    assert_eq!(started.elapsed(), Duration::from_secs(3));
    assert_eq!(genres.results[0].name, "Action");
}

#[tokio::test(start_paused = true)]
async fn rate_limit_fails_fast_without_retrying() {
    let transport = StubTransport::new(vec![ok(429, "slow down")]);
    let client = RawgClient::new(&test_settings(), transport.clone());

    let started = Instant::now();
    let err = client.list_genres().await.unwrap_err();

    assert!(matches!(err, RawgError::RateLimited));
    assert_eq!(transport.calls(), 1);
    assert_eq!(started.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn client_errors_are_not_retried() {
    let transport = StubTransport::new(vec![ok(404, "no such game")]);
    let client = RawgClient::new(&test_settings(), transport.clone());

    let err = client.game_details(999_999).await.unwrap_err();

    match err {
        RawgError::Upstream { status, body } => {
            assert_eq!(status, 404);
            assert_eq!(body, "no such game");
        }
        other => panic!("expected Upstream, got {other:?}"),
    }
    assert_eq!(transport.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn retries_exhaust_after_the_configured_budget() {
    // max_retries = 3 → 4 attempts total, 1s + 2s + 4s of waiting.
    let transport = StubTransport::new(vec![
        Err(TransportError::Timeout),
        Err(TransportError::Timeout),
        Err(TransportError::Timeout),
        Err(TransportError::Timeout),
    ]);
    let client = RawgClient::new(&test_settings(), transport.clone());

    let started = Instant::now();
    let err = client.list_platforms().await.unwrap_err();

    assert!(matches!(err, RawgError::TimedOut { attempts: 4 }));
    assert_eq!(transport.calls(), 4);
    assert_eq!(started.elapsed(), Duration::from_secs(7));
}

#[tokio::test(start_paused = true)]
async fn connection_errors_fail_immediately() {
    let transport = StubTransport::new(vec![Err(TransportError::Connect("refused".into()))]);
    let client = RawgClient::new(&test_settings(), transport.clone());

    let err = client.list_genres().await.unwrap_err();
    assert!(matches!(err, RawgError::Connect(_)));
    assert_eq!(transport.calls(), 1);
}
