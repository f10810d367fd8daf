//! Quota retry, liveness probing and provider searches against a scripted
//! local HTTP responder
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use url::Url;

use sheet_image_fill::domain::{Candidate, HostAllowList, LivenessProbe, Query, SearchProvider};
use sheet_image_fill::infrastructure::config::{BingConfig, GoogleConfig, PixabayConfig};
use sheet_image_fill::infrastructure::providers::{BingImageProvider, GoogleCseProvider, PixabayProvider};
use sheet_image_fill::infrastructure::{
    ApiKey, GoogleCredentials, HttpClient, HttpClientConfig, HttpLivenessValidator, SearchError,
};

struct Reply {
    status: u16,
    headers: Vec<(&'static str, String)>,
    body: &'static str,
}

fn reply(status: u16) -> Reply {
    Reply {
        status,
        headers: Vec::new(),
        body: "",
    }
}

/// Serves `replies` in order, one connection each, then stops listening.
async fn serve(replies: Vec<Reply>) -> (SocketAddr, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();

    tokio::spawn(async move {
        for reply in replies {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match socket.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }
            counter.fetch_add(1, Ordering::SeqCst);

            let is_head = request.starts_with(b"HEAD");
            let mut response = format!("HTTP/1.1 {} Scripted\r\nConnection: close\r\n", reply.status);
            for (name, value) in &reply.headers {
                response.push_str(&format!("{name}: {value}\r\n"));
            }
            response.push_str(&format!("Content-Length: {}\r\n\r\n", reply.body.len()));
            if !is_head {
                response.push_str(reply.body);
            }
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });

    (addr, hits)
}

fn client(backoff_ms: u64) -> HttpClient {
    HttpClient::with_config(HttpClientConfig {
        timeout: Duration::from_secs(5),
        user_agent: "sheet-image-fill-tests".into(),
        quota_backoff: Duration::from_millis(backoff_ms),
        max_quota_backoff: Duration::from_secs(30),
    })
    .unwrap()
}

fn url(addr: SocketAddr, path: &str) -> Url {
    Url::parse(&format!("http://{addr}{path}")).unwrap()
}

fn ok(body: &'static str) -> Reply {
    Reply {
        status: 200,
        headers: Vec::new(),
        body,
    }
}

/// Server error, quota exhausted twice, then a body the provider cannot use.
fn failing_replies(unusable_body: &'static str) -> Vec<Reply> {
    vec![reply(503), reply(429), reply(429), ok(unusable_body)]
}

async fn search_until_exhausted(provider: &dyn SearchProvider, cursor: u32) -> Vec<Vec<Candidate>> {
    let query = Query::build("Visa Gift Card", &[("Brand", Some("Visa".to_string()))]);
    let mut results = Vec::new();
    for _ in 0..3 {
        results.push(provider.search(&query, cursor).await);
    }
    results
}

fn urls(candidates: &[Candidate]) -> Vec<&str> {
    candidates.iter().map(Candidate::as_str).collect()
}

#[tokio::test]
async fn rate_limited_request_is_retried_once_after_backoff() {
    let (addr, hits) = serve(vec![
        reply(429),
        Reply {
            status: 200,
            headers: vec![("Content-Type", "application/json".into())],
            body: r#"{"items":[]}"#,
        },
    ])
    .await;

    let started = Instant::now();
    let body = client(150).get_text(url(addr, "/search")).await.unwrap();

    assert_eq!(body, r#"{"items":[]}"#);
    assert_eq!(hits.load(Ordering::SeqCst), 2);
    assert!(started.elapsed() >= Duration::from_millis(150));
}

#[tokio::test]
async fn retry_after_header_sets_the_wait() {
    let (addr, hits) = serve(vec![
        Reply {
            status: 429,
            headers: vec![("Retry-After", "0".into())],
            body: "",
        },
        Reply {
            status: 200,
            headers: Vec::new(),
            body: "ok",
        },
    ])
    .await;

    let started = Instant::now();
    let body = client(10_000).get_text(url(addr, "/")).await.unwrap();

    assert_eq!(body, "ok");
    assert_eq!(hits.load(Ordering::SeqCst), 2);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn second_rate_limit_gives_up() {
    let (addr, hits) = serve(vec![reply(429), reply(429), reply(200)]).await;

    let err = client(20).get_text(url(addr, "/search")).await.unwrap_err();

    assert!(matches!(err, SearchError::RateLimited { .. }));
    assert!(err.is_transient());
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn server_error_is_not_retried() {
    let (addr, hits) = serve(vec![reply(503), reply(200)]).await;

    let err = client(20).get_text(url(addr, "/search")).await.unwrap_err();

    assert!(matches!(err, SearchError::HttpStatus { status: 503, .. }));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn liveness_follows_redirects_and_checks_final_status() {
    let (addr, _) = serve(vec![
        Reply {
            status: 302,
            headers: vec![("Location", "/final.jpg".into())],
            body: "",
        },
        reply(200),
        reply(404),
    ])
    .await;
    let probe = HttpLivenessValidator::new(client(20), HostAllowList::default());
    let timeout = Duration::from_secs(2);

    assert!(probe.is_live(url(addr, "/moved.jpg").as_str(), timeout).await);
    assert!(!probe.is_live(url(addr, "/gone.jpg").as_str(), timeout).await);
}

#[tokio::test]
async fn liveness_times_out_on_silent_host() {
    // accepts but never answers
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let _hold = tokio::spawn(async move {
        let mut open = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            open.push(socket);
        }
    });
    let probe = HttpLivenessValidator::new(client(20), HostAllowList::default());

    let started = Instant::now();
    let live = probe
        .is_live(url(addr, "/slow.jpg").as_str(), Duration::from_millis(300))
        .await;

    assert!(!live);
    assert!(started.elapsed() < Duration::from_secs(3));
}

const BING_PAGE: &str = r#"<html><body>
    <a class="iusc" m='{"murl":"https://cdn.shop.test/visa.jpg"}'>1</a>
    <a class="iusc" m='{"murl":"https://img.test/visa-card.png"}'>2</a>
    <img src="https://cdn.shop.test/visa.jpg">
</body></html>"#;

#[tokio::test]
async fn bing_reads_a_results_page_from_the_configured_endpoint() {
    let (addr, hits) = serve(vec![ok(BING_PAGE)]).await;
    let settings = BingConfig {
        endpoint: url(addr, "/images/search").to_string(),
        ..BingConfig::default()
    };
    let provider = BingImageProvider::new(client(20), settings);

    let candidates = provider.search(&Query::build::<&str>("Visa Gift Card", &[]), 11).await;

    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(urls(&candidates), vec!["https://cdn.shop.test/visa.jpg", "https://img.test/visa-card.png"]);
    assert!(candidates.iter().all(|c| c.source.provider == "bing" && c.source.cursor == 11));
    assert_eq!(candidates[1].source.rank, 1);
}

#[tokio::test]
async fn bing_failures_yield_no_candidates() {
    let (addr, hits) = serve(failing_replies("<html><body>No results</body></html>")).await;
    let settings = BingConfig {
        endpoint: url(addr, "/images/search").to_string(),
        ..BingConfig::default()
    };
    let provider = BingImageProvider::new(client(20), settings);

    let results = search_until_exhausted(&provider, 1).await;

    assert!(results.iter().all(Vec::is_empty));
    assert_eq!(hits.load(Ordering::SeqCst), 4);
}

fn google(addr: SocketAddr) -> GoogleCseProvider {
    let settings = GoogleConfig {
        endpoint: url(addr, "/customsearch/v1").to_string(),
        ..GoogleConfig::default()
    };
    let credentials = GoogleCredentials {
        api_key: ApiKey::new("test-key"),
        cx: "engine".into(),
    };
    GoogleCseProvider::new(client(20), credentials, settings)
}

#[tokio::test]
async fn google_reads_item_links_from_the_configured_endpoint() {
    let (addr, hits) = serve(vec![ok(r#"{"items": [
        {"link": "https://cdn.shop.test/a.jpg"},
        {"link": "https://cdn.shop.test/a.jpg"},
        {"link": "https://img.test/b.png"}
    ]}"#)])
    .await;

    let candidates = google(addr).search(&Query::build::<&str>("gift card", &[]), 1).await;

    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(urls(&candidates), vec!["https://cdn.shop.test/a.jpg", "https://img.test/b.png"]);
    assert!(candidates.iter().all(|c| c.source.provider == "google" && c.source.cursor == 1));
    assert_eq!(candidates[0].source.rank, 0);
}

#[tokio::test]
async fn google_failures_yield_no_candidates() {
    let (addr, hits) = serve(failing_replies("<html>")).await;

    let results = search_until_exhausted(&google(addr), 1).await;

    assert!(results.iter().all(Vec::is_empty));
    assert_eq!(hits.load(Ordering::SeqCst), 4);
}

fn pixabay(addr: SocketAddr) -> PixabayProvider {
    let settings = PixabayConfig {
        endpoint: url(addr, "/api/").to_string(),
        ..PixabayConfig::default()
    };
    PixabayProvider::new(client(20), ApiKey::new("test-key"), settings)
}

#[tokio::test]
async fn pixabay_reads_hits_from_the_configured_endpoint() {
    let (addr, hits) = serve(vec![ok(r#"{"totalHits": 3, "hits": [
        {"largeImageURL": "https://pixabay.test/1_1280.jpg"},
        {"webformatURL": "https://pixabay.test/2_640.jpg"},
        {"largeImageURL": "https://pixabay.test/1_1280.jpg"}
    ]}"#)])
    .await;

    let candidates = pixabay(addr).search(&Query::build::<&str>("mug", &[]), 2).await;

    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(urls(&candidates), vec!["https://pixabay.test/1_1280.jpg", "https://pixabay.test/2_640.jpg"]);
    assert!(candidates.iter().all(|c| c.source.provider == "pixabay" && c.source.cursor == 2));
}

#[tokio::test]
async fn pixabay_failures_yield_no_candidates() {
    let (addr, hits) = serve(failing_replies("<html>")).await;

    let results = search_until_exhausted(&pixabay(addr), 1).await;

    assert!(results.iter().all(Vec::is_empty));
    assert_eq!(hits.load(Ordering::SeqCst), 4);
}
