mod common;

use async_trait::async_trait;
use common::{event_card, harness, listing_page, PUBLIC_BASE};
use doujin_scraper::app::ports::{DocumentStorePort, HttpClientPort, HttpGetResult};
use doujin_scraper::constants::LISTING_URL;
use doujin_scraper::infra::{InMemoryDocumentStore, InMemoryObjectStore};
use doujin_scraper::{EventRecord, Pipeline, ScraperError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[tokio::test]
async fn test_first_run_writes_new_event_and_second_run_adds_nothing() {
    let h = harness();
    h.site.serve_listing(&listing_page(&[event_card(
        "20240101",
        "New Year Market",
        "//img.example/covers/ny.jpg",
        "2024-01-01(一)",
    )]));
    h.site
        .serve("https://img.example/covers/ny.jpg", 200, "image/jpeg", vec![0xFF, 0xD8, 0xFF]);

    let summary = h.pipeline.run().await.unwrap();
    assert!(summary.success);
    assert!(summary.message.contains('1'));
    assert_eq!(summary.new_count, 1);
    assert_eq!(summary.total_count, 1);
    assert_eq!(h.store.ids("events"), vec!["20240101"]);

    let stored = h.store.get("events", "20240101").unwrap();
    assert_eq!(stored.title, "New Year Market");
    assert_eq!(stored.days, vec!["2024/01/01"]);
    assert_eq!(stored.image_url, format!("{PUBLIC_BASE}/events/20240101.jpg"));
    assert_eq!(stored.url, "https://www.doujin.com.tw/events/info/20240101");

    let second = h.pipeline.run().await.unwrap();
    assert!(second.success);
    assert_eq!(second.new_count, 0);
    assert!(second.message.to_lowercase().contains("nothing to add"));
    assert_eq!(h.store.ids("events"), vec!["20240101"]);
    assert_eq!(h.store.get("events", "20240101").unwrap(), stored);
}

#[tokio::test]
async fn test_only_unseen_events_are_written() {
    let h = harness();
    let mut existing = EventRecord::new("B");
    existing.title = "already stored".to_string();
    h.store.insert("events", existing.clone());

    h.site.serve_listing(&listing_page(&[
        event_card("A", "Alpha", "", "2024-02-01~2024-02-02"),
        event_card("B", "Beta (renamed)", "", "2024-02-03"),
        event_card("C", "Gamma", "", "TBD"),
    ]));

    let summary = h.pipeline.run().await.unwrap();
    assert_eq!(summary.new_count, 2);
    assert_eq!(summary.total_count, 3);
    assert_eq!(h.store.ids("events"), vec!["A", "B", "C"]);
    assert_eq!(h.store.get("events", "B").unwrap(), existing);

    let gamma = h.store.get("events", "C").unwrap();
    assert_eq!(gamma.date, "TBD");
    assert_eq!(gamma.start_date, None);
    assert!(gamma.days.is_empty());
}

#[tokio::test]
async fn test_image_failures_do_not_fail_the_run() {
    let h = harness();
    h.site.serve_listing(&listing_page(&[
        event_card("1", "Missing image", "//img.example/404.png", "2024-03-01"),
        event_card("2", "Unreachable host", "https://down.example/x.gif", "2024-03-02"),
        event_card("3", "No image", "", "2024-03-03"),
    ]));
    h.site.serve("https://img.example/404.png", 404, "text/html", "not found");

    let summary = h.pipeline.run().await.unwrap();
    assert_eq!(summary.new_count, 3);
    for id in ["1", "2", "3"] {
        assert_eq!(h.store.get("events", id).unwrap().image_url, "");
    }
    assert!(h.objects.paths().is_empty());
}

#[tokio::test]
async fn test_malformed_card_is_skipped_but_run_succeeds() {
    let h = harness();
    h.site.serve_listing(&listing_page(&[
        event_card("10", "Good", "", "2024-04-01"),
        event_card("bad/path", "Broken", "", "2024-04-02"),
        event_card("12", "Also good", "", "2024-04-03"),
    ]));

    let summary = h.pipeline.run().await.unwrap();
    assert_eq!(summary.new_count, 2);
    assert_eq!(summary.skipped_cards, 1);
    assert_eq!(h.store.ids("events"), vec!["10", "12"]);
}

#[tokio::test]
async fn test_fetch_failures_abort_the_run() {
    let h = harness();
    let err = h.pipeline.run().await.unwrap_err();
    assert!(matches!(err, ScraperError::RunFailed(_)));
    assert!(err.to_string().starts_with("scrape run failed:"));
    assert!(err.to_string().contains("connection refused"));

    h.site.serve(LISTING_URL, 503, "text/html", "maintenance");
    let err = h.pipeline.run().await.unwrap_err();
    assert!(err.to_string().contains("503"));

    h.site.serve_listing("   \n");
    let err = h.pipeline.run().await.unwrap_err();
    assert!(err.to_string().contains("no data received"));

    assert!(h.store.ids("events").is_empty());
}

#[tokio::test]
async fn test_page_without_events_is_a_hard_failure() {
    let h = harness();
    h.site
        .serve_listing("<html><body><p>目前沒有活動</p></body></html>");

    let err = h.pipeline.run().await.unwrap_err();
    assert!(err.to_string().starts_with("scrape run failed: no events found"));
    assert!(h.store.ids("events").is_empty());
}

#[tokio::test]
async fn test_listing_is_fetched_from_configured_url() {
    let h = harness();
    let site = h.site.clone();
    let pipeline = doujin_scraper::Pipeline::new(site.clone(), h.store.clone(), h.objects.clone())
        .with_listing_url("https://mirror.example/alist");
    site.serve(
        "https://mirror.example/alist",
        200,
        "text/html",
        listing_page(&[event_card("5", "Mirror", "", "2024-05-05")]),
    );

    pipeline.run().await.unwrap();
    assert_eq!(site.requests(), vec!["https://mirror.example/alist"]);
    assert!(h.store.exists("events", "5").await.unwrap());
}

#[tokio::test]
async fn test_repeated_card_keeps_first_cover_image() {
    let h = harness();
    h.site.serve_listing(&listing_page(&[
        event_card("7", "first", "https://img.example/first.jpg", "2024-06-01"),
        event_card("7", "second", "https://img.example/second.jpg", "2024-06-02"),
    ]));
    h.site.serve("https://img.example/first.jpg", 200, "image/jpeg", "FIRST");
    h.site.serve("https://img.example/second.jpg", 200, "image/jpeg", "SECOND");

    let summary = h.pipeline.run().await.unwrap();
    assert_eq!(summary.new_count, 1);

    let stored = h.store.get("events", "7").unwrap();
    assert_eq!(stored.title, "first");
    assert_eq!(stored.image_url, format!("{PUBLIC_BASE}/events/7.jpg"));
    assert_eq!(h.objects.get("events/7.jpg").unwrap().bytes, b"FIRST".to_vec());
    assert!(!h
        .site
        .requests()
        .contains(&"https://img.example/second.jpg".to_string()));
}

/// Serves a listing of `cards` and holds each image request for a few yields,
/// recording the most image fetches in flight at once.
struct SlowImageSite {
    listing: String,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

#[async_trait]
impl HttpClientPort for SlowImageSite {
    async fn get(&self, url: &str) -> Result<HttpGetResult, String> {
        if url == LISTING_URL {
            return Ok(HttpGetResult {
                status: 200,
                bytes: self.listing.clone().into_bytes(),
                content_type: "text/html".to_string(),
            });
        }
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        for _ in 0..3 {
            tokio::task::yield_now().await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(HttpGetResult {
            status: 200,
            bytes: url.as_bytes().to_vec(),
            content_type: "image/png".to_string(),
        })
    }
}

#[tokio::test]
async fn test_image_fetches_respect_concurrency_limit() {
    let cards: Vec<String> = (1..=6)
        .map(|i| {
            event_card(
                &i.to_string(),
                "Event",
                &format!("https://img.example/{i}.png"),
                "2024-08-01",
            )
        })
        .collect();
    let site = Arc::new(SlowImageSite {
        listing: listing_page(&cards),
        in_flight: AtomicUsize::new(0),
        peak: AtomicUsize::new(0),
    });
    let store = Arc::new(InMemoryDocumentStore::new());
    let objects = Arc::new(InMemoryObjectStore::new(PUBLIC_BASE));
    let pipeline =
        Pipeline::new(site.clone(), store.clone(), objects.clone()).with_concurrency(2);

    let summary = pipeline.run().await.unwrap();
    assert_eq!(summary.new_count, 6);
    assert_eq!(site.peak.load(Ordering::SeqCst), 2);

    for i in 1..=6 {
        let record = store.get("events", &i.to_string()).unwrap();
        assert_eq!(record.image_url, format!("{PUBLIC_BASE}/events/{i}.png"));
        let object = objects.get(&format!("events/{i}.png")).unwrap();
        assert_eq!(object.bytes, format!("https://img.example/{i}.png").into_bytes());
    }
}
