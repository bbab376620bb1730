mod common;

use async_trait::async_trait;
use common::{event_card, listing_page};
use doujin_scraper::app::ports::{HttpClientPort, HttpGetResult};
use doujin_scraper::infra::{InMemoryDocumentStore, InMemoryObjectStore};
use doujin_scraper::scheduler::run_with_retries;
use doujin_scraper::{Pipeline, ScraperError};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// Times out the first `failures` listing requests, then serves a one-event page.
struct FlakySite {
    failures: u32,
    calls: AtomicU32,
}

#[async_trait]
impl HttpClientPort for FlakySite {
    async fn get(&self, _url: &str) -> Result<HttpGetResult, String> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n < self.failures {
            return Err("operation timed out".to_string());
        }
        Ok(HttpGetResult {
            status: 200,
            bytes: listing_page(&[event_card("77", "Retry Fest", "", "2024-07-07")]).into_bytes(),
            content_type: "text/html".to_string(),
        })
    }
}

fn pipeline_with(site: Arc<dyn HttpClientPort>) -> (Pipeline, Arc<InMemoryDocumentStore>) {
    let store = Arc::new(InMemoryDocumentStore::new());
    let objects = Arc::new(InMemoryObjectStore::new("https://cdn.example"));
    (Pipeline::new(site, store.clone(), objects), store)
}

#[tokio::test]
async fn test_retries_until_success() {
    let site = Arc::new(FlakySite {
        failures: 2,
        calls: AtomicU32::new(0),
    });
    let (pipeline, store) = pipeline_with(site.clone());

    let summary = run_with_retries(&pipeline, 3, Duration::ZERO).await.unwrap();
    assert_eq!(summary.new_count, 1);
    assert_eq!(site.calls.load(Ordering::SeqCst), 3);
    assert_eq!(store.ids("events"), vec!["77"]);
}

#[tokio::test]
async fn test_gives_up_after_retry_budget() {
    let site = Arc::new(FlakySite {
        failures: 10,
        calls: AtomicU32::new(0),
    });
    let (pipeline, _) = pipeline_with(site.clone());

    let err = run_with_retries(&pipeline, 3, Duration::ZERO).await.unwrap_err();
    assert!(err.to_string().contains("operation timed out"));
    assert_eq!(site.calls.load(Ordering::SeqCst), 4);
}

/// Blocks the listing request until released, so a run can be held in flight.
struct GatedSite {
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl HttpClientPort for GatedSite {
    async fn get(&self, _url: &str) -> Result<HttpGetResult, String> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(HttpGetResult {
            status: 200,
            bytes: listing_page(&[event_card("1", "Gate", "", "2024-01-01")]).into_bytes(),
            content_type: "text/html".to_string(),
        })
    }
}

#[tokio::test]
async fn test_overlapping_manual_run_is_refused() {
    let site = Arc::new(GatedSite {
        entered: Notify::new(),
        release: Notify::new(),
    });
    let (pipeline, store) = pipeline_with(site.clone());
    let pipeline = Arc::new(pipeline);

    let first = tokio::spawn({
        let pipeline = pipeline.clone();
        async move { pipeline.run().await }
    });
    site.entered.notified().await;

    let second = pipeline.try_run().await;
    assert!(matches!(second, Err(ScraperError::AlreadyRunning)));

    site.release.notify_one();
    let summary = first.await.unwrap().unwrap();
    assert_eq!(summary.new_count, 1);
    assert_eq!(store.ids("events"), vec!["1"]);
}
