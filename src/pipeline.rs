use crate::app::ports::{DocumentStorePort, HttpClientPort, ObjectStorePort};
use crate::archive::ImageArchiver;
use crate::config::Config;
use crate::constants::{DEFAULT_CONCURRENCY, EVENTS_COLLECTION, LISTING_URL};
use crate::dedup::{filter_new, first_by_id};
use crate::error::{Result, ScraperError};
use crate::parser::{DoujinListingParser, ExtractionReport, RecordExtractor};
use crate::types::{EventRecord, ExtractedEvent, RunSummary};
use futures::stream::{self, StreamExt};
use metrics::{counter, histogram};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{error, info, instrument, warn};

/// Fetch → extract → archive images → dedup → batch write.
///
/// Collaborators are injected so tests can swap in fakes. Runs through the same
/// `Pipeline` are serialized; nothing coordinates runs across processes beyond the
/// store's create-only batch.
pub struct Pipeline {
    http: Arc<dyn HttpClientPort>,
    extractor: Arc<dyn RecordExtractor>,
    archiver: ImageArchiver,
    store: Arc<dyn DocumentStorePort>,
    listing_url: String,
    collection: String,
    concurrency: usize,
    run_lock: Mutex<()>,
}

impl Pipeline {
    pub fn new(
        http: Arc<dyn HttpClientPort>,
        store: Arc<dyn DocumentStorePort>,
        objects: Arc<dyn ObjectStorePort>,
    ) -> Self {
        Self {
            archiver: ImageArchiver::new(http.clone(), objects),
            http,
            extractor: Arc::new(DoujinListingParser::new()),
            store,
            listing_url: LISTING_URL.to_string(),
            collection: EVENTS_COLLECTION.to_string(),
            concurrency: DEFAULT_CONCURRENCY,
            run_lock: Mutex::new(()),
        }
    }

    pub fn from_config(
        config: &Config,
        http: Arc<dyn HttpClientPort>,
        store: Arc<dyn DocumentStorePort>,
        objects: Arc<dyn ObjectStorePort>,
    ) -> Self {
        Self::new(http, store, objects)
            .with_listing_url(&config.scraper.listing_url)
            .with_collection(&config.pipeline.collection)
            .with_concurrency(config.pipeline.concurrency)
    }

    pub fn with_listing_url(mut self, url: &str) -> Self {
        self.listing_url = url.to_string();
        self
    }

    pub fn with_collection(mut self, collection: &str) -> Self {
        self.collection = collection.to_string();
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn RecordExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Run once, waiting for any in-flight run in this process to finish first.
    pub async fn run(&self) -> Result<RunSummary> {
        let _guard = self.run_lock.lock().await;
        self.run_locked().await
    }

    /// Run once, or fail with [`ScraperError::AlreadyRunning`] if a run is in flight.
    pub async fn try_run(&self) -> Result<RunSummary> {
        let _guard = self
            .run_lock
            .try_lock()
            .map_err(|_| ScraperError::AlreadyRunning)?;
        self.run_locked().await
    }

    #[instrument(skip(self), fields(run_id = %uuid::Uuid::new_v4(), url = %self.listing_url))]
    async fn run_locked(&self) -> Result<RunSummary> {
        info!("Starting scrape run");
        counter!("doujin_runs_total").increment(1);
        let started = Instant::now();

        let outcome = self.run_stages().await;
        histogram!("doujin_run_duration_seconds").record(started.elapsed().as_secs_f64());

        match outcome {
            Ok(summary) => {
                info!("Scrape run finished: {}", summary.message);
                Ok(summary)
            }
            Err(e) => {
                error!("Scrape run failed: {}", e);
                counter!("doujin_run_failures_total").increment(1);
                Err(ScraperError::run_failed(&e))
            }
        }
    }

    async fn run_stages(&self) -> Result<RunSummary> {
        let html = self.fetch_listing().await?;
        let report = self.extract(&html)?;
        let skipped_cards = report.skipped_count();
        let extracted = report.into_records();
        let parsed = extracted.len();
        // dedup before archiving: copies of an id share one object path
        let events = first_by_id(extracted, |e: &ExtractedEvent| e.record.id.as_str());
        if events.len() < parsed {
            warn!("Dropped {} repeated event ids on the listing page", parsed - events.len());
        }
        let total = events.len();

        let records = self.archive_images(events).await;
        let fresh = filter_new(records, &*self.store, &self.collection, self.concurrency).await?;

        if fresh.is_empty() {
            info!("Nothing to add: all {} events already stored", total);
            return Ok(RunSummary::nothing_to_add(total, skipped_cards));
        }

        let new_count = fresh.len();
        self.write(fresh).await?;
        Ok(RunSummary::written(new_count, total, skipped_cards))
    }

    #[instrument(skip(self))]
    async fn fetch_listing(&self) -> Result<String> {
        let t_fetch = Instant::now();
        let resp = self
            .http
            .get(&self.listing_url)
            .await
            .map_err(ScraperError::Fetch)?;
        histogram!("doujin_fetch_duration_seconds").record(t_fetch.elapsed().as_secs_f64());

        if !resp.is_success() {
            return Err(ScraperError::Fetch(format!(
                "listing request returned status {}",
                resp.status
            )));
        }
        let body = String::from_utf8_lossy(&resp.bytes).into_owned();
        if body.trim().is_empty() {
            return Err(ScraperError::Fetch("no data received from the website".into()));
        }
        info!("Fetched listing page ({} bytes)", body.len());
        Ok(body)
    }

    fn extract(&self, html: &str) -> Result<ExtractionReport> {
        let report = self.extractor.extract(html);
        counter!("doujin_cards_skipped_total").increment(report.skipped_count() as u64);
        if report.is_empty() {
            return Err(ScraperError::Extraction(format!(
                "{} event cards on page, none parsed",
                report.outcomes.len()
            )));
        }
        counter!("doujin_records_scanned_total").increment(report.parsed_count() as u64);
        info!("Extracted {} events", report.parsed_count());
        Ok(report)
    }

    #[instrument(skip(self, events), fields(count = events.len()))]
    async fn archive_images(&self, events: Vec<ExtractedEvent>) -> Vec<EventRecord> {
        let archiver = &self.archiver;
        let records: Vec<EventRecord> = stream::iter(events)
            .map(|event| async move {
                let ExtractedEvent {
                    mut record,
                    source_image,
                } = event;
                record.image_url = archiver.archive(&source_image, &record.id).await;
                record
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let archived = records.iter().filter(|r| !r.image_url.is_empty()).count();
        counter!("doujin_images_archived_total").increment(archived as u64);
        info!("Archived {} of {} cover images", archived, records.len());
        records
    }

    #[instrument(skip(self, records), fields(count = records.len()))]
    async fn write(&self, records: Vec<EventRecord>) -> Result<()> {
        let count = records.len();
        let docs = records.into_iter().map(|r| (r.id.clone(), r)).collect();
        self.store.batch_create(&self.collection, docs).await?;
        counter!("doujin_records_written_total").increment(count as u64);
        info!("Stored {} new events in '{}'", count, self.collection);
        Ok(())
    }
}
