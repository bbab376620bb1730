//! Listing page parsing.
//!
//! A parser turns one fetched HTML document into an [`ExtractionReport`]: every event card on
//! the page yields exactly one [`CardOutcome`], in page order. A card that cannot be turned
//! into a record is reported as skipped rather than aborting the whole page.

pub mod doujin;

pub use doujin::DoujinListingParser;

use crate::types::ExtractedEvent;

pub trait RecordExtractor: Send + Sync {
    fn extract(&self, html: &str) -> ExtractionReport;

    /// Parsed records only, in page order.
    fn extract_records(&self, html: &str) -> Vec<ExtractedEvent> {
        self.extract(html).into_records()
    }
}

/// Per-card result of an extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardOutcome {
    Parsed(ExtractedEvent),
    /// `index` is 1-based, matching how the card would be counted on the page
    Skipped { index: usize, reason: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionReport {
    pub outcomes: Vec<CardOutcome>,
}

impl ExtractionReport {
    pub fn records(&self) -> impl Iterator<Item = &ExtractedEvent> {
        self.outcomes.iter().filter_map(|o| match o {
            CardOutcome::Parsed(event) => Some(event),
            CardOutcome::Skipped { .. } => None,
        })
    }

    pub fn into_records(self) -> Vec<ExtractedEvent> {
        self.outcomes
            .into_iter()
            .filter_map(|o| match o {
                CardOutcome::Parsed(event) => Some(event),
                CardOutcome::Skipped { .. } => None,
            })
            .collect()
    }

    pub fn parsed_count(&self) -> usize {
        self.records().count()
    }

    pub fn skipped_count(&self) -> usize {
        self.outcomes.len() - self.parsed_count()
    }

    pub fn is_empty(&self) -> bool {
        self.parsed_count() == 0
    }
}
