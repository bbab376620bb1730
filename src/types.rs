use crate::constants::detail_url;
use serde::{Deserialize, Serialize};

/// One event as persisted in the document store, keyed by `id`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub location: String,
    pub content: String,
    pub organizer: String,
    /// Raw date range text exactly as scraped
    pub date: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub days: Vec<String>,
    pub update_date: String,
    pub image_url: String,
    pub url: String,
}

impl EventRecord {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        let url = detail_url(&id);
        Self {
            id,
            url,
            ..Default::default()
        }
    }
}

/// A record fresh off the listing page, still carrying the site's image reference.
///
/// `source_image` never reaches the store; the pipeline swaps it for the archived URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedEvent {
    pub record: EventRecord,
    pub source_image: String,
}

/// Result of a complete pipeline run, returned to the invoking layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunSummary {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing)]
    #[serde(default)]
    pub new_count: usize,
    #[serde(skip_serializing)]
    #[serde(default)]
    pub total_count: usize,
    #[serde(skip_serializing)]
    #[serde(default)]
    pub skipped_cards: usize,
}

impl RunSummary {
    pub fn nothing_to_add(total_count: usize, skipped_cards: usize) -> Self {
        Self {
            success: true,
            message: format!("Nothing to add: all {total_count} scanned events already stored"),
            new_count: 0,
            total_count,
            skipped_cards,
        }
    }

    pub fn written(new_count: usize, total_count: usize, skipped_cards: usize) -> Self {
        Self {
            success: true,
            message: format!("Added {new_count} new events ({total_count} scanned)"),
            new_count,
            total_count,
            skipped_cards,
        }
    }
}
