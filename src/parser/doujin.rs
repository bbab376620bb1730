use super::{CardOutcome, ExtractionReport, RecordExtractor};
use crate::constants::{
    CARD_SELECTOR, DETAIL_PATH_MARKER, FIELD_ITEM_SELECTOR, FIELD_LABEL_SELECTOR, IMAGE_SELECTOR,
    LINK_SELECTOR, TITLE_SELECTOR, TYPE_SELECTOR, UPDATE_DATE_SELECTOR,
};
use crate::dates::parse_date_range;
use crate::types::{EventRecord, ExtractedEvent};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, warn};

/// Card fields that come from the labelled `<li>` list rather than a dedicated element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardField {
    Date,
    Location,
    Content,
    Organizer,
}

/// Label text (as shown on the site) to field. A list item is assigned to the first entry
/// whose label its own label text contains.
pub const FIELD_LABELS: &[(&str, CardField)] = &[
    ("活動時間", CardField::Date),
    ("活動會場", CardField::Location),
    ("活動內容", CardField::Content),
    ("主辦單位", CardField::Organizer),
];

pub fn field_for_label(label: &str) -> Option<CardField> {
    FIELD_LABELS
        .iter()
        .find(|(text, _)| label.contains(text))
        .map(|(_, field)| *field)
}

struct Selectors {
    card: Selector,
    link: Selector,
    image: Selector,
    title: Selector,
    event_type: Selector,
    field_item: Selector,
    field_label: Selector,
    update_date: Selector,
}

static SELECTORS: Lazy<Selectors> = Lazy::new(|| {
    let parse = |s: &str| Selector::parse(s).expect("listing selectors are static and valid");
    Selectors {
        card: parse(CARD_SELECTOR),
        link: parse(LINK_SELECTOR),
        image: parse(IMAGE_SELECTOR),
        title: parse(TITLE_SELECTOR),
        event_type: parse(TYPE_SELECTOR),
        field_item: parse(FIELD_ITEM_SELECTOR),
        field_label: parse(FIELD_LABEL_SELECTOR),
        update_date: parse(UPDATE_DATE_SELECTOR),
    }
});

/// Parser for the `/events/alist` listing page.
#[derive(Debug, Default, Clone)]
pub struct DoujinListingParser;

impl DoujinListingParser {
    pub fn new() -> Self {
        Self
    }

    fn parse_card(card: ElementRef<'_>, index: usize) -> Result<ExtractedEvent, String> {
        let s = &*SELECTORS;

        let href = first_attr(card, &s.link, "href").unwrap_or_default();
        let id = derive_id(&href, index)?;

        let mut record = EventRecord::new(id);
        record.title = first_text(card, &s.title);
        record.event_type = first_text(card, &s.event_type);

        for item in card.select(&s.field_item) {
            let label = first_text(item, &s.field_label);
            let Some(field) = field_for_label(&label) else {
                continue;
            };
            let value = element_text(item).replacen(&label, "", 1).trim().to_string();
            match field {
                CardField::Date => {
                    let range = parse_date_range(&value);
                    record.date = value;
                    record.start_date = range.start_date;
                    record.end_date = range.end_date;
                    record.days = range.days;
                }
                CardField::Location => record.location = value,
                CardField::Content => record.content = value,
                CardField::Organizer => record.organizer = value,
            }
        }

        record.update_date = first_text(card, &s.update_date);

        Ok(ExtractedEvent {
            source_image: first_attr(card, &s.image, "src").unwrap_or_default(),
            record,
        })
    }
}

impl RecordExtractor for DoujinListingParser {
    fn extract(&self, html: &str) -> ExtractionReport {
        debug!("DoujinListingParser: start html_len={}", html.len());
        let document = Html::parse_document(html);

        let outcomes: Vec<CardOutcome> = document
            .select(&SELECTORS.card)
            .enumerate()
            .map(|(i, card)| match Self::parse_card(card, i) {
                Ok(event) => CardOutcome::Parsed(event),
                Err(reason) => {
                    warn!("Failed to parse event card {}: {}", i + 1, reason);
                    CardOutcome::Skipped {
                        index: i + 1,
                        reason,
                    }
                }
            })
            .collect();

        let report = ExtractionReport { outcomes };
        info!(
            "DoujinListingParser: parsed {} events ({} cards skipped)",
            report.parsed_count(),
            report.skipped_count()
        );
        report
    }
}

/// Event id from a detail link such as `/events/info/23456`.
///
/// Links without the detail marker (or with nothing after it) fall back to
/// `unknown_<index>`; a segment that cannot serve as a document key is an error.
fn derive_id(href: &str, index: usize) -> Result<String, String> {
    let fallback = || format!("unknown_{index}");
    let Some((_, tail)) = href.split_once(DETAIL_PATH_MARKER) else {
        return Ok(fallback());
    };
    let segment = tail
        .split(|c: char| c == '?' || c == '#')
        .next()
        .unwrap_or_default()
        .trim()
        .trim_end_matches('/');
    if segment.is_empty() {
        return Ok(fallback());
    }
    if segment.contains('/') || segment.chars().any(char::is_whitespace) {
        return Err(format!("unusable event id '{segment}' in link '{href}'"));
    }
    Ok(segment.to_string())
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>()
}

fn first_text(scope: ElementRef<'_>, selector: &Selector) -> String {
    scope
        .select(selector)
        .next()
        .map(|el| element_text(el).trim().to_string())
        .unwrap_or_default()
}

fn first_attr(scope: ElementRef<'_>, selector: &Selector, attr: &str) -> Option<String> {
    scope
        .select(selector)
        .next()
        .and_then(|el| el.value().attr(attr))
        .map(|v| v.trim().to_string())
}
