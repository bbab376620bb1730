//! Source site constants. Everything coupled to the listing page's markup lives here
//! and in the extractor; a markup change on the site should only touch these two places.

pub const SITE_ORIGIN: &str = "https://www.doujin.com.tw";
pub const LISTING_URL: &str = "https://www.doujin.com.tw/events/alist";
pub const DETAIL_PATH_MARKER: &str = "/events/info/";

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

// Firestore-style collection holding one document per event id
pub const EVENTS_COLLECTION: &str = "events";
// Object store prefix for archived cover images
pub const IMAGE_PREFIX: &str = "events";
pub const DEFAULT_IMAGE_EXTENSION: &str = ".png";

pub const DEFAULT_CONCURRENCY: usize = 4;

// Selectors
pub const CARD_SELECTOR: &str = ".event_smi_info";
pub const LINK_SELECTOR: &str = ".event_img a";
pub const IMAGE_SELECTOR: &str = ".event_img img";
pub const TITLE_SELECTOR: &str = ".list_smi_title a";
pub const TYPE_SELECTOR: &str = ".list_smi_title .etype1";
pub const FIELD_ITEM_SELECTOR: &str = ".list_smi_lsit li";
pub const FIELD_LABEL_SELECTOR: &str = ".label";
pub const UPDATE_DATE_SELECTOR: &str = ".update_date";

/// Build the canonical detail-page URL for an event id.
pub fn detail_url(id: &str) -> String {
    format!("{}{}{}", SITE_ORIGIN, DETAIL_PATH_MARKER, id)
}
