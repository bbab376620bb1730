#![allow(dead_code)]

use async_trait::async_trait;
use doujin_scraper::app::ports::{HttpClientPort, HttpGetResult};
use doujin_scraper::constants::LISTING_URL;
use doujin_scraper::infra::{InMemoryDocumentStore, InMemoryObjectStore};
use doujin_scraper::Pipeline;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub const PUBLIC_BASE: &str = "https://storage.example/doujin";

/// Canned responses keyed by URL; anything unknown fails like a network error.
#[derive(Default)]
pub struct FakeSite {
    pages: Mutex<HashMap<String, HttpGetResult>>,
    requests: Mutex<Vec<String>>,
}

impl FakeSite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(&self, url: &str, status: u16, content_type: &str, body: impl Into<Vec<u8>>) {
        self.pages.lock().unwrap().insert(
            url.to_string(),
            HttpGetResult {
                status,
                bytes: body.into(),
                content_type: content_type.to_string(),
            },
        );
    }

    pub fn serve_listing(&self, html: &str) {
        self.serve(LISTING_URL, 200, "text/html; charset=utf-8", html);
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpClientPort for FakeSite {
    async fn get(&self, url: &str) -> Result<HttpGetResult, String> {
        self.requests.lock().unwrap().push(url.to_string());
        self.pages
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| format!("error sending request for url ({url}): connection refused"))
    }
}

pub struct Harness {
    pub site: Arc<FakeSite>,
    pub store: Arc<InMemoryDocumentStore>,
    pub objects: Arc<InMemoryObjectStore>,
    pub pipeline: Arc<Pipeline>,
}

pub fn harness() -> Harness {
    let site = Arc::new(FakeSite::new());
    let store = Arc::new(InMemoryDocumentStore::new());
    let objects = Arc::new(InMemoryObjectStore::new(PUBLIC_BASE));
    let pipeline = Arc::new(
        Pipeline::new(site.clone(), store.clone(), objects.clone()).with_concurrency(2),
    );
    Harness {
        site,
        store,
        objects,
        pipeline,
    }
}

pub fn event_card(id: &str, title: &str, image: &str, date: &str) -> String {
    format!(
        r#"<div class="event_smi_info">
            <div class="event_img"><a href="/events/info/{id}"><img src="{image}"></a></div>
            <div class="list_smi_title"><span class="etype1">綜合</span><a href="/events/info/{id}">{title}</a></div>
            <ul class="list_smi_lsit">
                <li><span class="label">活動時間：</span>{date}</li>
                <li><span class="label">活動會場：</span>台大體育館</li>
                <li><span class="label">主辦單位：</span>同人社團聯合</li>
            </ul>
            <div class="update_date">2023-12-20 更新</div>
        </div>"#
    )
}

pub fn listing_page(cards: &[String]) -> String {
    format!(
        r#"<!DOCTYPE html><html><head><title>活動列表</title></head>
        <body><div class="event_list">{}</div></body></html>"#,
        cards.join("\n")
    )
}
