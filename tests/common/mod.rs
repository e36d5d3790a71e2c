//! In-memory browser and summarizer used by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use scraper::{Html, Selector};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

use ebay_listing_scraper::browser::{BrowserEngine, BrowserSession, Located, PageHandle, SubFrame};
use ebay_listing_scraper::config::PipelineConfig;
use ebay_listing_scraper::error::{AppError, Result};
use ebay_listing_scraper::llm::{Summarizer, SummaryRequest};
use ebay_listing_scraper::models::ListingTarget;
use ebay_listing_scraper::pipeline::PipelineOrchestrator;
use ebay_listing_scraper::strategy::{EbayStrategy, SiteStrategy};

pub const KEYWORD: &str = "vintage camera";
pub const PRIMARY: &str = "www.ebay.com";
pub const FALLBACK: &str = "www.ebay.co.uk";

const BLANK: &str = "<html><head></head><body></body></html>";

#[derive(Clone, Default)]
pub struct FakeDoc {
    pub html: String,
    pub frames: Vec<SubFrame>,
    /// Selectors a click script can hit.
    pub clickable: Vec<String>,
    /// Button labels a label-matching click script can hit.
    pub buttons: Vec<String>,
    /// Replaces `html` after the first successful click.
    pub after_click: Option<String>,
}

impl FakeDoc {
    pub fn page(html: impl Into<String>) -> Self {
        FakeDoc {
            html: html.into(),
            ..Default::default()
        }
    }
}

#[derive(Default)]
struct WebState {
    docs: HashMap<String, FakeDoc>,
    down_hosts: HashSet<String>,
    navigations: Vec<(String, Instant)>,
    page_closes: Vec<Instant>,
    clicks: Vec<String>,
    launches: usize,
    session_closes: usize,
    pages_opened: usize,
    pages_closed: usize,
}

/// A scripted web: registered URLs serve fixed HTML, down hosts always time out.
#[derive(Clone, Default)]
pub struct FakeWeb {
    state: Arc<Mutex<WebState>>,
}

impl FakeWeb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(&self, url: &str, html: String) {
        self.serve_doc(url, FakeDoc::page(html));
    }

    pub fn serve_doc(&self, url: &str, doc: FakeDoc) {
        self.state.lock().unwrap().docs.insert(url.to_string(), doc);
    }

    pub fn take_down(&self, host: &str) {
        self.state.lock().unwrap().down_hosts.insert(host.to_string());
    }

    pub fn navigations(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state.navigations.iter().map(|(url, _)| url.clone()).collect()
    }

    /// When `url` was first requested.
    pub fn navigated_at(&self, url: &str) -> Option<Instant> {
        let state = self.state.lock().unwrap();
        state
            .navigations
            .iter()
            .find(|(u, _)| u.as_str() == url)
            .map(|(_, at)| *at)
    }

    /// Latest page close strictly before `at`.
    pub fn last_page_close_before(&self, at: Instant) -> Option<Instant> {
        let state = self.state.lock().unwrap();
        state.page_closes.iter().copied().filter(|closed| *closed < at).max()
    }

    /// Click targets in the order they were hit.
    pub fn clicks(&self) -> Vec<String> {
        self.state.lock().unwrap().clicks.clone()
    }

    pub fn navigations_to(&self, url: &str) -> usize {
        self.navigations().iter().filter(|u| u.as_str() == url).count()
    }

    pub fn launches(&self) -> usize {
        self.state.lock().unwrap().launches
    }

    pub fn session_closes(&self) -> usize {
        self.state.lock().unwrap().session_closes
    }

    pub fn pages_opened(&self) -> usize {
        self.state.lock().unwrap().pages_opened
    }

    pub fn pages_closed(&self) -> usize {
        self.state.lock().unwrap().pages_closed
    }

    pub fn engine(&self) -> Arc<FakeEngine> {
        Arc::new(FakeEngine { web: self.clone() })
    }

    fn navigate(&self, url: &str) -> Result<FakeDoc> {
        let mut state = self.state.lock().unwrap();
        state.navigations.push((url.to_string(), Instant::now()));

        let host = url::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default();
        if state.down_hosts.contains(&host) {
            return Err(AppError::BrowserError(format!(
                "net::ERR_CONNECTION_TIMED_OUT at {}",
                url
            )));
        }

        Ok(state.docs.get(url).cloned().unwrap_or_else(|| FakeDoc::page(BLANK)))
    }
}

pub struct FakeEngine {
    web: FakeWeb,
}

#[async_trait]
impl BrowserEngine for FakeEngine {
    async fn launch_session(&self) -> Result<Box<dyn BrowserSession>> {
        self.web.state.lock().unwrap().launches += 1;
        Ok(Box::new(FakeSession { web: self.web.clone() }))
    }
}

pub struct FakeSession {
    web: FakeWeb,
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn open_page(&self) -> Result<Box<dyn PageHandle>> {
        self.web.state.lock().unwrap().pages_opened += 1;
        Ok(Box::new(FakePage {
            web: self.web.clone(),
            loaded: Mutex::new(None),
        }))
    }

    async fn close(&mut self) -> Result<()> {
        self.web.state.lock().unwrap().session_closes += 1;
        Ok(())
    }
}

pub struct FakePage {
    web: FakeWeb,
    loaded: Mutex<Option<(String, FakeDoc)>>,
}

impl FakePage {
    fn doc(&self) -> FakeDoc {
        self.loaded
            .lock()
            .unwrap()
            .as_ref()
            .map(|(_, doc)| doc.clone())
            .unwrap_or_else(|| FakeDoc::page(BLANK))
    }

    /// Which scripted element, if any, a click script would hit.
    fn click_target(doc: &FakeDoc, script: &str) -> Option<String> {
        if let Some(selector) = string_argument(script, "document.querySelector(") {
            return doc.clickable.contains(&selector).then_some(selector);
        }
        let pattern = string_argument(script, "new RegExp(")?;
        let label = regex::Regex::new(&format!("(?i){}", pattern)).ok()?;
        doc.buttons
            .iter()
            .find(|text| label.is_match(text))
            .map(|text| format!("button:{}", text))
    }
}

/// The JSON string literal passed right after `call` in a script.
fn string_argument(script: &str, call: &str) -> Option<String> {
    let start = script.find(call)? + call.len();
    serde_json::Deserializer::from_str(&script[start..])
        .into_iter::<String>()
        .next()?
        .ok()
}

fn locate_in(html: &str, selector: &str) -> Result<Located> {
    let selector = Selector::parse(selector)
        .map_err(|e| AppError::BrowserError(format!("SyntaxError: {:?}", e)))?;
    let document = Html::parse_document(html);
    let matches: Vec<_> = document.select(&selector).collect();

    Ok(match matches.first() {
        Some(first) => Located {
            count: matches.len(),
            text: Some(first.text().collect()),
            html: Some(first.inner_html()),
            href: first.value().attr("href").map(str::to_string),
        },
        None => Located::default(),
    })
}

#[async_trait]
impl PageHandle for FakePage {
    async fn navigate(&self, url: &str, _timeout: Duration) -> Result<()> {
        let doc = self.web.navigate(url)?;
        *self.loaded.lock().unwrap() = Some((url.to_string(), doc));
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self
            .loaded
            .lock()
            .unwrap()
            .as_ref()
            .map(|(url, _)| url.clone())
            .unwrap_or_else(|| "about:blank".to_string()))
    }

    async fn content(&self) -> Result<String> {
        Ok(self.doc().html)
    }

    async fn locate(&self, selector: &str) -> Result<Located> {
        locate_in(&self.doc().html, selector)
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value> {
        let target = {
            let mut loaded = self.loaded.lock().unwrap();
            let Some((_, doc)) = loaded.as_mut() else {
                return Ok(serde_json::Value::Bool(false));
            };
            let target = Self::click_target(doc, script);
            if target.is_some() {
                if let Some(html) = doc.after_click.take() {
                    doc.html = html;
                }
            }
            target
        };

        match target {
            Some(target) => {
                self.web.state.lock().unwrap().clicks.push(target);
                Ok(serde_json::Value::Bool(true))
            }
            None => Ok(serde_json::Value::Bool(false)),
        }
    }

    async fn sub_frames(&self) -> Result<Vec<SubFrame>> {
        Ok(self.doc().frames)
    }

    async fn close(&self) -> Result<()> {
        let mut state = self.web.state.lock().unwrap();
        state.pages_closed += 1;
        state.page_closes.push(Instant::now());
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeSummarizer {
    pub fail: bool,
    calls: Mutex<Vec<SummaryRequest>>,
}

impl FakeSummarizer {
    pub fn failing() -> Self {
        FakeSummarizer {
            fail: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Summarizer for FakeSummarizer {
    async fn summarize(&self, request: &SummaryRequest) -> Result<String> {
        self.calls.lock().unwrap().push(request.clone());
        if self.fail {
            return Err(AppError::LlmError("429 Too Many Requests".to_string()));
        }
        let title = request
            .input
            .lines()
            .next()
            .unwrap_or_default()
            .trim_start_matches("Item title: ");
        Ok(format!("Summary of {}", title))
    }
}

pub fn listing_url(host: &str, page: u32) -> String {
    EbayStrategy::new().search_url(
        &ListingTarget {
            host: host.to_string(),
            page_number: page,
        },
        KEYWORD,
    )
}

pub fn item_url(host: &str, page: u32, index: usize) -> String {
    format!("https://{}/itm/{}{:02}", host, page, index)
}

/// A listing page with `count` valid cards using host-relative links.
pub fn listing_html(page: u32, count: usize) -> String {
    let cards: String = (0..count)
        .map(|i| {
            format!(
                r#"<li class="s-card">
                     <div role="heading" aria-level="3" class="s-card__title"><span class="su-styled-text">Camera {page}-{i}</span></div>
                     <span class="s-card__price">${i}.00</span>
                     <a class="su-link" href="/itm/{page}{i:02}">view</a>
                   </li>"#
            )
        })
        .collect();
    format!("<html><body><ul class=\"srp-results\">{}</ul></body></html>", cards)
}

/// Cards that are present but missing their prices.
pub fn priceless_listing_html(count: usize) -> String {
    let cards: String = (0..count)
        .map(|i| {
            format!(
                r#"<li class="s-card"><div role="heading" aria-level="3" class="s-card__title"><span class="su-styled-text">No price {i}</span></div>
                   <a class="su-link" href="/itm/9{i:02}">view</a></li>"#
            )
        })
        .collect();
    format!("<html><body><ul>{}</ul></body></html>", cards)
}

pub fn detail_html(description: &str) -> String {
    format!(
        r#"<html><body><h1>Item</h1><div data-testid="x-item-description"><p>{}</p><p>Free shipping worldwide</p></div></body></html>"#,
        description
    )
}

/// Serve `pages` listing pages of `per_page` items on `host`, each with a description.
pub fn serve_catalogue(web: &FakeWeb, host: &str, pages: u32, per_page: usize) {
    for page in 1..=pages {
        web.serve(&listing_url(host, page), listing_html(page, per_page));
        for i in 0..per_page {
            web.serve(
                &item_url(host, page, i),
                detail_html(&format!("Camera {}-{} in working order", page, i)),
            );
        }
    }
}

pub fn pipeline_config(max_pages: u32) -> PipelineConfig {
    PipelineConfig {
        primary_host: PRIMARY.to_string(),
        fallback_host: FALLBACK.to_string(),
        max_pages,
        ..PipelineConfig::default()
    }
}

pub fn orchestrator(web: &FakeWeb, summarizer: Arc<FakeSummarizer>, max_pages: u32) -> PipelineOrchestrator {
    PipelineOrchestrator::new(web.engine(), summarizer, pipeline_config(max_pages))
}
