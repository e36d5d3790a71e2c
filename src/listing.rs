//! Search result pagination
//!
//! `ListingPaginator` is a small state machine: every `next_page` call is one
//! listing page (pace, navigate, wait for results, settle, extract) and
//! `Ok(None)` means the walk is over.

use rand::Rng;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::browser::{dismiss_consent, scroll_to_bottom, wait_for_selector, PageHandle};
use crate::config::Timings;
use crate::error::{AppError, Result};
use crate::models::{ItemStub, ListingTarget, SearchQuery};
use crate::navigation::NavigationRetrier;
use crate::strategy::SiteStrategy;

/// Stubs extracted from one listing page.
#[derive(Debug, Clone)]
pub struct ListingPage {
    pub target: ListingTarget,
    pub url: String,
    pub stubs: Vec<ItemStub>,
}

pub struct ListingPaginator {
    strategy: Arc<dyn SiteStrategy>,
    retrier: NavigationRetrier,
    timings: Timings,
    keyword: String,
    host: String,
    max_pages: u32,
    next_page: u32,
    finished: bool,
}

impl ListingPaginator {
    pub fn new(
        strategy: Arc<dyn SiteStrategy>,
        retrier: NavigationRetrier,
        timings: Timings,
        query: &SearchQuery,
        host: &str,
    ) -> Self {
        ListingPaginator {
            strategy,
            retrier,
            timings,
            keyword: query.keyword().to_string(),
            host: host.to_string(),
            max_pages: query.max_pages(),
            next_page: 1,
            finished: false,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Number of the page the next call will visit.
    pub fn page_number(&self) -> u32 {
        self.next_page
    }

    pub fn is_finished(&self) -> bool {
        self.finished || self.next_page > self.max_pages
    }

    /// URL of the first listing page on the committed host.
    pub fn first_page_url(&self) -> String {
        self.strategy.search_url(
            &ListingTarget {
                host: self.host.clone(),
                page_number: 1,
            },
            &self.keyword,
        )
    }

    /// Visit the next listing page.
    ///
    /// Consent dialogs are dismissed best effort before waiting for results.
    /// A missing results marker or a page without usable stubs ends the walk
    /// with `Ok(None)`. Navigation exhaustion is returned as an error.
    pub async fn next_page(&mut self, page: &dyn PageHandle) -> Result<Option<ListingPage>> {
        if self.is_finished() {
            return Ok(None);
        }

        let target = ListingTarget {
            host: self.host.clone(),
            page_number: self.next_page,
        };

        if target.page_number > 1 {
            self.pace().await;
        }

        let url = self.strategy.search_url(&target, &self.keyword);
        info!("Listing page {} on {}: {}", target.page_number, target.host, url);
        self.retrier.navigate(page, &url).await?;

        let consent = self.strategy.consent_selectors();
        match dismiss_consent(page, &consent.buttons, &consent.button_label).await {
            Ok(true) => info!("consent clicked on listing page {}", target.page_number),
            Ok(false) => {}
            Err(e) => debug!("Consent dismissal failed on listing page: {}", e),
        }

        let selectors = self.strategy.listing_selectors();
        let has_results = wait_for_selector(
            page,
            &selectors.results_marker,
            self.timings.results_wait,
            self.timings.poll_interval,
        )
        .await?;
        if !has_results {
            info!("No results marker on page {}; end of results", target.page_number);
            self.finished = true;
            return Ok(None);
        }

        tokio::time::sleep(self.timings.quiesce).await;
        if let Err(e) = scroll_to_bottom(page).await {
            debug!("Scroll failed on listing page: {}", e);
        }
        tokio::time::sleep(self.timings.after_scroll).await;

        let page_url = match page.current_url().await {
            Ok(current) if current.starts_with("http") => current,
            Ok(_) => url.clone(),
            Err(e) => {
                warn!("Could not read listing page URL, using request URL: {}", e);
                url.clone()
            }
        };
        let html = page.content().await?;
        let stubs = parse_listing(&html, &page_url, self.strategy.as_ref())?;

        info!("Page {} yielded {} item(s)", target.page_number, stubs.len());
        if stubs.is_empty() {
            self.finished = true;
            return Ok(None);
        }

        self.next_page += 1;
        Ok(Some(ListingPage {
            target,
            url: page_url,
            stubs,
        }))
    }

    async fn pace(&self) {
        let delay = self.timings.page_pacing + Duration::from_millis(jitter_ms(self.timings.page_jitter_ms));
        debug!("Pacing {:?} before next listing page", delay);
        tokio::time::sleep(delay).await;
    }
}

fn jitter_ms(max: u64) -> u64 {
    if max == 0 {
        return 0;
    }
    rand::rng().random_range(0..=max)
}

/// Extract item stubs from listing HTML.
///
/// Cards without a title, price or usable link are dropped, as are
/// placeholder cards and repeated links. Links are resolved against
/// `page_url`.
pub fn parse_listing(html: &str, page_url: &str, strategy: &dyn SiteStrategy) -> Result<Vec<ItemStub>> {
    let base = Url::parse(page_url)
        .map_err(|e| AppError::ParseError(format!("Invalid listing page URL {}: {}", page_url, e)))?;

    let selectors = strategy.listing_selectors();
    let card_sel = parse_selector(&selectors.card)?;
    let title_sel = parse_selector(&selectors.title)?;
    let price_sel = parse_selector(&selectors.price)?;
    let links = strategy
        .link_selectors()
        .iter()
        .map(|s| parse_selector(s))
        .collect::<Result<Vec<_>>>()?;

    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut stubs = Vec::new();

    for element in document.select(&card_sel) {
        let Some(title) = first_text(element, &title_sel) else {
            continue;
        };
        if strategy.is_placeholder_title(&title) {
            continue;
        }
        let Some(price) = first_text(element, &price_sel) else {
            continue;
        };
        let Some(link) = resolve_link(element, &links, &base) else {
            debug!("Dropping '{}': no usable link", title);
            continue;
        };
        if !seen.insert(link.clone()) {
            continue;
        }

        stubs.push(ItemStub { title, price, link });
    }

    Ok(stubs)
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| AppError::ParseError(format!("Invalid selector '{}': {:?}", selector, e)))
}

fn first_text(element: ElementRef<'_>, selector: &Selector) -> Option<String> {
    element
        .select(selector)
        .map(|node| normalize_text(&node.text().collect::<String>()))
        .find(|text| !text.is_empty())
}

fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First selector in priority order that yields a followable href wins.
fn resolve_link(element: ElementRef<'_>, selectors: &[Selector], base: &Url) -> Option<String> {
    selectors.iter().find_map(|selector| {
        element
            .select(selector)
            .filter_map(|a| a.value().attr("href"))
            .map(str::trim)
            .find(|href| is_followable(href))
            .and_then(|href| base.join(href).ok())
            .filter(|url| matches!(url.scheme(), "http" | "https"))
            .map(String::from)
    })
}

fn is_followable(href: &str) -> bool {
    !href.is_empty() && !href.starts_with('#') && !href.to_ascii_lowercase().starts_with("javascript:")
}
