//! Item detail extraction
//!
//! Each visit gets its own short-lived page. Nothing here fails the run:
//! every miss or error ends in sentinel values for that item.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::browser::{click_first, dismiss_consent, scroll_to_bottom, wait_for_selector, BrowserSession, PageHandle};
use crate::config::Timings;
use crate::error::Result;
use crate::models::{Description, SENTINEL};
use crate::navigation::NavigationRetrier;
use crate::sanitize::sanitize;
use crate::strategy::SiteStrategy;
use crate::summarize::SummarizationGate;

/// Where the description text was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptionSource {
    Selector(String),
    Frame(String),
}

pub struct ItemDetailExtractor {
    strategy: Arc<dyn SiteStrategy>,
    retrier: NavigationRetrier,
    timings: Timings,
    gate: SummarizationGate,
    description_limit: usize,
}

impl ItemDetailExtractor {
    pub fn new(
        strategy: Arc<dyn SiteStrategy>,
        retrier: NavigationRetrier,
        timings: Timings,
        gate: SummarizationGate,
        description_limit: usize,
    ) -> Self {
        ItemDetailExtractor {
            strategy,
            retrier,
            timings,
            gate,
            description_limit,
        }
    }

    /// Visit `link` and produce its sanitized description and, when
    /// `summarize` is set, a summary.
    pub async fn extract(
        &self,
        session: &dyn BrowserSession,
        title: &str,
        link: &str,
        summarize: bool,
    ) -> Description {
        let page = match session.open_page().await {
            Ok(page) => page,
            Err(e) => {
                warn!("Could not open detail page for {}: {}", link, e);
                return Description::unavailable();
            }
        };

        let found = self.find_description(page.as_ref(), link).await;

        if let Err(e) = page.close().await {
            debug!("Failed to close detail page for {}: {}", link, e);
        }

        let text = match found {
            Ok(Some((source, text))) => {
                debug!("Description for {} found via {:?}", link, source);
                text
            }
            Ok(None) => {
                info!("No description found for {}", link);
                return Description::unavailable();
            }
            Err(e) => {
                warn!("Detail extraction failed for {}: {}", link, e);
                return Description::unavailable();
            }
        };

        let summary = self.gate.summarize(title, &text, summarize).await;

        Description { text, summary }
    }

    /// Sanitized description text. `Ok(None)` means the page loaded but no
    /// source held any readable text.
    async fn find_description(
        &self,
        page: &dyn PageHandle,
        link: &str,
    ) -> Result<Option<(DescriptionSource, String)>> {
        self.retrier.navigate(page, link).await?;

        tokio::time::sleep(self.timings.quiesce).await;
        let consent = self.strategy.consent_selectors();
        match dismiss_consent(page, &consent.buttons, &consent.button_label).await {
            Ok(true) => info!("consent clicked"),
            Ok(false) => {}
            Err(e) => debug!("Consent dismissal failed: {}", e),
        }

        match self.expand_description(page).await {
            Ok(true) => tokio::time::sleep(self.timings.expand_settle).await,
            Ok(false) => {}
            Err(e) => debug!("Expand control failed: {}", e),
        }

        if let Err(e) = scroll_to_bottom(page).await {
            debug!("Scroll failed on detail page: {}", e);
        }
        tokio::time::sleep(self.timings.after_scroll).await;

        if let Some(found) = self.locate_in_dom(page).await? {
            return Ok(Some(found));
        }

        self.locate_in_frames(page).await
    }

    async fn expand_description(&self, page: &dyn PageHandle) -> Result<bool> {
        for selector in &self.strategy.detail_selectors().expand {
            if click_first(page, selector).await? {
                debug!("Expanded description via '{}'", selector);
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Candidate selectors in priority order; the first match with readable
    /// text wins. A container holding only the description frame does not.
    async fn locate_in_dom(&self, page: &dyn PageHandle) -> Result<Option<(DescriptionSource, String)>> {
        let selectors = &self.strategy.detail_selectors().description;

        let any_candidate = selectors.join(", ");
        if !any_candidate.is_empty() {
            wait_for_selector(
                page,
                &any_candidate,
                self.timings.description_wait,
                self.timings.poll_interval,
            )
            .await?;
        }

        for selector in selectors {
            match page.locate(selector).await {
                Ok(located) => {
                    if let Some(text) = located.html.and_then(|html| self.readable(&html)) {
                        return Ok(Some((DescriptionSource::Selector(selector.clone()), text)));
                    }
                }
                Err(e) => debug!("Description selector '{}' failed: {}", selector, e),
            }
        }

        Ok(None)
    }

    /// Embedded description documents, skipping empty shells. Frames that
    /// cannot be read in place are loaded directly in the detail page.
    async fn locate_in_frames(&self, page: &dyn PageHandle) -> Result<Option<(DescriptionSource, String)>> {
        let frames = page.sub_frames().await?;

        for frame in frames
            .into_iter()
            .filter(|frame| self.strategy.is_description_frame(&frame.url))
        {
            let html = match frame.html {
                Some(html) => html,
                None => {
                    debug!("Frame {} not readable in place, loading it directly", frame.url);
                    if let Err(e) = self.retrier.navigate(page, &frame.url).await {
                        warn!("Could not load description frame: {}", e);
                        continue;
                    }
                    page.content().await?
                }
            };

            match self.readable(&html) {
                Some(text) => return Ok(Some((DescriptionSource::Frame(frame.url), text))),
                None => debug!("Frame {} has no readable text", frame.url),
            }
        }

        Ok(None)
    }

    fn readable(&self, html: &str) -> Option<String> {
        let text = sanitize(html, self.description_limit);
        (text != SENTINEL).then_some(text)
    }
}
