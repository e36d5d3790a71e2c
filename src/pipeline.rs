//! End-to-end extraction run
//!
//! One run owns one browser session from launch to teardown. Failover to the
//! fallback host only happens when the first listing request exhausts its
//! retries; after that the host is fixed for the rest of the run.

use std::sync::Arc;
use tracing::{error, info, warn};

use crate::browser::{BrowserEngine, BrowserSession, PageHandle};
use crate::config::PipelineConfig;
use crate::detail::ItemDetailExtractor;
use crate::error::{AppError, Result};
use crate::listing::ListingPaginator;
use crate::llm::Summarizer;
use crate::models::{ExtractionResult, Item, SearchQuery};
use crate::navigation::NavigationRetrier;
use crate::strategy::{EbayStrategy, SiteStrategy};
use crate::summarize::SummarizationGate;

/// Hands out summarization eligibility to the first `limit` items of a run.
#[derive(Debug)]
pub struct SummaryBudget {
    limit: usize,
    used: usize,
}

impl SummaryBudget {
    pub fn new(limit: usize) -> Self {
        SummaryBudget { limit, used: 0 }
    }

    /// Consumes one slot per item, whether or not the item ends up summarized.
    pub fn try_take(&mut self) -> bool {
        let allowed = self.used < self.limit;
        self.used += 1;
        allowed
    }
}

pub struct PipelineOrchestrator {
    engine: Arc<dyn BrowserEngine>,
    strategy: Arc<dyn SiteStrategy>,
    summarizer: Arc<dyn Summarizer>,
    config: PipelineConfig,
}

impl PipelineOrchestrator {
    pub fn new(
        engine: Arc<dyn BrowserEngine>,
        summarizer: Arc<dyn Summarizer>,
        config: PipelineConfig,
    ) -> Self {
        PipelineOrchestrator {
            engine,
            strategy: Arc::new(EbayStrategy::new()),
            summarizer,
            config,
        }
    }

    /// Run against another site with the same pipeline.
    pub fn with_strategy(mut self, strategy: Arc<dyn SiteStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    /// Validate `keyword` and run. An invalid keyword never launches a browser.
    pub async fn run_keyword(&self, keyword: &str) -> ExtractionResult {
        match SearchQuery::new(keyword, self.config.max_pages) {
            Ok(query) => self.run(&query).await,
            Err(e) => ExtractionResult::failure(e.to_string()),
        }
    }

    pub async fn run(&self, query: &SearchQuery) -> ExtractionResult {
        info!("start keyword={:?} max_pages={}", query.keyword(), query.max_pages());

        let mut session = match self.engine.launch_session().await {
            Ok(session) => session,
            Err(e) => {
                error!("Failed to launch browser session: {}", e);
                return ExtractionResult::failure(e.to_string());
            }
        };

        let outcome = self.run_in_session(session.as_ref(), query).await;

        if let Err(e) = session.close().await {
            warn!("Browser session did not close cleanly: {}", e);
        }

        match outcome {
            Ok(result) => result,
            Err(e) => {
                error!("Extraction failed for {:?}: {}", query.keyword(), e);
                ExtractionResult::failure(e.to_string())
            }
        }
    }

    async fn run_in_session(&self, session: &dyn BrowserSession, query: &SearchQuery) -> Result<ExtractionResult> {
        let listing_page = session.open_page().await?;
        let outcome = self.traverse(session, listing_page.as_ref(), query).await;

        if let Err(e) = listing_page.close().await {
            warn!("Failed to close listing page: {}", e);
        }

        outcome
    }

    async fn traverse(
        &self,
        session: &dyn BrowserSession,
        listing_page: &dyn PageHandle,
        query: &SearchQuery,
    ) -> Result<ExtractionResult> {
        let extractor = self.detail_extractor();

        let mut paginator = self.paginator(query, &self.config.primary_host);
        let mut next = match paginator.next_page(listing_page).await {
            Ok(page) => page,
            Err(e @ AppError::NavigationError { .. }) => {
                warn!("{}; switching to fallback domain {}", e, self.config.fallback_host);
                paginator = self.paginator(query, &self.config.fallback_host);
                paginator.next_page(listing_page).await?
            }
            Err(e) => return Err(e),
        };
        let url = paginator.first_page_url();

        let mut budget = SummaryBudget::new(self.config.summary_budget);
        let mut items = Vec::new();

        while let Some(page) = next {
            info!(
                "Visiting {} item(s) from page {} ({})",
                page.stubs.len(),
                page.target.page_number,
                page.url
            );
            for stub in page.stubs {
                let allowed = budget.try_take();
                let description = extractor
                    .extract(session, &stub.title, &stub.link, allowed)
                    .await;
                items.push(Item::from_stub(stub, description));
            }

            next = match paginator.next_page(listing_page).await {
                Ok(page) => page,
                Err(e) => {
                    warn!(
                        "Stopping at page {} on {}: {}",
                        paginator.page_number(),
                        paginator.host(),
                        e
                    );
                    None
                }
            };
        }

        info!("Collected {} item(s) from {}", items.len(), paginator.host());
        Ok(ExtractionResult::success(
            format!("Opened {} OK for \"{}\"", self.strategy.name(), query.keyword()),
            url,
            items,
        ))
    }

    fn paginator(&self, query: &SearchQuery, host: &str) -> ListingPaginator {
        ListingPaginator::new(
            self.strategy.clone(),
            NavigationRetrier::from_config(&self.config),
            self.config.timings.clone(),
            query,
            host,
        )
    }

    fn detail_extractor(&self) -> ItemDetailExtractor {
        ItemDetailExtractor::new(
            self.strategy.clone(),
            NavigationRetrier::from_config(&self.config),
            self.config.timings.clone(),
            SummarizationGate::new(self.summarizer.clone()),
            self.config.description_limit,
        )
    }
}
