//! Site-specific extraction strategies
//!
//! Selectors change whenever the target site reshuffles its markup, so they
//! live behind `SiteStrategy` instead of inside the paginator and extractor.
//! Every list is in priority order.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::ListingTarget;

#[derive(Debug, Clone)]
pub struct ListingSelectors {
    /// Presence of this marker means the page has results at all.
    pub results_marker: String,
    /// One result card; title, price and link are looked up inside it.
    pub card: String,
    pub title: String,
    pub price: String,
}

#[derive(Debug, Clone)]
pub struct DetailSelectors {
    pub description: Vec<String>,
    pub expand: Vec<String>,
}

/// Cookie or privacy dialogs that can cover both listing and detail pages.
#[derive(Debug, Clone)]
pub struct ConsentSelectors {
    pub buttons: Vec<String>,
    /// Case-insensitive pattern matched against button labels.
    pub button_label: String,
}

pub trait SiteStrategy: Send + Sync {
    fn name(&self) -> &str;

    fn search_url(&self, target: &ListingTarget, keyword: &str) -> String;

    fn listing_selectors(&self) -> &ListingSelectors;

    fn link_selectors(&self) -> &[String];

    fn detail_selectors(&self) -> &DetailSelectors;

    fn consent_selectors(&self) -> &ConsentSelectors;

    fn is_description_frame(&self, frame_url: &str) -> bool;

    /// Cards that are ads or placeholders rather than real listings.
    fn is_placeholder_title(&self, _title: &str) -> bool {
        false
    }
}

static EBAY_DESCRIPTION_FRAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(ebaydesc\.|itm-desc|/desc/|description)").expect("valid description frame pattern")
});

static EBAY_PLACEHOLDER_TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)shop on ebay").expect("valid placeholder pattern"));

#[derive(Debug, Clone)]
pub struct EbayStrategy {
    listing: ListingSelectors,
    links: Vec<String>,
    detail: DetailSelectors,
    consent: ConsentSelectors,
}

impl Default for EbayStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl EbayStrategy {
    pub fn new() -> Self {
        let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        EbayStrategy {
            listing: ListingSelectors {
                results_marker: "li.s-card, li.s-item".to_string(),
                card: "li.s-card, li.s-item".to_string(),
                title: r#"div[role="heading"][aria-level="3"].s-card__title > .su-styled-text, .s-item__title"#
                    .to_string(),
                price: ".s-card__price, .s-item__price".to_string(),
            },
            links: strings(&[
                r#"a.su-link[href*="/itm/"]"#,
                "a.s-item__link",
                r#"a[href*="/itm/"]"#,
                "a[href]",
            ]),
            detail: DetailSelectors {
                description: strings(&[
                    r#"[data-testid="x-item-description"]"#,
                    "div.x-item-description",
                    "#viTabs_0_is",
                    "#desc_div",
                    "#ds_div",
                    ".d-item-description",
                ]),
                expand: strings(&[
                    r#"button[aria-label*="See full description"]"#,
                    r#"[data-testid="x-item-description"] button[aria-expanded="false"]"#,
                    ".x-item-description-child button",
                ]),
            },
            consent: ConsentSelectors {
                buttons: strings(&["#gdpr-banner-accept", "button#consent-banner-accept"]),
                button_label: "accept".to_string(),
            },
        }
    }
}

impl SiteStrategy for EbayStrategy {
    fn name(&self) -> &str {
        "eBay"
    }

    fn search_url(&self, target: &ListingTarget, keyword: &str) -> String {
        format!(
            "https://{}/sch/i.html?_nkw={}&_pgn={}",
            target.host,
            urlencoding::encode(keyword),
            target.page_number
        )
    }

    fn listing_selectors(&self) -> &ListingSelectors {
        &self.listing
    }

    fn link_selectors(&self) -> &[String] {
        &self.links
    }

    fn detail_selectors(&self) -> &DetailSelectors {
        &self.detail
    }

    fn consent_selectors(&self) -> &ConsentSelectors {
        &self.consent
    }

    fn is_description_frame(&self, frame_url: &str) -> bool {
        EBAY_DESCRIPTION_FRAME.is_match(frame_url)
    }

    fn is_placeholder_title(&self, title: &str) -> bool {
        EBAY_PLACEHOLDER_TITLE.is_match(title)
    }
}
