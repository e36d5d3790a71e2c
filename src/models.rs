use serde::Serialize;

use crate::error::{AppError, Result};

/// Placeholder for any value that could not be produced.
pub const SENTINEL: &str = "-";

/// Validated input for one extraction run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    keyword: String,
    max_pages: u32,
}

impl SearchQuery {
    pub fn new(keyword: &str, max_pages: u32) -> Result<Self> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(AppError::InvalidRequest("Keyword is required".to_string()));
        }
        if max_pages == 0 {
            return Err(AppError::InvalidRequest("maxPages must be at least 1".to_string()));
        }

        Ok(SearchQuery {
            keyword: keyword.to_string(),
            max_pages,
        })
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn max_pages(&self) -> u32 {
        self.max_pages
    }
}

/// One listing page on a committed host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingTarget {
    pub host: String,
    pub page_number: u32,
}

/// Minimal record scraped from a listing card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemStub {
    pub title: String,
    pub price: String,
    pub link: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub title: String,
    pub price: String,
    pub link: String,
    pub description_text: String,
    pub description_summary: String,
}

impl Item {
    pub fn from_stub(stub: ItemStub, description: Description) -> Self {
        Item {
            title: stub.title,
            price: stub.price,
            link: stub.link,
            description_text: description.text,
            description_summary: description.summary,
        }
    }
}

/// Sanitized description plus its optional summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Description {
    pub text: String,
    pub summary: String,
}

impl Description {
    pub fn unavailable() -> Self {
        Description {
            text: SENTINEL.to_string(),
            summary: SENTINEL.to_string(),
        }
    }
}

/// Outcome of a run as returned to callers. Failures only carry `ok` and `error`.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionResult {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<Item>>,
}

impl ExtractionResult {
    pub fn success(message: String, url: String, items: Vec<Item>) -> Self {
        ExtractionResult {
            ok: true,
            message: Some(message),
            error: None,
            url: Some(url),
            count: Some(items.len()),
            items: Some(items),
        }
    }

    pub fn failure(error: String) -> Self {
        ExtractionResult {
            ok: false,
            message: None,
            error: Some(error),
            url: None,
            count: None,
            items: None,
        }
    }

    pub fn items(&self) -> &[Item] {
        self.items.as_deref().unwrap_or(&[])
    }
}
