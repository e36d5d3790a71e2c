//! Browser automation seam
//!
//! The pipeline only talks to these traits. `chromium` provides the real
//! engine; tests drive the pipeline with in-memory pages.

pub mod chromium;

use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::error::Result;

pub use chromium::ChromiumEngine;

/// Summary of the elements matching one selector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Located {
    pub count: usize,
    pub text: Option<String>,
    pub html: Option<String>,
    pub href: Option<String>,
}

impl Located {
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// An embedded frame of the current page. `html` is `None` when the
/// frame document could not be read in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubFrame {
    pub url: String,
    pub html: Option<String>,
}

#[async_trait]
pub trait BrowserEngine: Send + Sync {
    async fn launch_session(&self) -> Result<Box<dyn BrowserSession>>;
}

#[async_trait]
pub trait BrowserSession: Send + Sync {
    async fn open_page(&self) -> Result<Box<dyn PageHandle>>;

    /// Tears the session down. Called once by the run that launched it.
    async fn close(&mut self) -> Result<()>;
}

#[async_trait]
pub trait PageHandle: Send + Sync {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<()>;

    async fn current_url(&self) -> Result<String>;

    async fn content(&self) -> Result<String>;

    async fn locate(&self, selector: &str) -> Result<Located>;

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value>;

    async fn sub_frames(&self) -> Result<Vec<SubFrame>>;

    async fn close(&self) -> Result<()>;
}

/// Poll until `selector` matches or `timeout` elapses.
///
/// Timeout is reported as `Ok(false)`; only engine failures are errors.
pub async fn wait_for_selector(
    page: &dyn PageHandle,
    selector: &str,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<bool> {
    let start = Instant::now();

    loop {
        if !page.locate(selector).await?.is_empty() {
            debug!("Selector '{}' present after {:?}", selector, start.elapsed());
            return Ok(true);
        }

        if start.elapsed() >= timeout {
            debug!("Selector '{}' absent after {:?}", selector, timeout);
            return Ok(false);
        }

        tokio::time::sleep(poll_interval).await;
    }
}

pub async fn scroll_to_bottom(page: &dyn PageHandle) -> Result<()> {
    page.evaluate("window.scrollTo(0, document.body.scrollHeight)")
        .await
        .map(|_| ())
}

/// Click the first element matching `selector`. `Ok(false)` means nothing matched.
pub async fn click_first(page: &dyn PageHandle, selector: &str) -> Result<bool> {
    let script = format!(
        "(() => {{ const el = document.querySelector({}); if (!el) return false; el.click(); return true; }})()",
        js_string(selector)
    );
    Ok(page.evaluate(&script).await?.as_bool().unwrap_or(false))
}

/// Click the first button whose accessible label matches `pattern` (case-insensitive).
pub async fn click_button_labelled(page: &dyn PageHandle, pattern: &str) -> Result<bool> {
    let script = format!(
        r#"(() => {{
    const re = new RegExp({}, "i");
    const buttons = Array.from(document.querySelectorAll('button, [role="button"]'));
    const hit = buttons.find(b => re.test((b.getAttribute("aria-label") || "") + " " + (b.textContent || "")));
    if (!hit) return false;
    hit.click();
    return true;
}})()"#,
        js_string(pattern)
    );
    Ok(page.evaluate(&script).await?.as_bool().unwrap_or(false))
}

/// Best-effort dismissal of a consent dialog: the listed buttons first, then
/// any button whose label matches `label_pattern`.
pub async fn dismiss_consent(page: &dyn PageHandle, selectors: &[String], label_pattern: &str) -> Result<bool> {
    for selector in selectors {
        if click_first(page, selector).await? {
            return Ok(true);
        }
    }

    click_button_labelled(page, label_pattern).await
}

pub(crate) fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn js_string_escapes_quotes() {
        assert_eq!(js_string(r#"a[href*="x"]"#), r#""a[href*=\"x\"]""#);
    }

    #[test]
    fn located_default_is_empty() {
        assert!(Located::default().is_empty());
    }
}
