//! chromiumoxide-backed browser engine
//!
//! One `ChromiumSession` per extraction run: its own Chrome process, its own
//! profile directory and a tracked CDP handler task.

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::{self, JoinHandle};
use tracing::{info, warn};

use super::{js_string, BrowserEngine, BrowserSession, Located, PageHandle, SubFrame};
use crate::error::{AppError, Result};

pub const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

const SUB_FRAMES_SCRIPT: &str = r#"Array.from(document.querySelectorAll("iframe")).map(f => {
    let html = null;
    try {
        const doc = f.contentDocument;
        if (doc && doc.documentElement) html = doc.documentElement.outerHTML;
    } catch (e) {}
    return { url: f.src || "", html };
})"#;

#[derive(Debug, Clone)]
pub struct ChromiumEngine {
    headless: bool,
}

impl ChromiumEngine {
    pub fn new(headless: bool) -> Self {
        ChromiumEngine { headless }
    }
}

#[async_trait]
impl BrowserEngine for ChromiumEngine {
    async fn launch_session(&self) -> Result<Box<dyn BrowserSession>> {
        let user_data_dir = std::env::temp_dir().join(format!(
            "ebay_scraper_chrome_{}_{}",
            std::process::id(),
            rand::random::<u32>()
        ));
        std::fs::create_dir_all(&user_data_dir).map_err(|e| {
            AppError::BrowserError(format!("Failed to create user data directory: {}", e))
        })?;

        let mut builder = BrowserConfig::builder()
            .request_timeout(Duration::from_secs(60))
            .window_size(1280, 800)
            .user_data_dir(user_data_dir.clone())
            .arg(format!("--user-agent={}", CHROME_USER_AGENT))
            .arg("--lang=en-US")
            .arg("--disable-blink-features=AutomationControlled")
            // Lets the description iframe be read from the parent document.
            .arg("--disable-web-security")
            .arg("--disable-features=IsolateOrigins,site-per-process")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--no-sandbox")
            .arg("--disable-notifications")
            .arg("--mute-audio");
        if !self.headless {
            builder = builder.with_head();
        }
        let config = builder
            .build()
            .map_err(|e| AppError::BrowserError(format!("Failed to build browser config: {}", e)))?;

        info!("Launching browser (headless: {})", self.headless);
        let (browser, mut handler) = Browser::launch(config).await?;

        let handler_task = task::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("Browser handler error: {:?}", e);
                }
            }
        });

        Ok(Box::new(ChromiumSession {
            browser,
            handler: handler_task,
            user_data_dir: Some(user_data_dir),
        }))
    }
}

pub struct ChromiumSession {
    browser: Browser,
    handler: JoinHandle<()>,
    user_data_dir: Option<PathBuf>,
}

impl ChromiumSession {
    fn cleanup_temp_dir(&mut self) {
        if let Some(path) = self.user_data_dir.take() {
            if let Err(e) = std::fs::remove_dir_all(&path) {
                warn!("Failed to clean up temp directory {}: {}", path.display(), e);
            }
        }
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn open_page(&self) -> Result<Box<dyn PageHandle>> {
        let page = self.browser.new_page("about:blank").await?;
        Ok(Box::new(ChromiumPage { page }))
    }

    async fn close(&mut self) -> Result<()> {
        info!("Closing browser session");
        let closed = self.browser.close().await.map(|_| ());
        if let Err(e) = self.browser.wait().await {
            warn!("Failed waiting for browser exit: {}", e);
        }
        self.handler.abort();
        self.cleanup_temp_dir();
        closed.map_err(AppError::from)
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        self.handler.abort();
        if self.user_data_dir.is_some() {
            warn!("Browser session dropped without close - removing temp dir in Drop");
            self.cleanup_temp_dir();
        }
    }
}

pub struct ChromiumPage {
    page: Page,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LocatedJs {
    count: usize,
    text: Option<String>,
    html: Option<String>,
    href: Option<String>,
}

#[async_trait]
impl PageHandle for ChromiumPage {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<()> {
        match tokio::time::timeout(timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(AppError::BrowserError(format!(
                "Navigation timed out after {:?}",
                timeout
            ))),
        }
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self
            .page
            .url()
            .await?
            .unwrap_or_else(|| "about:blank".to_string()))
    }

    async fn content(&self) -> Result<String> {
        Ok(self.page.content().await?)
    }

    async fn locate(&self, selector: &str) -> Result<Located> {
        let script = format!(
            r#"(() => {{
    const nodes = document.querySelectorAll({});
    const first = nodes[0];
    return {{
        count: nodes.length,
        text: first ? (first.innerText || first.textContent || "") : null,
        html: first ? first.innerHTML : null,
        href: first ? first.getAttribute("href") : null,
    }};
}})()"#,
            js_string(selector)
        );
        let value = self.evaluate(&script).await?;
        let located: LocatedJs = serde_json::from_value(value)
            .map_err(|e| AppError::ParseError(format!("Unexpected locate result: {}", e)))?;

        Ok(Located {
            count: located.count,
            text: located.text,
            html: located.html,
            href: located.href,
        })
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value> {
        let result = self.page.evaluate(script).await?;
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn sub_frames(&self) -> Result<Vec<SubFrame>> {
        #[derive(Deserialize)]
        struct FrameJs {
            url: String,
            html: Option<String>,
        }

        let value = self.evaluate(SUB_FRAMES_SCRIPT).await?;
        let frames: Vec<FrameJs> = serde_json::from_value(value)
            .map_err(|e| AppError::ParseError(format!("Unexpected frame list: {}", e)))?;

        Ok(frames
            .into_iter()
            .map(|f| SubFrame { url: f.url, html: f.html })
            .collect())
    }

    async fn close(&self) -> Result<()> {
        self.page.clone().close().await?;
        Ok(())
    }
}
