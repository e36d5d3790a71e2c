//! Navigation with linear backoff
//!
//! Host failover is not handled here; the pipeline decides what to do once
//! the attempt budget for a URL is spent.

use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

use crate::browser::PageHandle;
use crate::config::PipelineConfig;
use crate::error::{AppError, Result};

#[derive(Debug, Clone)]
pub struct NavigationRetrier {
    max_attempts: u32,
    backoff_step: Duration,
    timeout: Duration,
}

impl NavigationRetrier {
    pub fn new(max_attempts: u32, backoff_step: Duration, timeout: Duration) -> Self {
        NavigationRetrier {
            max_attempts: max_attempts.max(1),
            backoff_step,
            timeout,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            config.nav_max_attempts,
            config.timings.backoff_step,
            config.timings.navigation_timeout,
        )
    }

    /// Navigate `page` to `url`, retrying failed attempts.
    ///
    /// Exhaustion yields `AppError::NavigationError` carrying the last failure.
    pub async fn navigate(&self, page: &dyn PageHandle, url: &str) -> Result<()> {
        let timeout = self.timeout;
        retry_linear(
            |attempt| {
                info!("goto attempt {}: {}", attempt, url);
                page.navigate(url, timeout)
            },
            self.max_attempts,
            self.backoff_step,
        )
        .await
        .map_err(|e| AppError::NavigationError {
            url: url.to_string(),
            attempts: self.max_attempts,
            reason: e.to_string(),
        })
    }
}

/// Run `op` up to `max_attempts` times (1-based attempt index is passed in).
///
/// After failed attempt `i` the next one starts `step * i` later. No wait
/// follows the final attempt; its error is returned as is.
pub async fn retry_linear<F, Fut, T>(mut op: F, max_attempts: u32, step: Duration) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) => {
                warn!("attempt {}/{} failed: {}", attempt, max_attempts, e);
                if attempt >= max_attempts {
                    return Err(e);
                }
                tokio::time::sleep(step * attempt).await;
                attempt += 1;
            }
        }
    }
}
