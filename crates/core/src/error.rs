use crate::browser::BrowserError;
use crate::domain::ticker::Ticker;
use std::time::Duration;

/// Failures while turning one page into typed values.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("empty value ({context})")]
    EmptyValue { context: String },

    #[error("not a number ({context}): {text:?}")]
    NotANumber { context: String, text: String },

    #[error("unrecognized date: {text:?}")]
    InvalidDate { text: String },

    #[error("element not found: {locator}")]
    ElementNotFound { locator: String },

    #[error("timed out after {timeout:?} waiting for element: {locator}")]
    ElementTimeout { locator: String, timeout: Duration },

    #[error(transparent)]
    Browser(#[from] BrowserError),
}

impl ScrapeError {
    pub fn is_timeout(&self) -> bool {
        match self {
            ScrapeError::ElementTimeout { .. } => true,
            ScrapeError::Browser(err) => err.is_timeout(),
            _ => false,
        }
    }
}

/// A scrape failure attributed to the ticker and site it happened on.
#[derive(Debug, thiserror::Error)]
#[error("{site} failed for {ticker}: {error}")]
pub struct TickerError {
    pub ticker: Ticker,
    pub site: &'static str,
    #[source]
    pub error: ScrapeError,
}

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("no summary for ticker {0}")]
    MissingTicker(Ticker),

    #[error("failed to write report: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("failed to start browser session: {0}")]
    Launch(#[source] BrowserError),

    #[error(transparent)]
    Ticker(#[from] TickerError),
}
