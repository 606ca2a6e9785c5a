use crate::browser::{BrowserError, Page};
use crate::error::ScrapeError;
use chrono::NaiveDate;
use std::time::Duration;

/// Date format of the leading cell of a price-history row, e.g. `Oct 13, 2026`.
pub const HISTORY_DATE_FORMAT: &str = "%b %d, %Y";

/// Parses extracted text as a decimal. `context` (usually the ticker) is carried into errors.
pub fn parse_number(text: &str, context: &str) -> Result<f64, ScrapeError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ScrapeError::EmptyValue {
            context: context.to_string(),
        });
    }

    let cleaned: String = trimmed.chars().filter(|c| *c != ',').collect();
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ScrapeError::NotANumber {
            context: context.to_string(),
            text: trimmed.to_string(),
        })
}

/// Drops a leading currency symbol (`$1,200` -> `1,200`).
pub fn strip_currency(text: &str) -> &str {
    text.trim()
        .trim_start_matches(|c: char| matches!(c, '$' | '€' | '£' | '¥'))
        .trim_start()
}

pub fn parse_history_date(text: &str) -> Result<NaiveDate, ScrapeError> {
    NaiveDate::parse_from_str(text.trim(), HISTORY_DATE_FORMAT).map_err(|_| {
        ScrapeError::InvalidDate {
            text: text.to_string(),
        }
    })
}

/// Text content of the single element matching `locator`. A missing text node is returned as
/// an empty string; rejecting it is the parser's job.
pub async fn extract_text(
    page: &dyn Page,
    locator: &str,
    timeout: Duration,
) -> Result<String, ScrapeError> {
    let element = wait_for(page, locator, timeout).await?;
    let text = page.text_content(&element).await?;
    Ok(text.unwrap_or_default())
}

/// Clicks the element matching `locator`. Absence is structural, not a slow page.
pub async fn click_element(
    page: &dyn Page,
    locator: &str,
    timeout: Duration,
) -> Result<(), ScrapeError> {
    let element = match wait_for(page, locator, timeout).await {
        Ok(element) => element,
        Err(ScrapeError::ElementTimeout { locator, .. }) => {
            return Err(ScrapeError::ElementNotFound { locator })
        }
        Err(err) => return Err(err),
    };
    page.click(&element).await?;
    Ok(())
}

async fn wait_for(
    page: &dyn Page,
    locator: &str,
    timeout: Duration,
) -> Result<crate::browser::ElementHandle, ScrapeError> {
    let timed_out = || ScrapeError::ElementTimeout {
        locator: locator.to_string(),
        timeout,
    };

    match tokio::time::timeout(timeout, page.wait_for_element(locator, timeout)).await {
        Ok(Ok(element)) => Ok(element),
        Ok(Err(BrowserError::Timeout { .. })) | Err(_) => Err(timed_out()),
        Ok(Err(err)) => Err(err.into()),
    }
}
