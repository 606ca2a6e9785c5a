use crate::browser::Page;
use crate::config::Settings;
use crate::domain::summary::PredictionSource;
use crate::domain::ticker::Ticker;
use crate::error::ScrapeError;
use crate::extract::{extract_text, parse_number, strip_currency};
use crate::sites::SiteAdapter;
use std::time::Duration;

pub(crate) const AVERAGE_TARGET: &str = ".price-target-summary .average-price-target";

/// Best-effort consensus price target. Symbols are lowercase with `-` for class separators.
#[derive(Debug, Clone)]
pub struct AlphaSpread {
    base_url: String,
    element_timeout: Duration,
}

impl AlphaSpread {
    pub fn new(base_url: impl Into<String>, element_timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            element_timeout,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.alphaspread_base_url.clone(), settings.element_timeout)
    }

    fn url(&self, ticker: &Ticker) -> String {
        format!(
            "{}/security/{}/analyst-estimates",
            self.base_url.trim_end_matches('/'),
            ticker.with_separator('-').to_ascii_lowercase()
        )
    }
}

#[async_trait::async_trait]
impl SiteAdapter for AlphaSpread {
    type Output = f64;

    fn source(&self) -> PredictionSource {
        PredictionSource::AlphaSpread
    }

    async fn scrape(&self, page: &dyn Page, ticker: &Ticker) -> Result<f64, ScrapeError> {
        page.goto(&self.url(ticker)).await?;
        let text = extract_text(page, AVERAGE_TARGET, self.element_timeout).await?;
        parse_number(strip_currency(&text), ticker.as_str())
    }
}
