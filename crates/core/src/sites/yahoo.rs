use crate::browser::Page;
use crate::config::Settings;
use crate::domain::summary::{growth_percentage, PredictionSource, QuoteRecord};
use crate::domain::ticker::Ticker;
use crate::error::ScrapeError;
use crate::extract::{click_element, extract_text, parse_history_date, parse_number, strip_currency};
use crate::sites::SiteAdapter;
use crate::time::week::current_week_start;
use chrono::NaiveDate;
use reqwest::Url;
use std::time::Duration;

pub(crate) const PRICE: &str = r#"fin-streamer[data-field="regularMarketPrice"]"#;
pub(crate) const EARNINGS_DATE: &str = r#"td[data-test="EARNINGS_DATE-value"]"#;
pub(crate) const DIVIDEND_AND_YIELD: &str = r#"td[data-test="DIVIDEND_AND_YIELD-value"]"#;
pub(crate) const EX_DIVIDEND_DATE: &str = r#"td[data-test="EX_DIVIDEND_DATE-value"]"#;
pub(crate) const ONE_YEAR_TARGET: &str = r#"td[data-test="ONE_YEAR_TARGET_PRICE-value"]"#;
pub(crate) const HISTORY_ROWS: &str = r#"table[data-test="historical-prices"] tbody tr"#;

const CONSENT_HOST_PREFIX: &str = "consent.";
pub(crate) const ACCEPT_ALL: &str = r#"button[name="agree"]"#;

// Date, Open, High, Low, Close, Adj Close, Volume. Dividend and split rows have two cells.
const HISTORY_MIN_CELLS: usize = 5;
const HISTORY_OPEN: usize = 1;
const HISTORY_CLOSE: usize = 4;

/// Primary quote source. Required: every failure is fatal for the ticker.
#[derive(Debug, Clone)]
pub struct YahooFinance {
    base_url: String,
    element_timeout: Duration,
}

struct QuoteFields {
    price: f64,
    earnings_date: String,
    dividend_and_yield: String,
    ex_dividend_date: String,
    prediction: f64,
}

impl YahooFinance {
    pub fn new(base_url: impl Into<String>, element_timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            element_timeout,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.yahoo_base_url.clone(), settings.element_timeout)
    }

    fn quote_url(&self, symbol: &str) -> String {
        format!("{}/quote/{symbol}", self.base_url.trim_end_matches('/'))
    }

    fn history_url(&self, symbol: &str) -> String {
        format!("{}/quote/{symbol}/history", self.base_url.trim_end_matches('/'))
    }

    /// Accepts the cookie wall if the quote page redirected to it.
    async fn accept_consent(&self, page: &dyn Page, quote_url: &str) -> Result<(), ScrapeError> {
        if !is_consent_url(&page.current_url().await?) {
            return Ok(());
        }

        tracing::debug!(url = quote_url, "consent wall detected; accepting");
        click_element(page, ACCEPT_ALL, self.element_timeout).await?;

        if is_consent_url(&page.current_url().await?) {
            page.goto(quote_url).await?;
        }
        Ok(())
    }

    async fn read_quote_fields(
        &self,
        page: &dyn Page,
        ticker: &Ticker,
    ) -> Result<QuoteFields, ScrapeError> {
        let timeout = self.element_timeout;
        let context = ticker.as_str();

        let price_text = extract_text(page, PRICE, timeout).await?;
        let price = parse_number(&price_text, context)?;
        if price <= 0.0 {
            return Err(ScrapeError::NotANumber {
                context: context.to_string(),
                text: price_text,
            });
        }

        let earnings_date = extract_text(page, EARNINGS_DATE, timeout).await?;
        let dividend_and_yield = extract_text(page, DIVIDEND_AND_YIELD, timeout).await?;
        let ex_dividend_date = extract_text(page, EX_DIVIDEND_DATE, timeout).await?;

        let target_text = extract_text(page, ONE_YEAR_TARGET, timeout).await?;
        let prediction = parse_number(strip_currency(&target_text), context)?;

        Ok(QuoteFields {
            price,
            earnings_date: earnings_date.trim().to_string(),
            dividend_and_yield: dividend_and_yield.trim().to_string(),
            ex_dividend_date: ex_dividend_date.trim().to_string(),
            prediction,
        })
    }

    async fn read_week_growth(
        &self,
        page: &dyn Page,
        ticker: &Ticker,
        symbol: &str,
        week_start: NaiveDate,
    ) -> Result<f64, ScrapeError> {
        page.goto(&self.history_url(symbol)).await?;
        let rows = page.query_rows(HISTORY_ROWS).await?;

        match week_growth(&rows, week_start, ticker.as_str())? {
            Some(growth) => Ok(growth),
            None => {
                tracing::warn!(%ticker, %week_start, rows = rows.len(), "no price rows this week");
                Ok(0.0)
            }
        }
    }
}

#[async_trait::async_trait]
impl SiteAdapter for YahooFinance {
    type Output = QuoteRecord;

    fn source(&self) -> PredictionSource {
        PredictionSource::Yahoo
    }

    async fn scrape(&self, page: &dyn Page, ticker: &Ticker) -> Result<QuoteRecord, ScrapeError> {
        let symbol = ticker.with_separator('-');
        let quote_url = self.quote_url(&symbol);

        page.goto(&quote_url).await?;
        self.accept_consent(page, &quote_url).await?;
        let fields = self.read_quote_fields(page, ticker).await?;
        let week_growth_percentage = self
            .read_week_growth(page, ticker, &symbol, current_week_start())
            .await?;

        Ok(QuoteRecord {
            price: fields.price,
            earnings_date: fields.earnings_date,
            dividend_and_yield: fields.dividend_and_yield,
            ex_dividend_date: fields.ex_dividend_date,
            prediction: fields.prediction,
            week_growth_percentage,
        })
    }
}

fn is_consent_url(url: &str) -> bool {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.starts_with(CONSENT_HOST_PREFIX)))
        .unwrap_or(false)
}

/// Growth from the first open to the latest close among rows dated on or after `week_start`.
/// Rows that are not price rows, or whose date cell does not parse, are ignored.
fn week_growth(
    rows: &[Vec<String>],
    week_start: NaiveDate,
    context: &str,
) -> Result<Option<f64>, ScrapeError> {
    let mut first: Option<(NaiveDate, &str)> = None;
    let mut last: Option<(NaiveDate, &str)> = None;

    for cells in rows {
        if cells.len() < HISTORY_MIN_CELLS {
            continue;
        }
        let Ok(date) = parse_history_date(&cells[0]) else {
            continue;
        };
        if date < week_start {
            continue;
        }

        if first.map_or(true, |(d, _)| date < d) {
            first = Some((date, cells[HISTORY_OPEN].as_str()));
        }
        if last.map_or(true, |(d, _)| date > d) {
            last = Some((date, cells[HISTORY_CLOSE].as_str()));
        }
    }

    let (Some((_, open)), Some((_, close))) = (first, last) else {
        return Ok(None);
    };

    let open = parse_number(open, context)?;
    let close = parse_number(close, context)?;
    if open <= 0.0 {
        return Err(ScrapeError::NotANumber {
            context: context.to_string(),
            text: open.to_string(),
        });
    }
    Ok(Some(growth_percentage(open, close)))
}
