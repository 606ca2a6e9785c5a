use crate::domain::summary::{Batch, Summary};
use crate::domain::ticker::Ticker;
use crate::error::ReportError;
use std::fmt::Write as _;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Writes one category block: the label, one row per ticker in `ticker_order`, a blank line.
/// The block is rendered before anything is written, so a failed render writes nothing.
pub async fn write_category<W>(
    out: &mut W,
    label: &str,
    batch: &Batch,
    ticker_order: &[Ticker],
) -> Result<(), ReportError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let block = render_category(label, batch, ticker_order)?;
    out.write_all(block.as_bytes()).await?;
    out.flush().await?;
    tracing::info!(category = label, rows = ticker_order.len(), "category written");
    Ok(())
}

pub fn render_category(
    label: &str,
    batch: &Batch,
    ticker_order: &[Ticker],
) -> Result<String, ReportError> {
    let mut block = String::new();
    block.push_str(label);
    block.push('\n');

    for ticker in ticker_order {
        let summary = batch
            .get(ticker)
            .ok_or_else(|| ReportError::MissingTicker(ticker.clone()))?;
        block.push_str(&render_row(ticker, summary));
        block.push('\n');
    }

    block.push('\n');
    Ok(block)
}

/// `ticker, price, value (growth%)..., average growth, week growth%`, tab separated.
pub fn render_row(ticker: &Ticker, summary: &Summary) -> String {
    let mut row = format!("{ticker}\t{}", summary.quote.price);

    for (_, predicted, growth) in summary.growths() {
        // Writing into a String cannot fail.
        let _ = write!(row, "\t{predicted} ({}%)", floor(growth));
    }

    match summary.average_growth() {
        Some(avg) => {
            let _ = write!(row, "\t{}", floor(avg));
        }
        None => row.push_str("\t-"),
    }

    let _ = write!(row, "\t{:.2}%", summary.quote.week_growth_percentage);
    row
}

fn floor(value: f64) -> i64 {
    value.floor() as i64
}
