use serde::Deserialize;
use std::fmt;

/// Display form of a ticker symbol, e.g. `BRK.B`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(from = "String")]
pub struct Ticker(String);

impl Ticker {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self(symbol.into().trim().to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Normalized form for sources that do not accept `.` inside a symbol (`BRK.B` -> `BRK-B`).
    pub fn with_separator(&self, separator: char) -> String {
        self.0.replace('.', &separator.to_string())
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Ticker {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for Ticker {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_case_and_whitespace() {
        assert_eq!(Ticker::new(" aapl ").as_str(), "AAPL");
    }

    #[test]
    fn substitutes_class_separator() {
        let t = Ticker::new("BRK.B");
        assert_eq!(t.with_separator('-'), "BRK-B");
        assert_eq!(t.to_string(), "BRK.B");
    }

    #[test]
    fn deserializes_from_plain_string() {
        let t: Ticker = serde_json::from_str("\"msft\"").unwrap();
        assert_eq!(t, Ticker::new("MSFT"));
    }
}
