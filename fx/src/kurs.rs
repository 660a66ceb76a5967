//! Parser for the exchanger list embedded in the aggregator page.
//!
//! The page ships its data as a script assignment:
//!
//! ```text
//! var punkts = [{"name": "...", "data": {"USD": [buy, sell, ...], "RUB": [...]}}, ...];
//! ```

use kursmon_common::{CurrencyPair, ExchangeQuote, SourceQuote};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{FxError, FxResult};

const PUNKTS_MARKER: &str = "var punkts =";

#[derive(Debug, Deserialize)]
struct Punkt {
    #[serde(default)]
    name: Value,
    #[serde(default)]
    data: Value,
}

/// Extract every exchanger's raw quotes from the aggregator page.
///
/// Values are returned as published; invalid legs are left for the
/// aggregator to discard.
pub fn parse_punkts(html: &str) -> FxResult<Vec<SourceQuote>> {
    let start = html
        .find(PUNKTS_MARKER)
        .ok_or_else(|| FxError::Parse("could not find 'var punkts' in page".to_string()))?;
    let tail = &html[start + PUNKTS_MARKER.len()..];

    let punkts: Vec<Punkt> = serde_json::Deserializer::from_str(tail)
        .into_iter::<Vec<Punkt>>()
        .next()
        .ok_or_else(|| FxError::Parse("'var punkts' has no value".to_string()))?
        .map_err(|e| FxError::Parse(format!("invalid punkts JSON: {e}")))?;

    debug!(count = punkts.len(), "Parsed exchange points");

    Ok(punkts.into_iter().map(Punkt::into_source_quote).collect())
}

impl Punkt {
    fn into_source_quote(self) -> SourceQuote {
        let name = self.name.as_str().unwrap_or("Unknown").to_string();
        SourceQuote {
            usd: leg(&self.data, CurrencyPair::UsdKzt),
            rub: leg(&self.data, CurrencyPair::RubKzt),
            source_name: name,
        }
    }
}

fn leg(data: &Value, pair: CurrencyPair) -> Option<ExchangeQuote> {
    let values = data.get(pair.base_code())?.as_array()?;
    if values.len() < 2 {
        return None;
    }
    Some(ExchangeQuote::new(number(&values[0])?, number(&values[1])?))
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><head><script>
        var lang = "ru";
        var punkts = [
            {"id": 1, "name": "Exchanger A", "data": {"USD": [480.5, 485.0, 1], "RUB": [5.1, 5.35]}},
            {"id": 2, "name": "Exchanger B", "data": {"USD": ["481", "486.5"]}},
            {"id": 3, "name": "Exchanger C", "data": {"USD": [0, 0], "RUB": [5.0]}},
            {"id": 4, "data": {"EUR": [520, 530]}},
            {"id": 5, "name": "Closed"}
        ];
        var markers = [];
        </script></head></html>
    "#;

    #[test]
    fn test_parse_page() {
        let quotes = parse_punkts(PAGE).unwrap();
        assert_eq!(quotes.len(), 5);

        assert_eq!(quotes[0].source_name, "Exchanger A");
        assert_eq!(quotes[0].usd, Some(ExchangeQuote::new(480.5, 485.0)));
        assert_eq!(quotes[0].rub, Some(ExchangeQuote::new(5.1, 5.35)));

        // Numeric strings are accepted.
        assert_eq!(quotes[1].usd, Some(ExchangeQuote::new(481.0, 486.5)));
        assert_eq!(quotes[1].rub, None);

        // Zero legs are kept for the aggregator, short arrays are not.
        assert_eq!(quotes[2].usd, Some(ExchangeQuote::new(0.0, 0.0)));
        assert_eq!(quotes[2].rub, None);

        assert_eq!(quotes[3].source_name, "Unknown");
        assert_eq!(quotes[3].usd, None);
        assert_eq!(quotes[4].usd, None);
    }

    #[test]
    fn test_missing_marker() {
        let result = parse_punkts("<html><body>maintenance</body></html>");
        assert!(matches!(result, Err(FxError::Parse(_))));
    }

    #[test]
    fn test_malformed_json() {
        let result = parse_punkts("var punkts = [{\"name\": ];");
        assert!(matches!(result, Err(FxError::Parse(_))));
    }

    #[test]
    fn test_non_numeric_leg() {
        let quotes =
            parse_punkts(r#"var punkts = [{"name": "X", "data": {"USD": ["n/a", 485]}}];"#).unwrap();
        assert_eq!(quotes[0].usd, None);
    }
}
