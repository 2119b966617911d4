//! Listing price normalization

use tracing::warn;

use crate::config::PriceFormat;

/// Parse a displayed price such as `R$ 1.234,56`.
///
/// Unparsable text (`grátis`, `consulte`) yields `0.0` and a warning.
pub fn parse_price(text: &str, format: &PriceFormat) -> f64 {
    let mut cleaned = text.replace(format.currency.as_str(), "");
    if !format.thousands.is_empty() {
        cleaned = cleaned.replace(format.thousands.as_str(), "");
    }
    if !format.decimal.is_empty() && format.decimal != "." {
        cleaned = cleaned.replace(format.decimal.as_str(), ".");
    }
    let cleaned: String = cleaned.chars().filter(|c| !c.is_whitespace()).collect();

    match cleaned.parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => {
            warn!(price = %text.trim(), "could not parse price, using 0");
            0.0
        }
    }
}
