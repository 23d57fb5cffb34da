//! Quantitative-constraint contract.
//!
//! Unit conversion proper is delegated to an external library in the full
//! system; the engine only needs the seam. [`PassthroughQuantities`]
//! implements the contract with numeric extraction and verbatim unit tags,
//! which keeps listings well-shaped even with no converter wired in.

/// A parsed physical quantity.
#[derive(Debug, Clone, PartialEq)]
pub struct Quantity {
    pub value: f64,
    pub unit: String,
}

/// A parsed monetary amount.
#[derive(Debug, Clone, PartialEq)]
pub struct Money {
    pub value: f64,
    pub currency: String,
}

pub trait QuantityResolver: Send + Sync {
    /// Parse a free-form quantity string like `"512 gb"` or `"1.5kg"`.
    fn resolve(&self, raw: &str) -> Option<Quantity>;

    /// Parse a monetary value; `currency_hint` comes from the constraint's
    /// own currency/unit fields.
    fn resolve_currency(&self, raw: &str, currency_hint: Option<&str>) -> Option<Money>;
}

/// Numeric extraction with verbatim units; no conversion.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughQuantities;

impl PassthroughQuantities {
    fn split_number(raw: &str) -> Option<(f64, String)> {
        let raw = raw.trim();
        let number_end = raw
            .char_indices()
            .take_while(|(_, c)| c.is_ascii_digit() || *c == '.' || *c == ',' || *c == '-')
            .map(|(i, c)| i + c.len_utf8())
            .last()?;
        let number: f64 = raw[..number_end].replace(',', "").parse().ok()?;
        let rest = raw[number_end..].trim().to_string();
        Some((number, rest))
    }
}

impl QuantityResolver for PassthroughQuantities {
    fn resolve(&self, raw: &str) -> Option<Quantity> {
        let (value, unit) = Self::split_number(raw)?;
        Some(Quantity {
            value,
            unit: unit.to_lowercase(),
        })
    }

    fn resolve_currency(&self, raw: &str, currency_hint: Option<&str>) -> Option<Money> {
        let (value, trailing) = Self::split_number(raw.trim_start_matches(['$', '€', '£']))?;
        let currency = currency_hint
            .map(str::to_uppercase)
            .filter(|c| !c.is_empty())
            .or_else(|| {
                let trailing = trailing.to_uppercase();
                (trailing.len() == 3).then_some(trailing)
            })
            .or_else(|| match raw.trim().chars().next() {
                Some('$') => Some("USD".into()),
                Some('€') => Some("EUR".into()),
                Some('£') => Some("GBP".into()),
                _ => None,
            })?;
        Some(Money { value, currency })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantities_split_number_and_unit() {
        let q = PassthroughQuantities;
        assert_eq!(
            q.resolve("512 GB"),
            Some(Quantity {
                value: 512.0,
                unit: "gb".into()
            })
        );
        assert_eq!(
            q.resolve("1.5kg"),
            Some(Quantity {
                value: 1.5,
                unit: "kg".into()
            })
        );
        assert_eq!(q.resolve("no number here"), None);
    }

    #[test]
    fn currency_hint_beats_inference() {
        let q = PassthroughQuantities;
        assert_eq!(
            q.resolve_currency("1,200", Some("inr")),
            Some(Money {
                value: 1200.0,
                currency: "INR".into()
            })
        );
        assert_eq!(
            q.resolve_currency("$40", None),
            Some(Money {
                value: 40.0,
                currency: "USD".into()
            })
        );
        assert_eq!(
            q.resolve_currency("300 EUR", None),
            Some(Money {
                value: 300.0,
                currency: "EUR".into()
            })
        );
        assert_eq!(q.resolve_currency("500", None), None);
    }
}
