//! # Money Types
//!
//! Currency and minor-unit amounts. All arithmetic in the engine is done on
//! integer minor units (cents, pence); decimals only appear at the edges.

use serde::{Deserialize, Serialize};

/// Supported currencies (ISO 4217), all with two decimal places
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    USD,
    GBP,
    EUR,
    CAD,
}

impl Currency {
    /// Returns the lowercase ISO 4217 code (the form Stripe expects)
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::USD => "usd",
            Currency::GBP => "gbp",
            Currency::EUR => "eur",
            Currency::CAD => "cad",
        }
    }

    /// Display symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::USD => "$",
            Currency::GBP => "£",
            Currency::EUR => "€",
            Currency::CAD => "C$",
        }
    }

    /// Parse an ISO code in any case ("USD", "usd")
    pub fn from_code(code: &str) -> Option<Self> {
        match code.to_ascii_lowercase().as_str() {
            "usd" => Some(Currency::USD),
            "gbp" => Some(Currency::GBP),
            "eur" => Some(Currency::EUR),
            "cad" => Some(Currency::CAD),
            _ => None,
        }
    }
}

impl Default for Currency {
    fn default() -> Self {
        Currency::USD
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str().to_uppercase())
    }
}

/// Amount in minor currency units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Amount in smallest currency unit (cents for USD)
    pub amount: i64,
    /// Currency
    pub currency: Currency,
}

impl Money {
    /// Create from minor units
    pub fn from_minor(amount: i64, currency: Currency) -> Self {
        Self { amount, currency }
    }

    /// Zero in the given currency
    pub fn zero(currency: Currency) -> Self {
        Self::from_minor(0, currency)
    }

    /// Major-unit decimal string with exactly two places ("64.80")
    pub fn decimal_string(&self) -> String {
        format_minor(self.amount)
    }

    /// Format for display (e.g., "$64.80")
    pub fn display(&self) -> String {
        format!("{}{}", self.currency.symbol(), self.decimal_string())
    }
}

/// Format minor units as a two-place decimal without going through floats
pub fn format_minor(amount: i64) -> String {
    let sign = if amount < 0 { "-" } else { "" };
    let abs = amount.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}
