//! Static approximate USD rates used when every provider fails.

use crate::domain::Decimal;
use std::collections::HashMap;

/// Symbol -> approximate USD rate. Keys are uppercase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FallbackTable {
    rates: HashMap<String, Decimal>,
}

const BUILTIN: &[(&str, &str)] = &[
    ("EUR", "1.08"),
    ("GBP", "1.27"),
    ("CHF", "1.13"),
    ("JPY", "0.0067"),
    ("CNY", "0.14"),
    ("CAD", "0.73"),
    ("AUD", "0.66"),
    ("NZD", "0.61"),
    ("SEK", "0.095"),
    ("NOK", "0.094"),
    ("DKK", "0.145"),
    ("PLN", "0.25"),
    ("CZK", "0.043"),
    ("HUF", "0.0028"),
    ("UAH", "0.024"),
    ("RUB", "0.011"),
    ("TRY", "0.03"),
    ("INR", "0.012"),
    ("SGD", "0.74"),
    ("HKD", "0.128"),
    ("KRW", "0.00073"),
    ("THB", "0.028"),
    ("AED", "0.272"),
    ("BRL", "0.18"),
    ("MXN", "0.055"),
    ("USDT", "1"),
    ("USDC", "1"),
    ("DAI", "1"),
];

impl FallbackTable {
    pub fn new(rates: HashMap<String, Decimal>) -> Self {
        let rates = rates
            .into_iter()
            .map(|(symbol, rate)| (symbol.trim().to_ascii_uppercase(), rate))
            .collect();
        Self { rates }
    }

    /// The compiled-in table.
    pub fn builtin() -> Self {
        let rates = BUILTIN
            .iter()
            .filter_map(|(symbol, rate)| {
                Decimal::from_str_canonical(rate)
                    .ok()
                    .map(|r| (symbol.to_string(), r))
            })
            .collect();
        Self { rates }
    }

    /// Parse `EUR=1.08,GBP=1.27`. Blank input yields an empty table.
    pub fn parse(input: &str) -> Result<Self, String> {
        let mut rates = HashMap::new();
        for pair in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (symbol, rate) = pair
                .split_once('=')
                .ok_or_else(|| format!("expected SYMBOL=RATE, got {}", pair))?;
            let rate = Decimal::from_str_canonical(rate)
                .map_err(|_| format!("invalid rate for {}: {}", symbol.trim(), rate.trim()))?;
            if !rate.is_positive() {
                return Err(format!("rate for {} must be positive", symbol.trim()));
            }
            rates.insert(symbol.trim().to_ascii_uppercase(), rate);
        }
        Ok(Self { rates })
    }

    /// Overlay `other` on top of this table.
    pub fn merged(mut self, other: FallbackTable) -> Self {
        self.rates.extend(other.rates);
        self
    }

    pub fn get(&self, symbol: &str) -> Option<Decimal> {
        self.rates.get(&symbol.to_ascii_uppercase()).copied()
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}
