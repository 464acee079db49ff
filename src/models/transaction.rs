use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionDirection {
    #[serde(rename = "DIRECTION_INCOMING")]
    Incoming,
    #[serde(rename = "DIRECTION_OUTGOING")]
    Outgoing,
    #[serde(other)]
    Unspecified,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Money {
    #[serde(default)]
    pub currency_code: Option<String>,
    #[serde(default)]
    pub units: Option<String>,
    #[serde(default)]
    pub nanos: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub slug: String,
    #[serde(default)]
    pub color: Option<String>,
}

/// A transaction as returned by the listing service
///
/// Fields this client does not know about are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub merchant: Option<String>,
    #[serde(default)]
    pub account_name: Option<String>,
    #[serde(default)]
    pub direction: Option<TransactionDirection>,
    #[serde(default)]
    pub tx_amount: Option<Money>,
    #[serde(default)]
    pub tx_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Transaction {
    /// Description if present, else merchant, else a placeholder
    pub fn display_title(&self) -> &str {
        [self.description.as_deref(), self.merchant.as_deref()]
            .into_iter()
            .flatten()
            .find(|s| !s.trim().is_empty())
            .unwrap_or("Transaction")
    }

    /// Signed amount such as `-12.50 CAD`
    pub fn display_amount(&self) -> Option<String> {
        let money = self.tx_amount.as_ref()?;
        let units: i64 = money.units.as_deref().unwrap_or("0").parse().ok()?;
        let cents = (money.nanos.unwrap_or(0) / 10_000_000).abs();
        let sign = match self.direction {
            Some(TransactionDirection::Incoming) => "+",
            _ => "-",
        };
        let currency = money.currency_code.as_deref().unwrap_or("");
        Some(format!("{}{}.{:02} {}", sign, units.abs(), cents, currency).trim_end().to_string())
    }
}
