// 🧾 Recognized Records - Explicit field contract per record kind
//
// Raw documents are loosely typed JSON. Instead of probing fields ad hoc inside
// every computation, each record kind names the fields it reads, once:
//
//   Order    → id, created_at, total_price_set.shop_money.amount, customer.id
//   Customer → id, created_at, default_address.city
//
// Conversion never fails: absent or malformed fields become None and are dealt
// with by the fallback rules of whichever computation reads them.

use crate::error::{AnalyticsError, Result};
use crate::period::Timestamp;
use serde_json::Value;

// ============================================================================
// FIELD ACCESS
// ============================================================================

/// Walk a dotted path (`customer.id`) through nested objects
pub fn field_at<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(doc, |node, key| node.get(key))
}

/// Ids arrive as strings or integers; both normalize to a non-empty string
fn entity_id_at(doc: &Value, path: &str) -> Option<String> {
    match field_at(doc, path)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn text_at(doc: &Value, path: &str) -> Option<String> {
    match field_at(doc, path)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parse a textual decimal amount as f64
pub fn parse_amount(raw: Option<&str>) -> Result<f64> {
    let text = raw.ok_or_else(|| AnalyticsError::MalformedAmount("missing".to_string()))?;

    match text.trim().parse::<f64>() {
        Ok(amount) if amount.is_finite() => Ok(amount),
        _ => Err(AnalyticsError::MalformedAmount(text.to_string())),
    }
}

// ============================================================================
// RECORD TRAITS
// ============================================================================

/// Records that can be placed in a time bucket
pub trait Timestamped {
    fn timestamp(&self) -> Option<&Timestamp>;
}

/// Records attributed to an entity (customer)
pub trait EntityKeyed {
    fn entity_id(&self) -> Option<&str>;
}

// ============================================================================
// ORDER RECORD
// ============================================================================

#[derive(Debug, Clone, PartialEq, Default)]
pub struct OrderRecord {
    pub id: Option<String>,
    pub created_at: Option<Timestamp>,
    /// Amount exactly as written in the document
    pub amount_text: Option<String>,
    pub customer_id: Option<String>,
}

impl OrderRecord {
    pub fn from_document(doc: &Value) -> Self {
        OrderRecord {
            id: entity_id_at(doc, "id"),
            created_at: field_at(doc, "created_at").and_then(Timestamp::from_json),
            amount_text: text_at(doc, "total_price_set.shop_money.amount"),
            customer_id: entity_id_at(doc, "customer.id"),
        }
    }

    /// Order total, or `MalformedAmount` when missing or non-numeric
    pub fn amount(&self) -> Result<f64> {
        parse_amount(self.amount_text.as_deref())
    }

    /// Builder for tests and embedding callers
    pub fn new(created_at: &str, amount: &str, customer_id: Option<&str>) -> Self {
        OrderRecord {
            id: None,
            created_at: Some(Timestamp::Text(created_at.to_string())),
            amount_text: Some(amount.to_string()),
            customer_id: customer_id.map(str::to_string),
        }
    }
}

impl Timestamped for OrderRecord {
    fn timestamp(&self) -> Option<&Timestamp> {
        self.created_at.as_ref()
    }
}

impl EntityKeyed for OrderRecord {
    fn entity_id(&self) -> Option<&str> {
        self.customer_id.as_deref()
    }
}

// ============================================================================
// CUSTOMER RECORD
// ============================================================================

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CustomerRecord {
    pub id: Option<String>,
    pub created_at: Option<Timestamp>,
    pub city: Option<String>,
}

impl CustomerRecord {
    pub fn from_document(doc: &Value) -> Self {
        CustomerRecord {
            id: entity_id_at(doc, "id"),
            created_at: field_at(doc, "created_at").and_then(Timestamp::from_json),
            city: field_at(doc, "default_address.city")
                .and_then(Value::as_str)
                .map(str::to_string),
        }
    }

    pub fn new(id: &str, created_at: &str) -> Self {
        CustomerRecord {
            id: Some(id.to_string()),
            created_at: Some(Timestamp::Text(created_at.to_string())),
            city: None,
        }
    }

    pub fn with_city(mut self, city: &str) -> Self {
        self.city = Some(city.to_string());
        self
    }
}

impl Timestamped for CustomerRecord {
    fn timestamp(&self) -> Option<&Timestamp> {
        self.created_at.as_ref()
    }
}

impl EntityKeyed for CustomerRecord {
    fn entity_id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}
