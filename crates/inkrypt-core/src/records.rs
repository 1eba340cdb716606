use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identifier of a wallet that owns records.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Address {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Unpublished, locally editable content.
///
/// Fields written by other tools are carried in `extra` so a collection can be
/// rewritten without dropping them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub content: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Draft {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        date: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            date: date.into(),
            content: content.into(),
            extra: Map::new(),
        }
    }

    /// Calendar date part of `date` when it is an ISO-8601 timestamp.
    pub fn day(&self) -> &str {
        match self.date.split_once('T') {
            Some((day, _)) if day.len() == 10 => day,
            _ => &self.date,
        }
    }
}

/// A record persisted alongside the address that owns it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Owned<T> {
    pub address: Address,
    #[serde(flatten)]
    pub record: T,
}

/// Published content. Immutable once published.
pub type Post = Owned<Draft>;

/// An in-flight order with the external inscription service.
///
/// `status` holds whatever status fields the service last reported.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InscriptionOrder {
    #[serde(rename = "orderId")]
    pub order_id: String,
    pub address: Address,
    #[serde(flatten)]
    pub status: Map<String, Value>,
}

impl InscriptionOrder {
    /// Last reported status string, if any.
    pub fn state(&self) -> Option<&str> {
        self.status.get("status").and_then(Value::as_str)
    }
}

/// Records that carry an owner address.
pub trait Ownable {
    fn owner(&self) -> &Address;
}

impl<T> Ownable for Owned<T> {
    fn owner(&self) -> &Address {
        &self.address
    }
}

impl Ownable for InscriptionOrder {
    fn owner(&self) -> &Address {
        &self.address
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn persisted_draft_keeps_unknown_fields() {
        let raw = json!({
            "id": "1",
            "address": "X",
            "title": "hello",
            "date": "2024-05-01T10:00:00.000Z",
            "content": "body",
            "tags": ["a"]
        });
        let row: Owned<Draft> = serde_json::from_value(raw.clone()).expect("parse");
        assert_eq!(row.address, Address::from("X"));
        assert_eq!(row.record.id, "1");
        assert_eq!(row.record.extra.get("tags"), Some(&json!(["a"])));
        assert_eq!(serde_json::to_value(&row).expect("encode"), raw);
    }

    #[test]
    fn missing_optional_fields_default_to_empty() {
        let row: Owned<Draft> =
            serde_json::from_value(json!({"id": "7", "address": "Y"})).expect("parse");
        assert_eq!(row.record.title, "");
        assert_eq!(row.record.day(), "");
    }

    #[test]
    fn day_strips_time_of_day() {
        let draft = Draft::new("1", "t", "2024-05-01T10:00:00.000Z", "");
        assert_eq!(draft.day(), "2024-05-01");
        let draft = Draft::new("1", "t", "yesterday", "");
        assert_eq!(draft.day(), "yesterday");
    }

    #[test]
    fn order_status_fields_are_flattened() {
        let order: InscriptionOrder = serde_json::from_value(json!({
            "orderId": "o-1",
            "address": "X",
            "status": "pending",
            "payAddress": "bc1q"
        }))
        .expect("parse");
        assert_eq!(order.order_id, "o-1");
        assert_eq!(order.state(), Some("pending"));
        assert_eq!(order.status.get("payAddress"), Some(&json!("bc1q")));
    }
}
