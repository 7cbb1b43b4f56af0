//! Resource models used by the bundled wrappers.

use serde::{Deserialize, Serialize};

/// A DNS zone as exchanged with the `zones` endpoints.
///
/// Only the fields needed to create and identify a zone are modelled;
/// unknown fields in responses are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Zone {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub zone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nx_ttl: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<u32>,
}

impl Zone {
    pub fn new(zone: impl Into<String>) -> Self {
        Self {
            zone: zone.into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_zone_serializes_only_its_name() {
        let json = serde_json::to_value(Zone::new("example.com")).unwrap();
        assert_eq!(json, serde_json::json!({"zone": "example.com"}));
    }

    #[test]
    fn unknown_response_fields_are_ignored() {
        let zone: Zone = serde_json::from_str(
            r#"{"id":"52051b2c","zone":"example.com","ttl":3600,"dns_servers":["dns1.p01.nsone.net"]}"#,
        )
        .unwrap();
        assert_eq!(zone.id.as_deref(), Some("52051b2c"));
        assert_eq!(zone.ttl, Some(3600));
        assert_eq!(zone.retry, None);
    }
}
