use std::num::NonZeroU64;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// A stored paste. Instants are milliseconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paste {
    pub id: String,
    pub content: String,
    pub created_at: i64,
    pub expires_at: Option<i64>,
    pub max_views: Option<NonZeroU64>,
    pub views: u64,
}

impl Paste {
    /// Whether the paste may still be delivered at `now`.
    pub fn is_available(&self, now: i64) -> bool {
        let in_time = self.expires_at.map_or(true, |deadline| now < deadline);
        let has_views = self.max_views.map_or(true, |max| self.views < max.get());
        in_time && has_views
    }

    pub fn remaining_views(&self) -> Option<u64> {
        self.max_views
            .map(|max| max.get().saturating_sub(self.views))
    }

    /// The same paste with one more delivery counted.
    pub fn viewed(&self) -> Paste {
        Paste {
            views: self.views + 1,
            ..self.clone()
        }
    }

    pub fn encode(&self) -> serde_json::Result<Bytes> {
        serde_json::to_vec(self).map(Bytes::from)
    }

    pub fn decode(bytes: &[u8]) -> serde_json::Result<Paste> {
        serde_json::from_slice(bytes)
    }
}

/// Unvalidated input for a new paste.
#[derive(Debug, Clone, Default)]
pub struct NewPaste {
    pub content: String,
    pub ttl_seconds: Option<i64>,
    pub max_views: Option<i64>,
}

impl NewPaste {
    pub fn new(content: impl Into<String>) -> Self {
        NewPaste {
            content: content.into(),
            ..NewPaste::default()
        }
    }

    pub fn ttl_seconds(mut self, ttl_seconds: i64) -> Self {
        self.ttl_seconds = Some(ttl_seconds);
        self
    }

    pub fn max_views(mut self, max_views: i64) -> Self {
        self.max_views = Some(max_views);
        self
    }
}

/// What a successful read hands back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub content: String,
    pub remaining_views: Option<u64>,
    pub expires_at: Option<i64>,
}

impl From<Paste> for Delivery {
    fn from(paste: Paste) -> Self {
        Delivery {
            remaining_views: paste.remaining_views(),
            expires_at: paste.expires_at,
            content: paste.content,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paste(expires_at: Option<i64>, max_views: Option<u64>, views: u64) -> Paste {
        Paste {
            id: "id".into(),
            content: "hello".into(),
            created_at: 1_000,
            expires_at,
            max_views: max_views.and_then(NonZeroU64::new),
            views,
        }
    }

    #[test]
    fn unlimited_paste_is_always_available() {
        let paste = paste(None, None, 1_000_000);
        assert!(paste.is_available(0));
        assert!(paste.is_available(i64::MAX));
        assert_eq!(paste.remaining_views(), None);
    }

    #[test]
    fn deadline_is_exclusive() {
        let paste = paste(Some(61_000), None, 0);
        assert!(paste.is_available(60_999));
        assert!(!paste.is_available(61_000));
        assert!(!paste.is_available(61_001));
    }

    #[test]
    fn view_budget_is_exclusive() {
        assert!(paste(None, Some(2), 1).is_available(0));
        assert!(!paste(None, Some(2), 2).is_available(0));
    }

    #[test]
    fn both_limits_must_hold() {
        let paste = paste(Some(5_000), Some(3), 1);
        assert!(paste.is_available(4_999));
        assert!(!paste.is_available(5_000));
        assert!(!paste.viewed().viewed().is_available(4_999));
    }

    #[test]
    fn remaining_views_never_goes_negative() {
        assert_eq!(paste(None, Some(3), 1).remaining_views(), Some(2));
        assert_eq!(paste(None, Some(3), 3).remaining_views(), Some(0));
        assert_eq!(paste(None, Some(3), 7).remaining_views(), Some(0));
    }

    #[test]
    fn viewed_only_touches_the_counter() {
        let before = paste(Some(9_000), Some(4), 2);
        let after = before.viewed();
        assert_eq!(after.views, 3);
        assert_eq!(after, Paste { views: 3, ..before });
    }

    #[test]
    fn record_layout_keeps_every_field() {
        let bytes = paste(None, Some(1), 0).encode().unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": "id",
                "content": "hello",
                "created_at": 1_000,
                "expires_at": null,
                "max_views": 1,
                "views": 0,
            })
        );
        assert_eq!(Paste::decode(&bytes).unwrap(), paste(None, Some(1), 0));
    }

    #[test]
    fn zero_view_budget_is_rejected_on_decode() {
        let bytes = br#"{"id":"id","content":"x","created_at":1,"expires_at":null,"max_views":0,"views":0}"#;
        assert!(Paste::decode(bytes).is_err());
    }

    #[test]
    fn delivery_reports_remaining_views_and_deadline() {
        let delivery = Delivery::from(paste(Some(9_000), Some(4), 1));
        assert_eq!(
            delivery,
            Delivery {
                content: "hello".into(),
                remaining_views: Some(3),
                expires_at: Some(9_000),
            }
        );
    }
}
