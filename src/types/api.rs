use std::collections::BTreeMap;

use chrono::{SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::controllers::paste::PasteError;
use crate::models::{Delivery, NewPaste};

/// Body of `POST /api/pastes`. Fields stay loosely typed so that type errors
/// are reported per field.
#[derive(Debug, Default, Deserialize)]
pub struct CreatePaste {
    pub content: Option<Value>,
    pub ttl_seconds: Option<Value>,
    pub max_views: Option<Value>,
}

impl CreatePaste {
    pub fn into_new_paste(self) -> Result<NewPaste, PasteError> {
        let Some(Value::String(content)) = self.content else {
            return Err(PasteError::invalid_content());
        };

        Ok(NewPaste {
            content,
            ttl_seconds: integer(self.ttl_seconds, "ttl_seconds")?,
            max_views: integer(self.max_views, "max_views")?,
        })
    }
}

fn integer(value: Option<Value>, field: &'static str) -> Result<Option<i64>, PasteError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(number)) => as_integer(&number)
            .map(Some)
            .ok_or_else(|| PasteError::invalid_count(field)),
        Some(_) => Err(PasteError::invalid_count(field)),
    }
}

// `5.0` counts as an integer.
fn as_integer(number: &Number) -> Option<i64> {
    number.as_i64().or_else(|| {
        let float = number.as_f64()?;
        let in_range = float >= i64::MIN as f64 && float < i64::MAX as f64;
        (float.fract() == 0.0 && in_range).then_some(float as i64)
    })
}

#[derive(Debug, Serialize)]
pub struct PasteCreated {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct PasteContent {
    pub content: String,
    pub remaining_views: Option<u64>,
    pub expires_at: Option<String>,
}

impl From<Delivery> for PasteContent {
    fn from(delivery: Delivery) -> Self {
        PasteContent {
            content: delivery.content,
            remaining_views: delivery.remaining_views,
            expires_at: delivery.expires_at.and_then(iso8601),
        }
    }
}

/// Format epoch milliseconds as `YYYY-MM-DDTHH:MM:SS.sssZ`.
pub fn iso8601(millis: i64) -> Option<String> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .map(|time| time.to_rfc3339_opts(SecondsFormat::Millis, true))
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct Health {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub endpoints: BTreeMap<&'static str, &'static str>,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        ServiceInfo {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            endpoints: BTreeMap::from([
                ("health", "/api/healthz"),
                ("createPaste", "POST /api/pastes"),
                ("getPaste", "GET /api/pastes/:id"),
                ("viewPaste", "GET /p/:id"),
            ]),
        }
    }
}
