use std::num::NonZeroU64;

use thiserror::Error;
use tracing::debug;

use crate::ids::new_id;
use crate::models::{Delivery, NewPaste, Paste};
use crate::storage::{CasOutcome, Store, StoreError};

/// Seconds the stored record outlives its logical deadline, so late reads
/// still see the record and fail the availability check.
pub const EXPIRY_GRACE_SECS: u64 = 60;

/// Default number of read-check-write attempts per consume.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 8;

#[derive(Error, Debug)]
pub enum PasteError {
    #[error("{field} {reason}")]
    Validation {
        field: &'static str,
        reason: &'static str,
    },
    #[error("paste not found")]
    NotFound,
    #[error("gave up after {attempts} conflicting writes")]
    Conflict { attempts: u32 },
    #[error("store unavailable")]
    StoreUnavailable {
        #[from]
        source: StoreError,
    },
    #[error("stored paste is malformed")]
    Corrupt {
        #[from]
        source: serde_json::Error,
    },
}

impl PasteError {
    pub(crate) fn invalid_content() -> Self {
        PasteError::Validation {
            field: "content",
            reason: "is required and must be a non-empty string",
        }
    }

    pub(crate) fn invalid_count(field: &'static str) -> Self {
        PasteError::Validation {
            field,
            reason: "must be an integer >= 1",
        }
    }
}

pub fn paste_key(id: &str) -> String {
    format!("paste:{id}")
}

/// Creates pastes and hands them out against a shared store.
#[derive(Debug, Clone)]
pub struct Pastes<S> {
    store: S,
    max_attempts: u32,
}

impl<S: Store> Pastes<S> {
    pub fn new(store: S) -> Self {
        Pastes {
            store,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Validate and store a new paste created at `now`.
    pub async fn create(&self, new: NewPaste, now: i64) -> Result<Paste, PasteError> {
        if new.content.trim().is_empty() {
            return Err(PasteError::invalid_content());
        }
        let ttl_seconds = positive(new.ttl_seconds, "ttl_seconds")?;
        let max_views = positive(new.max_views, "max_views")?;

        let expires_at = match ttl_seconds {
            Some(ttl) => Some(deadline(now, ttl).ok_or(PasteError::Validation {
                field: "ttl_seconds",
                reason: "is too large",
            })?),
            None => None,
        };

        let paste = Paste {
            id: new_id(),
            content: new.content,
            created_at: now,
            expires_at,
            max_views,
            views: 0,
        };

        let key = paste_key(&paste.id);
        self.store.set(&key, paste.encode()?).await?;
        if let Some(ttl) = ttl_seconds {
            self.store
                .expire_after(&key, ttl.get().saturating_add(EXPIRY_GRACE_SECS))
                .await?;
        }

        Ok(paste)
    }

    /// Deliver a paste at `now`, counting the view.
    ///
    /// Reads race each other through compare-and-set, so a paste with a
    /// budget of `n` views is delivered at most `n` times.
    pub async fn consume(&self, id: &str, now: i64) -> Result<Delivery, PasteError> {
        let key = paste_key(id);

        for attempt in 1..=self.max_attempts {
            let Some(stored) = self.store.get(&key).await? else {
                return Err(PasteError::NotFound);
            };

            let paste = Paste::decode(&stored)?;
            if !paste.is_available(now) {
                return Err(PasteError::NotFound);
            }

            let viewed = paste.viewed();
            match self
                .store
                .compare_and_set(&key, &stored, viewed.encode()?)
                .await?
            {
                CasOutcome::Swapped => return Ok(viewed.into()),
                CasOutcome::Conflict => {
                    debug!("concurrent read of paste {id}, attempt {attempt}");
                }
            }
        }

        Err(PasteError::Conflict {
            attempts: self.max_attempts,
        })
    }
}

fn positive(value: Option<i64>, field: &'static str) -> Result<Option<NonZeroU64>, PasteError> {
    value
        .map(|value| {
            u64::try_from(value)
                .ok()
                .and_then(NonZeroU64::new)
                .ok_or_else(|| PasteError::invalid_count(field))
        })
        .transpose()
}

fn deadline(now: i64, ttl: NonZeroU64) -> Option<i64> {
    let ttl_ms = i64::try_from(ttl.get()).ok()?.checked_mul(1000)?;
    now.checked_add(ttl_ms)
}
