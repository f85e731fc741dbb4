//! The stored record: a value plus an optional deadline.
//!
//! In-memory backends keep `Item<Bytes>` (the codec output), the file backend
//! encodes a whole `Item<T>` so the deadline travels with the value on disk:
//!
//! ```text
//! {"expires_at":"2026-10-16T08:00:30Z","data":{"user":"ariz"}}
//! {"data":42}                                   <- never expires
//! ```

use crate::error::{Result, StoreError};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A stored value with an optional absolute expiry instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item<T> {
    /// When this item expires (None = never expires)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,

    /// The stored value
    pub data: T,
}

impl<T> Item<T> {
    /// Creates an item that expires `ttl` from now. A zero `ttl` never expires.
    pub fn new(data: T, ttl: Duration) -> Result<Self> {
        Self::new_at(data, ttl, Utc::now())
    }

    /// Same as [`Item::new`] with an explicit "now".
    pub fn new_at(data: T, ttl: Duration, now: DateTime<Utc>) -> Result<Self> {
        let expires_at = if ttl.is_zero() {
            None
        } else {
            let deadline = TimeDelta::from_std(ttl)
                .ok()
                .and_then(|delta| now.checked_add_signed(delta))
                .ok_or(StoreError::InvalidTtl(ttl))?;
            Some(deadline)
        };

        Ok(Self { expires_at, data })
    }

    /// Creates an item that never expires.
    pub fn persistent(data: T) -> Self {
        Self {
            expires_at: None,
            data,
        }
    }

    /// Checks if this item has expired.
    #[inline]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Checks expiry against `now`. An item is still valid exactly at its
    /// deadline.
    #[inline]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|deadline| now > deadline)
    }

    /// Returns the remaining lifetime, or None if the item never expires.
    pub fn remaining(&self) -> Option<Duration> {
        self.expires_at.map(|deadline| {
            (deadline - Utc::now())
                .to_std()
                .unwrap_or(Duration::ZERO)
        })
    }
}
