use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use crate::config::MAX_LIFETIME;

/// A live mapping from a short code to its target
///
/// Everything except the click counter is immutable after creation. The
/// counter only moves through [`Record::try_click`].
#[derive(Debug)]
pub(crate) struct Record {
    code: Arc<str>,
    target: Arc<str>,
    owner_id: Arc<str>,
    click_limit: u32,
    click_count: AtomicU32,
    created_at: SystemTime,
    expires_at: SystemTime,
}

/// Result of a single click attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Click {
    /// The click was counted; `last` is set when it used up the quota
    Accepted { count: u32, last: bool },
    /// The quota was already used up; nothing changed
    Exhausted,
}

impl Record {
    pub(crate) fn new(
        code: Arc<str>,
        target: Arc<str>,
        owner_id: Arc<str>,
        click_limit: u32,
        lifetime: Duration,
    ) -> Self {
        let created_at = SystemTime::now();
        Self {
            code,
            target,
            owner_id,
            click_limit,
            click_count: AtomicU32::new(0),
            created_at,
            expires_at: created_at + lifetime.min(MAX_LIFETIME),
        }
    }

    pub(crate) fn code(&self) -> &str {
        &self.code
    }

    /// Returns a shared reference to the code (zero-cost clone)
    pub(crate) fn code_shared(&self) -> Arc<str> {
        Arc::clone(&self.code)
    }

    pub(crate) fn target(&self) -> &str {
        &self.target
    }

    pub(crate) fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub(crate) fn expires_at(&self) -> SystemTime {
        self.expires_at
    }

    /// Checks if this record has expired by wall-clock time
    pub(crate) fn is_expired(&self) -> bool {
        SystemTime::now() >= self.expires_at
    }

    /// Wall-clock time until expiry, `None` once expired
    pub(crate) fn time_left(&self) -> Option<Duration> {
        self.expires_at
            .duration_since(SystemTime::now())
            .ok()
            .filter(|left| !left.is_zero())
    }

    /// Counts one click unless the quota is already used up.
    ///
    /// The compare-and-swap guarantees that concurrent callers never push the
    /// count past the limit and that exactly one of them sees `last == true`.
    pub(crate) fn try_click(&self) -> Click {
        let limit = self.click_limit;
        match self
            .click_count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
                (count < limit).then_some(count + 1)
            }) {
            Ok(previous) => {
                let count = previous + 1;
                Click::Accepted {
                    count,
                    last: count >= limit,
                }
            }
            Err(_) => Click::Exhausted,
        }
    }

    pub(crate) fn snapshot(&self) -> RecordSnapshot {
        RecordSnapshot {
            code: self.code.to_string(),
            target: self.target.to_string(),
            owner_id: self.owner_id.to_string(),
            click_limit: self.click_limit,
            click_count: self.click_count.load(Ordering::Acquire),
            created_at: self.created_at,
            expires_at: self.expires_at,
        }
    }
}

/// Point-in-time copy of a record, as returned by listing operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSnapshot {
    pub code: String,
    pub target: String,
    pub owner_id: String,
    pub click_limit: u32,
    pub click_count: u32,
    pub created_at: SystemTime,
    pub expires_at: SystemTime,
}

impl RecordSnapshot {
    /// Clicks left before the record is evicted
    pub fn remaining_clicks(&self) -> u32 {
        self.click_limit.saturating_sub(self.click_count)
    }

    /// Checks if the snapshot's expiry time has passed
    pub fn is_expired(&self) -> bool {
        SystemTime::now() >= self.expires_at
    }
}
