use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::{Arc, Weak};
use std::time::{Duration, SystemTime};
use tokio::runtime::Handle;

use crate::code::{seed_for, CodeGenerator, HashCodeGenerator};
use crate::config::{RegistryConfig, MAX_LIFETIME};
use crate::error::{RegistryError, Result};
use crate::notifier::{EvictionNotifier, TracingNotifier};
use crate::record::{Click, Record, RecordSnapshot};
use crate::scheduler::ExpiryScheduler;

/// Internal shared state for the registry
struct RegistryInner {
    by_code: DashMap<Arc<str>, Arc<Record>>,
    /// Codes per owner in creation order. May briefly hold codes whose record
    /// is already gone; readers skip those.
    by_owner: DashMap<Arc<str>, Vec<Arc<str>>>,
    /// Codes evicted for using up their quota, kept until the record would
    /// have expired so late clicks still report `QuotaExceeded`
    spent: DashMap<Arc<str>, SystemTime>,
    generator: Box<dyn CodeGenerator>,
    notifier: Arc<dyn EvictionNotifier>,
    scheduler: ExpiryScheduler,
    config: RegistryConfig,
}

/// Thread-safe registry of short codes with click quotas and TTL eviction
///
/// Uses `DashMap` for the code and owner indices, so operations on distinct
/// codes never contend on a registry-wide lock. Click accounting is a
/// compare-and-swap on each record's counter.
///
/// A record is evicted when its last permitted click is consumed or when its
/// lifetime runs out, whichever comes first. Lifetime expiry is enforced both
/// lazily (on `consume`) and by a one-shot check scheduled on the Tokio
/// runtime when the record is created. Every eviction is reported to the
/// [`EvictionNotifier`] exactly once.
///
/// # Example
///
/// ```rust,no_run
/// use shortlink_core::Registry;
///
/// #[tokio::main]
/// async fn main() {
///     let registry = Registry::new();
///
///     let code = registry.create("https://example.com", "user-1", 2).unwrap();
///     assert_eq!(registry.consume(&code, "user-1").unwrap(), "https://example.com");
///
///     registry.shutdown().await;
/// }
/// ```
#[derive(Clone)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

impl Registry {
    /// Creates a registry with default configuration, logging evictions via
    /// `tracing`
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime context. The registry
    /// needs a runtime to run its expiry checks.
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Creates a registry with custom configuration
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime context.
    pub fn with_config(config: RegistryConfig) -> Self {
        Self::with_notifier(config, Arc::new(TracingNotifier))
    }

    /// Creates a registry that reports evictions to `notifier`
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime context.
    pub fn with_notifier(config: RegistryConfig, notifier: Arc<dyn EvictionNotifier>) -> Self {
        Self::with_generator(config, notifier, HashCodeGenerator)
    }

    /// Creates a registry with a custom code generator
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime context.
    pub fn with_generator(
        config: RegistryConfig,
        notifier: Arc<dyn EvictionNotifier>,
        generator: impl CodeGenerator,
    ) -> Self {
        let mut config = config;
        // The field is public, so cap it here too
        config.lifetime = config.lifetime.min(MAX_LIFETIME);

        let Ok(handle) = Handle::try_current() else {
            panic!(
                "shortlink_core::Registry requires a Tokio runtime. \
                 Construct it from within a #[tokio::main] or #[tokio::test] context, \
                 or from code running on a Tokio runtime."
            );
        };

        let inner = Arc::new(RegistryInner {
            by_code: DashMap::new(),
            by_owner: DashMap::new(),
            spent: DashMap::new(),
            generator: Box::new(generator),
            notifier,
            scheduler: ExpiryScheduler::new(handle),
            config,
        });

        Self { inner }
    }

    /// Registers `target` under a freshly generated code owned by `owner_id`
    ///
    /// The record can be consumed `click_limit` times and expires after the
    /// configured lifetime. Returns the new code.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::InvalidArgument` if `click_limit` is zero.
    pub fn create(&self, target: &str, owner_id: &str, click_limit: u32) -> Result<String> {
        if click_limit == 0 {
            return Err(RegistryError::InvalidArgument(
                "click limit must be a positive integer".to_string(),
            ));
        }

        let inner = &self.inner;
        let target: Arc<str> = Arc::from(target);
        let owner: Arc<str> = Arc::from(owner_id);

        // No retry cap: every seed is fresh, so a free code turns up eventually.
        let record = loop {
            let code: Arc<str> = Arc::from(inner.generator.generate(&seed_for(owner_id)));
            if inner.spent.contains_key(&*code) {
                continue;
            }
            match inner.by_code.entry(Arc::clone(&code)) {
                Entry::Occupied(_) => {
                    tracing::debug!(code = %code, "short code collision, retrying");
                }
                Entry::Vacant(slot) => {
                    let record = Arc::new(Record::new(
                        code,
                        Arc::clone(&target),
                        Arc::clone(&owner),
                        click_limit,
                        inner.config.lifetime,
                    ));
                    slot.insert(Arc::clone(&record));
                    break record;
                }
            }
        };

        inner
            .by_owner
            .entry(owner)
            .or_default()
            .push(record.code_shared());
        inner.schedule_expiry(&record, inner.config.lifetime);

        tracing::debug!(code = record.code(), owner_id, click_limit, "short link created");
        Ok(record.code().to_string())
    }

    /// Counts one click on `code` and returns its target
    ///
    /// The click that uses up the quota still succeeds; the record is evicted
    /// right after it. `requester_owner_id` is logged but not checked against
    /// the record's owner: anyone holding a code may consume it.
    ///
    /// # Errors
    ///
    /// - `NotFound` if no record has this code. This includes codes whose
    ///   record was already evicted by its expiry check: only the call that
    ///   finds the record expired and evicts it reports `Expired`.
    /// - `Expired` if the record outlived its lifetime (it is evicted)
    /// - `QuotaExceeded` if the click limit was already used up. Unlike
    ///   expired codes, quota-evicted codes keep reporting this until the
    ///   record's lifetime would have ended.
    pub fn consume(&self, code: &str, requester_owner_id: &str) -> Result<String> {
        let inner = &self.inner;
        let Some(record) = inner.by_code.get(code).map(|entry| Arc::clone(entry.value())) else {
            return Err(inner.missing(code));
        };

        if record.is_expired() {
            inner.evict_expired(&record);
            return Err(RegistryError::Expired {
                code: code.to_string(),
            });
        }

        match record.try_click() {
            Click::Accepted { count, last } => {
                tracing::debug!(code, requester_owner_id, clicks = count, "short link consumed");
                if last {
                    inner.evict_spent(&record);
                }
                Ok(record.target().to_string())
            }
            Click::Exhausted => {
                inner.evict_spent(&record);
                Err(RegistryError::QuotaExceeded {
                    code: code.to_string(),
                })
            }
        }
    }

    /// Returns the live records created by `owner_id`, oldest first
    pub fn list_by_owner(&self, owner_id: &str) -> Vec<RecordSnapshot> {
        self.inner
            .live_records_of(owner_id)
            .map(|record| record.snapshot())
            .collect()
    }

    /// Returns the number of live records created by `owner_id`
    #[must_use]
    pub fn count_by_owner(&self, owner_id: &str) -> usize {
        self.inner.live_records_of(owner_id).count()
    }

    /// Returns the number of records in the registry
    #[must_use]
    pub fn total_count(&self) -> usize {
        self.inner.by_code.len()
    }

    /// Returns the number of expiry checks that have not fired yet
    #[must_use]
    pub fn pending_expiry_checks(&self) -> usize {
        self.inner.scheduler.pending()
    }

    /// Evicts every record whose lifetime has run out
    ///
    /// Returns the number of records this call removed. Expiry checks already
    /// do this per record; this is a manual sweep on top of them.
    pub fn purge_expired(&self) -> usize {
        let inner = &self.inner;
        let expired: Vec<Arc<Record>> = inner
            .by_code
            .iter()
            .filter(|entry| entry.value().is_expired())
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        let removed = expired
            .iter()
            .filter(|record| inner.evict_expired(record))
            .count();

        let now = SystemTime::now();
        inner.spent.retain(|_, until| *until > now);
        inner.by_owner.retain(|_, codes| !codes.is_empty());

        removed
    }

    /// Stops scheduling expiry checks and drains the outstanding ones
    ///
    /// Waits at most the configured shutdown timeout, then aborts whatever is
    /// still pending. Records stay in place; `create` and `consume` keep
    /// working afterwards, with expiry enforced lazily on access.
    pub async fn shutdown(&self) {
        self.inner
            .scheduler
            .shutdown(self.inner.config.shutdown_timeout)
            .await;
    }

    /// Inserts a record that is already past its lifetime (for testing purposes)
    #[cfg(test)]
    fn insert_expired(&self, target: &str, owner_id: &str, click_limit: u32) -> String {
        let code: Arc<str> = Arc::from(HashCodeGenerator.generate(&seed_for(owner_id)));
        let owner: Arc<str> = Arc::from(owner_id);
        let record = Arc::new(Record::new(
            Arc::clone(&code),
            Arc::from(target),
            Arc::clone(&owner),
            click_limit,
            Duration::ZERO,
        ));
        self.inner.by_code.insert(Arc::clone(&code), record);
        self.inner.by_owner.entry(owner).or_default().push(Arc::clone(&code));
        code.to_string()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryInner {
    /// Error for a code with no live record
    fn missing(&self, code: &str) -> RegistryError {
        let now = SystemTime::now();
        match self.spent.get(code).map(|until| *until) {
            Some(until) if until > now => RegistryError::QuotaExceeded {
                code: code.to_string(),
            },
            Some(_) => {
                self.spent.remove_if(code, |_, until| *until <= now);
                RegistryError::Expired {
                    code: code.to_string(),
                }
            }
            None => RegistryError::NotFound {
                code: code.to_string(),
            },
        }
    }

    fn live_records_of<'a>(&'a self, owner_id: &'a str) -> impl Iterator<Item = Arc<Record>> + 'a {
        let codes = self
            .by_owner
            .get(owner_id)
            .map(|codes| codes.value().clone())
            .unwrap_or_default();

        codes.into_iter().filter_map(move |code| {
            let record = self.by_code.get(&*code).map(|entry| Arc::clone(entry.value()))?;
            (record.owner_id() == owner_id && !record.is_expired()).then_some(record)
        })
    }

    /// Schedules the one-shot expiry check for `record`
    ///
    /// The check holds only weak references, so it does nothing once the
    /// record has been evicted or the registry dropped.
    fn schedule_expiry(self: &Arc<Self>, record: &Arc<Record>, delay: Duration) {
        let registry: Weak<Self> = Arc::downgrade(self);
        let target: Weak<Record> = Arc::downgrade(record);
        let code = record.code_shared();
        let expires_at = record.expires_at();

        let scheduled = self.scheduler.schedule_once(delay, move || {
            let Some(inner) = registry.upgrade() else {
                return;
            };
            if let Some(record) = target.upgrade() {
                match record.time_left() {
                    // Wall clock lagged the timer; check again when it catches up
                    Some(left) => inner.schedule_expiry(&record, left),
                    None => {
                        inner.evict_expired(&record);
                    }
                }
            }
            // Lifetime is over, so a spent marker left by this record can go
            inner.spent.remove_if(&*code, |_, until| *until <= expires_at);
        });

        if !scheduled {
            tracing::debug!(
                code = record.code(),
                "registry shut down, expiry will be enforced on access"
            );
        }
    }

    /// Removes `record` from both indices.
    ///
    /// Only the exact record instance is removed, never a newer record
    /// holding the same code. Returns `true` if this call removed it; later
    /// calls for the same record are no-ops.
    fn evict(&self, record: &Arc<Record>) -> bool {
        let removed = self
            .by_code
            .remove_if(record.code(), |_, live| Arc::ptr_eq(live, record))
            .is_some();
        if !removed {
            return false;
        }

        if let Some(mut codes) = self.by_owner.get_mut(record.owner_id()) {
            if let Some(pos) = codes.iter().position(|code| &**code == record.code()) {
                codes.remove(pos);
            }
        }
        self.by_owner
            .remove_if(record.owner_id(), |_, codes| codes.is_empty());
        true
    }

    fn evict_expired(&self, record: &Arc<Record>) -> bool {
        let removed = self.evict(record);
        if removed {
            self.notifier.on_expired(record.owner_id(), record.code());
        }
        removed
    }

    fn evict_spent(&self, record: &Arc<Record>) -> bool {
        // Mark the code before removing the record so a concurrent lookup
        // never falls through to `NotFound`
        self.spent.insert(record.code_shared(), record.expires_at());
        let removed = self.evict(record);
        if removed {
            self.notifier.on_quota_reached(record.owner_id(), record.code());
        }
        removed
    }
}
