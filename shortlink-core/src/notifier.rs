//! Eviction event sinks.

/// Receives a notification each time the registry evicts a record.
///
/// Called synchronously from whichever thread performed the eviction, after
/// the registry has released its map locks. Each eviction is reported once.
/// Implementations must not panic; failures are theirs to swallow or log.
pub trait EvictionNotifier: Send + Sync + 'static {
    /// The record's click limit was used up
    fn on_quota_reached(&self, owner_id: &str, code: &str);

    /// The record outlived its lifetime
    fn on_expired(&self, owner_id: &str, code: &str);
}

/// Notifier that emits a `tracing` event per eviction. Used when no other
/// sink is supplied.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl EvictionNotifier for TracingNotifier {
    fn on_quota_reached(&self, owner_id: &str, code: &str) {
        tracing::info!(owner_id, code, "click limit reached, short link removed");
    }

    fn on_expired(&self, owner_id: &str, code: &str) {
        tracing::info!(owner_id, code, "short link expired and was removed");
    }
}
