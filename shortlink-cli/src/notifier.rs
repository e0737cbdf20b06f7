use shortlink_core::EvictionNotifier;

/// Prints a notice to the console whenever one of the user's links is removed
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNotifier;

impl EvictionNotifier for ConsoleNotifier {
    fn on_quota_reached(&self, owner_id: &str, code: &str) {
        tracing::debug!(owner_id, code, "quota reached");
        println!("\n[notice] Click limit reached for short link {code}. The link was removed.\n");
    }

    fn on_expired(&self, owner_id: &str, code: &str) {
        tracing::debug!(owner_id, code, "expired");
        println!("\n[notice] Short link {code} expired. The link was removed.\n");
    }
}
