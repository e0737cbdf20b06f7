use shortlink_core::{EvictionNotifier, Registry, RegistryConfig, RegistryError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
struct CountingNotifier {
    quota: AtomicUsize,
    expired: AtomicUsize,
}

impl EvictionNotifier for CountingNotifier {
    fn on_quota_reached(&self, _owner_id: &str, _code: &str) {
        self.quota.fetch_add(1, Ordering::SeqCst);
    }

    fn on_expired(&self, _owner_id: &str, _code: &str) {
        self.expired.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn test_quota_lifecycle() {
    let notifier = Arc::new(CountingNotifier::default());
    let registry = Registry::with_notifier(RegistryConfig::default(), notifier.clone());

    let code = registry.create("https://a.example", "u1", 3).unwrap();
    for _ in 0..3 {
        assert_eq!(registry.consume(&code, "u1").unwrap(), "https://a.example");
    }
    assert_eq!(registry.total_count(), 0);

    let err = registry.consume(&code, "u1").unwrap_err();
    assert!(matches!(err, RegistryError::QuotaExceeded { .. }));
    assert!(err.evicted());
    assert_eq!(notifier.quota.load(Ordering::SeqCst), 1);
    assert_eq!(notifier.expired.load(Ordering::SeqCst), 0);

    registry.shutdown().await;
}

#[tokio::test]
async fn test_expiry_lifecycle() {
    let notifier = Arc::new(CountingNotifier::default());
    let config = RegistryConfig::default().with_lifetime(Duration::from_millis(40));
    let registry = Registry::with_notifier(config, notifier.clone());

    registry.create("https://a.example", "u1", 100).unwrap();
    registry.create("https://b.example", "u1", 100).unwrap();
    registry.create("https://c.example", "u2", 100).unwrap();
    assert_eq!(registry.count_by_owner("u1"), 2);

    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(registry.total_count(), 0);
    assert!(registry.list_by_owner("u1").is_empty());
    assert_eq!(notifier.expired.load(Ordering::SeqCst), 3);
    assert_eq!(registry.pending_expiry_checks(), 0);
    assert_eq!(registry.purge_expired(), 0);

    registry.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_owners_are_isolated() {
    let registry = Registry::new();

    let mut tasks = Vec::new();
    for owner in ["alice", "bob"] {
        let registry = registry.clone();
        tasks.push(tokio::spawn(async move {
            (0..20)
                .map(|i| {
                    registry
                        .create(&format!("https://{owner}.example/{i}"), owner, 1)
                        .unwrap()
                })
                .collect::<Vec<_>>()
        }));
    }

    let mut created = Vec::new();
    for task in tasks {
        created.push(task.await.unwrap());
    }

    for (owner, codes) in ["alice", "bob"].into_iter().zip(&created) {
        let listed: Vec<String> = registry
            .list_by_owner(owner)
            .into_iter()
            .map(|snap| {
                assert_eq!(snap.owner_id, owner);
                snap.code
            })
            .collect();
        assert_eq!(&listed, codes);
    }
    assert_eq!(registry.total_count(), 40);

    registry.shutdown().await;
}
