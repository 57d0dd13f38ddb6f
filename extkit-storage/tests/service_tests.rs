use extkit_storage::{
    ExtensionStorage, MemoryBackend, Partition, QuotaInfo, StorageBackend, StorageService,
};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

fn service() -> StorageService {
    StorageService::new(ExtensionStorage::in_memory())
}

/// A service whose partitions can be taken offline.
fn service_with_backends() -> (StorageService, Arc<MemoryBackend>, Arc<MemoryBackend>) {
    let local = Arc::new(MemoryBackend::unbounded());
    let sync = Arc::new(MemoryBackend::with_sync_quota());
    let storage = ExtensionStorage::new(local.clone(), sync.clone());
    (StorageService::new(storage), local, sync)
}

// ── getItem / setItem ───────────────────────────────────────────

#[tokio::test]
async fn set_then_get_local() {
    let svc = service();
    assert!(svc.set_item("key", "value", Partition::Local).await);
    let got: Option<String> = svc.get_item("key", Partition::Local).await;
    assert_eq!(got.as_deref(), Some("value"));
}

#[tokio::test]
async fn partitions_are_independent() {
    let svc = service();
    assert!(svc.set_item("key", &json!("local"), Partition::Local).await);
    assert!(svc.set_item("key", &json!("sync"), Partition::Sync).await);

    assert_eq!(
        svc.get_item::<Value>("key", Partition::Local).await,
        Some(json!("local"))
    );
    assert_eq!(
        svc.get_item::<Value>("key", Partition::Sync).await,
        Some(json!("sync"))
    );
}

#[tokio::test]
async fn missing_item_is_none() {
    let svc = service();
    assert_eq!(svc.get_item::<Value>("nonexistent", Partition::Local).await, None);
}

#[tokio::test]
async fn stored_null_reads_as_none() {
    let svc = service();
    assert!(svc.set_item("key", &Value::Null, Partition::Local).await);
    assert_eq!(svc.get_item::<Value>("key", Partition::Local).await, None);
    assert!(!svc.has_item("key", Partition::Local).await);
}

#[tokio::test]
async fn set_overwrites() {
    let svc = service();
    svc.set_item("n", &1, Partition::Local).await;
    svc.set_item("n", &2, Partition::Local).await;
    assert_eq!(svc.get_item::<i64>("n", Partition::Local).await, Some(2));
}

#[tokio::test]
async fn wrong_shape_reads_as_none() {
    let svc = service();
    svc.set_item("n", "text", Partition::Local).await;
    assert_eq!(svc.get_item::<i64>("n", Partition::Local).await, None);
}

// ── Failure policy ──────────────────────────────────────────────

#[tokio::test]
async fn get_failure_yields_none() {
    let (svc, local, _) = service_with_backends();
    svc.set_item("key", "value", Partition::Local).await;
    local.set_online(false);
    assert_eq!(svc.get_item::<String>("key", Partition::Local).await, None);
}

#[tokio::test]
async fn set_failure_yields_false() {
    let (svc, local, _) = service_with_backends();
    local.set_online(false);
    assert!(!svc.set_item("key", "value", Partition::Local).await);
    local.set_online(true);
    assert_eq!(svc.get_item::<String>("key", Partition::Local).await, None);
}

#[tokio::test]
async fn remove_and_clear_failures_yield_false() {
    let (svc, _, sync) = service_with_backends();
    sync.set_online(false);
    assert!(!svc.remove_item("key", Partition::Sync).await);
    assert!(!svc.clear(Partition::Sync).await);
    assert!(svc.get_all_items(Partition::Sync).await.is_empty());
    assert_eq!(svc.get_bytes_in_use(Partition::Sync).await, 0);
}

#[tokio::test]
async fn failure_in_one_partition_does_not_affect_other() {
    let (svc, _, sync) = service_with_backends();
    sync.set_online(false);
    assert!(svc.set_item("key", &true, Partition::Local).await);
    assert!(!svc.set_item("key", &true, Partition::Sync).await);
}

#[tokio::test]
async fn quota_exceeded_write_returns_false() {
    let svc = service();
    let big = "x".repeat(9_000);
    assert!(!svc.set_item("big", &big, Partition::Sync).await);
    assert!(svc.set_item("big", &big, Partition::Local).await);
}

// ── removeItem / clear / bulk ───────────────────────────────────

#[tokio::test]
async fn remove_item_deletes_key() {
    let svc = service();
    svc.set_item("key", "value", Partition::Local).await;
    assert!(svc.remove_item("key", Partition::Local).await);
    assert!(!svc.has_item("key", Partition::Local).await);
    assert!(svc.remove_item("key", Partition::Local).await);
}

#[tokio::test]
async fn clear_only_touches_one_partition() {
    let svc = service();
    svc.set_item("a", &1, Partition::Local).await;
    svc.set_item("b", &2, Partition::Sync).await;
    assert!(svc.clear(Partition::Local).await);
    assert!(svc.get_all_items(Partition::Local).await.is_empty());
    assert_eq!(svc.get_all_items(Partition::Sync).await.len(), 1);
}

#[tokio::test]
async fn bulk_get_and_set() {
    let svc = service();
    let items = json!({"a": 1, "b": [true], "c": {"x": "y"}});
    let Value::Object(items) = items else { unreachable!() };
    assert!(svc.set_items(items.clone(), Partition::Local).await);

    let got = svc
        .get_items(&["a".into(), "c".into(), "missing".into()], Partition::Local)
        .await;
    assert_eq!(got.len(), 2);
    assert_eq!(got["a"], json!(1));
    assert_eq!(got["c"], json!({"x": "y"}));
    assert_eq!(svc.get_all_items(Partition::Local).await, items);
}

// ── getWithDefault / hasItem ────────────────────────────────────

#[tokio::test]
async fn get_with_default_returns_stored_value() {
    let svc = service();
    let stored = json!({"name": "test", "value": 123});
    svc.set_item("key", &stored, Partition::Local).await;
    let got = svc
        .get_with_default("key", json!({"default": true}), Partition::Local)
        .await;
    assert_eq!(got, stored);
}

#[tokio::test]
async fn get_with_default_when_absent_or_null() {
    let svc = service();
    let default = json!({"fallback": "value"});
    assert_eq!(
        svc.get_with_default("key", default.clone(), Partition::Local).await,
        default
    );
    svc.set_item("key", &Value::Null, Partition::Local).await;
    assert_eq!(
        svc.get_with_default("key", default.clone(), Partition::Local).await,
        default
    );
}

#[tokio::test]
async fn get_with_default_preserves_falsy_values() {
    let svc = service();
    for falsy in [json!(false), json!(0), json!("")] {
        svc.set_item("k", &falsy, Partition::Local).await;
        let got = svc
            .get_with_default("k", json!("D"), Partition::Local)
            .await;
        assert_eq!(got, falsy);
    }
}

#[tokio::test]
async fn get_with_default_on_failure() {
    let (svc, local, _) = service_with_backends();
    svc.set_item("key", &5, Partition::Local).await;
    local.set_online(false);
    assert_eq!(svc.get_with_default("key", 42, Partition::Local).await, 42);
}

#[tokio::test]
async fn has_item_for_present_key() {
    let svc = service();
    svc.set_item("key", "value", Partition::Sync).await;
    assert!(svc.has_item("key", Partition::Sync).await);
    assert!(!svc.has_item("key", Partition::Local).await);
}

// ── Quota ───────────────────────────────────────────────────────

#[tokio::test]
async fn quota_info_reports_percent_used() {
    let svc = service();
    // 1 byte of key + 1023 bytes of JSON string ("" plus 1021 chars).
    let value = "v".repeat(1_021);
    assert!(svc.set_item("k", &value, Partition::Sync).await);

    assert_eq!(
        svc.get_quota_info().await,
        QuotaInfo {
            quota: 102_400,
            bytes_in_use: 1_024,
            percent_used: 1.0,
        }
    );
}

#[tokio::test]
async fn quota_info_divides_before_scaling() {
    let svc = service();
    assert!(svc.set_item("note", &"x".repeat(2_999), Partition::Sync).await);

    let info = svc.get_quota_info().await;
    assert_eq!(info.bytes_in_use, 4 + 3_001);
    assert_eq!(
        info.percent_used,
        info.bytes_in_use as f64 / info.quota as f64 * 100.0
    );
}

#[tokio::test]
async fn quota_info_ignores_local_partition() {
    let svc = service();
    svc.set_item("k", &"x".repeat(5_000), Partition::Local).await;
    let info = svc.get_quota_info().await;
    assert_eq!(info.bytes_in_use, 0);
    assert_eq!(info.percent_used, 0.0);
}

#[tokio::test]
async fn quota_info_without_quota_is_zero() {
    let storage = ExtensionStorage::new(
        Arc::new(MemoryBackend::unbounded()),
        Arc::new(MemoryBackend::unbounded()),
    );
    let svc = StorageService::new(storage);
    assert_eq!(svc.get_quota_info().await, QuotaInfo::default());
}

#[tokio::test]
async fn quota_info_serializes_camel_case() {
    let wire = serde_json::to_value(QuotaInfo {
        quota: 100,
        bytes_in_use: 10,
        percent_used: 10.0,
    })
    .unwrap();
    assert_eq!(wire, json!({"quota": 100, "bytesInUse": 10, "percentUsed": 10.0}));
}

// ── onChanged ───────────────────────────────────────────────────

#[tokio::test]
async fn subscription_only_sees_its_partition() {
    let svc = service();
    let mut sync_changes = svc.subscribe(Partition::Sync);

    svc.set_item("local-key", &1, Partition::Local).await;
    svc.set_item("sync-key", &2, Partition::Sync).await;

    let changes = sync_changes.recv().await.unwrap();
    assert_eq!(changes.len(), 1);
    let change = &changes["sync-key"];
    assert_eq!(change.old_value, None);
    assert_eq!(change.new_value, Some(json!(2)));
}

#[tokio::test]
async fn change_carries_old_and_new_values() {
    let svc = service();
    svc.set_item("k", "a", Partition::Local).await;
    let mut changes = svc.subscribe(Partition::Local);
    svc.set_item("k", "b", Partition::Local).await;
    svc.remove_item("k", Partition::Local).await;

    let set = changes.recv().await.unwrap();
    assert_eq!(set["k"].old_value, Some(json!("a")));
    assert_eq!(set["k"].new_value, Some(json!("b")));

    let removed = changes.recv().await.unwrap();
    assert_eq!(removed["k"].old_value, Some(json!("b")));
    assert_eq!(removed["k"].new_value, None);
}

#[tokio::test]
async fn failed_write_emits_nothing() {
    let svc = service();
    let mut changes = svc.subscribe(Partition::Sync);
    assert!(!svc.set_item("big", &"x".repeat(9_000), Partition::Sync).await);
    svc.set_item("small", &1, Partition::Sync).await;
    let set = changes.recv().await.unwrap();
    assert!(set.contains_key("small"));
    assert!(!set.contains_key("big"));
}

#[tokio::test]
async fn on_changed_invokes_callback() {
    let svc = service();
    let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let handle = svc.on_changed(Partition::Local, move |changes| {
        sink.lock().unwrap().extend(changes.into_keys());
    });

    svc.set_item("settings", &json!({"enabled": true}), Partition::Local).await;
    svc.set_item("ignored", &1, Partition::Sync).await;

    for _ in 0..50 {
        if !seen.lock().unwrap().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(*seen.lock().unwrap(), vec!["settings".to_string()]);
    handle.abort();
}

#[tokio::test]
async fn backend_is_reachable_through_storage() {
    let storage = ExtensionStorage::in_memory();
    assert_eq!(storage.backend(Partition::Sync).quota_bytes(), Some(102_400));
    assert_eq!(storage.backend(Partition::Local).quota_bytes(), None);
    assert_eq!(storage.backend(Partition::Local).name(), "memory");
}
