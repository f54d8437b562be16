use newsfeed_core::db::{open_kv_db, OpenOptions};
use newsfeed_core::model::authorization_keys::AuthorizationKeys;
use newsfeed_core::repo::kv::{KvGetter, KvInserter, KvStore, RawKv, SqliteKvStore};
use newsfeed_core::{Context, Store, StoreError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct CrawlCursor {
    source: String,
    page: u32,
}

fn keys(token: &str) -> AuthorizationKeys {
    AuthorizationKeys {
        authorization_token: token.to_string(),
        refresh_token: format!("{token}-refresh"),
        authorization_expires_at: 10,
        refresh_expires_at: 20,
    }
}

#[test]
fn raw_values_and_structs_round_trip() {
    let store = Store::open_in_memory().unwrap();
    let ctx = Context::background();
    let raw = store.provider().raw_kv();

    raw.set_value(&ctx, "crawler/last_run", "1700000000000", None)
        .unwrap();
    assert_eq!(raw.get(&ctx, "crawler/last_run").unwrap(), "1700000000000");

    let cursor = CrawlCursor {
        source: "alpha".to_string(),
        page: 3,
    };
    raw.set_struct(&ctx, "crawler/cursor", &cursor, None).unwrap();
    assert_eq!(
        raw.get_struct::<CrawlCursor>(&ctx, "crawler/cursor").unwrap(),
        cursor
    );

    raw.remove(&ctx, "crawler/cursor").unwrap();
    raw.remove(&ctx, "crawler/cursor").unwrap();
    assert!(raw.get(&ctx, "crawler/cursor").unwrap_err().is_not_found());
}

#[test]
fn struct_read_of_plain_value_is_serialization_error() {
    let store = Store::open_in_memory().unwrap();
    let ctx = Context::background();
    let raw = store.provider().raw_kv();
    raw.set_value(&ctx, "k", "plain", None).unwrap();

    let err = raw.get_struct::<CrawlCursor>(&ctx, "k").unwrap_err();
    assert!(matches!(err, StoreError::Serialization { .. }));
}

#[test]
fn expired_entries_disappear() {
    let store = Store::open_in_memory().unwrap();
    let ctx = Context::background();
    let raw = store.provider().raw_kv();

    raw.set_value(&ctx, "session", "v", Some(Duration::from_millis(1)))
        .unwrap();
    raw.set_value(&ctx, "durable", "v", Some(Duration::from_secs(3600)))
        .unwrap();
    std::thread::sleep(Duration::from_millis(5));

    assert!(raw.get(&ctx, "session").unwrap_err().is_not_found());
    assert_eq!(raw.get(&ctx, "durable").unwrap(), "v");
}

#[test]
fn ttl_inserter_expires_records() {
    let store = Store::open_in_memory().unwrap();
    let ctx = Context::background();
    let provider = store.provider().authorization_keys();

    provider
        .with_ttl(Duration::ZERO)
        .insert(&ctx, keys("short"))
        .unwrap();
    assert!(provider.get(&ctx).unwrap_err().is_not_found());
}

#[test]
fn batch_insert_keys_are_namespaced_and_distinct() {
    let kv = SqliteKvStore::new(
        newsfeed_core::db::open_kv_db_in_memory().unwrap(),
    );
    let ctx = Context::background();
    let written = KvInserter::<AuthorizationKeys>::new(&kv)
        .insert_batch(&ctx, &[keys("a"), keys("b"), keys("c")])
        .unwrap();

    assert_eq!(written.len(), 3);
    for key in &written {
        assert!(key.starts_with("model/authorization_keys/"));
    }
    let mut unique = written.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), 3);

    let getter = KvGetter::<AuthorizationKeys>::new(&kv);
    assert_eq!(getter.by_key(written[0].clone()).get(&ctx).unwrap(), keys("a"));
    assert!(getter.get(&ctx).unwrap_err().is_not_found());
}

#[test]
fn file_backed_entries_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kv.db");
    let ctx = Context::background();

    {
        let kv = SqliteKvStore::new(open_kv_db(&path, OpenOptions::default()).unwrap());
        RawKv::new(&kv).set_value(&ctx, "k", "v", None).unwrap();
    }

    let kv = SqliteKvStore::new(open_kv_db(&path, OpenOptions::default()).unwrap());
    assert_eq!(kv.get(&ctx, "k").unwrap().as_deref(), Some("v"));
}
