//! Storing and restoring carts through SQLite.

use std::path::PathBuf;

use cart_db::Db;
use cart_engine::{Cart, CartConfig, CartEvent, ItemAttributes, RecordingDispatcher};
use cart_session::{MemoryStore, Session, SessionId};

fn open(session: &str, db: Db) -> Cart {
    let session = Session::new(SessionId::new(session), MemoryStore::new());
    Cart::new(CartConfig::default(), session, db).unwrap()
}

fn db_path(name: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("cart-{name}-{}.db", std::process::id()));
    let _ = std::fs::remove_file(&path);
    path
}

fn snapshot(cart: &Cart) -> Vec<(String, i64)> {
    cart.content()
        .unwrap()
        .values()
        .map(|item| (item.row_id.clone(), item.qty))
        .collect()
}

#[test]
fn test_store_destroy_restore_round_trip() {
    let cart = open("sess_a", Db::connect(None).unwrap());
    cart.add_item("SKU1", "Widget", 2, 9.99).unwrap();
    let tee = ItemAttributes::new("TEE", "T-shirt", 3, 15.0).with_option("size", "L");
    cart.add(tee).unwrap();
    let before = snapshot(&cart);

    cart.store("user-1").unwrap();
    cart.destroy(&[]).unwrap();
    assert!(cart.is_empty().unwrap());

    cart.restore("user-1").unwrap();
    assert_eq!(snapshot(&cart), before);
}

#[test]
fn test_restore_without_snapshot_is_noop() {
    let recorder = RecordingDispatcher::new();
    let cart = open("sess_b", Db::connect(None).unwrap()).with_events(recorder.clone());
    cart.add_item("SKU1", "Widget", 1, 1.0).unwrap();
    let before = snapshot(&cart);

    cart.restore("nobody").unwrap();

    assert_eq!(snapshot(&cart), before);
    assert!(!recorder.names().contains(&"cart.restored"));
}

#[test]
fn test_restore_merges_into_live_content() {
    let cart = open("sess_c", Db::connect(None).unwrap());
    let item = cart.add_item("SKU1", "Widget", 2, 9.99).unwrap();
    cart.store("user-1").unwrap();

    cart.add_item("SKU1", "Widget", 1, 9.99).unwrap();
    cart.restore("user-1").unwrap();

    assert_eq!(cart.get(&item.row_id).unwrap().qty, 5);
}

#[test]
fn test_store_replaces_previous_snapshot() {
    let cart = open("sess_d", Db::connect(None).unwrap());
    let item = cart.add_item("SKU1", "Widget", 1, 1.0).unwrap();
    cart.store("user-1").unwrap();

    cart.update(&item.row_id, 4).unwrap();
    cart.store("user-1").unwrap();

    cart.destroy(&[]).unwrap();
    cart.restore("user-1").unwrap();
    assert_eq!(cart.get(&item.row_id).unwrap().qty, 4);
}

#[test]
fn test_snapshots_are_per_instance() {
    let mut cart = open("sess_e", Db::connect(None).unwrap());
    cart.add_item("A", "A", 1, 1.0).unwrap();
    cart.store("user-1").unwrap();

    cart.set_instance("wishlist").unwrap();
    cart.restore("user-1").unwrap();
    assert!(cart.is_empty().unwrap());

    cart.set_instance("default").unwrap();
    cart.destroy(&[]).unwrap();
    cart.restore("user-1").unwrap();
    assert_eq!(cart.count().unwrap(), 1);
    assert_eq!(cart.instance(), "default");
}

#[test]
fn test_restore_in_another_session() {
    let path = db_path("sessions");
    let location = path.to_string_lossy().to_string();

    let first = open("sess_first", Db::connect(Some(location.as_str())).unwrap());
    let item = first.add_item("SKU1", "Widget", 2, 9.99).unwrap();
    first.store("user-7").unwrap();
    drop(first);

    let recorder = RecordingDispatcher::new();
    let db = Db::connect(Some(location.as_str())).unwrap();
    let second = open("sess_second", db).with_events(recorder.clone());
    assert!(second.is_empty().unwrap());
    second.restore("user-7").unwrap();

    assert_eq!(second.get(&item.row_id).unwrap().qty, 2);
    assert_eq!(
        recorder.events(),
        vec![CartEvent::Restored {
            identifier: "user-7".to_string(),
            instance: "default".to_string(),
        }]
    );

    drop(second);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_erase_stored() {
    let cart = open("sess_f", Db::connect(None).unwrap());
    cart.add_item("A", "A", 1, 1.0).unwrap();
    cart.store("user-1").unwrap();
    cart.erase_stored("user-1").unwrap();

    cart.destroy(&[]).unwrap();
    cart.restore("user-1").unwrap();
    assert!(cart.is_empty().unwrap());
}
