use fringestore_core::object::PropertyBag;
use fringestore_core::store::{Store, StoreState};
use fringestore_core::types::{register_type, TypeDescriptor};
use fringestore_core::util::delete_object;
use fringestore_core::value::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::tempdir;

struct Widget;
impl TypeDescriptor for Widget {
    fn type_tag(&self) -> &str {
        "tests::Widget"
    }
    fn indexed_property_names(&self) -> &[String] {
        static NAMES: std::sync::OnceLock<Vec<String>> = std::sync::OnceLock::new();
        NAMES.get_or_init(|| vec!["name".to_string()])
    }
}

fn ensure_widget_registered() {
    static ONCE: std::sync::Once = std::sync::Once::new();
    ONCE.call_once(|| register_type(Arc::new(Widget)));
}

struct WithDefaults;
impl TypeDescriptor for WithDefaults {
    fn type_tag(&self) -> &str {
        "tests::WithDefaults"
    }
    fn default_values(&self) -> PropertyBag {
        let mut bag = PropertyBag::new();
        bag.insert("status".to_string(), Value::from("new"));
        bag.insert("count".to_string(), Value::from(0_i64));
        bag
    }
}

fn ensure_with_defaults_registered() {
    static ONCE: std::sync::Once = std::sync::Once::new();
    ONCE.call_once(|| register_type(Arc::new(WithDefaults)));
}

struct RootedAt(PathBuf);
impl TypeDescriptor for RootedAt {
    fn type_tag(&self) -> &str {
        "tests::RootedAt"
    }
    fn default_commit_path(&self) -> Option<PathBuf> {
        Some(self.0.clone())
    }
}

#[test]
fn single_root_round_trip() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("root.fringe");

    let mut props = PropertyBag::new();
    props.insert("name".to_string(), Value::from("camp fire"));
    props.insert("count".to_string(), Value::from(3_i64));

    let store = Store::adopt("tests::Plain", props.clone(), Some(path.clone())).expect("adopt");
    assert_eq!(store.state(), StoreState::Fresh);
    store.commit().expect("commit");
    assert_eq!(store.state(), StoreState::Clean);
    drop(store);

    let reopened = Store::open(&path).expect("open");
    let root = reopened.root().expect("root set");
    assert_eq!(root.get("name").unwrap(), Value::from("camp fire"));
    assert_eq!(root.get("count").unwrap(), Value::from(3_i64));
}

#[test]
fn descendant_graph_round_trips_through_refs() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("graph.fringe");

    let store = Store::adopt("tests::Plain", PropertyBag::new(), Some(path.clone())).expect("adopt");
    let child = store
        .new_object("tests::Plain", PropertyBag::new())
        .expect("new_object");
    child.set("label", "child-a").expect("set label");

    let root = store.root().expect("root");
    root.list_add("children", child.as_ref_value().expect("ref"))
        .expect("list_add");

    store.commit().expect("commit");
    drop((store, child, root));

    let reopened = Store::open(&path).expect("open");
    let root = reopened.root().expect("root");
    assert_eq!(root.list_len("children").unwrap(), 1);
    let Value::Ref(child_ref) = root.list_get("children", 0).unwrap().unwrap() else {
        panic!("expected a Ref value");
    };
    let child = reopened.lookup(child_ref.uuid).expect("child resolves");
    assert_eq!(child.get("label").unwrap(), Value::from("child-a"));
}

#[test]
fn rollback_restores_snapshot_and_identities_stay_valid() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("txn.fringe");
    let store = Store::adopt("tests::Plain", PropertyBag::new(), Some(path)).expect("adopt");
    let root = store.root().expect("root");
    root.set("value", 1_i64).expect("set");

    store.begin_transaction().expect("begin");
    root.set("value", 2_i64).expect("set");
    assert_eq!(store.transaction_depth(), 1);
    store.rollback().expect("rollback");
    assert_eq!(store.transaction_depth(), 0);

    assert_eq!(root.get("value").unwrap(), Value::from(1_i64));
    // the handle is still valid after rollback even though the record it
    // names was reverted to an earlier version, not replaced.
    assert!(store.lookup(root.uuid()).is_some());
}

#[test]
fn delete_root_marks_store_deleted_and_removes_artifact() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("gone.fringe");
    let store = Store::adopt("tests::Plain", PropertyBag::new(), Some(path.clone())).expect("adopt");
    store.commit().expect("commit");
    assert!(path.exists());

    store.delete().expect("delete");
    assert_eq!(store.state(), StoreState::Deleted);
    assert!(!path.exists());

    let err = store.commit().unwrap_err();
    assert!(matches!(err, fringestore_error::Error::StoreDeleted { .. }));
}

#[test]
fn index_reconciliation_finds_roots_by_indexed_value() {
    ensure_widget_registered();
    let dir = tempdir().expect("tempdir");

    let mut props = PropertyBag::new();
    props.insert("name".to_string(), Value::from("acme"));
    let path_a = dir.path().join("a.fringe");
    let store_a = Store::adopt("tests::Widget", props, Some(path_a)).expect("adopt a");
    store_a.commit().expect("commit a");

    let mut props = PropertyBag::new();
    props.insert("name".to_string(), Value::from("acme"));
    let path_b = dir.path().join("b.fringe");
    let store_b = Store::adopt("tests::Widget", props, Some(path_b)).expect("adopt b");
    store_b.commit().expect("commit b");

    let matches = Store::root_objects_at(dir.path(), "tests::Widget", "name", &Value::from("acme"), None)
        .expect("root_objects_at");
    assert_eq!(matches.len(), 2);

    // changing the indexed value moves the pointer file, it does not
    // leave a stale one behind for the old value.
    store_a
        .root()
        .unwrap()
        .set("name", "acme-renamed")
        .expect("rename");
    store_a.commit().expect("recommit a");

    let still_acme = Store::root_objects_at(dir.path(), "tests::Widget", "name", &Value::from("acme"), None)
        .expect("root_objects_at acme");
    assert_eq!(still_acme.len(), 1);

    let renamed = Store::root_objects_at(
        dir.path(),
        "tests::Widget",
        "name",
        &Value::from("acme-renamed"),
        None,
    )
    .expect("root_objects_at renamed");
    assert_eq!(renamed.len(), 1);
}

#[test]
fn default_values_seed_new_objects_and_caller_overrides_win() {
    ensure_with_defaults_registered();

    let mut props = PropertyBag::new();
    props.insert("count".to_string(), Value::from(5_i64));
    let store = Store::adopt("tests::WithDefaults", props, None).expect("adopt");
    let root = store.root().expect("root");
    assert_eq!(root.get("status").unwrap(), Value::from("new"));
    assert_eq!(root.get("count").unwrap(), Value::from(5_i64));

    let child = store
        .new_object("tests::WithDefaults", PropertyBag::new())
        .expect("new_object");
    assert_eq!(child.get("status").unwrap(), Value::from("new"));
    assert_eq!(child.get("count").unwrap(), Value::from(0_i64));
}

#[test]
fn default_commit_path_instantiates_store_without_explicit_path() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("auto.fringe");
    register_type(Arc::new(RootedAt(path.clone())));

    let store = Store::adopt("tests::RootedAt", PropertyBag::new(), None).expect("adopt");
    assert_eq!(store.commit_path(), Some(path.clone()));
    store.commit().expect("commit");
    assert!(path.exists());
}

#[test]
fn delete_object_strips_dangling_references_and_commits() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("forget.fringe");
    let store = Store::adopt("tests::Plain", PropertyBag::new(), Some(path.clone())).expect("adopt");
    let child = store
        .new_object("tests::Plain", PropertyBag::new())
        .expect("new_object");
    let root = store.root().expect("root");
    root.list_add("children", child.as_ref_value().unwrap())
        .expect("list_add");
    root.set("favorite", child.as_ref_value().unwrap()).expect("set");
    store.commit().expect("commit");

    delete_object(&child).expect("delete_object");

    assert_eq!(root.list_len("children").unwrap(), 0);
    assert_eq!(root.get("favorite").unwrap(), Value::Null);
    assert!(store.lookup(child.uuid()).is_none());

    let reopened = Store::open(&path).expect("reopen");
    let root = reopened.root().expect("root");
    assert_eq!(root.list_len("children").unwrap(), 0);
    assert_eq!(root.get("favorite").unwrap(), Value::Null);
}

#[test]
fn root_objects_at_all_unions_dirs_and_dedups_by_commit_path() {
    ensure_widget_registered();
    let dir_a = tempdir().expect("tempdir a");
    let dir_b = tempdir().expect("tempdir b");

    let mut props = PropertyBag::new();
    props.insert("name".to_string(), Value::from("union"));
    let path_a = dir_a.path().join("a.fringe");
    let store_a = Store::adopt("tests::Widget", props.clone(), Some(path_a)).expect("adopt a");
    store_a.commit().expect("commit a");

    let path_b = dir_b.path().join("b.fringe");
    let store_b = Store::adopt("tests::Widget", props, Some(path_b)).expect("adopt b");
    store_b.commit().expect("commit b");

    let matches = Store::root_objects_at_all(
        [dir_a.path(), dir_b.path(), dir_a.path()],
        "tests::Widget",
        "name",
        &Value::from("union"),
        None,
    )
    .expect("root_objects_at_all");
    assert_eq!(matches.len(), 2);

    let limited = Store::root_objects_at_all(
        [dir_a.path(), dir_b.path()],
        "tests::Widget",
        "name",
        &Value::from("union"),
        Some(1),
    )
    .expect("root_objects_at_all limited");
    assert_eq!(limited.len(), 1);
}

#[test]
fn lock_write_mutates_under_the_guard() {
    let store = Store::adopt("tests::Plain", PropertyBag::new(), None).expect("adopt");
    store
        .lock_write(|inner| {
            let root = inner.root.expect("root set");
            inner
                .identity_map
                .get_mut(&root)
                .expect("root record present")
                .properties
                .insert("seen".to_string(), Value::from(true));
            Ok(())
        })
        .expect("lock_write");

    let root = store.root().expect("root");
    assert_eq!(root.get("seen").unwrap(), Value::from(true));
}

#[test]
fn lock_read_observes_a_consistent_snapshot() {
    let store = Store::adopt("tests::Plain", PropertyBag::new(), None).expect("adopt");
    store.root().expect("root").set("value", 1_i64).expect("set");

    let seen = store
        .lock_read(|inner| {
            let root = inner.root.expect("root set");
            inner.identity_map[&root].properties.get("value").cloned()
        })
        .expect("lock_read");
    assert_eq!(seen, Some(Value::from(1_i64)));
}

#[test]
fn lock_write_async_runs_on_the_store_eventually() {
    let store = Store::adopt("tests::Plain", PropertyBag::new(), None).expect("adopt");
    let (tx, rx) = std::sync::mpsc::channel();
    store.lock_write_async(move |store| {
        store.root().expect("root").set("async", true)?;
        let _ = tx.send(());
        Ok(())
    });

    rx.recv_timeout(std::time::Duration::from_secs(1))
        .expect("async job ran");
    assert_eq!(store.root().unwrap().get("async").unwrap(), Value::from(true));
}

#[test]
fn concurrent_readers_do_not_block_each_other() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("concurrent.fringe");
    let mut props = PropertyBag::new();
    props.insert("value".to_string(), Value::from(7_i64));
    let store = Store::adopt("tests::Plain", props, Some(path)).expect("adopt");

    std::thread::scope(|scope| {
        for _ in 0..8 {
            let store = store.clone();
            scope.spawn(move || {
                let root = store.root().expect("root");
                assert_eq!(root.get("value").unwrap(), Value::from(7_i64));
            });
        }
    });
}
