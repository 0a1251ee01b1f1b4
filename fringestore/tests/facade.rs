use fringestore::{register_type, Object, PropertyBag, Store, TypeDescriptor, Value};
use std::sync::Arc;
use tempfile::tempdir;

#[test]
fn save_and_delete_object_through_the_facade() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("facade.fringe");

    let mut props = PropertyBag::new();
    props.insert("label".to_string(), Value::from("hello"));
    let store = Store::adopt("facade::Plain", props, Some(path.clone())).expect("adopt");

    let root: Object = store.root().expect("root");
    fringestore::save(&root).expect("save");
    assert!(path.exists());

    fringestore::delete_object(&root).expect("delete_object");
    assert!(!path.exists());
}

struct FacadeWidget;
impl TypeDescriptor for FacadeWidget {
    fn type_tag(&self) -> &str {
        "facade::Widget"
    }
    fn indexed_property_names(&self) -> &[String] {
        static NAMES: std::sync::OnceLock<Vec<String>> = std::sync::OnceLock::new();
        NAMES.get_or_init(|| vec!["tag".to_string()])
    }
}

#[test]
fn root_objects_at_all_finds_matches_across_directories() {
    static ONCE: std::sync::Once = std::sync::Once::new();
    ONCE.call_once(|| register_type(Arc::new(FacadeWidget)));

    let dir_a = tempdir().expect("tempdir a");
    let dir_b = tempdir().expect("tempdir b");

    let mut props = PropertyBag::new();
    props.insert("tag".to_string(), Value::from("shared"));
    let store_a = Store::adopt("facade::Widget", props.clone(), Some(dir_a.path().join("a.fringe")))
        .expect("adopt a");
    store_a.commit().expect("commit a");
    let store_b = Store::adopt("facade::Widget", props, Some(dir_b.path().join("b.fringe"))).expect("adopt b");
    store_b.commit().expect("commit b");

    let matches = fringestore::root_objects_at_all(
        [dir_a.path(), dir_b.path()],
        "facade::Widget",
        "tag",
        &Value::from("shared"),
        None,
    )
    .expect("root_objects_at_all");
    assert_eq!(matches.len(), 2);
}
