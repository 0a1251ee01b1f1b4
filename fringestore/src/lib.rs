//! An embedded, file-backed object-graph store.
//!
//! A [`Store`] holds one root object and whatever descendant graph is
//! reachable from it through [`Value::Ref`] markers, and commits that graph
//! to a single file. Indexed properties get small pointer-file artifacts
//! alongside the commit file so matching roots can be found without
//! opening every store under a directory.
//!
//! ```no_run
//! use fringestore::{Object, PropertyBag, Store, Value};
//!
//! # fn main() -> fringestore::Result<()> {
//! let mut props = PropertyBag::new();
//! props.insert("name".to_string(), Value::from("camp fire"));
//! let store = Store::adopt("demo::Widget", props, Some("widget.fringe".into()))?;
//! store.commit()?;
//! # Ok(())
//! # }
//! ```

pub use fringestore_core::object::{Object, PropertyBag};
pub use fringestore_core::safe_name::{filename_safe, filename_unsafe};
pub use fringestore_core::store::{Store, StoreState, STORE_FILE_EXTENSION};
pub use fringestore_core::types::{register_type, type_descriptor, TypeDescriptor};
pub use fringestore_core::util::{delete_object, root_objects_at, root_objects_at_all, save};
pub use fringestore_core::value::{decode, encode, ObjectRef, Value};
pub use fringestore_core::weak::WeakHolder;
pub use fringestore_error::{Error, Result};
