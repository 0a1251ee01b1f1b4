//! Core runtime for an embedded, file-backed object-graph store: value
//! codec, object handles, stores, index artifacts, and the process-wide
//! store registry. `fringestore` re-exports the stable subset of this
//! crate as the public API; application code should generally depend on
//! that crate instead of this one directly.

mod index;
mod registry;

pub mod object;
pub mod safe_name;
pub mod store;
pub mod types;
pub mod util;
pub mod value;
pub mod weak;

pub use fringestore_error::{Error, Result};

/// Commonly imported together.
pub mod prelude {
    pub use crate::object::{Object, PropertyBag};
    pub use crate::store::{Store, StoreState};
    pub use crate::types::{register_type, type_descriptor, TypeDescriptor};
    pub use crate::value::{ObjectRef, Value};
    pub use crate::weak::WeakHolder;
    pub use fringestore_error::{Error, Result};
}
