//! The value codec: a canonical, self-describing byte stream for property
//! bags, plus the [`Value`] tree stored in memory.
//!
//! `encode`/`decode` round-trip through CBOR (`serde_cbor`) rather than a
//! bespoke binary format — CBOR is already self-describing (every value
//! carries its own type tag on the wire) and is what the teacher crate reaches
//! for when it needs a compact, typed, serde-native encoding.

use crate::object::PropertyBag;
use chrono::{DateTime, Utc};
use fringestore_error::Error;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use uuid::Uuid;

/// A reference to a descendant object: identity only, never the
/// descendant's own bag. Serialization walks the owning store's identity
/// map once per object (see [`crate::store`]); inlining the referenced
/// object's properties here would force the codec to recurse through the
/// reference graph and defeat the cycle-safety the store relies on.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ObjectRef {
    pub type_tag: String,
    pub uuid: Uuid,
}

/// One value in an object's property bag.
///
/// Scalars: `Null`, `Bool`, `Int`, `Uint`, `Float`, `Text`, `Timestamp`,
/// `Blob`. Aggregates: `List` (ordered, duplicates allowed), `Set`
/// (unordered, unique, round-trips to an equal set but not necessarily the
/// same order), `OrderedSet` (ordered, unique), `Map` (nested property bag
/// with no independent identity). `Ref` is the descendant-object marker.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
    Blob(#[serde(with = "serde_bytes")] Vec<u8>),
    List(Vec<Value>),
    Set(Vec<Value>),
    OrderedSet(Vec<Value>),
    Map(PropertyBag),
    Ref(ObjectRef),
}

impl Value {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Stable sort/equality key for an unordered aggregate element. Not a
    /// public wire format guarantee — only used to make `Set` comparison
    /// order-independent.
    fn canonical_key(&self) -> Vec<u8> {
        serde_cbor::to_vec(self).unwrap_or_default()
    }

    /// Deterministic, filesystem-safe key for this value, used to name the
    /// index bucket an indexed property's current value maps to. Hex of
    /// the same canonical encoding used for `Set` equality, so it covers
    /// every variant uniformly rather than special-casing scalars.
    #[must_use]
    pub(crate) fn index_key(&self) -> String {
        self.canonical_key().iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Uint(a), Self::Uint(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Timestamp(a), Self::Timestamp(b)) => a == b,
            (Self::Blob(a), Self::Blob(b)) => a == b,
            (Self::List(a), Self::List(b)) | (Self::OrderedSet(a), Self::OrderedSet(b)) => {
                a == b
            }
            (Self::Set(a), Self::Set(b)) => {
                if a.len() != b.len() {
                    return false;
                }
                let mut a_keys: Vec<_> = a.iter().map(Self::canonical_key).collect();
                let mut b_keys: Vec<_> = b.iter().map(Self::canonical_key).collect();
                a_keys.sort();
                b_keys.sort();
                a_keys == b_keys
            }
            (Self::Map(a), Self::Map(b)) => a == b,
            (Self::Ref(a), Self::Ref(b)) => a == b,
            _ => false,
        }
    }
}

macro_rules! impl_from {
    ($( $ty:ty => $variant:ident ),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Self::$variant(v.into())
                }
            }
        )*
    };
}

impl_from! {
    bool => Bool,
    i8 => Int,
    i16 => Int,
    i32 => Int,
    i64 => Int,
    u8 => Uint,
    u16 => Uint,
    u32 => Uint,
    u64 => Uint,
    f32 => Float,
    f64 => Float,
    &str => Text,
    String => Text,
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Self::Timestamp(v)
    }
}

impl PartialOrd for Value {
    /// Only defined within a single scalar variant; cross-variant and
    /// aggregate comparisons return `None`. Used by ordered-aggregate
    /// mutators, not by any query layer (there isn't one — see spec
    /// Non-goals).
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a.partial_cmp(b),
            (Self::Uint(a), Self::Uint(b)) => a.partial_cmp(b),
            (Self::Float(a), Self::Float(b)) => a.partial_cmp(b),
            (Self::Text(a), Self::Text(b)) => a.partial_cmp(b),
            (Self::Timestamp(a), Self::Timestamp(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

/// Encode a property bag to the canonical byte stream.
pub fn encode(bag: &PropertyBag) -> Result<Vec<u8>, Error> {
    serde_cbor::to_vec(bag).map_err(|err| Error::CodecError {
        offset: None,
        message: err.to_string(),
    })
}

/// Decode a property bag from the canonical byte stream.
///
/// # Errors
/// Fails on malformed input or an unrecognized type tag; the offset is
/// populated only when the CBOR decoder reports one (see module docs).
pub fn decode(bytes: &[u8]) -> Result<PropertyBag, Error> {
    serde_cbor::from_slice(bytes).map_err(|err| Error::CodecError {
        offset: Some(err.offset()),
        message: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn arb_scalar() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::Int),
            any::<u64>().prop_map(Value::Uint),
            any::<String>().prop_map(Value::Text),
            proptest::collection::vec(any::<u8>(), 0..16).prop_map(Value::Blob),
        ]
    }

    fn arb_value() -> impl Strategy<Value = Value> {
        arb_scalar().prop_recursive(3, 32, 8, |inner| {
            prop_oneof![
                proptest::collection::vec(inner.clone(), 0..6).prop_map(Value::List),
                proptest::collection::vec(inner, 0..6).prop_map(Value::OrderedSet),
            ]
        })
    }

    fn arb_bag() -> impl Strategy<Value = PropertyBag> {
        proptest::collection::btree_map("[a-z]{1,8}", arb_value(), 0..6)
    }

    proptest! {
        #[test]
        fn round_trip_is_value_equal(bag in arb_bag()) {
            let bytes = encode(&bag).expect("encode");
            let decoded = decode(&bytes).expect("decode");
            prop_assert_eq!(bag, decoded);
        }
    }

    #[test]
    fn set_equality_is_order_independent() {
        let a = Value::Set(vec![Value::Int(1), Value::Int(2)]);
        let b = Value::Set(vec![Value::Int(2), Value::Int(1)]);
        assert_eq!(a, b);
    }

    #[test]
    fn ordered_set_equality_is_order_sensitive() {
        let a = Value::OrderedSet(vec![Value::Int(1), Value::Int(2)]);
        let b = Value::OrderedSet(vec![Value::Int(2), Value::Int(1)]);
        assert_ne!(a, b);
    }

    #[test]
    fn decode_error_reports_message() {
        let err = decode(&[0xff, 0xff, 0xff]).unwrap_err();
        assert!(err.is_codec_error());
    }
}
