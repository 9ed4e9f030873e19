//! Global registry of per-type [`Ops`].
//!
//! Operators resolve the comparison and hash functions for their key column by
//! looking up the column's [`ColumnType`] here, once, at construction time. A
//! type without registered ops cannot be used as a key; operators report that as
//! a construction-time type error.
//!
//! The registry is pre-populated with ops for the built-in scalar types (all
//! integer widths, `f32`/`f64` under IEEE total order, `bool`, `char`, `String`
//! and `Vec<u8>`). Additional [`KeyValue`] types can be added with
//! [`register`].
//!
//! # Thread Safety
//!
//! The registry uses a `RwLock`, allowing concurrent lookups while registration
//! takes exclusive access.

use std::{
    any::TypeId,
    sync::{Arc, LazyLock, RwLock},
};

use sliceflow_common::{Result, error::Error};

use crate::{
    column::ColumnType,
    ops::{KeyValue, Ops, TypedOps},
};

/// Registers [`TypedOps`] for the key type `T`, replacing any previous entry.
pub fn register<T: KeyValue>() {
    register_ops(Arc::new(TypedOps::<T>::new()));
}

/// Registers a custom [`Ops`] implementation under its own column type.
pub fn register_ops(ops: Arc<dyn Ops>) {
    let type_id = ops.column_type().type_id();
    REGISTRY
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .insert(type_id, ops);
}

/// Returns the ops registered for `ty`, if any.
pub fn lookup(ty: ColumnType) -> Option<Arc<dyn Ops>> {
    REGISTRY
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .get(&ty.type_id())
        .cloned()
}

/// Returns the ops registered for `ty`, or a type error naming the type.
pub fn get(ty: ColumnType) -> Result<Arc<dyn Ops>> {
    lookup(ty).ok_or_else(|| Error::type_mismatch(format!("no ops registered for type {ty}")))
}

/// Reports whether `ty` can be compared and hashed.
pub fn is_registered(ty: ColumnType) -> bool {
    lookup(ty).is_some()
}

/// Global registry of key ops, keyed by element `TypeId`.
///
/// The map uses `ahash` with fixed seeds so that its construction does not
/// depend on runtime randomness.
static REGISTRY: LazyLock<RwLock<ahash::HashMap<TypeId, Arc<dyn Ops>>>> = LazyLock::new(|| {
    let mut map: ahash::HashMap<TypeId, Arc<dyn Ops>> =
        ahash::HashMap::with_hasher(ahash::RandomState::with_seeds(
            0x5ca1_ab1e,
            0x0bad_cafe,
            0x7e57_ab1e,
            0x5eed_f00d,
        ));
    macro_rules! builtin {
        ($($ty:ty),*) => {
            $(
                map.insert(TypeId::of::<$ty>(), Arc::new(TypedOps::<$ty>::new()));
            )*
        };
    }
    builtin!(
        i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, bool, char,
        String, Vec<u8>
    );
    RwLock::new(map)
});
