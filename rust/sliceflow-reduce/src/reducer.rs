//! Typed reduce functions behind a type-erased interface.

use std::{marker::PhantomData, sync::Arc};

use sliceflow_frame::{
    Column, ColumnType, ColumnValue,
    column::{downcast, downcast_mut},
};

/// A commutative, associative binary function over the values of a column.
///
/// The signature is checked once, when an operator is constructed, by comparing
/// [`Reducer::value_type`] with the declared value column type. Afterwards the
/// operator calls [`Reducer::reduce_into`] without further checks.
pub trait Reducer: Send + Sync {
    /// Element type of the values this reducer combines.
    fn value_type(&self) -> ColumnType;

    /// Replaces `acc[acc_row]` with `reduce(acc[acc_row], src[src_row])`.
    fn reduce_into(&self, acc: &mut dyn Column, acc_row: usize, src: &dyn Column, src_row: usize);
}

/// [`Reducer`] over a typed closure `Fn(V, V) -> V`.
pub struct ReduceFn<V, F> {
    f: F,
    _value: PhantomData<fn(V, V) -> V>,
}

impl<V, F> ReduceFn<V, F>
where
    V: ColumnValue,
    F: Fn(V, V) -> V + Send + Sync,
{
    pub fn new(f: F) -> ReduceFn<V, F> {
        ReduceFn {
            f,
            _value: PhantomData,
        }
    }
}

impl<V, F> Reducer for ReduceFn<V, F>
where
    V: ColumnValue,
    F: Fn(V, V) -> V + Send + Sync,
{
    fn value_type(&self) -> ColumnType {
        ColumnType::of::<V>()
    }

    fn reduce_into(&self, acc: &mut dyn Column, acc_row: usize, src: &dyn Column, src_row: usize) {
        let next = downcast::<V>(src).values()[src_row].clone();
        let slot = &mut downcast_mut::<V>(acc).values_mut()[acc_row];
        let current = std::mem::take(slot);
        *slot = (self.f)(current, next);
    }
}

/// Wraps a typed reduce closure into a shareable [`Reducer`].
pub fn reduce_fn<V, F>(f: F) -> Arc<dyn Reducer>
where
    V: ColumnValue,
    F: Fn(V, V) -> V + Send + Sync + 'static,
{
    Arc::new(ReduceFn::new(f))
}
