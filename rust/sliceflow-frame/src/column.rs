//! Typed columns behind a type-erased [`Column`] interface.
//!
//! A column stores the values of a single element type for a contiguous range of
//! rows. Operators that are generic over element types (sorting, hashing,
//! combining) see columns only as `dyn Column` and reach the concrete values
//! through the per-type [`Ops`](crate::ops::Ops) bundle or by downcasting to
//! [`TypedColumn<T>`].

use std::{
    any::{Any, TypeId},
    fmt,
    hash::{Hash, Hasher},
    ops::Range,
};

/// Marker trait for types that can be stored in a [`TypedColumn`].
pub trait ColumnValue: Clone + Default + fmt::Debug + Send + Sync + 'static {}

impl<T> ColumnValue for T where T: Clone + Default + fmt::Debug + Send + Sync + 'static {}

/// Runtime tag describing the element type of a column.
///
/// Two tags are equal iff they describe the same Rust type. The tag also knows
/// how to allocate an empty column of its type, which lets frames be created
/// from a schema alone.
#[derive(Clone, Copy)]
pub struct ColumnType {
    id: TypeId,
    name: &'static str,
    make: fn(usize) -> Box<dyn Column>,
}

impl ColumnType {
    pub fn of<T: ColumnValue>() -> ColumnType {
        ColumnType {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            make: make_typed_column::<T>,
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is<T: ColumnValue>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }

    /// Allocates a column of this type holding `len` default values.
    pub fn make_column(&self, len: usize) -> Box<dyn Column> {
        (self.make)(len)
    }
}

fn make_typed_column<T: ColumnValue>(len: usize) -> Box<dyn Column> {
    Box::new(TypedColumn::<T>::with_len(len))
}

impl PartialEq for ColumnType {
    fn eq(&self, other: &ColumnType) -> bool {
        self.id == other.id
    }
}

impl Eq for ColumnType {}

impl Hash for ColumnType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Type-erased column of values.
///
/// All row-moving methods take the source as `&dyn Column` and require it to be
/// of the same [`ColumnType`]; passing a column of another type is a logic error
/// and panics.
pub trait Column: Send + Sync + 'static {
    fn as_any(&self) -> &(dyn Any + Send + Sync + 'static);

    fn as_any_mut(&mut self) -> &mut (dyn Any + Send + Sync + 'static);

    fn column_type(&self) -> ColumnType;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn clone_boxed(&self) -> Box<dyn Column>;

    /// Grows (with default values) or shrinks the column to `len` rows.
    fn resize(&mut self, len: usize);

    /// Overwrites rows `dst_start..dst_start + src_range.len()` with the
    /// values of `src` at `src_range`.
    fn copy_from(&mut self, dst_start: usize, src: &dyn Column, src_range: Range<usize>);

    /// Appends the value of `src` at `src_row`.
    fn push_from(&mut self, src: &dyn Column, src_row: usize);

    /// Exchanges the values of rows `a` and `b`.
    fn swap(&mut self, a: usize, b: usize);

    /// Returns a new column whose row `i` is this column's row `indices[i]`.
    fn take(&self, indices: &[usize]) -> Box<dyn Column>;

    /// Returns a copy of rows `range`.
    fn slice(&self, range: Range<usize>) -> Box<dyn Column>;

    /// Debug rendering of a single value.
    fn fmt_value(&self, row: usize) -> String;
}

/// A column backed by a plain `Vec<T>`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypedColumn<T> {
    values: Vec<T>,
}

impl<T: ColumnValue> TypedColumn<T> {
    pub fn new() -> TypedColumn<T> {
        TypedColumn { values: Vec::new() }
    }

    pub fn with_len(len: usize) -> TypedColumn<T> {
        TypedColumn {
            values: vec![T::default(); len],
        }
    }

    pub fn from_vec(values: Vec<T>) -> TypedColumn<T> {
        TypedColumn { values }
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [T] {
        &mut self.values
    }

    pub fn push(&mut self, value: T) {
        self.values.push(value);
    }

    pub fn into_vec(self) -> Vec<T> {
        self.values
    }
}

impl<T: ColumnValue> Column for TypedColumn<T> {
    fn as_any(&self) -> &(dyn Any + Send + Sync + 'static) {
        self
    }

    fn as_any_mut(&mut self) -> &mut (dyn Any + Send + Sync + 'static) {
        self
    }

    fn column_type(&self) -> ColumnType {
        ColumnType::of::<T>()
    }

    fn len(&self) -> usize {
        self.values.len()
    }

    fn clone_boxed(&self) -> Box<dyn Column> {
        Box::new(self.clone())
    }

    fn resize(&mut self, len: usize) {
        self.values.resize(len, T::default());
    }

    fn copy_from(&mut self, dst_start: usize, src: &dyn Column, src_range: Range<usize>) {
        let src = downcast::<T>(src);
        let dst_end = dst_start + src_range.len();
        self.values[dst_start..dst_end].clone_from_slice(&src.values[src_range]);
    }

    fn push_from(&mut self, src: &dyn Column, src_row: usize) {
        let src = downcast::<T>(src);
        self.values.push(src.values[src_row].clone());
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.values.swap(a, b);
    }

    fn take(&self, indices: &[usize]) -> Box<dyn Column> {
        let values = indices.iter().map(|&i| self.values[i].clone()).collect();
        Box::new(TypedColumn { values })
    }

    fn slice(&self, range: Range<usize>) -> Box<dyn Column> {
        Box::new(TypedColumn {
            values: self.values[range].to_vec(),
        })
    }

    fn fmt_value(&self, row: usize) -> String {
        format!("{:?}", self.values[row])
    }
}

/// Downcasts a type-erased column to its concrete typed representation.
///
/// # Panics
///
/// Panics if the column does not hold values of type `T`.
pub fn downcast<T: ColumnValue>(column: &dyn Column) -> &TypedColumn<T> {
    match column.as_any().downcast_ref::<TypedColumn<T>>() {
        Some(typed) => typed,
        None => type_mismatch_panic(ColumnType::of::<T>(), column.column_type()),
    }
}

/// Mutable variant of [`downcast`].
///
/// # Panics
///
/// Panics if the column does not hold values of type `T`.
pub fn downcast_mut<T: ColumnValue>(column: &mut dyn Column) -> &mut TypedColumn<T> {
    let actual = column.column_type();
    match column.as_any_mut().downcast_mut::<TypedColumn<T>>() {
        Some(typed) => typed,
        None => type_mismatch_panic(ColumnType::of::<T>(), actual),
    }
}

#[cold]
fn type_mismatch_panic(expected: ColumnType, actual: ColumnType) -> ! {
    panic!("column type mismatch: expected {expected}, found {actual}")
}
