//! Type-erased column access.
//!
//! [`Column`] is the contract a hosting table works against: it accepts
//! dynamically-typed [`OwnedValue`]s, validates them (present, and of the
//! column's value type) and only then hands the typed value to the mutation
//! engine. One table can hold columns of different value types behind
//! `Box<dyn Column>`.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use data_types::{AttributeType, OwnedValue, Tid};
use snafu::OptionExt;

use crate::column::DictionaryColumn;
use crate::{NoValueSnafu, Result, TypeMismatchSnafu};

/// A concrete Rust type that can back a dictionary column.
///
/// Links the type to its [`AttributeType`] tag and converts it to and from
/// the dynamically-typed container. `Ord` is what makes interning possible;
/// `Display`/`FromStr` carry the value through the on-disk text encoding.
pub trait ColumnValue:
    Clone + Ord + fmt::Debug + fmt::Display + FromStr + Send + 'static
where
    <Self as FromStr>::Err: fmt::Display,
{
    const ATTRIBUTE_TYPE: AttributeType;

    /// The typed value held by `value`, or `None` when the runtime type
    /// does not match.
    fn from_owned(value: OwnedValue) -> Option<Self>;

    fn into_owned(self) -> OwnedValue;
}

impl ColumnValue for String {
    const ATTRIBUTE_TYPE: AttributeType = AttributeType::String;

    fn from_owned(value: OwnedValue) -> Option<Self> {
        match value {
            OwnedValue::String(v) => Some(v),
            _ => None,
        }
    }

    fn into_owned(self) -> OwnedValue {
        OwnedValue::String(self)
    }
}

impl ColumnValue for i64 {
    const ATTRIBUTE_TYPE: AttributeType = AttributeType::Integer;

    fn from_owned(value: OwnedValue) -> Option<Self> {
        match value {
            OwnedValue::Integer(v) => Some(v),
            _ => None,
        }
    }

    fn into_owned(self) -> OwnedValue {
        OwnedValue::Integer(self)
    }
}

impl ColumnValue for u64 {
    const ATTRIBUTE_TYPE: AttributeType = AttributeType::UInteger;

    fn from_owned(value: OwnedValue) -> Option<Self> {
        match value {
            OwnedValue::UInteger(v) => Some(v),
            _ => None,
        }
    }

    fn into_owned(self) -> OwnedValue {
        OwnedValue::UInteger(self)
    }
}

impl ColumnValue for bool {
    const ATTRIBUTE_TYPE: AttributeType = AttributeType::Boolean;

    fn from_owned(value: OwnedValue) -> Option<Self> {
        match value {
            OwnedValue::Boolean(v) => Some(v),
            _ => None,
        }
    }

    fn into_owned(self) -> OwnedValue {
        OwnedValue::Boolean(self)
    }
}

/// Validates a dynamic value before it may reach the mutation engine: it
/// must carry a value at all, and that value must be of the column's type.
fn typed<T: ColumnValue>(value: OwnedValue) -> Result<T>
where
    <T as FromStr>::Err: fmt::Display,
{
    let inserted = value.data_type().context(NoValueSnafu)?;
    T::from_owned(value).context(TypeMismatchSnafu {
        existing: T::ATTRIBUTE_TYPE,
        inserted,
    })
}

/// The type-erased column contract.
///
/// Bulk operations apply element-wise in order and stop at the first
/// failure; elements already applied stay committed. There is no rollback.
pub trait Column: fmt::Debug {
    fn name(&self) -> &str;

    fn attribute_type(&self) -> AttributeType;

    /// Number of tuples in the column.
    fn size(&self) -> usize;

    /// Best-effort estimate of the in-memory footprint in bytes.
    fn approximate_byte_size(&self) -> usize;

    /// Appends a value at the tail of the column, returning its tuple id.
    fn insert(&mut self, value: OwnedValue) -> Result<Tid>;

    /// Appends each value in order; a failure on element k leaves elements
    /// 0..k committed.
    fn insert_many(&mut self, values: Vec<OwnedValue>) -> Result<()>;

    /// Replaces the value of one tuple in place.
    fn update(&mut self, tid: Tid, value: OwnedValue) -> Result<()>;

    /// Updates every listed tuple to the same value, in list order.
    fn update_many(&mut self, tids: &[Tid], value: OwnedValue) -> Result<()>;

    /// Removes one tuple, renumbering every later tuple down by one.
    fn remove(&mut self, tid: Tid) -> Result<()>;

    /// Removes the set of tuples named by `tids`, interpreted against the
    /// numbering at call time.
    fn remove_many(&mut self, tids: &[Tid]) -> Result<()>;

    /// The value of one tuple, re-wrapped in the dynamic container.
    fn get(&self, tid: Tid) -> Result<OwnedValue>;

    fn clear(&mut self);

    /// A fully independent copy sharing nothing with this column.
    fn copy(&self) -> Box<dyn Column>;

    fn store(&self, path: &Path) -> Result<()>;

    fn load(&mut self, path: &Path) -> Result<()>;
}

impl<T: ColumnValue> Column for DictionaryColumn<T>
where
    <T as FromStr>::Err: fmt::Display,
{
    fn name(&self) -> &str {
        DictionaryColumn::name(self)
    }

    fn attribute_type(&self) -> AttributeType {
        DictionaryColumn::attribute_type(self)
    }

    fn size(&self) -> usize {
        DictionaryColumn::size(self)
    }

    fn approximate_byte_size(&self) -> usize {
        DictionaryColumn::approximate_byte_size(self)
    }

    fn insert(&mut self, value: OwnedValue) -> Result<Tid> {
        let value = typed::<T>(value)?;
        Ok(self.append(value))
    }

    fn insert_many(&mut self, values: Vec<OwnedValue>) -> Result<()> {
        for value in values {
            Column::insert(self, value)?;
        }
        Ok(())
    }

    fn update(&mut self, tid: Tid, value: OwnedValue) -> Result<()> {
        let value = typed::<T>(value)?;
        DictionaryColumn::update(self, tid, value)
    }

    fn update_many(&mut self, tids: &[Tid], value: OwnedValue) -> Result<()> {
        let value = typed::<T>(value)?;
        DictionaryColumn::update_many(self, tids, &value)
    }

    fn remove(&mut self, tid: Tid) -> Result<()> {
        DictionaryColumn::remove(self, tid)
    }

    fn remove_many(&mut self, tids: &[Tid]) -> Result<()> {
        DictionaryColumn::remove_many(self, tids)
    }

    fn get(&self, tid: Tid) -> Result<OwnedValue> {
        DictionaryColumn::get(self, tid).map(|value| value.clone().into_owned())
    }

    fn clear(&mut self) {
        DictionaryColumn::clear(self)
    }

    fn copy(&self) -> Box<dyn Column> {
        Box::new(self.clone())
    }

    fn store(&self, path: &Path) -> Result<()> {
        DictionaryColumn::store(self, path)
    }

    fn load(&mut self, path: &Path) -> Result<()> {
        DictionaryColumn::load(self, path)
    }
}
