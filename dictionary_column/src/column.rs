//! The dictionary-encoded column: a position index over interned values and
//! the mutation engine that keeps both sides consistent.

use std::mem;
use std::ops::Index;

use data_types::{AttributeType, Tid};
use snafu::ensure;

use crate::dictionary::{Dictionary, EntryId};
use crate::{OutOfRangeSnafu, Result};

mod persist;

/// A column storing one table attribute with dictionary encoding.
///
/// Every distinct value lives once in the dictionary; `positions` holds one
/// entry handle per tuple, in tuple order, so `positions[tid]` resolves a
/// tuple id to its value in O(1). The two structures only ever change
/// together, preserving the invariant that each entry's refcount equals the
/// number of positions referencing it.
///
/// Tuple ids are positional: removing a tuple renumbers every later tuple
/// down by one.
#[derive(Debug, Clone)]
pub struct DictionaryColumn<T> {
    name: String,
    attribute_type: AttributeType,
    dictionary: Dictionary<T>,
    /// One entry handle per tuple, in tuple order.
    positions: Vec<EntryId>,
}

impl<T: Clone + Ord> DictionaryColumn<T> {
    /// Creates an empty column. The attribute type is construction-time
    /// bookkeeping carried for the hosting table; it is not re-checked by
    /// the typed operations below.
    pub fn new(name: impl Into<String>, attribute_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attribute_type,
            dictionary: Dictionary::new(),
            positions: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attribute_type(&self) -> AttributeType {
        self.attribute_type
    }

    /// Number of tuples in the column.
    pub fn size(&self) -> usize {
        self.positions.len()
    }

    /// Best-effort estimate of the in-memory footprint in bytes.
    ///
    /// Counts the position index capacity plus one refcount and one value
    /// per distinct entry. Container and allocator overhead is not included,
    /// nor is heap payload behind `T` such as string bytes.
    pub fn approximate_byte_size(&self) -> usize {
        self.positions.capacity() * mem::size_of::<EntryId>()
            + self.dictionary.len() * (mem::size_of::<u64>() + mem::size_of::<T>())
    }

    /// Appends `value` at the tail of the column and returns its tuple id.
    pub fn append(&mut self, value: T) -> Tid {
        let id = self.dictionary.acquire(value);
        self.positions.push(id);
        self.positions.len() - 1
    }

    /// Appends every value of `values` in order.
    pub fn append_many(&mut self, values: impl IntoIterator<Item = T>) {
        for value in values {
            self.append(value);
        }
    }

    /// The value of the tuple named by `tid`.
    pub fn get(&self, tid: Tid) -> Result<&T> {
        ensure!(
            tid < self.size(),
            OutOfRangeSnafu {
                tid,
                size: self.size()
            }
        );
        Ok(self.value_at(tid))
    }

    /// Replaces the value of the tuple named by `tid` in place; the column
    /// size never changes. The displaced entry loses one reference and dies
    /// if that was its last one.
    pub fn update(&mut self, tid: Tid, value: T) -> Result<()> {
        ensure!(
            tid < self.size(),
            OutOfRangeSnafu {
                tid,
                size: self.size()
            }
        );
        self.dictionary.release(self.positions[tid]);
        self.positions[tid] = self.dictionary.acquire(value);
        Ok(())
    }

    /// Updates every listed tuple to `value`, in list order. Tuple ids are
    /// taken as given; update never renumbers. The first failure aborts the
    /// remaining elements, leaving earlier updates committed.
    pub fn update_many(&mut self, tids: &[Tid], value: &T) -> Result<()> {
        for &tid in tids {
            self.update(tid, value.clone())?;
        }
        Ok(())
    }

    /// Removes the tuple named by `tid`, renumbering every later tuple down
    /// by one. O(size − tid) for the compaction shift.
    pub fn remove(&mut self, tid: Tid) -> Result<()> {
        ensure!(
            tid < self.size(),
            OutOfRangeSnafu {
                tid,
                size: self.size()
            }
        );
        self.dictionary.release(self.positions[tid]);
        self.positions.remove(tid);
        Ok(())
    }

    /// Removes the whole set of tuples named by `tids` in one logical pass.
    ///
    /// The list is sorted and deduplicated, then deleted from highest to
    /// lowest tuple id: each compaction only renumbers tuples above the one
    /// removed, which have all been handled already, so no target is ever
    /// shifted out from under a pending deletion.
    pub fn remove_many(&mut self, tids: &[Tid]) -> Result<()> {
        let mut sorted = tids.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        for &tid in sorted.iter().rev() {
            self.remove(tid)?;
        }
        Ok(())
    }

    /// Empties the column. Idempotent.
    pub fn clear(&mut self) {
        self.dictionary.clear();
        self.positions.clear();
    }

    /// The dictionary side of the column, for read access.
    pub fn dictionary(&self) -> &Dictionary<T> {
        &self.dictionary
    }

    fn value_at(&self, tid: Tid) -> &T {
        let id = self.positions[tid];
        self.dictionary
            .value(id)
            .expect("positions reference live dictionary entries")
    }
}

/// Read-only direct index access.
///
/// Panics when `tid` is out of range, like slice indexing; [`get`] is the
/// fallible variant. No mutable counterpart exists: handing out a writable
/// alias into dictionary-owned storage could corrupt the interning table.
///
/// [`get`]: DictionaryColumn::get
impl<T: Clone + Ord> Index<Tid> for DictionaryColumn<T> {
    type Output = T;

    fn index(&self, tid: Tid) -> &T {
        self.value_at(tid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use proptest::prelude::*;

    /// Every reachable state must satisfy: sum of refcounts == number of
    /// positions, and no entry sits at refcount zero.
    fn assert_consistent<T: Clone + Ord>(column: &DictionaryColumn<T>) {
        let total: u64 = column.dictionary.iter().map(|(_, _, rc)| rc).sum();
        assert_eq!(total as usize, column.size());
        assert!(column.dictionary.iter().all(|(_, _, rc)| rc >= 1));
    }

    #[test]
    fn append_then_get() {
        let mut column = DictionaryColumn::new("tag", AttributeType::String);

        let tid = column.append("x".to_string());
        assert_eq!(tid, 0);
        assert_eq!(column.get(tid).unwrap(), "x");
        assert_eq!(column.size(), 1);
        assert_consistent(&column);
    }

    #[test]
    fn worked_example() {
        let mut column = DictionaryColumn::new("measurement", AttributeType::Integer);
        column.append_many([5_i64, 7, 5]);

        assert_eq!(column.size(), 3);
        assert_eq!(*column.get(0).unwrap(), 5);
        assert_eq!(*column.get(1).unwrap(), 7);
        assert_eq!(*column.get(2).unwrap(), 5);
        let entries: Vec<_> = column
            .dictionary
            .iter()
            .map(|(_, v, rc)| (*v, rc))
            .collect();
        assert_eq!(entries, vec![(5, 2), (7, 1)]);

        column.remove(0).unwrap();
        assert_eq!(column.size(), 2);
        assert_eq!(*column.get(0).unwrap(), 7);
        assert_eq!(*column.get(1).unwrap(), 5);
        let entries: Vec<_> = column
            .dictionary
            .iter()
            .map(|(_, v, rc)| (*v, rc))
            .collect();
        assert_eq!(entries, vec![(5, 1), (7, 1)]);
        assert_consistent(&column);
    }

    #[test]
    fn removal_renumbers_later_tuples() {
        let mut column = DictionaryColumn::new("c", AttributeType::Integer);
        column.append_many(0_i64..6);
        let before: Vec<i64> = (0..6).map(|tid| *column.get(tid).unwrap()).collect();

        column.remove(0).unwrap();

        assert_eq!(column.size(), 5);
        for tid in 0..5 {
            assert_eq!(*column.get(tid).unwrap(), before[tid + 1]);
        }
        assert_consistent(&column);
    }

    #[test]
    fn update_preserves_size() {
        let mut column = DictionaryColumn::new("c", AttributeType::String);
        column.append_many(["a".to_string(), "b".to_string(), "a".to_string()]);

        column.update(1, "z".to_string()).unwrap();
        assert_eq!(column.size(), 3);
        assert_eq!(column.get(1).unwrap(), "z");

        // Displacing the only reference to "b" removed its entry.
        assert_eq!(column.dictionary.id(&"b".to_string()), None);
        assert_consistent(&column);
    }

    #[test]
    fn update_to_same_value_is_a_no_op() {
        let mut column = DictionaryColumn::new("c", AttributeType::Integer);
        column.append_many([1_i64, 1]);

        column.update(0, 1).unwrap();
        assert_eq!(column.size(), 2);
        assert_eq!(*column.get(0).unwrap(), 1);
        assert_consistent(&column);
    }

    #[test]
    fn update_many_applies_in_list_order() {
        let mut column = DictionaryColumn::new("c", AttributeType::Integer);
        column.append_many([1_i64, 2, 3, 4]);

        column.update_many(&[0, 2], &9).unwrap();
        let values: Vec<i64> = (0..4).map(|tid| *column.get(tid).unwrap()).collect();
        assert_eq!(values, vec![9, 2, 9, 4]);
        assert_consistent(&column);
    }

    #[test]
    fn update_many_stops_at_first_failure() {
        let mut column = DictionaryColumn::new("c", AttributeType::Integer);
        column.append_many([1_i64, 2, 3]);

        let err = column.update_many(&[0, 9, 2], &7).unwrap_err();
        assert!(matches!(err, Error::OutOfRange { tid: 9, size: 3 }));

        // The element before the failure stays committed, the one after was
        // never reached.
        assert_eq!(*column.get(0).unwrap(), 7);
        assert_eq!(*column.get(2).unwrap(), 3);
        assert_consistent(&column);
    }

    #[test]
    fn dedup_refcount_drops_to_one() {
        let mut column = DictionaryColumn::new("c", AttributeType::String);
        column.append_many(["v".to_string(), "v".to_string()]);

        column.remove(1).unwrap();
        let entries: Vec<_> = column.dictionary.iter().map(|(_, _, rc)| rc).collect();
        assert_eq!(entries, vec![1]);
        assert_consistent(&column);
    }

    #[test]
    fn remove_many_deletes_the_named_set() {
        let mut column = DictionaryColumn::new("c", AttributeType::Integer);
        column.append_many(10_i64..20);

        // Unsorted and with a duplicate: the column must still delete
        // exactly tuples 1, 3 and 5 of the original numbering.
        column.remove_many(&[3, 1, 5, 3]).unwrap();

        let values: Vec<i64> = (0..column.size())
            .map(|tid| *column.get(tid).unwrap())
            .collect();
        assert_eq!(values, vec![10, 12, 14, 16, 17, 18, 19]);
        assert_consistent(&column);
    }

    #[test]
    fn remove_many_rejects_out_of_range_before_mutating() {
        let mut column = DictionaryColumn::new("c", AttributeType::Integer);
        column.append_many([1_i64, 2, 3]);

        let err = column.remove_many(&[1, 3]).unwrap_err();
        assert!(matches!(err, Error::OutOfRange { tid: 3, size: 3 }));
        // The highest tuple id is deleted first, so the failure precedes
        // any removal.
        assert_eq!(column.size(), 3);
        assert_consistent(&column);
    }

    #[test]
    fn out_of_range_errors() {
        let mut column = DictionaryColumn::new("c", AttributeType::Integer);
        column.append(1_i64);

        assert!(matches!(
            column.get(1).unwrap_err(),
            Error::OutOfRange { tid: 1, size: 1 }
        ));
        assert!(matches!(
            column.update(1, 2).unwrap_err(),
            Error::OutOfRange { tid: 1, size: 1 }
        ));
        assert!(matches!(
            column.remove(1).unwrap_err(),
            Error::OutOfRange { tid: 1, size: 1 }
        ));
    }

    #[test]
    fn clear_is_idempotent() {
        let mut column = DictionaryColumn::new("c", AttributeType::String);
        column.append_many(["a".to_string(), "b".to_string()]);

        column.clear();
        assert_eq!(column.size(), 0);
        assert!(column.dictionary.is_empty());

        column.clear();
        assert_eq!(column.size(), 0);
    }

    #[test]
    fn clone_is_fully_independent() {
        let mut column = DictionaryColumn::new("c", AttributeType::Integer);
        column.append_many([1_i64, 2, 1]);

        let mut copy = column.clone();
        copy.update(0, 9).unwrap();
        copy.remove(2).unwrap();
        column.append(3);

        assert_eq!(column.size(), 4);
        assert_eq!(*column.get(0).unwrap(), 1);
        assert_eq!(copy.size(), 2);
        assert_eq!(*copy.get(0).unwrap(), 9);
        assert_consistent(&column);
        assert_consistent(&copy);
    }

    #[test]
    fn direct_index_access() {
        let mut column = DictionaryColumn::new("c", AttributeType::String);
        column.append("direct".to_string());

        assert_eq!(&column[0], "direct");
    }

    #[test]
    #[should_panic]
    fn direct_index_access_out_of_range_panics() {
        let column: DictionaryColumn<i64> = DictionaryColumn::new("c", AttributeType::Integer);
        let _ = &column[0];
    }

    #[test]
    fn footprint_grows_with_content() {
        let mut column = DictionaryColumn::new("c", AttributeType::Integer);
        let empty = column.approximate_byte_size();

        column.append_many(0_i64..32);
        assert!(column.approximate_byte_size() > empty);
        assert_eq!(column.size(), 32);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Append(i64),
        Update(Tid, i64),
        Remove(Tid),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0_i64..8).prop_map(Op::Append),
            ((0_usize..12), (0_i64..8)).prop_map(|(tid, v)| Op::Update(tid, v)),
            (0_usize..12).prop_map(Op::Remove),
        ]
    }

    proptest! {
        #[test]
        fn refcounts_always_cover_positions(
            ops in proptest::collection::vec(op_strategy(), 0..48),
        ) {
            let mut column = DictionaryColumn::new("p", AttributeType::Integer);
            for op in ops {
                match op {
                    Op::Append(v) => {
                        column.append(v);
                    }
                    Op::Update(tid, v) => {
                        let _ = column.update(tid, v);
                    }
                    Op::Remove(tid) => {
                        let _ = column.remove(tid);
                    }
                }
                let total: u64 = column.dictionary.iter().map(|(_, _, rc)| rc).sum();
                prop_assert_eq!(total as usize, column.size());
                prop_assert!(column.dictionary.iter().all(|(_, _, rc)| rc >= 1));
            }
        }
    }
}
