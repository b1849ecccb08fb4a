//! A refcounted interning table mapping values to stable entry handles.
//!
//! The dictionary owns the canonical instance of every distinct value held by
//! a column. Entries are kept in an arena and referenced through [`EntryId`]
//! handles, so dropping one entry can never dangle a reference held
//! elsewhere; a vacated slot is tombstoned and recycled.

use std::collections::BTreeMap;
use std::fmt;

/// An opaque handle to an entry in a [`Dictionary`].
///
/// Ids are stable for the lifetime of the entry they name and are only
/// meaningful for the dictionary that issued them. They can be compared,
/// hashed and cheaply copied around, just like small integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryId(usize);

impl EntryId {
    fn new(index: usize) -> Self {
        Self(index)
    }

    fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone)]
struct Entry<T> {
    value: T,
    refcount: u64,
}

/// Maps each distinct value to its entry and reference count.
///
/// An entry exists exactly as long as at least one reference to it does:
/// it is created by the first [`acquire`](Dictionary::acquire) of its value
/// and removed by the [`release`](Dictionary::release) that drops its
/// refcount to zero. Iteration is in value order, which makes the order
/// deterministic for the on-disk encoding.
#[derive(Debug, Clone)]
pub struct Dictionary<T> {
    /// Entry arena; a `None` slot is a tombstone awaiting reuse.
    slots: Vec<Option<Entry<T>>>,
    /// Value-ordered lookup. Keeps its own copy of each key value.
    lookup: BTreeMap<T, EntryId>,
    /// Tombstoned slots available for the next insertion.
    free: Vec<EntryId>,
}

impl<T> Default for Dictionary<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            lookup: BTreeMap::new(),
            free: Vec::new(),
        }
    }
}

impl<T: Clone + Ord> Dictionary<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the entry holding `value`, interning it first if it is not
    /// present, and counts one more reference to it.
    pub fn acquire(&mut self, value: T) -> EntryId {
        match self.lookup.get(&value) {
            Some(&id) => {
                let entry = self.slots[id.index()]
                    .as_mut()
                    .expect("lookup references a live entry");
                entry.refcount += 1;
                id
            }
            None => {
                let id = self.alloc(Entry {
                    value: value.clone(),
                    refcount: 1,
                });
                self.lookup.insert(value, id);
                id
            }
        }
    }

    /// Drops one reference to the entry named by `id`, removing the entry
    /// the moment its refcount reaches zero.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not refer to a live entry of this dictionary.
    pub fn release(&mut self, id: EntryId) {
        let slot = &mut self.slots[id.index()];
        let entry = slot.as_mut().expect("release of a dead dictionary entry");
        if entry.refcount > 1 {
            entry.refcount -= 1;
            return;
        }
        // Last reference: the entry dies with it, leaving no orphan behind.
        if let Some(entry) = slot.take() {
            self.lookup.remove(&entry.value);
            self.free.push(id);
        }
    }

    /// Inserts `value` with an explicit refcount, for rebuilding a
    /// dictionary from storage. Returns `None` when the value is already
    /// interned; duplicate keys are never created.
    pub fn insert_new(&mut self, value: T, refcount: u64) -> Option<EntryId> {
        debug_assert!(refcount >= 1);
        if self.lookup.contains_key(&value) {
            return None;
        }
        let id = self.alloc(Entry {
            value: value.clone(),
            refcount,
        });
        self.lookup.insert(value, id);
        Some(id)
    }

    fn alloc(&mut self, entry: Entry<T>) -> EntryId {
        match self.free.pop() {
            Some(id) => {
                self.slots[id.index()] = Some(entry);
                id
            }
            None => {
                let id = EntryId::new(self.slots.len());
                self.slots.push(Some(entry));
                id
            }
        }
    }

    /// The value held by the entry named by `id`, if it is live.
    pub fn value(&self, id: EntryId) -> Option<&T> {
        self.slots
            .get(id.index())
            .and_then(|slot| slot.as_ref())
            .map(|entry| &entry.value)
    }

    /// The current reference count of the entry named by `id`, if it is live.
    pub fn refcount(&self, id: EntryId) -> Option<u64> {
        self.slots
            .get(id.index())
            .and_then(|slot| slot.as_ref())
            .map(|entry| entry.refcount)
    }

    /// The id of the entry holding `value`, if interned.
    pub fn id(&self, value: &T) -> Option<EntryId> {
        self.lookup.get(value).copied()
    }

    /// Number of distinct values currently interned.
    pub fn len(&self) -> usize {
        self.lookup.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lookup.is_empty()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.lookup.clear();
        self.free.clear();
    }

    /// Iterates `(id, value, refcount)` over all live entries in value order.
    pub fn iter(&self) -> impl Iterator<Item = (EntryId, &T, u64)> + '_ {
        self.lookup.iter().map(move |(value, &id)| {
            let refcount = self.refcount(id).expect("lookup references a live entry");
            (id, value, refcount)
        })
    }
}
