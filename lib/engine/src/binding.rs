use quadflow_common::{fnv1a_32, BufferPool, PooledBuffer};
use std::sync::Arc;

/// Outcome of a bind attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BindOutcome {
    /// The variable was unbound and is now bound.
    Fresh,
    /// The variable was already bound to an equal value.
    AlreadyEqual,
    /// The variable was already bound to a different value; the current
    /// row must be rejected.
    Conflict,
}

#[derive(Debug, Clone, Copy)]
struct BindingEntry {
    hash: u32,
    name_start: usize,
    name_len: usize,
    value_start: usize,
    value_len: usize,
    /// 0 for pattern-introduced bindings; the group nesting depth for
    /// BIND-introduced ones.
    bind_depth: u16,
}

/// The mapping from variable to current value during one scan pipeline.
///
/// Entries are appended as scans bind variables and trimmed with
/// [truncate_to](BindingTable::truncate_to) when a join level backtracks.
/// Names and values live in a parallel text arena rented from the shared
/// buffer pool; truncation only moves the logical entry count, the arena is
/// never compacted (later binds overwrite the trimmed slots and append
/// fresh text).
///
/// Variables are identified by the FNV-1a hash of their name; a hash match
/// is confirmed against the name slice, so a 32-bit collision degrades to a
/// failed lookup instead of a wrong binding.
pub(crate) struct BindingTable {
    entries: Vec<BindingEntry>,
    text: PooledBuffer,
    live: usize,
}

impl BindingTable {
    pub(crate) fn new(pool: &Arc<BufferPool>) -> Self {
        Self {
            entries: Vec::new(),
            text: pool.rent(),
            live: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.live
    }

    pub(crate) fn bind(&mut self, name: &str, value: &str) -> BindOutcome {
        self.bind_with_hash(fnv1a_32(name), name, value, 0)
    }

    pub(crate) fn bind_at_depth(&mut self, name: &str, value: &str, depth: u16) -> BindOutcome {
        self.bind_with_hash(fnv1a_32(name), name, value, depth)
    }

    pub(crate) fn bind_with_hash(
        &mut self,
        hash: u32,
        name: &str,
        value: &str,
        bind_depth: u16,
    ) -> BindOutcome {
        if let Some(index) = self.find_by_hash(hash, name) {
            return if self.value(index) == value {
                BindOutcome::AlreadyEqual
            } else {
                BindOutcome::Conflict
            };
        }

        let name_start = self.text.len();
        self.text.push_str(name);
        let value_start = self.text.len();
        self.text.push_str(value);
        let entry = BindingEntry {
            hash,
            name_start,
            name_len: name.len(),
            value_start,
            value_len: value.len(),
            bind_depth,
        };
        if self.live < self.entries.len() {
            self.entries[self.live] = entry;
        } else {
            self.entries.push(entry);
        }
        self.live += 1;
        BindOutcome::Fresh
    }

    pub(crate) fn find(&self, name: &str) -> Option<usize> {
        self.find_by_hash(fnv1a_32(name), name)
    }

    pub(crate) fn find_by_hash(&self, hash: u32, name: &str) -> Option<usize> {
        // Variable counts are small; a linear scan beats map upkeep here.
        self.entries[..self.live]
            .iter()
            .position(|entry| entry.hash == hash && self.entry_name(entry) == name)
    }

    pub(crate) fn value(&self, index: usize) -> &str {
        let entry = &self.entries[index];
        &self.text[entry.value_start..entry.value_start + entry.value_len]
    }

    pub(crate) fn name(&self, index: usize) -> &str {
        self.entry_name(&self.entries[index])
    }

    pub(crate) fn bind_depth(&self, index: usize) -> u16 {
        self.entries[index].bind_depth
    }

    /// Trims the logical length back to `len`. Arena bytes stay in place;
    /// later binds overwrite the trimmed entry slots.
    pub(crate) fn truncate_to(&mut self, len: usize) {
        debug_assert!(len <= self.live, "truncate_to may only shrink");
        self.live = len;
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries[..self.live].iter().map(|entry| {
            (
                self.entry_name(entry),
                &self.text[entry.value_start..entry.value_start + entry.value_len],
            )
        })
    }

    /// Snapshots the live bindings into owned storage.
    pub(crate) fn to_row(&self) -> MaterializedRow {
        MaterializedRow {
            entries: self.entries[..self.live]
                .iter()
                .map(|entry| RowBinding {
                    hash: entry.hash,
                    name: self.entry_name(entry).to_owned(),
                    value: self.text[entry.value_start..entry.value_start + entry.value_len]
                        .to_owned(),
                    bind_depth: entry.bind_depth,
                })
                .collect(),
        }
    }

    fn entry_name(&self, entry: &BindingEntry) -> &str {
        &self.text[entry.name_start..entry.name_start + entry.name_len]
    }
}

#[derive(Debug, Clone)]
pub(crate) struct RowBinding {
    pub(crate) hash: u32,
    pub(crate) name: String,
    pub(crate) value: String,
    pub(crate) bind_depth: u16,
}

/// A binding-table snapshot that outlives its scan.
#[derive(Debug, Clone, Default)]
pub(crate) struct MaterializedRow {
    pub(crate) entries: Vec<RowBinding>,
}

impl MaterializedRow {
    pub(crate) fn get(&self, name: &str) -> Option<&str> {
        let hash = fnv1a_32(name);
        self.entries
            .iter()
            .find(|binding| binding.hash == hash && binding.name == name)
            .map(|binding| binding.value.as_str())
    }

    /// Whether this row agrees with the live bindings on every shared
    /// variable, and how many variables are shared.
    pub(crate) fn compatibility(&self, bindings: &BindingTable) -> (bool, usize) {
        let mut shared = 0;
        for binding in &self.entries {
            if let Some(index) = bindings.find_by_hash(binding.hash, &binding.name) {
                shared += 1;
                if bindings.value(index) != binding.value {
                    return (false, shared);
                }
            }
        }
        (true, shared)
    }

    /// Extends the live bindings with this row's variables. Returns `false`
    /// on a conflict (the caller truncates and rejects the row).
    pub(crate) fn apply_to(&self, bindings: &mut BindingTable) -> bool {
        for binding in &self.entries {
            let outcome = bindings.bind_with_hash(
                binding.hash,
                &binding.name,
                &binding.value,
                binding.bind_depth,
            );
            if outcome == BindOutcome::Conflict {
                return false;
            }
        }
        true
    }
}
