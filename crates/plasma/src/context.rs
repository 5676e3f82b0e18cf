//! Per-execution state: stacks, the protected set, and the paged arenas
//! that own every runtime value and symbol table.

use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
};

use ahash::AHashSet;
use serde::{Deserialize, Serialize};

use crate::{
    machine::EngineOptions,
    memory::{PagedArena, Slot},
    symbols::{SymbolTable, TableId},
    value::{KeyValue, Value, ValueId, ValueKind},
};

/// Control-transfer flag set by `Return`/`Break`/`Continue`/`Redo`
/// instructions and inspected by loop and conditional handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LastState {
    #[default]
    None,
    Return,
    Break,
    Continue,
    Redo,
}

/// Snapshot of both arenas, in the spirit of a heap-statistics dump.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryStats {
    pub live_values: usize,
    pub free_value_slots: usize,
    pub value_pages: usize,
    pub live_tables: usize,
    pub free_table_slots: usize,
    pub table_pages: usize,
    /// Current length of the protected set.
    pub protected_values: usize,
}

/// Work item for the reachability mark phase.
enum Mark {
    Value(ValueId),
    Table(TableId),
}

/// Per-execution state.
///
/// The context owns the paged arenas, so every value and symbol table it
/// hands out dies with it. The machine stays separate and only carries
/// global state (identity counter, options, tracer), which keeps handler
/// signatures down to `(&mut VirtualMachine, &mut Context)`.
pub struct Context {
    values: PagedArena<Value>,
    tables: PagedArena<SymbolTable>,
    value_stack: Vec<ValueId>,
    symbol_stack: Vec<TableId>,
    /// Append-only root-extension list. Operator handlers snapshot its
    /// length on entry and truncate back on every exit path; while a value
    /// is here a sweep may not reclaim it.
    protected: Vec<ValueId>,
    /// Most recently produced value; `Push` reads this.
    pub last_object: Option<ValueId>,
    pub last_state: LastState,
    master: TableId,
    initial_page_capacity: usize,
    page_growth: usize,
}

impl Context {
    pub(crate) fn new(options: &EngineOptions) -> Self {
        let capacity = options.initial_page_capacity.max(1);
        let mut values = PagedArena::new();
        values.new_page(capacity);
        let mut tables = PagedArena::new();
        tables.new_page(capacity);
        let master = TableId(tables.allocate().expect("fresh table page has free slots"));
        Self {
            values,
            tables,
            value_stack: Vec::new(),
            symbol_stack: vec![master],
            protected: Vec::new(),
            last_object: None,
            last_state: LastState::None,
            master,
            initial_page_capacity: capacity,
            page_growth: options.page_growth.max(2),
        }
    }

    /// Root symbol table seeded with the built-in types and singletons.
    #[must_use]
    pub fn master(&self) -> TableId {
        self.master
    }

    // ------------------------------------------------------------------
    // Arena access
    // ------------------------------------------------------------------

    #[must_use]
    pub fn value(&self, id: ValueId) -> &Value {
        self.values.get(id.0)
    }

    pub fn value_mut(&mut self, id: ValueId) -> &mut Value {
        self.values.get_mut(id.0)
    }

    #[must_use]
    pub fn table(&self, id: TableId) -> &SymbolTable {
        self.tables.get(id.0)
    }

    pub fn table_mut(&mut self, id: TableId) -> &mut SymbolTable {
        self.tables.get_mut(id.0)
    }

    /// Allocates a fresh value slot, growing the arena geometrically when
    /// the free stack is empty.
    pub fn allocate_value(&mut self) -> ValueId {
        if self.values.is_exhausted() {
            let next = (self.values.max_page_length() * self.page_growth).max(self.initial_page_capacity);
            self.values.new_page(next);
        }
        ValueId(self.values.allocate().expect("page growth must provide a free slot"))
    }

    /// Allocates a symbol table with exactly the given parent.
    pub fn allocate_symbol_table(&mut self, parent: Option<TableId>) -> TableId {
        if self.tables.is_exhausted() {
            let next = (self.tables.max_page_length() * self.page_growth).max(self.initial_page_capacity);
            self.tables.new_page(next);
        }
        let id = TableId(self.tables.allocate().expect("page growth must provide a free slot"));
        self.tables.get_mut(id.0).parent = parent;
        id
    }

    // ------------------------------------------------------------------
    // Stacks
    // ------------------------------------------------------------------

    pub fn push_value(&mut self, value: ValueId) {
        self.value_stack.push(value);
    }

    /// # Panics
    /// Popping an empty stack is a program error in the stream, not a
    /// runtime exception.
    pub fn pop_value(&mut self) -> ValueId {
        self.value_stack.pop().expect("value stack underflow")
    }

    #[must_use]
    pub fn peek_value(&self) -> ValueId {
        *self.value_stack.last().expect("value stack underflow")
    }

    #[must_use]
    pub fn value_stack_len(&self) -> usize {
        self.value_stack.len()
    }

    pub fn push_symbol_table(&mut self, table: TableId) {
        self.symbol_stack.push(table);
    }

    pub fn pop_symbol_table(&mut self) -> TableId {
        self.symbol_stack.pop().expect("symbol table stack underflow")
    }

    /// The current scope.
    #[must_use]
    pub fn peek_symbol_table(&self) -> TableId {
        *self.symbol_stack.last().expect("symbol table stack underflow")
    }

    // ------------------------------------------------------------------
    // Protected set
    // ------------------------------------------------------------------

    pub fn protect_value(&mut self, value: ValueId) {
        self.protected.push(value);
    }

    #[must_use]
    pub fn protected_values_state(&self) -> usize {
        self.protected.len()
    }

    pub fn restore_protected_state(&mut self, state: usize) {
        self.protected.truncate(state);
    }

    // ------------------------------------------------------------------
    // Symbol lookup
    // ------------------------------------------------------------------

    /// Local-only lookup in the given table.
    #[must_use]
    pub fn get_self(&self, table: TableId, name: &str) -> Option<ValueId> {
        self.table(table).get_self(name)
    }

    /// Chained lookup walking parent pointers.
    #[must_use]
    pub fn get_any(&self, table: TableId, name: &str) -> Option<ValueId> {
        let mut current = Some(table);
        while let Some(id) = current {
            let node = self.table(id);
            if let Some(hit) = node.get_self(name) {
                return Some(hit);
            }
            current = node.parent;
        }
        None
    }

    pub fn set_symbol(&mut self, table: TableId, name: &str, value: ValueId) {
        self.table_mut(table).set(name, value);
    }

    /// Local lookup in a value's attribute table.
    #[must_use]
    pub fn get_symbol_on(&self, value: ValueId, name: &str) -> Option<ValueId> {
        self.get_self(self.value(value).symbols(), name)
    }

    /// Local write into a value's attribute table.
    pub fn set_symbol_on(&mut self, value: ValueId, name: &str, bound: ValueId) {
        let table = self.value(value).symbols();
        self.set_symbol(table, name, bound);
    }

    // ------------------------------------------------------------------
    // Native equality and hashing
    // ------------------------------------------------------------------

    /// Structural equality for intrinsic payloads, identity for the rest.
    ///
    /// Integers and floats compare across kinds, matching the numeric
    /// method shapes. Hash tables and plain objects compare by identity.
    #[must_use]
    pub fn values_equal(&self, a: ValueId, b: ValueId) -> bool {
        if a == b {
            return true;
        }
        let left = self.value(a);
        let right = self.value(b);
        match (left.kind, right.kind) {
            (ValueKind::Integer, ValueKind::Integer) => left.integer == right.integer,
            (ValueKind::Float, ValueKind::Float) => left.floating == right.floating,
            (ValueKind::Integer, ValueKind::Float) => left.integer as f64 == right.floating,
            (ValueKind::Float, ValueKind::Integer) => left.floating == right.integer as f64,
            (ValueKind::Boolean, ValueKind::Boolean) => left.boolean == right.boolean,
            (ValueKind::String, ValueKind::String) => left.string == right.string,
            (ValueKind::Bytes, ValueKind::Bytes) => left.bytes == right.bytes,
            (ValueKind::None, ValueKind::None) => true,
            (ValueKind::Tuple, ValueKind::Tuple) | (ValueKind::Array, ValueKind::Array) => {
                left.content.len() == right.content.len()
                    && left
                        .content
                        .iter()
                        .zip(right.content.iter())
                        .all(|(&x, &y)| self.values_equal(x, y))
            }
            _ => false,
        }
    }

    /// 64-bit hash consistent with [`Context::values_equal`]: equal values
    /// hash equally, including integer/float cross-kind equality.
    #[must_use]
    pub fn hash_value(&self, id: ValueId) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash_value_into(id, &mut hasher);
        hasher.finish()
    }

    fn hash_value_into(&self, id: ValueId, hasher: &mut DefaultHasher) {
        let value = self.value(id);
        match value.kind {
            ValueKind::Integer => {
                0u8.hash(hasher);
                value.integer.hash(hasher);
            }
            ValueKind::Float => {
                // Whole floats hash like the equal integer.
                if value.floating.fract() == 0.0
                    && value.floating >= i64::MIN as f64
                    && value.floating <= i64::MAX as f64
                {
                    0u8.hash(hasher);
                    (value.floating as i64).hash(hasher);
                } else {
                    1u8.hash(hasher);
                    value.floating.to_bits().hash(hasher);
                }
            }
            ValueKind::Boolean => {
                2u8.hash(hasher);
                value.boolean.hash(hasher);
            }
            ValueKind::String => {
                3u8.hash(hasher);
                value.string.hash(hasher);
            }
            ValueKind::Bytes => {
                4u8.hash(hasher);
                value.bytes.hash(hasher);
            }
            ValueKind::None => 5u8.hash(hasher),
            ValueKind::Tuple | ValueKind::Array => {
                6u8.hash(hasher);
                value.content.len().hash(hasher);
                for &element in &value.content {
                    self.hash_value_into(element, hasher);
                }
            }
            _ => {
                7u8.hash(hasher);
                value.id.hash(hasher);
            }
        }
    }

    // ------------------------------------------------------------------
    // Hash-table buckets
    // ------------------------------------------------------------------

    /// Inserts into a hash-table value, replacing the entry of an equal
    /// key.
    pub fn hash_insert(&mut self, table: ValueId, key: ValueId, value: ValueId) {
        let hash = self.hash_value(key);
        let bucket = self.value_mut(table).key_values.entry(hash).or_default();
        // The bucket borrow ends before the equality scan, which needs the
        // whole arena.
        let bucket_len = bucket.len();
        for index in 0..bucket_len {
            let existing = self.value(table).key_values[&hash][index].key;
            if self.values_equal(existing, key) {
                self.value_mut(table).key_values.get_mut(&hash).expect("bucket exists")[index] = KeyValue { key, value };
                return;
            }
        }
        self.value_mut(table)
            .key_values
            .get_mut(&hash)
            .expect("bucket exists")
            .push(KeyValue { key, value });
    }

    #[must_use]
    pub fn hash_get(&self, table: ValueId, key: ValueId) -> Option<ValueId> {
        let hash = self.hash_value(key);
        let bucket = self.value(table).key_values.get(&hash)?;
        bucket
            .iter()
            .find(|entry| self.values_equal(entry.key, key))
            .map(|entry| entry.value)
    }

    #[must_use]
    pub fn hash_contains(&self, table: ValueId, key: ValueId) -> bool {
        self.hash_get(table, key).is_some()
    }

    #[must_use]
    pub fn hash_len(&self, table: ValueId) -> usize {
        self.value(table).key_values.values().map(Vec::len).sum()
    }

    /// All keys currently stored in a hash-table value.
    #[must_use]
    pub fn hash_keys(&self, table: ValueId) -> Vec<ValueId> {
        self.value(table)
            .key_values
            .values()
            .flat_map(|bucket| bucket.iter().map(|entry| entry.key))
            .collect()
    }

    // ------------------------------------------------------------------
    // Ancestry
    // ------------------------------------------------------------------

    /// Whether `value` is, was produced by, or descends from `other`.
    ///
    /// Reflexive, then checks the type link, then walks `parents`
    /// depth-first. Instances carry their flattened ancestor closure, so
    /// for them the walk is linear.
    #[must_use]
    pub fn implements(&self, value: ValueId, other: ValueId) -> bool {
        if value == other || self.value(value).type_of == Some(other) {
            return true;
        }
        self.value(value).parents.iter().any(|&parent| self.implements(parent, other))
    }

    /// Left-to-right depth-first transitive closure of a type's bases.
    #[must_use]
    pub(crate) fn ancestor_closure(&self, type_value: ValueId) -> Vec<ValueId> {
        let mut closure = Vec::new();
        let mut pending: Vec<ValueId> = self.value(type_value).parents.iter().rev().copied().collect();
        while let Some(current) = pending.pop() {
            if closure.contains(&current) {
                continue;
            }
            closure.push(current);
            for &parent in self.value(current).parents.iter().rev() {
                pending.push(parent);
            }
        }
        closure
    }

    // ------------------------------------------------------------------
    // Reclamation
    // ------------------------------------------------------------------

    pub(crate) fn memory_pressure(&self) -> bool {
        self.values.is_exhausted() || self.tables.is_exhausted()
    }

    /// Mark-and-sweep reclamation.
    ///
    /// Roots: the master table, both stacks, the protected set, the
    /// last-object register, and every pinned built-in. After the sweep,
    /// pages whose live count fell to zero are released.
    ///
    /// Returns `(reclaimed values, reclaimed tables)`.
    pub fn collect_garbage(&mut self) -> (usize, usize) {
        let mut marked_values: AHashSet<Slot> = AHashSet::new();
        let mut marked_tables: AHashSet<Slot> = AHashSet::new();
        let mut work: Vec<Mark> = Vec::new();

        work.push(Mark::Table(self.master));
        work.extend(self.symbol_stack.iter().map(|&t| Mark::Table(t)));
        work.extend(self.value_stack.iter().map(|&v| Mark::Value(v)));
        work.extend(self.protected.iter().map(|&v| Mark::Value(v)));
        if let Some(last) = self.last_object {
            work.push(Mark::Value(last));
        }
        for slot in self.values.live_slot_list() {
            if self.values.get(slot).built_in {
                work.push(Mark::Value(ValueId(slot)));
            }
        }

        while let Some(item) = work.pop() {
            match item {
                Mark::Value(id) => {
                    if !marked_values.insert(id.0) {
                        continue;
                    }
                    let value = self.values.get(id.0);
                    if let Some(symbols) = value.symbols {
                        work.push(Mark::Table(symbols));
                    }
                    if let Some(type_of) = value.type_of {
                        work.push(Mark::Value(type_of));
                    }
                    if let Some(receiver) = value.self_value {
                        work.push(Mark::Value(receiver));
                    }
                    if let Some(source) = value.source {
                        work.push(Mark::Value(source));
                    }
                    work.extend(value.parents.iter().map(|&p| Mark::Value(p)));
                    work.extend(value.content.iter().map(|&e| Mark::Value(e)));
                    for bucket in value.key_values.values() {
                        for entry in bucket {
                            work.push(Mark::Value(entry.key));
                            work.push(Mark::Value(entry.value));
                        }
                    }
                }
                Mark::Table(id) => {
                    if !marked_tables.insert(id.0) {
                        continue;
                    }
                    let table = self.tables.get(id.0);
                    if let Some(parent) = table.parent {
                        work.push(Mark::Table(parent));
                    }
                    work.extend(table.values().map(Mark::Value));
                }
            }
        }

        let mut reclaimed_values = 0;
        for slot in self.values.live_slot_list() {
            if !marked_values.contains(&slot) {
                self.values.deallocate(slot);
                reclaimed_values += 1;
            }
        }
        let mut reclaimed_tables = 0;
        for slot in self.tables.live_slot_list() {
            if !marked_tables.contains(&slot) {
                self.tables.deallocate(slot);
                reclaimed_tables += 1;
            }
        }
        self.values.shrink();
        self.tables.shrink();
        (reclaimed_values, reclaimed_tables)
    }

    #[must_use]
    pub fn memory_stats(&self) -> MemoryStats {
        MemoryStats {
            live_values: self.values.live_slots(),
            free_value_slots: self.values.free_slots(),
            value_pages: self.values.page_count(),
            live_tables: self.tables.live_slots(),
            free_table_slots: self.tables.free_slots(),
            table_pages: self.tables.page_count(),
            protected_values: self.protected.len(),
        }
    }
}
