//! The runtime value model.
//!
//! Every runtime object is a [`Value`]: one uniform record whose
//! [`ValueKind`] tag selects which payload slots are meaningful. Values
//! live in the context's paged arena and reference each other by
//! [`ValueId`], which keeps the pervasive cycles (a value's attribute table
//! binds `Self` back to the value, types reference bases which may
//! reference the value) trivially representable.

use std::rc::Rc;

use ahash::AHashMap;
use strum::{Display, IntoStaticStr};

use crate::{
    bytecode::Instruction,
    context::Context,
    error::RunResult,
    machine::VirtualMachine,
    memory::Slot,
    symbols::TableId,
};

/// Identity of a runtime value inside the context's paged value arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueId(pub(crate) Slot);

/// Host-provided closure satisfying the engine calling convention.
///
/// Receives the machine, the context, the bound receiver (`self`), and the
/// call arguments; answers the result value or a propagating error value.
pub type BuiltinFn = Rc<dyn Fn(&mut VirtualMachine, &mut Context, ValueId, &[ValueId]) -> RunResult<ValueId>>;

/// Nullary materializer for an on-demand symbol.
///
/// Invoked at most once per value and name; the result is cached in the
/// value's attribute table.
pub type OnDemandFn = Rc<dyn Fn(&mut VirtualMachine, &mut Context, ValueId) -> RunResult<ValueId>>;

/// Built-in type initializer run against a freshly constructed instance.
pub type BuiltinInitializer = fn(&mut Context, ValueId);

/// Discriminant selecting which payload slots of a [`Value`] are live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, IntoStaticStr)]
pub enum ValueKind {
    #[default]
    Object,
    Type,
    Function,
    Module,
    String,
    Bytes,
    Integer,
    Float,
    Boolean,
    None,
    Tuple,
    Array,
    HashTable,
    Iterator,
}

/// Callable descriptor of a function value.
#[derive(Clone)]
pub enum Callable {
    /// Host closure with a stated argument count.
    Builtin { arity: usize, body: BuiltinFn },
    /// Function body expressed as a bytecode stream.
    Bytecode { arity: usize, code: Rc<[Instruction]> },
}

impl Callable {
    #[must_use]
    pub fn arity(&self) -> usize {
        match self {
            Self::Builtin { arity, .. } | Self::Bytecode { arity, .. } => *arity,
        }
    }
}

impl std::fmt::Debug for Callable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Builtin { arity, .. } => write!(f, "Callable::Builtin(arity={arity})"),
            Self::Bytecode { arity, code } => {
                write!(f, "Callable::Bytecode(arity={arity}, instructions={})", code.len())
            }
        }
    }
}

/// Constructor descriptor of a type value.
#[derive(Debug, Clone)]
pub enum Constructor {
    /// Built-in initializer registering the kind's method shape.
    Builtin(BuiltinInitializer),
    /// Class body executed against a fresh instance's scope.
    Bytecode(Rc<[Instruction]>),
}

/// One hash-bucket entry; buckets resolve 64-bit hash collisions by
/// equality over the stored keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyValue {
    pub key: ValueId,
    pub value: ValueId,
}

/// A runtime object.
///
/// All payload slots exist on every value; `kind` decides which ones carry
/// meaning. The unused ones stay at their defaults, which keeps arena slots
/// uniform and recyclable.
pub struct Value {
    /// Monotonic identity assigned by the machine.
    pub id: u64,
    pub kind: ValueKind,
    /// Display name of the value's type.
    pub type_name: String,
    /// Link to the type-value that produced this value; immutable once set.
    /// Rootless intrinsics keep it empty.
    pub type_of: Option<ValueId>,
    pub(crate) symbols: Option<TableId>,
    /// Materializers consulted by attribute lookup before giving up on this
    /// level; hits are cached into `symbols`.
    pub(crate) on_demand: AHashMap<String, OnDemandFn>,
    /// Ancestor type-values in declaration order. On type-values these are
    /// the declared bases; on instances, the flattened transitive closure.
    pub parents: Vec<ValueId>,
    /// Built-in values are pinned: reclamation sweeps never free them.
    pub built_in: bool,
    pub boolean: bool,
    pub integer: i64,
    pub floating: f64,
    pub string: String,
    pub bytes: Vec<u8>,
    /// Ordered element sequence for tuples and arrays, and the element
    /// snapshot for iterators.
    pub content: Vec<ValueId>,
    /// Hash buckets for hash tables.
    pub key_values: AHashMap<u64, Vec<KeyValue>>,
    pub callable: Option<Callable>,
    pub constructor: Option<Constructor>,
    /// Bound method receiver. A function without one is its own receiver.
    pub self_value: Option<ValueId>,
    /// Upstream iterator for generator-built iterators.
    pub source: Option<ValueId>,
}

impl Value {
    /// The value's attribute table.
    ///
    /// # Panics
    /// Panics on an uninitialized arena slot; every constructed value has
    /// an attribute table.
    #[must_use]
    pub fn symbols(&self) -> TableId {
        self.symbols.expect("value symbols not initialized")
    }

    /// Registers a materializer consulted by attribute lookup.
    pub fn set_on_demand(&mut self, name: &str, loader: OnDemandFn) {
        self.on_demand.insert(name.to_owned(), loader);
    }
}

impl Default for Value {
    fn default() -> Self {
        Self {
            id: 0,
            kind: ValueKind::default(),
            type_name: String::new(),
            type_of: None,
            symbols: None,
            on_demand: AHashMap::new(),
            parents: Vec::new(),
            built_in: false,
            boolean: false,
            integer: 0,
            floating: 0.0,
            string: String::new(),
            bytes: Vec::new(),
            content: Vec::new(),
            key_values: AHashMap::new(),
            callable: None,
            constructor: None,
            self_value: None,
            source: None,
        }
    }
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Value")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("type_name", &self.type_name)
            .field("built_in", &self.built_in)
            .finish_non_exhaustive()
    }
}
