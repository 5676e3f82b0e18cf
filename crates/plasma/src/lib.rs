#![doc = include_str!("../../../README.md")]
#![expect(clippy::unnecessary_wraps, reason = "builtin and on-demand signatures stay uniform")]
#![expect(clippy::missing_panics_doc, reason = "arena and stack invariants panic by contract")]

mod builtins;
mod bytecode;
mod context;
mod creators;
mod error;
mod machine;
mod memory;
pub mod names;
mod symbols;
mod tracer;
mod value;

pub use crate::{
    bytecode::{
        BinaryOperation, ClassInformation, Code, ConditionInformation, ExceptBlock, FunctionInformation,
        GeneratorInformation, Instruction, LoopInformation, OpCode, TryInformation, UnaryOperation,
    },
    context::{Context, LastState, MemoryStats},
    error::{ErrorKind, RaisedError, RunResult},
    machine::{EngineOptions, VirtualMachine},
    symbols::{SymbolTable, TableId},
    tracer::{NoopTracer, RecordingTracer, TraceEvent, VmTracer},
    value::{BuiltinFn, BuiltinInitializer, Callable, Constructor, KeyValue, OnDemandFn, Value, ValueId, ValueKind},
};
