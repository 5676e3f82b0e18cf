//! Bytecode representation and the instruction executor.
//!
//! - `op` - opcode and operator enums
//! - `code` - instruction tree and stream cursor
//! - `vm` - the per-opcode handlers and dispatch loop

pub use code::{
    ClassInformation, Code, ConditionInformation, ExceptBlock, FunctionInformation, GeneratorInformation, Instruction,
    LoopInformation, TryInformation,
};
pub use op::{BinaryOperation, OpCode, UnaryOperation};

pub(crate) mod code;
pub(crate) mod op;
pub(crate) mod vm;
