//! Instruction stream representation and the cursor the executor reads
//! from.
//!
//! A stream is an ordered sequence of [`Instruction`]s. Structured
//! constructs (classes, functions, generators, modules) carry a body length
//! and consume that many following instructions from the enclosing stream;
//! conditionals, loops, and try blocks embed their streams inline. The
//! whole tree derives serde so a host can ship pre-compiled streams in any
//! serde format.

use serde::{Deserialize, Serialize};

use crate::bytecode::op::{BinaryOperation, OpCode, UnaryOperation};

/// Class and module definition payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassInformation {
    pub name: String,
    /// Number of base type-values popped from the value stack.
    pub n_bases: usize,
    /// Number of trailing instructions that form the constructor body.
    pub body_length: usize,
}

/// Function definition payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionInformation {
    pub name: String,
    pub arity: usize,
    /// Number of trailing instructions that form the function body.
    pub body_length: usize,
}

/// Generator construction payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorInformation {
    /// How many values each upstream element unpacks into.
    pub n_receivers: usize,
    /// Number of trailing instructions that form the mapping operation.
    pub operation_length: usize,
}

/// Conditional payload: both branches as inline streams.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ConditionInformation {
    pub body: Vec<Instruction>,
    pub else_body: Vec<Instruction>,
}

/// Loop payload.
///
/// `condition` is evaluated per iteration for while/until/do-while loops
/// and unused by for loops; `receivers` is used by for loops only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct LoopInformation {
    pub condition: Vec<Instruction>,
    pub body: Vec<Instruction>,
    pub receivers: Vec<String>,
}

/// One except clause of a try block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExceptBlock {
    /// Stream whose result's `content` lists the matchable error types.
    /// An empty result matches any error.
    pub targets: Vec<Instruction>,
    /// Name the matched error is bound to in the current scope.
    pub capture_name: String,
    pub body: Vec<Instruction>,
}

/// Try block payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TryInformation {
    pub body: Vec<Instruction>,
    pub except_blocks: Vec<ExceptBlock>,
    /// Runs only when the body completed without raising.
    pub else_body: Vec<Instruction>,
    /// Runs after the body-plus-else path and after a matched except; does
    /// not run when the error escapes unmatched.
    pub finally: Vec<Instruction>,
}

/// One decoded instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Instruction {
    NewString(String),
    NewBytes(Vec<u8>),
    NewInteger(i64),
    NewFloat(f64),
    GetTrue,
    GetFalse,
    GetNone,
    NewTuple(usize),
    NewArray(usize),
    NewHash(usize),
    Unary(UnaryOperation),
    Binary(BinaryOperation),
    GetIdentifier(String),
    SelectNameFromObject(String),
    Index,
    AssignIdentifier(String),
    AssignSelector(String),
    AssignIndex,
    MethodInvocation(usize),
    NewClass(ClassInformation),
    NewInterface(ClassInformation),
    NewFunction(FunctionInformation),
    NewClassFunction(FunctionInformation),
    NewLambdaFunction(FunctionInformation),
    LoadFunctionArguments(Vec<String>),
    NewModule(ClassInformation),
    NewGenerator(GeneratorInformation),
    If(Box<ConditionInformation>),
    Unless(Box<ConditionInformation>),
    IfOneLiner(Box<ConditionInformation>),
    UnlessOneLiner(Box<ConditionInformation>),
    ForLoop(Box<LoopInformation>),
    WhileLoop(Box<LoopInformation>),
    UntilLoop(Box<LoopInformation>),
    DoWhileLoop(Box<LoopInformation>),
    Raise,
    TryBlock(Box<TryInformation>),
    Push,
    Nop,
    Return(usize),
    Break,
    Continue,
    Redo,
}

impl Instruction {
    /// The bare opcode of this instruction.
    #[must_use]
    pub fn op_code(&self) -> OpCode {
        match self {
            Self::NewString(_) => OpCode::NewString,
            Self::NewBytes(_) => OpCode::NewBytes,
            Self::NewInteger(_) => OpCode::NewInteger,
            Self::NewFloat(_) => OpCode::NewFloat,
            Self::GetTrue => OpCode::GetTrue,
            Self::GetFalse => OpCode::GetFalse,
            Self::GetNone => OpCode::GetNone,
            Self::NewTuple(_) => OpCode::NewTuple,
            Self::NewArray(_) => OpCode::NewArray,
            Self::NewHash(_) => OpCode::NewHash,
            Self::Unary(_) => OpCode::Unary,
            Self::Binary(_) => OpCode::Binary,
            Self::GetIdentifier(_) => OpCode::GetIdentifier,
            Self::SelectNameFromObject(_) => OpCode::SelectNameFromObject,
            Self::Index => OpCode::Index,
            Self::AssignIdentifier(_) => OpCode::AssignIdentifier,
            Self::AssignSelector(_) => OpCode::AssignSelector,
            Self::AssignIndex => OpCode::AssignIndex,
            Self::MethodInvocation(_) => OpCode::MethodInvocation,
            Self::NewClass(_) => OpCode::NewClass,
            Self::NewInterface(_) => OpCode::NewInterface,
            Self::NewFunction(_) => OpCode::NewFunction,
            Self::NewClassFunction(_) => OpCode::NewClassFunction,
            Self::NewLambdaFunction(_) => OpCode::NewLambdaFunction,
            Self::LoadFunctionArguments(_) => OpCode::LoadFunctionArguments,
            Self::NewModule(_) => OpCode::NewModule,
            Self::NewGenerator(_) => OpCode::NewGenerator,
            Self::If(_) => OpCode::If,
            Self::Unless(_) => OpCode::Unless,
            Self::IfOneLiner(_) => OpCode::IfOneLiner,
            Self::UnlessOneLiner(_) => OpCode::UnlessOneLiner,
            Self::ForLoop(_) => OpCode::ForLoop,
            Self::WhileLoop(_) => OpCode::WhileLoop,
            Self::UntilLoop(_) => OpCode::UntilLoop,
            Self::DoWhileLoop(_) => OpCode::DoWhileLoop,
            Self::Raise => OpCode::Raise,
            Self::TryBlock(_) => OpCode::TryBlock,
            Self::Push => OpCode::Push,
            Self::Nop => OpCode::Nop,
            Self::Return(_) => OpCode::Return,
            Self::Break => OpCode::Break,
            Self::Continue => OpCode::Continue,
            Self::Redo => OpCode::Redo,
        }
    }
}

/// Cursor over an instruction slice.
///
/// Nested bodies are self-contained streams interpreted by the same
/// executor; handlers for trailing-body constructs advance the cursor with
/// [`Code::next_n`].
#[derive(Debug)]
pub struct Code<'a> {
    instructions: &'a [Instruction],
    index: usize,
}

impl<'a> Code<'a> {
    #[must_use]
    pub fn new(instructions: &'a [Instruction]) -> Self {
        Self { instructions, index: 0 }
    }

    #[must_use]
    pub fn has_next(&self) -> bool {
        self.index < self.instructions.len()
    }

    pub fn next(&mut self) -> Option<&'a Instruction> {
        let instruction = self.instructions.get(self.index)?;
        self.index += 1;
        Some(instruction)
    }

    /// Consumes the next `length` instructions as a nested body.
    ///
    /// # Panics
    /// Panics when the stream holds fewer than `length` instructions; a
    /// truncated stream is a malformed program, not a runtime error.
    pub fn next_n(&mut self, length: usize) -> &'a [Instruction] {
        let end = self.index + length;
        assert!(end <= self.instructions.len(), "bytecode stream truncated: body extends past end of stream");
        let body = &self.instructions[self.index..end];
        self.index = end;
        body
    }
}
