//! Opcode and operator enums.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use crate::names;

/// The opcode byte of an instruction.
///
/// [`Instruction`](crate::bytecode::Instruction) variants carry their
/// decoded payload; this enum is the bare discriminant used by tracing and
/// by hosts that index handler tables by opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, Serialize, Deserialize)]
#[repr(u8)]
pub enum OpCode {
    NewString,
    NewBytes,
    NewInteger,
    NewFloat,
    GetTrue,
    GetFalse,
    GetNone,
    NewTuple,
    NewArray,
    NewHash,
    Unary,
    Binary,
    GetIdentifier,
    SelectNameFromObject,
    Index,
    AssignIdentifier,
    AssignSelector,
    AssignIndex,
    MethodInvocation,
    NewClass,
    NewInterface,
    NewFunction,
    NewClassFunction,
    NewLambdaFunction,
    LoadFunctionArguments,
    NewModule,
    NewGenerator,
    If,
    Unless,
    IfOneLiner,
    UnlessOneLiner,
    ForLoop,
    WhileLoop,
    UntilLoop,
    DoWhileLoop,
    Raise,
    TryBlock,
    Push,
    Nop,
    Return,
    Break,
    Continue,
    Redo,
}

impl OpCode {
    /// The opcode as its wire byte.
    #[must_use]
    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

/// Binary operator selector carried by `Binary` instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
pub enum BinaryOperation {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
    BitXor,
    BitAnd,
    BitOr,
    BitLeft,
    BitRight,
    And,
    Or,
    Xor,
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
    Contains,
}

impl BinaryOperation {
    /// Method names resolved by the double-dispatch protocol, as
    /// `(looked up on the left operand, looked up on the right operand)`.
    ///
    /// `Contains` swaps the pair: `x in container` resolves `RightContains`
    /// on `x` first and falls back to `Contains` on the container.
    #[must_use]
    pub fn method_names(self) -> (&'static str, &'static str) {
        match self {
            Self::Add => (names::ADD, names::RIGHT_ADD),
            Self::Sub => (names::SUB, names::RIGHT_SUB),
            Self::Mul => (names::MUL, names::RIGHT_MUL),
            Self::Div => (names::DIV, names::RIGHT_DIV),
            Self::FloorDiv => (names::FLOOR_DIV, names::RIGHT_FLOOR_DIV),
            Self::Mod => (names::MOD, names::RIGHT_MOD),
            Self::Pow => (names::POW, names::RIGHT_POW),
            Self::BitXor => (names::BIT_XOR, names::RIGHT_BIT_XOR),
            Self::BitAnd => (names::BIT_AND, names::RIGHT_BIT_AND),
            Self::BitOr => (names::BIT_OR, names::RIGHT_BIT_OR),
            Self::BitLeft => (names::BIT_LEFT, names::RIGHT_BIT_LEFT),
            Self::BitRight => (names::BIT_RIGHT, names::RIGHT_BIT_RIGHT),
            Self::And => (names::AND, names::RIGHT_AND),
            Self::Or => (names::OR, names::RIGHT_OR),
            Self::Xor => (names::XOR, names::RIGHT_XOR),
            Self::Equals => (names::EQUALS, names::RIGHT_EQUALS),
            Self::NotEquals => (names::NOT_EQUALS, names::RIGHT_NOT_EQUALS),
            Self::GreaterThan => (names::GREATER_THAN, names::RIGHT_GREATER_THAN),
            Self::LessThan => (names::LESS_THAN, names::RIGHT_LESS_THAN),
            Self::GreaterThanOrEqual => (names::GREATER_THAN_OR_EQUAL, names::RIGHT_GREATER_THAN_OR_EQUAL),
            Self::LessThanOrEqual => (names::LESS_THAN_OR_EQUAL, names::RIGHT_LESS_THAN_OR_EQUAL),
            Self::Contains => (names::RIGHT_CONTAINS, names::CONTAINS),
        }
    }
}

/// Unary operator selector carried by `Unary` instructions.
///
/// There is no `Positive` variant; the operator is not defined by the
/// language yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
pub enum UnaryOperation {
    NegateBits,
    Negate,
    Negative,
}

impl UnaryOperation {
    /// Method name resolved on the operand.
    #[must_use]
    pub fn method_name(self) -> &'static str {
        match self {
            Self::NegateBits => names::NEG_BITS,
            Self::Negate => names::NEGATE,
            Self::Negative => names::NEGATIVE,
        }
    }
}
