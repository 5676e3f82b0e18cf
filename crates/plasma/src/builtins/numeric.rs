//! Method shapes for integers and floats.
//!
//! Both kinds share one arithmetic/comparison protocol with int/float
//! coercion; whole-number results stay integers, anything touching a float
//! becomes a float. A non-numeric argument answers `InvalidTypeError`,
//! which lets the double-dispatch protocol fall through to the other
//! operand's right-hand method.

use std::rc::Rc;

use crate::{
    builtins::{builtin_method, register},
    context::Context,
    error::RunResult,
    machine::VirtualMachine,
    names,
    value::{OnDemandFn, ValueId, ValueKind},
};

#[derive(Debug, Clone, Copy)]
enum Operand {
    Int(i64),
    Float(f64),
}

impl Operand {
    fn as_float(self) -> f64 {
        match self {
            Self::Int(value) => value as f64,
            Self::Float(value) => value,
        }
    }
}

fn operand(context: &Context, value: ValueId) -> Option<Operand> {
    let object = context.value(value);
    match object.kind {
        ValueKind::Integer => Some(Operand::Int(object.integer)),
        ValueKind::Float => Some(Operand::Float(object.floating)),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy)]
enum NumericBinary {
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
}

#[derive(Debug, Clone, Copy)]
enum NumericCompare {
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
}

fn bit_op(
    vm: &mut VirtualMachine,
    context: &mut Context,
    op: NumericBinary,
    a: i64,
    b: i64,
) -> RunResult<i64> {
    Ok(match op {
        NumericBinary::BitXor => a ^ b,
        NumericBinary::BitAnd => a & b,
        NumericBinary::BitOr => a | b,
        NumericBinary::BitLeft => {
            let shift = u32::try_from(b).map_err(|_| vm.new_runtime_error(context, "negative shift amount"))?;
            a.checked_shl(shift)
                .ok_or_else(|| vm.new_runtime_error(context, "shift amount out of range"))?
        }
        NumericBinary::BitRight => {
            let shift = u32::try_from(b).map_err(|_| vm.new_runtime_error(context, "negative shift amount"))?;
            a.checked_shr(shift)
                .ok_or_else(|| vm.new_runtime_error(context, "shift amount out of range"))?
        }
        _ => unreachable!("arithmetic operator routed to bit_op"),
    })
}

fn apply_binary(
    vm: &mut VirtualMachine,
    context: &mut Context,
    op: NumericBinary,
    lhs: Operand,
    rhs: Operand,
) -> RunResult<ValueId> {
    use Operand::Int;
    match op {
        NumericBinary::Add => Ok(match (lhs, rhs) {
            (Int(a), Int(b)) => vm.new_integer(context, false, a.wrapping_add(b)),
            _ => vm.new_float(context, false, lhs.as_float() + rhs.as_float()),
        }),
        NumericBinary::Sub => Ok(match (lhs, rhs) {
            (Int(a), Int(b)) => vm.new_integer(context, false, a.wrapping_sub(b)),
            _ => vm.new_float(context, false, lhs.as_float() - rhs.as_float()),
        }),
        NumericBinary::Mul => Ok(match (lhs, rhs) {
            (Int(a), Int(b)) => vm.new_integer(context, false, a.wrapping_mul(b)),
            _ => vm.new_float(context, false, lhs.as_float() * rhs.as_float()),
        }),
        // True division always answers a float.
        NumericBinary::Div => {
            if rhs.as_float() == 0.0 {
                return Err(vm.new_runtime_error(context, "division by zero"));
            }
            Ok(vm.new_float(context, false, lhs.as_float() / rhs.as_float()))
        }
        NumericBinary::FloorDiv => match (lhs, rhs) {
            (Int(_), Int(0)) => Err(vm.new_runtime_error(context, "division by zero")),
            (Int(a), Int(b)) => Ok(vm.new_integer(context, false, a.div_euclid(b))),
            _ => {
                if rhs.as_float() == 0.0 {
                    return Err(vm.new_runtime_error(context, "division by zero"));
                }
                Ok(vm.new_float(context, false, (lhs.as_float() / rhs.as_float()).floor()))
            }
        },
        NumericBinary::Mod => match (lhs, rhs) {
            (Int(_), Int(0)) => Err(vm.new_runtime_error(context, "division by zero")),
            (Int(a), Int(b)) => Ok(vm.new_integer(context, false, a.rem_euclid(b))),
            _ => {
                if rhs.as_float() == 0.0 {
                    return Err(vm.new_runtime_error(context, "division by zero"));
                }
                Ok(vm.new_float(context, false, lhs.as_float().rem_euclid(rhs.as_float())))
            }
        },
        NumericBinary::Pow => match (lhs, rhs) {
            (Int(a), Int(b)) if b >= 0 => match u32::try_from(b).ok().and_then(|exp| a.checked_pow(exp)) {
                Some(result) => Ok(vm.new_integer(context, false, result)),
                None => Ok(vm.new_float(context, false, (a as f64).powf(b as f64))),
            },
            _ => Ok(vm.new_float(context, false, lhs.as_float().powf(rhs.as_float()))),
        },
        NumericBinary::BitXor
        | NumericBinary::BitAnd
        | NumericBinary::BitOr
        | NumericBinary::BitLeft
        | NumericBinary::BitRight => {
            let (Int(a), Int(b)) = (lhs, rhs) else {
                return Err(vm.new_invalid_type_error(context, names::FLOAT_NAME, &[names::INTEGER_NAME]));
            };
            let result = bit_op(vm, context, op, a, b)?;
            Ok(vm.new_integer(context, false, result))
        }
    }
}

fn apply_compare(op: NumericCompare, lhs: Operand, rhs: Operand) -> bool {
    use Operand::Int;
    if let (Int(a), Int(b)) = (lhs, rhs) {
        return match op {
            NumericCompare::GreaterThan => a > b,
            NumericCompare::LessThan => a < b,
            NumericCompare::GreaterThanOrEqual => a >= b,
            NumericCompare::LessThanOrEqual => a <= b,
        };
    }
    let (a, b) = (lhs.as_float(), rhs.as_float());
    match op {
        NumericCompare::GreaterThan => a > b,
        NumericCompare::LessThan => a < b,
        NumericCompare::GreaterThanOrEqual => a >= b,
        NumericCompare::LessThanOrEqual => a <= b,
    }
}

fn arithmetic_method(op: NumericBinary, reflected: bool) -> OnDemandFn {
    builtin_method(
        1,
        Rc::new(move |vm, context, this, args| {
            let mine = operand(context, this).expect("numeric method on a non-numeric receiver");
            let Some(other) = operand(context, args[0]) else {
                let received = context.value(args[0]).type_name.clone();
                return Err(vm.new_invalid_type_error(context, &received, &[names::INTEGER_NAME, names::FLOAT_NAME]));
            };
            let (lhs, rhs) = if reflected { (other, mine) } else { (mine, other) };
            apply_binary(vm, context, op, lhs, rhs)
        }),
    )
}

fn compare_method(op: NumericCompare, reflected: bool) -> OnDemandFn {
    builtin_method(
        1,
        Rc::new(move |vm, context, this, args| {
            let mine = operand(context, this).expect("numeric method on a non-numeric receiver");
            let Some(other) = operand(context, args[0]) else {
                let received = context.value(args[0]).type_name.clone();
                return Err(vm.new_invalid_type_error(context, &received, &[names::INTEGER_NAME, names::FLOAT_NAME]));
            };
            let (lhs, rhs) = if reflected { (other, mine) } else { (mine, other) };
            Ok(vm.get_boolean(context, apply_compare(op, lhs, rhs)))
        }),
    )
}

fn register_numeric_protocol(context: &mut Context, value: ValueId) {
    let binary_table: [(&str, &str, NumericBinary); 12] = [
        (names::ADD, names::RIGHT_ADD, NumericBinary::Add),
        (names::SUB, names::RIGHT_SUB, NumericBinary::Sub),
        (names::MUL, names::RIGHT_MUL, NumericBinary::Mul),
        (names::DIV, names::RIGHT_DIV, NumericBinary::Div),
        (names::FLOOR_DIV, names::RIGHT_FLOOR_DIV, NumericBinary::FloorDiv),
        (names::MOD, names::RIGHT_MOD, NumericBinary::Mod),
        (names::POW, names::RIGHT_POW, NumericBinary::Pow),
        (names::BIT_XOR, names::RIGHT_BIT_XOR, NumericBinary::BitXor),
        (names::BIT_AND, names::RIGHT_BIT_AND, NumericBinary::BitAnd),
        (names::BIT_OR, names::RIGHT_BIT_OR, NumericBinary::BitOr),
        (names::BIT_LEFT, names::RIGHT_BIT_LEFT, NumericBinary::BitLeft),
        (names::BIT_RIGHT, names::RIGHT_BIT_RIGHT, NumericBinary::BitRight),
    ];
    for (name, right_name, op) in binary_table {
        register(context, value, name, arithmetic_method(op, false));
        register(context, value, right_name, arithmetic_method(op, true));
    }
    let compare_table: [(&str, &str, NumericCompare); 4] = [
        (names::GREATER_THAN, names::RIGHT_GREATER_THAN, NumericCompare::GreaterThan),
        (names::LESS_THAN, names::RIGHT_LESS_THAN, NumericCompare::LessThan),
        (
            names::GREATER_THAN_OR_EQUAL,
            names::RIGHT_GREATER_THAN_OR_EQUAL,
            NumericCompare::GreaterThanOrEqual,
        ),
        (
            names::LESS_THAN_OR_EQUAL,
            names::RIGHT_LESS_THAN_OR_EQUAL,
            NumericCompare::LessThanOrEqual,
        ),
    ];
    for (name, right_name, op) in compare_table {
        register(context, value, name, compare_method(op, false));
        register(context, value, right_name, compare_method(op, true));
    }
}

pub(crate) fn integer_shape(context: &mut Context, value: ValueId) {
    register_numeric_protocol(context, value);
    register(
        context,
        value,
        names::NEGATIVE,
        builtin_method(
            0,
            Rc::new(|vm, context, this, _args| {
                let negated = context.value(this).integer.wrapping_neg();
                Ok(vm.new_integer(context, false, negated))
            }),
        ),
    );
    register(
        context,
        value,
        names::NEG_BITS,
        builtin_method(
            0,
            Rc::new(|vm, context, this, _args| {
                let inverted = !context.value(this).integer;
                Ok(vm.new_integer(context, false, inverted))
            }),
        ),
    );
    register(
        context,
        value,
        names::TO_STRING,
        builtin_method(
            0,
            Rc::new(|vm, context, this, _args| {
                let text = context.value(this).integer.to_string();
                Ok(vm.new_string(context, false, &text))
            }),
        ),
    );
    register(
        context,
        value,
        names::BOOL,
        builtin_method(
            0,
            Rc::new(|vm, context, this, _args| {
                let truthy = context.value(this).integer != 0;
                Ok(vm.get_boolean(context, truthy))
            }),
        ),
    );
}

pub(crate) fn float_shape(context: &mut Context, value: ValueId) {
    register_numeric_protocol(context, value);
    register(
        context,
        value,
        names::NEGATIVE,
        builtin_method(
            0,
            Rc::new(|vm, context, this, _args| {
                let negated = -context.value(this).floating;
                Ok(vm.new_float(context, false, negated))
            }),
        ),
    );
    register(
        context,
        value,
        names::TO_STRING,
        builtin_method(
            0,
            Rc::new(|vm, context, this, _args| {
                let mut buffer = ryu::Buffer::new();
                let text = buffer.format(context.value(this).floating).to_owned();
                Ok(vm.new_string(context, false, &text))
            }),
        ),
    );
    register(
        context,
        value,
        names::BOOL,
        builtin_method(
            0,
            Rc::new(|vm, context, this, _args| {
                let truthy = context.value(this).floating != 0.0;
                Ok(vm.get_boolean(context, truthy))
            }),
        ),
    );
}
