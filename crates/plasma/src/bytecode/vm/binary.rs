//! Unary and binary operator handlers.
//!
//! Operators are ordinary named methods; the two-step double-dispatch
//! lives here and nowhere else. The left operand's method is tried first;
//! if it is missing or its call fails, the right operand's right-hand
//! method gets the chance. Only when both sides fall through does an error
//! propagate.

use crate::{
    bytecode::op::{BinaryOperation, UnaryOperation},
    context::Context,
    error::RunResult,
    machine::VirtualMachine,
};

impl VirtualMachine {
    pub(super) fn unary_op(&mut self, c: &mut Context, operation: UnaryOperation) -> RunResult<()> {
        self.guarded(c, |vm, c| {
            let target = c.pop_value();
            c.protect_value(target);
            let method = vm.get_attribute(c, target, operation.method_name())?;
            c.protect_value(method);
            let result = vm.call_function(c, method, &[])?;
            c.last_object = Some(result);
            Ok(())
        })
    }

    pub(super) fn binary_op(&mut self, c: &mut Context, operation: BinaryOperation) -> RunResult<()> {
        self.guarded(c, |vm, c| {
            // The right expression was pushed first, so the left operand is
            // on top.
            let left = c.pop_value();
            let right = c.pop_value();
            c.protect_value(left);
            c.protect_value(right);
            let (left_name, right_name) = operation.method_names();

            if let Some(method) = vm.find_attribute(c, left, left_name)? {
                c.protect_value(method);
                // A failed left-side call is superseded by the right-hand
                // attempt; its error value becomes garbage.
                if let Ok(result) = vm.call_function(c, method, &[right]) {
                    c.last_object = Some(result);
                    return Ok(());
                }
            }

            let Some(method) = vm.find_attribute(c, right, right_name)? else {
                return Err(vm.new_object_with_name_not_found_error(c, Some(right), right_name));
            };
            c.protect_value(method);
            let result = vm.call_function(c, method, &[left])?;
            c.last_object = Some(result);
            Ok(())
        })
    }
}
