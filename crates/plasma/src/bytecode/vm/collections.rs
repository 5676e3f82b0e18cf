//! Aggregate producers: tuples, arrays, and hash tables.
//!
//! Pop order defines source order: `NewTuple(3)` after pushing `a, b, c`
//! yields `content = [c, b, a]`-popped, i.e. the compiler pushes elements
//! in reverse so the first pop is the first element.

use crate::{context::Context, error::RunResult, machine::VirtualMachine, value::ValueId};

impl VirtualMachine {
    pub(super) fn new_tuple_op(&mut self, c: &mut Context, count: usize) -> RunResult<()> {
        self.guarded(c, |vm, c| {
            let elements = vm.pop_elements(c, count)?;
            let tuple = vm.new_tuple(c, false, elements);
            c.last_object = Some(tuple);
            Ok(())
        })
    }

    pub(super) fn new_array_op(&mut self, c: &mut Context, count: usize) -> RunResult<()> {
        self.guarded(c, |vm, c| {
            let elements = vm.pop_elements(c, count)?;
            let array = vm.new_array(c, false, elements);
            c.last_object = Some(array);
            Ok(())
        })
    }

    /// Pops `count` pairs as `(key, value)` in that pop order; a later
    /// duplicate key overwrites the earlier entry.
    pub(super) fn new_hash_op(&mut self, c: &mut Context, count: usize) -> RunResult<()> {
        self.guarded(c, |vm, c| {
            let mut pairs = Vec::with_capacity(count);
            for index in 0..count {
                if c.value_stack_len() < 2 {
                    return Err(vm.new_invalid_number_of_arguments_error(c, count, index + 1));
                }
                let key = c.pop_value();
                let value = c.pop_value();
                c.protect_value(key);
                c.protect_value(value);
                pairs.push((key, value));
            }
            let table = vm.new_hash_table(c, false);
            c.protect_value(table);
            for (key, value) in pairs {
                c.hash_insert(table, key, value);
            }
            c.last_object = Some(table);
            Ok(())
        })
    }

    fn pop_elements(&mut self, c: &mut Context, count: usize) -> RunResult<Vec<ValueId>> {
        let mut elements = Vec::with_capacity(count);
        for index in 0..count {
            if c.value_stack_len() == 0 {
                return Err(self.new_invalid_number_of_arguments_error(c, count, index + 1));
            }
            let element = c.pop_value();
            c.protect_value(element);
            elements.push(element);
        }
        Ok(elements)
    }
}
