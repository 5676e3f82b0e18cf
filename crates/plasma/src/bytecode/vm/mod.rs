//! The instruction executor.
//!
//! `run` reads instructions until end-of-stream, resetting the
//! control-transfer flag and dispatching to a per-opcode handler. Nested
//! bodies (branches, loop bodies, call frames, modules) are self-contained
//! streams interpreted by the same executor; control transfers travel back
//! through [`LastState`] rather than host unwinding.
//!
//! Handler families live in sibling modules:
//! - `binary` - unary/binary operator protocol
//! - `call` - call machinery and definitions
//! - `attr` - name resolution and assignment
//! - `collections` - aggregate producers
//! - `exceptions` - raise and try blocks
//! - `iter` - iterator adapter, generators, unpacking

mod attr;
mod binary;
mod call;
mod collections;
mod exceptions;
mod iter;

use smallvec::{SmallVec, smallvec};

use crate::{
    bytecode::code::{Code, Instruction, LoopInformation},
    context::{Context, LastState},
    error::RunResult,
    machine::VirtualMachine,
    names,
    value::ValueId,
};

impl VirtualMachine {
    /// Executes a stream against a context.
    ///
    /// Success carries the value `Return` produced (or a fresh `None` when
    /// the stream ran off its end); failure carries the propagating error
    /// value.
    pub(crate) fn run(&mut self, c: &mut Context, code: &mut Code) -> RunResult<ValueId> {
        while code.has_next() {
            // Instruction boundaries are the only automatic sweep trigger:
            // handler-local intermediates are dead or protected here.
            if c.memory_pressure() {
                let (values, tables) = c.collect_garbage();
                self.tracer.on_sweep(values, tables);
            }
            let instruction = code.next().expect("has_next guaranteed an instruction");
            c.last_state = LastState::None;
            self.tracer.on_instruction(instruction.op_code(), c.value_stack_len());
            match instruction {
                Instruction::NewString(text) => {
                    let value = self.new_string(c, false, text);
                    c.last_object = Some(value);
                }
                Instruction::NewBytes(bytes) => {
                    let value = self.new_bytes(c, false, bytes.clone());
                    c.last_object = Some(value);
                }
                Instruction::NewInteger(integer) => {
                    let value = self.new_integer(c, false, *integer);
                    c.last_object = Some(value);
                }
                Instruction::NewFloat(floating) => {
                    let value = self.new_float(c, false, *floating);
                    c.last_object = Some(value);
                }
                Instruction::GetTrue => c.last_object = Some(self.get_true(c)),
                Instruction::GetFalse => c.last_object = Some(self.get_false(c)),
                Instruction::GetNone => c.last_object = Some(self.get_none(c)),
                Instruction::NewTuple(count) => self.new_tuple_op(c, *count)?,
                Instruction::NewArray(count) => self.new_array_op(c, *count)?,
                Instruction::NewHash(count) => self.new_hash_op(c, *count)?,
                Instruction::Unary(operation) => self.unary_op(c, *operation)?,
                Instruction::Binary(operation) => self.binary_op(c, *operation)?,
                Instruction::GetIdentifier(name) => self.get_identifier_op(c, name)?,
                Instruction::SelectNameFromObject(name) => self.select_name_from_object_op(c, name)?,
                Instruction::Index => self.index_op(c)?,
                Instruction::AssignIdentifier(name) => self.assign_identifier_op(c, name),
                Instruction::AssignSelector(name) => self.assign_selector_op(c, name)?,
                Instruction::AssignIndex => self.assign_index_op(c)?,
                Instruction::MethodInvocation(count) => self.method_invocation_op(c, *count)?,
                Instruction::NewClass(info) | Instruction::NewInterface(info) => self.new_class_op(c, code, info)?,
                Instruction::NewFunction(info) => self.new_function_op(c, code, info)?,
                Instruction::NewClassFunction(info) => self.new_class_function_op(c, code, info)?,
                Instruction::NewLambdaFunction(info) => self.new_lambda_function_op(c, code, info)?,
                Instruction::LoadFunctionArguments(arguments) => self.load_function_arguments_op(c, arguments),
                Instruction::NewModule(info) => self.new_module_op(c, code, info)?,
                Instruction::NewGenerator(info) => self.new_generator_op(c, code, info)?,
                Instruction::If(info) => {
                    self.condition_op(c, info, false)?;
                    if let Some(result) = self.block_exit(c) {
                        return Ok(result);
                    }
                }
                Instruction::Unless(info) => {
                    self.condition_op(c, info, true)?;
                    if let Some(result) = self.block_exit(c) {
                        return Ok(result);
                    }
                }
                // One-liner forms are expressions: the branch result stays
                // in last_object and the flag is not propagated here. A
                // trailing control transfer still reaches the enclosing
                // loop because nothing resets the flag after the final
                // instruction of a stream.
                Instruction::IfOneLiner(info) => self.condition_op(c, info, false)?,
                Instruction::UnlessOneLiner(info) => self.condition_op(c, info, true)?,
                Instruction::ForLoop(info) => {
                    self.for_loop_op(c, info)?;
                    if c.last_state == LastState::Return {
                        return Ok(self.take_loop_result(c));
                    }
                }
                Instruction::WhileLoop(info) => {
                    self.while_loop_op(c, info, false)?;
                    if c.last_state == LastState::Return {
                        return Ok(self.take_loop_result(c));
                    }
                }
                Instruction::UntilLoop(info) => {
                    self.while_loop_op(c, info, true)?;
                    if c.last_state == LastState::Return {
                        return Ok(self.take_loop_result(c));
                    }
                }
                Instruction::DoWhileLoop(info) => {
                    self.do_while_loop_op(c, info)?;
                    if c.last_state == LastState::Return {
                        return Ok(self.take_loop_result(c));
                    }
                }
                Instruction::Raise => return Err(self.raise_op(c)),
                Instruction::TryBlock(info) => {
                    self.try_block_op(c, info)?;
                    if let Some(result) = self.block_exit(c) {
                        return Ok(result);
                    }
                }
                Instruction::Push => {
                    if let Some(value) = c.last_object {
                        c.push_value(value);
                    }
                }
                Instruction::Nop => {}
                Instruction::Return(count) => return self.return_op(c, *count),
                Instruction::Break => {
                    c.last_state = LastState::Break;
                    return Ok(self.get_none(c));
                }
                Instruction::Continue => {
                    c.last_state = LastState::Continue;
                    return Ok(self.get_none(c));
                }
                Instruction::Redo => {
                    c.last_state = LastState::Redo;
                    return Ok(self.get_none(c));
                }
            }
        }
        Ok(self.new_none(c, false))
    }

    /// Conditional-block exit: `Break`/`Continue`/`Redo` propagate to the
    /// enclosing loop by ending this stream early with the flag intact;
    /// `Return` short-circuits with the pending result.
    fn block_exit(&mut self, c: &mut Context) -> Option<ValueId> {
        match c.last_state {
            LastState::Return => Some(c.last_object.take().unwrap_or_else(|| self.get_none(c))),
            LastState::Break | LastState::Continue | LastState::Redo => Some(self.get_none(c)),
            LastState::None => None,
        }
    }

    /// Takes the value a loop handler parked in `last_object` when its body
    /// returned.
    fn take_loop_result(&mut self, c: &mut Context) -> ValueId {
        c.last_object.take().unwrap_or_else(|| self.get_none(c))
    }

    /// `Return(n)`: packs `n` popped values (0 becomes `None`, 1 the value
    /// itself, more a tuple in pop order) and flags the transfer.
    fn return_op(&mut self, c: &mut Context, count: usize) -> RunResult<ValueId> {
        self.guarded(c, |vm, c| {
            c.last_state = LastState::Return;
            if count == 0 {
                return Ok(vm.get_none(c));
            }
            if count == 1 {
                return Ok(c.pop_value());
            }
            let mut content = Vec::with_capacity(count);
            for _ in 0..count {
                let value = c.pop_value();
                c.protect_value(value);
                content.push(value);
            }
            Ok(vm.new_tuple(c, false, content))
        })
    }

    /// `If`/`Unless` and their one-liner forms: pop the condition, run the
    /// matching branch in the current scope, and park the branch result in
    /// `last_object`.
    fn condition_op(&mut self, c: &mut Context, info: &crate::bytecode::code::ConditionInformation, invert: bool) -> RunResult<()> {
        self.guarded(c, |vm, c| {
            let condition = c.pop_value();
            c.protect_value(condition);
            let truthy = vm.interpret_as_boolean(c, condition)? != invert;
            let branch = if truthy { &info.body } else { &info.else_body };
            let mut branch_code = Code::new(branch);
            let result = vm.run(c, &mut branch_code)?;
            c.last_object = Some(result);
            Ok(())
        })
    }

    fn for_loop_op(&mut self, c: &mut Context, info: &LoopInformation) -> RunResult<()> {
        self.guarded(c, |vm, c| {
            let raw = c.pop_value();
            c.protect_value(raw);
            let source = vm.interpret_as_iterator(c, raw)?;
            c.protect_value(source);
            let next = vm.get_attribute(c, source, names::NEXT)?;
            c.protect_value(next);
            let has_next = vm.get_attribute(c, source, names::HAS_NEXT)?;
            c.protect_value(has_next);

            'iteration: loop {
                let more = vm.call_function(c, has_next, &[])?;
                c.protect_value(more);
                if !vm.interpret_as_boolean(c, more)? {
                    break 'iteration;
                }
                let next_value = vm.call_function(c, next, &[])?;
                c.protect_value(next_value);
                'redo: loop {
                    let unpacked: SmallVec<[ValueId; 4]> = if info.receivers.len() == 1 {
                        smallvec![next_value]
                    } else {
                        vm.unpack_values(c, next_value, info.receivers.len())?
                    };
                    let scope = c.peek_symbol_table();
                    for (name, &value) in info.receivers.iter().zip(unpacked.iter()) {
                        c.protect_value(value);
                        c.set_symbol(scope, name, value);
                    }
                    let mut body = Code::new(&info.body);
                    let result = vm.run(c, &mut body)?;
                    match c.last_state {
                        LastState::Return => {
                            c.last_object = Some(result);
                            return Ok(());
                        }
                        LastState::Redo => continue 'redo,
                        LastState::Break => break 'iteration,
                        LastState::Continue | LastState::None => continue 'iteration,
                    }
                }
            }
            c.last_state = LastState::None;
            Ok(())
        })
    }

    /// `While` and, with `until`, the inverted-condition form.
    fn while_loop_op(&mut self, c: &mut Context, info: &LoopInformation, until: bool) -> RunResult<()> {
        self.guarded(c, |vm, c| {
            'iteration: loop {
                let condition_result = {
                    let mut condition = Code::new(&info.condition);
                    vm.run(c, &mut condition)?
                };
                c.protect_value(condition_result);
                // Condition streams end with Return; the flag must not leak
                // into the body inspection below.
                c.last_state = LastState::None;
                let truthy = vm.interpret_as_boolean(c, condition_result)? != until;
                if !truthy {
                    break 'iteration;
                }
                'redo: loop {
                    let mut body = Code::new(&info.body);
                    let result = vm.run(c, &mut body)?;
                    match c.last_state {
                        LastState::Return => {
                            c.last_object = Some(result);
                            return Ok(());
                        }
                        LastState::Redo => continue 'redo,
                        LastState::Break => break 'iteration,
                        LastState::Continue | LastState::None => continue 'iteration,
                    }
                }
            }
            c.last_state = LastState::None;
            Ok(())
        })
    }

    /// `DoWhile`: the body runs before the first condition check.
    fn do_while_loop_op(&mut self, c: &mut Context, info: &LoopInformation) -> RunResult<()> {
        self.guarded(c, |vm, c| {
            'iteration: loop {
                'redo: loop {
                    let mut body = Code::new(&info.body);
                    let result = vm.run(c, &mut body)?;
                    match c.last_state {
                        LastState::Return => {
                            c.last_object = Some(result);
                            return Ok(());
                        }
                        LastState::Redo => continue 'redo,
                        LastState::Break => break 'iteration,
                        LastState::Continue | LastState::None => break 'redo,
                    }
                }
                let condition_result = {
                    let mut condition = Code::new(&info.condition);
                    vm.run(c, &mut condition)?
                };
                c.protect_value(condition_result);
                c.last_state = LastState::None;
                if !vm.interpret_as_boolean(c, condition_result)? {
                    break 'iteration;
                }
            }
            c.last_state = LastState::None;
            Ok(())
        })
    }
}
