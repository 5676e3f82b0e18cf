//! Iterator interpretation, value unpacking, and the generator adapter.

use std::rc::Rc;

use smallvec::SmallVec;

use crate::{
    bytecode::code::{Code, GeneratorInformation, Instruction},
    context::Context,
    error::RunResult,
    machine::VirtualMachine,
    names,
    value::{Callable, ValueId, ValueKind},
};

impl VirtualMachine {
    /// Boolean interpretation: intrinsic payloads natively, a `Bool`
    /// method when one exists, truthy otherwise.
    pub fn interpret_as_boolean(&mut self, c: &mut Context, value: ValueId) -> RunResult<bool> {
        let kind = c.value(value).kind;
        match kind {
            ValueKind::Boolean => Ok(c.value(value).boolean),
            ValueKind::Integer => Ok(c.value(value).integer != 0),
            ValueKind::Float => Ok(c.value(value).floating != 0.0),
            ValueKind::String => Ok(!c.value(value).string.is_empty()),
            ValueKind::Bytes => Ok(!c.value(value).bytes.is_empty()),
            ValueKind::Tuple | ValueKind::Array => Ok(!c.value(value).content.is_empty()),
            ValueKind::HashTable => Ok(c.hash_len(value) > 0),
            ValueKind::None => Ok(false),
            _ => {
                let Some(method) = self.find_attribute(c, value, names::BOOL)? else {
                    return Ok(true);
                };
                let result = self.call_function(c, method, &[])?;
                if c.value(result).kind != ValueKind::Boolean {
                    let received = c.value(result).type_name.clone();
                    return Err(self.new_invalid_type_error(c, &received, &[names::BOOL_NAME]));
                }
                Ok(c.value(result).boolean)
            }
        }
    }

    /// Iterators pass through; anything else must answer `Iter`.
    pub fn interpret_as_iterator(&mut self, c: &mut Context, value: ValueId) -> RunResult<ValueId> {
        if c.value(value).kind == ValueKind::Iterator {
            return Ok(value);
        }
        let iter = self.get_attribute(c, value, names::ITER)?;
        c.protect_value(iter);
        self.call_function(c, iter, &[])
    }

    /// Draws exactly `count` elements from a sized sequence or the
    /// iterator protocol; any arity mismatch answers
    /// `InvalidNumberOfArgumentsError`.
    pub fn unpack_values(&mut self, c: &mut Context, value: ValueId, count: usize) -> RunResult<SmallVec<[ValueId; 4]>> {
        let kind = c.value(value).kind;
        if matches!(kind, ValueKind::Tuple | ValueKind::Array) {
            let content = c.value(value).content.clone();
            if content.len() != count {
                return Err(self.new_invalid_number_of_arguments_error(c, count, content.len()));
            }
            return Ok(SmallVec::from_vec(content));
        }

        let iterator = self.interpret_as_iterator(c, value)?;
        c.protect_value(iterator);
        let has_next = self.get_attribute(c, iterator, names::HAS_NEXT)?;
        c.protect_value(has_next);
        let next = self.get_attribute(c, iterator, names::NEXT)?;
        c.protect_value(next);

        let mut unpacked = SmallVec::new();
        for index in 0..count {
            let more = self.call_function(c, has_next, &[])?;
            if !self.interpret_as_boolean(c, more)? {
                return Err(self.new_invalid_number_of_arguments_error(c, count, index));
            }
            let element = self.call_function(c, next, &[])?;
            c.protect_value(element);
            unpacked.push(element);
        }
        // A surplus element means the yield does not unpack exactly; the
        // true length is unknowable without draining, so report count + 1.
        let more = self.call_function(c, has_next, &[])?;
        if self.interpret_as_boolean(c, more)? {
            return Err(self.new_invalid_number_of_arguments_error(c, count, count + 1));
        }
        Ok(unpacked)
    }

    /// `NewGenerator`: wrap an upstream iterator with a mapping operation.
    ///
    /// The produced iterator forwards `HasNext` to the upstream and maps
    /// every `Next` through the operation function, unpacking multi-value
    /// yields into the operation's receivers. The wrappers re-derive the
    /// upstream and the operation from the iterator value itself, so the
    /// reclamation sweep sees every reference.
    pub(super) fn new_generator_op(&mut self, c: &mut Context, code: &mut Code, info: &GeneratorInformation) -> RunResult<()> {
        let operation_code: Rc<[Instruction]> = code.next_n(info.operation_length).into();
        self.guarded(c, |vm, c| {
            let result = vm.new_iterator(c, false);
            c.protect_value(result);
            let raw = c.pop_value();
            c.protect_value(raw);
            let source = vm.interpret_as_iterator(c, raw)?;
            c.protect_value(source);

            // Resolve the upstream protocol eagerly; a source without it
            // fails here rather than on the first drive.
            let has_next = vm.get_attribute(c, source, names::HAS_NEXT)?;
            c.protect_value(has_next);
            let next = vm.get_attribute(c, source, names::NEXT)?;
            c.protect_value(next);

            c.value_mut(result).source = Some(source);
            let operation = vm.new_function(
                c,
                false,
                Some(result),
                Callable::Bytecode {
                    arity: info.n_receivers,
                    code: operation_code,
                },
            );
            c.protect_value(operation);
            c.set_symbol_on(result, names::OPERATION, operation);

            let has_next_wrapper = vm.new_function(
                c,
                false,
                Some(result),
                Callable::Builtin {
                    arity: 0,
                    body: Rc::new(|vm, c, this, _args| {
                        let source = c.value(this).source.expect("generator has an upstream iterator");
                        let has_next = vm.get_attribute(c, source, names::HAS_NEXT)?;
                        vm.call_function(c, has_next, &[])
                    }),
                },
            );
            c.set_symbol_on(result, names::HAS_NEXT, has_next_wrapper);

            let receivers = info.n_receivers;
            let next_wrapper = vm.new_function(
                c,
                false,
                Some(result),
                Callable::Builtin {
                    arity: 0,
                    body: Rc::new(move |vm, c, this, _args| {
                        let source = c.value(this).source.expect("generator has an upstream iterator");
                        let next = vm.get_attribute(c, source, names::NEXT)?;
                        let next_value = vm.call_function(c, next, &[])?;
                        c.protect_value(next_value);
                        let operation = vm.get_attribute(c, this, names::OPERATION)?;
                        c.protect_value(operation);
                        if receivers == 1 {
                            return vm.call_function(c, operation, &[next_value]);
                        }
                        let unpacked = vm.unpack_values(c, next_value, receivers)?;
                        vm.call_function(c, operation, &unpacked)
                    }),
                },
            );
            c.set_symbol_on(result, names::NEXT, next_wrapper);

            c.last_object = Some(result);
            Ok(())
        })
    }
}
