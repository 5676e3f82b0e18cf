//! Method shapes for tuples, arrays, and hash tables.

use std::rc::Rc;

use crate::{
    builtins::{builtin_method, iterator::make_snapshot_iterator, register, text::resolve_index},
    context::Context,
    error::RunResult,
    machine::VirtualMachine,
    names,
    value::{ValueId, ValueKind},
};

fn sequence_to_string(
    vm: &mut VirtualMachine,
    context: &mut Context,
    this: ValueId,
    open: char,
    close: char,
) -> RunResult<ValueId> {
    let content = context.value(this).content.clone();
    let mut parts = Vec::with_capacity(content.len());
    for element in content {
        parts.push(vm.stringify(context, element)?);
    }
    let text = format!("{open}{}{close}", parts.join(", "));
    Ok(vm.new_string(context, false, &text))
}

fn register_sequence_protocol(context: &mut Context, value: ValueId) {
    register(
        context,
        value,
        names::INDEX,
        builtin_method(
            1,
            Rc::new(|vm, context, this, args| {
                if context.value(args[0]).kind != ValueKind::Integer {
                    let received = context.value(args[0]).type_name.clone();
                    return Err(vm.new_invalid_type_error(context, &received, &[names::INTEGER_NAME]));
                }
                let requested = context.value(args[0]).integer;
                let length = context.value(this).content.len();
                let Some(position) = resolve_index(length, requested) else {
                    return Err(vm.new_runtime_error(
                        context,
                        format!("index {requested} out of range for length {length}"),
                    ));
                };
                Ok(context.value(this).content[position])
            }),
        ),
    );
    register(
        context,
        value,
        names::CONTAINS,
        builtin_method(
            1,
            Rc::new(|vm, context, this, args| {
                let found = context
                    .value(this)
                    .content
                    .iter()
                    .any(|&element| context.values_equal(element, args[0]));
                Ok(vm.get_boolean(context, found))
            }),
        ),
    );
    register(
        context,
        value,
        names::ITER,
        builtin_method(
            0,
            Rc::new(|vm, context, this, _args| {
                let elements = context.value(this).content.clone();
                Ok(make_snapshot_iterator(vm, context, this, elements))
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
                let truthy = !context.value(this).content.is_empty();
                Ok(vm.get_boolean(context, truthy))
            }),
        ),
    );
}

pub(crate) fn tuple_shape(context: &mut Context, value: ValueId) {
    register_sequence_protocol(context, value);
    register(
        context,
        value,
        names::TO_STRING,
        builtin_method(0, Rc::new(|vm, context, this, _args| sequence_to_string(vm, context, this, '(', ')'))),
    );
}

pub(crate) fn array_shape(context: &mut Context, value: ValueId) {
    register_sequence_protocol(context, value);
    register(
        context,
        value,
        names::TO_STRING,
        builtin_method(0, Rc::new(|vm, context, this, _args| sequence_to_string(vm, context, this, '[', ']'))),
    );
    register(
        context,
        value,
        names::ASSIGN,
        builtin_method(
            2,
            Rc::new(|vm, context, this, args| {
                if context.value(args[0]).kind != ValueKind::Integer {
                    let received = context.value(args[0]).type_name.clone();
                    return Err(vm.new_invalid_type_error(context, &received, &[names::INTEGER_NAME]));
                }
                let requested = context.value(args[0]).integer;
                let length = context.value(this).content.len();
                let Some(position) = resolve_index(length, requested) else {
                    return Err(vm.new_runtime_error(
                        context,
                        format!("index {requested} out of range for length {length}"),
                    ));
                };
                context.value_mut(this).content[position] = args[1];
                Ok(vm.get_none(context))
            }),
        ),
    );
}

pub(crate) fn hash_shape(context: &mut Context, value: ValueId) {
    register(
        context,
        value,
        names::INDEX,
        builtin_method(
            1,
            Rc::new(|vm, context, this, args| {
                if let Some(found) = context.hash_get(this, args[0]) {
                    return Ok(found);
                }
                let key = vm.stringify(context, args[0]).unwrap_or_else(|_| String::from("<key>"));
                Err(vm.new_runtime_error(context, format!("key not found: {key}")))
            }),
        ),
    );
    register(
        context,
        value,
        names::ASSIGN,
        builtin_method(
            2,
            Rc::new(|vm, context, this, args| {
                context.hash_insert(this, args[0], args[1]);
                Ok(vm.get_none(context))
            }),
        ),
    );
    register(
        context,
        value,
        names::CONTAINS,
        builtin_method(
            1,
            Rc::new(|vm, context, this, args| {
                let present = context.hash_contains(this, args[0]);
                Ok(vm.get_boolean(context, present))
            }),
        ),
    );
    register(
        context,
        value,
        names::ITER,
        builtin_method(
            0,
            Rc::new(|vm, context, this, _args| {
                let keys = context.hash_keys(this);
                Ok(make_snapshot_iterator(vm, context, this, keys))
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
                let keys = context.hash_keys(this);
                let mut parts = Vec::with_capacity(keys.len());
                for key in keys {
                    let entry = context.hash_get(this, key).expect("key came from the table");
                    let key_text = vm.stringify(context, key)?;
                    let value_text = vm.stringify(context, entry)?;
                    parts.push(format!("{key_text}: {value_text}"));
                }
                let text = format!("{{{}}}", parts.join(", "));
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
                let truthy = context.hash_len(this) > 0;
                Ok(vm.get_boolean(context, truthy))
            }),
        ),
    );
}
