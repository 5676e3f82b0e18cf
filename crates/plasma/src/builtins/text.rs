//! Method shapes for strings and bytes.

use std::rc::Rc;

use crate::{
    builtins::{builtin_method, iterator::make_snapshot_iterator, register},
    context::Context,
    names,
    value::{ValueId, ValueKind},
};

/// Resolves a possibly-negative index against a sequence length.
pub(crate) fn resolve_index(length: usize, index: i64) -> Option<usize> {
    if index >= 0 {
        let index = index as usize;
        (index < length).then_some(index)
    } else {
        let back = index.unsigned_abs() as usize;
        (back <= length).then(|| length - back)
    }
}

pub(crate) fn string_shape(context: &mut Context, value: ValueId) {
    register(
        context,
        value,
        names::ADD,
        builtin_method(
            1,
            Rc::new(|vm, context, this, args| {
                if context.value(args[0]).kind != ValueKind::String {
                    let received = context.value(args[0]).type_name.clone();
                    return Err(vm.new_invalid_type_error(context, &received, &[names::STRING_NAME]));
                }
                let mut joined = context.value(this).string.clone();
                joined.push_str(&context.value(args[0]).string);
                Ok(vm.new_string(context, false, &joined))
            }),
        ),
    );
    register(
        context,
        value,
        names::MUL,
        builtin_method(
            1,
            Rc::new(|vm, context, this, args| {
                if context.value(args[0]).kind != ValueKind::Integer {
                    let received = context.value(args[0]).type_name.clone();
                    return Err(vm.new_invalid_type_error(context, &received, &[names::INTEGER_NAME]));
                }
                let count = context.value(args[0]).integer.max(0) as usize;
                let repeated = context.value(this).string.repeat(count);
                Ok(vm.new_string(context, false, &repeated))
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
                if context.value(args[0]).kind != ValueKind::String {
                    let received = context.value(args[0]).type_name.clone();
                    return Err(vm.new_invalid_type_error(context, &received, &[names::STRING_NAME]));
                }
                let found = context.value(this).string.contains(context.value(args[0]).string.as_str());
                Ok(vm.get_boolean(context, found))
            }),
        ),
    );
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
                let characters: Vec<char> = context.value(this).string.chars().collect();
                let Some(position) = resolve_index(characters.len(), requested) else {
                    return Err(vm.new_runtime_error(
                        context,
                        format!("index {requested} out of range for length {}", characters.len()),
                    ));
                };
                Ok(vm.new_string(context, false, &characters[position].to_string()))
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
                let characters: Vec<char> = context.value(this).string.chars().collect();
                let elements = characters
                    .into_iter()
                    .map(|character| vm.new_string(context, false, &character.to_string()))
                    .collect();
                Ok(make_snapshot_iterator(vm, context, this, elements))
            }),
        ),
    );
    register(
        context,
        value,
        names::TO_STRING,
        builtin_method(
            0,
            Rc::new(|_vm, _context, this, _args| Ok(this)),
        ),
    );
    register(
        context,
        value,
        names::BOOL,
        builtin_method(
            0,
            Rc::new(|vm, context, this, _args| {
                let truthy = !context.value(this).string.is_empty();
                Ok(vm.get_boolean(context, truthy))
            }),
        ),
    );
}

pub(crate) fn bytes_shape(context: &mut Context, value: ValueId) {
    register(
        context,
        value,
        names::ADD,
        builtin_method(
            1,
            Rc::new(|vm, context, this, args| {
                if context.value(args[0]).kind != ValueKind::Bytes {
                    let received = context.value(args[0]).type_name.clone();
                    return Err(vm.new_invalid_type_error(context, &received, &[names::BYTES_NAME]));
                }
                let mut joined = context.value(this).bytes.clone();
                joined.extend_from_slice(&context.value(args[0]).bytes);
                Ok(vm.new_bytes(context, false, joined))
            }),
        ),
    );
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
                let length = context.value(this).bytes.len();
                let Some(position) = resolve_index(length, requested) else {
                    return Err(vm.new_runtime_error(
                        context,
                        format!("index {requested} out of range for length {length}"),
                    ));
                };
                let byte = i64::from(context.value(this).bytes[position]);
                Ok(vm.new_integer(context, false, byte))
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
                let bytes = context.value(this).bytes.clone();
                let elements = bytes
                    .into_iter()
                    .map(|byte| vm.new_integer(context, false, i64::from(byte)))
                    .collect();
                Ok(make_snapshot_iterator(vm, context, this, elements))
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
                let text = String::from_utf8_lossy(&context.value(this).bytes).into_owned();
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
                let truthy = !context.value(this).bytes.is_empty();
                Ok(vm.get_boolean(context, truthy))
            }),
        ),
    );
}
