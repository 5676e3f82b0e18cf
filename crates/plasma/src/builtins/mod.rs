//! On-demand method shapes for the intrinsic kinds, and the master-table
//! seeding.
//!
//! Shapes only register materializers; the method objects themselves are
//! built the first time an attribute lookup asks for them, then cached in
//! the owning value's attribute table.

pub(crate) mod containers;
pub(crate) mod errors;
pub(crate) mod iterator;
pub(crate) mod numeric;
pub(crate) mod text;

use std::rc::Rc;

use crate::{
    context::Context,
    error::ErrorKind,
    machine::VirtualMachine,
    names,
    value::{BuiltinFn, BuiltinInitializer, Callable, Constructor, OnDemandFn, ValueId},
};

/// Registers a materializer on a value.
pub(crate) fn register(context: &mut Context, value: ValueId, name: &str, loader: OnDemandFn) {
    context.value_mut(value).set_on_demand(name, loader);
}

/// Materializer producing a bound built-in method on first lookup.
pub(crate) fn builtin_method(arity: usize, body: BuiltinFn) -> OnDemandFn {
    Rc::new(move |vm, context, owner| {
        Ok(vm.new_function(
            context,
            false,
            Some(owner),
            Callable::Builtin {
                arity,
                body: Rc::clone(&body),
            },
        ))
    })
}

/// Baseline shape shared by every value: display, equality, truthiness,
/// and the boolean connectives.
pub(crate) fn object_shape(context: &mut Context, value: ValueId) {
    register(
        context,
        value,
        names::TO_STRING,
        builtin_method(
            0,
            Rc::new(|vm, context, this, _args| {
                let text = format!("{}@{}", context.value(this).type_name, context.value(this).id);
                Ok(vm.new_string(context, false, &text))
            }),
        ),
    );
    register(
        context,
        value,
        names::EQUALS,
        builtin_method(
            1,
            Rc::new(|vm, context, this, args| {
                let equal = context.values_equal(this, args[0]);
                Ok(vm.get_boolean(context, equal))
            }),
        ),
    );
    register(
        context,
        value,
        names::NOT_EQUALS,
        builtin_method(
            1,
            Rc::new(|vm, context, this, args| {
                let equal = context.values_equal(this, args[0]);
                Ok(vm.get_boolean(context, !equal))
            }),
        ),
    );
    register(
        context,
        value,
        names::BOOL,
        builtin_method(0, Rc::new(|vm, context, _this, _args| Ok(vm.get_true(context)))),
    );
    register(
        context,
        value,
        names::NEGATE,
        builtin_method(
            0,
            Rc::new(|vm, context, this, _args| {
                let truthy = vm.interpret_as_boolean(context, this)?;
                Ok(vm.get_boolean(context, !truthy))
            }),
        ),
    );
    for (name, right_name) in [
        (names::AND, names::RIGHT_AND),
        (names::OR, names::RIGHT_OR),
        (names::XOR, names::RIGHT_XOR),
    ] {
        register(context, value, name, connective_method(name));
        register(context, value, right_name, connective_method(name));
    }
}

/// Boolean connectives are symmetric, so the left and right spellings
/// share one body selected by the canonical name.
fn connective_method(name: &'static str) -> OnDemandFn {
    builtin_method(
        1,
        Rc::new(move |vm, context, this, args| {
            let left = vm.interpret_as_boolean(context, this)?;
            let right = vm.interpret_as_boolean(context, args[0])?;
            let result = match name {
                names::AND => left && right,
                names::OR => left || right,
                _ => left != right,
            };
            Ok(vm.get_boolean(context, result))
        }),
    )
}

pub(crate) fn boolean_shape(context: &mut Context, value: ValueId) {
    register(
        context,
        value,
        names::TO_STRING,
        builtin_method(
            0,
            Rc::new(|vm, context, this, _args| {
                let text = if context.value(this).boolean { names::TRUE } else { names::FALSE };
                Ok(vm.new_string(context, false, text))
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
                let boolean = context.value(this).boolean;
                Ok(vm.get_boolean(context, boolean))
            }),
        ),
    );
}

pub(crate) fn none_shape(context: &mut Context, value: ValueId) {
    register(
        context,
        value,
        names::TO_STRING,
        builtin_method(0, Rc::new(|vm, context, _this, _args| Ok(vm.new_string(context, false, names::NONE)))),
    );
    register(
        context,
        value,
        names::BOOL,
        builtin_method(0, Rc::new(|vm, context, _this, _args| Ok(vm.get_false(context)))),
    );
}

pub(crate) fn type_shape(context: &mut Context, value: ValueId) {
    register(
        context,
        value,
        names::TO_STRING,
        builtin_method(
            0,
            Rc::new(|vm, context, this, _args| {
                let name = context.value(this).string.clone();
                Ok(vm.new_string(context, false, &name))
            }),
        ),
    );
}

/// Constructor for types whose instances need no extra method shape.
pub(crate) fn no_extra_shape(_context: &mut Context, _value: ValueId) {}

/// Seeds the master symbol table: the `Type`/`Object` anchors, the error
/// types, the primitive type values, and the `None`/`True`/`False`
/// singletons. All of them are pinned built-ins.
pub(crate) fn initialize_master(vm: &mut VirtualMachine, context: &mut Context) {
    let master = context.master();

    let type_anchor = vm.new_type(context, true, names::TYPE_NAME, vec![], Constructor::Builtin(no_extra_shape));
    context.set_symbol(master, names::TYPE_NAME, type_anchor);
    let object_type = vm.new_type(context, true, names::OBJECT_NAME, vec![], Constructor::Builtin(no_extra_shape));
    context.set_symbol(master, names::OBJECT_NAME, object_type);

    let runtime_error = vm.new_type(
        context,
        true,
        ErrorKind::RuntimeError.type_name(),
        vec![],
        Constructor::Builtin(errors::runtime_error_shape),
    );
    context.set_symbol(master, ErrorKind::RuntimeError.type_name(), runtime_error);
    for kind in [
        ErrorKind::ObjectWithNameNotFound,
        ErrorKind::InvalidType,
        ErrorKind::InvalidNumberOfArguments,
        ErrorKind::BuiltInSymbolProtection,
    ] {
        let error_type = vm.new_type(
            context,
            true,
            kind.type_name(),
            vec![runtime_error],
            Constructor::Builtin(errors::runtime_error_shape),
        );
        context.set_symbol(master, kind.type_name(), error_type);
    }

    let primitives: [(&str, BuiltinInitializer); 12] = [
        (names::INTEGER_NAME, numeric::integer_shape),
        (names::FLOAT_NAME, numeric::float_shape),
        (names::STRING_NAME, text::string_shape),
        (names::BYTES_NAME, text::bytes_shape),
        (names::BOOL_NAME, boolean_shape),
        (names::NONE_TYPE_NAME, none_shape),
        (names::TUPLE_NAME, containers::tuple_shape),
        (names::ARRAY_NAME, containers::array_shape),
        (names::HASH_TABLE_NAME, containers::hash_shape),
        (names::ITERATOR_NAME, iterator::iterator_shape),
        (names::FUNCTION_NAME, no_extra_shape),
        (names::MODULE_NAME, no_extra_shape),
    ];
    for (name, shape) in primitives {
        let primitive = vm.new_type(context, true, name, vec![], Constructor::Builtin(shape));
        context.set_symbol(master, name, primitive);
    }

    let none = vm.new_none(context, true);
    context.set_symbol(master, names::NONE, none);
    let true_value = vm.new_bool(context, true, true);
    context.set_symbol(master, names::TRUE, true_value);
    let false_value = vm.new_bool(context, true, false);
    context.set_symbol(master, names::FALSE, false_value);
}
