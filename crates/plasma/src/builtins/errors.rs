//! The `RuntimeError` instance shape.
//!
//! Every error value carries a message string, accepts it through
//! `Initialize`, and renders itself as `"<TypeName>: <message>"`.

use std::rc::Rc;

use crate::{
    builtins::{builtin_method, register},
    context::Context,
    names,
    value::{ValueId, ValueKind},
};

pub(crate) fn runtime_error_shape(context: &mut Context, value: ValueId) {
    register(
        context,
        value,
        names::INITIALIZE,
        builtin_method(
            1,
            Rc::new(|vm, context, this, args| {
                if context.value(args[0]).kind != ValueKind::String {
                    let received = context.value(args[0]).type_name.clone();
                    return Err(vm.new_invalid_type_error(context, &received, &[names::STRING_NAME]));
                }
                let message = context.value(args[0]).string.clone();
                context.value_mut(this).string = message;
                Ok(vm.get_none(context))
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
                let type_value = vm.get_type(context, this);
                let type_name = context.value(type_value).string.clone();
                let message = context.value(this).string.clone();
                let text = format!("{type_name}: {message}");
                Ok(vm.new_string(context, false, &text))
            }),
        ),
    );
}
