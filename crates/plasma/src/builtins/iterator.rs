//! The default iterator shape: a cursor over a snapshot of elements.
//!
//! `Iter` on a sequence builds one of these; the `integer` payload is the
//! cursor and `content` holds the snapshot, so mutation of the source
//! during iteration is not observed. Generators overwrite `HasNext`/`Next`
//! with their own bound functions, which shadow this shape because cached
//! symbols win over on-demand entries.

use std::rc::Rc;

use crate::{
    builtins::{builtin_method, register},
    context::Context,
    machine::VirtualMachine,
    names,
    value::ValueId,
};

pub(crate) fn iterator_shape(context: &mut Context, value: ValueId) {
    register(
        context,
        value,
        names::HAS_NEXT,
        builtin_method(
            0,
            Rc::new(|vm, context, this, _args| {
                let object = context.value(this);
                let more = (object.integer as usize) < object.content.len();
                Ok(vm.get_boolean(context, more))
            }),
        ),
    );
    register(
        context,
        value,
        names::NEXT,
        builtin_method(
            0,
            Rc::new(|vm, context, this, _args| {
                let object = context.value(this);
                let cursor = object.integer as usize;
                if cursor >= object.content.len() {
                    return Err(vm.new_runtime_error(context, "iterator exhausted"));
                }
                let element = object.content[cursor];
                context.value_mut(this).integer += 1;
                Ok(element)
            }),
        ),
    );
    register(
        context,
        value,
        names::ITER,
        builtin_method(0, Rc::new(|_vm, _context, this, _args| Ok(this))),
    );
}

/// Builds an iterator over an eager snapshot of elements, keeping a link
/// to the source value for reachability.
pub(crate) fn make_snapshot_iterator(
    vm: &mut VirtualMachine,
    context: &mut Context,
    source: ValueId,
    elements: Vec<ValueId>,
) -> ValueId {
    let iterator = vm.new_iterator(context, false);
    let object = context.value_mut(iterator);
    object.source = Some(source);
    object.content = elements;
    iterator
}
