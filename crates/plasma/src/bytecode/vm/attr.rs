//! Name resolution and assignment handlers, and the attribute lookup
//! algorithm.

use crate::{
    context::Context,
    error::RunResult,
    machine::VirtualMachine,
    names,
    value::{ValueId, ValueKind},
};

impl VirtualMachine {
    /// Looks a name up at one level: the local attribute table first, then
    /// the on-demand registry, caching any materialized result.
    fn materialize_local(&mut self, c: &mut Context, value: ValueId, name: &str) -> RunResult<Option<ValueId>> {
        if let Some(hit) = c.get_symbol_on(value, name) {
            return Ok(Some(hit));
        }
        let loader = c.value(value).on_demand.get(name).cloned();
        if let Some(loader) = loader {
            let materialized = loader(self, c, value)?;
            c.set_symbol_on(value, name, materialized);
            return Ok(Some(materialized));
        }
        Ok(None)
    }

    /// The attribute lookup order: the value itself, then a left-to-right
    /// depth-first walk of its type chain. Answers `None` when no level
    /// binds the name.
    pub fn find_attribute(&mut self, c: &mut Context, value: ValueId, name: &str) -> RunResult<Option<ValueId>> {
        if let Some(found) = self.materialize_local(c, value, name)? {
            return Ok(Some(found));
        }
        let mut pending: Vec<ValueId> = Vec::new();
        if let Some(type_of) = c.value(value).type_of {
            pending.push(type_of);
        }
        while let Some(level) = pending.pop() {
            if let Some(found) = self.materialize_local(c, level, name)? {
                return Ok(Some(found));
            }
            // Parents push reversed so the leftmost base pops first.
            for &parent in c.value(level).parents.iter().rev() {
                pending.push(parent);
            }
        }
        Ok(None)
    }

    /// Like [`VirtualMachine::find_attribute`] but failing lookups raise
    /// `ObjectWithNameNotFoundError`.
    pub fn get_attribute(&mut self, c: &mut Context, value: ValueId, name: &str) -> RunResult<ValueId> {
        match self.find_attribute(c, value, name)? {
            Some(found) => Ok(found),
            None => Err(self.new_object_with_name_not_found_error(c, Some(value), name)),
        }
    }

    /// Renders a value through its `ToString` method.
    pub fn stringify(&mut self, c: &mut Context, value: ValueId) -> RunResult<String> {
        if c.value(value).kind == ValueKind::String {
            return Ok(c.value(value).string.clone());
        }
        let to_string = self.get_attribute(c, value, names::TO_STRING)?;
        let result = self.call_function(c, to_string, &[])?;
        if c.value(result).kind != ValueKind::String {
            let received = c.value(result).type_name.clone();
            return Err(self.new_invalid_type_error(c, &received, &[names::STRING_NAME]));
        }
        Ok(c.value(result).string.clone())
    }

    pub(super) fn get_identifier_op(&mut self, c: &mut Context, name: &str) -> RunResult<()> {
        let scope = c.peek_symbol_table();
        match c.get_any(scope, name) {
            Some(found) => {
                c.last_object = Some(found);
                Ok(())
            }
            None => Err(self.new_object_with_name_not_found_error(c, None, name)),
        }
    }

    pub(super) fn select_name_from_object_op(&mut self, c: &mut Context, name: &str) -> RunResult<()> {
        self.guarded(c, |vm, c| {
            let object = c.pop_value();
            c.protect_value(object);
            let result = vm.get_attribute(c, object, name)?;
            c.last_object = Some(result);
            Ok(())
        })
    }

    pub(super) fn index_op(&mut self, c: &mut Context) -> RunResult<()> {
        self.guarded(c, |vm, c| {
            let index = c.pop_value();
            let source = c.pop_value();
            c.protect_value(index);
            c.protect_value(source);
            let method = vm.get_attribute(c, source, names::INDEX)?;
            c.protect_value(method);
            let result = vm.call_function(c, method, &[index])?;
            c.last_object = Some(result);
            Ok(())
        })
    }

    pub(super) fn assign_identifier_op(&mut self, c: &mut Context, name: &str) {
        let value = c.pop_value();
        let scope = c.peek_symbol_table();
        c.set_symbol(scope, name, value);
    }

    pub(super) fn assign_selector_op(&mut self, c: &mut Context, name: &str) -> RunResult<()> {
        self.guarded(c, |_vm, c| {
            let receiver = c.pop_value();
            c.protect_value(receiver);
            let value = c.pop_value();
            c.set_symbol_on(receiver, name, value);
            Ok(())
        })
    }

    pub(super) fn assign_index_op(&mut self, c: &mut Context) -> RunResult<()> {
        self.guarded(c, |vm, c| {
            let index = c.pop_value();
            let receiver = c.pop_value();
            let element = c.pop_value();
            c.protect_value(index);
            c.protect_value(receiver);
            c.protect_value(element);
            let method = vm.get_attribute(c, receiver, names::ASSIGN)?;
            c.protect_value(method);
            vm.call_function(c, method, &[index, element])?;
            Ok(())
        })
    }
}
