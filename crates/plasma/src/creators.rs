//! Factories producing properly-initialized values for each intrinsic
//! kind.
//!
//! Every factory sets the kind tag, the owning type name, the payload, and
//! registers the kind's on-demand method shape so method objects
//! materialize only on first access.

use crate::{
    builtins,
    context::Context,
    machine::VirtualMachine,
    names,
    value::{Callable, Constructor, Value, ValueId, ValueKind},
};

impl VirtualMachine {
    /// Base factory: a plain object with a fresh attribute table.
    ///
    /// With a type, the attribute table's parent is the type's scope;
    /// rootless values chain straight to the master table. Every object
    /// binds `Self` to itself.
    pub fn new_object(
        &mut self,
        context: &mut Context,
        built_in: bool,
        type_name: &str,
        type_of: Option<ValueId>,
    ) -> ValueId {
        let parent = match type_of {
            Some(type_value) => Some(context.value(type_value).symbols()),
            None => Some(context.master()),
        };
        let symbols = context.allocate_symbol_table(parent);
        let id = context.allocate_value();
        let identity = self.next_id();
        *context.value_mut(id) = Value {
            id: identity,
            kind: ValueKind::Object,
            type_name: type_name.to_owned(),
            type_of,
            symbols: Some(symbols),
            built_in,
            boolean: true,
            ..Value::default()
        };
        builtins::object_shape(context, id);
        context.set_symbol(symbols, names::SELF, id);
        id
    }

    pub fn new_integer(&mut self, context: &mut Context, built_in: bool, value: i64) -> ValueId {
        let id = self.new_object(context, built_in, names::INTEGER_NAME, None);
        let object = context.value_mut(id);
        object.kind = ValueKind::Integer;
        object.integer = value;
        builtins::numeric::integer_shape(context, id);
        id
    }

    pub fn new_float(&mut self, context: &mut Context, built_in: bool, value: f64) -> ValueId {
        let id = self.new_object(context, built_in, names::FLOAT_NAME, None);
        let object = context.value_mut(id);
        object.kind = ValueKind::Float;
        object.floating = value;
        builtins::numeric::float_shape(context, id);
        id
    }

    pub fn new_string(&mut self, context: &mut Context, built_in: bool, value: &str) -> ValueId {
        let id = self.new_object(context, built_in, names::STRING_NAME, None);
        let object = context.value_mut(id);
        object.kind = ValueKind::String;
        object.string = value.to_owned();
        builtins::text::string_shape(context, id);
        id
    }

    pub fn new_bytes(&mut self, context: &mut Context, built_in: bool, value: Vec<u8>) -> ValueId {
        let id = self.new_object(context, built_in, names::BYTES_NAME, None);
        let object = context.value_mut(id);
        object.kind = ValueKind::Bytes;
        object.bytes = value;
        builtins::text::bytes_shape(context, id);
        id
    }

    pub fn new_bool(&mut self, context: &mut Context, built_in: bool, value: bool) -> ValueId {
        let id = self.new_object(context, built_in, names::BOOL_NAME, None);
        let object = context.value_mut(id);
        object.kind = ValueKind::Boolean;
        object.boolean = value;
        builtins::boolean_shape(context, id);
        id
    }

    pub fn new_none(&mut self, context: &mut Context, built_in: bool) -> ValueId {
        let id = self.new_object(context, built_in, names::NONE_TYPE_NAME, None);
        let object = context.value_mut(id);
        object.kind = ValueKind::None;
        object.boolean = false;
        builtins::none_shape(context, id);
        id
    }

    pub fn new_tuple(&mut self, context: &mut Context, built_in: bool, content: Vec<ValueId>) -> ValueId {
        let id = self.new_object(context, built_in, names::TUPLE_NAME, None);
        let object = context.value_mut(id);
        object.kind = ValueKind::Tuple;
        object.content = content;
        builtins::containers::tuple_shape(context, id);
        id
    }

    pub fn new_array(&mut self, context: &mut Context, built_in: bool, content: Vec<ValueId>) -> ValueId {
        let id = self.new_object(context, built_in, names::ARRAY_NAME, None);
        let object = context.value_mut(id);
        object.kind = ValueKind::Array;
        object.content = content;
        builtins::containers::array_shape(context, id);
        id
    }

    pub fn new_hash_table(&mut self, context: &mut Context, built_in: bool) -> ValueId {
        let id = self.new_object(context, built_in, names::HASH_TABLE_NAME, None);
        context.value_mut(id).kind = ValueKind::HashTable;
        builtins::containers::hash_shape(context, id);
        id
    }

    pub fn new_iterator(&mut self, context: &mut Context, built_in: bool) -> ValueId {
        let id = self.new_object(context, built_in, names::ITERATOR_NAME, None);
        context.value_mut(id).kind = ValueKind::Iterator;
        builtins::iterator::iterator_shape(context, id);
        id
    }

    /// A function value. Without an explicit receiver the function is its
    /// own `self`.
    pub fn new_function(
        &mut self,
        context: &mut Context,
        built_in: bool,
        self_value: Option<ValueId>,
        callable: Callable,
    ) -> ValueId {
        let id = self.new_object(context, built_in, names::FUNCTION_NAME, None);
        let object = context.value_mut(id);
        object.kind = ValueKind::Function;
        object.callable = Some(callable);
        object.self_value = self_value;
        id
    }

    pub fn new_module(&mut self, context: &mut Context, built_in: bool, name: &str) -> ValueId {
        let id = self.new_object(context, built_in, names::MODULE_NAME, None);
        let object = context.value_mut(id);
        object.kind = ValueKind::Module;
        object.string = name.to_owned();
        id
    }

    /// A type value recording its bases in declaration order and the
    /// constructor run against fresh instances.
    pub fn new_type(
        &mut self,
        context: &mut Context,
        built_in: bool,
        name: &str,
        parents: Vec<ValueId>,
        constructor: Constructor,
    ) -> ValueId {
        let id = self.new_object(context, built_in, names::TYPE_NAME, None);
        let object = context.value_mut(id);
        object.kind = ValueKind::Type;
        object.string = name.to_owned();
        object.parents = parents;
        object.constructor = Some(constructor);
        builtins::type_shape(context, id);
        id
    }

    /// The type link of a value.
    ///
    /// Type-values answer the master's `Type` anchor; rootless intrinsics
    /// answer the master type matching their type name.
    pub fn get_type(&mut self, context: &mut Context, value: ValueId) -> ValueId {
        if let Some(type_of) = context.value(value).type_of {
            return type_of;
        }
        if context.value(value).kind == ValueKind::Type {
            return self.force_any_from_master(context, names::TYPE_NAME);
        }
        let type_name = context.value(value).type_name.clone();
        self.force_any_from_master(context, &type_name)
    }
}
