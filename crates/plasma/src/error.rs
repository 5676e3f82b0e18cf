//! Error model: errors are ordinary runtime values implementing
//! `RuntimeError`, propagated as the `Err` arm of [`RunResult`].

use strum::{Display, IntoStaticStr};

use crate::{builtins, context::Context, machine::VirtualMachine, value::ValueId};

/// An error value travelling up through handlers, call frames, loop
/// bodies, and condition streams until a try block matches it or the
/// outermost execution reports it to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RaisedError(ValueId);

impl RaisedError {
    pub(crate) fn new(value: ValueId) -> Self {
        Self(value)
    }

    /// The propagating error value.
    #[must_use]
    pub fn value(self) -> ValueId {
        self.0
    }
}

/// Result alias used by every handler: success carries a value, failure an
/// error value being propagated.
pub type RunResult<T> = Result<T, RaisedError>;

/// The engine's error kinds. Each names a type-value seeded in the master
/// symbol table; user-defined subclasses of `RuntimeError` join the same
/// taxonomy at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
pub enum ErrorKind {
    RuntimeError,
    #[strum(serialize = "ObjectWithNameNotFoundError")]
    ObjectWithNameNotFound,
    #[strum(serialize = "InvalidTypeError")]
    InvalidType,
    #[strum(serialize = "InvalidNumberOfArgumentsError")]
    InvalidNumberOfArguments,
    #[strum(serialize = "BuiltInSymbolProtectionError")]
    BuiltInSymbolProtection,
}

impl ErrorKind {
    /// The seeded type-value's name in the master table.
    #[must_use]
    pub fn type_name(self) -> &'static str {
        self.into()
    }
}

impl VirtualMachine {
    /// Builds an instance of one of the seeded error types carrying
    /// `message`.
    pub(crate) fn new_error_instance(&mut self, context: &mut Context, kind: ErrorKind, message: String) -> RaisedError {
        let error_type = self.force_any_from_master(context, kind.type_name());
        let instance = self.new_object(context, false, kind.type_name(), Some(error_type));
        let mut parents = vec![error_type];
        parents.extend(context.ancestor_closure(error_type));
        context.value_mut(instance).parents = parents;
        builtins::errors::runtime_error_shape(context, instance);
        context.value_mut(instance).string = message;
        let rendered = context.value(instance).string.clone();
        self.tracer.on_raise(kind.type_name(), &rendered);
        RaisedError(instance)
    }

    /// A plain `RuntimeError` with a message; used where the taxonomy has
    /// no dedicated kind (missing hash keys, indexing past the end,
    /// division by zero).
    pub fn new_runtime_error(&mut self, context: &mut Context, message: impl Into<String>) -> RaisedError {
        self.new_error_instance(context, ErrorKind::RuntimeError, message.into())
    }

    /// Lookup failure, against either a value's attributes or the active
    /// scope.
    pub fn new_object_with_name_not_found_error(
        &mut self,
        context: &mut Context,
        target: Option<ValueId>,
        name: &str,
    ) -> RaisedError {
        let message = match target {
            Some(value) => format!(
                "{} does not have a member named '{name}'",
                context.value(value).type_name
            ),
            None => format!("no symbol named '{name}' in the active scope"),
        };
        self.new_error_instance(context, ErrorKind::ObjectWithNameNotFound, message)
    }

    pub fn new_invalid_type_error(&mut self, context: &mut Context, received: &str, expected: &[&str]) -> RaisedError {
        let message = format!("expected {}, received {received}", expected.join(" or "));
        self.new_error_instance(context, ErrorKind::InvalidType, message)
    }

    pub fn new_invalid_number_of_arguments_error(
        &mut self,
        context: &mut Context,
        expected: usize,
        received: usize,
    ) -> RaisedError {
        let message = format!("expected {expected} arguments, received {received}");
        self.new_error_instance(context, ErrorKind::InvalidNumberOfArguments, message)
    }

    /// Reserved: rebinding a built-in name is not currently rejected, but
    /// the kind is part of the taxonomy and hosts may raise it.
    pub fn new_builtin_symbol_protection_error(&mut self, context: &mut Context, name: &str) -> RaisedError {
        let message = format!("'{name}' is a protected built-in symbol and cannot be rebound");
        self.new_error_instance(context, ErrorKind::BuiltInSymbolProtection, message)
    }
}
