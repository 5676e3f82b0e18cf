//! Call machinery: function invocation, object construction, and the
//! class/function/module definition handlers.

use smallvec::SmallVec;

use crate::{
    bytecode::code::{ClassInformation, Code, FunctionInformation},
    context::{Context, LastState},
    error::RunResult,
    machine::VirtualMachine,
    names,
    value::{Callable, Constructor, ValueId, ValueKind},
};

impl VirtualMachine {
    /// Invokes a callable with the given arguments.
    ///
    /// Type-values construct: calling a type builds an instance and runs
    /// `Initialize` with the arguments, swallowing its absence. Function
    /// values dispatch on their callable descriptor; a plasma-callable
    /// executes its body in a fresh scope whose parent is
    /// `self.symbols.parent`, with the arguments pushed in reverse for the
    /// body's `LoadFunctionArguments` prologue.
    pub fn call_function(&mut self, c: &mut Context, function: ValueId, arguments: &[ValueId]) -> RunResult<ValueId> {
        self.guarded(c, |vm, c| {
            c.protect_value(function);
            for &argument in arguments {
                c.protect_value(argument);
            }
            vm.tracer.on_call(arguments.len());

            if c.value(function).kind == ValueKind::Type {
                let instance = vm.construct_object(c, function)?;
                c.protect_value(instance);
                vm.force_initialization(c, instance, arguments);
                return Ok(instance);
            }

            let Some(callable) = c.value(function).callable.clone() else {
                let received = c.value(function).type_name.clone();
                return Err(vm.new_invalid_type_error(c, &received, &[names::FUNCTION_NAME]));
            };
            if arguments.len() != callable.arity() {
                return Err(vm.new_invalid_number_of_arguments_error(c, callable.arity(), arguments.len()));
            }
            let receiver = c.value(function).self_value.unwrap_or(function);

            match callable {
                Callable::Builtin { body, .. } => body(vm, c, receiver, arguments),
                Callable::Bytecode { code, .. } => {
                    let parent = c.table(c.value(receiver).symbols()).parent();
                    let scope = c.allocate_symbol_table(parent);
                    c.push_symbol_table(scope);
                    for &argument in arguments.iter().rev() {
                        c.push_value(argument);
                    }
                    let mut body = Code::new(&code);
                    let result = vm.run(c, &mut body);
                    c.pop_symbol_table();
                    // The callee's Return is consumed here; the caller's
                    // enclosing loops must not observe a stale flag.
                    c.last_state = LastState::None;
                    result
                }
            }
        })
    }

    /// Builds an instance of a type: flattens the ancestor closure onto the
    /// instance, then runs every constructor in the chain against it,
    /// most-distant base first so derived definitions override.
    pub fn construct_object(&mut self, c: &mut Context, type_value: ValueId) -> RunResult<ValueId> {
        self.guarded(c, |vm, c| {
            let ancestors = c.ancestor_closure(type_value);
            let type_name = c.value(type_value).string.clone();
            let instance = vm.new_object(c, false, &type_name, Some(type_value));
            c.protect_value(instance);
            let mut parents = Vec::with_capacity(ancestors.len() + 1);
            parents.push(type_value);
            parents.extend_from_slice(&ancestors);
            c.value_mut(instance).parents = parents;

            let mut construction_order: Vec<ValueId> = ancestors.into_iter().rev().collect();
            construction_order.push(type_value);
            for current in construction_order {
                let constructor = c
                    .value(current)
                    .constructor
                    .clone()
                    .expect("type values carry a constructor");
                match constructor {
                    Constructor::Builtin(initialize) => initialize(c, instance),
                    Constructor::Bytecode(body) => {
                        let scope = c.value(instance).symbols();
                        c.push_symbol_table(scope);
                        c.push_value(instance);
                        let mut constructor_code = Code::new(&body);
                        let result = vm.run(c, &mut constructor_code);
                        let _ = c.pop_value();
                        c.pop_symbol_table();
                        result?;
                        c.last_state = LastState::None;
                    }
                }
            }
            Ok(instance)
        })
    }

    pub(super) fn method_invocation_op(&mut self, c: &mut Context, count: usize) -> RunResult<()> {
        self.guarded(c, |vm, c| {
            let function = c.pop_value();
            c.protect_value(function);
            let mut arguments: SmallVec<[ValueId; 8]> = SmallVec::with_capacity(count);
            for _ in 0..count {
                let argument = c.pop_value();
                c.protect_value(argument);
                arguments.push(argument);
            }
            let result = vm.call_function(c, function, &arguments)?;
            c.last_object = Some(result);
            Ok(())
        })
    }

    pub(super) fn new_class_op(&mut self, c: &mut Context, code: &mut Code, info: &ClassInformation) -> RunResult<()> {
        let body = code.next_n(info.body_length);
        self.guarded(c, |vm, c| {
            let mut bases = Vec::with_capacity(info.n_bases);
            for _ in 0..info.n_bases {
                let base = c.pop_value();
                c.protect_value(base);
                bases.push(base);
            }
            let class = vm.new_type(c, false, &info.name, bases, Constructor::Bytecode(body.into()));
            let scope = c.peek_symbol_table();
            c.set_symbol(scope, &info.name, class);
            Ok(())
        })
    }

    pub(super) fn new_function_op(&mut self, c: &mut Context, code: &mut Code, info: &FunctionInformation) -> RunResult<()> {
        let body = code.next_n(info.body_length);
        let function = self.new_function(
            c,
            false,
            None,
            Callable::Bytecode {
                arity: info.arity,
                code: body.into(),
            },
        );
        let scope = c.peek_symbol_table();
        c.set_symbol(scope, &info.name, function);
        Ok(())
    }

    /// Like `NewFunction`, but the value on top of the stack (not popped)
    /// receives the binding and becomes the callable's receiver.
    pub(super) fn new_class_function_op(
        &mut self,
        c: &mut Context,
        code: &mut Code,
        info: &FunctionInformation,
    ) -> RunResult<()> {
        let body = code.next_n(info.body_length);
        self.guarded(c, |vm, c| {
            let owner = c.peek_value();
            c.protect_value(owner);
            let function = vm.new_function(
                c,
                false,
                Some(owner),
                Callable::Bytecode {
                    arity: info.arity,
                    code: body.into(),
                },
            );
            c.set_symbol_on(owner, &info.name, function);
            Ok(())
        })
    }

    pub(super) fn new_lambda_function_op(
        &mut self,
        c: &mut Context,
        code: &mut Code,
        info: &FunctionInformation,
    ) -> RunResult<()> {
        let body = code.next_n(info.body_length);
        let function = self.new_function(
            c,
            false,
            None,
            Callable::Bytecode {
                arity: info.arity,
                code: body.into(),
            },
        );
        c.last_object = Some(function);
        Ok(())
    }

    pub(super) fn load_function_arguments_op(&mut self, c: &mut Context, arguments: &[String]) {
        let scope = c.peek_symbol_table();
        for name in arguments {
            let value = c.pop_value();
            c.set_symbol(scope, name, value);
        }
    }

    /// Runs the module body in a fresh value whose symbol table becomes the
    /// module's attribute table, then binds the module in the outer scope.
    pub(super) fn new_module_op(&mut self, c: &mut Context, code: &mut Code, info: &ClassInformation) -> RunResult<()> {
        let body = code.next_n(info.body_length);
        self.guarded(c, |vm, c| {
            let module = vm.new_module(c, false, &info.name);
            c.protect_value(module);
            let scope = c.value(module).symbols();
            c.push_symbol_table(scope);
            let mut module_code = Code::new(body);
            let result = vm.run(c, &mut module_code);
            c.pop_symbol_table();
            result?;
            c.last_state = LastState::None;
            let outer = c.peek_symbol_table();
            c.set_symbol(outer, &info.name, module);
            Ok(())
        })
    }
}
