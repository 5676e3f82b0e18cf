//! The engine instance: identity counter, options, tracer, and the host
//! entry points.

use serde::{Deserialize, Serialize};

use crate::{
    builtins,
    bytecode::{Code, Instruction},
    context::Context,
    error::RunResult,
    names,
    tracer::{NoopTracer, VmTracer},
    value::ValueId,
};

/// Paged-arena tuning knobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineOptions {
    /// Capacity of the first page of each arena, and the floor for grown
    /// pages.
    pub initial_page_capacity: usize,
    /// Geometric growth factor applied to the largest page when an arena
    /// runs out of free slots.
    pub page_growth: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            initial_page_capacity: 256,
            page_growth: 2,
        }
    }
}

/// The engine instance.
///
/// One machine can serve several contexts, but each context must stay on
/// the thread that drives it; handlers re-enter the machine freely on the
/// same thread (a built-in invoking `call_function`), which is required
/// and supported.
#[derive(Debug)]
pub struct VirtualMachine {
    next_id: u64,
    options: EngineOptions,
    pub(crate) tracer: Box<dyn VmTracer>,
}

impl VirtualMachine {
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(EngineOptions::default())
    }

    #[must_use]
    pub fn with_options(options: EngineOptions) -> Self {
        Self::with_tracer(options, Box::new(NoopTracer))
    }

    #[must_use]
    pub fn with_tracer(options: EngineOptions, tracer: Box<dyn VmTracer>) -> Self {
        Self {
            next_id: 0,
            options,
            tracer,
        }
    }

    pub(crate) fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Builds a context whose master symbol table is seeded with the
    /// built-in types, the error types, and the `None`/`True`/`False`
    /// singletons.
    pub fn new_context(&mut self) -> Context {
        let mut context = Context::new(&self.options);
        builtins::initialize_master(self, &mut context);
        context
    }

    /// Runs a stream against a context.
    ///
    /// On success the result is whatever `Return` produced, or a freshly
    /// allocated `None` when the stream ran off its end. On failure the
    /// error carries the propagating error value.
    ///
    /// Either way the value is parked in the context's last-object
    /// register, so it stays reachable across a host-triggered sweep until
    /// the next execution.
    pub fn execute(&mut self, context: &mut Context, instructions: &[Instruction]) -> RunResult<ValueId> {
        let mut code = Code::new(instructions);
        let result = self.run(context, &mut code);
        match &result {
            Ok(value) => context.last_object = Some(*value),
            Err(raised) => context.last_object = Some(raised.value()),
        }
        result
    }

    /// Runs `operation` with the protected set snapshotted on entry and
    /// restored on every exit path.
    pub(crate) fn guarded<R>(
        &mut self,
        context: &mut Context,
        operation: impl FnOnce(&mut Self, &mut Context) -> RunResult<R>,
    ) -> RunResult<R> {
        let state = context.protected_values_state();
        let result = operation(self, context);
        context.restore_protected_state(state);
        result
    }

    // ------------------------------------------------------------------
    // Master singletons and force-helpers
    // ------------------------------------------------------------------

    /// The `None` singleton.
    #[must_use]
    pub fn get_none(&self, context: &Context) -> ValueId {
        context
            .get_self(context.master(), names::NONE)
            .expect("master not seeded with None")
    }

    #[must_use]
    pub fn get_true(&self, context: &Context) -> ValueId {
        context
            .get_self(context.master(), names::TRUE)
            .expect("master not seeded with True")
    }

    #[must_use]
    pub fn get_false(&self, context: &Context) -> ValueId {
        context
            .get_self(context.master(), names::FALSE)
            .expect("master not seeded with False")
    }

    pub(crate) fn get_boolean(&self, context: &Context, value: bool) -> ValueId {
        if value { self.get_true(context) } else { self.get_false(context) }
    }

    /// Master lookup that answers `None` instead of failing.
    pub fn force_any_from_master(&mut self, context: &mut Context, symbol: &str) -> ValueId {
        context
            .get_self(context.master(), symbol)
            .unwrap_or_else(|| self.get_none(context))
    }

    /// Attribute lookup that answers `None` instead of failing.
    pub fn force_get_from_source(&mut self, context: &mut Context, symbol: &str, source: ValueId) -> ValueId {
        match self.find_attribute(context, source, symbol) {
            Ok(Some(found)) => found,
            _ => self.get_none(context),
        }
    }

    /// Construction that answers `None` instead of failing.
    pub fn force_construction(&mut self, context: &mut Context, type_value: ValueId) -> ValueId {
        match self.construct_object(context, type_value) {
            Ok(instance) => instance,
            Err(_) => self.get_none(context),
        }
    }

    /// Locates `Initialize` on the object and calls it, swallowing failure
    /// on both steps.
    pub fn force_initialization(&mut self, context: &mut Context, object: ValueId, arguments: &[ValueId]) {
        let Ok(Some(initialize)) = self.find_attribute(context, object, names::INITIALIZE) else {
            return;
        };
        let _ = self.call_function(context, initialize, arguments);
    }
}

impl Default for VirtualMachine {
    fn default() -> Self {
        Self::new()
    }
}
