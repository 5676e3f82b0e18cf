//! Execution tracing hooks for the instruction executor.
//!
//! The executor reports interesting events (instruction dispatch, calls,
//! raised errors, reclamation sweeps) through a [`VmTracer`]. The default
//! [`NoopTracer`] ignores everything; [`RecordingTracer`] collects a full
//! event log behind a shared handle so hosts can inspect a run afterwards.

use std::{cell::RefCell, rc::Rc};

use crate::bytecode::OpCode;

/// A single event observed during execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEvent {
    /// An instruction was dispatched.
    Instruction {
        /// Opcode about to be executed.
        op_code: OpCode,
        /// Number of values on the operand stack at dispatch time.
        stack_depth: usize,
    },
    /// A callable was invoked through the call machinery.
    Call {
        /// Number of arguments passed to the callable.
        argument_count: usize,
    },
    /// An error value was constructed or re-raised.
    Raise {
        /// Display name of the error's type.
        type_name: String,
        /// The error's message payload.
        message: String,
    },
    /// A reclamation sweep ran.
    Sweep {
        /// Values returned to the free stack.
        reclaimed_values: usize,
        /// Symbol tables returned to the free stack.
        reclaimed_tables: usize,
    },
}

/// Hook points reported by the executor.
///
/// Every method has a default no-op body, so implementations only override
/// the hooks they care about and [`NoopTracer`] costs nothing beyond a
/// virtual call the branch predictor learns immediately.
pub trait VmTracer: std::fmt::Debug {
    /// Called before each instruction dispatch. This is the hottest hook;
    /// implementations should stay lightweight.
    #[inline]
    fn on_instruction(&mut self, _op_code: OpCode, _stack_depth: usize) {}

    /// Called when the call machinery invokes a callable.
    #[inline]
    fn on_call(&mut self, _argument_count: usize) {}

    /// Called when an error value is constructed or raised.
    #[inline]
    fn on_raise(&mut self, _type_name: &str, _message: &str) {}

    /// Called after a reclamation sweep with the number of freed slots.
    #[inline]
    fn on_sweep(&mut self, _reclaimed_values: usize, _reclaimed_tables: usize) {}
}

/// A tracer that does nothing; the production default.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracer;

impl VmTracer for NoopTracer {}

/// Records every event into a shared buffer.
///
/// The machine owns the tracer, so the event buffer sits behind an
/// `Rc<RefCell<_>>` handle: clone the handle via [`RecordingTracer::events`]
/// before handing the tracer over, then read the log after the run.
#[derive(Debug, Default)]
pub struct RecordingTracer {
    events: Rc<RefCell<Vec<TraceEvent>>>,
}

impl RecordingTracer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle to the event log.
    #[must_use]
    pub fn events(&self) -> Rc<RefCell<Vec<TraceEvent>>> {
        Rc::clone(&self.events)
    }
}

impl VmTracer for RecordingTracer {
    fn on_instruction(&mut self, op_code: OpCode, stack_depth: usize) {
        self.events.borrow_mut().push(TraceEvent::Instruction { op_code, stack_depth });
    }

    fn on_call(&mut self, argument_count: usize) {
        self.events.borrow_mut().push(TraceEvent::Call { argument_count });
    }

    fn on_raise(&mut self, type_name: &str, message: &str) {
        self.events.borrow_mut().push(TraceEvent::Raise {
            type_name: type_name.to_owned(),
            message: message.to_owned(),
        });
    }

    fn on_sweep(&mut self, reclaimed_values: usize, reclaimed_tables: usize) {
        self.events.borrow_mut().push(TraceEvent::Sweep {
            reclaimed_values,
            reclaimed_tables,
        });
    }
}
