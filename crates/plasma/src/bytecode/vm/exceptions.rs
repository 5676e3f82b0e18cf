//! `Raise` and try/except/else/finally handling.

use crate::{
    bytecode::code::{Code, TryInformation},
    context::{Context, LastState},
    error::{ErrorKind, RaisedError, RunResult},
    machine::VirtualMachine,
};

impl VirtualMachine {
    /// `Raise`: pop a value, require it implements `RuntimeError`, and
    /// propagate it as the executor's error result.
    pub(super) fn raise_op(&mut self, c: &mut Context) -> RaisedError {
        let state = c.protected_values_state();
        let raised = c.pop_value();
        c.protect_value(raised);
        let runtime_error = self.force_any_from_master(c, ErrorKind::RuntimeError.type_name());
        let result = if c.implements(raised, runtime_error) {
            let type_name = c.value(raised).type_name.clone();
            let message = c.value(raised).string.clone();
            self.tracer.on_raise(&type_name, &message);
            RaisedError::new(raised)
        } else {
            let received = c.value(raised).type_name.clone();
            self.new_invalid_type_error(c, &received, &[ErrorKind::RuntimeError.type_name()])
        };
        c.restore_protected_state(state);
        result
    }

    /// Try block: run the body; on error walk the except clauses in order,
    /// matching when the error's type implements any listed target (empty
    /// targets match everything). `else_body` runs only when the body did
    /// not raise. `finally` runs after the body-plus-else path and after a
    /// matched except; an unmatched error escapes without it.
    ///
    /// A `Return` ends the block immediately with the pending result, and
    /// `Break`/`Continue`/`Redo` survive the finally stream so the
    /// dispatcher can hand them to the enclosing loop.
    pub(super) fn try_block_op(&mut self, c: &mut Context, info: &TryInformation) -> RunResult<()> {
        self.guarded(c, |vm, c| {
            let body_result = {
                let mut body = Code::new(&info.body);
                vm.run(c, &mut body)
            };
            let error = match body_result {
                Ok(result) => {
                    if c.last_state == LastState::Return {
                        c.last_object = Some(result);
                        return Ok(());
                    }
                    let pending = c.last_state;
                    if pending == LastState::None && !info.else_body.is_empty() {
                        let else_result = {
                            let mut else_code = Code::new(&info.else_body);
                            vm.run(c, &mut else_code)?
                        };
                        if c.last_state == LastState::Return {
                            c.last_object = Some(else_result);
                            return Ok(());
                        }
                        let pending = c.last_state;
                        return vm.finish_try_path(c, info, pending);
                    }
                    return vm.finish_try_path(c, info, pending);
                }
                Err(raised) => raised,
            };

            let error_value = error.value();
            c.protect_value(error_value);
            let runtime_error = vm.force_any_from_master(c, ErrorKind::RuntimeError.type_name());
            let error_type = vm.get_type(c, error_value);

            for except in &info.except_blocks {
                let targets_value = {
                    let mut targets = Code::new(&except.targets);
                    vm.run(c, &mut targets)?
                };
                c.protect_value(targets_value);
                // Target streams end with Return; clear the flag before the
                // except body can observe it.
                c.last_state = LastState::None;

                let targets = c.value(targets_value).content.clone();
                let mut matched = targets.is_empty();
                for target in targets {
                    if !c.implements(target, runtime_error) {
                        let received = c.value(target).type_name.clone();
                        return Err(vm.new_invalid_type_error(c, &received, &[ErrorKind::RuntimeError.type_name()]));
                    }
                    if c.implements(error_type, target) {
                        matched = true;
                        break;
                    }
                }
                if !matched {
                    continue;
                }

                let scope = c.peek_symbol_table();
                c.set_symbol(scope, &except.capture_name, error_value);
                let except_result = {
                    let mut except_code = Code::new(&except.body);
                    vm.run(c, &mut except_code)?
                };
                if c.last_state == LastState::Return {
                    c.last_object = Some(except_result);
                    return Ok(());
                }
                let pending = c.last_state;
                return vm.finish_try_path(c, info, pending);
            }

            // No clause matched: the error escapes and finally is skipped.
            Err(error)
        })
    }

    /// Runs the finally stream and re-installs a pending control transfer
    /// unless the finally itself returned.
    fn finish_try_path(&mut self, c: &mut Context, info: &TryInformation, pending: LastState) -> RunResult<()> {
        if !info.finally.is_empty() {
            let finally_result = {
                let mut finally = Code::new(&info.finally);
                self.run(c, &mut finally)?
            };
            if c.last_state == LastState::Return {
                c.last_object = Some(finally_result);
                return Ok(());
            }
        }
        if c.last_state == LastState::None {
            c.last_state = pending;
        }
        Ok(())
    }
}
