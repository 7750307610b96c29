//! Statement and control-flow lowering.

use super::lower_expr::opens_states;
use super::{CopyBack, Lowering, TaskArray};
use crate::error::TransformError;
use crate::naming::{forwarded_parameter_in, forwarded_return, invocation_finished, invocation_started, return_value};
use crate::parallel::{recognize_fan_out, FanOut};
use foundry_ast as ast;
use foundry_ast::Stmt;
use foundry_ir::{DataType, Expr, Statement, Target};

/// Returns `true` if control can leave a loop with this body: a `return`
/// anywhere, or a `break` outside nested loops.
fn has_exit(block: &[Stmt], nested: bool) -> bool {
    block.iter().any(|stmt| match stmt {
        Stmt::Break => !nested,
        Stmt::Return(_) => true,
        Stmt::If {
            then_branch,
            else_branch,
            ..
        } => {
            has_exit(then_branch, nested)
                || else_branch.as_deref().is_some_and(|b| has_exit(b, nested))
        }
        Stmt::While { body, .. } => has_exit(body, true),
        Stmt::For { body, .. } => has_exit(body, true),
        Stmt::Block(inner) => has_exit(inner, nested),
        _ => false,
    })
}

impl<'p> Lowering<'p> {
    /// Lowers a block. Statements after a `break` or `return` are dead and
    /// skipped.
    pub(super) fn block(&mut self, block: &[Stmt]) -> Result<(), TransformError> {
        for stmt in block {
            if self.terminated {
                break;
            }
            self.stmt(stmt)?;
        }
        Ok(())
    }

    fn stmt(&mut self, stmt: &Stmt) -> Result<(), TransformError> {
        match stmt {
            Stmt::Local { name, init, .. } => {
                let variable = self.local_variable(name)?;
                match (init, variable) {
                    (Some(init), Some((variable, ty))) => {
                        let value = self.value_for(init, &ty)?;
                        self.emit(Statement::assign_variable(variable, value));
                    }
                    (Some(init), None) => self.effect(init)?,
                    (None, _) => {}
                }
                Ok(())
            }
            Stmt::Assign { target, value } => self.assign(target, value),
            Stmt::Expr(expr) => self.effect(expr),
            Stmt::MemoryWrite {
                cell_index, value, ..
            } => self.memory_write(cell_index, value),
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => self.branch(condition, then_branch, else_branch.as_deref()),
            Stmt::While { condition, body } => self.repeat(condition, body, &[]),
            Stmt::For {
                init,
                condition,
                step,
                body,
            } => {
                if let Some(fan_out) = recognize_fan_out(stmt) {
                    return self.fan_out(&fan_out);
                }
                self.block(init)?;
                self.repeat(condition, body, step)
            }
            Stmt::Break => {
                let exit = *self
                    .loop_exits
                    .last()
                    .ok_or_else(|| TransformError::internal("`break` outside a loop"))?;
                self.goto(exit);
                self.terminated = true;
                Ok(())
            }
            Stmt::Return(value) => {
                if let Some(value) = value {
                    match self.interface.return_type.clone() {
                        Some(ty) => {
                            let value = self.value_for(value, &ty)?;
                            let signal = return_value(self.name());
                            self.emit(Statement::assign_signal(signal, value));
                        }
                        None => self.effect(value)?,
                    }
                }
                self.finish();
                Ok(())
            }
            Stmt::Block(inner) => self.block(inner),
            Stmt::WaitAll(tasks) => self.join(tasks),
        }
    }

    /// Evaluates an expression for its side effects only.
    fn effect(&mut self, expr: &ast::Expr) -> Result<(), TransformError> {
        match expr {
            ast::Expr::Call {
                method,
                receiver,
                args,
                is_virtual,
            } => {
                self.call(method, receiver.as_deref(), args, *is_virtual)?;
            }
            ast::Expr::New { type_name, args } => {
                self.new_object(type_name, args)?;
            }
            _ if opens_states(expr) => {
                self.expr(expr)?;
            }
            _ => {}
        }
        Ok(())
    }

    fn assign(&mut self, target: &ast::Expr, value: &ast::Expr) -> Result<(), TransformError> {
        let ty = self.scope.type_of(target)?;
        let holder = self.scope.holder_of(target).unwrap_or_default();
        let Some(data_ty) = self.types.data_type(&ty, &holder, &self.member)? else {
            return self.effect(value);
        };
        let value = self.value_for(value, &data_ty)?;
        let Some(target) = self.target_of(target)? else {
            return Err(self.unsupported("assignment to a location without storage"));
        };
        self.emit(Statement::assign(target, value));
        Ok(())
    }

    /// `if`: the condition selects between a then state and an else state;
    /// both continue in a shared following state.
    fn branch(
        &mut self,
        condition: &ast::Expr,
        then_branch: &[Stmt],
        else_branch: Option<&[Stmt]>,
    ) -> Result<(), TransformError> {
        let condition = self.expr(condition)?;
        let then_state = self.new_state();
        let else_state = else_branch.map(|_| self.new_state());
        let after = self.new_state();
        let to_then = self.component.transition_to(then_state);
        let to_else = self.component.transition_to(else_state.unwrap_or(after));
        self.emit(Statement::if_else(condition, vec![to_then], vec![to_else]));

        self.current = then_state;
        self.terminated = false;
        self.block(then_branch)?;
        if !self.terminated {
            self.goto(after);
        }
        if let (Some(state), Some(block)) = (else_state, else_branch) {
            self.current = state;
            self.terminated = false;
            self.block(block)?;
            if !self.terminated {
                self.goto(after);
            }
        }
        self.current = after;
        self.terminated = false;
        Ok(())
    }

    /// `while` and `for`: a head state tests the condition, the body runs
    /// the step and jumps back to the head.
    fn repeat(
        &mut self,
        condition: &ast::Expr,
        body: &[Stmt],
        step: &[Stmt],
    ) -> Result<(), TransformError> {
        let head = self.advance();
        let test = self.expr(condition)?;
        let body_state = self.new_state();
        let after = self.new_state();
        let enter = self.component.transition_to(body_state);
        let leave = self.component.transition_to(after);
        self.emit(Statement::if_else(test, vec![enter], vec![leave]));

        self.loop_exits.push(after);
        self.current = body_state;
        self.terminated = false;
        self.block(body)?;
        if !self.terminated {
            self.block(step)?;
        }
        if !self.terminated {
            self.goto(head);
        }
        self.loop_exits.pop();
        self.current = after;
        self.terminated = false;

        if condition.as_bool_literal() == Some(true) && !has_exit(body, false) {
            self.warn_endless_loop();
        }
        Ok(())
    }

    /// Starts every replica of a fan-out in the current state.
    fn fan_out(&mut self, fan_out: &FanOut) -> Result<(), TransformError> {
        let degree = fan_out.degree(self.config, &self.member)?;
        let program = self.program;
        let callee = program.interface(&fan_out.callee)?;
        if callee.instances < degree {
            return Err(TransformError::internal(format!(
                "`{}` has {} instances for a fan-out of degree {degree}",
                fan_out.callee, callee.instances
            )));
        }
        let (_, method) = program
            .tree
            .find_method(&fan_out.callee)
            .ok_or_else(|| {
                TransformError::internal(format!("unknown member `{}`", fan_out.callee))
            })?;
        let param = method.params.first().and_then(|p| callee.param(&p.name));
        if callee.params.len() != usize::from(param.is_some()) {
            return Err(self.unsupported(format!(
                "task `{}` takes inputs other than its task argument",
                fan_out.callee
            )));
        }
        let slots = self.invocations.entry(fan_out.callee.clone()).or_insert(0);
        *slots = (*slots).max(degree);

        let caller = self.name().to_string();
        let results = callee.return_type.as_ref().map(|ty| {
            let name = format!("{caller}.{}", fan_out.tasks);
            self.declare_variable(&name, DataType::array(ty.clone(), degree));
            name
        });
        let mut copy_back = Vec::new();
        for index in 0..degree {
            if let Some(param) = param {
                let argument = fan_out.argument_for(index);
                let value = self.value_for(&argument, &param.ty)?;
                self.forward(&fan_out.callee, param, index, value);
                if param.by_reference {
                    if let Some(target) = self.target_of(&argument)? {
                        copy_back.push(CopyBack {
                            index,
                            parameter: param.name.clone(),
                            target,
                        });
                    }
                }
            }
            let started = invocation_started(&caller, &fan_out.callee, index);
            self.declare_signal(&started, DataType::Boolean);
            self.emit(Statement::assign_signal(&started, Expr::bool(true)));
        }

        if !fan_out.declares_counter {
            if let Some((counter, ty)) = self.local_variable(&fan_out.counter)? {
                if let Some((width, signed)) = ty.as_int() {
                    self.emit(Statement::assign_variable(
                        counter,
                        Expr::int(i128::from(degree), width, signed),
                    ));
                }
            }
        }
        self.task_arrays.insert(
            fan_out.tasks.clone(),
            TaskArray {
                callee: fan_out.callee.clone(),
                degree,
                results,
                copy_back,
                joined: false,
            },
        );
        Ok(())
    }

    /// Waits until every replica of a fan-out has finished, then collects
    /// results and copies back arguments.
    fn join(&mut self, tasks: &ast::Expr) -> Result<(), TransformError> {
        let Some(name) = tasks.as_local() else {
            return Err(self.unsupported("waiting on tasks outside a task array"));
        };
        let Some(array) = self.task_arrays.get_mut(name) else {
            return Err(self.unsupported(format!(
                "waiting on task array `{name}` before it is started"
            )));
        };
        if array.joined {
            return Ok(());
        }
        array.joined = true;
        let array = array.clone();

        let caller = self.name().to_string();
        let callee = array.callee.as_str();
        let finished = (0..array.degree)
            .map(|i| Expr::signal(invocation_finished(&caller, callee, i)))
            .collect();
        self.advance();
        let next = self.new_state();

        let mut done = Vec::new();
        for index in 0..array.degree {
            done.push(Statement::assign_signal(
                invocation_started(&caller, callee, index),
                Expr::bool(false),
            ));
            if let Some(results) = &array.results {
                done.push(Statement::assign(
                    Target::Index {
                        base: Box::new(Target::variable(results)),
                        index: Expr::int(i128::from(index), 32, false),
                    },
                    Expr::signal(forwarded_return(&caller, callee, index)),
                ));
            }
        }
        for back in array.copy_back {
            done.push(Statement::assign(
                back.target,
                Expr::signal(forwarded_parameter_in(
                    &caller,
                    callee,
                    &back.parameter,
                    back.index,
                )),
            ));
        }
        done.push(self.component.transition_to(next));
        self.emit(Statement::when(Expr::all(finished), done));
        self.current = next;
        Ok(())
    }
}
