//! Expression lowering, operator scheduling and invocations.

use super::{CopyBack, InterfaceParam, Lowering, ParameterSignal};
use crate::call_graph::{call_target, constructor_of};
use crate::error::TransformError;
use crate::naming::{
    cell_index, data_out, forwarded_parameter_in, forwarded_parameter_out, forwarded_return,
    invocation_finished, invocation_started, read_enable, write_enable, DATA_IN_PORT,
    READS_DONE_PORT, THIS_PARAMETER, WRITES_DONE_PORT,
};
use crate::typing::{find_field, operand_type, storage_of};
use foundry_ast as ast;
use foundry_ast::visit::{walk_expr, Visitor};
use foundry_ast::{IntType, Literal, Member, TypeRef};
use foundry_device::OperatorKind;
use foundry_ir::{
    BinaryOp, DataType, Expr, MultiCycleOperation, Statement, Target, UnaryOp, Value,
};
use foundry_timing::ClockCycles;

/// Returns `true` if lowering `expr` may end the current state for a
/// handshake: invocations, object creation and memory reads.
pub(super) fn opens_states(expr: &ast::Expr) -> bool {
    struct Finder(bool);
    impl Visitor for Finder {
        fn visit_expr(&mut self, expr: &ast::Expr) {
            if matches!(
                expr,
                ast::Expr::Call { .. }
                    | ast::Expr::New { .. }
                    | ast::Expr::MemoryRead { .. }
                    | ast::Expr::StartTask { .. }
            ) {
                self.0 = true;
                return;
            }
            walk_expr(self, expr);
        }
    }
    let mut finder = Finder(false);
    finder.visit_expr(expr);
    finder.0
}

fn int_data_type(ty: IntType) -> DataType {
    DataType::int(ty.bits, ty.signed)
}

fn ir_operator(op: ast::BinaryOp) -> Option<BinaryOp> {
    Some(match op {
        ast::BinaryOp::Add => BinaryOp::Add,
        ast::BinaryOp::Sub => BinaryOp::Sub,
        ast::BinaryOp::Mul => BinaryOp::Mul,
        ast::BinaryOp::Div => BinaryOp::Div,
        ast::BinaryOp::Rem => BinaryOp::Rem,
        ast::BinaryOp::And => BinaryOp::And,
        ast::BinaryOp::Or => BinaryOp::Or,
        ast::BinaryOp::Xor => BinaryOp::Xor,
        ast::BinaryOp::Shl => BinaryOp::ShiftLeft,
        ast::BinaryOp::Shr => BinaryOp::ShiftRight,
        ast::BinaryOp::Eq => BinaryOp::Eq,
        ast::BinaryOp::Ne => BinaryOp::Ne,
        ast::BinaryOp::Lt => BinaryOp::Lt,
        ast::BinaryOp::Le => BinaryOp::Le,
        ast::BinaryOp::Gt => BinaryOp::Gt,
        ast::BinaryOp::Ge => BinaryOp::Ge,
        ast::BinaryOp::LogicAnd | ast::BinaryOp::LogicOr => return None,
    })
}

fn operator_kind(op: BinaryOp) -> OperatorKind {
    match op {
        BinaryOp::Add => OperatorKind::Add,
        BinaryOp::Sub => OperatorKind::Sub,
        BinaryOp::Mul => OperatorKind::Mul,
        BinaryOp::Div => OperatorKind::Div,
        BinaryOp::Rem => OperatorKind::Rem,
        BinaryOp::And => OperatorKind::And,
        BinaryOp::Or => OperatorKind::Or,
        BinaryOp::Xor => OperatorKind::Xor,
        BinaryOp::ShiftLeft => OperatorKind::ShiftLeft,
        BinaryOp::ShiftRight => OperatorKind::ShiftRight,
        BinaryOp::Eq => OperatorKind::Eq,
        BinaryOp::Ne => OperatorKind::Ne,
        BinaryOp::Lt => OperatorKind::Lt,
        BinaryOp::Le => OperatorKind::Le,
        BinaryOp::Gt => OperatorKind::Gt,
        BinaryOp::Ge => OperatorKind::Ge,
    }
}

impl<'p> Lowering<'p> {
    /// The hardware type of an expression's value.
    pub(super) fn value_type(&self, expr: &ast::Expr) -> Result<DataType, TransformError> {
        let ty = self.scope.type_of(expr)?;
        let holder = self.scope.holder_of(expr).unwrap_or_default();
        self.types
            .data_type(&ty, &holder, &self.member)?
            .ok_or_else(|| self.unsupported(format!("value of type `{ty}` used in hardware")))
    }

    /// Lowers an expression whose value is stored as `ty`: array creation
    /// yields the zeroed array and integers are converted.
    pub(super) fn value_for(
        &mut self,
        expr: &ast::Expr,
        ty: &DataType,
    ) -> Result<Expr, TransformError> {
        if let ast::Expr::NewArray { .. } = expr {
            return Ok(Expr::Literal(Value::default_for(ty)));
        }
        if let (Some((value, _)), Some((width, signed))) = (expr.as_int_literal(), ty.as_int()) {
            return Ok(Expr::int(value, width, signed));
        }
        let value = self.expr(expr)?;
        match (self.scope.type_of(expr)?.as_int(), ty.as_int()) {
            (Some(from), Some(_)) => Ok(Expr::convert(value, int_data_type(from), ty.clone())),
            _ => Ok(value),
        }
    }

    /// Lowers an expression to a value readable in the current state.
    pub(super) fn expr(&mut self, expr: &ast::Expr) -> Result<Expr, TransformError> {
        match expr {
            ast::Expr::Literal(Literal::Int { value, ty }) => Ok(Expr::int(*value, ty.bits, ty.signed)),
            ast::Expr::Literal(Literal::Bool(value)) => Ok(Expr::bool(*value)),
            ast::Expr::Literal(Literal::Null) => Err(self.unsupported("null reference")),
            ast::Expr::Local(name) => match self.local_variable(name)? {
                Some((variable, _)) => Ok(Expr::variable(variable)),
                None => Err(self.unsupported(format!("`{name}` used as a value"))),
            },
            ast::Expr::This => match self.this_variable() {
                Some((variable, _)) => Ok(Expr::variable(variable)),
                None => Err(self.unsupported("storage-less `this` used as a value")),
            },
            ast::Expr::Field { target, name, .. } => {
                let base = self.expr(target)?;
                Ok(Expr::field(base, name))
            }
            ast::Expr::StaticField { type_name, name } => {
                Err(self.unsupported(format!("static field `{type_name}.{name}`")))
            }
            ast::Expr::ArrayElement { array, index } => {
                let base = self.expr(array)?;
                let index = self.expr(index)?;
                Ok(Expr::index(base, index))
            }
            ast::Expr::ArrayLength(array) => {
                let holder = self
                    .scope
                    .holder_of(array)
                    .ok_or_else(|| self.unsupported("length of an array without a holder"))?;
                let length = self.program.arrays.require(&holder, &self.member)?;
                Ok(Expr::int(i128::from(length), 32, true))
            }
            ast::Expr::Binary { op, lhs, rhs } => self.binary(*op, lhs, rhs),
            ast::Expr::Unary { op, operand } => self.unary(*op, operand),
            ast::Expr::Cast { ty, operand } => {
                let from = self.scope.type_of(operand)?;
                let value = self.expr(operand)?;
                match (from.as_int(), ty.as_int()) {
                    (Some(from), Some(to)) => Ok(Expr::convert(
                        value,
                        int_data_type(from),
                        int_data_type(to),
                    )),
                    _ if &from == ty => Ok(value),
                    _ => Err(self.unsupported(format!("conversion from `{from}` to `{ty}`"))),
                }
            }
            ast::Expr::Call {
                method,
                receiver,
                args,
                is_virtual,
            } => self
                .call(method, receiver.as_deref(), args, *is_virtual)?
                .ok_or_else(|| self.unsupported(format!("result of `{method}` used as a value"))),
            ast::Expr::New { type_name, args } => self
                .new_object(type_name, args)?
                .ok_or_else(|| self.unsupported(format!("storage-less `{type_name}` used as a value"))),
            ast::Expr::NewArray { .. } => Err(self.unsupported("array creation inside an expression")),
            ast::Expr::MemoryRead { cell_index, .. } => self.memory_read(cell_index),
            ast::Expr::StartTask { method, .. } => Err(self.unsupported(format!(
                "task `{method}` started outside a statically bounded fan-out loop"
            ))),
            ast::Expr::TaskResult(task) => self.task_result(task),
            ast::Expr::Conditional {
                condition,
                then,
                otherwise,
            } => {
                if opens_states(then) || opens_states(otherwise) {
                    return Err(self.unsupported(
                        "conditional expression invoking a member or accessing memory in a branch",
                    ));
                }
                let ty = self.value_type(expr)?;
                let condition = self.expr(condition)?;
                let then = self.value_for(then, &ty)?;
                let otherwise = self.value_for(otherwise, &ty)?;
                let temp = self.temp(ty);
                self.emit(Statement::if_else(
                    condition,
                    vec![Statement::assign_variable(&temp, then)],
                    vec![Statement::assign_variable(&temp, otherwise)],
                ));
                Ok(Expr::variable(temp))
            }
        }
    }

    /// The location an lvalue expression names, or `None` for values
    /// without storage.
    pub(super) fn target_of(&mut self, expr: &ast::Expr) -> Result<Option<Target>, TransformError> {
        Ok(match expr {
            ast::Expr::Local(name) => self.local_variable(name)?.map(|(v, _)| Target::variable(v)),
            ast::Expr::This => self.this_variable().map(|(v, _)| Target::variable(v)),
            ast::Expr::Field { target, name, .. } => self.target_of(target)?.map(|base| {
                Target::Field {
                    base: Box::new(base),
                    name: name.clone(),
                }
            }),
            ast::Expr::ArrayElement { array, index } => match self.target_of(array)? {
                Some(base) => Some(Target::Index {
                    base: Box::new(base),
                    index: self.expr(index)?,
                }),
                None => None,
            },
            _ => None,
        })
    }

    fn binary(
        &mut self,
        op: ast::BinaryOp,
        lhs: &ast::Expr,
        rhs: &ast::Expr,
    ) -> Result<Expr, TransformError> {
        let Some(ir) = ir_operator(op) else {
            if opens_states(rhs) {
                return Err(self.unsupported(format!(
                    "`{op}` invoking a member or accessing memory on its right side"
                )));
            }
            let lhs = self.expr(lhs)?;
            let rhs = self.expr(rhs)?;
            let ir = if op == ast::BinaryOp::LogicAnd {
                BinaryOp::And
            } else {
                BinaryOp::Or
            };
            return Ok(Expr::binary(ir, lhs, rhs, DataType::Boolean));
        };

        let (lhs_ty, rhs_ty) = (self.scope.type_of(lhs)?, self.scope.type_of(rhs)?);
        let (Some(a), Some(b)) = (lhs_ty.as_int(), rhs_ty.as_int()) else {
            if lhs_ty != TypeRef::Bool || rhs_ty != TypeRef::Bool || op.is_shift() {
                return Err(self.unsupported(format!(
                    "operator `{op}` on `{lhs_ty}` and `{rhs_ty}`"
                )));
            }
            let mut left = self.expr(lhs)?;
            if opens_states(rhs) {
                left = self.materialize(left, DataType::Boolean);
            }
            let right = self.expr(rhs)?;
            return Ok(Expr::binary(ir, left, right, DataType::Boolean));
        };

        let operand = if op.is_shift() {
            a
        } else {
            operand_type(lhs, a, rhs, b)
        };
        let operand_ty = int_data_type(operand);
        let right_ty = if op.is_shift() {
            int_data_type(b)
        } else {
            operand_ty.clone()
        };
        let result_ty = if op.is_comparison() {
            DataType::Boolean
        } else {
            operand_ty.clone()
        };

        let mut left = self.expr(lhs)?;
        if opens_states(rhs) {
            left = self.materialize(left, int_data_type(a));
        }
        let left = Expr::convert(left, int_data_type(a), operand_ty.clone());
        let right = self.expr(rhs)?;
        let right = Expr::convert(right, int_data_type(b), right_ty.clone());

        let kind = operator_kind(ir);
        let constant = rhs.as_int_literal().map(|(value, _)| value);
        let cost = self
            .timer
            .cost(kind, operand.bits, operand.signed, constant)?;
        let value = Expr::binary(ir, left, right, result_ty.clone());
        Ok(self.schedule(kind, cost, value, result_ty, &[operand_ty, right_ty]))
    }

    fn unary(&mut self, op: ast::UnaryOp, operand: &ast::Expr) -> Result<Expr, TransformError> {
        if op == ast::UnaryOp::LogicNot {
            return Ok(Expr::invert(self.expr(operand)?));
        }
        let ty = self.scope.type_of(operand)?;
        let Some(int) = ty.as_int() else {
            return Err(self.unsupported(format!("operator `{op}` on `{ty}`")));
        };
        let (kind, ir) = match op {
            ast::UnaryOp::Neg => (OperatorKind::Neg, UnaryOp::Neg),
            _ => (OperatorKind::Not, UnaryOp::Not),
        };
        let data_ty = int_data_type(int);
        let value = self.expr(operand)?;
        let cost = self.timer.cost(kind, int.bits, int.signed, None)?;
        let value = Expr::Unary {
            op: ir,
            operand: Box::new(value),
            ty: data_ty.clone(),
        };
        Ok(self.schedule(kind, cost, value, data_ty.clone(), &[data_ty]))
    }

    /// Places a timed operation in the schedule.
    ///
    /// Single-cycle operations accumulate into the current state until its
    /// clock budget is spent. Multi-cycle operations drive a result signal
    /// and hold for their whole latency.
    fn schedule(
        &mut self,
        kind: OperatorKind,
        cost: ClockCycles,
        mut value: Expr,
        result_ty: DataType,
        operand_types: &[DataType],
    ) -> Expr {
        let result = format!("{}.{}.{}", self.name(), kind.name(), self.operations);
        self.operations += 1;
        self.component
            .multi_cycle_operations
            .push(MultiCycleOperation {
                result: result.clone(),
                cycles: cost.cycles.max(1),
            });

        if cost.is_multi_cycle() {
            return self.hold(result, value, result_ty, cost.cycles);
        }
        let used = self.component.states[self.current].required_clock_cycles;
        if used > 0.0 && used + cost.fraction > 1.0 {
            self.store_operands(&mut value, operand_types);
            self.advance();
        }
        self.component.states[self.current].required_clock_cycles += cost.fraction;
        value
    }

    fn store_operands(&mut self, value: &mut Expr, types: &[DataType]) {
        let operands: Vec<&mut Box<Expr>> = match value {
            Expr::Binary { lhs, rhs, .. } => vec![lhs, rhs],
            Expr::Unary { operand, .. } => vec![operand],
            _ => Vec::new(),
        };
        for (operand, ty) in operands.into_iter().zip(types) {
            let inner = std::mem::replace(operand.as_mut(), Expr::bool(false));
            **operand = self.materialize(inner, ty.clone());
        }
    }

    fn hold(&mut self, result: String, value: Expr, ty: DataType, cycles: u32) -> Expr {
        let counter = format!("{}._Cycles", self.name());
        self.declare_signal(&result, ty.clone());
        self.declare_variable(&counter, DataType::int(32, false));
        self.component.states[self.current].required_clock_cycles = f64::from(cycles);
        self.emit(Statement::assign_signal(&result, value.clone()));
        self.emit(Statement::assign_variable(&counter, Expr::int(0, 32, false)));
        self.advance();
        let next = self.new_state();
        self.emit(Statement::assign_signal(&result, value));
        let proceed = self.component.transition_to(next);
        self.emit(Statement::if_else(
            Expr::equals(
                Expr::variable(&counter),
                Expr::int(i128::from(cycles - 2), 32, false),
            ),
            vec![proceed],
            vec![Statement::assign_variable(
                &counter,
                Expr::binary(
                    BinaryOp::Add,
                    Expr::variable(&counter),
                    Expr::int(1, 32, false),
                    DataType::int(32, false),
                ),
            )],
        ));
        self.current = next;
        Expr::signal(result)
    }

    /// Lowers a call. Returns the callee's result, if it has one.
    pub(super) fn call(
        &mut self,
        method: &str,
        receiver: Option<&ast::Expr>,
        args: &[ast::Expr],
        is_virtual: bool,
    ) -> Result<Option<Expr>, TransformError> {
        let program = self.program;
        let target = call_target(&self.scope, &program.dispatch, method, receiver, is_virtual)?;
        let callee = program.interface(&target)?;
        let this = match callee.param(THIS_PARAMETER) {
            Some(param) => {
                let implicit = ast::Expr::This;
                let receiver = receiver.unwrap_or(&implicit);
                if self.value_type(receiver)? != param.ty {
                    return Err(self.unsupported(format!(
                        "call to `{target}` through a receiver of another type"
                    )));
                }
                let value = self.expr(receiver)?;
                let back = self.target_of(receiver)?;
                Some((value, back))
            }
            None => None,
        };
        self.invoke(&target, this, args)
    }

    /// Starts `callee` over invocation slot 0 and waits for it to finish.
    pub(super) fn invoke(
        &mut self,
        callee: &str,
        this: Option<(Expr, Option<Target>)>,
        args: &[ast::Expr],
    ) -> Result<Option<Expr>, TransformError> {
        const SLOT: u32 = 0;
        let program = self.program;
        let interface = program.interface(callee)?;
        let (_, method) = program
            .tree
            .find_method(callee)
            .ok_or_else(|| TransformError::internal(format!("unknown member `{callee}`")))?;
        let slots = self.invocations.entry(callee.to_string()).or_insert(0);
        *slots = (*slots).max(1);

        let mut forwarded: Vec<(&InterfaceParam, Expr)> = Vec::new();
        let mut copy_back = Vec::new();
        if let (Some((value, back)), Some(param)) = (this, interface.param(THIS_PARAMETER)) {
            let value = if args.iter().any(opens_states) {
                self.materialize(value, param.ty.clone())
            } else {
                value
            };
            forwarded.push((param, value));
            if let Some(target) = back {
                copy_back.push(CopyBack {
                    index: SLOT,
                    parameter: param.name.clone(),
                    target,
                });
            }
        }
        for (position, (arg, decl)) in args.iter().zip(&method.params).enumerate() {
            let Some(param) = interface.param(&decl.name) else {
                continue;
            };
            let mut value = self.value_for(arg, &param.ty)?;
            if args[position + 1..].iter().any(opens_states) {
                value = self.materialize(value, param.ty.clone());
            }
            forwarded.push((param, value));
            if param.by_reference {
                if let Some(target) = self.target_of(arg)? {
                    copy_back.push(CopyBack {
                        index: SLOT,
                        parameter: param.name.clone(),
                        target,
                    });
                }
            }
        }
        for (param, value) in forwarded {
            self.forward(callee, param, SLOT, value);
        }

        let caller = self.name().to_string();
        let started = invocation_started(&caller, callee, SLOT);
        self.declare_signal(&started, DataType::Boolean);
        self.emit(Statement::assign_signal(&started, Expr::bool(true)));
        self.advance();
        let next = self.new_state();

        let mut done = vec![Statement::assign_signal(&started, Expr::bool(false))];
        let result = match &interface.return_type {
            Some(ty) => {
                let temp = self.temp(ty.clone());
                done.push(Statement::assign_variable(
                    &temp,
                    Expr::signal(forwarded_return(&caller, callee, SLOT)),
                ));
                Some(Expr::variable(temp))
            }
            None => None,
        };
        for back in copy_back {
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
        self.emit(Statement::when(
            Expr::signal(invocation_finished(&caller, callee, SLOT)),
            done,
        ));
        self.current = next;
        Ok(result)
    }

    /// Drives one parameter of an invocation slot.
    pub(super) fn forward(&mut self, callee: &str, param: &InterfaceParam, index: u32, value: Expr) {
        let caller = self.name().to_string();
        let out = forwarded_parameter_out(&caller, callee, &param.name, index);
        self.declare_signal(&out, param.ty.clone());
        self.emit(Statement::assign_signal(&out, value));
        self.record_signal(ParameterSignal {
            name: out,
            target_member: callee.to_string(),
            parameter: param.name.clone(),
            index,
            is_own: false,
        });
        if param.by_reference {
            self.record_signal(ParameterSignal {
                name: forwarded_parameter_in(&caller, callee, &param.name, index),
                target_member: callee.to_string(),
                parameter: param.name.clone(),
                index,
                is_own: false,
            });
        }
    }

    /// Creates an object: a zeroed record with constant field initializers
    /// applied, then the constructor if the type declares one.
    pub(super) fn new_object(
        &mut self,
        type_name: &str,
        args: &[ast::Expr],
    ) -> Result<Option<Expr>, TransformError> {
        let program = self.program;
        let tree = &program.tree;
        let constructor = constructor_of(tree, type_name);
        let Some(ty) = self.types.record_type(type_name, &self.member)? else {
            if let Some(constructor) = constructor {
                self.invoke(&constructor, None, args)?;
            }
            return Ok(None);
        };

        let temp = self.temp(ty.clone());
        self.emit(Statement::assign_variable(
            &temp,
            Expr::Literal(Value::default_for(&ty)),
        ));
        for slot in storage_of(tree, type_name) {
            let Some((_, Member::Field(field))) = find_field(tree, &slot.declaring_type, &slot.name)
            else {
                continue;
            };
            let (Some(init), Some(field_ty)) = (&field.initializer, ty.field(&slot.name)) else {
                continue;
            };
            if matches!(init, ast::Expr::NewArray { .. }) {
                continue;
            }
            if !init.is_literal() {
                return Err(self.unsupported(format!(
                    "non-constant initializer of field `{}.{}`",
                    slot.declaring_type, slot.name
                )));
            }
            let value = self.value_for(init, field_ty)?;
            self.emit(Statement::assign(
                Target::Field {
                    base: Box::new(Target::variable(&temp)),
                    name: slot.name.clone(),
                },
                value,
            ));
        }
        if let Some(constructor) = constructor {
            let this = (Expr::variable(&temp), Some(Target::variable(&temp)));
            self.invoke(&constructor, Some(this), args)?;
        }
        Ok(Some(Expr::variable(temp)))
    }

    fn memory_signals(&mut self) -> (String, String, String, String) {
        let component = self.name().to_string();
        let names = (
            cell_index(&component),
            data_out(&component),
            read_enable(&component),
            write_enable(&component),
        );
        self.declare_signal(&names.0, DataType::int(32, false));
        self.declare_signal(&names.1, DataType::int(32, false));
        self.declare_signal(&names.2, DataType::Boolean);
        self.declare_signal(&names.3, DataType::Boolean);
        self.uses_memory = true;
        names
    }

    fn cell_address(&mut self, index: &ast::Expr) -> Result<Expr, TransformError> {
        self.value_for(index, &DataType::int(32, false))
    }

    /// Reads one cell: raise `ReadEnable`, then hold until `ReadsDone`.
    fn memory_read(&mut self, index: &ast::Expr) -> Result<Expr, TransformError> {
        let address = self.cell_address(index)?;
        let (cell, _, read, _) = self.memory_signals();
        self.emit(Statement::assign_signal(&cell, address));
        self.emit(Statement::assign_signal(&read, Expr::bool(true)));
        self.advance();
        let next = self.new_state();
        let temp = self.temp(DataType::int(32, false));
        let proceed = self.component.transition_to(next);
        self.emit(Statement::when(
            Expr::signal(READS_DONE_PORT),
            vec![
                Statement::assign_signal(&read, Expr::bool(false)),
                Statement::assign_variable(&temp, Expr::signal(DATA_IN_PORT)),
                proceed,
            ],
        ));
        self.current = next;
        Ok(Expr::variable(temp))
    }

    /// Writes one cell: raise `WriteEnable`, then hold until `WritesDone`.
    pub(super) fn memory_write(
        &mut self,
        index: &ast::Expr,
        value: &ast::Expr,
    ) -> Result<(), TransformError> {
        let address = self.cell_address(index)?;
        let address = if opens_states(value) {
            self.materialize(address, DataType::int(32, false))
        } else {
            address
        };
        let data = self.value_for(value, &DataType::int(32, false))?;
        let (cell, out, _, write) = self.memory_signals();
        self.emit(Statement::assign_signal(&cell, address));
        self.emit(Statement::assign_signal(&out, data));
        self.emit(Statement::assign_signal(&write, Expr::bool(true)));
        self.advance();
        let next = self.new_state();
        let proceed = self.component.transition_to(next);
        self.emit(Statement::when(
            Expr::signal(WRITES_DONE_PORT),
            vec![Statement::assign_signal(&write, Expr::bool(false)), proceed],
        ));
        self.current = next;
        Ok(())
    }

    fn task_result(&mut self, task: &ast::Expr) -> Result<Expr, TransformError> {
        let ast::Expr::ArrayElement { array, index } = task else {
            return Err(self.unsupported("result of a task outside a task array"));
        };
        let Some(name) = array.as_local() else {
            return Err(self.unsupported("result of a task outside a task array"));
        };
        let Some(tasks) = self.task_arrays.get(name) else {
            return Err(self.unsupported(format!(
                "result of task array `{name}` before it is started"
            )));
        };
        let Some(results) = tasks.results.clone() else {
            return Err(self.unsupported(format!("result of void tasks in `{name}`")));
        };
        let index = self.expr(index)?;
        Ok(Expr::index(Expr::variable(results), index))
    }
}
