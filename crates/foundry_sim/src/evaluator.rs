//! Expression evaluation and statement execution for one process run.
//!
//! A [`Frame`] reads signals from a fixed snapshot and collects signal
//! writes as pending updates; the kernel applies them after the process
//! completes. Variable writes take effect immediately.

use crate::error::SimError;
use foundry_ir::{BinaryOp, DataType, Expr, Statement, Target, UnaryOp, Value};
use std::collections::BTreeMap;

/// One step into an aggregate target.
enum Step {
    Index(usize),
    Field(String),
}

/// Execution context of a single process evaluation.
pub struct Frame<'a> {
    process: &'a str,
    inputs: &'a BTreeMap<String, Value>,
    signals: &'a BTreeMap<String, Value>,
    variables: &'a mut BTreeMap<String, Value>,
    pending: BTreeMap<String, Value>,
}

impl<'a> Frame<'a> {
    /// Creates a frame reading `signals` and `inputs` and owning the
    /// process's variables for the duration of the run.
    pub fn new(
        process: &'a str,
        inputs: &'a BTreeMap<String, Value>,
        signals: &'a BTreeMap<String, Value>,
        variables: &'a mut BTreeMap<String, Value>,
    ) -> Self {
        Self {
            process,
            inputs,
            signals,
            variables,
            pending: BTreeMap::new(),
        }
    }

    /// Consumes the frame, returning the signal updates. The last write to a
    /// signal wins.
    pub fn into_pending(self) -> BTreeMap<String, Value> {
        self.pending
    }

    /// Executes statements in order.
    pub fn exec(&mut self, statements: &[Statement]) -> Result<(), SimError> {
        for statement in statements {
            self.exec_one(statement)?;
        }
        Ok(())
    }

    fn exec_one(&mut self, statement: &Statement) -> Result<(), SimError> {
        match statement {
            Statement::Assign { target, value } => {
                let value = self.eval(value)?;
                self.store(target, value)
            }
            Statement::If {
                condition,
                then_body,
                else_body,
            } => {
                if self.condition(condition)? {
                    self.exec(then_body)
                } else {
                    self.exec(else_body)
                }
            }
            Statement::Case {
                subject,
                arms,
                default,
            } => {
                let subject = self.eval(subject)?;
                match arms.iter().find(|arm| same_value(&arm.choice, &subject)) {
                    Some(arm) => self.exec(&arm.body),
                    None => self.exec(default),
                }
            }
            Statement::Comment(_) => Ok(()),
        }
    }

    fn condition(&self, expr: &Expr) -> Result<bool, SimError> {
        self.eval(expr)?
            .as_bool()
            .ok_or_else(|| SimError::eval("condition is not boolean"))
    }

    /// Evaluates an expression against the frame's snapshot.
    pub fn eval(&self, expr: &Expr) -> Result<Value, SimError> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Signal(name) => self
                .signals
                .get(name)
                .or_else(|| self.inputs.get(name))
                .cloned()
                .ok_or_else(|| SimError::UnknownSignal { name: name.clone() }),
            Expr::Variable(name) => {
                self.variables
                    .get(name)
                    .cloned()
                    .ok_or_else(|| SimError::UnknownVariable {
                        process: self.process.to_string(),
                        name: name.clone(),
                    })
            }
            Expr::Index { base, index } => {
                let base = self.eval(base)?;
                let index = self.index(index, &base)?;
                base.element(index)
                    .cloned()
                    .ok_or_else(|| SimError::eval("indexed value is not an array"))
            }
            Expr::Field { base, name } => self
                .eval(base)?
                .field(name)
                .cloned()
                .ok_or_else(|| SimError::eval(format!("no field `{name}`"))),
            Expr::Unary { op, operand, ty } => eval_unary(*op, self.eval(operand)?, ty),
            Expr::Binary { op, lhs, rhs, ty } => {
                eval_binary(*op, self.eval(lhs)?, self.eval(rhs)?, ty)
            }
            Expr::Convert { operand, to, .. } => {
                let (value, _, _) = int_parts(&self.eval(operand)?)?;
                let (width, signed) = to
                    .as_int()
                    .ok_or_else(|| SimError::eval("conversion to a non-integer type"))?;
                Ok(Value::int(value, width, signed))
            }
        }
    }

    fn index(&self, index: &Expr, array: &Value) -> Result<usize, SimError> {
        let (value, _, _) = int_parts(&self.eval(index)?)?;
        let length = match array {
            Value::Array(items) => items.len(),
            _ => return Err(SimError::eval("indexed value is not an array")),
        };
        usize::try_from(value)
            .ok()
            .filter(|i| *i < length)
            .ok_or(SimError::IndexOutOfRange {
                index: value,
                length,
            })
    }

    fn store(&mut self, target: &Target, value: Value) -> Result<(), SimError> {
        let (root, is_signal) = target.root();
        let mut path = Vec::new();
        self.path(target, &mut path)?;

        let mut current = if is_signal {
            if path.is_empty() {
                self.pending.insert(root.to_string(), value);
                return Ok(());
            }
            self.pending
                .get(root)
                .or_else(|| self.signals.get(root))
                .cloned()
                .ok_or_else(|| SimError::UnknownSignal {
                    name: root.to_string(),
                })?
        } else {
            self.variables
                .get(root)
                .cloned()
                .ok_or_else(|| SimError::UnknownVariable {
                    process: self.process.to_string(),
                    name: root.to_string(),
                })?
        };

        let mut slot = &mut current;
        for step in &path {
            slot = match step {
                Step::Index(i) => slot.element_mut(*i),
                Step::Field(name) => slot.field_mut(name),
            }
            .ok_or_else(|| SimError::eval(format!("invalid assignment target `{root}`")))?;
        }
        *slot = value;

        if is_signal {
            self.pending.insert(root.to_string(), current);
        } else {
            self.variables.insert(root.to_string(), current);
        }
        Ok(())
    }

    /// Resolves the index expressions of an aggregate target.
    fn path(&self, target: &Target, out: &mut Vec<Step>) -> Result<(), SimError> {
        match target {
            Target::Signal(_) | Target::Variable(_) => Ok(()),
            Target::Index { base, index } => {
                self.path(base, out)?;
                let array = self.eval(&base.to_expr())?;
                out.push(Step::Index(self.index(index, &array)?));
                Ok(())
            }
            Target::Field { base, name } => {
                self.path(base, out)?;
                out.push(Step::Field(name.clone()));
                Ok(())
            }
        }
    }
}

/// Case choices match integers by value regardless of vector type.
fn same_value(choice: &Value, subject: &Value) -> bool {
    match (choice.as_int(), subject.as_int()) {
        (Some(a), Some(b)) => a == b,
        _ => choice == subject,
    }
}

fn int_parts(value: &Value) -> Result<(i128, u16, bool), SimError> {
    match value {
        Value::Int {
            value,
            width,
            signed,
        } => Ok((*value, *width, *signed)),
        other => Err(SimError::eval(format!("expected an integer, found {other:?}"))),
    }
}

fn result_int(ty: &DataType, lhs_width: u16, lhs_signed: bool) -> (u16, bool) {
    ty.as_int().unwrap_or((lhs_width, lhs_signed))
}

fn eval_unary(op: UnaryOp, operand: Value, ty: &DataType) -> Result<Value, SimError> {
    match (op, operand) {
        (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (op, operand) => {
            let (value, width, signed) = int_parts(&operand)?;
            let (width, signed) = result_int(ty, width, signed);
            let result = match op {
                UnaryOp::Neg => value.wrapping_neg(),
                UnaryOp::Not => !value,
            };
            Ok(Value::int(result, width, signed))
        }
    }
}

fn eval_binary(op: BinaryOp, lhs: Value, rhs: Value, ty: &DataType) -> Result<Value, SimError> {
    if let (Value::Bool(l), Value::Bool(r)) = (&lhs, &rhs) {
        let (l, r) = (*l, *r);
        return match op {
            BinaryOp::And => Ok(Value::Bool(l && r)),
            BinaryOp::Or => Ok(Value::Bool(l || r)),
            BinaryOp::Xor | BinaryOp::Ne => Ok(Value::Bool(l != r)),
            BinaryOp::Eq => Ok(Value::Bool(l == r)),
            other => Err(SimError::eval(format!("{other:?} on booleans"))),
        };
    }
    match op {
        BinaryOp::Eq => return Ok(Value::Bool(same_value(&lhs, &rhs))),
        BinaryOp::Ne => return Ok(Value::Bool(!same_value(&lhs, &rhs))),
        _ => {}
    }

    let (l, width, signed) = int_parts(&lhs)?;
    let (r, _, _) = int_parts(&rhs)?;
    if op.is_comparison() {
        let result = match op {
            BinaryOp::Lt => l < r,
            BinaryOp::Le => l <= r,
            BinaryOp::Gt => l > r,
            _ => l >= r,
        };
        return Ok(Value::Bool(result));
    }

    let (width, signed) = result_int(ty, width, signed);
    let result = match op {
        BinaryOp::Add => l.wrapping_add(r),
        BinaryOp::Sub => l.wrapping_sub(r),
        BinaryOp::Mul => l.wrapping_mul(r),
        BinaryOp::Div => {
            if r == 0 {
                return Err(SimError::DivisionByZero);
            }
            l.wrapping_div(r)
        }
        BinaryOp::Rem => {
            if r == 0 {
                return Err(SimError::DivisionByZero);
            }
            l.wrapping_rem(r)
        }
        BinaryOp::And => l & r,
        BinaryOp::Or => l | r,
        BinaryOp::Xor => l ^ r,
        BinaryOp::ShiftLeft => match u32::try_from(r) {
            Ok(amount) if amount < 128 => l.wrapping_shl(amount),
            _ => 0,
        },
        BinaryOp::ShiftRight => match u32::try_from(r) {
            Ok(amount) if amount < 128 => l >> amount,
            _ if l < 0 => -1,
            _ => 0,
        },
        _ => return Err(SimError::eval(format!("unexpected operator {op:?}"))),
    };
    Ok(Value::int(result, width, signed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use foundry_ir::CaseArm;

    fn u8v(v: i128) -> Value {
        Value::int(v, 8, false)
    }

    fn run(
        statements: &[Statement],
        signals: &BTreeMap<String, Value>,
        variables: &mut BTreeMap<String, Value>,
    ) -> BTreeMap<String, Value> {
        let inputs = BTreeMap::new();
        let mut frame = Frame::new("p", &inputs, signals, variables);
        frame.exec(statements).unwrap();
        frame.into_pending()
    }

    #[test]
    fn arithmetic_wraps_to_result_width() {
        let ty = DataType::Unsigned(8);
        let sum = eval_binary(BinaryOp::Add, u8v(200), u8v(100), &ty).unwrap();
        assert_eq!(sum.as_int(), Some(44));
        let diff = eval_binary(BinaryOp::Sub, u8v(1), u8v(2), &ty).unwrap();
        assert_eq!(diff.as_int(), Some(255));
    }

    #[test]
    fn signed_division_truncates_toward_zero() {
        let ty = DataType::Signed(32);
        let q = eval_binary(
            BinaryOp::Div,
            Value::int(-7, 32, true),
            Value::int(2, 32, true),
            &ty,
        )
        .unwrap();
        assert_eq!(q.as_int(), Some(-3));
        let r = eval_binary(
            BinaryOp::Rem,
            Value::int(-7, 32, true),
            Value::int(2, 32, true),
            &ty,
        )
        .unwrap();
        assert_eq!(r.as_int(), Some(-1));
    }

    #[test]
    fn division_by_zero_is_an_error() {
        let err = eval_binary(BinaryOp::Div, u8v(1), u8v(0), &DataType::Unsigned(8));
        assert_eq!(err, Err(SimError::DivisionByZero));
    }

    #[test]
    fn shifts() {
        let ty = DataType::Signed(8);
        let v = eval_binary(
            BinaryOp::ShiftRight,
            Value::int(-8, 8, true),
            Value::int(1, 8, false),
            &ty,
        )
        .unwrap();
        assert_eq!(v.as_int(), Some(-4));
        let v = eval_binary(BinaryOp::ShiftLeft, u8v(0x81), u8v(1), &DataType::Unsigned(8))
            .unwrap();
        assert_eq!(v.as_int(), Some(2));
    }

    #[test]
    fn complement_of_unsigned() {
        let v = eval_unary(UnaryOp::Not, u8v(0x0f), &DataType::Unsigned(8)).unwrap();
        assert_eq!(v.as_int(), Some(0xf0));
    }

    #[test]
    fn signal_writes_are_deferred() {
        let signals = BTreeMap::from([("s".to_string(), u8v(1))]);
        let mut variables = BTreeMap::from([("v".to_string(), u8v(0))]);
        let pending = run(
            &[
                Statement::assign_signal("s", Expr::int(5, 8, false)),
                Statement::assign_variable("v", Expr::signal("s")),
            ],
            &signals,
            &mut variables,
        );
        assert_eq!(pending["s"], u8v(5));
        assert_eq!(variables["v"], u8v(1));
    }

    #[test]
    fn nested_variable_targets() {
        let signals = BTreeMap::new();
        let mut variables = BTreeMap::from([(
            "arr".to_string(),
            Value::Array(vec![u8v(0), u8v(0), u8v(0)]),
        )]);
        let target = Target::Index {
            base: Box::new(Target::variable("arr")),
            index: Expr::int(2, 32, false),
        };
        run(
            &[Statement::assign(target, Expr::int(9, 8, false))],
            &signals,
            &mut variables,
        );
        assert_eq!(variables["arr"].element(2), Some(&u8v(9)));
    }

    #[test]
    fn out_of_range_index_is_an_error() {
        let signals = BTreeMap::new();
        let inputs = BTreeMap::new();
        let mut variables = BTreeMap::from([("arr".to_string(), Value::Array(vec![u8v(0)]))]);
        let frame = Frame::new("p", &inputs, &signals, &mut variables);
        let err = frame.eval(&Expr::index(Expr::variable("arr"), Expr::int(3, 32, false)));
        assert_eq!(
            err,
            Err(SimError::IndexOutOfRange {
                index: 3,
                length: 1
            })
        );
    }

    #[test]
    fn case_selects_matching_arm() {
        let signals = BTreeMap::new();
        let mut variables = BTreeMap::from([
            ("state".to_string(), Value::Enum("B".into())),
            ("hit".to_string(), u8v(0)),
        ]);
        let case = Statement::Case {
            subject: Expr::variable("state"),
            arms: vec![
                CaseArm {
                    choice: Value::Enum("A".into()),
                    body: vec![Statement::assign_variable("hit", Expr::int(1, 8, false))],
                },
                CaseArm {
                    choice: Value::Enum("B".into()),
                    body: vec![Statement::assign_variable("hit", Expr::int(2, 8, false))],
                },
            ],
            default: vec![Statement::assign_variable("hit", Expr::int(3, 8, false))],
        };
        run(&[case], &signals, &mut variables);
        assert_eq!(variables["hit"], u8v(2));
    }

    #[test]
    fn unknown_variable_names_the_process() {
        let signals = BTreeMap::new();
        let inputs = BTreeMap::new();
        let mut variables = BTreeMap::new();
        let frame = Frame::new("p", &inputs, &signals, &mut variables);
        assert_eq!(
            frame.eval(&Expr::variable("x")),
            Err(SimError::UnknownVariable {
                process: "p".into(),
                name: "x".into()
            })
        );
    }
}
