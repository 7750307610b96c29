//! Recognition of statically bounded fan-out loops.
//!
//! The replicated idiom is a counted loop starting one task per iteration,
//! followed later by a join on the task array:
//!
//! ```text
//! Task<uint>[] tasks = new Task<uint>[4];
//! for (int i = 0; i < 4; i++) { tasks[i] = Task.Start(Worker, input[i]); }
//! Task.WaitAll(tasks);
//! ```
//!
//! Each iteration gets its own physical copy of the started member.

use crate::error::TransformError;
use foundry_ast::visit::{walk_stmt, Visitor};
use foundry_ast::{BinaryOp, Expr, IntType, Literal, Stmt, SyntaxTree, TypeRef};
use foundry_config::TransformerConfig;
use std::collections::BTreeMap;

/// A recognized fan-out loop.
#[derive(Debug, Clone, PartialEq)]
pub struct FanOut {
    /// The task array local.
    pub tasks: String,
    /// The loop counter local.
    pub counter: String,
    /// The counter's type.
    pub counter_type: IntType,
    /// Whether the loop declares its counter.
    pub declares_counter: bool,
    /// The loop bound, if it is a literal.
    pub bound: Option<u32>,
    /// Full name of the started member.
    pub callee: String,
    /// The task argument, in terms of the counter.
    pub argument: Expr,
}

fn is_local(expr: &Expr, name: &str) -> bool {
    matches!(expr, Expr::Local(n) if n == name)
}

fn zero_literal(expr: &Expr) -> Option<IntType> {
    match expr.as_int_literal() {
        Some((0, ty)) => Some(ty),
        _ => None,
    }
}

/// Matches the fan-out idiom.
pub fn recognize_fan_out(stmt: &Stmt) -> Option<FanOut> {
    let Stmt::For {
        init,
        condition,
        step,
        body,
    } = stmt
    else {
        return None;
    };
    let (counter, counter_type, declares_counter) = match init.as_slice() {
        [Stmt::Local {
            name,
            ty: TypeRef::Int(ty),
            init: Some(start),
        }] if zero_literal(start).is_some() => (name.clone(), *ty, true),
        [Stmt::Assign {
            target: Expr::Local(name),
            value,
        }] => (name.clone(), zero_literal(value)?, false),
        _ => return None,
    };
    let Expr::Binary {
        op: BinaryOp::Lt,
        lhs,
        rhs: bound,
    } = condition
    else {
        return None;
    };
    if !is_local(lhs, &counter) {
        return None;
    }
    let [Stmt::Assign {
        target: step_target,
        value:
            Expr::Binary {
                op: BinaryOp::Add,
                lhs: step_lhs,
                rhs: step_rhs,
            },
    }] = step.as_slice()
    else {
        return None;
    };
    if !is_local(step_target, &counter)
        || !is_local(step_lhs, &counter)
        || step_rhs.as_int_literal().map(|(v, _)| v) != Some(1)
    {
        return None;
    }
    let [Stmt::Assign {
        target: Expr::ArrayElement { array, index },
        value: Expr::StartTask { method, argument },
    }] = body.as_slice()
    else {
        return None;
    };
    let Expr::Local(tasks) = array.as_ref() else {
        return None;
    };
    if !is_local(index, &counter) {
        return None;
    }
    let bound = bound
        .as_int_literal()
        .and_then(|(v, _)| u32::try_from(v).ok());
    Some(FanOut {
        tasks: tasks.clone(),
        counter,
        counter_type,
        declares_counter,
        bound,
        callee: method.clone(),
        argument: argument.as_ref().clone(),
    })
}

impl FanOut {
    /// The degree of parallelism: the literal loop bound, or the configured
    /// degree for the started member when the bound is not a literal. A
    /// configured degree must agree with a literal bound.
    pub fn degree(
        &self,
        config: &TransformerConfig,
        declaration: &str,
    ) -> Result<u32, TransformError> {
        let configured = config.parallelism.get(&self.callee).copied();
        match (self.bound, configured) {
            (Some(0), _) => Err(TransformError::unsupported(
                format!("fan-out of `{}` with no iterations", self.callee),
                declaration,
            )),
            (Some(bound), Some(degree)) if bound != degree => Err(TransformError::unsupported(
                format!(
                    "degree of parallelism {degree} configured for `{}` differs from the loop bound {bound}",
                    self.callee
                ),
                declaration,
            )),
            (Some(bound), _) => Ok(bound),
            (None, Some(degree)) => Ok(degree),
            (None, None) => Err(TransformError::unsupported(
                format!(
                    "dynamically-sized degree of parallelism for `{}`",
                    self.callee
                ),
                declaration,
            )),
        }
    }

    /// The task argument of iteration `index`.
    pub fn argument_for(&self, index: u32) -> Expr {
        let value = Expr::Literal(Literal::Int {
            value: i128::from(index),
            ty: self.counter_type,
        });
        substitute_local(&self.argument, &self.counter, &value)
    }
}

/// Replaces every read of the local `name` with `value`.
pub fn substitute_local(expr: &Expr, name: &str, value: &Expr) -> Expr {
    let sub = |e: &Expr| Box::new(substitute_local(e, name, value));
    match expr {
        Expr::Local(n) if n == name => value.clone(),
        Expr::Literal(_)
        | Expr::Local(_)
        | Expr::This
        | Expr::StaticField { .. } => expr.clone(),
        Expr::Field {
            target,
            type_name,
            name: field,
        } => Expr::Field {
            target: sub(target),
            type_name: type_name.clone(),
            name: field.clone(),
        },
        Expr::ArrayElement { array, index } => Expr::ArrayElement {
            array: sub(array),
            index: sub(index),
        },
        Expr::ArrayLength(array) => Expr::ArrayLength(sub(array)),
        Expr::Binary { op, lhs, rhs } => Expr::Binary {
            op: *op,
            lhs: sub(lhs),
            rhs: sub(rhs),
        },
        Expr::Unary { op, operand } => Expr::Unary {
            op: *op,
            operand: sub(operand),
        },
        Expr::Cast { ty, operand } => Expr::Cast {
            ty: ty.clone(),
            operand: sub(operand),
        },
        Expr::Call {
            method,
            receiver,
            args,
            is_virtual,
        } => Expr::Call {
            method: method.clone(),
            receiver: receiver.as_ref().map(|r| sub(r)),
            args: args.iter().map(|a| substitute_local(a, name, value)).collect(),
            is_virtual: *is_virtual,
        },
        Expr::New { type_name, args } => Expr::New {
            type_name: type_name.clone(),
            args: args.iter().map(|a| substitute_local(a, name, value)).collect(),
        },
        Expr::NewArray { element, length } => Expr::NewArray {
            element: element.clone(),
            length: sub(length),
        },
        Expr::MemoryRead { memory, cell_index } => Expr::MemoryRead {
            memory: sub(memory),
            cell_index: sub(cell_index),
        },
        Expr::StartTask { method, argument } => Expr::StartTask {
            method: method.clone(),
            argument: sub(argument),
        },
        Expr::TaskResult(task) => Expr::TaskResult(sub(task)),
        Expr::Conditional {
            condition,
            then,
            otherwise,
        } => Expr::Conditional {
            condition: sub(condition),
            then: sub(then),
            otherwise: sub(otherwise),
        },
    }
}

/// How many physical copies each member needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplicationPlan {
    instances: BTreeMap<String, u32>,
}

impl ReplicationPlan {
    /// Finds every fan-out in the tree; a member started by fan-outs gets as
    /// many instances as the widest of them.
    pub fn build(tree: &SyntaxTree, config: &TransformerConfig) -> Result<Self, TransformError> {
        struct Collector<'c> {
            config: &'c TransformerConfig,
            declaration: String,
            instances: BTreeMap<String, u32>,
            error: Option<TransformError>,
        }
        impl Visitor for Collector<'_> {
            fn visit_stmt(&mut self, stmt: &Stmt) {
                if let Some(fan_out) = recognize_fan_out(stmt) {
                    match fan_out.degree(self.config, &self.declaration) {
                        Ok(degree) => {
                            let entry = self.instances.entry(fan_out.callee).or_insert(1);
                            *entry = (*entry).max(degree);
                        }
                        Err(err) => {
                            self.error.get_or_insert(err);
                        }
                    }
                }
                walk_stmt(self, stmt);
            }
        }

        let mut collector = Collector {
            config,
            declaration: String::new(),
            instances: BTreeMap::new(),
            error: None,
        };
        for (owner, method) in tree.methods() {
            if let Some(body) = &method.body {
                collector.declaration = foundry_ast::member_full_name(&owner.name, &method.name);
                foundry_ast::walk_block(&mut collector, body);
            }
        }
        match collector.error {
            Some(err) => Err(err),
            None => Ok(Self {
                instances: collector.instances,
            }),
        }
    }

    /// Number of instances of a member; 1 unless it is fanned out.
    pub fn instances(&self, member: &str) -> u32 {
        self.instances.get(member).copied().unwrap_or(1)
    }

    /// Members with more than one instance.
    pub fn replicated(&self) -> impl Iterator<Item = (&str, u32)> {
        self.instances
            .iter()
            .filter(|(_, n)| **n > 1)
            .map(|(m, n)| (m.as_str(), *n))
    }
}
