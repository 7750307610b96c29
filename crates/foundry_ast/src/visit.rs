//! Read-only traversal of method bodies.
//!
//! Implement [`Visitor`] and override the hooks of interest; call the `walk_*`
//! function from an override to keep descending.

use crate::expr::Expr;
use crate::stmt::{Block, Stmt};

/// A read-only visitor over statements and expressions.
pub trait Visitor {
    /// Called for every statement.
    fn visit_stmt(&mut self, stmt: &Stmt) {
        walk_stmt(self, stmt);
    }

    /// Called for every expression.
    fn visit_expr(&mut self, expr: &Expr) {
        walk_expr(self, expr);
    }
}

/// Visits every statement of a block.
pub fn walk_block<V: Visitor + ?Sized>(visitor: &mut V, block: &Block) {
    for stmt in block {
        visitor.visit_stmt(stmt);
    }
}

/// Visits the children of a statement.
pub fn walk_stmt<V: Visitor + ?Sized>(visitor: &mut V, stmt: &Stmt) {
    match stmt {
        Stmt::Local { init, .. } => {
            if let Some(init) = init {
                visitor.visit_expr(init);
            }
        }
        Stmt::Assign { target, value } => {
            visitor.visit_expr(target);
            visitor.visit_expr(value);
        }
        Stmt::Expr(expr) | Stmt::WaitAll(expr) => visitor.visit_expr(expr),
        Stmt::MemoryWrite {
            memory,
            cell_index,
            value,
        } => {
            visitor.visit_expr(memory);
            visitor.visit_expr(cell_index);
            visitor.visit_expr(value);
        }
        Stmt::If {
            condition,
            then_branch,
            else_branch,
        } => {
            visitor.visit_expr(condition);
            walk_block(visitor, then_branch);
            if let Some(else_branch) = else_branch {
                walk_block(visitor, else_branch);
            }
        }
        Stmt::While { condition, body } => {
            visitor.visit_expr(condition);
            walk_block(visitor, body);
        }
        Stmt::For {
            init,
            condition,
            step,
            body,
        } => {
            walk_block(visitor, init);
            visitor.visit_expr(condition);
            walk_block(visitor, body);
            walk_block(visitor, step);
        }
        Stmt::Return(value) => {
            if let Some(value) = value {
                visitor.visit_expr(value);
            }
        }
        Stmt::Block(block) => walk_block(visitor, block),
        Stmt::Break => {}
    }
}

/// Visits the operands of an expression.
pub fn walk_expr<V: Visitor + ?Sized>(visitor: &mut V, expr: &Expr) {
    match expr {
        Expr::Literal(_) | Expr::Local(_) | Expr::This | Expr::StaticField { .. } => {}
        Expr::Field { target, .. } => visitor.visit_expr(target),
        Expr::ArrayElement { array, index } => {
            visitor.visit_expr(array);
            visitor.visit_expr(index);
        }
        Expr::ArrayLength(inner) | Expr::TaskResult(inner) => visitor.visit_expr(inner),
        Expr::Binary { lhs, rhs, .. } => {
            visitor.visit_expr(lhs);
            visitor.visit_expr(rhs);
        }
        Expr::Unary { operand, .. } | Expr::Cast { operand, .. } => visitor.visit_expr(operand),
        Expr::Call { receiver, args, .. } => {
            if let Some(receiver) = receiver {
                visitor.visit_expr(receiver);
            }
            for arg in args {
                visitor.visit_expr(arg);
            }
        }
        Expr::New { args, .. } => {
            for arg in args {
                visitor.visit_expr(arg);
            }
        }
        Expr::NewArray { length, .. } => visitor.visit_expr(length),
        Expr::MemoryRead { memory, cell_index } => {
            visitor.visit_expr(memory);
            visitor.visit_expr(cell_index);
        }
        Expr::StartTask { argument, .. } => visitor.visit_expr(argument),
        Expr::Conditional {
            condition,
            then,
            otherwise,
        } => {
            visitor.visit_expr(condition);
            visitor.visit_expr(then);
            visitor.visit_expr(otherwise);
        }
    }
}
