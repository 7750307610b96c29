//! Compile-time evaluation of method bodies.
//!
//! Single-assignment constant locals and `const` fields are substituted at
//! their use sites and their declarations removed. Constant sub-expressions
//! are evaluated with two's-complement wrapping at their static width,
//! branches on constant conditions are resolved and `while (false)` loops
//! are dropped. A name declared more than once in a body (sibling scopes)
//! is never substituted.

use crate::typing::find_field;
use foundry_ast::visit::{walk_stmt, Visitor};
use foundry_ast::{
    BinaryOp, Block, Expr, IntType, Literal, Member, Stmt, SyntaxTree, TypeRef, UnaryOp,
};
use std::collections::{HashMap, HashSet};

const MAX_CONSTANT_DEPTH: usize = 32;

/// Folds every method body of the tree.
pub fn fold_tree(tree: &SyntaxTree) -> SyntaxTree {
    let mut folded = tree.clone();
    for ty in &mut folded.types {
        for member in &mut ty.members {
            if let Member::Method(method) = member {
                if let Some(body) = &method.body {
                    method.body = Some(fold_body(tree, body));
                }
            }
        }
    }
    folded
}

/// Folds one method body until no further constant local is found.
pub fn fold_body(tree: &SyntaxTree, body: &Block) -> Block {
    let mut folder = Folder {
        tree,
        constants: HashMap::new(),
        depth: 0,
    };
    let declarations = declaration_counts(body);
    let mut current = folder.block(body);
    loop {
        let mut finder = ConstantLocals {
            assigned: assigned_locals(&current),
            declarations: &declarations,
            known: &folder.constants,
            found: Vec::new(),
        };
        foundry_ast::walk_block(&mut finder, &current);
        if finder.found.is_empty() {
            return current;
        }
        folder.constants.extend(finder.found);
        current = folder.block(&current);
    }
}

/// Folds one expression; locals are left as they are.
pub fn fold_expr(tree: &SyntaxTree, expr: &Expr) -> Expr {
    Folder {
        tree,
        constants: HashMap::new(),
        depth: 0,
    }
    .expr(expr)
}

fn assigned_locals(block: &Block) -> HashSet<String> {
    struct Assigned(HashSet<String>);
    impl Visitor for Assigned {
        fn visit_stmt(&mut self, stmt: &Stmt) {
            if let Stmt::Assign {
                target: Expr::Local(name),
                ..
            } = stmt
            {
                self.0.insert(name.clone());
            }
            walk_stmt(self, stmt);
        }
    }
    let mut assigned = Assigned(HashSet::new());
    foundry_ast::walk_block(&mut assigned, block);
    assigned.0
}

fn declaration_counts(block: &Block) -> HashMap<String, usize> {
    struct Declared(HashMap<String, usize>);
    impl Visitor for Declared {
        fn visit_stmt(&mut self, stmt: &Stmt) {
            if let Stmt::Local { name, .. } = stmt {
                *self.0.entry(name.clone()).or_default() += 1;
            }
            walk_stmt(self, stmt);
        }
    }
    let mut declared = Declared(HashMap::new());
    foundry_ast::walk_block(&mut declared, block);
    declared.0
}

struct ConstantLocals<'k> {
    assigned: HashSet<String>,
    declarations: &'k HashMap<String, usize>,
    known: &'k HashMap<String, Expr>,
    found: Vec<(String, Expr)>,
}

impl Visitor for ConstantLocals<'_> {
    fn visit_stmt(&mut self, stmt: &Stmt) {
        if let Stmt::Local {
            name,
            ty,
            init: Some(init),
        } = stmt
        {
            let unique = self.declarations.get(name) == Some(&1);
            if unique && !self.assigned.contains(name) && !self.known.contains_key(name) {
                if let Some(value) = coerce(init, ty) {
                    self.found.push((name.clone(), value));
                }
            }
        }
        walk_stmt(self, stmt);
    }
}

/// Converts a literal to a declared scalar type.
fn coerce(value: &Expr, ty: &TypeRef) -> Option<Expr> {
    match (value, ty) {
        (Expr::Literal(Literal::Int { value, .. }), TypeRef::Int(t)) => Some(int_literal(*value, *t)),
        (Expr::Literal(Literal::Bool(b)), TypeRef::Bool) => Some(Expr::Literal(Literal::Bool(*b))),
        _ => None,
    }
}

fn int_literal(value: i128, ty: IntType) -> Expr {
    Expr::Literal(Literal::Int {
        value: ty.wrap(value),
        ty,
    })
}

fn bool_literal(value: bool) -> Expr {
    Expr::Literal(Literal::Bool(value))
}

/// Evaluates a binary operation on two literals.
fn eval_binary(op: BinaryOp, lhs: &Expr, rhs: &Expr) -> Option<Expr> {
    if let (Some((a, ta)), Some((b, tb))) = (lhs.as_int_literal(), rhs.as_int_literal()) {
        if op.is_shift() {
            let count = (b & i128::from(ta.bits - 1)) as u32;
            let value = match op {
                BinaryOp::Shl => a.wrapping_shl(count),
                _ => a >> count,
            };
            return Some(int_literal(value, ta));
        }
        let t = ta.promote(tb);
        let (a, b) = (t.wrap(a), t.wrap(b));
        return match op {
            BinaryOp::Add => Some(int_literal(a.wrapping_add(b), t)),
            BinaryOp::Sub => Some(int_literal(a.wrapping_sub(b), t)),
            BinaryOp::Mul => Some(int_literal(a.wrapping_mul(b), t)),
            BinaryOp::Div if b != 0 => Some(int_literal(a.wrapping_div(b), t)),
            BinaryOp::Rem if b != 0 => Some(int_literal(a.wrapping_rem(b), t)),
            BinaryOp::And => Some(int_literal(a & b, t)),
            BinaryOp::Or => Some(int_literal(a | b, t)),
            BinaryOp::Xor => Some(int_literal(a ^ b, t)),
            BinaryOp::Eq => Some(bool_literal(a == b)),
            BinaryOp::Ne => Some(bool_literal(a != b)),
            BinaryOp::Lt => Some(bool_literal(a < b)),
            BinaryOp::Le => Some(bool_literal(a <= b)),
            BinaryOp::Gt => Some(bool_literal(a > b)),
            BinaryOp::Ge => Some(bool_literal(a >= b)),
            _ => None,
        };
    }
    let (a, b) = (lhs.as_bool_literal()?, rhs.as_bool_literal()?);
    match op {
        BinaryOp::LogicAnd | BinaryOp::And => Some(bool_literal(a && b)),
        BinaryOp::LogicOr | BinaryOp::Or => Some(bool_literal(a || b)),
        BinaryOp::Xor | BinaryOp::Ne => Some(bool_literal(a != b)),
        BinaryOp::Eq => Some(bool_literal(a == b)),
        _ => None,
    }
}

fn eval_unary(op: UnaryOp, operand: &Expr) -> Option<Expr> {
    match (op, operand.as_int_literal(), operand.as_bool_literal()) {
        (UnaryOp::Neg, Some((v, t)), _) => Some(int_literal(v.wrapping_neg(), t)),
        (UnaryOp::Not, Some((v, t)), _) => Some(int_literal(!v, t)),
        (UnaryOp::LogicNot, _, Some(b)) => Some(bool_literal(!b)),
        _ => None,
    }
}

struct Folder<'t> {
    tree: &'t SyntaxTree,
    constants: HashMap<String, Expr>,
    depth: usize,
}

impl Folder<'_> {
    fn block(&mut self, block: &Block) -> Block {
        block.iter().flat_map(|s| self.stmt(s)).collect()
    }

    fn stmt(&mut self, stmt: &Stmt) -> Vec<Stmt> {
        match stmt {
            Stmt::Local { name, ty, init } => {
                if self.constants.contains_key(name) {
                    return Vec::new();
                }
                vec![Stmt::Local {
                    name: name.clone(),
                    ty: ty.clone(),
                    init: init.as_ref().map(|e| self.expr(e)),
                }]
            }
            Stmt::Assign { target, value } => vec![Stmt::Assign {
                target: self.expr(target),
                value: self.expr(value),
            }],
            Stmt::Expr(e) => vec![Stmt::Expr(self.expr(e))],
            Stmt::MemoryWrite {
                memory,
                cell_index,
                value,
            } => vec![Stmt::MemoryWrite {
                memory: self.expr(memory),
                cell_index: self.expr(cell_index),
                value: self.expr(value),
            }],
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let condition = self.expr(condition);
                match condition.as_bool_literal() {
                    Some(true) => vec![Stmt::Block(self.block(then_branch))],
                    Some(false) => else_branch
                        .as_ref()
                        .map(|b| vec![Stmt::Block(self.block(b))])
                        .unwrap_or_default(),
                    None => vec![Stmt::If {
                        condition,
                        then_branch: self.block(then_branch),
                        else_branch: else_branch.as_ref().map(|b| self.block(b)),
                    }],
                }
            }
            Stmt::While { condition, body } => {
                let condition = self.expr(condition);
                if condition.as_bool_literal() == Some(false) {
                    return Vec::new();
                }
                vec![Stmt::While {
                    condition,
                    body: self.block(body),
                }]
            }
            Stmt::For {
                init,
                condition,
                step,
                body,
            } => {
                let init = self.block(init);
                let condition = self.expr(condition);
                if condition.as_bool_literal() == Some(false) {
                    return if init.is_empty() {
                        Vec::new()
                    } else {
                        vec![Stmt::Block(init)]
                    };
                }
                vec![Stmt::For {
                    init,
                    condition,
                    step: self.block(step),
                    body: self.block(body),
                }]
            }
            Stmt::Break => vec![Stmt::Break],
            Stmt::Return(value) => vec![Stmt::Return(value.as_ref().map(|e| self.expr(e)))],
            Stmt::Block(block) => vec![Stmt::Block(self.block(block))],
            Stmt::WaitAll(tasks) => vec![Stmt::WaitAll(self.expr(tasks))],
        }
    }

    fn constant_field(&mut self, type_name: &str, name: &str) -> Option<Expr> {
        let (_, member) = find_field(self.tree, type_name, name)?;
        let Member::Field(field) = member else {
            return None;
        };
        if !field.is_const || self.depth >= MAX_CONSTANT_DEPTH {
            return None;
        }
        let init = field.initializer.as_ref()?;
        self.depth += 1;
        let value = self.expr(init);
        self.depth -= 1;
        coerce(&value, &field.ty)
    }

    fn expr(&mut self, expr: &Expr) -> Expr {
        match expr {
            Expr::Local(name) => self
                .constants
                .get(name)
                .cloned()
                .unwrap_or_else(|| expr.clone()),
            Expr::Field {
                target,
                type_name,
                name,
            } => self
                .constant_field(type_name, name)
                .unwrap_or_else(|| Expr::Field {
                    target: Box::new(self.expr(target)),
                    type_name: type_name.clone(),
                    name: name.clone(),
                }),
            Expr::StaticField { type_name, name } => self
                .constant_field(type_name, name)
                .unwrap_or_else(|| expr.clone()),
            Expr::Binary { op, lhs, rhs } => {
                let (lhs, rhs) = (self.expr(lhs), self.expr(rhs));
                eval_binary(*op, &lhs, &rhs).unwrap_or_else(|| Expr::Binary {
                    op: *op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                })
            }
            Expr::Unary { op, operand } => {
                let operand = self.expr(operand);
                eval_unary(*op, &operand).unwrap_or_else(|| Expr::Unary {
                    op: *op,
                    operand: Box::new(operand),
                })
            }
            Expr::Cast { ty, operand } => {
                let operand = self.expr(operand);
                match (operand.as_int_literal(), ty.as_int()) {
                    (Some((value, _)), Some(t)) => int_literal(value, t),
                    _ => Expr::Cast {
                        ty: ty.clone(),
                        operand: Box::new(operand),
                    },
                }
            }
            Expr::Conditional {
                condition,
                then,
                otherwise,
            } => {
                let condition = self.expr(condition);
                match condition.as_bool_literal() {
                    Some(true) => self.expr(then),
                    Some(false) => self.expr(otherwise),
                    None => Expr::Conditional {
                        condition: Box::new(condition),
                        then: Box::new(self.expr(then)),
                        otherwise: Box::new(self.expr(otherwise)),
                    },
                }
            }
            Expr::ArrayElement { array, index } => Expr::ArrayElement {
                array: Box::new(self.expr(array)),
                index: Box::new(self.expr(index)),
            },
            Expr::ArrayLength(array) => Expr::ArrayLength(Box::new(self.expr(array))),
            Expr::Call {
                method,
                receiver,
                args,
                is_virtual,
            } => Expr::Call {
                method: method.clone(),
                receiver: receiver.as_ref().map(|r| Box::new(self.expr(r))),
                args: args.iter().map(|a| self.expr(a)).collect(),
                is_virtual: *is_virtual,
            },
            Expr::New { type_name, args } => Expr::New {
                type_name: type_name.clone(),
                args: args.iter().map(|a| self.expr(a)).collect(),
            },
            Expr::NewArray { element, length } => Expr::NewArray {
                element: element.clone(),
                length: Box::new(self.expr(length)),
            },
            Expr::MemoryRead { memory, cell_index } => Expr::MemoryRead {
                memory: Box::new(self.expr(memory)),
                cell_index: Box::new(self.expr(cell_index)),
            },
            Expr::StartTask { method, argument } => Expr::StartTask {
                method: method.clone(),
                argument: Box::new(self.expr(argument)),
            },
            Expr::TaskResult(task) => Expr::TaskResult(Box::new(self.expr(task))),
            Expr::Literal(_) | Expr::This => expr.clone(),
        }
    }
}
