//! Processes: the unit of behavior in the generated module.

use crate::expr::Expr;
use crate::signal::{Signal, Variable};
use crate::stmt::{Statement, Target};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// How a process is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessKind {
    /// Runs once per rising clock edge; `reset` runs instead of `body`
    /// while the reset port is high.
    Sequential,
    /// Re-evaluated whenever a signal it reads changes.
    Combinational,
}

/// A process together with the signals it drives.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Process {
    /// Process label.
    pub name: String,
    /// Sequential or combinational.
    pub kind: ProcessKind,
    /// Signals driven by this process and by no other.
    pub signals: Vec<Signal>,
    /// Process-local variables.
    pub variables: Vec<Variable>,
    /// Statements run on reset. Ignored for combinational processes.
    pub reset: Vec<Statement>,
    /// Statements run every evaluation.
    pub body: Vec<Statement>,
}

impl Process {
    /// An empty sequential process.
    pub fn sequential(name: impl Into<String>) -> Self {
        Self::new(name, ProcessKind::Sequential)
    }

    /// An empty combinational process.
    pub fn combinational(name: impl Into<String>) -> Self {
        Self::new(name, ProcessKind::Combinational)
    }

    fn new(name: impl Into<String>, kind: ProcessKind) -> Self {
        Self {
            name: name.into(),
            kind,
            signals: Vec::new(),
            variables: Vec::new(),
            reset: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Reset statements restoring every driven signal and variable to its
    /// initial value.
    pub fn initial_value_resets(&self) -> Vec<Statement> {
        let signals = self.signals.iter().map(|s| {
            Statement::assign(Target::signal(&s.name), Expr::Literal(s.initial.clone()))
        });
        let variables = self.variables.iter().map(|v| {
            Statement::assign(Target::variable(&v.name), Expr::Literal(v.initial.clone()))
        });
        signals.chain(variables).collect()
    }

    /// Names of every signal read by the process.
    pub fn read_signals(&self) -> BTreeSet<String> {
        let mut out = Vec::new();
        for stmt in self.reset.iter().chain(&self.body) {
            collect_reads(stmt, &mut out);
        }
        out.into_iter().collect()
    }

    /// Names of every signal assigned by the process.
    pub fn assigned_signals(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        for stmt in self.reset.iter().chain(&self.body) {
            collect_assigned(stmt, &mut out);
        }
        out
    }
}

fn collect_reads(stmt: &Statement, out: &mut Vec<String>) {
    match stmt {
        Statement::Assign { target, value } => {
            collect_target_reads(target, out);
            value.signals(out);
        }
        Statement::If {
            condition,
            then_body,
            else_body,
        } => {
            condition.signals(out);
            for s in then_body.iter().chain(else_body) {
                collect_reads(s, out);
            }
        }
        Statement::Case {
            subject,
            arms,
            default,
        } => {
            subject.signals(out);
            for s in arms.iter().flat_map(|a| &a.body).chain(default) {
                collect_reads(s, out);
            }
        }
        Statement::Comment(_) => {}
    }
}

fn collect_target_reads(target: &Target, out: &mut Vec<String>) {
    match target {
        Target::Signal(_) | Target::Variable(_) => {}
        Target::Index { base, index } => {
            collect_target_reads(base, out);
            index.signals(out);
        }
        Target::Field { base, .. } => collect_target_reads(base, out),
    }
}

fn collect_assigned(stmt: &Statement, out: &mut BTreeSet<String>) {
    match stmt {
        Statement::Assign { target, .. } => {
            let (name, is_signal) = target.root();
            if is_signal {
                out.insert(name.to_string());
            }
        }
        Statement::If {
            then_body,
            else_body,
            ..
        } => {
            for s in then_body.iter().chain(else_body) {
                collect_assigned(s, out);
            }
        }
        Statement::Case { arms, default, .. } => {
            for s in arms.iter().flat_map(|a| &a.body).chain(default) {
                collect_assigned(s, out);
            }
        }
        Statement::Comment(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DataType;

    #[test]
    fn reads_and_writes_are_collected() {
        let mut p = Process::sequential("p");
        p.signals.push(Signal::new("out", DataType::Boolean));
        p.body.push(Statement::when(
            Expr::signal("go"),
            vec![Statement::assign_signal("out", Expr::signal("in"))],
        ));
        assert_eq!(
            p.read_signals().into_iter().collect::<Vec<_>>(),
            vec!["go", "in"]
        );
        assert!(p.assigned_signals().contains("out"));
    }

    #[test]
    fn initial_value_resets_cover_signals_and_variables() {
        let mut p = Process::sequential("p");
        p.signals.push(Signal::new("s", DataType::Boolean));
        p.variables.push(Variable::new("v", DataType::Unsigned(8)));
        assert_eq!(p.initial_value_resets().len(), 2);
    }
}
