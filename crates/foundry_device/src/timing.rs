//! Operator latency tables.
//!
//! A timing report maps `(operator, operand width, signedness, constant
//! operand)` to a latency in nanoseconds. Reports are usually produced by
//! running the vendor toolchain on small probe designs and are exchanged as
//! tab-separated text:
//!
//! ```text
//! # operator  width  signedness  constant  latency_ns
//! add         32     unsigned    -         1.46
//! mul         32     unsigned    4         0.31
//! ```

use crate::error::DeviceError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// An operator with device-dependent latency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OperatorKind {
    /// Addition.
    Add,
    /// Subtraction.
    Sub,
    /// Multiplication.
    Mul,
    /// Division.
    Div,
    /// Remainder.
    Rem,
    /// Bitwise AND.
    And,
    /// Bitwise OR.
    Or,
    /// Bitwise XOR.
    Xor,
    /// Shift left.
    ShiftLeft,
    /// Shift right.
    ShiftRight,
    /// Equality.
    Eq,
    /// Inequality.
    Ne,
    /// Less than.
    Lt,
    /// Less than or equal.
    Le,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Ge,
    /// Arithmetic negation.
    Neg,
    /// Bitwise complement.
    Not,
}

impl OperatorKind {
    /// Every operator, in table order.
    pub const ALL: [OperatorKind; 18] = [
        OperatorKind::Add,
        OperatorKind::Sub,
        OperatorKind::Mul,
        OperatorKind::Div,
        OperatorKind::Rem,
        OperatorKind::And,
        OperatorKind::Or,
        OperatorKind::Xor,
        OperatorKind::ShiftLeft,
        OperatorKind::ShiftRight,
        OperatorKind::Eq,
        OperatorKind::Ne,
        OperatorKind::Lt,
        OperatorKind::Le,
        OperatorKind::Gt,
        OperatorKind::Ge,
        OperatorKind::Neg,
        OperatorKind::Not,
    ];

    /// The name used in timing report files.
    pub fn name(self) -> &'static str {
        match self {
            OperatorKind::Add => "add",
            OperatorKind::Sub => "sub",
            OperatorKind::Mul => "mul",
            OperatorKind::Div => "div",
            OperatorKind::Rem => "rem",
            OperatorKind::And => "and",
            OperatorKind::Or => "or",
            OperatorKind::Xor => "xor",
            OperatorKind::ShiftLeft => "shl",
            OperatorKind::ShiftRight => "shr",
            OperatorKind::Eq => "eq",
            OperatorKind::Ne => "ne",
            OperatorKind::Lt => "lt",
            OperatorKind::Le => "le",
            OperatorKind::Gt => "gt",
            OperatorKind::Ge => "ge",
            OperatorKind::Neg => "neg",
            OperatorKind::Not => "not",
        }
    }
}

impl fmt::Display for OperatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OperatorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OperatorKind::ALL
            .into_iter()
            .find(|op| op.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown operator `{s}`"))
    }
}

/// The key of one timing report entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimingKey {
    /// The operator.
    pub operator: OperatorKind,
    /// Operand width in bits.
    pub width: u16,
    /// Operand signedness.
    pub signed: bool,
    /// The constant right operand this entry is specialized for, if any.
    pub constant: Option<i128>,
}

impl fmt::Display for TimingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.signed { "signed" } else { "unsigned" };
        write!(f, "{} on {}-bit {sign} operands", self.operator, self.width)?;
        if let Some(c) = self.constant {
            write!(f, " with constant {c}")?;
        }
        Ok(())
    }
}

/// Latencies of operators on a particular device.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimingReport {
    entries: BTreeMap<TimingKey, f64>,
}

impl TimingReport {
    /// Creates an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a latency, replacing any previous entry for the key.
    pub fn insert(&mut self, key: TimingKey, latency_ns: f64) {
        self.entries.insert(key, latency_ns);
    }

    /// Removes an entry; returns its latency if it existed.
    pub fn remove(&mut self, key: &TimingKey) -> Option<f64> {
        self.entries.remove(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the report has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks up the latency of an operation.
    ///
    /// With a constant right operand, an entry specialized for that constant
    /// is used when it is cheaper than the general entry (or when there is no
    /// general entry). A NaN entry is returned as is, never skipped.
    pub fn latency(
        &self,
        operator: OperatorKind,
        width: u16,
        signed: bool,
        constant: Option<i128>,
    ) -> Option<f64> {
        let general = self
            .entries
            .get(&TimingKey {
                operator,
                width,
                signed,
                constant: None,
            })
            .copied();
        let specialized = constant.and_then(|c| {
            self.entries
                .get(&TimingKey {
                    operator,
                    width,
                    signed,
                    constant: Some(c),
                })
                .copied()
        });
        match (general, specialized) {
            (Some(g), Some(s)) if s.is_nan() || s < g => Some(s),
            (g, s) => g.or(s),
        }
    }

    /// Iterates over all entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&TimingKey, &f64)> {
        self.entries.iter()
    }

    /// Renders the report in the tab-separated exchange format.
    pub fn to_tsv(&self) -> String {
        let mut out = String::from("# operator\twidth\tsignedness\tconstant\tlatency_ns\n");
        for (key, latency) in &self.entries {
            let sign = if key.signed { "signed" } else { "unsigned" };
            let constant = key.constant.map_or("-".to_string(), |c| c.to_string());
            out.push_str(&format!(
                "{}\t{}\t{sign}\t{constant}\t{latency}\n",
                key.operator, key.width
            ));
        }
        out
    }
}

/// Parses a tab- or space-separated timing report.
///
/// Blank lines and lines starting with `#` are ignored.
pub fn parse_timing_report(text: &str) -> Result<TimingReport, DeviceError> {
    let mut report = TimingReport::new();
    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let error = |message: String| DeviceError::TimingParse {
            line: index + 1,
            message,
        };
        let columns: Vec<&str> = line.split_whitespace().collect();
        let [operator, width, signedness, constant, latency] = columns[..] else {
            return Err(error(format!("expected 5 columns, found {}", columns.len())));
        };
        let operator: OperatorKind = operator.parse().map_err(error)?;
        let width: u16 = width
            .parse()
            .map_err(|_| error(format!("invalid width `{width}`")))?;
        let signed = match signedness {
            "signed" => true,
            "unsigned" => false,
            other => return Err(error(format!("invalid signedness `{other}`"))),
        };
        let constant = match constant {
            "-" => None,
            value => Some(
                value
                    .parse::<i128>()
                    .map_err(|_| error(format!("invalid constant `{value}`")))?,
            ),
        };
        let latency: f64 = latency
            .parse()
            .map_err(|_| error(format!("invalid latency `{latency}`")))?;
        report.insert(
            TimingKey {
                operator,
                width,
                signed,
                constant,
            },
            latency,
        );
    }
    Ok(report)
}
