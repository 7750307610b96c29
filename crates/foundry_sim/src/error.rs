//! Simulation error types.

/// Errors that can occur during simulation setup or execution.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SimError {
    /// A read refers to a signal or port that does not exist.
    #[error("unknown signal `{name}`")]
    UnknownSignal {
        /// The signal name.
        name: String,
    },

    /// A process refers to a variable it does not declare.
    #[error("process `{process}` has no variable `{name}`")]
    UnknownVariable {
        /// The process name.
        process: String,
        /// The variable name.
        name: String,
    },

    /// An input value names something other than an input port.
    #[error("`{name}` is not an input port")]
    NotAnInput {
        /// The offending name.
        name: String,
    },

    /// An operation was applied to a value of the wrong shape.
    #[error("evaluation error: {reason}")]
    EvalError {
        /// Description of what went wrong during evaluation.
        reason: String,
    },

    /// Division or remainder by zero.
    #[error("division by zero")]
    DivisionByZero,

    /// An array index outside the array bounds.
    #[error("index {index} out of range for length {length}")]
    IndexOutOfRange {
        /// The evaluated index.
        index: i128,
        /// The array length.
        length: usize,
    },

    /// Combinational processes did not settle, indicating a loop.
    #[error("combinational logic did not settle after {iterations} iterations")]
    CombinationalLoop {
        /// The iteration limit.
        iterations: usize,
    },

    /// The design did not finish within the cycle limit.
    #[error("no result after {cycles} cycles")]
    Timeout {
        /// The cycle limit.
        cycles: u64,
    },
}

impl SimError {
    pub(crate) fn eval(reason: impl Into<String>) -> Self {
        SimError::EvalError {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_details() {
        let err = SimError::IndexOutOfRange {
            index: 9,
            length: 4,
        };
        assert_eq!(err.to_string(), "index 9 out of range for length 4");
        assert_eq!(
            SimError::Timeout { cycles: 100 }.to_string(),
            "no result after 100 cycles"
        );
    }
}
