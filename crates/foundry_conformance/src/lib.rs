//! Conformance test helpers for the Foundry compiler.
//!
//! Provides the sample programs the integration tests transform, plus thin
//! wrappers running them through the whole pipeline (context → transform)
//! against the built-in default device.

#![warn(missing_docs)]

use foundry_ast::build::*;
use foundry_ast::{IntType, Param, SyntaxTree};
use foundry_config::{load_config_from_str, TransformerConfig, DEFAULT_DEVICE};
use foundry_device::{load_device, DeviceDriver};
use foundry_ir::{Expr, Statement};
use foundry_transform::{
    transform_detailed, NoEvents, Transformation, TransformationContext, TransformError,
    TransformedMember,
};

/// Builds a [`TransformerConfig`] from `foundry.toml` text.
pub fn config_from_toml(text: &str) -> Result<TransformerConfig, TransformError> {
    let project = load_config_from_str(text)?;
    Ok(TransformerConfig::try_from(&project)?)
}

/// A configuration for the default device selecting the given entry points.
pub fn entry_config(entry_points: &[&str]) -> TransformerConfig {
    entry_points
        .iter()
        .fold(TransformerConfig::new(DEFAULT_DEVICE), |config, entry| {
            config.with_entry_point(*entry)
        })
}

/// Transforms `tree` on the default device.
pub fn run(tree: &SyntaxTree, config: &TransformerConfig) -> Result<Transformation, TransformError> {
    let device = load_device(DEFAULT_DEVICE)?;
    run_on(tree, config, &device)
}

/// Transforms `tree` on a caller-provided device.
pub fn run_on(
    tree: &SyntaxTree,
    config: &TransformerConfig,
    device: &dyn DeviceDriver,
) -> Result<Transformation, TransformError> {
    let context = TransformationContext::new(tree, config, device)?;
    transform_detailed(&context, &NoEvents)
}

/// The transformed component called `name` (a member, or `{member}.{i}`
/// for replicas).
pub fn component<'t>(transformation: &'t Transformation, name: &str) -> Option<&'t TransformedMember> {
    transformation.members.iter().find(|m| m.component() == name)
}

/// Returns `true` if some branch in `statements` (at any depth) has a
/// condition reading every signal in `signals`.
pub fn has_branch_on(statements: &[Statement], signals: &[String]) -> bool {
    statements.iter().any(|stmt| match stmt {
        Statement::If {
            condition,
            then_body,
            else_body,
        } => {
            reads_all(condition, signals)
                || has_branch_on(then_body, signals)
                || has_branch_on(else_body, signals)
        }
        Statement::Case { arms, default, .. } => {
            arms.iter().any(|arm| has_branch_on(&arm.body, signals))
                || has_branch_on(default, signals)
        }
        Statement::Assign { .. } | Statement::Comment(_) => false,
    })
}

fn reads_all(condition: &Expr, signals: &[String]) -> bool {
    let mut read = Vec::new();
    condition.signals(&mut read);
    signals.iter().all(|s| read.contains(s))
}

// ---------------------------------------------------------------------------
// Sample programs
// ---------------------------------------------------------------------------

/// `Ns.M::Run(a, b) => a + b` on 32-bit unsigned operands.
pub fn adder() -> SyntaxTree {
    SyntaxTree::new(vec![class("Ns.M")
        .method(public_static(
            "Run",
            vec![param("a", u32_ty()), param("b", u32_ty())],
            u32_ty(),
            vec![ret(add(local("a"), local("b")))],
        ))
        .build()])
}

/// Two entry points reading constants of a shared value type through an
/// unconditionally invoked private helper. `Ns.M::Unused` and
/// `Ns.Limits::Spare` are never referenced.
pub fn shared_constants() -> SyntaxTree {
    SyntaxTree::new(vec![
        structure("Ns.Limits")
            .const_field("Low", u32_ty(), u32_lit(2))
            .const_field("High", u32_ty(), u32_lit(200))
            .const_field("Spare", u32_ty(), u32_lit(7))
            .build(),
        class("Ns.M")
            .method(public_static(
                "First",
                vec![param("a", u32_ty())],
                u32_ty(),
                vec![ret(call_static(
                    "Ns.M::Scale",
                    vec![add(local("a"), static_field("Ns.Limits", "Low"))],
                ))],
            ))
            .method(public_static(
                "Second",
                vec![param("a", u32_ty())],
                u32_ty(),
                vec![ret(call_static(
                    "Ns.M::Scale",
                    vec![sub(static_field("Ns.Limits", "High"), local("a"))],
                ))],
            ))
            .method(private_static(
                "Scale",
                vec![param("v", u32_ty())],
                u32_ty(),
                vec![ret(add(local("v"), local("v")))],
            ))
            .method(private_static(
                "Unused",
                vec![],
                u32_ty(),
                vec![ret(static_field("Ns.Limits", "Spare"))],
            ))
            .build(),
    ])
}

/// `Ns.K::Run` starting `degree` tasks of `Ns.K::Worker` in a counted loop,
/// joining them and returning the sum of the first two results.
pub fn fan_out(degree: i32) -> SyntaxTree {
    fan_out_bounded_by(i32_lit(degree), vec![])
}

/// The fan-out of [`fan_out`] bounded by the parameter `n` of `Ns.K::Run`,
/// so the degree must come from the configuration.
pub fn dynamic_fan_out() -> SyntaxTree {
    fan_out_bounded_by(local("n"), vec![param("n", i32_ty())])
}

fn fan_out_bounded_by(bound: foundry_ast::Expr, params: Vec<Param>) -> SyntaxTree {
    SyntaxTree::new(vec![class("Ns.K")
        .method(public_static(
            "Run",
            params,
            u32_ty(),
            vec![
                declare(
                    "tasks",
                    array_ty(task_ty(u32_ty())),
                    Some(new_array(task_ty(u32_ty()), bound.clone())),
                ),
                for_loop(
                    vec![declare("i", i32_ty(), Some(i32_lit(0)))],
                    lt(local("i"), bound),
                    vec![assign(local("i"), add(local("i"), i32_lit(1)))],
                    vec![assign(
                        index(local("tasks"), local("i")),
                        start_task("Ns.K::Worker", local("i")),
                    )],
                ),
                wait_all(local("tasks")),
                ret(add(
                    task_result(index(local("tasks"), i32_lit(0))),
                    task_result(index(local("tasks"), i32_lit(1))),
                )),
            ],
        ))
        .method(private_static(
            "Worker",
            vec![param("x", u32_ty())],
            u32_ty(),
            vec![ret(add(local("x"), u32_lit(10)))],
        ))
        .build()])
}

/// Two entry points passing arrays of lengths 5 and 6 to the same
/// parameter `Ns.M::Sum.values`.
pub fn conflicting_lengths() -> SyntaxTree {
    array_callers(5, 6)
}

/// `Ns.M::First` and `Ns.M::Second` creating arrays of the given lengths and
/// passing them to `Ns.M::Sum`.
pub fn array_callers(first: i32, second: i32) -> SyntaxTree {
    let caller = |name: &str, length: i32| {
        public_static(
            name,
            vec![],
            u32_ty(),
            vec![
                declare(
                    "a",
                    array_ty(u32_ty()),
                    Some(new_array(u32_ty(), i32_lit(length))),
                ),
                ret(call_static("Ns.M::Sum", vec![local("a")])),
            ],
        )
    };
    SyntaxTree::new(vec![class("Ns.M")
        .method(caller("First", first))
        .method(caller("Second", second))
        .method(private_static(
            "Sum",
            vec![param("values", array_ty(u32_ty()))],
            u32_ty(),
            vec![ret(add(
                index(local("values"), i32_lit(0)),
                index(local("values"), i32_lit(1)),
            ))],
        ))
        .build()])
}

/// `Ns.M::Run(a, b) => a * b` on 64-bit signed operands.
pub fn wide_signed_multiply() -> SyntaxTree {
    let long = || int_ty(IntType::I64);
    SyntaxTree::new(vec![class("Ns.M")
        .method(public_static(
            "Run",
            vec![param("a", long()), param("b", long())],
            long(),
            vec![ret(mul(local("a"), local("b")))],
        ))
        .build()])
}

/// `Ns.M::Run` incrementing memory cell 0 in place.
pub fn memory_increment() -> SyntaxTree {
    SyntaxTree::new(vec![class("Ns.M")
        .method(public_static(
            "Run",
            vec![param("memory", memory_ty())],
            void(),
            vec![
                declare(
                    "x",
                    u32_ty(),
                    Some(memory_read(local("memory"), u32_lit(0))),
                ),
                memory_write(local("memory"), u32_lit(0), add(local("x"), u32_lit(1))),
            ],
        ))
        .build()])
}

/// `Ns.M::Run` writing 1 or 2 to cell 1 depending on cell 0, through two
/// branch-local constants that share the name `x`.
pub fn branch_locals() -> SyntaxTree {
    SyntaxTree::new(vec![class("Ns.M")
        .method(public_static(
            "Run",
            vec![param("memory", memory_ty())],
            void(),
            vec![
                declare(
                    "flag",
                    u32_ty(),
                    Some(memory_read(local("memory"), u32_lit(0))),
                ),
                if_else(
                    eq(local("flag"), u32_lit(0)),
                    vec![
                        declare("x", u32_ty(), Some(u32_lit(1))),
                        memory_write(local("memory"), u32_lit(1), local("x")),
                    ],
                    Some(vec![
                        declare("x", u32_ty(), Some(u32_lit(2))),
                        memory_write(local("memory"), u32_lit(1), local("x")),
                    ]),
                ),
            ],
        ))
        .build()])
}

/// `Ns.M::Run` reading cell 0, doubling it through a private call and
/// writing the result to cell 1.
pub fn memory_call() -> SyntaxTree {
    SyntaxTree::new(vec![class("Ns.M")
        .method(public_static(
            "Run",
            vec![param("memory", memory_ty())],
            void(),
            vec![
                declare(
                    "x",
                    u32_ty(),
                    Some(memory_read(local("memory"), u32_lit(0))),
                ),
                memory_write(
                    local("memory"),
                    u32_lit(1),
                    call_static("Ns.M::Twice", vec![local("x")]),
                ),
            ],
        ))
        .method(private_static(
            "Twice",
            vec![param("v", u32_ty())],
            u32_ty(),
            vec![ret(add(local("v"), local("v")))],
        ))
        .build()])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_selects_entry_points() {
        let config = config_from_toml(
            r#"
[project]
name = "conformance"

[transform]
entry_points = ["Ns.M::Run"]
"#,
        )
        .unwrap();
        assert!(config.is_entry_point("Ns.M::Run"));
        assert_eq!(config.device, DEFAULT_DEVICE);
    }

    #[test]
    fn branch_search_descends_into_bodies() {
        let signals = vec!["a".to_string(), "b".to_string()];
        let nested = vec![Statement::when(
            Expr::bool(true),
            vec![Statement::when(
                Expr::all(vec![Expr::signal("a"), Expr::signal("b")]),
                vec![],
            )],
        )];
        assert!(has_branch_on(&nested, &signals));
        let partial = vec![Statement::when(Expr::signal("a"), vec![])];
        assert!(!has_branch_on(&partial, &signals));
    }
}
