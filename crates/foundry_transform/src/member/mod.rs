//! Lowering of one method body into a clocked state machine.
//!
//! A member becomes an [`ArchitectureComponent`] with two fixed states and a
//! body:
//!
//! - state 0 waits for `{C}.Started` and copies parameters in,
//! - state 1 asserts `{C}.Finished` until `Started` drops,
//! - states from 2 on run the body.
//!
//! Statements stay in the current state until something forces a clock
//! edge: a multi-cycle operation, a state budget overflow, control flow, an
//! invocation of another member or a memory access.

mod interface;
mod lower_expr;
mod lower_stmt;

pub use interface::{build_interfaces, InterfaceParam, MemberInterface};

use crate::codes::warning_endless_loop;
use crate::context::Program;
use crate::error::TransformError;
use crate::naming::{
    component_name, finished, parameter_in, parameter_out, return_value, started, THIS_PARAMETER,
};
use crate::typing::{local_holder, HardwareTypes, Scope};
use foundry_config::TransformerConfig;
use foundry_diagnostics::Diagnostic;
use foundry_ir::{
    ArchitectureComponent, ArchitectureComponentResult, DataType, Expr, Signal, Statement, Target,
    Variable,
};
use foundry_timing::OperationTimer;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// A signal carrying one parameter between an invoking and an invoked
/// component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSignal {
    /// Signal name.
    pub name: String,
    /// Full name of the member the parameter belongs to.
    pub target_member: String,
    /// Parameter name.
    pub parameter: String,
    /// Replica or invocation slot index.
    pub index: u32,
    /// `true` on the invoked component's own side, `false` on the caller's.
    pub is_own: bool,
}

/// One transformed replica of a member.
#[derive(Debug, Clone)]
pub struct TransformedMember {
    /// Full member name.
    pub member: String,
    /// Replica index.
    pub index: u32,
    /// The state machine, its process and warnings.
    pub result: ArchitectureComponentResult,
    /// Invocation slots used per callee.
    pub invocations: BTreeMap<String, u32>,
    /// Parameter signals on both sides of every invocation.
    pub parameter_signals: Vec<ParameterSignal>,
    /// Whether the component drives memory signals.
    pub uses_memory: bool,
}

impl TransformedMember {
    /// The component name.
    pub fn component(&self) -> &str {
        &self.result.component.name
    }
}

/// Copy-back of a by-reference argument once an invocation finishes.
#[derive(Debug, Clone)]
struct CopyBack {
    index: u32,
    parameter: String,
    target: Target,
}

/// A task array filled by a fan-out and awaited by a join.
#[derive(Debug, Clone)]
struct TaskArray {
    callee: String,
    degree: u32,
    results: Option<String>,
    copy_back: Vec<CopyBack>,
    joined: bool,
}

pub(crate) struct Lowering<'p> {
    program: &'p Program,
    config: &'p TransformerConfig,
    timer: OperationTimer<'p>,
    scope: Scope<'p>,
    types: HardwareTypes<'p>,
    interface: &'p MemberInterface,
    member: String,
    index: u32,
    component: ArchitectureComponent,
    current: usize,
    terminated: bool,
    loop_exits: Vec<usize>,
    temps: u32,
    operations: u32,
    invocations: BTreeMap<String, u32>,
    parameter_signals: Vec<ParameterSignal>,
    task_arrays: BTreeMap<String, TaskArray>,
    uses_memory: bool,
    warnings: Vec<Diagnostic>,
}

/// Transforms replica `index` of `member` into a state machine.
pub fn transform_member(
    program: &Program,
    config: &TransformerConfig,
    timer: OperationTimer<'_>,
    member: &str,
    index: u32,
) -> Result<TransformedMember, TransformError> {
    let (owner, method) = program
        .tree
        .find_method(member)
        .ok_or_else(|| TransformError::internal(format!("unknown member `{member}`")))?;
    let body = method
        .body
        .as_ref()
        .ok_or_else(|| TransformError::internal(format!("`{member}` has no body")))?;
    let interface = program.interface(member)?;

    let mut lowering = Lowering {
        program,
        config,
        timer,
        scope: Scope::new(&program.tree, owner, method),
        types: HardwareTypes::new(&program.tree, &program.arrays),
        interface,
        member: member.to_string(),
        index,
        component: ArchitectureComponent::new(component_name(
            member,
            index,
            interface.instances,
        )),
        current: 0,
        terminated: false,
        loop_exits: Vec::new(),
        temps: 0,
        operations: 0,
        invocations: BTreeMap::new(),
        parameter_signals: Vec::new(),
        task_arrays: BTreeMap::new(),
        uses_memory: false,
        warnings: Vec::new(),
    };
    lowering.begin();
    lowering.block(body)?;
    if !lowering.terminated {
        lowering.finish();
    }
    debug!(
        component = %lowering.component.name,
        states = lowering.component.states.len(),
        "member transformed"
    );

    let Lowering {
        component,
        invocations,
        parameter_signals,
        uses_memory,
        warnings,
        ..
    } = lowering;
    Ok(TransformedMember {
        member: member.to_string(),
        index,
        result: component.into_result(warnings),
        invocations,
        parameter_signals,
        uses_memory,
    })
}

impl<'p> Lowering<'p> {
    /// The component name.
    fn name(&self) -> &str {
        &self.component.name
    }

    fn unsupported(&self, construct: impl Into<String>) -> TransformError {
        TransformError::unsupported(construct, &self.member)
    }

    fn emit(&mut self, statement: Statement) {
        self.component.states[self.current].body.push(statement);
    }

    fn goto(&mut self, state: usize) {
        let transition = self.component.transition_to(state);
        self.emit(transition);
    }

    fn new_state(&mut self) -> usize {
        self.component.add_state()
    }

    /// Ends the current state and continues in a fresh one.
    fn advance(&mut self) -> usize {
        let next = self.new_state();
        self.goto(next);
        self.current = next;
        next
    }

    fn declare_signal(&mut self, name: &str, ty: DataType) {
        self.component.declare_signal(Signal::new(name, ty));
    }

    fn declare_variable(&mut self, name: &str, ty: DataType) {
        self.component.declare_variable(Variable::new(name, ty));
    }

    fn record_signal(&mut self, signal: ParameterSignal) {
        if !self.parameter_signals.contains(&signal) {
            self.parameter_signals.push(signal);
        }
    }

    /// A fresh variable for an intermediate value.
    fn temp(&mut self, ty: DataType) -> String {
        let name = format!("{}._Temp{}", self.name(), self.temps);
        self.temps += 1;
        self.declare_variable(&name, ty);
        name
    }

    /// Stores a compound value in a temporary so later states see the value
    /// it had now.
    fn materialize(&mut self, value: Expr, ty: DataType) -> Expr {
        if matches!(value, Expr::Literal(_) | Expr::Variable(_)) {
            return value;
        }
        let temp = self.temp(ty);
        self.emit(Statement::assign_variable(&temp, value));
        Expr::variable(temp)
    }

    /// The variable backing a local or parameter, or `None` if it has no
    /// hardware value.
    fn local_variable(&mut self, name: &str) -> Result<Option<(String, DataType)>, TransformError> {
        let ty = self
            .scope
            .local_type(name)
            .cloned()
            .ok_or_else(|| TransformError::internal(format!("unknown local `{name}`")))?;
        let holder = local_holder(&self.member, name);
        let Some(dt) = self.types.data_type(&ty, &holder, &self.member)? else {
            return Ok(None);
        };
        let variable = format!("{}.{name}", self.name());
        self.declare_variable(&variable, dt.clone());
        Ok(Some((variable, dt)))
    }

    /// The variable holding the receiver, if the member has one.
    fn this_variable(&mut self) -> Option<(String, DataType)> {
        let param = self.interface.param(THIS_PARAMETER)?;
        let variable = format!("{}.{THIS_PARAMETER}", self.name());
        self.declare_variable(&variable, param.ty.clone());
        Some((variable, param.ty.clone()))
    }

    /// Sets up the wait-for-start and finished states.
    fn begin(&mut self) {
        let wait = self.new_state();
        let done = self.new_state();
        let body = self.new_state();
        let component = self.name().to_string();

        let mut copy_in = Vec::new();
        for param in &self.interface.params {
            let variable = format!("{component}.{}", param.name);
            self.component
                .declare_variable(Variable::new(&variable, param.ty.clone()));
            let input = parameter_in(&component, &param.name);
            copy_in.push(Statement::assign_variable(&variable, Expr::signal(&input)));
            self.parameter_signals.push(ParameterSignal {
                name: input,
                target_member: self.member.clone(),
                parameter: param.name.clone(),
                index: self.index,
                is_own: true,
            });
            if param.by_reference {
                let output = parameter_out(&component, &param.name);
                self.component
                    .declare_signal(Signal::new(&output, param.ty.clone()));
                self.parameter_signals.push(ParameterSignal {
                    name: output,
                    target_member: self.member.clone(),
                    parameter: param.name.clone(),
                    index: self.index,
                    is_own: true,
                });
            }
        }
        copy_in.push(self.component.transition_to(body));
        self.component.states[wait].body =
            vec![Statement::when(Expr::signal(started(&component)), copy_in)];

        let finished_signal = finished(&component);
        self.declare_signal(&finished_signal, DataType::Boolean);
        if let Some(ty) = self.interface.return_type.clone() {
            self.declare_signal(&return_value(&component), ty);
        }
        let to_wait = self.component.transition_to(wait);
        self.component.states[done].body = vec![
            Statement::assign_signal(&finished_signal, Expr::bool(true)),
            Statement::when(
                Expr::invert(Expr::signal(started(&component))),
                vec![
                    Statement::assign_signal(&finished_signal, Expr::bool(false)),
                    to_wait,
                ],
            ),
        ];
        self.current = body;
    }

    /// Publishes by-reference parameters and moves to the finished state.
    fn finish(&mut self) {
        let component = self.name().to_string();
        let outputs: Vec<Statement> = self
            .interface
            .params
            .iter()
            .filter(|p| p.by_reference)
            .map(|p| {
                Statement::assign_signal(
                    parameter_out(&component, &p.name),
                    Expr::variable(format!("{component}.{}", p.name)),
                )
            })
            .collect();
        for statement in outputs {
            self.emit(statement);
        }
        self.goto(ArchitectureComponent::FINISHED);
        self.terminated = true;
    }

    fn warn_endless_loop(&mut self) {
        self.warnings.push(warning_endless_loop(&self.member));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::TransformationContext;
    use crate::error::ErrorKind;
    use crate::naming::{forwarded_parameter_out, invocation_started};
    use foundry_ast as ast;
    use foundry_ast::build::*;
    use foundry_ast::{BinaryOp, SyntaxTree};
    use foundry_config::DEFAULT_DEVICE;
    use foundry_device::load_device;

    fn lower(tree: SyntaxTree, member: &str) -> Result<TransformedMember, TransformError> {
        let device = load_device(DEFAULT_DEVICE).unwrap();
        let config = TransformerConfig::new(DEFAULT_DEVICE).with_entry_point("Ns.K::Run");
        let context = TransformationContext::new(&tree, &config, &device)?;
        let program = Program::build(&context)?;
        transform_member(&program, &config, context.timer(), member, 0)
    }

    fn kernel(params: Vec<ast::Param>, ret_ty: ast::TypeRef, body: ast::Block) -> SyntaxTree {
        SyntaxTree::new(vec![class("Ns.K")
            .method(public_static("Run", params, ret_ty, body))
            .build()])
    }

    fn ab() -> Vec<ast::Param> {
        vec![param("a", u32_ty()), param("b", u32_ty())]
    }

    #[test]
    fn addition_fits_in_the_first_body_state() {
        let tree = kernel(ab(), u32_ty(), vec![ret(add(local("a"), local("b")))]);
        let member = lower(tree, "Ns.K::Run").unwrap();
        let component = &member.result.component;
        assert_eq!(component.states.len(), 3);
        assert_eq!(component.multi_cycle_operations.len(), 1);
        assert_eq!(component.multi_cycle_operations[0].cycles, 1);
        assert_eq!(component.multi_cycle_operations[0].result, "Ns.K::Run.add.0");
        assert!(component.states[2].required_clock_cycles > 0.0);
        assert!(component.signals.iter().any(|s| s.name == "Ns.K::Run.return"));
        assert!(component.signals.iter().any(|s| s.name == "Ns.K::Run.Finished"));
        assert!(!member.uses_memory);
    }

    #[test]
    fn parameters_are_own_signals() {
        let tree = kernel(ab(), u32_ty(), vec![ret(local("a"))]);
        let member = lower(tree, "Ns.K::Run").unwrap();
        let names: Vec<&str> = member
            .parameter_signals
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(
            names,
            ["Ns.K::Run.a.parameter.In", "Ns.K::Run.b.parameter.In"]
        );
        assert!(member.parameter_signals.iter().all(|s| s.is_own));
    }

    #[test]
    fn division_holds_for_its_latency() {
        let tree = kernel(
            ab(),
            u32_ty(),
            vec![ret(bin(BinaryOp::Div, local("a"), local("b")))],
        );
        let member = lower(tree, "Ns.K::Run").unwrap();
        let component = &member.result.component;
        let op = &component.multi_cycle_operations[0];
        assert!(op.cycles > 1);
        assert!(component.signals.iter().any(|s| s.name == op.result));
        assert!(component.variables.iter().any(|v| v.name == "Ns.K::Run._Cycles"));
        // wait, finished, issue, hold, continue
        assert_eq!(component.states.len(), 5);
    }

    #[test]
    fn exhausted_clock_budget_starts_a_new_state() {
        let product = mul(mul(mul(local("a"), local("b")), local("a")), local("b"));
        let tree = kernel(ab(), u32_ty(), vec![ret(product)]);
        let member = lower(tree, "Ns.K::Run").unwrap();
        let component = &member.result.component;
        assert_eq!(component.multi_cycle_operations.len(), 3);
        assert!(component.states.len() > 3);
        assert!(component
            .variables
            .iter()
            .any(|v| v.name.starts_with("Ns.K::Run._Temp")));
        for state in &component.states {
            assert!(state.required_clock_cycles <= 1.0);
        }
    }

    #[test]
    fn call_waits_for_the_callee() {
        let tree = SyntaxTree::new(vec![class("Ns.K")
            .method(public_static(
                "Run",
                ab(),
                u32_ty(),
                vec![ret(call_static("Ns.K::Twice", vec![local("a")]))],
            ))
            .method(private_static(
                "Twice",
                vec![param("x", u32_ty())],
                u32_ty(),
                vec![ret(add(local("x"), local("x")))],
            ))
            .build()]);
        let member = lower(tree, "Ns.K::Run").unwrap();
        assert_eq!(member.invocations.get("Ns.K::Twice"), Some(&1));
        let forwarded = forwarded_parameter_out("Ns.K::Run", "Ns.K::Twice", "x", 0);
        assert!(member
            .parameter_signals
            .iter()
            .any(|s| s.name == forwarded && !s.is_own));
        let started = invocation_started("Ns.K::Run", "Ns.K::Twice", 0);
        assert!(member.result.component.signals.iter().any(|s| s.name == started));
    }

    #[test]
    fn endless_loop_warns() {
        let body = vec![
            declare("n", u32_ty(), Some(u32_lit(0))),
            while_loop(
                boolean(true),
                vec![assign(local("n"), add(local("n"), u32_lit(1)))],
            ),
        ];
        let tree = kernel(vec![], void(), body);
        let member = lower(tree, "Ns.K::Run").unwrap();
        assert_eq!(member.result.warnings.len(), 1);
        assert_eq!(member.result.warnings[0].code.to_string(), "W302");
    }

    #[test]
    fn loop_with_break_does_not_warn() {
        let body = vec![
            declare("n", u32_ty(), Some(u32_lit(0))),
            while_loop(
                boolean(true),
                vec![
                    assign(local("n"), add(local("n"), u32_lit(1))),
                    if_else(eq(local("n"), u32_lit(10)), vec![brk()], None),
                ],
            ),
        ];
        let tree = kernel(vec![], void(), body);
        let member = lower(tree, "Ns.K::Run").unwrap();
        assert!(member.result.warnings.is_empty());
    }

    #[test]
    fn memory_access_declares_memory_signals() {
        let body = vec![memory_write(
            local("memory"),
            u32_lit(1),
            add(memory_read(local("memory"), u32_lit(0)), u32_lit(1)),
        )];
        let tree = kernel(vec![param("memory", memory_ty())], void(), body);
        let member = lower(tree, "Ns.K::Run").unwrap();
        assert!(member.uses_memory);
        let signals: Vec<&str> = member
            .result
            .component
            .signals
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        for name in ["CellIndex", "DataOut", "ReadEnable", "WriteEnable"] {
            assert!(signals.contains(&format!("Ns.K::Run.{name}").as_str()));
        }
    }

    #[test]
    fn null_is_unsupported() {
        let body = vec![if_else(
            eq(local("a"), null()),
            vec![ret_void()],
            None,
        )];
        let tree = kernel(vec![param("a", u32_ty())], void(), body);
        let err = lower(tree, "Ns.K::Run").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedConstruct);
    }
}
