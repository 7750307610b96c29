//! VHDL-2008 rendering of a [`Design`].
//!
//! Every name is emitted as an extended identifier (`\Ns.Type::Run.Started\`)
//! so member names can be used verbatim. Rendering is a pure function of the
//! design: equal designs render to byte-identical text.

use crate::design::{Design, CLOCK_PORT, RESET_PORT};
use crate::expr::{BinaryOp, Expr, UnaryOp};
use crate::process::{Process, ProcessKind};
use crate::signal::Direction;
use crate::stmt::{Statement, Target};
use crate::types::DataType;
use crate::value::Value;

const INDENT: &str = "    ";

/// Escapes a name as a VHDL extended identifier.
pub fn escape_identifier(name: &str) -> String {
    format!("\\{}\\", name.replace('\\', "\\\\"))
}

/// Renders a complete design as one VHDL source file.
pub fn render_vhdl(design: &Design) -> String {
    let mut out = String::new();
    out.push_str("-- Generated by Foundry. Do not edit.\n");
    out.push_str("library ieee;\n");
    out.push_str("use ieee.std_logic_1164.all;\n");
    out.push_str("use ieee.numeric_std.all;\n\n");

    let entity = escape_identifier(&design.name);
    out.push_str(&format!("entity {entity} is\n"));
    out.push_str(&format!("{INDENT}port (\n"));
    for (i, port) in design.ports.iter().enumerate() {
        let direction = match port.direction {
            Direction::In => "in",
            Direction::Out => "out",
        };
        let separator = if i + 1 == design.ports.len() { "" } else { ";" };
        out.push_str(&format!(
            "{INDENT}{INDENT}{} : {direction} {}{separator}\n",
            escape_identifier(&port.name),
            type_mark(&port.ty)
        ));
    }
    out.push_str(&format!("{INDENT});\n"));
    out.push_str(&format!("end entity {entity};\n\n"));

    out.push_str(&format!("architecture Imp of {entity} is\n"));
    for ty in &design.types {
        out.push_str(&format!("{INDENT}{}\n", type_declaration(ty)));
    }
    if !design.types.is_empty() {
        out.push('\n');
    }
    for process in &design.processes {
        if process.signals.is_empty() {
            continue;
        }
        out.push_str(&format!("{INDENT}-- {}\n", process.name));
        for signal in &process.signals {
            out.push_str(&format!(
                "{INDENT}signal {} : {} := {};\n",
                escape_identifier(&signal.name),
                type_mark(&signal.ty),
                value(&signal.initial)
            ));
        }
    }
    out.push_str("begin\n");
    for process in &design.processes {
        out.push('\n');
        render_process(process, &mut out);
    }
    out.push_str("end architecture Imp;\n");
    out
}

fn type_mark(ty: &DataType) -> String {
    match ty {
        DataType::StdLogic => "std_logic".to_string(),
        DataType::Boolean => "boolean".to_string(),
        DataType::Unsigned(w) => format!("unsigned({} downto 0)", w.saturating_sub(1)),
        DataType::Signed(w) => format!("signed({} downto 0)", w.saturating_sub(1)),
        DataType::Array { name, .. }
        | DataType::Record { name, .. }
        | DataType::Enum { name, .. } => escape_identifier(name),
    }
}

fn type_declaration(ty: &DataType) -> String {
    match ty {
        DataType::Array {
            name,
            element,
            length,
        } => format!(
            "type {} is array (0 to {}) of {};",
            escape_identifier(name),
            i64::from(*length) - 1,
            type_mark(element)
        ),
        DataType::Record { name, fields } => {
            let mut s = format!("type {} is record", escape_identifier(name));
            for (field, ty) in fields {
                s.push_str(&format!(" {} : {};", escape_identifier(field), type_mark(ty)));
            }
            s.push_str(" end record;");
            s
        }
        DataType::Enum { name, variants } => {
            let variants: Vec<String> = variants.iter().map(|v| escape_identifier(v)).collect();
            format!(
                "type {} is ({});",
                escape_identifier(name),
                variants.join(", ")
            )
        }
        other => format!("-- {} needs no declaration", type_mark(other)),
    }
}

fn value(v: &Value) -> String {
    match v {
        Value::Bool(b) => b.to_string(),
        Value::Int {
            value,
            width,
            signed,
        } => int_literal(*value, *width, *signed),
        Value::Enum(name) => escape_identifier(name),
        Value::Array(items) => match items.first() {
            Some(first) if items.iter().all(|i| i == first) => {
                format!("(others => {})", value(first))
            }
            Some(_) => {
                let items: Vec<String> = items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| format!("{i} => {}", value(item)))
                    .collect();
                format!("({})", items.join(", "))
            }
            None => "(others => '0')".to_string(),
        },
        Value::Record(fields) => {
            let fields: Vec<String> = fields
                .iter()
                .map(|(name, v)| format!("{} => {}", escape_identifier(name), value(v)))
                .collect();
            format!("({})", fields.join(", "))
        }
    }
}

fn int_literal(value: i128, width: u16, signed: bool) -> String {
    let conversion = if signed { "to_signed" } else { "to_unsigned" };
    if (i128::from(i32::MIN)..=i128::from(i32::MAX)).contains(&value) {
        return format!("{conversion}({value}, {width})");
    }
    let mask = if width >= 128 {
        u128::MAX
    } else {
        (1u128 << width) - 1
    };
    let bits = (value as u128) & mask;
    let digits = usize::from(width).div_ceil(4);
    let mark = if signed { "signed" } else { "unsigned" };
    format!("{mark}'(x\"{bits:0digits$X}\")")
}

fn expr(e: &Expr) -> String {
    match e {
        Expr::Literal(v) => value(v),
        Expr::Signal(name) | Expr::Variable(name) => escape_identifier(name),
        Expr::Index { base, index } => format!("{}(to_integer({}))", expr(base), expr(index)),
        Expr::Field { base, name } => format!("{}.{}", expr(base), escape_identifier(name)),
        Expr::Unary { op, operand, .. } => match op {
            UnaryOp::Not => format!("(not {})", expr(operand)),
            UnaryOp::Neg => format!("(-{})", expr(operand)),
        },
        Expr::Binary { op, lhs, rhs, ty } => {
            let (l, r) = (expr(lhs), expr(rhs));
            match op {
                BinaryOp::Mul => {
                    let width = ty.as_int().map_or(0, |(w, _)| w);
                    format!("resize({l} * {r}, {width})")
                }
                BinaryOp::ShiftLeft => format!("shift_left({l}, to_integer({r}))"),
                BinaryOp::ShiftRight => format!("shift_right({l}, to_integer({r}))"),
                _ => format!("({l} {} {r})", operator(*op)),
            }
        }
        Expr::Convert { operand, from, to } => {
            let inner = expr(operand);
            match (from.as_int(), to.as_int()) {
                (Some((_, from_signed)), Some((width, to_signed))) if from_signed == to_signed => {
                    format!("resize({inner}, {width})")
                }
                (Some(_), Some((width, true))) => format!("signed(resize({inner}, {width}))"),
                (Some(_), Some((width, false))) => format!("unsigned(resize({inner}, {width}))"),
                _ => inner,
            }
        }
    }
}

fn operator(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Rem => "rem",
        BinaryOp::And => "and",
        BinaryOp::Or => "or",
        BinaryOp::Xor => "xor",
        BinaryOp::ShiftLeft => "sll",
        BinaryOp::ShiftRight => "srl",
        BinaryOp::Eq => "=",
        BinaryOp::Ne => "/=",
        BinaryOp::Lt => "<",
        BinaryOp::Le => "<=",
        BinaryOp::Gt => ">",
        BinaryOp::Ge => ">=",
    }
}

fn target(t: &Target) -> String {
    match t {
        Target::Signal(name) | Target::Variable(name) => escape_identifier(name),
        Target::Index { base, index } => format!("{}(to_integer({}))", target(base), expr(index)),
        Target::Field { base, name } => format!("{}.{}", target(base), escape_identifier(name)),
    }
}

fn render_process(process: &Process, out: &mut String) {
    let label = escape_identifier(&process.name);
    let sensitivity = match process.kind {
        ProcessKind::Sequential => escape_identifier(CLOCK_PORT),
        ProcessKind::Combinational => "all".to_string(),
    };
    out.push_str(&format!("{INDENT}{label}: process ({sensitivity})\n"));
    for variable in &process.variables {
        out.push_str(&format!(
            "{INDENT}{INDENT}variable {} : {} := {};\n",
            escape_identifier(&variable.name),
            type_mark(&variable.ty),
            value(&variable.initial)
        ));
    }
    out.push_str(&format!("{INDENT}begin\n"));
    match process.kind {
        ProcessKind::Sequential => {
            let pad = INDENT.repeat(2);
            out.push_str(&format!(
                "{pad}if rising_edge({}) then\n",
                escape_identifier(CLOCK_PORT)
            ));
            out.push_str(&format!(
                "{pad}{INDENT}if {} = '1' then\n",
                escape_identifier(RESET_PORT)
            ));
            statements(&process.reset, 4, out);
            out.push_str(&format!("{pad}{INDENT}else\n"));
            statements(&process.body, 4, out);
            out.push_str(&format!("{pad}{INDENT}end if;\n"));
            out.push_str(&format!("{pad}end if;\n"));
        }
        ProcessKind::Combinational => statements(&process.body, 2, out),
    }
    out.push_str(&format!("{INDENT}end process {label};\n"));
}

fn statements(stmts: &[Statement], depth: usize, out: &mut String) {
    let pad = INDENT.repeat(depth);
    if stmts.iter().all(|s| matches!(s, Statement::Comment(_))) {
        for stmt in stmts {
            statement(stmt, depth, out);
        }
        out.push_str(&format!("{pad}null;\n"));
        return;
    }
    for stmt in stmts {
        statement(stmt, depth, out);
    }
}

fn statement(stmt: &Statement, depth: usize, out: &mut String) {
    let pad = INDENT.repeat(depth);
    match stmt {
        Statement::Assign { target: t, value: rhs } => {
            let operator = if t.root().1 { "<=" } else { ":=" };
            out.push_str(&format!("{pad}{} {operator} {};\n", target(t), expr(rhs)));
        }
        Statement::If {
            condition,
            then_body,
            else_body,
        } => {
            out.push_str(&format!("{pad}if {} then\n", expr(condition)));
            statements(then_body, depth + 1, out);
            if !else_body.is_empty() {
                out.push_str(&format!("{pad}else\n"));
                statements(else_body, depth + 1, out);
            }
            out.push_str(&format!("{pad}end if;\n"));
        }
        Statement::Case {
            subject,
            arms,
            default,
        } => {
            out.push_str(&format!("{pad}case {} is\n", expr(subject)));
            for arm in arms {
                out.push_str(&format!("{pad}{INDENT}when {} =>\n", value(&arm.choice)));
                statements(&arm.body, depth + 2, out);
            }
            out.push_str(&format!("{pad}{INDENT}when others =>\n"));
            statements(default, depth + 2, out);
            out.push_str(&format!("{pad}end case;\n"));
        }
        Statement::Comment(text) => {
            for line in text.lines() {
                out.push_str(&format!("{pad}-- {line}\n"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::ArchitectureComponent;
    use crate::signal::{Port, Signal};

    fn design() -> Design {
        let mut c = ArchitectureComponent::new("Ns.T::Run");
        c.add_state();
        c.add_state();
        c.declare_signal(Signal::new("Ns.T::Run.Finished", DataType::Boolean));
        let to_finished = c.transition_to(1);
        c.states[0].body.push(Statement::when(
            Expr::signal("Started"),
            vec![
                Statement::assign_signal("Ns.T::Run.Finished", Expr::bool(true)),
                to_finished,
            ],
        ));
        let mut out = crate::process::Process::combinational("Finisher");
        out.body.push(Statement::assign_signal(
            "Finished",
            Expr::signal("Ns.T::Run.Finished"),
        ));
        Design::assemble(
            "Foundry",
            vec![
                Port::input(CLOCK_PORT, DataType::StdLogic),
                Port::input(RESET_PORT, DataType::StdLogic),
                Port::input("Started", DataType::Boolean),
                Port::output("Finished", DataType::Boolean),
            ],
            vec![c.to_process(), out],
        )
        .unwrap()
    }

    #[test]
    fn escapes_backslashes() {
        assert_eq!(escape_identifier("a.b"), "\\a.b\\");
        assert_eq!(escape_identifier("a\\b"), "\\a\\\\b\\");
    }

    #[test]
    fn renders_entity_and_processes() {
        let text = render_vhdl(&design());
        assert!(text.contains("entity \\Foundry\\ is"));
        assert!(text.contains("\\Finished\\ : out boolean\n"));
        assert!(text.contains("type \\Ns.T::Run._States\\ is (\\Ns.T::Run._State_0\\, \\Ns.T::Run._State_1\\);"));
        assert!(text.contains("signal \\Ns.T::Run.Finished\\ : boolean := false;"));
        assert!(text.contains("if rising_edge(\\Clock\\) then"));
        assert!(text.contains("\\Ns.T::Run._State\\ := \\Ns.T::Run._State_1\\;"));
        assert!(text.contains("process (all)"));
    }

    #[test]
    fn rendering_is_deterministic() {
        assert_eq!(render_vhdl(&design()), render_vhdl(&design()));
    }

    #[test]
    fn wide_literals_use_hex() {
        assert_eq!(int_literal(5, 32, false), "to_unsigned(5, 32)");
        assert_eq!(int_literal(-1, 8, true), "to_signed(-1, 8)");
        assert_eq!(
            int_literal(i128::from(u32::MAX), 32, false),
            "unsigned'(x\"FFFFFFFF\")"
        );
        assert_eq!(
            int_literal(i128::from(i64::MIN), 64, true),
            "signed'(x\"8000000000000000\")"
        );
    }

    #[test]
    fn multiplication_is_resized() {
        let e = Expr::binary(
            BinaryOp::Mul,
            Expr::variable("a"),
            Expr::variable("b"),
            DataType::Unsigned(32),
        );
        assert_eq!(expr(&e), "resize(\\a\\ * \\b\\, 32)");
    }
}
