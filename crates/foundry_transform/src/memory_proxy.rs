//! The multiplexer between component memory signals and the memory ports.

use crate::naming::{
    cell_index, data_out, read_enable, write_enable, CELL_INDEX_PORT, DATA_OUT_PORT,
    MEMORY_PROXY, READ_ENABLE_PORT, WRITE_ENABLE_PORT,
};
use foundry_ir::{Expr, Process, Statement};

/// Builds the combinational memory proxy over the components that access
/// memory, in the given order.
///
/// Enables are OR-ed together. Address and data come from the first
/// component raising an enable; at most one does so in any cycle, so the
/// order only matters for which branch the logic checks first. With no
/// memory users the ports are tied to zero.
pub fn memory_proxy(components: &[String]) -> Process {
    let mut process = Process::combinational(MEMORY_PROXY);
    let enables = |signal: fn(&str) -> String| {
        Expr::any(components.iter().map(|c| Expr::signal(signal(c))).collect())
    };
    process.body = vec![
        Statement::assign_signal(READ_ENABLE_PORT, enables(read_enable)),
        Statement::assign_signal(WRITE_ENABLE_PORT, enables(write_enable)),
        Statement::assign_signal(CELL_INDEX_PORT, Expr::int(0, 32, false)),
        Statement::assign_signal(DATA_OUT_PORT, Expr::int(0, 32, false)),
    ];

    let mut select = Vec::new();
    for component in components.iter().rev() {
        let active = Expr::any(vec![
            Expr::signal(read_enable(component)),
            Expr::signal(write_enable(component)),
        ]);
        let forward = vec![
            Statement::assign_signal(CELL_INDEX_PORT, Expr::signal(cell_index(component))),
            Statement::assign_signal(DATA_OUT_PORT, Expr::signal(data_out(component))),
        ];
        select = vec![Statement::if_else(active, forward, select)];
    }
    process.body.extend(select);
    process
}
