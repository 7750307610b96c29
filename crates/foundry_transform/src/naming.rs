//! Names of ports and handshake signals.
//!
//! A component is named by its member's full name (`Ns.Type::Run`), or
//! `{name}.{i}` for the replicas of a member instantiated more than once.
//! Everything a component drives is prefixed with its name, so signal names
//! never collide across components.

/// Port selecting the entry point to run.
pub const MEMBER_ID_PORT: &str = "MemberId";
/// Port starting the selected entry point.
pub const STARTED_PORT: &str = "Started";
/// Port signalling that the entry point finished.
pub const FINISHED_PORT: &str = "Finished";
/// Memory data read by the last read.
pub const DATA_IN_PORT: &str = "DataIn";
/// Memory data to write.
pub const DATA_OUT_PORT: &str = "DataOut";
/// Memory cell address.
pub const CELL_INDEX_PORT: &str = "CellIndex";
/// Memory read request.
pub const READ_ENABLE_PORT: &str = "ReadEnable";
/// Memory write request.
pub const WRITE_ENABLE_PORT: &str = "WriteEnable";
/// Memory read acknowledgement.
pub const READS_DONE_PORT: &str = "ReadsDone";
/// Memory write acknowledgement.
pub const WRITES_DONE_PORT: &str = "WritesDone";

/// Name of the host-facing dispatcher process.
pub const EXTERNAL_PROXY: &str = "ExternalInvocationProxy";
/// Name of the memory multiplexer process.
pub const MEMORY_PROXY: &str = "SimpleMemoryProxy";
/// Name of the implicit receiver parameter of instance members.
pub const THIS_PARAMETER: &str = "this";

/// The component name of replica `index` of a member with `instances` copies.
pub fn component_name(member: &str, index: u32, instances: u32) -> String {
    if instances > 1 {
        format!("{member}.{index}")
    } else {
        member.to_string()
    }
}

/// The internal proxy process of an invoked member.
pub fn internal_proxy(member: &str) -> String {
    format!("{member}.InvocationProxy")
}

/// `{C}.Started`, driven by the component's internal proxy.
pub fn started(component: &str) -> String {
    format!("{component}.Started")
}

/// `{C}.Finished`, driven by the component.
pub fn finished(component: &str) -> String {
    format!("{component}.Finished")
}

/// `{C}.{param}.parameter.In`, driven by the component's internal proxy.
pub fn parameter_in(component: &str, param: &str) -> String {
    format!("{component}.{param}.parameter.In")
}

/// `{C}.{param}.parameter.Out`, driven by the component.
pub fn parameter_out(component: &str, param: &str) -> String {
    format!("{component}.{param}.parameter.Out")
}

/// `{C}.return`, driven by the component.
pub fn return_value(component: &str) -> String {
    format!("{component}.return")
}

/// `{caller}.{callee}.{i}.Started`, driven by the caller.
pub fn invocation_started(caller: &str, callee: &str, index: u32) -> String {
    format!("{caller}.{callee}.{index}.Started")
}

/// `{caller}.{callee}.{i}.Finished`, driven by the callee's internal proxy.
pub fn invocation_finished(caller: &str, callee: &str, index: u32) -> String {
    format!("{caller}.{callee}.{index}.Finished")
}

/// `{caller}.{callee}.{param}.parameter.Out.{i}`, driven by the caller.
pub fn forwarded_parameter_out(caller: &str, callee: &str, param: &str, index: u32) -> String {
    format!("{caller}.{callee}.{param}.parameter.Out.{index}")
}

/// `{caller}.{callee}.{param}.parameter.In.{i}`, driven by the callee's
/// internal proxy.
pub fn forwarded_parameter_in(caller: &str, callee: &str, param: &str, index: u32) -> String {
    format!("{caller}.{callee}.{param}.parameter.In.{index}")
}

/// `{caller}.{callee}.return.{i}`, driven by the callee's internal proxy.
pub fn forwarded_return(caller: &str, callee: &str, index: u32) -> String {
    format!("{caller}.{callee}.return.{index}")
}

/// `{C}.CellIndex`.
pub fn cell_index(component: &str) -> String {
    format!("{component}.{CELL_INDEX_PORT}")
}

/// `{C}.DataOut`.
pub fn data_out(component: &str) -> String {
    format!("{component}.{DATA_OUT_PORT}")
}

/// `{C}.ReadEnable`.
pub fn read_enable(component: &str) -> String {
    format!("{component}.{READ_ENABLE_PORT}")
}

/// `{C}.WriteEnable`.
pub fn write_enable(component: &str) -> String {
    format!("{component}.{WRITE_ENABLE_PORT}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replicas_are_suffixed_only_when_replicated() {
        assert_eq!(component_name("Ns.T::Worker", 0, 1), "Ns.T::Worker");
        assert_eq!(component_name("Ns.T::Worker", 3, 4), "Ns.T::Worker.3");
    }

    #[test]
    fn caller_side_names() {
        assert_eq!(
            forwarded_parameter_out("Ns.T::Run", "Ns.T::Worker", "seed", 2),
            "Ns.T::Run.Ns.T::Worker.seed.parameter.Out.2"
        );
        assert_eq!(
            invocation_finished("Ns.T::Run", "Ns.T::Worker", 0),
            "Ns.T::Run.Ns.T::Worker.0.Finished"
        );
        assert_eq!(forwarded_return("A", "B", 1), "A.B.return.1");
    }
}
