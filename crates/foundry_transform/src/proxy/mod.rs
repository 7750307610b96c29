//! Invocation proxies: the processes that route `Started`/`Finished`
//! handshakes between callers and the components of the members they invoke.
//!
//! Every member with a component gets one internal proxy. Callers never
//! touch a callee's `Started` directly; they raise their own
//! `{caller}.{callee}.{i}.Started` and the callee's proxy allocates a free
//! replica. The host is one more caller, represented by the external proxy.

mod external;
mod internal;

pub use external::external_proxy;
pub use internal::internal_proxy;

use crate::member::TransformedMember;
use crate::naming::EXTERNAL_PROXY;
use foundry_ir::DataType;
use std::collections::BTreeMap;
use std::fmt;

/// One dispatcher slot: invocation index `index` of `caller`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct InvocationSlot {
    /// Component name of the invoking component, or the external proxy.
    pub caller: String,
    /// Invocation index within the caller.
    pub index: u32,
}

/// Collects the slots of every invoked member from the transformed
/// components, plus one external slot per entry point. Slots are sorted by
/// caller name and index.
pub fn collect_slots(
    members: &[TransformedMember],
    entry_points: &[String],
) -> BTreeMap<String, Vec<InvocationSlot>> {
    let mut slots: BTreeMap<String, Vec<InvocationSlot>> = BTreeMap::new();
    for entry in entry_points {
        slots.entry(entry.clone()).or_default().push(InvocationSlot {
            caller: EXTERNAL_PROXY.to_string(),
            index: 0,
        });
    }
    for member in members {
        for (callee, count) in &member.invocations {
            let list = slots.entry(callee.clone()).or_default();
            for index in 0..*count {
                list.push(InvocationSlot {
                    caller: member.component().to_string(),
                    index,
                });
            }
        }
    }
    for list in slots.values_mut() {
        list.sort();
        list.dedup();
    }
    slots
}

/// Names of a proxy's slot state type and its variants.
struct SlotStates {
    type_name: String,
    idle: String,
    done: String,
    running: Vec<String>,
}

impl SlotStates {
    fn new<T: fmt::Display>(proxy: &str, targets: impl IntoIterator<Item = T>) -> Self {
        Self {
            type_name: format!("{proxy}._SlotStates"),
            idle: format!("{proxy}._Idle"),
            done: format!("{proxy}._Done"),
            running: targets
                .into_iter()
                .map(|t| format!("{proxy}._Running_{t}"))
                .collect(),
        }
    }

    fn data_type(&self) -> DataType {
        let mut variants = vec![self.idle.clone()];
        variants.extend(self.running.iter().cloned());
        variants.push(self.done.clone());
        DataType::Enum {
            name: self.type_name.clone(),
            variants,
        }
    }
}
