//! The hardware-visible signature of a member.

use crate::array_size::ArraySizeTable;
use crate::error::TransformError;
use crate::naming::{component_name, THIS_PARAMETER};
use crate::parallel::ReplicationPlan;
use crate::typing::{is_reference_type, local_holder, return_holder, HardwareTypes};
use foundry_ast::{member_full_name, MethodDecl, SyntaxTree, TypeDecl};
use foundry_ir::DataType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One parameter that travels over parameter signals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceParam {
    /// Parameter name; [`THIS_PARAMETER`] for the receiver.
    pub name: String,
    /// Hardware type.
    pub ty: DataType,
    /// Whether the callee's final value is copied back to the caller.
    pub by_reference: bool,
}

/// Parameters, return type and instance count of a member.
///
/// Parameters without a hardware value (the memory handle, storage-less
/// objects) are absent. The receiver of an instance member comes first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberInterface {
    /// Full member name.
    pub member: String,
    /// Parameters in signal order.
    pub params: Vec<InterfaceParam>,
    /// Return type, if the member returns a hardware value.
    pub return_type: Option<DataType>,
    /// Number of physical replicas.
    pub instances: u32,
}

impl MemberInterface {
    /// Builds the interface of `owner::method`.
    pub fn build(
        tree: &SyntaxTree,
        types: &HardwareTypes<'_>,
        owner: &TypeDecl,
        method: &MethodDecl,
        instances: u32,
    ) -> Result<Self, TransformError> {
        let member = member_full_name(&owner.name, &method.name);
        let mut params = Vec::new();
        if method.is_instance() {
            if let Some(ty) = types.record_type(&owner.name, &member)? {
                params.push(InterfaceParam {
                    name: THIS_PARAMETER.to_string(),
                    ty,
                    by_reference: true,
                });
            }
        }
        for param in &method.params {
            let holder = local_holder(&member, &param.name);
            if let Some(ty) = types.data_type(&param.ty, &holder, &member)? {
                params.push(InterfaceParam {
                    name: param.name.clone(),
                    ty,
                    by_reference: is_reference_type(tree, &param.ty),
                });
            }
        }
        let return_type = types.data_type(&method.return_type, &return_holder(&member), &member)?;
        Ok(Self {
            member,
            params,
            return_type,
            instances,
        })
    }

    /// Looks up a parameter.
    pub fn param(&self, name: &str) -> Option<&InterfaceParam> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Component names of every replica, in index order.
    pub fn component_names(&self) -> Vec<String> {
        (0..self.instances)
            .map(|i| component_name(&self.member, i, self.instances))
            .collect()
    }
}

/// Builds the interface of every member with a body.
pub fn build_interfaces(
    tree: &SyntaxTree,
    arrays: &ArraySizeTable,
    replication: &ReplicationPlan,
) -> Result<BTreeMap<String, MemberInterface>, TransformError> {
    let types = HardwareTypes::new(tree, arrays);
    let mut interfaces = BTreeMap::new();
    for (owner, method) in tree.methods() {
        if method.body.is_none() {
            continue;
        }
        let member = member_full_name(&owner.name, &method.name);
        let instances = replication.instances(&member);
        let interface = MemberInterface::build(tree, &types, owner, method, instances)?;
        interfaces.insert(member, interface);
    }
    Ok(interfaces)
}

#[cfg(test)]
mod tests {
    use super::*;
    use foundry_ast::build::*;

    fn tree() -> SyntaxTree {
        SyntaxTree::new(vec![
            class("Ns.Acc")
                .field("total", u32_ty())
                .method(public_instance(
                    "Add",
                    vec![
                        param("values", array_ty(u32_ty())),
                        param("memory", memory_ty()),
                        param("scale", u32_ty()),
                    ],
                    u32_ty(),
                    vec![ret(field(this(), "Ns.Acc", "total"))],
                ))
                .build(),
            class("Ns.Empty")
                .method(public_instance("Nop", vec![], void(), vec![ret_void()]))
                .build(),
        ])
    }

    #[test]
    fn receiver_first_and_memory_dropped() {
        let tree = tree();
        let mut arrays = ArraySizeTable::new();
        arrays.set_size("Ns.Acc::Add.values", 8).unwrap();
        let interfaces = build_interfaces(&tree, &arrays, &ReplicationPlan::default()).unwrap();
        let add = &interfaces["Ns.Acc::Add"];
        let names: Vec<&str> = add.params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["this", "values", "scale"]);
        assert!(add.params[0].by_reference);
        assert!(add.params[1].by_reference);
        assert!(!add.params[2].by_reference);
        assert_eq!(add.params[1].ty, DataType::array(DataType::int(32, false), 8));
        assert_eq!(add.return_type, Some(DataType::int(32, false)));
        assert_eq!(add.component_names(), ["Ns.Acc::Add".to_string()]);
    }

    #[test]
    fn storage_less_receiver_has_no_parameter() {
        let tree = tree();
        let mut arrays = ArraySizeTable::new();
        arrays.set_size("Ns.Acc::Add.values", 8).unwrap();
        let interfaces = build_interfaces(&tree, &arrays, &ReplicationPlan::default()).unwrap();
        let nop = &interfaces["Ns.Empty::Nop"];
        assert!(nop.params.is_empty());
        assert_eq!(nop.return_type, None);
    }
}
