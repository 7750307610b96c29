//! The static call graph of the pruned program.

use crate::dispatch::DispatchTable;
use crate::error::TransformError;
use crate::typing::Scope;
use foundry_ast::decl::CONSTRUCTOR_NAME;
use foundry_ast::visit::{walk_expr, Visitor};
use foundry_ast::{member_full_name, Expr, SyntaxTree, TypeRef};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::{BTreeMap, BTreeSet};

/// Binds a call expression to the member that runs.
pub(crate) fn call_target(
    scope: &Scope<'_>,
    dispatch: &DispatchTable,
    method: &str,
    receiver: Option<&Expr>,
    is_virtual: bool,
) -> Result<String, TransformError> {
    let receiver_type = match receiver {
        Some(receiver) => match scope.type_of(receiver)? {
            TypeRef::Named(name) => Some(name),
            _ => None,
        },
        None => None,
    };
    dispatch.resolve(
        scope.tree(),
        method,
        is_virtual,
        receiver_type.as_deref(),
        scope.member(),
    )
}

/// The constructor run by `new T(..)`, if `T` declares one.
pub(crate) fn constructor_of(tree: &SyntaxTree, type_name: &str) -> Option<String> {
    let name = member_full_name(type_name, CONSTRUCTOR_NAME);
    tree.find_method(&name)
        .filter(|(_, m)| m.body.is_some())
        .map(|_| name)
}

/// Caller to callee edges between members with bodies.
///
/// Edges cover calls (bound through the dispatch table), constructors run by
/// object creation, and started tasks.
#[derive(Debug, Clone, Default)]
pub struct CallGraph {
    graph: DiGraph<String, ()>,
    nodes: BTreeMap<String, NodeIndex>,
}

struct Callees<'a, 'd> {
    scope: Scope<'a>,
    dispatch: &'d DispatchTable,
    found: BTreeSet<String>,
    error: Option<TransformError>,
}

impl Visitor for Callees<'_, '_> {
    fn visit_expr(&mut self, expr: &Expr) {
        let target = match expr {
            Expr::Call {
                method,
                receiver,
                is_virtual,
                ..
            } => Some(call_target(
                &self.scope,
                self.dispatch,
                method,
                receiver.as_deref(),
                *is_virtual,
            )),
            Expr::StartTask { method, .. } => Some(Ok(method.clone())),
            Expr::New { type_name, .. } => constructor_of(self.scope.tree(), type_name).map(Ok),
            _ => None,
        };
        match target {
            Some(Ok(target)) => {
                self.found.insert(target);
            }
            Some(Err(err)) => {
                self.error.get_or_insert(err);
            }
            None => {}
        }
        walk_expr(self, expr);
    }
}

impl CallGraph {
    /// Builds the graph over every method with a body.
    pub fn build(tree: &SyntaxTree, dispatch: &DispatchTable) -> Result<Self, TransformError> {
        let mut graph = Self::default();
        for (owner, method) in tree.methods() {
            let Some(body) = &method.body else {
                continue;
            };
            let caller = member_full_name(&owner.name, &method.name);
            graph.node(&caller);
            let mut callees = Callees {
                scope: Scope::new(tree, owner, method),
                dispatch,
                found: BTreeSet::new(),
                error: None,
            };
            foundry_ast::walk_block(&mut callees, body);
            if let Some(err) = callees.error {
                return Err(err);
            }
            for callee in callees.found {
                graph.edge(&caller, &callee);
            }
        }
        Ok(graph)
    }

    fn node(&mut self, name: &str) -> NodeIndex {
        if let Some(&index) = self.nodes.get(name) {
            return index;
        }
        let index = self.graph.add_node(name.to_string());
        self.nodes.insert(name.to_string(), index);
        index
    }

    fn edge(&mut self, caller: &str, callee: &str) {
        let from = self.node(caller);
        let to = self.node(callee);
        self.graph.update_edge(from, to, ());
    }

    /// Number of members in the graph.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the graph has no members.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Direct callees of a member, by name.
    pub fn callees(&self, member: &str) -> Vec<String> {
        self.neighbors(member, Direction::Outgoing)
    }

    /// Direct callers of a member, by name.
    pub fn callers(&self, member: &str) -> Vec<String> {
        self.neighbors(member, Direction::Incoming)
    }

    fn neighbors(&self, member: &str, direction: Direction) -> Vec<String> {
        let Some(&index) = self.nodes.get(member) else {
            return Vec::new();
        };
        let names: BTreeSet<String> = self
            .graph
            .neighbors_directed(index, direction)
            .map(|n| self.graph[n].clone())
            .collect();
        names.into_iter().collect()
    }

    /// Members taking part in a recursion, if there is one.
    ///
    /// Returns the members of the first cycle by name.
    pub fn find_recursion(&self) -> Option<Vec<String>> {
        let mut cycles: Vec<Vec<String>> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| {
                scc.len() > 1 || self.graph.find_edge(scc[0], scc[0]).is_some()
            })
            .map(|scc| {
                let mut names: Vec<String> =
                    scc.into_iter().map(|n| self.graph[n].clone()).collect();
                names.sort();
                names
            })
            .collect();
        cycles.sort();
        cycles.into_iter().next()
    }

    /// Every member, callees before their callers, ties broken by name.
    ///
    /// Members on a cycle come last in name order.
    pub fn callees_first(&self) -> Vec<String> {
        let mut pending: BTreeMap<&str, usize> = self
            .nodes
            .iter()
            .map(|(name, &index)| {
                let callees = self
                    .graph
                    .neighbors_directed(index, Direction::Outgoing)
                    .filter(|&n| n != index)
                    .count();
                (name.as_str(), callees)
            })
            .collect();
        let mut ready: BTreeSet<&str> = pending
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(&name, _)| name)
            .collect();
        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(name) = ready.pop_first() {
            pending.remove(name);
            order.push(name.to_string());
            let index = self.nodes[name];
            for caller in self.graph.neighbors_directed(index, Direction::Incoming) {
                if caller == index {
                    continue;
                }
                let caller = self.graph[caller].as_str();
                if let Some(count) = pending.get_mut(caller) {
                    *count -= 1;
                    if *count == 0 {
                        ready.insert(caller);
                    }
                }
            }
        }
        order.extend(pending.keys().map(|name| name.to_string()));
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use foundry_ast::build::*;

    fn graph(tree: &SyntaxTree) -> CallGraph {
        CallGraph::build(tree, &DispatchTable::build(tree)).unwrap()
    }

    fn helper(name: &str, calls: &[&str]) -> foundry_ast::MethodDecl {
        let body = calls
            .iter()
            .map(|c| expr_stmt(call_static(c, vec![])))
            .collect();
        private_static(name, vec![], void(), body)
    }

    #[test]
    fn callees_come_first_with_ties_by_name() {
        let tree = SyntaxTree::new(vec![class("Ns.M")
            .method(helper("Run", &["Ns.M::B", "Ns.M::A"]))
            .method(helper("B", &["Ns.M::C"]))
            .method(helper("A", &[]))
            .method(helper("C", &[]))
            .build()]);
        let graph = graph(&tree);
        assert_eq!(
            graph.callees_first(),
            vec!["Ns.M::A", "Ns.M::C", "Ns.M::B", "Ns.M::Run"]
        );
        assert_eq!(graph.callees("Ns.M::Run"), vec!["Ns.M::A", "Ns.M::B"]);
        assert_eq!(graph.callers("Ns.M::C"), vec!["Ns.M::B"]);
        assert_eq!(graph.find_recursion(), None);
    }

    #[test]
    fn mutual_recursion_is_found() {
        let tree = SyntaxTree::new(vec![class("Ns.M")
            .method(helper("Run", &["Ns.M::Even"]))
            .method(helper("Even", &["Ns.M::Odd"]))
            .method(helper("Odd", &["Ns.M::Even"]))
            .build()]);
        assert_eq!(
            graph(&tree).find_recursion(),
            Some(vec!["Ns.M::Even".to_string(), "Ns.M::Odd".to_string()])
        );
    }

    #[test]
    fn self_calls_are_recursion() {
        let tree = SyntaxTree::new(vec![class("Ns.M")
            .method(helper("Loop", &["Ns.M::Loop"]))
            .build()]);
        assert_eq!(
            graph(&tree).find_recursion(),
            Some(vec!["Ns.M::Loop".to_string()])
        );
    }

    #[test]
    fn constructors_and_tasks_are_edges() {
        let tree = SyntaxTree::new(vec![
            class("Ns.P")
                .field("x", u32_ty())
                .method(constructor(vec![], vec![]))
                .build(),
            class("Ns.M")
                .method(public_static(
                    "Run",
                    vec![],
                    void(),
                    vec![
                        declare("p", named("Ns.P"), Some(new_object("Ns.P", vec![]))),
                        declare(
                            "t",
                            task_ty(u32_ty()),
                            Some(start_task("Ns.M::Work", u32_lit(1))),
                        ),
                    ],
                ))
                .method(private_static(
                    "Work",
                    vec![param("v", u32_ty())],
                    u32_ty(),
                    vec![ret(local("v"))],
                ))
                .build(),
        ]);
        assert_eq!(
            graph(&tree).callees("Ns.M::Run"),
            vec!["Ns.M::Work", "Ns.P::.ctor"]
        );
    }
}
