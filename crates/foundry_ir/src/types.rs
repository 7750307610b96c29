//! Hardware data types and the table ordering their declarations.

use crate::design::DesignError;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A hardware data type.
///
/// Arrays, records and enumerations are custom types: they have a name and
/// must be declared before use.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// A single wire (`std_logic`); used for the clock and reset ports.
    StdLogic,
    /// `boolean`.
    Boolean,
    /// An unsigned bit vector.
    Unsigned(u16),
    /// A two's-complement bit vector.
    Signed(u16),
    /// A fixed-length array.
    Array {
        /// Declared type name.
        name: String,
        /// Element type.
        element: Box<DataType>,
        /// Number of elements.
        length: u32,
    },
    /// A record of named fields.
    Record {
        /// Declared type name.
        name: String,
        /// Fields in declaration order.
        fields: Vec<(String, DataType)>,
    },
    /// An enumeration.
    Enum {
        /// Declared type name.
        name: String,
        /// Variant names in declaration order.
        variants: Vec<String>,
    },
}

impl DataType {
    /// An integer vector of the given width and signedness.
    pub fn int(width: u16, signed: bool) -> Self {
        if signed {
            DataType::Signed(width)
        } else {
            DataType::Unsigned(width)
        }
    }

    /// A fixed-length array with a derived type name.
    pub fn array(element: DataType, length: u32) -> Self {
        DataType::Array {
            name: format!("{}_Array{length}", element.short_name()),
            element: Box::new(element),
            length,
        }
    }

    /// A short name usable inside derived type names.
    pub fn short_name(&self) -> String {
        match self {
            DataType::StdLogic => "std_logic".to_string(),
            DataType::Boolean => "boolean".to_string(),
            DataType::Unsigned(w) => format!("unsigned{w}"),
            DataType::Signed(w) => format!("signed{w}"),
            DataType::Array { name, .. }
            | DataType::Record { name, .. }
            | DataType::Enum { name, .. } => name.clone(),
        }
    }

    /// Returns `true` for types that need a declaration.
    pub fn is_custom(&self) -> bool {
        matches!(
            self,
            DataType::Array { .. } | DataType::Record { .. } | DataType::Enum { .. }
        )
    }

    /// Returns `(width, signed)` for integer vectors.
    pub fn as_int(&self) -> Option<(u16, bool)> {
        match self {
            DataType::Unsigned(w) => Some((*w, false)),
            DataType::Signed(w) => Some((*w, true)),
            _ => None,
        }
    }

    /// The element type of an array.
    pub fn element(&self) -> Option<&DataType> {
        match self {
            DataType::Array { element, .. } => Some(element),
            _ => None,
        }
    }

    /// The type of a record field.
    pub fn field(&self, field: &str) -> Option<&DataType> {
        match self {
            DataType::Record { fields, .. } => {
                fields.iter().find(|(n, _)| n == field).map(|(_, t)| t)
            }
            _ => None,
        }
    }

    /// Custom types this type refers to directly.
    pub fn dependencies(&self) -> Vec<&DataType> {
        match self {
            DataType::Array { element, .. } => {
                if element.is_custom() {
                    vec![element.as_ref()]
                } else {
                    Vec::new()
                }
            }
            DataType::Record { fields, .. } => {
                fields.iter().map(|(_, t)| t).filter(|t| t.is_custom()).collect()
            }
            _ => Vec::new(),
        }
    }
}

/// Collects custom types and orders them so that every type is declared
/// after the types it depends on.
#[derive(Debug, Clone, Default)]
pub struct DependentTypesTable {
    types: BTreeMap<String, DataType>,
}

impl DependentTypesTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a type and, recursively, every custom type it refers to.
    ///
    /// Non-custom types are ignored. Registering a different type under an
    /// existing name is an error.
    pub fn add(&mut self, ty: &DataType) -> Result<(), DesignError> {
        if !ty.is_custom() {
            return Ok(());
        }
        let name = ty.short_name();
        if let Some(existing) = self.types.get(&name) {
            if existing != ty {
                return Err(DesignError::ConflictingType { name });
            }
            return Ok(());
        }
        for dependency in ty.dependencies() {
            self.add(dependency)?;
        }
        self.types.insert(name, ty.clone());
        Ok(())
    }

    /// Number of registered custom types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns `true` if no custom type was registered.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Returns the types in declaration order.
    ///
    /// The order only depends on the registered types, never on the order
    /// they were added in.
    pub fn ordered(&self) -> Result<Vec<DataType>, DesignError> {
        let mut graph: DiGraph<&str, ()> = DiGraph::new();
        let mut nodes: BTreeMap<&str, NodeIndex> = BTreeMap::new();
        for name in self.types.keys() {
            nodes.insert(name.as_str(), graph.add_node(name.as_str()));
        }
        for (name, ty) in &self.types {
            for dependency in ty.dependencies() {
                let dep_name = dependency.short_name();
                if let Some(&from) = nodes.get(dep_name.as_str()) {
                    graph.add_edge(from, nodes[name.as_str()], ());
                }
            }
        }
        let order = toposort(&graph, None).map_err(|cycle| DesignError::CyclicTypes {
            name: graph[cycle.node_id()].to_string(),
        })?;
        Ok(order
            .into_iter()
            .filter_map(|index| self.types.get(graph[index]).cloned())
            .collect())
    }
}
