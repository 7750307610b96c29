//! Numeric IDs by which the host selects an entry point.

use crate::error::TransformError;
use foundry_ast::{member_full_name, SyntaxTree};
use std::collections::BTreeMap;

/// Entry points numbered `0..n` in full-name order, plus aliases.
///
/// An alias is the name of a base-type or interface method an entry point
/// implements with the same signature; the host may address the entry point
/// through either name. When several entry points implement one base
/// method, the alias goes to the lowest ID.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberIdTable {
    ids: BTreeMap<String, u32>,
    aliases: BTreeMap<String, u32>,
}

impl MemberIdTable {
    /// Numbers entry points without aliases.
    pub fn from_entry_points(entry_points: &[String]) -> Self {
        let mut sorted = entry_points.to_vec();
        sorted.sort();
        sorted.dedup();
        let ids = sorted.into_iter().zip(0u32..).collect();
        Self {
            ids,
            aliases: BTreeMap::new(),
        }
    }

    /// Numbers entry points and records the aliases found in `tree`.
    pub fn build(tree: &SyntaxTree, entry_points: &[String]) -> Self {
        let mut table = Self::from_entry_points(entry_points);
        let entries: Vec<(String, u32)> = table.ids.iter().map(|(n, i)| (n.clone(), *i)).collect();
        for (entry, id) in entries {
            let Some((owner, method)) = tree.find_method(&entry) else {
                continue;
            };
            let signature: Vec<_> = method.params.iter().map(|p| &p.ty).collect();
            for supertype in tree.supertypes(&owner.name) {
                let Some(base) = tree.find_type(&supertype).and_then(|t| t.method(&method.name))
                else {
                    continue;
                };
                let same_signature = base.return_type == method.return_type
                    && base.params.iter().map(|p| &p.ty).eq(signature.iter().copied());
                let alias = member_full_name(&supertype, &method.name);
                if same_signature && !table.ids.contains_key(&alias) {
                    table.aliases.entry(alias).or_insert(id);
                }
            }
        }
        table
    }

    /// The ID of an entry point or alias.
    pub fn id_of(&self, name: &str) -> Option<u32> {
        self.ids
            .get(name)
            .or_else(|| self.aliases.get(name))
            .copied()
    }

    /// The ID of an entry point or alias; a miss is a compiler defect.
    pub fn lookup(&self, name: &str) -> Result<u32, TransformError> {
        self.id_of(name)
            .ok_or_else(|| TransformError::internal(format!("no member ID for `{name}`")))
    }

    /// Number of entry points.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns `true` if there are no entry points.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Entry points and their IDs, in ID order.
    pub fn entry_points(&self) -> impl Iterator<Item = (&str, u32)> {
        self.ids.iter().map(|(name, id)| (name.as_str(), *id))
    }

    /// Every name the host may use, entry points and aliases.
    pub fn to_map(&self) -> BTreeMap<String, u32> {
        let mut map = self.ids.clone();
        map.extend(self.aliases.iter().map(|(n, i)| (n.clone(), *i)));
        map
    }
}
