use std::collections::BTreeMap;

use crate::parser::ast::NodeId;
use crate::types::fault::Fault;
use crate::types::ty::{Type, TypeSet};

/// Every fact learned about each node during one analysis run.
///
/// Facts only accumulate: recording unions into the existing entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct History {
    facts: BTreeMap<NodeId, TypeSet>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, node: NodeId, types: &TypeSet) {
        self.facts.entry(node).or_default().extend(types);
    }

    pub fn record_fault(&mut self, node: NodeId, fault: Fault) {
        self.facts.entry(node).or_default().insert(Type::Error(fault));
    }

    pub fn get(&self, node: NodeId) -> Option<&TypeSet> {
        self.facts.get(&node)
    }

    pub fn clear(&mut self) {
        self.facts.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &TypeSet)> {
        self.facts.iter().map(|(node, types)| (*node, types))
    }

    pub fn fault_count(&self) -> usize {
        self.facts.values().map(|types| types.faults().count()).sum()
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }
}
