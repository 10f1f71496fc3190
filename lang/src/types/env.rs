use im::{HashMap, Vector};

use crate::parser::ast::NodeId;
use crate::types::ty::{subtype_bindings, Signature, TypeSet};

#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub types: TypeSet,
    /// Node that introduced the binding, kept for diagnostics only
    pub origin: Option<NodeId>,
}

/// Persistent identifier environment.
///
/// Extending returns a new environment that shares structure with the old
/// one; a later binding of a name shadows the earlier one and the earlier
/// environment is left untouched.
#[derive(Debug, Clone, Default)]
pub struct Env {
    bindings: HashMap<String, Binding>,
}

impl Env {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&self, name: &str, types: TypeSet, origin: Option<NodeId>) -> Env {
        Env {
            bindings: self.bindings.update(name.to_string(), Binding { types, origin }),
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&Binding> {
        self.bindings.get(name)
    }

    /// Join of two branch environments: names bound in only one branch are
    /// dropped, names bound in both get the union of their types.
    pub fn merge(&self, other: &Env) -> Env {
        let bindings = self
            .bindings
            .iter()
            .filter_map(|(name, binding)| {
                other.bindings.get(name).map(|theirs| {
                    let mut types = binding.types.clone();
                    types.extend(&theirs.types);
                    (
                        name.clone(),
                        Binding {
                            types,
                            origin: binding.origin,
                        },
                    )
                })
            })
            .collect();
        Env { bindings }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Frame {
    pub call: NodeId,
    pub signature: Signature,
}

/// Call sites currently being analyzed, innermost last
#[derive(Debug, Clone, Default)]
pub struct CallStack {
    frames: Vector<Frame>,
}

impl CallStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, frame: Frame) -> CallStack {
        let mut frames = self.frames.clone();
        frames.push_back(frame);
        CallStack { frames }
    }

    /// Whether `call` is already being analyzed with inputs covering `signature`
    pub fn contains(&self, call: NodeId, signature: &[(String, TypeSet)]) -> bool {
        self.frames
            .iter()
            .any(|frame| frame.call == call && subtype_bindings(signature, &frame.signature))
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}
