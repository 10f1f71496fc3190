use std::fmt;

use crate::parser::ast::NodeId;
use crate::types::fault::Fault;

/// Name of the marker meaning "control fell off the end of a block"
pub const CONT: &str = "cont";
/// Name of the marker for a path detected as non-terminating recursion
pub const BOTTOM: &str = "_|_";

/// Lists and tuples nested deeper than this are widened to an unknown
pub const MAX_CONTAINER_DEPTH: usize = 4;

/// Ordered `(parameter, types)` list describing one call's inputs
pub type Signature = Vec<(String, TypeSet)>;

/// Handle into the analyzer's closure arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClosureId(pub(crate) u32);

impl ClosureId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A closure value as it appears inside a type-set.
///
/// The captured environment and defaults live in the analyzer's arena
/// under `id`, which lets a closure's environment refer back to the
/// closure itself without an ownership cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct ClosureRef {
    pub id: ClosureId,
    pub def: NodeId,
    /// `None` for lambdas
    pub name: Option<String>,
}

impl fmt::Display for ClosureRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "<function {}>", name),
            None => write!(f, "<lambda>"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    /// Fresh placeholder, unique per run
    Unknown(u32),
    Primitive(String),
    ClassRef(String),
    Function { from: Signature, to: TypeSet },
    Closure(ClosureRef),
    Tuple(Vec<TypeSet>),
    List(Vec<TypeSet>),
    /// Opaque: any key and value, so every dict equals every other
    Dict,
    Union(Vec<Type>),
    Error(Fault),
}

impl Type {
    pub fn primitive(name: &str) -> Self {
        Type::Primitive(name.to_string())
    }

    pub fn class(name: &str) -> Self {
        Type::ClassRef(name.to_string())
    }

    pub fn cont() -> Self {
        Type::primitive(CONT)
    }

    pub fn bottom() -> Self {
        Type::primitive(BOTTOM)
    }

    pub fn none() -> Self {
        Type::primitive("NoneType")
    }

    pub fn is_cont(&self) -> bool {
        matches!(self, Type::Primitive(name) if name == CONT)
    }

    pub fn is_bottom(&self) -> bool {
        matches!(self, Type::Primitive(name) if name == BOTTOM)
    }

    pub fn primitive_name(&self) -> Option<&str> {
        match self {
            Type::Primitive(name) => Some(name),
            _ => None,
        }
    }

    /// Nesting depth of list and tuple constructors
    pub fn depth(&self) -> usize {
        match self {
            Type::Tuple(elements) | Type::List(elements) => {
                1 + elements
                    .iter()
                    .flat_map(|set| set.iter())
                    .map(Type::depth)
                    .max()
                    .unwrap_or(0)
            }
            _ => 0,
        }
    }

    /// Shape equality used by the recursion guard.
    ///
    /// Placeholders match any placeholder and closures match when they come
    /// from the same definition, so re-analysing a call whose arguments only
    /// differ by fresh ids or per-invocation closures is still detected.
    pub fn matches(&self, other: &Type) -> bool {
        match (self, other) {
            (Type::Unknown(_), Type::Unknown(_)) => true,
            (Type::Closure(a), Type::Closure(b)) => a.def == b.def,
            (Type::Tuple(a), Type::Tuple(b)) | (Type::List(a), Type::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.matches(y))
            }
            (Type::Function { from: f1, to: t1 }, Type::Function { from: f2, to: t2 }) => {
                f1.len() == f2.len()
                    && f1
                        .iter()
                        .zip(f2)
                        .all(|((n1, s1), (n2, s2))| n1 == n2 && s1.matches(s2))
                    && t1.matches(t2)
            }
            _ => self == other,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Unknown(id) => write!(f, "_{}", id),
            Type::Primitive(name) => write!(f, "{}", name),
            Type::ClassRef(name) => write!(f, "class:{}", name),
            Type::Function { from, to } => {
                let params: Vec<String> = from
                    .iter()
                    .map(|(name, types)| {
                        if types.is_empty() {
                            name.clone()
                        } else {
                            format!("{}: {}", name, types)
                        }
                    })
                    .collect();
                write!(f, "({}) -> {}", params.join(", "), to)
            }
            Type::Closure(closure) => write!(f, "{}", closure),
            Type::Tuple(elements) if elements.len() == 1 => write!(f, "({},)", elements[0]),
            Type::Tuple(elements) => write!(f, "({})", join(elements)),
            Type::List(elements) => write!(f, "[{}]", join(elements)),
            Type::Dict => write!(f, "dict"),
            Type::Union(members) => {
                let parts: Vec<String> = members.iter().map(|t| t.to_string()).collect();
                write!(f, "{}", parts.join(" | "))
            }
            Type::Error(fault) => write!(f, "error: {}", fault),
        }
    }
}

fn join(sets: &[TypeSet]) -> String {
    sets.iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Deduplicated set of alternative types.
///
/// Members keep insertion order for stable output, but equality ignores
/// it. Inserting a `Union` adds its members instead, so sets never nest.
#[derive(Debug, Clone, Default)]
pub struct TypeSet(Vec<Type>);

impl TypeSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn single(ty: Type) -> Self {
        let mut set = Self::empty();
        set.insert(ty);
        set
    }

    pub fn union<I: IntoIterator<Item = Type>>(types: I) -> Self {
        types.into_iter().collect()
    }

    pub fn insert(&mut self, ty: Type) {
        match ty {
            Type::Union(members) => {
                for member in members {
                    self.insert(member);
                }
            }
            ty => {
                if !self.contains(&ty) {
                    self.0.push(ty);
                }
            }
        }
    }

    pub fn extend(&mut self, other: &TypeSet) {
        for ty in &other.0 {
            self.insert(ty.clone());
        }
    }

    pub fn contains(&self, ty: &Type) -> bool {
        self.0.iter().any(|t| t == ty)
    }

    /// Set difference by structural equality
    pub fn without(&self, ty: &Type) -> TypeSet {
        TypeSet(self.0.iter().filter(|t| *t != ty).cloned().collect())
    }

    pub fn is_subset_of(&self, other: &TypeSet) -> bool {
        self.0.iter().all(|t| other.contains(t))
    }

    /// Every member has a shape-equal counterpart in `other`
    pub fn matches_within(&self, other: &TypeSet) -> bool {
        self.0.iter().all(|t| other.0.iter().any(|u| t.matches(u)))
    }

    pub fn matches(&self, other: &TypeSet) -> bool {
        self.matches_within(other) && other.matches_within(self)
    }

    /// A block terminates when control cannot fall off its end
    pub fn terminates(&self) -> bool {
        !self.contains(&Type::cont())
    }

    pub fn finalize(&self) -> TypeSet {
        self.without(&Type::cont())
    }

    /// Replace the fall-through marker with `ty`
    pub fn fall_through_as(&self, ty: Type) -> TypeSet {
        if self.terminates() {
            return self.clone();
        }
        let mut set = self.finalize();
        set.insert(ty);
        set
    }

    /// Collapse to one type: the sole member, or a `Union` of all of them
    pub fn to_type(&self) -> Option<Type> {
        match self.0.as_slice() {
            [] => None,
            [single] => Some(single.clone()),
            members => Some(Type::Union(members.to_vec())),
        }
    }

    pub fn faults(&self) -> impl Iterator<Item = &Fault> {
        self.0.iter().filter_map(|t| match t {
            Type::Error(fault) => Some(fault),
            _ => None,
        })
    }

    pub fn has_faults(&self) -> bool {
        self.faults().next().is_some()
    }

    /// Only the error members
    pub fn errors(&self) -> TypeSet {
        self.faults().cloned().map(Type::Error).collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Type> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl PartialEq for TypeSet {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.is_subset_of(other)
    }
}

impl From<Type> for TypeSet {
    fn from(ty: Type) -> Self {
        TypeSet::single(ty)
    }
}

impl FromIterator<Type> for TypeSet {
    fn from_iter<I: IntoIterator<Item = Type>>(iter: I) -> Self {
        let mut set = TypeSet::empty();
        for ty in iter {
            set.insert(ty);
        }
        set
    }
}

impl<'a> IntoIterator for &'a TypeSet {
    type Item = &'a Type;
    type IntoIter = std::slice::Iter<'a, Type>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for TypeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "?");
        }
        let parts: Vec<String> = self.0.iter().map(|t| t.to_string()).collect();
        write!(f, "{}", parts.join(" | "))
    }
}

/// Binding-list compatibility for the recursion guard: every `(name, types)`
/// in `current` needs a same-name entry in `previous` whose types cover it.
pub fn subtype_bindings(current: &[(String, TypeSet)], previous: &[(String, TypeSet)]) -> bool {
    current.iter().all(|(name, types)| {
        previous
            .iter()
            .any(|(other, other_types)| name == other && types.matches_within(other_types))
    })
}
