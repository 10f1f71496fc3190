use std::collections::{BTreeSet, HashMap};
use std::fmt;

use tracing::debug;

use crate::parser::ast::{Ast, BinOp, NodeId, NodeKind, Number, UnaryOp};
use crate::types::builtins::builtin_symbols;
use crate::types::env::{CallStack, Env};
use crate::types::fault::Fault;
use crate::types::history::History;
use crate::types::ty::{ClosureId, ClosureRef, Type, TypeSet, MAX_CONTAINER_DEPTH};

/// Structural problem in the tree that stops an analysis run
#[derive(Debug, Clone, PartialEq)]
pub enum InferError {
    UnrecognizedStatement {
        kind: &'static str,
        line: Option<u32>,
    },
}

impl fmt::Display for InferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InferError::UnrecognizedStatement { kind, .. } => {
                write!(f, "unrecognized node in effect context: {}", kind)
            }
        }
    }
}

impl std::error::Error for InferError {}

/// Outcome of one analysis run
#[derive(Debug, Clone)]
pub struct Analysis {
    /// Result of the top-level block; contains `cont` if it falls through
    pub result: TypeSet,
    pub history: History,
    /// Name nodes that resolved through the built-in table
    pub builtin_uses: BTreeSet<NodeId>,
}

pub(crate) struct ClosureData {
    pub def: NodeId,
    /// Unset until the defining statement has been reached
    pub env: Option<Env>,
    pub defaults: Vec<TypeSet>,
}

pub struct Analyzer<'a> {
    pub(crate) ast: &'a Ast,
    pub(crate) closures: Vec<ClosureData>,
    pub(crate) history: History,
    builtin_uses: BTreeSet<NodeId>,
    next_unknown: u32,
    builtins: HashMap<&'static str, TypeSet>,
}

impl<'a> Analyzer<'a> {
    pub fn new(ast: &'a Ast) -> Self {
        Self {
            ast,
            closures: Vec::new(),
            history: History::new(),
            builtin_uses: BTreeSet::new(),
            next_unknown: 0,
            builtins: builtin_symbols(),
        }
    }

    /// Analyze `root` from an empty environment.
    ///
    /// State from any earlier run is discarded first.
    pub fn analyze(&mut self, root: NodeId) -> Result<Analysis, InferError> {
        self.history.clear();
        self.builtin_uses.clear();
        self.closures.clear();
        self.next_unknown = 0;

        debug!(nodes = self.ast.len(), "analysis started");
        let result = self.infer(root, &Env::new(), &CallStack::new())?;

        let history = std::mem::take(&mut self.history);
        debug!(
            facts = history.len(),
            faults = history.fault_count(),
            closures = self.closures.len(),
            "analysis finished"
        );

        Ok(Analysis {
            result,
            history,
            builtin_uses: std::mem::take(&mut self.builtin_uses),
        })
    }

    pub fn infer(&mut self, node: NodeId, env: &Env, stack: &CallStack) -> Result<TypeSet, InferError> {
        let ast = self.ast;

        let types = match ast.kind(node) {
            NodeKind::Module { body } => self.infer_block(body, env, stack)?,

            // A statement on its own is a one-statement block
            NodeKind::FunctionDef { .. }
            | NodeKind::If { .. }
            | NodeKind::While { .. }
            | NodeKind::Assign { .. }
            | NodeKind::Return { .. }
            | NodeKind::Expr { .. }
            | NodeKind::Pass => self.infer_block(std::slice::from_ref(&node), env, stack)?,

            NodeKind::Num(Number::Int(_)) => Type::primitive("int").into(),
            NodeKind::Num(Number::Float(_)) => Type::primitive("float").into(),
            NodeKind::Str(_) => Type::primitive("str").into(),

            NodeKind::Name(name) => self.infer_name(node, name, env),

            NodeKind::Lambda { params, .. } => {
                let defaults = self.infer_all(&params.defaults, env, stack)?;
                let closure = self.new_closure(node, Some(env.clone()), defaults);
                Type::Closure(closure).into()
            }

            NodeKind::Call {
                func,
                args,
                keywords,
            } => self.invoke(node, *func, args, keywords, env, stack)?,

            NodeKind::Keyword { value, .. } => self.infer(*value, env, stack)?,

            NodeKind::BinOp { left, op, right } => {
                let left = self.infer(*left, env, stack)?;
                let right = self.infer(*right, env, stack)?;
                self.infer_binary_op(*op, &left, &right)
            }

            NodeKind::UnaryOp { op, operand } => {
                let operand = self.infer(*operand, env, stack)?;
                self.infer_unary_op(*op, &operand)
            }

            NodeKind::Compare {
                left, comparators, ..
            } => {
                self.infer(*left, env, stack)?;
                self.infer_all(comparators, env, stack)?;
                Type::primitive("bool").into()
            }

            NodeKind::BoolOp { values, .. } => {
                let mut types = TypeSet::empty();
                for value in values {
                    types.extend(&self.infer(*value, env, stack)?);
                }
                types
            }

            NodeKind::List(elements) => {
                let elements = self.infer_all(elements, env, stack)?;
                self.container(Type::List(elements)).into()
            }

            NodeKind::Tuple(elements) => {
                let elements = self.infer_all(elements, env, stack)?;
                self.container(Type::Tuple(elements)).into()
            }

            NodeKind::Dict { keys, values } => {
                self.infer_all(keys, env, stack)?;
                self.infer_all(values, env, stack)?;
                Type::Dict.into()
            }

            NodeKind::Attribute { value, .. } => {
                self.infer(*value, env, stack)?;
                self.fresh_unknown().into()
            }

            NodeKind::Subscript { value, index } => {
                self.infer(*value, env, stack)?;
                self.infer(*index, env, stack)?;
                self.fresh_unknown().into()
            }
        };

        Ok(types)
    }

    fn infer_all(&mut self, nodes: &[NodeId], env: &Env, stack: &CallStack) -> Result<Vec<TypeSet>, InferError> {
        nodes.iter().map(|node| self.infer(*node, env, stack)).collect()
    }

    fn infer_name(&mut self, node: NodeId, name: &str, env: &Env) -> TypeSet {
        if let Some(binding) = env.lookup(name) {
            let types = binding.types.clone();
            self.history.record(node, &types);
            return types;
        }

        if let Some(types) = self.builtins.get(name) {
            let types = types.clone();
            self.history.record(node, &types);
            self.builtin_uses.insert(node);
            return types;
        }

        let fault = Fault::UnresolvedName {
            name: name.to_string(),
        };
        self.history.record_fault(node, fault.clone());
        Type::Error(fault).into()
    }

    /// Result of `left op right` over every pair of alternatives
    fn infer_binary_op(&mut self, op: BinOp, left: &TypeSet, right: &TypeSet) -> TypeSet {
        let mut result = TypeSet::empty();
        let mut unknown = false;

        for l in left {
            for r in right {
                match binary_op_result(op, l, r) {
                    Some(ty) => {
                        let ty = self.container(ty);
                        result.insert(ty);
                    }
                    None => unknown = true,
                }
            }
        }

        if unknown {
            result.insert(self.fresh_unknown());
        }
        result
    }

    fn infer_unary_op(&mut self, op: UnaryOp, operand: &TypeSet) -> TypeSet {
        if op == UnaryOp::Not {
            return Type::primitive("bool").into();
        }

        let mut result = TypeSet::empty();
        let mut unknown = false;

        for ty in operand {
            match ty.primitive_name() {
                _ if ty.is_bottom() => result.insert(Type::bottom()),
                Some("int" | "bool") => result.insert(Type::primitive("int")),
                Some("float") => result.insert(Type::primitive("float")),
                _ => unknown = true,
            }
        }

        if unknown {
            result.insert(self.fresh_unknown());
        }
        result
    }

    /// Widen lists and tuples that nest too deeply, so recursion over a
    /// growing structure still reaches a repeated call signature
    fn container(&mut self, ty: Type) -> Type {
        if ty.depth() > MAX_CONTAINER_DEPTH {
            self.fresh_unknown()
        } else {
            ty
        }
    }

    pub(crate) fn fresh_unknown(&mut self) -> Type {
        let id = self.next_unknown;
        self.next_unknown += 1;
        Type::Unknown(id)
    }

    pub(crate) fn new_closure(&mut self, def: NodeId, env: Option<Env>, defaults: Vec<TypeSet>) -> ClosureRef {
        let id = ClosureId(self.closures.len() as u32);
        self.closures.push(ClosureData { def, env, defaults });

        let name = match self.ast.kind(def) {
            NodeKind::FunctionDef { name, .. } => Some(name.clone()),
            _ => None,
        };
        ClosureRef { id, def, name }
    }
}

fn is_numeric(name: &str) -> bool {
    matches!(name, "int" | "bool" | "float")
}

fn binary_op_result(op: BinOp, left: &Type, right: &Type) -> Option<Type> {
    if left.is_bottom() || right.is_bottom() {
        return Some(Type::bottom());
    }

    // Concatenation joins every element into one slot so list length
    // cannot grow without bound across recursive calls
    if let (BinOp::Add, Type::List(a), Type::List(b)) = (op, left, right) {
        let mut elements = TypeSet::empty();
        for set in a.iter().chain(b) {
            elements.extend(set);
        }
        if elements.is_empty() {
            return Some(Type::List(Vec::new()));
        }
        return Some(Type::List(vec![elements]));
    }

    let l = left.primitive_name()?;
    if op == BinOp::Mod && l == "str" {
        return Some(Type::primitive("str"));
    }
    let r = right.primitive_name()?;

    match (op, l, r) {
        (BinOp::Div, a, b) if is_numeric(a) && is_numeric(b) => Some(Type::primitive("float")),
        (_, "float", b) if is_numeric(b) => Some(Type::primitive("float")),
        (_, a, "float") if is_numeric(a) => Some(Type::primitive("float")),
        (_, "int" | "bool", "int" | "bool") => Some(Type::primitive("int")),
        (BinOp::Add, "str", "str") => Some(Type::primitive("str")),
        (BinOp::Mult, "str", "int" | "bool") | (BinOp::Mult, "int" | "bool", "str") => {
            Some(Type::primitive("str"))
        }
        _ => None,
    }
}
