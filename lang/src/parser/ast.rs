//! Syntax tree for the analyzed Python subset.
//!
//! Nodes live in an [`Ast`] arena and are addressed by [`NodeId`] handles.
//! Node identity is what the inference engine keys its per-node facts by,
//! so two structurally identical expressions at different places in the
//! source are different nodes.

use std::fmt;

/// Handle to a node in an [`Ast`] arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    /// 1-indexed source line, used only to order reports
    pub line: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Module {
        body: Vec<NodeId>,
    },

    // Statements
    FunctionDef {
        name: String,
        params: Params,
        body: Vec<NodeId>,
    },
    If {
        test: NodeId,
        body: Vec<NodeId>,
        orelse: Vec<NodeId>,
    },
    While {
        test: NodeId,
        body: Vec<NodeId>,
    },
    Assign {
        targets: Vec<NodeId>,
        value: NodeId,
    },
    Return {
        value: Option<NodeId>,
    },
    Expr {
        value: NodeId,
    },
    Pass,

    // Expressions
    Num(Number),
    Str(String),
    Name(String),
    Lambda {
        params: Params,
        body: NodeId,
    },
    Call {
        func: NodeId,
        args: Vec<NodeId>,
        keywords: Vec<NodeId>,
    },
    Keyword {
        arg: String,
        value: NodeId,
    },
    BinOp {
        left: NodeId,
        op: BinOp,
        right: NodeId,
    },
    UnaryOp {
        op: UnaryOp,
        operand: NodeId,
    },
    Compare {
        left: NodeId,
        ops: Vec<CmpOp>,
        comparators: Vec<NodeId>,
    },
    BoolOp {
        op: BoolOp,
        values: Vec<NodeId>,
    },
    List(Vec<NodeId>),
    Tuple(Vec<NodeId>),
    Dict {
        keys: Vec<NodeId>,
        values: Vec<NodeId>,
    },
    Attribute {
        value: NodeId,
        attr: String,
    },
    Subscript {
        value: NodeId,
        index: NodeId,
    },
}

/// Formal parameter list of a `def` or `lambda`.
///
/// `args`, `vararg` and `kwarg` are `Name` nodes. `defaults` line up with
/// the trailing entries of `args`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    pub args: Vec<NodeId>,
    pub vararg: Option<NodeId>,
    pub kwarg: Option<NodeId>,
    pub defaults: Vec<NodeId>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,      // +
    Sub,      // -
    Mult,     // *
    Div,      // /
    FloorDiv, // //
    Mod,      // %
    Pow,      // **
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,  // not
    Neg,  // -
    Plus, // +
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    In,
    NotIn,
    Is,
    IsNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
}

/// Arena owning every node of one parsed program
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ast {
    nodes: Vec<Node>,
}

impl Ast {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: NodeKind, line: Option<u32>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node { kind, line });
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.node(id).kind
    }

    pub fn line(&self, id: NodeId) -> Option<u32> {
        self.node(id).line
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All node ids in allocation order
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len() as u32).map(NodeId)
    }

    /// Identifier of a `Name` node
    pub fn name_of(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Name(name) => Some(name),
            _ => None,
        }
    }

    /// Short label used when reporting facts about a node
    pub fn describe(&self, id: NodeId) -> String {
        match self.kind(id) {
            NodeKind::Module { .. } => "module".to_string(),
            NodeKind::FunctionDef { name, .. } => format!("def {}", name),
            NodeKind::If { .. } => "if".to_string(),
            NodeKind::While { .. } => "while".to_string(),
            NodeKind::Assign { targets, .. } => match targets.first() {
                Some(target) => format!("assignment to {}", self.describe(*target)),
                None => "assignment".to_string(),
            },
            NodeKind::Return { .. } => "return".to_string(),
            NodeKind::Expr { value } => self.describe(*value),
            NodeKind::Pass => "pass".to_string(),
            NodeKind::Num(Number::Int(n)) => n.to_string(),
            NodeKind::Num(Number::Float(n)) => n.to_string(),
            NodeKind::Str(s) => format!("{:?}", s),
            NodeKind::Name(name) => name.clone(),
            NodeKind::Lambda { .. } => "lambda".to_string(),
            NodeKind::Call { func, .. } => format!("call {}", self.describe(*func)),
            NodeKind::Keyword { arg, .. } => format!("{}=", arg),
            NodeKind::BinOp { .. } => "binary operation".to_string(),
            NodeKind::UnaryOp { .. } => "unary operation".to_string(),
            NodeKind::Compare { .. } => "comparison".to_string(),
            NodeKind::BoolOp { .. } => "boolean operation".to_string(),
            NodeKind::List(_) => "list".to_string(),
            NodeKind::Tuple(_) => "tuple".to_string(),
            NodeKind::Dict { .. } => "dict".to_string(),
            NodeKind::Attribute { value, attr } => format!("{}.{}", self.describe(*value), attr),
            NodeKind::Subscript { value, .. } => format!("{}[...]", self.describe(*value)),
        }
    }
}

impl NodeKind {
    /// Kind name used in hard-failure messages
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Module { .. } => "Module",
            NodeKind::FunctionDef { .. } => "FunctionDef",
            NodeKind::If { .. } => "If",
            NodeKind::While { .. } => "While",
            NodeKind::Assign { .. } => "Assign",
            NodeKind::Return { .. } => "Return",
            NodeKind::Expr { .. } => "Expr",
            NodeKind::Pass => "Pass",
            NodeKind::Num(_) => "Num",
            NodeKind::Str(_) => "Str",
            NodeKind::Name(_) => "Name",
            NodeKind::Lambda { .. } => "Lambda",
            NodeKind::Call { .. } => "Call",
            NodeKind::Keyword { .. } => "Keyword",
            NodeKind::BinOp { .. } => "BinOp",
            NodeKind::UnaryOp { .. } => "UnaryOp",
            NodeKind::Compare { .. } => "Compare",
            NodeKind::BoolOp { .. } => "BoolOp",
            NodeKind::List(_) => "List",
            NodeKind::Tuple(_) => "Tuple",
            NodeKind::Dict { .. } => "Dict",
            NodeKind::Attribute { .. } => "Attribute",
            NodeKind::Subscript { .. } => "Subscript",
        }
    }
}

/// A parsed program: the node arena plus its root `Module`
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub ast: Ast,
    pub root: NodeId,
}
