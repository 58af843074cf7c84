//! Plan abstract syntax tree.
//!
//! A [`Plan`] is a forest of named [`TreeDef`]s plus the id of the tree to execute.
//! Node kinds form a closed set; anything the markup can express that is not in
//! this set is rejected while lowering, before any tree is built.

use std::{fmt, time::Duration};

use lazy_static::lazy_static;
use regex::Regex;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

lazy_static! {
    static ref SNAKE_CASE: Regex = Regex::new(r"^[a-z][a-z0-9]*(_[a-z0-9]+)*$").unwrap();
    static ref PLACEHOLDER: Regex = Regex::new(r"^\{([A-Za-z_][A-Za-z0-9_]*)\}$").unwrap();
}

pub const DEFAULT_MAIN_TREE: &str = "MainTree";

#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub main_tree: String,
    pub trees: Vec<TreeDef>,
}

impl Plan {
    pub fn new(main_tree: impl Into<String>, trees: Vec<TreeDef>) -> Self {
        Self {
            main_tree: main_tree.into(),
            trees,
        }
    }

    pub fn tree(&self, id: &str) -> Option<&TreeDef> {
        self.trees.iter().find(|tree| tree.id == id)
    }

    pub fn main(&self) -> Option<&TreeDef> {
        self.tree(&self.main_tree)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TreeDef {
    pub id: String,
    pub root: Node,
}

impl TreeDef {
    pub fn new(id: impl Into<String>, root: Node) -> Self {
        Self {
            id: id.into(),
            root,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Sequence {
        children: Vec<Node>,
    },
    Fallback {
        children: Vec<Node>,
    },
    Retry {
        attempts: RetryLimit,
        child: Box<Node>,
    },
    Timeout {
        budget: Duration,
        child: Box<Node>,
    },
    SubTree {
        id: String,
        bindings: Vec<Binding>,
    },
    Action {
        id: String,
        obj: Option<ObjRef>,
        name: Option<String>,
    },
    Condition {
        id: String,
        obj: ObjRef,
        name: Option<String>,
    },
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Sequence { .. } => NodeKind::Sequence,
            Node::Fallback { .. } => NodeKind::Fallback,
            Node::Retry { .. } => NodeKind::RetryUntilSuccessful,
            Node::Timeout { .. } => NodeKind::Timeout,
            Node::SubTree { .. } => NodeKind::SubTree,
            Node::Action { .. } => NodeKind::Action,
            Node::Condition { .. } => NodeKind::Condition,
        }
    }

    pub fn children(&self) -> Vec<&Node> {
        match self {
            Node::Sequence { children } | Node::Fallback { children } => children.iter().collect(),
            Node::Retry { child, .. } | Node::Timeout { child, .. } => vec![child.as_ref()],
            Node::SubTree { .. } | Node::Action { .. } | Node::Condition { .. } => vec![],
        }
    }

    /// Depth-first, left-to-right pre-order walk.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Node)) {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }

    pub fn sequence(children: Vec<Node>) -> Self {
        Node::Sequence { children }
    }

    pub fn fallback(children: Vec<Node>) -> Self {
        Node::Fallback { children }
    }

    pub fn retry(attempts: RetryLimit, child: Node) -> Self {
        Node::Retry {
            attempts,
            child: Box::new(child),
        }
    }

    pub fn timeout(budget: Duration, child: Node) -> Self {
        Node::Timeout {
            budget,
            child: Box::new(child),
        }
    }

    pub fn action(id: impl Into<String>, obj: Option<&str>) -> Self {
        Node::Action {
            id: id.into(),
            obj: obj.map(ObjRef::from_token),
            name: None,
        }
    }

    pub fn condition(id: impl Into<String>, obj: &str) -> Self {
        Node::Condition {
            id: id.into(),
            obj: ObjRef::from_token(obj),
            name: None,
        }
    }

    pub fn subtree(id: impl Into<String>, bindings: Vec<Binding>) -> Self {
        Node::SubTree {
            id: id.into(),
            bindings,
        }
    }
}

/// Tag names of the plan grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display, AsRefStr, EnumIter)]
pub enum NodeKind {
    #[strum(serialize = "root")]
    Root,
    BehaviorTree,
    Sequence,
    Fallback,
    RetryUntilSuccessful,
    Timeout,
    SubTree,
    Action,
    Condition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryLimit {
    Limited(u32),
    Unbounded,
}

impl RetryLimit {
    pub fn is_exhausted(&self, failures: u32) -> bool {
        match self {
            RetryLimit::Limited(limit) => failures >= *limit,
            RetryLimit::Unbounded => false,
        }
    }
}

impl fmt::Display for RetryLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryLimit::Limited(limit) => write!(f, "{}", limit),
            RetryLimit::Unbounded => write!(f, "-1"),
        }
    }
}

/// An object attribute: a concrete snake_case token or a `{placeholder}` bound by a SubTree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ObjRef {
    Concrete(String),
    Placeholder(String),
}

impl ObjRef {
    /// Parses an attribute value, returning `None` when it is neither form.
    ///
    /// ```
    /// # use embodied_bt::ast::ObjRef;
    /// assert_eq!(ObjRef::parse("kitchen_table"), Some(ObjRef::Concrete("kitchen_table".into())));
    /// assert_eq!(ObjRef::parse("{target}"), Some(ObjRef::Placeholder("target".into())));
    /// assert_eq!(ObjRef::parse("Kitchen Table"), None);
    /// ```
    pub fn parse(value: &str) -> Option<Self> {
        if is_snake_case(value) {
            return Some(ObjRef::Concrete(value.to_string()));
        }
        PLACEHOLDER
            .captures(value)
            .and_then(|captures| captures.get(1))
            .map(|name| ObjRef::Placeholder(name.as_str().to_string()))
    }

    fn from_token(value: &str) -> Self {
        ObjRef::parse(value).unwrap_or_else(|| ObjRef::Concrete(value.to_string()))
    }

    pub fn concrete(&self) -> Option<&str> {
        match self {
            ObjRef::Concrete(value) => Some(value),
            ObjRef::Placeholder(_) => None,
        }
    }
}

impl fmt::Display for ObjRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjRef::Concrete(value) => write!(f, "{}", value),
            ObjRef::Placeholder(name) => write!(f, "{{{}}}", name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub formal: String,
    pub value: ObjRef,
}

impl Binding {
    pub fn new(formal: impl Into<String>, value: &str) -> Self {
        Self {
            formal: formal.into(),
            value: ObjRef::from_token(value),
        }
    }
}

pub fn is_snake_case(value: &str) -> bool {
    SNAKE_CASE.is_match(value)
}
