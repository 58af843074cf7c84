//! # Subtree Resolver
//!
//! Eliminates `SubTree` references before the first tick. Each reference is
//! replaced by the referenced tree's root with every `{placeholder}` object
//! substituted by the bound concrete token:
//!
//! ```text
//! <SubTree ID="T_Navigate" target="apple"/>      <Action ID="NAVIGATE_TO" obj="apple"/>
//!           +                                 =>
//! <BehaviorTree ID="T_Navigate">
//!   <Action ID="NAVIGATE_TO" obj="{target}"/>
//! </BehaviorTree>
//! ```
//!
//! A binding value may itself be a placeholder of the enclosing tree, so
//! substitution chains through nested subtrees.
//!
//! Resolution fails on an undefined reference, a binding whose formal is not
//! used by the referenced tree, a placeholder left unbound, and any cycle in the
//! tree reference graph. Cycles are detected up front over the whole forest,
//! including trees the main tree never reaches.

use std::collections::{BTreeSet, HashMap};

use thiserror::Error;

use crate::ast::{Binding, Node, ObjRef, Plan};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResolveError {
    #[error("main tree `{0}` is not defined")]
    MissingMainTree(String),
    #[error("SubTree in `{from}` references undefined tree `{id}`")]
    UndefinedTree { id: String, from: String },
    #[error("cyclic SubTree reference: {cycle}")]
    CyclicReference { cycle: String },
    #[error("binding `{formal}` does not match any placeholder used by tree `{tree}`")]
    UnusedBinding { tree: String, formal: String },
    #[error("placeholder `{{{placeholder}}}` in tree `{tree}` is not bound")]
    UnboundPlaceholder { tree: String, placeholder: String },
    #[error("inlined main tree exceeds {limit} nodes")]
    ExpansionLimit { limit: usize },
}

/// Node budget for an inlined main tree when none is configured.
pub const DEFAULT_EXPANSION_LIMIT: usize = 10_000;

pub type ResolveResult<T> = Result<T, ResolveError>;

/// A plan whose main tree has every SubTree inlined and every object concrete.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPlan {
    source: Plan,
    root: Node,
}

impl ResolvedPlan {
    /// The plan as parsed, SubTree references intact.
    pub fn source(&self) -> &Plan {
        &self.source
    }

    /// The inlined main tree.
    pub fn root(&self) -> &Node {
        &self.root
    }

}

pub fn resolve(plan: &Plan) -> ResolveResult<ResolvedPlan> {
    resolve_with_limit(plan, DEFAULT_EXPANSION_LIMIT)
}

/// Resolves `plan`, failing once the inlined main tree would exceed
/// `max_nodes` nodes.
#[tracing::instrument(level = "debug", skip(plan), fields(main = %plan.main_tree))]
pub fn resolve_with_limit(plan: &Plan, max_nodes: usize) -> ResolveResult<ResolvedPlan> {
    let main = plan
        .main()
        .ok_or_else(|| ResolveError::MissingMainTree(plan.main_tree.clone()))?;
    check_cycles(plan)?;

    let mut resolver = Resolver {
        plan,
        max_nodes,
        expanded: 0,
    };
    let root = resolver.expand(&main.root, &main.id, &HashMap::new())?;
    tracing::debug!(nodes = resolver.expanded, "resolved main tree `{}`", main.id);
    Ok(ResolvedPlan {
        source: plan.clone(),
        root,
    })
}

/// Placeholders a tree uses directly, in its own leaves and SubTree bindings.
pub fn placeholders_used(root: &Node) -> BTreeSet<String> {
    let mut used = BTreeSet::new();
    root.walk(&mut |node| match node {
        Node::Action {
            obj: Some(ObjRef::Placeholder(name)),
            ..
        }
        | Node::Condition {
            obj: ObjRef::Placeholder(name),
            ..
        } => {
            used.insert(name.clone());
        }
        Node::SubTree { bindings, .. } => {
            for binding in bindings {
                if let ObjRef::Placeholder(name) = &binding.value {
                    used.insert(name.clone());
                }
            }
        }
        _ => {}
    });
    used
}

fn references(root: &Node) -> Vec<&str> {
    let mut ids = Vec::new();
    root.walk(&mut |node| {
        if let Node::SubTree { id, .. } = node {
            ids.push(id.as_str());
        }
    });
    ids
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Depth-first search over the tree reference graph.
fn check_cycles(plan: &Plan) -> ResolveResult<()> {
    let mut marks: HashMap<&str, Mark> = plan
        .trees
        .iter()
        .map(|tree| (tree.id.as_str(), Mark::Unvisited))
        .collect();
    let mut path: Vec<&str> = Vec::new();

    fn visit<'a>(
        plan: &'a Plan,
        id: &'a str,
        from: &str,
        marks: &mut HashMap<&'a str, Mark>,
        path: &mut Vec<&'a str>,
    ) -> ResolveResult<()> {
        match marks.get(id).copied() {
            None => {
                return Err(ResolveError::UndefinedTree {
                    id: id.to_string(),
                    from: from.to_string(),
                })
            }
            Some(Mark::Done) => return Ok(()),
            Some(Mark::InProgress) => {
                let start = path.iter().position(|step| *step == id).unwrap_or(0);
                let mut cycle: Vec<&str> = path[start..].to_vec();
                cycle.push(id);
                return Err(ResolveError::CyclicReference {
                    cycle: cycle.join(" -> "),
                });
            }
            Some(Mark::Unvisited) => {}
        }

        marks.insert(id, Mark::InProgress);
        path.push(id);
        if let Some(tree) = plan.tree(id) {
            for next in references(&tree.root) {
                visit(plan, next, id, marks, path)?;
            }
        }
        path.pop();
        marks.insert(id, Mark::Done);
        Ok(())
    }

    for tree in &plan.trees {
        visit(plan, &tree.id, &plan.main_tree, &mut marks, &mut path)?;
    }
    Ok(())
}

struct Resolver<'a> {
    plan: &'a Plan,
    max_nodes: usize,
    /// Nodes emitted so far, SubTree references excluded.
    expanded: usize,
}

impl Resolver<'_> {
    /// Expands `node`, which belongs to tree `tree`, under placeholder environment `env`.
    fn expand(
        &mut self,
        node: &Node,
        tree: &str,
        env: &HashMap<String, String>,
    ) -> ResolveResult<Node> {
        if !matches!(node, Node::SubTree { .. }) {
            self.expanded += 1;
            if self.expanded > self.max_nodes {
                return Err(ResolveError::ExpansionLimit {
                    limit: self.max_nodes,
                });
            }
        }
        match node {
            Node::Sequence { children } => Ok(Node::Sequence {
                children: self.expand_all(children, tree, env)?,
            }),
            Node::Fallback { children } => Ok(Node::Fallback {
                children: self.expand_all(children, tree, env)?,
            }),
            Node::Retry { attempts, child } => Ok(Node::Retry {
                attempts: *attempts,
                child: Box::new(self.expand(child, tree, env)?),
            }),
            Node::Timeout { budget, child } => Ok(Node::Timeout {
                budget: *budget,
                child: Box::new(self.expand(child, tree, env)?),
            }),
            Node::Action { id, obj, name } => Ok(Node::Action {
                id: id.clone(),
                obj: obj
                    .as_ref()
                    .map(|obj| substitute(obj, tree, env))
                    .transpose()?,
                name: name.clone(),
            }),
            Node::Condition { id, obj, name } => Ok(Node::Condition {
                id: id.clone(),
                obj: substitute(obj, tree, env)?,
                name: name.clone(),
            }),
            Node::SubTree { id, bindings } => self.inline(id, bindings, tree, env),
        }
    }

    fn expand_all(
        &mut self,
        children: &[Node],
        tree: &str,
        env: &HashMap<String, String>,
    ) -> ResolveResult<Vec<Node>> {
        children
            .iter()
            .map(|child| self.expand(child, tree, env))
            .collect()
    }

    fn inline(
        &mut self,
        id: &str,
        bindings: &[Binding],
        tree: &str,
        env: &HashMap<String, String>,
    ) -> ResolveResult<Node> {
        let target = self
            .plan
            .tree(id)
            .ok_or_else(|| ResolveError::UndefinedTree {
                id: id.to_string(),
                from: tree.to_string(),
            })?;

        let used = placeholders_used(&target.root);
        let mut inner_env = HashMap::new();
        for binding in bindings {
            if !used.contains(&binding.formal) {
                return Err(ResolveError::UnusedBinding {
                    tree: id.to_string(),
                    formal: binding.formal.clone(),
                });
            }
            let value = match substitute(&binding.value, tree, env)? {
                ObjRef::Concrete(value) => value,
                ObjRef::Placeholder(name) => {
                    return Err(ResolveError::UnboundPlaceholder {
                        tree: tree.to_string(),
                        placeholder: name,
                    })
                }
            };
            inner_env.insert(binding.formal.clone(), value);
        }

        tracing::trace!(subtree = id, from = tree, "inlining");
        self.expand(&target.root, id, &inner_env)
    }
}

fn substitute(obj: &ObjRef, tree: &str, env: &HashMap<String, String>) -> ResolveResult<ObjRef> {
    match obj {
        ObjRef::Concrete(_) => Ok(obj.clone()),
        ObjRef::Placeholder(name) => env
            .get(name)
            .map(|value| ObjRef::Concrete(value.clone()))
            .ok_or_else(|| ResolveError::UnboundPlaceholder {
                tree: tree.to_string(),
                placeholder: name.clone(),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::TreeDef;
    use pretty_assertions::assert_eq;

    fn navigate_tree() -> TreeDef {
        TreeDef::new("T_Navigate", Node::action("NAVIGATE_TO", Some("{target}")))
    }

    #[test]
    fn test_inlines_with_substitution() {
        let plan = Plan::new(
            "MainTree",
            vec![
                TreeDef::new(
                    "MainTree",
                    Node::sequence(vec![
                        Node::subtree("T_Navigate", vec![Binding::new("target", "apple")]),
                        Node::action("GRASP", Some("apple")),
                    ]),
                ),
                navigate_tree(),
            ],
        );
        let resolved = resolve(&plan).unwrap();
        assert_eq!(
            resolved.root(),
            &Node::sequence(vec![
                Node::action("NAVIGATE_TO", Some("apple")),
                Node::action("GRASP", Some("apple")),
            ])
        );
        assert_eq!(resolved.source(), &plan);
    }

    #[test]
    fn test_nested_placeholder_chain() {
        let plan = Plan::new(
            "MainTree",
            vec![
                TreeDef::new(
                    "MainTree",
                    Node::subtree("T_Fetch", vec![Binding::new("item", "cup")]),
                ),
                TreeDef::new(
                    "T_Fetch",
                    Node::sequence(vec![
                        Node::subtree("T_Navigate", vec![Binding::new("target", "{item}")]),
                        Node::action("GRASP", Some("{item}")),
                    ]),
                ),
                navigate_tree(),
            ],
        );
        let resolved = resolve(&plan).unwrap();
        assert_eq!(
            resolved.root(),
            &Node::sequence(vec![
                Node::action("NAVIGATE_TO", Some("cup")),
                Node::action("GRASP", Some("cup")),
            ])
        );
    }

    #[test]
    fn test_direct_cycle() {
        let plan = Plan::new(
            "MainTree",
            vec![TreeDef::new("MainTree", Node::subtree("MainTree", vec![]))],
        );
        assert_eq!(
            resolve(&plan).unwrap_err(),
            ResolveError::CyclicReference {
                cycle: "MainTree -> MainTree".to_string()
            }
        );
    }

    #[test]
    fn test_transitive_cycle_in_unreached_trees() {
        let plan = Plan::new(
            "MainTree",
            vec![
                TreeDef::new("MainTree", Node::action("RELEASE", None)),
                TreeDef::new("A", Node::subtree("B", vec![])),
                TreeDef::new("B", Node::subtree("A", vec![])),
            ],
        );
        assert_eq!(
            resolve(&plan).unwrap_err(),
            ResolveError::CyclicReference {
                cycle: "A -> B -> A".to_string()
            }
        );
    }

    #[test]
    fn test_unused_binding() {
        let plan = Plan::new(
            "MainTree",
            vec![
                TreeDef::new(
                    "MainTree",
                    Node::subtree(
                        "T_Navigate",
                        vec![Binding::new("target", "apple"), Binding::new("dest", "table")],
                    ),
                ),
                navigate_tree(),
            ],
        );
        assert_eq!(
            resolve(&plan).unwrap_err(),
            ResolveError::UnusedBinding {
                tree: "T_Navigate".to_string(),
                formal: "dest".to_string()
            }
        );
    }

    #[test]
    fn test_unbound_placeholder() {
        let plan = Plan::new(
            "MainTree",
            vec![
                TreeDef::new("MainTree", Node::subtree("T_Navigate", vec![])),
                navigate_tree(),
            ],
        );
        assert_eq!(
            resolve(&plan).unwrap_err(),
            ResolveError::UnboundPlaceholder {
                tree: "T_Navigate".to_string(),
                placeholder: "target".to_string()
            }
        );
    }

    #[test]
    fn test_undefined_reference() {
        let plan = Plan::new(
            "MainTree",
            vec![TreeDef::new("MainTree", Node::subtree("Missing", vec![]))],
        );
        assert!(matches!(
            resolve(&plan).unwrap_err(),
            ResolveError::UndefinedTree { id, .. } if id == "Missing"
        ));
    }

    #[test]
    fn test_placeholders_used() {
        let root = Node::sequence(vec![
            Node::action("GRASP", Some("{x}")),
            Node::condition("IS_OPEN", "{y}"),
            Node::subtree("T", vec![Binding::new("a", "{z}"), Binding::new("b", "c")]),
        ]);
        let used: Vec<String> = placeholders_used(&root).into_iter().collect();
        assert_eq!(used, vec!["x", "y", "z"]);
    }

    /// `T_i` references `T_{i+1}` twice, so the inlined size doubles per level.
    fn doubling_chain(depth: usize) -> Plan {
        let mut trees = vec![TreeDef::new("MainTree", Node::subtree("T_0", vec![]))];
        for i in 0..depth {
            let next = format!("T_{}", i + 1);
            trees.push(TreeDef::new(
                format!("T_{}", i),
                Node::sequence(vec![
                    Node::subtree(&next, vec![]),
                    Node::subtree(&next, vec![]),
                ]),
            ));
        }
        trees.push(TreeDef::new(
            format!("T_{}", depth),
            Node::action("RELEASE", None),
        ));
        Plan::new("MainTree", trees)
    }

    #[test]
    fn test_expansion_limit() {
        // 2^4 leaves plus 15 sequences
        let small = doubling_chain(4);
        assert!(resolve_with_limit(&small, 31).is_ok());
        assert_eq!(
            resolve_with_limit(&small, 30).unwrap_err(),
            ResolveError::ExpansionLimit { limit: 30 }
        );

        let deep = doubling_chain(40);
        assert_eq!(
            resolve(&deep).unwrap_err(),
            ResolveError::ExpansionLimit {
                limit: DEFAULT_EXPANSION_LIMIT
            }
        );
    }
}
