//! Plan lowering.
//!
//! Turns the markup [`Element`] tree into an [`ast::Plan`], enforcing the plan
//! grammar:
//!
//! ```text
//! <root main_tree_to_execute="MainTree">
//!   <BehaviorTree ID="MainTree">
//!     <Sequence>
//!       <SubTree ID="T_Navigate" target="apple"/>
//!       <RetryUntilSuccessful num_attempts="3">
//!         <Action ID="GRASP" obj="apple"/>
//!       </RetryUntilSuccessful>
//!       <Timeout msec="5000"><Action ID="PLACE_ON_TOP" obj="table"/></Timeout>
//!       <Action ID="RELEASE"/>
//!     </Sequence>
//!   </BehaviorTree>
//!   <BehaviorTree ID="T_Navigate">
//!     <Action ID="NAVIGATE_TO" obj="{target}"/>
//!   </BehaviorTree>
//! </root>
//! ```
//!
//! Lowering is total: the first violation aborts and no partial plan escapes.

use std::{collections::HashSet, str::FromStr, time::Duration};

use super::markup::Element;
use crate::analyzer::error::PlanParseError;
use crate::ast::{self, Binding, NodeKind, ObjRef, RetryLimit};
use crate::primitive::{self, ParamRole};
use crate::tokenizer::token::Span;

const MAIN_TREE_ATTRIBUTE: &str = "main_tree_to_execute";
// accepted on <root> and ignored
const FORMAT_ATTRIBUTE: &str = "BTCPP_format";
// accepted on <SubTree> and ignored
const SUBTREE_IGNORED: [&str; 2] = ["name", "__autoremap"];

type LowerResult<T> = Result<T, PlanParseError>;

/// Lowers a document element into a plan.
#[tracing::instrument(level = "debug", skip(document))]
pub fn lower(document: &Element) -> LowerResult<ast::Plan> {
    PlanLowering::default().lower_root(document)
}

#[derive(Default)]
struct PlanLowering {
    subtree_refs: Vec<(String, Span)>,
}

impl PlanLowering {
    fn lower_root(mut self, root: &Element) -> LowerResult<ast::Plan> {
        if !matches!(NodeKind::from_str(&root.name), Ok(NodeKind::Root)) {
            return Err(PlanParseError::NotRoot {
                found: root.name.clone(),
                span: root.span.clone(),
            });
        }
        check_attributes(root, &[MAIN_TREE_ATTRIBUTE, FORMAT_ATTRIBUTE])?;
        reject_text(root)?;

        let main_tree = root
            .attribute(MAIN_TREE_ATTRIBUTE)
            .unwrap_or(ast::DEFAULT_MAIN_TREE)
            .to_string();

        let mut trees: Vec<ast::TreeDef> = Vec::new();
        for element in root.child_elements() {
            match NodeKind::from_str(&element.name) {
                Ok(NodeKind::BehaviorTree) => {
                    let tree = self.lower_tree(element)?;
                    if trees.iter().any(|existing| existing.id == tree.id) {
                        return Err(PlanParseError::DuplicateTree {
                            id: tree.id,
                            span: element.span.clone(),
                        });
                    }
                    trees.push(tree);
                }
                Ok(_) => return Err(misplaced(element, root)),
                Err(_) => return Err(unknown_tag(element)),
            }
        }

        let defined: HashSet<&str> = trees.iter().map(|tree| tree.id.as_str()).collect();
        if !defined.contains(main_tree.as_str()) {
            return Err(PlanParseError::MissingMainTree { id: main_tree });
        }
        if let Some((id, span)) = self
            .subtree_refs
            .iter()
            .find(|(id, _)| !defined.contains(id.as_str()))
        {
            return Err(PlanParseError::UndefinedSubTree {
                id: id.clone(),
                span: span.clone(),
            });
        }

        tracing::debug!(main_tree = %main_tree, trees = trees.len(), "plan lowered");
        Ok(ast::Plan { main_tree, trees })
    }

    fn lower_tree(&mut self, element: &Element) -> LowerResult<ast::TreeDef> {
        check_attributes(element, &["ID"])?;
        reject_text(element)?;
        let id = required(element, "ID")?.to_string();
        let root = self.lower_single_child(element)?;
        Ok(ast::TreeDef { id, root })
    }

    fn lower_single_child(&mut self, parent: &Element) -> LowerResult<ast::Node> {
        let children: Vec<&Element> = parent.child_elements().collect();
        match children.as_slice() {
            [child] => self.lower_node(child, parent),
            _ => Err(PlanParseError::Arity {
                tag: parent.name.clone(),
                expected: "exactly 1".to_string(),
                found: children.len(),
                span: parent.span.clone(),
            }),
        }
    }

    fn lower_children(&mut self, parent: &Element) -> LowerResult<Vec<ast::Node>> {
        let children = parent
            .child_elements()
            .map(|child| self.lower_node(child, parent))
            .collect::<LowerResult<Vec<_>>>()?;
        if children.is_empty() {
            return Err(PlanParseError::Arity {
                tag: parent.name.clone(),
                expected: "at least 1".to_string(),
                found: 0,
                span: parent.span.clone(),
            });
        }
        Ok(children)
    }

    fn lower_node(&mut self, element: &Element, parent: &Element) -> LowerResult<ast::Node> {
        let kind = NodeKind::from_str(&element.name).map_err(|_| unknown_tag(element))?;
        reject_text(element)?;
        match kind {
            NodeKind::Root | NodeKind::BehaviorTree => Err(misplaced(element, parent)),
            NodeKind::Sequence => {
                check_attributes(element, &["name"])?;
                Ok(ast::Node::Sequence {
                    children: self.lower_children(element)?,
                })
            }
            NodeKind::Fallback => {
                check_attributes(element, &["name"])?;
                Ok(ast::Node::Fallback {
                    children: self.lower_children(element)?,
                })
            }
            NodeKind::RetryUntilSuccessful => {
                check_attributes(element, &["name", "num_attempts"])?;
                let attempts = parse_retry_limit(element)?;
                let child = self.lower_single_child(element)?;
                Ok(ast::Node::retry(attempts, child))
            }
            NodeKind::Timeout => {
                check_attributes(element, &["name", "msec", "timeout_sec"])?;
                let budget = parse_timeout(element)?;
                let child = self.lower_single_child(element)?;
                Ok(ast::Node::timeout(budget, child))
            }
            NodeKind::SubTree => self.lower_subtree(element),
            NodeKind::Action => lower_action(element),
            NodeKind::Condition => lower_condition(element),
        }
    }

    fn lower_subtree(&mut self, element: &Element) -> LowerResult<ast::Node> {
        check_duplicates(element)?;
        expect_no_children(element)?;
        let id = required(element, "ID")?.to_string();
        let bindings = element
            .attributes
            .iter()
            .filter(|attribute| attribute.name != "ID")
            .filter(|attribute| !SUBTREE_IGNORED.contains(&attribute.name.as_str()))
            .map(|attribute| {
                let value = parse_obj(&attribute.value, element)?;
                Ok(Binding {
                    formal: attribute.name.clone(),
                    value,
                })
            })
            .collect::<LowerResult<Vec<_>>>()?;
        self.subtree_refs.push((id.clone(), element.span.clone()));
        Ok(ast::Node::SubTree { id, bindings })
    }
}

fn lower_action(element: &Element) -> LowerResult<ast::Node> {
    check_attributes(element, &["ID", "obj", "name"])?;
    expect_no_children(element)?;
    let id = required(element, "ID")?.to_string();
    let obj = element
        .attribute("obj")
        .map(|value| parse_obj(value, element))
        .transpose()?;

    let no_argument = primitive::lookup(&id)
        .map(|spec| spec.role == ParamRole::NoArgument)
        .unwrap_or(false);
    match (&obj, no_argument) {
        (Some(obj), true) => Err(PlanParseError::ObjectOnNoArgument {
            primitive: id,
            obj: obj.to_string(),
            span: element.span.clone(),
        }),
        (None, false) => Err(PlanParseError::MissingObject {
            tag: element.name.clone(),
            id,
            span: element.span.clone(),
        }),
        _ => Ok(ast::Node::Action {
            id,
            obj,
            name: element.attribute("name").map(str::to_string),
        }),
    }
}

fn lower_condition(element: &Element) -> LowerResult<ast::Node> {
    check_attributes(element, &["ID", "obj", "name"])?;
    expect_no_children(element)?;
    let id = required(element, "ID")?.to_string();
    let Some(raw) = element.attribute("obj") else {
        return Err(PlanParseError::MissingObject {
            tag: element.name.clone(),
            id,
            span: element.span.clone(),
        });
    };
    Ok(ast::Node::Condition {
        obj: parse_obj(raw, element)?,
        id,
        name: element.attribute("name").map(str::to_string),
    })
}

fn parse_retry_limit(element: &Element) -> LowerResult<RetryLimit> {
    let raw = required(element, "num_attempts")?;
    match raw.trim().parse::<i64>() {
        Ok(-1) => Ok(RetryLimit::Unbounded),
        Ok(n) if n > 0 && n <= u32::MAX as i64 => Ok(RetryLimit::Limited(n as u32)),
        _ => Err(invalid(
            element,
            "num_attempts",
            raw,
            "expected a positive integer or -1",
        )),
    }
}

fn parse_timeout(element: &Element) -> LowerResult<Duration> {
    match (element.attribute("msec"), element.attribute("timeout_sec")) {
        (Some(_), Some(_)) => Err(PlanParseError::UnexpectedAttribute {
            tag: element.name.clone(),
            attribute: "timeout_sec".to_string(),
            span: element.span.clone(),
        }),
        (Some(raw), None) => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|_| invalid(element, "msec", raw, "expected milliseconds")),
        (None, Some(raw)) => raw
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(|seconds| Duration::try_from_secs_f64(seconds).ok())
            .ok_or_else(|| invalid(element, "timeout_sec", raw, "expected seconds")),
        (None, None) => Err(PlanParseError::MissingAttribute {
            tag: element.name.clone(),
            attribute: "msec".to_string(),
            span: element.span.clone(),
        }),
    }
}

fn parse_obj(value: &str, element: &Element) -> LowerResult<ObjRef> {
    ObjRef::parse(value).ok_or_else(|| PlanParseError::NotSnakeCase {
        value: value.to_string(),
        span: element.span.clone(),
    })
}

fn required<'a>(element: &'a Element, attribute: &str) -> LowerResult<&'a str> {
    match element.attribute(attribute) {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(PlanParseError::MissingAttribute {
            tag: element.name.clone(),
            attribute: attribute.to_string(),
            span: element.span.clone(),
        }),
    }
}

fn check_duplicates(element: &Element) -> LowerResult<()> {
    let mut seen = HashSet::new();
    for attribute in &element.attributes {
        if !seen.insert(attribute.name.as_str()) {
            return Err(PlanParseError::DuplicateAttribute {
                tag: element.name.clone(),
                attribute: attribute.name.clone(),
                span: element.span.clone(),
            });
        }
    }
    Ok(())
}

fn check_attributes(element: &Element, allowed: &[&str]) -> LowerResult<()> {
    check_duplicates(element)?;
    match element
        .attributes
        .iter()
        .find(|attribute| !allowed.contains(&attribute.name.as_str()))
    {
        Some(attribute) => Err(PlanParseError::UnexpectedAttribute {
            tag: element.name.clone(),
            attribute: attribute.name.clone(),
            span: element.span.clone(),
        }),
        None => Ok(()),
    }
}

fn reject_text(element: &Element) -> LowerResult<()> {
    match element.first_text() {
        Some((text, span)) => Err(PlanParseError::UnexpectedText {
            text: text.to_string(),
            span: span.clone(),
        }),
        None => Ok(()),
    }
}

fn expect_no_children(element: &Element) -> LowerResult<()> {
    let found = element.child_elements().count();
    if found == 0 {
        return Ok(());
    }
    Err(PlanParseError::Arity {
        tag: element.name.clone(),
        expected: "0".to_string(),
        found,
        span: element.span.clone(),
    })
}

fn invalid(element: &Element, attribute: &str, value: &str, reason: &str) -> PlanParseError {
    PlanParseError::InvalidAttribute {
        tag: element.name.clone(),
        attribute: attribute.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
        span: element.span.clone(),
    }
}

fn unknown_tag(element: &Element) -> PlanParseError {
    PlanParseError::UnknownTag {
        tag: element.name.clone(),
        span: element.span.clone(),
    }
}

fn misplaced(element: &Element, parent: &Element) -> PlanParseError {
    PlanParseError::MisplacedTag {
        tag: element.name.clone(),
        parent: parent.name.clone(),
        span: element.span.clone(),
    }
}
