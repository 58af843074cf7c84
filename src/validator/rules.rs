use std::collections::{BTreeSet, HashSet};

use crate::{
    ast::{is_snake_case, Node, ObjRef},
    primitive::{self, ParamRole, Predicate, Primitive},
    resolver::ResolvedPlan,
};

use super::{ConformanceIssue, GrammarProfile, IssueCode};

pub(super) struct RuleContext<'a> {
    pub profile: GrammarProfile,
    pub allowed: &'a BTreeSet<String>,
}

pub(super) trait ConformanceRule {
    fn check(&self, plan: &ResolvedPlan, ctx: &RuleContext, issues: &mut Vec<ConformanceIssue>);
}

/// Tag whitelist of the grammar profile, over the source forest.
pub(super) struct StructureRule;

impl ConformanceRule for StructureRule {
    fn check(&self, plan: &ResolvedPlan, ctx: &RuleContext, issues: &mut Vec<ConformanceIssue>) {
        for tree in &plan.source().trees {
            tree.root.walk(&mut |node| {
                let kind = node.kind();
                if !ctx.profile.allows(kind) {
                    issues.push(ConformanceIssue::new(
                        IssueCode::ForbiddenTag,
                        format!("forbidden tag: {}", kind),
                    ));
                }
            });
        }
    }
}

pub(super) struct AttributeRule;

impl AttributeRule {
    fn check_action(
        id: &str,
        obj: Option<&ObjRef>,
        ctx: &RuleContext,
        issues: &mut Vec<ConformanceIssue>,
    ) {
        let Some(spec) = primitive::lookup(id) else {
            issues.push(ConformanceIssue::new(
                IssueCode::UnknownPrimitive,
                format!("unknown primitive: {}", id),
            ));
            return;
        };
        if !ctx.allowed.contains(id) {
            issues.push(ConformanceIssue::new(
                IssueCode::PrimitiveNotAllowed,
                format!("primitive not allowed: {}", id),
            ));
        }
        match (spec.role, obj) {
            (ParamRole::NoArgument, Some(obj)) => issues.push(ConformanceIssue::new(
                IssueCode::ObjectOnNoArgument,
                format!("{} takes no object: {}", id, obj),
            )),
            (ParamRole::NoArgument, None) => {}
            (_, None) => issues.push(ConformanceIssue::new(
                IssueCode::MissingObject,
                format!("missing object: {}", id),
            )),
            (_, Some(obj)) => Self::check_object(obj, issues),
        }
    }

    fn check_object(obj: &ObjRef, issues: &mut Vec<ConformanceIssue>) {
        let snake = obj.concrete().map(is_snake_case).unwrap_or(false);
        if !snake {
            issues.push(ConformanceIssue::new(
                IssueCode::NotSnakeCase,
                format!("object is not snake_case: {}", obj),
            ));
        }
    }
}

impl ConformanceRule for AttributeRule {
    fn check(&self, plan: &ResolvedPlan, ctx: &RuleContext, issues: &mut Vec<ConformanceIssue>) {
        plan.root().walk(&mut |node| match node {
            Node::Action { id, obj, .. } => Self::check_action(id, obj.as_ref(), ctx, issues),
            Node::Condition { id, obj, .. } => {
                if Predicate::lookup(id).is_none() {
                    issues.push(ConformanceIssue::new(
                        IssueCode::UnknownPredicate,
                        format!("unknown predicate: {}", id),
                    ));
                }
                Self::check_object(obj, issues);
            }
            _ => {}
        });
    }
}

/// Static ordering over the resolved main tree's actions in document order.
pub(super) struct OrderingRule;

impl OrderingRule {
    fn actions(root: &Node) -> Vec<(Primitive, Option<&str>)> {
        let mut actions = Vec::new();
        root.walk(&mut |node| {
            if let Node::Action { id, obj, .. } = node {
                if let Some(spec) = primitive::lookup(id) {
                    actions.push((spec.primitive, obj.as_ref().and_then(ObjRef::concrete)));
                }
            }
        });
        actions
    }
}

impl ConformanceRule for OrderingRule {
    fn check(&self, plan: &ResolvedPlan, _ctx: &RuleContext, issues: &mut Vec<ConformanceIssue>) {
        let actions = Self::actions(plan.root());

        let push_only = actions.iter().any(|(p, _)| *p == Primitive::Push)
            && !actions.iter().any(|(p, _)| p.is_destination());
        if push_only {
            for (primitive, _) in &actions {
                if matches!(primitive, Primitive::Grasp | Primitive::Release) {
                    issues.push(ConformanceIssue::new(
                        IssueCode::PushOnly,
                        format!("push-only plan must not contain {}", primitive),
                    ));
                }
            }
        }

        let mut navigated: HashSet<&str> = HashSet::new();
        let mut held: Option<&str> = None;
        for (primitive, obj) in actions {
            match (primitive, obj) {
                (Primitive::NavigateTo, Some(obj)) => {
                    navigated.insert(obj);
                }
                (Primitive::Release, _) => {
                    if held.take().is_none() {
                        issues.push(ConformanceIssue::new(
                            IssueCode::NothingHeld,
                            "RELEASE without a preceding GRASP",
                        ));
                    }
                }
                (primitive, Some(obj)) => {
                    if !navigated.contains(obj) {
                        issues.push(ConformanceIssue::new(
                            IssueCode::NavigationMissing,
                            format!("{} {} before NAVIGATE_TO {}", primitive, obj, obj),
                        ));
                    }
                    if primitive == Primitive::Grasp {
                        held = Some(obj);
                    } else if primitive.is_destination() && held.is_none() {
                        issues.push(ConformanceIssue::new(
                            IssueCode::NothingHeld,
                            format!("{} {} without a held object", primitive, obj),
                        ));
                    }
                }
                (_, None) => {}
            }
        }
    }
}
