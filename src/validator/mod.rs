//! # Conformance Validator
//!
//! A pure check of a [`ResolvedPlan`] against a grammar profile and the episode's
//! allowed primitives. The validator never mutates the plan; a rejected plan is
//! never ticked and repair is left to whoever produced the text.
//!
//! ## Rule Families
//!
//! * **Structure** runs on the source forest in document order, so `SubTree`
//!   tags are still visible although resolution removed them.
//! * **Attributes** run on the resolved main tree: known primitive, whitelist
//!   membership, object shape by parameter role, known predicate.
//! * **Ordering** walks the resolved main tree left to right and tracks which
//!   objects were navigated to and what is held.
//!
//! [`ConformanceValidator::collect_issues`] returns every issue for repair
//! feedback; [`ConformanceValidator::validate`] reports the first one.

mod rules;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};

use crate::{ast::NodeKind, primitive, resolver::ResolvedPlan};
use rules::{AttributeRule, ConformanceRule, OrderingRule, RuleContext, StructureRule};

/// Which tags a plan may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum GrammarProfile {
    /// `Sequence` and `Action` only.
    #[default]
    Linear,
    /// Every node kind of the plan grammar.
    Full,
}

impl GrammarProfile {
    pub fn allows(&self, kind: NodeKind) -> bool {
        match self {
            GrammarProfile::Full => true,
            GrammarProfile::Linear => matches!(
                kind,
                NodeKind::Root | NodeKind::BehaviorTree | NodeKind::Sequence | NodeKind::Action
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Accept,
    Reject(String),
}

impl Verdict {
    pub fn is_accept(&self) -> bool {
        matches!(self, Verdict::Accept)
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Verdict::Accept => None,
            Verdict::Reject(reason) => Some(reason),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    ForbiddenTag,
    UnknownPrimitive,
    PrimitiveNotAllowed,
    UnknownPredicate,
    ObjectOnNoArgument,
    MissingObject,
    NotSnakeCase,
    NavigationMissing,
    NothingHeld,
    PushOnly,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConformanceIssue {
    pub code: IssueCode,
    pub message: String,
}

impl ConformanceIssue {
    pub fn new(code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

pub struct ConformanceValidator {
    profile: GrammarProfile,
    allowed: BTreeSet<String>,
    rules: Vec<Box<dyn ConformanceRule>>,
}

impl ConformanceValidator {
    pub fn new<I, S>(profile: GrammarProfile, allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            profile,
            allowed: allowed.into_iter().map(Into::into).collect(),
            rules: vec![
                Box::new(StructureRule),
                Box::new(AttributeRule),
                Box::new(OrderingRule),
            ],
        }
    }

    /// Validator whose whitelist is every catalogued primitive.
    pub fn with_full_catalogue(profile: GrammarProfile) -> Self {
        Self::new(profile, primitive::all_ids())
    }

    pub fn profile(&self) -> GrammarProfile {
        self.profile
    }

    pub fn allowed(&self) -> &BTreeSet<String> {
        &self.allowed
    }

    #[tracing::instrument(level = "debug", skip_all, fields(profile = %self.profile))]
    pub fn validate(&self, plan: &ResolvedPlan) -> Verdict {
        match self.collect_issues(plan).into_iter().next() {
            None => Verdict::Accept,
            Some(issue) => {
                tracing::debug!(code = %issue.code, "rejected: {}", issue.message);
                Verdict::Reject(issue.message)
            }
        }
    }

    pub fn collect_issues(&self, plan: &ResolvedPlan) -> Vec<ConformanceIssue> {
        let ctx = RuleContext {
            profile: self.profile,
            allowed: &self.allowed,
        };
        let mut issues = Vec::new();
        for rule in &self.rules {
            rule.check(plan, &ctx, &mut issues);
        }
        issues
    }
}
