mod common;

use embodied_bt::{
    parse_plan, resolve,
    resolver::ResolvedPlan,
    validator::{ConformanceValidator, GrammarProfile, IssueCode, Verdict},
};
use pretty_assertions::assert_eq;

use common::document;

fn resolved(text: &str) -> ResolvedPlan {
    resolve(&parse_plan(text).unwrap()).unwrap()
}

const KITCHEN: [&str; 6] = [
    "NAVIGATE_TO",
    "GRASP",
    "OPEN",
    "PLACE_INSIDE",
    "PLACE_ON_TOP",
    "RELEASE",
];

#[test]
fn test_scenario_linear_grammar_rejects_fallback() {
    let plan = resolved(&document(
        r#"<Fallback>
             <Action ID="NAVIGATE_TO" obj="apple"/>
             <Action ID="NAVIGATE_TO" obj="pear"/>
           </Fallback>"#,
    ));
    let validator = ConformanceValidator::new(GrammarProfile::Linear, KITCHEN);
    assert_eq!(
        validator.validate(&plan),
        Verdict::Reject("forbidden tag: Fallback".to_string())
    );
}

#[test]
fn test_linear_grammar_rejects_every_other_tag() {
    let cases = [
        (
            r#"<RetryUntilSuccessful num_attempts="2"><Action ID="NAVIGATE_TO" obj="a"/></RetryUntilSuccessful>"#,
            "RetryUntilSuccessful",
        ),
        (
            r#"<Timeout msec="10"><Action ID="NAVIGATE_TO" obj="a"/></Timeout>"#,
            "Timeout",
        ),
        (
            r#"<Sequence><Condition ID="IS_OPEN" obj="a"/></Sequence>"#,
            "Condition",
        ),
    ];
    let validator = ConformanceValidator::with_full_catalogue(GrammarProfile::Linear);
    for (body, tag) in cases {
        assert_eq!(
            validator.validate(&resolved(&document(body))),
            Verdict::Reject(format!("forbidden tag: {}", tag))
        );
    }
}

#[test]
fn test_first_forbidden_tag_in_document_order() {
    let plan = resolved(&document(
        r#"<Sequence>
             <Timeout msec="100"><Action ID="NAVIGATE_TO" obj="a"/></Timeout>
             <Fallback><Action ID="NAVIGATE_TO" obj="b"/></Fallback>
           </Sequence>"#,
    ));
    let validator = ConformanceValidator::with_full_catalogue(GrammarProfile::Linear);
    assert_eq!(
        validator.validate(&plan),
        Verdict::Reject("forbidden tag: Timeout".to_string())
    );
    let forbidden: Vec<String> = validator
        .collect_issues(&plan)
        .into_iter()
        .filter(|issue| issue.code == IssueCode::ForbiddenTag)
        .map(|issue| issue.message)
        .collect();
    assert_eq!(
        forbidden,
        vec!["forbidden tag: Timeout", "forbidden tag: Fallback"]
    );
}

#[test]
fn test_ordering_through_subtrees() {
    // Full profile: the SubTree is inlined before ordering rules run
    let plan = resolved(
        r#"<root main_tree_to_execute="MainTree">
             <BehaviorTree ID="MainTree">
               <Sequence>
                 <SubTree ID="T_Navigate" target="fridge"/>
                 <Action ID="OPEN" obj="fridge"/>
                 <SubTree ID="T_Navigate" target="milk"/>
                 <Action ID="GRASP" obj="milk"/>
                 <SubTree ID="T_Navigate" target="fridge"/>
                 <Action ID="PLACE_INSIDE" obj="fridge"/>
                 <Action ID="RELEASE"/>
               </Sequence>
             </BehaviorTree>
             <BehaviorTree ID="T_Navigate">
               <Action ID="NAVIGATE_TO" obj="{target}"/>
             </BehaviorTree>
           </root>"#,
    );
    let validator = ConformanceValidator::new(GrammarProfile::Full, KITCHEN);
    assert_eq!(validator.validate(&plan), Verdict::Accept);
}

#[test]
fn test_whitelist_and_catalogue() {
    let plan = resolved(&document(
        r#"<Sequence>
             <Action ID="NAVIGATE_TO" obj="shirt"/>
             <Action ID="FOLD" obj="shirt"/>
           </Sequence>"#,
    ));
    let narrow = ConformanceValidator::new(GrammarProfile::Linear, KITCHEN);
    assert_eq!(
        narrow.validate(&plan),
        Verdict::Reject("primitive not allowed: FOLD".to_string())
    );
    let full = ConformanceValidator::with_full_catalogue(GrammarProfile::Linear);
    assert!(full.validate(&plan).is_accept());

    let unknown = resolved(&document(r#"<Action ID="DANCE" obj="floor"/>"#));
    assert_eq!(
        full.validate(&unknown),
        Verdict::Reject("unknown primitive: DANCE".to_string())
    );
}

#[test]
fn test_release_without_grasp() {
    let plan = resolved(&document(
        r#"<Sequence>
             <Action ID="NAVIGATE_TO" obj="cup"/>
             <Action ID="RELEASE"/>
           </Sequence>"#,
    ));
    let validator = ConformanceValidator::new(GrammarProfile::Linear, KITCHEN);
    let verdict = validator.validate(&plan);
    assert_eq!(verdict.reason(), Some("RELEASE without a preceding GRASP"));
}

#[test]
fn test_validator_does_not_mutate_plan() {
    let plan = resolved(&document(r#"<Fallback><Action ID="RELEASE"/></Fallback>"#));
    let before = plan.clone();
    let validator = ConformanceValidator::with_full_catalogue(GrammarProfile::Linear);
    validator.validate(&plan);
    validator.collect_issues(&plan);
    assert_eq!(plan, before);
}
