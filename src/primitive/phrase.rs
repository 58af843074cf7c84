//! Prompt and comment helpers.
//!
//! Plan producers are prompted with the allowed primitives, per-primitive SubTree
//! templates and the comment convention used in the training data. All of these
//! are derived from the catalogue so that prompts and validation never diverge.

use std::collections::BTreeSet;
use std::str::FromStr;

use super::{lookup, ParamRole, Predicate, Primitive};
use crate::ast::{Node, ObjRef, Plan};

/// SubTree id conventionally used for a primitive's template tree.
///
/// ```
/// # use embodied_bt::primitive::{phrase::subtree_id_for, Primitive};
/// assert_eq!(subtree_id_for(Primitive::NavigateTo), "T_Navigate");
/// assert_eq!(subtree_id_for(Primitive::PlaceOnTop), "T_Manipulate_Place_OnTop");
/// ```
pub fn subtree_id_for(primitive: Primitive) -> String {
    let suffix = match primitive {
        Primitive::NavigateTo => return "T_Navigate".to_string(),
        Primitive::PlaceOnTop => "Place_OnTop".to_string(),
        Primitive::PlaceNearHeatingElement => "Place_Near_Heat".to_string(),
        other => title_case(other.id()),
    };
    format!("T_Manipulate_{}", suffix)
}

fn title_case(id: &str) -> String {
    id.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let lower = part.to_ascii_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("_")
}

/// Comment phrase for an action leaf, e.g. `Navigate to apple`.
///
/// A placeholder object is rendered generically ("target object", "target
/// destination") so that template trees read naturally.
pub fn action_phrase(primitive: Primitive, obj: Option<&ObjRef>) -> String {
    let placeholder = matches!(obj, Some(ObjRef::Placeholder(_)));
    let named = |generic: &str| match obj {
        Some(ObjRef::Concrete(value)) => value.clone(),
        _ => generic.to_string(),
    };
    let x = named("target object");
    match primitive {
        Primitive::NavigateTo => format!("Navigate to {}", x),
        Primitive::Grasp => format!("Grasp {}", x),
        Primitive::Open => format!("Open {}", x),
        Primitive::Close => format!("Close {}", x),
        Primitive::PlaceOnTop => format!("Place held object on {}", named("target destination")),
        Primitive::PlaceInside => {
            format!("Place held object inside {}", named("target container"))
        }
        Primitive::PlaceNextTo => {
            format!("Place held object next to {}", named("target destination"))
        }
        Primitive::PlaceNearHeatingElement => {
            format!("Place held object near heat {}", named("target destination"))
        }
        Primitive::Pour => format!("Pour into {}", named("target container")),
        Primitive::Push => format!("Push {}", x),
        Primitive::ToggleOn => format!("Toggle on {}", x),
        Primitive::ToggleOff => format!("Toggle off {}", x),
        Primitive::SoakUnder => format!("Soak {} under water", x),
        Primitive::SoakInside if placeholder => {
            "Soak target container inside container".to_string()
        }
        Primitive::SoakInside => format!("Soak {} inside container", x),
        Primitive::Wipe => format!("Wipe {}", x),
        Primitive::Cut => format!("Cut {}", x),
        Primitive::Fold => format!("Fold {}", x),
        Primitive::Unfold => format!("Unfold {}", x),
        Primitive::Screw => format!("Screw {}", x),
        Primitive::Hang => format!("Hang {}", x),
        Primitive::Flip => format!("Flip {}", x),
        Primitive::Release => "Release held object".to_string(),
    }
}

/// Comment phrase for a condition leaf, e.g. `Check holding apple`.
pub fn condition_phrase(predicate: Predicate, obj: &ObjRef) -> String {
    let id: &'static str = predicate.into();
    let state = id.trim_start_matches("IS_").to_ascii_lowercase().replace('_', " ");
    let target = match obj {
        ObjRef::Concrete(value) => value.as_str(),
        ObjRef::Placeholder(_) => "target object",
    };
    format!("Check {} {}", state, target)
}

/// Phrase for any leaf node, `None` for control nodes and unknown ids.
pub fn node_phrase(node: &Node) -> Option<String> {
    match node {
        Node::Action { id, obj, .. } => Primitive::from_str(id)
            .ok()
            .map(|primitive| action_phrase(primitive, obj.as_ref())),
        Node::Condition { id, obj, .. } => {
            Predicate::lookup(id).map(|predicate| condition_phrase(predicate, obj))
        }
        _ => None,
    }
}

/// Formats a primitive subset as `[GRASP(obj), RELEASE()]`.
pub fn format_allowed_actions<S: AsRef<str>>(ids: &[S]) -> String {
    let formatted = ids
        .iter()
        .map(|id| {
            let id = id.as_ref();
            let params = match lookup(id) {
                Some(spec) if spec.takes_object() => "obj",
                _ => "",
            };
            format!("{}({})", id, params)
        })
        .collect::<Vec<_>>();
    format!("[{}]", formatted.join(", "))
}

/// One SubTree template line per primitive, using `X` for the acted-on object
/// and `DEST` for destinations.
pub fn subtree_templates<S: AsRef<str>>(ids: &[S]) -> String {
    ids.iter()
        .filter_map(|id| Primitive::from_str(id.as_ref()).ok())
        .map(|primitive| match primitive.role() {
            ParamRole::NoArgument => format!("- {0}: <Action ID=\"{0}\" />", primitive),
            ParamRole::ActsOnObject => format!(
                "- {}: <SubTree ID=\"{}\" target=\"X\" />",
                primitive,
                subtree_id_for(primitive)
            ),
            ParamRole::ActsOnDestination => format!(
                "- {}: <SubTree ID=\"{}\" target=\"DEST\" />",
                primitive,
                subtree_id_for(primitive)
            ),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Unique action ids used anywhere in the plan, in canonical order with
/// unknown ids last (alphabetically).
pub fn extract_used_action_ids(plan: &Plan) -> Vec<String> {
    let mut used = BTreeSet::new();
    for tree in &plan.trees {
        tree.root.walk(&mut |node| {
            if let Node::Action { id, .. } = node {
                used.insert(id.clone());
            }
        });
    }
    let mut ids: Vec<String> = used.into_iter().collect();
    ids.sort_by_key(|id| {
        let rank = Primitive::from_str(id).map_or(usize::MAX, |primitive| primitive as usize);
        (rank, id.clone())
    });
    ids
}
