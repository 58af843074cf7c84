//! Symbolic world model shared by both backends.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::{
    config::SimulationConfig,
    primitive::{Execution, Predicate, Primitive},
};

use super::PrimitiveFailure;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Relation {
    OnTop,
    Inside,
    NextTo,
    NearHeatingElement,
}

impl Relation {
    fn for_primitive(primitive: Primitive) -> Option<Self> {
        match primitive {
            Primitive::PlaceOnTop => Some(Relation::OnTop),
            Primitive::PlaceInside | Primitive::Pour => Some(Relation::Inside),
            Primitive::PlaceNextTo => Some(Relation::NextTo),
            Primitive::PlaceNearHeatingElement => Some(Relation::NearHeatingElement),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WorldState {
    /// `None` means every object exists.
    known: Option<BTreeSet<String>>,
    unreachable: BTreeSet<String>,
    robot_at: Option<String>,
    held: Option<String>,
    relations: BTreeMap<String, (Relation, String)>,
    open: BTreeSet<String>,
    toggled_on: BTreeSet<String>,
    folded: BTreeSet<String>,
    soaked: BTreeSet<String>,
    touched: BTreeSet<String>,
}

impl WorldState {
    pub fn from_config(config: &SimulationConfig) -> Self {
        let known = if config.known_objects.is_empty() {
            None
        } else {
            Some(config.known_objects.iter().cloned().collect())
        };
        Self {
            known,
            unreachable: config.unreachable_objects.iter().cloned().collect(),
            ..Self::default()
        }
    }

    pub fn with_objects<I, S>(objects: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            known: Some(objects.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    pub fn robot_at(&self) -> Option<&str> {
        self.robot_at.as_deref()
    }

    pub fn held(&self) -> Option<&str> {
        self.held.as_deref()
    }

    pub fn relation_of(&self, obj: &str) -> Option<(Relation, &str)> {
        self.relations
            .get(obj)
            .map(|(relation, dest)| (*relation, dest.as_str()))
    }

    pub fn is_open(&self, obj: &str) -> bool {
        self.open.contains(obj)
    }

    /// Objects any primitive has acted on.
    pub fn touched(&self) -> &BTreeSet<String> {
        &self.touched
    }

    pub fn exists(&self, obj: &str) -> bool {
        self.known.as_ref().map_or(true, |known| known.contains(obj))
    }

    pub fn is_reachable(&self, obj: &str) -> bool {
        self.exists(obj) && !self.unreachable.contains(obj)
    }

    pub(super) fn clear_location(&mut self) {
        self.robot_at = None;
    }

    /// Checks whether `primitive` may start on `obj` in the current state.
    pub fn precondition(&self, primitive: Primitive, obj: Option<&str>) -> Result<(), PrimitiveFailure> {
        let spec = primitive.spec();
        let obj = match (spec.takes_object(), obj) {
            (true, Some(obj)) => Some(obj),
            (true, None) => {
                return Err(PrimitiveFailure::MissingObject {
                    primitive: primitive.id().to_string(),
                })
            }
            (false, _) => None,
        };
        if let Some(obj) = obj {
            if !self.exists(obj) {
                return Err(PrimitiveFailure::UnknownObject(obj.to_string()));
            }
        }

        match (primitive, obj) {
            (Primitive::NavigateTo, Some(obj)) => {
                if self.unreachable.contains(obj) {
                    return Err(PrimitiveFailure::Unreachable(obj.to_string()));
                }
            }
            (Primitive::Release, _) => {
                if self.held.is_none() {
                    return Err(PrimitiveFailure::NothingHeld);
                }
            }
            (_, Some(obj)) => {
                if self.robot_at.as_deref() != Some(obj) {
                    return Err(PrimitiveFailure::NotAtObject(obj.to_string()));
                }
                if primitive == Primitive::Grasp {
                    if let Some(held) = &self.held {
                        return Err(PrimitiveFailure::HandsFull(held.clone()));
                    }
                }
                if primitive.is_destination() && self.held.is_none() {
                    return Err(PrimitiveFailure::NothingHeld);
                }
            }
            (_, None) => {}
        }
        Ok(())
    }

    /// Applies the effect of a completed primitive.
    pub fn apply(&mut self, primitive: Primitive, obj: Option<&str>) -> Result<(), PrimitiveFailure> {
        self.precondition(primitive, obj)?;
        if let Some(obj) = obj {
            self.touched.insert(obj.to_string());
        }
        let Some(obj) = obj else {
            if primitive == Primitive::Release {
                self.held = None;
            }
            return Ok(());
        };
        let obj = obj.to_string();

        match primitive {
            Primitive::NavigateTo => self.robot_at = Some(obj),
            Primitive::Grasp => {
                self.relations.remove(&obj);
                self.held = Some(obj);
            }
            Primitive::Open => {
                self.open.insert(obj);
            }
            Primitive::Close => {
                self.open.remove(&obj);
            }
            Primitive::ToggleOn => {
                self.toggled_on.insert(obj);
            }
            Primitive::ToggleOff => {
                self.toggled_on.remove(&obj);
            }
            Primitive::Fold => {
                self.folded.insert(obj);
            }
            Primitive::Unfold => {
                self.folded.remove(&obj);
            }
            Primitive::SoakUnder | Primitive::SoakInside => {
                self.soaked.insert(obj);
            }
            other => {
                if let (Some(relation), Some(held)) = (Relation::for_primitive(other), &self.held) {
                    self.relations.insert(held.clone(), (relation, obj));
                }
            }
        }
        Ok(())
    }

    pub fn holds(&self, predicate: Predicate, obj: &str) -> bool {
        match predicate {
            Predicate::IsReachable => self.is_reachable(obj),
            Predicate::IsVisible => self.exists(obj),
            Predicate::IsHolding => self.held.as_deref() == Some(obj),
            Predicate::IsGraspable => self.is_reachable(obj) && self.held.is_none(),
            Predicate::IsEmpty => {
                !self.relations.values().any(|(_, dest)| dest == obj)
                    && self.held.as_deref() != Some(obj)
            }
            Predicate::IsOpen => self.is_open(obj),
            Predicate::IsClosed => !self.is_open(obj),
            Predicate::IsFolded => self.folded.contains(obj),
            Predicate::IsUnfolded => !self.folded.contains(obj),
            Predicate::IsOn => self.toggled_on.contains(obj),
            Predicate::IsOff => !self.toggled_on.contains(obj),
        }
    }
}

/// Steps a primitive takes in the simulated backend.
pub(super) fn step_budget(primitive: Primitive, config: &SimulationConfig) -> u32 {
    let steps = match primitive.spec().execution {
        Execution::Navigation => config.navigation_steps,
        Execution::Manipulation => config.manipulation_steps,
        Execution::Instant => config.instant_steps + config.settle_steps,
    };
    steps.max(1)
}
