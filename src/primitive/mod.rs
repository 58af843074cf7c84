//! # Primitive Catalogue
//!
//! The single, immutable table describing every robot primitive an `Action` leaf
//! may dispatch and every predicate a `Condition` leaf may query. The parser, the
//! conformance validator, both execution backends and the prompt/comment helpers
//! in [`phrase`] all read this table; nothing else classifies primitives.
//!
//! Each [`PrimitiveSpec`] records:
//!
//! * **role**: whether the primitive takes no argument, acts on its object, or
//!   acts on a destination while holding something
//! * **support**: whether the physical simulator implements it (`Core`) or only
//!   the catalogue knows it (`Ghost`)
//! * **execution**: how long the simulated backend takes to carry it out
//!
//! Declaration order of [`Primitive`] is the canonical action order used for
//! prompts, so `Ord` on the enum sorts primitives the way prompts list them.

pub mod phrase;

use std::collections::HashMap;
use std::str::FromStr;

use lazy_static::lazy_static;
use strum::IntoEnumIterator;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString, IntoStaticStr};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    EnumString,
    Display,
    AsRefStr,
    EnumIter,
    IntoStaticStr,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Primitive {
    NavigateTo,
    Grasp,
    Open,
    Close,
    ToggleOn,
    ToggleOff,
    SoakUnder,
    SoakInside,
    Wipe,
    Cut,
    Push,
    Pour,
    PlaceOnTop,
    PlaceInside,
    PlaceNearHeatingElement,
    Fold,
    Unfold,
    Screw,
    Hang,
    Release,
    // not part of the prompt ordering; listed alphabetically after it
    Flip,
    PlaceNextTo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ParamRole {
    NoArgument,
    ActsOnObject,
    ActsOnDestination,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Support {
    Core,
    Ghost,
}

/// Which simulated step budget a primitive consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Execution {
    Navigation,
    Manipulation,
    Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrimitiveSpec {
    pub primitive: Primitive,
    pub role: ParamRole,
    pub support: Support,
    pub execution: Execution,
}

impl PrimitiveSpec {
    const fn new(
        primitive: Primitive,
        role: ParamRole,
        support: Support,
        execution: Execution,
    ) -> Self {
        Self {
            primitive,
            role,
            support,
            execution,
        }
    }

    pub fn id(&self) -> &'static str {
        self.primitive.into()
    }

    pub fn takes_object(&self) -> bool {
        self.role != ParamRole::NoArgument
    }
}

use Execution::{Instant, Manipulation, Navigation};
use ParamRole::{ActsOnDestination, ActsOnObject, NoArgument};
use Support::{Core, Ghost};

pub static CATALOGUE: &[PrimitiveSpec] = &[
    PrimitiveSpec::new(Primitive::NavigateTo, ActsOnObject, Core, Navigation),
    PrimitiveSpec::new(Primitive::Grasp, ActsOnObject, Core, Manipulation),
    PrimitiveSpec::new(Primitive::Open, ActsOnObject, Core, Instant),
    PrimitiveSpec::new(Primitive::Close, ActsOnObject, Core, Instant),
    PrimitiveSpec::new(Primitive::ToggleOn, ActsOnObject, Core, Instant),
    PrimitiveSpec::new(Primitive::ToggleOff, ActsOnObject, Core, Instant),
    PrimitiveSpec::new(Primitive::SoakUnder, ActsOnObject, Core, Instant),
    PrimitiveSpec::new(Primitive::SoakInside, ActsOnObject, Core, Instant),
    PrimitiveSpec::new(Primitive::Wipe, ActsOnObject, Core, Instant),
    PrimitiveSpec::new(Primitive::Cut, ActsOnObject, Core, Instant),
    PrimitiveSpec::new(Primitive::Push, ActsOnObject, Ghost, Manipulation),
    PrimitiveSpec::new(Primitive::Pour, ActsOnDestination, Ghost, Manipulation),
    PrimitiveSpec::new(Primitive::PlaceOnTop, ActsOnDestination, Core, Manipulation),
    PrimitiveSpec::new(Primitive::PlaceInside, ActsOnDestination, Core, Manipulation),
    PrimitiveSpec::new(
        Primitive::PlaceNearHeatingElement,
        ActsOnDestination,
        Core,
        Manipulation,
    ),
    PrimitiveSpec::new(Primitive::Fold, ActsOnObject, Ghost, Manipulation),
    PrimitiveSpec::new(Primitive::Unfold, ActsOnObject, Ghost, Manipulation),
    PrimitiveSpec::new(Primitive::Screw, ActsOnObject, Ghost, Manipulation),
    PrimitiveSpec::new(Primitive::Hang, ActsOnObject, Ghost, Manipulation),
    PrimitiveSpec::new(Primitive::Release, NoArgument, Core, Instant),
    PrimitiveSpec::new(Primitive::Flip, ActsOnObject, Ghost, Manipulation),
    PrimitiveSpec::new(Primitive::PlaceNextTo, ActsOnDestination, Core, Manipulation),
];

lazy_static! {
    static ref BY_ID: HashMap<&'static str, &'static PrimitiveSpec> =
        CATALOGUE.iter().map(|spec| (spec.id(), spec)).collect();
}

impl Primitive {
    pub fn spec(&self) -> &'static PrimitiveSpec {
        // rows are in declaration order
        &CATALOGUE[*self as usize]
    }

    pub fn id(&self) -> &'static str {
        self.into()
    }

    pub fn role(&self) -> ParamRole {
        self.spec().role
    }

    pub fn is_destination(&self) -> bool {
        self.role() == ActsOnDestination
    }
}

/// Looks up a primitive by its identifier, e.g. `"PLACE_ON_TOP"`.
pub fn lookup(id: &str) -> Option<&'static PrimitiveSpec> {
    BY_ID.get(id).copied()
}

/// Every primitive id in canonical order.
pub fn all_ids() -> Vec<&'static str> {
    Primitive::iter().map(|primitive| primitive.id()).collect()
}

/// Primitive ids the physical simulator implements.
pub fn core_ids() -> Vec<&'static str> {
    Primitive::iter()
        .filter(|primitive| primitive.spec().support == Core)
        .map(|primitive| primitive.id())
        .collect()
}

/// Condition predicates. Every predicate takes exactly one object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display, AsRefStr, EnumIter, IntoStaticStr,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Predicate {
    IsReachable,
    IsVisible,
    IsHolding,
    IsGraspable,
    IsEmpty,
    IsOpen,
    IsClosed,
    IsFolded,
    IsUnfolded,
    IsOn,
    IsOff,
}

impl Predicate {
    pub fn lookup(id: &str) -> Option<Self> {
        Predicate::from_str(id).ok()
    }
}
