//! Things: templates, entities and groups, and how they become instances
//!
//! A thing is a named definition element or a callback overriding one.
//! Templates form inheritance chains through their `template` attribute and
//! are applied oldest ancestor first. Groups list `objectReference` and
//! `groupReference` children and expand into a flat, ordered entity list.
//!
//! ```text
//! <things version="1">
//!     <template name="Base" x="1"/>
//!     <template name="Mid" template="Base" y="2"/>
//!     <entity name="E" template="Mid" z="3"/>
//!     <group name="Squad">
//!         <objectReference name="E"/>
//!     </group>
//! </things>
//! ```

mod error;
mod group;
mod instantiate;
mod registry;
mod resolver;
mod trail;

pub use error::{ErrorClass, ThingError};
pub use instantiate::Instantiation;
pub use registry::{
    Definition, EntityCallback, GroupCallback, ThingKind, ThingReference, ThingRegistry,
};
pub use trail::Trail;
