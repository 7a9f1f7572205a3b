//! Building single entities from definitions and overrides

use tracing::{debug, error, warn};

use crate::deserializer::{Deserializer, MissingReference};
use crate::entity::{Entity, EntityConstructor};

use super::error::ThingError;
use super::registry::{Definition, ThingKind, ThingRegistry};
use super::trail::Trail;

/// One top-level instantiation call and the collaborators it drives
///
/// Group expansion re-enters the entity path for every `objectReference`
/// with `nested` set, which defers the missing-reference report to the end
/// of the whole group.
pub struct Instantiation<'a> {
    pub(crate) registry: &'a ThingRegistry,
    constructor: &'a dyn EntityConstructor,
    pub(crate) deserializer: &'a mut dyn Deserializer,
    missing: Vec<MissingReference>,
}

impl<'a> Instantiation<'a> {
    pub fn new(
        registry: &'a ThingRegistry,
        constructor: &'a dyn EntityConstructor,
        deserializer: &'a mut dyn Deserializer,
    ) -> Self {
        Self {
            registry,
            constructor,
            deserializer,
            missing: Vec::new(),
        }
    }

    /// Missing references reported so far by this instantiation
    pub fn missing_references(&self) -> &[MissingReference] {
        &self.missing
    }

    pub fn into_missing_references(self) -> Vec<MissingReference> {
        self.missing
    }

    /// Instantiate the entity or template `name` as a top-level call
    ///
    /// Content problems (missing definitions, cycles, rejected descriptions)
    /// are logged and yield `Ok(None)`. Only integration mistakes are
    /// returned as errors. Nothing half-built survives either way.
    pub fn entity(&mut self, name: &str) -> Result<Option<Box<dyn Entity>>, ThingError> {
        self.build_entity(name, false)
    }

    pub(crate) fn build_entity(
        &mut self,
        name: &str,
        nested: bool,
    ) -> Result<Option<Box<dyn Entity>>, ThingError> {
        let registry = self.registry;

        if let Some(callback) = registry.entity_callback(name) {
            debug!(name, "instantiating entity through override");
            return Ok(callback(name));
        }
        if registry.group_callback(name).is_some() {
            error!(name, "entity requested from a group override");
            return Err(ThingError::KindMismatch {
                name: name.to_string(),
                expected: ThingKind::Entity,
                found: ThingKind::Group,
            });
        }

        let Some(def) = registry.lookup(name, &[ThingKind::Template, ThingKind::Entity]) else {
            error!(name, "no entity or template definition found");
            return Ok(None);
        };

        // Templates instantiated directly stay anonymous
        let instance_name = match def.kind {
            ThingKind::Entity => Some(def.name()),
            _ => None,
        };
        let alias = Some(def.tree.attribute("alias")).filter(|a| !a.is_empty());

        let mut entity = self.constructor.construct();
        entity.initialize(instance_name, alias);

        let mark = self.deserializer.pending_mark();
        match self.describe(entity.as_mut(), def) {
            Ok(()) => {
                if !nested {
                    self.report();
                }
                debug!(name, nested, "instantiated entity");
                Ok(Some(entity))
            }
            Err(err) => {
                entity.destroy();
                if nested {
                    // Siblings built earlier in the group keep their references
                    self.deserializer.truncate_pending(mark);
                } else {
                    self.deserializer.discard_pending_references();
                }
                if err.is_integration() {
                    return Err(err);
                }
                warn!(name, error = %err, "failed to instantiate entity");
                Ok(None)
            }
        }
    }

    /// Apply the template chain, then the definition itself as the final layer
    fn describe(&mut self, entity: &mut dyn Entity, def: &'a Definition) -> Result<(), ThingError> {
        let seed = (def.kind == ThingKind::Template).then(|| Trail::root(def.name()));
        self.apply_template_chain(entity, def.template(), seed.as_ref())?;
        self.apply_layer(entity, def, true)
    }

    pub(crate) fn apply_layer(
        &mut self,
        entity: &mut dyn Entity,
        def: &Definition,
        final_layer: bool,
    ) -> Result<(), ThingError> {
        let result = self
            .deserializer
            .apply_description(entity, &def.tree, final_layer);
        self.deserializer.clear_current_entity();
        result.map_err(|source| ThingError::Description {
            name: def.name().to_string(),
            source,
        })
    }

    /// Run the deferred missing-reference check for everything built so far
    pub(crate) fn report(&mut self) {
        let missing = self.deserializer.report_missing_references();
        self.missing.extend(missing);
    }
}
