//! Group expansion - flattens nested group and object references

use tracing::{debug, error, warn};

use crate::entity::Entity;

use super::error::ThingError;
use super::instantiate::Instantiation;
use super::registry::ThingKind;
use super::trail::Trail;

impl<'a> Instantiation<'a> {
    /// Instantiate every member of group `name` as a top-level call
    ///
    /// Members come back in document order with nested groups flattened in
    /// place. If anything fails at any depth, all members built so far are
    /// destroyed: content problems yield `Ok(None)`, integration mistakes are
    /// returned as errors.
    pub fn group(&mut self, name: &str) -> Result<Option<Vec<Box<dyn Entity>>>, ThingError> {
        let registry = self.registry;

        if let Some(callback) = registry.group_callback(name) {
            debug!(name, "instantiating group through override");
            return Ok(callback(name));
        }
        if registry.entity_callback(name).is_some() {
            error!(name, "group requested from an entity override");
            return Err(ThingError::KindMismatch {
                name: name.to_string(),
                expected: ThingKind::Group,
                found: ThingKind::Entity,
            });
        }

        let mut members = Vec::new();
        let trail = Trail::root(name);
        match self.expand_group(name, &trail, &mut members) {
            Ok(()) => {
                // Members may reference each other, so check only once all exist
                self.report();
                debug!(name, members = members.len(), "instantiated group");
                Ok(Some(members))
            }
            Err(err) => {
                for member in members {
                    member.destroy();
                }
                self.deserializer.discard_pending_references();
                if err.is_integration() {
                    return Err(err);
                }
                warn!(name, error = %err, "failed to instantiate group");
                Ok(None)
            }
        }
    }

    /// Append the members of group `name` to `members`
    ///
    /// `trail` holds the groups on the path from the top-level group down to
    /// and including `name`.
    pub(crate) fn expand_group(
        &mut self,
        name: &str,
        trail: &Trail<'_>,
        members: &mut Vec<Box<dyn Entity>>,
    ) -> Result<(), ThingError> {
        let registry = self.registry;
        let Some(def) = registry.lookup(name, &[ThingKind::Group]) else {
            warn!(name, "group not found");
            return Err(ThingError::GroupNotFound {
                name: name.to_string(),
            });
        };

        for child in def.tree.children() {
            let child_name = child.attribute("name");
            match child.tag() {
                "groupReference" | "objectReference" if child_name.is_empty() => {
                    warn!(group = name, tag = child.tag(), "ignoring reference without a name");
                }
                "groupReference" => {
                    if trail.contains(child_name) {
                        let chain = trail.chain_to(child_name);
                        warn!(group = name, %chain, "circular group reference");
                        return Err(ThingError::CyclicGroup { chain });
                    }
                    if let Some(callback) = registry.group_callback(child_name) {
                        let built = callback(child_name).ok_or_else(|| ThingError::GroupNotFound {
                            name: child_name.to_string(),
                        })?;
                        members.extend(built);
                        continue;
                    }
                    let here = trail.push(child_name);
                    self.expand_group(child_name, &here, members)?;
                }
                "objectReference" => {
                    if let Some(entity) = self.build_entity(child_name, true)? {
                        members.push(entity);
                    }
                }
                other => {
                    warn!(group = name, tag = other, "ignoring unknown group member");
                }
            }
        }
        Ok(())
    }
}
