//! Applying description layers to entities

use std::collections::HashSet;

use thiserror::Error;
use tracing::{debug, warn};

use crate::entity::Entity;
use crate::parser::ast::Element;

/// Attributes that steer resolution and are never copied onto entities
pub const RESERVED_ATTRIBUTES: [&str; 3] = ["name", "template", "alias"];

/// Errors raised while applying a description layer
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DescriptionError {
    #[error("unexpected element <{tag}> in description")]
    UnexpectedElement { tag: String },

    #[error("<{tag}> is missing required attribute '{attribute}'")]
    MissingAttribute { tag: String, attribute: String },

    #[error("property '{key}' references an empty name")]
    EmptyReference { key: String },
}

/// A reference to a named entity that nothing has provided
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingReference {
    /// Entity holding the reference, `None` when anonymous
    pub from: Option<String>,
    pub key: String,
    pub target: String,
}

/// Copies described properties onto entities
///
/// Layers are applied oldest ancestor first. `report_missing_references` is
/// called once per top-level instantiation after every layer is in place, so
/// entities in one group may reference each other regardless of order.
pub trait Deserializer {
    fn apply_description(
        &mut self,
        entity: &mut dyn Entity,
        tree: &Element,
        final_layer: bool,
    ) -> Result<(), DescriptionError>;

    /// Forget the entity of the last applied layer
    fn clear_current_entity(&mut self) {}

    /// Check references recorded since the last report and return unresolved ones
    fn report_missing_references(&mut self) -> Vec<MissingReference>;

    /// Drop bookkeeping recorded since the last report after a rollback
    fn discard_pending_references(&mut self) {}

    /// Position in the pending references, taken before an entity is described
    fn pending_mark(&self) -> usize {
        0
    }

    /// Drop references recorded after `mark`, undoing one failed entity
    fn truncate_pending(&mut self, _mark: usize) {}

    /// Forget every entity name resolved by earlier reports
    fn forget_known_entities(&mut self) {}
}

#[derive(Debug, Clone)]
struct PendingReference {
    from: Option<String>,
    key: String,
    target: String,
}

/// Default deserializer working on plain attributes
///
/// * every non-reserved attribute becomes a property; empty values never
///   override an earlier layer
/// * `<property key=".." value=".."/>` children set `key`
/// * `<component type="T" a=".."/>` children set `T.a`
/// * values starting with the reference prefix name another entity
#[derive(Debug)]
pub struct AttributeDeserializer {
    reference_prefix: String,
    current: Option<String>,
    pending: Vec<PendingReference>,
    // Names of every entity completed since creation or the last
    // `forget_known_entities`; unloading definitions leaves them in place
    known: HashSet<String>,
    batch_known: Vec<String>,
}

impl Default for AttributeDeserializer {
    fn default() -> Self {
        Self::new("@")
    }
}

impl AttributeDeserializer {
    pub fn new(reference_prefix: impl Into<String>) -> Self {
        Self {
            reference_prefix: reference_prefix.into(),
            current: None,
            pending: Vec::new(),
            known: HashSet::new(),
            batch_known: Vec::new(),
        }
    }

    /// Whether an entity with this name has been completed and reported
    pub fn is_known(&self, name: &str) -> bool {
        self.known.contains(name)
    }

    fn set(&mut self, entity: &mut dyn Entity, key: &str, value: &str) -> Result<(), DescriptionError> {
        if value.is_empty() {
            return Ok(());
        }
        if !self.reference_prefix.is_empty() {
            if let Some(target) = value.strip_prefix(self.reference_prefix.as_str()) {
                if target.is_empty() {
                    return Err(DescriptionError::EmptyReference {
                        key: key.to_string(),
                    });
                }
                self.pending.push(PendingReference {
                    from: self.current.clone(),
                    key: key.to_string(),
                    target: target.to_string(),
                });
            }
        }
        entity.set_property(key, value);
        Ok(())
    }

    fn apply_child(&mut self, entity: &mut dyn Entity, child: &Element) -> Result<(), DescriptionError> {
        match child.tag() {
            "property" => {
                let key = required(child, "key")?;
                self.set(entity, key, child.attribute("value"))
            }
            "component" => {
                let component = required(child, "type")?;
                for attr in child.attributes.iter().filter(|a| a.name != "type") {
                    let key = format!("{}.{}", component, attr.name);
                    self.set(entity, &key, &attr.value)?;
                }
                Ok(())
            }
            other => Err(DescriptionError::UnexpectedElement {
                tag: other.to_string(),
            }),
        }
    }
}

fn required<'e>(element: &'e Element, attribute: &str) -> Result<&'e str, DescriptionError> {
    match element.attribute(attribute) {
        "" => Err(DescriptionError::MissingAttribute {
            tag: element.tag().to_string(),
            attribute: attribute.to_string(),
        }),
        value => Ok(value),
    }
}

impl Deserializer for AttributeDeserializer {
    fn apply_description(
        &mut self,
        entity: &mut dyn Entity,
        tree: &Element,
        final_layer: bool,
    ) -> Result<(), DescriptionError> {
        self.current = entity.name().map(str::to_string);
        debug!(
            layer = tree.attribute("name"),
            entity = self.current.as_deref().unwrap_or("<anonymous>"),
            final_layer,
            "applying description"
        );

        for attr in &tree.attributes {
            if RESERVED_ATTRIBUTES.contains(&attr.name.as_str()) {
                continue;
            }
            self.set(entity, &attr.name, &attr.value)?;
        }
        for child in tree.children() {
            self.apply_child(entity, child)?;
        }

        if final_layer {
            if let Some(name) = &self.current {
                self.batch_known.push(name.clone());
            }
        }
        Ok(())
    }

    fn clear_current_entity(&mut self) {
        self.current = None;
    }

    fn report_missing_references(&mut self) -> Vec<MissingReference> {
        self.known.extend(self.batch_known.drain(..));
        let missing: Vec<MissingReference> = self
            .pending
            .drain(..)
            .filter(|p| !self.known.contains(&p.target))
            .map(|p| MissingReference {
                from: p.from,
                key: p.key,
                target: p.target,
            })
            .collect();
        for m in &missing {
            warn!(
                entity = m.from.as_deref().unwrap_or("<anonymous>"),
                key = %m.key,
                target = %m.target,
                "reference to missing entity"
            );
        }
        missing
    }

    fn discard_pending_references(&mut self) {
        self.pending.clear();
        self.batch_known.clear();
        self.current = None;
    }

    fn pending_mark(&self) -> usize {
        self.pending.len()
    }

    fn truncate_pending(&mut self, mark: usize) {
        self.pending.truncate(mark);
        self.current = None;
    }

    fn forget_known_entities(&mut self) {
        self.known.clear();
    }
}
