//! Thing registry for storing definitions and callback overrides

use std::collections::HashMap;
use std::fmt;

use tracing::{debug, warn};

use crate::entity::Entity;
use crate::parser::ast::Element;

use super::error::ThingError;

/// Callback producing an entity in place of a definition
pub type EntityCallback = Box<dyn Fn(&str) -> Option<Box<dyn Entity>>>;

/// Callback producing a group's members in place of a definition
pub type GroupCallback = Box<dyn Fn(&str) -> Option<Vec<Box<dyn Entity>>>>;

/// The three kinds of data-backed things
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThingKind {
    Template,
    Entity,
    Group,
}

impl ThingKind {
    /// Classify a definition element by its tag
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "template" => Some(ThingKind::Template),
            "entity" => Some(ThingKind::Entity),
            "group" => Some(ThingKind::Group),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ThingKind::Template => "template",
            ThingKind::Entity => "entity",
            ThingKind::Group => "group",
        }
    }
}

impl fmt::Display for ThingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored definition together with the batch it came from
#[derive(Debug, Clone)]
pub struct Definition {
    pub kind: ThingKind,
    pub tree: Element,
    pub version: String,
    pub batch: String,
}

impl Definition {
    pub fn name(&self) -> &str {
        self.tree.attribute("name")
    }

    /// Parent template named by this definition, `""` if none
    pub fn template(&self) -> &str {
        self.tree.attribute("template")
    }
}

/// A registry entry: a definition or one of the two override callbacks
pub enum ThingReference {
    Definition(Definition),
    EntityOverride(EntityCallback),
    GroupOverride(GroupCallback),
}

impl fmt::Debug for ThingReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThingReference::Definition(def) => f.debug_tuple("Definition").field(def).finish(),
            ThingReference::EntityOverride(_) => f.write_str("EntityOverride(..)"),
            ThingReference::GroupOverride(_) => f.write_str("GroupOverride(..)"),
        }
    }
}

/// Registry mapping thing names to their definitions or overrides
#[derive(Debug, Default)]
pub struct ThingRegistry {
    things: HashMap<String, ThingReference>,
}

impl ThingRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a definition element from a batch
    ///
    /// Empty names, duplicate names and unknown tags are logged as warnings and
    /// leave the registry unchanged. The returned error tells the caller which
    /// case applied; it never needs to abort anything.
    pub fn add(&mut self, tree: Element, batch: &str, version: &str) -> Result<(), ThingError> {
        let name = tree.attribute("name").to_string();
        if name.is_empty() {
            warn!(batch, tag = tree.tag(), "ignoring thing without a name");
            return Err(ThingError::EmptyName);
        }
        if self.things.contains_key(&name) {
            warn!(name = %name, batch, "ignoring duplicate thing definition");
            return Err(ThingError::DuplicateName { name });
        }
        let Some(kind) = ThingKind::from_tag(tree.tag()) else {
            warn!(name = %name, batch, tag = tree.tag(), "ignoring thing of unknown kind");
            return Err(ThingError::UnknownKind {
                tag: tree.tag().to_string(),
                name,
            });
        };

        debug!(name = %name, %kind, batch, "adding thing");
        self.things.insert(
            name,
            ThingReference::Definition(Definition {
                kind,
                tree,
                version: version.to_string(),
                batch: batch.to_string(),
            }),
        );
        Ok(())
    }

    /// Remove every definition added from `batch`, returning how many went
    pub fn remove_batch(&mut self, batch: &str) -> usize {
        let before = self.things.len();
        self.things.retain(|_, thing| {
            !matches!(thing, ThingReference::Definition(def) if def.batch == batch)
        });
        let removed = before - self.things.len();
        debug!(batch, removed, "removed batch");
        removed
    }

    /// Find a definition whose kind is in `kinds` (empty means any)
    ///
    /// Callback overrides are never returned from here.
    pub fn lookup(&self, name: &str, kinds: &[ThingKind]) -> Option<&Definition> {
        match self.things.get(name)? {
            ThingReference::Definition(def) if kinds.is_empty() || kinds.contains(&def.kind) => {
                Some(def)
            }
            _ => None,
        }
    }

    pub fn get(&self, name: &str) -> Option<&ThingReference> {
        self.things.get(name)
    }

    pub fn entity_callback(&self, name: &str) -> Option<&EntityCallback> {
        match self.things.get(name)? {
            ThingReference::EntityOverride(callback) => Some(callback),
            _ => None,
        }
    }

    pub fn group_callback(&self, name: &str) -> Option<&GroupCallback> {
        match self.things.get(name)? {
            ThingReference::GroupOverride(callback) => Some(callback),
            _ => None,
        }
    }

    /// Register a callback that builds the entity `name`
    pub fn register_entity_callback(
        &mut self,
        name: &str,
        callback: EntityCallback,
    ) -> Result<(), ThingError> {
        self.register_override(name, ThingReference::EntityOverride(callback))
    }

    /// Register a callback that builds the members of group `name`
    pub fn register_group_callback(
        &mut self,
        name: &str,
        callback: GroupCallback,
    ) -> Result<(), ThingError> {
        self.register_override(name, ThingReference::GroupOverride(callback))
    }

    pub fn unregister_entity_callback(&mut self, name: &str) -> Result<(), ThingError> {
        self.unregister_override(name, ThingKind::Entity)
    }

    pub fn unregister_group_callback(&mut self, name: &str) -> Result<(), ThingError> {
        self.unregister_override(name, ThingKind::Group)
    }

    fn register_override(&mut self, name: &str, reference: ThingReference) -> Result<(), ThingError> {
        if name.is_empty() {
            return Err(ThingError::EmptyName);
        }
        if self.things.contains_key(name) {
            return Err(ThingError::CallbackCollision {
                name: name.to_string(),
            });
        }
        debug!(name, "registering override");
        self.things.insert(name.to_string(), reference);
        Ok(())
    }

    fn unregister_override(&mut self, name: &str, expected: ThingKind) -> Result<(), ThingError> {
        let matches = match self.things.get(name) {
            None => {
                return Err(ThingError::NoSuchOverride {
                    name: name.to_string(),
                })
            }
            Some(ThingReference::EntityOverride(_)) => expected == ThingKind::Entity,
            Some(ThingReference::GroupOverride(_)) => expected == ThingKind::Group,
            Some(ThingReference::Definition(_)) => false,
        };
        if !matches {
            return Err(ThingError::WrongOverrideKind {
                name: name.to_string(),
                expected,
            });
        }
        debug!(name, "unregistering override");
        self.things.remove(name);
        Ok(())
    }

    /// Check if a name holds any registration
    pub fn contains(&self, name: &str) -> bool {
        self.things.contains_key(name)
    }

    /// Batch a definition was added from; `None` for overrides
    pub fn batch_of(&self, name: &str) -> Option<&str> {
        match self.things.get(name)? {
            ThingReference::Definition(def) => Some(def.batch.as_str()),
            _ => None,
        }
    }

    /// Get all registered names
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.things.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.things.len()
    }

    pub fn is_empty(&self) -> bool {
        self.things.is_empty()
    }

    pub fn clear(&mut self) {
        self.things.clear();
    }
}
