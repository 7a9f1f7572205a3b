//! The public entry point tying registry, resolution and collaborators together

use std::fmt;

use tracing::{debug, info, warn};

use crate::config::FactoryConfig;
use crate::deserializer::{AttributeDeserializer, Deserializer, MissingReference};
use crate::entity::{Entity, EntityConstructor, PropertyEntityConstructor};
use crate::parser::ast::{Document, Element};
use crate::parser::parse;
use crate::source::{DocumentSource, FileSource, LoadError, LoadEvent};
use crate::thing::{Instantiation, ThingError, ThingKind, ThingRegistry};

type LoadListener = Box<dyn FnMut(&LoadEvent)>;

/// Resolves thing definitions into entity instances
///
/// The factory owns its registry. Hosts construct one explicitly and swap in
/// their own collaborators with the `with_*` builders.
pub struct ThingFactory {
    registry: ThingRegistry,
    constructor: Box<dyn EntityConstructor>,
    deserializer: Box<dyn Deserializer>,
    source: Box<dyn DocumentSource>,
    listeners: Vec<LoadListener>,
    missing: Vec<MissingReference>,
}

impl fmt::Debug for ThingFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThingFactory")
            .field("registry", &self.registry)
            .field("listeners", &self.listeners.len())
            .field("missing", &self.missing)
            .finish_non_exhaustive()
    }
}

impl Default for ThingFactory {
    fn default() -> Self {
        Self::new(&FactoryConfig::default())
    }
}

impl ThingFactory {
    /// Create a factory with the default collaborators for `config`
    pub fn new(config: &FactoryConfig) -> Self {
        let source = match &config.base_path {
            Some(base) => FileSource::with_base_path(base.clone()),
            None => FileSource::new(),
        };
        Self {
            registry: ThingRegistry::new(),
            constructor: Box::new(PropertyEntityConstructor),
            deserializer: Box::new(AttributeDeserializer::new(config.reference_prefix.clone())),
            source: Box::new(source),
            listeners: Vec::new(),
            missing: Vec::new(),
        }
    }

    /// Replace the entity construction strategy
    pub fn with_constructor(mut self, constructor: impl EntityConstructor + 'static) -> Self {
        self.constructor = Box::new(constructor);
        self
    }

    /// Replace the deserializer that applies description layers
    pub fn with_deserializer(mut self, deserializer: impl Deserializer + 'static) -> Self {
        self.deserializer = Box::new(deserializer);
        self
    }

    /// Replace the source definition files are read from
    pub fn with_source(mut self, source: impl DocumentSource + 'static) -> Self {
        self.source = Box::new(source);
        self
    }

    pub fn registry(&self) -> &ThingRegistry {
        &self.registry
    }

    /// Subscribe to load, failure and unload notifications
    pub fn on_load_event(&mut self, listener: impl FnMut(&LoadEvent) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    fn notify(&mut self, event: LoadEvent) {
        for listener in &mut self.listeners {
            listener(&event);
        }
    }

    /// Add every child of the document root as a thing of batch `batch`
    ///
    /// Rejected children are logged by the registry and skipped. Returns how
    /// many things were added.
    pub fn add_document(&mut self, document: &Document, batch: &str) -> usize {
        let version = document.version();
        let added = document
            .root
            .children()
            .filter(|child| self.registry.add((*child).clone(), batch, version).is_ok())
            .count();
        debug!(batch, version, added, "added definition batch");
        added
    }

    /// Parse `text` and add its things as batch `batch`
    pub fn add_source(&mut self, text: &str, batch: &str) -> Result<usize, LoadError> {
        let document = parse(text).map_err(|errors| LoadError::Parse {
            id: batch.to_string(),
            text: text.to_string(),
            errors,
        })?;
        Ok(self.add_document(&document, batch))
    }

    /// Remove every definition added from `batch`
    ///
    /// Entities already instantiated from the batch are unaffected.
    pub fn remove_batch(&mut self, batch: &str) -> usize {
        self.registry.remove_batch(batch)
    }

    /// Raw definition element of `name`, restricted to `kinds` (empty means any)
    pub fn definition(&self, name: &str, kinds: &[ThingKind]) -> Option<&Element> {
        self.registry.lookup(name, kinds).map(|def| &def.tree)
    }

    /// Read, parse and add the definition file `id` as a batch
    pub fn load_file(&mut self, id: &str) -> Result<usize, LoadError> {
        let result = self
            .source
            .read(id)
            .and_then(|text| self.add_source(&text, id));
        match &result {
            Ok(added) => {
                info!(id, added, "loaded definition file");
                self.notify(LoadEvent::Loaded {
                    id: id.to_string(),
                    added: *added,
                });
            }
            Err(err) => {
                warn!(id, error = %err, "failed to load definition file");
                self.notify(LoadEvent::Failed {
                    id: id.to_string(),
                    error: err.to_string(),
                });
            }
        }
        result
    }

    /// Remove every definition loaded from the file `id`
    pub fn unload_file(&mut self, id: &str) -> usize {
        let removed = self.registry.remove_batch(id);
        info!(id, removed, "unloaded definition file");
        self.notify(LoadEvent::Unloaded {
            id: id.to_string(),
            removed,
        });
        removed
    }

    pub fn register_entity_callback(
        &mut self,
        name: &str,
        callback: impl Fn(&str) -> Option<Box<dyn Entity>> + 'static,
    ) -> Result<(), ThingError> {
        self.registry.register_entity_callback(name, Box::new(callback))
    }

    pub fn register_group_callback(
        &mut self,
        name: &str,
        callback: impl Fn(&str) -> Option<Vec<Box<dyn Entity>>> + 'static,
    ) -> Result<(), ThingError> {
        self.registry.register_group_callback(name, Box::new(callback))
    }

    pub fn unregister_entity_callback(&mut self, name: &str) -> Result<(), ThingError> {
        self.registry.unregister_entity_callback(name)
    }

    pub fn unregister_group_callback(&mut self, name: &str) -> Result<(), ThingError> {
        self.registry.unregister_group_callback(name)
    }

    /// Instantiate the entity (or template) `name`
    ///
    /// Missing or broken content yields `Ok(None)` after logging. An `Err` means
    /// the caller asked for an entity under a name registered as a group
    /// override.
    pub fn instantiate_entity(&mut self, name: &str) -> Result<Option<Box<dyn Entity>>, ThingError> {
        let mut instantiation = Instantiation::new(
            &self.registry,
            self.constructor.as_ref(),
            self.deserializer.as_mut(),
        );
        let result = instantiation.entity(name);
        self.missing.extend(instantiation.into_missing_references());
        result
    }

    /// Instantiate every member of the group `name`
    ///
    /// Either all members are returned or none survive.
    pub fn instantiate_group(
        &mut self,
        name: &str,
    ) -> Result<Option<Vec<Box<dyn Entity>>>, ThingError> {
        let mut instantiation = Instantiation::new(
            &self.registry,
            self.constructor.as_ref(),
            self.deserializer.as_mut(),
        );
        let result = instantiation.group(name);
        self.missing.extend(instantiation.into_missing_references());
        result
    }

    /// Forget which entities earlier instantiations completed
    ///
    /// References are checked against every entity built since the factory
    /// was created, unloaded batches included. Call this when those instances
    /// are gone, e.g. after tearing down a level.
    pub fn forget_known_entities(&mut self) {
        self.deserializer.forget_known_entities();
    }

    /// Missing references reported since the last call
    pub fn take_missing_references(&mut self) -> Vec<MissingReference> {
        std::mem::take(&mut self.missing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;
    use std::cell::RefCell;
    use std::rc::Rc;

    const LEVEL: &str = r#"
        <things version="3">
            <template name="Base" x="1"/>
            <entity name="E" template="Base" y="2"/>
        </things>
    "#;

    #[test]
    fn test_add_source_reports_count() {
        let mut factory = ThingFactory::default();
        assert_eq!(factory.add_source(LEVEL, "level.xml").unwrap(), 2);
        assert!(factory.definition("Base", &[ThingKind::Template]).is_some());
        assert!(factory.definition("Base", &[ThingKind::Entity]).is_none());
        assert_eq!(factory.registry().lookup("E", &[]).unwrap().version, "3");
    }

    #[test]
    fn test_add_source_parse_error() {
        let mut factory = ThingFactory::default();
        let result = factory.add_source("<things>", "broken.xml");
        assert!(matches!(result, Err(LoadError::Parse { .. })));
        assert!(factory.registry().is_empty());
    }

    #[test]
    fn test_load_events() {
        let events = Rc::new(RefCell::new(Vec::new()));
        let source = MemorySource::new().with_document("level.xml", LEVEL);
        let mut factory = ThingFactory::default().with_source(source);
        let sink = Rc::clone(&events);
        factory.on_load_event(move |event| sink.borrow_mut().push(event.clone()));

        factory.load_file("level.xml").expect("Should load");
        assert!(factory.load_file("missing.xml").is_err());
        assert_eq!(factory.unload_file("level.xml"), 2);

        let events = events.borrow();
        assert_eq!(events.len(), 3);
        assert_eq!(
            events[0],
            LoadEvent::Loaded {
                id: "level.xml".into(),
                added: 2
            }
        );
        assert!(matches!(&events[1], LoadEvent::Failed { id, .. } if id == "missing.xml"));
        assert_eq!(
            events[2],
            LoadEvent::Unloaded {
                id: "level.xml".into(),
                removed: 2
            }
        );
    }

    #[test]
    fn test_reference_prefix_from_config() {
        let config = FactoryConfig::new().with_reference_prefix("ref:");
        let mut factory = ThingFactory::new(&config);
        factory
            .add_source(r#"<things><entity name="A" target="ref:Nobody"/></things>"#, "a.xml")
            .unwrap();
        factory.instantiate_entity("A").unwrap().expect("Should build");
        let missing = factory.take_missing_references();
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].target, "Nobody");
        assert!(factory.take_missing_references().is_empty());
    }

    #[test]
    fn test_forget_known_entities() {
        let mut factory = ThingFactory::default();
        factory
            .add_source(
                r#"<things><entity name="A"/><entity name="B" target="@A"/></things>"#,
                "ab.xml",
            )
            .unwrap();
        factory.instantiate_entity("A").unwrap().unwrap();
        factory.unload_file("ab.xml");
        factory
            .add_source(r#"<things><entity name="B" target="@A"/></things>"#, "b.xml")
            .unwrap();

        // A was built before the unload and still counts
        factory.instantiate_entity("B").unwrap().unwrap();
        assert!(factory.take_missing_references().is_empty());

        factory.forget_known_entities();
        factory.instantiate_entity("B").unwrap().unwrap();
        let missing = factory.take_missing_references();
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].target, "A");
    }
}
