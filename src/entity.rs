//! Entity instances and the strategy that constructs them

use std::collections::BTreeMap;
use std::fmt;

/// A live object built from definitions
///
/// The factory only relies on naming, property writes from the deserializer,
/// and destruction of half-built instances. Everything else about an entity
/// belongs to the host's component layer.
pub trait Entity: fmt::Debug {
    /// Give the entity its logical name and alias; anonymous entities get `None`
    fn initialize(&mut self, name: Option<&str>, alias: Option<&str>);

    fn name(&self) -> Option<&str>;

    fn alias(&self) -> Option<&str>;

    /// Set a described property; later layers overwrite earlier ones
    fn set_property(&mut self, key: &str, value: &str);

    fn property(&self, key: &str) -> Option<&str>;

    /// All properties as `(key, value)` pairs
    fn properties(&self) -> Vec<(&str, &str)>;

    /// Tear down an instance that will never be handed out
    fn destroy(self: Box<Self>) {}
}

/// Strategy used to allocate fresh entities
pub trait EntityConstructor {
    fn construct(&self) -> Box<dyn Entity>;
}

impl<F> EntityConstructor for F
where
    F: Fn() -> Box<dyn Entity>,
{
    fn construct(&self) -> Box<dyn Entity> {
        self()
    }
}

/// Default entity: a name, an alias and a sorted property bag
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyEntity {
    pub name: Option<String>,
    pub alias: Option<String>,
    pub properties: BTreeMap<String, String>,
}

impl PropertyEntity {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Entity for PropertyEntity {
    fn initialize(&mut self, name: Option<&str>, alias: Option<&str>) {
        self.name = name.map(str::to_string);
        self.alias = alias.map(str::to_string);
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    fn set_property(&mut self, key: &str, value: &str) {
        self.properties.insert(key.to_string(), value.to_string());
    }

    fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(|s| s.as_str())
    }

    fn properties(&self) -> Vec<(&str, &str)> {
        self.properties
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }
}

/// Constructs [`PropertyEntity`] instances
#[derive(Debug, Clone, Copy, Default)]
pub struct PropertyEntityConstructor;

impl EntityConstructor for PropertyEntityConstructor {
    fn construct(&self) -> Box<dyn Entity> {
        Box::new(PropertyEntity::new())
    }
}

/// Render an entity as its name line followed by one indented line per property
pub fn render_entity(entity: &dyn Entity) -> String {
    let mut out = entity.name().unwrap_or("<anonymous>").to_string();
    if let Some(alias) = entity.alias() {
        out.push_str(&format!(" (alias {})", alias));
    }
    out.push('\n');
    for (key, value) in entity.properties() {
        out.push_str(&format!("  {} = {}\n", key, value));
    }
    out
}
