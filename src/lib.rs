//! Thing Factory - resolves declarative thing definitions into live entities
//!
//! Definitions come in batches (usually one file each) of templates, entities
//! and groups. Templates inherit from each other through a `template`
//! attribute, entities build on a template chain, and groups compose entities
//! and other groups. Cyclic templates or groups are reported, never followed
//! forever.
//!
//! # Example
//!
//! ```rust
//! use thing_factory::{Entity, ThingFactory};
//!
//! let mut factory = ThingFactory::default();
//! factory.add_source(r#"
//!     <things version="1">
//!         <template name="Base" x="1"/>
//!         <template name="Mid" template="Base" y="2"/>
//!         <entity name="E" template="Mid" z="3"/>
//!     </things>
//! "#, "level1.xml").unwrap();
//!
//! let entity = factory.instantiate_entity("E").unwrap().unwrap();
//! assert_eq!(entity.name(), Some("E"));
//! assert_eq!(entity.property("x"), Some("1"));
//! assert_eq!(entity.property("y"), Some("2"));
//! assert_eq!(entity.property("z"), Some("3"));
//! ```

pub mod config;
pub mod deserializer;
pub mod entity;
pub mod error;
pub mod factory;
pub mod parser;
pub mod source;
pub mod thing;

pub use config::{ConfigError, FactoryConfig};
pub use deserializer::{AttributeDeserializer, DescriptionError, Deserializer, MissingReference};
pub use entity::{
    render_entity, Entity, EntityConstructor, PropertyEntity, PropertyEntityConstructor,
};
pub use error::ParseError;
pub use factory::ThingFactory;
pub use parser::{parse, Document, Element};
pub use source::{DocumentSource, FileSource, LoadError, LoadEvent, MemorySource};
pub use thing::{Definition, ErrorClass, ThingError, ThingKind, ThingReference, ThingRegistry};
