//! Integration tests for the thing factory

use std::cell::RefCell;
use std::rc::Rc;

use pretty_assertions::assert_eq;
use thing_factory::{
    render_entity, Entity, FactoryConfig, LoadError, PropertyEntity, ThingError, ThingFactory,
    ThingKind,
};

const LEVEL1: &str = include_str!("fixtures/level1.xml");
const FOREST: &str = include_str!("fixtures/forest.xml");

/// Entity that records its own destruction
#[derive(Debug)]
struct Tracked {
    inner: PropertyEntity,
    destroyed: Rc<RefCell<Vec<String>>>,
}

impl Entity for Tracked {
    fn initialize(&mut self, name: Option<&str>, alias: Option<&str>) {
        self.inner.initialize(name, alias);
    }

    fn name(&self) -> Option<&str> {
        self.inner.name()
    }

    fn alias(&self) -> Option<&str> {
        self.inner.alias()
    }

    fn set_property(&mut self, key: &str, value: &str) {
        self.inner.set_property(key, value);
    }

    fn property(&self, key: &str) -> Option<&str> {
        self.inner.property(key)
    }

    fn properties(&self) -> Vec<(&str, &str)> {
        self.inner.properties()
    }

    fn destroy(self: Box<Self>) {
        let name = self.inner.name().unwrap_or("<anonymous>").to_string();
        self.destroyed.borrow_mut().push(name);
    }
}

struct Tracker {
    constructed: Rc<RefCell<usize>>,
    destroyed: Rc<RefCell<Vec<String>>>,
}

fn tracking_factory() -> (ThingFactory, Tracker) {
    let constructed = Rc::new(RefCell::new(0));
    let destroyed = Rc::new(RefCell::new(Vec::new()));
    let tracker = Tracker {
        constructed: Rc::clone(&constructed),
        destroyed: Rc::clone(&destroyed),
    };
    let factory = ThingFactory::default().with_constructor(move || -> Box<dyn Entity> {
        *constructed.borrow_mut() += 1;
        Box::new(Tracked {
            inner: PropertyEntity::new(),
            destroyed: Rc::clone(&destroyed),
        })
    });
    (factory, tracker)
}

fn loaded_factory() -> ThingFactory {
    let mut factory = ThingFactory::default();
    factory.add_source(LEVEL1, "level1.xml").expect("Should parse level1");
    factory.add_source(FOREST, "forest.xml").expect("Should parse forest");
    factory
}

#[test]
fn test_template_chain_example() {
    let mut factory = ThingFactory::default();
    factory
        .add_source(
            r#"<things version="1">
                <template name="Base" x="1"/>
                <template name="Mid" template="Base" y="2"/>
                <entity name="E" template="Mid" z="3"/>
            </things>"#,
            "example.xml",
        )
        .unwrap();

    let entity = factory.instantiate_entity("E").unwrap().expect("Should build E");
    insta::assert_snapshot!(render_entity(entity.as_ref()), @r"
    E
      x = 1
      y = 2
      z = 3
    ");
}

#[test]
fn test_overlay_order_most_specific_wins() {
    let mut factory = ThingFactory::default();
    factory
        .add_source(
            r#"<things>
                <template name="Base" x="1" y="1" z="1"/>
                <template name="Mid" template="Base" x="2" y=""/>
                <entity name="E" template="Mid" x="3"/>
            </things>"#,
            "overlay.xml",
        )
        .unwrap();

    let entity = factory.instantiate_entity("E").unwrap().unwrap();
    assert_eq!(
        entity.properties(),
        vec![("x", "3"), ("y", "1"), ("z", "1")]
    );
}

#[test]
fn test_fixture_entity_with_alias_and_children() {
    let mut factory = loaded_factory();

    let grunt = factory.instantiate_entity("Grunt").unwrap().unwrap();
    insta::assert_snapshot!(render_entity(grunt.as_ref()), @r"
    Grunt (alias grunt)
      faction = horde
      hp = 25
      speed = 1
      weapon = axe
    ");

    let oak = factory.instantiate_entity("Oak").unwrap().unwrap();
    assert_eq!(oak.property("height"), Some("12"));
    assert_eq!(oak.property("leaves"), Some("green"));
    assert_eq!(oak.property("age"), Some("140"));
    assert_eq!(oak.property("Collider.radius"), Some("2"));
}

#[test]
fn test_template_instantiates_anonymously() {
    let mut factory = loaded_factory();
    let orc = factory.instantiate_entity("Orc").unwrap().unwrap();
    assert_eq!(orc.name(), None);
    assert_eq!(orc.property("hp"), Some("25"));
    assert_eq!(orc.property("speed"), Some("1"));
}

#[test]
fn test_template_cycle_leaks_nothing() {
    let (mut factory, tracker) = tracking_factory();
    factory
        .add_source(
            r#"<things>
                <template name="A" template="B" a="1"/>
                <template name="B" template="C" b="1"/>
                <template name="C" template="A" c="1"/>
                <entity name="E" template="A"/>
            </things>"#,
            "cycle.xml",
        )
        .unwrap();

    assert!(factory.instantiate_entity("E").unwrap().is_none());
    assert_eq!(*tracker.constructed.borrow(), 1);
    assert_eq!(*tracker.destroyed.borrow(), vec!["E".to_string()]);
}

#[test]
fn test_missing_template_destroys_entity() {
    let (mut factory, tracker) = tracking_factory();
    factory
        .add_source(r#"<things><entity name="E" template="Ghost"/></things>"#, "e.xml")
        .unwrap();

    assert!(factory.instantiate_entity("E").unwrap().is_none());
    assert_eq!(*tracker.destroyed.borrow(), vec!["E".to_string()]);
}

#[test]
fn test_duplicate_definition_keeps_first() {
    let mut factory = ThingFactory::default();
    let first = factory
        .add_source(r#"<things><template name="Base" x="1"/></things>"#, "a.xml")
        .unwrap();
    let second = factory
        .add_source(r#"<things><template name="Base" x="2"/></things>"#, "b.xml")
        .unwrap();

    assert_eq!((first, second), (1, 0));
    let base = factory.definition("Base", &[]).expect("First should remain");
    assert_eq!(base.attribute("x"), "1");
    assert_eq!(factory.registry().batch_of("Base"), Some("a.xml"));
}

#[test]
fn test_empty_and_unknown_names_are_absent() {
    let mut factory = loaded_factory();
    assert!(factory.definition("", &[]).is_none());
    assert!(factory.definition("Nobody", &[]).is_none());
    assert!(factory.instantiate_entity("").unwrap().is_none());
    assert!(factory.instantiate_entity("Nobody").unwrap().is_none());
    assert!(factory.instantiate_group("").unwrap().is_none());
    assert!(factory.instantiate_group("Nobody").unwrap().is_none());
    // A group is not an entity and vice versa
    assert!(factory.instantiate_entity("Patrol").unwrap().is_none());
    assert!(factory.instantiate_group("Grunt").unwrap().is_none());
}

#[test]
fn test_group_flattens_nested_groups_in_order() {
    let mut factory = loaded_factory();
    let members = factory.instantiate_group("Grove").unwrap().expect("Should build");
    let names: Vec<_> = members.iter().map(|m| m.name()).collect();
    assert_eq!(names, vec![Some("Oak"), Some("Grunt"), Some("Scout")]);
    // Scout's leader was built in the same group
    assert!(factory.take_missing_references().is_empty());
}

#[test]
fn test_self_referencing_group_destroys_members() {
    let (mut factory, tracker) = tracking_factory();
    factory
        .add_source(
            r#"<things>
                <entity name="A"/>
                <entity name="B"/>
                <group name="G">
                    <objectReference name="A"/>
                    <objectReference name="B"/>
                    <groupReference name="G"/>
                </group>
            </things>"#,
            "g.xml",
        )
        .unwrap();

    assert!(factory.instantiate_group("G").unwrap().is_none());
    assert_eq!(*tracker.constructed.borrow(), 2);
    assert_eq!(
        *tracker.destroyed.borrow(),
        vec!["A".to_string(), "B".to_string()]
    );
}

#[test]
fn test_unload_batch_leaves_other_batches_and_instances() {
    let mut factory = loaded_factory();
    assert_eq!(factory.registry().len(), 8);

    let grunt = factory.instantiate_entity("Grunt").unwrap().unwrap();
    assert_eq!(factory.unload_file("level1.xml"), 5);

    assert_eq!(factory.registry().len(), 3);
    for name in ["Creature", "Orc", "Grunt", "Scout", "Patrol"] {
        assert!(!factory.registry().contains(name), "{name} should be gone");
    }
    assert!(factory.definition("Oak", &[ThingKind::Entity]).is_some());
    assert_eq!(grunt.property("weapon"), Some("axe"));

    // Grove now points at a group that no longer exists
    assert!(factory.instantiate_group("Grove").unwrap().is_none());
}

#[test]
fn test_missing_reference_reported() {
    let mut factory = loaded_factory();
    let scout = factory.instantiate_entity("Scout").unwrap().unwrap();
    assert_eq!(scout.property("leader"), Some("@Grunt"));

    let missing = factory.take_missing_references();
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].from.as_deref(), Some("Scout"));
    assert_eq!(missing[0].key, "leader");
    assert_eq!(missing[0].target, "Grunt");

    // Once Grunt exists the reference resolves
    factory.instantiate_entity("Grunt").unwrap().unwrap();
    factory.instantiate_entity("Scout").unwrap().unwrap();
    assert!(factory.take_missing_references().is_empty());
}

#[test]
fn test_callback_collision_and_kind_mismatch() {
    let mut factory = ThingFactory::default();
    factory
        .register_group_callback("Boss", |_| Some(Vec::new()))
        .unwrap();

    let collision = factory.register_entity_callback("Boss", |_| None);
    assert!(matches!(
        collision,
        Err(ThingError::CallbackCollision { ref name }) if name == "Boss"
    ));

    let mismatch = factory.instantiate_entity("Boss");
    assert!(matches!(
        mismatch,
        Err(ThingError::KindMismatch {
            expected: ThingKind::Entity,
            found: ThingKind::Group,
            ..
        })
    ));
}

fn spawn_from_callback(name: &str) -> Option<Box<dyn Entity>> {
    let mut entity = PropertyEntity::new();
    entity.initialize(Some(name), None);
    entity.set_property("spawned_by", "callback");
    Some(Box::new(entity))
}

#[test]
fn test_entity_callback_in_group() {
    let mut factory = loaded_factory();
    // Names held by definitions cannot be overridden
    assert!(matches!(
        factory.register_entity_callback("Scout", spawn_from_callback),
        Err(ThingError::CallbackCollision { .. })
    ));

    factory.unload_file("level1.xml");
    factory
        .register_entity_callback("Scout", spawn_from_callback)
        .unwrap();
    factory
        .add_source(
            r#"<things>
                <group name="Pair">
                    <objectReference name="Scout"/>
                    <objectReference name="Oak"/>
                </group>
            </things>"#,
            "pair.xml",
        )
        .unwrap();

    let members = factory.instantiate_group("Pair").unwrap().unwrap();
    assert_eq!(members.len(), 2);
    assert_eq!(members[0].property("spawned_by"), Some("callback"));
    assert_eq!(members[1].name(), Some("Oak"));

    factory.unregister_entity_callback("Scout").unwrap();
    assert!(matches!(
        factory.unregister_entity_callback("Scout"),
        Err(ThingError::NoSuchOverride { .. })
    ));
}

#[test]
fn test_parse_error_is_reported_with_location() {
    let mut factory = ThingFactory::default();
    let source = "<things>\n  <entity name=\"E\">\n</things>";
    let err = factory.add_source(source, "broken.xml").unwrap_err();
    let LoadError::Parse { text, errors, .. } = &err else {
        panic!("Expected a parse error, got {err:?}");
    };
    assert_eq!(text, source);
    assert!(!errors.is_empty());
    let report = errors[0].format(text, "broken.xml");
    assert!(report.contains("broken.xml"));
    assert!(factory.registry().is_empty());
}

#[test]
fn test_load_file_from_base_path() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("level1.xml"), LEVEL1).unwrap();

    let config = FactoryConfig::new().with_base_path(dir.path());
    let mut factory = ThingFactory::new(&config);
    assert_eq!(factory.load_file("level1.xml").unwrap(), 5);
    assert!(matches!(
        factory.load_file("level2.xml"),
        Err(LoadError::NotFound { .. })
    ));

    let members = factory.instantiate_group("Patrol").unwrap().unwrap();
    assert_eq!(members.len(), 2);

    // Parse failures carry the text read from the resolved path
    let broken = "<things><entity name=\"X\" !/></things>";
    std::fs::write(dir.path().join("broken.xml"), broken).unwrap();
    match factory.load_file("broken.xml") {
        Err(LoadError::Parse { text, .. }) => assert_eq!(text, broken),
        other => panic!("Expected a parse error, got {other:?}"),
    }
}

#[test]
fn test_config_file_sets_reference_prefix() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("factory.toml");
    std::fs::write(&config_path, "[references]\nprefix = \"$\"\n").unwrap();

    let config = FactoryConfig::from_file(&config_path).unwrap();
    let mut factory = ThingFactory::new(&config);
    factory.add_source(LEVEL1, "level1.xml").unwrap();

    // "@Grunt" is a plain value under the "$" prefix
    factory.instantiate_entity("Scout").unwrap().unwrap();
    assert!(factory.take_missing_references().is_empty());
}

#[test]
fn test_group_references_resolve_forward() {
    let mut factory = ThingFactory::default();
    factory
        .add_source(
            r#"<things>
                <entity name="S" leader="@L"/>
                <entity name="L"/>
                <group name="Squad">
                    <objectReference name="S"/>
                    <objectReference name="L"/>
                </group>
            </things>"#,
            "squad.xml",
        )
        .unwrap();

    let members = factory.instantiate_group("Squad").unwrap().unwrap();
    assert_eq!(members.len(), 2);
    // L is built after S but before the group reports
    assert!(factory.take_missing_references().is_empty());
}

#[test]
fn test_failed_member_leaves_no_references() {
    let (mut factory, tracker) = tracking_factory();
    factory
        .add_source(
            r#"<things>
                <entity name="Bad" leader="@Nobody"><script/></entity>
                <entity name="A"/>
                <group name="G">
                    <objectReference name="Bad"/>
                    <objectReference name="A"/>
                </group>
            </things>"#,
            "g.xml",
        )
        .unwrap();

    let members = factory.instantiate_group("G").unwrap().unwrap();
    let names: Vec<_> = members.iter().map(|m| m.name()).collect();
    assert_eq!(names, vec![Some("A")]);
    assert_eq!(*tracker.destroyed.borrow(), vec!["Bad".to_string()]);
    assert!(factory.take_missing_references().is_empty());
}

fn crowd(_: &str) -> Option<Vec<Box<dyn Entity>>> {
    let extras = ["Extra1", "Extra2"].map(|name| {
        let mut entity = PropertyEntity::new();
        entity.initialize(Some(name), None);
        Box::new(entity) as Box<dyn Entity>
    });
    Some(extras.into_iter().collect())
}

#[test]
fn test_group_callback_top_level_and_nested() {
    let mut factory = loaded_factory();
    factory.register_group_callback("Crowd", crowd).unwrap();
    factory.register_group_callback("Nobody", |_| None).unwrap();
    factory
        .add_source(
            r#"<things>
                <group name="Street">
                    <objectReference name="Grunt"/>
                    <groupReference name="Crowd"/>
                </group>
                <group name="Empty">
                    <groupReference name="Nobody"/>
                </group>
            </things>"#,
            "street.xml",
        )
        .unwrap();

    let crowd = factory.instantiate_group("Crowd").unwrap().unwrap();
    assert_eq!(crowd.len(), 2);

    let street = factory.instantiate_group("Street").unwrap().unwrap();
    let names: Vec<_> = street.iter().map(|m| m.name()).collect();
    assert_eq!(names, vec![Some("Grunt"), Some("Extra1"), Some("Extra2")]);

    // A callback that builds nothing makes the referencing group fail
    assert!(factory.instantiate_group("Empty").unwrap().is_none());
}

#[test]
fn test_group_requested_from_entity_callback() {
    let mut factory = ThingFactory::default();
    factory
        .register_entity_callback("Hero", |_| {
            Some(Box::new(PropertyEntity::new()) as Box<dyn Entity>)
        })
        .unwrap();

    assert!(matches!(
        factory.instantiate_group("Hero"),
        Err(ThingError::KindMismatch {
            expected: ThingKind::Group,
            found: ThingKind::Entity,
            ..
        })
    ));
}

#[test]
fn test_nested_integration_error_destroys_members() {
    let (mut factory, tracker) = tracking_factory();
    factory.register_group_callback("Boss", crowd).unwrap();
    factory
        .add_source(
            r#"<things>
                <entity name="A"/>
                <entity name="B"/>
                <group name="G">
                    <objectReference name="A"/>
                    <objectReference name="B"/>
                    <objectReference name="Boss"/>
                </group>
            </things>"#,
            "g.xml",
        )
        .unwrap();

    assert!(matches!(
        factory.instantiate_group("G"),
        Err(ThingError::KindMismatch { ref name, .. }) if name == "Boss"
    ));
    assert_eq!(
        *tracker.destroyed.borrow(),
        vec!["A".to_string(), "B".to_string()]
    );
}

#[test]
fn test_indirect_group_cycle_destroys_members() {
    let (mut factory, tracker) = tracking_factory();
    factory
        .add_source(
            r#"<things>
                <entity name="A"/>
                <entity name="B"/>
                <group name="G">
                    <objectReference name="A"/>
                    <groupReference name="H"/>
                </group>
                <group name="H">
                    <objectReference name="B"/>
                    <groupReference name="G"/>
                </group>
            </things>"#,
            "cycle.xml",
        )
        .unwrap();

    assert!(factory.instantiate_group("G").unwrap().is_none());
    assert_eq!(*tracker.constructed.borrow(), 2);
    assert_eq!(
        *tracker.destroyed.borrow(),
        vec!["A".to_string(), "B".to_string()]
    );
}

#[test]
fn test_rejected_description_destroys_entity() {
    let (mut factory, tracker) = tracking_factory();
    factory
        .add_source(
            r#"<things>
                <entity name="E" target="@Nobody" hp="5"><script/></entity>
            </things>"#,
            "e.xml",
        )
        .unwrap();

    assert!(factory.instantiate_entity("E").unwrap().is_none());
    assert_eq!(*tracker.destroyed.borrow(), vec!["E".to_string()]);
    assert!(factory.take_missing_references().is_empty());
}
