use cgmath::Vector3;
use voxel_world::entity_system::{
    ComponentTypeId, EntityInfoComponent, EntityManager, LocationComponent, Prefab,
};

use crate::Health;

fn manager_with_marker() -> EntityManager {
    let mut manager = EntityManager::new();
    manager.component_library_mut().register::<Health>();
    manager.prefab_manager_mut().register(
        Prefab::builder("marker")
            .with(LocationComponent::default())
            .with(Health(10))
            .persisted(false)
            .build(),
    );
    manager
}

#[test]
fn prefab_instances_are_placed_and_independent() {
    let mut manager = manager_with_marker();
    let position = Vector3::new(10.0, 0.0, 10.0);

    let first = manager.create_from_prefab_at("marker", position);
    let second = manager.create_from_prefab_at("marker", position);
    assert_ne!(first.id(), second.id());

    let location = manager.get_component::<LocationComponent>(&first).unwrap().unwrap();
    assert_eq!(location.world_position, position);

    manager
        .get_component_mut::<LocationComponent>(&first)
        .unwrap()
        .unwrap()
        .world_position = Vector3::new(0.0, 5.0, 0.0);
    let untouched = manager.get_component::<LocationComponent>(&second).unwrap().unwrap();
    assert_eq!(untouched.world_position, position);
}

#[test]
fn mutating_an_instance_leaves_the_prefab_alone() {
    let mut manager = manager_with_marker();
    let entity = manager.create_from_prefab("marker");

    manager.get_component_mut::<Health>(&entity).unwrap().unwrap().0 = 1;

    let prefab = manager.prefab_manager().get("marker").unwrap();
    assert_eq!(prefab.get::<Health>(), Some(&Health(10)));
    assert_eq!(prefab.get::<LocationComponent>(), Some(&LocationComponent::default()));
}

#[test]
fn instance_carries_prefab_bookkeeping() {
    let mut manager = manager_with_marker();
    let entity = manager.create_from_prefab("marker");

    let info = manager.get_component::<EntityInfoComponent>(&entity).unwrap().unwrap();
    assert_eq!(info.parent_prefab.as_deref(), Some("marker"));
    assert!(!info.persisted);

    let mut types = manager.component_types(&entity).unwrap();
    types.sort_by_key(|t| t.name());
    let mut expected = vec![
        ComponentTypeId::of::<EntityInfoComponent>(),
        ComponentTypeId::of::<Health>(),
        ComponentTypeId::of::<LocationComponent>(),
    ];
    expected.sort_by_key(|t| t.name());
    assert_eq!(types, expected);
}

#[test]
fn unknown_prefab_gives_the_null_reference() {
    let mut manager = manager_with_marker();
    assert!(manager.create_from_prefab("missing").is_null());
    assert_eq!(manager.active_entity_count(), 0);
}
