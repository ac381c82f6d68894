use proptest::prelude::*;
use voxel_world::entity_system::{EntityManager, Prefab};

use crate::{Health, Name};

proptest! {
    #[test]
    fn replacing_a_component_keeps_the_last_value(values in prop::collection::vec(any::<i32>(), 1..8)) {
        let mut manager = EntityManager::new();
        let entity = manager.create(vec![Box::new(Health(0))]);
        for value in &values {
            manager.add_component(&entity, Health(*value)).unwrap();
        }
        let last = values.last().copied().unwrap();
        prop_assert_eq!(manager.get_component::<Health>(&entity).unwrap(), Some(&Health(last)));
    }

    #[test]
    fn destroying_any_id_twice_leaves_the_rest(count in 1usize..12, victim in 0usize..12) {
        let mut manager = EntityManager::new();
        let entities: Vec<_> = (0..count)
            .map(|i| manager.create(vec![Box::new(Health(i as i32))]))
            .collect();
        let victim = entities[victim % count].id();

        manager.destroy(victim);
        manager.destroy(victim);

        prop_assert_eq!(manager.active_entity_count(), count - 1);
        prop_assert!(!manager.is_active(victim));
    }

    #[test]
    fn prefab_copies_are_deep(health in any::<i32>(), name in "[a-z]{1,12}") {
        let mut manager = EntityManager::new();
        manager.component_library_mut().register::<Health>();
        manager.component_library_mut().register::<Name>();
        manager.prefab_manager_mut().register(
            Prefab::builder("p").with(Health(health)).with(Name(name.clone())).build(),
        );

        let entity = manager.create_from_prefab("p");
        manager.get_component_mut::<Name>(&entity).unwrap().unwrap().0.push('!');

        let prefab = manager.prefab_manager().get("p").unwrap();
        prop_assert_eq!(prefab.get::<Name>(), Some(&Name(name)));
        prop_assert_eq!(prefab.get::<Health>(), Some(&Health(health)));
    }
}
