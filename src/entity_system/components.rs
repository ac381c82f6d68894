//! Built-in components every entity manager knows about.

use cgmath::{Quaternion, Vector3};

use super::{Component, EntityId, NULL_ID};

/// Bookkeeping attached to every entity.
///
/// Created implicitly by the entity manager when the caller does not supply
/// one. Prefab instancing fills in the prefab name and the two flags.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityInfoComponent {
    /// Name of the prefab the entity was created from.
    pub parent_prefab: Option<String>,
    /// Whether the entity is written to storage.
    pub persisted: bool,
    /// Whether the entity stays loaded regardless of the relevance regions.
    pub always_relevant: bool,
    /// Owning entity, [`NULL_ID`] when unowned.
    pub owner: EntityId,
}

impl Default for EntityInfoComponent {
    fn default() -> Self {
        Self {
            parent_prefab: None,
            persisted: true,
            always_relevant: false,
            owner: NULL_ID,
        }
    }
}

impl EntityInfoComponent {
    /// Bookkeeping for an entity instantiated from a prefab.
    pub fn from_prefab(name: &str, persisted: bool, always_relevant: bool) -> Self {
        Self {
            parent_prefab: Some(name.to_string()),
            persisted,
            always_relevant,
            owner: NULL_ID,
        }
    }
}

impl Component for EntityInfoComponent {}

/// Position and orientation of an entity in the world.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationComponent {
    /// World space position.
    pub world_position: Vector3<f32>,
    /// World space rotation.
    pub world_rotation: Quaternion<f32>,
}

impl Default for LocationComponent {
    fn default() -> Self {
        Self {
            world_position: Vector3::new(0.0, 0.0, 0.0),
            world_rotation: Quaternion::new(1.0, 0.0, 0.0, 0.0),
        }
    }
}

impl LocationComponent {
    /// A location at `position` with no rotation.
    pub fn at(position: Vector3<f32>) -> Self {
        Self {
            world_position: position,
            ..Self::default()
        }
    }
}

impl Component for LocationComponent {}
