//! Entity system integration tests.

mod lifecycle;
mod prefabs;
mod properties;

use voxel_world::entity_system::Component;

#[derive(Debug, Clone, PartialEq)]
pub struct Health(pub i32);
impl Component for Health {}

#[derive(Debug, Clone, PartialEq)]
pub struct Name(pub String);
impl Component for Name {}
