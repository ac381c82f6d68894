use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use super::{EntityId, NULL_ID};

#[derive(Debug)]
struct RefState {
    id: EntityId,
    valid: AtomicBool,
}

/// A handle to an entity.
///
/// References are cached per id by the owning pool, so looking the same
/// entity up twice hands out clones of one shared slot ([`EntityRef::same_slot`]
/// is true for them). Destroying the entity invalidates the slot; every clone
/// then reports itself as stale and the manager refuses to act through it.
///
/// The null reference (id 0) is never valid and never exists.
#[derive(Clone)]
pub struct EntityRef {
    state: Arc<RefState>,
}

impl EntityRef {
    pub(crate) fn new(id: EntityId) -> Self {
        Self {
            state: Arc::new(RefState {
                id,
                valid: AtomicBool::new(id != NULL_ID),
            }),
        }
    }

    /// The null reference.
    pub fn null() -> Self {
        Self::new(NULL_ID)
    }

    /// The referenced entity id.
    pub fn id(&self) -> EntityId {
        self.state.id
    }

    /// True for the null reference.
    pub fn is_null(&self) -> bool {
        self.state.id == NULL_ID
    }

    /// False once the entity was destroyed through any clone of this reference.
    pub fn is_valid(&self) -> bool {
        self.state.valid.load(Ordering::Acquire)
    }

    /// True if both references share the same cached slot.
    pub fn same_slot(&self, other: &EntityRef) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }

    pub(crate) fn invalidate(&self) {
        self.state.valid.store(false, Ordering::Release);
    }
}

impl PartialEq for EntityRef {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for EntityRef {}

impl std::hash::Hash for EntityRef {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl fmt::Debug for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "EntityRef(NULL)")
        } else if self.is_valid() {
            write!(f, "EntityRef({})", self.id())
        } else {
            write!(f, "EntityRef({}, invalidated)", self.id())
        }
    }
}
