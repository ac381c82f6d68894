//! # Core Module
//!
//! Shared resource containers used throughout the engine.
//!
//! ## Key Components
//! - `MtResource`: Thread-safe reference-counted resource with read-write locking
//! - `StResource`: Single-threaded reference-counted resource with interior mutability
//!
//! ## Usage
//! ```rust
//! use voxel_world::core::{MtResource, StResource};
//!
//! // Thread-safe resource
//! let counter = MtResource::new(0);
//! *counter.get_mut() += 1;
//! assert_eq!(*counter.get(), 1);
//!
//! // Single-threaded resource
//! let names = StResource::new(Vec::<String>::new());
//! names.get_mut().push("torch".to_string());
//! assert_eq!(names.get().len(), 1);
//! ```

pub mod mt_resource;
pub mod st_resource;

pub use mt_resource::MtResource;
pub use st_resource::StResource;
