//! Error types for the voxel world.
//!
//! Uses `thiserror` for the error definitions. Most anomalies in the entity
//! system are resolved leniently (logged, then a null reference or a no-op);
//! the kinds below cover the conditions that surface as real errors.

use thiserror::Error;

use crate::entity_system::EntityId;

/// The main error type of the crate.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional context about where the error occurred.
    pub context: Option<String>,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    /// Adds context to this error.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Creates a stale entity reference error.
    #[must_use]
    pub fn stale_entity(id: EntityId) -> Self {
        Self::new(ErrorKind::StaleEntity(id))
    }

    /// Creates an error for a component type missing from the component library.
    #[must_use]
    pub fn unregistered_component(name: &'static str) -> Self {
        Self::new(ErrorKind::UnregisteredComponent(name))
    }

    /// Creates a light range error.
    #[must_use]
    pub fn light_out_of_range(value: i32) -> Self {
        Self::new(ErrorKind::LightOutOfRange(value))
    }

    /// Creates an error for local coordinates outside a chunk.
    #[must_use]
    pub fn out_of_chunk_bounds(x: i32, y: i32, z: i32) -> Self {
        Self::new(ErrorKind::OutOfChunkBounds { x, y, z })
    }

    /// Creates a serialization error.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Serialization(message.into()))
    }

    /// Creates a compression error.
    #[must_use]
    pub fn compression(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Compression(message.into()))
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config(message.into()))
    }

    /// Returns true if this error means a persisted resource simply is not there.
    pub fn is_not_found(&self) -> bool {
        matches!(&self.kind, ErrorKind::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::new(ErrorKind::Io(error))
    }
}

/// Categorized error kinds for pattern matching.
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// The entity reference was invalidated by a destroy.
    #[error("stale entity reference: {0}")]
    StaleEntity(EntityId),

    /// A component type was used without being registered in the component library.
    #[error("component type is not registered: {0}")]
    UnregisteredComponent(&'static str),

    /// A light value outside `0..=15` was written.
    #[error("light value out of range: {0}")]
    LightOutOfRange(i32),

    /// Local coordinates do not address a cell of the chunk.
    #[error("position ({x}, {y}, {z}) is outside the chunk")]
    OutOfChunkBounds {
        /// Local x coordinate.
        x: i32,
        /// Local y coordinate.
        y: i32,
        /// Local z coordinate.
        z: i32,
    },

    /// A region with non-positive extents was supplied.
    #[error("region is empty")]
    InvalidRegion,

    /// A chunk was asked to generate without a provider context attached.
    #[error("chunk {0} has no provider context attached")]
    DetachedChunk(i64),

    /// Underlying I/O failure.
    #[error("i/o error: {0}")]
    Io(std::io::Error),

    /// Encoding or decoding failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Compression or decompression failed.
    #[error("compression error: {0}")]
    Compression(String),

    /// The configuration could not be read.
    #[error("configuration error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_kind_message() {
        let err = Error::light_out_of_range(16);
        assert_eq!(err.to_string(), "light value out of range: 16");
    }

    #[test]
    fn context_is_attached() {
        let err = Error::stale_entity(7).with_context("adding component");
        assert!(matches!(err.kind, ErrorKind::StaleEntity(7)));
        assert_eq!(err.context.as_deref(), Some("adding component"));
    }

    #[test]
    fn not_found_io_errors_are_detected() {
        let err: Error = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(err.is_not_found());
        assert!(!Error::compression("bad frame").is_not_found());
    }
}
