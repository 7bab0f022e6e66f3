//! Annotation sidecar for topology files
//!
//! Each topology file has a JSON sidecar (`<file>.annotations.json`) holding
//! presentation metadata: node positions, network nodes, group styles, free
//! text and shapes. Nothing structural lives here.
//!
//! # Core Concepts
//!
//! - [`AnnotationStore::load`]: cached for a short freshness window
//! - [`AnnotationStore::save`]: skipped when the bytes on disk already match
//! - [`AnnotationStore::modify`]: per-path locked read-apply-write, the only
//!   way cascades touch the sidecar
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use topo_annotations::{AnnotationStore, FsStorage};
//!
//! let store = AnnotationStore::new(Arc::new(FsStorage));
//! store.modify(&topology, |a| { a.rename_node("r1", "spine1"); }).await?;
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod error;
pub mod model;
pub mod storage;
pub mod store;

pub use error::{AnnotationError, Result};
pub use model::{
    FreeShapeAnnotation, FreeTextAnnotation, GeoCoordinates, GroupStyleAnnotation,
    NetworkNodeAnnotation, NodeAnnotation, NodePosition, TopologyAnnotations,
};
pub use storage::{FsStorage, MemoryStorage, Storage};
pub use store::{AnnotationStore, DEFAULT_FRESHNESS, DEFAULT_SUFFIX};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
