//! Topology I/O orchestrator
//!
//! Composes the lossless document, the node/link operations and the
//! annotation store behind one session API. Every mutating call returns a
//! [`SaveResult`]; nothing panics or leaks an error type across it.
//!
//! # Core Concepts
//!
//! - **Batching**: `begin_batch`/`end_batch` nest; only the outermost
//!   `end_batch` writes, once
//! - **Save dedup**: the serialized document is compared with the bytes
//!   currently on disk and not written when equal
//! - **Cascades**: a rename re-keys the node's annotations, a delete prunes
//!   them, both through the store's locked `modify`
//! - **Suppression window**: after a write, file-change notifications are
//!   our own for a short while
//!
//! # Example
//!
//! ```rust,ignore
//! use topo_io::{TopologyIo, TopologyIoConfig};
//! use topo_model::{LinkSaveData, NodeSaveData};
//!
//! let mut io = TopologyIo::open("lab.clab.yml", TopologyIoConfig::default()).await?;
//! io.begin_batch();
//! io.add_node(&NodeSaveData::new("r3")).await;
//! io.add_link(&LinkSaveData::new("r1", "e1-3", "r3", "e1-1")).await;
//! let result = io.end_batch().await;
//! assert!(result.success);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod config;
pub mod error;
pub mod io;

pub use config::TopologyIoConfig;
pub use error::{IoError, Result};
pub use io::TopologyIo;
pub use topo_model::{Renamed, SaveResult};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
