//! Topology model over a lossless YAML document
//!
//! Node and link edits applied in place to a `topo_yaml::Document`, so that
//! everything a human wrote around them survives.
//!
//! # Core Concepts
//!
//! - **Inheritance**: `defaults` → `kinds[kind]` → `groups[group]`; a node
//!   value equal to the inherited one is not written
//! - **Canonical link key**: sorted, joined endpoint pair; the authored order
//!   and brief/extended form do not change a link's identity
//! - **Cascades**: renaming or deleting a node rewrites or prunes its links
//!
//! Operations validate before they mutate: a rejected call leaves the
//! document untouched.
//!
//! # Example
//!
//! ```rust,ignore
//! use topo_model::{add_link, add_node, LinkSaveData, NodeSaveData, DEFAULT_KIND};
//!
//! let mut doc = topo_yaml::Document::parse(&text)?;
//! add_node(&mut doc, &NodeSaveData::new("r1"), DEFAULT_KIND)?;
//! add_link(&mut doc, &LinkSaveData::new("r1", "e1-1", "r2", "e1-1"))?;
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod error;
pub mod links;
pub mod nodes;
pub mod resolver;
pub mod types;

pub use error::{Result, TopologyError};
pub use links::{
    add_link, delete_link, edit_link, endpoint_string, entry_key, read_links, split_endpoint,
    LinkIdentity, LinkSaveData, LinkType,
};
pub use nodes::{add_node, delete_node, edit_node, node_ids};
pub use resolver::{deep_equal, effective_node_config, resolve_inherited_config, PropertyMap};
pub use types::{
    NodeProperties, NodeProperty, NodeSaveData, Position, Renamed, SaveResult, DEFAULT_KIND,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
