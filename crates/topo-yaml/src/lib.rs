//! Lossless YAML document model
//!
//! Parses human-edited YAML into a mutable tree that keeps comments, key
//! order, quoting and spacing, and writes it back touching only what changed.
//!
//! # Core Concepts
//!
//! - [`Document`]: parse / serialize; an unmodified document round-trips byte for byte
//! - [`Node`]: scalar, mapping or sequence with path-addressed access
//! - [`Node::quoted`]: force a double-quoted string (endpoint strings like `eth0:1`)
//!
//! # Example
//!
//! ```rust,ignore
//! use topo_yaml::{Document, Mapping, Node};
//!
//! let mut doc = Document::parse(text)?;
//! let nodes = doc.ensure_mapping(&["topology", "nodes"])?;
//! let mut r3 = Mapping::new();
//! r3.insert("kind", Node::string("linux"));
//! nodes.insert("r3", Node::Mapping(r3));
//! std::fs::write(path, doc.serialize())?;
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod document;
mod emitter;
mod error;
mod node;
mod parser;
mod scan;

pub use document::{Document, DEFAULT_INDENT};
pub use error::{ParseError, PathError};
pub use node::{Mapping, Node, Scalar, ScalarStyle, Sequence};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
