//! Testing utilities for the topology workspace
//!
//! Shared fixtures, temp-dir helpers and tracing setup.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

/// Hand-written lab with comments, flow and block styles, both link forms
pub const SAMPLE_TOPOLOGY: &str = "\
# two-tier lab
name: clos   # small

topology:
  defaults:
    kind: nokia_srlinux
  kinds:
    nokia_srlinux:
      image: ghcr.io/nokia/srlinux:latest
      type: ixrd3
    linux:
      image: alpine:3
  groups:
    spines:
      type: ixrd2
  nodes:
    # fabric
    spine1:
      group: spines
    leaf1:
      image: ghcr.io/nokia/srlinux:23.10   # pinned
    client1: {kind: linux}

  links:
    - endpoints: [\"spine1:e1-1\", \"leaf1:e1-49\"]
    # access
    - endpoints: [\"leaf1:e1-1\", \"client1:eth1\"]
    - type: host
      endpoint: {node: client1, interface: eth2}
      host-interface: client1-eth2
";

/// Minimal document with an empty node mapping
pub const EMPTY_TOPOLOGY: &str = "name: empty\ntopology:\n  nodes: {}\n";

/// Install a test subscriber honouring `RUST_LOG`; safe to call repeatedly
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Write `text` to `dir/name` and return the path
pub fn write_topology(dir: &Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, text).unwrap();
    path
}

/// Fresh temp dir holding `lab.clab.yml` with `text`
pub fn temp_topology(text: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = write_topology(dir.path(), "lab.clab.yml", text);
    (dir, path)
}
