//! Round-trip identity and targeted-edit behaviour of the document adapter.
//!
//! An unmodified document must serialize to the bytes it was parsed from,
//! whatever mix of styles a human used to write it.

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_yaml::{Mapping as ValueMapping, Value};
use topo_yaml::{Document, Node};

const HAND_WRITTEN: &str = r#"---
# Containerlab topology
name: "dc-fabric"   # quoted on purpose

mgmt:
  network: custom_mgmt
  ipv4-subnet: 172.100.100.0/24

topology:
  defaults:
    kind: nokia_srlinux
    env:
      TZ: UTC
  kinds:
    nokia_srlinux:
      image: ghcr.io/nokia/srlinux:23.10.1
      type: ixrd3l
  groups:
    spines: {type: ixrd3}
  nodes:
    spine1:
      group: spines
      startup-config: |
        set / system name host-name spine1
        set / interface ethernet-1/1 admin-state enable

    leaf1:   # first leaf
      binds:
        - ./configs/leaf1.cfg:/tmp/leaf1.cfg:ro
      exec: ['ip link set dev e1-1 mtu 9000']
    "10":
      kind: linux
  links:
    # fabric
    - endpoints: ["spine1:e1-1", "leaf1:e1-49"]
    - endpoints:
      - "spine1:e1-2"
      - "10:eth1"

    - type: macvlan
      endpoint: { node: leaf1, interface: e1-10 }
      host-interface: enp0s3
      mode: bridge
...
"#;

#[test]
fn hand_written_document_round_trips() {
    let doc = Document::parse(HAND_WRITTEN).unwrap();
    assert_eq!(doc.serialize(), HAND_WRITTEN);
}

#[test]
fn hand_written_document_semantics_match_serde_yaml() {
    let doc = Document::parse(HAND_WRITTEN).unwrap();
    let body = HAND_WRITTEN.replace("...\n", "");
    let expected: Value = serde_yaml::from_str(&body).unwrap();
    assert_eq!(doc.to_value(), expected);
}

#[test]
fn renaming_a_key_only_rewrites_that_entry() {
    let mut doc = Document::parse(HAND_WRITTEN).unwrap();
    let nodes = doc.ensure_mapping(&["topology", "nodes"]).unwrap();
    assert!(nodes.rename("leaf1", "leaf01"));

    let out = doc.serialize();
    assert!(out.contains("    \"10\":\n      kind: linux\n    leaf01:   # first leaf\n"));
    assert!(out.contains("set / system name host-name spine1\n"));
    assert!(out.ends_with("      mode: bridge\n...\n"));
}

#[test]
fn editing_inside_a_link_keeps_other_links() {
    let mut doc = Document::parse(HAND_WRITTEN).unwrap();
    let links = doc.ensure_sequence(&["topology", "links"]).unwrap();
    let macvlan = links.get_mut(2).and_then(Node::as_mapping_mut).unwrap();
    macvlan.insert("mode", Node::string("passthru"));

    let out = doc.serialize();
    assert!(out.contains("    # fabric\n    - endpoints: [\"spine1:e1-1\", \"leaf1:e1-49\"]\n"));
    assert!(out.contains(
        "\n    - type: macvlan\n      endpoint: { node: leaf1, interface: e1-10 }\n      host-interface: enp0s3\n      mode: passthru\n"
    ));
}

fn arb_scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(|n| Value::Number(n.into())),
        "[a-zA-Z0-9 :#'\"./_-]{0,12}".prop_map(Value::String),
    ]
}

fn arb_value() -> impl Strategy<Value = Value> {
    arb_scalar().prop_recursive(4, 32, 5, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Sequence),
            prop::collection::btree_map("[a-z]{1,6}", inner, 0..4).prop_map(|map| {
                let mut out = ValueMapping::new();
                for (k, v) in map {
                    out.insert(Value::String(k), v);
                }
                Value::Mapping(out)
            }),
        ]
    })
}

proptest! {
    #[test]
    fn prop_serde_yaml_output_round_trips(value in arb_value()) {
        let mut root = ValueMapping::new();
        root.insert(Value::String("root".into()), value);
        let text = serde_yaml::to_string(&Value::Mapping(root)).unwrap();

        let doc = Document::parse(&text).unwrap();
        prop_assert_eq!(doc.serialize(), text.clone());
        prop_assert_eq!(doc.to_value(), serde_yaml::from_str::<Value>(&text).unwrap());
    }
}
