//! Property tests: key symmetry, inheritance idempotence, cascade completeness

use proptest::prelude::*;
use topo_model::{
    add_link, add_node, delete_node, edit_node, read_links, resolve_inherited_config,
    LinkIdentity, LinkSaveData, NodeProperty, NodeSaveData, DEFAULT_KIND,
};
use topo_test_utils::EMPTY_TOPOLOGY;
use topo_yaml::Document;

fn arb_endpoint() -> impl Strategy<Value = (String, String)> {
    ("[a-z][a-z0-9]{0,4}", "[a-z0-9-]{0,5}")
}

fn lab(nodes: usize, links: &[(usize, usize, u8)]) -> Document {
    let mut doc = Document::parse(EMPTY_TOPOLOGY).unwrap();
    for i in 0..nodes {
        add_node(&mut doc, &NodeSaveData::new(format!("n{i}")), DEFAULT_KIND).unwrap();
    }
    for &(a, b, port) in links {
        if a != b {
            let link = LinkSaveData::new(format!("n{a}"), format!("e1-{port}"), format!("n{b}"), "eth1");
            let _ = add_link(&mut doc, &link);
        }
    }
    doc
}

fn arb_links() -> impl Strategy<Value = Vec<(usize, usize, u8)>> {
    prop::collection::vec((0..5usize, 0..5usize, 1..4u8), 0..12)
}

proptest! {
    #[test]
    fn prop_canonical_key_is_symmetric(a in arb_endpoint(), b in arb_endpoint()) {
        let ab = LinkIdentity::new(&a.0, &a.1, &b.0, &b.1);
        let ba = LinkIdentity::new(&b.0, &b.1, &a.0, &a.1);
        prop_assert_eq!(ab.canonical_key(), ba.canonical_key());
    }

    #[test]
    fn prop_inherited_value_is_not_written(image in "[a-z]{1,8}:[0-9]{1,2}") {
        let text = format!(
            "topology:\n  defaults:\n    kind: linux\n    image: {image}\n  nodes:\n    h1:\n      image: other:1\n"
        );
        let mut doc = Document::parse(&text).unwrap();
        let resolved = resolve_inherited_config(&doc, None, Some("linux"));
        let inherited = resolved.get("image").cloned().unwrap();

        let data = NodeSaveData::new("h1").with_property(NodeProperty::Image, inherited);
        edit_node(&mut doc, &data, false).unwrap();
        let h1 = doc.get_path(&["topology", "nodes", "h1"]).unwrap();
        prop_assert!(h1.get("image").is_none());
    }

    #[test]
    fn prop_rename_leaves_no_reference(links in arb_links()) {
        let mut doc = lab(5, &links);
        edit_node(&mut doc, &NodeSaveData::new("n0").with_name("renamed"), false).unwrap();
        for link in read_links(&doc) {
            prop_assert!(!link.identity().references("n0"));
        }
        let before = lab(5, &links);
        prop_assert_eq!(read_links(&doc).len(), read_links(&before).len());
    }

    #[test]
    fn prop_delete_leaves_no_reference(links in arb_links(), victim in 0..5usize) {
        let mut doc = lab(5, &links);
        let id = format!("n{victim}");
        delete_node(&mut doc, &id).unwrap();
        for link in read_links(&doc) {
            prop_assert!(!link.identity().references(&id));
        }
    }
}
