//! Interleaved callers on one sidecar

use futures::future::join_all;
use std::path::Path;
use std::sync::Arc;
use topo_annotations::{AnnotationStore, FsStorage, MemoryStorage, TopologyAnnotations};
use topo_model::Position;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn overlapping_modifies_keep_every_mutation() {
    topo_test_utils::init_tracing();
    let storage = Arc::new(MemoryStorage::new());
    let store = Arc::new(AnnotationStore::new(storage.clone()));

    let tasks: Vec<_> = (0..32)
        .map(|i| {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .modify(Path::new("/lab.yml"), move |a| {
                        a.set_node_position(&format!("n{i}"), Position::new(f64::from(i), 0.0));
                    })
                    .await
            })
        })
        .collect();
    for task in join_all(tasks).await {
        task.unwrap().unwrap();
    }

    let bytes = storage.get(Path::new("/lab.yml.annotations.json")).unwrap();
    let on_disk: TopologyAnnotations = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(on_disk.node_annotations.len(), 32);
    for i in 0..32 {
        assert!(on_disk.node(&format!("n{i}")).is_some());
    }
}

#[tokio::test]
async fn queued_saves_land_in_call_order() {
    let storage = Arc::new(MemoryStorage::new());
    let store = AnnotationStore::new(storage.clone());
    let topo = Path::new("/lab.yml");

    let versions: Vec<TopologyAnnotations> = (0..8)
        .map(|i| {
            let mut a = TopologyAnnotations::default();
            a.set_node_position("r1", Position::new(f64::from(i), 0.0));
            a
        })
        .collect();
    let results = join_all(versions.iter().map(|a| store.save(topo, a))).await;
    assert!(results.iter().all(Result::is_ok));

    let last = store.load(topo, true).await.unwrap();
    assert_eq!(last.node("r1").unwrap().position, Some(Position::new(7.0, 0.0)));
    assert_eq!(storage.writes(), 8);
}

#[tokio::test]
async fn rename_and_delete_cascades_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let topo = dir.path().join("lab.clab.yml");
    let store = AnnotationStore::new(Arc::new(FsStorage));

    store
        .modify(&topo, |a| {
            a.set_node_position("r1", Position::new(1.0, 1.0));
            a.set_node_position("r2", Position::new(2.0, 2.0));
        })
        .await
        .unwrap();
    store.modify(&topo, |a| {
        a.rename_node("r1", "spine1");
    })
    .await
    .unwrap();
    store.modify(&topo, |a| {
        a.remove_node("r2");
    })
    .await
    .unwrap();

    let text = std::fs::read_to_string(dir.path().join("lab.clab.yml.annotations.json")).unwrap();
    let on_disk: TopologyAnnotations = serde_json::from_str(&text).unwrap();
    let ids: Vec<_> = on_disk.node_annotations.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, ["spine1"]);
    assert!(text.ends_with("}\n"));
}
