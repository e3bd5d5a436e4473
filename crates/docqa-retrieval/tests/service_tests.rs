use std::fs;

use docqa_core::error::Error;
use docqa_core::loader::TextLoader;
use docqa_embed::HashEmbedder;
use docqa_retrieval::{Persistence, RetrievalService, Retriever};
use docqa_vector::FlatIndex;
use tempfile::TempDir;

const DIM: usize = 32;

fn service(snapshot_dir: &std::path::Path) -> RetrievalService {
    let retriever = Retriever::new(
        FlatIndex::new(DIM).unwrap(),
        Box::new(HashEmbedder::new(DIM).unwrap()),
        Box::new(TextLoader::new()),
    )
    .unwrap()
    .with_snapshot_dir(snapshot_dir);
    RetrievalService::new(retriever)
}

#[tokio::test]
async fn ingest_query_reset_round_trip() {
    let docs = TempDir::new().unwrap();
    let store = TempDir::new().unwrap();
    let path = docs.path().join("notes.txt");
    fs::write(&path, "Goats need minerals.\x0cBees swarm in late spring.").unwrap();

    let svc = service(store.path());
    assert!(matches!(svc.query("bees".into(), 1).await, Err(Error::IndexNotBuilt)));

    let report = svc.ingest(vec![path]).await.unwrap();
    assert_eq!(report.total_count, 2);
    assert!(matches!(report.persistence, Persistence::Saved(_)));

    let hits = svc.query("Bees swarm in late spring.".into(), 1).await.unwrap();
    assert_eq!(hits[0].fragment.page, 2);
    assert_eq!(hits[0].fragment.source, "notes.txt");

    let status = svc.status().await.unwrap();
    assert!(status.built);
    assert_eq!(status.sources, vec!["notes.txt".to_string()]);

    svc.reset().await.unwrap();
    assert!(!svc.status().await.unwrap().built);

    let restarted = service(store.path());
    assert!(restarted.restore().await.unwrap());
    assert_eq!(restarted.retriever().total_count(), 2);

    restarted.reset().await.unwrap();
    assert!(matches!(restarted.save_snapshot().await.unwrap(), Persistence::Saved(_)));
    let emptied = service(store.path());
    assert!(emptied.restore().await.unwrap());
    assert_eq!(emptied.retriever().total_count(), 0);
}

#[tokio::test]
async fn concurrent_queries_share_one_index() {
    let docs = TempDir::new().unwrap();
    let store = TempDir::new().unwrap();
    let path = docs.path().join("a.md");
    fs::write(&path, "Wood stoves need dry seasoned firewood and a clean chimney.").unwrap();

    let svc = service(store.path());
    svc.ingest(vec![path]).await.unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let svc = svc.clone();
            tokio::spawn(async move { svc.query("firewood".into(), 3).await })
        })
        .collect();
    for handle in handles {
        let hits = handle.await.unwrap().unwrap();
        assert_eq!(hits.len(), 1);
    }
}

#[tokio::test]
async fn blank_question_surfaces_error() {
    let docs = TempDir::new().unwrap();
    let store = TempDir::new().unwrap();
    let path = docs.path().join("a.txt");
    fs::write(&path, "Something to index.").unwrap();

    let svc = service(store.path());
    svc.ingest(vec![path]).await.unwrap();
    assert!(matches!(svc.query("  ".into(), 2).await, Err(Error::EmptyQuestion)));
}
