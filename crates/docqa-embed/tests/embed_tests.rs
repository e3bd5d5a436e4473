use docqa_core::config::EmbeddingConfig;
use docqa_core::error::Error;
use docqa_core::traits::Embedder;
use docqa_embed::{default_embedder, HashEmbedder};

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[test]
fn hash_embedder_shapes_and_determinism() {
    let embedder = HashEmbedder::new(384).expect("embedder");
    let texts = vec!["hello world".to_string(), "hello world".to_string()];
    let embs = embedder.embed_batch(&texts).expect("embed_batch");
    assert_eq!(embs.len(), 2);
    let (v1, v2) = (&embs[0], &embs[1]);

    assert_eq!(v1.len(), 384, "embedding dim is 384");
    let norm: f32 = v1.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");
    for (a, b) in v1.iter().zip(v2.iter()) {
        assert!((a - b).abs() <= 1e-6);
    }
}

#[test]
fn shared_words_score_higher_than_unrelated_text() {
    let embedder = HashEmbedder::new(256).expect("embedder");
    let q = embedder.embed_one("how to start a fire").expect("query");
    let related = embedder.embed_one("start a fire with flint and tinder").expect("related");
    let unrelated = embedder.embed_one("quarterly revenue grew by eight percent").expect("unrelated");
    assert!(cosine(&q, &related) > cosine(&q, &unrelated));
}

#[test]
fn empty_batch_is_rejected() {
    let embedder = HashEmbedder::new(8).expect("embedder");
    assert!(matches!(embedder.embed_batch(&[]), Err(Error::EmptyInput(_))));
}

#[test]
fn blank_query_is_rejected() {
    let embedder = HashEmbedder::new(8).expect("embedder");
    assert!(matches!(embedder.embed_one("   \n"), Err(Error::EmptyInput(_))));
}

#[test]
fn zero_dimension_is_invalid() {
    assert!(matches!(HashEmbedder::new(0), Err(Error::InvalidConfig(_))));
}

#[test]
fn default_embedder_uses_hash_backend() {
    let config = EmbeddingConfig { dimension: 64, ..EmbeddingConfig::default() };
    let embedder = default_embedder(&config, None).expect("embedder");
    assert_eq!(embedder.dim(), 64);
    assert_eq!(embedder.model_id(), "hash:d64");
}
