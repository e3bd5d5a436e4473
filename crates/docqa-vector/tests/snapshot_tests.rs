use std::fs;
use std::path::Path;

use docqa_core::error::Error;
use docqa_core::traits::Embedder;
use docqa_core::types::Fragment;
use docqa_embed::HashEmbedder;
use docqa_vector::snapshot::{self, Manifest, MANIFEST_FILE};
use docqa_vector::{FlatIndex, NearestNeighborIndex};
use tempfile::TempDir;

const DIM: usize = 64;

fn corpus() -> Vec<(&'static str, &'static str, u32)> {
    vec![
        ("Solar panels convert sunlight into electricity.", "energy.txt", 1),
        ("Rainwater can be collected from rooftops and filtered.", "water.txt", 1),
        ("Chickens need a dry coop and fresh water daily.", "animals.txt", 2),
        ("Compost turns kitchen scraps into garden soil.", "garden.md", 4),
    ]
}

fn populated_index(embedder: &HashEmbedder) -> FlatIndex {
    let mut index = FlatIndex::new(DIM).expect("index");
    let (fragments, texts): (Vec<Fragment>, Vec<String>) = corpus()
        .into_iter()
        .map(|(text, source, page)| {
            (Fragment { id: 0, text: text.into(), source: source.into(), page }, text.to_string())
        })
        .unzip();
    let vectors = embedder.embed_batch(&texts).expect("embed");
    index.insert_batch(fragments, vectors).expect("insert");
    index
}

fn live_manifest(dir: &Path) -> Manifest {
    snapshot::read_manifest(dir).unwrap().expect("manifest")
}

fn small_index(embedder: &HashEmbedder, texts: &[&str]) -> FlatIndex {
    let mut index = FlatIndex::new(DIM).unwrap();
    let fragments = texts
        .iter()
        .map(|t| Fragment { id: 0, text: t.to_string(), source: "notes.txt".into(), page: 1 })
        .collect();
    let owned: Vec<String> = texts.iter().map(|t| t.to_string()).collect();
    index.insert_batch(fragments, embedder.embed_batch(&owned).unwrap()).unwrap();
    index
}

#[test]
fn save_then_load_restores_fragments_and_rankings() {
    let dir = TempDir::new().unwrap();
    let embedder = HashEmbedder::new(DIM).unwrap();
    let original = populated_index(&embedder);
    original.save(dir.path()).expect("save");

    let mut restored = FlatIndex::new(DIM).unwrap();
    assert!(restored.load(dir.path()).expect("load"));
    assert_eq!(restored.total_count(), original.total_count());
    assert_eq!(restored.fragments(), original.fragments());
    assert_eq!(restored.fragments()[3].source, "garden.md");
    assert_eq!(restored.fragments()[3].page, 4);

    let query = embedder.embed_one("Rainwater can be collected from rooftops").unwrap();
    let before = original.search(&query, 3).unwrap();
    let after = restored.search(&query, 3).unwrap();
    assert_eq!(before, after);
    assert_eq!(after[0].fragment.source, "water.txt");
}

#[test]
fn open_reads_existing_snapshot() {
    let dir = TempDir::new().unwrap();
    let embedder = HashEmbedder::new(DIM).unwrap();
    populated_index(&embedder).save(dir.path()).unwrap();

    let index = FlatIndex::open(dir.path(), DIM).expect("open");
    assert_eq!(index.total_count(), 4);
}

#[test]
fn missing_directory_loads_as_absent() {
    let dir = TempDir::new().unwrap();
    let mut index = FlatIndex::new(DIM).unwrap();
    assert!(!index.load(&dir.path().join("never-written")).unwrap());
    assert_eq!(index.total_count(), 0);
}

#[test]
fn missing_either_file_loads_as_absent() {
    let embedder = HashEmbedder::new(DIM).unwrap();
    for pick_vectors in [true, false] {
        let dir = TempDir::new().unwrap();
        populated_index(&embedder).save(dir.path()).unwrap();
        let manifest = live_manifest(dir.path());
        let victim = if pick_vectors { manifest.vectors } else { manifest.fragments };
        fs::remove_file(dir.path().join(&victim)).unwrap();

        let mut index = FlatIndex::new(DIM).unwrap();
        assert!(!index.load(dir.path()).unwrap(), "{} removed", victim);
        assert_eq!(index.total_count(), 0);
    }
}

#[test]
fn edited_fragments_file_is_rejected() {
    let dir = TempDir::new().unwrap();
    let embedder = HashEmbedder::new(DIM).unwrap();
    populated_index(&embedder).save(dir.path()).unwrap();

    let path = dir.path().join(live_manifest(dir.path()).fragments);
    let edited = fs::read_to_string(&path).unwrap().replace("Solar", "Lunar");
    fs::write(&path, edited).unwrap();

    assert!(snapshot::read(dir.path()).unwrap().is_none());
    let mut index = FlatIndex::new(DIM).unwrap();
    assert!(!index.load(dir.path()).unwrap());
}

#[test]
fn truncated_vectors_file_is_rejected() {
    let dir = TempDir::new().unwrap();
    let embedder = HashEmbedder::new(DIM).unwrap();
    populated_index(&embedder).save(dir.path()).unwrap();

    let path = dir.path().join(live_manifest(dir.path()).vectors);
    let bytes = fs::read(&path).unwrap();
    fs::write(&path, &bytes[..bytes.len() - 10]).unwrap();

    assert!(snapshot::read(dir.path()).unwrap().is_none());
}

#[test]
fn loading_a_different_dimension_fails_and_keeps_contents() {
    let dir = TempDir::new().unwrap();
    let embedder = HashEmbedder::new(DIM).unwrap();
    populated_index(&embedder).save(dir.path()).unwrap();

    let mut index = FlatIndex::new(8).unwrap();
    index
        .insert_batch(
            vec![Fragment { id: 0, text: "kept".into(), source: "keep.txt".into(), page: 1 }],
            vec![vec![1.0; 8]],
        )
        .unwrap();
    let err = index.load(dir.path()).unwrap_err();
    assert!(matches!(err, Error::DimensionMismatch { expected: 8, actual: DIM }));
    assert_eq!(index.total_count(), 1);
    assert_eq!(index.fragments()[0].text, "kept");
}

#[test]
fn save_overwrites_previous_snapshot() {
    let dir = TempDir::new().unwrap();
    let embedder = HashEmbedder::new(DIM).unwrap();
    let mut index = populated_index(&embedder);
    index.save(dir.path()).unwrap();

    index.reset();
    let vector = embedder.embed_one("only one fragment now").unwrap();
    index
        .insert_batch(
            vec![Fragment { id: 0, text: "only one fragment now".into(), source: "new.txt".into(), page: 1 }],
            vec![vector],
        )
        .unwrap();
    index.save(dir.path()).unwrap();

    let restored = FlatIndex::open(dir.path(), DIM).unwrap();
    assert_eq!(restored.total_count(), 1);
    assert_eq!(restored.fragments()[0].source, "new.txt");

    let manifest = live_manifest(dir.path());
    assert_eq!(manifest.generation, 2);
    let mut files: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    files.sort();
    let mut expected = vec![manifest.fragments, MANIFEST_FILE.to_string(), manifest.vectors];
    expected.sort();
    assert_eq!(files, expected, "older generations and tmp files are removed");
}

#[test]
fn missing_manifest_loads_as_absent() {
    let dir = TempDir::new().unwrap();
    let embedder = HashEmbedder::new(DIM).unwrap();
    populated_index(&embedder).save(dir.path()).unwrap();
    fs::remove_file(dir.path().join(MANIFEST_FILE)).unwrap();

    let mut index = FlatIndex::new(DIM).unwrap();
    assert!(!index.load(dir.path()).unwrap());
}

#[test]
fn interrupted_save_keeps_previous_snapshot_live() {
    let embedder = HashEmbedder::new(DIM).unwrap();
    let live = TempDir::new().unwrap();
    let staging = TempDir::new().unwrap();

    small_index(&embedder, &["old one", "old two"]).save(live.path()).unwrap();
    let newer = small_index(&embedder, &["new one", "new two", "new three"]);
    newer.save(staging.path()).unwrap();
    newer.save(staging.path()).unwrap();
    let next = live_manifest(staging.path());
    assert_eq!(next.generation, live_manifest(live.path()).generation + 1);

    // Data files of the next generation landed, the manifest swap did not.
    for name in [&next.fragments, &next.vectors] {
        fs::copy(staging.path().join(name), live.path().join(name)).unwrap();
    }
    let mut index = FlatIndex::new(DIM).unwrap();
    assert!(index.load(live.path()).unwrap());
    assert_eq!(index.total_count(), 2);
    assert_eq!(index.fragments()[0].text, "old one");

    // Once the manifest is swapped the new generation is live.
    fs::copy(staging.path().join(MANIFEST_FILE), live.path().join(MANIFEST_FILE)).unwrap();
    assert!(index.load(live.path()).unwrap());
    assert_eq!(index.total_count(), 3);

    // A later save supersedes both generations.
    small_index(&embedder, &["latest"]).save(live.path()).unwrap();
    let restored = FlatIndex::open(live.path(), DIM).unwrap();
    assert_eq!(restored.total_count(), 1);
}

#[test]
fn save_under_a_regular_file_is_a_storage_error() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, "not a directory").unwrap();
    let embedder = HashEmbedder::new(DIM).unwrap();

    let err = populated_index(&embedder).save(&blocker.join("index")).unwrap_err();
    assert!(matches!(err, Error::Storage { .. }), "got {:?}", err);
}

#[test]
fn unreadable_vectors_file_is_a_storage_error() {
    let dir = TempDir::new().unwrap();
    let embedder = HashEmbedder::new(DIM).unwrap();
    populated_index(&embedder).save(dir.path()).unwrap();
    let vectors = dir.path().join(live_manifest(dir.path()).vectors);
    fs::remove_file(&vectors).unwrap();
    fs::create_dir(&vectors).unwrap();

    let mut index = small_index(&embedder, &["kept"]);
    let err = index.load(dir.path()).unwrap_err();
    assert!(matches!(err, Error::Storage { ref path, .. } if path == &vectors), "got {:?}", err);
    assert_eq!(index.total_count(), 1);
    assert_eq!(index.fragments()[0].text, "kept");
}

#[test]
fn empty_index_round_trips() {
    let dir = TempDir::new().unwrap();
    FlatIndex::new(DIM).unwrap().save(dir.path()).unwrap();

    let mut index = FlatIndex::new(DIM).unwrap();
    assert!(index.load(dir.path()).unwrap());
    assert_eq!(index.total_count(), 0);
}
