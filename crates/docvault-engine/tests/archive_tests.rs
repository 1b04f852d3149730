use std::sync::{Arc, Mutex};
use std::time::Duration;

use docvault_core::config::Settings;
use docvault_core::{Embedder, Error, ErrorKind, Result, SourceDocument};
use docvault_embed::HashingEmbedder;
use docvault_engine::{Archive, ArchiveEvent, ArchiveInfo, AssistantClient, BatchItem, Stage};

fn settings() -> Settings {
    let mut s = Settings::default();
    s.embedding.dimension = 256;
    s
}

fn archive() -> Archive { Archive::from_settings(&settings()).expect("archive") }

/// Fails on any text containing `FAIL`, otherwise delegates to hashing.
struct FlakyEmbedder(HashingEmbedder);

impl Embedder for FlakyEmbedder {
    fn id(&self) -> &str { "flaky" }
    fn dim(&self) -> usize { self.0.dim() }
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.contains("FAIL") {
            return Err(Error::embedding("flaky", "refused"));
        }
        self.0.embed(text)
    }
}

struct SlowEmbedder;

impl Embedder for SlowEmbedder {
    fn id(&self) -> &str { "slow" }
    fn dim(&self) -> usize { 4 }
    fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        std::thread::sleep(Duration::from_millis(300));
        Ok(vec![1.0; 4])
    }
}

#[derive(Default)]
struct RecordingClient {
    registered: Mutex<Vec<ArchiveInfo>>,
    events: Mutex<Vec<ArchiveEvent>>,
    fail: bool,
}

impl AssistantClient for RecordingClient {
    fn register(&self, info: &ArchiveInfo) -> Result<()> {
        self.registered.lock().unwrap().push(info.clone());
        Ok(())
    }

    fn notify(&self, event: &ArchiveEvent) -> Result<()> {
        self.events.lock().unwrap().push(event.clone());
        if self.fail {
            return Err(Error::InvalidArgument("remote unavailable".into()));
        }
        Ok(())
    }
}

#[tokio::test]
async fn mystical_knowledge_finds_the_vault() {
    let archive = archive();
    archive.process(SourceDocument::new("a", "the mystical vault of knowledge")).await.unwrap();
    archive.process(SourceDocument::new("b", "financial ledger report")).await.unwrap();

    let results = archive.search("mystical knowledge", 1).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, "a");
    assert_eq!(results[0].rank, 0);
    assert!(results[0].score > 0.5);
}

#[tokio::test]
async fn blank_queries_are_rejected() {
    let archive = archive();
    for q in ["", "   \n"] {
        let err = archive.search(q, 3).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyQuery);
    }
    assert_eq!(archive.search("x", 0).await.unwrap_err().kind(), ErrorKind::InvalidArgument);
}

#[tokio::test]
async fn empty_archive_search_is_empty() {
    let archive = archive();
    assert!(archive.search("anything at all", 5).await.unwrap().is_empty());
}

#[tokio::test]
async fn results_are_ranked_and_clamped() {
    let archive = archive();
    archive.process(SourceDocument::new("one", "red apples and green pears")).await.unwrap();
    archive.process(SourceDocument::new("two", "red apples")).await.unwrap();
    archive.process(SourceDocument::new("three", "submarine periscope")).await.unwrap();

    let results = archive.search("red apples", 10).await.unwrap();
    assert_eq!(results.len(), 3, "top_k is clamped to the document count");
    assert_eq!(results[0].id, "two");
    assert_eq!(results[1].id, "one");
    for (i, r) in results.iter().enumerate() {
        assert_eq!(r.rank, i);
    }
    assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
}

#[tokio::test]
async fn every_document_finds_itself() {
    let archive = archive();
    let texts = [
        ("north.txt", "glacier fjord aurora reindeer"),
        ("south.txt", "penguin iceberg krill albatross"),
        ("east.txt", "monsoon lotus tea silk"),
        ("west.txt", "canyon cactus rodeo mesa"),
    ];
    for (name, text) in texts {
        archive.process(SourceDocument::new(name, text)).await.unwrap();
    }
    for (name, text) in texts {
        let top = archive.search(text, 1).await.unwrap();
        assert_eq!(top[0].id, name);
    }
}

#[tokio::test]
async fn batch_reports_each_item_in_order() {
    let embedder = Arc::new(FlakyEmbedder(HashingEmbedder::new(64, 0).unwrap()));
    let archive = Archive::new(&settings(), embedder);

    let items = archive
        .process_batch(vec![
            SourceDocument::new("first", "alpha bravo"),
            SourceDocument::new("second", "this one will FAIL"),
            SourceDocument::new("third", "charlie delta"),
        ])
        .await;

    assert_eq!(items.len(), 3);
    assert!(matches!(&items[0], BatchItem::Indexed(p) if p.id == "first" && p.provider == "flaky"));
    match &items[1] {
        BatchItem::Failed(f) => {
            assert_eq!(f.id, "second");
            assert_eq!(f.kind, ErrorKind::Embedding);
            assert_eq!(f.stage, Stage::Ingested);
        }
        other => panic!("expected failure, got {other:?}"),
    }
    let stages: Vec<Stage> = items.iter().map(BatchItem::stage).collect();
    assert_eq!(stages, vec![Stage::Indexed, Stage::Failed, Stage::Indexed]);
    assert!(matches!(&items[2], BatchItem::Indexed(p) if p.id == "third" && p.dimension == 64));

    let ids: Vec<String> = archive.list_documents().await.into_iter().map(|d| d.id).collect();
    assert_eq!(ids, vec!["first", "third"]);
    assert!(archive.is_consistent().await);
}

#[tokio::test]
async fn failed_reprocessing_keeps_the_previous_version() {
    let embedder = Arc::new(FlakyEmbedder(HashingEmbedder::new(32, 0).unwrap()));
    let archive = Archive::new(&settings(), embedder);
    archive.process(SourceDocument::new("doc", "original words")).await.unwrap();

    let err = archive.process(SourceDocument::new("doc", "FAIL now")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Embedding);
    assert_eq!(archive.get_document("doc").await.unwrap().content, "original words");
    assert!(archive.is_consistent().await);
}

#[tokio::test]
async fn duplicate_ids_in_a_batch_keep_the_last() {
    let archive = archive();
    let items = archive
        .process_batch(vec![SourceDocument::new("dup", "first version"), SourceDocument::new("dup", "second version")])
        .await;
    assert!(items.iter().all(BatchItem::is_indexed));
    assert_eq!(archive.list_documents().await.len(), 1);
    assert_eq!(archive.get_document("dup").await.unwrap().content, "second version");
}

#[tokio::test]
async fn store_and_index_stay_consistent() {
    let archive = archive();
    for i in 0..6 {
        archive.process(SourceDocument::new(format!("doc-{i}"), format!("topic {i} words"))).await.unwrap();
    }
    archive.delete_document("doc-2").await.unwrap();
    archive.process(SourceDocument::new("doc-4", "rewritten")).await.unwrap();
    assert_eq!(archive.delete_document("doc-2").await.unwrap_err().kind(), ErrorKind::NotFound);
    archive.delete_document("doc-0").await.unwrap();

    assert!(archive.is_consistent().await);
    let ctx = archive.context().await;
    assert_eq!(ctx.documents, 4);
    assert_eq!(ctx.indexed, 4);
    assert_eq!(ctx.dimension, Some(256));
    assert_eq!(ctx.provider, "hashing:d256:s0");

    let ids: Vec<String> = archive.list_documents().await.into_iter().map(|d| d.id).collect();
    assert_eq!(ids, vec!["doc-1", "doc-3", "doc-4", "doc-5"], "replaced documents keep their position");
    let hits = archive.search("topic words", 10).await.unwrap();
    assert!(hits.iter().all(|h| h.id != "doc-2" && h.id != "doc-0"));
}

#[tokio::test]
async fn lookups_report_missing_documents() {
    let archive = archive();
    assert_eq!(archive.get_document("nope").await.unwrap_err().kind(), ErrorKind::NotFound);
    assert_eq!(archive.summarize_document("nope").await.unwrap_err().kind(), ErrorKind::NotFound);

    archive
        .process(SourceDocument::new("long.md", "First sentence here. Second sentence follows. Third."))
        .await
        .unwrap();
    let digest = archive.summarize_document("long.md").await.unwrap();
    assert_eq!(digest.filename, "long.md");
    assert_eq!(digest.word_count, 7);
    assert_eq!(digest.summary, "First sentence here. Second sentence follows. Third.");
}

#[tokio::test]
async fn slow_provider_times_out() {
    let mut s = settings();
    s.processing.embed_timeout_ms = 20;
    let archive = Archive::new(&s, Arc::new(SlowEmbedder));

    let err = archive.process(SourceDocument::new("a", "text")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::EmbeddingTimeout);
    assert!(archive.list_documents().await.is_empty());

    let err = archive.search("text", 1).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::EmbeddingTimeout);
}

#[tokio::test]
async fn snapshot_round_trip_restores_documents_and_vectors() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("snap.json");

    let original = archive();
    original.process(SourceDocument::new("a", "the mystical vault of knowledge").with_meta("pages", 3.0)).await.unwrap();
    original.process(SourceDocument::new("", "anonymous content without a name")).await.unwrap();
    assert_eq!(original.save_snapshot(&path).await.unwrap(), 2);

    let restored = archive();
    assert_eq!(restored.load_snapshot(&path).await.unwrap(), 2);
    assert_eq!(restored.list_documents().await, original.list_documents().await);
    assert_eq!(restored.get_document("a").await.unwrap(), original.get_document("a").await.unwrap());

    let before = original.snapshot().await;
    let after = restored.snapshot().await;
    assert_eq!(before.vectors.len(), after.vectors.len());
    for (x, y) in before.vectors.iter().zip(&after.vectors) {
        assert_eq!(x.id, y.id);
        assert!(x.vector.iter().zip(&y.vector).all(|(p, q)| (p - q).abs() < 1e-6));
    }
    assert_eq!(restored.search("mystical knowledge", 1).await.unwrap()[0].id, "a");
    assert!(restored.is_consistent().await);
}

#[tokio::test]
async fn snapshot_from_another_provider_is_rejected() {
    let source = archive();
    source.process(SourceDocument::new("a", "words")).await.unwrap();
    let snapshot = source.snapshot().await;

    let mut other = settings();
    other.embedding.seed = 9;
    let target = Archive::from_settings(&other).unwrap();
    target.process(SourceDocument::new("keep", "kept words")).await.unwrap();

    let err = target.restore(snapshot).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Snapshot);
    let ids: Vec<String> = target.list_documents().await.into_iter().map(|d| d.id).collect();
    assert_eq!(ids, vec!["keep"], "failed restore leaves state untouched");
}

#[tokio::test]
async fn ingest_dir_loads_accepted_files() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("sub")).unwrap();
    std::fs::write(dir.path().join("a.txt"), "the mystical vault of knowledge").unwrap();
    std::fs::write(dir.path().join("sub").join("b.md"), "financial ledger report").unwrap();
    std::fs::write(dir.path().join("c.bin"), [0u8, 1, 2]).unwrap();

    let archive = archive();
    let items = archive.ingest_dir(dir.path()).await.unwrap();
    let ids: Vec<&str> = items.iter().map(BatchItem::id).collect();
    assert_eq!(ids, vec!["a.txt", "sub/b.md"]);
    assert_eq!(archive.search("mystical knowledge", 1).await.unwrap()[0].id, "a.txt");

    let missing = archive.ingest_dir(&dir.path().join("absent")).await.unwrap_err();
    assert_eq!(missing.kind(), ErrorKind::InvalidArgument);
}

#[tokio::test]
async fn assistant_clients_hear_about_changes_and_never_break_calls() {
    let archive = archive();
    let client = Arc::new(RecordingClient { fail: true, ..Default::default() });
    archive.attach_client(client.clone()).await;

    archive.process(SourceDocument::new("a", "words here")).await.unwrap();
    archive.delete_document("a").await.unwrap();

    let registered = client.registered.lock().unwrap();
    assert_eq!(registered.len(), 1);
    assert_eq!(registered[0].name, "docvault");
    let events = client.events.lock().unwrap();
    assert_eq!(
        *events,
        vec![ArchiveEvent::Indexed { id: "a".into() }, ArchiveEvent::Removed { id: "a".into() }]
    );
}
