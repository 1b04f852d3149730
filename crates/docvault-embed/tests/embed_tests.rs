use docvault_core::config::{EmbeddingSettings, ProviderKind};
use docvault_core::{Embedder, ErrorKind};
use docvault_embed::{build_embedder, HashingEmbedder};

#[test]
fn hashing_embedder_shapes_and_determinism() {
    let embedder = HashingEmbedder::new(384, 0).expect("embedder");
    let texts = vec!["hello world".to_string(), "hello world".to_string()];
    let embs = embedder.embed_batch(&texts).expect("embed_batch");
    let (v1, v2) = (&embs[0], &embs[1]);

    assert_eq!(v1.len(), 384, "embedding dim is 384");

    let norm: f32 = v1.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-5, "vector is L2-normalized (norm={norm})");

    let bits1: Vec<u32> = v1.iter().map(|x| x.to_bits()).collect();
    let bits2: Vec<u32> = v2.iter().map(|x| x.to_bits()).collect();
    assert_eq!(bits1, bits2, "same text yields bit-identical vectors");

    let again = HashingEmbedder::new(384, 0).unwrap().embed("hello world").unwrap();
    assert_eq!(again, *v1, "same configuration in a new instance yields the same vector");
}

#[test]
fn empty_and_stop_word_only_text_map_to_zero_vector() {
    let embedder = HashingEmbedder::new(32, 7).unwrap();
    for text in ["", "   \n\t", "the of and", "!!! ..."] {
        let v = embedder.embed(text).expect("embed");
        assert_eq!(v.len(), 32);
        assert!(v.iter().all(|x| *x == 0.0), "'{text}' should embed to zero");
    }
}

#[test]
fn binary_input_is_an_embedding_error() {
    let embedder = HashingEmbedder::new(16, 0).unwrap();
    let err = embedder.embed("abc\0def").expect_err("NUL input");
    assert_eq!(err.kind(), ErrorKind::Embedding);
    assert!(err.to_string().contains("hashing:d16:s0"));
}

#[test]
fn case_and_punctuation_do_not_change_the_vector() {
    let embedder = HashingEmbedder::new(128, 0).unwrap();
    let a = embedder.embed("Mystical Knowledge!").unwrap();
    let b = embedder.embed("mystical, knowledge").unwrap();
    assert_eq!(a, b);
}

#[test]
fn seed_is_part_of_the_configuration() {
    let a = HashingEmbedder::new(64, 1).unwrap();
    let b = HashingEmbedder::new(64, 2).unwrap();
    assert_ne!(a.id(), b.id());
    let text = "alpha bravo charlie delta echo foxtrot golf hotel";
    assert_ne!(a.embed(text).unwrap(), b.embed(text).unwrap());
}

#[test]
fn factory_builds_hashing_provider_from_settings() {
    let settings = EmbeddingSettings { dimension: 48, seed: 3, ..EmbeddingSettings::default() };
    let embedder = build_embedder(&settings).expect("hashing");
    assert_eq!(embedder.dim(), 48);
    assert_eq!(embedder.id(), "hashing:d48:s3");
}

#[cfg(not(feature = "model"))]
#[test]
fn factory_reports_missing_model_support() {
    let settings = EmbeddingSettings {
        provider: ProviderKind::Model,
        model_dir: Some("~/models/bge-m3".to_string()),
        ..EmbeddingSettings::default()
    };
    let err = build_embedder(&settings).err().expect("no model feature");
    assert_eq!(err.kind(), ErrorKind::Embedding);
}

#[cfg(feature = "model")]
#[test]
fn factory_requires_model_dir() {
    let settings = EmbeddingSettings { provider: ProviderKind::Model, model_dir: None, ..EmbeddingSettings::default() };
    let err = build_embedder(&settings).err().expect("no model dir");
    assert_eq!(err.kind(), ErrorKind::InvalidConfig);
}
