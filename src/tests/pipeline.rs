use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::ranking::{
    ChunkingOptions, Document, EmbeddingError, LexicalOptions, ModelRegistry, RankError,
    RankedOutput, Ranker, RankerOptions, StrategyError, StrategyKind, TextEncoder,
};

const DIMS: usize = 32;

/// Bag-of-words encoder: each word adds a hash-derived vector, so texts
/// that share words point in similar directions.
struct HashEncoder {
    name: String,
}

impl HashEncoder {
    fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
        })
    }
}

impl TextEncoder for HashEncoder {
    fn name(&self) -> &str {
        &self.name
    }

    fn dimensions(&self) -> usize {
        DIMS
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts
            .iter()
            .map(|text| {
                let mut v = vec![0.0f32; DIMS];
                for word in text.split_whitespace() {
                    let digest = Sha256::digest(word.to_lowercase().as_bytes());
                    for (acc, byte) in v.iter_mut().zip(digest.iter()) {
                        *acc += *byte as f32 / 255.0 - 0.5;
                    }
                }
                v
            })
            .collect())
    }
}

/// Returns one vector too few.
struct ShortEncoder;

impl TextEncoder for ShortEncoder {
    fn name(&self) -> &str {
        "short"
    }

    fn dimensions(&self) -> usize {
        4
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().skip(1).map(|_| vec![1.0; 4]).collect())
    }
}

/// Returns vectors of the wrong length.
struct WideEncoder;

impl TextEncoder for WideEncoder {
    fn name(&self) -> &str {
        "wide"
    }

    fn dimensions(&self) -> usize {
        4
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|_| vec![1.0; 5]).collect())
    }
}

struct FailingEncoder;

impl TextEncoder for FailingEncoder {
    fn name(&self) -> &str {
        "failing"
    }

    fn dimensions(&self) -> usize {
        4
    }

    fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Err(EmbeddingError::EmbeddingFailed("onnx session died".to_string()))
    }
}

fn full_ranker() -> Ranker {
    let models = ModelRegistry::empty()
        .with_encoder(StrategyKind::DenseA, HashEncoder::new("hash-a"))
        .with_encoder(StrategyKind::DenseB, HashEncoder::new("hash-b"));
    Ranker::new(models, RankerOptions::default())
}

fn resumes() -> Vec<Document> {
    Document::from_pairs([
        ("alice.txt", "Senior Rust engineer, distributed systems, tokio, postgres"),
        ("bob.txt", "Graphic designer with Figma and Illustrator experience"),
        ("carol.txt", "Backend developer: Rust, Go, kubernetes, postgres"),
        ("dave.txt", ""),
        ("erin.txt", "Rust engineer working on databases and distributed storage"),
    ])
}

fn assert_is_permutation(output: &RankedOutput, documents: &[Document]) {
    assert_eq!(output.len(), documents.len());

    let mut positions: Vec<usize> = output.results.iter().map(|r| r.position).collect();
    positions.sort();
    assert_eq!(positions, (0..documents.len()).collect::<Vec<_>>());

    for result in &output.results {
        assert_eq!(result.name, documents[result.position].name);
    }

    let ranks: Vec<usize> = output.results.iter().map(|r| r.rank).collect();
    assert_eq!(ranks, (1..=documents.len()).collect::<Vec<_>>());

    for pair in output.results.windows(2) {
        assert!(pair[0].similarity >= pair[1].similarity);
    }
}

#[test]
fn test_lexical_ranks_overlap_first() {
    let ranker = Ranker::lexical_only();
    let docs = Document::from_pairs([
        ("A", "experienced python developer"),
        ("B", "graphic designer"),
    ]);

    let output = ranker.rank("python developer", &docs, StrategyKind::Lexical).unwrap();

    assert_eq!(output.names(), vec!["A", "B"]);
    let a = output.get("A").unwrap();
    let b = output.get("B").unwrap();
    assert!(a.similarity > b.similarity);
    assert_eq!(b.similarity, 0.0);
    assert_eq!(output.strategy, StrategyKind::Lexical);
    assert!(output.model.is_none());
    // python, developer, experienced, graphic, designer
    assert_eq!(output.dimensions, 5);
}

#[test]
fn test_empty_document_text_scores_zero() {
    let ranker = full_ranker();
    let docs = Document::from_pairs([("X", ""), ("Y", "some text")]);

    for kind in StrategyKind::ALL {
        let output = ranker.rank("some query text", &docs, kind).unwrap();
        assert_eq!(output.len(), 2, "{kind}");

        let x = output.get("X").unwrap();
        assert_eq!(x.similarity, 0.0, "{kind}");
        assert!(x.rank >= 1 && x.rank <= 2);
    }
}

#[test]
fn test_invalid_input() {
    let ranker = Ranker::lexical_only();
    let docs = Document::from_pairs([("A", "text")]);

    assert!(matches!(
        ranker.rank("", &docs, StrategyKind::Lexical),
        Err(RankError::InvalidInput(_))
    ));
    assert!(matches!(
        ranker.rank("  \n\t", &docs, StrategyKind::Lexical),
        Err(RankError::InvalidInput(_))
    ));
    assert!(matches!(
        ranker.rank("query", &[], StrategyKind::Lexical),
        Err(RankError::InvalidInput(_))
    ));
}

#[test]
fn test_invalid_input_checked_before_model() {
    // no dense models loaded, input error still wins
    let ranker = Ranker::lexical_only();
    assert!(matches!(
        ranker.rank("", &resumes(), StrategyKind::DenseA),
        Err(RankError::InvalidInput(_))
    ));
}

#[test]
fn test_identical_texts_tie_in_input_order() {
    let ranker = full_ranker();
    let docs = Document::from_pairs([
        ("first", "rust developer with postgres"),
        ("other", "pastry chef"),
        ("second", "rust developer with postgres"),
        ("third", "rust developer with postgres"),
    ]);

    for kind in StrategyKind::ALL {
        let output = ranker.rank("rust developer", &docs, kind).unwrap();

        let first = output.get("first").unwrap();
        let second = output.get("second").unwrap();
        let third = output.get("third").unwrap();
        assert_eq!(first.similarity, second.similarity, "{kind}");
        assert_eq!(second.similarity, third.similarity, "{kind}");
        assert!(first.rank < second.rank, "{kind}");
        assert!(second.rank < third.rank, "{kind}");
    }
}

#[test]
fn test_all_zero_scores_keep_input_order() {
    let ranker = Ranker::lexical_only();
    let docs = Document::from_pairs([("c", "apples"), ("a", "pears"), ("b", "plums")]);

    let output = ranker.rank("rust", &docs, StrategyKind::Lexical).unwrap();

    assert_eq!(output.names(), vec!["c", "a", "b"]);
    assert!(output.results.iter().all(|r| r.similarity == 0.0));
}

#[test]
fn test_result_is_permutation_of_input() {
    let ranker = full_ranker();
    let docs = resumes();

    for kind in StrategyKind::ALL {
        let output = ranker
            .rank("rust engineer distributed systems", &docs, kind)
            .unwrap();
        assert_is_permutation(&output, &docs);
        assert!(output.results.iter().all(|r| r.human_rank.is_none()));
    }
}

#[test]
fn test_duplicate_names_kept_apart() {
    let ranker = Ranker::lexical_only();
    let docs = Document::from_pairs([("cv.txt", "gardener"), ("cv.txt", "rust engineer")]);

    let output = ranker.rank("rust engineer", &docs, StrategyKind::Lexical).unwrap();

    assert_is_permutation(&output, &docs);
    assert_eq!(output.results[0].position, 1);
    assert_eq!(output.results[1].position, 0);
}

#[test]
fn test_self_similarity_is_maximal() {
    let ranker = full_ranker();
    let query = "Senior Rust engineer, distributed systems, tokio, postgres";
    let docs = resumes();

    for kind in StrategyKind::ALL {
        let output = ranker.rank(query, &docs, kind).unwrap();
        let top = &output.results[0];

        assert_eq!(top.name, "alice.txt", "{kind}");
        assert!((top.similarity - 1.0).abs() < 1e-5, "{kind}: {}", top.similarity);
        assert!(output.results.iter().all(|r| r.similarity <= top.similarity));
    }
}

#[test]
fn test_ranking_is_deterministic() {
    let ranker = full_ranker();
    let docs = resumes();

    for kind in StrategyKind::ALL {
        let first = ranker.rank("postgres rust backend", &docs, kind).unwrap();
        let second = ranker.rank("postgres rust backend", &docs, kind).unwrap();
        assert_eq!(first, second, "{kind}");
    }
}

#[test]
fn test_lexical_vocabulary_is_per_call() {
    let ranker = Ranker::lexical_only();
    let query = "rust engineer";
    let small = Document::from_pairs([("a", "rust engineer"), ("b", "baker")]);
    let large = Document::from_pairs([
        ("a", "rust engineer"),
        ("b", "baker"),
        ("c", "rust rust rust"),
        ("d", "rust compiler engineer"),
    ]);

    let first = ranker.rank(query, &small, StrategyKind::Lexical).unwrap();
    let _ = ranker.rank(query, &large, StrategyKind::Lexical).unwrap();
    let again = ranker.rank(query, &small, StrategyKind::Lexical).unwrap();

    assert_eq!(first, again);
    assert_eq!(first.dimensions, 3);
}

#[test]
fn test_stop_words_option() {
    let options = RankerOptions {
        lexical: LexicalOptions {
            stop_words: true,
            ..LexicalOptions::default()
        },
        ..RankerOptions::default()
    };
    let ranker = Ranker::new(ModelRegistry::empty(), options);
    let docs = Document::from_pairs([("a", "the and of with"), ("b", "rust")]);

    let output = ranker.rank("the rust", &docs, StrategyKind::Lexical).unwrap();

    assert_eq!(output.names(), vec!["b", "a"]);
    assert_eq!(output.get("a").unwrap().similarity, 0.0);
    assert!((output.get("b").unwrap().similarity - 1.0).abs() < 1e-5);
}

#[test]
fn test_dense_reports_model() {
    let ranker = full_ranker();

    let output = ranker.rank("rust", &resumes(), StrategyKind::DenseB).unwrap();

    assert_eq!(output.strategy, StrategyKind::DenseB);
    assert_eq!(output.model.as_deref(), Some("hash-b"));
    assert_eq!(output.dimensions, DIMS);
}

#[test]
fn test_dense_long_text_is_windowed() {
    let options = RankerOptions {
        chunking: ChunkingOptions {
            chunk_words: 4,
            max_chunks: 3,
        },
        ..RankerOptions::default()
    };
    let models =
        ModelRegistry::empty().with_encoder(StrategyKind::DenseA, HashEncoder::new("hash"));
    let ranker = Ranker::new(models, options);

    let long = "rust engineer ".repeat(200);
    let docs = Document::from_pairs([("long", long.as_str()), ("other", "pastry chef")]);

    let output = ranker.rank("rust engineer", &docs, StrategyKind::DenseA).unwrap();

    assert_eq!(output.results[0].name, "long");
    assert!((output.results[0].similarity - 1.0).abs() < 1e-5);
}

#[test]
fn test_missing_model_is_strategy_error() {
    let ranker = Ranker::lexical_only();
    assert!(!ranker.supports(StrategyKind::DenseA));
    assert!(ranker.supports(StrategyKind::Lexical));

    let err = ranker
        .rank("rust", &resumes(), StrategyKind::DenseA)
        .unwrap_err();
    assert!(matches!(
        err,
        RankError::Strategy(StrategyError::ModelUnavailable(StrategyKind::DenseA))
    ));
}

#[test]
fn test_malformed_model_output() {
    let docs = Document::from_pairs([("a", "rust engineer"), ("b", "baker")]);

    for encoder in [
        Arc::new(ShortEncoder) as Arc<dyn TextEncoder>,
        Arc::new(WideEncoder) as Arc<dyn TextEncoder>,
    ] {
        let ranker = Ranker::new(
            ModelRegistry::empty().with_encoder(StrategyKind::DenseB, encoder),
            RankerOptions::default(),
        );
        let err = ranker.rank("rust", &docs, StrategyKind::DenseB).unwrap_err();
        assert!(matches!(
            err,
            RankError::Strategy(StrategyError::MalformedOutput(_))
        ));
    }
}

#[test]
fn test_model_failure_fails_whole_call() {
    let ranker = Ranker::new(
        ModelRegistry::empty().with_encoder(StrategyKind::DenseA, Arc::new(FailingEncoder)),
        RankerOptions::default(),
    );

    let err = ranker
        .rank("rust", &resumes(), StrategyKind::DenseA)
        .unwrap_err();
    assert!(matches!(
        err,
        RankError::Strategy(StrategyError::Embedding(EmbeddingError::EmbeddingFailed(_)))
    ));
}

#[test]
fn test_concurrent_calls_match_sequential() {
    let ranker = Arc::new(full_ranker());
    let docs = Arc::new(resumes());
    let queries = [
        "rust engineer",
        "graphic designer",
        "postgres kubernetes",
        "distributed storage",
    ];

    let expected: Vec<Vec<RankedOutput>> = queries
        .iter()
        .map(|q| {
            StrategyKind::ALL
                .iter()
                .map(|kind| ranker.rank(q, &docs, *kind).unwrap())
                .collect()
        })
        .collect();

    let handles: Vec<_> = queries
        .iter()
        .map(|q| {
            let ranker = Arc::clone(&ranker);
            let docs = Arc::clone(&docs);
            let query = q.to_string();
            std::thread::spawn(move || {
                StrategyKind::ALL
                    .iter()
                    .map(|kind| ranker.rank(&query, &docs, *kind).unwrap())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    for (handle, expected) in handles.into_iter().zip(expected) {
        assert_eq!(handle.join().unwrap(), expected);
    }
}
