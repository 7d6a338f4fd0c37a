//! Search behaviour of the in-memory vector index.

use notes_rag::document::Chunk;
use notes_rag::error::RagError;
use notes_rag::inmemory::InMemoryVectorIndex;
use notes_rag::vectorstore::VectorIndex;
use proptest::prelude::*;

fn chunk(index: usize, text: &str) -> Chunk {
    Chunk { index, text: text.to_string(), offset: index * 100 }
}

/// Generate a non-zero L2-normalized embedding of the given dimension.
fn arb_normalized_embedding(dim: usize) -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-1.0f32..1.0f32, dim).prop_filter_map(
        "non-zero embedding",
        |mut v| {
            let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm < 1e-8 {
                return None;
            }
            for val in &mut v {
                *val /= norm;
            }
            Some(v)
        },
    )
}

/// *For any* set of entries, search returns at most `min(top_k, len)`
/// results ordered by descending cosine similarity, and a query equal to an
/// indexed vector ranks that entry's score first.
mod prop_inmemory_search_ordering {
    use super::*;

    const DIM: usize = 16;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn results_ordered_descending_and_bounded_by_top_k(
            vectors in proptest::collection::vec(arb_normalized_embedding(DIM), 1..20),
            query in arb_normalized_embedding(DIM),
            top_k in 1usize..25,
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let count = vectors.len();
            let results = rt.block_on(async {
                let index = InMemoryVectorIndex::new();
                let chunks = (0..count).map(|i| chunk(i, "same text for every entry")).collect();
                index.build(chunks, vectors).await.unwrap();
                index.search(&query, top_k).await.unwrap()
            });

            prop_assert_eq!(results.len(), top_k.min(count));
            for window in results.windows(2) {
                prop_assert!(
                    window[0].score >= window[1].score,
                    "results not in descending order: {} < {}",
                    window[0].score,
                    window[1].score,
                );
            }
        }

        #[test]
        fn identical_vector_has_maximal_score(
            vectors in proptest::collection::vec(arb_normalized_embedding(DIM), 1..20),
            pick in any::<proptest::sample::Index>(),
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let target = pick.index(vectors.len());
            let query = vectors[target].clone();
            let count = vectors.len();
            let results = rt.block_on(async {
                let index = InMemoryVectorIndex::new();
                let chunks = (0..count).map(|i| chunk(i, &format!("chunk {i}"))).collect();
                index.build(chunks, vectors).await.unwrap();
                index.search(&query, count).await.unwrap()
            });

            let own = results.iter().find(|r| r.chunk.index == target).unwrap();
            prop_assert!((own.score - 1.0).abs() < 1e-4);
            prop_assert!((results[0].score - own.score).abs() < 1e-4);
        }
    }
}

#[tokio::test]
async fn single_entry_index_returns_one_result_for_k_three() {
    let index = InMemoryVectorIndex::new();
    index
        .build(vec![chunk(0, "A stack is a Last-In-First-Out structure.")], vec![vec![0.6, 0.8]])
        .await
        .unwrap();

    let results = index.search(&[1.0, 0.0], 3).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].chunk.text, "A stack is a Last-In-First-Out structure.");
}

#[tokio::test]
async fn identical_query_ranks_first() {
    let index = InMemoryVectorIndex::new();
    index
        .build(
            vec![chunk(0, "arrays"), chunk(1, "stacks"), chunk(2, "queues")],
            vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0], vec![0.0, 0.0, 1.0]],
        )
        .await
        .unwrap();

    let results = index.search(&[0.0, 1.0, 0.0], 3).await.unwrap();
    assert_eq!(results[0].chunk.text, "stacks");
    assert!((results[0].score - 1.0).abs() < 1e-6);
}

#[tokio::test]
async fn ties_keep_original_chunk_order() {
    let index = InMemoryVectorIndex::new();
    index
        .build(
            vec![chunk(0, "first"), chunk(1, "other"), chunk(2, "second"), chunk(3, "third")],
            vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 0.0], vec![1.0, 0.0]],
        )
        .await
        .unwrap();

    let results = index.search(&[1.0, 0.0], 3).await.unwrap();
    let texts: Vec<&str> = results.iter().map(|r| r.chunk.text.as_str()).collect();
    assert_eq!(texts, ["first", "second", "third"]);
}

#[tokio::test]
async fn duplicate_text_is_not_deduplicated() {
    let index = InMemoryVectorIndex::new();
    index
        .build(
            vec![chunk(0, "Recursion calls itself."), chunk(1, "Recursion calls itself.")],
            vec![vec![1.0, 0.0], vec![1.0, 0.0]],
        )
        .await
        .unwrap();

    assert_eq!(index.len().await, 2);
    assert_eq!(index.search(&[1.0, 0.0], 3).await.unwrap().len(), 2);
}

#[tokio::test]
async fn unbuilt_index_search_is_empty_index() {
    let index = InMemoryVectorIndex::new();
    let err = index.search(&[1.0], 3).await.unwrap_err();
    assert!(matches!(err, RagError::EmptyIndex));
    assert!(index.is_empty().await);
}

#[tokio::test]
async fn building_with_no_chunks_is_empty_index() {
    let index = InMemoryVectorIndex::new();
    let err = index.build(Vec::new(), Vec::new()).await.unwrap_err();
    assert!(matches!(err, RagError::EmptyIndex));
}

#[tokio::test]
async fn wrong_query_dimension_is_rejected() {
    let index = InMemoryVectorIndex::new();
    index.build(vec![chunk(0, "a")], vec![vec![1.0, 0.0, 0.0]]).await.unwrap();
    let err = index.search(&[1.0, 0.0], 3).await.unwrap_err();
    assert!(matches!(err, RagError::DimensionMismatch { expected: 3, actual: 2 }));
}
