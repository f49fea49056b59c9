//! Hybrid retriever: dense (Qdrant) + sparse (Tantivy) search fused by
//! reciprocal rank, weighted by `dense_weight` (spec §4.2 step 4).

use std::collections::HashMap;
use std::sync::Arc;

use ragcore_core::{Chunk, QueryResult, traits::EmbeddingProvider};

use crate::error::RetrievalError;
use crate::reranker::LexicalOverlapReranker;
use crate::sparse_search::SparseIndex;
use crate::vector_store::{QdrantVectorStore, SearchFilter};

#[derive(Debug, Clone)]
pub struct RetrieverConfig {
    pub dense_top_k: usize,
    pub sparse_top_k: usize,
    pub final_top_k: usize,
    /// Weight given to dense-search RRF contributions; sparse gets `1.0 - dense_weight`.
    pub dense_weight: f32,
    pub rrf_k: f32,
    pub reranking_enabled: bool,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            dense_top_k: 20,
            sparse_top_k: 20,
            final_top_k: 5,
            dense_weight: 0.7,
            rrf_k: 60.0,
            reranking_enabled: true,
        }
    }
}

pub struct HybridRetriever {
    config: RetrieverConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<QdrantVectorStore>,
    sparse_index: Option<Arc<SparseIndex>>,
}

impl HybridRetriever {
    pub fn new(
        config: RetrieverConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        vector_store: Arc<QdrantVectorStore>,
    ) -> Self {
        Self { config, embedder, vector_store, sparse_index: None }
    }

    pub fn with_sparse_index(mut self, index: Arc<SparseIndex>) -> Self {
        self.sparse_index = Some(index);
        self
    }

    /// Runs dense and sparse search concurrently, fuses by weighted RRF,
    /// optionally reranks, then truncates to `final_top_k`. Ties in the
    /// fused score break by `(document_id, ordinal)` so the result order is
    /// deterministic across runs against identical data.
    pub async fn search(
        &self,
        index_name: &str,
        query: &str,
        query_embedding: &[f32],
        filter: Option<SearchFilter>,
    ) -> Result<Vec<QueryResult>, RetrievalError> {
        let dense_future =
            self.vector_store.search(index_name, query_embedding, self.config.dense_top_k, filter);

        let sparse_index = self.sparse_index.clone();
        let sparse_top_k = self.config.sparse_top_k;
        let query_owned = query.to_string();
        let sparse_future = async move {
            match sparse_index {
                Some(index) => {
                    tokio::task::spawn_blocking(move || index.search(&query_owned, Some(sparse_top_k)))
                        .await
                        .map_err(|e| RetrievalError::SparseIndex(e.to_string()))?
                }
                None => Ok(Vec::new()),
            }
        };

        let (dense_result, sparse_result) = tokio::join!(dense_future, sparse_future);
        let dense_results = dense_result?;
        let sparse_results = sparse_result?;

        let mut fused = self.rrf_fusion(dense_results, sparse_results);

        if self.config.reranking_enabled {
            fused = LexicalOverlapReranker::rerank(query, fused);
        }

        fused.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.chunk.document_id.cmp(&b.chunk.document_id))
                .then_with(|| a.chunk.ordinal.cmp(&b.chunk.ordinal))
        });
        fused.truncate(self.config.final_top_k);
        Ok(fused)
    }

    fn rrf_fusion(
        &self,
        dense: Vec<(Chunk, f32)>,
        sparse: Vec<crate::sparse_search::SparseResult>,
    ) -> Vec<QueryResult> {
        let mut scored: HashMap<String, (f32, Chunk)> = HashMap::new();

        for (rank, (chunk, _raw_score)) in dense.into_iter().enumerate() {
            let rrf = 1.0 / (self.config.rrf_k + rank as f32 + 1.0) * self.config.dense_weight;
            let chunk_id = chunk.chunk_id.clone();
            scored
                .entry(chunk_id)
                .and_modify(|(score, _)| *score += rrf)
                .or_insert((rrf, chunk));
        }

        let sparse_weight = 1.0 - self.config.dense_weight;
        for (rank, result) in sparse.into_iter().enumerate() {
            let rrf = 1.0 / (self.config.rrf_k + rank as f32 + 1.0) * sparse_weight;
            scored
                .entry(result.chunk_id.clone())
                .and_modify(|(score, _)| *score += rrf)
                .or_insert_with(|| {
                    (
                        rrf,
                        Chunk {
                            chunk_id: result.chunk_id,
                            document_id: result.document_id,
                            document_title: result.document_title,
                            text: result.text,
                            page: None,
                            ordinal: 0,
                            embedding: Vec::new(),
                        },
                    )
                });
        }

        scored.into_iter().map(|(_, (score, chunk))| QueryResult { chunk, score }).collect()
    }

    pub async fn embed_query(&self, query: &str) -> Result<Vec<f32>, RetrievalError> {
        let embeddings = self
            .embedder
            .embed(&[query.to_string()])
            .await
            .map_err(|e| RetrievalError::Embedding(e.to_string()))?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| RetrievalError::Embedding("embedder returned no vectors".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sparse_search::SparseResult;

    fn chunk(chunk_id: &str, document_id: &str, ordinal: u32) -> Chunk {
        Chunk {
            chunk_id: chunk_id.to_string(),
            document_id: document_id.to_string(),
            document_title: None,
            text: "content".to_string(),
            page: None,
            ordinal,
            embedding: Vec::new(),
        }
    }

    fn retriever() -> HybridRetriever {
        // Constructing real Qdrant/embedder instances requires a live
        // connection; fusion logic is tested directly via `rrf_fusion`
        // using a config-only retriever built with stub dependencies
        // elsewhere. Here we only exercise the pure fusion function.
        HybridRetriever {
            config: RetrieverConfig::default(),
            embedder: Arc::new(StubEmbedder),
            vector_store: Arc::new(QdrantVectorStore::new(crate::vector_store::VectorStoreConfig::default()).unwrap()),
            sparse_index: None,
        }
    }

    struct StubEmbedder;

    #[async_trait::async_trait]
    impl EmbeddingProvider for StubEmbedder {
        async fn embed(&self, texts: &[String]) -> ragcore_core::Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![0.0; 4]).collect())
        }
        fn dimension(&self) -> usize {
            4
        }
    }

    #[test]
    fn fusion_boosts_chunks_present_in_both_sources() {
        let retriever = retriever();
        let dense = vec![(chunk("c1", "d1", 0), 0.9), (chunk("c2", "d1", 1), 0.8)];
        let sparse = vec![
            SparseResult {
                chunk_id: "c2".to_string(),
                document_id: "d1".to_string(),
                document_title: None,
                text: "content".to_string(),
                score: 5.0,
            },
            SparseResult {
                chunk_id: "c3".to_string(),
                document_id: "d1".to_string(),
                document_title: None,
                text: "content".to_string(),
                score: 3.0,
            },
        ];
        let fused = retriever.rrf_fusion(dense, sparse);
        assert_eq!(fused.len(), 3);
        let c2 = fused.iter().find(|r| r.chunk.chunk_id == "c2").unwrap();
        let c1 = fused.iter().find(|r| r.chunk.chunk_id == "c1").unwrap();
        assert!(c2.score > c1.score);
    }
}
