//! Hybrid retrieval: dense vector search (Qdrant), sparse keyword search
//! (Tantivy BM25), reciprocal-rank fusion, and an optional reranking pass.

pub mod error;
pub mod reranker;
pub mod retriever;
pub mod sparse_search;
pub mod vector_store;

pub use error::RetrievalError;
pub use reranker::LexicalOverlapReranker;
pub use retriever::{HybridRetriever, RetrieverConfig};
pub use sparse_search::{SparseConfig, SparseIndex, SparseResult};
pub use vector_store::{QdrantVectorStore, SearchFilter, VectorDistance, VectorStoreConfig};
