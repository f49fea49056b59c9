//! Sparse keyword search over chunk text using Tantivy's BM25 scorer.
//!
//! The index is kept in RAM per collection and rebuilt whenever the owning
//! `Collection`'s generation counter advances (re-ingestion bumps it), so a
//! stale in-memory index is never silently served stale results — callers
//! check `generation()` against the collection's current generation before
//! trusting a cached `SparseIndex`.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tantivy::{
    Index, IndexReader, IndexWriter, TantivyDocument,
    collector::TopDocs,
    query::QueryParser,
    schema::{Field, OwnedValue, STORED, STRING, Schema, TextFieldIndexing, TextOptions},
    tokenizer::{LowerCaser, RemoveLongFilter, SimpleTokenizer, TextAnalyzer},
};

use ragcore_core::Chunk;

use crate::error::RetrievalError;

#[derive(Debug, Clone)]
pub struct SparseConfig {
    pub top_k: usize,
}

impl Default for SparseConfig {
    fn default() -> Self {
        Self { top_k: 20 }
    }
}

#[derive(Debug, Clone)]
pub struct SparseResult {
    pub chunk_id: String,
    pub document_id: String,
    pub document_title: Option<String>,
    pub text: String,
    pub score: f32,
}

pub struct SparseIndex {
    index: Index,
    reader: IndexReader,
    writer: RwLock<IndexWriter>,
    chunk_id_field: Field,
    document_id_field: Field,
    document_title_field: Field,
    text_field: Field,
    config: SparseConfig,
    generation: AtomicU64,
}

impl SparseIndex {
    pub fn new(config: SparseConfig) -> Result<Self, RetrievalError> {
        let mut schema_builder = Schema::builder();

        let text_options = TextOptions::default()
            .set_indexing_options(
                TextFieldIndexing::default()
                    .set_tokenizer("ragcore_default")
                    .set_index_option(tantivy::schema::IndexRecordOption::WithFreqsAndPositions),
            )
            .set_stored();

        let chunk_id_field = schema_builder.add_text_field("chunk_id", STRING | STORED);
        let document_id_field = schema_builder.add_text_field("document_id", STRING | STORED);
        let document_title_field = schema_builder.add_text_field("document_title", STORED | STRING);
        let text_field = schema_builder.add_text_field("text", text_options);

        let schema = schema_builder.build();
        let index = Index::create_in_ram(schema);

        let tokenizer = TextAnalyzer::builder(SimpleTokenizer::default())
            .filter(RemoveLongFilter::limit(100))
            .filter(LowerCaser)
            .build();
        index.tokenizers().register("ragcore_default", tokenizer);

        let reader = index.reader().map_err(|e| RetrievalError::SparseIndex(e.to_string()))?;
        let writer = index.writer(50_000_000).map_err(|e| RetrievalError::SparseIndex(e.to_string()))?;

        Ok(Self {
            index,
            reader,
            writer: RwLock::new(writer),
            chunk_id_field,
            document_id_field,
            document_title_field,
            text_field,
            config,
            generation: AtomicU64::new(0),
        })
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Rebuilds the index from scratch and bumps the generation counter.
    /// Full rebuild rather than incremental upsert: chunk text changes on
    /// re-ingestion tend to replace whole documents, and Tantivy's delete
    /// path needs a commit+reload cycle anyway, so there's little to save.
    pub fn rebuild(&self, chunks: &[Chunk], new_generation: u64) -> Result<(), RetrievalError> {
        let mut writer = self.writer.write();
        writer.delete_all_documents().map_err(|e| RetrievalError::SparseIndex(e.to_string()))?;

        for chunk in chunks {
            let mut doc = TantivyDocument::default();
            doc.add_text(self.chunk_id_field, &chunk.chunk_id);
            doc.add_text(self.document_id_field, &chunk.document_id);
            if let Some(ref title) = chunk.document_title {
                doc.add_text(self.document_title_field, title);
            }
            doc.add_text(self.text_field, &chunk.text);
            writer.add_document(doc).map_err(|e| RetrievalError::SparseIndex(e.to_string()))?;
        }

        writer.commit().map_err(|e| RetrievalError::SparseIndex(e.to_string()))?;
        self.reader.reload().map_err(|e| RetrievalError::SparseIndex(e.to_string()))?;
        self.generation.store(new_generation, Ordering::Release);
        Ok(())
    }

    pub fn search(&self, query: &str, top_k: Option<usize>) -> Result<Vec<SparseResult>, RetrievalError> {
        let k = top_k.unwrap_or(self.config.top_k);
        let searcher = self.reader.searcher();
        let query_parser = QueryParser::for_index(&self.index, vec![self.text_field]);

        let parsed = query_parser.parse_query(query).map_err(|e| RetrievalError::SparseIndex(e.to_string()))?;
        let top_docs = searcher
            .search(&parsed, &TopDocs::with_limit(k))
            .map_err(|e| RetrievalError::SparseIndex(e.to_string()))?;

        let mut results = Vec::with_capacity(top_docs.len());
        for (score, address) in top_docs {
            let doc: TantivyDocument =
                searcher.doc(address).map_err(|e| RetrievalError::SparseIndex(e.to_string()))?;

            let chunk_id = field_str(&doc, self.chunk_id_field);
            let document_id = field_str(&doc, self.document_id_field);
            let document_title = doc
                .get_first(self.document_title_field)
                .and_then(|v| match v {
                    OwnedValue::Str(s) => Some(s.clone()),
                    _ => None,
                });
            let text = field_str(&doc, self.text_field);

            results.push(SparseResult { chunk_id, document_id, document_title, text, score });
        }
        Ok(results)
    }

    pub fn doc_count(&self) -> u64 {
        self.reader.searcher().num_docs()
    }
}

fn field_str(doc: &TantivyDocument, field: Field) -> String {
    doc.get_first(field)
        .and_then(|v| match v {
            OwnedValue::Str(s) => Some(s.clone()),
            _ => None,
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_chunk(chunk_id: &str, document_id: &str, text: &str) -> Chunk {
        Chunk {
            chunk_id: chunk_id.to_string(),
            document_id: document_id.to_string(),
            document_title: Some("Sample Doc".to_string()),
            text: text.to_string(),
            page: None,
            ordinal: 0,
            embedding: Vec::new(),
        }
    }

    #[test]
    fn rebuild_bumps_generation_and_indexes() {
        let index = SparseIndex::new(SparseConfig::default()).unwrap();
        assert_eq!(index.generation(), 0);

        let chunks = vec![
            sample_chunk("c1", "d1", "gold loan interest rate is ten percent"),
            sample_chunk("c2", "d1", "apply for the loan online"),
        ];
        index.rebuild(&chunks, 1).unwrap();

        assert_eq!(index.generation(), 1);
        assert_eq!(index.doc_count(), 2);

        let results = index.search("interest rate", None).unwrap();
        assert!(!results.is_empty());
        assert_eq!(results[0].chunk_id, "c1");
    }

    #[test]
    fn rebuild_replaces_previous_contents() {
        let index = SparseIndex::new(SparseConfig::default()).unwrap();
        index.rebuild(&[sample_chunk("c1", "d1", "first version")], 1).unwrap();
        index.rebuild(&[sample_chunk("c2", "d1", "second version")], 2).unwrap();
        assert_eq!(index.doc_count(), 1);
        assert_eq!(index.generation(), 2);
    }
}
