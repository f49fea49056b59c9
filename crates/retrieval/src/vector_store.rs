//! Dense vector storage and similarity search, backed by Qdrant.

use std::collections::HashMap;

use qdrant_client::{
    Qdrant,
    qdrant::{
        Condition, CreateCollectionBuilder, Distance, FieldCondition, Filter, Match, PointId,
        PointStruct, SearchPointsBuilder, UpsertPointsBuilder, VectorParamsBuilder, value::Kind,
    },
};

use ragcore_core::Chunk;

use crate::error::RetrievalError;

#[derive(Debug, Clone)]
pub struct VectorStoreConfig {
    pub endpoint: String,
    pub vector_dim: usize,
    pub distance: VectorDistance,
    pub api_key: Option<String>,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:6334".to_string(),
            vector_dim: 384,
            distance: VectorDistance::Cosine,
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorDistance {
    Cosine,
    Euclidean,
    DotProduct,
}

impl From<VectorDistance> for Distance {
    fn from(d: VectorDistance) -> Self {
        match d {
            VectorDistance::Cosine => Distance::Cosine,
            VectorDistance::Euclidean => Distance::Euclid,
            VectorDistance::DotProduct => Distance::Dot,
        }
    }
}

/// Optional metadata filter applied server-side during a search.
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    pub document_id: Option<String>,
}

impl SearchFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn document_id(mut self, document_id: impl Into<String>) -> Self {
        self.document_id = Some(document_id.into());
        self
    }

    fn into_qdrant(self) -> Filter {
        let mut conditions = Vec::new();
        if let Some(document_id) = self.document_id {
            conditions.push(Condition {
                condition_one_of: Some(qdrant_client::qdrant::condition::ConditionOneOf::Field(
                    FieldCondition {
                        key: "document_id".to_string(),
                        r#match: Some(Match {
                            match_value: Some(qdrant_client::qdrant::r#match::MatchValue::Keyword(
                                document_id,
                            )),
                        }),
                        ..Default::default()
                    },
                )),
            });
        }
        Filter { must: conditions, ..Default::default() }
    }
}

/// A handle to one collection's vector index in Qdrant. The index name comes
/// from `ragcore_core::Collection::vector_index_name`, not the collection id,
/// since re-indexing creates a fresh index name without invalidating the id.
pub struct QdrantVectorStore {
    client: Qdrant,
    config: VectorStoreConfig,
}

impl QdrantVectorStore {
    pub fn new(config: VectorStoreConfig) -> Result<Self, RetrievalError> {
        let mut builder = Qdrant::from_url(&config.endpoint);
        if let Some(ref api_key) = config.api_key {
            builder = builder.api_key(api_key.clone());
        }
        let client = builder.build().map_err(|e| RetrievalError::VectorStore(e.to_string()))?;
        Ok(Self { client, config })
    }

    pub async fn ensure_index(&self, index: &str) -> Result<(), RetrievalError> {
        let exists = self
            .client
            .collection_exists(index)
            .await
            .map_err(|e| RetrievalError::VectorStore(e.to_string()))?;

        if !exists {
            self.client
                .create_collection(CreateCollectionBuilder::new(index).vectors_config(
                    VectorParamsBuilder::new(self.config.vector_dim as u64, self.config.distance.into()),
                ))
                .await
                .map_err(|e| RetrievalError::VectorStore(e.to_string()))?;
        }
        Ok(())
    }

    pub async fn upsert(&self, index: &str, chunks: &[Chunk]) -> Result<(), RetrievalError> {
        let points: Vec<PointStruct> = chunks
            .iter()
            .map(|chunk| {
                let mut payload: HashMap<String, qdrant_client::qdrant::Value> = HashMap::new();
                payload.insert("text".to_string(), chunk.text.clone().into());
                payload.insert("document_id".to_string(), chunk.document_id.clone().into());
                if let Some(ref title) = chunk.document_title {
                    payload.insert("document_title".to_string(), title.clone().into());
                }
                if let Some(page) = chunk.page {
                    payload.insert("page".to_string(), (page as i64).into());
                }
                payload.insert("ordinal".to_string(), (chunk.ordinal as i64).into());

                PointStruct::new(chunk.chunk_id.clone(), chunk.embedding.clone(), payload)
            })
            .collect();

        self.client
            .upsert_points(UpsertPointsBuilder::new(index, points))
            .await
            .map_err(|e| RetrievalError::VectorStore(e.to_string()))?;
        Ok(())
    }

    pub async fn search(
        &self,
        index: &str,
        embedding: &[f32],
        k: usize,
        filter: Option<SearchFilter>,
    ) -> Result<Vec<(Chunk, f32)>, RetrievalError> {
        let mut builder = SearchPointsBuilder::new(index, embedding.to_vec(), k as u64).with_payload(true);
        if let Some(f) = filter {
            builder = builder.filter(f.into_qdrant());
        }

        let results = self
            .client
            .search_points(builder)
            .await
            .map_err(|e| RetrievalError::VectorStore(e.to_string()))?;

        Ok(results.result.into_iter().map(point_to_chunk).collect())
    }
}

fn point_to_chunk(point: qdrant_client::qdrant::ScoredPoint) -> (Chunk, f32) {
    let mut text = String::new();
    let mut document_id = String::new();
    let mut document_title = None;
    let mut page = None;
    let mut ordinal = 0u32;

    for (key, value) in point.payload {
        match (key.as_str(), value.kind) {
            ("text", Some(Kind::StringValue(s))) => text = s,
            ("document_id", Some(Kind::StringValue(s))) => document_id = s,
            ("document_title", Some(Kind::StringValue(s))) => document_title = Some(s),
            ("page", Some(Kind::IntegerValue(n))) => page = Some(n as u32),
            ("ordinal", Some(Kind::IntegerValue(n))) => ordinal = n as u32,
            _ => {}
        }
    }

    let chunk_id = point
        .id
        .map(|pid| match pid.point_id_options {
            Some(qdrant_client::qdrant::point_id::PointIdOptions::Uuid(u)) => u,
            Some(qdrant_client::qdrant::point_id::PointIdOptions::Num(n)) => n.to_string(),
            None => String::new(),
        })
        .unwrap_or_default();

    let chunk = Chunk {
        chunk_id,
        document_id,
        document_title,
        text,
        page,
        ordinal,
        embedding: Vec::new(),
    };
    (chunk, point.score)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_with_document_id_builds_one_condition() {
        let filter = SearchFilter::new().document_id("doc-1");
        let qfilter = filter.into_qdrant();
        assert_eq!(qfilter.must.len(), 1);
    }
}
