pub mod embeddings;
pub mod qdrant_index;
pub mod retriever;

pub use embeddings::EmbeddingClient;
pub use qdrant_index::QdrantIndexer;
pub use retriever::QdrantRetriever;
