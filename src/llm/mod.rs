pub mod embeddings;
pub mod explain;
