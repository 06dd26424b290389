pub mod ingest;
pub mod retrieval;
