pub mod chunker;
pub mod config;
pub mod embedder;
pub mod gemini_client;
pub mod report_scanner;
pub mod search;
pub mod vector_store;
