pub mod company_service;
pub mod comparison_service;
pub mod generation_service;
pub mod ingestion_service;
pub mod retrieval_service;
