use domain::errors::PipelineError;
use domain::ports::VectorStore;
use std::collections::BTreeSet;
use std::sync::Arc;

pub struct CompanyService {
    store: Arc<dyn VectorStore>,
}

impl CompanyService {
    pub fn new(store: Arc<dyn VectorStore>) -> Self {
        Self { store }
    }

    /// Distinct company names present in the collection, ascending.
    pub async fn list_companies(&self) -> Result<Vec<String>, PipelineError> {
        let metadata = self
            .store
            .list_metadata()
            .await
            .map_err(PipelineError::store)?;
        let companies: BTreeSet<String> = metadata.into_iter().map(|m| m.company).collect();
        Ok(companies.into_iter().collect())
    }
}
