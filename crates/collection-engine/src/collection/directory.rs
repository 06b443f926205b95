use std::sync::Arc;

use tracing::debug;

use super::domain::{Customer, Document, TenantId};
use super::repository::{CustomerSource, RepositoryError};

/// Looks a customer up by document across an ordered list of sources.
///
/// The document is normalized to digits once, then each source is asked in
/// the order given; the first hit wins. A source that is unavailable aborts
/// the lookup instead of silently falling through, so a transient outage on
/// the primary table never resolves to a stale record from a later source.
#[derive(Clone, Default)]
pub struct FallbackCustomerDirectory {
    sources: Vec<Arc<dyn CustomerSource>>,
}

impl FallbackCustomerDirectory {
    pub fn new(sources: Vec<Arc<dyn CustomerSource>>) -> Self {
        Self { sources }
    }

    pub fn with_source(mut self, source: Arc<dyn CustomerSource>) -> Self {
        self.sources.push(source);
        self
    }

    pub async fn find_by_document(
        &self,
        tenant: &TenantId,
        raw_document: &str,
    ) -> Result<Option<Customer>, RepositoryError> {
        let document = Document::new(raw_document);
        if document.is_empty() {
            return Ok(None);
        }

        for source in &self.sources {
            if let Some(customer) = source.find_by_document(tenant, &document).await? {
                debug!(source = source.name(), customer = %customer.id, "customer resolved by document");
                return Ok(Some(customer));
            }
        }

        Ok(None)
    }
}
