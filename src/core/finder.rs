use crate::descriptor::ElementDescriptor;
use crate::dom::node::Page;
use crate::errors::Result;
use crate::types::CapabilityTag;
use async_trait::async_trait;

/// Source of filtered element descriptors for a page.
///
/// Implementations never suspend on their own; the async signature lets
/// callers drive any finder from the same runtime as the rest of their work.
#[async_trait]
pub trait ElementFinder: Send + Sync {
    /// Visible, deduplicated descriptors for the requested classes.
    async fn find_elements(&self, page: &Page, tags: &[CapabilityTag]) -> Result<Vec<ElementDescriptor>>;
}
