//! Two-tier author portrait resolution. A missing portrait is never an error.

use std::sync::Arc;

use async_trait::async_trait;
use shira_core::Scalar;
use tracing::debug;

use crate::http::LibraryClient;
use crate::wiki::EncyclopediaClient;

#[async_trait]
pub trait PortraitSource: Send + Sync {
    async fn find_portrait(&self, author_id: Option<&Scalar>, author: &str) -> Option<String>;
}

/// Library author record first, encyclopedia thumbnail second.
pub struct PortraitFinder {
    library: Arc<LibraryClient>,
    encyclopedia: EncyclopediaClient,
}

impl PortraitFinder {
    pub fn new(library: Arc<LibraryClient>, encyclopedia: EncyclopediaClient) -> Self {
        Self {
            library,
            encyclopedia,
        }
    }
}

#[async_trait]
impl PortraitSource for PortraitFinder {
    async fn find_portrait(&self, author_id: Option<&Scalar>, author: &str) -> Option<String> {
        if let Some(id) = author_id {
            match self.library.author_portrait(id).await {
                Ok(Some(url)) => return Some(url),
                Ok(None) => debug!(author_id = %id, "library has no portrait"),
                Err(e) => debug!(author_id = %id, error = %e, "library author lookup failed"),
            }
        }

        match self.encyclopedia.portrait(author).await {
            Ok(url) => url,
            Err(e) => {
                debug!(author = %author, error = %e, "encyclopedia lookup failed");
                None
            }
        }
    }
}
