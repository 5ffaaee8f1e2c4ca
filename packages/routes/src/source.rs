//! Where route documents come from.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::{RouteDocument, RouteError};

/// A read-only collection of route documents.
#[async_trait]
pub trait RouteSource: Send + Sync {
    /// Loads every route document.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError`] if the documents cannot be read or parsed.
    async fn load_routes(&self) -> Result<Vec<RouteDocument>, RouteError>;
}

/// Route documents exported to a JSON file as a top-level array.
#[derive(Debug, Clone)]
pub struct JsonFileRouteSource {
    path: PathBuf,
}

impl JsonFileRouteSource {
    /// Creates a source reading from `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The file this source reads.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RouteSource for JsonFileRouteSource {
    async fn load_routes(&self) -> Result<Vec<RouteDocument>, RouteError> {
        log::debug!("Reading route documents from {}", self.path.display());
        let contents = tokio::fs::read_to_string(&self.path).await?;
        Ok(serde_json::from_str(&contents)?)
    }
}
