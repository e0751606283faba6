//! Per-user catalog storage
//!
//! Records are keyed by user and item id. The engine only needs these four
//! operations; [`FileCatalogStore`] keeps one YAML file per user.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::catalog::PriceItem;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Invalid user name '{0}': use letters, digits, '-' or '_'")]
    InvalidUser(String),

    #[error("Item '{0}' not found")]
    NotFound(String),

    #[error("Failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Failed to serialize catalog: {0}")]
    Serialize(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Persistent catalog records
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// All items saved for `user`, in stored order (empty when none)
    async fn load_items(&self, user: &str) -> Result<Vec<PriceItem>, StoreError>;

    /// Insert `item`, or replace the stored item with the same id
    async fn upsert_item(&self, user: &str, item: PriceItem) -> Result<(), StoreError>;

    async fn delete_item(&self, user: &str, item_id: &str) -> Result<(), StoreError>;

    /// Upsert every item in one write; returns how many were new
    async fn bulk_upsert(&self, user: &str, items: Vec<PriceItem>) -> Result<usize, StoreError>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredCatalog {
    #[serde(default)]
    items: Vec<PriceItem>,
}

/// One `<user>.yaml` file per user under a directory
#[derive(Debug, Clone)]
pub struct FileCatalogStore {
    dir: PathBuf,
}

impl FileCatalogStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, user: &str) -> Result<PathBuf, StoreError> {
        let valid = !user.is_empty()
            && user
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StoreError::InvalidUser(user.to_string()));
        }
        Ok(self.dir.join(format!("{}.yaml", user)))
    }

    async fn read(&self, user: &str) -> Result<Vec<PriceItem>, StoreError> {
        let path = self.path_for(user)?;
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let stored: StoredCatalog =
            serde_yml::from_str(&content).map_err(|e| StoreError::Parse {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        Ok(stored.items)
    }

    async fn write(&self, user: &str, items: Vec<PriceItem>) -> Result<(), StoreError> {
        let path = self.path_for(user)?;
        tokio::fs::create_dir_all(&self.dir).await?;
        let content = serde_yml::to_string(&StoredCatalog { items })
            .map_err(|e| StoreError::Serialize(e.to_string()))?;
        // Replace atomically
        let tmp = path.with_extension("yaml.tmp");
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

fn upsert(items: &mut Vec<PriceItem>, item: PriceItem) -> bool {
    match items.iter_mut().find(|existing| existing.id == item.id) {
        Some(existing) => {
            *existing = item;
            false
        }
        None => {
            items.push(item);
            true
        }
    }
}

#[async_trait]
impl CatalogStore for FileCatalogStore {
    async fn load_items(&self, user: &str) -> Result<Vec<PriceItem>, StoreError> {
        self.read(user).await
    }

    async fn upsert_item(&self, user: &str, item: PriceItem) -> Result<(), StoreError> {
        let mut items = self.read(user).await?;
        let id = item.id.clone();
        let added = upsert(&mut items, item);
        self.write(user, items).await?;
        tracing::debug!(user, item = %id, added, "stored catalog item");
        Ok(())
    }

    async fn delete_item(&self, user: &str, item_id: &str) -> Result<(), StoreError> {
        let mut items = self.read(user).await?;
        let before = items.len();
        items.retain(|item| item.id != item_id);
        if items.len() == before {
            return Err(StoreError::NotFound(item_id.to_string()));
        }
        self.write(user, items).await?;
        tracing::debug!(user, item = item_id, "deleted catalog item");
        Ok(())
    }

    async fn bulk_upsert(&self, user: &str, incoming: Vec<PriceItem>) -> Result<usize, StoreError> {
        let mut items = self.read(user).await?;
        let total = incoming.len();
        let added = incoming
            .into_iter()
            .fold(0, |count, item| count + usize::from(upsert(&mut items, item)));
        self.write(user, items).await?;
        tracing::info!(user, total, added, "bulk catalog update");
        Ok(added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::category::{Category, Unit};
    use tempfile::TempDir;

    fn item(id: &str, price: f64) -> PriceItem {
        PriceItem::new(id, id.replace('-', " "), Unit::Each, price, Category::Accessories)
    }

    #[tokio::test]
    async fn test_missing_user_loads_empty() {
        let tmp = TempDir::new().unwrap();
        let store = FileCatalogStore::new(tmp.path().join("catalogs"));
        assert!(store.load_items("estimator").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_replaces_by_id() {
        let tmp = TempDir::new().unwrap();
        let store = FileCatalogStore::new(tmp.path());
        store.upsert_item("sam", item("snow-guards", 14.0)).await.unwrap();
        store.upsert_item("sam", item("gutter-guard", 6.0)).await.unwrap();
        store.upsert_item("sam", item("snow-guards", 15.5)).await.unwrap();

        let items = store.load_items("sam").await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, "snow-guards");
        assert_eq!(items[0].price, 15.5);
    }

    #[tokio::test]
    async fn test_users_are_separate() {
        let tmp = TempDir::new().unwrap();
        let store = FileCatalogStore::new(tmp.path());
        store.upsert_item("sam", item("snow-guards", 14.0)).await.unwrap();
        assert!(store.load_items("alex").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete() {
        let tmp = TempDir::new().unwrap();
        let store = FileCatalogStore::new(tmp.path());
        store.upsert_item("sam", item("snow-guards", 14.0)).await.unwrap();
        store.delete_item("sam", "snow-guards").await.unwrap();
        assert!(store.load_items("sam").await.unwrap().is_empty());
        assert!(matches!(
            store.delete_item("sam", "snow-guards").await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_bulk_upsert_counts_new_items() {
        let tmp = TempDir::new().unwrap();
        let store = FileCatalogStore::new(tmp.path());
        store.upsert_item("sam", item("snow-guards", 14.0)).await.unwrap();
        let added = store
            .bulk_upsert(
                "sam",
                vec![item("snow-guards", 16.0), item("heat-cable", 9.0), item("gutter-guard", 6.0)],
            )
            .await
            .unwrap();
        assert_eq!(added, 2);
        assert_eq!(store.load_items("sam").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_user_name_cannot_escape_directory() {
        let tmp = TempDir::new().unwrap();
        let store = FileCatalogStore::new(tmp.path());
        assert!(matches!(
            store.load_items("../etc").await,
            Err(StoreError::InvalidUser(_))
        ));
    }
}
