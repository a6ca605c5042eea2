//! Card catalog: read-only card lookup for display enrichment
//!
//! The catalog never feeds replicated state. A failed or empty lookup only
//! means the overlay shows an id instead of a name.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use supershow_domain::Card;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read card catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid card catalog {path}: {message}")]
    Format { path: PathBuf, message: String },

    #[error("Catalog unavailable: {0}")]
    Unavailable(String),
}

impl CatalogError {
    pub fn format(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Format {
            path: path.into(),
            message: message.into(),
        }
    }
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait CardCatalog: Send + Sync {
    fn get_card_by_id(&self, id: &str) -> Result<Option<Card>, CatalogError>;

    /// All competitor cards, ordered by name.
    fn competitors(&self) -> Result<Vec<Card>, CatalogError>;

    /// Competitor lookup: exact (case-insensitive) name first, then the first
    /// name containing `name`.
    fn find_competitor(&self, name: &str) -> Result<Option<Card>, CatalogError>;
}

/// Catalog backed by a JSON array of card records.
#[derive(Debug, Default)]
pub struct JsonCardCatalog {
    cards: HashMap<String, Card>,
    competitors: Vec<Card>,
}

impl JsonCardCatalog {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_cards(cards: Vec<Card>) -> Self {
        let mut competitors: Vec<Card> = cards.iter().filter(|c| c.is_competitor()).cloned().collect();
        competitors.sort_by(|a, b| a.name.cmp(&b.name));
        let cards = cards.into_iter().map(|c| (c.db_uuid.clone(), c)).collect();
        Self { cards, competitors }
    }

    /// Load from `path`. A missing file yields an empty catalog.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "Card catalog not found, continuing without card names");
                return Ok(Self::empty());
            }
            Err(source) => {
                return Err(CatalogError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let cards: Vec<Card> =
            serde_json::from_str(&text).map_err(|e| CatalogError::format(path, e.to_string()))?;
        tracing::info!(path = %path.display(), count = cards.len(), "Loaded card catalog");
        Ok(Self::from_cards(cards))
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

impl CardCatalog for JsonCardCatalog {
    fn get_card_by_id(&self, id: &str) -> Result<Option<Card>, CatalogError> {
        Ok(self.cards.get(id).cloned())
    }

    fn competitors(&self) -> Result<Vec<Card>, CatalogError> {
        Ok(self.competitors.clone())
    }

    fn find_competitor(&self, name: &str) -> Result<Option<Card>, CatalogError> {
        let needle = name.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(None);
        }
        let exact = self
            .competitors
            .iter()
            .find(|c| c.name.to_lowercase() == needle);
        let found = exact.or_else(|| {
            self.competitors
                .iter()
                .find(|c| c.name.to_lowercase().contains(&needle))
        });
        Ok(found.cloned())
    }
}
