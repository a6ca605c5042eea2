use supershow_shared::CatalogError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("No competitor named '{0}'")]
    UnknownCompetitor(String),
}
