use thiserror::Error;

use crate::models::Category;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum CleanupError {
    /// Configuration error: the run never reached storage.
    #[error(
        "Retention horizon of {days} days is too large. Try something less than 99999 (about 270 years)."
    )]
    HorizonTooLarge { days: u32 },

    /// A storage failure while processing one category. The whole run's
    /// transaction is rolled back.
    #[error("Cleaning up {category} records failed: {source}")]
    Storage {
        category: Category,
        #[source]
        source: StoreError,
    },

    /// A failure opening or closing the run's transaction.
    #[error("Transaction error: {0}")]
    Transaction(#[from] StoreError),
}

impl CleanupError {
    pub(crate) fn storage(category: Category, source: StoreError) -> Self {
        CleanupError::Storage { category, source }
    }
}
