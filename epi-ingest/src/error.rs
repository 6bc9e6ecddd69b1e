//! Dataset pipeline errors
//!
//! Each error is fatal to one dataset only; the other dataset still loads.

use crate::db::replace::ReplaceState;
use crate::guard::RegressionError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatasetError {
    /// Nothing normalized for this dataset; the live table is left alone
    #[error("No {table} records assembled; live table left unchanged")]
    EmptyDataset { table: &'static str },

    #[error("Refusing to replace {table}: {source}")]
    Regression {
        table: &'static str,
        #[source]
        source: RegressionError,
    },

    #[error("Replacing {table} failed after reaching {state}: {source}")]
    Replace {
        table: &'static str,
        state: ReplaceState,
        #[source]
        source: epi_common::Error,
    },
}

impl DatasetError {
    /// Live table the failed replace targeted
    pub fn table(&self) -> &'static str {
        match self {
            DatasetError::EmptyDataset { table }
            | DatasetError::Regression { table, .. }
            | DatasetError::Replace { table, .. } => *table,
        }
    }
}
