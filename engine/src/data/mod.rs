//! Dataset model.
//!
//! - `table`: the single tabular backend (rows x named columns)
//! - `holder`: `DataHolder`, the dataset plus its classification metadata

pub mod holder;
pub mod table;

pub use holder::{canonical_data_type, DataHolder, DataStructure, UNKNOWN_DATA_TYPE};
pub use table::{cell_text, is_blank, Table};
