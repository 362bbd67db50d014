// ============================================================
// EQUIPMENT DOMAIN LAYER
// ============================================================
// Typed rows, stored datasets and history scopes
// No I/O, no async

mod cell;
mod columns;
mod dataset;
mod row;
mod scope;

pub use cell::{format_number, CellValue};
pub use columns::{
    COL_EQUIPMENT_NAME, COL_FLOWRATE, COL_PRESSURE, COL_TEMPERATURE, COL_TYPE, NUMERIC_COLUMNS,
    REQUIRED_COLUMNS,
};
pub use dataset::{DatasetId, DatasetSummary, NewDataset, StoredDataset, TypeDistribution, UploadedFile};
pub use row::EquipmentRow;
pub use scope::Scope;
