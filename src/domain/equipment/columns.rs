// ============================================================
// COLUMN CONTRACT
// ============================================================
// Header labels every uploaded equipment table must carry

pub const COL_EQUIPMENT_NAME: &str = "Equipment Name";
pub const COL_TYPE: &str = "Type";
pub const COL_FLOWRATE: &str = "Flowrate";
pub const COL_PRESSURE: &str = "Pressure";
pub const COL_TEMPERATURE: &str = "Temperature";

/// Columns that must be present (after trimming) in the header row.
pub const REQUIRED_COLUMNS: [&str; 5] = [
    COL_EQUIPMENT_NAME,
    COL_TYPE,
    COL_FLOWRATE,
    COL_PRESSURE,
    COL_TEMPERATURE,
];

/// Columns coerced to real numbers; unparseable cells become null.
pub const NUMERIC_COLUMNS: [&str; 3] = [COL_FLOWRATE, COL_PRESSURE, COL_TEMPERATURE];
