// ============================================================
// CSV INFRASTRUCTURE LAYER
// ============================================================
// Decoding, header validation and cell typing for equipment uploads

mod equipment_parser;

pub use equipment_parser::{EquipmentCsvParser, ParsedTable};
