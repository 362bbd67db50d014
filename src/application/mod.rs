pub mod use_cases;

pub use use_cases::dataset_history::{DatasetHistory, RetentionPolicy};
pub use use_cases::equipment_analysis::EquipmentAnalysisUseCase;
