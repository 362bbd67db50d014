pub mod dataset_history;
pub mod equipment_analysis;
pub mod equipment_statistics;
