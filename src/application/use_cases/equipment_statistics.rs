//! Summary statistics for parsed equipment rows.
//!
//! Averages skip null cells and are rounded to four decimals; a column with no
//! numeric values averages to `None`. The type distribution counts trimmed
//! `Type` labels, with null or blank types counted under `null`.

use crate::domain::equipment::{
    CellValue, DatasetSummary, EquipmentRow, TypeDistribution, COL_FLOWRATE, COL_PRESSURE,
    COL_TEMPERATURE, COL_TYPE,
};

/// Bucket label for rows without a usable `Type`.
pub const NULL_TYPE_LABEL: &str = "null";

const DECIMAL_PLACES: usize = 4;

/// Summary plus the rows as they should be stored and displayed.
#[derive(Debug, Clone)]
pub struct AggregatedRows {
    pub summary: DatasetSummary,
    pub rows: Vec<EquipmentRow>,
}

/// Compute the dataset summary, then round every numeric cell for display.
pub fn aggregate(rows: Vec<EquipmentRow>) -> AggregatedRows {
    let summary = summarize(&rows);
    let rows = rows
        .into_iter()
        .map(|row| row.map_numbers(|value| CellValue::number(round_decimals(value))))
        .collect();

    AggregatedRows { summary, rows }
}

pub fn summarize(rows: &[EquipmentRow]) -> DatasetSummary {
    DatasetSummary {
        total_count: rows.len() as u64,
        avg_flowrate: column_mean(rows, COL_FLOWRATE),
        avg_pressure: column_mean(rows, COL_PRESSURE),
        avg_temperature: column_mean(rows, COL_TEMPERATURE),
        type_distribution: type_distribution(rows),
    }
}

/// Mean of the non-null values in `column`, rounded; `None` when there are none.
pub fn column_mean(rows: &[EquipmentRow], column: &str) -> Option<f64> {
    let values: Vec<f64> = rows
        .iter()
        .filter_map(|row| row.number(column))
        .filter(|value| value.is_finite())
        .collect();

    mean(&values).map(round_decimals).filter(|value| value.is_finite())
}

pub fn type_distribution(rows: &[EquipmentRow]) -> TypeDistribution {
    let mut distribution = TypeDistribution::new();

    for row in rows {
        let label = match row.get(COL_TYPE) {
            Some(CellValue::Text(text)) if !text.trim().is_empty() => text.trim().to_string(),
            Some(CellValue::Number(number)) => CellValue::Number(*number).to_string(),
            _ => NULL_TYPE_LABEL.to_string(),
        };
        distribution.increment(&label);
    }

    distribution.sort_by_frequency();
    distribution
}

/// Round to four decimals from the exact binary value, so `2.00005` (stored
/// just below the midpoint) rounds down.
///
/// Values too large to carry a fractional part are returned unchanged.
pub fn round_decimals(value: f64) -> f64 {
    if !value.is_finite() || value.abs() >= 1e11 {
        return value;
    }
    format!("{:.*}", DECIMAL_PLACES, value)
        .parse::<f64>()
        .unwrap_or(value)
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let count = values.len() as f64;
    let sum: f64 = values.iter().sum();
    if sum.is_finite() {
        return Some(sum / count);
    }

    // Sum overflowed; fall back to a running mean.
    let mut running = 0.0;
    for (idx, value) in values.iter().enumerate() {
        running += (value - running) / (idx as f64 + 1.0);
    }
    Some(running)
}
