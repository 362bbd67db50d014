// ============================================================
// CELL VALUE
// ============================================================
// A single row value: text, number or null

use serde::{Deserialize, Serialize};
use std::fmt;

/// Value of one cell in an equipment row.
///
/// Serializes as a bare JSON `null`, number or string so stored rows stay
/// flat key/value maps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Number(f64),
    Text(String),
}

impl CellValue {
    /// Build a numeric cell, mapping NaN and infinities to null.
    pub fn number(value: f64) -> Self {
        if value.is_finite() {
            CellValue::Number(value)
        } else {
            CellValue::Null
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => Ok(()),
            CellValue::Number(value) => write!(f, "{}", format_number(*value)),
            CellValue::Text(text) => write!(f, "{}", text),
        }
    }
}

/// Render a number the way report readers expect: whole values keep one
/// decimal (`120.0`), everything else uses the shortest exact form.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_rejects_non_finite() {
        assert_eq!(CellValue::number(f64::NAN), CellValue::Null);
        assert_eq!(CellValue::number(f64::INFINITY), CellValue::Null);
        assert_eq!(CellValue::number(1.5), CellValue::Number(1.5));
    }

    #[test]
    fn test_serializes_as_bare_json_values() {
        let cells = vec![
            CellValue::Null,
            CellValue::Number(2.5),
            CellValue::Text("Pump".to_string()),
        ];
        let json = serde_json::to_string(&cells).unwrap();
        assert_eq!(json, r#"[null,2.5,"Pump"]"#);

        let back: Vec<CellValue> = serde_json::from_str(r#"[null, 3, "Valve"]"#).unwrap();
        assert_eq!(back[0], CellValue::Null);
        assert_eq!(back[1], CellValue::Number(3.0));
        assert_eq!(back[2], CellValue::Text("Valve".to_string()));
    }

    #[test]
    fn test_display_formats() {
        assert_eq!(CellValue::Number(120.0).to_string(), "120.0");
        assert_eq!(CellValue::Number(5.2345).to_string(), "5.2345");
        assert_eq!(CellValue::Null.to_string(), "");
    }
}
