// ============================================================
// DATASET TYPES
// ============================================================
// Stored unit of ingestion: summary statistics plus the rows they came from

use chrono::{DateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use super::{EquipmentRow, Scope};

/// Identifier assigned by the dataset store at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetId(pub i64);

impl From<i64> for DatasetId {
    fn from(value: i64) -> Self {
        DatasetId(value)
    }
}

impl From<DatasetId> for i64 {
    fn from(value: DatasetId) -> Self {
        value.0
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Count of rows per equipment type, in display order.
///
/// Serialized as a flat JSON object whose key order is the display order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeDistribution {
    buckets: Vec<(String, u64)>,
}

impl TypeDistribution {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one more occurrence of `label`, appending new labels at the end.
    pub fn increment(&mut self, label: &str) {
        match self.buckets.iter_mut().find(|(name, _)| name == label) {
            Some((_, count)) => *count += 1,
            None => self.buckets.push((label.to_string(), 1)),
        }
    }

    /// Order buckets by count, most frequent first. Equal counts keep their
    /// first-seen order.
    pub fn sort_by_frequency(&mut self) {
        self.buckets.sort_by(|a, b| b.1.cmp(&a.1));
    }

    pub fn get(&self, label: &str) -> Option<u64> {
        self.buckets
            .iter()
            .find(|(name, _)| name == label)
            .map(|(_, count)| *count)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.buckets.iter().map(|(name, count)| (name.as_str(), *count))
    }

    pub fn labels(&self) -> Vec<&str> {
        self.buckets.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn total(&self) -> u64 {
        self.buckets.iter().map(|(_, count)| count).sum()
    }
}

impl FromIterator<(String, u64)> for TypeDistribution {
    fn from_iter<I: IntoIterator<Item = (String, u64)>>(iter: I) -> Self {
        let mut distribution = TypeDistribution::new();
        for (label, count) in iter {
            match distribution.buckets.iter_mut().find(|(name, _)| *name == label) {
                Some((_, existing)) => *existing += count,
                None => distribution.buckets.push((label, count)),
            }
        }
        distribution
    }
}

impl Serialize for TypeDistribution {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.buckets.len()))?;
        for (label, count) in &self.buckets {
            map.serialize_entry(label, count)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for TypeDistribution {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DistributionVisitor;

        impl<'de> Visitor<'de> for DistributionVisitor {
            type Value = TypeDistribution;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of type labels to counts")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut buckets = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some(entry) = access.next_entry::<String, u64>()? {
                    buckets.push(entry);
                }
                Ok(buckets.into_iter().collect())
            }
        }

        deserializer.deserialize_map(DistributionVisitor)
    }
}

/// Aggregate statistics computed from a dataset's rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub total_count: u64,
    pub avg_flowrate: Option<f64>,
    pub avg_pressure: Option<f64>,
    pub avg_temperature: Option<f64>,
    pub type_distribution: TypeDistribution,
}

/// Raw upload handed to the ingestion pipeline.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub content: Vec<u8>,
}

impl UploadedFile {
    pub fn new(file_name: Option<String>, content: Vec<u8>) -> Self {
        Self { file_name, content }
    }
}

/// A dataset ready to be written; the store assigns its id.
#[derive(Debug, Clone)]
pub struct NewDataset {
    pub name: String,
    pub scope: Scope,
    pub created_at: DateTime<Utc>,
    pub summary: DatasetSummary,
    pub rows: Vec<EquipmentRow>,
}

/// A dataset as held by the store. Never modified after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDataset {
    pub id: DatasetId,
    pub name: String,
    #[serde(skip)]
    pub scope: Scope,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub summary: DatasetSummary,
    #[serde(rename = "raw_rows")]
    pub rows: Vec<EquipmentRow>,
}

impl StoredDataset {
    pub fn from_new(id: DatasetId, dataset: NewDataset) -> Self {
        Self {
            id,
            name: dataset.name,
            scope: dataset.scope,
            created_at: dataset.created_at,
            summary: dataset.summary,
            rows: dataset.rows,
        }
    }

    /// Newest-first ordering: later `created_at` first, then higher id.
    pub fn recency_cmp(&self, other: &Self) -> std::cmp::Ordering {
        other
            .created_at
            .cmp(&self.created_at)
            .then_with(|| other.id.cmp(&self.id))
    }
}
