//! Incident model and snapshots of the feed.
//!
//! Incidents carry no stable ID in the feed, so identity is the full value:
//! category, message and both coordinates. Coordinates compare by bit
//! pattern, which keeps equality total (NaN == NaN) and consistent with Hash.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::error::FeedError;

/// Feed category that is tracked on the slow roadworks cadence.
pub const ROADWORK: &str = "Roadwork";

/// Expressway codes; roadworks outside these are not reported.
pub const EXPRESSWAYS: [&str; 11] = [
    "AYE", "BKE", "CTE", "ECP", "KPE", "KJE", "MCE", "NSC", "PIE", "SLE", "TPE",
];

const MAPS_SEARCH_URL: &str = "https://www.google.com/maps/search/?api=1&query=";

/// One record as delivered by DataMall. Every field may be absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawIncident {
    #[serde(rename = "Type", default)]
    pub category: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

/// A normalized traffic incident.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Incident {
    pub category: String,
    pub message: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Incident {
    pub fn new(category: &str, message: &str, latitude: f64, longitude: f64) -> Self {
        Self {
            category: category.to_string(),
            message: message.to_string(),
            latitude,
            longitude,
        }
    }

    /// Normalize a raw record. `index` is only used for error reporting.
    pub fn from_raw(index: usize, raw: RawIncident) -> Result<Self, FeedError> {
        let missing = |field| FeedError::Malformed { index, field };
        Ok(Self {
            category: raw.category.ok_or_else(|| missing("Type"))?,
            message: raw.message.ok_or_else(|| missing("Message"))?,
            latitude: raw.latitude.ok_or_else(|| missing("Latitude"))?,
            longitude: raw.longitude.ok_or_else(|| missing("Longitude"))?,
        })
    }

    pub fn is_roadwork(&self) -> bool {
        self.category == ROADWORK
    }

    pub fn location_link(&self) -> String {
        location_link(self.latitude, self.longitude)
    }

    fn key(&self) -> (&str, &str, u64, u64) {
        (
            &self.category,
            &self.message,
            self.latitude.to_bits(),
            self.longitude.to_bits(),
        )
    }
}

impl PartialEq for Incident {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Incident {}

impl Hash for Incident {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

/// Map search link for a coordinate pair.
pub fn location_link(latitude: f64, longitude: f64) -> String {
    format!("{}{},{}", MAPS_SEARCH_URL, latitude, longitude)
}

/// Incident field usable for substring filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Category,
    Message,
}

/// Incidents captured at one poll. Feed order is kept for rendering only;
/// comparisons between snapshots treat them as multisets (see `diff`).
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    incidents: Vec<Incident>,
}

impl Snapshot {
    /// Build a snapshot from raw feed records, rejecting incomplete ones.
    pub fn from_records(records: Vec<RawIncident>) -> Result<Self, FeedError> {
        let incidents = records
            .into_iter()
            .enumerate()
            .map(|(index, raw)| Incident::from_raw(index, raw))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { incidents })
    }

    pub fn incidents(&self) -> &[Incident] {
        &self.incidents
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Incident> {
        self.incidents.iter()
    }

    pub fn len(&self) -> usize {
        self.incidents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.incidents.is_empty()
    }

    /// Keep incidents whose category satisfies `predicate`.
    pub fn partition_by_category(&self, predicate: impl Fn(&str) -> bool) -> Snapshot {
        self.retain(|i| predicate(&i.category))
    }

    pub fn filter_by_category(&self, name: &str) -> Snapshot {
        self.partition_by_category(|category| category == name)
    }

    /// Keep incidents whose `field` contains any of `substrings` (case-sensitive).
    pub fn filter_by_substring(&self, field: Field, substrings: &[&str]) -> Snapshot {
        self.retain(|i| {
            let value = match field {
                Field::Category => &i.category,
                Field::Message => &i.message,
            };
            substrings.iter().any(|s| value.contains(s))
        })
    }

    /// Everything except roadworks.
    pub fn major(&self) -> Snapshot {
        self.partition_by_category(|category| category != ROADWORK)
    }

    /// Roadworks on expressways.
    pub fn roadworks(&self) -> Snapshot {
        self.filter_by_category(ROADWORK)
            .filter_by_substring(Field::Message, &EXPRESSWAYS)
    }

    fn retain(&self, keep: impl Fn(&Incident) -> bool) -> Snapshot {
        Snapshot {
            incidents: self.incidents.iter().filter(|i| keep(i)).cloned().collect(),
        }
    }
}

impl From<Vec<Incident>> for Snapshot {
    fn from(incidents: Vec<Incident>) -> Self {
        Self { incidents }
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = &'a Incident;
    type IntoIter = std::slice::Iter<'a, Incident>;

    fn into_iter(self) -> Self::IntoIter {
        self.incidents.iter()
    }
}
