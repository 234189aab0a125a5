use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_id!(
    /// Identifier wrapper for project charters.
    ProjectId
);
entity_id!(
    /// Identifier wrapper for weighted groups inside a project.
    GroupId
);
entity_id!(
    /// Identifier wrapper for scored items.
    ItemId
);
entity_id!(TargetId);
entity_id!(RealizationId);

/// Which side of the charter a group measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GroupKind {
    Activity,
    Success,
}

impl GroupKind {
    pub const fn label(self) -> &'static str {
        match self {
            GroupKind::Activity => "ACTIVITY",
            GroupKind::Success => "SUCCESS",
        }
    }
}

impl FromStr for GroupKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "ACTIVITY" => Ok(Self::Activity),
            "SUCCESS" => Ok(Self::Success),
            other => Err(format!("unknown group kind '{other}'")),
        }
    }
}

/// Direction in which a metric is considered good.
///
/// Values outside the known set are kept verbatim so a data-entry defect scores as
/// unknown instead of failing the whole snapshot load.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Polarity {
    Max,
    Min,
    Stable,
    Unrecognized(String),
}

impl From<String> for Polarity {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "MAX" => Self::Max,
            "MIN" => Self::Min,
            "STABLE" => Self::Stable,
            _ => Self::Unrecognized(value),
        }
    }
}

impl From<Polarity> for String {
    fn from(value: Polarity) -> Self {
        match value {
            Polarity::Max => "MAX".to_string(),
            Polarity::Min => "MIN".to_string(),
            Polarity::Stable => "STABLE".to_string(),
            Polarity::Unrecognized(raw) => raw,
        }
    }
}

/// Strategy for collapsing the realizations of one window into a single value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Rollup {
    Summary,
    Average,
    Latest,
    Unrecognized(String),
}

impl From<String> for Rollup {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "SUMMARY" => Self::Summary,
            "AVERAGE" => Self::Average,
            "LATEST" => Self::Latest,
            _ => Self::Unrecognized(value),
        }
    }
}

impl From<Rollup> for String {
    fn from(value: Rollup) -> Self {
        match value {
            Rollup::Summary => "SUMMARY".to_string(),
            Rollup::Average => "AVERAGE".to_string(),
            Rollup::Latest => "LATEST".to_string(),
            Rollup::Unrecognized(raw) => raw,
        }
    }
}

/// Bucket size used when splitting a date range into reporting periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodType {
    Weekly,
    Monthly,
    Quarterly,
    Semester,
    Yearly,
}

impl PeriodType {
    pub const fn label(self) -> &'static str {
        match self {
            PeriodType::Weekly => "weekly",
            PeriodType::Monthly => "monthly",
            PeriodType::Quarterly => "quarterly",
            PeriodType::Semester => "semester",
            PeriodType::Yearly => "yearly",
        }
    }
}

impl FromStr for PeriodType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "quarterly" => Ok(Self::Quarterly),
            "semester" => Ok(Self::Semester),
            "yearly" => Ok(Self::Yearly),
            other => Err(format!("unknown period type '{other}'")),
        }
    }
}

/// A project charter. When `parent_item_id` is set the project is the child subtree whose
/// score replaces that item's own score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub responsible: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub parent_item_id: Option<ItemId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub project_id: ProjectId,
    pub kind: GroupKind,
    #[serde(default)]
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub group_id: GroupId,
    pub name: String,
    #[serde(default)]
    pub weight: f64,
    #[serde(default)]
    pub uom: String,
    pub polarity: Polarity,
    pub period_type: PeriodType,
    pub rollup: Rollup,
    /// Missing or unparseable dates load as `None`.
    #[serde(default, deserialize_with = "lenient_date")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient_date")]
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodicTarget {
    pub id: TargetId,
    pub item_id: ItemId,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub target_value: f64,
}

impl PeriodicTarget {
    pub fn overlaps(&self, window: &Window) -> bool {
        self.period_start <= window.end && self.period_end >= window.start
    }
}

/// A recorded value. Several entries may share a `date`; the one with the latest
/// `recorded_at` is authoritative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Realization {
    pub id: RealizationId,
    pub item_id: ItemId,
    pub date: NaiveDate,
    pub value: f64,
    #[serde(default, deserialize_with = "lenient_datetime")]
    pub recorded_at: Option<NaiveDateTime>,
}

/// Inclusive date range a score is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Window {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Bounds requested by a caller; either side may be left to the entity's own dates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowRequest {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl WindowRequest {
    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn unbounded() -> Self {
        Self::default()
    }
}

/// Addressable entity for the generic `score` query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum EntityRef {
    Item(ItemId),
    Group(GroupId),
    Project(ProjectId),
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityRef::Item(id) => write!(f, "item {id}"),
            EntityRef::Group(id) => write!(f, "group {id}"),
            EntityRef::Project(id) => write!(f, "project {id}"),
        }
    }
}

fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()))
}

const RECORDED_AT_FORMATS: [&str; 3] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
];

/// ISO timestamps with or without seconds, and SQLite's space-separated form.
/// Anything else loads as an unknown recording time.
fn lenient_datetime<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| {
        let value = value.trim();
        RECORDED_AT_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
    }))
}
