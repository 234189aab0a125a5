//! Hierarchical charter scoring: item → group → project, with period bucketing,
//! polarity normalization, rollups, timeline weighting, and child-project delegation.

pub mod domain;
pub mod engine;
pub mod normalize;
pub mod period;
pub mod report;
pub mod repository;
pub mod router;
pub mod service;
pub mod store;
pub mod timeline;

#[cfg(test)]
mod tests;

pub use domain::{
    EntityRef, Group, GroupId, GroupKind, Item, ItemId, PeriodType, PeriodicTarget, Polarity,
    Project, ProjectId, Realization, RealizationId, Rollup, TargetId, Window, WindowRequest,
};
pub use engine::{GroupScore, ScoreError, ScoringContext, ScoringEngine};
pub use period::{Period, WeekBucket};
pub use report::{
    AchievementStatus, ChildProjectView, ProjectResume, ProjectStatus, SeriesPoint, WeightAudit,
    WeightWarning,
};
pub use repository::{RepositoryError, ScoringSource, SnapshotProvider};
pub use router::scoring_router;
pub use service::{ProjectStatusView, ScoreView, ScoringService};
pub use store::{CharterData, CharterSnapshot, InMemoryScoringStore};
