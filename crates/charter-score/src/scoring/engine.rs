//! Item, group, and project scoring.
//!
//! Scores flow bottom-up. An item either delegates to the child project linked to it or rolls
//! up its realizations against the targets overlapping the window. Groups and projects are
//! weighted averages normalized by the weights actually present, so malformed weight sums
//! are tolerated. `None` means "no evidence" and only exists at the item boundary; groups
//! collapse it to zero progress.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, warn};

use super::domain::{
    EntityRef, GroupId, GroupKind, Item, ItemId, Polarity, ProjectId, Realization, Rollup,
    Window, WindowRequest,
};
use super::normalize::{normalize, Normalization, DEFAULT_STABLE_TOLERANCE};
use super::period::is_full_month;
use super::repository::{RepositoryError, ScoringSource};
use super::timeline::time_factor;
use crate::config::ScoringConfig;

/// Per-call settings threaded through every aggregation level.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringContext {
    pub timeline_weighting: bool,
    pub max_delegation_depth: usize,
    pub stable_tolerance: f64,
    /// Stands in for "now" wherever a window or timeline reference is missing.
    pub today: NaiveDate,
}

impl ScoringContext {
    pub fn new(today: NaiveDate) -> Self {
        Self::from_config(&ScoringConfig::default(), today)
    }

    pub fn from_config(config: &ScoringConfig, today: NaiveDate) -> Self {
        Self {
            timeline_weighting: config.timeline_weighting,
            max_delegation_depth: config.max_delegation_depth.max(1),
            stable_tolerance: config.stable_tolerance,
            today,
        }
    }

    pub fn with_timeline_weighting(mut self, enabled: bool) -> Self {
        self.timeline_weighting = enabled;
        self
    }

    pub fn with_max_delegation_depth(mut self, depth: usize) -> Self {
        self.max_delegation_depth = depth.max(1);
        self
    }
}

impl Default for ScoringContext {
    fn default() -> Self {
        Self {
            timeline_weighting: true,
            max_delegation_depth: 32,
            stable_tolerance: DEFAULT_STABLE_TOLERANCE,
            today: chrono::Local::now().date_naive(),
        }
    }
}

/// Error raised while scoring.
#[derive(Debug, thiserror::Error)]
pub enum ScoreError {
    #[error(transparent)]
    Storage(#[from] RepositoryError),
    #[error("delegation cycle detected at project {project} (chain: {})", format_chain(.chain))]
    CycleDetected {
        project: ProjectId,
        chain: Vec<ProjectId>,
    },
    #[error("{0} not found")]
    NotFound(EntityRef),
}

fn format_chain(chain: &[ProjectId]) -> String {
    chain
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Weighted group result: the group's score and its share within the project.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupScore {
    pub score: f64,
    pub weight: f64,
}

/// Stateless evaluator over one consistent data source.
pub struct ScoringEngine<'a, S: ?Sized> {
    source: &'a S,
    context: &'a ScoringContext,
}

impl<'a, S> ScoringEngine<'a, S>
where
    S: ScoringSource + ?Sized,
{
    pub fn new(source: &'a S, context: &'a ScoringContext) -> Self {
        Self { source, context }
    }

    pub fn context(&self) -> &ScoringContext {
        self.context
    }

    pub fn source(&self) -> &S {
        self.source
    }

    /// Score any entity. Items may be unknown; groups and projects always resolve to a number
    /// unless the group itself does not exist.
    pub fn score(&self, entity: EntityRef, window: WindowRequest) -> Result<Option<f64>, ScoreError> {
        match entity {
            EntityRef::Item(id) => self.item_score(id, window),
            EntityRef::Group(id) => Ok(self.group_score(id, window)?.map(|group| group.score)),
            EntityRef::Project(id) => self.project_score(id, window).map(Some),
        }
    }

    pub fn item_score(&self, id: ItemId, window: WindowRequest) -> Result<Option<f64>, ScoreError> {
        self.item_score_on_path(id, window, &mut Vec::new())
    }

    pub fn group_score(
        &self,
        id: GroupId,
        window: WindowRequest,
    ) -> Result<Option<GroupScore>, ScoreError> {
        self.group_score_on_path(id, window, &mut Vec::new())
    }

    pub fn project_score(&self, id: ProjectId, window: WindowRequest) -> Result<f64, ScoreError> {
        self.project_score_on_path(id, window, &mut Vec::new())
    }

    /// Score of the first group of `kind` in the project, if the project has one.
    pub fn group_kind_score(
        &self,
        project: ProjectId,
        kind: GroupKind,
        window: WindowRequest,
    ) -> Result<Option<f64>, ScoreError> {
        let group = self
            .source
            .groups_of_project(project)?
            .into_iter()
            .find(|group| group.kind == kind);
        match group {
            Some(group) => Ok(self.group_score(group.id, window)?.map(|group| group.score)),
            None => Ok(None),
        }
    }

    fn item_score_on_path(
        &self,
        id: ItemId,
        window: WindowRequest,
        path: &mut Vec<ProjectId>,
    ) -> Result<Option<f64>, ScoreError> {
        if let Some(child) = self.source.child_project_of(id)? {
            debug!(item = %id, child = %child.id, "item delegates to child project");
            return self
                .project_score_on_path(child.id, window, path)
                .map(Some);
        }

        let Some(item) = self.source.item(id)? else {
            return Ok(None);
        };
        if let Polarity::Unrecognized(raw) = &item.polarity {
            warn!(item = %id, polarity = %raw, "unrecognized polarity; item scored as unknown");
        }

        let resolved = Window::new(
            window
                .start
                .or(item.start_date)
                .unwrap_or(self.context.today),
            window.end.or(item.end_date).unwrap_or(self.context.today),
        );

        let target: f64 = self
            .source
            .targets_overlapping(id, resolved)?
            .iter()
            .map(|target| target.target_value)
            .sum();

        let points = latest_per_date(self.source.realizations_in_window(id, resolved)?);
        if points.is_empty() {
            if target > 0.0 && item.polarity == Polarity::Max {
                return Ok(Some(0.0));
            }
            return Ok(None);
        }

        let full_month = match (window.start, window.end) {
            (Some(start), Some(end)) if is_full_month(start, end) => Some(Window::new(start, end)),
            _ => None,
        };

        Ok(self.roll_up(&item, &points, target, full_month))
    }

    fn roll_up(
        &self,
        item: &Item,
        points: &[(NaiveDate, f64)],
        target: f64,
        full_month: Option<Window>,
    ) -> Option<f64> {
        let tolerance = self.context.stable_tolerance;
        let params = Normalization::new(target, Some(target)).with_tolerance(tolerance);

        match &item.rollup {
            Rollup::Summary => {
                let total = points.iter().map(|(_, value)| value).sum();
                normalize(Some(total), &item.polarity, params)
            }
            Rollup::Average => {
                let per_point = if target != 0.0 {
                    target / points.len() as f64
                } else {
                    0.0
                };
                let per_point =
                    Normalization::new(per_point, Some(per_point)).with_tolerance(tolerance);
                let scores: Vec<f64> = points
                    .iter()
                    .filter_map(|(_, value)| normalize(Some(*value), &item.polarity, per_point))
                    .collect();
                if scores.is_empty() {
                    None
                } else {
                    Some(scores.iter().sum::<f64>() / scores.len() as f64)
                }
            }
            Rollup::Latest => {
                let in_month = full_month.and_then(|month| {
                    points
                        .iter()
                        .rev()
                        .find(|(date, _)| month.contains(*date))
                        .map(|(_, value)| *value)
                });
                let latest = in_month.or_else(|| points.last().map(|(_, value)| *value));
                normalize(latest, &item.polarity, params)
            }
            Rollup::Unrecognized(raw) => {
                warn!(item = %item.id, rollup = %raw, "unrecognized rollup; item scored as unknown");
                None
            }
        }
    }

    fn group_score_on_path(
        &self,
        id: GroupId,
        window: WindowRequest,
        path: &mut Vec<ProjectId>,
    ) -> Result<Option<GroupScore>, ScoreError> {
        let Some(group) = self.source.group(id)? else {
            return Ok(None);
        };

        let mut weighted = Vec::new();
        for item in self.source.items_of_group(id)? {
            let mut score = self
                .item_score_on_path(item.id, window, path)?
                .unwrap_or(0.0);
            if self.context.timeline_weighting {
                score *= time_factor(
                    item.start_date,
                    item.end_date,
                    window.end,
                    self.context.today,
                );
            }
            weighted.push((score, item.weight));
        }

        Ok(Some(GroupScore {
            score: weighted_average(&weighted),
            weight: group.weight,
        }))
    }

    fn project_score_on_path(
        &self,
        id: ProjectId,
        window: WindowRequest,
        path: &mut Vec<ProjectId>,
    ) -> Result<f64, ScoreError> {
        if path.contains(&id) || path.len() >= self.context.max_delegation_depth {
            let mut chain = path.clone();
            chain.push(id);
            warn!(project = %id, depth = path.len(), "delegation chain rejected");
            return Err(ScoreError::CycleDetected { project: id, chain });
        }

        let groups = self.source.groups_of_project(id)?;
        if groups.is_empty() {
            return Ok(0.0);
        }

        path.push(id);
        let mut weighted = Vec::with_capacity(groups.len());
        for group in &groups {
            let score = self
                .group_score_on_path(group.id, window, path)?
                .map(|scored| scored.score)
                .unwrap_or(0.0);
            weighted.push((score, group.weight));
        }
        path.pop();

        Ok(weighted_average(&weighted).clamp(0.0, 1.0))
    }
}

/// Keep the most recently recorded value per date, in date order. Among entries recorded at
/// the same instant the first one read wins.
fn latest_per_date(rows: Vec<Realization>) -> Vec<(NaiveDate, f64)> {
    let mut latest: BTreeMap<NaiveDate, (f64, Option<NaiveDateTime>)> = BTreeMap::new();
    for row in rows {
        match latest.entry(row.date) {
            Entry::Vacant(slot) => {
                slot.insert((row.value, row.recorded_at));
            }
            Entry::Occupied(mut slot) => {
                if slot.get().1 < row.recorded_at {
                    slot.insert((row.value, row.recorded_at));
                }
            }
        }
    }
    latest
        .into_iter()
        .map(|(date, (value, _))| (date, value))
        .collect()
}

/// Sum of `score * weight / total_weight`, treating a zero weight total as 1.
fn weighted_average(entries: &[(f64, f64)]) -> f64 {
    let total: f64 = entries.iter().map(|(_, weight)| weight).sum();
    let total = if total == 0.0 { 1.0 } else { total };
    entries
        .iter()
        .map(|(score, weight)| score * (weight / total))
        .sum()
}
