use chrono::NaiveDate;
use serde::Serialize;
use tracing::warn;

use super::domain::{GroupId, GroupKind, ItemId, Project, ProjectId, WindowRequest};
use super::engine::{ScoreError, ScoringEngine};
use super::period::{self, first_of_month, last_day_of_month, Period};
use super::repository::ScoringSource;

const WEIGHT_EPSILON: f64 = 1e-6;
const EXPECTED_WEIGHT_TOTAL: f64 = 100.0;

/// Lifecycle position of a project relative to a reference date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    NotStarted,
    InProgress,
    Done,
    Overdue,
}

impl ProjectStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ProjectStatus::NotStarted => "Not Started",
            ProjectStatus::InProgress => "Progress",
            ProjectStatus::Done => "Done",
            ProjectStatus::Overdue => "Overdue",
        }
    }
}

/// Banding of an achievement ratio (score over baseline).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementStatus {
    NoData,
    Outstanding,
    AboveTarget,
    OnTarget,
    BelowTarget,
    Underperforming,
    Critical,
}

impl AchievementStatus {
    pub fn from_ratio(ratio: Option<f64>) -> Self {
        match ratio {
            None => Self::NoData,
            Some(ratio) if ratio > 1.20 => Self::Outstanding,
            Some(ratio) if ratio >= 1.10 => Self::AboveTarget,
            Some(ratio) if ratio >= 0.90 => Self::OnTarget,
            Some(ratio) if ratio >= 0.70 => Self::BelowTarget,
            Some(ratio) if ratio > 0.50 => Self::Underperforming,
            Some(_) => Self::Critical,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            AchievementStatus::NoData => "No Data",
            AchievementStatus::Outstanding => "Outstanding",
            AchievementStatus::AboveTarget => "Above Target",
            AchievementStatus::OnTarget => "On Target",
            AchievementStatus::BelowTarget => "Below Target",
            AchievementStatus::Underperforming => "Underperforming",
            AchievementStatus::Critical => "Critical",
        }
    }
}

/// Score of a project against a reporting baseline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Achievement {
    pub score: f64,
    pub ratio: f64,
    pub status: AchievementStatus,
}

/// Monthly and cumulative progress for one project and reporting month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectResume {
    pub project_id: ProjectId,
    pub project_name: String,
    pub is_child: bool,
    pub month_start: NaiveDate,
    pub month_end: NaiveDate,
    /// SUCCESS group score for the month, or 1.0 when no usable baseline exists.
    pub baseline: f64,
    pub monthly: Achievement,
    pub up_to_month: Achievement,
}

/// Advisory findings about charter structure. None of them block scoring.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WeightWarning {
    ProjectHasNoGroups,
    GroupWeightsOffTotal { total: f64 },
    GroupHasNoItems { group_id: GroupId },
    ItemWeightsOffTotal { group_id: GroupId, total: f64 },
    ActivityUomNotPercent { item_id: ItemId, uom: String },
}

impl WeightWarning {
    pub fn summary(&self) -> String {
        match self {
            WeightWarning::ProjectHasNoGroups => "project has no groups".to_string(),
            WeightWarning::GroupWeightsOffTotal { total } => {
                format!("group weights total {total:.2}, expected 100")
            }
            WeightWarning::GroupHasNoItems { group_id } => {
                format!("group {group_id} has no items")
            }
            WeightWarning::ItemWeightsOffTotal { group_id, total } => {
                format!("item weights in group {group_id} total {total:.2}, expected 100")
            }
            WeightWarning::ActivityUomNotPercent { item_id, uom } => {
                format!("activity item {item_id} uses unit '{uom}' instead of %")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightAudit {
    pub project_id: ProjectId,
    pub warnings: Vec<WeightWarning>,
}

impl WeightAudit {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// A delegated project together with the item it scores for.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChildProjectView {
    pub child_id: ProjectId,
    pub child_name: String,
    pub department: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub parent_item_id: Option<ItemId>,
    pub parent_item_name: Option<String>,
    pub parent_project_id: Option<ProjectId>,
    pub parent_project_name: Option<String>,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub period: Period,
    pub score: Option<f64>,
}

pub fn project_status<S>(
    engine: &ScoringEngine<'_, S>,
    project: &Project,
    reference: NaiveDate,
) -> Result<ProjectStatus, ScoreError>
where
    S: ScoringSource + ?Sized,
{
    if reference < project.start_date {
        return Ok(ProjectStatus::NotStarted);
    }
    if reference <= project.end_date {
        return Ok(ProjectStatus::InProgress);
    }

    let score = engine.project_score(project.id, WindowRequest::unbounded())?;
    if score >= 1.0 {
        Ok(ProjectStatus::Done)
    } else {
        Ok(ProjectStatus::Overdue)
    }
}

/// Build the monthly resume for the month containing `month`.
pub fn project_resume<S>(
    engine: &ScoringEngine<'_, S>,
    project: &Project,
    month: NaiveDate,
) -> Result<ProjectResume, ScoreError>
where
    S: ScoringSource + ?Sized,
{
    let month_start = first_of_month(month);
    let month_end = last_day_of_month(month);
    let month_window = WindowRequest::between(month_start, month_end);

    let monthly_score = engine.project_score(project.id, month_window)?;
    let cumulative_score = engine.project_score(
        project.id,
        WindowRequest::between(project.start_date, month_end),
    )?;
    let baseline = engine
        .group_kind_score(project.id, GroupKind::Success, month_window)?
        .filter(|score| *score > 0.0);

    Ok(ProjectResume {
        project_id: project.id,
        project_name: project.name.clone(),
        is_child: project.parent_item_id.is_some(),
        month_start,
        month_end,
        baseline: baseline.unwrap_or(1.0),
        monthly: achievement(monthly_score, baseline),
        up_to_month: achievement(cumulative_score, baseline),
    })
}

fn achievement(score: f64, baseline: Option<f64>) -> Achievement {
    let ratio = match baseline {
        Some(baseline) => score / baseline,
        None => score,
    };
    Achievement {
        score,
        ratio,
        status: AchievementStatus::from_ratio(Some(ratio)),
    }
}

pub fn weight_audit<S>(source: &S, project: ProjectId) -> Result<WeightAudit, ScoreError>
where
    S: ScoringSource + ?Sized,
{
    let mut warnings = Vec::new();
    let groups = source.groups_of_project(project)?;
    if groups.is_empty() {
        warnings.push(WeightWarning::ProjectHasNoGroups);
    } else {
        let total: f64 = groups.iter().map(|group| group.weight).sum();
        if (total - EXPECTED_WEIGHT_TOTAL).abs() > WEIGHT_EPSILON {
            warnings.push(WeightWarning::GroupWeightsOffTotal { total });
        }
    }

    for group in &groups {
        let items = source.items_of_group(group.id)?;
        if items.is_empty() {
            warnings.push(WeightWarning::GroupHasNoItems { group_id: group.id });
            continue;
        }
        let total: f64 = items.iter().map(|item| item.weight).sum();
        if (total - EXPECTED_WEIGHT_TOTAL).abs() > WEIGHT_EPSILON {
            warnings.push(WeightWarning::ItemWeightsOffTotal {
                group_id: group.id,
                total,
            });
        }
        if group.kind == GroupKind::Activity {
            for item in items.iter().filter(|item| item.uom.trim() != "%") {
                warnings.push(WeightWarning::ActivityUomNotPercent {
                    item_id: item.id,
                    uom: item.uom.clone(),
                });
            }
        }
    }

    if !warnings.is_empty() {
        warn!(project = %project, findings = warnings.len(), "charter weights need attention");
    }

    Ok(WeightAudit {
        project_id: project,
        warnings,
    })
}

/// Every delegated project with its parent item and project, newest id first.
pub fn child_projects<S>(
    engine: &ScoringEngine<'_, S>,
) -> Result<Vec<ChildProjectView>, ScoreError>
where
    S: ScoringSource + ?Sized,
{
    let source = engine.source();
    let mut children = source.child_projects()?;
    children.sort_by(|a, b| b.id.cmp(&a.id));

    let mut views = Vec::with_capacity(children.len());
    for child in children {
        let parent_item = match child.parent_item_id {
            Some(item) => source.item(item)?,
            None => None,
        };
        let parent_project = match &parent_item {
            Some(item) => source.project_of_item(item.id)?,
            None => None,
        };
        let score = engine.project_score(child.id, WindowRequest::unbounded())?;

        views.push(ChildProjectView {
            child_id: child.id,
            child_name: child.name,
            department: child.department,
            start_date: child.start_date,
            end_date: child.end_date,
            parent_item_id: parent_item.as_ref().map(|item| item.id),
            parent_item_name: parent_item.map(|item| item.name),
            parent_project_id: parent_project.as_ref().map(|project| project.id),
            parent_project_name: parent_project.map(|project| project.name),
            score,
        });
    }
    Ok(views)
}

/// Per-period scores across an item's own range, bucketed by its period type.
pub fn item_series<S>(
    engine: &ScoringEngine<'_, S>,
    item: ItemId,
) -> Result<Vec<SeriesPoint>, ScoreError>
where
    S: ScoringSource + ?Sized,
{
    let Some(found) = engine.source().item(item)? else {
        return Ok(Vec::new());
    };
    let (Some(start), Some(end)) = (found.start_date, found.end_date) else {
        return Ok(Vec::new());
    };

    period::generate(start, end, found.period_type)
        .into_iter()
        .map(|period| {
            let score = engine.item_score(item, WindowRequest::between(period.start, period.end))?;
            Ok(SeriesPoint { period, score })
        })
        .collect()
}
