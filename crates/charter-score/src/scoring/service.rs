use std::sync::Arc;

use chrono::{Local, NaiveDate};
use serde::Serialize;
use tracing::debug;

use super::domain::{EntityRef, ItemId, Project, ProjectId, WindowRequest};
use super::engine::{ScoreError, ScoringContext, ScoringEngine};
use super::report::{
    self, ChildProjectView, ProjectResume, ProjectStatus, SeriesPoint, WeightAudit,
};
use super::repository::{ScoringSource, SnapshotProvider};
use crate::config::ScoringConfig;

/// Result of the generic score query. `score` is `None` when an item has no evidence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreView {
    pub entity: EntityRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_start: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_end: Option<NaiveDate>,
    pub score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectStatusView {
    pub project_id: ProjectId,
    pub reference: NaiveDate,
    pub status: ProjectStatus,
    pub status_label: &'static str,
}

/// Service composing a snapshot provider with the scoring configuration. Each call reads
/// one snapshot, so concurrent edits never leak into a computation halfway through.
pub struct ScoringService<P> {
    store: Arc<P>,
    config: ScoringConfig,
    today: Option<NaiveDate>,
}

impl<P> ScoringService<P>
where
    P: SnapshotProvider + 'static,
{
    pub fn new(store: Arc<P>, config: ScoringConfig) -> Self {
        Self {
            store,
            config,
            today: None,
        }
    }

    /// Pin "today" instead of reading the local clock.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn store(&self) -> &Arc<P> {
        &self.store
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn context(&self) -> ScoringContext {
        let today = self.today.unwrap_or_else(|| Local::now().date_naive());
        ScoringContext::from_config(&self.config, today)
    }

    pub fn score(
        &self,
        entity: EntityRef,
        window: WindowRequest,
    ) -> Result<ScoreView, ScoreError> {
        let snapshot = self.store.snapshot()?;
        ensure_exists(&snapshot, entity)?;

        let context = self.context();
        let engine = ScoringEngine::new(&snapshot, &context);
        let score = engine.score(entity, window)?;
        debug!(%entity, ?window, ?score, "scored entity");

        Ok(ScoreView {
            entity,
            window_start: window.start,
            window_end: window.end,
            score,
        })
    }

    pub fn project_resume(
        &self,
        project: ProjectId,
        month: NaiveDate,
    ) -> Result<ProjectResume, ScoreError> {
        let snapshot = self.store.snapshot()?;
        let project = require_project(&snapshot, project)?;
        let context = self.context();
        report::project_resume(&ScoringEngine::new(&snapshot, &context), &project, month)
    }

    pub fn project_status(
        &self,
        project: ProjectId,
        reference: Option<NaiveDate>,
    ) -> Result<ProjectStatusView, ScoreError> {
        let snapshot = self.store.snapshot()?;
        let project = require_project(&snapshot, project)?;
        let context = self.context();
        let reference = reference.unwrap_or(context.today);
        let status =
            report::project_status(&ScoringEngine::new(&snapshot, &context), &project, reference)?;

        Ok(ProjectStatusView {
            project_id: project.id,
            reference,
            status,
            status_label: status.label(),
        })
    }

    pub fn weight_audit(&self, project: ProjectId) -> Result<WeightAudit, ScoreError> {
        let snapshot = self.store.snapshot()?;
        require_project(&snapshot, project)?;
        report::weight_audit(&snapshot, project)
    }

    pub fn child_projects(&self) -> Result<Vec<ChildProjectView>, ScoreError> {
        let snapshot = self.store.snapshot()?;
        let context = self.context();
        report::child_projects(&ScoringEngine::new(&snapshot, &context))
    }

    pub fn item_series(&self, item: ItemId) -> Result<Vec<SeriesPoint>, ScoreError> {
        let snapshot = self.store.snapshot()?;
        ensure_exists(&snapshot, EntityRef::Item(item))?;
        let context = self.context();
        report::item_series(&ScoringEngine::new(&snapshot, &context), item)
    }

    pub fn projects(&self) -> Result<Vec<Project>, ScoreError> {
        Ok(self.store.snapshot()?.projects()?)
    }
}

fn ensure_exists<S: ScoringSource>(source: &S, entity: EntityRef) -> Result<(), ScoreError> {
    let found = match entity {
        EntityRef::Item(id) => source.item(id)?.is_some(),
        EntityRef::Group(id) => source.group(id)?.is_some(),
        EntityRef::Project(id) => source.project(id)?.is_some(),
    };
    if found {
        Ok(())
    } else {
        Err(ScoreError::NotFound(entity))
    }
}

fn require_project<S: ScoringSource>(source: &S, id: ProjectId) -> Result<Project, ScoreError> {
    source
        .project(id)?
        .ok_or(ScoreError::NotFound(EntityRef::Project(id)))
}
