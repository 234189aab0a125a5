use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};

use crate::config::ScoringConfig;
use crate::scoring::domain::{
    Group, GroupId, GroupKind, Item, ItemId, PeriodType, PeriodicTarget, Polarity, Project,
    ProjectId, Realization, RealizationId, Rollup, TargetId, Window,
};
use crate::scoring::engine::ScoringContext;
use crate::scoring::repository::{RepositoryError, ScoringSource, SnapshotProvider};
use crate::scoring::service::ScoringService;
use crate::scoring::store::{CharterData, InMemoryScoringStore};

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn at(year: i32, month: u32, day: u32, hour: u32) -> NaiveDateTime {
    date(year, month, day)
        .and_hms_opt(hour, 0, 0)
        .expect("valid time")
}

pub(super) fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

pub(super) fn today() -> NaiveDate {
    date(2024, 12, 31)
}

/// Context without timeline discounting so rollup arithmetic is easy to follow.
pub(super) fn flat_context() -> ScoringContext {
    ScoringContext::new(today()).with_timeline_weighting(false)
}

pub(super) fn flat_config() -> ScoringConfig {
    ScoringConfig {
        timeline_weighting: false,
        ..ScoringConfig::default()
    }
}

/// Fluent fixture for charter data with sequential ids.
#[derive(Default)]
pub(super) struct Charter {
    pub(super) data: CharterData,
}

impl Charter {
    pub(super) fn project(&mut self, name: &str) -> ProjectId {
        let id = ProjectId(self.data.projects.len() as u64 + 1);
        self.data.projects.push(Project {
            id,
            name: name.to_string(),
            department: "Operations".to_string(),
            responsible: "Charter owner".to_string(),
            start_date: date(2024, 1, 1),
            end_date: date(2024, 12, 31),
            parent_item_id: None,
        });
        id
    }

    pub(super) fn group(&mut self, project: ProjectId, kind: GroupKind, weight: f64) -> GroupId {
        let id = GroupId(self.data.groups.len() as u64 + 1);
        self.data.groups.push(Group {
            id,
            project_id: project,
            kind,
            weight,
        });
        id
    }

    pub(super) fn item(
        &mut self,
        group: GroupId,
        weight: f64,
        polarity: Polarity,
        rollup: Rollup,
    ) -> ItemId {
        let id = ItemId(self.data.items.len() as u64 + 1);
        self.data.items.push(Item {
            id,
            group_id: group,
            name: format!("Item {}", id.0),
            weight,
            uom: "%".to_string(),
            polarity,
            period_type: PeriodType::Monthly,
            rollup,
            start_date: Some(date(2024, 1, 1)),
            end_date: Some(date(2024, 12, 31)),
        });
        id
    }

    pub(super) fn item_dates(&mut self, item: ItemId, start: NaiveDate, end: NaiveDate) {
        if let Some(found) = self.data.items.iter_mut().find(|found| found.id == item) {
            found.start_date = Some(start);
            found.end_date = Some(end);
        }
    }

    pub(super) fn target(&mut self, item: ItemId, start: NaiveDate, end: NaiveDate, value: f64) {
        let id = TargetId(self.data.targets.len() as u64 + 1);
        self.data.targets.push(PeriodicTarget {
            id,
            item_id: item,
            period_start: start,
            period_end: end,
            target_value: value,
        });
    }

    pub(super) fn realize(&mut self, item: ItemId, on: NaiveDate, value: f64) {
        self.realize_at(item, on, value, None);
    }

    pub(super) fn realize_at(
        &mut self,
        item: ItemId,
        on: NaiveDate,
        value: f64,
        recorded_at: Option<NaiveDateTime>,
    ) {
        let id = RealizationId(self.data.realizations.len() as u64 + 1);
        self.data.realizations.push(Realization {
            id,
            item_id: item,
            date: on,
            value,
            recorded_at,
        });
    }

    pub(super) fn delegate(&mut self, item: ItemId, child: ProjectId) {
        if let Some(project) = self.data.projects.iter_mut().find(|p| p.id == child) {
            project.parent_item_id = Some(item);
        }
    }

    pub(super) fn into_store(self) -> Arc<InMemoryScoringStore> {
        Arc::new(InMemoryScoringStore::new(self.data))
    }
}

/// Single project, single ACTIVITY group, one MAX item with a January target of 100 and
/// realizations of 40 and 35.
pub(super) fn january_charter(rollup: Rollup) -> (Charter, ProjectId, ItemId) {
    let mut charter = Charter::default();
    let project = charter.project("Network rollout");
    let group = charter.group(project, GroupKind::Activity, 100.0);
    let item = charter.item(group, 100.0, Polarity::Max, rollup);
    charter.target(item, date(2024, 1, 1), date(2024, 1, 31), 100.0);
    charter.realize(item, date(2024, 1, 10), 40.0);
    charter.realize(item, date(2024, 1, 20), 35.0);
    (charter, project, item)
}

pub(super) fn january() -> crate::scoring::domain::WindowRequest {
    crate::scoring::domain::WindowRequest::between(date(2024, 1, 1), date(2024, 1, 31))
}

pub(super) fn flat_service(charter: Charter) -> ScoringService<InMemoryScoringStore> {
    ScoringService::new(charter.into_store(), flat_config()).with_today(today())
}

/// Provider whose storage is always offline.
pub(super) struct OfflineStore;

impl SnapshotProvider for OfflineStore {
    type Snapshot = CharterData;

    fn snapshot(&self) -> Result<CharterData, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

/// Source that serves structure but fails when realizations are read.
pub(super) struct FlakyRealizations(pub(super) CharterData);

impl ScoringSource for FlakyRealizations {
    fn project(&self, id: ProjectId) -> Result<Option<Project>, RepositoryError> {
        self.0.project(id)
    }

    fn projects(&self) -> Result<Vec<Project>, RepositoryError> {
        self.0.projects()
    }

    fn group(&self, id: GroupId) -> Result<Option<Group>, RepositoryError> {
        self.0.group(id)
    }

    fn item(&self, id: ItemId) -> Result<Option<Item>, RepositoryError> {
        self.0.item(id)
    }

    fn groups_of_project(&self, id: ProjectId) -> Result<Vec<Group>, RepositoryError> {
        self.0.groups_of_project(id)
    }

    fn items_of_group(&self, id: GroupId) -> Result<Vec<Item>, RepositoryError> {
        self.0.items_of_group(id)
    }

    fn targets_overlapping(
        &self,
        id: ItemId,
        window: Window,
    ) -> Result<Vec<PeriodicTarget>, RepositoryError> {
        self.0.targets_overlapping(id, window)
    }

    fn realizations_in_window(
        &self,
        _id: ItemId,
        _window: Window,
    ) -> Result<Vec<Realization>, RepositoryError> {
        Err(RepositoryError::Unavailable("realization table locked".to_string()))
    }

    fn child_project_of(&self, id: ItemId) -> Result<Option<Project>, RepositoryError> {
        self.0.child_project_of(id)
    }
}

pub(super) async fn read_json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
