use super::domain::{
    Group, GroupId, Item, ItemId, PeriodicTarget, Project, ProjectId, Realization, Window,
};

/// Read-only view over charter data that the engine scores against.
///
/// Every method reads from the same state for the lifetime of the value, so one engine
/// call never mixes data from before and after a concurrent edit.
pub trait ScoringSource {
    fn project(&self, id: ProjectId) -> Result<Option<Project>, RepositoryError>;
    fn projects(&self) -> Result<Vec<Project>, RepositoryError>;
    fn group(&self, id: GroupId) -> Result<Option<Group>, RepositoryError>;
    fn item(&self, id: ItemId) -> Result<Option<Item>, RepositoryError>;
    fn groups_of_project(&self, id: ProjectId) -> Result<Vec<Group>, RepositoryError>;
    fn items_of_group(&self, id: GroupId) -> Result<Vec<Item>, RepositoryError>;
    fn targets_overlapping(
        &self,
        id: ItemId,
        window: Window,
    ) -> Result<Vec<PeriodicTarget>, RepositoryError>;
    /// Realizations dated inside `window`, ordered by `(date, recorded_at)`.
    fn realizations_in_window(
        &self,
        id: ItemId,
        window: Window,
    ) -> Result<Vec<Realization>, RepositoryError>;
    /// The project whose score replaces this item's own score, if any.
    fn child_project_of(&self, id: ItemId) -> Result<Option<Project>, RepositoryError>;

    fn child_projects(&self) -> Result<Vec<Project>, RepositoryError> {
        Ok(self
            .projects()?
            .into_iter()
            .filter(|project| project.parent_item_id.is_some())
            .collect())
    }

    /// Project owning the group that owns `id`.
    fn project_of_item(&self, id: ItemId) -> Result<Option<Project>, RepositoryError> {
        let Some(item) = self.item(id)? else {
            return Ok(None);
        };
        let Some(group) = self.group(item.group_id)? else {
            return Ok(None);
        };
        self.project(group.project_id)
    }
}

/// Hands out consistent snapshots so the scoring service can be exercised in isolation.
pub trait SnapshotProvider: Send + Sync {
    type Snapshot: ScoringSource;

    fn snapshot(&self) -> Result<Self::Snapshot, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0} already exists")]
    Conflict(String),
    #[error("item {item} is the parent of child project {child}; delete the child project first")]
    LinkedChildProject { item: ItemId, child: ProjectId },
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
