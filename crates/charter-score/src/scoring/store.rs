use std::io::{Read, Write};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::domain::{
    Group, GroupId, Item, ItemId, PeriodicTarget, Project, ProjectId, Realization, Window,
};
use super::repository::{RepositoryError, ScoringSource, SnapshotProvider};

/// Every persisted charter entity, serializable as a single JSON document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CharterData {
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub groups: Vec<Group>,
    #[serde(default)]
    pub items: Vec<Item>,
    #[serde(default)]
    pub targets: Vec<PeriodicTarget>,
    #[serde(default)]
    pub realizations: Vec<Realization>,
}

impl ScoringSource for CharterData {
    fn project(&self, id: ProjectId) -> Result<Option<Project>, RepositoryError> {
        Ok(self.projects.iter().find(|project| project.id == id).cloned())
    }

    fn projects(&self) -> Result<Vec<Project>, RepositoryError> {
        Ok(self.projects.clone())
    }

    fn group(&self, id: GroupId) -> Result<Option<Group>, RepositoryError> {
        Ok(self.groups.iter().find(|group| group.id == id).cloned())
    }

    fn item(&self, id: ItemId) -> Result<Option<Item>, RepositoryError> {
        Ok(self.items.iter().find(|item| item.id == id).cloned())
    }

    fn groups_of_project(&self, id: ProjectId) -> Result<Vec<Group>, RepositoryError> {
        Ok(self
            .groups
            .iter()
            .filter(|group| group.project_id == id)
            .cloned()
            .collect())
    }

    fn items_of_group(&self, id: GroupId) -> Result<Vec<Item>, RepositoryError> {
        Ok(self
            .items
            .iter()
            .filter(|item| item.group_id == id)
            .cloned()
            .collect())
    }

    fn targets_overlapping(
        &self,
        id: ItemId,
        window: Window,
    ) -> Result<Vec<PeriodicTarget>, RepositoryError> {
        Ok(self
            .targets
            .iter()
            .filter(|target| target.item_id == id && target.overlaps(&window))
            .cloned()
            .collect())
    }

    fn realizations_in_window(
        &self,
        id: ItemId,
        window: Window,
    ) -> Result<Vec<Realization>, RepositoryError> {
        let mut rows: Vec<Realization> = self
            .realizations
            .iter()
            .filter(|row| row.item_id == id && window.contains(row.date))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            (a.date, a.recorded_at, a.id).cmp(&(b.date, b.recorded_at, b.id))
        });
        Ok(rows)
    }

    fn child_project_of(&self, id: ItemId) -> Result<Option<Project>, RepositoryError> {
        Ok(self
            .projects
            .iter()
            .find(|project| project.parent_item_id == Some(id))
            .cloned())
    }
}

/// Immutable view handed to one scoring call.
#[derive(Debug, Clone)]
pub struct CharterSnapshot(Arc<CharterData>);

impl CharterSnapshot {
    pub fn data(&self) -> &CharterData {
        &self.0
    }
}

impl ScoringSource for CharterSnapshot {
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
        id: ItemId,
        window: Window,
    ) -> Result<Vec<Realization>, RepositoryError> {
        self.0.realizations_in_window(id, window)
    }

    fn child_project_of(&self, id: ItemId) -> Result<Option<Project>, RepositoryError> {
        self.0.child_project_of(id)
    }
}

/// Copy-on-write store: readers take an `Arc` of the current state, writers replace it.
#[derive(Debug, Default)]
pub struct InMemoryScoringStore {
    data: RwLock<Arc<CharterData>>,
}

impl InMemoryScoringStore {
    pub fn new(data: CharterData) -> Self {
        Self {
            data: RwLock::new(Arc::new(data)),
        }
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, serde_json::Error> {
        let data: CharterData = serde_json::from_reader(reader)?;
        debug!(
            projects = data.projects.len(),
            items = data.items.len(),
            realizations = data.realizations.len(),
            "loaded charter snapshot"
        );
        Ok(Self::new(data))
    }

    pub fn to_writer<W: Write>(&self, writer: W) -> Result<(), RepositoryError> {
        let snapshot = self.snapshot()?;
        serde_json::to_writer_pretty(writer, snapshot.data())
            .map_err(|err| RepositoryError::Unavailable(err.to_string()))
    }

    pub fn add_project(&self, project: Project) -> Result<Project, RepositoryError> {
        self.mutate(|data| {
            if data.projects.iter().any(|existing| existing.id == project.id) {
                return Err(RepositoryError::Conflict(format!("project {}", project.id)));
            }
            if let Some(item) = project.parent_item_id {
                ensure_unlinked(data, item)?;
            }
            data.projects.push(project.clone());
            Ok(project)
        })
    }

    pub fn add_group(&self, group: Group) -> Result<Group, RepositoryError> {
        self.mutate(|data| {
            if data.groups.iter().any(|existing| existing.id == group.id) {
                return Err(RepositoryError::Conflict(format!("group {}", group.id)));
            }
            if data.project(group.project_id)?.is_none() {
                return Err(RepositoryError::NotFound(format!(
                    "project {}",
                    group.project_id
                )));
            }
            data.groups.push(group.clone());
            Ok(group)
        })
    }

    pub fn add_item(&self, item: Item) -> Result<Item, RepositoryError> {
        self.mutate(|data| {
            if data.items.iter().any(|existing| existing.id == item.id) {
                return Err(RepositoryError::Conflict(format!("item {}", item.id)));
            }
            if data.group(item.group_id)?.is_none() {
                return Err(RepositoryError::NotFound(format!("group {}", item.group_id)));
            }
            data.items.push(item.clone());
            Ok(item)
        })
    }

    pub fn add_target(&self, target: PeriodicTarget) -> Result<PeriodicTarget, RepositoryError> {
        self.mutate(|data| {
            if data.targets.iter().any(|existing| existing.id == target.id) {
                return Err(RepositoryError::Conflict(format!("target {}", target.id)));
            }
            if data.item(target.item_id)?.is_none() {
                return Err(RepositoryError::NotFound(format!("item {}", target.item_id)));
            }
            data.targets.push(target.clone());
            Ok(target)
        })
    }

    pub fn record_realization(
        &self,
        realization: Realization,
    ) -> Result<Realization, RepositoryError> {
        self.mutate(|data| {
            if data
                .realizations
                .iter()
                .any(|existing| existing.id == realization.id)
            {
                return Err(RepositoryError::Conflict(format!(
                    "realization {}",
                    realization.id
                )));
            }
            if data.item(realization.item_id)?.is_none() {
                return Err(RepositoryError::NotFound(format!(
                    "item {}",
                    realization.item_id
                )));
            }
            data.realizations.push(realization.clone());
            Ok(realization)
        })
    }

    /// Make `child` the subtree that scores on behalf of `item`.
    pub fn link_child_project(&self, child: ProjectId, item: ItemId) -> Result<(), RepositoryError> {
        self.mutate(|data| {
            if data.item(item)?.is_none() {
                return Err(RepositoryError::NotFound(format!("item {item}")));
            }
            if let Some(existing) = data.child_project_of(item)? {
                if existing.id != child {
                    return Err(RepositoryError::LinkedChildProject {
                        item,
                        child: existing.id,
                    });
                }
            }
            let project = data
                .projects
                .iter_mut()
                .find(|project| project.id == child)
                .ok_or_else(|| RepositoryError::NotFound(format!("project {child}")))?;
            project.parent_item_id = Some(item);
            Ok(())
        })
    }

    /// Remove an item with its targets and realizations. Fails while a child project still
    /// points at the item.
    pub fn delete_item(&self, id: ItemId) -> Result<(), RepositoryError> {
        self.mutate(|data| {
            if data.item(id)?.is_none() {
                return Err(RepositoryError::NotFound(format!("item {id}")));
            }
            ensure_unlinked(data, id)?;
            remove_items(data, &[id]);
            Ok(())
        })
    }

    /// Remove a project and everything it owns. Fails while any of its items is the parent
    /// of a child project.
    pub fn delete_project(&self, id: ProjectId) -> Result<(), RepositoryError> {
        self.mutate(|data| {
            if data.project(id)?.is_none() {
                return Err(RepositoryError::NotFound(format!("project {id}")));
            }
            let group_ids: Vec<GroupId> = data
                .groups_of_project(id)?
                .into_iter()
                .map(|group| group.id)
                .collect();
            let item_ids: Vec<ItemId> = data
                .items
                .iter()
                .filter(|item| group_ids.contains(&item.group_id))
                .map(|item| item.id)
                .collect();
            for item in &item_ids {
                if let Some(child) = data.child_project_of(*item)? {
                    if child.id != id {
                        return Err(RepositoryError::LinkedChildProject {
                            item: *item,
                            child: child.id,
                        });
                    }
                }
            }

            remove_items(data, &item_ids);
            data.groups.retain(|group| group.project_id != id);
            data.projects.retain(|project| project.id != id);
            Ok(())
        })
    }

    fn mutate<T, F>(&self, apply: F) -> Result<T, RepositoryError>
    where
        F: FnOnce(&mut CharterData) -> Result<T, RepositoryError>,
    {
        let mut guard = self
            .data
            .write()
            .map_err(|_| RepositoryError::Unavailable("charter store lock poisoned".to_string()))?;
        let mut draft = CharterData::clone(&guard);
        let result = apply(&mut draft)?;
        *guard = Arc::new(draft);
        Ok(result)
    }
}

impl SnapshotProvider for InMemoryScoringStore {
    type Snapshot = CharterSnapshot;

    fn snapshot(&self) -> Result<CharterSnapshot, RepositoryError> {
        let guard = self
            .data
            .read()
            .map_err(|_| RepositoryError::Unavailable("charter store lock poisoned".to_string()))?;
        Ok(CharterSnapshot(Arc::clone(&guard)))
    }
}

fn ensure_unlinked(data: &CharterData, item: ItemId) -> Result<(), RepositoryError> {
    match data.child_project_of(item)? {
        Some(child) => Err(RepositoryError::LinkedChildProject {
            item,
            child: child.id,
        }),
        None => Ok(()),
    }
}

fn remove_items(data: &mut CharterData, ids: &[ItemId]) {
    data.targets.retain(|target| !ids.contains(&target.item_id));
    data.realizations
        .retain(|realization| !ids.contains(&realization.item_id));
    data.items.retain(|item| !ids.contains(&item.id));
}
