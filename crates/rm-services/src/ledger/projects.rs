//! Project ledger service
//!
//! Member counts are derived from active assignments per query. Closed is
//! terminal: update refuses to move a project out of it, and delete is
//! guarded by the active member count.

use std::collections::HashMap;
use std::sync::Arc;

use rm_core::error::{RmError, ValidationErrors};
use rm_core::result::RmResult;
use rm_core::traits::Id;
use rm_models::{Assignment, CreateProjectDto, Project, UpdateProjectDto};
use tracing::info;
use validator::Validate;

use crate::store::LedgerStore;

/// A project with its derived member count
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectView {
    #[serde(flatten)]
    pub project: Project,
    pub member_count: usize,
}

/// One project member row: the assignment plus the resource's display name
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectResourceView {
    #[serde(flatten)]
    pub assignment: Assignment,
    pub resource_name: String,
}

pub struct ProjectLedger {
    store: Arc<dyn LedgerStore>,
}

impl ProjectLedger {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> RmResult<Vec<ProjectView>> {
        let projects = self.store.projects().await?;
        let assignments = self.store.assignments().await?;

        let mut by_project: HashMap<Id, Vec<Assignment>> = HashMap::new();
        for assignment in assignments {
            by_project
                .entry(assignment.project_id)
                .or_default()
                .push(assignment);
        }
        let empty: Vec<Assignment> = Vec::new();

        Ok(projects
            .into_iter()
            .map(|project| {
                let own = project
                    .id
                    .and_then(|id| by_project.get(&id))
                    .unwrap_or(&empty);
                ProjectView {
                    member_count: super::member_count(own),
                    project,
                }
            })
            .collect())
    }

    pub async fn get(&self, id: Id) -> RmResult<ProjectView> {
        let project = self.store.project(id).await?;
        let assignments = self.store.assignments_for_project(id).await?;
        Ok(ProjectView {
            member_count: super::member_count(&assignments),
            project,
        })
    }

    pub async fn create(&self, dto: CreateProjectDto) -> RmResult<Project> {
        if let Err(errors) = dto.validate() {
            return Err(RmError::Validation(ValidationErrors::from_validator(&errors)));
        }
        // The owning manager must exist.
        self.store.user(dto.manager_id).await?;
        let project = self.store.insert_project(dto.into()).await?;
        info!(project_id = ?project.id, "created project");
        Ok(project)
    }

    pub async fn update(&self, id: Id, dto: UpdateProjectDto) -> RmResult<Project> {
        let mut project = self.store.project(id).await?;

        if let Some(next) = dto.status {
            if !project.status.can_transition_to(next) {
                return Err(RmError::state_conflict(format!(
                    "project {} is CLOSED and cannot move to {}",
                    id,
                    next.as_str()
                )));
            }
        }
        if let Some(manager_id) = dto.manager_id {
            self.store.user(manager_id).await?;
        }

        dto.apply_to(&mut project);
        if let Err(errors) = project.validate() {
            return Err(RmError::Validation(ValidationErrors::from_validator(&errors)));
        }
        self.store.update_project(project).await
    }

    pub async fn delete(&self, id: Id) -> RmResult<()> {
        let assignments = self.store.assignments_for_project(id).await?;
        if super::member_count(&assignments) > 0 {
            return Err(RmError::capacity_conflict(
                "cannot delete a project with active assignments",
            ));
        }
        self.store.delete_project(id).await?;
        info!(project_id = id, "deleted project");
        Ok(())
    }

    /// The assignment roster for a project, joined with resource names.
    pub async fn resources(&self, project_id: Id) -> RmResult<Vec<ProjectResourceView>> {
        self.store.project(project_id).await?;
        let assignments = self.store.assignments_for_project(project_id).await?;
        let resources = self.store.resources().await?;
        let names: HashMap<Id, String> = resources
            .into_iter()
            .filter_map(|r| r.id.map(|id| (id, r.name)))
            .collect();

        Ok(assignments
            .into_iter()
            .map(|assignment| {
                let resource_name = names
                    .get(&assignment.resource_id)
                    .cloned()
                    .unwrap_or_default();
                ProjectResourceView {
                    assignment,
                    resource_name,
                }
            })
            .collect())
    }
}
