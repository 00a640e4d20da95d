//! Resource ledger service
//!
//! CRUD plus the filtered listing used by the resource search page. Status
//! is derived per query via [`super::resource_status`].

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use rm_core::error::{RmError, ValidationErrors};
use rm_core::result::RmResult;
use rm_core::traits::Id;
use rm_models::{Assignment, CreateResourceDto, Resource, ResourceStatus, UpdateResourceDto};
use tracing::info;
use validator::Validate;

use crate::store::LedgerStore;

/// Filters for the resource listing
#[derive(Debug, Clone, Default)]
pub struct ResourceFilters {
    pub status: Option<ResourceStatus>,
    pub role: Option<String>,
    /// Date the status/role filters are evaluated against; defaults to today
    pub as_of: Option<NaiveDate>,
    /// Case-insensitive substring over name, email, and employee code
    pub search: Option<String>,
}

/// A resource with its derived status
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceView {
    #[serde(flatten)]
    pub resource: Resource,
    pub status: ResourceStatus,
}

pub struct ResourceLedger {
    store: Arc<dyn LedgerStore>,
}

impl ResourceLedger {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    pub async fn list(
        &self,
        filters: &ResourceFilters,
        today: NaiveDate,
    ) -> RmResult<Vec<ResourceView>> {
        let as_of = filters.as_of.unwrap_or(today);
        let resources = self.store.resources().await?;
        let assignments = self.store.assignments().await?;

        let mut by_resource: HashMap<Id, Vec<Assignment>> = HashMap::new();
        for assignment in assignments {
            by_resource
                .entry(assignment.resource_id)
                .or_default()
                .push(assignment);
        }
        let empty: Vec<Assignment> = Vec::new();

        let mut views = Vec::new();
        for resource in resources {
            let id = match resource.id {
                Some(id) => id,
                None => continue,
            };
            let own = by_resource.get(&id).unwrap_or(&empty);
            let status = super::resource_status(own, as_of);

            if let Some(wanted) = filters.status {
                if status != wanted {
                    continue;
                }
            }
            if let Some(ref role) = filters.role {
                if !super::matches_role(own, role, Some(as_of)) {
                    continue;
                }
            }
            if let Some(ref term) = filters.search {
                let term = term.to_lowercase();
                let haystack = format!(
                    "{} {} {}",
                    resource.name.to_lowercase(),
                    resource.email.to_lowercase(),
                    resource.employee_code.to_lowercase()
                );
                if !haystack.contains(&term) {
                    continue;
                }
            }

            views.push(ResourceView { resource, status });
        }

        Ok(views)
    }

    pub async fn get(&self, id: Id, today: NaiveDate) -> RmResult<ResourceView> {
        let resource = self.store.resource(id).await?;
        let assignments = self.store.assignments_for_resource(id).await?;
        Ok(ResourceView {
            resource,
            status: super::resource_status(&assignments, today),
        })
    }

    pub async fn create(&self, dto: CreateResourceDto) -> RmResult<Resource> {
        if let Err(errors) = dto.validate() {
            return Err(RmError::Validation(ValidationErrors::from_validator(&errors)));
        }
        if self.store.resource_email_exists(&dto.email).await? {
            return Err(RmError::state_conflict(format!(
                "email {} already exists",
                dto.email
            )));
        }

        let sequence = self.store.resource_count().await? + 1;
        let employee_code = Resource::employee_code_for(sequence);
        let resource = self
            .store
            .insert_resource(Resource::new(dto.name, employee_code, dto.email))
            .await?;
        info!(resource_id = ?resource.id, "created resource");
        Ok(resource)
    }

    pub async fn update(&self, id: Id, dto: UpdateResourceDto) -> RmResult<Resource> {
        let mut resource = self.store.resource(id).await?;
        dto.apply_to(&mut resource);
        if let Err(errors) = resource.validate() {
            return Err(RmError::Validation(ValidationErrors::from_validator(&errors)));
        }
        self.store.update_resource(resource).await
    }

    /// Delete refused while any assignment is still active; otherwise the
    /// resource and its dependent rows go together.
    pub async fn delete(&self, id: Id) -> RmResult<()> {
        let assignments = self.store.assignments_for_resource(id).await?;
        if assignments.iter().any(|a| a.is_active()) {
            return Err(RmError::capacity_conflict(
                "cannot delete a resource with active assignments; release them first",
            ));
        }
        self.store.delete_resource(id).await?;
        info!(resource_id = id, "deleted resource");
        Ok(())
    }

    pub async fn assignments(&self, resource_id: Id) -> RmResult<Vec<Assignment>> {
        // Surface a 404 for unknown resources rather than an empty list.
        self.store.resource(resource_id).await?;
        self.store.assignments_for_resource(resource_id).await
    }
}
