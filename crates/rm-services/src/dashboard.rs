//! Dashboard reads
//!
//! Derived-per-query aggregates for the landing pages: headline counters
//! and assignments ending within the next N days. Managers see their own
//! projects; administrators see everything.

use std::sync::Arc;

use chrono::NaiveDate;
use rm_core::result::RmResult;
use rm_core::traits::{AuthContext, Id};
use rm_models::{ProjectStatus, RequestFilter, RequestStatus};
use serde::Serialize;

use crate::ledger;
use crate::store::LedgerStore;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_resources: usize,
    pub available_resources: usize,
    pub active_projects: usize,
    pub pending_requests: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndingSoon {
    pub assignment_id: Option<Id>,
    pub resource_name: String,
    pub project_name: String,
    pub role: String,
    pub end_date: NaiveDate,
    pub days_left: i64,
}

pub struct DashboardService {
    store: Arc<dyn LedgerStore>,
}

impl DashboardService {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    pub async fn stats(&self, caller: &dyn AuthContext, today: NaiveDate) -> RmResult<DashboardStats> {
        let resources = self.store.resources().await?;
        let assignments = self.store.assignments().await?;
        let projects = self.store.projects().await?;

        let available_resources = resources
            .iter()
            .filter_map(|r| r.id)
            .filter(|id| {
                let own: Vec<_> = assignments
                    .iter()
                    .filter(|a| a.resource_id == *id)
                    .cloned()
                    .collect();
                ledger::resource_status(&own, today) == rm_models::ResourceStatus::Available
            })
            .count();

        let active_projects = projects
            .iter()
            .filter(|p| p.status == ProjectStatus::Ongoing)
            .filter(|p| caller.is_admin() || p.manager_id == caller.user_id())
            .count();

        let pending_filter = RequestFilter {
            status: Some(RequestStatus::Pending),
            requester_id: (!caller.is_admin()).then(|| caller.user_id()),
            ..Default::default()
        };
        let pending_requests = self.store.requests(pending_filter).await?.len();

        Ok(DashboardStats {
            total_resources: resources.len(),
            available_resources,
            active_projects,
            pending_requests,
        })
    }

    /// Active assignments whose end date falls within `today..=today+days`.
    pub async fn ending_soon(
        &self,
        caller: &dyn AuthContext,
        today: NaiveDate,
        days: i64,
    ) -> RmResult<Vec<EndingSoon>> {
        let horizon = today + chrono::Duration::days(days);
        let assignments = self.store.assignments().await?;
        let resources = self.store.resources().await?;
        let projects = self.store.projects().await?;

        let mut rows: Vec<EndingSoon> = assignments
            .into_iter()
            .filter(|a| a.is_active() && a.end_date >= today && a.end_date <= horizon)
            .filter_map(|a| {
                let project = projects.iter().find(|p| p.id == Some(a.project_id))?;
                if !caller.is_admin() && project.manager_id != caller.user_id() {
                    return None;
                }
                let resource = resources.iter().find(|r| r.id == Some(a.resource_id))?;
                Some(EndingSoon {
                    assignment_id: a.id,
                    resource_name: resource.name.clone(),
                    project_name: project.name.clone(),
                    role: a.role.clone(),
                    end_date: a.end_date,
                    days_left: (a.end_date - today).num_days(),
                })
            })
            .collect();

        rows.sort_by_key(|r| r.end_date);
        Ok(rows)
    }
}
