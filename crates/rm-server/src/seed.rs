//! Demo data seeding
//!
//! Populates a fresh in-memory store so database-less runs have something
//! to show. Never runs against PostgreSQL.

use std::sync::Arc;

use chrono::{Duration, Utc};
use fake::faker::name::en::Name;
use fake::Fake;
use rm_core::result::RmResult;
use rm_core::traits::Caller;
use rm_models::{CreateProjectDto, CreateResourceDto, RequestPayload, User, UserRole};
use rm_services::{LedgerStore, ProjectLedger, ResourceLedger, WorkflowEngine};
use tracing::info;

pub async fn seed_demo_data(store: Arc<dyn LedgerStore>) -> RmResult<()> {
    let admin = store
        .insert_user(User::new("System Admin", "admin@resman.local", UserRole::Admin))
        .await?;
    let manager = store
        .insert_user(User::new(
            "Delivery Manager",
            "devman@resman.local",
            UserRole::DevMan,
        ))
        .await?;
    let admin_caller = Caller::admin(admin.id.unwrap_or(0));

    let resources = ResourceLedger::new(store.clone());
    let mut resource_ids = Vec::new();
    for i in 0..6 {
        let name: String = Name().fake();
        let slug: String = name
            .to_lowercase()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '.' })
            .collect();
        let email = format!("{}{}@resman.local", slug, i);
        let resource = resources
            .create(CreateResourceDto { name, email })
            .await?;
        resource_ids.push(resource.id.unwrap_or(0));
    }

    let projects = ProjectLedger::new(store.clone());
    let billing = projects
        .create(CreateProjectDto {
            name: "Billing Revamp".into(),
            client_name: "Acme Corp".into(),
            manager_id: manager.id.unwrap_or(0),
        })
        .await?;
    projects
        .create(CreateProjectDto {
            name: "Data Platform".into(),
            client_name: "Globex".into(),
            manager_id: manager.id.unwrap_or(0),
        })
        .await?;

    let engine = WorkflowEngine::new(store.clone());
    let today = Utc::now().date_naive();
    let roles = ["Backend Developer", "Frontend Developer", "QA Engineer"];
    for (i, resource_id) in resource_ids.iter().take(3).enumerate() {
        engine
            .submit(
                RequestPayload::Assign {
                    resource_id: *resource_id,
                    project_id: billing.id.unwrap_or(0),
                    role: roles[i].into(),
                    start_date: today - Duration::days(30),
                    end_date: today + Duration::days(60 + 30 * i as i64),
                },
                &admin_caller,
            )
            .await?;
    }

    info!(
        resources = resource_ids.len(),
        "seeded demo data into the in-memory store"
    );
    Ok(())
}
