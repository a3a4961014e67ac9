use db::{
    ConnectionTrait, DatabaseError,
    models::{client::Client, profile::UserProfile, project::Project, task::Task},
    types::{TaskStatus, TemplateType},
};
use thiserror::Error;
use uuid::Uuid;

use crate::services::{
    error_log::ErrorLogService,
    external::{InvoiceMarkupGenerator, InvoiceParams},
    invoice::template::render_local_template,
    quota::QuotaService,
};

pub const SECONDS_PER_HOUR: f64 = 3600.0;

#[derive(Debug, Error)]
pub enum ComposerError {
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error("The task is not completed")]
    TaskNotCompleted,
    #[error("Client email required for invoicing")]
    MissingClientEmail,
    #[error("Your email is required for invoicing")]
    MissingFreelancerEmail,
}

#[derive(Debug)]
pub struct ComposedInvoice {
    pub html: String,
    pub params: InvoiceParams,
    pub hours_worked: f64,
    pub total_cost: f64,
    pub template_type: TemplateType,
}

/// Builds invoice HTML for a completed task. The AI path is attempted only
/// when quota permits and the AI counter is consumed only after a successful
/// generation; any AI failure degrades to the local template and is logged,
/// never surfaced to the caller.
pub struct InvoiceComposer;

impl InvoiceComposer {
    pub async fn compose<C: ConnectionTrait>(
        db: &C,
        generator: &dyn InvoiceMarkupGenerator,
        error_log: &ErrorLogService,
        invoice_uuid: Uuid,
        task: &Task,
        project: &Project,
        client: &Client,
        profile: &UserProfile,
    ) -> Result<ComposedInvoice, ComposerError> {
        if task.status != TaskStatus::Completed {
            return Err(ComposerError::TaskNotCompleted);
        }
        let client_email = client
            .email
            .clone()
            .filter(|email| !email.trim().is_empty())
            .ok_or(ComposerError::MissingClientEmail)?;
        let freelancer_email = profile
            .email
            .clone()
            .filter(|email| !email.trim().is_empty())
            .ok_or(ComposerError::MissingFreelancerEmail)?;

        let hours_worked = task.time_taken_seconds as f64 / SECONDS_PER_HOUR;
        let total_cost = hours_worked * project.hourly_rate;

        let params = InvoiceParams {
            invoice_id: format!("inv_{}", invoice_uuid),
            project_name: project.name.clone(),
            project_description: project
                .description
                .clone()
                .unwrap_or_else(|| "No description provided".to_string()),
            task_name: task.name.clone(),
            client_name: client.name.clone(),
            client_email,
            freelancer_email,
            hourly_rate: project.hourly_rate,
            hours_worked,
            due_date: task.due_date.map(|d| d.format("%Y-%m-%d").to_string()),
        };

        let (html, template_type) = if QuotaService::ai_allowed(db).await? {
            match generator.generate(&params).await {
                Ok(html) => {
                    if !QuotaService::consume_ai(db).await? {
                        // Lost the race to the last free slot; the generated
                        // markup is kept, only the counter stays put.
                        tracing::debug!("AI quota consumed concurrently");
                    }
                    (html, TemplateType::Ai)
                }
                Err(err) => {
                    error_log.log(
                        "InvoiceComposer",
                        format!("AI invoice generation failed: {}", err),
                    );
                    (render_local_template(&params), TemplateType::Local)
                }
            }
        } else {
            (render_local_template(&params), TemplateType::Local)
        };

        Ok(ComposedInvoice {
            html,
            params,
            hours_worked,
            total_cost,
            template_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::Utc;
    use db::models::{
        client::CreateClient,
        profile::UpdateProfile,
        project::CreateProject,
        quota::QuotaUsage,
        task::CreateTask,
    };
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;

    use super::*;
    use crate::services::external::ExternalServiceError;
    use crate::services::quota::current_month;
    use crate::services::timer::TimerService;

    struct FakeGenerator {
        calls: AtomicUsize,
        fail: bool,
    }

    impl FakeGenerator {
        fn succeeding() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: true,
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl InvoiceMarkupGenerator for FakeGenerator {
        async fn generate(
            &self,
            params: &InvoiceParams,
        ) -> Result<String, ExternalServiceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(ExternalServiceError::invalid("ai-generator", "boom"))
            } else {
                Ok(format!("<html><body>AI invoice {}</body></html>", params.invoice_id))
            }
        }
    }

    async fn setup() -> (
        sea_orm::DatabaseConnection,
        Task,
        Project,
        Client,
        UserProfile,
    ) {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db_migration::Migrator::up(&db, None).await.unwrap();

        let client = Client::create(
            &db,
            &CreateClient {
                name: "Acme".to_string(),
                email: Some("billing@acme.example".to_string()),
                phone: None,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        let project = Project::create(
            &db,
            &CreateProject {
                client_id: client.id,
                name: "Website".to_string(),
                description: Some("Redesign".to_string()),
                status: None,
                priority: None,
                due_date: None,
                hourly_rate: 50.0,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        let task = Task::create(
            &db,
            project.id,
            &CreateTask {
                name: "Hero section".to_string(),
                description: None,
                status: None,
                priority: None,
                due_date: Some(Utc::now()),
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        let profile = UserProfile::update(
            &db,
            UpdateProfile {
                display_name: None,
                email: Some("me@taskbill.example".to_string()),
            },
        )
        .await
        .unwrap();

        TimerService::start(&db, task.id).await.unwrap();
        let task = TimerService::complete(&db, task.id).await.unwrap();

        (db, task, project, client, profile)
    }

    #[tokio::test]
    async fn ai_success_consumes_quota_and_uses_ai_template() {
        let (db, task, project, client, profile) = setup().await;
        let generator = FakeGenerator::succeeding();
        let error_log = ErrorLogService::new(db.clone());

        let composed = InvoiceComposer::compose(
            &db,
            &generator,
            &error_log,
            Uuid::new_v4(),
            &task,
            &project,
            &client,
            &profile,
        )
        .await
        .unwrap();

        assert_eq!(composed.template_type, TemplateType::Ai);
        assert_eq!(generator.call_count(), 1);
        let usage = QuotaUsage::reconcile_period(&db, &current_month())
            .await
            .unwrap();
        assert_eq!(usage.ai_count, 1);
    }

    #[tokio::test]
    async fn ai_failure_falls_back_to_local_without_consuming_quota() {
        let (db, task, project, client, profile) = setup().await;
        let generator = FakeGenerator::failing();
        let error_log = ErrorLogService::new(db.clone());

        let composed = InvoiceComposer::compose(
            &db,
            &generator,
            &error_log,
            Uuid::new_v4(),
            &task,
            &project,
            &client,
            &profile,
        )
        .await
        .unwrap();

        assert_eq!(composed.template_type, TemplateType::Local);
        assert!(composed.html.contains("TaskBill Invoice"));
        let usage = QuotaUsage::reconcile_period(&db, &current_month())
            .await
            .unwrap();
        assert_eq!(usage.ai_count, 0);
    }

    #[tokio::test]
    async fn exhausted_quota_skips_generator_entirely() {
        let (db, task, project, client, profile) = setup().await;
        let generator = FakeGenerator::succeeding();
        let error_log = ErrorLogService::new(db.clone());

        QuotaService::consume_ai(&db).await.unwrap();
        QuotaService::consume_ai(&db).await.unwrap();

        let composed = InvoiceComposer::compose(
            &db,
            &generator,
            &error_log,
            Uuid::new_v4(),
            &task,
            &project,
            &client,
            &profile,
        )
        .await
        .unwrap();

        assert_eq!(composed.template_type, TemplateType::Local);
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn incomplete_task_is_rejected() {
        let (db, task, project, client, profile) = setup().await;
        let fresh = Task::create(
            &db,
            project.id,
            &CreateTask {
                name: "Unfinished".to_string(),
                description: None,
                status: None,
                priority: None,
                due_date: None,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        let _ = task;

        let generator = FakeGenerator::succeeding();
        let error_log = ErrorLogService::new(db.clone());
        let err = InvoiceComposer::compose(
            &db,
            &generator,
            &error_log,
            Uuid::new_v4(),
            &fresh,
            &project,
            &client,
            &profile,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ComposerError::TaskNotCompleted));
    }

    #[tokio::test]
    async fn missing_client_email_is_rejected() {
        let (db, task, project, _client, profile) = setup().await;
        let bare_client = Client::create(
            &db,
            &CreateClient {
                name: "No Mail Inc".to_string(),
                email: None,
                phone: None,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        let generator = FakeGenerator::succeeding();
        let error_log = ErrorLogService::new(db.clone());
        let err = InvoiceComposer::compose(
            &db,
            &generator,
            &error_log,
            Uuid::new_v4(),
            &task,
            &project,
            &bare_client,
            &profile,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ComposerError::MissingClientEmail));
    }

    #[tokio::test]
    async fn total_cost_is_hours_times_rate() {
        let (db, mut task, project, client, profile) = setup().await;
        task.time_taken_seconds = 7200;

        let generator = FakeGenerator::failing();
        let error_log = ErrorLogService::new(db.clone());
        let composed = InvoiceComposer::compose(
            &db,
            &generator,
            &error_log,
            Uuid::new_v4(),
            &task,
            &project,
            &client,
            &profile,
        )
        .await
        .unwrap();

        assert!((composed.hours_worked - 2.0).abs() < f64::EPSILON);
        assert!((composed.total_cost - 100.0).abs() < f64::EPSILON);
        assert!(composed.html.contains("$100.00"));
    }
}
