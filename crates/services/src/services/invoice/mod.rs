use std::sync::Arc;

use db::{
    DatabaseConnection,
    models::{
        client::Client, invoice::InvoiceError, pending_invoice::PendingInvoice,
        profile::UserProfile, project::Project, task::Task,
    },
    types::TemplateType,
};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::services::{
    error_log::ErrorLogService,
    external::{
        B2ObjectStore, InvoiceMarkupGenerator, MailRelay, MailRelayClient, ObjectStore,
        OpenAiMarkupGenerator, PdfRenderer, RemotePdfRenderer,
    },
};

pub mod composer;
pub mod delivery;
pub mod template;

pub use composer::{ComposerError, InvoiceComposer};
pub use delivery::{DeliveryError, InvoiceDelivery};

#[derive(Debug, Error)]
pub enum InvoiceServiceError {
    #[error(transparent)]
    Database(#[from] db::DatabaseError),
    #[error("Task not found")]
    TaskNotFound,
    #[error("Project not found")]
    ProjectNotFound,
    #[error("Client not found")]
    ClientNotFound,
    #[error(transparent)]
    Composer(#[from] ComposerError),
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

impl From<InvoiceError> for InvoiceServiceError {
    fn from(err: InvoiceError) -> Self {
        Self::Delivery(DeliveryError::Invoice(err))
    }
}

#[derive(Debug, Serialize)]
pub struct InvoiceReceipt {
    pub success: bool,
    pub message: String,
    pub invoice_id: Uuid,
    pub emailed: bool,
    pub template_type: TemplateType,
    pub total_cost: f64,
}

/// End-to-end invoicing for a completed task: compose the markup, render it
/// to PDF, store the artifact, persist the invoice record and email both
/// parties. Render/store failures land the task on the retry queue; a
/// background job drains it through `retry_pending`.
#[derive(Clone)]
pub struct InvoiceService {
    conn: DatabaseConnection,
    generator: Arc<dyn InvoiceMarkupGenerator>,
    renderer: Arc<dyn PdfRenderer>,
    store: Arc<dyn ObjectStore>,
    mailer: Arc<dyn MailRelay>,
    error_log: ErrorLogService,
}

impl InvoiceService {
    pub fn new(conn: DatabaseConnection) -> Self {
        let error_log = ErrorLogService::new(conn.clone());
        Self {
            conn,
            generator: Arc::new(OpenAiMarkupGenerator::new()),
            renderer: Arc::new(RemotePdfRenderer::new()),
            store: Arc::new(B2ObjectStore::new()),
            mailer: Arc::new(MailRelayClient::new()),
            error_log,
        }
    }

    pub fn with_backends(
        conn: DatabaseConnection,
        generator: Arc<dyn InvoiceMarkupGenerator>,
        renderer: Arc<dyn PdfRenderer>,
        store: Arc<dyn ObjectStore>,
        mailer: Arc<dyn MailRelay>,
    ) -> Self {
        let error_log = ErrorLogService::new(conn.clone());
        Self {
            conn,
            generator,
            renderer,
            store,
            mailer,
            error_log,
        }
    }

    /// Generates and delivers the invoice for a completed task.
    pub async fn generate_for_task(
        &self,
        task_id: Uuid,
    ) -> Result<InvoiceReceipt, InvoiceServiceError> {
        let db = &self.conn;

        let task = Task::find_by_id(db, task_id)
            .await?
            .ok_or(InvoiceServiceError::TaskNotFound)?;
        let project = Project::find_by_id(db, task.project_id)
            .await?
            .ok_or(InvoiceServiceError::ProjectNotFound)?;
        let client = Client::find_by_id(db, project.client_id)
            .await?
            .ok_or(InvoiceServiceError::ClientNotFound)?;
        let profile = UserProfile::get_or_init(db).await?;

        let invoice_uuid = Uuid::new_v4();
        let composed = InvoiceComposer::compose(
            db,
            self.generator.as_ref(),
            &self.error_log,
            invoice_uuid,
            &task,
            &project,
            &client,
            &profile,
        )
        .await?;

        let outcome = InvoiceDelivery::deliver(
            db,
            self.renderer.as_ref(),
            self.store.as_ref(),
            self.mailer.as_ref(),
            &self.error_log,
            invoice_uuid,
            task.id,
            task.time_taken_seconds,
            &composed,
        )
        .await;

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(err) => {
                if matches!(err, DeliveryError::External(_)) {
                    self.error_log.log(
                        "InvoiceService",
                        format!("Invoice delivery failed for task {}: {}", task.id, err),
                    );
                    // Best-effort: a broken queue must not replace the
                    // delivery error the caller needs to see.
                    if let Err(enqueue_err) =
                        PendingInvoice::enqueue(db, task.id, &err.to_string()).await
                    {
                        tracing::error!(
                            task_id = %task.id,
                            error = %enqueue_err,
                            "Failed to queue invoice for retry"
                        );
                    }
                }
                return Err(err.into());
            }
        };

        tracing::info!(
            task_id = %task.id,
            invoice_id = %outcome.invoice.id,
            total_cost = outcome.invoice.total_cost,
            template = ?outcome.invoice.template_type,
            emailed = outcome.emailed,
            "Invoice generated"
        );

        Ok(InvoiceReceipt {
            success: true,
            message: if outcome.emailed {
                "Invoice generated and emailed successfully".to_string()
            } else {
                "Invoice generated successfully".to_string()
            },
            invoice_id: outcome.invoice.id,
            emailed: outcome.emailed,
            template_type: outcome.invoice.template_type.clone(),
            total_cost: outcome.invoice.total_cost,
        })
    }

    /// Re-issues a time-limited download link for a stored invoice PDF. The
    /// URL persisted at creation time may have expired; this mints a fresh
    /// one against the object store.
    pub async fn download_url(&self, invoice_id: Uuid) -> Result<String, InvoiceServiceError> {
        let invoice = db::models::invoice::Invoice::find_by_id(&self.conn, invoice_id)
            .await?
            .ok_or(InvoiceError::NotFound)?;
        let object_name = format!("{}.pdf", invoice.id);
        let url = self
            .store
            .fresh_download_url(&object_name)
            .await
            .map_err(DeliveryError::External)?;
        Ok(url)
    }

    /// Drains the retry queue, oldest first. Each entry is retried once per
    /// call; permanent failures keep accumulating attempts rather than being
    /// dropped, so operators can see what is stuck.
    pub async fn retry_pending(&self, limit: u64) -> Result<usize, InvoiceServiceError> {
        let pending = PendingInvoice::fetch_unresolved(&self.conn, limit).await?;
        let mut resolved = 0;
        for entry in pending {
            match self.generate_for_task(entry.task_id).await {
                Ok(_) => {
                    PendingInvoice::mark_resolved(&self.conn, entry.id).await?;
                    resolved += 1;
                }
                Err(err) => {
                    PendingInvoice::mark_failed(&self.conn, entry.id, &err.to_string()).await?;
                }
            }
        }
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use chrono::Utc;
    use db::models::{
        client::CreateClient, invoice::Invoice, profile::UpdateProfile, project::CreateProject,
        quota::QuotaUsage, task::CreateTask,
    };
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;

    use super::*;
    use crate::services::external::{ExternalServiceError, InvoiceParams, OutboundEmail};
    use crate::services::quota::{QuotaService, current_month};
    use crate::services::timer::TimerService;

    struct LocalOnlyGenerator;

    #[async_trait]
    impl InvoiceMarkupGenerator for LocalOnlyGenerator {
        async fn generate(&self, _: &InvoiceParams) -> Result<String, ExternalServiceError> {
            Err(ExternalServiceError::MissingConfig("TASKBILL_AI_API_BASE"))
        }
    }

    struct FakeRenderer {
        fail: AtomicBool,
    }

    #[async_trait]
    impl PdfRenderer for FakeRenderer {
        async fn render(&self, _html: &str) -> Result<Vec<u8>, ExternalServiceError> {
            if self.fail.load(Ordering::SeqCst) {
                Err(ExternalServiceError::invalid("pdf-renderer", "down"))
            } else {
                Ok(b"%PDF-1.4 fake".to_vec())
            }
        }
    }

    struct FakeStore;

    #[async_trait]
    impl ObjectStore for FakeStore {
        async fn upload(
            &self,
            object_name: &str,
            _bytes: &[u8],
            _content_type: &str,
        ) -> Result<String, ExternalServiceError> {
            Ok(format!("https://store.example/file/invoices/{}", object_name))
        }

        async fn fresh_download_url(
            &self,
            object_name: &str,
        ) -> Result<String, ExternalServiceError> {
            Ok(format!(
                "https://store.example/file/invoices/{}?Authorization=tok",
                object_name
            ))
        }
    }

    struct FakeMailer {
        fail: AtomicBool,
        sent: Mutex<Vec<String>>,
    }

    impl FakeMailer {
        fn new() -> Self {
            Self {
                fail: AtomicBool::new(false),
                sent: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl MailRelay for FakeMailer {
        async fn send(&self, email: &OutboundEmail) -> Result<(), ExternalServiceError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(ExternalServiceError::invalid("mail-relay", "down"));
            }
            self.sent.lock().unwrap().push(email.to.clone());
            Ok(())
        }
    }

    struct Harness {
        service: InvoiceService,
        conn: sea_orm::DatabaseConnection,
        renderer: Arc<FakeRenderer>,
        mailer: Arc<FakeMailer>,
        task_id: Uuid,
    }

    async fn setup() -> Harness {
        let conn = Database::connect("sqlite::memory:").await.unwrap();
        db_migration::Migrator::up(&conn, None).await.unwrap();

        let client = Client::create(
            &conn,
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
            &conn,
            &CreateProject {
                client_id: client.id,
                name: "Website".to_string(),
                description: None,
                status: None,
                priority: None,
                due_date: None,
                hourly_rate: 60.0,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        let task = Task::create(
            &conn,
            project.id,
            &CreateTask {
                name: "Deploy".to_string(),
                description: None,
                status: None,
                priority: None,
                due_date: Some(Utc::now()),
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        UserProfile::update(
            &conn,
            UpdateProfile {
                display_name: None,
                email: Some("me@taskbill.example".to_string()),
            },
        )
        .await
        .unwrap();

        TimerService::start(&conn, task.id).await.unwrap();
        TimerService::complete(&conn, task.id).await.unwrap();

        let renderer = Arc::new(FakeRenderer {
            fail: AtomicBool::new(false),
        });
        let mailer = Arc::new(FakeMailer::new());
        let service = InvoiceService::with_backends(
            conn.clone(),
            Arc::new(LocalOnlyGenerator),
            renderer.clone(),
            Arc::new(FakeStore),
            mailer.clone(),
        );

        Harness {
            service,
            conn,
            renderer,
            mailer,
            task_id: task.id,
        }
    }

    #[tokio::test]
    async fn successful_run_stores_invoice_and_emails_both_parties() {
        let h = setup().await;

        let receipt = h.service.generate_for_task(h.task_id).await.unwrap();
        assert!(receipt.success);
        assert!(receipt.emailed);
        assert_eq!(receipt.template_type, TemplateType::Local);

        let sent = h.mailer.sent.lock().unwrap().clone();
        assert_eq!(
            sent,
            vec![
                "billing@acme.example".to_string(),
                "me@taskbill.example".to_string()
            ]
        );

        let invoice = Invoice::find_by_id(&h.conn, receipt.invoice_id)
            .await
            .unwrap()
            .unwrap();
        assert!(invoice.emailed);
        assert_eq!(invoice.task_id, h.task_id);

        let task = Task::find_by_id(&h.conn, h.task_id).await.unwrap().unwrap();
        assert_eq!(task.invoice_id, Some(receipt.invoice_id));

        let usage = QuotaUsage::reconcile_period(&h.conn, &current_month())
            .await
            .unwrap();
        assert_eq!(usage.email_count, 1);
    }

    #[tokio::test]
    async fn mail_failure_still_stores_invoice_without_email_quota() {
        let h = setup().await;
        h.mailer.fail.store(true, Ordering::SeqCst);

        let receipt = h.service.generate_for_task(h.task_id).await.unwrap();
        assert!(receipt.success);
        assert!(!receipt.emailed);

        let invoice = Invoice::find_by_id(&h.conn, receipt.invoice_id)
            .await
            .unwrap()
            .unwrap();
        assert!(!invoice.emailed);

        let usage = QuotaUsage::reconcile_period(&h.conn, &current_month())
            .await
            .unwrap();
        assert_eq!(usage.email_count, 0);
    }

    #[tokio::test]
    async fn exhausted_email_quota_skips_sending() {
        let h = setup().await;
        for _ in 0..5 {
            QuotaService::consume_email(&h.conn).await.unwrap();
        }

        let receipt = h.service.generate_for_task(h.task_id).await.unwrap();
        assert!(!receipt.emailed);
        assert!(h.mailer.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn render_failure_queues_retry_and_later_resolves() {
        let h = setup().await;
        h.renderer.fail.store(true, Ordering::SeqCst);

        let err = h.service.generate_for_task(h.task_id).await.unwrap_err();
        assert!(matches!(
            err,
            InvoiceServiceError::Delivery(DeliveryError::External(_))
        ));

        let pending = PendingInvoice::fetch_unresolved(&h.conn, 10).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].task_id, h.task_id);

        // Renderer recovers; the background retry drains the queue.
        h.renderer.fail.store(false, Ordering::SeqCst);
        let resolved = h.service.retry_pending(10).await.unwrap();
        assert_eq!(resolved, 1);
        assert!(
            PendingInvoice::fetch_unresolved(&h.conn, 10)
                .await
                .unwrap()
                .is_empty()
        );
        let invoices = Invoice::find_by_task_id(&h.conn, h.task_id).await.unwrap();
        assert_eq!(invoices.len(), 1);
    }

    #[tokio::test]
    async fn broken_retry_queue_does_not_mask_the_delivery_error() {
        use sea_orm::ConnectionTrait;

        let h = setup().await;
        h.renderer.fail.store(true, Ordering::SeqCst);
        h.conn
            .execute_unprepared("DROP TABLE pending_invoices")
            .await
            .unwrap();

        let err = h.service.generate_for_task(h.task_id).await.unwrap_err();
        assert!(matches!(
            err,
            InvoiceServiceError::Delivery(DeliveryError::External(_))
        ));
    }
}
