use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{entities::invoice, models::ids, types::TemplateType};

#[derive(Debug, Error)]
pub enum InvoiceError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Invoice not found")]
    NotFound,
    #[error("Task not found")]
    TaskNotFound,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: Uuid,
    pub task_id: Uuid,
    pub project_id: Uuid,
    pub client_id: Uuid,
    pub time_taken_seconds: i64,
    pub hourly_rate: f64,
    pub total_cost: f64,
    pub template_type: TemplateType,
    pub url: String,
    pub emailed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Priced invoice skeleton: everything known before the artifact is stored.
#[derive(Debug, Clone)]
pub struct CreateInvoice {
    pub task_id: Uuid,
    pub time_taken_seconds: i64,
    pub hourly_rate: f64,
    pub total_cost: f64,
    pub template_type: TemplateType,
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EarningsSummary {
    pub invoice_count: i64,
    pub total_earnings: f64,
}

impl Invoice {
    async fn from_model<C: ConnectionTrait>(db: &C, model: invoice::Model) -> Result<Self, DbErr> {
        let task_uuid = ids::task_uuid_by_id(db, model.task_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Task not found".to_string()))?;
        let project_uuid = ids::project_uuid_by_id(db, model.project_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Project not found".to_string()))?;
        let client_uuid = ids::client_uuid_by_id(db, model.client_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Client not found".to_string()))?;
        Ok(Self {
            id: model.uuid,
            task_id: task_uuid,
            project_id: project_uuid,
            client_id: client_uuid,
            time_taken_seconds: model.time_taken_seconds,
            hourly_rate: model.hourly_rate,
            total_cost: model.total_cost,
            template_type: model.template_type,
            url: model.url,
            emailed: model.emailed,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        let record = invoice::Entity::find()
            .filter(invoice::Column::Uuid.eq(id))
            .one(db)
            .await?;
        match record {
            Some(model) => Ok(Some(Self::from_model(db, model).await?)),
            None => Ok(None),
        }
    }

    pub async fn find_by_task_id<C: ConnectionTrait>(
        db: &C,
        task_id: Uuid,
    ) -> Result<Vec<Self>, InvoiceError> {
        let task_row_id = ids::task_id_by_uuid(db, task_id)
            .await?
            .ok_or(InvoiceError::TaskNotFound)?;
        let models = invoice::Entity::find()
            .filter(invoice::Column::TaskId.eq(task_row_id))
            .order_by_desc(invoice::Column::CreatedAt)
            .all(db)
            .await?;
        let mut invoices = Vec::with_capacity(models.len());
        for model in models {
            invoices.push(Self::from_model(db, model).await?);
        }
        Ok(invoices)
    }

    /// Persists the invoice and points the task at it. The row exists from
    /// here on regardless of how delivery goes.
    pub async fn create<C: ConnectionTrait>(
        db: &C,
        data: &CreateInvoice,
        invoice_id: Uuid,
    ) -> Result<Self, InvoiceError> {
        let task_model = crate::entities::task::Entity::find()
            .filter(crate::entities::task::Column::Uuid.eq(data.task_id))
            .one(db)
            .await?
            .ok_or(InvoiceError::TaskNotFound)?;
        let project_model = crate::entities::project::Entity::find_by_id(task_model.project_id)
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound("Project not found".to_string()))?;

        let now = Utc::now();
        let active = invoice::ActiveModel {
            uuid: Set(invoice_id),
            task_id: Set(task_model.id),
            project_id: Set(project_model.id),
            client_id: Set(project_model.client_id),
            time_taken_seconds: Set(data.time_taken_seconds),
            hourly_rate: Set(data.hourly_rate),
            total_cost: Set(data.total_cost),
            template_type: Set(data.template_type.clone()),
            url: Set(data.url.clone()),
            emailed: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let model = active.insert(db).await?;

        let mut task_active: crate::entities::task::ActiveModel = task_model.into();
        task_active.invoice_id = Set(Some(model.id));
        task_active.updated_at = Set(now);
        task_active.update(db).await?;

        Ok(Self::from_model(db, model).await?)
    }

    pub async fn mark_emailed<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<(), InvoiceError> {
        let record = invoice::Entity::find()
            .filter(invoice::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(InvoiceError::NotFound)?;
        let mut active: invoice::ActiveModel = record.into();
        active.emailed = Set(true);
        active.updated_at = Set(Utc::now());
        active.update(db).await?;
        Ok(())
    }

    /// Dashboard aggregate: how many invoices exist and what they add up to.
    pub async fn earnings_summary<C: ConnectionTrait>(db: &C) -> Result<EarningsSummary, DbErr> {
        let count = invoice::Entity::find().count(db).await?;
        let total: Option<f64> = invoice::Entity::find()
            .select_only()
            .column_as(invoice::Column::TotalCost.sum(), "total")
            .into_tuple()
            .one(db)
            .await?
            .flatten();
        Ok(EarningsSummary {
            invoice_count: i64::try_from(count).unwrap_or(i64::MAX),
            total_earnings: total.unwrap_or(0.0),
        })
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;

    use super::*;
    use crate::models::{
        client::{Client, CreateClient},
        project::{CreateProject, Project},
        task::{CreateTask, Task},
    };

    async fn setup_db() -> sea_orm::DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db_migration::Migrator::up(&db, None).await.unwrap();
        db
    }

    async fn seed_task(db: &sea_orm::DatabaseConnection) -> Task {
        let client = Client::create(
            db,
            &CreateClient {
                name: "Acme".to_string(),
                email: Some("acme@example.com".to_string()),
                phone: None,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        let project = Project::create(
            db,
            &CreateProject {
                client_id: client.id,
                name: "Website".to_string(),
                description: None,
                status: None,
                priority: None,
                due_date: None,
                hourly_rate: 50.0,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        Task::create(
            db,
            project.id,
            &CreateTask {
                name: "Landing page".to_string(),
                description: None,
                status: None,
                priority: None,
                due_date: None,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn create_links_task_to_invoice() {
        let db = setup_db().await;
        let task = seed_task(&db).await;

        let invoice_id = Uuid::new_v4();
        let invoice = Invoice::create(
            &db,
            &CreateInvoice {
                task_id: task.id,
                time_taken_seconds: 7200,
                hourly_rate: 50.0,
                total_cost: 100.0,
                template_type: TemplateType::Local,
                url: "https://store.example/inv.pdf".to_string(),
            },
            invoice_id,
        )
        .await
        .unwrap();

        assert_eq!(invoice.id, invoice_id);
        assert!(!invoice.emailed);
        assert_eq!(invoice.total_cost, 100.0);

        let task = Task::find_by_id(&db, task.id).await.unwrap().unwrap();
        assert_eq!(task.invoice_id, Some(invoice_id));
    }

    #[tokio::test]
    async fn earnings_summary_totals_all_invoices() {
        let db = setup_db().await;
        let task = seed_task(&db).await;

        for cost in [100.0, 250.0] {
            Invoice::create(
                &db,
                &CreateInvoice {
                    task_id: task.id,
                    time_taken_seconds: 3600,
                    hourly_rate: cost,
                    total_cost: cost,
                    template_type: TemplateType::Local,
                    url: "https://store.example/inv.pdf".to_string(),
                },
                Uuid::new_v4(),
            )
            .await
            .unwrap();
        }

        let summary = Invoice::earnings_summary(&db).await.unwrap();
        assert_eq!(summary.invoice_count, 2);
        assert_eq!(summary.total_earnings, 350.0);
    }
}
