use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    entities::task,
    models::{ids, profile::UserProfile},
    types::{Priority, TaskStatus},
};

#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Task not found")]
    NotFound,
    #[error("Project not found")]
    ProjectNotFound,
    #[error("Task is already completed")]
    AlreadyCompleted,
    #[error("no active timer for task")]
    NoActiveTimer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: Priority,
    pub due_date: Option<DateTime<Utc>>,
    pub time_taken_seconds: i64,
    pub started_at: Option<DateTime<Utc>>,
    pub invoice_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTask {
    pub name: String,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub due_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTask {
    pub name: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub due_date: Option<DateTime<Utc>>,
}

impl Task {
    async fn from_model<C: ConnectionTrait>(db: &C, model: task::Model) -> Result<Self, DbErr> {
        let project_uuid = ids::project_uuid_by_id(db, model.project_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Project not found".to_string()))?;
        let invoice_id = match model.invoice_id {
            Some(id) => ids::invoice_uuid_by_id(db, id).await?,
            None => None,
        };
        Ok(Self {
            id: model.uuid,
            project_id: project_uuid,
            name: model.name,
            description: model.description,
            status: model.status,
            priority: model.priority,
            due_date: model.due_date,
            time_taken_seconds: model.time_taken_seconds,
            started_at: model.started_at,
            invoice_id,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }

    async fn model_by_uuid<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<task::Model, TaskError> {
        task::Entity::find()
            .filter(task::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(TaskError::NotFound)
    }

    pub async fn find_by_project_id<C: ConnectionTrait>(
        db: &C,
        project_id: Uuid,
    ) -> Result<Vec<Self>, TaskError> {
        let project_row_id = ids::project_id_by_uuid(db, project_id)
            .await?
            .ok_or(TaskError::ProjectNotFound)?;

        let models = task::Entity::find()
            .filter(task::Column::ProjectId.eq(project_row_id))
            .order_by_desc(task::Column::CreatedAt)
            .all(db)
            .await?;

        let mut tasks = Vec::with_capacity(models.len());
        for model in models {
            tasks.push(Self::from_model(db, model).await?);
        }
        Ok(tasks)
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        let record = task::Entity::find()
            .filter(task::Column::Uuid.eq(id))
            .one(db)
            .await?;
        match record {
            Some(model) => Ok(Some(Self::from_model(db, model).await?)),
            None => Ok(None),
        }
    }

    pub async fn row_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<i64, TaskError> {
        ids::task_id_by_uuid(db, id).await?.ok_or(TaskError::NotFound)
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        project_id: Uuid,
        data: &CreateTask,
        task_id: Uuid,
    ) -> Result<Self, TaskError> {
        let project_row_id = ids::project_id_by_uuid(db, project_id)
            .await?
            .ok_or(TaskError::ProjectNotFound)?;

        let now = Utc::now();
        let active = task::ActiveModel {
            uuid: Set(task_id),
            project_id: Set(project_row_id),
            name: Set(data.name.clone()),
            description: Set(data.description.clone()),
            status: Set(data.status.clone().unwrap_or_default()),
            priority: Set(data.priority.clone().unwrap_or_default()),
            due_date: Set(data.due_date),
            time_taken_seconds: Set(0),
            started_at: Set(None),
            invoice_id: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let model = active.insert(db).await?;
        Ok(Self::from_model(db, model).await?)
    }

    pub async fn update<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        data: UpdateTask,
    ) -> Result<Self, TaskError> {
        let record = Self::model_by_uuid(db, id).await?;

        let mut active: task::ActiveModel = record.into();
        if let Some(name) = data.name {
            active.name = Set(name);
        }
        if let Some(description) = data.description {
            active.description = Set(Some(description));
        }
        if let Some(priority) = data.priority {
            active.priority = Set(priority);
        }
        if let Some(due_date) = data.due_date {
            active.due_date = Set(Some(due_date));
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(db).await?;
        Ok(Self::from_model(db, updated).await?)
    }

    pub async fn delete<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<u64, DbErr> {
        let row_id = ids::task_id_by_uuid(db, id).await?;
        let result = task::Entity::delete_many()
            .filter(task::Column::Uuid.eq(id))
            .exec(db)
            .await?;
        // A deleted task must not keep holding the timer slot, or no other
        // task could ever start.
        if result.rows_affected > 0 {
            if let Some(row_id) = row_id {
                UserProfile::release_active_task(db, row_id).await?;
            }
        }
        Ok(result.rows_affected)
    }

    /// Marks the start of a timed run. Accumulated time from earlier runs is
    /// left untouched; completion is permanent, so completed tasks refuse.
    pub async fn begin_run<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Self, TaskError> {
        let record = Self::model_by_uuid(db, id).await?;
        if record.status == TaskStatus::Completed {
            return Err(TaskError::AlreadyCompleted);
        }

        let mut active: task::ActiveModel = record.into();
        active.started_at = Set(Some(now));
        active.status = Set(TaskStatus::InProgress);
        active.updated_at = Set(now);

        let updated = active.update(db).await?;
        Ok(Self::from_model(db, updated).await?)
    }

    /// Settles the active run: elapsed time is the wall-clock difference
    /// between `now` and the recorded `started_at`, never an in-memory
    /// counter, so accumulation survives process restarts. `complete` freezes
    /// the task; otherwise it stays InProgress with the timer cleared.
    pub async fn settle_run<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        now: DateTime<Utc>,
        complete: bool,
    ) -> Result<Self, TaskError> {
        let record = Self::model_by_uuid(db, id).await?;
        let started_at = record.started_at.ok_or(TaskError::NoActiveTimer)?;

        let delta = (now - started_at).num_seconds().max(0);
        let total = record.time_taken_seconds + delta;

        let mut active: task::ActiveModel = record.into();
        active.time_taken_seconds = Set(total);
        active.started_at = Set(None);
        active.status = Set(if complete {
            TaskStatus::Completed
        } else {
            TaskStatus::InProgress
        });
        active.updated_at = Set(now);

        let updated = active.update(db).await?;
        Ok(Self::from_model(db, updated).await?)
    }

    pub async fn set_invoice<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        invoice_row_id: i64,
    ) -> Result<(), TaskError> {
        let record = Self::model_by_uuid(db, id).await?;
        let mut active: task::ActiveModel = record.into();
        active.invoice_id = Set(Some(invoice_row_id));
        active.updated_at = Set(Utc::now());
        active.update(db).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;

    use super::*;
    use crate::models::{
        client::{Client, CreateClient},
        project::{CreateProject, Project},
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
    async fn accumulates_wall_clock_time_across_runs() {
        let db = setup_db().await;
        let task = seed_task(&db).await;

        let t0 = Utc::now();
        let task = Task::begin_run(&db, task.id, t0).await.unwrap();
        assert_eq!(task.status, TaskStatus::InProgress);
        assert!(task.started_at.is_some());

        // Pause after 90 seconds of wall-clock time.
        let task = Task::settle_run(&db, task.id, t0 + Duration::seconds(90), false)
            .await
            .unwrap();
        assert_eq!(task.time_taken_seconds, 90);
        assert!(task.started_at.is_none());
        assert_eq!(task.status, TaskStatus::InProgress);

        // Resume and complete after another 30 seconds.
        let t1 = t0 + Duration::seconds(200);
        Task::begin_run(&db, task.id, t1).await.unwrap();
        let task = Task::settle_run(&db, task.id, t1 + Duration::seconds(30), true)
            .await
            .unwrap();
        assert_eq!(task.time_taken_seconds, 120);
        assert_eq!(task.status, TaskStatus::Completed);
        assert!(task.started_at.is_none());
    }

    #[tokio::test]
    async fn settle_without_active_timer_is_rejected() {
        let db = setup_db().await;
        let task = seed_task(&db).await;

        let err = Task::settle_run(&db, task.id, Utc::now(), false)
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::NoActiveTimer));
    }

    #[tokio::test]
    async fn completed_task_cannot_start_again() {
        let db = setup_db().await;
        let task = seed_task(&db).await;

        let t0 = Utc::now();
        Task::begin_run(&db, task.id, t0).await.unwrap();
        Task::settle_run(&db, task.id, t0 + Duration::seconds(10), true)
            .await
            .unwrap();

        let err = Task::begin_run(&db, task.id, Utc::now()).await.unwrap_err();
        assert!(matches!(err, TaskError::AlreadyCompleted));
    }
}
