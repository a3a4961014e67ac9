use chrono::Utc;
use db::{
    ConnectionTrait, DatabaseError,
    models::{
        profile::UserProfile,
        task::{Task, TaskError},
    },
};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum TimerError {
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error(transparent)]
    Task(#[from] TaskError),
    #[error("Another task is already active. Please end it before starting a new timer.")]
    AnotherTimerActive,
}

/// Start/pause/complete for task timers. Elapsed time is always derived from
/// the persisted `started_at` against the wall clock, so a run survives app
/// and process restarts; the single-active-timer invariant is enforced by the
/// profile's compare-and-swap slot rather than a scan.
pub struct TimerService;

impl TimerService {
    pub async fn start<C: ConnectionTrait>(db: &C, task_id: Uuid) -> Result<Task, TimerError> {
        let task_row_id = Task::row_id(db, task_id).await?;

        if !UserProfile::try_claim_active_task(db, task_row_id).await? {
            return Err(TimerError::AnotherTimerActive);
        }

        match Task::begin_run(db, task_id, Utc::now()).await {
            Ok(task) => {
                tracing::info!(task_id = %task_id, "Timer started");
                Ok(task)
            }
            Err(err) => {
                // Give the slot back; the claim must not outlive a failed start.
                if let Err(release_err) =
                    UserProfile::release_active_task(db, task_row_id).await
                {
                    tracing::error!(
                        task_id = %task_id,
                        error = %release_err,
                        "Failed to release active-timer slot after start failure"
                    );
                }
                Err(err.into())
            }
        }
    }

    /// Banks the elapsed time and clears the running marker; the task stays
    /// InProgress and can be resumed later without losing accumulated time.
    pub async fn pause<C: ConnectionTrait>(db: &C, task_id: Uuid) -> Result<Task, TimerError> {
        Self::settle(db, task_id, false).await
    }

    /// Terminal settle: accumulated time is frozen and the task can never be
    /// timed again.
    pub async fn complete<C: ConnectionTrait>(db: &C, task_id: Uuid) -> Result<Task, TimerError> {
        Self::settle(db, task_id, true).await
    }

    async fn settle<C: ConnectionTrait>(
        db: &C,
        task_id: Uuid,
        complete: bool,
    ) -> Result<Task, TimerError> {
        let task_row_id = Task::row_id(db, task_id).await?;
        let task = Task::settle_run(db, task_id, Utc::now(), complete).await?;
        UserProfile::release_active_task(db, task_row_id).await?;

        tracing::info!(
            task_id = %task_id,
            time_taken = task.time_taken_seconds,
            completed = complete,
            "Timer settled"
        );
        Ok(task)
    }
}

#[cfg(test)]
mod tests {
    use db::models::{
        client::{Client, CreateClient},
        profile::UserProfile,
        project::{CreateProject, Project},
        task::CreateTask,
    };
    use db::types::TaskStatus;
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;

    use super::*;

    async fn setup_db() -> sea_orm::DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db_migration::Migrator::up(&db, None).await.unwrap();
        db
    }

    async fn seed_two_tasks(db: &sea_orm::DatabaseConnection) -> (Task, Task) {
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

        let make = |name: &str| CreateTask {
            name: name.to_string(),
            description: None,
            status: None,
            priority: None,
            due_date: None,
        };
        let a = Task::create(db, project.id, &make("a"), Uuid::new_v4())
            .await
            .unwrap();
        let b = Task::create(db, project.id, &make("b"), Uuid::new_v4())
            .await
            .unwrap();
        (a, b)
    }

    #[tokio::test]
    async fn only_one_timer_may_run_at_a_time() {
        let db = setup_db().await;
        let (a, b) = seed_two_tasks(&db).await;

        let started = TimerService::start(&db, a.id).await.unwrap();
        assert_eq!(started.status, TaskStatus::InProgress);

        let err = TimerService::start(&db, b.id).await.unwrap_err();
        assert!(matches!(err, TimerError::AnotherTimerActive));

        // Pausing frees the slot for the other task.
        TimerService::pause(&db, a.id).await.unwrap();
        TimerService::start(&db, b.id).await.unwrap();
    }

    #[tokio::test]
    async fn completing_frees_the_slot_and_freezes_the_task() {
        let db = setup_db().await;
        let (a, b) = seed_two_tasks(&db).await;

        TimerService::start(&db, a.id).await.unwrap();
        let done = TimerService::complete(&db, a.id).await.unwrap();
        assert_eq!(done.status, TaskStatus::Completed);
        assert!(done.started_at.is_none());

        let profile = UserProfile::get_or_init(&db).await.unwrap();
        assert!(profile.active_task_id.is_none());

        let err = TimerService::start(&db, a.id).await.unwrap_err();
        assert!(matches!(err, TimerError::Task(TaskError::AlreadyCompleted)));

        // The failed restart must not leave the slot claimed.
        TimerService::start(&db, b.id).await.unwrap();
    }

    #[tokio::test]
    async fn deleting_the_running_task_frees_the_slot() {
        let db = setup_db().await;
        let (a, b) = seed_two_tasks(&db).await;

        TimerService::start(&db, a.id).await.unwrap();
        Task::delete(&db, a.id).await.unwrap();

        let profile = UserProfile::get_or_init(&db).await.unwrap();
        assert!(profile.active_task_id.is_none());

        TimerService::start(&db, b.id).await.unwrap();
    }

    #[tokio::test]
    async fn pause_without_running_timer_is_invalid() {
        let db = setup_db().await;
        let (a, _) = seed_two_tasks(&db).await;

        let err = TimerService::pause(&db, a.id).await.unwrap_err();
        assert!(matches!(err, TimerError::Task(TaskError::NoActiveTimer)));
    }
}
