use db::{DatabaseConnection, models::error_log::ErrorLog};

/// Best-effort durable error logging. Writes happen on a spawned task so the
/// primary workflow can never be blocked or failed by the log itself; a
/// failed write is only traced.
#[derive(Clone)]
pub struct ErrorLogService {
    conn: DatabaseConnection,
}

impl ErrorLogService {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub fn log(&self, service: &'static str, message: impl Into<String>) {
        let conn = self.conn.clone();
        let message = message.into();
        tracing::warn!(service, "{}", message);
        tokio::spawn(async move {
            if let Err(err) = ErrorLog::record(&conn, service, &message).await {
                tracing::error!(service, error = %err, "Failed to persist error log entry");
            }
        });
    }
}
