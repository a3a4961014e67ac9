use db::{DatabaseConnection, DbService};
use services::services::invoice::InvoiceService;

/// Shared handles threaded through every route.
#[derive(Clone)]
pub struct AppState {
    pub db: DbService,
    pub invoices: InvoiceService,
}

impl AppState {
    pub fn new(db: DbService) -> Self {
        let invoices = InvoiceService::new(db.conn.clone());
        Self { db, invoices }
    }

    pub fn conn(&self) -> &DatabaseConnection {
        &self.db.conn
    }
}
