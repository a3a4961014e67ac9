pub mod client;
pub mod error_log;
pub mod ids;
pub mod invoice;
pub mod pending_invoice;
pub mod profile;
pub mod project;
pub mod quota;
pub mod task;
