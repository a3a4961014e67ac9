pub mod client;
pub mod error_log;
pub mod invoice;
pub mod pending_invoice;
pub mod project;
pub mod quota_usage;
pub mod task;
pub mod user_profile;
