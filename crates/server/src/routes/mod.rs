pub mod clients;
pub mod errors;
pub mod health;
pub mod invoices;
pub mod profile;
pub mod projects;
pub mod quota;
pub mod stats;
pub mod tasks;
