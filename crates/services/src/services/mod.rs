pub mod error_log;
pub mod external;
pub mod invoice;
pub mod quota;
pub mod timer;
