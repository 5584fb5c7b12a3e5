pub mod export_queries;
pub mod health_queries;
pub mod log_queries;
