pub mod activity;
pub mod aggregate;
pub mod enrollment;
pub mod grade;
pub mod import;
pub mod report;
pub mod store;
pub mod types;
