pub mod api;
pub mod json;
pub mod models;
pub mod query;
pub mod serde;
