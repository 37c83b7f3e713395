pub mod builder;
pub mod education;
pub mod handlers;
pub mod memory_store;
pub mod models;
pub mod store;
