pub mod api;
pub mod loose;
pub mod models;
