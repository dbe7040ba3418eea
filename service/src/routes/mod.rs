pub mod app;
pub mod manage;
