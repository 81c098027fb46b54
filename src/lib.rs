pub mod api;
pub mod app;
pub mod cache;
pub mod cli;
pub mod commands;
pub mod config;
pub mod event;
pub mod forms;
pub mod logging;
pub mod notify;
pub mod query;
pub mod services;
pub mod ui;
