pub mod activity;
pub mod app;
pub mod cli;
pub mod config;
pub mod documents;
pub mod export;
pub mod library;
pub mod llm;
pub mod logging;
pub mod models;
pub mod program;
pub mod reset;
pub mod seed;
pub mod settings;
pub mod store;
pub mod ui;
