pub mod api;
pub mod config;
pub mod error;
pub mod llm;
pub mod models;
pub mod ocr;
pub mod processing;
pub mod services;
