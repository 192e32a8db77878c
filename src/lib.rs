// src/lib.rs

pub mod classifier;
pub mod coach;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod llm;
pub mod providers;
pub mod server;
pub mod session;
