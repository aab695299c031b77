// src/lib.rs

pub mod agent;
pub mod config;
pub mod file_system;
pub mod llm;
pub mod safety;
pub mod state;
