// src/models/mod.rs
pub mod agent;
pub mod command;
pub mod frames;
