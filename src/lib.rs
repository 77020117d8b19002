// ABOUTME: Library crate for agentgrid exposing the public API for testing and embedding

#![allow(missing_docs)]

pub mod app;
pub mod changes;
pub mod cli;
pub mod components;
pub mod config;
pub mod error;
pub mod events;
pub mod models;
pub mod terminal;
pub mod usage;
