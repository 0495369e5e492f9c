//! Infrastructure layer (adapters/implementations).
//!
//! This module contains the IO-heavy integrations: the `git` CLI, the agent
//! process used for generation and the user config file.

pub mod app_config;
pub mod generation;
pub mod git;
pub mod repository;
