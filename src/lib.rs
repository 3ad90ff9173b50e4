//! Fountain Map Library
//!
//! This module exposes the load pipeline, filtering and presentation layers for
//! use by the binary and by integration tests.

pub mod app;
pub mod cache;
pub mod cli;
pub mod config;
pub mod data;
pub mod filter;
pub mod pipeline;
pub mod presenter;
pub mod refresh;
pub mod ui;
