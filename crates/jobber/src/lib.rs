//! Core library for the jobber orchestration service: configuration,
//! telemetry, and the job-application workflow engine.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
