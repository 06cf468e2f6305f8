//! Merges domain: branch merges, conflicts, merge jobs and the job executor

pub mod api;
pub mod executor;
pub mod service;

pub use api::{routes, MergesState};
pub use executor::MergeJobExecutor;
pub use service::{
    CreateConflictRequest, CreateJobRequest, CreateMergeRequest, MergeService,
    UpdateConflictRequest, UpdateJobRequest, UpdateMergeRequest,
};
