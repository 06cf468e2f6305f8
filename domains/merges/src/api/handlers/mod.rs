//! HTTP handlers for branch merges, conflicts and merge jobs

pub mod conflicts;
pub mod jobs;
pub mod merges;
