//! HTTP handlers for changelists and shelves

pub mod changelists;
pub mod shelves;
