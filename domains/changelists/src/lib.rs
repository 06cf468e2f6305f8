//! Changelists domain: shelves, changelists and changelist items

pub mod api;
pub mod service;

pub use api::{routes, ChangelistsState};
pub use service::{
    AddItemRequest, ChangelistService, CreateChangelistRequest, CreateShelfRequest,
    SubmitChangelistRequest, UpdateChangelistRequest,
};
