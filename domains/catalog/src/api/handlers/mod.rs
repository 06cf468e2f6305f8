//! HTTP handlers for the catalog resources

pub mod assets;
pub mod branches;
pub mod locks;
pub mod permissions;
pub mod projects;
pub mod reviews;
pub mod workspaces;
