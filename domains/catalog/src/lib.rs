//! Catalog domain: projects, branches, workspaces, assets, permissions, locks, reviews

pub mod api;
pub mod blob;
pub mod service;

pub use api::{routes, CatalogState};
pub use blob::{BlobStore, FsBlobStore, MockBlobStore, StoredBlob};
pub use service::{
    CatalogService, CreateAssetRequest, CreateBranchRequest, CreatePermissionRequest,
    CreateProjectRequest, CreateVersionRequest, CreateWorkspaceRequest, LockRequest,
    RequestReviewRequest, UpdateBranchRequest, UpdatePermissionRequest, UpdateProjectRequest,
    UpdateReviewRequest, UploadVersionParams,
};
