//! Domain entities for Asset Depot
//!
//! Each entity is an explicit record with typed fields, mapped to rows only
//! at the store boundary. Constructors validate shape; cross-entity rules
//! (same project, ownership) live in the domain services.

use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use std::str::FromStr;
use std::sync::LazyLock;
use uuid::Uuid;

use depot_common::{Error, Result};

use crate::state::{
    ChangelistEvent, ChangelistStateMachine, ChangelistStatus, MergeEvent, MergeJobEvent,
    MergeJobStateMachine, MergeJobStatus, MergeJobType, MergeStateMachine, MergeStatus,
};

static PROJECT_CODE: LazyLock<Regex> = LazyLock::new(|| {
    // Literal pattern, cannot fail
    Regex::new(r"^[A-Za-z0-9_-]{2,32}$").unwrap()
});

fn require_text(field: &str, value: &str, max: usize) -> Result<()> {
    if value.trim().is_empty() || value.len() > max {
        return Err(Error::InvalidArgument(format!(
            "{} must be 1-{} characters",
            field, max
        )));
    }
    Ok(())
}

/// Audit log line: `[<RFC3339 UTC>] message\n`
pub fn log_line(at: DateTime<Utc>, message: &str) -> String {
    format!(
        "[{}] {}\n",
        at.to_rfc3339_opts(SecondsFormat::Micros, true),
        message
    )
}

// =============================================================================
// Projects, branches, workspaces
// =============================================================================

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, Default,
)]
#[sqlx(type_name = "project_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    #[default]
    Planning,
    Active,
    OnHold,
    Completed,
    Archived,
}

/// Project entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub storage_quota_tb: Decimal,
    pub storage_provider: Option<String>,
    pub storage_location: Option<String>,
    pub archived_at: Option<DateTime<Utc>>,
    pub archived_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub const DEFAULT_QUOTA_TB: i64 = 10;

    pub fn new(name: String, code: String, description: Option<String>) -> Result<Self> {
        require_text("Project name", &name, 200)?;
        Self::validate_code(&code)?;

        let now = Utc::now();
        Ok(Project {
            id: Uuid::new_v4(),
            name,
            code,
            description,
            status: ProjectStatus::default(),
            storage_quota_tb: Decimal::new(Self::DEFAULT_QUOTA_TB, 0),
            storage_provider: None,
            storage_location: None,
            archived_at: None,
            archived_by: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn validate_code(code: &str) -> Result<()> {
        if !PROJECT_CODE.is_match(code) {
            return Err(Error::InvalidArgument(
                "Project code must be 2-32 letters, digits, '_' or '-'".to_string(),
            ));
        }
        Ok(())
    }

    pub fn set_quota(&mut self, quota_tb: Decimal) -> Result<()> {
        if quota_tb.is_sign_negative() {
            return Err(Error::InvalidArgument(
                "Storage quota cannot be negative".to_string(),
            ));
        }
        self.storage_quota_tb = quota_tb;
        Ok(())
    }

    /// Keep the first archive stamp, record who archived
    pub fn archive(&mut self, actor: Uuid) {
        if self.archived_at.is_none() {
            self.archived_at = Some(Utc::now());
        }
        self.archived_by = Some(actor);
    }

    pub fn unarchive(&mut self) {
        self.archived_at = None;
        self.archived_by = None;
    }

    pub fn is_archived(&self) -> bool {
        self.archived_at.is_some()
    }
}

/// Branch entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Branch {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub parent_branch_id: Option<Uuid>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Branch {
    pub fn new(
        project_id: Uuid,
        name: String,
        description: Option<String>,
        parent_branch_id: Option<Uuid>,
        created_by: Uuid,
    ) -> Result<Self> {
        require_text("Branch name", &name, 200)?;

        let now = Utc::now();
        Ok(Branch {
            id: Uuid::new_v4(),
            project_id,
            name,
            description,
            parent_branch_id,
            created_by,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn belongs_to(&self, project_id: Uuid) -> bool {
        self.project_id == project_id
    }
}

/// Workspace entity, owned by exactly one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Workspace {
    pub id: Uuid,
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub branch_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl Workspace {
    pub fn new(
        project_id: Uuid,
        user_id: Uuid,
        branch_id: Option<Uuid>,
        name: String,
        description: Option<String>,
    ) -> Result<Self> {
        require_text("Workspace name", &name, 200)?;

        Ok(Workspace {
            id: Uuid::new_v4(),
            project_id,
            user_id,
            branch_id,
            name,
            description,
            created_at: Utc::now(),
            last_synced_at: None,
        })
    }
}

// =============================================================================
// Assets, permissions, locks
// =============================================================================

/// Asset entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Asset {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub asset_type: String,
    pub metadata: Json<serde_json::Value>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Asset {
    pub fn new(
        project_id: Uuid,
        name: String,
        asset_type: String,
        metadata: serde_json::Value,
        created_by: Uuid,
    ) -> Result<Self> {
        require_text("Asset name", &name, 255)?;
        require_text("Asset type", &asset_type, 64)?;
        if !(metadata.is_object() || metadata.is_null()) {
            return Err(Error::InvalidArgument(
                "Asset metadata must be a JSON object".to_string(),
            ));
        }

        Ok(Asset {
            id: Uuid::new_v4(),
            project_id,
            name,
            asset_type,
            metadata: Json(if metadata.is_null() {
                serde_json::json!({})
            } else {
                metadata
            }),
            created_by,
            created_at: Utc::now(),
        })
    }
}

/// Asset version; `file_path` is an opaque blob-store locator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AssetVersion {
    pub id: Uuid,
    pub asset_id: Uuid,
    pub version_number: i32,
    pub branch_id: Option<Uuid>,
    pub file_path: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AssetVersion {
    pub fn new(
        asset_id: Uuid,
        version_number: i32,
        branch_id: Option<Uuid>,
        file_path: Option<String>,
        notes: Option<String>,
    ) -> Result<Self> {
        if version_number < 1 {
            return Err(Error::InvalidArgument(
                "Version number must be positive".to_string(),
            ));
        }

        Ok(AssetVersion {
            id: Uuid::new_v4(),
            asset_id,
            version_number,
            branch_id,
            file_path,
            notes,
            created_at: Utc::now(),
        })
    }
}

/// Asset with its versions, as returned by asset reads
#[derive(Debug, Clone, Serialize)]
pub struct AssetWithVersions {
    #[serde(flatten)]
    pub asset: Asset,
    pub versions: Vec<AssetVersion>,
}

/// Project-scoped permission, or an asset-scoped override when `asset_id` is set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Permission {
    pub id: Uuid,
    pub project_id: Uuid,
    pub asset_id: Option<Uuid>,
    pub user_id: Uuid,
    #[sqlx(rename = "can_read")]
    pub read: bool,
    #[sqlx(rename = "can_write")]
    pub write: bool,
    #[sqlx(rename = "can_delete")]
    pub delete: bool,
    pub created_at: DateTime<Utc>,
}

impl Permission {
    pub fn new(
        project_id: Uuid,
        asset_id: Option<Uuid>,
        user_id: Uuid,
        read: bool,
        write: bool,
        delete: bool,
    ) -> Self {
        Permission {
            id: Uuid::new_v4(),
            project_id,
            asset_id,
            user_id,
            read,
            write,
            delete,
            created_at: Utc::now(),
        }
    }

    pub fn is_asset_scoped(&self) -> bool {
        self.asset_id.is_some()
    }
}

/// Lock on an asset. At most one per asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AssetLock {
    pub id: Uuid,
    pub asset_id: Uuid,
    pub locked_by: Uuid,
    pub workspace_id: Option<Uuid>,
    pub locked_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl AssetLock {
    pub fn new(
        asset_id: Uuid,
        locked_by: Uuid,
        workspace_id: Option<Uuid>,
        expires_at: Option<DateTime<Utc>>,
        notes: Option<String>,
    ) -> Self {
        AssetLock {
            id: Uuid::new_v4(),
            asset_id,
            locked_by,
            workspace_id,
            locked_at: Utc::now(),
            expires_at,
            notes,
        }
    }

    /// Expiry is advisory; a lock without `expires_at` never lapses
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|expires| expires > now)
    }
}

/// Result of a lock request
#[derive(Debug, Clone, Serialize)]
pub struct LockOutcome {
    #[serde(flatten)]
    pub lock: AssetLock,
    /// Set when ownership was taken over from another user
    pub previous_holder: Option<Uuid>,
}

// =============================================================================
// Reviews
// =============================================================================

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, Default,
)]
#[sqlx(type_name = "review_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    #[default]
    Pending,
    Approved,
    ChangesRequested,
    Rejected,
}

/// Review of one asset version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AssetReview {
    pub id: Uuid,
    pub asset_version_id: Uuid,
    pub requested_by: Uuid,
    /// Unassigned reviews go to whoever answers first
    pub reviewer_id: Option<Uuid>,
    pub status: ReviewStatus,
    pub comments: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl AssetReview {
    pub fn new(
        asset_version_id: Uuid,
        requested_by: Uuid,
        reviewer_id: Option<Uuid>,
        comments: Option<String>,
    ) -> Self {
        AssetReview {
            id: Uuid::new_v4(),
            asset_version_id,
            requested_by,
            reviewer_id,
            status: ReviewStatus::Pending,
            comments,
            reviewed_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == ReviewStatus::Pending
    }

    /// Record a verdict. `comments` replaces the previous text, even when `None`.
    pub fn record(&mut self, reviewer: Uuid, status: ReviewStatus, comments: Option<String>) {
        self.reviewer_id = Some(reviewer);
        self.status = status;
        self.comments = comments;
        self.reviewed_at = Some(Utc::now());
    }
}

/// Review with the asset and version it covers
#[derive(Debug, Clone, Serialize)]
pub struct ReviewView {
    #[serde(flatten)]
    pub review: AssetReview,
    pub asset_id: Uuid,
    pub asset_name: String,
    pub version_number: i32,
}

// =============================================================================
// Shelves and changelists
// =============================================================================

/// Shelf: a parked snapshot of one asset version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Shelf {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub asset_version_id: Uuid,
    pub changelist_id: Option<Uuid>,
    pub created_by: Uuid,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Shelf {
    pub fn new(
        workspace_id: Uuid,
        asset_version_id: Uuid,
        changelist_id: Option<Uuid>,
        description: Option<String>,
        created_by: Uuid,
    ) -> Self {
        Shelf {
            id: Uuid::new_v4(),
            workspace_id,
            asset_version_id,
            changelist_id,
            created_by,
            description,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "change_action", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    Add,
    Edit,
    Delete,
    Integrate,
}

impl FromStr for ChangeAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "add" => Ok(ChangeAction::Add),
            "edit" => Ok(ChangeAction::Edit),
            "delete" => Ok(ChangeAction::Delete),
            "integrate" => Ok(ChangeAction::Integrate),
            other => Err(Error::InvalidArgument(format!(
                "Unsupported changelist action '{}'; expected add, edit, delete or integrate",
                other
            ))),
        }
    }
}

/// Changelist entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Changelist {
    pub id: Uuid,
    pub project_id: Uuid,
    pub workspace_id: Uuid,
    pub created_by: Uuid,
    pub target_branch_id: Option<Uuid>,
    pub status: ChangelistStatus,
    pub description: Option<String>,
    pub submitter_notes: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Changelist {
    pub fn new(
        project_id: Uuid,
        workspace_id: Uuid,
        created_by: Uuid,
        target_branch_id: Option<Uuid>,
        description: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Changelist {
            id: Uuid::new_v4(),
            project_id,
            workspace_id,
            created_by,
            target_branch_id,
            status: ChangelistStatus::Open,
            description,
            submitter_notes: None,
            submitted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn ensure_editable(&self) -> Result<()> {
        if !self.status.is_editable() {
            return Err(Error::InvalidState(format!(
                "Changelist is {} and no longer editable",
                self.status
            )));
        }
        Ok(())
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Submit or request review.
    ///
    /// Status is checked first, then the target branch, then the item count.
    pub fn submit(
        &mut self,
        desired: ChangelistStatus,
        submitter_notes: Option<String>,
        item_count: usize,
    ) -> Result<()> {
        let event = match desired {
            ChangelistStatus::Submitted => ChangelistEvent::Submit,
            ChangelistStatus::PendingReview => ChangelistEvent::RequestReview,
            other => {
                return Err(Error::InvalidArgument(format!(
                    "Cannot submit a changelist as {}; expected submitted or pending_review",
                    other
                )));
            }
        };

        let next = ChangelistStateMachine::transition(self.status, event).map_err(|_| {
            Error::InvalidState(format!(
                "Changelist is {} and cannot move to {}",
                self.status, desired
            ))
        })?;

        if self.target_branch_id.is_none() {
            return Err(Error::InvalidArgument(
                "Changelist requires a target branch before submission".to_string(),
            ));
        }
        if item_count == 0 {
            return Err(Error::InvalidArgument(
                "Changelist must contain at least one item before submission".to_string(),
            ));
        }

        let now = Utc::now();
        self.status = next;
        self.submitted_at = Some(now);
        self.submitter_notes = submitter_notes;
        self.updated_at = now;
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<()> {
        self.status = ChangelistStateMachine::transition(self.status, ChangelistEvent::Cancel)?;
        self.touch();
        Ok(())
    }
}

/// One asset-version change inside a changelist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ChangelistItem {
    pub id: Uuid,
    pub changelist_id: Uuid,
    pub asset_version_id: Uuid,
    pub action: ChangeAction,
    pub target_branch_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl ChangelistItem {
    pub fn new(
        changelist_id: Uuid,
        asset_version_id: Uuid,
        action: ChangeAction,
        target_branch_id: Option<Uuid>,
    ) -> Self {
        ChangelistItem {
            id: Uuid::new_v4(),
            changelist_id,
            asset_version_id,
            action,
            target_branch_id,
            created_at: Utc::now(),
        }
    }
}

/// Resolved read model of a changelist
#[derive(Debug, Clone, Serialize)]
pub struct ChangelistView {
    #[serde(flatten)]
    pub changelist: Changelist,
    /// Latest shelf linked to this changelist
    pub shelf_id: Option<Uuid>,
    /// Items in creation order
    pub items: Vec<ChangelistItem>,
}

// =============================================================================
// Branch merges, conflicts, jobs
// =============================================================================

/// Branch merge entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct BranchMerge {
    pub id: Uuid,
    pub project_id: Uuid,
    pub source_branch_id: Uuid,
    pub target_branch_id: Uuid,
    pub initiated_by: Uuid,
    pub status: MergeStatus,
    pub conflict_summary: Option<Json<serde_json::Value>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl BranchMerge {
    pub fn new(
        project_id: Uuid,
        source_branch_id: Uuid,
        target_branch_id: Uuid,
        initiated_by: Uuid,
        notes: Option<String>,
    ) -> Result<Self> {
        if source_branch_id == target_branch_id {
            return Err(Error::InvalidArgument(
                "Source and target branches must differ".to_string(),
            ));
        }

        let now = Utc::now();
        Ok(BranchMerge {
            id: Uuid::new_v4(),
            project_id,
            source_branch_id,
            target_branch_id,
            initiated_by,
            status: MergeStatus::Pending,
            conflict_summary: None,
            notes,
            created_at: now,
            updated_at: now,
            completed_at: None,
        })
    }

    /// Apply a status event; `merged` stamps completed_at once
    pub fn apply(&mut self, event: MergeEvent) -> Result<()> {
        let next = MergeStateMachine::transition(self.status, event)?;
        self.status = next;
        if next == MergeStatus::Merged {
            self.mark_completed();
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn mark_completed(&mut self) {
        if self.completed_at.is_none() {
            self.completed_at = Some(Utc::now());
        }
    }

    pub fn clear_completed(&mut self) {
        self.completed_at = None;
    }
}

/// Merge conflict; unresolved while `resolved_at` is null
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct MergeConflict {
    pub id: Uuid,
    pub branch_merge_id: Uuid,
    pub asset_id: Option<Uuid>,
    pub asset_version_id: Option<Uuid>,
    pub description: String,
    pub resolution: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl MergeConflict {
    pub fn new(
        branch_merge_id: Uuid,
        asset_id: Option<Uuid>,
        asset_version_id: Option<Uuid>,
        description: String,
    ) -> Result<Self> {
        require_text("Conflict description", &description, 4000)?;

        Ok(MergeConflict {
            id: Uuid::new_v4(),
            branch_merge_id,
            asset_id,
            asset_version_id,
            description,
            resolution: None,
            resolved_at: None,
            created_at: Utc::now(),
        })
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved_at.is_some()
    }

    pub fn set_resolved(&mut self, resolved: bool) {
        self.resolved_at = if resolved { Some(Utc::now()) } else { None };
    }
}

/// Merge job: one unit of asynchronous work on a merge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct MergeJob {
    pub id: Uuid,
    pub branch_merge_id: Uuid,
    pub job_type: MergeJobType,
    pub status: MergeJobStatus,
    pub conflict_snapshot: Option<Json<serde_json::Value>>,
    pub submit_gate_passed: bool,
    pub logs: String,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MergeJob {
    /// A new job is born `queued`, or `staged` when settled up front
    pub fn new(
        branch_merge_id: Uuid,
        job_type: MergeJobType,
        status: MergeJobStatus,
    ) -> Result<Self> {
        if !matches!(status, MergeJobStatus::Queued | MergeJobStatus::Staged) {
            return Err(Error::InvalidArgument(format!(
                "A merge job starts queued or staged, not {}",
                status
            )));
        }

        let now = Utc::now();
        let mut job = MergeJob {
            id: Uuid::new_v4(),
            branch_merge_id,
            job_type,
            status,
            conflict_snapshot: None,
            submit_gate_passed: false,
            logs: String::new(),
            started_at: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        };
        job.stamp();
        Ok(job)
    }

    pub fn is_gate(&self) -> bool {
        self.job_type == MergeJobType::SubmitGate
    }

    /// Apply a status event and keep the timestamps consistent
    pub fn apply(&mut self, event: MergeJobEvent) -> Result<()> {
        self.status = MergeJobStateMachine::transition(self.status, event)?;
        if event == MergeJobEvent::Requeue {
            self.completed_at = None;
        }
        self.stamp();
        Ok(())
    }

    pub fn succeed(&mut self, gate_passed: bool) -> Result<()> {
        self.apply(MergeJobEvent::Succeed)?;
        if self.is_gate() {
            self.submit_gate_passed = gate_passed;
        }
        Ok(())
    }

    pub fn fail(&mut self) -> Result<()> {
        self.apply(MergeJobEvent::Fail)
    }

    pub fn set_gate_passed(&mut self, passed: bool) -> Result<()> {
        if !self.is_gate() {
            return Err(Error::InvalidArgument(
                "submit_gate_passed can only be set on submit_gate jobs".to_string(),
            ));
        }
        self.submit_gate_passed = passed;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn append_log(&mut self, message: &str) {
        self.logs.push_str(&log_line(Utc::now(), message));
        self.updated_at = Utc::now();
    }

    fn stamp(&mut self) {
        let now = Utc::now();
        if self.status != MergeJobStatus::Queued && self.started_at.is_none() {
            self.started_at = Some(now);
        }
        if matches!(self.status, MergeJobStatus::Completed | MergeJobStatus::Failed)
            && self.completed_at.is_none()
        {
            self.completed_at = Some(now);
        }
        self.updated_at = now;
    }
}

/// Result of one executor run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobOutcome {
    /// The job was not queued; a duplicate dispatch
    Skipped,
    Completed,
    Failed,
}

impl std::fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobOutcome::Skipped => write!(f, "skipped"),
            JobOutcome::Completed => write!(f, "completed"),
            JobOutcome::Failed => write!(f, "failed"),
        }
    }
}
