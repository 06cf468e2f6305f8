//! End-to-end workflow scenarios over the HTTP surface
//!
//! Jobs are dispatched to a recording queue and then run through the
//! real merge job executor, so each scenario controls when work happens.

mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{error_code, id_of, Actor, ProjectFixture, TestApp};
use depot_domain::entities::JobOutcome;

#[tokio::test]
async fn test_submit_empty_changelist_is_rejected() {
    let app = TestApp::new();
    let fx = ProjectFixture::create(&app).await;
    let workspace_id = fx.workspace(&app).await;

    let (status, changelist) = app
        .post(
            "/v1/changelists",
            &fx.artist,
            json!({
                "project_id": fx.project_id,
                "workspace_id": workspace_id,
                "target_branch_id": fx.main_branch,
                "description": "relight harbor",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(changelist["status"], "open");
    assert_eq!(changelist["items"], json!([]));

    let (status, body) = app
        .post(
            &format!("/v1/changelists/{}/submit", id_of(&changelist)),
            &fx.artist,
            json!({}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "INVALID_ARGUMENT");
}

#[tokio::test]
async fn test_submit_gate_blocks_then_finalizes_merge() {
    let app = TestApp::new();
    let fx = ProjectFixture::create(&app).await;

    let (status, merge) = app
        .post(
            &format!("/v1/projects/{}/branch-merges", fx.project_id),
            &fx.artist,
            json!({
                "source_branch_id": fx.feature_branch,
                "target_branch_id": fx.main_branch,
                "requires_submit_gate": true,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let merge_id = id_of(&merge);

    let (_, jobs) = app
        .get(&format!("/v1/branch-merges/{}/jobs", merge_id), &fx.artist)
        .await;
    let jobs = jobs.as_array().unwrap().clone();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0]["job_type"], "submit_gate");
    assert_eq!(jobs[0]["status"], "queued");

    // Completing before the gate job runs is refused
    let (status, body) = app
        .patch(
            &format!("/v1/branch-merges/{}", merge_id),
            &fx.artist,
            json!({ "status": "merged" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "FAILED_PRECONDITION");

    let outcomes = app.run_dispatched().await;
    assert_eq!(outcomes, vec![JobOutcome::Completed]);

    let (_, job) = app
        .get(&format!("/v1/merge-jobs/{}", id_of(&jobs[0])), &fx.artist)
        .await;
    assert_eq!(job["status"], "completed");
    assert_eq!(job["submit_gate_passed"], true);
    assert!(!job["logs"].as_str().unwrap().is_empty());

    let (_, merge) = app
        .get(&format!("/v1/branch-merges/{}", merge_id), &fx.artist)
        .await;
    assert_eq!(merge["status"], "merged");
    assert!(merge["completed_at"].is_string());
}

#[tokio::test]
async fn test_auto_integrate_with_unresolved_conflict_marks_conflicted() {
    let app = TestApp::new();
    let fx = ProjectFixture::create(&app).await;
    let (asset_id, _) = fx.asset_with_version(&app, "pier_albedo").await;

    let (status, merge) = app
        .post(
            &format!("/v1/projects/{}/branch-merges", fx.project_id),
            &fx.artist,
            json!({
                "source_branch_id": fx.feature_branch,
                "target_branch_id": fx.main_branch,
                "auto_integrate": true,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let merge_id = id_of(&merge);

    let (status, _) = app
        .post(
            &format!("/v1/branch-merges/{}/conflicts", merge_id),
            &fx.artist,
            json!({ "asset_id": asset_id, "description": "both branches repainted the pier" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let outcomes = app.run_dispatched().await;
    assert_eq!(outcomes, vec![JobOutcome::Failed]);

    let (_, jobs) = app
        .get(&format!("/v1/branch-merges/{}/jobs", merge_id), &fx.artist)
        .await;
    assert_eq!(jobs[0]["job_type"], "auto_integrate");
    assert_eq!(jobs[0]["status"], "failed");

    let (_, merge) = app
        .get(&format!("/v1/branch-merges/{}", merge_id), &fx.artist)
        .await;
    assert_eq!(merge["status"], "conflicted");
}

#[tokio::test]
async fn test_relock_takes_ownership_from_previous_holder() {
    let app = TestApp::new();
    let fx = ProjectFixture::create(&app).await;
    let (asset_id, _) = fx.asset_with_version(&app, "crane").await;
    let first = Actor::member();
    let second = Actor::member();

    let (status, lock) = app
        .post("/v1/locks", &first, json!({ "asset_id": asset_id }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(lock["locked_by"], first.id.to_string());
    assert!(lock["previous_holder"].is_null());

    let (status, lock) = app
        .post(
            "/v1/locks",
            &second,
            json!({ "asset_id": asset_id, "notes": "taking over rigging" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(lock["locked_by"], second.id.to_string());
    assert_eq!(lock["previous_holder"], first.id.to_string());

    let (status, body) = app
        .delete(&format!("/v1/locks/{}", asset_id), &first)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body), "PERMISSION_DENIED");

    // An admin may release anyone's lock
    let (status, _) = app
        .delete(&format!("/v1/locks/{}", asset_id), &fx.admin)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, locks) = app
        .get(&format!("/v1/projects/{}/locks", fx.project_id), &first)
        .await;
    assert_eq!(locks, json!([]));
}

#[tokio::test]
async fn test_full_changelist_submission() {
    let app = TestApp::new();
    let fx = ProjectFixture::create(&app).await;
    let workspace_id = fx.workspace(&app).await;
    let (_, version_id) = fx.asset_with_version(&app, "lamp").await;

    let (_, changelist) = app
        .post(
            "/v1/changelists",
            &fx.artist,
            json!({
                "project_id": fx.project_id,
                "workspace_id": workspace_id,
                "description": "lamp pass",
            }),
        )
        .await;
    let id = id_of(&changelist);

    let (status, view) = app
        .post(
            &format!("/v1/changelists/{}/items", id),
            &fx.artist,
            json!({ "asset_version_id": version_id, "action": "add" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["items"].as_array().unwrap().len(), 1);

    // No target branch yet
    let (status, _) = app
        .post(&format!("/v1/changelists/{}/submit", id), &fx.artist, json!({}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .patch(
            &format!("/v1/changelists/{}", id),
            &fx.artist,
            json!({ "target_branch_id": fx.main_branch }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, submitted) = app
        .post(
            &format!("/v1/changelists/{}/submit", id),
            &fx.artist,
            json!({ "submitter_notes": "ready" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(submitted["status"], "submitted");
    assert!(submitted["submitted_at"].is_string());

    // Submitted changelists are frozen
    let (status, body) = app
        .post(
            &format!("/v1/changelists/{}/items", id),
            &fx.artist,
            json!({ "asset_version_id": version_id, "action": "edit" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_code(&body), "INVALID_STATE");
}
