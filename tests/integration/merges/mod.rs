//! Branch merge, conflict and merge job endpoint integration tests

use axum::http::StatusCode;
use serde_json::{json, Value};
use uuid::Uuid;

use depot_domain::entities::JobOutcome;

use crate::common::{error_code, id_of, ProjectFixture, TestApp};

async fn create_merge(app: &TestApp, fx: &ProjectFixture, flags: Value) -> Uuid {
    let mut body = json!({
        "source_branch_id": fx.feature_branch,
        "target_branch_id": fx.main_branch,
    });
    if let (Some(target), Some(extra)) = (body.as_object_mut(), flags.as_object()) {
        for (key, value) in extra {
            target.insert(key.clone(), value.clone());
        }
    }
    let (status, merge) = app
        .post(
            &format!("/v1/projects/{}/branch-merges", fx.project_id),
            &fx.artist,
            body,
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    id_of(&merge)
}

mod test_merges {
    use super::*;

    #[tokio::test]
    async fn test_create_seeds_jobs_in_order() {
        let app = TestApp::new();
        let fx = ProjectFixture::create(&app).await;
        let merge_id = create_merge(
            &app,
            &fx,
            json!({
                "auto_integrate": true,
                "stage_conflicts": true,
                "requires_submit_gate": true
            }),
        )
        .await;

        let (_, jobs) = app
            .get(&format!("/v1/branch-merges/{}/jobs", merge_id), &fx.artist)
            .await;
        let kinds: Vec<(String, String)> = jobs
            .as_array()
            .unwrap()
            .iter()
            .map(|j| {
                (
                    j["job_type"].as_str().unwrap().to_string(),
                    j["status"].as_str().unwrap().to_string(),
                )
            })
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("auto_integrate".to_string(), "queued".to_string()),
                ("conflict_staging".to_string(), "staged".to_string()),
                ("submit_gate".to_string(), "queued".to_string()),
            ]
        );
        assert_eq!(app.queue.recorded().len(), 2);
    }

    #[tokio::test]
    async fn test_merge_without_jobs_can_be_completed() {
        let app = TestApp::new();
        let fx = ProjectFixture::create(&app).await;
        let merge_id = create_merge(&app, &fx, json!({})).await;

        let (status, merge) = app
            .patch(
                &format!("/v1/branch-merges/{}", merge_id),
                &fx.artist,
                json!({ "status": "merged", "conflict_summary": { "assets": 0 } }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(merge["status"], "merged");
        assert_eq!(merge["conflict_summary"], json!({ "assets": 0 }));
    }

    #[tokio::test]
    async fn test_branches_must_belong_to_project() {
        let app = TestApp::new();
        let fx = ProjectFixture::create(&app).await;
        let (status, body) = app
            .post(
                &format!("/v1/projects/{}/branch-merges", fx.project_id),
                &fx.artist,
                json!({ "source_branch_id": Uuid::new_v4(), "target_branch_id": fx.main_branch }),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(error_code(&body), "NOT_FOUND");
    }
}

mod test_conflicts {
    use super::*;

    #[tokio::test]
    async fn test_open_conflict_blocks_completion_after_gate() {
        let app = TestApp::new();
        let fx = ProjectFixture::create(&app).await;
        let merge_id = create_merge(&app, &fx, json!({ "requires_submit_gate": true })).await;
        let merge_uri = format!("/v1/branch-merges/{}", merge_id);

        let (_, conflict) = app
            .post(
                &format!("/v1/branch-merges/{}/conflicts", merge_id),
                &fx.artist,
                json!({ "description": "mast height differs" }),
            )
            .await;

        // The gate passes but the open conflict keeps the merge pending
        assert_eq!(app.run_dispatched().await, vec![JobOutcome::Completed]);
        let (_, merge) = app.get(&merge_uri, &fx.artist).await;
        assert_eq!(merge["status"], "pending");

        let (status, body) = app
            .patch(&merge_uri, &fx.artist, json!({ "completed": true }))
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["details"]["unresolved_conflicts"], 1);

        let (status, resolved) = app
            .patch(
                &format!("/v1/merge-conflicts/{}", id_of(&conflict)),
                &fx.artist,
                json!({ "resolved": true, "resolution": "kept target" }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert!(resolved["resolved_at"].is_string());

        let (status, merge) = app
            .patch(&merge_uri, &fx.artist, json!({ "status": "merged" }))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(merge["status"], "merged");
        assert!(merge["completed_at"].is_string());
    }

    #[tokio::test]
    async fn test_failed_job_can_be_requeued() {
        let app = TestApp::new();
        let fx = ProjectFixture::create(&app).await;
        let merge_id = create_merge(&app, &fx, json!({ "auto_integrate": true })).await;

        let (_, conflict) = app
            .post(
                &format!("/v1/branch-merges/{}/conflicts", merge_id),
                &fx.artist,
                json!({ "description": "hull texture mismatch" }),
            )
            .await;
        assert_eq!(app.run_dispatched().await, vec![JobOutcome::Failed]);

        app.patch(
            &format!("/v1/merge-conflicts/{}", id_of(&conflict)),
            &fx.artist,
            json!({ "resolved": true }),
        )
        .await;

        let (_, jobs) = app
            .get(&format!("/v1/branch-merges/{}/jobs", merge_id), &fx.artist)
            .await;
        let (status, job) = app
            .patch(
                &format!("/v1/merge-jobs/{}", id_of(&jobs[0])),
                &fx.artist,
                json!({ "status": "queued" }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(job["status"], "queued");

        assert_eq!(app.run_dispatched().await, vec![JobOutcome::Completed]);
        let (_, job) = app
            .get(&format!("/v1/merge-jobs/{}", id_of(&jobs[0])), &fx.artist)
            .await;
        assert_eq!(job["status"], "completed");

        // Conflicted merges finalize once every job passes
        let (_, merge) = app
            .get(&format!("/v1/branch-merges/{}", merge_id), &fx.artist)
            .await;
        assert_eq!(merge["status"], "merged");
    }
}

mod test_jobs {
    use super::*;

    #[tokio::test]
    async fn test_staged_job_settled_by_operator() {
        let app = TestApp::new();
        let fx = ProjectFixture::create(&app).await;
        let merge_id = create_merge(&app, &fx, json!({})).await;

        let (status, job) = app
            .post(
                &format!("/v1/branch-merges/{}/jobs", merge_id),
                &fx.artist,
                json!({ "job_type": "conflict_staging", "status": "staged" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(app.queue.recorded().is_empty());

        let (status, job) = app
            .patch(
                &format!("/v1/merge-jobs/{}", id_of(&job)),
                &fx.artist,
                json!({ "status": "completed", "logs": "reviewed by lead" }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(job["status"], "completed");
        assert!(job["logs"].as_str().unwrap().ends_with("] reviewed by lead\n"));

        let (_, merge) = app
            .get(&format!("/v1/branch-merges/{}", merge_id), &fx.artist)
            .await;
        assert_eq!(merge["status"], "merged");
    }

    #[tokio::test]
    async fn test_invalid_job_updates() {
        let app = TestApp::new();
        let fx = ProjectFixture::create(&app).await;
        let merge_id = create_merge(&app, &fx, json!({ "auto_integrate": true })).await;
        let (_, jobs) = app
            .get(&format!("/v1/branch-merges/{}/jobs", merge_id), &fx.artist)
            .await;
        let uri = format!("/v1/merge-jobs/{}", id_of(&jobs[0]));

        let (status, _) = app.patch(&uri, &fx.artist, json!({})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = app
            .patch(&uri, &fx.artist, json!({ "submit_gate_passed": true }))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error_code(&body), "INVALID_ARGUMENT");

        assert_eq!(app.run_dispatched().await, vec![JobOutcome::Completed]);
        let (status, body) = app
            .patch(&uri, &fx.artist, json!({ "status": "failed" }))
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(error_code(&body), "INVALID_STATE");
    }
}
