//! Catalog endpoint integration tests
//!
//! Projects, branches, workspaces, assets (including multipart upload),
//! permissions, locks and reviews.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use serde_json::json;

use depot_common::LockPolicy;

use crate::common::{error_code, id_of, Actor, ProjectFixture, TestApp};

mod test_auth {
    use super::*;

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let app = TestApp::new();
        let request = Request::get("/v1/projects").body(Body::empty()).unwrap();
        let (status, _) = app.send(request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_token_signed_with_other_secret_is_rejected() {
        let app = TestApp::new();
        let actor = Actor::member();
        let token = crate::common::create_test_jwt(&actor, "not-the-secret");
        let request = Request::get("/v1/projects")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();
        let (status, _) = app.send(request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_health_needs_no_token() {
        let app = TestApp::new();
        let request = Request::get("/health").body(Body::empty()).unwrap();
        let (status, body) = app.send(request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "ok" }));
    }
}

mod test_projects {
    use super::*;

    #[tokio::test]
    async fn test_member_cannot_create_project() {
        let app = TestApp::new();
        let (status, _) = app
            .post(
                "/v1/projects",
                &Actor::member(),
                json!({ "name": "Quay", "code": "QUAY" }),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_duplicate_code_is_bad_request() {
        let app = TestApp::new();
        let fx = ProjectFixture::create(&app).await;
        let (status, body) = app
            .post(
                "/v1/projects",
                &fx.admin,
                json!({ "name": "Harbor again", "code": "HBR" }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error_code(&body), "INVALID_ARGUMENT");
    }

    #[tokio::test]
    async fn test_archived_projects_hidden_by_default() {
        let app = TestApp::new();
        let fx = ProjectFixture::create(&app).await;
        let (status, project) = app
            .patch(
                &format!("/v1/projects/{}", fx.project_id),
                &fx.admin,
                json!({ "archived": true, "storage_quota_tb": "2.5" }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(project["archived_by"], fx.admin.id.to_string());
        assert_eq!(project["storage_quota_tb"], "2.5");

        let (_, listed) = app.get("/v1/projects", &fx.artist).await;
        assert_eq!(listed, json!([]));
        let (_, listed) = app
            .get("/v1/projects?include_archived=true", &fx.artist)
            .await;
        assert_eq!(listed.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_update_is_bad_request() {
        let app = TestApp::new();
        let fx = ProjectFixture::create(&app).await;
        let (status, _) = app
            .patch(&format!("/v1/projects/{}", fx.project_id), &fx.admin, json!({}))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

mod test_workspaces {
    use super::*;

    #[tokio::test]
    async fn test_workspaces_visible_to_owner_and_admin() {
        let app = TestApp::new();
        let fx = ProjectFixture::create(&app).await;
        let workspace_id = fx.workspace(&app).await;
        let stranger = Actor::member();

        let uri = format!("/v1/workspaces/{}", workspace_id);
        let (status, _) = app.get(&uri, &stranger).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _) = app.get(&uri, &fx.admin).await;
        assert_eq!(status, StatusCode::OK);

        let list = format!("/v1/projects/{}/workspaces", fx.project_id);
        let (_, visible) = app.get(&list, &stranger).await;
        assert_eq!(visible, json!([]));
        let (_, visible) = app.get(&list, &fx.artist).await;
        assert_eq!(visible.as_array().unwrap().len(), 1);
    }
}

mod test_assets {
    use super::*;

    const BOUNDARY: &str = "depot-boundary";

    fn multipart_body(filename: &str, content: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
                filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    #[tokio::test]
    async fn test_get_asset_lists_versions_newest_first() {
        let app = TestApp::new();
        let fx = ProjectFixture::create(&app).await;
        let (asset_id, _) = fx.asset_with_version(&app, "buoy").await;
        let (status, _) = app
            .post(
                &format!("/v1/assets/{}/versions", asset_id),
                &fx.artist,
                json!({ "version_number": 2 }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (_, asset) = app.get(&format!("/v1/assets/{}", asset_id), &fx.artist).await;
        assert_eq!(asset["asset_type"], "texture");
        let numbers: Vec<i64> = asset["versions"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v["version_number"].as_i64().unwrap())
            .collect();
        assert_eq!(numbers, vec![2, 1]);

        let (status, body) = app
            .post(
                &format!("/v1/assets/{}/versions", asset_id),
                &fx.artist,
                json!({ "version_number": 2 }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error_code(&body), "INVALID_ARGUMENT");
    }

    #[tokio::test]
    async fn test_upload_stores_locator_on_version() {
        let app = TestApp::new();
        let fx = ProjectFixture::create(&app).await;
        let (asset_id, _) = fx.asset_with_version(&app, "buoy").await;

        let request = Request::post(format!(
            "/v1/assets/{}/versions/upload?version_number=1&notes=baked",
            asset_id
        ))
        .header(header::AUTHORIZATION, format!("Bearer {}", fx.artist.token()))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body("buoy.png", b"PNGDATA")))
        .unwrap();
        let (status, version) = app.send(request).await;
        assert_eq!(status, StatusCode::CREATED);

        let stored = app.blobs.stored();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].bytes, b"PNGDATA");
        assert_eq!(stored[0].filename, "buoy.png");
        assert_eq!(version["file_path"], stored[0].locator.as_str());
        assert_eq!(version["version_number"], 1);
        assert_eq!(version["notes"], "baked");
    }

    #[tokio::test]
    async fn test_upload_without_file_field_is_rejected() {
        let app = TestApp::new();
        let fx = ProjectFixture::create(&app).await;
        let (asset_id, _) = fx.asset_with_version(&app, "buoy").await;

        let body = format!("--{}--\r\n", BOUNDARY);
        let request = Request::post(format!(
            "/v1/assets/{}/versions/upload?version_number=3",
            asset_id
        ))
        .header(header::AUTHORIZATION, format!("Bearer {}", fx.artist.token()))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap();
        let (status, _) = app.send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(app.blobs.stored().is_empty());
    }
}

mod test_permissions {
    use super::*;

    #[tokio::test]
    async fn test_permission_lifecycle() {
        let app = TestApp::new();
        let fx = ProjectFixture::create(&app).await;
        let uri = format!("/v1/projects/{}/permissions", fx.project_id);
        let grant = json!({
            "project_id": fx.project_id,
            "user_id": fx.artist.id,
            "read": true,
        });

        let (status, _) = app.post(&uri, &fx.artist, grant.clone()).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, permission) = app.post(&uri, &fx.admin, grant).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(permission["read"], true);
        assert_eq!(permission["write"], false);
        let permission_id = id_of(&permission);

        let (status, updated) = app
            .call(
                axum::http::Method::PUT,
                &format!("/v1/permissions/{}", permission_id),
                &fx.admin,
                Some(json!({ "write": true })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["write"], true);

        let (status, _) = app
            .delete(&format!("/v1/permissions/{}", permission_id), &fx.admin)
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = app
            .delete(&format!("/v1/permissions/{}", permission_id), &fx.admin)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_payload_project_mismatch() {
        let app = TestApp::new();
        let fx = ProjectFixture::create(&app).await;
        let (status, _) = app
            .post(
                &format!("/v1/projects/{}/permissions", fx.project_id),
                &fx.admin,
                json!({ "project_id": uuid::Uuid::new_v4(), "user_id": fx.artist.id }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

mod test_locks {
    use super::*;

    #[tokio::test]
    async fn test_reject_live_policy_returns_conflict() {
        let app = TestApp::with_lock_policy(LockPolicy::RejectLive);
        let fx = ProjectFixture::create(&app).await;
        let (asset_id, _) = fx.asset_with_version(&app, "crane").await;
        let other = Actor::member();

        let (status, _) = app
            .post("/v1/locks", &fx.artist, json!({ "asset_id": asset_id }))
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = app
            .post("/v1/locks", &other, json!({ "asset_id": asset_id }))
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(error_code(&body), "FAILED_PRECONDITION");
        assert_eq!(body["error"]["details"]["locked_by"], fx.artist.id.to_string());
    }

    #[tokio::test]
    async fn test_release_unlocked_asset_is_not_found() {
        let app = TestApp::new();
        let fx = ProjectFixture::create(&app).await;
        let (asset_id, _) = fx.asset_with_version(&app, "crane").await;
        let (status, _) = app
            .delete(&format!("/v1/locks/{}", asset_id), &fx.artist)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

mod test_reviews {
    use super::*;

    #[tokio::test]
    async fn test_review_lifecycle() {
        let app = TestApp::new();
        let fx = ProjectFixture::create(&app).await;
        let (asset_id, version_id) = fx.asset_with_version(&app, "sail").await;
        let lead = Actor::member();

        let (status, review) = app
            .post(
                &format!("/v1/asset-versions/{}/reviews", version_id),
                &fx.artist,
                json!({ "reviewer_id": lead.id }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(review["status"], "pending");
        assert_eq!(review["asset_id"], asset_id.to_string());
        assert_eq!(review["asset_name"], "sail");
        assert_eq!(review["version_number"], 1);
        let review_id = id_of(&review);

        let (status, pending) = app.get("/v1/reviews/pending", &fx.admin).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(pending.as_array().unwrap().len(), 1);

        let uri = format!("/v1/reviews/{}", review_id);
        let (status, body) = app
            .patch(&uri, &fx.artist, json!({ "status": "approved" }))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(error_code(&body), "PERMISSION_DENIED");

        let (status, review) = app
            .patch(
                &uri,
                &lead,
                json!({ "status": "changes_requested", "comments": "UVs stretch" }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(review["status"], "changes_requested");
        assert_eq!(review["comments"], "UVs stretch");
        assert!(!review["reviewed_at"].is_null());

        let (_, pending) = app.get("/v1/reviews/pending", &fx.admin).await;
        assert!(pending.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_review_is_not_found() {
        let app = TestApp::new();
        let fx = ProjectFixture::create(&app).await;
        let (status, _) = app
            .patch(
                &format!("/v1/reviews/{}", uuid::Uuid::new_v4()),
                &fx.admin,
                json!({ "status": "rejected" }),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = app
            .post(
                &format!("/v1/asset-versions/{}/reviews", uuid::Uuid::new_v4()),
                &fx.artist,
                json!({}),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unknown_verdict_is_rejected() {
        let app = TestApp::new();
        let fx = ProjectFixture::create(&app).await;
        let (_, version_id) = fx.asset_with_version(&app, "sail").await;
        let (_, review) = app
            .post(
                &format!("/v1/asset-versions/{}/reviews", version_id),
                &fx.artist,
                json!({}),
            )
            .await;

        let (status, _) = app
            .patch(
                &format!("/v1/reviews/{}", id_of(&review)),
                &fx.admin,
                json!({ "status": "maybe" }),
            )
            .await;
        assert!(status.is_client_error());
    }
}
