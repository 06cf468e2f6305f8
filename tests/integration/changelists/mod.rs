//! Changelist and shelf endpoint integration tests

use axum::http::StatusCode;
use serde_json::json;

use crate::common::{error_code, id_of, Actor, ProjectFixture, TestApp};

mod test_shelves {
    use super::*;

    #[tokio::test]
    async fn test_linked_shelf_appears_on_changelist() {
        let app = TestApp::new();
        let fx = ProjectFixture::create(&app).await;
        let workspace_id = fx.workspace(&app).await;
        let (_, version_id) = fx.asset_with_version(&app, "sail").await;

        let (_, changelist) = app
            .post(
                "/v1/changelists",
                &fx.artist,
                json!({ "project_id": fx.project_id, "workspace_id": workspace_id }),
            )
            .await;
        let changelist_id = id_of(&changelist);
        assert!(changelist["shelf_id"].is_null());

        let (status, shelf) = app
            .post(
                "/v1/shelves",
                &fx.artist,
                json!({
                    "workspace_id": workspace_id,
                    "asset_version_id": version_id,
                    "changelist_id": changelist_id,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (_, view) = app
            .get(&format!("/v1/changelists/{}", changelist_id), &fx.artist)
            .await;
        assert_eq!(view["shelf_id"], shelf["id"]);

        let (_, shelves) = app
            .get(&format!("/v1/projects/{}/shelves", fx.project_id), &fx.artist)
            .await;
        assert_eq!(shelves.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_only_creator_or_admin_deletes_shelf() {
        let app = TestApp::new();
        let fx = ProjectFixture::create(&app).await;
        let workspace_id = fx.workspace(&app).await;
        let (_, version_id) = fx.asset_with_version(&app, "sail").await;

        let (_, shelf) = app
            .post(
                "/v1/shelves",
                &fx.artist,
                json!({ "workspace_id": workspace_id, "asset_version_id": version_id }),
            )
            .await;
        let uri = format!("/v1/shelves/{}", id_of(&shelf));

        let (status, _) = app.delete(&uri, &Actor::member()).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, body) = app.delete(&uri, &fx.artist).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(body.is_null());
        let (status, _) = app.delete(&uri, &fx.artist).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

mod test_changelists {
    use super::*;

    #[tokio::test]
    async fn test_item_rules() {
        let app = TestApp::new();
        let fx = ProjectFixture::create(&app).await;
        let workspace_id = fx.workspace(&app).await;
        let (_, version_id) = fx.asset_with_version(&app, "rope").await;

        let (_, changelist) = app
            .post(
                "/v1/changelists",
                &fx.artist,
                json!({
                    "project_id": fx.project_id,
                    "workspace_id": workspace_id,
                    "target_branch_id": fx.main_branch,
                }),
            )
            .await;
        let items_uri = format!("/v1/changelists/{}/items", id_of(&changelist));

        let (status, body) = app
            .post(
                &items_uri,
                &fx.artist,
                json!({ "asset_version_id": version_id, "action": "rename" }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error_code(&body), "INVALID_ARGUMENT");

        // Adding the same version twice replaces the item
        app.post(
            &items_uri,
            &fx.artist,
            json!({ "asset_version_id": version_id, "action": "add" }),
        )
        .await;
        let (_, view) = app
            .post(
                &items_uri,
                &fx.artist,
                json!({ "asset_version_id": version_id, "action": "edit" }),
            )
            .await;
        let items = view["items"].as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["action"], "edit");

        let (status, view) = app
            .delete(&format!("{}/{}", items_uri, id_of(&items[0])), &fx.artist)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["items"], json!([]));
    }

    #[tokio::test]
    async fn test_cancel_is_terminal() {
        let app = TestApp::new();
        let fx = ProjectFixture::create(&app).await;
        let workspace_id = fx.workspace(&app).await;

        let (_, changelist) = app
            .post(
                "/v1/changelists",
                &fx.artist,
                json!({ "project_id": fx.project_id, "workspace_id": workspace_id }),
            )
            .await;
        let cancel_uri = format!("/v1/changelists/{}/cancel", id_of(&changelist));

        let (status, view) = app
            .call(axum::http::Method::POST, &cancel_uri, &fx.artist, None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["status"], "cancelled");

        let (status, body) = app
            .call(axum::http::Method::POST, &cancel_uri, &fx.artist, None)
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(error_code(&body), "INVALID_STATE");
    }
}

mod test_workspace_ownership {
    use super::*;

    #[tokio::test]
    async fn test_other_member_cannot_write_to_workspace() {
        let app = TestApp::new();
        let fx = ProjectFixture::create(&app).await;
        let workspace_id = fx.workspace(&app).await;
        let (_, version_id) = fx.asset_with_version(&app, "lamp").await;
        let intruder = Actor::member();

        let (status, body) = app
            .post(
                "/v1/changelists",
                &intruder,
                json!({ "project_id": fx.project_id, "workspace_id": workspace_id }),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(error_code(&body), "PERMISSION_DENIED");

        let (status, _) = app
            .post(
                "/v1/shelves",
                &intruder,
                json!({ "workspace_id": workspace_id, "asset_version_id": version_id }),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (_, changelist) = app
            .post(
                "/v1/changelists",
                &fx.artist,
                json!({ "project_id": fx.project_id, "workspace_id": workspace_id }),
            )
            .await;
        let (status, _) = app
            .post(
                &format!("/v1/changelists/{}/items", id_of(&changelist)),
                &intruder,
                json!({ "asset_version_id": version_id, "action": "add" }),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        // Admins may act for the owner
        let (status, view) = app
            .post(
                &format!("/v1/changelists/{}/items", id_of(&changelist)),
                &fx.admin,
                json!({ "asset_version_id": version_id, "action": "add" }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["items"].as_array().unwrap().len(), 1);
    }
}
