//! Asset version reviews
//!
//! A review starts pending. Its assigned reviewer (or an admin) records the
//! verdict; an unassigned review goes to whoever answers it.

use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use depot_auth::AuthContext;
use depot_common::{Error, Result};
use depot_db::UnitOfWork;
use depot_domain::entities::{AssetReview, ReviewStatus, ReviewView};

use super::{require_asset, CatalogService};

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct RequestReviewRequest {
    pub reviewer_id: Option<Uuid>,
    #[validate(length(max = 4000))]
    pub comments: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateReviewRequest {
    pub status: ReviewStatus,
    #[validate(length(max = 4000))]
    pub comments: Option<String>,
}

async fn review_view(uow: &mut dyn UnitOfWork, review: AssetReview) -> Result<ReviewView> {
    let version = uow
        .find_asset_version(review.asset_version_id)
        .await?
        .ok_or_else(|| Error::NotFound("Asset version not found".to_string()))?;
    let asset = require_asset(uow, version.asset_id).await?;
    Ok(ReviewView {
        review,
        asset_id: asset.id,
        asset_name: asset.name,
        version_number: version.version_number,
    })
}

impl CatalogService {
    pub async fn request_review(
        &self,
        actor: &AuthContext,
        asset_version_id: Uuid,
        request: RequestReviewRequest,
    ) -> Result<ReviewView> {
        let mut uow = self.store.begin(actor).await?;
        if uow.find_asset_version(asset_version_id).await?.is_none() {
            return Err(Error::NotFound("Asset version not found".to_string()));
        }

        let review = AssetReview::new(
            asset_version_id,
            actor.user_id,
            request.reviewer_id,
            request.comments,
        );
        uow.insert_asset_review(&review).await?;
        let view = review_view(uow.as_mut(), review).await?;
        uow.commit().await?;

        tracing::info!(
            review_id = %view.review.id,
            asset_version_id = %asset_version_id,
            "Review requested"
        );
        Ok(view)
    }

    pub async fn list_pending_reviews(&self, actor: &AuthContext) -> Result<Vec<ReviewView>> {
        let mut uow = self.store.begin(actor).await?;
        let reviews = uow.list_pending_reviews().await?;
        let mut views = Vec::with_capacity(reviews.len());
        for review in reviews {
            views.push(review_view(uow.as_mut(), review).await?);
        }
        uow.commit().await?;
        Ok(views)
    }

    /// Record a verdict; the actor becomes the review's reviewer
    pub async fn update_review(
        &self,
        actor: &AuthContext,
        review_id: Uuid,
        request: UpdateReviewRequest,
    ) -> Result<ReviewView> {
        let mut uow = self.store.begin(actor).await?;
        let mut review = uow
            .find_asset_review(review_id)
            .await?
            .ok_or_else(|| Error::NotFound("Review not found".to_string()))?;
        if let Some(reviewer) = review.reviewer_id {
            actor.require_owner_or_admin(reviewer, "review")?;
        }

        review.record(actor.user_id, request.status, request.comments);
        uow.update_asset_review(&review).await?;
        let view = review_view(uow.as_mut(), review).await?;
        uow.commit().await?;

        tracing::info!(
            review_id = %review_id,
            status = ?view.review.status,
            reviewer_id = %actor.user_id,
            "Review updated"
        );
        Ok(view)
    }
}
