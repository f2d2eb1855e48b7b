use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::models::{NewReview, Provider, Review};
use crate::storage::{ProfileRepository, ReviewRepository};

const MIN_RATING: i32 = 1;
const MAX_RATING: i32 = 5;
const MAX_COMMENT_LENGTH: usize = 2000;

/// Provider listing and service reviews
pub struct Catalog {
    profiles: Arc<dyn ProfileRepository>,
    reviews: Arc<dyn ReviewRepository>,
}

impl Catalog {
    pub fn new(profiles: Arc<dyn ProfileRepository>, reviews: Arc<dyn ReviewRepository>) -> Self {
        Self { profiles, reviews }
    }

    pub async fn list_providers(&self) -> AppResult<Vec<Provider>> {
        self.profiles.list_providers().await
    }

    pub async fn provider(&self, provider_id: &str) -> AppResult<Provider> {
        self.profiles
            .provider(provider_id)
            .await?
            .ok_or_else(|| AppError::not_found("Provider not found"))
    }

    pub async fn create_review(&self, review: NewReview) -> AppResult<Review> {
        if review.customer_id.trim().is_empty() {
            return Err(AppError::validation("customerId is required"));
        }
        if review.service_id.trim().is_empty() {
            return Err(AppError::validation("serviceId is required"));
        }
        if !(MIN_RATING..=MAX_RATING).contains(&review.rating) {
            return Err(AppError::validation(format!(
                "rating must be between {} and {}",
                MIN_RATING, MAX_RATING
            )));
        }
        if let Some(comment) = &review.comment {
            if comment.chars().count() > MAX_COMMENT_LENGTH {
                return Err(AppError::validation(format!(
                    "comment exceeds maximum length of {} characters",
                    MAX_COMMENT_LENGTH
                )));
            }
        }

        let review = NewReview {
            comment: review.comment.filter(|c| !c.trim().is_empty()),
            ..review
        };
        self.reviews.insert_review(&review).await
    }

    pub async fn reviews_for_service(&self, service_id: &str) -> AppResult<Vec<Review>> {
        self.reviews.list_by_service(service_id).await
    }
}
