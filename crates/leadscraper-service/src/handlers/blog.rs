//! Blog handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use axum_extra::extract::WithRejection;
use serde::Deserialize;

use leadscraper_core::{BlogPost, BlogPostId};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Request body for `POST /api/blog-posts`.
#[derive(Debug, Deserialize)]
pub struct CreateBlogPostRequest {
    /// Post title.
    pub title: String,
    /// Post body.
    pub content: String,
}

/// All posts, newest first.
pub async fn list_blog_posts(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<BlogPost>>, ApiError> {
    Ok(Json(state.store.list_blog_posts().await?))
}

/// One post by ID.
pub async fn get_blog_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<BlogPost>, ApiError> {
    let not_found = || ApiError::NotFound(format!("blog post not found: {id}"));

    let post_id: BlogPostId = id.parse().map_err(|_| not_found())?;
    let post = state.store.get_blog_post(&post_id).await?.ok_or_else(not_found)?;

    Ok(Json(post))
}

/// Publish a post as the logged-in user.
pub async fn create_blog_post(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    WithRejection(Json(req), _): WithRejection<Json<CreateBlogPostRequest>, ApiError>,
) -> Result<(StatusCode, Json<BlogPost>), ApiError> {
    let post = BlogPost::new(&req.title, &req.content, auth.user.id)?;
    state.store.insert_blog_post(&post).await?;

    tracing::info!(post_id = %post.id, author_id = %auth.user.id, "Blog post created");
    Ok((StatusCode::CREATED, Json(post)))
}
