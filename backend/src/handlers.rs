use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use capryos_shared::{
    listing::{PostFilter, TagInfo},
    site::{BlogListing, PostPage, SubscribeForm, SuggestionForm},
    BlogPost,
};
use serde::Serialize;

use crate::{error::ApiError, state::AppState};

#[derive(Debug, Serialize)]
pub struct PostListResponse {
    pub posts: Vec<BlogPost>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct TagsResponse {
    pub tags: Vec<TagInfo>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

pub async fn home_posts(State(state): State<AppState>) -> Result<Json<PostListResponse>, ApiError> {
    let posts = state
        .site
        .home_posts()
        .await
        .map_err(|err| ApiError::from_site(err, "Failed to load posts"))?;
    Ok(Json(PostListResponse {
        total: posts.len(),
        posts,
    }))
}

pub async fn list_posts(
    State(state): State<AppState>,
    Query(filter): Query<PostFilter>,
) -> Result<Json<BlogListing>, ApiError> {
    let listing = state
        .site
        .blog_listing(&filter)
        .await
        .map_err(|err| ApiError::from_site(err, "Failed to load posts"))?;
    Ok(Json(listing))
}

pub async fn get_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<PostPage>, ApiError> {
    let page = state
        .site
        .read_post(&slug)
        .await
        .map_err(|err| ApiError::from_site(err, "Failed to load post"))?;
    Ok(Json(page))
}

pub async fn list_tags(State(state): State<AppState>) -> Result<Json<TagsResponse>, ApiError> {
    let tags = state
        .site
        .tags()
        .await
        .map_err(|err| ApiError::from_site(err, "Failed to load tags"))?;
    Ok(Json(TagsResponse { tags }))
}

pub async fn subscribe(
    State(state): State<AppState>,
    Json(form): Json<SubscribeForm>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    state.site.subscribe(form).await?;
    Ok((
        StatusCode::CREATED,
        MessageResponse::new("Successfully subscribed to our newsletter!"),
    ))
}

pub async fn suggest(
    State(state): State<AppState>,
    Json(form): Json<SuggestionForm>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    state.site.suggest(form).await?;
    Ok((
        StatusCode::CREATED,
        MessageResponse::new("Thank you for your suggestion! We'll review it soon."),
    ))
}
