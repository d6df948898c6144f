//! Admin console endpoints. Everything except [`login`] sits behind
//! [`crate::auth::require_auth`].

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use capryos_shared::{
    listing::{parse_status_filter, AdminPostFilter, SubscriberFilter, SuggestionFilter},
    site::{PostDraft, SubscriberList, SuggestionList},
    BlogPost, ContentSuggestion, DashboardSnapshot, PostStatus, Subscriber, SubscriberStatus,
    SuggestionStatus,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    auth::{verify_credentials, AdminSession},
    error::ApiError,
    handlers::{MessageResponse, PostListResponse},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub email: String,
    pub expires_at: DateTime<Utc>,
}

/// `q` plus the raw status dropdown value (`all` means any).
#[derive(Debug, Default, Deserialize)]
pub struct AdminListQuery {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SavePostRequest {
    #[serde(flatten)]
    pub draft: PostDraft,
    pub status: PostStatus,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate<S> {
    pub status: S,
}

#[derive(Debug, Deserialize)]
pub struct TagsUpdate {
    pub tags: Vec<String>,
}

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    if !state.config.admin_enabled() {
        return Err(ApiError::Unavailable(
            "Admin login is not configured".to_string(),
        ));
    }
    if !verify_credentials(&state.config, &request.email, &request.password) {
        tracing::warn!("rejected admin login");
        return Err(ApiError::Unauthorized);
    }

    let session = state
        .sessions
        .issue(&request.email.trim().to_lowercase(), state.config.session_ttl);
    tracing::info!(email = %session.email, expires_at = %session.expires_at, "admin signed in");
    Ok(Json(LoginResponse {
        token: session.token,
        email: session.email,
        expires_at: session.expires_at,
    }))
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(session): Extension<AdminSession>,
) -> StatusCode {
    state.sessions.revoke(&session.token);
    tracing::info!(email = %session.email, "admin signed out");
    StatusCode::NO_CONTENT
}

pub async fn dashboard(State(state): State<AppState>) -> Result<Json<DashboardSnapshot>, ApiError> {
    let snapshot = state
        .site
        .dashboard()
        .await
        .map_err(|err| ApiError::from_site(err, "Failed to load dashboard data"))?;
    Ok(Json(snapshot))
}

pub async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<AdminListQuery>,
) -> Result<Json<PostListResponse>, ApiError> {
    let filter = AdminPostFilter {
        q: query.q,
        status: parse_status(query.status.as_deref())?,
    };
    let posts = state
        .site
        .admin_posts(&filter)
        .await
        .map_err(|err| ApiError::from_site(err, "Failed to load posts"))?;
    Ok(Json(PostListResponse {
        total: posts.len(),
        posts,
    }))
}

pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<BlogPost>, ApiError> {
    let post = state
        .site
        .post(&id)
        .await
        .map_err(|err| ApiError::from_site(err, "Failed to load post"))?;
    Ok(Json(post))
}

pub async fn create_post(
    State(state): State<AppState>,
    Json(request): Json<SavePostRequest>,
) -> Result<(StatusCode, Json<BlogPost>), ApiError> {
    let post = state
        .site
        .save_post(None, request.draft, request.status)
        .await
        .map_err(|err| ApiError::from_site(err, "Failed to save post"))?;
    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<SavePostRequest>,
) -> Result<Json<BlogPost>, ApiError> {
    let post = state
        .site
        .save_post(Some(&id), request.draft, request.status)
        .await
        .map_err(|err| ApiError::from_site(err, "Failed to save post"))?;
    Ok(Json(post))
}

pub async fn set_post_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<StatusUpdate<PostStatus>>,
) -> Result<Json<BlogPost>, ApiError> {
    let post = state
        .site
        .set_post_status(&id, update.status)
        .await
        .map_err(|err| ApiError::from_site(err, "Failed to update post status"))?;
    Ok(Json(post))
}

pub async fn replace_post_tags(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<TagsUpdate>,
) -> Result<Json<BlogPost>, ApiError> {
    let post = state
        .site
        .replace_tags(&id, update.tags)
        .await
        .map_err(|err| ApiError::from_site(err, "Failed to update tags"))?;
    Ok(Json(post))
}

pub async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .site
        .delete_post(&id)
        .await
        .map_err(|err| ApiError::from_site(err, "Failed to delete post"))?;
    Ok(MessageResponse::new("Post deleted successfully"))
}

pub async fn list_subscribers(
    State(state): State<AppState>,
    Query(query): Query<AdminListQuery>,
) -> Result<Json<SubscriberList>, ApiError> {
    let filter = SubscriberFilter {
        q: query.q,
        status: parse_status(query.status.as_deref())?,
    };
    let list = state
        .site
        .subscribers(&filter)
        .await
        .map_err(|err| ApiError::from_site(err, "Failed to load subscribers"))?;
    Ok(Json(list))
}

pub async fn set_subscriber_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<StatusUpdate<SubscriberStatus>>,
) -> Result<Json<Subscriber>, ApiError> {
    let subscriber = state
        .site
        .set_subscriber_status(&id, update.status)
        .await
        .map_err(|err| ApiError::from_site(err, "Failed to update subscriber status"))?;
    Ok(Json(subscriber))
}

pub async fn delete_subscriber(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .site
        .delete_subscriber(&id)
        .await
        .map_err(|err| ApiError::from_site(err, "Failed to delete subscriber"))?;
    Ok(MessageResponse::new("Subscriber deleted successfully"))
}

pub async fn list_suggestions(
    State(state): State<AppState>,
    Query(query): Query<AdminListQuery>,
) -> Result<Json<SuggestionList>, ApiError> {
    let filter = SuggestionFilter {
        q: query.q,
        status: parse_status(query.status.as_deref())?,
    };
    let list = state
        .site
        .suggestions(&filter)
        .await
        .map_err(|err| ApiError::from_site(err, "Failed to load content suggestions"))?;
    Ok(Json(list))
}

pub async fn set_suggestion_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<StatusUpdate<SuggestionStatus>>,
) -> Result<Json<ContentSuggestion>, ApiError> {
    let suggestion = state
        .site
        .set_suggestion_status(&id, update.status)
        .await
        .map_err(|err| ApiError::from_site(err, "Failed to update suggestion status"))?;
    Ok(Json(suggestion))
}

pub async fn delete_suggestion(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .site
        .delete_suggestion(&id)
        .await
        .map_err(|err| ApiError::from_site(err, "Failed to delete suggestion"))?;
    Ok(MessageResponse::new("Suggestion deleted successfully"))
}

fn parse_status<T>(raw: Option<&str>) -> Result<Option<T>, ApiError>
where
    T: std::str::FromStr<Err = capryos_shared::UnknownStatus>,
{
    parse_status_filter(raw).map_err(|err| ApiError::BadRequest(err.to_string()))
}
