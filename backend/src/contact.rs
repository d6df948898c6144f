//! Contact form relay.
//!
//! The form is forwarded as `application/x-www-form-urlencoded` to the
//! configured endpoint, tagged with `form-name=contact`. Submissions that fill
//! the `bot-field` honeypot are acknowledged without being relayed.

use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};

use crate::{error::ApiError, handlers::MessageResponse, state::AppState};

const FORM_NAME: &str = "contact";
const RELAY_FAILED: &str = "There was an error submitting the form. Please try again.";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub subject: String,
    pub message: String,
    #[serde(default, rename = "bot-field")]
    pub bot_field: String,
}

#[derive(Debug, Serialize)]
struct RelayBody<'a> {
    #[serde(rename = "form-name")]
    form_name: &'a str,
    name: &'a str,
    email: &'a str,
    subject: &'a str,
    message: &'a str,
}

pub async fn submit_contact(
    State(state): State<AppState>,
    Json(form): Json<ContactForm>,
) -> Result<Json<MessageResponse>, ApiError> {
    let name = form.name.trim();
    let email = form.email.trim();
    let message = form.message.trim();
    if name.is_empty() || email.is_empty() || message.is_empty() {
        return Err(ApiError::BadRequest(
            "Please fill in name, email and message.".to_string(),
        ));
    }

    if !form.bot_field.trim().is_empty() {
        tracing::info!("contact honeypot triggered, dropping submission");
        return Ok(MessageResponse::new("Thanks for reaching out!"));
    }

    let Some(endpoint) = state.config.contact_endpoint.as_deref() else {
        return Err(ApiError::Unavailable(
            "The contact form is not available right now.".to_string(),
        ));
    };

    let body = RelayBody {
        form_name: FORM_NAME,
        name,
        email,
        subject: form.subject.trim(),
        message,
    };
    let response = state
        .http
        .post(endpoint)
        .form(&body)
        .send()
        .await
        .map_err(|err| ApiError::internal(RELAY_FAILED, err))?;

    let status = response.status();
    if !status.is_success() {
        return Err(ApiError::internal(
            RELAY_FAILED,
            anyhow::anyhow!("contact endpoint answered {status}"),
        ));
    }

    tracing::info!(%status, "contact form relayed");
    Ok(MessageResponse::new("Thanks for reaching out!"))
}
