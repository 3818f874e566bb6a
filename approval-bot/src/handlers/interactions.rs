//! The Discord interactions webhook endpoint.

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    Json,
};
use service_core::error::AppError;

use crate::discord::{
    Interaction, InteractionResponse, MessageBody, INTERACTION_APPLICATION_COMMAND,
    INTERACTION_MESSAGE_COMPONENT, INTERACTION_PING,
};
use crate::dispatcher::{mass_pending_warning, MAX_INDIVIDUAL_ALERTS};
use crate::startup::AppState;

pub const COMMAND_NAME: &str = "tailscale-approve";

const SIGNATURE_HEADER: &str = "x-signature-ed25519";
const TIMESTAMP_HEADER: &str = "x-signature-timestamp";

/// POST /interactions - signed interaction deliveries from Discord.
///
/// The signature is checked against the raw body before any parsing; the
/// interaction response is returned synchronously as the webhook response.
pub async fn interactions(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<InteractionResponse>, AppError> {
    let signature = header_str(&headers, SIGNATURE_HEADER)?;
    let timestamp = header_str(&headers, TIMESTAMP_HEADER)?;

    state
        .verifier
        .verify(signature, timestamp, &body)
        .map_err(|e| AppError::Unauthorized(anyhow::anyhow!("invalid request signature: {}", e)))?;

    let interaction: Interaction = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(anyhow::anyhow!("malformed interaction payload: {}", e)))?;

    let response = match interaction.kind {
        INTERACTION_PING => InteractionResponse::pong(),
        INTERACTION_APPLICATION_COMMAND => handle_command(&state, &interaction).await,
        INTERACTION_MESSAGE_COMPONENT => {
            let data = interaction.data.as_ref();
            let custom_id = data.and_then(|d| d.custom_id.as_deref()).unwrap_or("");
            let values = data.map(|d| d.values.as_slice()).unwrap_or(&[]);
            state
                .workflow
                .handle_component(custom_id, values, interaction.username())
                .await
        }
        _ => InteractionResponse::deferred_update(),
    };

    Ok(Json(response))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str, AppError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("missing {} header", name)))
}

async fn handle_command(state: &AppState, interaction: &Interaction) -> InteractionResponse {
    let name = interaction
        .data
        .as_ref()
        .and_then(|d| d.name.as_deref())
        .unwrap_or("");
    if name != COMMAND_NAME {
        return InteractionResponse::deferred_update();
    }

    tracing::info!(user = %interaction.username(), "Slash command invoked");

    let pending = match state.controller.pending_devices().await {
        Ok(pending) => pending,
        Err(err) => {
            tracing::error!(error = %err, "Failed to get pending devices");
            return InteractionResponse::channel_message(MessageBody::text(format!(
                "Failed to get pending devices: {}",
                err
            )));
        }
    };

    if pending.is_empty() {
        return InteractionResponse::channel_message(MessageBody::text(
            "No pending devices found.",
        ));
    }

    if pending.len() >= MAX_INDIVIDUAL_ALERTS {
        return InteractionResponse::channel_message(MessageBody::text(mass_pending_warning(
            pending.len(),
        )));
    }

    // Summary response now; the per-device prompts go out as ordinary
    // channel messages alongside it.
    let count = pending.len();
    let dispatcher = state.dispatcher.clone();
    tokio::spawn(async move {
        if let Err(err) = dispatcher.dispatch(&pending).await {
            tracing::error!(error = %err, "Failed to dispatch approval messages");
        }
    });

    InteractionResponse::channel_message(MessageBody::text(format!(
        "Found {} pending device(s). Sending approval requests...",
        count
    )))
}
