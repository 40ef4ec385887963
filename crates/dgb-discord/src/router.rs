//! HTTP surface and the acknowledgment dispatcher.
//!
//! Everything that can fail before the immediate response is written (signature,
//! decoding) turns into an HTTP error status. Everything after it is absorbed
//! into the follow-up, because the response channel is already closed.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use tracing::{debug, error, info, instrument, warn};

use dgb_core::{
    config::Config,
    dedup::InteractionDedup,
    domain::{AckDecision, FollowupMessage, InteractionEvent, InteractionKind},
    pipeline::CompletionPipeline,
    ports::FollowupPort,
    tasks::TaskSupervisor,
    Result,
};

use crate::ack::{ack_response, tracked_ack_response, AckSent};
use crate::interaction;
use crate::signature::{SignatureVerifier, SIGNATURE_HEADER, TIMESTAMP_HEADER};

pub const INTERACTION_PATH: &str = "/callback/d/interaction";

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub verifier: Arc<SignatureVerifier>,
    pub pipeline: Arc<CompletionPipeline>,
    pub followup: Arc<dyn FollowupPort>,
    pub tasks: TaskSupervisor,
    pub dedup: Arc<InteractionDedup>,
}

impl AppState {
    pub fn new(
        cfg: Arc<Config>,
        pipeline: Arc<CompletionPipeline>,
        followup: Arc<dyn FollowupPort>,
        tasks: TaskSupervisor,
    ) -> Result<Self> {
        let verifier = Arc::new(SignatureVerifier::new(&cfg.discord_public_key)?);
        let dedup = Arc::new(InteractionDedup::new(cfg.dedup_ttl));
        Ok(Self {
            cfg,
            verifier,
            pipeline,
            followup,
            tasks,
            dedup,
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health).post(health))
        .route(INTERACTION_PATH, post(handle_interaction))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok\n"
}

#[instrument(
    name = "interaction",
    skip_all,
    fields(
        interaction_id = tracing::field::Empty,
        kind = tracing::field::Empty,
    )
)]
async fn handle_interaction(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let timestamp = header_str(&headers, TIMESTAMP_HEADER);
    let signature = header_str(&headers, SIGNATURE_HEADER);
    if let Err(e) = state.verifier.check(&body, timestamp, signature) {
        warn!(error = %e, "rejecting interaction");
        debug!(body = %String::from_utf8_lossy(&body), "rejected interaction body");
        return (StatusCode::UNAUTHORIZED, "error").into_response();
    }

    let event = match interaction::decode(&body) {
        Ok(ev) => ev,
        Err(e) => {
            warn!(error = %e, "dropping malformed interaction");
            debug!(body = %String::from_utf8_lossy(&body), "malformed interaction body");
            return (StatusCode::BAD_REQUEST, "error").into_response();
        }
    };

    let span = tracing::Span::current();
    span.record("interaction_id", event.id.as_str());
    span.record("kind", event.kind.as_str());

    dispatch(&state, event)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

/// Choose and build the immediate response; schedule the follow-up for commands.
pub fn dispatch(state: &AppState, event: InteractionEvent) -> Response {
    let decision = AckDecision::for_kind(event.kind);

    match event.kind {
        InteractionKind::Ping => ack_response(decision),
        InteractionKind::MessageComponent => {
            // No component handlers exist yet; ack without touching the message.
            info!("message component interactions are unimplemented; sending default ack");
            ack_response(decision)
        }
        InteractionKind::ApplicationCommand => {
            if !event.id.is_empty() && !state.dedup.first_seen(&event.id) {
                warn!("duplicate interaction delivery; follow-up already scheduled");
                return ack_response(decision);
            }

            info!(
                user_id = %event.invoker_user_id,
                username = %event.invoker_username,
                command = %event.command_name,
                "deferring application command"
            );

            let (response, sent) = tracked_ack_response(decision);
            let task_state = state.clone();
            state.tasks.spawn("interaction", async move {
                complete_and_deliver(task_state, event, sent).await;
            });
            response
        }
    }
}

async fn complete_and_deliver(state: AppState, event: InteractionEvent, sent: AckSent) {
    // Nothing may reach a collaborator before the deferred ack is out.
    sent.wait().await;

    let outcome = state
        .pipeline
        .run(event.command_input(), &event.invoker_user_id)
        .await;

    let msg = FollowupMessage::for_answer(&event, &outcome, state.cfg.followup_content_limit);
    match state.followup.send_followup(&msg).await {
        Ok(()) => info!(
            interaction_id = %event.id,
            flagged = outcome.flagged,
            "follow-up delivered"
        ),
        Err(e) => error!(interaction_id = %event.id, error = %e, "follow-up delivery failed"),
    }
}
