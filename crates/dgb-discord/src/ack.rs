//! Immediate interaction responses.
//!
//! A deferred ack must reach the platform before any collaborator call for the
//! same interaction starts. [`AckBody`] signals when the HTTP layer is done
//! with the response body (written out, or the connection went away), and the
//! background task waits on [`AckSent`] before doing anything else.

use std::{
    convert::Infallible,
    pin::Pin,
    task::{Context, Poll},
};

use axum::{
    body::{Body, Bytes},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use http_body::{Frame, SizeHint};
use tokio::sync::oneshot;

use dgb_core::domain::AckDecision;

/// JSON body of an immediate interaction response.
pub fn ack_json(decision: AckDecision) -> String {
    serde_json::json!({ "type": decision.response_type() }).to_string()
}

/// Resolves once the paired [`AckBody`] has been released by the HTTP layer.
pub struct AckSent(oneshot::Receiver<()>);

impl AckSent {
    pub async fn wait(self) {
        // A dropped sender means the body is gone too; both cases unblock.
        let _ = self.0.await;
    }
}

/// One-shot response body that fires [`AckSent`] when dropped.
pub struct AckBody {
    data: Option<Bytes>,
    sent: Option<oneshot::Sender<()>>,
}

impl AckBody {
    pub fn new(data: impl Into<Bytes>) -> (Self, AckSent) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                data: Some(data.into()),
                sent: Some(tx),
            },
            AckSent(rx),
        )
    }
}

impl http_body::Body for AckBody {
    type Data = Bytes;
    type Error = Infallible;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        Poll::Ready(self.data.take().map(|d| Ok(Frame::data(d))))
    }

    fn is_end_stream(&self) -> bool {
        self.data.is_none()
    }

    fn size_hint(&self) -> SizeHint {
        SizeHint::with_exact(self.data.as_ref().map_or(0, |d| d.len() as u64))
    }
}

impl Drop for AckBody {
    fn drop(&mut self) {
        if let Some(tx) = self.sent.take() {
            let _ = tx.send(());
        }
    }
}

/// `200` JSON response for `decision`.
pub fn ack_response(decision: AckDecision) -> Response {
    json_response(Body::from(ack_json(decision)))
}

/// `200` JSON response for `decision` plus the signal that it has been sent.
pub fn tracked_ack_response(decision: AckDecision) -> (Response, AckSent) {
    let (body, sent) = AckBody::new(ack_json(decision));
    (json_response(Body::new(body)), sent)
}

fn json_response(body: Body) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        body,
    )
        .into_response()
}
