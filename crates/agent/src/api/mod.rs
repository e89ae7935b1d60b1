//! HTTP surface of the callable handlers.
//!
//! Requests carry their payload within a `{"data": ...}` envelope, and
//! responses carry their result within `{"result": ...}`. Failures are
//! returned as `{"error": {"status", "message"}}` (see `DispatchError`).
use crate::dispatch::{
    ContactSmsBroadcaster, NotifyRespondersRequest, NotifyRespondersResponse, ResponderNotifier,
    SendContactSmsRequest, SendContactSmsResponse,
};
use crate::stores::{IncidentStore, ResponderDirectory};
use crate::{Caller, DispatchError};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, Json, State};
use notifications::{PushSender, SmsSender};
use std::sync::Arc;

mod error;

/// Claims of the JWT bearer tokens presented by callers.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

/// Request envelope of a callable handler.
#[derive(Debug, serde::Deserialize)]
pub struct Callable<T> {
    pub data: T,
}

/// Response envelope of a callable handler.
#[derive(Debug, serde::Serialize)]
pub struct CallableResult<T> {
    pub result: T,
}

struct App<S, P, T> {
    notifier: ResponderNotifier<S, P>,
    broadcaster: ContactSmsBroadcaster<S, T>,
}

struct Authenticator {
    jwt_secret: jsonwebtoken::DecodingKey,
    jwt_validation: jsonwebtoken::Validation,
}

/// Build the agent's API router.
pub fn build_router<S, P, T>(
    notifier: ResponderNotifier<S, P>,
    broadcaster: ContactSmsBroadcaster<S, T>,
    jwt_secret: &[u8],
) -> axum::Router<()>
where
    S: ResponderDirectory + IncidentStore,
    P: PushSender,
    T: SmsSender,
{
    let mut jwt_validation = jsonwebtoken::Validation::default();
    jwt_validation.set_audience(&["authenticated"]);

    let authenticator = Arc::new(Authenticator {
        jwt_secret: jsonwebtoken::DecodingKey::from_secret(jwt_secret),
        jwt_validation,
    });
    let app = Arc::new(App {
        notifier,
        broadcaster,
    });

    use axum::routing::{get, post};

    axum::Router::new()
        .route("/v1/notify-responders", post(notify_responders::<S, P, T>))
        .route("/v1/send-contact-sms", post(send_contact_sms::<S, P, T>))
        .route_layer(axum::middleware::from_fn_with_state(
            authenticator,
            authenticate,
        ))
        .route("/healthz", get(|| async { "ok" }))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(app)
}

async fn notify_responders<S, P, T>(
    State(app): State<Arc<App<S, P, T>>>,
    caller: Option<Extension<Caller>>,
    payload: Result<Json<Callable<NotifyRespondersRequest>>, JsonRejection>,
) -> Result<Json<CallableResult<NotifyRespondersResponse>>, DispatchError>
where
    S: ResponderDirectory + IncidentStore,
    P: PushSender,
    T: SmsSender,
{
    let caller = caller.map(|Extension(caller)| caller);
    let request = accept(caller.as_ref(), payload)?;
    let result = app.notifier.notify(caller.as_ref(), request).await?;
    Ok(Json(CallableResult { result }))
}

async fn send_contact_sms<S, P, T>(
    State(app): State<Arc<App<S, P, T>>>,
    caller: Option<Extension<Caller>>,
    payload: Result<Json<Callable<SendContactSmsRequest>>, JsonRejection>,
) -> Result<Json<CallableResult<SendContactSmsResponse>>, DispatchError>
where
    S: ResponderDirectory + IncidentStore,
    P: PushSender,
    T: SmsSender,
{
    let caller = caller.map(|Extension(caller)| caller);
    let request = accept(caller.as_ref(), payload)?;
    let result = app.broadcaster.broadcast(caller.as_ref(), request).await?;
    Ok(Json(CallableResult { result }))
}

/// Unwrap the request payload, but only once the caller is known to be
/// authenticated: unauthenticated callers learn nothing of payload errors.
fn accept<R>(
    caller: Option<&Caller>,
    payload: Result<Json<Callable<R>>, JsonRejection>,
) -> Result<R, DispatchError> {
    if caller.is_none() {
        return Err(DispatchError::Unauthenticated);
    }
    match payload {
        Ok(Json(Callable { data })) => Ok(data),
        Err(rejection) => Err(DispatchError::InvalidArgument(rejection.body_text())),
    }
}

// Middleware which verifies a presented bearer token, and attaches its Caller.
// Requests without a valid token proceed without one, and are refused by
// the handler itself.
async fn authenticate(
    State(authenticator): State<Arc<Authenticator>>,
    bearer: Option<
        axum_extra::TypedHeader<
            axum_extra::headers::Authorization<axum_extra::headers::authorization::Bearer>,
        >,
    >,
    mut req: axum::extract::Request,
    next: axum::middleware::Next,
) -> axum::response::Response {
    if let Some(axum_extra::TypedHeader(bearer)) = bearer {
        match jsonwebtoken::decode::<Claims>(
            bearer.token(),
            &authenticator.jwt_secret,
            &authenticator.jwt_validation,
        ) {
            Ok(token) => {
                req.extensions_mut().insert(Caller {
                    uid: token.claims.sub,
                });
            }
            Err(error) => tracing::debug!(?error, "ignoring invalid authorization token"),
        }
    }
    next.run(req).await
}
