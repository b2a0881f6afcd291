//! API middleware.

#![allow(missing_docs)]

use std::sync::Arc;

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};
use pollboard_core::{
    AccessService, AccountService, FormService, InviteService, PinResolver, TallyService,
    UserService, VoteService,
};
use pollboard_realtime::{presence::PresenceRegistry, pubsub::RedisPubSub};

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub user_service: UserService,
    pub account_service: AccountService,
    pub form_service: FormService,
    pub invite_service: InviteService,
    pub vote_service: VoteService,
    pub tally_service: TallyService,
    pub access_service: AccessService,
    pub resolver: PinResolver,
    pub presence: Arc<PresenceRegistry>,
    pub pubsub: Arc<RedisPubSub>,
}

/// Authentication middleware.
///
/// Resolves a bearer token to a user and stashes it in request extensions;
/// handlers opt in via the `AuthUser`/`MaybeAuthUser` extractors.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(auth_header) = req.headers().get("Authorization")
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
    {
        if let Ok(user) = state.user_service.authenticate_by_token(token).await {
            req.extensions_mut().insert(user);
        }
    }

    next.run(req).await
}
