//! Pollboard server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{middleware, Router};
use pollboard_api::{middleware::AppState, router as api_router};
use pollboard_common::Config;
use pollboard_core::{
    AccessService, AccountService, EventPublisherService, FormService, InviteService, PinResolver,
    TallyService, UserService, VoteService,
};
use pollboard_db::repositories::{
    EditorGrantRepository, FormRepository, QuestionOptionRepository, QuestionRepository,
    ResponseRepository, UserRepository,
};
use pollboard_realtime::{presence::PresenceRegistry, pubsub::RedisPubSub};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pollboard=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting pollboard server...");

    // Load configuration
    let config = Config::load()?;

    // Connect to database
    let db = pollboard_db::init(&config).await?;
    info!("Connected to database");

    // Run migrations
    info!("Running database migrations...");
    pollboard_db::migrate(&db).await?;
    info!("Migrations completed");

    // Connect to Redis Pub/Sub
    info!("Connecting to Redis...");
    let pubsub = Arc::new(RedisPubSub::new(&config.redis.url).await?);
    pubsub.start().await?;

    // Initialize repositories
    let db = Arc::new(db);
    let user_repo = UserRepository::new(Arc::clone(&db));
    let form_repo = FormRepository::new(Arc::clone(&db));
    let question_repo = QuestionRepository::new(Arc::clone(&db));
    let option_repo = QuestionOptionRepository::new(Arc::clone(&db));
    let response_repo = ResponseRepository::new(Arc::clone(&db));
    let grant_repo = EditorGrantRepository::new(Arc::clone(&db));

    // Initialize services
    let publisher: EventPublisherService = pubsub.clone();
    let access_service = AccessService::new(grant_repo.clone());
    let user_service = UserService::new(user_repo.clone());
    let account_service = AccountService::new(user_repo.clone());
    let form_service = FormService::new(
        form_repo.clone(),
        question_repo.clone(),
        option_repo.clone(),
        access_service.clone(),
        publisher.clone(),
    );
    let invite_service = InviteService::new(
        form_repo.clone(),
        grant_repo.clone(),
        user_repo.clone(),
        publisher.clone(),
    );
    let vote_service = VoteService::new(
        form_repo.clone(),
        question_repo.clone(),
        option_repo.clone(),
        response_repo.clone(),
        access_service.clone(),
    );
    let tally_service = TallyService::new(
        form_repo,
        question_repo,
        option_repo,
        response_repo,
        access_service.clone(),
    );
    let resolver = PinResolver::new(&config.resolver)?;

    // Initialize presence registry
    let presence = Arc::new(PresenceRegistry::new());

    // Create app state
    let state = AppState {
        user_service,
        account_service,
        form_service,
        invite_service,
        vote_service,
        tally_service,
        access_service,
        resolver,
        presence,
        pubsub: pubsub.clone(),
    };

    // Build router
    let app = Router::new()
        .nest("/api", api_router())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            pollboard_api::middleware::auth_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    // Start server with graceful shutdown
    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Err(e) = pubsub.shutdown().await {
        tracing::warn!(error = %e, "Redis Pub/Sub shutdown failed");
    }

    info!("Server shutdown complete");
    Ok(())
}
