use std::sync::Arc;

use tracing::info;

use shared::repositories::game_repository::DynamoDbGameSessionRepository;
use shared::repositories::question_repository::DynamoDbQuestionRepository;
use shared::repositories::stats_repository::DynamoDbStatsRepository;
use shared::services::game_service::GameService;
use shared::services::game_session_service::GameSessionService;
use shared::services::notifier::ConnectionNotifier;
use shared::services::question_service::QuestionService;
use shared::services::rating_service::RatingService;
use shared::services::round_timer::RoundScheduler;

use coordinator::auth::Authenticator;
use coordinator::connections::{ConnectionRegistry, WsNotifier};
use coordinator::matchmaking::MatchmakingQueue;
use coordinator::state::AppState;
use coordinator::timers;
use coordinator::ws;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // Storage clients
    let config = aws_config::load_from_env().await;
    let dynamodb_client = aws_sdk_dynamodb::Client::new(&config);

    let game_repository = Arc::new(DynamoDbGameSessionRepository::new(dynamodb_client.clone()));
    let question_repository = Arc::new(DynamoDbQuestionRepository::new(dynamodb_client.clone()));
    let stats_repository = Arc::new(DynamoDbStatsRepository::new(dynamodb_client));

    // Process-lifetime state and services
    let registry = Arc::new(ConnectionRegistry::new());
    let notifier: Arc<dyn ConnectionNotifier> = Arc::new(WsNotifier::new(registry.clone()));

    let question_service = QuestionService::new(question_repository);
    let session_service =
        GameSessionService::new(game_repository.clone(), question_service.clone());
    let rating_service = RatingService::new(stats_repository);

    let (timer_handle, timer_rx) = timers::round_timer_channel();
    let scheduler: Arc<dyn RoundScheduler> = Arc::new(timer_handle);

    let game_service = GameService::new(
        game_repository,
        question_service,
        rating_service,
        notifier.clone(),
        scheduler.clone(),
    );
    tokio::spawn(timers::run_round_timer(timer_rx, game_service.clone()));

    let queue = MatchmakingQueue::spawn(registry.clone(), session_service.clone());
    let authenticator = Arc::new(Authenticator::new());

    let state = AppState {
        registry,
        notifier,
        queue,
        sessions: session_service,
        games: game_service,
        scheduler,
        authenticator,
    };

    let port = std::env::var("PORT").unwrap_or_else(|_| "8080".to_string());
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind listener");

    info!("Coordinator listening on {}", addr);
    axum::serve(listener, ws::router(state))
        .await
        .expect("server error");
}
