use std::sync::Arc;

use shared::services::game_service::GameService;
use shared::services::game_session_service::GameSessionService;
use shared::services::notifier::ConnectionNotifier;
use shared::services::round_timer::RoundScheduler;

use crate::auth::Authenticator;
use crate::connections::ConnectionRegistry;
use crate::matchmaking::MatchmakingQueue;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ConnectionRegistry>,
    pub notifier: Arc<dyn ConnectionNotifier>,
    pub queue: MatchmakingQueue,
    pub sessions: GameSessionService,
    pub games: GameService,
    pub scheduler: Arc<dyn RoundScheduler>,
    pub authenticator: Arc<Authenticator>,
}
