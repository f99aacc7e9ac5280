use chrono::Duration;
use tracing::debug;

use shared::models::events::ServerEvent;
use shared::models::game_session::GameSession;
use shared::models::question::Question;
use shared::services::game_service::ROUND_GRACE_SECS;

use crate::matchmaking::{JoinOutcome, QueueEntry};
use crate::protocol::ClientCommand;
use crate::state::AppState;

/// Identity of the connection an event arrived on, established once at the
/// handshake and threaded explicitly through every handler.
#[derive(Debug, Clone)]
pub struct ConnectionContext {
    pub player_id: String,
    pub connection_id: String,
}

/// Routes one decoded command. Failures become an `error` event for the
/// originating connection only; the opponent never sees them.
pub async fn dispatch(state: &AppState, ctx: &ConnectionContext, command: ClientCommand) {
    debug!(
        "Dispatching {:?} for player {} on {}",
        command, ctx.player_id, ctx.connection_id
    );

    let result = match command {
        ClientCommand::JoinQueue {
            topic,
            category,
            rating,
        } => handle_join_queue(state, ctx, &topic, &category, rating).await,
        ClientCommand::CreatePrivate { topic, category } => {
            handle_create_private(state, ctx, &topic, &category).await
        }
        ClientCommand::JoinPrivate { code } => handle_join_private(state, ctx, &code).await,
        ClientCommand::JoinGame { game_id } => handle_join_game(state, ctx, &game_id).await,
        ClientCommand::SubmitAnswer {
            game_id,
            question_id,
            answer,
        } => state
            .games
            .submit_answer(&ctx.player_id, &game_id, &question_id, &answer)
            .await
            .map_err(|e| e.to_string()),
        ClientCommand::Ping => {
            state
                .notifier
                .send_to_player(&ctx.player_id, &ServerEvent::Pong)
                .await;
            Ok(())
        }
    };

    if let Err(message) = result {
        state
            .notifier
            .send_to_player(&ctx.player_id, &ServerEvent::error(message))
            .await;
    }
}

async fn handle_join_queue(
    state: &AppState,
    ctx: &ConnectionContext,
    topic: &str,
    category: &str,
    rating: i32,
) -> Result<(), String> {
    let entry = QueueEntry::new(&ctx.player_id, &ctx.connection_id, rating, topic, category);

    match state.queue.join(entry).await.map_err(|e| e.to_string())? {
        JoinOutcome::Waiting => {
            state
                .notifier
                .send_to_player(&ctx.player_id, &ServerEvent::queue_joined())
                .await;
            Ok(())
        }
        JoinOutcome::Matched { session, questions } => {
            announce_match(state, &session, &questions).await;
            Ok(())
        }
    }
}

async fn handle_create_private(
    state: &AppState,
    ctx: &ConnectionContext,
    topic: &str,
    category: &str,
) -> Result<(), String> {
    let session = state
        .sessions
        .create_private_session(&ctx.player_id, &ctx.connection_id, topic, category)
        .await
        .map_err(|e| e.to_string())?;

    state
        .notifier
        .send_to_player(
            &ctx.player_id,
            &ServerEvent::PrivateCreated {
                game_id: session.id.clone(),
                code: session.join_code.clone().unwrap_or_default(),
            },
        )
        .await;
    Ok(())
}

async fn handle_join_private(
    state: &AppState,
    ctx: &ConnectionContext,
    code: &str,
) -> Result<(), String> {
    let (session, questions) = state
        .sessions
        .join_private_session(&ctx.player_id, &ctx.connection_id, code)
        .await
        .map_err(|e| e.to_string())?;

    // The creator's connection is resolved live by the notifier, so a
    // creator who reconnected since opening the room still gets the start.
    let started = ServerEvent::game_started(&session, &questions);
    for player in &session.players {
        state.notifier.send_to_player(&player.player_id, &started).await;
    }
    schedule_first_round(state, &session);
    Ok(())
}

async fn handle_join_game(
    state: &AppState,
    ctx: &ConnectionContext,
    game_id: &str,
) -> Result<(), String> {
    let sync = state
        .games
        .sync(game_id, &ctx.player_id)
        .await
        .map_err(|e| e.to_string())?;

    state.notifier.send_to_player(&ctx.player_id, &sync).await;
    Ok(())
}

/// Both sides of a fresh public match hear about it the same way: a
/// `match_found` ping followed by the full `game_started` payload.
async fn announce_match(state: &AppState, session: &GameSession, questions: &[Question]) {
    let found = ServerEvent::MatchFound {
        game_id: session.id.clone(),
    };
    let started = ServerEvent::game_started(session, questions);
    for player in &session.players {
        state.notifier.send_to_player(&player.player_id, &found).await;
        state.notifier.send_to_player(&player.player_id, &started).await;
    }
    schedule_first_round(state, session);
}

fn schedule_first_round(state: &AppState, session: &GameSession) {
    if let Some(first) = session.questions.first() {
        let deadline = session.current_round_started_at
            + Duration::seconds(i64::from(first.time_limit_secs) + ROUND_GRACE_SECS);
        state
            .scheduler
            .schedule_round(&session.id, &first.question_id, deadline);
    }
}
