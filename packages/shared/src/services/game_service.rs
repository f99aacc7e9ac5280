use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{info, warn};

use crate::models::events::{PlayerOutcome, RoundResult, ScoreView, ServerEvent};
use crate::models::game_session::{
    AnswerRecord, GameSession, GameStatus, PlayerResult,
};
use crate::repositories::errors::game_repository_errors::GameSessionRepositoryError;
use crate::repositories::game_repository::{GameSessionRepository, PlayerSettlement};
use crate::services::errors::game_service_errors::GameServiceError;
use crate::services::notifier::ConnectionNotifier;
use crate::services::question_service::QuestionService;
use crate::services::rating_service::{duel_deltas, RatingService};
use crate::services::round_timer::RoundScheduler;

/// Review pause between a round closing and the next round's clock starting.
pub const REVIEW_DELAY_SECS: i64 = 5;

/// Slack past a question's time limit before the server force-closes the
/// round on behalf of a silent player.
pub const ROUND_GRACE_SECS: i64 = 5;

/// Base 100 for a correct answer plus a speed bonus of up to 50; a wrong
/// answer costs 20 regardless of speed.
pub fn score_points(is_correct: bool, time_limit_secs: f64, time_taken_secs: f64) -> i32 {
    if is_correct {
        let bonus = ((time_limit_secs - time_taken_secs) / time_limit_secs * 50.0).max(0.0);
        100 + bonus.round() as i32
    } else {
        -20
    }
}

/// Answer Submission Pipeline plus game completion and reconnection sync.
/// The only writer of an IN_PROGRESS session; every mutation goes through a
/// conditional write and a lost condition is resolved by re-reading, never
/// surfaced to the player.
#[derive(Clone)]
pub struct GameService {
    games: Arc<dyn GameSessionRepository>,
    questions: QuestionService,
    ratings: RatingService,
    notifier: Arc<dyn ConnectionNotifier>,
    scheduler: Arc<dyn RoundScheduler>,
}

impl GameService {
    pub fn new(
        games: Arc<dyn GameSessionRepository>,
        questions: QuestionService,
        ratings: RatingService,
        notifier: Arc<dyn ConnectionNotifier>,
        scheduler: Arc<dyn RoundScheduler>,
    ) -> Self {
        GameService {
            games,
            questions,
            ratings,
            notifier,
            scheduler,
        }
    }

    /// Validates, scores and applies one answer. Timing is measured against
    /// the server's round clock; whatever the client claims is ignored.
    pub async fn submit_answer(
        &self,
        player_id: &str,
        game_id: &str,
        question_id: &str,
        submitted_answer: &str,
    ) -> Result<(), GameServiceError> {
        let session = self
            .games
            .get_game_session(game_id)
            .await?
            .ok_or(GameServiceError::GameNotActive)?;
        if session.status != GameStatus::InProgress {
            return Err(GameServiceError::GameNotActive);
        }
        let player_index = session
            .player_index(player_id)
            .ok_or(GameServiceError::PlayerNotFound)?;
        let question_ref = session
            .question_ref(question_id)
            .ok_or(GameServiceError::QuestionNotFound)?
            .clone();
        let question = self
            .questions
            .get(question_id)
            .await?
            .ok_or(GameServiceError::QuestionNotFound)?;

        if let Some(existing) = session.players[player_index].answers.get(question_id) {
            info!(
                "Player {} already answered {} in game {}, resending original result",
                player_id, question_id, game_id
            );
            self.send_answer_result(player_id, existing, session.players[player_index].score)
                .await;
            return Ok(());
        }

        let now = Utc::now();
        let time_limit = f64::from(question_ref.time_limit_secs);
        let elapsed =
            (now - session.current_round_started_at).num_milliseconds() as f64 / 1000.0;
        let time_taken = elapsed.clamp(0.0, time_limit);
        let is_correct = question.is_correct_answer(submitted_answer);
        let record = AnswerRecord {
            question_id: question_id.to_string(),
            submitted_answer: submitted_answer.to_string(),
            is_correct,
            time_taken_secs: time_taken,
            points_awarded: score_points(is_correct, time_limit, time_taken),
            submitted_at: now,
        };

        if let Err(err) = self
            .games
            .record_answer(&session.id, player_index, &record)
            .await
        {
            return match err {
                GameSessionRepositoryError::ConditionalCheckFailed => {
                    // Lost the race against our own retransmission; replay
                    // whatever the first write stored.
                    let session = self
                        .games
                        .get_game_session(game_id)
                        .await?
                        .ok_or(GameServiceError::GameNotActive)?;
                    let player = &session.players[player_index];
                    match player.answers.get(question_id) {
                        Some(existing) => {
                            self.send_answer_result(player_id, existing, player.score).await;
                            Ok(())
                        }
                        // The condition lost because the game is no longer
                        // running, not because of a duplicate.
                        None => Err(GameServiceError::GameNotActive),
                    }
                }
                other => Err(other.into()),
            };
        }

        let session = self
            .games
            .get_game_session(game_id)
            .await?
            .ok_or(GameServiceError::GameNotActive)?;
        let player = &session.players[player_index];
        self.send_answer_result(player_id, &record, player.score).await;

        if session.round_complete(question_id) {
            self.close_round(&session, question_id, question.correct_answer_text())
                .await?;
        } else {
            self.notifier
                .send_to_player(player_id, &ServerEvent::waiting_for_opponent())
                .await;
            if let Some(opponent) = session.opponent_of(player_id) {
                self.notifier
                    .send_to_player(
                        &opponent.player_id,
                        &ServerEvent::OpponentAnswered {
                            user_id: player_id.to_string(),
                        },
                    )
                    .await;
            }
        }

        if player.answers.len() >= session.questions.len() {
            self.try_finish(&session).await?;
        }

        Ok(())
    }

    /// Timer fallback for a round nobody finished in time: silent players
    /// get a zero-point record and the round closes through the normal path.
    pub async fn force_close_round(
        &self,
        game_id: &str,
        question_id: &str,
    ) -> Result<(), GameServiceError> {
        let Some(session) = self.games.get_game_session(game_id).await? else {
            return Ok(());
        };
        if session.status != GameStatus::InProgress || session.round_complete(question_id) {
            return Ok(());
        }
        let Some(question_ref) = session.question_ref(question_id) else {
            return Ok(());
        };

        warn!(
            "Round {} of game {} timed out, force-closing",
            question_id, game_id
        );

        for (index, player) in session.players.iter().enumerate() {
            if player.has_answered(question_id) {
                continue;
            }
            let record = AnswerRecord {
                question_id: question_id.to_string(),
                submitted_answer: String::new(),
                is_correct: false,
                time_taken_secs: f64::from(question_ref.time_limit_secs),
                points_awarded: 0,
                submitted_at: Utc::now(),
            };
            match self.games.record_answer(&session.id, index, &record).await {
                Ok(()) => {}
                // A real submission slipped in first; it wins.
                Err(GameSessionRepositoryError::ConditionalCheckFailed) => {}
                Err(err) => return Err(err.into()),
            }
        }

        let Some(session) = self.games.get_game_session(game_id).await? else {
            return Ok(());
        };
        if session.round_complete(question_id) {
            let correct_answer = self
                .questions
                .get(question_id)
                .await?
                .and_then(|q| q.correct_answer_text());
            self.close_round(&session, question_id, correct_answer).await?;
        }
        self.try_finish(&session).await?;

        Ok(())
    }

    /// Reconnection sync: a pure read of the live state of a duel, minus
    /// anything that would reveal solutions.
    pub async fn sync(
        &self,
        game_id: &str,
        player_id: &str,
    ) -> Result<ServerEvent, GameServiceError> {
        let session = self
            .games
            .get_game_session(game_id)
            .await?
            .ok_or(GameServiceError::GameNotActive)?;
        if session.status != GameStatus::InProgress {
            return Err(GameServiceError::GameNotActive);
        }
        let player = session
            .player(player_id)
            .ok_or(GameServiceError::PlayerNotFound)?;

        let mut questions = Vec::with_capacity(session.questions.len());
        for question_ref in &session.questions {
            let question = self
                .questions
                .get(&question_ref.question_id)
                .await?
                .ok_or(GameServiceError::QuestionNotFound)?;
            questions.push(question.public_view());
        }

        Ok(ServerEvent::GameSync {
            game_id: session.id.clone(),
            status: session.status,
            current_question_index: player.answers.len(),
            current_round_started_at: session.current_round_started_at,
            players: session
                .players
                .iter()
                .map(|p| ScoreView {
                    player_id: p.player_id.clone(),
                    score: p.score,
                })
                .collect(),
            questions,
        })
    }

    /// Closes a completed round: one winner among concurrent detectors, a
    /// `round_over` broadcast, and the next round's clock and timer.
    async fn close_round(
        &self,
        session: &GameSession,
        question_id: &str,
        correct_answer: Option<String>,
    ) -> Result<(), GameServiceError> {
        let next_round_start = Utc::now() + Duration::seconds(REVIEW_DELAY_SECS);
        match self
            .games
            .advance_round(&session.id, session.rounds_completed, next_round_start)
            .await
        {
            Ok(()) => {}
            // The opponent's handler saw completion first and already
            // advanced; nothing left to do.
            Err(GameSessionRepositoryError::ConditionalCheckFailed) => return Ok(()),
            Err(err) => return Err(err.into()),
        }

        self.scheduler.cancel_rounds(&session.id);

        let results: Vec<RoundResult> = session
            .players
            .iter()
            .filter_map(|p| {
                p.answers.get(question_id).map(|a| RoundResult {
                    player_id: p.player_id.clone(),
                    is_correct: a.is_correct,
                    points: a.points_awarded,
                    score: p.score,
                })
            })
            .collect();

        self.broadcast(
            session,
            &ServerEvent::RoundOver {
                question_id: question_id.to_string(),
                correct_answer,
                results,
                next_round_start_time: next_round_start,
            },
        )
        .await;

        if let Some(next_question) = session.current_question() {
            let deadline = next_round_start
                + Duration::seconds(i64::from(next_question.time_limit_secs) + ROUND_GRACE_SECS);
            self.scheduler
                .schedule_round(&session.id, &next_question.question_id, deadline);
        }

        Ok(())
    }

    /// Settles the duel once both players answered everything. The FINISHED
    /// flip is the election: whichever trigger wins the conditional write
    /// applies ratings and broadcasts; the loser returns quietly.
    async fn try_finish(&self, session: &GameSession) -> Result<(), GameServiceError> {
        if session.status != GameStatus::InProgress
            || session.players.len() != 2
            || !session.all_answered()
        {
            return Ok(());
        }

        let player_1 = &session.players[0];
        let player_2 = &session.players[1];
        let result_1 = if player_1.score > player_2.score {
            PlayerResult::Win
        } else if player_1.score < player_2.score {
            PlayerResult::Loss
        } else {
            PlayerResult::Draw
        };
        let result_2 = result_1.opposite();

        let stats_1 = self.ratings.get_or_default(&player_1.player_id).await?;
        let stats_2 = self.ratings.get_or_default(&player_2.player_id).await?;
        let (delta_1, delta_2) = duel_deltas(stats_1.rating, stats_2.rating, result_1);

        let settlements = [
            PlayerSettlement {
                result: result_1,
                rating_change: delta_1,
                rating_after: stats_1.rating + delta_1,
            },
            PlayerSettlement {
                result: result_2,
                rating_change: delta_2,
                rating_after: stats_2.rating + delta_2,
            },
        ];

        match self
            .games
            .finish_session(&session.id, &settlements, Utc::now())
            .await
        {
            Ok(()) => {}
            // A concurrent trigger already settled the game.
            Err(GameSessionRepositoryError::ConditionalCheckFailed) => return Ok(()),
            Err(err) => return Err(err.into()),
        }

        self.scheduler.cancel_rounds(&session.id);

        self.ratings
            .apply_result(&player_1.player_id, result_1, delta_1, &session.topic)
            .await?;
        self.ratings
            .apply_result(&player_2.player_id, result_2, delta_2, &session.topic)
            .await?;

        let winner_id = match result_1 {
            PlayerResult::Win => Some(player_1.player_id.clone()),
            PlayerResult::Loss => Some(player_2.player_id.clone()),
            PlayerResult::Draw => None,
        };
        let results = vec![
            PlayerOutcome {
                player_id: player_1.player_id.clone(),
                score: player_1.score,
                result: result_1,
                rating_change: delta_1,
                rating_after: stats_1.rating + delta_1,
            },
            PlayerOutcome {
                player_id: player_2.player_id.clone(),
                score: player_2.score,
                result: result_2,
                rating_change: delta_2,
                rating_after: stats_2.rating + delta_2,
            },
        ];

        self.broadcast(
            session,
            &ServerEvent::GameOver {
                game_id: session.id.clone(),
                winner_id,
                results,
            },
        )
        .await;

        info!("Game {} finished", session.id);
        Ok(())
    }

    async fn send_answer_result(&self, player_id: &str, record: &AnswerRecord, new_score: i32) {
        self.notifier
            .send_to_player(
                player_id,
                &ServerEvent::AnswerResult {
                    question_id: record.question_id.clone(),
                    is_correct: record.is_correct,
                    points: record.points_awarded,
                    new_score,
                },
            )
            .await;
    }

    async fn broadcast(&self, session: &GameSession, event: &ServerEvent) {
        for player in &session.players {
            self.notifier.send_to_player(&player.player_id, event).await;
        }
    }
}
