pub mod errors;
pub mod game_service;
pub mod game_session_service;
pub mod notifier;
pub mod question_service;
pub mod rating_service;
pub mod round_timer;
