pub mod game_service_errors;
pub mod game_session_service_errors;
pub mod question_service_errors;
pub mod rating_service_errors;
