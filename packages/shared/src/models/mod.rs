pub mod events;
pub mod game_session;
pub mod question;
pub mod stats;
