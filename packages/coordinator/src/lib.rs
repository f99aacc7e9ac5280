pub mod auth;
pub mod connections;
pub mod handlers;
pub mod matchmaking;
pub mod protocol;
pub mod state;
pub mod timers;
pub mod ws;
