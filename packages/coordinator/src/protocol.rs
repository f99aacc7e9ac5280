use serde::Deserialize;

use shared::models::stats::DEFAULT_RATING;

fn default_category() -> String {
    "CS".to_string()
}

fn default_topic() -> String {
    "DSA".to_string()
}

fn default_rating() -> i32 {
    DEFAULT_RATING
}

/// Everything a client may ask for, decoded exactly once at the transport
/// boundary. The player identity never rides in the payload; it comes from
/// the authenticated handshake.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientCommand {
    JoinQueue {
        topic: String,
        #[serde(default = "default_category")]
        category: String,
        #[serde(default = "default_rating")]
        rating: i32,
    },
    CreatePrivate {
        #[serde(default = "default_topic")]
        topic: String,
        #[serde(default = "default_category")]
        category: String,
    },
    JoinPrivate {
        code: String,
    },
    JoinGame {
        game_id: String,
    },
    SubmitAnswer {
        game_id: String,
        question_id: String,
        answer: String,
    },
    Ping,
}

pub fn decode(text: &str) -> Result<ClientCommand, serde_json::Error> {
    serde_json::from_str(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_join_queue_with_defaults() {
        let command = decode(r#"{"action":"join_queue","topic":"DSA"}"#).unwrap();
        assert_eq!(
            command,
            ClientCommand::JoinQueue {
                topic: "DSA".to_string(),
                category: "CS".to_string(),
                rating: DEFAULT_RATING,
            }
        );
    }

    #[test]
    fn test_decode_submit_answer() {
        let command = decode(
            r#"{"action":"submit_answer","game_id":"g1","question_id":"q1","answer":"O(log n)"}"#,
        )
        .unwrap();
        assert_eq!(
            command,
            ClientCommand::SubmitAnswer {
                game_id: "g1".to_string(),
                question_id: "q1".to_string(),
                answer: "O(log n)".to_string(),
            }
        );
    }

    #[test]
    fn test_decode_ping_without_payload() {
        assert_eq!(decode(r#"{"action":"ping"}"#).unwrap(), ClientCommand::Ping);
    }

    #[test]
    fn test_unknown_action_is_rejected() {
        assert!(decode(r#"{"action":"make_move","game_id":"g1"}"#).is_err());
    }

    #[test]
    fn test_missing_required_field_is_rejected() {
        assert!(decode(r#"{"action":"join_private"}"#).is_err());
    }

    #[test]
    fn test_extra_fields_are_ignored_not_trusted() {
        // Identity comes from the handshake; a payload trying to smuggle one
        // in simply has no field to land in.
        let command =
            decode(r#"{"action":"join_queue","topic":"DSA","player_id":"mallory"}"#).unwrap();
        assert!(matches!(command, ClientCommand::JoinQueue { .. }));
    }
}
