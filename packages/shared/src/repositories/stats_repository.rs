use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use serde_dynamo::aws_sdk_dynamodb_1::{from_item, to_item};

use crate::models::stats::PlayerStats;
use crate::repositories::errors::stats_repository_errors::StatsRepositoryError;

/// Rating-record store. The rating engine is the only writer, one player at
/// a time, so get-then-put is the whole contract.
#[async_trait]
pub trait StatsRepository: Send + Sync {
    async fn get_stats(
        &self,
        player_id: &str,
    ) -> Result<Option<PlayerStats>, StatsRepositoryError>;

    async fn put_stats(&self, stats: &PlayerStats) -> Result<(), StatsRepositoryError>;
}

pub struct DynamoDbStatsRepository {
    pub client: Client,
    pub table_name: String,
}

impl DynamoDbStatsRepository {
    pub fn new(client: Client) -> Self {
        let table_name = std::env::var("PLAYER_STATS_TABLE")
            .expect("PLAYER_STATS_TABLE environment variable must be set");
        Self { client, table_name }
    }
}

#[async_trait]
impl StatsRepository for DynamoDbStatsRepository {
    async fn get_stats(
        &self,
        player_id: &str,
    ) -> Result<Option<PlayerStats>, StatsRepositoryError> {
        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("player_id", AttributeValue::S(player_id.to_string()))
            .send()
            .await
            .map_err(|e| StatsRepositoryError::DynamoDb(e.to_string()))?;

        if let Some(item) = result.item {
            let stats: PlayerStats = from_item(item)
                .map_err(|e| StatsRepositoryError::Serialization(e.to_string()))?;
            Ok(Some(stats))
        } else {
            Ok(None)
        }
    }

    async fn put_stats(&self, stats: &PlayerStats) -> Result<(), StatsRepositoryError> {
        let item =
            to_item(stats).map_err(|e| StatsRepositoryError::Serialization(e.to_string()))?;

        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .send()
            .await
            .map_err(|e| StatsRepositoryError::DynamoDb(e.to_string()))?;

        Ok(())
    }
}

#[cfg(any(test, feature = "test-util"))]
pub mod test_util {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    pub struct InMemoryStatsRepository {
        pub stats: Mutex<HashMap<String, PlayerStats>>,
    }

    impl InMemoryStatsRepository {
        pub fn new() -> Self {
            Self {
                stats: Mutex::new(HashMap::new()),
            }
        }

        pub fn with_stats(self, stats: PlayerStats) -> Self {
            self.stats
                .lock()
                .unwrap()
                .insert(stats.player_id.clone(), stats);
            self
        }

        pub fn snapshot(&self, player_id: &str) -> Option<PlayerStats> {
            self.stats.lock().unwrap().get(player_id).cloned()
        }
    }

    #[async_trait]
    impl StatsRepository for InMemoryStatsRepository {
        async fn get_stats(
            &self,
            player_id: &str,
        ) -> Result<Option<PlayerStats>, StatsRepositoryError> {
            Ok(self.snapshot(player_id))
        }

        async fn put_stats(&self, stats: &PlayerStats) -> Result<(), StatsRepositoryError> {
            self.stats
                .lock()
                .unwrap()
                .insert(stats.player_id.clone(), stats.clone());
            Ok(())
        }
    }
}
