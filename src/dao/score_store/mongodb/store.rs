use std::{sync::Arc, time::SystemTime};

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, Collection, Database, IndexModel,
    bson::{Bson, DateTime, doc},
    options::{IndexOptions, ReturnDocument},
};
use tokio::sync::RwLock;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{GAME_ID, MongoGameDocument, MongoScoreDocument, game_filter, team_documents},
};
use crate::dao::{
    models::{GameEntity, ScoreEntity, TeamEntity},
    score_store::ScoreStore,
    storage::StorageResult,
};

const GAME_COLLECTION_NAME: &str = "games";
const SCORE_COLLECTION_NAME: &str = "scores";

#[derive(Clone)]
pub struct MongoScoreStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    #[allow(dead_code)]
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

impl MongoScoreStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let collection = self.scores().await;
        let index = IndexModel::builder()
            .keys(doc! { "epoch": 1, "team_id": 1, "recorded_at": 1 })
            .options(
                IndexOptions::builder()
                    .name(Some("score_epoch_team_idx".to_owned()))
                    .build(),
            )
            .build();

        collection
            .create_index(index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: SCORE_COLLECTION_NAME,
                index: "epoch,team_id,recorded_at",
                source,
            })?;

        Ok(())
    }

    async fn games(&self) -> Collection<MongoGameDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoGameDocument>(GAME_COLLECTION_NAME)
    }

    async fn scores(&self) -> Collection<MongoScoreDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoScoreDocument>(SCORE_COLLECTION_NAME)
    }

    async fn find_game_document(&self) -> MongoResult<Option<MongoGameDocument>> {
        self.games()
            .await
            .find_one(game_filter())
            .await
            .map_err(|source| MongoDaoError::LoadGame { source })
    }

    async fn current_game(&self) -> MongoResult<MongoGameDocument> {
        self.find_game_document()
            .await?
            .ok_or(MongoDaoError::MissingGame)
    }

    async fn ensure_game(&self, teams: Vec<TeamEntity>) -> MongoResult<()> {
        let update = doc! {
            "$setOnInsert": {
                "epoch": 0_i64,
                "started_at": Bson::Null,
                "teams": team_documents(&teams),
                "updated_at": DateTime::now(),
            }
        };

        self.games()
            .await
            .update_one(game_filter(), update)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SeedGame { source })?;
        Ok(())
    }

    async fn load_game(&self) -> MongoResult<Option<GameEntity>> {
        Ok(self.find_game_document().await?.map(Into::into))
    }

    async fn list_scores(&self, team_id: Option<String>) -> MongoResult<Vec<ScoreEntity>> {
        let game = self.current_game().await?;

        let mut filter = doc! { "epoch": game.epoch };
        if let Some(team_id) = team_id {
            filter.insert("team_id", team_id);
        }

        let documents: Vec<MongoScoreDocument> = self
            .scores()
            .await
            .find(filter)
            .sort(doc! { "recorded_at": 1, "_id": 1 })
            .await
            .map_err(|source| MongoDaoError::ListScores { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListScores { source })?;

        documents.into_iter().map(ScoreEntity::try_from).collect()
    }

    async fn start_timer(&self, now: SystemTime) -> MongoResult<SystemTime> {
        // Only the first writer wins; later calls see the stored value.
        let filter = doc! { "_id": GAME_ID, "started_at": Bson::Null };
        let update = doc! {
            "$set": {
                "started_at": DateTime::from_system_time(now),
                "updated_at": DateTime::now(),
            }
        };

        self.games()
            .await
            .update_one(filter, update)
            .await
            .map_err(|source| MongoDaoError::StartTimer { source })?;

        let game = self.current_game().await?;
        Ok(game
            .started_at
            .map(|at| at.to_system_time())
            .unwrap_or(now))
    }

    async fn append_score(&self, score: ScoreEntity) -> MongoResult<bool> {
        let game = self.current_game().await?;
        if !game.has_team(&score.team_id) {
            return Ok(false);
        }

        let team_id = score.team_id.clone();
        let document = MongoScoreDocument::new(game.epoch, score);
        self.scores()
            .await
            .insert_one(&document)
            .await
            .map_err(|source| MongoDaoError::AppendScore { team_id, source })?;
        Ok(true)
    }

    async fn reset_game(&self) -> MongoResult<()> {
        // Bumping the epoch hides every earlier score in the same write that
        // clears the timer, so readers never see half a reset.
        let update = doc! {
            "$inc": { "epoch": 1_i64 },
            "$set": { "started_at": Bson::Null, "updated_at": DateTime::now() },
        };

        let game = self
            .games()
            .await
            .find_one_and_update(game_filter(), update)
            .return_document(ReturnDocument::After)
            .await
            .map_err(|source| MongoDaoError::ResetGame { source })?
            .ok_or(MongoDaoError::MissingGame)?;

        if let Err(err) = self
            .scores()
            .await
            .delete_many(doc! { "epoch": { "$lt": game.epoch } })
            .await
        {
            tracing::warn!(
                error = %err,
                epoch = game.epoch,
                "failed to purge scores from previous epochs"
            );
        }

        Ok(())
    }
}

impl ScoreStore for MongoScoreStore {
    fn backend(&self) -> &'static str {
        "mongo"
    }

    fn ensure_game(&self, teams: Vec<TeamEntity>) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_game(teams).await.map_err(Into::into) })
    }

    fn load_game(&self) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.load_game().await.map_err(Into::into) })
    }

    fn list_scores(
        &self,
        team_id: Option<String>,
    ) -> BoxFuture<'static, StorageResult<Vec<ScoreEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_scores(team_id).await.map_err(Into::into) })
    }

    fn start_timer(&self, now: SystemTime) -> BoxFuture<'static, StorageResult<SystemTime>> {
        let store = self.clone();
        Box::pin(async move { store.start_timer(now).await.map_err(Into::into) })
    }

    fn append_score(&self, score: ScoreEntity) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.append_score(score).await.map_err(Into::into) })
    }

    fn reset_game(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.reset_game().await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
