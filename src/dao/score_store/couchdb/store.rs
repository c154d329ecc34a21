use std::{sync::Arc, time::SystemTime};

use futures::future::BoxFuture;
use reqwest::{Client, Method, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::from_value;

use crate::dao::{
    models::{GameEntity, ScoreEntity, TeamEntity},
    score_store::ScoreStore,
    storage::StorageResult,
};

use super::{
    config::CouchConfig,
    error::{CouchDaoError, CouchResult},
    models::{
        AllDocsResponse, BulkDocsRequest, CouchGameDocument, CouchScoreDocument, DeletedDocument,
        END_SUFFIX, GAME_DOC_ID, SCORE_PREFIX, epoch_prefix,
    },
};

const MAX_CONFLICT_RETRIES: u32 = 8;

#[derive(Clone)]
pub struct CouchScoreStore {
    client: Client,
    base_url: Arc<str>,
    database: Arc<str>,
    auth: Option<(Arc<str>, Arc<str>)>,
}

impl CouchScoreStore {
    /// Establish a connection to CouchDB and ensure the database exists.
    pub async fn connect(config: CouchConfig) -> CouchResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| CouchDaoError::ClientBuilder { source })?;

        let base_url = Arc::<str>::from(config.base_url.trim_end_matches('/'));
        let database = Arc::<str>::from(config.database);
        let auth = config
            .username
            .zip(config.password)
            .map(|(u, p)| (Arc::<str>::from(u), Arc::<str>::from(p)));

        let store = Self {
            client,
            base_url,
            database,
            auth,
        };

        store.ensure_database().await?;
        Ok(store)
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some((ref user, ref pass)) = self.auth {
            builder.basic_auth(user.as_ref(), Some(pass.as_ref()))
        } else {
            builder
        }
    }

    fn database_url(&self) -> String {
        format!("{}/{}", self.base_url, self.database)
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}", self.database_url(), path);
        self.authorized(self.client.request(method, url))
    }

    async fn ensure_database(&self) -> CouchResult<()> {
        let database = self.database.to_string();
        let url = self.database_url();

        let response = self
            .authorized(self.client.get(&url))
            .send()
            .await
            .map_err(|source| CouchDaoError::DatabaseQuery {
                database: database.clone(),
                source,
            })?;

        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => {
                let create = self
                    .authorized(self.client.put(&url))
                    .send()
                    .await
                    .map_err(|source| CouchDaoError::DatabaseCreate {
                        database: database.clone(),
                        source,
                    })?;
                // 412: another instance created it first.
                if create.status().is_success() || create.status() == StatusCode::PRECONDITION_FAILED
                {
                    Ok(())
                } else {
                    Err(CouchDaoError::DatabaseStatus {
                        database,
                        status: create.status(),
                    })
                }
            }
            other => Err(CouchDaoError::DatabaseStatus {
                database,
                status: other,
            }),
        }
    }

    async fn ping(&self) -> CouchResult<()> {
        let url = self.database_url();
        let response = self
            .authorized(self.client.get(&url))
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: url.clone(),
                source,
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(CouchDaoError::RequestStatus {
                path: url,
                status: response.status(),
            })
        }
    }

    async fn get_document<T>(&self, doc_id: &str) -> CouchResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        let response = self
            .request(Method::GET, doc_id)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                response.json::<T>().await.map(Some).map_err(|source| {
                    CouchDaoError::DecodeResponse {
                        path: doc_id.to_string(),
                        source,
                    }
                })
            }
            other => Err(CouchDaoError::RequestStatus {
                path: doc_id.to_string(),
                status: other,
            }),
        }
    }

    /// Write a document. Returns `false` when CouchDB reports a revision conflict.
    async fn put_document<T>(&self, doc_id: &str, document: &T) -> CouchResult<bool>
    where
        T: ?Sized + Serialize,
    {
        let response = self
            .request(Method::PUT, doc_id)
            .json(document)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::CONFLICT => Ok(false),
            status if status.is_success() => Ok(true),
            other => Err(CouchDaoError::RequestStatus {
                path: doc_id.to_string(),
                status: other,
            }),
        }
    }

    async fn all_docs(
        &self,
        startkey: &str,
        endkey: &str,
        include_docs: bool,
    ) -> CouchResult<AllDocsResponse> {
        const ALL_DOCS: &str = "_all_docs";
        let query = [
            ("include_docs", include_docs.to_string()),
            ("startkey", format!("\"{startkey}\"")),
            ("endkey", format!("\"{endkey}\"")),
            ("inclusive_end", "false".to_string()),
        ];

        let response = self
            .request(Method::GET, ALL_DOCS)
            .query(&query)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: ALL_DOCS.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(CouchDaoError::RequestStatus {
                path: ALL_DOCS.to_string(),
                status: response.status(),
            });
        }

        response
            .json::<AllDocsResponse>()
            .await
            .map_err(|source| CouchDaoError::DecodeResponse {
                path: ALL_DOCS.to_string(),
                source,
            })
    }

    async fn current_game(&self) -> CouchResult<CouchGameDocument> {
        self.get_document::<CouchGameDocument>(GAME_DOC_ID)
            .await?
            .ok_or(CouchDaoError::MissingGame)
    }

    /// Read-modify-write of the game document, retried while other writers win
    /// the revision race. `update` returns `false` to leave the document as is.
    async fn update_game<F>(&self, mut update: F) -> CouchResult<CouchGameDocument>
    where
        F: FnMut(&mut CouchGameDocument) -> bool,
    {
        for _ in 0..MAX_CONFLICT_RETRIES {
            let mut game = self.current_game().await?;
            if !update(&mut game) {
                return Ok(game);
            }
            game.updated_at = SystemTime::now();
            if self.put_document(GAME_DOC_ID, &game).await? {
                return Ok(game);
            }
            tracing::debug!("game document revision conflict, retrying");
        }

        Err(CouchDaoError::Conflict {
            path: GAME_DOC_ID.to_owned(),
            attempts: MAX_CONFLICT_RETRIES,
        })
    }

    async fn ensure_game(&self, teams: Vec<TeamEntity>) -> CouchResult<()> {
        // A conflict means the document already exists, which is the goal.
        self.put_document(GAME_DOC_ID, &CouchGameDocument::seed(teams))
            .await
            .map(|_| ())
    }

    async fn load_game(&self) -> CouchResult<Option<GameEntity>> {
        Ok(self
            .get_document::<CouchGameDocument>(GAME_DOC_ID)
            .await?
            .map(CouchGameDocument::into_entity))
    }

    async fn list_scores(&self, team_id: Option<String>) -> CouchResult<Vec<ScoreEntity>> {
        let game = self.current_game().await?;
        let prefix = epoch_prefix(game.epoch);
        let payload = self
            .all_docs(&prefix, &format!("{prefix}{END_SUFFIX}"), true)
            .await?;

        let mut scores = Vec::with_capacity(payload.rows.len());
        for row in payload.rows {
            let Some(doc) = row.doc else { continue };
            let document: CouchScoreDocument =
                from_value(doc).map_err(|source| CouchDaoError::DeserializeValue {
                    path: row.id.clone(),
                    source,
                })?;
            if team_id
                .as_deref()
                .is_some_and(|team_id| team_id != document.team_id)
            {
                continue;
            }
            scores.push(document.try_into_entity()?);
        }

        Ok(scores)
    }

    async fn start_timer(&self, now: SystemTime) -> CouchResult<SystemTime> {
        let game = self
            .update_game(|game| {
                if game.started_at.is_some() {
                    return false;
                }
                game.started_at = Some(now);
                true
            })
            .await?;

        Ok(game.started_at.unwrap_or(now))
    }

    async fn append_score(&self, score: ScoreEntity) -> CouchResult<bool> {
        let game = self.current_game().await?;
        if !game.has_team(&score.team_id) {
            return Ok(false);
        }

        let document = CouchScoreDocument::new(game.epoch, score);
        if self.put_document(&document.id, &document).await? {
            Ok(true)
        } else {
            Err(CouchDaoError::Conflict {
                path: document.id,
                attempts: 1,
            })
        }
    }

    async fn reset_game(&self) -> CouchResult<()> {
        let game = self
            .update_game(|game| {
                game.epoch += 1;
                game.started_at = None;
                true
            })
            .await?;

        if let Err(err) = self.purge_before(game.epoch).await {
            tracing::warn!(
                error = %err,
                epoch = game.epoch,
                "failed to purge scores from previous epochs"
            );
        }

        Ok(())
    }

    async fn purge_before(&self, epoch: u64) -> CouchResult<()> {
        const BULK_DOCS: &str = "_bulk_docs";
        let payload = self
            .all_docs(SCORE_PREFIX, &epoch_prefix(epoch), false)
            .await?;

        let docs: Vec<DeletedDocument> = payload
            .rows
            .into_iter()
            .filter_map(|row| {
                row.value.map(|value| DeletedDocument {
                    id: row.id,
                    rev: value.rev,
                    deleted: true,
                })
            })
            .collect();

        if docs.is_empty() {
            return Ok(());
        }

        let response = self
            .request(Method::POST, BULK_DOCS)
            .json(&BulkDocsRequest { docs })
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: BULK_DOCS.to_string(),
                source,
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(CouchDaoError::RequestStatus {
                path: BULK_DOCS.to_string(),
                status: response.status(),
            })
        }
    }
}

impl ScoreStore for CouchScoreStore {
    fn backend(&self) -> &'static str {
        "couch"
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
        Box::pin(async move { store.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_database().await.map_err(Into::into) })
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::{BTreeMap, HashMap},
        net::SocketAddr,
        sync::{
            Mutex,
            atomic::{AtomicU32, AtomicU64, Ordering},
        },
        time::Duration,
    };

    use axum::{
        Json, Router,
        extract::{Path, Query, State},
        http::StatusCode as HttpStatus,
        response::{IntoResponse, Response},
        routing::get,
    };
    use serde_json::{Value, json};
    use tokio::net::TcpListener;

    use super::*;

    /// Minimal CouchDB: revision-checked document PUTs, `_all_docs` range reads
    /// and `_bulk_docs` deletions. Can be told to lose the next game writes to a
    /// simulated concurrent writer.
    #[derive(Default)]
    struct FakeCouch {
        docs: Mutex<BTreeMap<String, Value>>,
        next_rev: AtomicU64,
        lost_game_writes: AtomicU32,
        game_puts: AtomicU32,
    }

    impl FakeCouch {
        fn rev(&self) -> String {
            format!("{}-fake", self.next_rev.fetch_add(1, Ordering::SeqCst) + 1)
        }

        fn lose_next_game_write(&self) -> bool {
            self.lost_game_writes
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
        }

        fn game(&self) -> Value {
            self.docs.lock().unwrap()[GAME_DOC_ID].clone()
        }

        fn score_count(&self) -> usize {
            self.docs
                .lock()
                .unwrap()
                .keys()
                .filter(|id| id.starts_with(SCORE_PREFIX))
                .count()
        }
    }

    type Fake = Arc<FakeCouch>;

    async fn get_doc(
        State(couch): State<Fake>,
        Path((_, id)): Path<(String, String)>,
        Query(params): Query<HashMap<String, String>>,
    ) -> Response {
        if id == "_all_docs" {
            return all_docs(&couch, &params).into_response();
        }
        match couch.docs.lock().unwrap().get(&id) {
            Some(doc) => Json(doc.clone()).into_response(),
            None => HttpStatus::NOT_FOUND.into_response(),
        }
    }

    fn all_docs(couch: &FakeCouch, params: &HashMap<String, String>) -> Json<Value> {
        let key = |name: &str| {
            params
                .get(name)
                .and_then(|raw| serde_json::from_str::<String>(raw).ok())
                .unwrap_or_default()
        };
        let include_docs = params.get("include_docs").is_some_and(|v| v == "true");

        let docs = couch.docs.lock().unwrap();
        let rows: Vec<Value> = docs
            .range(key("startkey")..key("endkey"))
            .map(|(id, doc)| {
                json!({
                    "id": id,
                    "value": { "rev": doc["_rev"] },
                    "doc": if include_docs { doc.clone() } else { Value::Null },
                })
            })
            .collect();
        Json(json!({ "rows": rows }))
    }

    async fn put_doc(
        State(couch): State<Fake>,
        Path((_, id)): Path<(String, String)>,
        Json(mut doc): Json<Value>,
    ) -> (HttpStatus, Json<Value>) {
        let conflict = (HttpStatus::CONFLICT, Json(json!({ "error": "conflict" })));
        let mut docs = couch.docs.lock().unwrap();

        if id == GAME_DOC_ID {
            couch.game_puts.fetch_add(1, Ordering::SeqCst);
            if docs.contains_key(&id) && couch.lose_next_game_write() {
                let rev = couch.rev();
                if let Some(stored) = docs.get_mut(&id) {
                    stored["_rev"] = json!(rev);
                }
                return conflict;
            }
        }

        let stored_rev = docs.get(&id).and_then(|stored| stored.get("_rev")).cloned();
        if stored_rev != doc.get("_rev").cloned() {
            return conflict;
        }

        let rev = couch.rev();
        doc["_rev"] = json!(rev);
        docs.insert(id.clone(), doc);
        (
            HttpStatus::CREATED,
            Json(json!({ "ok": true, "id": id, "rev": rev })),
        )
    }

    async fn bulk_docs(
        State(couch): State<Fake>,
        Path((_, endpoint)): Path<(String, String)>,
        Json(body): Json<Value>,
    ) -> HttpStatus {
        if endpoint != "_bulk_docs" {
            return HttpStatus::NOT_FOUND;
        }
        let mut docs = couch.docs.lock().unwrap();
        for doc in body["docs"].as_array().into_iter().flatten() {
            if let Some(id) = doc["_id"].as_str() {
                docs.remove(id);
            }
        }
        HttpStatus::CREATED
    }

    async fn spawn_couch() -> (Fake, CouchScoreStore) {
        let couch = Fake::default();
        let app = Router::new()
            .route("/{db}", get(|| async { HttpStatus::OK }))
            .route("/{db}/{doc}", get(get_doc).put(put_doc).post(bulk_docs))
            .with_state(couch.clone());

        let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
            .await
            .unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let store = CouchScoreStore::connect(CouchConfig::new(format!("http://{addr}"), "darts"))
            .await
            .unwrap();
        store
            .ensure_game(vec![
                TeamEntity {
                    id: "team1".into(),
                    name: "Team 1".into(),
                },
                TeamEntity {
                    id: "team2".into(),
                    name: "Team 2".into(),
                },
            ])
            .await
            .unwrap();
        couch.game_puts.store(0, Ordering::SeqCst);

        (couch, store)
    }

    fn visit(team_id: &str, value: u8) -> ScoreEntity {
        ScoreEntity {
            team_id: team_id.into(),
            value,
            recorded_at: SystemTime::now(),
        }
    }

    #[tokio::test]
    async fn seeding_twice_keeps_the_existing_game() {
        let (couch, store) = spawn_couch().await;
        store.start_timer(SystemTime::now()).await.unwrap();

        store.ensure_game(Vec::new()).await.unwrap();

        let game = store.load_game().await.unwrap().unwrap();
        assert_eq!(game.teams.len(), 2);
        assert!(game.started_at.is_some());
        assert_eq!(couch.game()["epoch"], json!(0));
    }

    #[tokio::test]
    async fn update_retries_after_a_revision_conflict() {
        let (couch, store) = spawn_couch().await;
        couch.lost_game_writes.store(1, Ordering::SeqCst);

        let now = SystemTime::now();
        assert_eq!(store.start_timer(now).await.unwrap(), now);

        assert_eq!(couch.game_puts.load(Ordering::SeqCst), 2);
        let game = store.load_game().await.unwrap().unwrap();
        assert_eq!(game.started_at, Some(now));
    }

    #[tokio::test]
    async fn second_start_keeps_the_first_and_writes_nothing() {
        let (couch, store) = spawn_couch().await;
        let first = SystemTime::now();

        assert_eq!(store.start_timer(first).await.unwrap(), first);
        let later = first + Duration::from_secs(5);
        assert_eq!(store.start_timer(later).await.unwrap(), first);

        assert_eq!(couch.game_puts.load(Ordering::SeqCst), 1);
        let game = store.load_game().await.unwrap().unwrap();
        assert_eq!(game.started_at, Some(first));
    }

    #[tokio::test]
    async fn reset_bumps_the_epoch_and_purges_old_scores() {
        let (couch, store) = spawn_couch().await;
        store.start_timer(SystemTime::now()).await.unwrap();
        assert!(store.append_score(visit("team1", 60)).await.unwrap());
        assert!(store.append_score(visit("team2", 180)).await.unwrap());
        assert!(!store.append_score(visit("team9", 20)).await.unwrap());
        assert_eq!(store.list_scores(None).await.unwrap().len(), 2);
        assert_eq!(store.list_scores(Some("team2".into())).await.unwrap().len(), 1);

        store.reset_game().await.unwrap();

        assert_eq!(couch.game()["epoch"], json!(1));
        assert!(store.list_scores(None).await.unwrap().is_empty());
        assert_eq!(couch.score_count(), 0);
        let game = store.load_game().await.unwrap().unwrap();
        assert_eq!(game.started_at, None);

        assert!(store.append_score(visit("team1", 100)).await.unwrap());
        let scores = store.list_scores(None).await.unwrap();
        assert_eq!(scores.len(), 1);
        assert_eq!(scores[0].value, 100);
    }

    #[tokio::test]
    async fn persistent_conflicts_give_up_without_changing_the_game() {
        let (couch, store) = spawn_couch().await;
        couch
            .lost_game_writes
            .store(MAX_CONFLICT_RETRIES, Ordering::SeqCst);

        let err = store.reset_game().await.unwrap_err();
        match err {
            CouchDaoError::Conflict { path, attempts } => {
                assert_eq!(path, GAME_DOC_ID);
                assert_eq!(attempts, MAX_CONFLICT_RETRIES);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(couch.game_puts.load(Ordering::SeqCst), MAX_CONFLICT_RETRIES);
        assert_eq!(couch.game()["epoch"], json!(0));
    }
}
