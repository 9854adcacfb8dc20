use async_trait::async_trait;
use futures_util::{TryStreamExt, stream};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgPoolOptions, postgres::PgRow};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    AppendResult, EventId, EventStoreConfig, EventStoreError, ExpectedStreamVersion, Result,
    RetryPolicy, StreamEvent, StreamEventMetadata, StreamName, StreamReadPosition, Version,
    store::{
        EventStore, EventStream, observe_rejection, position_events, validate_events_for_append,
    },
};

const SELECT_COLUMNS: &str = r#"
    SELECT event_id, event_type, aggregate_id, aggregate_sequence_number, occurred_on,
           payload, stream_position, causation_id, correlation_id
    FROM stream_events
"#;

/// PostgreSQL-backed event store implementation.
///
/// Each append runs in one transaction that serializes writers per stream
/// with an advisory lock; the `unique_stream_position` constraint backs the
/// version check up if two writers still race.
#[derive(Clone)]
pub struct PostgresEventStore {
    pool: PgPool,
    read_batch_size: i64,
    retry: RetryPolicy,
}

impl PostgresEventStore {
    /// Creates a new PostgreSQL event store with default settings.
    pub fn new(pool: PgPool) -> Self {
        Self::with_config(pool, &EventStoreConfig::default())
    }

    /// Creates a store over an existing pool using the given settings.
    pub fn with_config(pool: PgPool, config: &EventStoreConfig) -> Self {
        Self {
            pool,
            read_batch_size: config.read_batch_size.max(1),
            retry: config.retry_policy(),
        }
    }

    /// Connects to the database named by the configuration.
    pub async fn connect(config: &EventStoreConfig) -> Result<Self> {
        let url = config.database_url.as_deref().ok_or_else(|| {
            EventStoreError::Configuration("DATABASE_URL is not set".to_string())
        })?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(url)
            .await?;

        tracing::info!(
            max_connections = config.max_connections,
            "connected to event store database"
        );
        Ok(Self::with_config(pool, config))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_event(row: PgRow) -> Result<StreamEvent> {
        let event_id = EventId::from_uuid(row.try_get::<Uuid, _>("event_id")?);

        Ok(StreamEvent {
            event_id,
            event_type: row.try_get("event_type")?,
            aggregate_id: row.try_get("aggregate_id")?,
            aggregate_sequence_number: Version::new(row.try_get("aggregate_sequence_number")?),
            occurred_on: row.try_get("occurred_on")?,
            payload: row.try_get("payload")?,
            metadata: Some(StreamEventMetadata {
                event_id,
                stream_position: Version::new(row.try_get("stream_position")?),
                causation_id: row.try_get("causation_id")?,
                correlation_id: row.try_get("correlation_id")?,
            }),
        })
    }

    async fn current_version(
        executor: &mut Transaction<'_, Postgres>,
        stream: &StreamName,
    ) -> Result<Option<Version>> {
        let version: Option<i64> = sqlx::query_scalar(
            "SELECT MAX(stream_position) FROM stream_events WHERE stream_name = $1",
        )
        .bind(stream.to_string())
        .fetch_one(&mut **executor)
        .await?;

        Ok(version.map(Version::new))
    }

    async fn append_once(
        &self,
        stream: &StreamName,
        events: &[StreamEvent],
        expected: ExpectedStreamVersion,
        cancel: &CancellationToken,
    ) -> Result<AppendResult> {
        let stream_name = stream.to_string();
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(&stream_name)
            .execute(&mut *tx)
            .await?;

        let actual = Self::current_version(&mut tx, stream).await?;
        expected.check(stream, actual)?;

        let (positioned, version) = position_events(events.to_vec(), actual.unwrap_or_default());

        for event in &positioned {
            let position = event.stream_position().unwrap_or(version);
            let (causation_id, correlation_id) = event
                .metadata
                .as_ref()
                .map(|m| (m.causation_id.as_deref(), m.correlation_id.as_deref()))
                .unwrap_or_default();

            sqlx::query(
                r#"
                INSERT INTO stream_events (
                    stream_name, stream_position, event_id, event_type, aggregate_id,
                    aggregate_sequence_number, occurred_on, payload, causation_id, correlation_id
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(&stream_name)
            .bind(position.as_i64())
            .bind(event.event_id.as_uuid())
            .bind(&event.event_type)
            .bind(&event.aggregate_id)
            .bind(event.aggregate_sequence_number.as_i64())
            .bind(event.occurred_on)
            .bind(&event.payload)
            .bind(causation_id)
            .bind(correlation_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e {
                    match db_err.constraint() {
                        Some("unique_stream_position") => {
                            return EventStoreError::ConcurrencyConflict {
                                stream: stream.clone(),
                                expected,
                                actual: position,
                            };
                        }
                        Some("stream_events_event_id_key") => {
                            return EventStoreError::InvalidAppend(format!(
                                "event {} is already stored",
                                event.event_id
                            ));
                        }
                        _ => {}
                    }
                }
                EventStoreError::Database(e)
            })?;
        }

        if cancel.is_cancelled() {
            tx.rollback().await?;
            return Err(EventStoreError::Cancelled);
        }

        tx.commit().await?;
        Ok(AppendResult::new(version))
    }
}

/// Paging state for a forward stream read.
struct ReadCursor {
    pool: PgPool,
    stream_name: String,
    next: i64,
    tail: i64,
    batch_size: i64,
    cancel: CancellationToken,
}

impl ReadCursor {
    async fn next_page(mut self) -> Result<Option<(Vec<StreamEvent>, Self)>> {
        if self.next > self.tail {
            return Ok(None);
        }
        if self.cancel.is_cancelled() {
            return Err(EventStoreError::Cancelled);
        }

        let sql = format!(
            "{SELECT_COLUMNS} WHERE stream_name = $1 \
             AND stream_position >= $2 AND stream_position <= $3 \
             ORDER BY stream_position ASC LIMIT $4"
        );
        let rows = sqlx::query(&sql)
            .bind(&self.stream_name)
            .bind(self.next)
            .bind(self.tail)
            .bind(self.batch_size)
            .fetch_all(&self.pool)
            .await?;

        let events = rows
            .into_iter()
            .map(PostgresEventStore::row_to_event)
            .collect::<Result<Vec<_>>>()?;

        match events.last().and_then(StreamEvent::stream_position) {
            Some(last) => {
                self.next = last.as_i64() + 1;
                Ok(Some((events, self)))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl EventStore for PostgresEventStore {
    #[tracing::instrument(skip(self, events, cancel), fields(count = events.len()))]
    async fn append_events(
        &self,
        stream: &StreamName,
        events: Vec<StreamEvent>,
        expected: ExpectedStreamVersion,
        cancel: &CancellationToken,
    ) -> Result<AppendResult> {
        validate_events_for_append(&events)?;

        let result = self
            .retry
            .run("append_events", cancel, || {
                self.append_once(stream, &events, expected, cancel)
            })
            .await
            .inspect_err(observe_rejection)?;

        metrics::counter!("event_store_events_appended_total").increment(events.len() as u64);
        tracing::debug!(version = %result.next_expected_version, "appended events");

        Ok(result)
    }

    async fn get_stream_events(
        &self,
        stream: &StreamName,
        from: StreamReadPosition,
        cancel: &CancellationToken,
    ) -> Result<EventStream> {
        let Some(tail) = self.stream_version(stream, cancel).await? else {
            return Ok(Box::pin(stream::empty::<Result<StreamEvent>>()));
        };

        let cursor = ReadCursor {
            pool: self.pool.clone(),
            stream_name: stream.to_string(),
            next: from.position().as_i64(),
            tail: tail.as_i64(),
            batch_size: self.read_batch_size,
            cancel: cancel.clone(),
        };

        let events = stream::try_unfold(cursor, ReadCursor::next_page)
            .map_ok(|page| stream::iter(page.into_iter().map(Ok)))
            .try_flatten();

        Ok(Box::pin(events))
    }

    async fn stream_version(
        &self,
        stream: &StreamName,
        cancel: &CancellationToken,
    ) -> Result<Option<Version>> {
        let stream_name = &stream.to_string();
        let pool = &self.pool;

        self.retry
            .run("stream_version", cancel, move || async move {
                let version: Option<i64> = sqlx::query_scalar(
                    "SELECT MAX(stream_position) FROM stream_events WHERE stream_name = $1",
                )
                .bind(stream_name)
                .fetch_one(pool)
                .await?;

                Ok(version.map(Version::new))
            })
            .await
    }
}
