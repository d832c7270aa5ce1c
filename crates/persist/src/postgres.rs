//! Postgres message store
//!
//! Implements the two-statement contract with multi-row statements built
//! through `QueryBuilder`, so each flush is a single round trip per table.

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder};

use roomcast_protocol::QueueMessage;

use crate::store::{MessageStore, UserActivityRow};
use crate::StoreError;

/// Relational store backed by a Postgres pool.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connect with the given pool size.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        tracing::info!(max_connections, "postgres store connected");
        Ok(Self { pool })
    }

    /// Wrap an existing pool (tests, shared pools).
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageStore for PostgresStore {
    async fn batch_insert_messages(
        &self,
        messages: &[QueueMessage],
    ) -> Result<Vec<String>, StoreError> {
        if messages.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO messages \
             (message_id, room_id, user_id, username, message_text, message_type, \
              server_id, client_ip, created_at) ",
        );
        builder.push_values(messages, |mut row, msg| {
            row.push_bind(&msg.message_id)
                .push_bind(msg.room_id as i32)
                .push_bind(&msg.user_id)
                .push_bind(&msg.username)
                .push_bind(&msg.message)
                .push_bind(msg.message_type.to_string())
                .push_bind(&msg.server_id)
                .push_bind(&msg.client_ip)
                .push_bind(msg.timestamp_as_instant());
        });
        // RETURNING reports only the rows this statement created, which is
        // exactly the non-duplicate subset the caller needs for rollups.
        builder.push(" ON CONFLICT (message_id) DO NOTHING RETURNING message_id");

        let inserted: Vec<String> = builder
            .build_query_scalar()
            .fetch_all(&self.pool)
            .await?;

        tracing::debug!(
            batch = messages.len(),
            inserted = inserted.len(),
            duplicates = messages.len() - inserted.len(),
            "message batch inserted"
        );
        Ok(inserted)
    }

    async fn batch_upsert_user_activity(
        &self,
        rows: &[UserActivityRow],
    ) -> Result<(), StoreError> {
        if rows.is_empty() {
            return Ok(());
        }

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO user_activity \
             (user_id, room_id, first_activity, last_activity, message_count) ",
        );
        builder.push_values(rows, |mut row, activity| {
            row.push_bind(&activity.user_id)
                .push_bind(activity.room_id as i32)
                .push_bind(activity.activity_at)
                .push_bind(activity.activity_at)
                .push_bind(1i64);
        });
        // last_activity never regresses under out-of-order flushes.
        builder.push(
            " ON CONFLICT (user_id, room_id) DO UPDATE SET \
             last_activity = GREATEST(user_activity.last_activity, EXCLUDED.last_activity), \
             message_count = user_activity.message_count + 1",
        );

        builder.build().execute(&self.pool).await?;
        tracing::debug!(rows = rows.len(), "user activity upserted");
        Ok(())
    }

    async fn health_check(&self) -> bool {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .is_ok()
    }
}
