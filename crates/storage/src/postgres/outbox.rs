//! Postgres-backed at-least-once delivery channel.
//!
//! The dispatcher (out of process) appends raw log envelopes to the
//! `raw_log_deliveries` table; this adapter leases them out to the
//! projector. A lease is a `locked_until` timestamp claimed under
//! `FOR UPDATE SKIP LOCKED`, so concurrent pollers never hand out the
//! same row twice while the lease holds. Rows that exhaust their
//! attempts are dead-lettered and left in the table for inspection.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, warn};

use tally_core::error::{DeliveryError, DeliveryResult};
use tally_core::ports::{LogDelivery, LogEnvelope, LogSource};

/// Configuration for the delivery channel adapter.
#[derive(Debug, Clone)]
pub struct LogSourceConfig {
    /// How long a polled delivery stays invisible before redelivery.
    pub lease_duration: Duration,
    /// Deliveries that reach this many attempts are dead-lettered.
    pub max_attempts: i32,
}

impl Default for LogSourceConfig {
    fn default() -> Self {
        Self {
            lease_duration: Duration::from_secs(30),
            max_attempts: 10,
        }
    }
}

/// PostgreSQL implementation of the [`LogSource`] port.
pub struct PgLogSource {
    pool: PgPool,
    config: LogSourceConfig,
}

impl PgLogSource {
    pub fn new(pool: PgPool, config: LogSourceConfig) -> Self {
        Self { pool, config }
    }

    /// Append an envelope to the channel. This is the dispatcher-side
    /// write, exposed here for tooling and tests.
    pub async fn push(&self, envelope: &LogEnvelope) -> DeliveryResult<i64> {
        let payload = serde_json::to_value(envelope).map_err(|e| {
            DeliveryError::PollError(format!("envelope serialization failed: {e}"))
        })?;

        let (id,): (i64,) =
            sqlx::query_as("INSERT INTO raw_log_deliveries (envelope) VALUES ($1) RETURNING id")
                .bind(payload)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| DeliveryError::PollError(e.to_string()))?;

        Ok(id)
    }

    /// Move rows that exhausted their attempts out of the pending set.
    async fn dead_letter_exhausted(&self) -> DeliveryResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE raw_log_deliveries
            SET dead_lettered_at = now()
            WHERE processed_at IS NULL
              AND dead_lettered_at IS NULL
              AND attempts >= $1
              AND (locked_until IS NULL OR locked_until < now())
            "#,
        )
        .bind(self.config.max_attempts)
        .execute(&self.pool)
        .await
        .map_err(|e| DeliveryError::PollError(e.to_string()))?;

        Ok(result.rows_affected())
    }

    /// A leased row whose payload no longer deserializes can never be
    /// processed; park it immediately instead of burning its attempts.
    async fn dead_letter_row(&self, delivery_id: i64) -> DeliveryResult<()> {
        sqlx::query(
            "UPDATE raw_log_deliveries SET dead_lettered_at = now() WHERE id = $1",
        )
        .bind(delivery_id)
        .execute(&self.pool)
        .await
        .map_err(|e| DeliveryError::PollError(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl LogSource for PgLogSource {
    async fn poll(&self, limit: u32) -> DeliveryResult<Vec<LogDelivery>> {
        let dead = self.dead_letter_exhausted().await?;
        if dead > 0 {
            warn!(count = dead, "💀 Deliveries dead-lettered after max attempts");
        }

        let rows: Vec<(i64, i32, serde_json::Value)> = sqlx::query_as(
            r#"
            WITH leased AS (
                SELECT id FROM raw_log_deliveries
                WHERE processed_at IS NULL
                  AND dead_lettered_at IS NULL
                  AND (locked_until IS NULL OR locked_until < now())
                ORDER BY id
                LIMIT $1
                FOR UPDATE SKIP LOCKED
            )
            UPDATE raw_log_deliveries d
            SET attempts = d.attempts + 1,
                locked_until = now() + make_interval(secs => $2)
            FROM leased
            WHERE d.id = leased.id
            RETURNING d.id, d.attempts, d.envelope
            "#,
        )
        .bind(limit as i64)
        .bind(self.config.lease_duration.as_secs_f64())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DeliveryError::PollError(e.to_string()))?;

        let mut deliveries = Vec::with_capacity(rows.len());
        for (delivery_id, attempts, payload) in rows {
            match serde_json::from_value::<LogEnvelope>(payload) {
                Ok(envelope) => deliveries.push(LogDelivery {
                    delivery_id,
                    attempts,
                    envelope,
                }),
                Err(e) => {
                    warn!(
                        delivery = delivery_id,
                        error = %e,
                        "💀 Malformed delivery payload, dead-lettering"
                    );
                    self.dead_letter_row(delivery_id).await?;
                }
            }
        }

        if !deliveries.is_empty() {
            debug!(count = deliveries.len(), "Deliveries leased");
        }

        Ok(deliveries)
    }

    async fn ack(&self, delivery_id: i64) -> DeliveryResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE raw_log_deliveries
            SET processed_at = now(), locked_until = NULL
            WHERE id = $1 AND processed_at IS NULL
            "#,
        )
        .bind(delivery_id)
        .execute(&self.pool)
        .await
        .map_err(|e| DeliveryError::AckError {
            delivery_id,
            message: e.to_string(),
        })?;

        if result.rows_affected() == 0 {
            // Already acked by a concurrent attempt; harmless for an
            // idempotent pipeline.
            debug!(delivery = delivery_id, "Ack matched no pending delivery");
        }

        Ok(())
    }
}
