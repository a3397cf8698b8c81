//! [`SqliteStore`]: the SQLite implementation of [`IdeaStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::{OptionalExtension as _, TransactionBehavior};
use tracing::debug;
use uplink_core::{
  IdeaId,
  journey::{JourneyEvent, NewJourneyEvent, Stage, next_timestamp},
  score::ScoreRecord,
  store::IdeaStore,
};

use crate::{
  Result,
  encode::{
    RawJourneyEvent, RawScoreRecord, decode_dt, encode_dt, encode_payload,
    encode_sub_scores, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// Score records and journeys in a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. Every call
/// runs on the connection's own thread, one at a time, so appends are
/// serialised across all ideas. Each append is one short immediate
/// transaction (read the tail, insert one row) that holds no per-idea lock,
/// so an append only ever queues behind those already submitted and never
/// waits on another idea's state.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store; useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn read_timeline(&self, idea_id: IdeaId) -> Result<Vec<RawJourneyEvent>> {
    let id = idea_id.0;
    let raws = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT idea_id, seq, kind, recorded_at, payload
           FROM journey_events
           WHERE idea_id = ?1
           ORDER BY seq ASC",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![id], |row| {
            Ok(RawJourneyEvent {
              idea_id:     row.get(0)?,
              seq:         row.get(1)?,
              kind:        row.get(2)?,
              recorded_at: row.get(3)?,
              payload:     row.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(raws)
  }
}

// ─── IdeaStore impl ──────────────────────────────────────────────────────────

impl IdeaStore for SqliteStore {
  type Error = crate::Error;

  // ── Score records ─────────────────────────────────────────────────────────

  async fn record_score(&self, record: &ScoreRecord) -> Result<()> {
    record.validate()?;

    let record_id_str  = encode_uuid(record.record_id);
    let idea_id        = record.idea_id.0;
    let sub_scores_str = encode_sub_scores(&record.sub_scores)?;
    let overall        = record.overall_score;
    let at_str         = encode_dt(record.evaluated_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO score_records
             (record_id, idea_id, sub_scores, overall_score, evaluated_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![record_id_str, idea_id, sub_scores_str, overall, at_str],
        )?;
        Ok(())
      })
      .await?;
    debug!(idea_id = %record.idea_id, record_id = %record.record_id, "score recorded");
    Ok(())
  }

  async fn latest_score(&self, idea_id: IdeaId) -> Result<Option<ScoreRecord>> {
    let id = idea_id.0;
    let raw: Option<RawScoreRecord> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT record_id, idea_id, sub_scores, overall_score, evaluated_at
               FROM score_records
               WHERE idea_id = ?1
               ORDER BY rowid DESC
               LIMIT 1",
              rusqlite::params![id],
              |row| {
                Ok(RawScoreRecord {
                  record_id:     row.get(0)?,
                  idea_id:       row.get(1)?,
                  sub_scores:    row.get(2)?,
                  overall_score: row.get(3)?,
                  evaluated_at:  row.get(4)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawScoreRecord::into_record).transpose()
  }

  // ── Journey ───────────────────────────────────────────────────────────────

  async fn append(&self, event: NewJourneyEvent) -> Result<JourneyEvent> {
    let id          = event.idea_id.0;
    let kind_str    = event.kind.as_str().to_owned();
    let payload_str = encode_payload(event.payload.as_ref())?;

    // Read the tail and insert in one immediate transaction so that `seq`
    // and `recorded_at` follow the row they come after.
    let inserted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let tail: Option<(i64, String)> = tx
          .query_row(
            "SELECT seq, recorded_at FROM journey_events
             WHERE idea_id = ?1 ORDER BY seq DESC LIMIT 1",
            rusqlite::params![id],
            |row| Ok((row.get(0)?, row.get(1)?)),
          )
          .optional()?;

        let seq = tail.as_ref().map_or(1, |(s, _)| s + 1);
        let previous_at = tail
          .as_ref()
          .map(|(_, at)| decode_dt(at))
          .transpose()
          .map_err(|e| tokio_rusqlite::Error::Other(Box::new(e)))?;
        let at_str = encode_dt(next_timestamp(previous_at, Utc::now()));

        tx.execute(
          "INSERT INTO journey_events (idea_id, seq, kind, recorded_at, payload)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id, seq, kind_str, at_str, payload_str],
        )?;
        tx.commit()?;

        Ok(RawJourneyEvent {
          idea_id:     id,
          seq,
          kind:        kind_str,
          recorded_at: at_str,
          payload:     payload_str,
        })
      })
      .await?;

    let stored = inserted.into_event()?;
    debug!(idea_id = %stored.idea_id, seq = stored.seq, kind = %stored.kind, "journey event appended");
    Ok(stored)
  }

  async fn timeline(&self, idea_id: IdeaId) -> Result<Vec<JourneyEvent>> {
    self
      .read_timeline(idea_id)
      .await?
      .into_iter()
      .map(RawJourneyEvent::into_event)
      .collect()
  }

  async fn current_stage(&self, idea_id: IdeaId) -> Result<Stage> {
    let id = idea_id.0;
    let raw: Option<RawJourneyEvent> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT idea_id, seq, kind, recorded_at, payload
               FROM journey_events
               WHERE idea_id = ?1
               ORDER BY seq DESC
               LIMIT 1",
              rusqlite::params![id],
              |row| {
                Ok(RawJourneyEvent {
                  idea_id:     row.get(0)?,
                  seq:         row.get(1)?,
                  kind:        row.get(2)?,
                  recorded_at: row.get(3)?,
                  payload:     row.get(4)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    match raw {
      Some(raw) => Ok(Stage::At(raw.into_event()?.kind)),
      None => Ok(Stage::NotStarted),
    }
  }
}
