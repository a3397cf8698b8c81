//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, sub-scores and journey
//! payloads as compact JSON, UUIDs as hyphenated lowercase strings.

use chrono::{DateTime, Utc};
use uplink_core::{
  IdeaId,
  journey::{JourneyEvent, JourneyKind, JourneyPayload},
  score::{ScoreRecord, SubScores},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── JSON columns ────────────────────────────────────────────────────────────

pub fn encode_sub_scores(s: &SubScores) -> Result<String> { Ok(serde_json::to_string(s)?) }

pub fn encode_payload(p: Option<&JourneyPayload>) -> Result<Option<String>> {
  p.map(serde_json::to_string).transpose().map_err(Error::from)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `score_records` row.
pub struct RawScoreRecord {
  pub record_id:     String,
  pub idea_id:       i64,
  pub sub_scores:    String,
  pub overall_score: f64,
  pub evaluated_at:  String,
}

impl RawScoreRecord {
  /// Decoded records are re-validated; a row that breaks the score bounds
  /// is reported, not clamped.
  pub fn into_record(self) -> Result<ScoreRecord> {
    let record = ScoreRecord {
      record_id:     decode_uuid(&self.record_id)?,
      idea_id:       IdeaId(self.idea_id),
      sub_scores:    serde_json::from_str(&self.sub_scores)?,
      overall_score: self.overall_score,
      evaluated_at:  decode_dt(&self.evaluated_at)?,
    };
    record.validate()?;
    Ok(record)
  }
}

/// Raw values read directly from a `journey_events` row.
pub struct RawJourneyEvent {
  pub idea_id:     i64,
  pub seq:         i64,
  pub kind:        String,
  pub recorded_at: String,
  pub payload:     Option<String>,
}

impl RawJourneyEvent {
  pub fn into_event(self) -> Result<JourneyEvent> {
    Ok(JourneyEvent {
      idea_id:     IdeaId(self.idea_id),
      seq:         u64::try_from(self.seq).map_err(|_| Error::Sequence(self.seq))?,
      kind:        JourneyKind::parse(&self.kind),
      recorded_at: decode_dt(&self.recorded_at)?,
      payload:     self
        .payload
        .as_deref()
        .map(serde_json::from_str)
        .transpose()?,
    })
  }
}
