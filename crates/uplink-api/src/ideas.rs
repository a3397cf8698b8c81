//! Handlers for `/ideas/{id}/…` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/ideas/{id}/submit` | Appends `submitted` |
//! | `POST` | `/ideas/{id}/analyze` | Body: idea; `202` when analysis is pending |
//! | `POST` | `/ideas/{id}/score` | Body: idea + `subScores`; `400` if out of range |
//! | `GET`  | `/ideas/{id}/score` | Latest score record; `404` if none |
//! | `GET`  | `/ideas/{id}/timeline` | Events ascending by `seq` |
//! | `GET`  | `/ideas/{id}/stage` | `"none"` when the idea has no events |
//! | `POST` | `/ideas/{id}/matches` | Body: idea + `opportunities` |
//! | `POST` | `/ideas/{id}/events` | Body: milestone |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use uplink_core::{
  IdeaId, UserId,
  idea::IdeaSubmission,
  journey::{JourneyEvent, Stage},
  matching::OpportunityFeatures,
  score::{ScoreRecord, SubScores},
  store::IdeaStore,
};
use uplink_engine::{
  AnalysisOutcome, MatchOutcome, Milestone, PipelineDeps, RoutedIdea, RoutingPipeline,
};

use crate::error::ApiError;

type Pipeline<D> = Arc<RoutingPipeline<D>>;

// ─── Bodies ──────────────────────────────────────────────────────────────────

/// An idea as posted by the platform; the id comes from the path.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdeaBody {
  pub owner_id:    UserId,
  pub title:       String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub category:    Option<String>,
  #[serde(default)]
  pub industry:    Option<String>,
  #[serde(default)]
  pub keywords:    Vec<String>,
}

impl IdeaBody {
  pub fn into_submission(self, idea_id: IdeaId) -> IdeaSubmission {
    IdeaSubmission {
      idea_id,
      owner_id: self.owner_id,
      title: self.title,
      description: self.description,
      category: self.category,
      industry: self.industry,
      keywords: self.keywords,
    }
  }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBody {
  #[serde(flatten)]
  pub idea:       IdeaBody,
  pub sub_scores: SubScores,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchBody {
  #[serde(flatten)]
  pub idea:          IdeaBody,
  pub opportunities: Vec<OpportunityFeatures>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageResponse {
  pub idea_id: IdeaId,
  pub stage:   Stage,
}

fn store_err<D: PipelineDeps>(e: <D::Store as IdeaStore>::Error) -> ApiError {
  ApiError::store(e)
}

// ─── Pipeline operations ─────────────────────────────────────────────────────

/// `POST /ideas/{id}/submit`
pub async fn submit<D: PipelineDeps>(
  State(pipeline): State<Pipeline<D>>,
  Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
  let event = pipeline.submit(IdeaId(id)).await?;
  Ok((StatusCode::CREATED, Json(event)))
}

/// `POST /ideas/{id}/analyze`
pub async fn analyze<D: PipelineDeps>(
  State(pipeline): State<Pipeline<D>>,
  Path(id): Path<i64>,
  Json(body): Json<IdeaBody>,
) -> Result<impl IntoResponse, ApiError> {
  let idea = body.into_submission(IdeaId(id));
  let outcome = pipeline.analyze(&idea).await?;
  let status = match outcome {
    AnalysisOutcome::Routed(_) => StatusCode::OK,
    AnalysisOutcome::Pending { .. } => StatusCode::ACCEPTED,
  };
  Ok((status, Json(outcome)))
}

/// `POST /ideas/{id}/score`
pub async fn route_scores<D: PipelineDeps>(
  State(pipeline): State<Pipeline<D>>,
  Path(id): Path<i64>,
  Json(body): Json<ScoreBody>,
) -> Result<Json<RoutedIdea>, ApiError> {
  let idea = body.idea.into_submission(IdeaId(id));
  let routed = pipeline.route_scores(&idea, body.sub_scores).await?;
  Ok(Json(routed))
}

/// `POST /ideas/{id}/matches`
pub async fn matches<D: PipelineDeps>(
  State(pipeline): State<Pipeline<D>>,
  Path(id): Path<i64>,
  Json(body): Json<MatchBody>,
) -> Result<Json<MatchOutcome>, ApiError> {
  let idea = body.idea.into_submission(IdeaId(id));
  let outcome = pipeline.match_idea(&idea, &body.opportunities).await?;
  Ok(Json(outcome))
}

/// `POST /ideas/{id}/events`
pub async fn milestone<D: PipelineDeps>(
  State(pipeline): State<Pipeline<D>>,
  Path(id): Path<i64>,
  Json(body): Json<Milestone>,
) -> Result<impl IntoResponse, ApiError> {
  let event = pipeline.record_milestone(IdeaId(id), body).await?;
  Ok((StatusCode::CREATED, Json(event)))
}

// ─── Reads ───────────────────────────────────────────────────────────────────

/// `GET /ideas/{id}/score`
pub async fn latest_score<D: PipelineDeps>(
  State(pipeline): State<Pipeline<D>>,
  Path(id): Path<i64>,
) -> Result<Json<ScoreRecord>, ApiError> {
  let record = pipeline
    .store()
    .latest_score(IdeaId(id))
    .await
    .map_err(store_err::<D>)?
    .ok_or_else(|| ApiError::NotFound(format!("idea {id} has no score")))?;
  Ok(Json(record))
}

/// `GET /ideas/{id}/timeline`
pub async fn timeline<D: PipelineDeps>(
  State(pipeline): State<Pipeline<D>>,
  Path(id): Path<i64>,
) -> Result<Json<Vec<JourneyEvent>>, ApiError> {
  let events = pipeline
    .store()
    .timeline(IdeaId(id))
    .await
    .map_err(store_err::<D>)?;
  Ok(Json(events))
}

/// `GET /ideas/{id}/stage`
pub async fn stage<D: PipelineDeps>(
  State(pipeline): State<Pipeline<D>>,
  Path(id): Path<i64>,
) -> Result<Json<StageResponse>, ApiError> {
  let stage = pipeline
    .store()
    .current_stage(IdeaId(id))
    .await
    .map_err(store_err::<D>)?;
  Ok(Json(StageResponse { idea_id: IdeaId(id), stage }))
}
