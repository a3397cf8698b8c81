//! Integration tests for `SqliteStore` against an in-memory database.

use uplink_core::{
  IdeaId, OpportunityId,
  journey::{JourneyKind, JourneyPayload, NewJourneyEvent, Stage},
  matching::OpportunityKind,
  routing::{Path, RoutingDecision},
  score::{ScoreRecord, SubScores},
  store::IdeaStore,
};

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

// ─── Score records ───────────────────────────────────────────────────────────

#[tokio::test]
async fn record_and_read_latest_score() {
  let s = store().await;
  assert!(s.latest_score(IdeaId(1)).await.unwrap().is_none());

  let first = ScoreRecord::new(IdeaId(1), SubScores::uniform(55.0)).unwrap();
  let second = ScoreRecord::new(IdeaId(1), SubScores::uniform(81.0)).unwrap();
  s.record_score(&first).await.unwrap();
  s.record_score(&second).await.unwrap();

  let latest = s.latest_score(IdeaId(1)).await.unwrap().unwrap();
  assert_eq!(latest.record_id, second.record_id);
  assert_eq!(latest.sub_scores, second.sub_scores);
  assert_eq!(latest.overall_score, second.overall_score);
  assert_eq!(latest.evaluated_at, second.evaluated_at);
}

#[tokio::test]
async fn scores_are_per_idea() {
  let s = store().await;
  let a = ScoreRecord::new(IdeaId(1), SubScores::uniform(10.0)).unwrap();
  s.record_score(&a).await.unwrap();
  assert!(s.latest_score(IdeaId(2)).await.unwrap().is_none());
}

#[tokio::test]
async fn out_of_range_record_is_rejected() {
  let s = store().await;
  let mut bad = ScoreRecord::new(IdeaId(1), SubScores::uniform(50.0)).unwrap();
  bad.sub_scores.novelty = 120.0;
  let err = s.record_score(&bad).await.unwrap_err();
  assert!(matches!(err, Error::Core(_)));
  assert!(s.latest_score(IdeaId(1)).await.unwrap().is_none());
}

// ─── Journey ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn empty_journey() {
  let s = store().await;
  assert!(s.timeline(IdeaId(9)).await.unwrap().is_empty());
  assert_eq!(s.current_stage(IdeaId(9)).await.unwrap(), Stage::NotStarted);
}

#[tokio::test]
async fn append_assigns_seq_and_timestamps() {
  let s = store().await;
  let kinds = [
    JourneyKind::Submitted,
    JourneyKind::Analyzed,
    JourneyKind::Routed,
    JourneyKind::Funded,
  ];
  for (i, kind) in kinds.iter().enumerate() {
    let e = s.append(NewJourneyEvent::new(IdeaId(3), kind.clone())).await.unwrap();
    assert_eq!(e.seq, i as u64 + 1);
    assert_eq!(&e.kind, kind);
    assert_eq!(s.current_stage(IdeaId(3)).await.unwrap(), Stage::At(kind.clone()));
  }

  let timeline = s.timeline(IdeaId(3)).await.unwrap();
  assert_eq!(timeline.len(), 4);
  for pair in timeline.windows(2) {
    assert!(pair[0].seq < pair[1].seq);
    assert!(pair[0].recorded_at <= pair[1].recorded_at);
  }
}

#[tokio::test]
async fn payloads_round_trip() {
  let s = store().await;
  let routing = JourneyPayload::Routing {
    decision:      RoutingDecision::for_path(Path::Commercial),
    overall_score: 64.5,
  };
  let matched = JourneyPayload::Match {
    opportunity_id:   OpportunityId(12),
    opportunity_kind: OpportunityKind::Investor,
    match_score:      77.0,
    candidates:       5,
  };
  s.append(NewJourneyEvent::new(IdeaId(4), JourneyKind::Routed).with_payload(routing.clone()))
    .await
    .unwrap();
  s.append(NewJourneyEvent::new(IdeaId(4), JourneyKind::Matched).with_payload(matched.clone()))
    .await
    .unwrap();
  s.append(NewJourneyEvent::new(IdeaId(4), JourneyKind::Other("pilot".into())))
    .await
    .unwrap();

  let timeline = s.timeline(IdeaId(4)).await.unwrap();
  assert_eq!(timeline[0].payload, Some(routing));
  assert_eq!(timeline[1].payload, Some(matched));
  assert_eq!(timeline[2].payload, None);
  assert_eq!(timeline[2].kind, JourneyKind::Other("pilot".into()));
}

#[tokio::test]
async fn ideas_have_independent_sequences() {
  let s = store().await;
  s.append(NewJourneyEvent::new(IdeaId(1), JourneyKind::Submitted)).await.unwrap();
  s.append(NewJourneyEvent::new(IdeaId(1), JourneyKind::Analyzed)).await.unwrap();
  let other = s.append(NewJourneyEvent::new(IdeaId(2), JourneyKind::Submitted)).await.unwrap();
  assert_eq!(other.seq, 1);
  assert_eq!(s.current_stage(IdeaId(1)).await.unwrap(), Stage::At(JourneyKind::Analyzed));
}

#[tokio::test]
async fn concurrent_appends_are_gap_free() {
  let s = store().await;
  let mut tasks = Vec::new();
  for n in 0..20 {
    let s = s.clone();
    tasks.push(tokio::spawn(async move {
      s.append(NewJourneyEvent::new(IdeaId(5), JourneyKind::Other(format!("step-{n}"))))
        .await
        .unwrap()
    }));
  }
  for t in tasks {
    t.await.unwrap();
  }

  let seqs: Vec<u64> = s.timeline(IdeaId(5)).await.unwrap().iter().map(|e| e.seq).collect();
  assert_eq!(seqs, (1..=20).collect::<Vec<_>>());
}

#[tokio::test]
async fn interleaved_appends_across_ideas_all_complete() {
  let s = store().await;
  let mut tasks = Vec::new();
  for n in 0..30 {
    let s = s.clone();
    let idea = IdeaId(100 + n % 3);
    tasks.push(tokio::spawn(async move {
      s.append(NewJourneyEvent::new(idea, JourneyKind::Other(format!("step-{n}"))))
        .await
        .unwrap()
    }));
  }
  for t in tasks {
    t.await.unwrap();
  }

  for idea in [IdeaId(100), IdeaId(101), IdeaId(102)] {
    let timeline = s.timeline(idea).await.unwrap();
    let seqs: Vec<u64> = timeline.iter().map(|e| e.seq).collect();
    assert_eq!(seqs, (1..=10).collect::<Vec<_>>());
    assert!(timeline.windows(2).all(|w| w[0].recorded_at <= w[1].recorded_at));
  }
}

#[tokio::test]
async fn file_store_persists_across_reopen() {
  let path = std::env::temp_dir().join(format!("uplink-store-{}.db", uuid::Uuid::new_v4()));
  {
    let s = SqliteStore::open(&path).await.unwrap();
    s.append(NewJourneyEvent::new(IdeaId(1), JourneyKind::Submitted)).await.unwrap();
  }
  let s = SqliteStore::open(&path).await.unwrap();
  assert_eq!(s.current_stage(IdeaId(1)).await.unwrap(), Stage::At(JourneyKind::Submitted));
  drop(s);
  let _ = std::fs::remove_file(&path);
}
