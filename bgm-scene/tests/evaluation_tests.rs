//! Evaluation recording tests

mod helpers;

use bgm_common::events::EvaluationTarget;
use bgm_scene::models::{EvaluationSubmission, HumanScores};
use bgm_scene::SceneError;
use helpers::*;
use std::time::Duration;

fn scores(d: u8, s: u8, a: u8) -> HumanScores {
    HumanScores {
        dramatization: d,
        sync_accuracy: s,
        atmospheric_depth: a,
    }
}

fn submission(target: EvaluationTarget, scores: HumanScores) -> EvaluationSubmission {
    EvaluationSubmission {
        evaluator: "  listener  ".to_string(),
        target,
        scores,
        comment: Some("rain feels close".to_string()),
    }
}

/// TC-EVAL-001: A master evaluation is stored and forwarded with the master audio
#[tokio::test]
async fn tc_eval_001_master_evaluation_forwarded() {
    let backend = ScriptedBackend::abc();
    let (state, mut rx) = test_state_with_sink(backend);
    state
        .pipeline
        .run_story(&state.scene, "Rain on a tin roof.", 2.0, true)
        .await
        .unwrap();
    let artifact_id = state
        .scene
        .read()
        .await
        .as_ref()
        .unwrap()
        .master
        .as_ref()
        .unwrap()
        .artifact_id;

    let record = state
        .evaluations
        .submit(
            &state.scene,
            submission(EvaluationTarget::Master { artifact_id }, scores(4, 3, 5)),
        )
        .await
        .unwrap();

    assert_eq!(record.evaluator, "listener");
    let forwarded = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(forwarded.evaluation_id, record.evaluation_id);
    assert_eq!(forwarded.source_text, "Rain on a tin roof.");
    assert_eq!(forwarded.feedback.as_deref(), Some("rain feels close"));
    assert_eq!(forwarded.audio_base64, Some(b64(b"master:3")));

    let listed = state.evaluations.list(&state.scene).await.unwrap();
    assert_eq!(listed, vec![record]);
}

/// TC-EVAL-002: A cue evaluation is attached to that cue only
#[tokio::test]
async fn tc_eval_002_cue_evaluation() {
    let backend = ScriptedBackend::abc();
    let state = test_state(backend);
    let ids = decompose(&state).await;

    state
        .evaluations
        .submit(
            &state.scene,
            submission(EvaluationTarget::Cue { cue_id: ids[1] }, scores(2, 2, 2)),
        )
        .await
        .unwrap();

    let guard = state.scene.read().await;
    let registry = &guard.as_ref().unwrap().registry;
    assert_eq!(registry.get(ids[1]).unwrap().evaluation(), Some(&scores(2, 2, 2)));
    assert!(registry.get(ids[0]).unwrap().evaluation().is_none());
}

/// TC-EVAL-003: Out-of-range scores and stale targets are rejected
#[tokio::test]
async fn tc_eval_003_rejections() {
    let backend = ScriptedBackend::abc();
    let state = test_state(backend);
    decompose(&state).await;

    let err = state
        .evaluations
        .submit(
            &state.scene,
            submission(EvaluationTarget::Cue { cue_id: uuid::Uuid::new_v4() }, scores(0, 3, 3)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SceneError::InvalidEvaluation(_)));

    let err = state
        .evaluations
        .submit(
            &state.scene,
            submission(
                EvaluationTarget::Master {
                    artifact_id: uuid::Uuid::new_v4(),
                },
                scores(3, 3, 3),
            ),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SceneError::NoMaster));

    assert!(state.evaluations.list(&state.scene).await.unwrap().is_empty());
}
