//! Behavior of `NarrationService` against in-memory bridges.

mod support;

use core_async::time::{sleep, Duration, Instant};
use core_narration::{AudioKey, NarrationError, SpeakOutcome};
use core_runtime::events::{CoreEvent, NarrationEvent, OutputEvent};
use std::sync::Arc;
use support::{drain, fetcher, harness, harness_with_config, FakeOutput, OutputCall};

fn started_session(outcome: &SpeakOutcome) -> bridge_traits::VoiceId {
    outcome
        .session()
        .map(Into::into)
        .unwrap_or_else(|| panic!("expected a started session, got {outcome:?}"))
}

// ============================================================================
// speak
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_speak_publishes_transcript_and_timings() {
    let h = harness(fetcher(), FakeOutput::new());

    let outcome = h.service.speak(AudioKey::MainScreenWelcome).await;
    assert!(outcome.is_started());

    let state = h.service.state();
    assert!(state.is_speaking);
    assert_eq!(state.current_text, "Olá, mundo!");
    assert_eq!(state.current_word_timings.len(), 2);
    assert_eq!(state.current_time, 0.0);
    assert_eq!(state.current_key, Some(AudioKey::MainScreenWelcome));
    assert_eq!(state.session, outcome.session());
    assert_eq!(h.output.playing(), vec![started_session(&outcome)]);
}

#[tokio::test(start_paused = true)]
async fn test_speak_emits_requested_then_started() {
    let mut h = harness(fetcher(), FakeOutput::new());

    let outcome = h.service.speak(AudioKey::TemperatureTopic).await;
    let session = outcome.session().unwrap();

    assert_eq!(
        drain(&mut h.events),
        vec![
            CoreEvent::Narration(NarrationEvent::Requested {
                key: "temperatureTopic".into()
            }),
            CoreEvent::Narration(NarrationEvent::Started {
                key: "temperatureTopic".into(),
                session_id: session.to_string(),
                duration_ms: 5_000,
            }),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_speak_placeholder_reports_asset_unavailable() {
    let mut h = harness(fetcher(), FakeOutput::new());

    let outcome = h.service.speak(AudioKey::Credits).await;

    assert_eq!(
        outcome,
        SpeakOutcome::Failed(NarrationError::AssetUnavailable {
            key: AudioKey::Credits
        })
    );
    assert!(!h.service.is_speaking());
    assert!(h.service.state().current_text.is_empty());
    assert!(h.output.started().is_empty());
    assert_eq!(h.fetcher.fetch_count(), 0);

    let failed = drain(&mut h.events)
        .into_iter()
        .find_map(|event| match event {
            CoreEvent::Narration(NarrationEvent::Failed { kind, key, .. }) => Some((kind, key)),
            _ => None,
        });
    assert_eq!(
        failed,
        Some(("asset_unavailable".to_string(), "credits".to_string()))
    );
}

#[tokio::test(start_paused = true)]
async fn test_key_missing_from_catalog_is_unavailable() {
    let h = harness(fetcher(), FakeOutput::new());

    let outcome = h.service.speak(AudioKey::QuizQuestion).await;
    assert!(matches!(
        outcome,
        SpeakOutcome::Failed(NarrationError::AssetUnavailable { key: AudioKey::QuizQuestion })
    ));
    assert!(!h.service.is_speaking());
}

#[tokio::test(start_paused = true)]
async fn test_load_failure_is_retried_on_next_speak() {
    let h = harness(fetcher().failing_first(1), FakeOutput::new());

    let first = h.service.speak(AudioKey::MainScreenWelcome).await;
    assert!(matches!(
        first.error(),
        Some(NarrationError::LoadFailure { key: AudioKey::MainScreenWelcome, .. })
    ));
    assert!(!h.service.is_speaking());
    assert!(!h.service.cache().contains(AudioKey::MainScreenWelcome));

    let second = h.service.speak(AudioKey::MainScreenWelcome).await;
    assert!(second.is_started());
    assert_eq!(h.fetcher.fetch_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_repeated_speak_fetches_once() {
    let h = harness(fetcher(), FakeOutput::new());

    assert!(h.service.speak(AudioKey::TemperatureTopic).await.is_started());
    assert!(h.service.speak(AudioKey::TemperatureTopic).await.is_started());

    assert_eq!(h.fetcher.fetch_count(), 1);
    assert_eq!(h.service.cache().stats().hits, 1);
}

// ============================================================================
// Single flight
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_new_speak_stops_previous_before_starting() {
    let h = harness(fetcher(), FakeOutput::new());

    let first = h.service.speak(AudioKey::MainScreenWelcome).await;
    let second = h.service.speak(AudioKey::TemperatureTopic).await;
    let (a, b) = (started_session(&first), started_session(&second));

    assert_eq!(
        h.output.calls(),
        vec![OutputCall::Start(a), OutputCall::Stop(a), OutputCall::Start(b)]
    );
    assert_eq!(h.output.playing(), vec![b]);
    assert_eq!(h.service.state().current_key, Some(AudioKey::TemperatureTopic));
}

#[tokio::test(start_paused = true)]
async fn test_speak_failure_while_speaking_stops_previous() {
    let mut h = harness(fetcher(), FakeOutput::new());
    let first = h.service.speak(AudioKey::MainScreenWelcome).await;
    let voice = started_session(&first);
    drain(&mut h.events);

    let outcome = h.service.speak(AudioKey::Credits).await;
    assert!(matches!(
        outcome.error(),
        Some(NarrationError::AssetUnavailable { key: AudioKey::Credits })
    ));

    let state = h.service.state();
    assert!(!state.is_speaking);
    assert_eq!(state.session, None);
    assert!(h.output.calls().contains(&OutputCall::Stop(voice)));
    assert!(h.output.playing().is_empty());
    assert!(!h.service.is_tracking());

    let events = drain(&mut h.events);
    assert_eq!(
        events[..2],
        [
            CoreEvent::Narration(NarrationEvent::Requested { key: "credits".into() }),
            CoreEvent::Narration(NarrationEvent::Cancelled {
                key: Some("mainScreenWelcome".into())
            }),
        ]
    );
    assert!(matches!(
        events.last(),
        Some(CoreEvent::Narration(NarrationEvent::Failed { .. }))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_load_failure_while_speaking_stops_previous() {
    let h = harness(fetcher(), FakeOutput::new());
    let first = h.service.speak(AudioKey::MainScreenWelcome).await;
    let voice = started_session(&first);

    h.fetcher.fail_next(1);
    let outcome = h.service.speak(AudioKey::TemperatureTopic).await;

    assert!(matches!(
        outcome.error(),
        Some(NarrationError::LoadFailure { key: AudioKey::TemperatureTopic, .. })
    ));
    assert!(!h.service.is_speaking());
    assert_eq!(h.output.calls(), vec![OutputCall::Start(voice), OutputCall::Stop(voice)]);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_speaks_leave_only_the_latest_playing() {
    let mut h = harness(
        fetcher().with_delay(Duration::from_millis(200)),
        FakeOutput::new(),
    );

    let (first, second) = tokio::join!(
        h.service.speak(AudioKey::MainScreenWelcome),
        h.service.speak(AudioKey::TemperatureTopic),
    );

    assert_eq!(first, SpeakOutcome::Superseded);
    assert!(second.is_started());
    assert_eq!(h.output.started(), vec![started_session(&second)]);
    assert_eq!(
        h.service.controller().current().map(|s| s.key),
        Some(AudioKey::TemperatureTopic)
    );
    assert!(drain(&mut h.events).contains(&CoreEvent::Narration(NarrationEvent::Superseded {
        key: "mainScreenWelcome".into()
    })));
}

#[tokio::test(start_paused = true)]
async fn test_late_completion_of_superseded_session_is_ignored() {
    let h = harness(fetcher(), FakeOutput::new());

    let first = h.service.speak(AudioKey::MainScreenWelcome).await;
    let second = h.service.speak(AudioKey::TemperatureTopic).await;

    h.output.finish(started_session(&first));
    sleep(Duration::from_millis(100)).await;

    let state = h.service.state();
    assert!(state.is_speaking);
    assert_eq!(state.session, second.session());

    h.output.finish(started_session(&second));
    let mut rx = h.service.subscribe();
    rx.wait_for(|state| !state.is_speaking).await.unwrap();
}

// ============================================================================
// Cancellation
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_cancel_when_idle_changes_nothing() {
    let mut h = harness(fetcher(), FakeOutput::new());
    let before = h.service.state();

    h.service.cancel();

    assert_eq!(h.service.state(), before);
    assert!(h.output.calls().is_empty());
    assert!(drain(&mut h.events).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_cancel_stops_audio_but_keeps_caption() {
    let mut h = harness(fetcher(), FakeOutput::new());
    let outcome = h.service.speak(AudioKey::MainScreenWelcome).await;
    let voice = started_session(&outcome);
    drain(&mut h.events);

    h.service.cancel();

    let state = h.service.state();
    assert!(!state.is_speaking);
    assert_eq!(state.current_text, "Olá, mundo!");
    assert_eq!(state.current_word_timings.len(), 2);
    assert!(h.output.calls().contains(&OutputCall::Stop(voice)));
    assert!(h.output.playing().is_empty());
    assert_eq!(
        drain(&mut h.events),
        vec![CoreEvent::Narration(NarrationEvent::Cancelled {
            key: Some("mainScreenWelcome".into())
        })]
    );

    h.service.clear_narration();
    let state = h.service.state();
    assert!(state.current_text.is_empty());
    assert!(state.current_word_timings.is_empty());
    assert_eq!(state.current_time, 0.0);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_fetch_prevents_playback() {
    let h = harness(
        fetcher().with_delay(Duration::from_secs(1)),
        FakeOutput::new(),
    );

    let service = Arc::clone(&h.service);
    let pending = tokio::spawn(async move { service.speak(AudioKey::TemperatureTopic).await });
    sleep(Duration::from_millis(10)).await;

    h.service.cancel();
    let outcome = pending.await.unwrap();

    assert_eq!(outcome, SpeakOutcome::Superseded);
    sleep(Duration::from_secs(2)).await;
    assert!(!h.service.is_speaking());
    assert!(h.output.started().is_empty());
    // The clip was still cached for next time.
    assert!(h.service.cache().contains(AudioKey::TemperatureTopic));
}

// ============================================================================
// Time tracking
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_clear_narration_while_speaking_resets_caption() {
    let h = harness(fetcher(), FakeOutput::new());
    let outcome = h.service.speak(AudioKey::MainScreenWelcome).await;
    assert!(outcome.is_started());

    sleep(Duration::from_millis(100)).await;
    let before = h.service.state().current_time;
    assert!(before > 0.0);

    h.service.clear_narration();

    let cleared = h.service.state();
    assert!(cleared.is_speaking);
    assert_eq!(cleared.session, outcome.session());
    assert!(cleared.current_text.is_empty());
    assert!(cleared.current_word_timings.is_empty());
    assert_eq!(cleared.current_time, 0.0);
    assert!(h.service.is_tracking());

    sleep(Duration::from_millis(100)).await;
    let later = h.service.state();
    assert!(later.is_speaking);
    assert!(later.current_text.is_empty());
    assert!(later.current_time > before);
    assert!(later.current_time <= f64::from(support::WELCOME_SECONDS));
}

#[tokio::test(start_paused = true)]
async fn test_natural_completion_ends_speaking_after_clip_length() {
    let mut h = harness(fetcher(), FakeOutput::auto_completing());
    let started_at = Instant::now();

    let outcome = h.service.speak(AudioKey::TemperatureTopic).await;
    assert!(outcome.is_started());

    let mut rx = h.service.subscribe();
    rx.wait_for(|state| !state.is_speaking).await.unwrap();

    assert!(started_at.elapsed() >= Duration::from_secs(5));
    assert!(!h.service.controller().is_playing());
    assert!(drain(&mut h.events).contains(&CoreEvent::Narration(NarrationEvent::Completed {
        key: "temperatureTopic".into(),
        session_id: outcome.session().unwrap().to_string(),
    })));
}

#[tokio::test(start_paused = true)]
async fn test_current_time_starts_at_zero_and_never_decreases() {
    let h = harness(fetcher(), FakeOutput::auto_completing());
    let mut rx = h.service.subscribe();

    let outcome = h.service.speak(AudioKey::MainScreenWelcome).await;
    let session = outcome.session();
    assert_eq!(rx.borrow_and_update().current_time, 0.0);

    let mut samples = vec![0.0];
    while rx.changed().await.is_ok() {
        let state = rx.borrow_and_update().clone();
        if state.session == session {
            samples.push(state.current_time);
        }
        if !state.is_speaking {
            break;
        }
    }

    assert!(samples.len() > 10, "only {} samples", samples.len());
    assert!(samples.windows(2).all(|pair| pair[0] <= pair[1]));
    assert!(samples.iter().all(|t| *t <= f64::from(support::WELCOME_SECONDS)));
}

#[tokio::test(start_paused = true)]
async fn test_caption_follows_playback() {
    let h = harness(fetcher(), FakeOutput::new());
    h.service.speak(AudioKey::MainScreenWelcome).await;

    sleep(Duration::from_millis(2_000)).await;

    let state = h.service.state();
    let caption = state.caption();
    assert_eq!(caption.visible_words().len(), 2);
    assert_eq!(caption.active_word().map(|w| w.text.as_str()), Some("mundo!"));
}

// ============================================================================
// Output environment
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_suspended_output_is_resumed_before_playing() {
    let mut h = harness(fetcher(), FakeOutput::suspended());

    let outcome = h.service.speak(AudioKey::MainScreenWelcome).await;

    assert_eq!(
        h.output.calls(),
        vec![OutputCall::Resume, OutputCall::Start(started_session(&outcome))]
    );
    assert!(drain(&mut h.events).contains(&CoreEvent::Output(OutputEvent::Resumed)));
}

#[tokio::test(start_paused = true)]
async fn test_user_interaction_resumes_output_once() {
    let h = harness(fetcher(), FakeOutput::suspended());

    assert!(h.service.notify_user_interaction().await);
    assert!(!h.service.notify_user_interaction().await);
    assert_eq!(h.output.calls(), vec![OutputCall::Resume]);
}

#[tokio::test(start_paused = true)]
async fn test_blocked_output_falls_back_to_text() {
    let mut h = harness(fetcher(), FakeOutput::refusing_resume());

    let outcome = h.service.speak(AudioKey::MainScreenWelcome).await;
    assert!(matches!(
        outcome,
        SpeakOutcome::Failed(NarrationError::PlaybackEnvironmentFailure(_))
    ));

    let state = h.service.state();
    assert!(!state.narration_available);
    assert!(!state.is_speaking);
    assert_eq!(state.current_text, "Olá, mundo!");
    assert!(state.caption().is_plain());
    assert!(drain(&mut h.events)
        .iter()
        .any(|event| matches!(event, CoreEvent::Output(OutputEvent::Unavailable { .. }))));

    // No further attempts this session: text only, no fetch.
    let outcome = h.service.speak(AudioKey::TemperatureTopic).await;
    assert_eq!(outcome, SpeakOutcome::TextOnly);
    assert_eq!(h.service.state().current_text, "Eu sou muito quente.");
    assert_eq!(h.fetcher.fetch_count(), 1);
    assert_eq!(h.output.calls(), vec![OutputCall::Resume]);
}

#[tokio::test(start_paused = true)]
async fn test_refused_start_without_text_fallback_shows_nothing() {
    let config = support::test_config().with_text_fallback(false);
    let h = harness_with_config(fetcher(), FakeOutput::refusing_start(), config);

    let outcome = h.service.speak(AudioKey::TemperatureTopic).await;
    assert!(outcome
        .error()
        .is_some_and(NarrationError::is_environment_failure));

    let state = h.service.state();
    assert!(!state.narration_available);
    assert!(!state.is_speaking);
    assert!(state.current_text.is_empty());

    let outcome = h.service.speak(AudioKey::MainScreenWelcome).await;
    assert!(outcome.error().is_some());
    assert!(h.service.state().current_text.is_empty());
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_dispose_stops_audio_and_tracker() {
    let h = harness(fetcher(), FakeOutput::new());
    h.service.speak(AudioKey::TemperatureTopic).await;
    assert!(h.service.is_tracking());

    h.service.dispose();
    sleep(Duration::from_millis(50)).await;

    assert!(!h.service.is_speaking());
    assert!(!h.service.is_tracking());
    assert!(h.output.is_closed());
    assert!(h.output.playing().is_empty());
    assert_eq!(
        h.service.speak(AudioKey::TemperatureTopic).await,
        SpeakOutcome::Superseded
    );
}

#[tokio::test(start_paused = true)]
async fn test_dropping_the_service_closes_the_output() {
    let h = harness(fetcher(), FakeOutput::new());
    h.service.speak(AudioKey::MainScreenWelcome).await;

    let output = Arc::clone(&h.output);
    drop(h);

    assert!(output.is_closed());
    assert!(output.playing().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_preload_all_warms_recorded_clips() {
    let h = harness(fetcher(), FakeOutput::new());

    let report = h.service.preload_all().await;

    assert!(report.is_complete());
    assert_eq!(
        report.loaded,
        vec![AudioKey::MainScreenWelcome, AudioKey::TemperatureTopic]
    );
    assert_eq!(h.service.cache().len(), 2);

    h.service.speak(AudioKey::MainScreenWelcome).await;
    assert_eq!(h.fetcher.fetch_count(), 2);
}
