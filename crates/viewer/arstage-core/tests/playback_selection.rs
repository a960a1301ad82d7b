mod common;

use arstage_core::{status, ClipKey, HostCommand, ModelSlot, PlayOutcome, RetryPolicy, ViewerEvent};
use common::*;

#[test]
fn play_after_load_leaves_exactly_one_clip_at_time_zero() {
    let (mut c, issued) = started("fast-retry");
    complete(&mut c, &issued, "anims/walk.fbx", "walk");

    assert_eq!(c.play("walk"), PlayOutcome::Started { key: "walk".into() });
    let out = c.take_outputs();
    let stop = out
        .commands
        .iter()
        .position(|cmd| matches!(cmd, HostCommand::StopAllClips { .. }))
        .expect("stop issued");
    let starts: Vec<usize> = out
        .commands
        .iter()
        .enumerate()
        .filter(|(_, cmd)| matches!(cmd, HostCommand::StartClip { .. }))
        .map(|(i, _)| i)
        .collect();
    assert_eq!(starts.len(), 1);
    assert!(stop < starts[0]);

    let snap = c.snapshot();
    assert_eq!(snap.normal.active_clip, Some(ClipKey::from("walk")));
    assert_eq!(snap.normal.clip_time, Some(0.0));
    assert_eq!(out.last_status(), Some("Walk loaded. Ready for AR"));
}

#[test]
fn clip_time_follows_frame_deltas_and_wraps() {
    let (mut c, issued) = started("fast-retry");
    complete(&mut c, &issued, "anims/walk.fbx", "walk");
    c.play("walk");
    c.update(0.5, frame());
    c.update(0.5, frame());
    let t = c.snapshot().normal.clip_time.unwrap();
    // walk lasts 1.2s
    assert!((t - 1.0).abs() < 1e-5, "t={t}");
    c.update(0.5, frame());
    let t = c.snapshot().normal.clip_time.unwrap();
    assert!((t - 0.3).abs() < 1e-4, "t={t}");
}

#[test]
fn pending_clip_does_not_interrupt_the_active_one() {
    let (mut c, issued) = started("fast-retry");
    complete(&mut c, &issued, "anims/walk.fbx", "walk");
    c.play("walk");
    c.take_outputs();

    let outcome = c.play("idle");
    assert!(matches!(outcome, PlayOutcome::Pending { attempt: 1, retry_in_ms: 100, .. }));
    let out = c.take_outputs();
    assert_eq!(out.last_status(), Some("Loading Idle..."));
    assert!(out.commands.contains(&HostCommand::SetLoadingIndicator { visible: true }));
    assert!(!out
        .commands
        .iter()
        .any(|cmd| matches!(cmd, HostCommand::StopAllClips { .. })));

    let out = c.update(0.1, frame());
    assert!(out.events.contains(&ViewerEvent::ClipPending {
        slot: ModelSlot::Normal,
        key: "idle".into(),
        attempt: 2
    }));
    assert_eq!(c.snapshot().normal.active_clip, Some(ClipKey::from("walk")));

    complete(&mut c, &issued, "anims/idle.fbx", "walk");
    let out = c.update(0.1, frame());
    assert!(out.events.contains(&ViewerEvent::ClipStarted {
        slot: ModelSlot::Normal,
        key: "idle".into()
    }));
    let snap = c.snapshot();
    assert_eq!(snap.normal.active_clip, Some(ClipKey::from("idle")));
    assert_eq!(snap.normal.clip_time, Some(0.0));
    assert!(snap.normal.pending.is_none());
}

#[test]
fn newer_selection_wins_over_a_late_retry() {
    let (mut c, issued) = started("fast-retry");
    complete(&mut c, &issued, "anims/walk.fbx", "walk");

    assert!(matches!(c.play("idle"), PlayOutcome::Pending { .. }));
    assert!(matches!(c.play("walk"), PlayOutcome::Started { .. }));
    complete(&mut c, &issued, "anims/idle.fbx", "walk");

    for _ in 0..30 {
        let out = c.update(0.1, frame());
        assert!(!out.commands.iter().any(|cmd| matches!(
            cmd,
            HostCommand::StartClip { key, .. } if key.as_str() == "idle"
        )));
    }
    assert_eq!(c.snapshot().normal.active_clip, Some(ClipKey::from("walk")));
}

#[test]
fn retries_give_up_with_a_timeout_status() {
    let (mut c, _issued) = started("fast-retry");
    c.play("idle");

    let mut all_status = Vec::new();
    let mut exhausted = None;
    for _ in 0..10 {
        let out = c.update(0.1, frame());
        all_status.extend(statuses(&out));
        for ev in out.events {
            if let ViewerEvent::ClipRetriesExhausted { attempts, .. } = ev {
                exhausted = Some(attempts);
            }
        }
    }
    assert_eq!(exhausted, Some(5));
    assert!(all_status.iter().any(|s| s == "Idle is taking too long to load"));
    assert!(c.snapshot().normal.pending.is_none());
    assert_eq!(c.snapshot().normal.active_clip, None);
}

#[test]
fn failed_clip_reports_load_failure_and_is_not_retried() {
    let (mut c, issued) = started("fast-retry");
    fail(&mut c, &issued, "anims/idle.fbx");
    c.take_outputs();

    let outcome = c.play("idle");
    assert!(matches!(outcome, PlayOutcome::Unavailable { .. }));
    let out = c.take_outputs();
    assert_eq!(
        out.last_status(),
        Some(arstage_core::status::LOAD_FAILED)
    );
    assert!(c.snapshot().normal.pending.is_none());
}

#[test]
fn asset_without_clips_fails_that_clip_only() {
    let (mut c, issued) = started("fast-retry");
    complete(&mut c, &issued, "anims/idle.fbx", "no-clips");
    complete(&mut c, &issued, "anims/walk.fbx", "walk");
    let out = c.take_outputs();
    assert!(out.events.iter().any(|ev| matches!(
        ev,
        ViewerEvent::ClipLoadFailed { key, .. } if key.as_str() == "idle"
    )));
    assert!(matches!(c.play("idle"), PlayOutcome::Unavailable { .. }));
    assert!(matches!(c.play("walk"), PlayOutcome::Started { .. }));
}

#[test]
fn unknown_key_leaves_state_untouched() {
    let (mut c, issued) = started("fast-retry");
    complete(&mut c, &issued, "anims/walk.fbx", "walk");
    c.play("walk");
    c.take_outputs();

    assert_eq!(c.play("moonwalk"), PlayOutcome::Unknown { key: "moonwalk".into() });
    assert!(c.take_outputs().is_empty());
    assert_eq!(c.snapshot().normal.active_clip, Some(ClipKey::from("walk")));
}

#[test]
fn pending_clip_starts_on_the_next_retry_after_its_load_lands() {
    let (mut c, issued) = started("webxr");
    assert!(matches!(
        c.play("animation3"),
        PlayOutcome::Pending { retry_in_ms: 500, .. }
    ));

    let mut elapsed = 0.0f32;
    let mut started_at = None;
    for _ in 0..12 {
        let out = c.update(0.1, frame());
        elapsed += 0.1;
        if started_at.is_none()
            && out.events.iter().any(|ev| matches!(
                ev,
                ViewerEvent::ClipStarted { key, .. } if key.as_str() == "animation3"
            ))
        {
            started_at = Some(elapsed);
        }
        if (elapsed - 0.6).abs() < 1e-3 {
            complete(&mut c, &issued, "anims/MOVIMIENTO3.fbx", "walk");
        }
    }
    let t = started_at.expect("clip started without further input");
    assert!(t <= 1.0 + 1e-3, "started at {t}");
    assert_eq!(c.snapshot().normal.active_clip, Some(ClipKey::from("animation3")));
}

#[test]
fn retry_delays_grow_with_backoff() {
    let mut cfg = config("fast-retry");
    cfg.retry = RetryPolicy {
        delay_ms: 125,
        backoff: 2.0,
        max_attempts: Some(4),
    };
    let (mut c, _issued) = started_with(cfg);
    assert!(matches!(
        c.play("idle"),
        PlayOutcome::Pending { attempt: 1, retry_in_ms: 125, .. }
    ));
    c.take_outputs();

    let mut retries = Vec::new();
    let mut exhausted = None;
    for step in 1..=20 {
        let out = c.update(0.0625, frame());
        for ev in out.events {
            match ev {
                ViewerEvent::ClipPending { attempt, .. } => retries.push((step, attempt)),
                ViewerEvent::ClipRetriesExhausted { attempts, .. } => {
                    exhausted = Some((step, attempts))
                }
                _ => {}
            }
        }
    }
    // 0.125s, then 0.25s, then 0.5s between attempts.
    assert_eq!(retries, vec![(2, 2), (6, 3)]);
    assert_eq!(exhausted, Some((14, 4)));
}

#[test]
fn load_progress_only_reports_the_model_until_it_is_ready() {
    let (mut c, issued) = started("fast-retry");
    let model = request_for(&issued, "models/character.glb");
    let idle = request_for(&issued, "anims/idle.fbx");

    c.on_load_progress(model, 0.42);
    assert_eq!(c.take_outputs().last_status(), Some("Loading model: 42%"));
    c.on_load_progress(model, 1.0);
    assert!(c.take_outputs().is_empty());

    // Background clip pre-fetch with nobody waiting on it.
    c.on_load_progress(idle, 0.3);
    assert!(c.take_outputs().is_empty());

    complete(&mut c, &issued, "models/character.glb", "character");
    assert_eq!(c.take_outputs().last_status(), Some(status::MODEL_READY));
    c.on_load_progress(idle, 0.3);
    assert!(c.take_outputs().is_empty());
}

#[test]
fn load_progress_of_the_awaited_clip_is_shown() {
    let (mut c, issued) = started("fast-retry");
    complete(&mut c, &issued, "models/character.glb", "character");
    c.play("idle");
    c.take_outputs();

    c.on_load_progress(request_for(&issued, "anims/idle.fbx"), 0.5);
    assert_eq!(c.take_outputs().last_status(), Some("Loading Idle: 50%"));
    c.on_load_progress(request_for(&issued, "anims/walk.fbx"), 0.5);
    assert!(c.take_outputs().is_empty());
}

#[test]
fn initial_clip_starts_once_model_and_clip_are_loaded() {
    let mut cfg = config("fast-retry");
    cfg.initial_clip = Some("walk".into());
    let (mut c, issued) = started_with(cfg);

    complete(&mut c, &issued, "anims/walk.fbx", "walk");
    assert_eq!(c.snapshot().normal.active_clip, None);

    complete(&mut c, &issued, "models/character.glb", "character");
    let out = c.take_outputs();
    assert!(out.commands.iter().any(|cmd| matches!(
        cmd,
        HostCommand::StartClip { key, entity, .. }
            if key.as_str() == "walk" && *entity == c.normal_model_entity()
    )));
    assert_eq!(out.last_status(), Some(status::MODEL_READY));

    c.update(0.016, frame());
    let snap = c.snapshot();
    assert_eq!(snap.normal.active_clip, Some(ClipKey::from("walk")));
    assert!(snap.normal.clip_time.unwrap() > 0.0);

    // Later loads never restart it.
    complete(&mut c, &issued, "anims/idle.fbx", "walk");
    assert!(!c
        .take_outputs()
        .commands
        .iter()
        .any(|cmd| matches!(cmd, HostCommand::StartClip { .. })));
}

#[test]
fn initial_clip_does_not_override_a_user_selection() {
    let mut cfg = config("fast-retry");
    cfg.initial_clip = Some("walk".into());
    let (mut c, issued) = started_with(cfg);

    assert!(matches!(c.play("idle"), PlayOutcome::Pending { .. }));
    complete(&mut c, &issued, "anims/walk.fbx", "walk");
    complete(&mut c, &issued, "models/character.glb", "character");
    let out = c.take_outputs();
    assert!(!out
        .commands
        .iter()
        .any(|cmd| matches!(cmd, HostCommand::StartClip { .. })));
    assert_eq!(c.snapshot().normal.pending.map(|p| p.key), Some(ClipKey::from("idle")));
}
