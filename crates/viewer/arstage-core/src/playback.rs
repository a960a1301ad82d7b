//! Playback controller: one authoritative clip per model, with bounded retries
//! for clips that are still loading.
//!
//! Time math mirrors the host mixer: `tick(dt)` advances the active clip by the
//! wall-clock frame delta, and the controller's own clock schedules retries.

use std::sync::Arc;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::clip::{AnimationClip, ClipLibrary, ClipStatus};
use crate::config::RetryPolicy;
use crate::error::ViewerError;
use crate::ids::{ClipKey, EntityId};
use crate::mode::ModelSlot;
use crate::outputs::{HostCommand, Outputs, ViewerEvent};

/// Slack for comparing accumulated frame time against a retry deadline.
const DUE_EPSILON: f64 = 1e-6;

/// Result of a `play` call (or of a retry firing during `tick`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PlayOutcome {
    /// The clip is now the only active clip, at time zero.
    Started { key: ClipKey },
    /// The clip is still loading; the same request is retried after `retry_in_ms`.
    Pending {
        key: ClipKey,
        attempt: u32,
        retry_in_ms: u32,
    },
    /// The clip failed to load. Not retried.
    Unavailable { key: ClipKey, reason: String },
    /// The clip never finished loading within the retry budget.
    RetriesExhausted { key: ClipKey, attempts: u32 },
    /// The key is not in the clip table.
    Unknown { key: ClipKey },
}

impl PlayOutcome {
    pub fn key(&self) -> &ClipKey {
        match self {
            Self::Started { key }
            | Self::Pending { key, .. }
            | Self::Unavailable { key, .. }
            | Self::RetriesExhausted { key, .. }
            | Self::Unknown { key } => key,
        }
    }

    /// `Ok` once the clip is playing. A pending request maps to the recoverable `ClipNotReady`.
    pub fn into_result(self) -> Result<ClipKey, ViewerError> {
        match self {
            Self::Started { key } => Ok(key),
            Self::Pending { key, .. } => Err(ViewerError::ClipNotReady { key }),
            Self::Unavailable { key, reason } => Err(ViewerError::ClipUnavailable { key, reason }),
            Self::RetriesExhausted { key, attempts } => Err(ViewerError::ClipUnavailable {
                key,
                reason: format!("still loading after {attempts} attempts"),
            }),
            Self::Unknown { key } => Err(ViewerError::UnknownClip { key }),
        }
    }
}

#[derive(Clone, Debug)]
struct ActiveClip {
    clip: Arc<AnimationClip>,
    time: f32,
}

/// A play request waiting for its clip to load.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PendingPlay {
    pub key: ClipKey,
    /// Ticket of the `play` call that created this request.
    pub ticket: u64,
    /// Attempts made so far, including the initial call.
    pub attempts: u32,
    /// Controller clock (seconds) at which the next attempt runs.
    pub due_at: f64,
}

/// Drives one model's mixer. Mutated only through `play` and `tick`.
#[derive(Debug)]
pub struct PlaybackController {
    entity: EntityId,
    slot: ModelSlot,
    retry: RetryPolicy,
    loop_clips: bool,
    active: Option<ActiveClip>,
    pending: Option<PendingPlay>,
    /// Seconds of ticked time seen by this controller.
    clock: f64,
    /// Bumped on every `play`; only the latest ticket may retry.
    ticket: u64,
}

fn wrap_time(t: f32, duration: f32) -> f32 {
    if duration <= 0.0 {
        return 0.0;
    }
    let m = t % duration;
    if m < 0.0 {
        m + duration
    } else {
        m
    }
}

impl PlaybackController {
    pub fn new(entity: EntityId, slot: ModelSlot, retry: RetryPolicy, loop_clips: bool) -> Self {
        Self {
            entity,
            slot,
            retry,
            loop_clips,
            active: None,
            pending: None,
            clock: 0.0,
            ticket: 0,
        }
    }

    /// Make `key` the active clip. The most recent call is authoritative: any
    /// retry still scheduled for an earlier call is dropped.
    pub fn play(&mut self, key: &ClipKey, library: &ClipLibrary, out: &mut Outputs) -> PlayOutcome {
        self.ticket = self.ticket.wrapping_add(1);
        self.pending = None;
        self.attempt(key.clone(), self.ticket, 1, library, out)
    }

    fn attempt(
        &mut self,
        key: ClipKey,
        ticket: u64,
        attempts: u32,
        library: &ClipLibrary,
        out: &mut Outputs,
    ) -> PlayOutcome {
        match library.request(key.as_str()) {
            ClipStatus::Ready(clip) => {
                self.start(clip, out);
                PlayOutcome::Started { key }
            }
            ClipStatus::Failed(err) => {
                warn!("[{:?}] clip '{}' unavailable: {}", self.slot, key, err);
                out.push_event(ViewerEvent::ClipUnavailable {
                    slot: self.slot,
                    key: key.clone(),
                    reason: err.cause.clone(),
                });
                PlayOutcome::Unavailable {
                    key,
                    reason: err.cause,
                }
            }
            ClipStatus::Loading => {
                if !self.retry.allows_another(attempts) {
                    warn!(
                        "[{:?}] clip '{}' still loading after {} attempts; giving up",
                        self.slot, key, attempts
                    );
                    out.push_event(ViewerEvent::ClipRetriesExhausted {
                        slot: self.slot,
                        key: key.clone(),
                        attempts,
                    });
                    return PlayOutcome::RetriesExhausted { key, attempts };
                }
                let delay = self.retry.delay_after(attempts);
                debug!(
                    "[{:?}] clip '{}' not ready (attempt {}), retrying in {:.3}s",
                    self.slot, key, attempts, delay
                );
                self.pending = Some(PendingPlay {
                    key: key.clone(),
                    ticket,
                    attempts,
                    due_at: self.clock + delay,
                });
                out.push_event(ViewerEvent::ClipPending {
                    slot: self.slot,
                    key: key.clone(),
                    attempt: attempts,
                });
                PlayOutcome::Pending {
                    key,
                    attempt: attempts,
                    retry_in_ms: (delay * 1000.0).round() as u32,
                }
            }
        }
    }

    /// Stop everything on the mixer, then start `clip` from zero.
    fn start(&mut self, clip: Arc<AnimationClip>, out: &mut Outputs) {
        debug!("[{:?}] starting clip '{}'", self.slot, clip.key);
        out.push_command(HostCommand::StopAllClips {
            entity: self.entity,
        });
        out.push_command(HostCommand::StartClip {
            entity: self.entity,
            key: clip.key.clone(),
            source: clip.source,
        });
        out.push_event(ViewerEvent::ClipStarted {
            slot: self.slot,
            key: clip.key.clone(),
        });
        self.active = Some(ActiveClip { clip, time: 0.0 });
    }

    /// Advance by one rendered frame's wall-clock delta. Returns the outcome of a
    /// retry if one came due this frame.
    pub fn tick(&mut self, dt: f32, library: &ClipLibrary, out: &mut Outputs) -> Option<PlayOutcome> {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        self.clock += dt as f64;

        if let Some(active) = self.active.as_mut() {
            let t = active.time + dt;
            active.time = if self.loop_clips {
                wrap_time(t, active.clip.duration)
            } else {
                t.min(active.clip.duration.max(0.0))
            };
            out.push_command(HostCommand::AdvanceMixer {
                entity: self.entity,
                dt,
            });
        }

        let due = matches!(&self.pending, Some(p) if self.clock + DUE_EPSILON >= p.due_at);
        if !due {
            return None;
        }
        let pending = self.pending.take()?;
        if pending.ticket != self.ticket {
            debug!(
                "[{:?}] dropping stale retry for '{}' (ticket {} < {})",
                self.slot, pending.key, pending.ticket, self.ticket
            );
            return None;
        }
        Some(self.attempt(
            pending.key,
            pending.ticket,
            pending.attempts + 1,
            library,
            out,
        ))
    }

    /// Drop any scheduled retry without touching the active clip.
    pub fn cancel_pending(&mut self) {
        self.pending = None;
    }

    pub fn active_key(&self) -> Option<&ClipKey> {
        self.active.as_ref().map(|a| &a.clip.key)
    }

    /// Local time of the active clip, seconds.
    pub fn active_time(&self) -> Option<f32> {
        self.active.as_ref().map(|a| a.time)
    }

    pub fn pending(&self) -> Option<&PendingPlay> {
        self.pending.as_ref()
    }

    /// No clip has been requested on this controller yet.
    pub fn is_idle(&self) -> bool {
        self.ticket == 0
    }
}
