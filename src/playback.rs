// Copyright (c) 2024-2026, Daily
// SPDX-License-Identifier: BSD-2-Clause

//! Client-side audio playback queue.
//!
//! [`AudioPlaybackQueue`] accepts batches of [`VoiceClip`]s and guarantees
//! strictly sequential playback in submission order, one clip at a time, no
//! matter how or when each clip's media resolves. The queue owns its internal
//! sequence outright: all mutation goes through the methods here, driven by
//! two external events ("clip ended", "clip errored") plus explicit API
//! calls, so the single-active-clip invariant holds without a lock.
//!
//! The actual player sits behind the [`AudioSink`] seam; tests substitute a
//! recording sink.
//!
//! State machine: `Idle ⇄ Playing`, with `Paused` reachable only from
//! `Playing`.

use std::collections::VecDeque;

use tracing::{debug, warn};

use crate::error::PlaybackError;
use crate::voices::VoiceClip;

/// The seam to the platform audio player.
///
/// `start` begins playback of one clip and returns immediately; completion
/// is reported later through [`AudioPlaybackQueue::clip_ended`] or
/// [`AudioPlaybackQueue::clip_errored`].
pub trait AudioSink {
    /// Begin playback of the clip at `url`.
    fn start(&mut self, url: &str) -> Result<(), PlaybackError>;
    /// Pause the active clip, keeping its position.
    fn pause(&mut self);
    /// Resume the active clip from its position.
    fn resume(&mut self);
    /// Halt playback entirely and drop the active clip.
    fn stop(&mut self);
}

/// Player state. `Paused` is a sub-state of having an active clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Idle,
    Playing,
    Paused,
}

/// Ordered queue of not-yet-played clips plus the active player state.
pub struct AudioPlaybackQueue<S: AudioSink> {
    queue: VecDeque<VoiceClip>,
    sink: S,
    state: PlayerState,
    enabled: bool,
}

impl<S: AudioSink> AudioPlaybackQueue<S> {
    /// Create an empty, enabled queue over the given sink.
    pub fn new(sink: S) -> Self {
        Self {
            queue: VecDeque::new(),
            sink,
            state: PlayerState::Idle,
            enabled: true,
        }
    }

    /// Append clips to the tail of the queue.
    ///
    /// If the player is idle, playback of the head clip begins immediately.
    /// If a clip is already playing, the new clips only extend the tail; the
    /// active clip is never interrupted.
    pub fn enqueue(&mut self, clips: impl IntoIterator<Item = VoiceClip>) {
        self.queue.extend(clips);
        debug!(queued = self.queue.len(), "Clips enqueued");
        if self.state == PlayerState::Idle {
            self.advance();
        }
    }

    /// Event: the active clip finished naturally. Advances to the next
    /// queued clip, or to idle if the queue is empty.
    pub fn clip_ended(&mut self) {
        if self.state != PlayerState::Idle {
            self.advance();
        }
    }

    /// Event: the active clip failed during playback. Same advancement as a
    /// natural completion; one bad clip never stalls the queue.
    pub fn clip_errored(&mut self) {
        if self.state != PlayerState::Idle {
            warn!("Active clip errored, advancing");
            self.advance();
        }
    }

    /// Pause the active clip. Affects only the playback position; the queue
    /// is neither drained nor reordered.
    pub fn pause(&mut self) {
        if self.state == PlayerState::Playing {
            self.sink.pause();
            self.state = PlayerState::Paused;
        }
    }

    /// Resume a paused clip.
    pub fn resume(&mut self) {
        if self.state == PlayerState::Paused && self.enabled {
            self.sink.resume();
            self.state = PlayerState::Playing;
        }
    }

    /// Discard all queued-but-unplayed clips and halt current playback.
    /// Session teardown, not normal flow control.
    pub fn clear(&mut self) {
        self.queue.clear();
        if self.state != PlayerState::Idle {
            self.sink.stop();
        }
        self.state = PlayerState::Idle;
    }

    /// Mute toggle. When disabled, newly reached clips are not played but
    /// the queue still advances and drains, so re-enabling never
    /// desynchronizes future playback. The currently active clip is not
    /// affected.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    /// Number of clips waiting behind the active one.
    pub fn queued_len(&self) -> usize {
        self.queue.len()
    }

    /// Detach the head and start it, skipping clips that cannot or should
    /// not produce audio. Only this method detaches the head.
    fn advance(&mut self) {
        loop {
            let Some(next) = self.queue.pop_front() else {
                self.state = PlayerState::Idle;
                return;
            };

            // Failure placeholders carry an empty url: immediate-completion
            // no-op, preserving the in-order guarantee.
            if next.url.is_empty() {
                debug!(character = %next.character, "Skipping clip with empty url");
                continue;
            }

            if !self.enabled {
                debug!(character = %next.character, "Muted, draining clip without audio");
                continue;
            }

            match self.sink.start(&next.url) {
                Ok(()) => {
                    debug!(character = %next.character, "Clip playback started");
                    self.state = PlayerState::Playing;
                    return;
                }
                Err(e) => {
                    warn!(character = %next.character, error = %e, "Clip failed to start, advancing");
                    continue;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Recording sink: logs every call, optionally failing to start chosen
    /// urls.
    struct RecordingSink {
        calls: Vec<String>,
        fail_urls: Vec<String>,
    }

    impl RecordingSink {
        fn new() -> Self {
            Self {
                calls: Vec::new(),
                fail_urls: Vec::new(),
            }
        }

        fn failing_on(url: &str) -> Self {
            Self {
                calls: Vec::new(),
                fail_urls: vec![url.to_string()],
            }
        }

        fn starts(&self) -> Vec<&str> {
            self.calls
                .iter()
                .filter_map(|c| c.strip_prefix("start:"))
                .collect()
        }
    }

    impl AudioSink for RecordingSink {
        fn start(&mut self, url: &str) -> Result<(), PlaybackError> {
            if self.fail_urls.iter().any(|u| u == url) {
                return Err(PlaybackError(format!("cannot start {url}")));
            }
            self.calls.push(format!("start:{url}"));
            Ok(())
        }
        fn pause(&mut self) {
            self.calls.push("pause".into());
        }
        fn resume(&mut self) {
            self.calls.push("resume".into());
        }
        fn stop(&mut self) {
            self.calls.push("stop".into());
        }
    }

    fn clip(character: &str, url: &str) -> VoiceClip {
        VoiceClip {
            character: character.into(),
            url: url.into(),
            voice_used: None,
        }
    }

    #[test]
    fn new_queue_is_idle_and_enabled() {
        let queue = AudioPlaybackQueue::new(RecordingSink::new());
        assert_eq!(queue.state(), PlayerState::Idle);
        assert!(queue.is_enabled());
        assert_eq!(queue.queued_len(), 0);
    }

    #[test]
    fn enqueue_while_idle_starts_head_clip() {
        let mut queue = AudioPlaybackQueue::new(RecordingSink::new());
        queue.enqueue([clip("Saga", "a"), clip("Nyra", "b")]);

        assert_eq!(queue.state(), PlayerState::Playing);
        assert_eq!(queue.sink.starts(), vec!["a"]);
        assert_eq!(queue.queued_len(), 1);
    }

    #[test]
    fn clip_ended_advances_automatically() {
        let mut queue = AudioPlaybackQueue::new(RecordingSink::new());
        queue.enqueue([clip("Saga", "a"), clip("Nyra", "b")]);

        queue.clip_ended();
        assert_eq!(queue.sink.starts(), vec!["a", "b"]);
        assert_eq!(queue.state(), PlayerState::Playing);

        queue.clip_ended();
        assert_eq!(queue.state(), PlayerState::Idle);
    }

    #[test]
    fn enqueue_while_playing_extends_tail_without_interrupting() {
        let mut queue = AudioPlaybackQueue::new(RecordingSink::new());
        queue.enqueue([clip("Saga", "a"), clip("Nyra", "b")]);
        queue.enqueue([clip("Thalric", "c")]);

        // "a" still playing, nothing new started.
        assert_eq!(queue.sink.starts(), vec!["a"]);

        queue.clip_ended();
        queue.clip_ended();
        queue.clip_ended();
        assert_eq!(queue.sink.starts(), vec!["a", "b", "c"]);
        assert_eq!(queue.state(), PlayerState::Idle);
    }

    #[test]
    fn empty_url_clips_are_skipped_without_playback_attempt() {
        let mut queue = AudioPlaybackQueue::new(RecordingSink::new());
        queue.enqueue([clip("Saga", "a"), clip("Nyra", ""), clip("Thalric", "c")]);

        queue.clip_ended();
        // "b" never produced a start; "c" begins directly.
        assert_eq!(queue.sink.starts(), vec!["a", "c"]);
    }

    #[test]
    fn queue_of_only_empty_urls_drains_to_idle() {
        let mut queue = AudioPlaybackQueue::new(RecordingSink::new());
        queue.enqueue([clip("Saga", ""), clip("Nyra", "")]);

        assert_eq!(queue.state(), PlayerState::Idle);
        assert!(queue.sink.starts().is_empty());
        assert_eq!(queue.queued_len(), 0);
    }

    #[test]
    fn playback_error_advances_to_next_clip() {
        let mut queue = AudioPlaybackQueue::new(RecordingSink::new());
        queue.enqueue([clip("Saga", "a"), clip("Nyra", "b")]);

        queue.clip_errored();
        assert_eq!(queue.sink.starts(), vec!["a", "b"]);
        assert_eq!(queue.state(), PlayerState::Playing);
    }

    #[test]
    fn start_failure_falls_through_to_next_clip() {
        let mut queue = AudioPlaybackQueue::new(RecordingSink::failing_on("bad"));
        queue.enqueue([clip("Saga", "bad"), clip("Nyra", "good")]);

        assert_eq!(queue.sink.starts(), vec!["good"]);
        assert_eq!(queue.state(), PlayerState::Playing);
    }

    #[test]
    fn pause_and_resume_affect_only_active_clip() {
        let mut queue = AudioPlaybackQueue::new(RecordingSink::new());
        queue.enqueue([clip("Saga", "a"), clip("Nyra", "b")]);

        queue.pause();
        assert_eq!(queue.state(), PlayerState::Paused);
        assert_eq!(queue.queued_len(), 1);

        queue.resume();
        assert_eq!(queue.state(), PlayerState::Playing);
        assert_eq!(queue.sink.starts(), vec!["a"]);
    }

    #[test]
    fn pause_while_idle_is_a_no_op() {
        let mut queue = AudioPlaybackQueue::new(RecordingSink::new());
        queue.pause();
        assert_eq!(queue.state(), PlayerState::Idle);
        assert!(queue.sink.calls.is_empty());
    }

    #[test]
    fn resume_is_only_reachable_from_paused() {
        let mut queue = AudioPlaybackQueue::new(RecordingSink::new());
        queue.enqueue([clip("Saga", "a")]);

        queue.resume();
        assert!(!queue.sink.calls.contains(&"resume".to_string()));
    }

    #[test]
    fn clear_discards_queue_and_halts_playback() {
        let mut queue = AudioPlaybackQueue::new(RecordingSink::new());
        queue.enqueue([clip("Saga", "a"), clip("Nyra", "b"), clip("Thalric", "c")]);

        queue.clear();
        assert_eq!(queue.state(), PlayerState::Idle);
        assert_eq!(queue.queued_len(), 0);
        assert!(queue.sink.calls.contains(&"stop".to_string()));

        // Events after clear are ignored.
        queue.clip_ended();
        assert_eq!(queue.sink.starts(), vec!["a"]);
    }

    #[test]
    fn disabled_queue_drains_without_audio() {
        let mut queue = AudioPlaybackQueue::new(RecordingSink::new());
        queue.set_enabled(false);
        queue.enqueue([clip("Saga", "a"), clip("Nyra", "b")]);

        assert!(queue.sink.starts().is_empty());
        assert_eq!(queue.state(), PlayerState::Idle);
        assert_eq!(queue.queued_len(), 0);
    }

    #[test]
    fn disabling_mid_playback_keeps_current_clip_but_mutes_the_rest() {
        let mut queue = AudioPlaybackQueue::new(RecordingSink::new());
        queue.enqueue([clip("Saga", "a"), clip("Nyra", "b")]);

        queue.set_enabled(false);
        // "a" keeps playing; its completion drains "b" silently.
        assert_eq!(queue.state(), PlayerState::Playing);
        queue.clip_ended();
        assert_eq!(queue.sink.starts(), vec!["a"]);
        assert_eq!(queue.state(), PlayerState::Idle);
    }

    #[test]
    fn reenabling_resumes_normal_playback_for_new_clips() {
        let mut queue = AudioPlaybackQueue::new(RecordingSink::new());
        queue.set_enabled(false);
        queue.enqueue([clip("Saga", "a")]);
        queue.set_enabled(true);
        queue.enqueue([clip("Nyra", "b")]);

        assert_eq!(queue.sink.starts(), vec!["b"]);
        assert_eq!(queue.state(), PlayerState::Playing);
    }

    #[test]
    fn submission_order_is_total_across_enqueue_calls() {
        let mut queue = AudioPlaybackQueue::new(RecordingSink::new());
        queue.enqueue([clip("Saga", "a"), clip("Nyra", "b")]);
        queue.enqueue([clip("Thalric", "c")]);
        queue.enqueue([clip("Oracle", "d"), clip("Saga", "e")]);

        for _ in 0..5 {
            queue.clip_ended();
        }
        assert_eq!(queue.sink.starts(), vec!["a", "b", "c", "d", "e"]);
        assert_eq!(queue.state(), PlayerState::Idle);
    }
}
