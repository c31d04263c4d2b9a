//! Per-instance playback coordination.
//!
//! One coordinator owns one media resource and maps transport controls onto
//! it while reconciling the position reports the resource sends back. The
//! embedding player implements [`MediaBackend`] over whatever actually plays
//! audio and feeds resource callbacks in as [`MediaEvent`]s.

/// Backward jumps larger than this are suspect when no seek explains them.
const SPURIOUS_REWIND_THRESHOLD_SECS: f64 = 1.0;

/// Commands the coordinator issues to the underlying media resource.
pub trait MediaBackend {
    fn load(&mut self, url: &str);
    /// Starting playback can fail (autoplay restrictions, dead stream).
    fn play(&mut self) -> Result<(), MediaFault>;
    fn pause(&mut self);
    fn set_position(&mut self, seconds: f64);
    fn set_volume(&mut self, volume: f64);
    fn set_muted(&mut self, muted: bool);
}

/// Notifications the media resource sends back.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    MetadataLoaded { duration: f64 },
    PositionChanged { position: f64 },
    Ended,
    Failed(MediaFault),
}

/// Classified playback failure, each with its own user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaFault {
    Aborted,
    Network,
    Decode,
    Unsupported,
}

impl MediaFault {
    pub fn user_message(&self) -> &'static str {
        match self {
            MediaFault::Aborted => "Playback aborted by the user.",
            MediaFault::Network => "Network error occurred while loading the audio.",
            MediaFault::Decode => "Audio decoding error. The file may be corrupted.",
            MediaFault::Unsupported => "Audio format not supported by your player.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerPhase {
    /// No source assigned yet.
    Uninitialized,
    /// Source assigned, waiting for metadata.
    Loading,
    /// Loaded and paused.
    Ready,
    Playing,
    /// Terminal until a new source is attached.
    Errored,
}

/// Transport-control surface over a single media resource.
///
/// Ephemeral: one coordinator per mounted player instance. The narration
/// record it plays outlives it.
pub struct PlaybackCoordinator<B: MediaBackend> {
    backend: B,
    phase: PlayerPhase,
    source: Option<String>,
    position: f64,
    duration: f64,
    volume: f64,
    muted: bool,
    fault: Option<MediaFault>,
    /// Set by an explicit seek so the next position report is accepted even
    /// when it moves backward.
    seek_pending: bool,
}

impl<B: MediaBackend> PlaybackCoordinator<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            phase: PlayerPhase::Uninitialized,
            source: None,
            position: 0.0,
            duration: 0.0,
            volume: 1.0,
            muted: false,
            fault: None,
            seek_pending: false,
        }
    }

    /// Assign a source URL.
    ///
    /// Re-assigning the URL that is already loaded is a no-op so that the
    /// surrounding page can re-render freely without resetting playback to
    /// zero. Any new URL (and any assignment after an error) tears the old
    /// session down and reloads.
    pub fn attach(&mut self, url: &str) {
        let unchanged = self.source.as_deref() == Some(url);
        if unchanged && self.phase != PlayerPhase::Uninitialized && self.phase != PlayerPhase::Errored
        {
            tracing::debug!(url, "Source unchanged, skipping reload");
            return;
        }

        if self.phase == PlayerPhase::Playing {
            self.backend.pause();
        }

        self.source = Some(url.to_string());
        self.phase = PlayerPhase::Loading;
        self.position = 0.0;
        self.duration = 0.0;
        self.fault = None;
        self.seek_pending = false;
        self.backend.load(url);
    }

    /// Apply a notification from the media resource.
    pub fn handle_event(&mut self, event: MediaEvent) {
        // Errored is terminal; nothing the old resource reports matters.
        if self.phase == PlayerPhase::Errored {
            return;
        }

        match event {
            MediaEvent::MetadataLoaded { duration } => {
                if self.phase == PlayerPhase::Loading {
                    self.phase = PlayerPhase::Ready;
                }
                self.duration = duration;
            }
            MediaEvent::PositionChanged { position } => {
                self.apply_position(position);
            }
            MediaEvent::Ended => {
                // Collapse straight back to paused-at-start.
                self.phase = PlayerPhase::Ready;
                self.position = 0.0;
                self.seek_pending = false;
            }
            MediaEvent::Failed(fault) => {
                tracing::warn!(?fault, "Playback failed");
                self.phase = PlayerPhase::Errored;
                self.fault = Some(fault);
            }
        }
    }

    /// Position reports occasionally jump backward to near zero on their
    /// own, a platform quirk rather than anything the user did. A report
    /// that rewinds by more than a second, from a position past one second,
    /// with no seek to explain it, is rejected and the resource is pushed
    /// back to the last known position.
    fn apply_position(&mut self, position: f64) {
        let spurious = !self.seek_pending
            && self.position > SPURIOUS_REWIND_THRESHOLD_SECS
            && position < self.position - SPURIOUS_REWIND_THRESHOLD_SECS;

        if spurious {
            tracing::warn!(
                last_position = self.position,
                reported = position,
                "Rejecting spurious position rewind"
            );
            self.backend.set_position(self.position);
            return;
        }

        self.position = position;
        self.seek_pending = false;
    }

    pub fn play(&mut self) {
        if self.phase != PlayerPhase::Ready {
            return;
        }
        match self.backend.play() {
            Ok(()) => self.phase = PlayerPhase::Playing,
            Err(fault) => {
                tracing::warn!(?fault, "Starting playback failed");
                self.phase = PlayerPhase::Errored;
                self.fault = Some(fault);
            }
        }
    }

    pub fn pause(&mut self) {
        if self.phase != PlayerPhase::Playing {
            return;
        }
        self.backend.pause();
        self.phase = PlayerPhase::Ready;
    }

    /// Explicit user seek. Flagged so the next position report is never
    /// mistaken for a spurious rewind, even if it moves backward.
    pub fn seek(&mut self, seconds: f64) {
        if self.phase != PlayerPhase::Ready && self.phase != PlayerPhase::Playing {
            return;
        }
        let target = seconds.clamp(0.0, self.duration);
        self.seek_pending = true;
        self.position = target;
        self.backend.set_position(target);
    }

    /// Set the volume (clamped to 0..1). Zero volume forces mute on; a
    /// nonzero volume while muted forces mute off.
    pub fn set_volume(&mut self, volume: f64) {
        if self.phase == PlayerPhase::Errored {
            return;
        }
        let volume = volume.clamp(0.0, 1.0);
        self.volume = volume;
        self.backend.set_volume(volume);

        if volume == 0.0 {
            if !self.muted {
                self.muted = true;
                self.backend.set_muted(true);
            }
        } else if self.muted {
            self.muted = false;
            self.backend.set_muted(false);
        }
    }

    /// Mute control, independent of volume: unmuting alone never restores a
    /// nonzero volume.
    pub fn set_muted(&mut self, muted: bool) {
        if self.phase == PlayerPhase::Errored {
            return;
        }
        self.muted = muted;
        self.backend.set_muted(muted);
    }

    pub fn phase(&self) -> PlayerPhase {
        self.phase
    }

    pub fn is_playing(&self) -> bool {
        self.phase == PlayerPhase::Playing
    }

    pub fn position_seconds(&self) -> f64 {
        self.position
    }

    pub fn duration_seconds(&self) -> f64 {
        self.duration
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn has_error(&self) -> bool {
        self.phase == PlayerPhase::Errored
    }

    /// User-facing message for the current fault, if any.
    pub fn error_message(&self) -> Option<&'static str> {
        self.fault.map(|f| f.user_message())
    }
}
