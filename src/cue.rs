use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use strum_macros::Display;

use crate::error::Result;

/// Sounds the app knows how to play
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum CueId {
    TimerDone,
}

/// Audio collaborator. Errors mean "this environment cannot play audio";
/// callers skip the cue rather than fail.
pub trait AudioCue {
    fn play(&mut self, cue: CueId) -> Result<()>;
    /// Volume in `0.0..=1.0`
    fn set_volume(&mut self, volume: f32) -> Result<()>;
    fn stop(&mut self);
}

/// Rings the terminal bell once per cue. Terminals have no volume control,
/// so the envelope is accepted and ignored.
#[derive(Debug, Default)]
pub struct TerminalBell;

impl AudioCue for TerminalBell {
    fn play(&mut self, _cue: CueId) -> Result<()> {
        let mut out = io::stdout();
        out.write_all(b"\x07")?;
        out.flush()?;
        Ok(())
    }

    fn set_volume(&mut self, _volume: f32) -> Result<()> {
        Ok(())
    }

    fn stop(&mut self) {}
}

#[derive(Debug, Default)]
pub struct Silent;

impl AudioCue for Silent {
    fn play(&mut self, _cue: CueId) -> Result<()> {
        Ok(())
    }

    fn set_volume(&mut self, _volume: f32) -> Result<()> {
        Ok(())
    }

    fn stop(&mut self) {}
}

#[derive(Debug, Clone, PartialEq)]
pub enum AudioCall {
    Play(CueId),
    Volume(f32),
    Stop,
}

/// Records every call; clones share the log. For tests and headless runs.
#[derive(Debug, Clone, Default)]
pub struct RecordingAudio {
    calls: Arc<Mutex<Vec<AudioCall>>>,
}

impl RecordingAudio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<AudioCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn plays(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, AudioCall::Play(_)))
            .count()
    }

    fn push(&self, call: AudioCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}

impl AudioCue for RecordingAudio {
    fn play(&mut self, cue: CueId) -> Result<()> {
        self.push(AudioCall::Play(cue));
        Ok(())
    }

    fn set_volume(&mut self, volume: f32) -> Result<()> {
        self.push(AudioCall::Volume(volume));
        Ok(())
    }

    fn stop(&mut self) {
        self.push(AudioCall::Stop);
    }
}

/// Fade in, hold, fade out across the cue's lifetime.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    pub duration: Duration,
    pub fade_in: Duration,
    pub fade_out: Duration,
}

impl Envelope {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            fade_in: duration / 6,
            fade_out: duration / 3,
        }
    }

    pub fn volume_at(&self, elapsed: Duration) -> f32 {
        if elapsed >= self.duration {
            return 0.0;
        }
        if elapsed < self.fade_in {
            return elapsed.as_secs_f32() / self.fade_in.as_secs_f32();
        }
        let left = self.duration - elapsed;
        if left < self.fade_out {
            return left.as_secs_f32() / self.fade_out.as_secs_f32();
        }
        1.0
    }
}

/// Identifies one playback of the cue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CueToken(u64);

#[derive(Debug, Clone, Copy)]
struct ActiveCue {
    token: CueToken,
    started: Instant,
}

const FLASH_PERIOD: Duration = Duration::from_millis(250);

/// Timer-finished cue: a flashing display plus a sound with a volume
/// envelope. It ends itself after the envelope duration.
///
/// Each playback gets a fresh [`CueToken`]; [`CompletionCue::end`] only acts on
/// the playback it names, so a late cleanup never cuts short a newer cue.
pub struct CompletionCue {
    audio: Box<dyn AudioCue>,
    envelope: Envelope,
    active: Option<ActiveCue>,
    issued: u64,
}

impl std::fmt::Debug for CompletionCue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionCue")
            .field("envelope", &self.envelope)
            .field("active", &self.active)
            .finish()
    }
}

impl CompletionCue {
    pub fn new(audio: Box<dyn AudioCue>, duration: Duration) -> Self {
        Self {
            audio,
            envelope: Envelope::new(duration),
            active: None,
            issued: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn start(&mut self, now: Instant) -> CueToken {
        if self.active.is_some() {
            self.audio.stop();
        }
        self.issued += 1;
        let token = CueToken(self.issued);
        self.active = Some(ActiveCue {
            token,
            started: now,
        });
        let played = self
            .audio
            .play(CueId::TimerDone)
            .and_then(|_| self.audio.set_volume(0.0));
        if let Err(e) = played {
            log::debug!("audio cue skipped: {e}");
        }
        token
    }

    /// Advance the envelope; ends the cue once its time is up.
    pub fn update(&mut self, now: Instant) {
        let Some(active) = self.active else {
            return;
        };
        let elapsed = now.saturating_duration_since(active.started);
        if elapsed >= self.envelope.duration {
            self.end(active.token);
            return;
        }
        if let Err(e) = self.audio.set_volume(self.envelope.volume_at(elapsed)) {
            log::debug!("audio volume change failed: {e}");
        }
    }

    /// Stop the playback named by `token`, if it is still the current one.
    pub fn end(&mut self, token: CueToken) -> bool {
        match self.active {
            Some(active) if active.token == token => {
                self.active = None;
                self.audio.stop();
                true
            }
            _ => false,
        }
    }

    /// Stop whatever is playing.
    pub fn cancel(&mut self) {
        if let Some(active) = self.active {
            self.end(active.token);
        }
    }

    /// Whether the flashing display is in its lit phase.
    pub fn flash_on(&self, now: Instant) -> bool {
        match self.active {
            Some(active) => {
                let elapsed = now.saturating_duration_since(active.started);
                (elapsed.as_millis() / FLASH_PERIOD.as_millis()) % 2 == 0
            }
            None => false,
        }
    }
}
