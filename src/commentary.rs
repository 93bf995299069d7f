use chrono::{DateTime, Duration, Utc};

use crate::match_state::MatchState;
use crate::rcon::MessageSink;

/// Wall-clock source. Swapped for a manual clock in tests.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Anti-spam key and gating options attached to one commentary line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cue {
    pub key: String,
    pub cooldown_seconds: Option<u64>,
    pub once_per_round: bool,
}

impl Cue {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            cooldown_seconds: None,
            once_per_round: false,
        }
    }

    pub fn cooldown(mut self, seconds: u64) -> Self {
        self.cooldown_seconds = Some(seconds);
        self
    }

    pub fn once_per_round(mut self) -> Self {
        self.once_per_round = true;
        self
    }
}

/// The single gate every commentary line passes through.
#[derive(Debug, Clone, Copy)]
pub struct CommentaryPolicy {
    default_cooldown_seconds: u64,
}

impl CommentaryPolicy {
    pub fn new(default_cooldown_seconds: u64) -> Self {
        Self {
            default_cooldown_seconds,
        }
    }

    /// Sends `message` unless commentary is off, the key was already used this
    /// round (for once-per-round cues), or the key is still cooling down.
    pub fn emit(
        &self,
        state: &mut MatchState,
        sink: &mut dyn MessageSink,
        now: DateTime<Utc>,
        message: &str,
        cue: &Cue,
    ) -> bool {
        if !state.should_commentate() {
            return false;
        }

        if cue.once_per_round && state.round_comment_keys.contains(&cue.key) {
            return false;
        }

        let cooldown_seconds = cue
            .cooldown_seconds
            .unwrap_or(self.default_cooldown_seconds);
        if cooldown_seconds > 0 {
            if let Some(last_at) = state.last_comment_at.get(&cue.key) {
                let cooldown = Duration::seconds(cooldown_seconds as i64);
                if now.signed_duration_since(*last_at) < cooldown {
                    tracing::debug!(key = %cue.key, "Commentary suppressed by cooldown");
                    return false;
                }
            }
        }

        sink.send(message);
        state.last_comment_at.insert(cue.key.clone(), now);
        if cue.once_per_round {
            state.round_comment_keys.insert(cue.key.clone());
        }
        true
    }
}
