//! Snapshot feed: the state every socket reads, and the replay task that advances it.

use protocol::RadarData;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Failed to read recording: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid snapshot on line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Recording contains no snapshots")]
    Empty,
}

/// Current snapshot plus the server-side money reveal switch.
#[derive(Debug, Clone)]
pub struct FeedState {
    snapshot: RadarData,
    money_reveal: bool,
}

pub type SharedFeed = Arc<RwLock<FeedState>>;

impl FeedState {
    pub fn new(freq: u32) -> Self {
        let mut snapshot = RadarData::empty(freq);
        snapshot.money_reveal_enabled = Some(false);
        Self {
            snapshot,
            money_reveal: false,
        }
    }

    pub fn shared(freq: u32) -> SharedFeed {
        Arc::new(RwLock::new(Self::new(freq)))
    }

    /// The snapshot to send, stamped with the money reveal state.
    pub fn snapshot(&self) -> &RadarData {
        &self.snapshot
    }

    pub fn set_snapshot(&mut self, mut data: RadarData) {
        data.money_reveal_enabled = Some(self.money_reveal);
        self.snapshot = data;
    }

    pub fn money_reveal(&self) -> bool {
        self.money_reveal
    }

    /// Flip money reveal and return the new state.
    pub fn toggle_money_reveal(&mut self) -> bool {
        self.money_reveal = !self.money_reveal;
        self.snapshot.money_reveal_enabled = Some(self.money_reveal);
        info!("Money reveal {}", if self.money_reveal { "enabled" } else { "disabled" });
        self.money_reveal
    }
}

/// A recorded sequence of snapshots.
#[derive(Debug, Clone)]
pub struct Recording {
    frames: Vec<RadarData>,
}

impl Recording {
    /// Parse a JSON array of snapshots, or one snapshot per line.
    pub fn parse(text: &str) -> Result<Self, FeedError> {
        let frames = if text.trim_start().starts_with('[') {
            serde_json::from_str(text).map_err(|source| FeedError::Json { line: source.line(), source })?
        } else {
            text.lines()
                .enumerate()
                .filter(|(_, line)| !line.trim().is_empty())
                .map(|(i, line)| {
                    serde_json::from_str(line).map_err(|source| FeedError::Json { line: i + 1, source })
                })
                .collect::<Result<Vec<RadarData>, _>>()?
        };

        if frames.is_empty() {
            return Err(FeedError::Empty);
        }
        Ok(Self { frames })
    }

    pub fn load(path: &Path) -> Result<Self, FeedError> {
        Self::parse(&std::fs::read_to_string(path)?)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[RadarData] {
        &self.frames
    }
}

/// Advance `feed` through `recording` at `freq` Hz.
///
/// Snapshots that carry no `freq` of their own report the replay rate. Without
/// `looping` the last snapshot stays in place once the recording ends.
pub async fn run_replay(feed: SharedFeed, recording: Recording, freq: u32, looping: bool) {
    let period = Duration::from_secs_f64(1.0 / f64::from(freq.max(1)));
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    info!("Replaying {} snapshots at {} Hz", recording.len(), freq);

    loop {
        for frame in recording.frames() {
            interval.tick().await;
            let mut data = frame.clone();
            if data.freq == 0 {
                data.freq = freq;
            }
            feed.write().await.set_snapshot(data);
        }

        if !looping {
            info!("Recording finished");
            break;
        }
        debug!("Recording looped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINE_A: &str = r#"{"freq":0,"ingame":true,"mapName":"de_dust2","entityData":[]}"#;
    const LINE_B: &str = r#"{"freq":32,"ingame":false,"entityData":[]}"#;

    #[test]
    fn test_parse_ndjson_and_array() {
        let ndjson = format!("{LINE_A}\n\n{LINE_B}\n");
        let recording = Recording::parse(&ndjson).unwrap();
        assert_eq!(recording.len(), 2);
        assert_eq!(recording.frames()[0].map(), Some("de_dust2"));

        let array = format!("[{LINE_A},{LINE_B}]");
        let recording = Recording::parse(&array).unwrap();
        assert_eq!(recording.len(), 2);
        assert!(!recording.frames()[1].in_match);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(Recording::parse(""), Err(FeedError::Empty)));
        assert!(matches!(Recording::parse("[]"), Err(FeedError::Empty)));
        let bad = format!("{LINE_A}\nnot json");
        assert!(matches!(Recording::parse(&bad), Err(FeedError::Json { line: 2, .. })));
    }

    #[test]
    fn test_money_reveal_is_stamped_on_snapshots() {
        let mut feed = FeedState::new(64);
        assert_eq!(feed.snapshot().money_reveal_enabled, Some(false));

        assert!(feed.toggle_money_reveal());
        assert_eq!(feed.snapshot().money_reveal_enabled, Some(true));

        feed.set_snapshot(RadarData::empty(64));
        assert_eq!(feed.snapshot().money_reveal_enabled, Some(true));
        assert!(!feed.toggle_money_reveal());
    }

    #[tokio::test]
    async fn test_replay_without_loop_keeps_last_frame() {
        let feed = FeedState::shared(64);
        let recording = Recording::parse(&format!("{LINE_A}\n{LINE_B}")).unwrap();

        run_replay(feed.clone(), recording, 64, false).await;

        let state = feed.read().await;
        assert!(!state.snapshot().in_match);
        assert_eq!(state.snapshot().freq, 32);
    }

    #[tokio::test]
    async fn test_replay_fills_missing_freq() {
        let feed = FeedState::shared(64);
        let recording = Recording::parse(LINE_A).unwrap();

        run_replay(feed.clone(), recording, 20, false).await;

        assert_eq!(feed.read().await.snapshot().freq, 20);
    }
}
