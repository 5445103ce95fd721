use stepgrid_core::{EditorConfig, Playback};

/// Free-running demo playhead. The editor only draws it; nothing here
/// produces sound.
#[derive(Clone, Debug)]
pub struct Transport {
    steps: usize,
    steps_per_ms: f32,
    playing: bool,
    position: f32,
    last_ms: Option<u64>,
}

impl Transport {
    pub fn new(config: &EditorConfig, steps: usize) -> Self {
        Self {
            steps,
            steps_per_ms: config.steps_per_ms(),
            playing: false,
            position: 0.0,
            last_ms: None,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn playback(&self) -> Playback {
        Playback {
            position: self.position,
            playing: self.playing,
        }
    }

    pub fn toggle(&mut self, now_ms: u64) -> Playback {
        self.playing = !self.playing;
        self.last_ms = self.playing.then_some(now_ms);
        log::debug!(
            "transport {} at step {:.2}",
            if self.playing { "started" } else { "stopped" },
            self.position
        );
        self.playback()
    }

    pub fn advance(&mut self, now_ms: u64) -> Playback {
        if !self.playing || self.steps == 0 {
            return self.playback();
        }
        let last = self.last_ms.replace(now_ms).unwrap_or(now_ms);
        let elapsed = now_ms.saturating_sub(last) as f32;
        self.position = (self.position + elapsed * self.steps_per_ms) % self.steps as f32;
        self.playback()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_wraps_at_pattern_end() {
        let config = EditorConfig::default();
        let mut transport = Transport::new(&config, 16);
        transport.toggle(0);
        // 120 bpm, four steps per beat: 8 steps per second.
        let playback = transport.advance(1_000);
        assert!((playback.position - 8.0).abs() < 1e-3);
        let playback = transport.advance(2_500);
        assert!((playback.position - 4.0).abs() < 1e-3);
        assert!(playback.playing);
    }

    #[test]
    fn test_stopped_transport_holds_position() {
        let config = EditorConfig::default();
        let mut transport = Transport::new(&config, 16);
        transport.toggle(0);
        transport.advance(250);
        let stopped = transport.toggle(300);
        assert!(!stopped.playing);
        let later = transport.advance(5_000);
        assert_eq!(later.position, stopped.position);
    }
}
