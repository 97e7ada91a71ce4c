//! Perception producers: decode raw sensor readings, apply the boundary filters and write
//! the perception slots.
//!
//! Handlers are synchronous and never block. Noise (weak direction estimates, echo,
//! unreadable payloads) is dropped here instead of reaching the control loop.

use crate::echo::EchoFilter;
use crate::error::{ConciergeError, ConciergeResult};
use crate::perception::{PerceptionState, Utterance};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Minimum normalized energy for a direction estimate to count as a speaking user.
pub const DEFAULT_BEARING_CONFIDENCE_THRESHOLD: f64 = 0.2;

/// Readings beyond the front sonar's reach are treated as noise, meters.
pub const DEFAULT_MAX_RANGE_M: f64 = 5.0;

/// Direction-of-arrival estimate from the microphone array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AudioSourceReading {
    /// Azimuth in radians, counter-clockwise from the robot's front.
    pub azimuth: f64,
    /// Normalized signal energy, 0..1.
    pub energy: f64,
}

/// Front sonar reading, meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeReading {
    pub range: f64,
}

/// One event on the perception bridge, tagged by source topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "topic", rename_all = "snake_case")]
pub enum PerceptionEvent {
    AudioSource(AudioSourceReading),
    /// `data` is the recognizer's JSON payload, carried as a string.
    Utterance { data: String },
    Sonar(RangeReading),
}

#[derive(Debug, Deserialize)]
struct RecognizedSpeech {
    text: String,
    time_stop_speaking: serde_json::Value,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Azimuth (radians) to a signed bearing in degrees, rounded to two decimals.
/// Anything past 181° is folded into the negative half.
pub fn azimuth_to_bearing(azimuth_radians: f64) -> f64 {
    let degrees = round2(azimuth_radians.to_degrees());
    if degrees > 181.0 {
        round2(degrees - 360.0)
    } else {
        degrees
    }
}

/// Decode the recognizer payload `{"text": ..., "time_stop_speaking": ...}`.
/// The timestamp may arrive as a JSON number or a numeric string.
pub fn parse_recognized_speech(payload: &str) -> ConciergeResult<Utterance> {
    let speech: RecognizedSpeech = serde_json::from_str(payload)
        .map_err(|e| ConciergeError::MalformedFeed(format!("utterance payload: {}", e)))?;

    let end_timestamp = match &speech.time_stop_speaking {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .ok_or_else(|| {
        ConciergeError::MalformedFeed(format!(
            "time_stop_speaking is not a number: {}",
            speech.time_stop_speaking
        ))
    })?;

    Ok(Utterance::new(speech.text, end_timestamp))
}

/// Entry points the sensor subscriptions call into.
pub struct PerceptionFeeds {
    state: Arc<PerceptionState>,
    echo: EchoFilter,
    bearing_threshold: f64,
    max_range_m: f64,
}

impl PerceptionFeeds {
    pub fn new(state: Arc<PerceptionState>, echo: EchoFilter, bearing_threshold: f64) -> Self {
        Self {
            state,
            echo,
            bearing_threshold,
            max_range_m: DEFAULT_MAX_RANGE_M,
        }
    }

    pub fn with_max_range(mut self, max_range_m: f64) -> Self {
        self.max_range_m = max_range_m;
        self
    }

    pub fn state(&self) -> &Arc<PerceptionState> {
        &self.state
    }

    /// Returns true when the reading was confident enough to update the bearing.
    pub fn on_audio_source(&self, reading: AudioSourceReading) -> bool {
        if !reading.azimuth.is_finite() || reading.azimuth.abs() > std::f64::consts::TAU {
            debug!(target: "concierge::feeds", azimuth = reading.azimuth, "invalid azimuth ignored");
            return false;
        }
        let bearing = azimuth_to_bearing(reading.azimuth);
        let energy = round2(reading.energy);
        if energy >= self.bearing_threshold {
            self.state.bearing.set(bearing);
            true
        } else {
            debug!(target: "concierge::feeds", bearing, energy, "weak audio source ignored");
            false
        }
    }

    /// Returns true when the utterance was stored, false when it was dropped as echo.
    pub fn on_utterance(&self, utterance: Utterance) -> bool {
        if self.echo.should_accept(utterance.end_timestamp) {
            self.state.utterance.set(utterance);
            true
        } else {
            warn!(
                target: "concierge::feeds",
                text = %utterance.text,
                "heard an utterance but it is the robot's own speech"
            );
            false
        }
    }

    /// Decode a raw recognizer payload and pass it through [`PerceptionFeeds::on_utterance`].
    pub fn on_recognized_speech(&self, payload: &str) -> ConciergeResult<bool> {
        let utterance = parse_recognized_speech(payload)?;
        Ok(self.on_utterance(utterance))
    }

    /// Negative, non-finite and out-of-reach ranges are dropped.
    pub fn on_range(&self, reading: RangeReading) -> bool {
        if !reading.range.is_finite() || reading.range < 0.0 || reading.range > self.max_range_m {
            debug!(target: "concierge::feeds", range = reading.range, "invalid range ignored");
            return false;
        }
        self.state.distance.set(round2(reading.range));
        true
    }

    /// Dispatch one bridge event to its handler.
    pub fn handle(&self, event: PerceptionEvent) -> ConciergeResult<bool> {
        match event {
            PerceptionEvent::AudioSource(reading) => Ok(self.on_audio_source(reading)),
            PerceptionEvent::Utterance { data } => self.on_recognized_speech(&data),
            PerceptionEvent::Sonar(reading) => Ok(self.on_range(reading)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::echo::{SpeechWindow, SpeechWindowPublisher, DEFAULT_ECHO_MARGIN_SECS};

    fn feeds() -> (PerceptionFeeds, SpeechWindowPublisher) {
        let windows = SpeechWindowPublisher::new();
        let feeds = PerceptionFeeds::new(
            Arc::new(PerceptionState::new()),
            windows.filter(DEFAULT_ECHO_MARGIN_SECS),
            DEFAULT_BEARING_CONFIDENCE_THRESHOLD,
        );
        (feeds, windows)
    }

    #[test]
    fn bearing_wraps_past_181_degrees() {
        assert_eq!(azimuth_to_bearing(30f64.to_radians()), 30.0);
        assert_eq!(azimuth_to_bearing(3.3), -170.92);
        assert_eq!(azimuth_to_bearing(-0.5), -28.65);
    }

    #[test]
    fn weak_audio_source_is_dropped() {
        let (feeds, _) = feeds();
        assert!(!feeds.on_audio_source(AudioSourceReading { azimuth: 0.5, energy: 0.19 }));
        assert_eq!(feeds.state().bearing.current(), None);

        assert!(feeds.on_audio_source(AudioSourceReading { azimuth: 0.5, energy: 0.2 }));
        assert_eq!(feeds.state().bearing.current(), Some(28.65));
    }

    #[test]
    fn echo_is_never_stored() {
        let (feeds, windows) = feeds();
        windows.publish(SpeechWindow::new(10.0, 12.0));

        assert!(!feeds.on_utterance(Utterance::new("how can I help", 12.5)));
        assert_eq!(feeds.state().utterance.current(), None);

        assert!(feeds.on_utterance(Utterance::new("a table for two", 13.1)));
        assert_eq!(
            feeds.state().utterance.current(),
            Some(Utterance::new("a table for two", 13.1))
        );
    }

    #[test]
    fn recognizer_payload_accepts_string_or_number_timestamps() {
        let u = parse_recognized_speech(r#"{"text": "hello", "time_stop_speaking": "1700000000.25"}"#).unwrap();
        assert_eq!(u, Utterance::new("hello", 1_700_000_000.25));

        let u = parse_recognized_speech(r#"{"text": "hi", "time_stop_speaking": 42}"#).unwrap();
        assert_eq!(u.end_timestamp, 42.0);
    }

    #[test]
    fn malformed_payload_is_reported() {
        let (feeds, _) = feeds();
        let err = feeds.on_recognized_speech(r#"{"text": "hi"}"#).unwrap_err();
        assert!(matches!(err, ConciergeError::MalformedFeed(_)));

        let err = parse_recognized_speech(r#"{"text": "hi", "time_stop_speaking": "soon"}"#).unwrap_err();
        assert!(matches!(err, ConciergeError::MalformedFeed(_)));
        assert_eq!(feeds.state().utterance.current(), None);
    }

    #[test]
    fn range_is_rounded_and_validated() {
        let (feeds, _) = feeds();
        assert!(feeds.on_range(RangeReading { range: 1.2049 }));
        assert_eq!(feeds.state().distance.current(), Some(1.2));
        assert!(!feeds.on_range(RangeReading { range: -0.1 }));
        assert!(!feeds.on_range(RangeReading { range: f64::NAN }));
        assert_eq!(feeds.state().distance.current(), Some(1.2));
    }

    #[test]
    fn implausible_readings_never_reach_the_slots() {
        let (feeds, _) = feeds();
        let event: PerceptionEvent = serde_json::from_str(r#"{"topic": "sonar", "range": 1e300}"#).unwrap();
        assert!(!feeds.handle(event).unwrap());
        assert!(!feeds.on_range(RangeReading { range: 5.01 }));
        assert!(feeds.on_range(RangeReading { range: 5.0 }));
        assert_eq!(feeds.state().distance.current(), Some(5.0));

        assert!(!feeds.on_audio_source(AudioSourceReading { azimuth: 1e300, energy: 0.9 }));
        assert!(!feeds.on_audio_source(AudioSourceReading { azimuth: f64::INFINITY, energy: 0.9 }));
        assert_eq!(feeds.state().bearing.current(), None);

        let feeds = feeds.with_max_range(8.0);
        assert!(feeds.on_range(RangeReading { range: 7.5 }));
    }

    #[test]
    fn bridge_events_decode_by_topic() {
        let (feeds, _) = feeds();
        let events = [
            r#"{"topic": "audio_source", "azimuth": 0.0, "energy": 0.9}"#,
            r#"{"topic": "sonar", "range": 2.0}"#,
            r#"{"topic": "utterance", "data": "{\"text\": \"hello\", \"time_stop_speaking\": 5.0}"}"#,
        ];
        for line in events {
            let event: PerceptionEvent = serde_json::from_str(line).unwrap();
            assert!(feeds.handle(event).unwrap());
        }
        assert_eq!(feeds.state().bearing.current(), Some(0.0));
        assert_eq!(feeds.state().distance.current(), Some(2.0));
        assert_eq!(feeds.state().utterance.current(), Some(Utterance::new("hello", 5.0)));
    }
}
