//! Duration estimates used to pace the control loop.
//!
//! Neither the actuator nor the synthesizer reports completion, so every motion and
//! utterance blocks for an estimated time instead. The constants are empirical policy.

/// Seconds per spoken word (maximal run of ASCII letters).
pub const WORD_SECS: f64 = 0.40;
/// Seconds per spoken digit.
pub const DIGIT_SECS: f64 = 0.40;

/// Estimated playback time of `text`, seconds.
pub fn utterance_duration(text: &str) -> f64 {
    let mut words = 0usize;
    let mut digits = 0usize;
    let mut in_word = false;

    for c in text.chars() {
        if c.is_ascii_alphabetic() {
            if !in_word {
                words += 1;
                in_word = true;
            }
        } else {
            in_word = false;
            if c.is_ascii_digit() {
                digits += 1;
            }
        }
    }

    words as f64 * WORD_SECS + digits as f64 * DIGIT_SECS
}

/// Estimated time of a simultaneous move, seconds. The slowest axis dominates.
pub fn motion_duration(dx: f64, dy: f64, rotation_degrees: f64) -> f64 {
    let x = 1.0 + dx.abs() * 5.0;
    let y = 1.0 + dy.abs() * 5.0;
    let rotation = 1.7 + rotation_degrees.abs() * 0.025;
    x.max(y).max(rotation)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn empty_utterance_takes_no_time() {
        assert_eq!(utterance_duration(""), 0.0);
        assert_eq!(utterance_duration("  ?! "), 0.0);
    }

    #[test]
    fn counts_words_and_digits() {
        assert!(approx(utterance_duration("Hello ! How can I help you ?"), 6.0 * 0.4));
        assert!(approx(utterance_duration("table 12"), 3.0 * 0.4));
        // "R2D2" is two letter runs and two digits
        assert!(approx(utterance_duration("R2D2"), 4.0 * 0.4));
    }

    #[test]
    fn grows_with_words_and_digits() {
        let mut previous = 0.0;
        let mut text = String::new();
        for i in 0..10 {
            text.push_str(if i % 2 == 0 { " word" } else { " 7" });
            let d = utterance_duration(&text);
            assert!(d >= previous);
            previous = d;
        }
    }

    #[test]
    fn rotation_floor_dominates_idle_move() {
        assert!(approx(motion_duration(0.0, 0.0, 0.0), 1.7));
    }

    #[test]
    fn dominant_axis() {
        assert!(approx(motion_duration(1.0, 0.0, 0.0), 6.0));
        assert!(approx(motion_duration(0.0, 0.0, 90.0), 3.95));
        assert!(approx(motion_duration(-0.2, 0.4, -10.0), 3.0));
    }
}
