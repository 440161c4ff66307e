//! Shared rate/pitch/voice-language normalization helpers (spec §4.6).
//!
//! Pure functions so both backend adapters and tests can reproduce the exact
//! mapping without touching any provider state.

/// Default language code used when a voice id doesn't carry a recognizable one.
pub const DEFAULT_LANGUAGE_CODE: &str = "cs-CZ";

/// Map `rate ∈ [-100, 100]` onto a 0.25..4.0 "multiplier" backend scale.
/// `rate == 0` maps to `default`, not `1.0`, per spec §4.6.
pub fn rate_to_multiplier(rate: i32, default: f64) -> f64 {
    if rate == 0 {
        return default;
    }
    let normalized = rate as f64 / 100.0;
    if normalized > 0.0 {
        1.0 + normalized * 3.0
    } else {
        1.0 + normalized * 0.75
    }
}

/// Map `rate ∈ [-100, 100]` onto a signed percentage string, e.g. `"+25%"`.
pub fn rate_to_percentage_string(rate: i32) -> String {
    if rate >= 0 {
        format!("+{}%", rate)
    } else {
        format!("{}%", rate)
    }
}

/// Map `pitch ∈ [-100, 100]` onto semitones `[-20, 20]`.
pub fn pitch_to_semitones(pitch: i32) -> f64 {
    (pitch as f64 / 100.0) * 20.0
}

/// Map `pitch ∈ [-100, 100]` onto a signed Hz string, e.g. `"+10Hz"`.
pub fn pitch_to_hz_string(pitch: i32) -> String {
    if pitch >= 0 {
        format!("+{}Hz", pitch)
    } else {
        format!("{}Hz", pitch)
    }
}

/// Extract the `xx-YY` language code from a voice id like `xx-YY-Foo-Bar`.
/// Falls back to [`DEFAULT_LANGUAGE_CODE`] when malformed.
pub fn voice_language_code(voice: &str) -> String {
    let mut parts = voice.split('-');
    match (parts.next(), parts.next()) {
        (Some(lang), Some(region)) if !lang.is_empty() && !region.is_empty() => {
            format!("{}-{}", lang, region)
        }
        _ => DEFAULT_LANGUAGE_CODE.to_string(),
    }
}
