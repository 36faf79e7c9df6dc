// Time fields are stored relative to the elapsed-time clock so timers survive
// arbitrarily long gaps between save and load. Zero means "never set" and is
// passed through unchanged.

/// Absolute time at save -> stored delta.
pub fn encode_time(absolute: f64, elapsed_at_save: f64) -> f64 {
    if absolute == 0.0 {
        0.0
    } else {
        absolute - elapsed_at_save
    }
}

/// Stored delta -> absolute time at restore.
pub fn decode_time(delta: f64, elapsed_at_restore: f64) -> f64 {
    if delta == 0.0 {
        0.0
    } else {
        elapsed_at_restore + delta
    }
}
