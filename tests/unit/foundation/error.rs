use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        DaylapseError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        DaylapseError::invalid_frame("x")
            .to_string()
            .contains("invalid frame:")
    );
    assert!(
        DaylapseError::resource("x")
            .to_string()
            .contains("resource acquisition failed:")
    );
    assert!(DaylapseError::encode("x").to_string().contains("encode error:"));
    assert!(DaylapseError::mux("x").to_string().contains("mux error:"));
    assert!(DaylapseError::render("x").to_string().contains("render error:"));
}

#[test]
fn frame_count_mismatch_reports_both_counts() {
    let err = DaylapseError::FrameCountMismatch {
        requested: 48,
        produced: 45,
    };
    let msg = err.to_string();
    assert!(msg.contains("48"));
    assert!(msg.contains("45"));
}

#[test]
fn protocol_violations_are_classified() {
    assert!(DaylapseError::FormatRenegotiation.is_protocol_violation());
    assert!(DaylapseError::BufferBeforeTrack.is_protocol_violation());
    assert!(!DaylapseError::encode("x").is_protocol_violation());
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = DaylapseError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
