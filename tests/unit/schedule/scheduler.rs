use super::*;

#[test]
fn single_frame_sits_at_start() {
    let s = schedule(1, 6, 18).unwrap();
    assert_eq!(s.len(), 1);
    assert_eq!(s[0].progress, 0.0);
    assert_eq!(s[0].hour, 6);
    assert!((s[0].model_time - 0.25).abs() < 1e-6);
}

#[test]
fn default_window_hits_both_endpoints() {
    let s = schedule(48, 6, 18).unwrap();
    assert_eq!(s.len(), 48);
    assert_eq!(s[0].hour, 6);
    assert_eq!(s[47].hour, 18);
    assert_eq!(s[47].progress, 1.0);
    assert!((s[47].model_time - 0.75).abs() < 1e-6);
}

#[test]
fn overnight_window_wraps() {
    let hours: Vec<u8> = schedule(9, 22, 6).unwrap().iter().map(|e| e.hour).collect();
    assert_eq!(hours, vec![22, 23, 0, 1, 2, 3, 4, 5, 6]);
}

#[test]
fn equal_hours_cover_a_full_day() {
    let s = schedule(25, 6, 6).unwrap();
    assert_eq!(s[0].hour, 6);
    assert_eq!(s[18].hour, 0);
    assert_eq!(s[24].hour, 6);
    // Last frame lands back on the start time of day.
    assert!((s[24].model_time - 0.25).abs() < 1e-6);
}

#[test]
fn midnight_end_maps_to_zero_model_time() {
    let s = schedule(2, 12, 0).unwrap();
    assert_eq!(s[1].hour, 0);
    assert!(s[1].model_time.abs() < 1e-6);
}

#[test]
fn invalid_inputs_are_rejected() {
    assert!(matches!(schedule(0, 6, 18), Err(DaylapseError::Validation(_))));
    assert!(matches!(schedule(4, 24, 18), Err(DaylapseError::Validation(_))));
    assert!(matches!(schedule(4, 6, 99), Err(DaylapseError::Validation(_))));
}

#[test]
fn time_of_day_buckets_are_inclusive() {
    let expected = [
        (4, TimeOfDay::Night),
        (5, TimeOfDay::Dawn),
        (7, TimeOfDay::Dawn),
        (8, TimeOfDay::Morning),
        (11, TimeOfDay::Morning),
        (12, TimeOfDay::Afternoon),
        (16, TimeOfDay::Afternoon),
        (17, TimeOfDay::Sunset),
        (19, TimeOfDay::Sunset),
        (20, TimeOfDay::Night),
        (0, TimeOfDay::Night),
    ];
    for (hour, tod) in expected {
        assert_eq!(TimeOfDay::from_hour(hour), tod, "hour {hour}");
    }
}

#[test]
fn clock_label_pads_the_hour() {
    assert_eq!(TimeOfDay::clock_label(6), "dawn (06:00)");
    assert_eq!(TimeOfDay::clock_label(18), "sunset (18:00)");
    assert_eq!(TimeOfDay::Night.to_string(), "night");
}
