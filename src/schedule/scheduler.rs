use std::fmt;

use serde::Serialize;

use crate::foundation::error::{DaylapseError, DaylapseResult};

/// Coarse time-of-day bucket used for frame labels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
    /// Hours 5 to 7.
    Dawn,
    /// Hours 8 to 11.
    Morning,
    /// Hours 12 to 16.
    Afternoon,
    /// Hours 17 to 19.
    Sunset,
    /// Everything else.
    Night,
}

impl TimeOfDay {
    /// Bucket an hour of day. Hours above 23 are reduced modulo 24.
    pub fn from_hour(hour: u8) -> Self {
        match hour % 24 {
            5..=7 => Self::Dawn,
            8..=11 => Self::Morning,
            12..=16 => Self::Afternoon,
            17..=19 => Self::Sunset,
            _ => Self::Night,
        }
    }

    /// Lowercase label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dawn => "dawn",
            Self::Morning => "morning",
            Self::Afternoon => "afternoon",
            Self::Sunset => "sunset",
            Self::Night => "night",
        }
    }

    /// Label with the wall-clock hour, e.g. `"dawn (06:00)"`.
    pub fn clock_label(hour: u8) -> String {
        format!("{} ({:02}:00)", Self::from_hour(hour), hour % 24)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One scheduled frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ScheduleEntry {
    /// Position in the output sequence.
    pub index: usize,
    /// Fraction of the window covered, `0.0..=1.0`.
    pub progress: f32,
    /// Time value handed to the generator, `0.0..1.0` (fraction of a day).
    pub model_time: f32,
    /// Hour of day, `0..=23`.
    pub hour: u8,
}

impl ScheduleEntry {
    /// Bucket of [`ScheduleEntry::hour`].
    pub fn time_of_day(&self) -> TimeOfDay {
        TimeOfDay::from_hour(self.hour)
    }
}

// Slack for floor() at exact hour boundaries after the progress multiply.
const HOUR_EPSILON: f64 = 1e-9;

/// Spread `frame_count` frames evenly from `start_hour` to `end_hour`, both inclusive.
///
/// An end at or before the start wraps past midnight, so equal hours cover a full day. A single
/// frame sits at the start hour.
pub fn schedule(
    frame_count: usize,
    start_hour: u8,
    end_hour: u8,
) -> DaylapseResult<Vec<ScheduleEntry>> {
    if frame_count == 0 {
        return Err(DaylapseError::validation("frame_count must be at least 1"));
    }
    if start_hour > 23 || end_hour > 23 {
        return Err(DaylapseError::validation(format!(
            "hours must be in 0..=23 (got start={start_hour}, end={end_hour})"
        )));
    }

    let start = f64::from(start_hour);
    let mut end = f64::from(end_hour);
    if end <= start {
        end += 24.0;
    }
    let span = end - start;

    let entries = (0..frame_count)
        .map(|index| {
            let progress = if frame_count > 1 {
                index as f64 / (frame_count - 1) as f64
            } else {
                0.0
            };
            let hours = start + progress * span;
            let hour = ((hours + HOUR_EPSILON).floor() as u64 % 24) as u8;
            let mut model_time = (hours / 24.0).rem_euclid(1.0) as f32;
            if model_time >= 1.0 {
                model_time = 0.0;
            }
            ScheduleEntry {
                index,
                progress: progress as f32,
                model_time,
                hour,
            }
        })
        .collect();
    Ok(entries)
}

#[cfg(test)]
#[path = "../../tests/unit/schedule/scheduler.rs"]
mod tests;
