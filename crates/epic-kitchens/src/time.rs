//! Conversions between narration timestamps, seconds and frame numbers.
//!
//! Timestamps are formatted as `HH:MM:SS[.fraction]`.

const MINUTES_TO_SECONDS: f64 = 60.0;
const HOURS_TO_SECONDS: f64 = 60.0 * 60.0;

/// A timestamp that is not `HH:MM:SS[.fraction]`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TimestampError {
    #[error("expected timestamp formatted as HH:MM:SS[.fraction], got {0:?}")]
    Format(String),

    #[error("invalid {component} {value:?} in timestamp {timestamp:?}")]
    Component {
        component: &'static str,
        value: String,
        timestamp: String,
    },
}

/// Total number of seconds of `timestamp`.
///
/// ```
/// use epic_kitchens::time::timestamp_to_seconds;
///
/// assert_eq!(timestamp_to_seconds("00:00:05.5").unwrap(), 5.5);
/// assert_eq!(timestamp_to_seconds("01:01:05.5").unwrap(), 3665.5);
/// ```
pub fn timestamp_to_seconds(timestamp: &str) -> Result<f64, TimestampError> {
    let mut parts = timestamp.trim().split(':');
    let (Some(hours), Some(minutes), Some(seconds), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(TimestampError::Format(timestamp.to_string()));
    };

    let parse = |component: &'static str, value: &str| -> Result<f64, TimestampError> {
        value
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v >= 0.0)
            .ok_or_else(|| TimestampError::Component {
                component,
                value: value.to_string(),
                timestamp: timestamp.to_string(),
            })
    };

    Ok(parse("hours", hours)? * HOURS_TO_SECONDS
        + parse("minutes", minutes)? * MINUTES_TO_SECONDS
        + parse("seconds", seconds)?)
}

/// Format `total_seconds` as a timestamp.
///
/// Hours and minutes are zero padded; seconds keep three decimals and are
/// not padded.
///
/// ```
/// use epic_kitchens::time::seconds_to_timestamp;
///
/// assert_eq!(seconds_to_timestamp(61.0), "00:01:1.000");
/// assert_eq!(seconds_to_timestamp(1225.78500002), "00:20:25.785");
/// ```
pub fn seconds_to_timestamp(total_seconds: f64) -> String {
    let ss = total_seconds % 60.0;
    let mm = ((total_seconds / MINUTES_TO_SECONDS) % 60.0).floor();
    let hh = (total_seconds / HOURS_TO_SECONDS).floor();
    format!("{hh:02.0}:{mm:02.0}:{ss:.3}")
}

/// Frame number of `timestamp` in frames extracted at `fps`.
///
/// Frames are numbered from 1, so a zero timestamp maps to frame 1.
pub fn timestamp_to_frame(timestamp: &str, fps: f64) -> Result<u64, TimestampError> {
    let total_seconds = timestamp_to_seconds(timestamp)?;
    if total_seconds == 0.0 {
        Ok(1)
    } else {
        Ok((total_seconds * fps).floor() as u64)
    }
}

/// Number of optical flow frames extracted with `(stride, dilation)` from
/// `rgb_frames` RGB frames, or `None` for a zero `stride`.
///
/// ```
/// use epic_kitchens::time::flow_frame_count;
///
/// assert_eq!(flow_frame_count(6, 2, 1), Some(3));
/// assert_eq!(flow_frame_count(7, 1, 3), Some(4));
/// assert_eq!(flow_frame_count(7, 0, 1), None);
/// ```
pub fn flow_frame_count(rgb_frames: u64, stride: u64, dilation: u64) -> Option<u64> {
    if stride == 0 {
        return None;
    }
    Some(rgb_frames.saturating_sub(dilation).div_ceil(stride))
}
