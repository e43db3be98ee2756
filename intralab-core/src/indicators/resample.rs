//! Right-closed, right-labeled bar aggregation.
//!
//! A fine bar stamped `t` falls in the bucket labeled `ceil(t, width)`,
//! measured from midnight of its date. With a 10-minute width the bucket
//! labeled 09:30 holds bars stamped 09:21..=09:30, so a coarse bar is only
//! complete at its own timestamp. Fractional seconds count: 09:20:00.5
//! belongs to the 09:30 bucket.

use chrono::{Duration, NaiveDateTime, NaiveTime};

use crate::domain::Bar;

/// Bucket label for a timestamp.
pub fn bucket_label(timestamp: NaiveDateTime, width: Duration) -> NaiveDateTime {
    let midnight = timestamp.date().and_time(NaiveTime::MIN);
    let width_ns = width.num_nanoseconds().unwrap_or(i64::MAX).max(1);
    // under a day of nanoseconds, always in range
    let offset_ns = (timestamp - midnight).num_nanoseconds().unwrap_or(0);
    let buckets = offset_ns / width_ns + i64::from(offset_ns % width_ns != 0);
    midnight + Duration::nanoseconds(buckets * width_ns)
}

/// Aggregate time-ordered bars into `width` buckets.
///
/// open = first, high = max, low = min, close = last, volume = sum.
/// Buckets with no bars are not emitted.
pub fn resample(bars: &[Bar], width: Duration) -> Vec<Bar> {
    let mut out: Vec<Bar> = Vec::new();
    for bar in bars {
        let label = bucket_label(bar.timestamp, width);
        match out.last_mut() {
            Some(current) if current.timestamp == label => {
                current.high = current.high.max(bar.high);
                current.low = current.low.min(bar.low);
                current.close = bar.close;
                current.volume += bar.volume;
            }
            _ => out.push(Bar {
                timestamp: label,
                ..*bar
            }),
        }
    }
    out
}
