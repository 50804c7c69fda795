use crate::{PnLError, Result, Trade};
use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use tracing::debug;

/// Parse a general timeframe string such as `30d`, `12h` or `1y` into a duration.
///
/// Grammar: `^(\d+)(s|min|h|d|m|y)$`, where a month is 30 days and a year 365 days.
pub fn parse_general_timeframe(timeframe: &str) -> Result<Duration> {
    let re = Regex::new(r"^(\d+)(s|min|h|d|m|y)$")
        .map_err(|e| PnLError::TimeframeParse(format!("Regex error: {}", e)))?;

    let captures = re
        .captures(timeframe.trim())
        .ok_or_else(|| PnLError::TimeframeParse(format!("Invalid timeframe format: {}", timeframe)))?;

    let amount: i64 = captures[1]
        .parse()
        .map_err(|e| PnLError::TimeframeParse(format!("Invalid number: {}", e)))?;

    let seconds_per_unit: i64 = match &captures[2] {
        "s" => 1,
        "min" => 60,
        "h" => 3_600,
        "d" => 86_400,
        "m" => 2_592_000,  // 30 days
        "y" => 31_536_000, // 365 days
        unit => return Err(PnLError::TimeframeParse(format!("Unknown time unit: {}", unit))),
    };

    let seconds = amount
        .checked_mul(seconds_per_unit)
        .ok_or_else(|| PnLError::TimeframeParse(format!("Timeframe too large: {}", timeframe)))?;

    let duration = Duration::try_seconds(seconds)
        .ok_or_else(|| PnLError::TimeframeParse(format!("Timeframe too large: {}", timeframe)))?;

    // Keeps the cutoff representable for any "now" after the epoch
    if DateTime::<Utc>::UNIX_EPOCH.checked_sub_signed(duration).is_none() {
        return Err(PnLError::TimeframeParse(format!(
            "Timeframe reaches outside the supported date range: {}",
            timeframe
        )));
    }

    Ok(duration)
}

/// Check if a timestamp falls on or after the cutoff. No cutoff means everything is inside.
pub fn is_within_timeframe(timestamp: DateTime<Utc>, cutoff: Option<DateTime<Utc>>) -> bool {
    match cutoff {
        Some(cutoff_time) => timestamp >= cutoff_time,
        None => true,
    }
}

/// Window start for `now`, or `None` when it would fall before the earliest representable date
pub fn window_cutoff(now: DateTime<Utc>, length: Duration) -> Option<DateTime<Utc>> {
    now.checked_sub_signed(length)
}

/// Keep the trades with `timestamp >= now − length`, in their original order, together with
/// their positions in `trades`.
pub fn slice_window_indexed(
    trades: &[Trade],
    now: DateTime<Utc>,
    length: Duration,
) -> (Vec<usize>, Vec<Trade>) {
    let cutoff = window_cutoff(now, length);
    let (positions, sliced): (Vec<usize>, Vec<Trade>) = trades
        .iter()
        .enumerate()
        .filter(|(_, trade)| is_within_timeframe(trade.timestamp, cutoff))
        .map(|(position, trade)| (position, trade.clone()))
        .unzip();

    debug!(
        "Window cutoff {:?} keeps {}/{} trades",
        cutoff,
        sliced.len(),
        trades.len()
    );

    (positions, sliced)
}

/// Keep the trades with `timestamp >= now − length`, in their original order.
pub fn slice_window(trades: &[Trade], now: DateTime<Utc>, length: Duration) -> Vec<Trade> {
    slice_window_indexed(trades, now, length).1
}

/// A trailing window measured back from "now"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrailingWindow {
    length_seconds: i64,
}

impl TrailingWindow {
    pub const THIRTY_DAYS: TrailingWindow = TrailingWindow {
        length_seconds: 30 * 86_400,
    };
    pub const TWELVE_MONTHS: TrailingWindow = TrailingWindow {
        length_seconds: 365 * 86_400,
    };

    pub fn new(length: Duration) -> Self {
        Self {
            length_seconds: length.num_seconds(),
        }
    }

    pub fn parse(timeframe: &str) -> Result<Self> {
        parse_general_timeframe(timeframe).map(Self::new)
    }

    pub fn length(&self) -> Duration {
        Duration::seconds(self.length_seconds)
    }

    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        window_cutoff(now, self.length())
    }

    pub fn slice(&self, trades: &[Trade], now: DateTime<Utc>) -> Vec<Trade> {
        slice_window(trades, now, self.length())
    }

    pub fn slice_indexed(&self, trades: &[Trade], now: DateTime<Utc>) -> (Vec<usize>, Vec<Trade>) {
        slice_window_indexed(trades, now, self.length())
    }
}
