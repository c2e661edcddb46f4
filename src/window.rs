//! Selection of the daily digest window.
//!
//! The digest always covers one full prior calendar day in Korea Standard
//! Time. KST is a fixed `+09:00` offset with no daylight saving, so a
//! [`FixedOffset`] is exact and no tzdata lookup is needed.

use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};

/// Korea Standard Time, `UTC+09:00`.
pub fn kst() -> FixedOffset {
    FixedOffset::east_opt(9 * 3600).expect("KST offset is valid")
}

/// One full calendar day in KST, `[start 00:00:00, end 23:59:59]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DigestWindow {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

impl DigestWindow {
    /// Whether a timestamp falls inside the window (inclusive on both ends).
    pub fn contains(&self, t: DateTime<FixedOffset>) -> bool {
        t >= self.start && t <= self.end
    }

    /// Human-readable date label for delivery headers, e.g. `2026년 08월 29일`.
    pub fn date_label(&self) -> String {
        self.start.format("%Y년 %m월 %d일").to_string()
    }
}

/// Compute the digest window for `day_offset` days relative to `now`.
///
/// The default offset of `-1` selects yesterday in KST. Pure function of
/// its inputs.
pub fn select_window(now: DateTime<Utc>, day_offset: i64) -> DigestWindow {
    let target_date = (now.with_timezone(&kst()) + Duration::days(day_offset)).date_naive();
    let start = kst()
        .from_local_datetime(&target_date.and_hms_opt(0, 0, 0).expect("valid midnight"))
        .single()
        .expect("fixed offsets have no ambiguous local times");
    let end = kst()
        .from_local_datetime(&target_date.and_hms_opt(23, 59, 59).expect("valid end of day"))
        .single()
        .expect("fixed offsets have no ambiguous local times");
    DigestWindow { start, end }
}
