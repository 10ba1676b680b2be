//! Entry modification times.
//!
//! ZIP headers carry an MS-DOS date/time pair with two-second resolution and
//! no time zone. This crate interprets and writes those fields as UTC and
//! additionally stores the exact Unix modification time in the extended
//! timestamp extra field (`0x5455`), which readers prefer when present.
//!
//! # Example
//!
//! ```rust
//! use zippy::timestamp::DosDateTime;
//!
//! // 2024-03-15 12:30:45 UTC
//! let dos = DosDateTime::from_unix_secs(1_710_505_845);
//! // seconds are truncated to an even value
//! assert_eq!(dos.to_unix_secs(), 1_710_505_844);
//! ```

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Header id of the extended timestamp extra field.
pub(crate) const EXTENDED_TIMESTAMP_ID: u16 = 0x5455;

const SECS_PER_DAY: i64 = 86_400;

/// 1980-01-01T00:00:00Z, the earliest representable DOS time.
const DOS_MIN_UNIX: i64 = 315_532_800;

/// 2107-12-31T23:59:58Z, the latest representable DOS time.
const DOS_MAX_UNIX: i64 = 4_354_819_198;

/// An MS-DOS packed date and time as stored in ZIP headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DosDateTime {
    /// Packed time: hour << 11 | minute << 5 | second / 2.
    pub time: u16,
    /// Packed date: (year - 1980) << 9 | month << 5 | day.
    pub date: u16,
}

impl DosDateTime {
    /// Packs a Unix time, clamping to the 1980-2107 range DOS can express.
    pub fn from_unix_secs(secs: i64) -> Self {
        let secs = secs.clamp(DOS_MIN_UNIX, DOS_MAX_UNIX);
        let days = secs.div_euclid(SECS_PER_DAY);
        let rem = secs.rem_euclid(SECS_PER_DAY);
        let (year, month, day) = civil_from_days(days);

        let hour = (rem / 3600) as u16;
        let minute = ((rem % 3600) / 60) as u16;
        let second = (rem % 60) as u16;

        Self {
            time: (hour << 11) | (minute << 5) | (second / 2),
            date: (((year - 1980) as u16) << 9) | ((month as u16) << 5) | day as u16,
        }
    }

    /// Packs a [`SystemTime`].
    pub fn from_system_time(time: SystemTime) -> Self {
        Self::from_unix_secs(unix_secs(time))
    }

    /// Unpacks to Unix seconds.
    ///
    /// Out-of-range fields written by other tools (month 0, day 0, hour 31)
    /// are clamped rather than rejected.
    pub fn to_unix_secs(&self) -> i64 {
        let year = 1980 + i64::from(self.date >> 9);
        let month = i64::from((self.date >> 5) & 0x0f).clamp(1, 12);
        let day = i64::from(self.date & 0x1f).max(1);
        let hour = i64::from(self.time >> 11).min(23);
        let minute = i64::from((self.time >> 5) & 0x3f).min(59);
        let second = (i64::from(self.time & 0x1f) * 2).min(59);

        days_from_civil(year, month, day) * SECS_PER_DAY + hour * 3600 + minute * 60 + second
    }
}

/// Converts a [`SystemTime`] to whole Unix seconds, flooring pre-epoch times.
pub fn unix_secs(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs() as i64,
        Err(e) => {
            let d = e.duration();
            let secs = d.as_secs() as i64;
            if d.subsec_nanos() > 0 { -secs - 1 } else { -secs }
        }
    }
}

/// Converts Unix seconds to a [`SystemTime`].
pub fn system_time_from_unix(secs: i64) -> SystemTime {
    if secs >= 0 {
        UNIX_EPOCH + Duration::from_secs(secs as u64)
    } else {
        UNIX_EPOCH - Duration::from_secs(secs.unsigned_abs())
    }
}

/// Encodes an extended timestamp extra field carrying only the mtime.
///
/// Returns `None` if the time does not fit the field's signed 32-bit value.
pub(crate) fn extended_timestamp_field(mtime: i64) -> Option<[u8; 9]> {
    let mtime = i32::try_from(mtime).ok()?;
    let mut field = [0u8; 9];
    field[0..2].copy_from_slice(&EXTENDED_TIMESTAMP_ID.to_le_bytes());
    field[2..4].copy_from_slice(&5u16.to_le_bytes());
    field[4] = 0x01;
    field[5..9].copy_from_slice(&mtime.to_le_bytes());
    Some(field)
}

/// Extracts the mtime from an extended timestamp field inside `extra`.
pub(crate) fn parse_extended_mtime(extra: &[u8]) -> Option<i64> {
    let data = find_extra_field(extra, EXTENDED_TIMESTAMP_ID)?;
    let (&flags, rest) = data.split_first()?;
    if flags & 0x01 == 0 || rest.len() < 4 {
        return None;
    }
    let mtime = i32::from_le_bytes([rest[0], rest[1], rest[2], rest[3]]);
    Some(i64::from(mtime))
}

/// Returns the data of the first extra field with the given header id.
pub(crate) fn find_extra_field(mut extra: &[u8], id: u16) -> Option<&[u8]> {
    while extra.len() >= 4 {
        let field_id = u16::from_le_bytes([extra[0], extra[1]]);
        let size = usize::from(u16::from_le_bytes([extra[2], extra[3]]));
        let body = extra.get(4..4 + size)?;
        if field_id == id {
            return Some(body);
        }
        extra = &extra[4 + size..];
    }
    None
}

/// Days since 1970-01-01 for a proleptic Gregorian date.
fn days_from_civil(year: i64, month: i64, day: i64) -> i64 {
    let y = if month <= 2 { year - 1 } else { year };
    let era = y.div_euclid(400);
    let yoe = y - era * 400;
    let mp = (month + 9) % 12;
    let doy = (153 * mp + 2) / 5 + day - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

/// Proleptic Gregorian (year, month, day) for days since 1970-01-01.
fn civil_from_days(days: i64) -> (i64, i64, i64) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}
