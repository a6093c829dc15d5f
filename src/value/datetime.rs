//! date, timestamp (naive), and timestamptz (UTC instant) codecs.
//!
//! Per Design Note / Open Question in §9, binary dates/timestamps that
//! would overflow the representable range are rejected explicitly rather
//! than silently wrapping or panicking.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};

use crate::error::{Error, Result, SqlState};

fn decode_err(msg: impl Into<String>) -> Error {
    Error::wire(SqlState::InvalidDatetimeFormat, msg)
}

fn out_of_range(msg: impl Into<String>) -> Error {
    Error::wire(SqlState::NumericValueOutOfRange, msg)
}

fn pg_epoch_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2000, 1, 1).expect("2000-01-01 is a valid date")
}

fn pg_epoch_datetime() -> NaiveDateTime {
    pg_epoch_date().and_hms_opt(0, 0, 0).expect("midnight is valid")
}

// ---- date ----

pub fn decode_date_text(bytes: &[u8]) -> Result<NaiveDate> {
    let s = std::str::from_utf8(bytes).map_err(|e| decode_err(format!("invalid UTF-8: {e}")))?;
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| decode_err(format!("invalid date {s:?}: {e}")))
}

pub fn encode_date_text(value: NaiveDate) -> Vec<u8> {
    value.format("%Y-%m-%d").to_string().into_bytes()
}

pub fn decode_date_binary(bytes: &[u8]) -> Result<NaiveDate> {
    let arr: [u8; 4] = bytes.try_into().map_err(|_| decode_err("date: expected 4 bytes"))?;
    let days = i32::from_be_bytes(arr);
    pg_epoch_date()
        .checked_add_signed(chrono::Duration::days(days as i64))
        .ok_or_else(|| out_of_range("date: value outside the representable range"))
}

pub fn encode_date_binary(value: NaiveDate) -> Result<Vec<u8>> {
    let days = (value - pg_epoch_date()).num_days();
    let days = i32::try_from(days).map_err(|_| out_of_range("date: value outside int32 day range"))?;
    Ok(days.to_be_bytes().to_vec())
}

// ---- timestamp (naive, no time zone) ----

pub fn decode_timestamp_text(bytes: &[u8]) -> Result<NaiveDateTime> {
    let s = std::str::from_utf8(bytes).map_err(|e| decode_err(format!("invalid UTF-8: {e}")))?;
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .map_err(|e| decode_err(format!("invalid timestamp {s:?}: {e}")))
}

pub fn encode_timestamp_text(value: NaiveDateTime) -> Vec<u8> {
    if value.nanosecond() == 0 {
        value.format("%Y-%m-%d %H:%M:%S").to_string().into_bytes()
    } else {
        value.format("%Y-%m-%d %H:%M:%S%.6f").to_string().into_bytes()
    }
}

fn naive_to_micros_since_epoch(value: NaiveDateTime) -> Result<i64> {
    let delta = value - pg_epoch_datetime();
    delta
        .num_microseconds()
        .ok_or_else(|| out_of_range("timestamp: value outside the int64-microsecond range"))
}

fn micros_since_epoch_to_naive(micros: i64) -> Result<NaiveDateTime> {
    pg_epoch_datetime()
        .checked_add_signed(chrono::Duration::microseconds(micros))
        .ok_or_else(|| out_of_range("timestamp: value outside the representable range"))
}

pub fn decode_timestamp_binary(bytes: &[u8]) -> Result<NaiveDateTime> {
    let arr: [u8; 8] = bytes.try_into().map_err(|_| decode_err("timestamp: expected 8 bytes"))?;
    micros_since_epoch_to_naive(i64::from_be_bytes(arr))
}

pub fn encode_timestamp_binary(value: NaiveDateTime) -> Result<Vec<u8>> {
    Ok(naive_to_micros_since_epoch(value)?.to_be_bytes().to_vec())
}

// ---- timestamptz (UTC instant) ----

pub fn decode_timestamptz_text(bytes: &[u8]) -> Result<DateTime<Utc>> {
    let s = std::str::from_utf8(bytes).map_err(|e| decode_err(format!("invalid UTF-8: {e}")))?;
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    // No offset given: per §4.2 decode also accepts ISO forms unconditionally;
    // a bare timestamp is interpreted as UTC in the absence of TimeZone negotiation.
    let naive = decode_timestamp_text(bytes)?;
    Ok(Utc.from_utc_datetime(&naive))
}

pub fn encode_timestamptz_text(value: DateTime<Utc>) -> Vec<u8> {
    value.format("%Y-%m-%d %H:%M:%S%.6f+00").to_string().into_bytes()
}

pub fn decode_timestamptz_binary(bytes: &[u8]) -> Result<DateTime<Utc>> {
    let naive = decode_timestamp_binary(bytes)?;
    Ok(Utc.from_utc_datetime(&naive))
}

pub fn encode_timestamptz_binary(value: DateTime<Utc>) -> Result<Vec<u8>> {
    encode_timestamp_binary(value.naive_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_binary_roundtrip() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let bytes = encode_date_binary(d).unwrap();
        assert_eq!(decode_date_binary(&bytes).unwrap(), d);
    }

    #[test]
    fn date_text_roundtrip() {
        let d = NaiveDate::from_ymd_opt(1999, 12, 31).unwrap();
        let text = encode_date_text(d);
        assert_eq!(decode_date_text(&text).unwrap(), d);
    }

    #[test]
    fn timestamp_binary_roundtrip() {
        let ts = NaiveDate::from_ymd_opt(2024, 3, 15)
            .unwrap()
            .and_hms_micro_opt(12, 30, 45, 123456)
            .unwrap();
        let bytes = encode_timestamp_binary(ts).unwrap();
        assert_eq!(decode_timestamp_binary(&bytes).unwrap(), ts);
    }

    #[test]
    fn timestamptz_roundtrip() {
        let ts = Utc
            .from_utc_datetime(&NaiveDate::from_ymd_opt(2024, 3, 15).unwrap().and_hms_opt(0, 0, 0).unwrap());
        let bytes = encode_timestamptz_binary(ts).unwrap();
        assert_eq!(decode_timestamptz_binary(&bytes).unwrap(), ts);
    }
}
