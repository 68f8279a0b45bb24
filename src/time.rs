use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use crate::error::DecodeError;

pub(crate) const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Guesses a date-time pattern such as `yyyy-M-d H:m:s` for a sample value.
///
/// The pattern uses the letter notation of the exports (`d.M.yyyy`,
/// `h:m a`, `'T'` for a literal) and is turned into a chrono format string
/// when parsing. Returns `None` when either the date or the time part is not
/// recognized.
pub fn find_format_pattern(date_time: &str) -> Option<String> {
    let (date, separator, time) = if let Some((date, time)) = split_t(date_time) {
        (date, "'T'", time)
    } else if let Some((date, time)) = split_in_two(date_time, ' ', 3) {
        (date, " ", time)
    } else if let Some((date, time)) = split_in_two(date_time, ' ', 1) {
        (date, " ", time)
    } else {
        return None;
    };

    let date_format = find_date_format(date)?;
    let time_format = find_time_format(time)?;
    Some(format!("{date_format}{separator}{time_format}"))
}

fn split_t(value: &str) -> Option<(&str, &str)> {
    let mut parts = value.split('T');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(date), Some(time), None) => Some((date, time)),
        _ => None,
    }
}

// Splits around the n-th occurrence of the separator
fn split_in_two(value: &str, separator: char, occurrence: usize) -> Option<(&str, &str)> {
    value
        .match_indices(separator)
        .nth(occurrence.checked_sub(1)?)
        .map(|(index, matched)| (&value[..index], &value[index + matched.len()..]))
}

fn find_date_format(date: &str) -> Option<&'static str> {
    let dash: Vec<&str> = date.split('-').collect();
    if dash.len() == 3 {
        match dash[0].len() {
            4 => return Some("yyyy-M-d"),
            2 => return Some("yy-M-d"),
            _ => {}
        }
    }

    let dot: Vec<&str> = date.split('.').collect();
    if dot.len() == 3 {
        match dot[2].len() {
            4 => return Some("d.M.yyyy"),
            2 => return Some("d.M.yy"),
            _ => {}
        }
    }

    let slash: Vec<&str> = date.split('/').collect();
    if slash.len() == 3 {
        match slash[2].len() {
            2 => return Some("M/d/yy"),
            4 => return Some("M/d/yyyy"),
            _ => {}
        }
    }

    // Bitstamp style "Jan. 27, 2017,"
    let space: Vec<&str> = date.split(' ').collect();
    if space.len() == 3 {
        match space[2].len() {
            5 => return Some("MMM. d, yyyy,"),
            3 => return Some("MMM. d, yy,"),
            _ => {}
        }
    }

    None
}

fn find_time_format(time: &str) -> Option<&'static str> {
    let colon: Vec<&str> = time.split(':').collect();
    match colon.len() {
        2 => match colon[1].matches(' ').count() {
            1 => Some("h:m a"),
            0 => Some("H:m"),
            _ => None,
        },
        3 => {
            if colon[2].matches(' ').count() == 1 {
                return Some("h:m:s a");
            }
            let seconds: Vec<&str> = colon[2].split('.').collect();
            match seconds.as_slice() {
                [_] => Some("H:m:s"),
                [_, fraction] => match fraction.len() {
                    1 => Some("H:m:s.S"),
                    2 => Some("H:m:s.SS"),
                    4 => Some("H:m:s.SSSS"),
                    _ => None,
                },
                _ => None,
            }
        }
        _ => None,
    }
}

/// Translates a letter pattern into a chrono format string.
fn to_chrono_format(pattern: &str) -> Option<String> {
    let mut format = String::with_capacity(pattern.len() * 2);
    let mut chars = pattern.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                for literal in chars.by_ref() {
                    if literal == '\'' {
                        break;
                    }
                    push_literal(&mut format, literal);
                }
            }
            '.' if chars.peek() == Some(&'S') => {
                while chars.next_if_eq(&'S').is_some() {}
                format.push_str("%.f");
            }
            c if c.is_ascii_alphabetic() => {
                let mut width = 1;
                while chars.next_if_eq(&c).is_some() {
                    width += 1;
                }
                format.push_str(match (c, width) {
                    ('y', 2) => "%y",
                    ('y', _) => "%Y",
                    ('M', 1 | 2) => "%m",
                    ('M', _) => "%b",
                    ('d', _) => "%d",
                    ('H', _) => "%H",
                    ('h', _) => "%I",
                    ('m', _) => "%M",
                    ('s', _) => "%S",
                    ('a', _) => "%p",
                    _ => return None,
                });
            }
            c => push_literal(&mut format, c),
        }
    }

    Some(format)
}

fn push_literal(format: &mut String, c: char) {
    if c == '%' {
        format.push_str("%%");
    } else {
        format.push(c);
    }
}

/// Parses a value with a letter pattern as produced by [`find_format_pattern`], in UTC.
pub fn parse_with_pattern(pattern: &str, value: &str) -> Option<DateTime<Utc>> {
    let format = to_chrono_format(pattern)?;
    NaiveDateTime::parse_from_str(value, &format).ok().map(|date_time| date_time.and_utc())
}

/// Detects the format of a value and parses it.
pub(crate) fn parse_detected(value: &str) -> Result<DateTime<Utc>, DecodeError> {
    let value = value.trim();
    find_format_pattern(value)
        .and_then(|pattern| parse_with_pattern(&pattern, value))
        .ok_or_else(|| DecodeError::UnknownDateTimeFormat(value.to_owned()))
}

pub(crate) fn parse_date_time(raw: &str) -> Result<DateTime<Utc>, DecodeError> {
    parse_fixed(raw, FORMAT)
}

pub(crate) fn parse_fixed(raw: &str, format: &str) -> Result<DateTime<Utc>, DecodeError> {
    NaiveDateTime::parse_from_str(raw.trim(), format)
        .map(|date_time| date_time.and_utc())
        .map_err(|_| DecodeError::UnknownDateTimeFormat(raw.to_owned()))
}

/// Parses a value carrying its own UTC offset.
pub(crate) fn parse_with_offset(raw: &str, format: &str) -> Result<DateTime<Utc>, DecodeError> {
    DateTime::parse_from_str(raw.trim(), format)
        .map(|date_time| date_time.with_timezone(&Utc))
        .map_err(|_| DecodeError::UnknownDateTimeFormat(raw.to_owned()))
}

pub(crate) fn parse_rfc3339(raw: &str) -> Result<DateTime<Utc>, DecodeError> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|date_time| date_time.with_timezone(&Utc))
        .map_err(|_| DecodeError::UnknownDateTimeFormat(raw.to_owned()))
}

/// Date-only values are taken as midnight UTC.
pub(crate) fn parse_date(raw: &str, format: &str) -> Result<DateTime<Utc>, DecodeError> {
    NaiveDate::parse_from_str(raw.trim(), format)
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
        .map_err(|_| DecodeError::UnknownDateTimeFormat(raw.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn finds_patterns() {
        assert_eq!(find_format_pattern("2020-03-19 17:02:52").as_deref(), Some("yyyy-M-d H:m:s"));
        assert_eq!(find_format_pattern("19-03-20 17:02").as_deref(), Some("yy-M-d H:m"));
        assert_eq!(find_format_pattern("1.9.2019 14:43:18").as_deref(), Some("d.M.yyyy H:m:s"));
        assert_eq!(find_format_pattern("8/6/18 6:38:00 AM").as_deref(), Some("M/d/yy h:m:s a"));
        assert_eq!(find_format_pattern("8/6/2018 6:38 PM").as_deref(), Some("M/d/yyyy h:m a"));
        assert_eq!(find_format_pattern("Jan. 27, 2017, 03:28 PM").as_deref(), Some("MMM. d, yyyy, h:m a"));
        assert_eq!(find_format_pattern("2019-07-25T09:11:55.1234").as_deref(), Some("yyyy-M-d'T'H:m:s.SSSS"));
        assert_eq!(find_format_pattern("2019-07-25T09:11:55.12").as_deref(), Some("yyyy-M-d'T'H:m:s.SS"));
    }

    #[test]
    fn unknown_patterns() {
        assert_eq!(find_format_pattern("20200319"), None);
        assert_eq!(find_format_pattern("2020-03-19 17:02:52.123"), None);
        assert_eq!(find_format_pattern("2020_03_19 17:02:52"), None);
    }

    #[test]
    fn chrono_formats() {
        assert_eq!(to_chrono_format("yyyy-M-d'T'H:m:s.SSSS").as_deref(), Some("%Y-%m-%dT%H:%M:%S%.f"));
        assert_eq!(to_chrono_format("MMM. d, yyyy, h:m a").as_deref(), Some("%b. %d, %Y, %I:%M %p"));
        assert_eq!(to_chrono_format("d.M.yy H:m").as_deref(), Some("%d.%m.%y %H:%M"));
        assert_eq!(to_chrono_format("Q"), None);
    }

    #[test]
    fn parses_detected_values() {
        assert_eq!(
            parse_detected("1.9.2019 14:43:18").unwrap(),
            Utc.with_ymd_and_hms(2019, 9, 1, 14, 43, 18).unwrap()
        );
        assert_eq!(
            parse_detected("8/6/18 6:38:00 AM").unwrap(),
            Utc.with_ymd_and_hms(2018, 8, 6, 6, 38, 0).unwrap()
        );
        assert_eq!(
            parse_detected("Jan. 27, 2017, 03:28 PM").unwrap(),
            Utc.with_ymd_and_hms(2017, 1, 27, 15, 28, 0).unwrap()
        );
        assert_eq!(
            parse_detected("2019-07-25T09:11:55.5").unwrap(),
            Utc.with_ymd_and_hms(2019, 7, 25, 9, 11, 55).unwrap() + chrono::Duration::milliseconds(500)
        );
    }

    #[test]
    fn undetectable_value() {
        assert_eq!(
            parse_detected("yesterday"),
            Err(DecodeError::UnknownDateTimeFormat("yesterday".to_owned()))
        );
    }

    #[test]
    fn fixed_formats() {
        assert_eq!(
            parse_date_time("2019-01-02 13:14:15").unwrap(),
            Utc.with_ymd_and_hms(2019, 1, 2, 13, 14, 15).unwrap()
        );
        assert_eq!(parse_date("05-02-19", "%d-%m-%y").unwrap(), Utc.with_ymd_and_hms(2019, 2, 5, 0, 0, 0).unwrap());
        assert_eq!(
            parse_with_offset("2019-10-04 08:29:33+00:00", "%Y-%m-%d %H:%M:%S%:z").unwrap(),
            Utc.with_ymd_and_hms(2019, 10, 4, 8, 29, 33).unwrap()
        );
        assert_eq!(
            parse_rfc3339("2020-01-12T19:54:14.383Z").unwrap(),
            Utc.with_ymd_and_hms(2020, 1, 12, 19, 54, 14).unwrap() + chrono::Duration::milliseconds(383)
        );
    }
}
