use crate::error::EncodeError;

use iso8601::{Date, DateTime, Time};

use std::borrow::Cow;

/// How the encoder treats an `&` that already starts an XML entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum EntityPolicy {
    /// Escape every `&`. Escaping and unescaping are exact inverses.
    #[default]
    Escape,
    /// Leave `&` alone when it begins one of the predefined XML entities (`&amp;`, `&lt;`,
    /// `&gt;`, `&quot;`, `&apos;`) or a numeric character reference (`&#64;`, `&#x40;`).
    ///
    /// Useful for text that was already escaped once by some other layer. Other named entities
    /// (like `&nbsp;`) are still escaped, since the result has to stay well-formed XML.
    Preserve,
}

/// Escape a string for use as XML characters.
///
/// Escapes `&`, `<`, `>`, `"` and carriage returns. The result is fine inside element text, which is all
/// XML-RPC uses.
pub fn escape_xml(s: &str, policy: EntityPolicy) -> Cow<str> {
    if !s.contains(|c: char| matches!(c, '&' | '<' | '>' | '"' | '\r')) {
        return Cow::Borrowed(s);
    }

    let mut escaped = String::with_capacity(s.len() + 16);
    for (i, c) in s.char_indices() {
        match c {
            '&' if policy == EntityPolicy::Preserve && starts_with_entity(&s[i..]) => {
                escaped.push('&')
            }
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            // a literal CR would be turned into LF by the reader
            '\r' => escaped.push_str("&#13;"),
            c => escaped.push(c),
        }
    }

    Cow::Owned(escaped)
}

/// Whether `s` (which starts with `&`) begins with an entity the XML parser will resolve.
fn starts_with_entity(s: &str) -> bool {
    let end = match s.find(';') {
        Some(end) => end,
        None => return false,
    };
    let body = &s[1..end];

    if let Some(hex) = body.strip_prefix("#x").or_else(|| body.strip_prefix("#X")) {
        !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit())
    } else if let Some(dec) = body.strip_prefix('#') {
        !dec.is_empty() && dec.chars().all(|c| c.is_ascii_digit())
    } else {
        matches!(body, "amp" | "lt" | "gt" | "quot" | "apos")
    }
}

/// Whether XML 1.0 allows `c` in a document, either literally or as a character reference.
fn is_xml_char(c: char) -> bool {
    match c {
        '\t' | '\n' | '\r' => true,
        '\u{0}'..='\u{1f}' | '\u{fffe}' | '\u{ffff}' => false,
        _ => true,
    }
}

/// Rejects text containing characters that can't appear in an XML document at all.
pub fn check_xml_text(s: &str) -> Result<(), EncodeError> {
    match s.chars().find(|&c| !is_xml_char(c)) {
        Some(c) => Err(EncodeError::UnsupportedType(format!(
            "character U+{:04X} (not allowed in XML)",
            u32::from(c)
        ))),
        None => Ok(()),
    }
}

/// Checks a method name against the XML-RPC grammar: non-empty, made of ASCII letters,
/// digits, `.`, `_`, `:` and `/`.
pub fn is_valid_method_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | ':' | '/'))
}

/// A point in time in UTC, broken down into calendar fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UtcDateTime {
    pub year: i64,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

impl UtcDateTime {
    /// Converts any ISO 8601 date/time into UTC with second precision.
    ///
    /// Week and ordinal dates become year-month-day dates, timezone offsets are folded into the
    /// time, and milliseconds are dropped.
    pub fn from_iso8601(date_time: &DateTime) -> Self {
        let Time {
            hour, minute, second, tz_offset_hours, tz_offset_minutes, ..
        } = date_time.time;

        let days = match date_time.date {
            Date::YMD { year, month, day } => {
                days_from_civil(i64::from(year), i64::from(month), i64::from(day))
            }
            Date::Ordinal { year, ddd } => {
                days_from_civil(i64::from(year), 1, 1) + i64::from(ddd) - 1
            }
            Date::Week { year, ww, d } => {
                // week 1 is the one containing January 4th
                let jan4 = days_from_civil(i64::from(year), 1, 4);
                let week1_monday = jan4 - weekday_from_monday(jan4);
                week1_monday + (i64::from(ww) - 1) * 7 + i64::from(d) - 1
            }
        };

        let sign = if tz_offset_hours < 0 || tz_offset_minutes < 0 { -1 } else { 1 };
        let offset_minutes = sign * (i64::from(tz_offset_hours.abs()) * 60 + i64::from(tz_offset_minutes.abs()));

        let seconds = days * 86_400
            + i64::from(hour) * 3600
            + i64::from(minute) * 60
            + i64::from(second)
            - offset_minutes * 60;

        let (year, month, day) = civil_from_days(seconds.div_euclid(86_400));
        let time_of_day = seconds.rem_euclid(86_400);

        UtcDateTime {
            year,
            month,
            day,
            hour: (time_of_day / 3600) as u32,
            minute: (time_of_day % 3600 / 60) as u32,
            second: (time_of_day % 60) as u32,
        }
    }

    pub fn to_iso8601(self) -> DateTime {
        DateTime {
            date: Date::YMD { year: self.year as i32, month: self.month, day: self.day },
            time: Time {
                hour: self.hour,
                minute: self.minute,
                second: self.second,
                millisecond: 0,
                tz_offset_hours: 0,
                tz_offset_minutes: 0,
            },
        }
    }
}

/// Converts any ISO 8601 date/time into a UTC calendar date/time with second precision.
pub fn normalize_datetime(date_time: &DateTime) -> DateTime {
    UtcDateTime::from_iso8601(date_time).to_iso8601()
}

/// Formats a date/time as `YYYY-MM-DDTHH:MM:SSZ`, converting it to UTC first.
///
/// # Errors
///
/// Fails with `EncodeError::UnsupportedType` if the year in UTC is not in `0..=9999`, since it
/// would not fit the four-digit year field.
pub fn format_datetime(date_time: &DateTime) -> Result<String, EncodeError> {
    let UtcDateTime { year, month, day, hour, minute, second } = UtcDateTime::from_iso8601(date_time);

    if !(0..=9999).contains(&year) {
        return Err(EncodeError::UnsupportedType(format!(
            "timestamp in year {} (outside 0000-9999)",
            year
        )));
    }

    Ok(format!("{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z", year, month, day, hour, minute, second))
}

/// Days since 1970-01-01 in the proleptic Gregorian calendar.
fn days_from_civil(year: i64, month: i64, day: i64) -> i64 {
    let year = if month <= 2 { year - 1 } else { year };
    let era = year.div_euclid(400);
    let yoe = year - era * 400;
    let mp = (month + 9) % 12;
    let doy = (153 * mp + 2) / 5 + day - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + if month <= 2 { 1 } else { 0 };
    (year, month as u32, day as u32)
}

/// 0 for Monday through 6 for Sunday. 1970-01-01 was a Thursday.
fn weekday_from_monday(days: i64) -> i64 {
    (days + 3).rem_euclid(7)
}

#[cfg(test)]
mod tests {
    use super::*;
    use iso8601;

    #[test]
    fn formats_datetimes() {
        let date_time = iso8601::datetime("2016-05-02T06:01:05-0830").unwrap();

        let formatted = format_datetime(&date_time).unwrap();
        assert_eq!(formatted, "2016-05-02T14:31:05Z");
        assert_eq!(
            normalize_datetime(&iso8601::datetime(&formatted).unwrap()),
            normalize_datetime(&date_time)
        );
    }

    #[test]
    fn offsets_roll_over_dates() {
        let date_time = iso8601::datetime("2016-12-31T23:30:00-01:00").unwrap();
        assert_eq!(format_datetime(&date_time).unwrap(), "2017-01-01T00:30:00Z");

        let date_time = iso8601::datetime("2016-03-01T00:15:00+02:00").unwrap();
        assert_eq!(format_datetime(&date_time).unwrap(), "2016-02-29T22:15:00Z");
    }

    #[test]
    fn drops_milliseconds() {
        let date_time = iso8601::datetime("2015-02-18T23:16:09.750Z").unwrap();
        assert_eq!(format_datetime(&date_time).unwrap(), "2015-02-18T23:16:09Z");
        assert_eq!(normalize_datetime(&date_time).time.millisecond, 0);
    }

    #[test]
    fn normalizes_week_and_ordinal_dates() {
        let midnight = Time {
            hour: 0,
            minute: 0,
            second: 0,
            millisecond: 0,
            tz_offset_hours: 0,
            tz_offset_minutes: 0,
        };

        let ordinal = DateTime { date: Date::Ordinal { year: 2016, ddd: 123 }, time: midnight };
        assert_eq!(format_datetime(&ordinal).unwrap(), "2016-05-02T00:00:00Z");

        let week = DateTime { date: Date::Week { year: 2016, ww: 17, d: 1 }, time: midnight };
        assert_eq!(format_datetime(&week).unwrap(), "2016-04-25T00:00:00Z");
    }

    #[test]
    fn years_must_fit_four_digits() {
        let last = iso8601::datetime("9999-12-31T23:30:00+01:00").unwrap();
        assert_eq!(format_datetime(&last).unwrap(), "9999-12-31T22:30:00Z");

        let rolled_over = iso8601::datetime("9999-12-31T23:30:00-01:00").unwrap();
        assert_eq!(UtcDateTime::from_iso8601(&rolled_over).year, 10_000);
        match format_datetime(&rolled_over) {
            Err(EncodeError::UnsupportedType(ref what)) => assert!(what.contains("10000"), "{}", what),
            other => panic!("expected UnsupportedType, got {:?}", other),
        }

        let before_year_zero = DateTime {
            date: Date::YMD { year: 0, month: 1, day: 1 },
            time: Time {
                hour: 0,
                minute: 30,
                second: 0,
                millisecond: 0,
                tz_offset_hours: 1,
                tz_offset_minutes: 0,
            },
        };
        assert_eq!(UtcDateTime::from_iso8601(&before_year_zero).year, -1);
        assert!(format_datetime(&before_year_zero).is_err());
    }

    #[test]
    fn rejects_characters_outside_xml() {
        assert!(check_xml_text("tab\tnewline\ncr\r中文\u{e000}\u{10000}").is_ok());

        for bad in &["a\u{1}b", "\u{0}", "\u{b}", "\u{c}", "x\u{1f}", "\u{fffe}", "\u{ffff}"] {
            match check_xml_text(bad) {
                Err(EncodeError::UnsupportedType(_)) => {}
                other => panic!("expected UnsupportedType for {:?}, got {:?}", bad, other),
            }
        }
    }

    #[test]
    fn escapes_carriage_returns() {
        assert_eq!(escape_xml("a\r\nb", EntityPolicy::Escape), "a&#13;\nb");
    }

    #[test]
    fn civil_day_numbers() {
        assert_eq!(days_from_civil(1970, 1, 1), 0);
        assert_eq!(days_from_civil(2000, 3, 1), 11_017);
        assert_eq!(civil_from_days(11_017), (2000, 3, 1));
        assert_eq!(civil_from_days(-1), (1969, 12, 31));
    }

    #[test]
    fn escapes_special_characters() {
        assert_eq!(escape_xml("plain", EntityPolicy::Escape), "plain");
        assert_eq!(
            escape_xml(r#"He said "hi" <b>&amp;</b>"#, EntityPolicy::Escape),
            "He said &quot;hi&quot; &lt;b&gt;&amp;amp;&lt;/b&gt;"
        );
    }

    #[test]
    fn preserves_existing_entities() {
        assert_eq!(
            escape_xml("a &amp; b &#64; c &#x40; d & e &nbsp; f &", EntityPolicy::Preserve),
            "a &amp; b &#64; c &#x40; d &amp; e &amp;nbsp; f &amp;"
        );
        assert_eq!(escape_xml("&#;&#x;", EntityPolicy::Preserve), "&amp;#;&amp;#x;");
    }

    #[test]
    fn method_name_grammar() {
        assert!(is_valid_method_name("metaWeblog.getRecentPosts"));
        assert!(is_valid_method_name("system/ns:call_2"));
        assert!(!is_valid_method_name(""));
        assert!(!is_valid_method_name("doesn't exist"));
        assert!(!is_valid_method_name("x<&x"));
        assert!(!is_valid_method_name("blogger.getUsersBlogs()"));
    }
}
