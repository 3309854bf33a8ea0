//! XMP date/time values
//!
//! XMP stores dates as ISO 8601 text with optional parts: a year alone, a
//! year and month, a full date, date plus time, fractional seconds, and a
//! timezone. [`XmpDateTime`] models the value with presence flags so partial
//! dates survive a parse/format round trip.

use crate::core::error::{XmpError, XmpResult};

/// An ISO 8601 date/time with optional date, time, and timezone parts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmpDateTime {
    /// Year; may be negative for BCE dates.
    pub year: i32,
    /// Month 1-12; 0 when not set.
    pub month: u8,
    /// Day 1-31; 0 when not set.
    pub day: u8,
    /// Hour 0-23.
    pub hour: u8,
    /// Minute 0-59.
    pub minute: u8,
    /// Second 0-59.
    pub second: u8,
    /// Nanoseconds 0-999999999.
    pub nanosecond: u32,
    /// A date part is present.
    pub has_date: bool,
    /// A time part is present.
    pub has_time: bool,
    /// A timezone is present.
    pub has_timezone: bool,
    /// Timezone direction: -1 west, 0 UTC, +1 east.
    pub tz_sign: i8,
    /// Timezone hour offset 0-23.
    pub tz_hour: u8,
    /// Timezone minute offset 0-59.
    pub tz_minute: u8,
}

impl XmpDateTime {
    /// Create an empty value with no parts set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an XMP date/time string.
    ///
    /// Accepted forms, from shortest to longest:
    /// `YYYY`, `YYYY-MM`, `YYYY-MM-DD`, `...Thh:mm`, `...Thh:mm:ss`,
    /// `...Thh:mm:ss.f+`, each optionally followed by `Z` or `±hh:mm`.
    /// Time-only values (`hh:mm:ss...`) are accepted for GPS timestamps.
    ///
    /// Out-of-range months, days, and time fields are clamped into range,
    /// matching how the classic toolkit tolerates sloppy writers.
    pub fn parse(text: &str) -> XmpResult<Self> {
        if text.is_empty() {
            return Err(XmpError::BadValue("empty date string".to_string()));
        }

        let mut scanner = DateScanner::new(text);
        let mut value = Self::new();

        // A leading 'T' or an early colon means the date part is absent.
        let time_only = text.starts_with('T')
            || text.as_bytes().get(1) == Some(&b':')
            || text.as_bytes().get(2) == Some(&b':');

        if !time_only {
            value.has_date = true;
            value.year = scanner.signed_number("year")?;
            if scanner.at_end() {
                return Ok(value);
            }
            scanner.expect('-')?;
            value.month = scanner.number("month")?.clamp(1, 12) as u8;
            if scanner.at_end() {
                return Ok(value);
            }
            scanner.expect('-')?;
            value.day = scanner.number("day")?.clamp(1, 31) as u8;
            if scanner.at_end() {
                return Ok(value);
            }
            scanner.expect('T')?;
        } else {
            scanner.skip('T');
        }

        value.has_time = true;
        value.hour = scanner.number("hour")?.min(23) as u8;
        scanner.expect(':')?;
        value.minute = scanner.number("minute")?.min(59) as u8;

        if scanner.skip(':') {
            value.second = scanner.number("second")?.min(59) as u8;
            if scanner.skip('.') {
                value.nanosecond = scanner.fraction_as_nanoseconds()?;
            }
        }
        if scanner.at_end() {
            return Ok(value);
        }

        value.has_timezone = true;
        match scanner.next_char() {
            Some('Z') => value.tz_sign = 0,
            Some(sign @ ('+' | '-')) => {
                value.tz_sign = if sign == '+' { 1 } else { -1 };
                value.tz_hour = scanner.number("timezone hour")? as u8;
                scanner.expect(':')?;
                value.tz_minute = scanner.number("timezone minute")? as u8;
                if value.tz_hour > 23 || value.tz_minute > 59 {
                    return Err(XmpError::BadValue(
                        "timezone offset out of range".to_string(),
                    ));
                }
            }
            _ => {
                return Err(XmpError::BadValue(
                    "expected 'Z' or a timezone offset".to_string(),
                ))
            }
        }

        if !scanner.at_end() {
            return Err(XmpError::BadValue(
                "trailing characters after date".to_string(),
            ));
        }
        Ok(value)
    }

    /// Format as an XMP date/time string, emitting only the present parts.
    pub fn format(&self) -> String {
        let mut out = String::new();

        if self.has_date {
            if self.month == 0 {
                out.push_str(&format!("{:04}", self.year));
            } else if self.day == 0 {
                out.push_str(&format!("{:04}-{:02}", self.year, self.month));
            } else {
                out.push_str(&format!(
                    "{:04}-{:02}-{:02}",
                    self.year, self.month, self.day
                ));
            }
        }

        if self.has_time {
            if self.has_date {
                out.push('T');
            }
            out.push_str(&format!(
                "{:02}:{:02}:{:02}",
                self.hour, self.minute, self.second
            ));
            if self.nanosecond != 0 {
                let mut frac = format!("{:09}", self.nanosecond);
                while frac.ends_with('0') {
                    frac.pop();
                }
                out.push('.');
                out.push_str(&frac);
            }
        }

        if self.has_timezone {
            if self.tz_sign == 0 {
                out.push('Z');
            } else {
                out.push(if self.tz_sign < 0 { '-' } else { '+' });
                out.push_str(&format!("{:02}:{:02}", self.tz_hour, self.tz_minute));
            }
        }
        out
    }

    /// Check that every present part is within range.
    pub fn validate(&self) -> XmpResult<()> {
        if self.has_date {
            if self.month > 12 {
                return Err(XmpError::BadValue("month out of range".to_string()));
            }
            if self.day > 31 {
                return Err(XmpError::BadValue("day out of range".to_string()));
            }
        }
        if self.has_time {
            if self.hour > 23 || self.minute > 59 || self.second > 59 {
                return Err(XmpError::BadValue("time out of range".to_string()));
            }
            if self.nanosecond >= 1_000_000_000 {
                return Err(XmpError::BadValue("nanoseconds out of range".to_string()));
            }
        }
        if self.has_timezone {
            if self.tz_hour > 23 || self.tz_minute > 59 {
                return Err(XmpError::BadValue(
                    "timezone offset out of range".to_string(),
                ));
            }
            if self.tz_sign == 0 && (self.tz_hour != 0 || self.tz_minute != 0) {
                return Err(XmpError::BadValue(
                    "a UTC timezone cannot carry an offset".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Character scanner over a date string.
struct DateScanner<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
}

impl<'a> DateScanner<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            chars: text.chars().peekable(),
        }
    }

    fn at_end(&mut self) -> bool {
        self.chars.peek().is_none()
    }

    fn next_char(&mut self) -> Option<char> {
        self.chars.next()
    }

    fn expect(&mut self, expected: char) -> XmpResult<()> {
        match self.chars.next() {
            Some(c) if c == expected => Ok(()),
            Some(c) => Err(XmpError::BadValue(format!(
                "expected '{}' in date string, found '{}'",
                expected, c
            ))),
            None => Err(XmpError::BadValue(format!(
                "date string ended where '{}' was expected",
                expected
            ))),
        }
    }

    /// Consume `c` if it is next; report whether it was there.
    fn skip(&mut self, c: char) -> bool {
        if self.chars.peek() == Some(&c) {
            self.chars.next();
            true
        } else {
            false
        }
    }

    fn digits(&mut self) -> String {
        let mut digits = String::new();
        while let Some(&c) = self.chars.peek() {
            if !c.is_ascii_digit() {
                break;
            }
            digits.push(c);
            self.chars.next();
        }
        digits
    }

    fn number(&mut self, what: &str) -> XmpResult<u32> {
        let digits = self.digits();
        digits
            .parse()
            .map_err(|_| XmpError::BadValue(format!("bad {} in date string", what)))
    }

    fn signed_number(&mut self, what: &str) -> XmpResult<i32> {
        let negative = self.skip('-');
        let magnitude = self.number(what)? as i32;
        Ok(if negative { -magnitude } else { magnitude })
    }

    /// Read fraction digits and scale them to nanoseconds.
    fn fraction_as_nanoseconds(&mut self) -> XmpResult<u32> {
        let digits = self.digits();
        if digits.is_empty() {
            return Err(XmpError::BadValue(
                "empty fractional seconds in date string".to_string(),
            ));
        }
        let mut nanos: u64 = 0;
        for (i, c) in digits.chars().enumerate() {
            if i >= 9 {
                break;
            }
            nanos = nanos * 10 + c.to_digit(10).expect("digit checked") as u64;
        }
        for _ in digits.len()..9 {
            nanos *= 10;
        }
        Ok(nanos as u32)
    }
}
