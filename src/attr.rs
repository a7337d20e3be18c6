//! Attribute values and their datatypes.
//!
//! Values are a closed tagged union: one variant per supported XACML
//! datatype plus [`Bag`]. Equality is per-type *value* equality (double by
//! bit pattern with NaN equal to NaN, x500Name by canonical RDN form,
//! rfc822Name with a case-insensitive domain part), which is what the
//! `*-equal`, `*-is-in` and set functions are defined over.

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::{PolicyError, Result};

/// XML-Schema and XACML datatype identifiers for the supported types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AttrType {
    String,
    Boolean,
    Integer,
    Double,
    Date,
    Time,
    DateTime,
    DayTimeDuration,
    YearMonthDuration,
    AnyUri,
    X500Name,
    Rfc822Name,
    HexBinary,
    Base64Binary,
}

impl AttrType {
    /// All supported datatypes, in registration order.
    pub const ALL: [AttrType; 14] = [
        AttrType::String,
        AttrType::Boolean,
        AttrType::Integer,
        AttrType::Double,
        AttrType::Date,
        AttrType::Time,
        AttrType::DateTime,
        AttrType::DayTimeDuration,
        AttrType::YearMonthDuration,
        AttrType::AnyUri,
        AttrType::X500Name,
        AttrType::Rfc822Name,
        AttrType::HexBinary,
        AttrType::Base64Binary,
    ];

    /// The standard datatype URI. Must be reproduced exactly for
    /// interoperability with other XACML implementations.
    pub fn identifier(&self) -> &'static str {
        match self {
            AttrType::String => "http://www.w3.org/2001/XMLSchema#string",
            AttrType::Boolean => "http://www.w3.org/2001/XMLSchema#boolean",
            AttrType::Integer => "http://www.w3.org/2001/XMLSchema#integer",
            AttrType::Double => "http://www.w3.org/2001/XMLSchema#double",
            AttrType::Date => "http://www.w3.org/2001/XMLSchema#date",
            AttrType::Time => "http://www.w3.org/2001/XMLSchema#time",
            AttrType::DateTime => "http://www.w3.org/2001/XMLSchema#dateTime",
            AttrType::DayTimeDuration => {
                "http://www.w3.org/TR/2002/WD-xquery-operators-20020816#dayTimeDuration"
            }
            AttrType::YearMonthDuration => {
                "http://www.w3.org/TR/2002/WD-xquery-operators-20020816#yearMonthDuration"
            }
            AttrType::AnyUri => "http://www.w3.org/2001/XMLSchema#anyURI",
            AttrType::X500Name => "urn:oasis:names:tc:xacml:1.0:data-type:x500Name",
            AttrType::Rfc822Name => "urn:oasis:names:tc:xacml:1.0:data-type:rfc822Name",
            AttrType::HexBinary => "http://www.w3.org/2001/XMLSchema#hexBinary",
            AttrType::Base64Binary => "http://www.w3.org/2001/XMLSchema#base64Binary",
        }
    }

    /// The short name used inside standard function identifiers
    /// (`string-equal`, `dateTime-add-dayTimeDuration`, ...).
    pub fn function_prefix(&self) -> &'static str {
        match self {
            AttrType::String => "string",
            AttrType::Boolean => "boolean",
            AttrType::Integer => "integer",
            AttrType::Double => "double",
            AttrType::Date => "date",
            AttrType::Time => "time",
            AttrType::DateTime => "dateTime",
            AttrType::DayTimeDuration => "dayTimeDuration",
            AttrType::YearMonthDuration => "yearMonthDuration",
            AttrType::AnyUri => "anyURI",
            AttrType::X500Name => "x500Name",
            AttrType::Rfc822Name => "rfc822Name",
            AttrType::HexBinary => "hexBinary",
            AttrType::Base64Binary => "base64Binary",
        }
    }

    /// Looks up a datatype by its standard URI.
    pub fn from_identifier(id: &str) -> Result<Self> {
        AttrType::ALL
            .iter()
            .copied()
            .find(|t| t.identifier() == id)
            .ok_or_else(|| PolicyError::SyntaxError(format!("unknown datatype '{}'", id)))
    }
}

impl fmt::Display for AttrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

/// A time-of-day with an optional explicit UTC offset.
///
/// `chrono` carries nanosecond precision natively, so the sub-second
/// tie-break required for time comparison falls out of the stored value.
#[derive(Debug, Clone, Copy)]
pub struct TimeValue {
    pub time: NaiveTime,
    pub offset: Option<FixedOffset>,
}

impl TimeValue {
    pub fn new(time: NaiveTime, offset: Option<FixedOffset>) -> Self {
        Self { time, offset }
    }

    /// Nanoseconds since local midnight, before any offset adjustment.
    pub fn nanos_of_day(&self) -> i64 {
        self.time.num_seconds_from_midnight() as i64 * 1_000_000_000
            + self.time.nanosecond() as i64
    }

    /// Nanoseconds since UTC midnight. Values without an explicit offset
    /// are treated as UTC, which keeps comparison deterministic.
    pub fn instant(&self) -> i64 {
        let offset_nanos = self
            .offset
            .map(|o| o.local_minus_utc() as i64 * 1_000_000_000)
            .unwrap_or(0);
        self.nanos_of_day() - offset_nanos
    }

    pub fn compare(&self, other: &TimeValue) -> std::cmp::Ordering {
        self.instant().cmp(&other.instant())
    }

    /// Parses an XML-Schema time: `HH:MM:SS[.fff][Z|±HH:MM]`.
    pub fn parse(s: &str) -> Result<Self> {
        let (body, offset) = split_offset(s)?;
        let time = NaiveTime::parse_from_str(body, "%H:%M:%S%.f")
            .map_err(|e| PolicyError::SyntaxError(format!("invalid time '{}': {}", s, e)))?;
        Ok(Self { time, offset })
    }
}

impl fmt::Display for TimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.time.format("%H:%M:%S%.f"))?;
        fmt_offset(f, self.offset)
    }
}

impl PartialEq for TimeValue {
    fn eq(&self, other: &Self) -> bool {
        self.instant() == other.instant()
    }
}

/// Splits a trailing `Z` / `±HH:MM` offset from a lexical time or date form.
fn split_offset(s: &str) -> Result<(&str, Option<FixedOffset>)> {
    if let Some(body) = s.strip_suffix('Z') {
        return Ok((body, FixedOffset::east_opt(0)));
    }
    // An offset is exactly six chars: sign, HH, ':', MM.
    if s.len() > 6 {
        let (body, tail) = s.split_at(s.len() - 6);
        let sign = tail.as_bytes()[0];
        if (sign == b'+' || sign == b'-') && tail.as_bytes()[3] == b':' {
            let hours: i32 = tail[1..3]
                .parse()
                .map_err(|_| PolicyError::SyntaxError(format!("invalid offset in '{}'", s)))?;
            let minutes: i32 = tail[4..6]
                .parse()
                .map_err(|_| PolicyError::SyntaxError(format!("invalid offset in '{}'", s)))?;
            let mut secs = hours * 3600 + minutes * 60;
            if sign == b'-' {
                secs = -secs;
            }
            let offset = FixedOffset::east_opt(secs)
                .ok_or_else(|| PolicyError::SyntaxError(format!("invalid offset in '{}'", s)))?;
            return Ok((body, Some(offset)));
        }
    }
    Ok((s, None))
}

fn fmt_offset(f: &mut fmt::Formatter<'_>, offset: Option<FixedOffset>) -> fmt::Result {
    match offset {
        None => Ok(()),
        Some(o) if o.local_minus_utc() == 0 => f.write_str("Z"),
        Some(o) => {
            let total = o.local_minus_utc();
            let sign = if total < 0 { '-' } else { '+' };
            let total = total.abs();
            write!(f, "{}{:02}:{:02}", sign, total / 3600, (total % 3600) / 60)
        }
    }
}

/// A signed day-time duration (`-P1DT2H3M4.5S`).
#[derive(Debug, Clone, Copy, Default)]
pub struct DayTimeDuration {
    pub negative: bool,
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
    pub nanos: u32,
}

impl DayTimeDuration {
    /// Total signed length in nanoseconds.
    pub fn signed_nanos(&self) -> i128 {
        let total = (self.days as i128 * 86_400
            + self.hours as i128 * 3_600
            + self.minutes as i128 * 60
            + self.seconds as i128)
            * 1_000_000_000
            + self.nanos as i128;
        if self.negative { -total } else { total }
    }

    /// Converts to a `chrono` duration, or `None` on overflow.
    pub fn to_chrono(&self) -> Option<chrono::Duration> {
        let secs: i64 = (self.days.checked_mul(86_400)?)
            .checked_add(self.hours.checked_mul(3_600)?)?
            .checked_add(self.minutes.checked_mul(60)?)?
            .checked_add(self.seconds)?
            .try_into()
            .ok()?;
        let base = chrono::Duration::try_seconds(secs)?;
        // Sub-second nanoseconds carried explicitly so they survive the
        // conversion instead of being folded into the millisecond field.
        let d = base.checked_add(&chrono::Duration::nanoseconds(self.nanos as i64))?;
        Some(if self.negative { -d } else { d })
    }

    /// Parses the XML-Schema lexical form.
    pub fn parse(s: &str) -> Result<Self> {
        let caps = crate::lexical_regex::DAY_TIME_DURATION
            .captures(s)
            .ok_or_else(|| {
                PolicyError::SyntaxError(format!("invalid dayTimeDuration '{}'", s))
            })?;
        let num = |i: usize| -> u64 {
            caps.get(i)
                .map(|m| m.as_str().parse().unwrap_or(0))
                .unwrap_or(0)
        };
        // At least one field must be present, and a trailing T is illegal.
        let has_time_field = caps.get(3).is_some() || caps.get(4).is_some() || caps.get(5).is_some();
        if (caps.get(2).is_none() && !has_time_field) || (s.contains('T') && !has_time_field) {
            return Err(PolicyError::SyntaxError(format!(
                "invalid dayTimeDuration '{}'",
                s
            )));
        }
        let nanos = caps
            .get(6)
            .map(|m| {
                let frac = m.as_str();
                let mut padded = frac.to_string();
                while padded.len() < 9 {
                    padded.push('0');
                }
                padded[..9].parse::<u32>().unwrap_or(0)
            })
            .unwrap_or(0);
        Ok(Self {
            negative: caps.get(1).is_some(),
            days: num(2),
            hours: num(3),
            minutes: num(4),
            seconds: num(5),
            nanos,
        })
    }
}

impl fmt::Display for DayTimeDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative {
            f.write_str("-")?;
        }
        f.write_str("P")?;
        if self.days > 0 {
            write!(f, "{}D", self.days)?;
        }
        if self.hours > 0 || self.minutes > 0 || self.seconds > 0 || self.nanos > 0 {
            f.write_str("T")?;
            if self.hours > 0 {
                write!(f, "{}H", self.hours)?;
            }
            if self.minutes > 0 {
                write!(f, "{}M", self.minutes)?;
            }
            if self.seconds > 0 || self.nanos > 0 {
                if self.nanos > 0 {
                    write!(f, "{}.{:09}S", self.seconds, self.nanos)?;
                } else {
                    write!(f, "{}S", self.seconds)?;
                }
            }
        } else if self.days == 0 {
            f.write_str("T0S")?;
        }
        Ok(())
    }
}

impl PartialEq for DayTimeDuration {
    fn eq(&self, other: &Self) -> bool {
        self.signed_nanos() == other.signed_nanos()
    }
}

/// A signed year-month duration (`P1Y6M`).
#[derive(Debug, Clone, Copy, Default)]
pub struct YearMonthDuration {
    pub negative: bool,
    pub years: u64,
    pub months: u64,
}

impl YearMonthDuration {
    /// Total signed length in months.
    pub fn signed_months(&self) -> i128 {
        let total = self.years as i128 * 12 + self.months as i128;
        if self.negative { -total } else { total }
    }

    /// Parses the XML-Schema lexical form.
    pub fn parse(s: &str) -> Result<Self> {
        let caps = crate::lexical_regex::YEAR_MONTH_DURATION
            .captures(s)
            .ok_or_else(|| {
                PolicyError::SyntaxError(format!("invalid yearMonthDuration '{}'", s))
            })?;
        if caps.get(2).is_none() && caps.get(3).is_none() {
            return Err(PolicyError::SyntaxError(format!(
                "invalid yearMonthDuration '{}'",
                s
            )));
        }
        let num = |i: usize| -> u64 {
            caps.get(i)
                .map(|m| m.as_str().parse().unwrap_or(0))
                .unwrap_or(0)
        };
        Ok(Self {
            negative: caps.get(1).is_some(),
            years: num(2),
            months: num(3),
        })
    }
}

impl fmt::Display for YearMonthDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative {
            f.write_str("-")?;
        }
        f.write_str("P")?;
        if self.years > 0 {
            write!(f, "{}Y", self.years)?;
        }
        if self.months > 0 || self.years == 0 {
            write!(f, "{}M", self.months)?;
        }
        Ok(())
    }
}

impl PartialEq for YearMonthDuration {
    fn eq(&self, other: &Self) -> bool {
        self.signed_months() == other.signed_months()
    }
}

/// An X.500 distinguished name, compared in canonical form.
#[derive(Debug, Clone)]
pub struct X500Name {
    raw: String,
}

impl X500Name {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Canonical form: lowercase, whitespace around `,` and `=` removed.
    /// RDNs containing escaped commas are not given special treatment.
    pub fn canonical(&self) -> String {
        self.rdns().join(",")
    }

    /// The canonicalized RDN sequence, most-specific first.
    pub fn rdns(&self) -> Vec<String> {
        self.raw
            .split(',')
            .map(|rdn| {
                rdn.trim()
                    .splitn(2, '=')
                    .map(|part| part.trim().to_lowercase())
                    .collect::<Vec<_>>()
                    .join("=")
            })
            .collect()
    }

    /// True if `self` matches a terminal RDN sequence of `other`.
    pub fn matches_suffix_of(&self, other: &X500Name) -> bool {
        let pattern = self.rdns();
        let name = other.rdns();
        if pattern.len() > name.len() {
            return false;
        }
        name[name.len() - pattern.len()..] == pattern[..]
    }
}

impl fmt::Display for X500Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl PartialEq for X500Name {
    fn eq(&self, other: &Self) -> bool {
        self.canonical() == other.canonical()
    }
}

/// An RFC 822 mailbox name. The local part is case-sensitive, the domain
/// part is not.
#[derive(Debug, Clone)]
pub struct Rfc822Name {
    local: String,
    domain: String,
}

impl Rfc822Name {
    /// Parses `local@domain`; both parts must be non-empty.
    pub fn parse(s: &str) -> Result<Self> {
        let mut parts = s.split('@');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(local), Some(domain), None) if !local.is_empty() && !domain.is_empty() => {
                Ok(Self {
                    local: local.to_string(),
                    domain: domain.to_string(),
                })
            }
            _ => Err(PolicyError::SyntaxError(format!(
                "invalid rfc822Name '{}'",
                s
            ))),
        }
    }

    pub fn local(&self) -> &str {
        &self.local
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Normalized form with the domain lowercased.
    pub fn normalized(&self) -> String {
        format!("{}@{}", self.local, self.domain.to_lowercase())
    }
}

impl fmt::Display for Rfc822Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.local, self.domain)
    }
}

impl PartialEq for Rfc822Name {
    fn eq(&self, other: &Self) -> bool {
        self.local == other.local && self.domain.eq_ignore_ascii_case(&other.domain)
    }
}

/// An unordered multiset of same-typed attribute values.
#[derive(Debug, Clone, PartialEq)]
pub struct Bag {
    element_type: AttrType,
    values: Vec<AttributeValue>,
}

impl Bag {
    /// Creates a bag, rejecting mixed-type or nested-bag contents.
    pub fn new(element_type: AttrType, values: Vec<AttributeValue>) -> Result<Self> {
        for v in &values {
            if v.is_bag() {
                return Err(PolicyError::ValidationError(
                    "bags cannot contain bags".to_string(),
                ));
            }
            if v.attr_type() != element_type {
                return Err(PolicyError::ValidationError(format!(
                    "bag of {} cannot contain a {} value",
                    element_type.identifier(),
                    v.attr_type().identifier()
                )));
            }
        }
        Ok(Self {
            element_type,
            values,
        })
    }

    /// An empty bag of the given element type.
    pub fn empty(element_type: AttrType) -> Self {
        Self {
            element_type,
            values: Vec::new(),
        }
    }

    pub fn element_type(&self) -> AttrType {
        self.element_type
    }

    pub fn size(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[AttributeValue] {
        &self.values
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AttributeValue> {
        self.values.iter()
    }

    /// Membership by value equality, not identity.
    pub fn contains(&self, value: &AttributeValue) -> bool {
        self.values.iter().any(|v| v == value)
    }
}

/// An immutable, typed attribute value.
#[derive(Debug, Clone)]
pub enum AttributeValue {
    String(String),
    Boolean(bool),
    Integer(i64),
    Double(f64),
    Date(NaiveDate),
    Time(TimeValue),
    DateTime(DateTime<FixedOffset>),
    DayTimeDuration(DayTimeDuration),
    YearMonthDuration(YearMonthDuration),
    AnyUri(String),
    X500Name(X500Name),
    Rfc822Name(Rfc822Name),
    HexBinary(Vec<u8>),
    Base64Binary(Vec<u8>),
    Bag(Bag),
}

impl AttributeValue {
    /// The datatype of this value; for a bag, the element type.
    pub fn attr_type(&self) -> AttrType {
        match self {
            AttributeValue::String(_) => AttrType::String,
            AttributeValue::Boolean(_) => AttrType::Boolean,
            AttributeValue::Integer(_) => AttrType::Integer,
            AttributeValue::Double(_) => AttrType::Double,
            AttributeValue::Date(_) => AttrType::Date,
            AttributeValue::Time(_) => AttrType::Time,
            AttributeValue::DateTime(_) => AttrType::DateTime,
            AttributeValue::DayTimeDuration(_) => AttrType::DayTimeDuration,
            AttributeValue::YearMonthDuration(_) => AttrType::YearMonthDuration,
            AttributeValue::AnyUri(_) => AttrType::AnyUri,
            AttributeValue::X500Name(_) => AttrType::X500Name,
            AttributeValue::Rfc822Name(_) => AttrType::Rfc822Name,
            AttributeValue::HexBinary(_) => AttrType::HexBinary,
            AttributeValue::Base64Binary(_) => AttrType::Base64Binary,
            AttributeValue::Bag(b) => b.element_type(),
        }
    }

    pub fn is_bag(&self) -> bool {
        matches!(self, AttributeValue::Bag(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttributeValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttributeValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Double(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_uri(&self) -> Option<&str> {
        match self {
            AttributeValue::AnyUri(u) => Some(u),
            _ => None,
        }
    }

    pub fn as_bag(&self) -> Option<&Bag> {
        match self {
            AttributeValue::Bag(b) => Some(b),
            _ => None,
        }
    }

    /// Parses a value from its lexical form for the given datatype.
    pub fn from_lexical(ty: AttrType, s: &str) -> Result<Self> {
        match ty {
            AttrType::String => Ok(AttributeValue::String(s.to_string())),
            AttrType::Boolean => match s {
                "true" | "1" => Ok(AttributeValue::Boolean(true)),
                "false" | "0" => Ok(AttributeValue::Boolean(false)),
                _ => Err(PolicyError::SyntaxError(format!(
                    "invalid boolean '{}'",
                    s
                ))),
            },
            AttrType::Integer => s
                .parse::<i64>()
                .map(AttributeValue::Integer)
                .map_err(|e| PolicyError::SyntaxError(format!("invalid integer '{}': {}", s, e))),
            AttrType::Double => match s {
                "INF" => Ok(AttributeValue::Double(f64::INFINITY)),
                "-INF" => Ok(AttributeValue::Double(f64::NEG_INFINITY)),
                "NaN" => Ok(AttributeValue::Double(f64::NAN)),
                _ => s
                    .parse::<f64>()
                    .map(AttributeValue::Double)
                    .map_err(|e| {
                        PolicyError::SyntaxError(format!("invalid double '{}': {}", s, e))
                    }),
            },
            AttrType::Date => {
                // Any trailing offset on a date is accepted and discarded.
                let (body, _) = split_offset(s)?;
                NaiveDate::parse_from_str(body, "%Y-%m-%d")
                    .map(AttributeValue::Date)
                    .map_err(|e| {
                        PolicyError::SyntaxError(format!("invalid date '{}': {}", s, e))
                    })
            }
            AttrType::Time => TimeValue::parse(s).map(AttributeValue::Time),
            AttrType::DateTime => DateTime::parse_from_rfc3339(s)
                .map(AttributeValue::DateTime)
                .map_err(|e| {
                    PolicyError::SyntaxError(format!("invalid dateTime '{}': {}", s, e))
                }),
            AttrType::DayTimeDuration => {
                DayTimeDuration::parse(s).map(AttributeValue::DayTimeDuration)
            }
            AttrType::YearMonthDuration => {
                YearMonthDuration::parse(s).map(AttributeValue::YearMonthDuration)
            }
            AttrType::AnyUri => {
                validate_uri_reference(s)?;
                Ok(AttributeValue::AnyUri(s.to_string()))
            }
            AttrType::X500Name => Ok(AttributeValue::X500Name(X500Name::new(s))),
            AttrType::Rfc822Name => Rfc822Name::parse(s).map(AttributeValue::Rfc822Name),
            AttrType::HexBinary => hex::decode(s)
                .map(AttributeValue::HexBinary)
                .map_err(|e| {
                    PolicyError::SyntaxError(format!("invalid hexBinary '{}': {}", s, e))
                }),
            AttrType::Base64Binary => decode_base64(s)
                .map(AttributeValue::Base64Binary)
                .ok_or_else(|| {
                    PolicyError::SyntaxError(format!("invalid base64Binary '{}'", s))
                }),
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::String(s) => f.write_str(s),
            AttributeValue::Boolean(b) => write!(f, "{}", b),
            AttributeValue::Integer(i) => write!(f, "{}", i),
            AttributeValue::Double(d) => f.write_str(&fmt_double(*d)),
            AttributeValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            AttributeValue::Time(t) => write!(f, "{}", t),
            AttributeValue::DateTime(dt) => {
                write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S%.f%:z"))
            }
            AttributeValue::DayTimeDuration(d) => write!(f, "{}", d),
            AttributeValue::YearMonthDuration(d) => write!(f, "{}", d),
            AttributeValue::AnyUri(u) => f.write_str(u),
            AttributeValue::X500Name(n) => write!(f, "{}", n),
            AttributeValue::Rfc822Name(n) => write!(f, "{}", n),
            AttributeValue::HexBinary(b) => f.write_str(&hex::encode_upper(b)),
            AttributeValue::Base64Binary(b) => f.write_str(&encode_base64(b)),
            AttributeValue::Bag(b) => {
                write!(f, "[bag of {}: {} values]", b.element_type(), b.size())
            }
        }
    }
}

impl PartialEq for AttributeValue {
    fn eq(&self, other: &Self) -> bool {
        use AttributeValue::*;
        match (self, other) {
            (String(a), String(b)) => a == b,
            (Boolean(a), Boolean(b)) => a == b,
            (Integer(a), Integer(b)) => a == b,
            // Bit-pattern equality: NaN equals NaN, +0.0 differs from -0.0.
            (Double(a), Double(b)) => a.to_bits() == b.to_bits() || (a.is_nan() && b.is_nan()),
            (Date(a), Date(b)) => a == b,
            (Time(a), Time(b)) => a == b,
            (DateTime(a), DateTime(b)) => a == b,
            (DayTimeDuration(a), DayTimeDuration(b)) => a == b,
            (YearMonthDuration(a), YearMonthDuration(b)) => a == b,
            (AnyUri(a), AnyUri(b)) => a == b,
            (X500Name(a), X500Name(b)) => a == b,
            (Rfc822Name(a), Rfc822Name(b)) => a == b,
            (HexBinary(a), HexBinary(b)) => a == b,
            (Base64Binary(a), Base64Binary(b)) => a == b,
            (Bag(a), Bag(b)) => a == b,
            _ => false,
        }
    }
}

/// Double lexical form: XML-Schema spells the specials `INF`/`-INF`/`NaN`,
/// and the sign of zero is preserved.
pub(crate) fn fmt_double(d: f64) -> String {
    if d.is_nan() {
        "NaN".to_string()
    } else if d == f64::INFINITY {
        "INF".to_string()
    } else if d == f64::NEG_INFINITY {
        "-INF".to_string()
    } else {
        format!("{}", d)
    }
}

/// Character-level URI reference check, equivalent to what the original
/// implementation got from its URI constructor: every character must be an
/// RFC 3986 unreserved, reserved, or percent-escape character.
pub(crate) fn validate_uri_reference(s: &str) -> Result<()> {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        let ok = c.is_ascii_alphanumeric()
            || matches!(
                c,
                b'-' | b'.' | b'_' | b'~' | b':' | b'/' | b'?' | b'#' | b'[' | b']' | b'@'
                    | b'!' | b'$' | b'&' | b'\'' | b'(' | b')' | b'*' | b'+' | b',' | b';'
                    | b'='
            );
        if c == b'%' {
            if i + 2 >= bytes.len()
                || !bytes[i + 1].is_ascii_hexdigit()
                || !bytes[i + 2].is_ascii_hexdigit()
            {
                return Err(PolicyError::SyntaxError(format!(
                    "invalid percent escape in URI '{}'",
                    s
                )));
            }
            i += 3;
            continue;
        }
        if !ok {
            return Err(PolicyError::SyntaxError(format!(
                "invalid character '{}' in URI '{}'",
                c as char, s
            )));
        }
        i += 1;
    }
    Ok(())
}

const BASE64_ALPHABET: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

fn decode_base64(s: &str) -> Option<Vec<u8>> {
    let stripped: Vec<u8> = s
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    if stripped.len() % 4 != 0 {
        return None;
    }
    let mut out = Vec::with_capacity(stripped.len() / 4 * 3);
    for chunk in stripped.chunks(4) {
        let mut vals = [0u8; 4];
        let mut pad = 0;
        for (i, &c) in chunk.iter().enumerate() {
            if c == b'=' {
                // Padding is only legal in the last two positions.
                if i < 2 {
                    return None;
                }
                pad += 1;
                continue;
            }
            if pad > 0 {
                return None;
            }
            vals[i] = BASE64_ALPHABET.iter().position(|&a| a == c)? as u8;
        }
        out.push((vals[0] << 2) | (vals[1] >> 4));
        if pad < 2 {
            out.push((vals[1] << 4) | (vals[2] >> 2));
        }
        if pad < 1 {
            out.push((vals[2] << 6) | vals[3]);
        }
    }
    Some(out)
}

fn encode_base64(bytes: &[u8]) -> String {
    let mut out = String::with_capacity((bytes.len() + 2) / 3 * 4);
    for chunk in bytes.chunks(3) {
        let b0 = chunk[0] as u32;
        let b1 = chunk.get(1).copied().unwrap_or(0) as u32;
        let b2 = chunk.get(2).copied().unwrap_or(0) as u32;
        let triple = (b0 << 16) | (b1 << 8) | b2;
        out.push(BASE64_ALPHABET[(triple >> 18) as usize & 63] as char);
        out.push(BASE64_ALPHABET[(triple >> 12) as usize & 63] as char);
        out.push(if chunk.len() > 1 {
            BASE64_ALPHABET[(triple >> 6) as usize & 63] as char
        } else {
            '='
        });
        out.push(if chunk.len() > 2 {
            BASE64_ALPHABET[triple as usize & 63] as char
        } else {
            '='
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_type_identifier_round_trip() {
        for ty in AttrType::ALL {
            assert_eq!(AttrType::from_identifier(ty.identifier()).unwrap(), ty);
        }
    }

    #[test]
    fn test_double_equality_semantics() {
        let nan = AttributeValue::Double(f64::NAN);
        assert_eq!(nan, AttributeValue::Double(f64::NAN));
        assert_ne!(
            AttributeValue::Double(0.0),
            AttributeValue::Double(-0.0)
        );
        assert_eq!(AttributeValue::Double(1.5), AttributeValue::Double(1.5));
    }

    #[test]
    fn test_time_parse_and_compare() {
        let utc = TimeValue::parse("09:30:00Z").unwrap();
        let plus_one = TimeValue::parse("10:30:00+01:00").unwrap();
        assert_eq!(utc, plus_one);

        let later = TimeValue::parse("09:30:00.5Z").unwrap();
        assert_eq!(later.compare(&utc), std::cmp::Ordering::Greater);
    }

    #[test]
    fn test_time_display_round_trip() {
        for s in ["09:30:00", "09:30:00Z", "09:30:00.500+05:30"] {
            let t = TimeValue::parse(s).unwrap();
            let back = TimeValue::parse(&t.to_string()).unwrap();
            assert_eq!(t, back);
        }
    }

    #[test]
    fn test_day_time_duration_parse() {
        let d = DayTimeDuration::parse("P1DT2H3M4.5S").unwrap();
        assert!(!d.negative);
        assert_eq!(d.days, 1);
        assert_eq!(d.hours, 2);
        assert_eq!(d.minutes, 3);
        assert_eq!(d.seconds, 4);
        assert_eq!(d.nanos, 500_000_000);

        let n = DayTimeDuration::parse("-PT30S").unwrap();
        assert!(n.negative);
        assert_eq!(n.seconds, 30);

        assert!(DayTimeDuration::parse("P").is_err());
        assert!(DayTimeDuration::parse("1D").is_err());
    }

    #[test]
    fn test_year_month_duration_parse() {
        let d = YearMonthDuration::parse("P1Y6M").unwrap();
        assert_eq!(d.signed_months(), 18);
        let n = YearMonthDuration::parse("-P2M").unwrap();
        assert_eq!(n.signed_months(), -2);
        assert!(YearMonthDuration::parse("P1D").is_err());
    }

    #[test]
    fn test_x500_canonical_equality() {
        let a = X500Name::new("CN = Alice, O=Example , C=US");
        let b = X500Name::new("cn=alice,o=example,c=us");
        assert_eq!(a, b);
    }

    #[test]
    fn test_x500_suffix_match() {
        let suffix = X500Name::new("O=Example,C=US");
        let name = X500Name::new("CN=Alice,O=Example,C=US");
        assert!(suffix.matches_suffix_of(&name));
        assert!(!name.matches_suffix_of(&suffix));
    }

    #[test]
    fn test_rfc822_equality() {
        let a = Rfc822Name::parse("Alice@Example.COM").unwrap();
        let b = Rfc822Name::parse("Alice@example.com").unwrap();
        let c = Rfc822Name::parse("alice@example.com").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(Rfc822Name::parse("no-at-sign").is_err());
        assert!(Rfc822Name::parse("a@b@c").is_err());
    }

    #[test]
    fn test_bag_rejects_mixed_types() {
        let err = Bag::new(
            AttrType::String,
            vec![
                AttributeValue::String("a".to_string()),
                AttributeValue::Integer(1),
            ],
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_bag_contains_by_value() {
        let bag = Bag::new(
            AttrType::String,
            vec![
                AttributeValue::String("a".to_string()),
                AttributeValue::String("b".to_string()),
            ],
        )
        .unwrap();
        assert!(bag.contains(&AttributeValue::String("b".to_string())));
        assert!(!bag.contains(&AttributeValue::String("c".to_string())));
    }

    #[test]
    fn test_hex_and_base64_lexical() {
        let hex = AttributeValue::from_lexical(AttrType::HexBinary, "0afb").unwrap();
        assert_eq!(hex, AttributeValue::HexBinary(vec![0x0a, 0xfb]));

        let b64 = AttributeValue::from_lexical(AttrType::Base64Binary, "aGVsbG8=").unwrap();
        assert_eq!(b64, AttributeValue::Base64Binary(b"hello".to_vec()));
        assert_eq!(b64.to_string(), "aGVsbG8=");

        assert!(AttributeValue::from_lexical(AttrType::Base64Binary, "a===").is_err());
    }

    #[test]
    fn test_double_lexical_specials() {
        assert_eq!(
            AttributeValue::from_lexical(AttrType::Double, "INF").unwrap(),
            AttributeValue::Double(f64::INFINITY)
        );
        assert_eq!(fmt_double(f64::NEG_INFINITY), "-INF");
        assert_eq!(fmt_double(-0.0), "-0");
    }

    #[test]
    fn test_uri_validation() {
        assert!(validate_uri_reference("http://example.com/a?b=c#d").is_ok());
        assert!(validate_uri_reference("relative/path").is_ok());
        assert!(validate_uri_reference("has space").is_err());
        assert!(validate_uri_reference("bad%2").is_err());
    }
}
