use serde::{
    de::{self, Visitor},
    Deserialize, Deserializer, Serialize, Serializer,
};
use std::{
    fmt,
    time::{SystemTime, UNIX_EPOCH},
};

/// Seconds since the Unix epoch, kept in the form it was written in.
///
/// Hashes cover the JSON text of a number, and `1500000000` and
/// `1500000000.0` encode differently, so an integral timestamp must stay an
/// integer and a fractional one must stay a float through every round trip.
/// Equality is on that exact form.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Timestamp {
    Whole(u64),
    Fractional(f64),
}

impl Timestamp {
    /// Current wall-clock time with sub-second precision.
    pub fn now() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or_default();
        Timestamp::Fractional(secs)
    }

    pub fn as_f64(self) -> f64 {
        match self {
            Timestamp::Whole(secs) => secs as f64,
            Timestamp::Fractional(secs) => secs,
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timestamp::Whole(secs) => write!(f, "{secs}"),
            Timestamp::Fractional(secs) => write!(f, "{secs:?}"),
        }
    }
}

/// Tagged form for binary formats, which cannot tell the variants apart from
/// the value alone.
#[derive(Serialize, Deserialize)]
enum Tagged {
    Whole(u64),
    Fractional(f64),
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match (*self, serializer.is_human_readable()) {
            (Timestamp::Whole(secs), true) => serializer.serialize_u64(secs),
            (Timestamp::Fractional(secs), true) => serializer.serialize_f64(secs),
            (Timestamp::Whole(secs), false) => Tagged::Whole(secs).serialize(serializer),
            (Timestamp::Fractional(secs), false) => Tagged::Fractional(secs).serialize(serializer),
        }
    }
}

struct NumberVisitor;

impl Visitor<'_> for NumberVisitor {
    type Value = Timestamp;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a non-negative number of seconds")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Timestamp, E> {
        Ok(Timestamp::Whole(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Timestamp, E> {
        u64::try_from(v)
            .map(Timestamp::Whole)
            .map_err(|_| E::invalid_value(de::Unexpected::Signed(v), &self))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Timestamp, E> {
        if v.is_finite() {
            Ok(Timestamp::Fractional(v))
        } else {
            Err(E::invalid_value(de::Unexpected::Float(v), &self))
        }
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            deserializer.deserialize_any(NumberVisitor)
        } else {
            Ok(match Tagged::deserialize(deserializer)? {
                Tagged::Whole(secs) => Timestamp::Whole(secs),
                Tagged::Fractional(secs) => Timestamp::Fractional(secs),
            })
        }
    }
}
