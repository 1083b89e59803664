//! Serde helpers for [`Duration`] fields, written as float seconds and read
//! from either a float or a human duration string like `"250ms"`.

use super::{parse_duration, Duration};
use serde::{de, Deserialize, Deserializer, Serializer};

pub fn serialize<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(d.as_secs_f64())
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Float(f64),
        Str(String),
    }
    match Raw::deserialize(deserializer)? {
        Raw::Float(secs) if secs.is_finite() && secs >= 0.0 => Ok(Duration::from_secs_f64(secs)),
        Raw::Float(secs) => Err(de::Error::custom(format!("invalid duration {secs}"))),
        Raw::Str(s) => {
            parse_duration(&s).ok_or_else(|| de::Error::custom(format!("invalid duration '{s}'")))
        }
    }
}
