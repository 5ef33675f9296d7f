//! Parameter converter: string → typed parameter (§4.C1).
//!
//! Dispatch is by static type token (a marker struct per target type,
//! mirroring the source's class-token dispatch) rather than by runtime
//! type name, so registration is a normal trait impl and lookup is a
//! normal method call — no reflection needed in idiomatic Rust.

use crate::error::{Error, ErrorKind, Result};
use std::any::type_name;
use std::net::IpAddr;
use std::path::PathBuf;
use std::str::FromStr;

/// Implemented for every type the built-in converter understands, plus
/// any type an application registers its own conversion for.
pub trait FromParam: Sized {
    fn from_param(raw: &str) -> Result<Self>;
}

macro_rules! from_str_param {
    ($($t:ty),+ $(,)?) => {
        $(
            impl FromParam for $t {
                fn from_param(raw: &str) -> Result<Self> {
                    <$t as FromStr>::from_str(raw).map_err(|_| unsupported::<$t>(raw))
                }
            }
        )+
    };
}

from_str_param!(
    u8, i8, u16, i16, u32, i32, u64, i64, f32, f64, bool, char, IpAddr
);

impl FromParam for String {
    fn from_param(raw: &str) -> Result<Self> {
        Ok(raw.to_string())
    }
}

impl FromParam for PathBuf {
    fn from_param(raw: &str) -> Result<Self> {
        Ok(PathBuf::from(raw))
    }
}

impl FromParam for http::Uri {
    fn from_param(raw: &str) -> Result<Self> {
        raw.parse().map_err(|_| unsupported::<http::Uri>(raw))
    }
}

impl FromParam for chrono::NaiveDate {
    fn from_param(raw: &str) -> Result<Self> {
        chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|_| unsupported::<chrono::NaiveDate>(raw))
    }
}

impl FromParam for chrono::NaiveDateTime {
    fn from_param(raw: &str) -> Result<Self> {
        chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
            .map_err(|_| unsupported::<chrono::NaiveDateTime>(raw))
    }
}

impl FromParam for chrono::DateTime<chrono::Utc> {
    fn from_param(raw: &str) -> Result<Self> {
        chrono::DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&chrono::Utc))
            .map_err(|_| unsupported::<chrono::DateTime<chrono::Utc>>(raw))
    }
}

fn unsupported<T>(raw: &str) -> Error {
    Error::new(
        ErrorKind::UnsupportedType,
        format!("cannot convert {raw:?} to {}", type_name::<T>()),
    )
}

/// Converts `raw` to `T`. Fails with `UNSUPPORTED_TYPE` when the string
/// doesn't parse as `T` (the converter dispatch itself is resolved at
/// compile time by `T`, so there's no notion of a target type `T` that's
/// entirely unknown the way a runtime-reflective converter has).
pub fn convert<T: FromParam>(raw: &str) -> Result<T> {
    T::from_param(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_primitive_types() {
        assert_eq!(convert::<i32>("42").unwrap(), 42);
        assert_eq!(convert::<bool>("true").unwrap(), true);
        assert_eq!(convert::<f64>("3.14").unwrap(), 3.14);
    }

    #[test]
    fn converts_uri_and_path() {
        let uri: http::Uri = convert("https://example.com/a").unwrap();
        assert_eq!(uri.host(), Some("example.com"));
        let path: PathBuf = convert("/tmp/x").unwrap();
        assert_eq!(path, PathBuf::from("/tmp/x"));
    }

    #[test]
    fn unsupported_value_fails_with_unsupported_type() {
        let err = convert::<i32>("not-a-number").unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnsupportedType);
    }
}
