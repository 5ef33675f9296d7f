//! `grpc-timeout` header parsing (gRPC over HTTP/2 protocol mapping,
//! referenced from §6; arms the per-stream deadline timer described in §5).

use crate::error::{Error, ErrorKind, Result};
use std::time::Duration;

/// Parses a `grpc-timeout` value: an ASCII digit string (1-8 digits) plus a
/// single unit character (`H` hours, `M` minutes, `S` seconds, `m`
/// milliseconds, `u` microseconds, `n` nanoseconds).
pub fn parse_grpc_timeout(value: &str) -> Result<Duration> {
    if value.is_empty() || value.len() > 9 {
        return Err(malformed(value));
    }
    let (digits, unit) = value.split_at(value.len() - 1);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed(value));
    }
    let amount: u64 = digits.parse().map_err(|_| malformed(value))?;
    let duration = match unit {
        "H" => Duration::from_secs(amount * 3600),
        "M" => Duration::from_secs(amount * 60),
        "S" => Duration::from_secs(amount),
        "m" => Duration::from_millis(amount),
        "u" => Duration::from_micros(amount),
        "n" => Duration::from_nanos(amount),
        _ => return Err(malformed(value)),
    };
    Ok(duration)
}

fn malformed(value: &str) -> Error {
    Error::new(ErrorKind::MalformedHeader, format!("invalid grpc-timeout: {value}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_each_unit() {
        assert_eq!(parse_grpc_timeout("1H").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_grpc_timeout("5M").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_grpc_timeout("30S").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_grpc_timeout("250m").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_grpc_timeout("10u").unwrap(), Duration::from_micros(10));
        assert_eq!(parse_grpc_timeout("100n").unwrap(), Duration::from_nanos(100));
    }

    #[test]
    fn rejects_malformed_values() {
        assert!(parse_grpc_timeout("").is_err());
        assert!(parse_grpc_timeout("S").is_err());
        assert!(parse_grpc_timeout("12X").is_err());
        assert!(parse_grpc_timeout("123456789S").is_err());
    }
}
