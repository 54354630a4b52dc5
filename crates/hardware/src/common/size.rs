//! Byte sizes, addresses, and latencies with unit suffixes.
//!
//! Configuration values such as `"16GiB"`, `"0x2_0000_0000"` or `"6ns"` are parsed here.
//! Memory-size suffixes are binary multiples (`GB` and `GiB` both mean 2^30 bytes), matching
//! how simulator memory sizes are conventionally written.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use super::constants::{GIB, KIB, MIB, TIB};
use super::error::{Result, TopologyError};

/// A byte count (or address) parsed from an integer or a suffixed string.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Deserialize)]
#[serde(try_from = "SizeRepr")]
pub struct ByteSize(pub u64);

impl ByteSize {
    /// `n` kibibytes.
    pub const fn kib(n: u64) -> Self {
        Self(n * KIB)
    }

    /// `n` mebibytes.
    pub const fn mib(n: u64) -> Self {
        Self(n * MIB)
    }

    /// `n` gibibytes.
    pub const fn gib(n: u64) -> Self {
        Self(n * GIB)
    }

    /// Raw byte count.
    #[inline]
    pub const fn bytes(self) -> u64 {
        self.0
    }
}

impl FromStr for ByteSize {
    type Err = TopologyError;

    fn from_str(s: &str) -> Result<Self> {
        parse_size(s).map(Self)
    }
}

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.0;
        for (unit, name) in [(TIB, "TiB"), (GIB, "GiB"), (MIB, "MiB"), (KIB, "KiB")] {
            if n != 0 && n % unit == 0 {
                return write!(f, "{}{name}", n / unit);
            }
        }
        write!(f, "{n}B")
    }
}

/// Wire form accepted for sizes and addresses.
#[derive(Deserialize)]
#[serde(untagged)]
enum SizeRepr {
    Int(u64),
    Text(String),
}

impl TryFrom<SizeRepr> for ByteSize {
    type Error = TopologyError;

    fn try_from(repr: SizeRepr) -> Result<Self> {
        match repr {
            SizeRepr::Int(n) => Ok(Self(n)),
            SizeRepr::Text(s) => s.parse(),
        }
    }
}

/// Parses `"8GiB"`, `"512 KB"`, `"0x2_0000_0000"`, or `"4096"` into a byte count.
pub fn parse_size(text: &str) -> Result<u64> {
    let invalid = || TopologyError::InvalidSize(text.to_string());
    let trimmed = text.trim();

    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        let digits: String = hex.chars().filter(|&c| c != '_').collect();
        return u64::from_str_radix(&digits, 16).map_err(|_| invalid());
    }

    let split = trimmed
        .find(|c: char| !(c.is_ascii_digit() || c == '_'))
        .unwrap_or(trimmed.len());
    let (number, unit) = trimmed.split_at(split);
    let digits: String = number.chars().filter(|&c| c != '_').collect();
    if digits.is_empty() {
        return Err(invalid());
    }
    let value: u64 = digits.parse().map_err(|_| invalid())?;

    let multiplier = match unit.trim() {
        "" | "B" => 1,
        "K" | "k" | "KB" | "kB" | "KiB" => KIB,
        "M" | "MB" | "MiB" => MIB,
        "G" | "GB" | "GiB" => GIB,
        "T" | "TB" | "TiB" => TIB,
        _ => return Err(invalid()),
    };
    value.checked_mul(multiplier).ok_or_else(invalid)
}

/// A fixed forwarding delay, parsed from nanoseconds or a suffixed string.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Deserialize)]
#[serde(try_from = "SizeRepr")]
pub struct Latency(pub Duration);

impl Latency {
    /// Zero delay.
    pub const ZERO: Self = Self(Duration::ZERO);

    /// A delay of `n` nanoseconds.
    pub const fn from_nanos(n: u64) -> Self {
        Self(Duration::from_nanos(n))
    }

    /// The delay in whole nanoseconds.
    pub const fn as_nanos(self) -> u128 {
        self.0.as_nanos()
    }
}

impl std::ops::Add for Latency {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl FromStr for Latency {
    type Err = TopologyError;

    fn from_str(s: &str) -> Result<Self> {
        parse_latency(s).map(Self)
    }
}

impl TryFrom<SizeRepr> for Latency {
    type Error = TopologyError;

    fn try_from(repr: SizeRepr) -> Result<Self> {
        match repr {
            SizeRepr::Int(n) => Ok(Self::from_nanos(n)),
            SizeRepr::Text(s) => s.parse(),
        }
    }
}

impl fmt::Display for Latency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ns", self.0.as_nanos())
    }
}

/// Parses `"1ns"`, `"2us"`, `"3ms"`, `"1s"`, or a bare nanosecond count.
pub fn parse_latency(text: &str) -> Result<Duration> {
    let invalid = || TopologyError::InvalidSize(text.to_string());
    let trimmed = text.trim();
    let split = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (number, unit) = trimmed.split_at(split);
    let value: u64 = number.parse().map_err(|_| invalid())?;
    match unit.trim() {
        "" | "ns" => Ok(Duration::from_nanos(value)),
        "us" => Ok(Duration::from_micros(value)),
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        _ => Err(invalid()),
    }
}
