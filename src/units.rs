use std::{fmt::Display, str::FromStr, sync::OnceLock, time::Duration};

use anyhow::{bail, Context};
use log::debug;
use regex::Regex;

/// Period between two runs of the pipeline. Always strictly positive.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
pub struct Interval(Duration);

impl Interval {
    pub fn as_duration(&self) -> Duration {
        self.0
    }
}

impl Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl From<Interval> for Duration {
    fn from(value: Interval) -> Self {
        value.0
    }
}

impl TryFrom<Duration> for Interval {
    type Error = anyhow::Error;

    fn try_from(value: Duration) -> Result<Self, Self::Error> {
        if value.is_zero() {
            bail!("interval must be greater than zero");
        }
        Ok(Self(value))
    }
}

impl FromStr for Interval {
    type Err = anyhow::Error;

    /// Accepts durations such as `5s`, `1h30m`, `1.5h` or `300ms`.
    ///
    /// A single leading `+` or `-` is dropped before parsing and carries no meaning.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        static CELL_TERM: OnceLock<Regex> = OnceLock::new();
        let re_term = CELL_TERM.get_or_init(|| {
            debug!("Compiling regex for parsing intervals");
            Regex::new(r"(\d+\.?\d*|\.\d+)(ns|us|µs|μs|ms|s|m|h)")
                .expect("failed to compile regex")
        });

        let value = s.trim();
        let value = value.strip_prefix(['+', '-']).unwrap_or(value);
        if value.is_empty() {
            bail!("interval is empty (input: {s:?})");
        }

        let mut nanos = 0f64;
        let mut expected_start = 0;
        for captures in re_term.captures_iter(value) {
            // Both groups are required for a match
            let whole = captures.get(0).unwrap();
            if whole.start() != expected_start {
                bail!("unexpected characters in interval {s:?} at position {expected_start}");
            }
            expected_start = whole.end();

            let amount: f64 = captures[1]
                .parse()
                .with_context(|| format!("Failed to parse number in interval {s:?}"))?;
            nanos += amount * nanos_per_unit(&captures[2]);
        }
        if expected_start != value.len() {
            bail!("invalid interval {s:?}, expected something like \"30s\" or \"1h30m\"");
        }
        if !nanos.is_finite() || nanos >= u64::MAX as f64 {
            bail!("interval {s:?} is too large");
        }

        Interval::try_from(Duration::from_nanos(nanos.round() as u64))
            .with_context(|| format!("Invalid interval {s:?}"))
    }
}

fn nanos_per_unit(unit: &str) -> f64 {
    match unit {
        "ns" => 1.0,
        "us" | "µs" | "μs" => 1e3,
        "ms" => 1e6,
        "s" => 1e9,
        "m" => 60e9,
        "h" => 3_600e9,
        _ => unreachable!("regex only matches known units"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("5s", Duration::from_secs(5))]
    #[case("+5s", Duration::from_secs(5))]
    #[case("-5s", Duration::from_secs(5))]
    #[case("300ms", Duration::from_millis(300))]
    #[case("1h30m", Duration::from_secs(5_400))]
    #[case("1.5h", Duration::from_secs(5_400))]
    #[case("2m10s", Duration::from_secs(130))]
    #[case("10us", Duration::from_micros(10))]
    #[case("10µs", Duration::from_micros(10))]
    #[case("250ns", Duration::from_nanos(250))]
    #[case(".5s", Duration::from_millis(500))]
    fn interval_valid(#[case] input: &str, #[case] expected: Duration) {
        let actual: Interval = input.parse().unwrap();
        assert_eq!(actual.as_duration(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("+")]
    #[case("5")]
    #[case("s")]
    #[case("5 s")]
    #[case("5x")]
    #[case("0s")]
    #[case("+-5s")]
    #[case("five seconds")]
    fn interval_invalid(#[case] input: &str) {
        assert!(input.parse::<Interval>().is_err(), "{input:?} should not parse");
    }

    #[test]
    fn signed_and_unsigned_are_identical() {
        let signed: Interval = "+5s".parse().unwrap();
        let unsigned: Interval = "5s".parse().unwrap();
        assert_eq!(signed, unsigned);
    }
}
