use std::env;
use std::fmt::{self, Display};
use std::str::FromStr;

use tracing::warn;

/// Environment variable that selects the report styles written by
/// [`Profiler::print()`][crate::Profiler::print].
///
/// The value lists one or more of `groups`, `compact`, `full` and `detailed`, separated by
/// commas or whitespace. Unknown names are skipped with a warning.
pub const REPORT_STYLES_ENV: &str = "NESTED_TIMERS_REPORT_STYLES";

/// One way of presenting a [`Report`][crate::Report] as text.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum ReportStyle {
    /// Only the table of user-defined groups.
    Groups,

    /// The timer tree with average time, percentage of the parent and call count.
    Compact,

    /// The timer tree with all time statistics and throughput, followed by the groups.
    Full,

    /// Like [`Full`][Self::Full], plus thread imbalance of every timer.
    Detailed,
}

impl ReportStyle {
    /// Parses a list of style names separated by commas or whitespace.
    ///
    /// Unknown names are skipped with a warning. Returns [`Full`][Self::Full] alone if no
    /// valid name is present.
    #[must_use]
    pub fn parse_list(list: &str) -> Vec<Self> {
        let mut styles = Vec::new();

        for name in list
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|name| !name.is_empty())
        {
            match name.parse::<Self>() {
                Ok(style) if !styles.contains(&style) => styles.push(style),
                Ok(_) => {}
                Err(UnknownReportStyle(name)) => {
                    warn!(%name, variable = REPORT_STYLES_ENV, "skipping unknown report style");
                }
            }
        }

        if styles.is_empty() {
            styles.push(Self::Full);
        }

        styles
    }

    /// Reads the styles from the [`REPORT_STYLES_ENV`] environment variable,
    /// defaulting to [`Full`][Self::Full].
    #[must_use]
    #[cfg_attr(test, mutants::skip)] // Tests do not modify the process environment.
    pub fn from_env() -> Vec<Self> {
        env::var(REPORT_STYLES_ENV)
            .map_or_else(|_| vec![Self::Full], |list| Self::parse_list(&list))
    }

    fn name(self) -> &'static str {
        match self {
            Self::Groups => "groups",
            Self::Compact => "compact",
            Self::Full => "full",
            Self::Detailed => "detailed",
        }
    }
}

impl Display for ReportStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ReportStyle {
    type Err = UnknownReportStyle;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.trim().to_ascii_lowercase().as_str() {
            "groups" => Ok(Self::Groups),
            "compact" => Ok(Self::Compact),
            "full" => Ok(Self::Full),
            "detailed" => Ok(Self::Detailed),
            _ => Err(UnknownReportStyle(name.to_string())),
        }
    }
}

/// The name of a report style that does not exist.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("unknown report style '{0}'")]
pub struct UnknownReportStyle(String);

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn parses_known_names() {
        assert_eq!(
            ReportStyle::parse_list("groups, compact detailed"),
            [ReportStyle::Groups, ReportStyle::Compact, ReportStyle::Detailed]
        );
    }

    #[test]
    fn unknown_names_are_skipped() {
        assert_eq!(
            ReportStyle::parse_list("fancy,FULL,full"),
            [ReportStyle::Full]
        );
    }

    #[test]
    fn empty_list_selects_full() {
        assert_eq!(ReportStyle::parse_list(""), [ReportStyle::Full]);
        assert_eq!(ReportStyle::parse_list("nope"), [ReportStyle::Full]);
    }

    #[test]
    fn display_round_trips_name() {
        assert_eq!(ReportStyle::Detailed.to_string(), "detailed");
        assert_eq!("compact".parse::<ReportStyle>(), Ok(ReportStyle::Compact));
        assert_eq!(
            "x".parse::<ReportStyle>(),
            Err(UnknownReportStyle("x".to_string()))
        );
    }
}
