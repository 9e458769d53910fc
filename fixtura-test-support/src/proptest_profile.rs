//! Property-test case counts with an environment override.
//!
//! CI raises the case count through `FIXTURA_PROPTEST_CASES`; local runs use
//! the per-suite default.

use std::env;

/// Environment variable overriding the number of proptest cases.
pub const CASES_ENV_KEY: &str = "FIXTURA_PROPTEST_CASES";

/// Returns the case count for a suite whose default is `default_cases`.
///
/// Unparseable or zero overrides are ignored with a warning.
///
/// # Examples
/// ```
/// use fixtura_test_support::proptest_profile::cases;
///
/// assert!(cases(32) > 0);
/// ```
#[must_use]
pub fn cases(default_cases: u32) -> u32 {
    match env::var(CASES_ENV_KEY) {
        Ok(raw) => parse_cases(&raw).unwrap_or_else(|reason| {
            tracing::warn!(key = CASES_ENV_KEY, %reason, "ignoring proptest override");
            default_cases
        }),
        Err(_) => default_cases,
    }
}

fn parse_cases(raw: &str) -> Result<u32, String> {
    match raw.trim().parse::<u32>() {
        Ok(0) => Err("case count must be positive".to_owned()),
        Ok(cases) => Ok(cases),
        Err(err) => Err(format!("`{raw}` is not a case count: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    #[rstest]
    #[case("64", Ok(64))]
    #[case(" 8 ", Ok(8))]
    #[case("0", Err("case count must be positive".to_owned()))]
    fn overrides_are_parsed(#[case] raw: &str, #[case] expected: Result<u32, String>) {
        assert_eq!(parse_cases(raw), expected);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(parse_cases("many").is_err());
    }
}
