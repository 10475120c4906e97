// TripShare
// Copyright 2023 Julio Merino
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not
// use this file except in compliance with the License.  You may obtain a copy
// of the License at:
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.  See the
// License for the specific language governing permissions and limitations
// under the License.

//! Configuration through environment variables.
//!
//! Every component reads its settings from variables named `<prefix>_<suffix>`, where the prefix
//! is chosen by the binary (such as `JWT` or `PGSQL_PROD`) and the suffix by the component.

use std::env;
use std::time::Duration;

/// Types that can be parsed from the raw value of an environment variable.
pub trait FromEnvValue: Sized {
    /// Parses `raw`, returning a description of the problem if it is not acceptable.
    fn from_env_value(raw: String) -> Result<Self, String>;
}

impl FromEnvValue for String {
    fn from_env_value(raw: String) -> Result<Self, String> {
        Ok(raw)
    }
}

/// Implements `FromEnvValue` for each of the given integer types via their `FromStr`.
macro_rules! integer_from_env_value [
    ( $( $t:ty ),+ ) => {
        $(
            impl FromEnvValue for $t {
                fn from_env_value(raw: String) -> Result<Self, String> {
                    raw.parse().map_err(|e| format!("Invalid {} '{}': {}", stringify!($t), raw, e))
                }
            }
        )+
    }
];

integer_from_env_value!(u16, u32, u64, usize);

/// Accepts `<count><unit>` with `unit` one of `s`, `m`, `h` or `d`.  A bare count means seconds.
impl FromEnvValue for Duration {
    fn from_env_value(raw: String) -> Result<Self, String> {
        let trimmed = raw.trim();
        let unit_secs = match trimmed.chars().last() {
            None => return Err("Invalid Duration: empty value".to_owned()),
            Some('s') => 1,
            Some('m') => 60,
            Some('h') => 60 * 60,
            Some('d') => 24 * 60 * 60,
            Some(_) => 0,
        };
        let count = if unit_secs == 0 { trimmed } else { &trimmed[..trimmed.len() - 1] };
        let count = count.parse::<u64>().map_err(|e| format!("Invalid Duration '{}': {}", raw, e))?;
        count
            .checked_mul(unit_secs.max(1))
            .map(Duration::from_secs)
            .ok_or_else(|| format!("Invalid Duration '{}': too large", raw))
    }
}

/// Reads `<prefix>_<suffix>`, returning its name along with its value if it is set.
fn lookup(prefix: &str, suffix: &str) -> Result<(String, Option<String>), String> {
    let name = format!("{}_{}", prefix, suffix);
    match env::var(&name) {
        Ok(value) => Ok((name, Some(value))),
        Err(env::VarError::NotPresent) => Ok((name, None)),
        Err(env::VarError::NotUnicode(_)) => {
            Err(format!("Invalid value in environment variable {}", name))
        }
    }
}

/// Parses the `raw` value of the variable `name`.
fn parse<T: FromEnvValue>(name: &str, raw: String) -> Result<T, String> {
    T::from_env_value(raw)
        .map_err(|e| format!("Invalid type in environment variable {}: {}", name, e))
}

/// Reads and parses `<prefix>_<suffix>`, which must be set.
pub fn get_required_var<T: FromEnvValue>(prefix: &str, suffix: &str) -> Result<T, String> {
    match lookup(prefix, suffix)? {
        (name, Some(raw)) => parse(&name, raw),
        (name, None) => Err(format!("Required environment variable {} not present", name)),
    }
}

/// Reads and parses `<prefix>_<suffix>`, yielding `None` if it is not set.
pub fn get_optional_var<T: FromEnvValue>(prefix: &str, suffix: &str) -> Result<Option<T>, String> {
    match lookup(prefix, suffix)? {
        (name, Some(raw)) => parse(&name, raw).map(Some),
        (_, None) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    /// Shorthand to parse `raw` as a `T`.
    fn parse_raw<T: FromEnvValue>(raw: &str) -> Result<T, String> {
        T::from_env_value(raw.to_owned())
    }

    #[test]
    fn test_string_is_kept_verbatim() {
        assert_eq!(" s3://trip-images ", parse_raw::<String>(" s3://trip-images ").unwrap());
    }

    #[test]
    fn test_integers() {
        assert_eq!(5000u16, parse_raw::<u16>("5000").unwrap());
        assert_eq!(128usize, parse_raw::<usize>("128").unwrap());

        let err = parse_raw::<u16>("70000").unwrap_err();
        assert!(err.starts_with("Invalid u16 '70000':"), "Got {}", err);
        let err = parse_raw::<u32>("-4").unwrap_err();
        assert!(err.starts_with("Invalid u32 '-4':"), "Got {}", err);
    }

    #[test]
    fn test_durations() {
        for (raw, secs) in
            [("90", 90), ("90s", 90), ("15m", 15 * 60), ("12h", 12 * 3600), ("7d", 7 * 86400)]
        {
            assert_eq!(Duration::from_secs(secs), parse_raw::<Duration>(raw).unwrap());
        }
    }

    #[test]
    fn test_durations_rejected() {
        for raw in ["", "h", "2w", "-1m", "0.5d", "99999999999999999999d"] {
            let err = parse_raw::<Duration>(raw).unwrap_err();
            assert!(err.starts_with("Invalid Duration"), "Unexpected error for '{}': {}", raw, err);
        }
        let err = parse_raw::<Duration>(&format!("{}d", u64::MAX / 2)).unwrap_err();
        assert!(err.ends_with("too large"), "Got {}", err);
    }

    #[test]
    fn test_required_var() {
        temp_env::with_var("TRIPS_PORT", Some("8080"), || {
            assert_eq!(8080u16, get_required_var::<u16>("TRIPS", "PORT").unwrap());
            assert_eq!("8080", get_required_var::<String>("TRIPS", "PORT").unwrap());
        });
    }

    #[test]
    fn test_required_var_unset() {
        temp_env::with_var_unset("TRIPS_BUCKET", || {
            assert_eq!(
                "Required environment variable TRIPS_BUCKET not present",
                get_required_var::<String>("TRIPS", "BUCKET").unwrap_err()
            );
        });
    }

    #[test]
    fn test_required_var_not_unicode() {
        temp_env::with_var("TRIPS_NAME", Some(OsStr::from_bytes(b"caf\xe9")), || {
            assert_eq!(
                "Invalid value in environment variable TRIPS_NAME",
                get_required_var::<String>("TRIPS", "NAME").unwrap_err()
            );
            assert!(get_optional_var::<String>("TRIPS", "NAME").is_err());
        });
    }

    #[test]
    fn test_optional_var() {
        temp_env::with_var("TRIPS_TTL", Some("2h"), || {
            assert_eq!(
                Some(Duration::from_secs(7200)),
                get_optional_var::<Duration>("TRIPS", "TTL").unwrap()
            );
        });
        temp_env::with_var_unset("TRIPS_TTL", || {
            assert_eq!(None, get_optional_var::<Duration>("TRIPS", "TTL").unwrap());
        });
    }

    #[test]
    fn test_bad_values_name_the_variable() {
        temp_env::with_var("TRIPS_CAPACITY", Some("lots"), || {
            for err in [
                get_required_var::<usize>("TRIPS", "CAPACITY").unwrap_err(),
                get_optional_var::<usize>("TRIPS", "CAPACITY").unwrap_err(),
            ] {
                assert!(
                    err.starts_with("Invalid type in environment variable TRIPS_CAPACITY: "),
                    "Got {}",
                    err
                );
            }
        });
    }
}
