use std::path::Path;
use std::time::Duration;

use crate::error::{AppError, AppResult, ValidationError};

/// Parses an interval string such as `100ms`, `5s`, `2m`, or `1h`. A bare
/// number means seconds. Zero is a valid interval and means back-to-back
/// dispatch with no throttling.
///
/// # Errors
///
/// Returns `ValidationError` for an empty, malformed, or overflowing value.
pub fn parse_interval(s: &str) -> AppResult<Duration> {
    let value = s.trim();
    if value.is_empty() {
        return Err(AppError::Validation(ValidationError::DurationEmpty));
    }

    let mut digits_len = 0usize;
    for ch in value.chars() {
        if ch.is_ascii_digit() {
            digits_len = digits_len.saturating_add(1);
        } else {
            break;
        }
    }
    if digits_len == 0 {
        return Err(AppError::Validation(
            ValidationError::InvalidDurationFormat {
                value: value.to_owned(),
            },
        ));
    }
    let (num_part, unit_part) = value.split_at(digits_len);
    let number: u64 = num_part.parse().map_err(|err| {
        AppError::Validation(ValidationError::InvalidDurationNumber {
            value: value.to_owned(),
            source: err,
        })
    })?;

    let unit = if unit_part.is_empty() { "s" } else { unit_part };
    let duration = match unit {
        "ms" => Duration::from_millis(number),
        "s" => Duration::from_secs(number),
        "m" => {
            let secs = number
                .checked_mul(60)
                .ok_or(AppError::Validation(ValidationError::DurationOverflow))?;
            Duration::from_secs(secs)
        }
        "h" => {
            let secs = number
                .checked_mul(60)
                .and_then(|seconds| seconds.checked_mul(60))
                .ok_or(AppError::Validation(ValidationError::DurationOverflow))?;
            Duration::from_secs(secs)
        }
        _ => {
            return Err(AppError::Validation(ValidationError::InvalidDurationUnit {
                unit: unit.to_owned(),
            }));
        }
    };

    Ok(duration)
}

/// Resolves the `--data` argument: a path to an existing file is read as the
/// payload, anything else is used as literal bytes.
///
/// # Errors
///
/// Returns an I/O error when the argument names an existing file that cannot
/// be read.
pub fn load_payload(data: &str) -> AppResult<Vec<u8>> {
    if !data.is_empty() && Path::new(data).is_file() {
        return std::fs::read(data).map_err(AppError::from);
    }
    Ok(data.as_bytes().to_vec())
}
