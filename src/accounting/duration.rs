//! Human-friendly durations, in minutes

use crate::error::{BiletoError, Result};

/// Longest duration accepted for a single entry: 10000 hours
pub const MAX_DURATION_MINUTES: u32 = 10_000 * 60;

/// Parse time string like "1h30m", "2h", "45m" or "90" into minutes
pub fn parse_duration(time: &str) -> Result<u32> {
    let time = time.trim().to_lowercase();
    let invalid = || BiletoError::InvalidInput(format!("Invalid time format: {time}"));
    let mut total_minutes: u32 = 0;
    let mut current_num = String::new();

    for c in time.chars() {
        match c {
            '0'..='9' => current_num.push(c),
            'h' | 'm' => {
                let value: u32 = current_num.parse().map_err(|_| invalid())?;
                let minutes = if c == 'h' { value.checked_mul(60) } else { Some(value) };
                total_minutes = minutes
                    .and_then(|m| total_minutes.checked_add(m))
                    .ok_or_else(invalid)?;
                current_num.clear();
            },
            ' ' => {},
            _ => return Err(invalid()),
        }
    }

    // A trailing number without unit counts as minutes
    if !current_num.is_empty() {
        let minutes: u32 = current_num.parse().map_err(|_| invalid())?;
        total_minutes = total_minutes.checked_add(minutes).ok_or_else(invalid)?;
    }

    if total_minutes == 0 {
        return Err(BiletoError::InvalidInput(format!(
            "Invalid time format: {time}. Use format like '1h30m', '2h', or '45m'"
        )));
    }

    if total_minutes > MAX_DURATION_MINUTES {
        return Err(BiletoError::InvalidInput(format!(
            "Invalid time: {time}. A single entry is limited to {}h",
            MAX_DURATION_MINUTES / 60
        )));
    }

    Ok(total_minutes)
}

/// Format minutes as human-readable string
pub fn format_duration(minutes: u64) -> String {
    let hours = minutes / 60;
    let mins = minutes % 60;
    if hours > 0 && mins > 0 {
        format!("{hours}h {mins}m")
    } else if hours > 0 {
        format!("{hours}h")
    } else {
        format!("{mins}m")
    }
}
