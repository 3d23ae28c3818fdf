//! Embedded time-expression grammar for reminder commands.
//!
//! Deliberately small — this is not a natural-language date parser.
//! Accepted forms:
//!
//! - relative: `in 30 minutes`, `in 2 hours`, `in 1 day` (also `min`,
//!   `mins`, `hr`, `hrs`, and `a`/`an` for one)
//! - absolute clock: `2:30pm`, `2pm`, `14:30`, with an optional
//!   `today` / `tomorrow` qualifier on either side
//!
//! A clock time with no qualifier that is already past today rolls
//! forward to tomorrow. An explicit `today` suppresses the roll-forward
//! even when the time is past — the store's future-time validation then
//! rejects it, which is the intended user-facing error rather than a
//! silent correction.
//!
//! Everything parses against an injected `now` so behavior is
//! deterministic under test; callers pass `Utc::now()` in production.

use chrono::{DateTime, Duration, Timelike, Utc};

/// A free-text reminder request split into message and fire time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReminder {
    pub message: String,
    pub fire_time: DateTime<Utc>,
}

// ── Input splitting ──────────────────────────────────────────────

/// Split free text like `"submit report in 30 minutes"` into a message
/// and a fire time. Returns `None` when no time expression is found or
/// the message part is empty.
pub fn parse_reminder_input(text: &str, now: DateTime<Utc>) -> Option<ParsedReminder> {
    let text = strip_courtesy_prefix(text.trim());
    if text.is_empty() {
        return None;
    }

    // Rightmost " in <duration>" or " at <clock>" that actually parses
    for separator in [" in ", " at "] {
        for (idx, _) in text.match_indices(separator).collect::<Vec<_>>().into_iter().rev() {
            let message = text[..idx].trim();
            let expr = match separator {
                // "in" is part of the expression; "at" is dropped
                " in " => &text[idx + 1..],
                _ => &text[idx + separator.len()..],
            };
            if message.is_empty() {
                continue;
            }
            if let Some(fire_time) = parse_time_expression(expr, now) {
                return Some(ParsedReminder {
                    message: message.to_string(),
                    fire_time,
                });
            }
        }
    }

    // Bare trailing clock, e.g. "call mom 2pm tomorrow" or "standup 14:30"
    let words: Vec<&str> = text.split_whitespace().collect();
    for take in (1..=3.min(words.len().saturating_sub(1))).rev() {
        let split = words.len() - take;
        let expr = words[split..].join(" ");
        if let Some(fire_time) = parse_time_expression(&expr, now) {
            let message = words[..split].join(" ");
            return Some(ParsedReminder { message, fire_time });
        }
    }

    None
}

fn strip_courtesy_prefix(text: &str) -> &str {
    let lowered = text.to_lowercase();
    for prefix in ["remind me to ", "remind me "] {
        if lowered.starts_with(prefix) {
            return text[prefix.len()..].trim_start();
        }
    }
    text
}

// ── Time expressions ─────────────────────────────────────────────

/// Parse a standalone time expression relative to `now`.
pub fn parse_time_expression(expr: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let expr = expr.trim().to_lowercase();
    let expr = expr.strip_prefix("at ").unwrap_or(&expr);

    if let Some(rest) = expr.strip_prefix("in ") {
        return parse_relative(rest, now);
    }

    parse_absolute(expr, now)
}

/// `<n> minutes|hours|days` after `now`.
fn parse_relative(rest: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let mut words = rest.split_whitespace();
    let amount_word = words.next()?;
    let unit_word = words.next()?;
    if words.next().is_some() {
        return None;
    }

    let amount: i64 = match amount_word {
        "a" | "an" => 1,
        other => other.parse().ok()?,
    };
    if amount <= 0 {
        return None;
    }

    let delta = match unit_word {
        "minute" | "minutes" | "min" | "mins" => Duration::minutes(amount),
        "hour" | "hours" | "hr" | "hrs" => Duration::hours(amount),
        "day" | "days" => Duration::days(amount),
        _ => return None,
    };

    Some(now + delta)
}

/// Clock time with an optional `today`/`tomorrow` qualifier.
fn parse_absolute(expr: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let mut qualifier: Option<&str> = None;
    let mut clock_words: Vec<&str> = Vec::new();

    for word in expr.split_whitespace() {
        match word {
            "today" | "tomorrow" => {
                if qualifier.is_some() {
                    return None;
                }
                qualifier = Some(word);
            }
            other => clock_words.push(other),
        }
    }

    // Re-attach a detached meridiem: "2:30 pm" -> "2:30pm"
    let clock = match clock_words.as_slice() {
        [time] => (*time).to_string(),
        [time, meridiem @ ("am" | "pm")] => format!("{time}{meridiem}"),
        _ => return None,
    };

    let (hour, minute) = parse_clock(&clock)?;

    let mut fire = now
        .with_hour(hour)?
        .with_minute(minute)?
        .with_second(0)?
        .with_nanosecond(0)?;

    match qualifier {
        Some("tomorrow") => fire += Duration::days(1),
        Some(_) => {} // "today": never roll forward, even if already past
        None => {
            if fire <= now {
                fire += Duration::days(1);
            }
        }
    }

    Some(fire)
}

/// `2:30pm`, `2pm`, `14:30` → `(hour, minute)` in 24-hour form.
fn parse_clock(clock: &str) -> Option<(u32, u32)> {
    let (digits, meridiem) = if let Some(rest) = clock.strip_suffix("am") {
        (rest, Some("am"))
    } else if let Some(rest) = clock.strip_suffix("pm") {
        (rest, Some("pm"))
    } else {
        (clock, None)
    };

    let (hour_str, minute_str) = match digits.split_once(':') {
        Some((h, m)) => (h, m),
        None => (digits, "0"),
    };

    let hour: u32 = hour_str.parse().ok()?;
    let minute: u32 = minute_str.parse().ok()?;
    if minute > 59 {
        return None;
    }

    let hour = match meridiem {
        Some("am") => match hour {
            12 => 0,
            1..=11 => hour,
            _ => return None,
        },
        Some(_) => match hour {
            12 => 12,
            1..=11 => hour + 12,
            _ => return None,
        },
        None => {
            // Bare clocks need a minute part ("14:30", not "14")
            if !digits.contains(':') || hour > 23 {
                return None;
            }
            hour
        }
    };

    Some((hour, minute))
}

// ── Tests ────────────────────────────────────────────────────────
