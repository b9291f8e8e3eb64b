//! Date and time rendering for the `$[DATE]` / `$[TIME]` placeholders.
//!
//! A format argument is either one of the four canonical style keywords
//! (`short`, `medium`, `long`, `full`) or a custom token pattern evaluated
//! against the current instant.

use chrono::{DateTime, Datelike, Local, Timelike};

const MONTHS_LONG: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const MONTHS_SHORT: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

const WEEKDAYS_LONG: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

const WEEKDAYS_SHORT: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

fn is_style(format: &str) -> bool {
    matches!(format, "short" | "medium" | "long" | "full")
}

/// Render a date. No format means the short style.
pub fn format_date(now: &DateTime<Local>, format: Option<&str>, locale: &str) -> String {
    match format {
        None => style_date(now, "short"),
        Some(style) if is_style(style) => style_date(now, style),
        Some(pattern) => format_pattern(now, pattern, locale),
    }
}

/// Render a time. No format means the medium style.
pub fn format_time(now: &DateTime<Local>, format: Option<&str>, locale: &str) -> String {
    match format {
        None => style_time(now, "medium"),
        Some(style) if is_style(style) => style_time(now, style),
        Some(pattern) => format_pattern(now, pattern, locale),
    }
}

fn style_date(now: &DateTime<Local>, style: &str) -> String {
    let fmt = match style {
        "short" => "%-m/%-d/%y",
        "medium" => "%b %-d, %Y",
        "long" => "%B %-d, %Y",
        _ => "%A, %B %-d, %Y",
    };
    now.format(fmt).to_string()
}

fn style_time(now: &DateTime<Local>, style: &str) -> String {
    let fmt = match style {
        "short" => "%-I:%M %p",
        "medium" => "%-I:%M:%S %p",
        // zone names need a tz database; the offset stands in
        _ => "%-I:%M:%S %p %:z",
    };
    now.format(fmt).to_string()
}

/// Evaluate a custom token pattern. Runs of the same letter select the
/// component and its width; all other characters pass through.
fn format_pattern(now: &DateTime<Local>, pattern: &str, locale: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len());
    let mut i = 0;
    while i < chars.len() {
        let letter = chars[i];
        if !"YMDdHhmsAaGZ".contains(letter) {
            out.push(letter);
            i += 1;
            continue;
        }
        let mut run = 1;
        while i + run < chars.len() && chars[i + run] == letter {
            run += 1;
        }
        // ordinal-day helper: D followed by a literal o
        if letter == 'D' && run == 1 && chars.get(i + 1) == Some(&'o') {
            out.push_str(&ordinal_day(locale, now.day()));
            i += 2;
            continue;
        }
        out.push_str(&render_token(now, letter, run, locale));
        i += run;
    }
    out
}

fn render_token(now: &DateTime<Local>, letter: char, run: usize, _locale: &str) -> String {
    match (letter, run) {
        // two-digit years take the last digits of the fully padded year
        ('Y', 1) => now.year().to_string(),
        ('Y', 2) => {
            let padded = format!("{:04}", now.year());
            padded[padded.len() - 2..].to_string()
        }
        ('Y', _) => format!("{:04}", now.year()),
        ('M', 1) => now.month().to_string(),
        ('M', 2) => format!("{:02}", now.month()),
        ('M', 3) => MONTHS_SHORT[now.month0() as usize].to_string(),
        ('M', _) => MONTHS_LONG[now.month0() as usize].to_string(),
        ('D', 1) => now.day().to_string(),
        ('D', _) => format!("{:02}", now.day()),
        ('d', run) if run >= 4 => {
            WEEKDAYS_LONG[now.weekday().num_days_from_monday() as usize].to_string()
        }
        ('d', _) => WEEKDAYS_SHORT[now.weekday().num_days_from_monday() as usize].to_string(),
        // the numeric 24h hour never carries a leading zero
        ('H', 1) => now.hour().to_string(),
        ('H', _) => format!("{:02}", now.hour()),
        ('h', 1) => now.hour12().1.to_string(),
        ('h', _) => format!("{:02}", now.hour12().1),
        ('m', 1) => now.minute().to_string(),
        ('m', _) => format!("{:02}", now.minute()),
        ('s', 1) => now.second().to_string(),
        ('s', _) => format!("{:02}", now.second()),
        ('A', _) => (if now.hour12().0 { "PM" } else { "AM" }).to_string(),
        ('a', _) => (if now.hour12().0 { "pm" } else { "am" }).to_string(),
        ('G', run) if run >= 4 => {
            (if now.year() > 0 {
                "Anno Domini"
            } else {
                "Before Christ"
            })
            .to_string()
        }
        ('G', _) => (if now.year() > 0 { "AD" } else { "BC" }).to_string(),
        ('Z', 1) => now.format("%:z").to_string(),
        ('Z', _) => now.format("%z").to_string(),
        _ => String::new(),
    }
}

/// Ordinal day-of-month. Suffixes come from a per-locale ordinal-rule
/// lookup keyed by the language subtag; unknown languages get a bare number.
pub fn ordinal_day(locale: &str, day: u32) -> String {
    let lang = locale
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    let suffix = match lang.as_str() {
        // CLDR ordinal categories one/two/few/other
        "en" => match (day % 10, day % 100) {
            (1, hundreds) if hundreds != 11 => "st",
            (2, hundreds) if hundreds != 12 => "nd",
            (3, hundreds) if hundreds != 13 => "rd",
            _ => "th",
        },
        // French: 1er, otherwise e
        "fr" => {
            if day == 1 {
                "er"
            } else {
                "e"
            }
        }
        // Germanic/Nordic ordinals are written with a trailing period
        "de" | "nl" | "da" | "no" | "nb" | "fi" | "sv" => ".",
        _ => "",
    };
    format!("{}{}", day, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_style_keywords() {
        let now = at(2024, 3, 5, 9, 7, 2);
        assert_eq!(format_date(&now, Some("short"), "en-US"), "3/5/24");
        assert_eq!(format_date(&now, Some("medium"), "en-US"), "Mar 5, 2024");
        assert_eq!(format_date(&now, Some("long"), "en-US"), "March 5, 2024");
        assert_eq!(
            format_date(&now, Some("full"), "en-US"),
            "Tuesday, March 5, 2024"
        );
        assert_eq!(format_time(&now, Some("short"), "en-US"), "9:07 AM");
        assert_eq!(format_time(&now, None, "en-US"), "9:07:02 AM");
    }

    #[test]
    fn test_custom_pattern_tokens() {
        let now = at(2024, 3, 5, 14, 7, 2);
        assert_eq!(
            format_pattern(&now, "MMMM D, YYYY", "en-US"),
            "March 5, 2024"
        );
        assert_eq!(format_pattern(&now, "YY-MM-DD", "en-US"), "24-03-05");
        assert_eq!(format_pattern(&now, "ddd h:mm a", "en-US"), "Tue 2:07 pm");
    }

    #[test]
    fn test_two_digit_year_pads_first() {
        let now = at(7, 1, 2, 0, 0, 0);
        // year 7 zero-pads to 0007, so YY is "07"
        assert_eq!(format_pattern(&now, "YY", "en-US"), "07");
        assert_eq!(format_pattern(&now, "YYYY", "en-US"), "0007");
    }

    #[test]
    fn test_numeric_24h_hour_never_padded() {
        let now = at(2024, 3, 5, 9, 30, 0);
        assert_eq!(format_pattern(&now, "H:mm", "en-US"), "9:30");
        assert_eq!(format_pattern(&now, "HH:mm", "en-US"), "09:30");
    }

    #[test]
    fn test_ordinal_rules_by_locale() {
        assert_eq!(ordinal_day("en-US", 1), "1st");
        assert_eq!(ordinal_day("en-US", 2), "2nd");
        assert_eq!(ordinal_day("en-US", 3), "3rd");
        assert_eq!(ordinal_day("en-US", 11), "11th");
        assert_eq!(ordinal_day("en-US", 12), "12th");
        assert_eq!(ordinal_day("en-US", 13), "13th");
        assert_eq!(ordinal_day("en-US", 21), "21st");
        assert_eq!(ordinal_day("fr-FR", 1), "1er");
        assert_eq!(ordinal_day("fr-FR", 4), "4e");
        assert_eq!(ordinal_day("de-DE", 7), "7.");
        assert_eq!(ordinal_day("ja-JP", 7), "7");
    }

    #[test]
    fn test_ordinal_token_in_pattern() {
        let now = at(2024, 3, 21, 0, 0, 0);
        assert_eq!(
            format_pattern(&now, "MMMM Do", "en-US"),
            "March 21st"
        );
    }

    #[test]
    fn test_era_tokens() {
        let ad = at(2024, 1, 1, 0, 0, 0);
        assert_eq!(format_pattern(&ad, "G", "en-US"), "AD");
        assert_eq!(format_pattern(&ad, "GGGG", "en-US"), "Anno Domini");
    }

    #[test]
    fn test_non_token_characters_pass_through() {
        let now = at(2024, 3, 5, 0, 0, 0);
        assert_eq!(format_pattern(&now, "[D] = D!", "en-US"), "[5] = 5!");
    }
}
