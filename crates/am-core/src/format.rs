//! Display formatting for the Russian-language interface.
//!
//! Missing values render as an em dash (`—`) throughout. Numbers follow the
//! `ru-RU` convention: groups separated by a no-break space and a decimal comma.
//! Functions that depend on the current time take it as a parameter.

use chrono::{DateTime, NaiveDate, Utc};

use crate::types::{AssetCategory, AssetStatus, OperationType, Role};

/// Placeholder rendered for missing values.
pub const MISSING: &str = "—";

const NBSP: char = '\u{a0}';

fn group_digits(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(NBSP);
        }
        out.push(ch);
    }
    out
}

fn format_decimal(value: f64, min_fraction: usize, max_fraction: usize) -> String {
    let max_fraction = max_fraction.max(min_fraction);
    let fixed = format!("{:.*}", max_fraction, value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let mut frac = frac_part.trim_end_matches('0').to_owned();
    while frac.len() < min_fraction {
        frac.push('0');
    }

    let is_zero = int_part.bytes().all(|b| b == b'0') && frac.bytes().all(|b| b == b'0');
    let mut out = String::new();
    if value.is_sign_negative() && !is_zero {
        out.push('-');
    }
    out.push_str(&group_digits(int_part));
    if !frac.is_empty() {
        out.push(',');
        out.push_str(&frac);
    }
    out
}

/// Formats an amount in rubles with up to two fraction digits.
///
/// # Examples
///
/// ```
/// use am_core::format::format_currency;
///
/// assert_eq!(format_currency(Some(1234.5)), "1\u{a0}234,5\u{a0}₽");
/// assert_eq!(format_currency(Some(100.0)), "100\u{a0}₽");
/// assert_eq!(format_currency(None), "—");
/// ```
#[must_use]
pub fn format_currency(amount: Option<f64>) -> String {
    format_currency_with(amount, 0, 2)
}

/// Formats an amount in rubles with explicit fraction digit bounds.
#[must_use]
pub fn format_currency_with(amount: Option<f64>, min_fraction: usize, max_fraction: usize) -> String {
    match amount.filter(|a| a.is_finite()) {
        Some(amount) => format!("{}{NBSP}₽", format_decimal(amount, min_fraction, max_fraction)),
        None => MISSING.to_owned(),
    }
}

/// Formats a number with `ru-RU` grouping and up to two fraction digits.
///
/// # Examples
///
/// ```
/// use am_core::format::format_number;
///
/// assert_eq!(format_number(Some(1234567.891)), "1\u{a0}234\u{a0}567,89");
/// ```
#[must_use]
pub fn format_number(value: Option<f64>) -> String {
    match value.filter(|v| v.is_finite()) {
        Some(value) => format_decimal(value, 0, 2),
        None => MISSING.to_owned(),
    }
}

/// Formats a signed percentage with `decimals` fraction digits.
///
/// # Examples
///
/// ```
/// use am_core::format::format_percentage;
///
/// assert_eq!(format_percentage(Some(12.345), 1), "+12.3%");
/// assert_eq!(format_percentage(Some(-4.0), 1), "-4.0%");
/// ```
#[must_use]
pub fn format_percentage(value: Option<f64>, decimals: usize) -> String {
    match value.filter(|v| v.is_finite()) {
        Some(value) => {
            let sign = if value >= 0.0 { "+" } else { "" };
            format!("{sign}{value:.decimals$}%")
        }
        None => MISSING.to_owned(),
    }
}

/// Date output styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DateFormat {
    /// `dd.MM.yyyy`.
    #[default]
    Display,
    /// `dd.MM.yyyy HH:mm`.
    DisplayWithTime,
    /// `yyyy-MM-dd`.
    Api,
    /// `yyyy-MM-ddTHH:mm:ss`.
    ApiWithTime,
}

impl DateFormat {
    const fn pattern(self) -> &'static str {
        match self {
            Self::Display => "%d.%m.%Y",
            Self::DisplayWithTime => "%d.%m.%Y %H:%M",
            Self::Api => "%Y-%m-%d",
            Self::ApiWithTime => "%Y-%m-%dT%H:%M:%S",
        }
    }
}

/// Formats a timestamp. Times are shown in UTC.
///
/// # Examples
///
/// ```
/// use am_core::format::{DateFormat, format_date};
/// use am_core::types::timestamp::parse;
///
/// let at = parse("2024-03-05T09:07:00").unwrap();
/// assert_eq!(format_date(Some(at), DateFormat::Display), "05.03.2024");
/// assert_eq!(format_date(Some(at), DateFormat::DisplayWithTime), "05.03.2024 09:07");
/// assert_eq!(format_date(None, DateFormat::Api), "—");
/// ```
#[must_use]
pub fn format_date(date: Option<DateTime<Utc>>, format: DateFormat) -> String {
    date.map_or_else(|| MISSING.to_owned(), |d| d.format(format.pattern()).to_string())
}

/// Parses `raw` as a date or timestamp and formats it; unparseable input renders as missing.
#[must_use]
pub fn format_date_str(raw: &str, format: DateFormat) -> String {
    format_date(crate::validate::parse_date(raw), format)
}

/// Describes how long ago `date` was, relative to `now`.
///
/// Dates a week or more in the past render as [`DateFormat::Display`].
///
/// # Examples
///
/// ```
/// use am_core::format::format_relative_time;
/// use chrono::{Duration, Utc};
///
/// let now = Utc::now();
/// assert_eq!(format_relative_time(Some(now - Duration::seconds(30)), now), "только что");
/// assert_eq!(format_relative_time(Some(now - Duration::minutes(5)), now), "5 мин назад");
/// assert_eq!(format_relative_time(Some(now - Duration::hours(3)), now), "3 ч назад");
/// assert_eq!(format_relative_time(Some(now - Duration::days(2)), now), "2 дн назад");
/// ```
#[must_use]
pub fn format_relative_time(date: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(date) = date else {
        return MISSING.to_owned();
    };
    let seconds = (now - date).num_seconds();
    match seconds {
        ..60 => "только что".to_owned(),
        60..3_600 => format!("{} мин назад", seconds / 60),
        3_600..86_400 => format!("{} ч назад", seconds / 3_600),
        86_400..604_800 => format!("{} дн назад", seconds / 86_400),
        _ => format_date(Some(date), DateFormat::Display),
    }
}

/// Formats a byte count using binary units up to gigabytes.
///
/// # Examples
///
/// ```
/// use am_core::format::format_file_size;
///
/// assert_eq!(format_file_size(Some(0)), "0 Bytes");
/// assert_eq!(format_file_size(Some(1536)), "1.5 KB");
/// assert_eq!(format_file_size(Some(5 * 1024 * 1024)), "5 MB");
/// ```
#[must_use]
#[allow(clippy::cast_precision_loss)] // Display rounding only
pub fn format_file_size(bytes: Option<u64>) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    let Some(bytes) = bytes else {
        return MISSING.to_owned();
    };
    if bytes == 0 {
        return "0 Bytes".to_owned();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = format!("{value:.2}");
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{trimmed} {}", UNITS[unit])
}

/// Formats a Russian phone number; other inputs are returned unchanged.
///
/// # Examples
///
/// ```
/// use am_core::format::format_phone;
///
/// assert_eq!(format_phone("79123456789"), "+7 (912) 345-67-89");
/// assert_eq!(format_phone("9123456789"), "(912) 345-67-89");
/// assert_eq!(format_phone("112"), "112");
/// ```
#[must_use]
pub fn format_phone(phone: &str) -> String {
    if phone.trim().is_empty() {
        return MISSING.to_owned();
    }
    let d: String = phone.chars().filter(char::is_ascii_digit).collect();
    if d.len() == 11 && d.starts_with('7') {
        format!("+7 ({}) {}-{}-{}", &d[1..4], &d[4..7], &d[7..9], &d[9..])
    } else if d.len() == 10 {
        format!("({}) {}-{}-{}", &d[0..3], &d[3..6], &d[6..8], &d[8..])
    } else {
        phone.to_owned()
    }
}

/// Shortens `text` to at most `max_len` characters, ending with `suffix`.
///
/// # Examples
///
/// ```
/// use am_core::format::truncate;
///
/// assert_eq!(truncate("Основные средства", 10, "..."), "Основны...");
/// assert_eq!(truncate("Склад", 10, "..."), "Склад");
/// ```
#[must_use]
pub fn truncate(text: &str, max_len: usize, suffix: &str) -> String {
    if text.is_empty() {
        return MISSING.to_owned();
    }
    if text.chars().count() <= max_len {
        return text.to_owned();
    }
    let keep = max_len.saturating_sub(suffix.chars().count());
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(suffix);
    out
}

/// Uppercases the first character and lowercases the rest.
#[must_use]
pub fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
    })
}

/// Returns up to two uppercase initials of `name`, or `??` when it is empty.
///
/// # Examples
///
/// ```
/// use am_core::format::initials;
///
/// assert_eq!(initials("иван петров сидоров"), "ИП");
/// assert_eq!(initials("admin"), "A");
/// assert_eq!(initials(""), "??");
/// ```
#[must_use]
pub fn initials(name: &str) -> String {
    if name.trim().is_empty() {
        return "??".to_owned();
    }
    name.split(' ')
        .filter_map(|word| word.chars().next())
        .flat_map(char::to_uppercase)
        .take(2)
        .collect()
}

/// Expands a bare sequence number into `INV-YYYYMMDD-NNNN` using `today`.
///
/// Values that already contain a dash, or are not purely digits, are returned unchanged.
///
/// # Examples
///
/// ```
/// use am_core::format::format_inventory_number;
/// use chrono::NaiveDate;
///
/// let today = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
/// assert_eq!(format_inventory_number("7", today), "INV-20240115-0007");
/// assert_eq!(format_inventory_number("INV-20231201-0001", today), "INV-20231201-0001");
/// ```
#[must_use]
pub fn format_inventory_number(raw: &str, today: NaiveDate) -> String {
    if raw.is_empty() {
        return MISSING.to_owned();
    }
    if raw.contains('-') || !raw.chars().all(|c| c.is_ascii_digit()) {
        return raw.to_owned();
    }
    format!("INV-{}-{raw:0>4}", today.format("%Y%m%d"))
}

/// Formats a number of seconds as hours and minutes, minutes and seconds, or seconds.
///
/// # Examples
///
/// ```
/// use am_core::format::format_duration;
///
/// assert_eq!(format_duration(3_725), "1 ч 2 мин");
/// assert_eq!(format_duration(125), "2 мин 5 сек");
/// assert_eq!(format_duration(-3), "0 сек");
/// ```
#[must_use]
pub fn format_duration(seconds: i64) -> String {
    if seconds <= 0 {
        return "0 сек".to_owned();
    }
    let hours = seconds / 3_600;
    let minutes = (seconds % 3_600) / 60;
    let rest = seconds % 60;
    if hours > 0 {
        format!("{hours} ч {minutes} мин")
    } else if minutes > 0 {
        format!("{minutes} мин {rest} сек")
    } else {
        format!("{rest} сек")
    }
}

/// Formats a flag as `Да`/`Нет`.
#[must_use]
pub fn format_boolean(value: Option<bool>) -> String {
    format_boolean_with(value, "Да", "Нет")
}

/// Formats a flag with custom texts.
#[must_use]
pub fn format_boolean_with(value: Option<bool>, yes: &str, no: &str) -> String {
    match value {
        Some(true) => yes.to_owned(),
        Some(false) => no.to_owned(),
        None => MISSING.to_owned(),
    }
}

/// Joins `items` with `separator`, or renders missing when there are none.
#[must_use]
pub fn format_list<S: AsRef<str>>(items: &[S], separator: &str) -> String {
    if items.is_empty() {
        return MISSING.to_owned();
    }
    items.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(separator)
}

/// Kind of wire value translated by [`format_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusKind {
    /// An [`AssetStatus`].
    Asset,
    /// An [`OperationType`].
    Operation,
    /// A [`Role`].
    User,
}

/// Translates a wire value into its label, falling back to the raw value.
///
/// # Examples
///
/// ```
/// use am_core::format::{StatusKind, format_status};
///
/// assert_eq!(format_status("Repair", StatusKind::Asset), "Ремонт");
/// assert_eq!(format_status("Receipt", StatusKind::Operation), "Поступление");
/// assert_eq!(format_status("Unknown", StatusKind::User), "Unknown");
/// ```
#[must_use]
pub fn format_status(raw: &str, kind: StatusKind) -> String {
    let label = match kind {
        StatusKind::Asset => raw.parse::<AssetStatus>().ok().map(AssetStatus::label),
        StatusKind::Operation => raw.parse::<OperationType>().ok().map(OperationType::label),
        StatusKind::User => raw.parse::<Role>().ok().map(Role::label),
    };
    label.map_or_else(|| raw.to_owned(), str::to_owned)
}

/// Translates a category wire value, falling back to the raw value.
#[must_use]
pub fn format_category(raw: &str) -> String {
    raw.parse::<AssetCategory>()
        .map_or_else(|_| raw.to_owned(), |category| category.label().to_owned())
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn test_currency_grouping() {
        assert_eq!(format_currency(Some(0.0)), "0\u{a0}₽");
        assert_eq!(format_currency(Some(999.999)), "1\u{a0}000\u{a0}₽");
        assert_eq!(format_currency(Some(1_234_567.0)), "1\u{a0}234\u{a0}567\u{a0}₽");
        assert_eq!(format_currency(Some(-1500.25)), "-1\u{a0}500,25\u{a0}₽");
        assert_eq!(format_currency(Some(f64::NAN)), MISSING);
    }

    #[test]
    fn test_currency_min_fraction() {
        assert_eq!(format_currency_with(Some(10.0), 2, 2), "10,00\u{a0}₽");
        assert_eq!(format_currency_with(Some(10.5), 2, 2), "10,50\u{a0}₽");
    }

    #[test]
    fn test_number_and_percentage_missing() {
        assert_eq!(format_number(None), MISSING);
        assert_eq!(format_number(Some(42.0)), "42");
        assert_eq!(format_percentage(None, 1), MISSING);
        assert_eq!(format_percentage(Some(0.0), 1), "+0.0%");
    }

    #[test]
    fn test_date_formats() {
        let at = crate::types::timestamp::parse("2024-12-31T23:59:58").unwrap();
        assert_eq!(format_date(Some(at), DateFormat::Api), "2024-12-31");
        assert_eq!(format_date(Some(at), DateFormat::ApiWithTime), "2024-12-31T23:59:58");
        assert_eq!(format_date_str("2024-02-01", DateFormat::Display), "01.02.2024");
        assert_eq!(format_date_str("garbage", DateFormat::Display), MISSING);
    }

    #[test]
    fn test_relative_time_falls_back_to_date() {
        let now = crate::types::timestamp::parse("2024-06-15T12:00:00").unwrap();
        assert_eq!(format_relative_time(Some(now - Duration::days(8)), now), "07.06.2024");
        assert_eq!(format_relative_time(Some(now + Duration::hours(1)), now), "только что");
        assert_eq!(format_relative_time(None, now), MISSING);
    }

    #[test]
    fn test_file_size_units() {
        assert_eq!(format_file_size(Some(512)), "512 Bytes");
        assert_eq!(format_file_size(Some(1024)), "1 KB");
        assert_eq!(format_file_size(Some(1_288_490_189)), "1.2 GB");
        assert_eq!(format_file_size(None), MISSING);
    }

    #[test]
    fn test_phone_with_punctuation() {
        assert_eq!(format_phone("+7 912 345 67 89"), "+7 (912) 345-67-89");
        assert_eq!(format_phone(""), MISSING);
    }

    #[test]
    fn test_truncate_edges() {
        assert_eq!(truncate("", 5, "..."), MISSING);
        assert_eq!(truncate("abcdef", 5, "…"), "abcd…");
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("сКЛАД"), "Склад");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn test_inventory_number_passthrough() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(format_inventory_number("12345", today), "INV-20240115-12345");
        assert_eq!(format_inventory_number("A12", today), "A12");
        assert_eq!(format_inventory_number("", today), MISSING);
    }

    #[test]
    fn test_duration_hours_only() {
        assert_eq!(format_duration(7_200), "2 ч 0 мин");
        assert_eq!(format_duration(59), "59 сек");
    }

    #[test]
    fn test_boolean_and_list() {
        assert_eq!(format_boolean(Some(true)), "Да");
        assert_eq!(format_boolean(Some(false)), "Нет");
        assert_eq!(format_boolean(None), MISSING);
        assert_eq!(format_boolean_with(Some(true), "Активен", "Отключен"), "Активен");
        assert_eq!(format_list(&["a", "b"], ", "), "a, b");
        assert_eq!(format_list::<&str>(&[], ", "), MISSING);
    }

    #[test]
    fn test_category_labels() {
        assert_eq!(format_category("Fixed Assets"), "Основные средства");
        assert_eq!(format_category("Other"), "Other");
    }
}
