//! Form field validators.
//!
//! A [`Rule`] checks one text value and returns an error message, or `None`
//! when the value passes. Every rule except [`required`] accepts an empty
//! value, so optional fields are expressed by leaving `required` out.
//!
//! Rules are grouped per field in a [`FormSchema`] and run by [`validate_form`],
//! which reports the first failing rule of each field.
//!
//! # Examples
//!
//! ```
//! use am_core::validate::{FormSchema, email, min_length, required, validate_form};
//! use rustc_hash::FxHashMap;
//!
//! let schema = FormSchema::new()
//!     .field("email", [required(), email()])
//!     .field("password", [required(), min_length(6)]);
//!
//! let mut data = FxHashMap::default();
//! data.insert("email".to_owned(), "admin@result-education.ru".to_owned());
//! data.insert("password".to_owned(), "123".to_owned());
//!
//! let report = validate_form(&data, &schema);
//! assert!(!report.is_valid());
//! assert_eq!(report.error("password"), Some("Минимальная длина: 6 символов"));
//! assert_eq!(report.error("email"), None);
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::types::timestamp;

#[allow(clippy::expect_used)] // Literal patterns, exercised by the tests below
fn compile(pattern: &'static str) -> Regex {
    Regex::new(pattern).expect("valid literal pattern")
}

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| compile(r"^[^\s@]+@[^\s@]+\.[^\s@]+$"));
static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| compile(r"^\+?[1-9]\d{0,15}$"));
static INN_RE: LazyLock<Regex> = LazyLock::new(|| compile(r"^(\d{10}|\d{12})$"));
static INVENTORY_RE: LazyLock<Regex> = LazyLock::new(|| compile(r"^INV-\d{8}-\d{4}$"));
static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| compile(r"^[A-Za-z][A-Za-z0-9+.\-]*://[^\s/?#]+[^\s]*$"));

/// Minimum password length accepted by the backend.
pub const PASSWORD_MIN_LENGTH: usize = 6;

/// Field errors keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    errors: BTreeMap<String, String>,
}

impl ValidationReport {
    /// Creates an empty, passing report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an error for `field`. The first error per field is kept.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.entry(field.into()).or_insert_with(|| message.into());
    }

    /// Returns `true` if no field failed.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the error recorded for `field`.
    #[must_use]
    pub fn error(&self, field: &str) -> Option<&str> {
        self.errors.get(field).map(String::as_str)
    }

    /// Returns every recorded error.
    #[must_use]
    pub const fn errors(&self) -> &BTreeMap<String, String> {
        &self.errors
    }

    /// Adds the errors of `other` that are not already present.
    pub fn merge(&mut self, other: Self) {
        for (field, message) in other.errors {
            self.add(field, message);
        }
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.errors {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

type Check = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// A single-value validation rule.
pub struct Rule {
    check: Check,
}

impl Rule {
    /// Builds a rule that fails with `message` whenever `passes` returns `false`.
    #[must_use]
    pub fn new<F>(passes: F, message: impl Into<String>) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        let message = message.into();
        Self::from_fn(move |value| (!passes(value)).then(|| message.clone()))
    }

    /// Builds a rule from a function returning the error message directly.
    #[must_use]
    pub fn from_fn<F>(check: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self { check: Box::new(check) }
    }

    /// Replaces the rule's error message.
    #[must_use]
    pub fn with_message(self, message: impl Into<String>) -> Self {
        let message = message.into();
        Self::from_fn(move |value| self.check(value).map(|_| message.clone()))
    }

    /// Checks `value`, returning the error message on failure.
    #[must_use]
    pub fn check(&self, value: &str) -> Option<String> {
        (self.check)(value)
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule").finish_non_exhaustive()
    }
}

fn parse_number(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|n| !n.is_nan())
}

fn digits(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}

/// Parses a date in any format the forms accept.
///
/// Accepts `YYYY-MM-DD`, `DD.MM.YYYY`, and backend timestamps.
#[must_use]
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    timestamp::parse(value).or_else(|| {
        ["%Y-%m-%d", "%d.%m.%Y"]
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
    })
}

/// The value must not be blank.
#[must_use]
pub fn required() -> Rule {
    Rule::new(|v| !v.trim().is_empty(), "Это поле обязательно для заполнения")
}

/// The value must have at least `min` characters.
#[must_use]
pub fn min_length(min: usize) -> Rule {
    Rule::new(
        move |v| v.is_empty() || v.chars().count() >= min,
        format!("Минимальная длина: {min} символов"),
    )
}

/// The value must have at most `max` characters.
#[must_use]
pub fn max_length(max: usize) -> Rule {
    Rule::new(
        move |v| v.chars().count() <= max,
        format!("Максимальная длина: {max} символов"),
    )
}

/// The value must look like an e-mail address.
#[must_use]
pub fn email() -> Rule {
    Rule::new(|v| v.is_empty() || EMAIL_RE.is_match(v), "Введите корректный email адрес")
}

/// Password requirements checked by [`password`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordPolicy {
    /// Minimum number of characters.
    pub min_length: usize,
    /// Require an ASCII uppercase letter.
    pub require_uppercase: bool,
    /// Require an ASCII lowercase letter.
    pub require_lowercase: bool,
    /// Require a digit.
    pub require_numbers: bool,
    /// Require one of `!@#$%^&*(),.?":{}|<>`.
    pub require_special_chars: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: PASSWORD_MIN_LENGTH,
            require_uppercase: false,
            require_lowercase: false,
            require_numbers: false,
            require_special_chars: false,
        }
    }
}

/// The value must satisfy `policy`. Requirements are checked in order and the
/// first unmet one is reported.
#[must_use]
pub fn password(policy: PasswordPolicy) -> Rule {
    Rule::from_fn(move |v| {
        if v.is_empty() {
            None
        } else if v.chars().count() < policy.min_length {
            Some(format!("Пароль должен содержать минимум {} символов", policy.min_length))
        } else if policy.require_uppercase && !v.chars().any(|c| c.is_ascii_uppercase()) {
            Some("Пароль должен содержать заглавные буквы".to_owned())
        } else if policy.require_lowercase && !v.chars().any(|c| c.is_ascii_lowercase()) {
            Some("Пароль должен содержать строчные буквы".to_owned())
        } else if policy.require_numbers && !v.chars().any(|c| c.is_ascii_digit()) {
            Some("Пароль должен содержать цифры".to_owned())
        } else if policy.require_special_chars && !v.chars().any(|c| "!@#$%^&*(),.?\":{}|<>".contains(c)) {
            Some("Пароль должен содержать специальные символы".to_owned())
        } else {
            None
        }
    })
}

/// The digits of the value must form a phone number.
#[must_use]
pub fn phone() -> Rule {
    Rule::new(
        |v| v.is_empty() || PHONE_RE.is_match(&digits(v)),
        "Введите корректный номер телефона",
    )
}

/// The digits of the value must form a 10- or 12-digit taxpayer number.
#[must_use]
pub fn inn() -> Rule {
    Rule::new(
        |v| v.is_empty() || INN_RE.is_match(&digits(v)),
        "ИНН должен содержать 10 или 12 цифр",
    )
}

/// The value must be a number.
#[must_use]
pub fn number() -> Rule {
    Rule::new(|v| v.is_empty() || parse_number(v).is_some(), "Введите корректное число")
}

/// The value must be a number greater than zero.
#[must_use]
pub fn positive_number() -> Rule {
    Rule::new(
        |v| v.is_empty() || parse_number(v).is_some_and(|n| n > 0.0),
        "Число должно быть положительным",
    )
}

/// The value must be a whole number.
#[must_use]
pub fn integer() -> Rule {
    Rule::new(
        |v| v.is_empty() || parse_number(v).is_some_and(|n| n.is_finite() && n.fract() == 0.0),
        "Введите целое число",
    )
}

/// The value must be a number within `min..=max`.
#[must_use]
pub fn range(min: f64, max: f64) -> Rule {
    Rule::new(
        move |v| v.is_empty() || parse_number(v).is_some_and(|n| (min..=max).contains(&n)),
        format!("Значение должно быть от {min} до {max}"),
    )
}

/// The value must be a date.
#[must_use]
pub fn date() -> Rule {
    Rule::new(|v| v.is_empty() || parse_date(v).is_some(), "Введите корректную дату")
}

/// The value must be a date after `now`.
#[must_use]
pub fn future_date(now: DateTime<Utc>) -> Rule {
    Rule::new(
        move |v| v.is_empty() || parse_date(v).is_some_and(|d| d > now),
        "Дата должна быть в будущем",
    )
}

/// The value must be a date before `now`.
#[must_use]
pub fn past_date(now: DateTime<Utc>) -> Rule {
    Rule::new(
        move |v| v.is_empty() || parse_date(v).is_some_and(|d| d < now),
        "Дата должна быть в прошлом",
    )
}

/// The value must be an absolute URL.
#[must_use]
pub fn url() -> Rule {
    Rule::new(|v| v.is_empty() || URL_RE.is_match(v), "Введите корректный URL")
}

/// The value must match `regex`.
#[must_use]
pub fn pattern(regex: Regex) -> Rule {
    Rule::new(move |v| v.is_empty() || regex.is_match(v), "Неверный формат")
}

/// The value must satisfy an arbitrary predicate.
#[must_use]
pub fn custom<F>(passes: F) -> Rule
where
    F: Fn(&str) -> bool + Send + Sync + 'static,
{
    Rule::new(passes, "Неверное значение")
}

/// The value must equal the original password.
#[must_use]
pub fn confirm_password(original: impl Into<String>) -> Rule {
    let original = original.into();
    Rule::new(move |v| v.is_empty() || v == original, "Пароли не совпадают")
}

/// The value must be an inventory number, `INV-YYYYMMDD-NNNN`.
#[must_use]
pub fn inventory_number() -> Rule {
    Rule::new(
        |v| v.is_empty() || INVENTORY_RE.is_match(v),
        "Неверный формат инвентарного номера",
    )
}

/// Runs `rules` in order and reports the first failure.
#[must_use]
pub fn combine(rules: impl IntoIterator<Item = Rule>) -> Rule {
    let rules: Vec<Rule> = rules.into_iter().collect();
    Rule::from_fn(move |v| rules.iter().find_map(|rule| rule.check(v)))
}

/// Rules per field.
#[derive(Debug, Default)]
pub struct FormSchema {
    fields: Vec<(String, Vec<Rule>)>,
}

impl FormSchema {
    /// Creates an empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds rules for `name`, checked in order.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, rules: impl IntoIterator<Item = Rule>) -> Self {
        self.fields.push((name.into(), rules.into_iter().collect()));
        self
    }
}

/// Validates form `data` against `schema`. Missing fields are checked as empty.
#[must_use]
pub fn validate_form(data: &FxHashMap<String, String>, schema: &FormSchema) -> ValidationReport {
    let mut report = ValidationReport::new();
    for (field, rules) in &schema.fields {
        let value = data.get(field).map_or("", String::as_str);
        if let Some(message) = rules.iter().find_map(|rule| rule.check(value)) {
            report.add(field.clone(), message);
        }
    }
    report
}

/// Metadata of a file chosen for upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    /// File name.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    /// MIME type, when known.
    pub content_type: Option<String>,
}

/// Checks that `file` is at most `max_bytes` long.
#[must_use]
pub fn file_size(file: &FileInfo, max_bytes: u64) -> Option<String> {
    (file.size > max_bytes).then(|| {
        let megabytes = (max_bytes as f64 / 1024.0 / 1024.0).round();
        format!("Размер файла не должен превышать {megabytes} МБ")
    })
}

/// Checks that the MIME type of `file` is one of `allowed`. Unknown types pass.
#[must_use]
pub fn file_type(file: &FileInfo, allowed: &[&str]) -> Option<String> {
    match &file.content_type {
        Some(kind) if !allowed.contains(&kind.as_str()) => Some("Неподдерживаемый тип файла".to_owned()),
        _ => None,
    }
}
