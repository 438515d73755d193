//! Input validation for registration, credentials, and new loans.
//!
//! Each rule is an independent predicate; the `validate_*` entry points run
//! every rule and collect all failures instead of stopping at the first, so
//! the caller can surface the complete list of reasons.

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;

/// Fixed special-character set counted toward password strength.
pub const SPECIAL_CHARS: &str = "!@#$%^&*()-_+=~`[]{}|:;\"'<>,.?/";

/// Known-weak passwords, matched as exact case-sensitive lines.
static WEAK_PASSWORDS: &str = include_str!("../../resources/weak-passwords.txt");

const USERNAME_RULE: &str =
    "Username must be between 3 and 16 characters long and can only contain letters, digits and underscores.";
const FIRST_NAME_RULE: &str =
    "First name must be between 2 and 20 characters long and can only contain letters.";
const LAST_NAME_RULE: &str =
    "Last name must be between 2 and 30 characters long and can only contain letters, with at most one hyphen.";
const PASSWORD_LENGTH_RULE: &str = "Password must be between 8 and 64 characters long.";
const PASSWORD_CHARSET_RULE: &str =
    "Password can only contain letters, digits and special characters.";
const PASSWORD_LETTER_RULE: &str = "Password must contain at least one letter.";
const PASSWORD_DIGIT_RULE: &str = "Password must contain at least one digit.";
const PASSWORD_SPECIAL_RULE: &str = "Password must contain at least one special character.";
const PASSWORD_WEAK_RULE: &str = "Password is too weak.";
const PASSWORDS_MISMATCH_RULE: &str = "Passwords do not match.";
const RECOVERY_RULE: &str = "Recovery password must contain only letters and digits.";
const LOAN_AMOUNT_RULE: &str = "Amount must be a positive number with at most two decimal places.";
const LOAN_DEADLINE_RULE: &str = "Deadline must be a valid date (YYYY-MM-DD) that is not in the past.";

fn get_regex(re: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    re.get_or_init(|| Regex::new(pattern).expect("invalid validation regex"))
}

fn first_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    get_regex(&RE, r"^\p{Lu}\p{Ll}+$")
}

fn last_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    get_regex(&RE, r"^\p{Lu}\p{Ll}+(-\p{Lu}\p{Ll}+)?$")
}

fn amount_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    get_regex(&RE, r"^\d+(\.\d{1,2})?$")
}

fn valid_chars(input: &str, legal: impl Fn(char) -> bool) -> bool {
    input.chars().all(legal)
}

#[must_use]
pub fn validate_username(username: &str) -> bool {
    (3..=16).contains(&username.len())
        && valid_chars(username, |c| c.is_ascii_alphanumeric() || c == '_')
}

/// Names accept any Unicode letters, so diacritics are fine. Length bounds
/// count characters, not bytes.
#[must_use]
pub fn validate_first_name(name: &str) -> bool {
    (2..=20).contains(&name.chars().count()) && first_name_regex().is_match(name)
}

/// Last names allow a single hyphen-joined compound (e.g. `Nowak-Kowalska`).
#[must_use]
pub fn validate_last_name(name: &str) -> bool {
    (2..=30).contains(&name.chars().count()) && last_name_regex().is_match(name)
}

#[must_use]
pub fn is_weak_password(password: &str) -> bool {
    WEAK_PASSWORDS.lines().any(|line| line.trim() == password)
}

/// Runs every password rule, returning all failures.
#[must_use]
pub fn password_failures(password: &str) -> Vec<String> {
    let mut reasons = Vec::new();

    if !(8..=64).contains(&password.len()) {
        reasons.push(PASSWORD_LENGTH_RULE.to_string());
    }
    if !valid_chars(password, |c| {
        c.is_ascii_alphanumeric() || SPECIAL_CHARS.contains(c)
    }) {
        reasons.push(PASSWORD_CHARSET_RULE.to_string());
    }
    if !password.chars().any(|c| c.is_ascii_alphabetic()) {
        reasons.push(PASSWORD_LETTER_RULE.to_string());
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        reasons.push(PASSWORD_DIGIT_RULE.to_string());
    }
    if !password.chars().any(|c| SPECIAL_CHARS.contains(c)) {
        reasons.push(PASSWORD_SPECIAL_RULE.to_string());
    }
    if is_weak_password(password) {
        reasons.push(PASSWORD_WEAK_RULE.to_string());
    }

    reasons
}

#[must_use]
pub fn validate_password(password: &str) -> bool {
    password_failures(password).is_empty()
}

/// Coarse strength score for client feedback: `length x log2(|alphabet|)`
/// over the full letters+digits+specials alphabet. Not a security boundary.
#[must_use]
pub fn entropy_bits(password: &str) -> f64 {
    let alphabet = 26 + 26 + 10 + SPECIAL_CHARS.chars().count();
    #[allow(clippy::cast_precision_loss)]
    let bits_per_char = (alphabet as f64).log2();
    password.chars().count() as f64 * bits_per_char
}

/// All registration failures, empty when the input is acceptable.
#[must_use]
pub fn validate_registration(
    username: &str,
    first_name: &str,
    last_name: &str,
    password: &str,
    repeat_password: &str,
) -> Vec<String> {
    let mut reasons = Vec::new();

    if !validate_username(username) {
        reasons.push(USERNAME_RULE.to_string());
    }
    if !validate_first_name(first_name) {
        reasons.push(FIRST_NAME_RULE.to_string());
    }
    if !validate_last_name(last_name) {
        reasons.push(LAST_NAME_RULE.to_string());
    }
    reasons.extend(password_failures(password));
    if password != repeat_password {
        reasons.push(PASSWORDS_MISMATCH_RULE.to_string());
    }

    reasons
}

#[must_use]
pub fn validate_password_change(new_password: &str, repeat_password: &str) -> Vec<String> {
    let mut reasons = password_failures(new_password);
    if new_password != repeat_password {
        reasons.push(PASSWORDS_MISMATCH_RULE.to_string());
    }
    reasons
}

#[must_use]
pub fn validate_recovery(
    username: &str,
    recovery_password: &str,
    new_password: &str,
    repeat_password: &str,
) -> Vec<String> {
    let mut reasons = Vec::new();

    if !validate_username(username) {
        reasons.push(USERNAME_RULE.to_string());
    }
    if !valid_chars(recovery_password, |c| c.is_ascii_alphanumeric()) {
        reasons.push(RECOVERY_RULE.to_string());
    }
    reasons.extend(password_failures(new_password));
    if new_password != repeat_password {
        reasons.push(PASSWORDS_MISMATCH_RULE.to_string());
    }

    reasons
}

/// Validates raw new-loan input. On success returns the parsed amount and
/// deadline; amount and deadline are immutable after creation so this is the
/// only place they are checked.
pub fn validate_new_loan(
    amount: &str,
    deadline: &str,
    today: NaiveDate,
) -> Result<(f64, NaiveDate), Vec<String>> {
    let mut reasons = Vec::new();

    let parsed_amount = if amount_regex().is_match(amount) {
        amount.parse::<f64>().ok().filter(|a| *a > 0.0)
    } else {
        None
    };
    if parsed_amount.is_none() {
        reasons.push(LOAN_AMOUNT_RULE.to_string());
    }

    let parsed_deadline = NaiveDate::parse_from_str(deadline, "%Y-%m-%d")
        .ok()
        .filter(|d| *d >= today);
    if parsed_deadline.is_none() {
        reasons.push(LOAN_DEADLINE_RULE.to_string());
    }

    match (parsed_amount, parsed_deadline) {
        (Some(a), Some(d)) => Ok((a, d)),
        _ => Err(reasons),
    }
}
