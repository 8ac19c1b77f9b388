//! Input format rules. Each rule is a pure function returning the violation
//! message, so handlers can collect every failure into one response.

use std::sync::LazyLock;

use regex::Regex;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[\w!#$%&'*+/=?`{|}~^-]+(?:\.[\w!#$%&'*+/=?`{|}~^-]+)*@(?:[A-Za-z0-9-]+\.)+[A-Za-z]{2,6}$",
    )
    .unwrap()
});

static NAME_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z-]{3,25}$").unwrap());

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]{3,18}[A-Za-z0-9]$").unwrap());

const PASSWORD_SPECIALS: &str = "!@#&()-[{}]:;',?/*~$^+=<>";

/// 5-20 chars, alphanumeric at both ends, single `.`/`_`/`-` separators
/// allowed in between (never two in a row).
pub fn validate_username(username: &str) -> Result<(), String> {
    let shape_ok = USERNAME_RE.is_match(username)
        && !username
            .as_bytes()
            .windows(2)
            .any(|pair| pair.iter().all(|&b| matches!(b, b'.' | b'_' | b'-')));
    if shape_ok {
        Ok(())
    } else {
        Err("username must be 5-20 characters, start and end with a letter or digit, \
             and may use single '.', '_' or '-' separators"
            .to_string())
    }
}

pub fn validate_email(email: &str) -> Result<(), String> {
    if EMAIL_RE.is_match(email) {
        Ok(())
    } else {
        Err("email must be a valid address".to_string())
    }
}

/// First and last names: letters and hyphens only.
pub fn validate_name(field: &str, name: &str) -> Result<(), String> {
    if NAME_RE.is_match(name) {
        Ok(())
    } else {
        Err(format!("{field} must be 3-25 letters or hyphens"))
    }
}

/// 8-20 chars with at least one digit, one lowercase, one uppercase and one
/// special character.
pub fn validate_password(field: &str, password: &str) -> Result<(), String> {
    let len = password.chars().count();
    let ok = (8..=20).contains(&len)
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| PASSWORD_SPECIALS.contains(c));
    if ok {
        Ok(())
    } else {
        Err(format!(
            "{field} must be 8-20 characters and contain a digit, a lowercase letter, \
             an uppercase letter and a special character"
        ))
    }
}
