use std::{
    collections::{BTreeSet, HashMap},
    sync::LazyLock,
};

use regex::Regex;

static PHONE_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\+[1-9]\d{1,14}$").expect("phone number pattern is valid")
});

static EMAIL_ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
        .expect("email address pattern is valid")
});

const MAX_SUBJECT_CHARS: usize = 200;

/// Replaces every `{key}` whose key is in `params` with its value. Unknown
/// placeholders stay as they are, and substituted values are never scanned
/// again.
pub fn render_template(template: &str, params: &HashMap<String, String>) -> String {
    if template.is_empty() || params.is_empty() {
        return template.to_string();
    }

    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        rendered.push_str(&rest[..open]);
        let candidate = &rest[open + 1..];

        let replacement = candidate
            .find('}')
            .and_then(|close| params.get(&candidate[..close]).map(|value| (close, value)));

        match replacement {
            Some((close, value)) => {
                rendered.push_str(value);
                rest = &candidate[close + 1..];
            }
            None => {
                rendered.push('{');
                rest = candidate;
            }
        }
    }

    rendered.push_str(rest);
    rendered
}

/// Keys of `{key}` placeholders in `template` that have no entry in `params`.
pub fn find_missing_parameters(
    template: &str,
    params: &HashMap<String, String>,
) -> BTreeSet<String> {
    let mut missing = BTreeSet::new();
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        let candidate = &rest[open + 1..];

        let Some(close) = candidate.find('}') else {
            break;
        };

        let key = &candidate[..close];

        if key.contains('{') {
            rest = candidate;
            continue;
        }

        if !key.is_empty() && !params.contains_key(key) {
            missing.insert(key.to_string());
        }

        rest = &candidate[close + 1..];
    }

    missing
}

/// Strips spaces, dashes, parentheses and dots, then makes sure the number
/// starts with `+`. Does not check the result.
pub fn clean_phone_number(phone: &str) -> String {
    let cleaned: String = phone
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '.'))
        .collect();

    if cleaned.starts_with('+') {
        cleaned
    } else {
        format!("+{}", cleaned)
    }
}

/// E.164: a `+`, a non-zero digit, then at most 14 more digits.
pub fn is_valid_phone_number(phone: &str) -> bool {
    PHONE_NUMBER.is_match(phone)
}

pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    !email.is_empty() && EMAIL_ADDRESS.is_match(email)
}

pub fn format_email_address(email: &str, name: &str) -> String {
    if name.is_empty() {
        email.to_string()
    } else {
        format!("{} <{}>", name, email)
    }
}

/// Flattens line breaks and tabs so the subject cannot inject headers, and
/// caps its length.
pub fn sanitize_subject(subject: &str) -> String {
    let flattened = subject.replace(['\n', '\r', '\t'], " ");
    let trimmed = flattened.trim();

    if trimmed.chars().count() > MAX_SUBJECT_CHARS {
        let truncated: String = trimmed.chars().take(MAX_SUBJECT_CHARS - 3).collect();
        format!("{}...", truncated)
    } else {
        trimmed.to_string()
    }
}

/// Language part of a locale: `en_US` and `en-US` both give `en`. An empty
/// locale defaults to English.
pub fn language_code(locale: &str) -> String {
    if locale.is_empty() {
        return "en".to_string();
    }

    locale
        .split(['_', '-'])
        .next()
        .filter(|code| !code.is_empty())
        .unwrap_or("en")
        .to_string()
}
