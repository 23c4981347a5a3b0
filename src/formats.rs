//! The `format` keyword: dispatch table and built-in validators.
//!
//! Formats are looked up by name in a process-wide table and consulted
//! only when the caller opts in via
//! [`validate_format`](crate::ValidateOpts::validate_format); an
//! unregistered format always matches, as the specification requires of
//! format-annotation vocabularies. The built-ins cover the 2020-12
//! format registry; [`register_format`] adds or replaces entries.

use std::{
    net::{Ipv4Addr, Ipv6Addr},
    sync::RwLock,
};

use ahash::AHashMap;
use email_address::EmailAddress;
use fancy_regex::Regex;
use fluent_uri::{Uri, UriRef};
use once_cell::sync::Lazy;
use serde_json::Value;
use uuid_simd::{parse_hyphenated, Out};

use crate::{arg::Arg, error::EvalError, keywords::arg_mismatch, state::ValidationState};

/// A format validator. Formats apply to strings only; other instance
/// types pass without being inspected.
pub type FormatFn = fn(&str) -> bool;

static FORMATS: Lazy<RwLock<AHashMap<String, FormatFn>>> = Lazy::new(|| {
    let builtins: &[(&str, FormatFn)] = &[
        ("date", is_valid_date),
        ("time", is_valid_time),
        ("date-time", is_valid_datetime),
        ("duration", is_valid_duration),
        ("email", is_valid_email),
        ("idn-email", is_valid_email),
        ("hostname", is_valid_hostname),
        // Internationalized hostnames currently get the ASCII rules;
        // see DESIGN.md.
        ("idn-hostname", is_valid_hostname),
        ("ipv4", is_valid_ipv4),
        ("ipv6", is_valid_ipv6),
        ("uri", is_valid_uri),
        ("uri-reference", is_valid_uri_reference),
        ("iri", is_valid_iri),
        ("iri-reference", is_valid_iri_reference),
        ("uuid", is_valid_uuid),
        ("uri-template", is_valid_uri_template),
        ("json-pointer", is_valid_json_pointer),
        ("relative-json-pointer", is_valid_relative_json_pointer),
        ("regex", is_valid_regex),
    ];
    let mut table = AHashMap::with_capacity(builtins.len());
    for (name, validator) in builtins {
        table.insert((*name).to_string(), *validator);
    }
    RwLock::new(table)
});

/// Registers a format validator, replacing any existing one of the same
/// name.
pub fn register_format(name: &str, validator: FormatFn) {
    FORMATS
        .write()
        .expect("format registry poisoned")
        .insert(name.to_string(), validator);
}

fn lookup(name: &str) -> Option<FormatFn> {
    FORMATS
        .read()
        .expect("format registry poisoned")
        .get(name)
        .copied()
}

/// The `format` keyword validator.
pub fn validate_format(
    arg: &Arg,
    instance: &Value,
    state: &mut ValidationState<'_>,
) -> Result<(), EvalError> {
    if !state.opts.validate_format {
        return Ok(());
    }
    let Arg::String(name) = arg else {
        return Err(arg_mismatch("format", arg));
    };
    let Value::String(s) = instance else {
        return Ok(());
    };
    match lookup(name) {
        None => Ok(()),
        Some(validator) if validator(s) => Ok(()),
        Some(_) => Err(EvalError::fail(format!(
            "{s:?} is not a valid {name:?}"
        ))),
    }
}

fn all_digits(s: &[u8]) -> bool {
    !s.is_empty() && s.iter().all(u8::is_ascii_digit)
}

fn parse_2digit(s: &[u8]) -> Option<u32> {
    if s.len() == 2 && all_digits(s) {
        Some(u32::from(s[0] - b'0') * 10 + u32::from(s[1] - b'0'))
    } else {
        None
    }
}

fn is_valid_date(date: &str) -> bool {
    let bytes = date.as_bytes();
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return false;
    }
    if !all_digits(&bytes[..4]) {
        return false;
    }
    let year: u32 = match date[..4].parse() {
        Ok(y) => y,
        Err(_) => return false,
    };
    let (Some(month), Some(day)) = (parse_2digit(&bytes[5..7]), parse_2digit(&bytes[8..10]))
    else {
        return false;
    };
    if !(1..=12).contains(&month) || day == 0 {
        return false;
    }
    let leap = year % 4 == 0 && (year % 100 != 0 || year % 400 == 0);
    let max_day = match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        _ if leap => 29,
        _ => 28,
    };
    day <= max_day
}

fn is_valid_time(time: &str) -> bool {
    let bytes = time.as_bytes();
    // Shortest valid form is 09:00:00Z.
    if bytes.len() < 9 {
        return false;
    }

    // Split off the offset: trailing Z, or +hh:mm / -hh:mm.
    let (clock, offset) = match bytes[bytes.len() - 1] {
        b'Z' | b'z' => (&time[..time.len() - 1], None),
        _ => {
            let Some(pos) = time.rfind(['+', '-']) else {
                return false;
            };
            (&time[..pos], Some(&time[pos + 1..]))
        }
    };
    if let Some(offset) = offset {
        let b = offset.as_bytes();
        if b.len() != 5 || b[2] != b':' {
            return false;
        }
        let (Some(oh), Some(om)) = (parse_2digit(&b[..2]), parse_2digit(&b[3..5])) else {
            return false;
        };
        if oh > 23 || om > 59 {
            return false;
        }
    }

    // hh:mm:ss with optional fraction.
    let (hms, fraction) = match clock.split_once('.') {
        Some((hms, fraction)) => (hms, Some(fraction)),
        None => (clock, None),
    };
    if let Some(fraction) = fraction {
        if !all_digits(fraction.as_bytes()) {
            return false;
        }
    }
    let b = hms.as_bytes();
    if b.len() != 8 || b[2] != b':' || b[5] != b':' {
        return false;
    }
    let (Some(h), Some(m), Some(s)) = (
        parse_2digit(&b[..2]),
        parse_2digit(&b[3..5]),
        parse_2digit(&b[6..8]),
    ) else {
        return false;
    };
    // 60 covers leap seconds.
    h < 24 && m < 60 && s <= 60
}

fn is_valid_datetime(s: &str) -> bool {
    match s.split_once(['T', 't']) {
        Some((date, time)) => is_valid_date(date) && is_valid_time(time),
        None => false,
    }
}

static DURATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^P(?:\d+W|(?=\d|T)(?:\d+Y)?(?:\d+M)?(?:\d+D)?(?:T(?=\d)(?:\d+H)?(?:\d+M)?(?:\d+S)?)?)$")
        .expect("is a valid regex")
});

fn is_valid_duration(s: &str) -> bool {
    DURATION_RE.is_match(s).unwrap_or(false)
}

fn is_valid_email(s: &str) -> bool {
    s.parse::<EmailAddress>().is_ok()
}

fn is_valid_hostname(s: &str) -> bool {
    let host = s.strip_suffix('.').unwrap_or(s);
    if host.is_empty() || host.len() > 253 {
        return false;
    }
    host.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
            && !label.starts_with('-')
            && !label.ends_with('-')
    })
}

fn is_valid_ipv4(s: &str) -> bool {
    s.parse::<Ipv4Addr>().is_ok()
}

fn is_valid_ipv6(s: &str) -> bool {
    s.parse::<Ipv6Addr>().is_ok()
}

fn is_valid_uri(s: &str) -> bool {
    Uri::parse(s).is_ok()
}

fn is_valid_uri_reference(s: &str) -> bool {
    UriRef::parse(s).is_ok()
}

/// IRIs allow unencoded non-ASCII characters where URIs demand
/// percent-encoding; encoding them first reuses the URI parser.
fn ascii_encoded(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if c.is_ascii() {
            out.push(c);
        } else {
            let mut buf = [0u8; 4];
            for b in c.encode_utf8(&mut buf).bytes() {
                out.push_str(&format!("%{b:02X}"));
            }
        }
    }
    out
}

fn is_valid_iri(s: &str) -> bool {
    is_valid_uri(&ascii_encoded(s))
}

fn is_valid_iri_reference(s: &str) -> bool {
    is_valid_uri_reference(&ascii_encoded(s))
}

fn is_valid_uuid(s: &str) -> bool {
    let mut out = [0; 16];
    parse_hyphenated(s.as_bytes(), Out::from_mut(&mut out)).is_ok()
}

static URI_TEMPLATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^(?:(?:[^\x00-\x20"'<>%\\^`{|}]|%[0-9a-f]{2})|\{[+#./;?&=,!@|]?(?:[a-z0-9_]|%[0-9a-f]{2})+(?::[1-9][0-9]{0,3}|\*)?(?:,(?:[a-z0-9_]|%[0-9a-f]{2})+(?::[1-9][0-9]{0,3}|\*)?)*})*\z"#,
    )
    .expect("is a valid regex")
});

fn is_valid_uri_template(s: &str) -> bool {
    URI_TEMPLATE_RE.is_match(s).unwrap_or(false)
}

static JSON_POINTER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(/(([^/~])|(~[01]))*)*\z").expect("is a valid regex"));

fn is_valid_json_pointer(s: &str) -> bool {
    JSON_POINTER_RE.is_match(s).unwrap_or(false)
}

static RELATIVE_JSON_POINTER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:0|[1-9][0-9]*)(?:#|(?:/(?:[^~/]|~0|~1)*)*)\z").expect("is a valid regex")
});

fn is_valid_relative_json_pointer(s: &str) -> bool {
    RELATIVE_JSON_POINTER_RE.is_match(s).unwrap_or(false)
}

fn is_valid_regex(s: &str) -> bool {
    Regex::new(s).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Schema, ValidateOpts};
    use serde_json::json;
    use test_case::test_case;

    #[test_case("2024-02-29", true; "leap day")]
    #[test_case("2023-02-29", false; "not a leap year")]
    #[test_case("2024-13-01", false)]
    #[test_case("2024-00-10", false)]
    #[test_case("2024-1-10", false)]
    fn date(s: &str, valid: bool) {
        assert_eq!(is_valid_date(s), valid);
    }

    #[test_case("23:59:59Z", true)]
    #[test_case("23:59:60Z", true; "leap second")]
    #[test_case("12:00:00.123+05:30", true)]
    #[test_case("24:00:00Z", false)]
    #[test_case("12:00:00", false; "missing offset")]
    fn time(s: &str, valid: bool) {
        assert_eq!(is_valid_time(s), valid);
    }

    #[test_case("2024-06-01T10:20:30Z", true)]
    #[test_case("2024-06-01 10:20:30Z", false)]
    fn datetime(s: &str, valid: bool) {
        assert_eq!(is_valid_datetime(s), valid);
    }

    #[test_case("P1Y2M3DT4H5M6S", true)]
    #[test_case("P4W", true)]
    #[test_case("PT20M", true)]
    #[test_case("P", false)]
    #[test_case("P1YT", false)]
    fn duration(s: &str, valid: bool) {
        assert_eq!(is_valid_duration(s), valid);
    }

    #[test_case("example.com", true)]
    #[test_case("a-b.c0", true)]
    #[test_case("-leading.example", false)]
    #[test_case("under_score.example", false)]
    fn hostname(s: &str, valid: bool) {
        assert_eq!(is_valid_hostname(s), valid);
    }

    #[test_case("192.168.0.1", true)]
    #[test_case("192.168.0.256", false)]
    #[test_case("::1", false)]
    fn ipv4(s: &str, valid: bool) {
        assert_eq!(is_valid_ipv4(s), valid);
    }

    #[test]
    fn uuid() {
        assert!(is_valid_uuid("c7f1ae8f-16a1-4b2f-9a54-88b4b7d0d2fe"));
        assert!(!is_valid_uuid("c7f1ae8f16a14b2f9a5488b4b7d0d2fe"));
    }

    #[test]
    fn json_pointers() {
        assert!(is_valid_json_pointer("/a/b~0c/~1"));
        assert!(!is_valid_json_pointer("a/b"));
        assert!(is_valid_relative_json_pointer("2/a"));
        assert!(!is_valid_relative_json_pointer("/a"));
    }

    #[test]
    fn format_is_opt_in() {
        let schema = Schema::from_value(&json!({"format": "ipv4"})).unwrap();
        // validate() checks formats.
        assert!(!schema.is_valid(&json!("not an ip")));

        // With checking off the same instance passes.
        let mut instance = json!("not an ip");
        let opts = ValidateOpts::default();
        assert!(schema.validate_with_opts(&mut instance, &opts).is_ok());
    }

    #[test]
    fn unknown_formats_match() {
        let schema = Schema::from_value(&json!({"format": "x-custom"})).unwrap();
        assert!(schema.is_valid(&json!("anything")));
    }

    #[test]
    fn custom_formats_can_be_registered() {
        register_format("even-length", |s| s.len() % 2 == 0);
        let schema = Schema::from_value(&json!({"format": "even-length"})).unwrap();
        assert!(schema.is_valid(&json!("ab")));
        assert!(!schema.is_valid(&json!("abc")));
    }
}
