//! Named placeholder types.
//!
//! A placeholder `{name:type}` names one of the tokens below; any other type
//! string is used verbatim as a custom regular expression. None of the
//! fragments contain capturing groups, so the compiler can add exactly one
//! group per placeholder.
//!
//! | Token          | Matches                                     |
//! |----------------|---------------------------------------------|
//! | `digit`        | a single digit                              |
//! | `number`       | one or more digits                          |
//! | `word`         | ASCII letters                               |
//! | `text`         | letters, digits, `-` and `%`                |
//! | `alphanumeric` | letters and digits                          |
//! | `hex`          | hexadecimal digits                          |
//! | `uuid`         | a hyphenated UUID                           |
//! | `file`         | a file path (`/`, word chars, `.` and `-`)  |
//! | `date`         | `YYYY-MM-DD`                                |
//! | `year`         | four digits                                 |
//! | `month`        | `01`..`12`                                  |
//! | `day`          | `01`..`31`                                  |
//! | `ip`           | a dotted IPv4 address                       |
//! | `jwt`          | three dot-separated base64url segments      |
//! | `slug`         | lowercase letters, digits and `-`           |
//! | `email`        | an e-mail address                           |

/// Every token the vocabulary knows, with its fragment.
pub const TOKENS: &[(&str, &str)] = &[
    ("digit", "[0-9]"),
    ("number", "[0-9]+"),
    ("word", "[a-zA-Z]+"),
    ("text", "[A-Za-z0-9%-]+"),
    ("alphanumeric", "[a-zA-Z0-9]+"),
    ("hex", "[a-fA-F0-9]+"),
    (
        "uuid",
        "[a-fA-F0-9]{8}-[a-fA-F0-9]{4}-[a-fA-F0-9]{4}-[a-fA-F0-9]{4}-[a-fA-F0-9]{12}",
    ),
    ("file", r"[/\w.-]+"),
    (
        "date",
        r"\d{4}-(?:0[1-9]|1[0-2])-(?:0[1-9]|[12][0-9]|3[01])",
    ),
    ("year", r"\d{4}"),
    ("month", "(?:0[1-9]|1[0-2])"),
    ("day", "(?:0[1-9]|[12][0-9]|3[01])"),
    ("ip", r"(?:[0-9]{1,3}\.){3}[0-9]{1,3}"),
    ("jwt", r"(?:[\w-]*\.){2}[\w-]*"),
    ("slug", "[a-z0-9-]+"),
    ("email", "[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\\.[A-Za-z]{2,}"),
];

/// Returns the fragment for a type token, or the token itself if it is not
/// a known name.
///
/// # Examples
///
/// ```
/// use plubo_rs_http::urls::vocabulary::resolve;
///
/// assert_eq!(resolve("number"), "[0-9]+");
/// assert_eq!(resolve("[a-z]{2}"), "[a-z]{2}");
/// ```
pub fn resolve(token: &str) -> &str {
    TOKENS
        .iter()
        .find(|(name, _)| *name == token)
        .map_or(token, |&(_, fragment)| fragment)
}

/// Returns `true` if `token` is a vocabulary name rather than a custom pattern.
pub fn is_known(token: &str) -> bool {
    TOKENS.iter().any(|(name, _)| *name == token)
}
