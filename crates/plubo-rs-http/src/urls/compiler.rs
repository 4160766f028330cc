//! Path template compilation.
//!
//! [`compile`] turns a template such as `client/{client_id:number}` into a
//! regular expression plus the ordered list of its placeholders. The
//! placeholder order is the contract used to zip the host's positional
//! captures back into named arguments.
//!
//! Two output modes exist because the two host subsystems consume matches
//! differently:
//!
//! - [`CompileMode::Rewrite`]: each placeholder becomes one positional group,
//!   `(fragment)`. Groups nested inside custom patterns are counted so each
//!   placeholder knows its 1-based group index.
//! - [`CompileMode::NamedCapture`]: each placeholder becomes
//!   `(?P<name>fragment)`, for REST routes.
//!
//! A `{segment}` without a `:type` is not a placeholder; it stays in the
//! pattern as literal text (braces escaped). An unclosed `{` is left as is.
//! Literal path text is otherwise copied verbatim, as the host treats the
//! whole path as a regular expression.

use std::fmt::Write as _;

use regex::Regex;

use plubo_rs_core::{ArgumentMap, PluboError, PluboResult};

use super::vocabulary;

/// How placeholders are turned into groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileMode {
    /// Positional groups, consumed by index (page-style rewrite rules).
    Rewrite,
    /// Named groups, consumed by name (REST routes).
    NamedCapture,
}

/// One `{name:type}` placeholder found in a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    /// The argument name.
    pub name: String,
    /// The type token as written in the template.
    pub type_token: String,
    /// The regex fragment the token resolved to.
    pub fragment: String,
    /// The 1-based capture group index in [`CompileMode::Rewrite`] output.
    pub group_index: Option<usize>,
}

impl Placeholder {
    /// Returns `true` if the type token was used as a custom regular expression.
    pub fn is_custom(&self) -> bool {
        !vocabulary::is_known(&self.type_token)
    }
}

/// The result of compiling a path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledPath {
    path: String,
    pattern: String,
    mode: CompileMode,
    placeholders: Vec<Placeholder>,
}

impl CompiledPath {
    /// Returns the cleaned template (whitespace and outer slashes trimmed).
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the unanchored pattern.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Returns the pattern anchored at both ends, as installed into the host.
    pub fn anchored(&self) -> String {
        format!("^{}$", self.pattern)
    }

    /// Returns the mode the template was compiled in.
    pub const fn mode(&self) -> CompileMode {
        self.mode
    }

    /// Returns the placeholders in left-to-right order.
    pub fn placeholders(&self) -> &[Placeholder] {
        &self.placeholders
    }

    /// Returns the placeholder names in left-to-right order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.placeholders.iter().map(|p| p.name.as_str())
    }

    /// Returns the total number of capturing groups in a rewrite-mode pattern.
    pub fn group_count(&self) -> usize {
        self.placeholders
            .last()
            .and_then(|p| p.group_index.map(|i| i + nested_groups(&p.fragment)))
            .unwrap_or(0)
    }

    /// Compiles the anchored pattern.
    ///
    /// # Errors
    ///
    /// Returns [`PluboError::ImproperlyConfigured`] if the pattern is not
    /// something the `regex` crate accepts. Lookarounds are valid in the
    /// host's dialect but fail here.
    pub fn regex(&self) -> PluboResult<Regex> {
        Regex::new(&self.anchored()).map_err(|e| {
            PluboError::ImproperlyConfigured(format!(
                "Path '{}' compiles to an invalid pattern: {e}",
                self.path
            ))
        })
    }

    /// Matches a request path (outer slashes ignored) and extracts the arguments.
    ///
    /// Returns `Ok(None)` when the path does not match.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern itself is invalid.
    pub fn match_path(&self, path: &str) -> PluboResult<Option<ArgumentMap>> {
        let re = self.regex()?;
        let Some(captures) = re.captures(clean_path(path)) else {
            return Ok(None);
        };
        let args = self
            .placeholders
            .iter()
            .map(|p| {
                let value = match self.mode {
                    CompileMode::Rewrite => p.group_index.and_then(|i| captures.get(i)),
                    CompileMode::NamedCapture => captures.name(&p.name),
                };
                (p.name.clone(), value.map(|m| m.as_str().to_string()))
            })
            .collect();
        Ok(Some(args))
    }
}

/// Trims surrounding whitespace and path separators.
pub fn clean_path(path: &str) -> &str {
    path.trim().trim_matches('/')
}

/// Compiles a path template.
///
/// # Examples
///
/// ```
/// use plubo_rs_http::urls::compiler::{compile, CompileMode};
///
/// let compiled = compile("orders/{id:number}", CompileMode::NamedCapture);
/// assert_eq!(compiled.pattern(), "orders/(?P<id>[0-9]+)");
/// ```
pub fn compile(template: &str, mode: CompileMode) -> CompiledPath {
    let path = clean_path(template);
    let mut pattern = String::with_capacity(path.len());
    let mut placeholders = Vec::new();
    let mut next_group = 1;
    let mut rest = path;

    while let Some((open, close)) = next_segment(rest) {
        pattern.push_str(&rest[..open]);
        let inner = &rest[open + 1..close];

        if let Some((name, token)) = inner.split_once(':') {
            let fragment = vocabulary::resolve(token);
            let group_index = match mode {
                CompileMode::Rewrite => {
                    write!(pattern, "({fragment})").ok();
                    let index = next_group;
                    next_group += 1 + nested_groups(fragment);
                    Some(index)
                }
                CompileMode::NamedCapture => {
                    write!(pattern, "(?P<{name}>{fragment})").ok();
                    None
                }
            };
            placeholders.push(Placeholder {
                name: name.to_string(),
                type_token: token.to_string(),
                fragment: fragment.to_string(),
                group_index,
            });
        } else {
            pattern.push_str(&regex::escape(&rest[open..=close]));
        }

        rest = &rest[close + 1..];
    }
    pattern.push_str(rest);

    tracing::trace!(template, pattern = %pattern, placeholders = placeholders.len(), "compiled path");

    CompiledPath {
        path: path.to_string(),
        pattern,
        mode,
        placeholders,
    }
}

/// Finds the next `{...}` segment with a non-empty body on a single line.
///
/// Returns the byte offsets of the opening and closing braces.
fn next_segment(s: &str) -> Option<(usize, usize)> {
    let mut from = 0;
    while let Some(rel) = s[from..].find('{') {
        let open = from + rel;
        let body_start = open + 1;
        // At least one character of body, which may itself be a '}'.
        let mut chars = s[body_start..].char_indices();
        match chars.next() {
            Some((_, '\n')) | None => {}
            Some(_) => {
                for (offset, c) in chars {
                    match c {
                        '\n' => break,
                        '}' => return Some((open, body_start + offset)),
                        _ => {}
                    }
                }
            }
        }
        from = body_start;
    }
    None
}

/// Counts the capturing groups a custom fragment contributes on its own.
///
/// The fragment is lexed rather than compiled, since the host's regex
/// dialect accepts lookarounds the `regex` crate rejects. Escaped and
/// bracketed parentheses are literal. `(?` opens a non-capturing construct
/// unless it names the group: `(?P<n>`, `(?<n>` and `(?'n'` capture while
/// `(?<=` and `(?<!` do not.
fn nested_groups(fragment: &str) -> usize {
    let bytes = fragment.as_bytes();
    let mut count = 0;
    let mut in_class = false;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 1,
            b'[' if !in_class => {
                in_class = true;
                // A leading `]` (after an optional `^`) is a literal member.
                if bytes.get(i + 1) == Some(&b'^') {
                    i += 1;
                }
                if bytes.get(i + 1) == Some(&b']') {
                    i += 1;
                }
            }
            b']' if in_class => in_class = false,
            b'(' if !in_class => {
                if bytes.get(i + 1) != Some(&b'?') || names_group(&bytes[i + 2..]) {
                    count += 1;
                }
            }
            _ => {}
        }
        i += 1;
    }
    count
}

/// Whether the text after `(?` starts a named capturing group.
fn names_group(rest: &[u8]) -> bool {
    match rest {
        [b'P', b'<', ..] | [b'\'', ..] => true,
        [b'<', next, ..] => !matches!(next, b'=' | b'!'),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_template() {
        let c = compile("  /about/team/ ", CompileMode::Rewrite);
        assert_eq!(c.path(), "about/team");
        assert_eq!(c.pattern(), "about/team");
        assert_eq!(c.anchored(), "^about/team$");
        assert!(c.placeholders().is_empty());
        assert_eq!(c.group_count(), 0);
        assert!(c.match_path("/about/team/").unwrap().unwrap().is_empty());
    }

    #[test]
    fn test_placeholders_keep_order() {
        let c = compile(
            "shop/{category:slug}/{year:year}/{id:number}",
            CompileMode::Rewrite,
        );
        assert_eq!(c.names().collect::<Vec<_>>(), vec!["category", "year", "id"]);
        assert_eq!(
            c.placeholders()
                .iter()
                .map(|p| p.group_index)
                .collect::<Vec<_>>(),
            vec![Some(1), Some(2), Some(3)]
        );
        assert_eq!(c.pattern(), r"shop/([a-z0-9-]+)/(\d{4})/([0-9]+)");
    }

    #[test]
    fn test_unknown_type_is_custom_regex() {
        let c = compile("code/{code:[A-Z]{2}}", CompileMode::Rewrite);
        // The scan stops at the first closing brace.
        assert_eq!(c.placeholders()[0].type_token, "[A-Z]{2");
        assert!(c.placeholders()[0].is_custom());

        let c = compile("ref/{ref:[A-Z]+}", CompileMode::Rewrite);
        assert_eq!(c.pattern(), "ref/([A-Z]+)");
        let args = c.match_path("ref/ABC").unwrap().unwrap();
        assert_eq!(args.get("ref"), Some("ABC"));
    }

    #[test]
    fn test_nested_groups_shift_indices() {
        let c = compile("{kind:(post|page)}/{id:number}", CompileMode::Rewrite);
        assert_eq!(c.placeholders()[0].group_index, Some(1));
        assert_eq!(c.placeholders()[1].group_index, Some(3));
        assert_eq!(c.group_count(), 3);
        let args = c.match_path("page/12").unwrap().unwrap();
        assert_eq!(args.get("kind"), Some("page"));
        assert_eq!(args.get("id"), Some("12"));
    }

    #[test]
    fn test_untyped_segment_stays_literal() {
        let c = compile("docs/{version}/{page:slug}", CompileMode::Rewrite);
        assert_eq!(c.names().collect::<Vec<_>>(), vec!["page"]);
        assert_eq!(c.pattern(), r"docs/\{version\}/([a-z0-9-]+)");
        assert!(c.match_path("docs/{version}/intro").unwrap().is_some());
        assert!(c.match_path("docs/v2/intro").unwrap().is_none());
    }

    #[test]
    fn test_unclosed_brace_is_literal() {
        let c = compile("broken/{id:number", CompileMode::Rewrite);
        assert!(c.placeholders().is_empty());
        assert_eq!(c.pattern(), "broken/{id:number");
    }

    #[test]
    fn test_empty_braces_are_skipped() {
        let c = compile("a/{}/{id:number}", CompileMode::Rewrite);
        // "{}/{id:number}" is the first segment: its body is "}/{id:number".
        assert_eq!(c.placeholders().len(), 1);
        assert_eq!(c.placeholders()[0].name, "}/{id");
    }

    #[test]
    fn test_named_capture_mode() {
        let c = compile("/orders/{id:number}/items/{sku:alphanumeric}/", CompileMode::NamedCapture);
        assert_eq!(
            c.pattern(),
            "orders/(?P<id>[0-9]+)/items/(?P<sku>[a-zA-Z0-9]+)"
        );
        assert!(c.placeholders().iter().all(|p| p.group_index.is_none()));
        let args = c.match_path("orders/5/items/AB12").unwrap().unwrap();
        assert_eq!(args.get("id"), Some("5"));
        assert_eq!(args.get("sku"), Some("AB12"));
    }

    #[test]
    fn test_group_count_skips_non_capturing_constructs() {
        let cases = [
            ("[a-z]+", 0),
            ("(post|page)", 1),
            ("(?:post|page)", 0),
            ("(?!admin)[a-z]+", 0),
            ("(?=x)(?<=y)(?<!z)", 0),
            ("(?P<a>x)(?<b>y)(?'c'z)", 3),
            (r"\(literal\)", 0),
            (r"[(][^)]+[)]", 0),
            ("[]()]+(x)", 1),
            ("((a)(?:b))", 2),
        ];
        for (fragment, groups) in cases {
            assert_eq!(nested_groups(fragment), groups, "{fragment}");
        }
    }

    #[test]
    fn test_lookahead_fragment_keeps_group_indices() {
        let c = compile("user/{slug:(?!admin)[a-z]+}/{id:number}", CompileMode::Rewrite);
        assert_eq!(c.names().collect::<Vec<_>>(), vec!["slug", "id"]);
        assert_eq!(c.pattern(), "user/((?!admin)[a-z]+)/([0-9]+)");
        assert_eq!(
            c.placeholders()
                .iter()
                .map(|p| p.group_index)
                .collect::<Vec<_>>(),
            vec![Some(1), Some(2)]
        );
        assert_eq!(c.group_count(), 2);
        // Valid for the host, but beyond what the `regex` crate parses.
        assert!(matches!(c.regex(), Err(PluboError::ImproperlyConfigured(_))));
    }

    #[test]
    fn test_invalid_custom_pattern_still_records_placeholder() {
        let c = compile("x/{bad:(unclosed}/{id:number}", CompileMode::Rewrite);
        assert_eq!(c.names().collect::<Vec<_>>(), vec!["bad", "id"]);
        assert!(matches!(c.regex(), Err(PluboError::ImproperlyConfigured(_))));
    }

    #[test]
    fn test_mismatch_returns_none() {
        let c = compile("client/{client_id:number}", CompileMode::Rewrite);
        assert!(c.match_path("client/abc").unwrap().is_none());
        assert!(c.match_path("client/42/extra").unwrap().is_none());
        let args = c.match_path("client/42").unwrap().unwrap();
        assert_eq!(args.keys().collect::<Vec<_>>(), vec!["client_id"]);
        assert_eq!(args.get("client_id"), Some("42"));
    }
}
