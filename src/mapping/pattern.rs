//! Pattern evaluation for literal and regular-expression mappings.
//!
//! # Responsibilities
//! - Test a mapping's pattern against a candidate path
//! - Compute the destination of a regex mapping by substitution
//!
//! # Design Decisions
//! - The mapping's pattern is matched against the path, never the reverse
//! - Regex matching is case-insensitive and anchored to the whole path
//! - Substitution runs against the full matched URL (path plus query)
//! - Linear-time `regex` engine, so stored patterns cannot trigger
//!   catastrophic backtracking
//! - Compiled patterns are cached process-wide and capped in size

use std::sync::LazyLock;

use dashmap::DashMap;
use regex::{Regex, RegexBuilder};

use crate::mapping::error::ResolveError;
use crate::mapping::rule::{MappingRule, PatternType};

/// Upper bound on the compiled size of a stored pattern.
pub const REGEX_SIZE_LIMIT: usize = 256 * 1024;

/// Cached compilations beyond this many entries are dropped wholesale.
const CACHE_CAPACITY: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Anchoring {
    Full,
    Search,
}

type CompileResult = Result<Regex, regex::Error>;

static COMPILED: LazyLock<DashMap<(Anchoring, String), CompileResult>> =
    LazyLock::new(DashMap::new);

fn build(source: &str) -> CompileResult {
    RegexBuilder::new(source)
        .case_insensitive(true)
        .size_limit(REGEX_SIZE_LIMIT)
        .build()
}

fn cached(anchoring: Anchoring, pattern: &str) -> CompileResult {
    let key = (anchoring, pattern.to_string());
    if let Some(entry) = COMPILED.get(&key) {
        return entry.value().clone();
    }

    let compiled = match anchoring {
        Anchoring::Full => build(&format!("^(?:{pattern})$")),
        Anchoring::Search => build(pattern),
    };
    if COMPILED.len() >= CACHE_CAPACITY {
        COMPILED.clear();
    }
    COMPILED.insert(key, compiled.clone());
    compiled
}

/// Compile a pattern that must match the entire input, case-insensitively.
///
/// Compilations are cached by pattern text, so repeated lookups reuse them.
pub fn compile_full_match(pattern: &str) -> Result<Regex, regex::Error> {
    cached(Anchoring::Full, pattern)
}

fn compile_search(pattern: &str) -> Result<Regex, regex::Error> {
    cached(Anchoring::Search, pattern)
}

fn invalid(rule: &MappingRule, err: regex::Error) -> ResolveError {
    ResolveError::InvalidPattern {
        pattern: rule.pattern.clone(),
        reason: err.to_string(),
    }
}

/// Whether `rule` applies to the canonical `path`.
///
/// Literal rules compare their path component for equality; the query
/// component is checked separately by the matcher.
pub fn matches_path(rule: &MappingRule, path: &str) -> Result<bool, ResolveError> {
    match rule.pattern_type {
        PatternType::Literal => Ok(rule.pattern_path() == path),
        PatternType::Regex => {
            let re = compile_full_match(&rule.pattern).map_err(|e| invalid(rule, e))?;
            Ok(re.is_match(path))
        }
    }
}

/// Replace every match of the rule's pattern in `matched_url` with
/// `destination`, expanding capture-group references.
pub fn substitute(
    rule: &MappingRule,
    destination: &str,
    matched_url: &str,
) -> Result<String, ResolveError> {
    let re = compile_search(&rule.pattern).map_err(|e| invalid(rule, e))?;
    let replacement = expand_backrefs(destination);
    Ok(re.replace_all(matched_url, replacement.as_str()).into_owned())
}

/// Rewrite `$1` and `\1` style references to the unambiguous `${1}` form,
/// so `$1a` means group 1 followed by `a`.
///
/// Only numbered groups are references. Any other `$` is literal text.
pub fn expand_backrefs(destination: &str) -> String {
    let mut out = String::with_capacity(destination.len() + 4);
    let mut chars = destination.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '$' if chars.peek() == Some(&'$') => {
                chars.next();
                out.push_str("$$");
            }
            '$' | '\\' if chars.peek().is_some_and(char::is_ascii_digit) => {
                out.push_str("${");
                while let Some(d) = chars.next_if(char::is_ascii_digit) {
                    out.push(d);
                }
                out.push('}');
            }
            '$' if starts_numbered_brace(chars.clone()) => {
                out.push('$');
                for d in chars.by_ref() {
                    out.push(d);
                    if d == '}' {
                        break;
                    }
                }
            }
            '$' => out.push_str("$$"),
            _ => out.push(c),
        }
    }
    out
}

/// Whether `rest` begins with `{digits}`.
fn starts_numbered_brace(mut rest: impl Iterator<Item = char>) -> bool {
    if rest.next() != Some('{') {
        return false;
    }
    let mut digits = 0;
    for c in rest {
        match c {
            '}' => return digits > 0,
            c if c.is_ascii_digit() => digits += 1,
            _ => return false,
        }
    }
    false
}
