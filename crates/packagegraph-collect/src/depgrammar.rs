//! Dependency-field grammar.
//!
//! ```text
//! field  := clause ("," clause)*
//! clause := alt ("|" alt)*
//! alt    := name [":" arch] ws* ["(" constraint ")"] trailing*
//! ```
//!
//! Only the first alternative of each clause is kept. `alt` is matched as a
//! prefix, so arch restrictions (`[amd64]`) and build profiles (`<!nocheck>`)
//! after the constraint are ignored. A clause that does not start with a
//! name is dropped without error.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyConstraint {
    pub target: String,
    /// Comparator and version exactly as written, e.g. `>= 1.2`.
    pub version_constraint: Option<String>,
}

impl DependencyConstraint {
    pub fn new(target: impl Into<String>, version_constraint: Option<String>) -> Self {
        Self {
            target: target.into(),
            version_constraint,
        }
    }
}

fn alternative_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([A-Za-z0-9_.+-]+)(?::[A-Za-z0-9_-]+)?\s*(?:\(([^)]*)\))?")
            .expect("valid regex")
    })
}

/// Parses a dependency field into constraints; never fails.
pub fn parse_dependency_string(field: &str) -> Vec<DependencyConstraint> {
    field
        .split(',')
        .filter_map(|clause| {
            let first = clause.split('|').next()?.trim();
            if first.is_empty() {
                return None;
            }
            parse_alternative(first)
        })
        .collect()
}

fn parse_alternative(alt: &str) -> Option<DependencyConstraint> {
    let caps = alternative_pattern().captures(alt)?;
    let target = caps.get(1)?.as_str();
    let version_constraint = caps
        .get(2)
        .map(|m| m.as_str().trim())
        .filter(|c| !c.is_empty())
        .map(str::to_string);
    Some(DependencyConstraint::new(target, version_constraint))
}

/// Renders an RPM `<rpm:entry>` comparison as a constraint string.
///
/// `flags` is one of `EQ LT LE GT GE`; the version is `[epoch:]ver[-rel]`
/// with a zero epoch omitted. Returns `None` when there is no comparison.
pub fn rpm_version_constraint(
    flags: Option<&str>,
    epoch: Option<&str>,
    version: Option<&str>,
    release: Option<&str>,
) -> Option<String> {
    let op = match flags? {
        "EQ" => "=",
        "LT" => "<",
        "LE" => "<=",
        "GT" => ">",
        "GE" => ">=",
        _ => return None,
    };
    let version = version.filter(|v| !v.is_empty())?;

    let mut evr = String::new();
    if let Some(epoch) = epoch.filter(|e| !e.is_empty() && *e != "0") {
        evr.push_str(epoch);
        evr.push(':');
    }
    evr.push_str(version);
    if let Some(release) = release.filter(|r| !r.is_empty()) {
        evr.push('-');
        evr.push_str(release);
    }
    Some(format!("{op} {evr}"))
}
