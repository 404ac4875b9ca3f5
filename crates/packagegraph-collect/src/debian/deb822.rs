//! deb822 control-file parsing (`Packages`, `Release`).

use std::io::BufRead;

use crate::error::{CollectError, RecordError};
use crate::identity::Ecosystem;
use crate::manifest::LossyLines;
use crate::record::{DependencyField, PackageRecord};

/// Control fields whose value is a dependency list.
pub const DEPENDENCY_FIELDS: &[&str] = &[
    "Depends",
    "Pre-Depends",
    "Recommends",
    "Suggests",
    "Breaks",
    "Enhances",
    "Conflicts",
    "Replaces",
    "Provides",
];

/// One paragraph of `Field: value` lines.
///
/// Continuation lines are folded into the preceding field, joined with `\n`
/// and stripped of their single leading space.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stanza {
    fields: Vec<(String, String)>,
}

impl Stanza {
    /// Field names are case-insensitive.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Streams stanzas separated by blank lines.
pub struct Stanzas<R> {
    lines: LossyLines<R>,
}

impl<R: BufRead> Stanzas<R> {
    pub fn new(reader: R, source: &str) -> Self {
        Self {
            lines: LossyLines::new(reader, source),
        }
    }
}

impl<R: BufRead> Iterator for Stanzas<R> {
    type Item = Result<Stanza, CollectError>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut stanza = Stanza::default();
        loop {
            let line = match self.lines.next() {
                None => return (!stanza.is_empty()).then_some(Ok(stanza)),
                Some(Err(e)) => return Some(Err(e)),
                Some(Ok(line)) => line,
            };

            if line.trim().is_empty() {
                if stanza.is_empty() {
                    continue;
                }
                return Some(Ok(stanza));
            }
            if line.starts_with(' ') || line.starts_with('\t') {
                if let Some((_, value)) = stanza.fields.last_mut() {
                    value.push('\n');
                    value.push_str(line[1..].trim_end());
                }
                continue;
            }
            if line.starts_with('#') {
                continue;
            }
            match line.split_once(':') {
                Some((key, value)) => stanza
                    .fields
                    .push((key.trim().to_string(), value.trim().to_string())),
                None => tracing::debug!(line = %line, "ignoring malformed control line"),
            }
        }
    }
}

/// Turns one `Packages` stanza into a record.
pub fn normalize_stanza(stanza: &Stanza) -> Result<PackageRecord, RecordError> {
    let mut record =
        PackageRecord::new(Ecosystem::Debian, stanza.get("Package"), stanza.get("Version"))?;

    for (key, value) in stanza.fields() {
        if key.eq_ignore_ascii_case("Package") || key.eq_ignore_ascii_case("Version") {
            continue;
        }
        if key.eq_ignore_ascii_case("Description") {
            let (summary, body) = split_description(value);
            record.set_summary(summary);
            if let Some(body) = body {
                record.set_description(body);
            }
        } else if DEPENDENCY_FIELDS
            .iter()
            .any(|field| field.eq_ignore_ascii_case(key))
        {
            record.push_dependencies(key.as_str(), DependencyField::Raw(value.clone()));
        } else {
            record.push_attribute(key.as_str(), value.as_str());
        }
    }
    Ok(record)
}

/// Synopsis line and extended description (` .` lines become blank lines).
fn split_description(value: &str) -> (&str, Option<String>) {
    let Some((summary, rest)) = value.split_once('\n') else {
        return (value.trim(), None);
    };
    let body = rest
        .lines()
        .map(|line| if line.trim() == "." { "" } else { line })
        .collect::<Vec<_>>()
        .join("\n");
    (summary.trim(), Some(body).filter(|b| !b.trim().is_empty()))
}

/// The fields of a `Release` / `InRelease` file a collection needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseInfo {
    pub origin: String,
    pub suite: String,
    pub codename: String,
}

/// Parses `Release` text; `url` is only used in the error.
///
/// Clearsigned `InRelease` files parse the same way: the armor lines have no
/// matching keys and the signed hash lists are indented.
pub fn parse_release(text: &str, url: &str) -> Result<ReleaseInfo, CollectError> {
    let mut origin = None;
    let mut suite = None;
    let mut codename = None;
    for line in text.lines() {
        if line.starts_with(char::is_whitespace) {
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        let slot = match key.trim() {
            "Origin" => &mut origin,
            "Suite" => &mut suite,
            "Codename" => &mut codename,
            _ => continue,
        };
        slot.get_or_insert_with(|| value.to_string());
    }

    match (origin, suite, codename) {
        (Some(origin), Some(suite), Some(codename)) => Ok(ReleaseInfo {
            origin,
            suite,
            codename,
        }),
        (origin, suite, codename) => {
            let missing = [
                ("Codename", codename.is_none()),
                ("Suite", suite.is_none()),
                ("Origin", origin.is_none()),
            ]
            .into_iter()
            .filter_map(|(name, absent)| absent.then_some(name))
            .collect();
            Err(CollectError::IncompleteRelease {
                url: url.to_string(),
                missing,
            })
        }
    }
}
