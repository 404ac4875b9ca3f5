//! Streaming `primary.xml` reader.

use std::io::BufRead;

use quick_xml::events::{BytesStart, Event};

use super::xml::{attribute, event_text, XmlStream};
use crate::depgrammar::{rpm_version_constraint, DependencyConstraint};
use crate::error::{CollectError, RecordError};
use crate::identity::Ecosystem;
use crate::record::{DependencyField, PackageRecord};

/// `<rpm:*>` dependency containers.
pub const DEPENDENCY_KINDS: &[&str] = &[
    "requires",
    "provides",
    "conflicts",
    "obsoletes",
    "recommends",
    "suggests",
    "supplements",
    "enhances",
];

/// Elements whose text becomes a record field or attribute.
fn text_field(local: &[u8]) -> Option<&'static str> {
    Some(match local {
        b"name" => "name",
        b"arch" => "arch",
        b"summary" => "summary",
        b"description" => "description",
        b"checksum" => "pkgid",
        b"url" => "url",
        b"packager" => "packager",
        b"license" => "license",
        b"vendor" => "vendor",
        b"group" => "group",
        b"buildhost" => "buildhost",
        b"sourcerpm" => "sourcerpm",
        _ => return None,
    })
}

fn dependency_kind(local: &[u8]) -> Option<&'static str> {
    DEPENDENCY_KINDS
        .iter()
        .copied()
        .find(|kind| kind.as_bytes() == local)
}

#[derive(Default)]
struct Draft {
    name: Option<String>,
    arch: Option<String>,
    epoch: Option<String>,
    version: Option<String>,
    release: Option<String>,
    summary: Option<String>,
    description: Option<String>,
    attributes: Vec<(&'static str, String)>,
    dependencies: Vec<(&'static str, Vec<DependencyConstraint>)>,
}

impl Draft {
    fn set_text(&mut self, field: &'static str, value: String) {
        match field {
            "name" => self.name = Some(value),
            "arch" => self.arch = Some(value),
            "summary" => self.summary = Some(value),
            "description" => self.description = Some(value),
            _ => self.attributes.push((field, value)),
        }
    }

    fn element(&mut self, e: &BytesStart<'_>) {
        match e.local_name().as_ref() {
            b"version" => {
                self.epoch = attribute(e, b"epoch");
                self.version = attribute(e, b"ver");
                self.release = attribute(e, b"rel");
            }
            b"checksum" => {
                if let Some(kind) = attribute(e, b"type") {
                    self.attributes.push(("checksumType", kind));
                }
            }
            b"location" => {
                if let Some(href) = attribute(e, b"href") {
                    self.attributes.push(("location", href));
                }
            }
            b"time" => {
                if let Some(file) = attribute(e, b"file") {
                    self.attributes.push(("fileTime", file));
                }
                if let Some(build) = attribute(e, b"build") {
                    self.attributes.push(("buildTime", build));
                }
            }
            b"size" => {
                if let Some(package) = attribute(e, b"package") {
                    self.attributes.push(("packageSize", package));
                }
                if let Some(installed) = attribute(e, b"installed") {
                    self.attributes.push(("installedSize", installed));
                }
            }
            _ => {}
        }
    }

    fn into_record(self) -> Result<PackageRecord, RecordError> {
        let mut record =
            PackageRecord::new(Ecosystem::Rpm, self.name.as_deref(), self.version.as_deref())?
                .with_release(self.release.as_deref())
                .with_arch(self.arch.as_deref());
        if let Some(epoch) = self.epoch {
            record.push_attribute("epoch", epoch);
        }
        if let Some(summary) = self.summary {
            record.set_summary(summary.trim());
        }
        if let Some(description) = self.description {
            record.set_description(description.trim());
        }
        for (key, value) in self.attributes {
            record.push_attribute(key, value);
        }
        for (kind, constraints) in self.dependencies {
            record.push_dependencies(kind, DependencyField::Structured(constraints));
        }
        Ok(record)
    }
}

fn dependency_entry(e: &BytesStart<'_>) -> Option<DependencyConstraint> {
    let name = attribute(e, b"name").filter(|n| !n.is_empty())?;
    let flags = attribute(e, b"flags");
    let epoch = attribute(e, b"epoch");
    let ver = attribute(e, b"ver");
    let rel = attribute(e, b"rel");
    let constraint = rpm_version_constraint(
        flags.as_deref(),
        epoch.as_deref(),
        ver.as_deref(),
        rel.as_deref(),
    );
    Some(DependencyConstraint::new(name, constraint))
}

/// Parses `primary.xml`, calling `on_package` once per `<package>`.
pub fn parse_primary<R, F>(reader: R, source: &str, mut on_package: F) -> Result<(), CollectError>
where
    R: BufRead,
    F: FnMut(Result<PackageRecord, RecordError>),
{
    let mut xml = XmlStream::new(reader, source);
    let mut draft: Option<Draft> = None;
    let mut text_target: Option<&'static str> = None;
    let mut text = String::new();
    let mut deps: Option<(&'static str, Vec<DependencyConstraint>)> = None;

    loop {
        let event = xml.next_event()?;
        match &event {
            Event::Eof => break,
            Event::Start(e) if e.local_name().as_ref() == b"package" => {
                draft = Some(Draft::default());
            }
            Event::End(e) if e.local_name().as_ref() == b"package" => {
                if let Some(finished) = draft.take() {
                    on_package(finished.into_record());
                }
                text_target = None;
                deps = None;
            }
            Event::Start(e) | Event::Empty(e) => {
                let Some(current) = draft.as_mut() else {
                    continue;
                };
                let local = e.local_name();
                let local = local.as_ref();
                if let Some(kind) = dependency_kind(local) {
                    if matches!(event, Event::Start(_)) {
                        deps = Some((kind, Vec::new()));
                    }
                } else if local == b"entry" {
                    if let (Some((_, list)), Some(entry)) = (deps.as_mut(), dependency_entry(e)) {
                        list.push(entry);
                    }
                } else {
                    current.element(e);
                    if matches!(event, Event::Start(_)) && deps.is_none() {
                        text_target = text_field(local);
                        text.clear();
                    }
                }
            }
            Event::End(e) => {
                let local = e.local_name();
                let local = local.as_ref();
                if let (Some(current), Some(field)) = (draft.as_mut(), text_target) {
                    if text_field(local) == Some(field) {
                        current.set_text(field, std::mem::take(&mut text));
                        text_target = None;
                    }
                }
                if dependency_kind(local).is_some() {
                    if let (Some(current), Some(finished)) = (draft.as_mut(), deps.take()) {
                        current.dependencies.push(finished);
                    }
                }
            }
            other => {
                if text_target.is_some() {
                    if let Some(chunk) = event_text(other) {
                        text.push_str(&chunk);
                    }
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRIMARY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<metadata xmlns="http://linux.duke.edu/metadata/common" xmlns:rpm="http://linux.duke.edu/metadata/rpm" packages="3">
<package type="rpm">
  <name>bash</name>
  <arch>x86_64</arch>
  <version epoch="0" ver="5.2.26" rel="3.fc40"/>
  <checksum type="sha256" pkgid="YES">abc123</checksum>
  <summary>The GNU Bourne Again shell</summary>
  <description>The GNU Bourne Again shell (Bash) is a shell &amp; command language.</description>
  <packager>Fedora Project</packager>
  <url>https://www.gnu.org/software/bash</url>
  <time file="1718000000" build="1717000000"/>
  <size package="1900000" installed="8000000" archive="8100000"/>
  <location href="Packages/b/bash-5.2.26-3.fc40.x86_64.rpm"/>
  <format>
    <rpm:license>GPL-3.0-or-later</rpm:license>
    <rpm:group>Unspecified</rpm:group>
    <rpm:sourcerpm>bash-5.2.26-3.fc40.src.rpm</rpm:sourcerpm>
    <rpm:provides>
      <rpm:entry name="/bin/sh"/>
      <rpm:entry name="bash" flags="EQ" epoch="0" ver="5.2.26" rel="3.fc40"/>
    </rpm:provides>
    <rpm:requires>
      <rpm:entry name="glibc" flags="GE" epoch="0" ver="2.34"/>
      <rpm:entry name="filesystem" pre="1"/>
    </rpm:requires>
    <file>/usr/bin/bash</file>
  </format>
</package>
<package type="rpm">
  <arch>noarch</arch>
  <version epoch="0" ver="1.0" rel="1"/>
</package>
<package type="rpm">
  <name>tzdata</name>
  <arch>noarch</arch>
  <version epoch="0" ver="2024a" rel="5.fc40"/>
  <checksum type="sha256" pkgid="YES">def456</checksum>
  <summary>Timezone data</summary>
  <description/>
  <format/>
</package>
</metadata>"#;

    fn parse() -> Vec<Result<PackageRecord, RecordError>> {
        let mut out = Vec::new();
        parse_primary(PRIMARY.as_bytes(), "primary.xml", |r| out.push(r)).unwrap();
        out
    }

    #[test]
    fn reads_identity_and_attributes() {
        let records = parse();
        assert_eq!(records.len(), 3);
        let bash = records[0].as_ref().unwrap();
        assert_eq!(
            bash.identity().as_str(),
            "http://packagegraph.github.io/ontology/rpm#bash-5.2.26-3.fc40.x86_64"
        );
        assert_eq!(bash.attribute("pkgid"), Some("abc123"));
        assert_eq!(bash.attribute("checksumType"), Some("sha256"));
        assert_eq!(bash.attribute("license"), Some("GPL-3.0-or-later"));
        assert_eq!(bash.attribute("buildTime"), Some("1717000000"));
        assert_eq!(bash.attribute("installedSize"), Some("8000000"));
        assert_eq!(
            bash.description(),
            Some("The GNU Bourne Again shell (Bash) is a shell & command language.")
        );
    }

    #[test]
    fn reads_structured_dependencies() {
        let records = parse();
        let bash = records[0].as_ref().unwrap();
        let fields = bash.dependency_fields();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].0, "provides");
        assert_eq!(fields[1].0, "requires");
        assert_eq!(
            fields[1].1.constraints(),
            vec![
                DependencyConstraint::new("glibc", Some(">= 2.34".into())),
                DependencyConstraint::new("filesystem", None),
            ]
        );
        assert_eq!(
            fields[0].1.constraints()[1],
            DependencyConstraint::new("bash", Some("= 5.2.26-3.fc40".into()))
        );
    }

    #[test]
    fn nameless_packages_are_rejected_and_empty_elements_tolerated() {
        let records = parse();
        assert_eq!(records[1], Err(RecordError::MissingField("name")));
        let tzdata = records[2].as_ref().unwrap();
        assert_eq!(tzdata.description(), None);
        assert!(tzdata.dependency_fields().is_empty());
    }
}
