//! Ecosystem-neutral package records.

use crate::depgrammar::{parse_dependency_string, DependencyConstraint};
use crate::error::RecordError;
use crate::identity::{Ecosystem, NodeIdentity};

/// Contents of one dependency field: either the raw string (Debian) or a
/// constraint list that arrived already structured (RPM XML).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyField {
    Raw(String),
    Structured(Vec<DependencyConstraint>),
}

impl DependencyField {
    pub fn constraints(&self) -> Vec<DependencyConstraint> {
        match self {
            DependencyField::Raw(raw) => parse_dependency_string(raw),
            DependencyField::Structured(list) => list.clone(),
        }
    }
}

/// One normalized package entry.
///
/// Only constructible through [`PackageRecord::new`], so `name` and `version`
/// are always non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRecord {
    ecosystem: Ecosystem,
    name: String,
    version: String,
    release: Option<String>,
    arch: Option<String>,
    summary: Option<String>,
    description: Option<String>,
    attributes: Vec<(String, String)>,
    dependency_fields: Vec<(String, DependencyField)>,
}

impl PackageRecord {
    pub fn new(
        ecosystem: Ecosystem,
        name: Option<&str>,
        version: Option<&str>,
    ) -> Result<Self, RecordError> {
        let name = non_empty(name).ok_or(RecordError::MissingField("name"))?;
        let version = non_empty(version).ok_or(RecordError::MissingField("version"))?;
        Ok(Self {
            ecosystem,
            name: name.to_string(),
            version: version.to_string(),
            release: None,
            arch: None,
            summary: None,
            description: None,
            attributes: Vec::new(),
            dependency_fields: Vec::new(),
        })
    }

    pub fn with_release(mut self, release: Option<&str>) -> Self {
        self.release = non_empty(release).map(str::to_string);
        self
    }

    pub fn with_arch(mut self, arch: Option<&str>) -> Self {
        self.arch = non_empty(arch).map(str::to_string);
        self
    }

    pub fn set_summary(&mut self, summary: impl Into<String>) {
        self.summary = Some(summary.into());
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = Some(description.into());
    }

    pub fn push_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.push((key.into(), value.into()));
    }

    pub fn push_dependencies(&mut self, kind: impl Into<String>, field: DependencyField) {
        self.dependency_fields.push((kind.into(), field));
    }

    pub fn ecosystem(&self) -> Ecosystem {
        self.ecosystem
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn release(&self) -> Option<&str> {
        self.release.as_deref()
    }

    pub fn arch(&self) -> Option<&str> {
        self.arch.as_deref()
    }

    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn dependency_fields(&self) -> &[(String, DependencyField)] {
        &self.dependency_fields
    }

    pub fn identity(&self) -> NodeIdentity {
        self.ecosystem.package_identity(
            &self.name,
            &self.version,
            self.release.as_deref(),
            self.arch.as_deref(),
        )
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
