//! Streaming XML helpers and `repomd.xml`.

use std::borrow::Cow;
use std::io::BufRead;

use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::Reader;

use crate::error::CollectError;

/// Pull parser yielding owned events, with errors tagged by source.
pub(crate) struct XmlStream<R> {
    reader: Reader<R>,
    buf: Vec<u8>,
    source: String,
}

impl<R: BufRead> XmlStream<R> {
    pub(crate) fn new(reader: R, source: &str) -> Self {
        let mut reader = Reader::from_reader(reader);
        reader.trim_text(true);
        Self {
            reader,
            buf: Vec::new(),
            source: source.to_string(),
        }
    }

    pub(crate) fn next_event(&mut self) -> Result<Event<'static>, CollectError> {
        self.buf.clear();
        match self.reader.read_event_into(&mut self.buf) {
            Ok(event) => Ok(event.into_owned()),
            Err(e) => Err(CollectError::xml(
                &self.source,
                format!("{e} (byte {})", self.reader.buffer_position()),
            )),
        }
    }
}

pub(crate) fn attribute(e: &BytesStart<'_>, name: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == name)
        .and_then(|attr| attr.unescape_value().ok().map(Cow::into_owned))
}

pub(crate) fn text(e: &BytesText<'_>) -> String {
    match e.unescape() {
        Ok(text) => text.into_owned(),
        Err(_) => String::from_utf8_lossy(e).into_owned(),
    }
}

/// Text of an `Event::Text` or `Event::CData`, if it is one.
pub(crate) fn event_text(event: &Event<'_>) -> Option<String> {
    match event {
        Event::Text(t) => Some(text(t)),
        Event::CData(c) => Some(String::from_utf8_lossy(c).into_owned()),
        _ => None,
    }
}

/// Locations listed in `repodata/repomd.xml`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoMetadata {
    pub revision: Option<String>,
    locations: Vec<(String, String)>,
}

impl RepoMetadata {
    /// `href` of the `<data type="kind">` entry.
    pub fn location(&self, kind: &str) -> Option<&str> {
        self.locations
            .iter()
            .find(|(k, _)| k == kind)
            .map(|(_, href)| href.as_str())
    }
}

pub fn parse_repomd(bytes: &[u8], url: &str) -> Result<RepoMetadata, CollectError> {
    let mut xml = XmlStream::new(bytes, url);
    let mut metadata = RepoMetadata::default();
    let mut data_type: Option<String> = None;
    let mut in_revision = false;

    loop {
        let event = xml.next_event()?;
        match &event {
            Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                b"data" => data_type = attribute(e, b"type"),
                b"location" => {
                    if let (Some(kind), Some(href)) = (&data_type, attribute(e, b"href")) {
                        metadata.locations.push((kind.clone(), href));
                    }
                }
                b"revision" => in_revision = matches!(event, Event::Start(_)),
                _ => {}
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"data" => data_type = None,
                b"revision" => in_revision = false,
                _ => {}
            },
            Event::Eof => break,
            other => {
                if in_revision {
                    if let Some(text) = event_text(other) {
                        metadata.revision = Some(text.trim().to_string());
                    }
                }
            }
        }
    }
    Ok(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repomd_locations_and_revision() {
        let xml = br#"<?xml version="1.0" encoding="UTF-8"?>
<repomd xmlns="http://linux.duke.edu/metadata/repo" xmlns:rpm="http://linux.duke.edu/metadata/rpm">
  <revision>1718000000</revision>
  <data type="primary">
    <checksum type="sha256">aaaa</checksum>
    <location href="repodata/aaaa-primary.xml.gz"/>
  </data>
  <data type="filelists">
    <location href="repodata/bbbb-filelists.xml.zst"/>
  </data>
</repomd>"#;
        let metadata = parse_repomd(xml, "repomd.xml").unwrap();
        assert_eq!(metadata.revision.as_deref(), Some("1718000000"));
        assert_eq!(
            metadata.location("primary"),
            Some("repodata/aaaa-primary.xml.gz")
        );
        assert_eq!(
            metadata.location("filelists"),
            Some("repodata/bbbb-filelists.xml.zst")
        );
        assert_eq!(metadata.location("other"), None);
    }

    #[test]
    fn truncated_xml_is_an_error() {
        let err = parse_repomd(b"<repomd><data type=\"primary\"", "repomd.xml").unwrap_err();
        assert!(matches!(err, CollectError::Xml { .. }));
    }
}
