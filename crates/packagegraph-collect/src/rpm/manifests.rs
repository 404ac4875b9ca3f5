//! `filelists.xml` and `other.xml` as streams of per-package entries.

use std::io::BufRead;

use quick_xml::events::Event;

use super::xml::{attribute, event_text, XmlStream};
use crate::error::CollectError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileList {
    pub pkgid: String,
    pub files: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangelogEntry {
    pub author: Option<String>,
    pub date: Option<String>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Changelogs {
    pub pkgid: String,
    pub entries: Vec<ChangelogEntry>,
}

/// Yields one [`FileList`] per `<package>` of `filelists.xml`.
pub struct FileListReader<R> {
    xml: XmlStream<R>,
}

impl<R: BufRead> FileListReader<R> {
    pub fn new(reader: R, source: &str) -> Self {
        Self {
            xml: XmlStream::new(reader, source),
        }
    }

    fn read_package(&mut self) -> Result<Option<FileList>, CollectError> {
        let mut current: Option<FileList> = None;
        let mut in_file = false;
        loop {
            let event = self.xml.next_event()?;
            match &event {
                Event::Eof => return Ok(None),
                Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                    b"package" => {
                        current = Some(FileList {
                            pkgid: attribute(e, b"pkgid").unwrap_or_default(),
                            files: Vec::new(),
                        });
                        if matches!(event, Event::Empty(_)) {
                            return Ok(current);
                        }
                    }
                    b"file" => in_file = matches!(event, Event::Start(_)),
                    _ => {}
                },
                Event::End(e) => match e.local_name().as_ref() {
                    b"package" => {
                        if current.is_some() {
                            return Ok(current);
                        }
                    }
                    b"file" => in_file = false,
                    _ => {}
                },
                other => {
                    if let (true, Some(list)) = (in_file, current.as_mut()) {
                        if let Some(path) = event_text(other) {
                            list.files.push(path);
                        }
                    }
                }
            }
        }
    }
}

impl<R: BufRead> Iterator for FileListReader<R> {
    type Item = Result<FileList, CollectError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_package().transpose()
    }
}

/// Yields one [`Changelogs`] per `<package>` of `other.xml`.
pub struct ChangelogReader<R> {
    xml: XmlStream<R>,
}

impl<R: BufRead> ChangelogReader<R> {
    pub fn new(reader: R, source: &str) -> Self {
        Self {
            xml: XmlStream::new(reader, source),
        }
    }

    fn read_package(&mut self) -> Result<Option<Changelogs>, CollectError> {
        let mut current: Option<Changelogs> = None;
        let mut entry: Option<ChangelogEntry> = None;
        loop {
            let event = self.xml.next_event()?;
            match &event {
                Event::Eof => return Ok(None),
                Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                    b"package" => {
                        current = Some(Changelogs {
                            pkgid: attribute(e, b"pkgid").unwrap_or_default(),
                            entries: Vec::new(),
                        });
                        if matches!(event, Event::Empty(_)) {
                            return Ok(current);
                        }
                    }
                    b"changelog" => {
                        let started = ChangelogEntry {
                            author: attribute(e, b"author"),
                            date: attribute(e, b"date"),
                            text: String::new(),
                        };
                        match (&event, current.as_mut()) {
                            (Event::Start(_), _) => entry = Some(started),
                            (_, Some(package)) => package.entries.push(started),
                            _ => {}
                        }
                    }
                    _ => {}
                },
                Event::End(e) => match e.local_name().as_ref() {
                    b"package" => {
                        if current.is_some() {
                            return Ok(current);
                        }
                    }
                    b"changelog" => {
                        if let (Some(finished), Some(package)) = (entry.take(), current.as_mut()) {
                            package.entries.push(finished);
                        }
                    }
                    _ => {}
                },
                other => {
                    if let (Some(open), Some(text)) = (entry.as_mut(), event_text(other)) {
                        open.text.push_str(&text);
                    }
                }
            }
        }
    }
}

impl<R: BufRead> Iterator for ChangelogReader<R> {
    type Item = Result<Changelogs, CollectError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_package().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_lists_per_package() {
        let xml = r#"<?xml version="1.0"?>
<filelists xmlns="http://linux.duke.edu/metadata/filelists" packages="2">
<package pkgid="abc123" name="bash" arch="x86_64">
  <version epoch="0" ver="5.2.26" rel="3.fc40"/>
  <file>/usr/bin/bash</file>
  <file type="dir">/usr/share/doc/bash</file>
</package>
<package pkgid="def456" name="tzdata" arch="noarch">
  <version epoch="0" ver="2024a" rel="5.fc40"/>
</package>
</filelists>"#;
        let lists: Vec<FileList> = FileListReader::new(xml.as_bytes(), "filelists.xml")
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(
            lists,
            vec![
                FileList {
                    pkgid: "abc123".into(),
                    files: vec!["/usr/bin/bash".into(), "/usr/share/doc/bash".into()],
                },
                FileList {
                    pkgid: "def456".into(),
                    files: vec![],
                },
            ]
        );
    }

    #[test]
    fn changelog_entries_per_package() {
        let xml = r#"<otherdata xmlns="http://linux.duke.edu/metadata/other" packages="1">
<package pkgid="abc123" name="bash" arch="x86_64">
  <version epoch="0" ver="5.2.26" rel="3.fc40"/>
  <changelog author="Jane Doe &lt;jane@example.org&gt; - 5.2.26-1" date="1714521600">- Update to 5.2.26</changelog>
  <changelog author="John Roe" date="1700000000"/>
</package>
</otherdata>"#;
        let sets: Vec<Changelogs> = ChangelogReader::new(xml.as_bytes(), "other.xml")
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].entries.len(), 2);
        assert_eq!(
            sets[0].entries[0].author.as_deref(),
            Some("Jane Doe <jane@example.org> - 5.2.26-1")
        );
        assert_eq!(sets[0].entries[0].text, "- Update to 5.2.26");
        assert_eq!(sets[0].entries[1].text, "");
    }
}
