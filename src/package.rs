use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::io::{Cursor, Read, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::Error;
use crate::xml::{PKG_REL, XmlDocument};

pub const REL_OFFICE_DOCUMENT: &str = "/officeDocument";
pub const REL_SETTINGS: &str = "/settings";

/// An opened OOXML zip package. XML parts are parsed lazily on first mutable
/// access; on save those parts are re-serialized and every other entry is
/// copied through byte-for-byte.
pub struct Package {
    archive: ZipArchive<Cursor<Vec<u8>>>,
    parts: HashMap<String, XmlDocument>,
}

fn read_entry(archive: &mut ZipArchive<Cursor<Vec<u8>>>, name: &str) -> Result<XmlDocument, Error> {
    let mut file = archive.by_name(name)?;
    let mut xml = String::new();
    file.read_to_string(&mut xml)?;
    XmlDocument::parse(xml.trim_start_matches('\u{feff}'))
}

/// Resolves a relationship target against the directory of its source part.
fn resolve_target(source_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut segments: Vec<&str> = source_dir.split('/').filter(|s| !s.is_empty()).collect();
    for seg in target.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

fn rels_path_for(part: &str) -> (String, String) {
    match part.rsplit_once('/') {
        Some((dir, file)) => (format!("{dir}/_rels/{file}.rels"), dir.to_string()),
        None => (format!("_rels/{part}.rels"), String::new()),
    }
}

impl Package {
    pub fn open(bytes: Vec<u8>) -> Result<Self, Error> {
        let archive = ZipArchive::new(Cursor::new(bytes))?;
        Ok(Package {
            archive,
            parts: HashMap::new(),
        })
    }

    pub fn has_part(&self, name: &str) -> bool {
        self.archive.file_names().any(|n| n == name)
    }

    /// Parses a part for reading only; it is not written back on save.
    fn read_xml(&mut self, name: &str) -> Result<Option<XmlDocument>, Error> {
        if !self.has_part(name) {
            return Ok(None);
        }
        read_entry(&mut self.archive, name).map(Some)
    }

    /// Returns the tree of `name`, parsing it on first access. The part is
    /// re-serialized on save.
    pub fn part_mut(&mut self, name: &str) -> Result<&mut XmlDocument, Error> {
        match self.parts.entry(name.to_string()) {
            Entry::Occupied(e) => Ok(e.into_mut()),
            Entry::Vacant(e) => {
                let doc = read_entry(&mut self.archive, name)?;
                Ok(e.insert(doc))
            }
        }
    }

    /// Finds the target of the first relationship of `source` whose type ends
    /// with `rel_suffix`. `source` of `""` means the package root.
    pub fn related_part(&mut self, source: &str, rel_suffix: &str) -> Result<Option<String>, Error> {
        let (rels_path, source_dir) = if source.is_empty() {
            ("_rels/.rels".to_string(), String::new())
        } else {
            rels_path_for(source)
        };
        let Some(rels) = self.read_xml(&rels_path)? else {
            return Ok(None);
        };
        let target = rels
            .root
            .children_named(PKG_REL, "Relationship")
            .filter(|rel| rel.plain_attr("TargetMode") != Some("External"))
            .find(|rel| rel.plain_attr("Type").is_some_and(|t| t.ends_with(rel_suffix)))
            .and_then(|rel| rel.plain_attr("Target"))
            .map(|target| resolve_target(&source_dir, target));
        Ok(target)
    }

    /// Name of the main document part (`word/document.xml`,
    /// `ppt/presentation.xml`, ...), with `fallback` used when the package
    /// relationships do not name one.
    pub fn main_part(&mut self, fallback: &str) -> Result<String, Error> {
        let name = self
            .related_part("", REL_OFFICE_DOCUMENT)?
            .unwrap_or_else(|| fallback.to_string());
        if !self.has_part(&name) {
            return Err(Error::InvalidPackage(format!("missing main part {name}")));
        }
        Ok(name)
    }

    pub fn save(mut self) -> Result<Vec<u8>, Error> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for i in 0..self.archive.len() {
            let file = self.archive.by_index_raw(i)?;
            let name = file.name().to_string();
            match self.parts.get(&name) {
                Some(doc) => {
                    drop(file);
                    let options =
                        SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
                    writer.start_file(name.as_str(), options)?;
                    writer.write_all(&doc.to_bytes()?)?;
                    log::debug!("Rewrote part {name}");
                }
                None => writer.raw_copy_file(file)?,
            }
        }
        Ok(writer.finish()?.into_inner())
    }
}
