use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use anyhow::Context;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::fallback::{default_part_xml, REQUIRED_PART_NAMES};

pub const DOCUMENT_PART: &str = "word/document.xml";

pub struct DocxPackage {
    pub entries: Vec<DocxEntry>,
}

pub struct DocxEntry {
    pub name: String,
    pub data: Vec<u8>,
    pub compression: CompressionMethod,
    pub last_modified: zip::DateTime,
    pub unix_mode: Option<u32>,
    pub is_dir: bool,
}

impl DocxPackage {
    pub fn read(path: &Path) -> anyhow::Result<Self> {
        let f = File::open(path).with_context(|| format!("open docx: {}", path.display()))?;
        let mut zip = ZipArchive::new(f).context("read zip")?;
        let mut entries = Vec::new();
        for i in 0..zip.len() {
            let mut file = zip.by_index(i).context("zip entry")?;
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data).context("read zip entry")?;
            entries.push(DocxEntry {
                name: file.name().to_string(),
                data,
                compression: file.compression(),
                last_modified: file.last_modified().unwrap_or_default(),
                unix_mode: file.unix_mode(),
                is_dir: file.is_dir(),
            });
        }
        Ok(Self { entries })
    }

    pub fn entry(&self, name: &str) -> Option<&DocxEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn document_xml(&self) -> anyhow::Result<&[u8]> {
        let ent = self
            .entry(DOCUMENT_PART)
            .with_context(|| format!("missing part: {DOCUMENT_PART}"))?;
        Ok(&ent.data)
    }

    pub fn xml_entries(&self) -> Vec<&DocxEntry> {
        self.entries
            .iter()
            .filter(|e| e.name.to_lowercase().ends_with(".xml"))
            .collect()
    }

    /// Write the package with some parts replaced. Replacement names not present in the
    /// source archive are appended as new deflated entries, which is how missing required
    /// parts get defaulted in.
    pub fn write_with_replacements(
        &self,
        output_path: &Path,
        replacements: &HashMap<String, Vec<u8>>,
    ) -> anyhow::Result<()> {
        let f = File::create(output_path)
            .with_context(|| format!("create output docx: {}", output_path.display()))?;
        let mut zout = ZipWriter::new(f);
        for ent in &self.entries {
            let data = replacements
                .get(&ent.name)
                .cloned()
                .unwrap_or_else(|| ent.data.clone());
            let mut opts = SimpleFileOptions::default()
                .compression_method(ent.compression)
                .last_modified_time(ent.last_modified);
            if let Some(mode) = ent.unix_mode {
                opts = opts.unix_permissions(mode);
            }
            if ent.is_dir || ent.name.ends_with('/') {
                zout.add_directory(&ent.name, opts)
                    .with_context(|| format!("add zip dir: {}", ent.name))?;
            } else {
                zout.start_file(&ent.name, opts)
                    .with_context(|| format!("start zip file: {}", ent.name))?;
                zout.write_all(&data)
                    .with_context(|| format!("write zip file: {}", ent.name))?;
            }
        }
        for (name, data) in replacements {
            if self.entry(name).is_some() {
                continue;
            }
            let opts =
                SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
            zout.start_file(name, opts)
                .with_context(|| format!("start zip file: {name}"))?;
            zout.write_all(data)
                .with_context(|| format!("write zip file: {name}"))?;
        }
        zout.finish().context("finish zip")?;
        Ok(())
    }

    /// Add default content for any required OPC part the source archive lacks, so the
    /// rewritten package stays openable even when the input was a bare-bones container.
    pub fn fill_missing_required_parts(&self, replacements: &mut HashMap<String, Vec<u8>>) {
        for name in REQUIRED_PART_NAMES {
            if self.entry(name).is_none() && !replacements.contains_key(*name) {
                if let Some(xml) = default_part_xml(name) {
                    replacements.insert((*name).to_string(), xml.as_bytes().to_vec());
                }
            }
        }
    }
}
