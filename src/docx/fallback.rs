//! Last-resort document builder: when reconstruction of the original package fails
//! beyond repair, emit a minimal but well-formed OPC container holding the translated
//! text as plain Normal-styled paragraphs. Formatting is lost; the text is not.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use anyhow::Context;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::segment::TranslatedSegment;

use super::xml::escape_xml_text;

/// Parts every readable package must carry. Also used to backfill parts missing from
/// a source archive before rewriting it.
pub const REQUIRED_PART_NAMES: &[&str] = &[
    "[Content_Types].xml",
    "_rels/.rels",
    "docProps/app.xml",
    "docProps/core.xml",
    "word/_rels/document.xml.rels",
    "word/styles.xml",
];

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="xml" ContentType="application/xml"/>
  <Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
  <Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/>
  <Override PartName="/docProps/app.xml" ContentType="application/vnd.openxmlformats-officedocument.extended-properties+xml"/>
  <Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>
</Types>"#;

const ROOT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>
  <Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties" Target="docProps/app.xml"/>
</Relationships>"#;

const APP_PROPS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties">
  <Application>docx-translator</Application>
  <AppVersion>1.0.0</AppVersion>
</Properties>"#;

// No created/modified timestamps: output must be byte-identical across runs.
const CORE_PROPS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/">
  <dc:title>Translated Document</dc:title>
  <dc:creator>docx-translator</dc:creator>
  <cp:lastModifiedBy>docx-translator</cp:lastModifiedBy>
</cp:coreProperties>"#;

const DOCUMENT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
</Relationships>"#;

const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:style w:type="paragraph" w:styleId="Normal">
    <w:name w:val="Normal"/>
    <w:pPr/>
    <w:rPr>
      <w:sz w:val="24"/>
      <w:szCs w:val="24"/>
      <w:lang w:val="en-US" w:eastAsia="zh-CN" w:bidi="ar-SA"/>
    </w:rPr>
  </w:style>
</w:styles>"#;

pub fn default_part_xml(name: &str) -> Option<&'static str> {
    match name {
        "[Content_Types].xml" => Some(CONTENT_TYPES_XML),
        "_rels/.rels" => Some(ROOT_RELS_XML),
        "docProps/app.xml" => Some(APP_PROPS_XML),
        "docProps/core.xml" => Some(CORE_PROPS_XML),
        "word/_rels/document.xml.rels" => Some(DOCUMENT_RELS_XML),
        "word/styles.xml" => Some(STYLES_XML),
        _ => None,
    }
}

/// Build the fallback document.xml: one Normal paragraph per translated segment, in
/// segment order, segments with empty translations skipped.
pub fn simple_document_xml(segments: &[TranslatedSegment]) -> String {
    let mut paragraphs = String::new();
    for seg in segments {
        if seg.translated_text.is_empty() {
            continue;
        }
        paragraphs.push_str("<w:p><w:pPr><w:pStyle w:val=\"Normal\"/></w:pPr><w:r><w:t>");
        paragraphs.push_str(&escape_xml_text(&seg.translated_text));
        paragraphs.push_str("</w:t></w:r></w:p>");
    }
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">"#,
            "<w:body>{}",
            r#"<w:sectPr><w:pgSz w:w="12240" w:h="15840"/>"#,
            r#"<w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440"/></w:sectPr>"#,
            "</w:body></w:document>"
        ),
        paragraphs
    )
}

/// Write a complete minimal package to `output_path`.
pub fn build_minimal_docx(
    segments: &[TranslatedSegment],
    output_path: &Path,
) -> anyhow::Result<()> {
    let f = File::create(output_path)
        .with_context(|| format!("create fallback docx: {}", output_path.display()))?;
    let mut zout = ZipWriter::new(f);
    let opts = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for name in REQUIRED_PART_NAMES {
        let Some(xml) = default_part_xml(name) else {
            continue;
        };
        zout.start_file(*name, opts)
            .with_context(|| format!("start zip file: {name}"))?;
        zout.write_all(xml.as_bytes())
            .with_context(|| format!("write zip file: {name}"))?;
    }

    zout.start_file(super::package::DOCUMENT_PART, opts)
        .context("start zip file: word/document.xml")?;
    zout.write_all(simple_document_xml(segments).as_bytes())
        .context("write zip file: word/document.xml")?;

    zout.finish().context("finish fallback zip")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::package::{DocxPackage, DOCUMENT_PART};
    use crate::segment::{SegmentKind, TextSegment};

    fn translated(id: &str, src: &str, dst: &str) -> TranslatedSegment {
        TranslatedSegment {
            segment: TextSegment {
                id: id.to_string(),
                kind: SegmentKind::Paragraph,
                text: src.to_string(),
                original_markup: String::new(),
                placeholders: Vec::new(),
            },
            translated_text: dst.to_string(),
        }
    }

    #[test]
    fn every_required_part_has_a_default() {
        for name in REQUIRED_PART_NAMES {
            assert!(default_part_xml(name).is_some(), "no default for {name}");
        }
        assert!(default_part_xml("word/unknown.xml").is_none());
    }

    #[test]
    fn simple_document_escapes_and_skips_empty() {
        let segs = vec![
            translated("p_1", "a", "x < y & z"),
            translated("p_2", "b", ""),
            translated("p_3", "c", "fin"),
        ];
        let xml = simple_document_xml(&segs);
        assert!(xml.contains("<w:t>x &lt; y &amp; z</w:t>"));
        assert!(xml.contains("<w:t>fin</w:t>"));
        assert_eq!(xml.matches("<w:p>").count(), 2);
        assert!(xml.contains("<w:sectPr>"));
    }

    #[test]
    fn minimal_docx_contains_all_parts() {
        let dir = tempfile::tempdir().expect("tempdir");
        let out = dir.path().join("fallback.docx");
        build_minimal_docx(&[translated("p_1", "hello", "bonjour")], &out)
            .expect("build fallback");

        let pkg = DocxPackage::read(&out).expect("read fallback");
        for name in REQUIRED_PART_NAMES {
            assert!(pkg.entry(name).is_some(), "missing {name}");
        }
        let doc = pkg.document_xml().expect("document part");
        assert!(String::from_utf8_lossy(doc).contains("bonjour"));
    }

    #[test]
    fn minimal_docx_is_deterministic() {
        let dir = tempfile::tempdir().expect("tempdir");
        let a = dir.path().join("a.docx");
        let b = dir.path().join("b.docx");
        let segs = vec![translated("p_1", "hi", "salut")];
        build_minimal_docx(&segs, &a).expect("build a");
        build_minimal_docx(&segs, &b).expect("build b");
        let xa = simple_document_xml(&segs);
        let xb = simple_document_xml(&segs);
        assert_eq!(xa, xb);
        assert!(a.exists() && b.exists());
    }
}
