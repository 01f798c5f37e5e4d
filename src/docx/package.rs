//! Serializes the paragraph model to a WordprocessingML package (docx).
//! The package parts are written by hand: a docx is a zip of XML parts and
//! this document only needs the main part, styles and the two list-numbering
//! definitions.

use crate::docx::{Paragraph, ParagraphKind, Run};
use crate::math::xml_escape;
use std::io::{Cursor, Write};
use thiserror::Error;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

#[derive(Debug, Error)]
pub enum DocxError {
    #[error("could not assemble package: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("could not write package part: {0}")]
    Io(#[from] std::io::Error),
}

/// Numbering ids registered in `numbering.xml`.
const NUM_ID_BULLET: u32 = 1;
const NUM_ID_DECIMAL: u32 = 2;

/// Serializes the document to docx bytes.
pub fn write_docx(paragraphs: &[Paragraph]) -> Result<Vec<u8>, DocxError> {
    let document = document_xml(paragraphs);

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let parts: [(&str, &str); 6] = [
        ("[Content_Types].xml", CONTENT_TYPES_XML),
        ("_rels/.rels", RELS_XML),
        ("word/document.xml", &document),
        ("word/_rels/document.xml.rels", WORD_RELS_XML),
        ("word/styles.xml", STYLES_XML),
        ("word/numbering.xml", &NUMBERING_XML),
    ];
    for (name, content) in parts {
        zip.start_file(name, options)?;
        zip.write_all(content.as_bytes())?;
    }

    Ok(zip.finish()?.into_inner())
}

fn document_xml(paragraphs: &[Paragraph]) -> String {
    let mut body = String::new();
    for paragraph in paragraphs {
        push_paragraph(paragraph, &mut body);
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:mc="http://schemas.openxmlformats.org/markup-compatibility/2006"
 xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"
 xmlns:m="http://schemas.openxmlformats.org/officeDocument/2006/math"
 xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"
 xmlns:w14="http://schemas.microsoft.com/office/word/2010/wordprocessingml"
 mc:Ignorable="w14">
  <w:body>
    {body}
    <w:sectPr>
      <w:pgSz w:w="12240" w:h="15840"/>
      <w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440" w:header="708" w:footer="708" w:gutter="0"/>
      <w:cols w:space="708"/>
      <w:docGrid w:linePitch="360"/>
    </w:sectPr>
  </w:body>
</w:document>"#
    )
}

fn push_paragraph(paragraph: &Paragraph, out: &mut String) {
    out.push_str("<w:p>");
    push_paragraph_props(&paragraph.kind, out);
    for run in &paragraph.runs {
        push_run(run, out);
    }
    out.push_str("</w:p>");
}

fn push_paragraph_props(kind: &ParagraphKind, out: &mut String) {
    match kind {
        ParagraphKind::Body => {}
        ParagraphKind::Heading(level) => {
            out.push_str(&format!(
                "<w:pPr><w:pStyle w:val=\"Heading{level}\"/></w:pPr>"
            ));
        }
        ParagraphKind::ListItem { ordered, level, .. } => {
            let num_id = if *ordered {
                NUM_ID_DECIMAL
            } else {
                NUM_ID_BULLET
            };
            out.push_str(&format!(
                "<w:pPr><w:numPr><w:ilvl w:val=\"{level}\"/><w:numId w:val=\"{num_id}\"/></w:numPr></w:pPr>"
            ));
        }
        ParagraphKind::ThematicBreak => {
            out.push_str(
                "<w:pPr><w:pBdr><w:bottom w:val=\"single\" w:sz=\"6\" w:space=\"1\" w:color=\"auto\"/></w:pBdr></w:pPr>",
            );
        }
        ParagraphKind::Preformatted => {
            out.push_str("<w:pPr><w:pStyle w:val=\"Code\"/></w:pPr>");
        }
    }
}

fn push_run(run: &Run, out: &mut String) {
    match run {
        Run::Text { text, bold, italic } => {
            out.push_str("<w:r>");
            if *bold || *italic {
                out.push_str("<w:rPr>");
                if *bold {
                    out.push_str("<w:b/>");
                }
                if *italic {
                    out.push_str("<w:i/>");
                }
                out.push_str("</w:rPr>");
            }
            out.push_str("<w:t xml:space=\"preserve\">");
            out.push_str(&xml_escape(text));
            out.push_str("</w:t></w:r>");
        }
        // The m: namespace is declared at the root. A display formula carries
        // an oMathPara wrapper, which strict WordprocessingML only allows at
        // block level; among run siblings the bare oMath form is emitted.
        Run::Math { omml } => match omml
            .strip_prefix("<m:oMathPara>")
            .and_then(|inner| inner.strip_suffix("</m:oMathPara>"))
        {
            Some(inline) => out.push_str(inline),
            None => out.push_str(omml),
        },
        Run::Break => out.push_str("<w:r><w:br/></w:r>"),
    }
}

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="xml" ContentType="application/xml"/>
  <Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
  <Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/>
  <Override PartName="/word/numbering.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.numbering+xml"/>
</Types>"#;

const RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
</Relationships>"#;

const WORD_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/numbering" Target="numbering.xml"/>
</Relationships>"#;

const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:style w:type="paragraph" w:default="1" w:styleId="Normal">
    <w:name w:val="Normal"/>
    <w:qFormat/>
  </w:style>
  <w:style w:type="paragraph" w:styleId="Heading1">
    <w:name w:val="heading 1"/>
    <w:basedOn w:val="Normal"/>
    <w:pPr><w:outlineLvl w:val="0"/><w:spacing w:before="240" w:after="120"/></w:pPr>
    <w:rPr><w:b/><w:sz w:val="48"/></w:rPr>
  </w:style>
  <w:style w:type="paragraph" w:styleId="Heading2">
    <w:name w:val="heading 2"/>
    <w:basedOn w:val="Normal"/>
    <w:pPr><w:outlineLvl w:val="1"/><w:spacing w:before="200" w:after="100"/></w:pPr>
    <w:rPr><w:b/><w:sz w:val="40"/></w:rPr>
  </w:style>
  <w:style w:type="paragraph" w:styleId="Heading3">
    <w:name w:val="heading 3"/>
    <w:basedOn w:val="Normal"/>
    <w:pPr><w:outlineLvl w:val="2"/><w:spacing w:before="160" w:after="80"/></w:pPr>
    <w:rPr><w:b/><w:sz w:val="32"/></w:rPr>
  </w:style>
  <w:style w:type="paragraph" w:styleId="Heading4">
    <w:name w:val="heading 4"/>
    <w:basedOn w:val="Normal"/>
    <w:pPr><w:outlineLvl w:val="3"/></w:pPr>
    <w:rPr><w:b/><w:sz w:val="28"/></w:rPr>
  </w:style>
  <w:style w:type="paragraph" w:styleId="Heading5">
    <w:name w:val="heading 5"/>
    <w:basedOn w:val="Normal"/>
    <w:pPr><w:outlineLvl w:val="4"/></w:pPr>
    <w:rPr><w:b/><w:sz w:val="26"/></w:rPr>
  </w:style>
  <w:style w:type="paragraph" w:styleId="Heading6">
    <w:name w:val="heading 6"/>
    <w:basedOn w:val="Normal"/>
    <w:pPr><w:outlineLvl w:val="5"/></w:pPr>
    <w:rPr><w:b/><w:sz w:val="24"/></w:rPr>
  </w:style>
  <w:style w:type="paragraph" w:styleId="Code">
    <w:name w:val="Code"/>
    <w:basedOn w:val="Normal"/>
    <w:rPr><w:rFonts w:ascii="Consolas" w:hAnsi="Consolas"/><w:sz w:val="20"/></w:rPr>
  </w:style>
</w:styles>"#;

lazy_static::lazy_static! {
    static ref NUMBERING_XML: String = {
        let mut bullet_levels = String::new();
        let mut decimal_levels = String::new();
        for lvl in 0..9u32 {
            let indent = 720 * (lvl + 1);
            bullet_levels.push_str(&format!(
                "<w:lvl w:ilvl=\"{lvl}\"><w:start w:val=\"1\"/><w:numFmt w:val=\"bullet\"/>\
                 <w:lvlText w:val=\"\u{2022}\"/><w:lvlJc w:val=\"left\"/>\
                 <w:pPr><w:ind w:left=\"{indent}\" w:hanging=\"360\"/></w:pPr></w:lvl>"
            ));
            decimal_levels.push_str(&format!(
                "<w:lvl w:ilvl=\"{lvl}\"><w:start w:val=\"1\"/><w:numFmt w:val=\"decimal\"/>\
                 <w:lvlText w:val=\"%{}.\"/><w:lvlJc w:val=\"left\"/>\
                 <w:pPr><w:ind w:left=\"{indent}\" w:hanging=\"360\"/></w:pPr></w:lvl>",
                lvl + 1
            ));
        }
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:numbering xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:abstractNum w:abstractNumId="0">{bullet_levels}</w:abstractNum>
  <w:abstractNum w:abstractNumId="1">{decimal_levels}</w:abstractNum>
  <w:num w:numId="{NUM_ID_BULLET}"><w:abstractNumId w:val="0"/></w:num>
  <w:num w:numId="{NUM_ID_DECIMAL}"><w:abstractNumId w:val="1"/></w:num>
</w:numbering>"#
        )
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::build_document;
    use crate::tokenize;
    use std::io::Read;
    use zip::ZipArchive;

    fn read_part(bytes: &[u8], name: &str) -> String {
        let mut archive = ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
        let mut part = archive.by_name(name).unwrap();
        let mut content = String::new();
        part.read_to_string(&mut content).unwrap();
        content
    }

    #[test]
    fn package_is_a_zip_with_all_parts() {
        let doc = build_document(&tokenize("hello"));
        let bytes = write_docx(&doc).unwrap();
        assert_eq!(&bytes[..2], b"PK");

        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        for name in [
            "[Content_Types].xml",
            "_rels/.rels",
            "word/document.xml",
            "word/_rels/document.xml.rels",
            "word/styles.xml",
            "word/numbering.xml",
        ] {
            assert!(archive.by_name(name).is_ok(), "missing part {name}");
        }
    }

    #[test]
    fn text_and_styles_reach_the_document_part() {
        let doc = build_document(&tokenize("# Head\n\nplain **bold**"));
        let bytes = write_docx(&doc).unwrap();
        let document = read_part(&bytes, "word/document.xml");
        assert!(document.contains("<w:pStyle w:val=\"Heading1\"/>"));
        assert!(document.contains("<w:t xml:space=\"preserve\">Head</w:t>"));
        assert!(document.contains("<w:rPr><w:b/></w:rPr>"));
    }

    #[test]
    fn math_run_embeds_omml() {
        let doc = build_document(&tokenize(r"$\frac{1}{2}$"));
        let bytes = write_docx(&doc).unwrap();
        let document = read_part(&bytes, "word/document.xml");
        assert!(document.contains("<m:oMath>"));
        assert!(document.contains("<m:f>"));
    }

    #[test]
    fn display_math_inside_a_paragraph_drops_the_block_wrapper() {
        let doc = build_document(&tokenize(r"Solve $$\frac{1}{2}$$ for x."));
        let bytes = write_docx(&doc).unwrap();
        let document = read_part(&bytes, "word/document.xml");
        assert!(document.contains("<m:oMath>"));
        assert!(!document.contains("<m:oMathPara>"));
    }

    #[test]
    fn list_paragraphs_reference_numbering() {
        let doc = build_document(&tokenize("- a\n- b\n\n1. c\n"));
        let bytes = write_docx(&doc).unwrap();
        let document = read_part(&bytes, "word/document.xml");
        assert!(document.contains("<w:numId w:val=\"1\"/>"));
        assert!(document.contains("<w:numId w:val=\"2\"/>"));

        let numbering = read_part(&bytes, "word/numbering.xml");
        assert!(numbering.contains("w:numFmt w:val=\"bullet\""));
        assert!(numbering.contains("w:numFmt w:val=\"decimal\""));
    }

    #[test]
    fn special_characters_are_escaped() {
        let doc = build_document(&tokenize("a < b & c"));
        let bytes = write_docx(&doc).unwrap();
        let document = read_part(&bytes, "word/document.xml");
        assert!(document.contains("a &lt; b &amp; c"));
    }
}
