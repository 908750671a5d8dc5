#![allow(dead_code)]

use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::ZipWriter;

pub fn build_zip(entries: &[(String, Vec<u8>)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        writer
            .start_file(name.as_str(), FileOptions::default())
            .expect("start zip entry");
        writer.write_all(data).expect("write zip entry");
    }
    writer.finish().expect("finish zip").into_inner()
}

pub fn slide_xml(text: &str) -> String {
    let body = if text.is_empty() {
        String::new()
    } else {
        format!("<p:sp><p:txBody><a:p><a:r><a:t>{text}</a:t></a:r></a:p></p:txBody></p:sp>")
    };
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld><p:spTree>{body}</p:spTree></p:cSld></p:sld>"#
    )
}

/// 每个元素对应一张幻灯片，空串表示无文字的幻灯片。
pub fn pptx_with_slides(slides: &[&str]) -> Vec<u8> {
    let mut entries = vec![(
        "ppt/presentation.xml".to_string(),
        b"<p:presentation/>".to_vec(),
    )];
    for (idx, text) in slides.iter().enumerate() {
        entries.push((
            format!("ppt/slides/slide{}.xml", idx + 1),
            slide_xml(text).into_bytes(),
        ));
    }
    build_zip(&entries)
}

pub fn docx_with_paragraphs(paragraphs: &[&str]) -> Vec<u8> {
    let body: String = paragraphs
        .iter()
        .map(|text| format!("<w:p><w:r><w:t>{text}</w:t></w:r></w:p>"))
        .collect();
    let xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
    );
    build_zip(&[("word/document.xml".to_string(), xml.into_bytes())])
}
