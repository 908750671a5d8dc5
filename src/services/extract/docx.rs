// DOCX 解析：读取 word/document.xml，事件流转换为段落、标题、列表与表格。
use super::dispatch::{DocumentFormat, DocumentParser};
use super::error::ExtractError;
use super::format::{escape_html, wrap_document};
use super::ooxml::{attr_value, local_name, open_archive, read_entry_string};
use super::types::ParseResult;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader as XmlReader;

const DOCUMENT_ENTRY: &str = "word/document.xml";

pub struct DocxParser;

impl DocumentParser for DocxParser {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Docx
    }

    fn parse(&self, bytes: &[u8]) -> Result<ParseResult, ExtractError> {
        let mut archive = open_archive(bytes, "docx")?;
        let xml = read_entry_string(&mut archive, DOCUMENT_ENTRY)
            .map_err(|detail| ExtractError::parse("docx", detail))?;
        let body = convert_document_xml(&xml)?;
        Ok(ParseResult {
            text: body.lines.join("\n"),
            html: wrap_document(DocumentFormat::Docx, &body.html),
            page_count: 1,
        })
    }
}

#[derive(Default)]
struct ParagraphState {
    text: String,
    style: Option<String>,
    numbered: bool,
}

#[derive(Default)]
struct DocxBody {
    html: String,
    lines: Vec<String>,
    list_open: bool,
}

impl DocxBody {
    fn push_paragraph(&mut self, paragraph: ParagraphState) {
        let text = paragraph.text.trim();
        if text.is_empty() {
            return;
        }
        self.lines.push(text.to_string());
        let inline = inline_html(text);
        if let Some(level) = heading_level(paragraph.style.as_deref()) {
            self.close_list();
            self.html.push_str(&format!("<h{level}>{inline}</h{level}>"));
        } else if paragraph.numbered {
            if !self.list_open {
                self.html.push_str("<ul>");
                self.list_open = true;
            }
            self.html.push_str(&format!("<li>{inline}</li>"));
        } else {
            self.close_list();
            self.html.push_str(&format!("<p>{inline}</p>"));
        }
    }

    fn push_table(&mut self, rows: Vec<Vec<String>>) {
        self.close_list();
        if rows.is_empty() {
            return;
        }
        self.html.push_str("<table><tbody>");
        for row in &rows {
            self.html.push_str("<tr>");
            for cell in row {
                self.html.push_str(&format!("<td>{}</td>", inline_html(cell)));
            }
            self.html.push_str("</tr>");

            let line = row
                .iter()
                .map(|cell| cell.replace('\n', " "))
                .collect::<Vec<_>>()
                .join("\t");
            if !line.trim().is_empty() {
                self.lines.push(line);
            }
        }
        self.html.push_str("</tbody></table>");
    }

    fn close_list(&mut self) {
        if self.list_open {
            self.html.push_str("</ul>");
            self.list_open = false;
        }
    }
}

/// 只渲染最外层表格；嵌套表格的文字并入外层单元格。
/// 文本框里的段落嵌在外层段落中，先于外层段落输出。
#[derive(Default)]
struct DocxConverter {
    body: DocxBody,
    paragraphs: Vec<ParagraphState>,
    in_text: bool,
    in_tab_stops: bool,
    table_depth: usize,
    rows: Vec<Vec<String>>,
    row: Vec<String>,
    cell: Option<String>,
}

impl DocxConverter {
    fn on_start(&mut self, element: &BytesStart, empty: bool) {
        let name = element.name();
        let local = local_name(name.as_ref());
        match local {
            b"p" => {
                self.start_paragraph();
                if empty {
                    self.end_paragraph();
                }
            }
            b"pStyle" => {
                if let Some(paragraph) = self.paragraphs.last_mut() {
                    paragraph.style = attr_value(element, b"val");
                }
            }
            b"numPr" => {
                if let Some(paragraph) = self.paragraphs.last_mut() {
                    paragraph.numbered = true;
                }
            }
            b"tabs" => self.in_tab_stops = !empty,
            b"t" => self.in_text = !empty,
            b"tab" => {
                if !self.in_tab_stops {
                    self.append("\t");
                }
            }
            b"br" | b"cr" => self.append("\n"),
            b"tbl" => {
                self.table_depth += 1;
                if self.table_depth == 1 {
                    self.rows.clear();
                }
            }
            b"tr" => {
                if self.table_depth == 1 {
                    self.row.clear();
                }
            }
            b"tc" => {
                if self.table_depth == 1 {
                    self.cell = Some(String::new());
                }
            }
            _ => {}
        }
    }

    fn on_end(&mut self, local: &[u8]) {
        match local {
            b"t" => self.in_text = false,
            b"tabs" => self.in_tab_stops = false,
            b"p" => self.end_paragraph(),
            b"tc" => {
                if self.table_depth == 1 {
                    if let Some(cell) = self.cell.take() {
                        self.row.push(cell.trim().to_string());
                    }
                } else if self.table_depth > 1 {
                    self.append(" ");
                }
            }
            b"tr" => {
                if self.table_depth == 1 && !self.row.is_empty() {
                    self.rows.push(std::mem::take(&mut self.row));
                }
            }
            b"tbl" => {
                if self.table_depth == 1 {
                    let rows = std::mem::take(&mut self.rows);
                    self.body.push_table(rows);
                }
                self.table_depth = self.table_depth.saturating_sub(1);
            }
            _ => {}
        }
    }

    fn start_paragraph(&mut self) {
        if self.table_depth == 0 {
            self.paragraphs.push(ParagraphState::default());
        } else if let Some(cell) = self.cell.as_mut() {
            if !cell.is_empty() && !cell.ends_with('\n') {
                cell.push('\n');
            }
        }
    }

    fn end_paragraph(&mut self) {
        if self.table_depth == 0 {
            if let Some(paragraph) = self.paragraphs.pop() {
                self.body.push_paragraph(paragraph);
            }
        }
    }

    fn append(&mut self, text: &str) {
        if self.table_depth > 0 {
            if let Some(cell) = self.cell.as_mut() {
                cell.push_str(text);
            }
        } else if let Some(paragraph) = self.paragraphs.last_mut() {
            paragraph.text.push_str(text);
        }
    }

    fn finish(mut self) -> DocxBody {
        while let Some(paragraph) = self.paragraphs.pop() {
            self.body.push_paragraph(paragraph);
        }
        self.body.close_list();
        self.body
    }
}

fn convert_document_xml(xml: &str) -> Result<DocxBody, ExtractError> {
    let mut reader = XmlReader::from_str(xml);
    reader.trim_text(false);
    let mut buf = Vec::new();
    let mut converter = DocxConverter::default();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => converter.on_start(e, false),
            Ok(Event::Empty(ref e)) => converter.on_start(e, true),
            Ok(Event::Text(e)) => {
                if converter.in_text {
                    let text = e
                        .unescape()
                        .map_err(|err| ExtractError::parse("docx", err))?;
                    converter.append(text.as_ref());
                }
            }
            Ok(Event::End(ref e)) => {
                let name = e.name();
                converter.on_end(local_name(name.as_ref()));
            }
            Ok(Event::Eof) => break,
            Err(err) => {
                return Err(ExtractError::parse(
                    "docx",
                    format!(
                        "malformed document.xml at position {}: {err}",
                        reader.buffer_position()
                    ),
                ))
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(converter.finish())
}

fn heading_level(style: Option<&str>) -> Option<usize> {
    let style = style?.trim();
    if style.eq_ignore_ascii_case("title") {
        return Some(1);
    }
    let lowered = style.to_ascii_lowercase();
    let level = lowered.strip_prefix("heading")?.trim().parse::<usize>().ok()?;
    (1..=6).contains(&level).then_some(level)
}

fn inline_html(text: &str) -> String {
    escape_html(text)
        .replace('\n', "<br>")
        .replace('\t', "&emsp;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use zip::write::FileOptions;
    use zip::ZipWriter;

    fn build_docx(document_xml: Option<&str>) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("[Content_Types].xml", FileOptions::default())
            .unwrap();
        writer.write_all(b"<Types/>").unwrap();
        if let Some(xml) = document_xml {
            writer
                .start_file(DOCUMENT_ENTRY, FileOptions::default())
                .unwrap();
            writer.write_all(xml.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn wrap_body(body: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
        )
    }

    fn para(text: &str) -> String {
        format!("<w:p><w:r><w:t>{text}</w:t></w:r></w:p>")
    }

    fn list_item(text: &str) -> String {
        format!(
            r#"<w:p><w:pPr><w:numPr><w:ilvl w:val="0"/><w:numId w:val="1"/></w:numPr></w:pPr><w:r><w:t>{text}</w:t></w:r></w:p>"#
        )
    }

    fn cell(text: &str) -> String {
        format!("<w:tc><w:p><w:r><w:t>{text}</w:t></w:r></w:p></w:tc>")
    }

    #[test]
    fn test_document_structure_is_converted() {
        let body = [
            r#"<w:p><w:pPr><w:pStyle w:val="Heading1"/></w:pPr><w:r><w:t>Project Plan</w:t></w:r></w:p>"#.to_string(),
            r#"<w:p><w:pPr><w:tabs><w:tab w:val="left" w:pos="720"/></w:tabs></w:pPr><w:r><w:t>Owner:</w:t><w:tab/><w:t>Alice</w:t></w:r></w:p>"#.to_string(),
            r#"<w:p><w:r><w:t>Line one</w:t><w:br/><w:t>Line two</w:t></w:r></w:p>"#.to_string(),
            list_item("Draft"),
            list_item("Review"),
            format!(
                "<w:tbl><w:tr>{}{}</w:tr><w:tr>{}{}</w:tr></w:tbl>",
                cell("Phase"),
                cell("Weeks"),
                cell("Build"),
                cell("4")
            ),
            para("Done"),
        ]
        .concat();
        let result = DocxParser
            .parse(&build_docx(Some(&wrap_body(&body))))
            .unwrap();

        assert_eq!(result.page_count, 1);
        assert_eq!(
            result.text,
            "Project Plan\nOwner:\tAlice\nLine one\nLine two\nDraft\nReview\nPhase\tWeeks\nBuild\t4\nDone"
        );
        assert!(result.html.contains("<h1>Project Plan</h1>"));
        assert!(result.html.contains("<p>Owner:&emsp;Alice</p>"));
        assert!(result.html.contains("<p>Line one<br>Line two</p>"));
        assert!(result.html.contains("<ul><li>Draft</li><li>Review</li></ul>"));
        assert!(result
            .html
            .contains("<tr><td>Phase</td><td>Weeks</td></tr><tr><td>Build</td><td>4</td></tr>"));
        assert!(result.html.contains("document-content docx-content"));
    }

    #[test]
    fn test_lists_are_split_by_plain_paragraphs() {
        let body = [list_item("a"), para("between"), list_item("b")].concat();
        let result = DocxParser
            .parse(&build_docx(Some(&wrap_body(&body))))
            .unwrap();
        assert_eq!(result.html.matches("<ul>").count(), 2);
        assert_eq!(result.html.matches("</ul>").count(), 2);
    }

    #[test]
    fn test_text_box_keeps_surrounding_paragraph() {
        let body = concat!(
            r#"<w:p><w:pPr><w:pStyle w:val="Heading2"/></w:pPr><w:r><w:t>Outer</w:t></w:r>"#,
            "<w:r><w:drawing><wp:anchor><a:graphic><a:graphicData><wps:wsp><wps:txbx><w:txbxContent>",
            "<w:p><w:r><w:t>Inner</w:t></w:r></w:p>",
            "</w:txbxContent></wps:txbx></wps:wsp></a:graphicData></a:graphic></wp:anchor></w:drawing></w:r>",
            r#"<w:r><w:t xml:space="preserve"> tail</w:t></w:r></w:p>"#,
        );
        let result = DocxParser
            .parse(&build_docx(Some(&wrap_body(body))))
            .unwrap();
        assert_eq!(result.text, "Inner\nOuter tail");
        assert!(result.html.contains("<p>Inner</p>"));
        assert!(result.html.contains("<h2>Outer tail</h2>"));
    }

    #[test]
    fn test_title_and_heading_levels() {
        assert_eq!(heading_level(Some("Title")), Some(1));
        assert_eq!(heading_level(Some("Heading3")), Some(3));
        assert_eq!(heading_level(Some("heading 6")), Some(6));
        assert_eq!(heading_level(Some("Heading7")), None);
        assert_eq!(heading_level(Some("Normal")), None);
        assert_eq!(heading_level(None), None);
    }

    #[test]
    fn test_entities_are_unescaped_and_reescaped() {
        let body = para("R&amp;D &lt;draft&gt;");
        let result = DocxParser
            .parse(&build_docx(Some(&wrap_body(&body))))
            .unwrap();
        assert_eq!(result.text, "R&D <draft>");
        assert!(result.html.contains("<p>R&amp;D &lt;draft&gt;</p>"));
    }

    #[test]
    fn test_missing_document_entry_is_parse_error() {
        assert!(matches!(
            DocxParser.parse(&build_docx(None)),
            Err(ExtractError::Parse { .. })
        ));
    }

    #[test]
    fn test_malformed_xml_is_parse_error() {
        let xml = wrap_body("<w:p><w:r><w:t>broken</w:r></w:t></w:p>");
        assert!(matches!(
            DocxParser.parse(&build_docx(Some(&xml))),
            Err(ExtractError::Parse { .. })
        ));
    }
}
