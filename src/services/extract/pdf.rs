// PDF 解析：pdf-extract 逐页取文字，按行拆成片段后渲染为分页块。
use super::dispatch::{DocumentFormat, DocumentParser};
use super::error::ExtractError;
use super::format::{escape_html, page_label, wrap_document};
use super::types::ParseResult;
use std::panic::{self, AssertUnwindSafe};

pub struct PdfParser;

impl DocumentParser for PdfParser {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Pdf
    }

    fn parse(&self, bytes: &[u8]) -> Result<ParseResult, ExtractError> {
        // pdf-extract 遇到损坏文件可能直接 panic，这里收敛成解析失败。
        let pages = panic::catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem_by_pages(bytes)
        }))
        .map_err(|payload| ExtractError::parse("pdf", panic_message(payload.as_ref())))?
        .map_err(|err| ExtractError::parse("pdf", err))?;
        Ok(render_pages(&pages))
    }
}

/// 将逐页文本转换为统一结果；页数以库返回的页数为准。
pub(crate) fn render_pages(pages: &[String]) -> ParseResult {
    let mut texts = Vec::with_capacity(pages.len());
    let mut blocks = String::new();
    for (idx, page) in pages.iter().enumerate() {
        let fragments: Vec<&str> = page
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        texts.push(fragments.join(" "));

        blocks.push_str(&format!(
            "<div class=\"pdf-page\" data-page=\"{number}\"><div class=\"pdf-page-header\">{label}</div>",
            number = idx + 1,
            label = page_label("pdf.page_label", idx + 1)
        ));
        for fragment in &fragments {
            blocks.push_str(&format!(
                "<span class=\"pdf-text\">{}</span>",
                escape_html(fragment)
            ));
        }
        blocks.push_str("</div>");
    }
    ParseResult {
        text: texts.join("\n"),
        html: wrap_document(DocumentFormat::Pdf, &blocks),
        page_count: pages.len() as u32,
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("pdf library panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("pdf library panicked: {message}")
    } else {
        "pdf library panicked".to_string()
    }
}
