// PPTX 解析：按数字顺序读取 ppt/slides/slideN.xml，逐页提取文字并渲染。
use super::dispatch::{DocumentFormat, DocumentParser};
use super::error::{ExtractError, SlideExtractionError};
use super::format::{escape_html, page_label, wrap_document};
use super::ooxml::{open_archive, read_entry_string, OoxmlArchive};
use super::slide_text::extract_slide_text;
use super::types::ParseResult;
use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, error, warn};

const SLIDE_TITLE_MAX_CHARS: usize = 80;
const SENTENCE_TERMINALS: &[char] = &['.', '。', '!', '！', '?', '？', '\n'];
const ITEM_MARKERS: &[char] = &['-', '•', '·', '*'];

pub struct PptxParser;

impl DocumentParser for PptxParser {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Pptx
    }

    fn parse(&self, bytes: &[u8]) -> Result<ParseResult, ExtractError> {
        let mut archive = open_archive(bytes, "pptx")?;
        let slide_names = list_slide_entries(&archive)?;

        let mut texts = Vec::with_capacity(slide_names.len());
        let mut blocks = Vec::with_capacity(slide_names.len());
        for (idx, name) in slide_names.iter().enumerate() {
            let number = idx + 1;
            match read_slide(&mut archive, number, name) {
                Ok(xml) => {
                    let slide = extract_slide_text(&xml);
                    debug!("slide {number} ({name}) extracted via {}", slide.strategy);
                    blocks.push(render_slide_html(number, &slide.text));
                    texts.push(slide.text);
                }
                Err(err) => {
                    warn!("pptx slide skipped: {err}");
                    texts.push(format!("[slide {number} failed: {}]", err.detail));
                    blocks.push(render_error_slide_html(number, &err.detail));
                }
            }
        }

        Ok(ParseResult {
            text: texts.join("\n\n"),
            html: wrap_document(DocumentFormat::Pptx, &blocks.concat()),
            page_count: slide_names.len() as u32,
        })
    }
}

/// 返回按 N 数值升序排列的幻灯片条目名。
fn list_slide_entries(archive: &OoxmlArchive<'_>) -> Result<Vec<String>, ExtractError> {
    static SLIDE_RE: OnceLock<Option<Regex>> = OnceLock::new();
    let slide_re = SLIDE_RE
        .get_or_init(|| match Regex::new(r"^ppt/slides/slide(\d+)\.xml$") {
            Ok(regex) => Some(regex),
            Err(err) => {
                error!("invalid slide entry regex: {err}");
                None
            }
        })
        .as_ref()
        .ok_or_else(|| ExtractError::Internal("slide entry pattern unavailable".to_string()))?;

    let mut slides: Vec<(u64, String)> = archive
        .file_names()
        .filter_map(|name| {
            let caps = slide_re.captures(name)?;
            let index = caps.get(1)?.as_str().parse::<u64>().ok()?;
            Some((index, name.to_string()))
        })
        .collect();
    slides.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
    Ok(slides.into_iter().map(|(_, name)| name).collect())
}

fn read_slide(
    archive: &mut OoxmlArchive<'_>,
    number: usize,
    name: &str,
) -> Result<String, SlideExtractionError> {
    read_entry_string(archive, name).map_err(|detail| SlideExtractionError {
        slide: number,
        detail,
    })
}

/// 单页渲染：首个短句作为标题，列表样式片段渲染为条目，其余为段落。
pub(crate) fn render_slide_html(number: usize, text: &str) -> String {
    let mut html = format!(
        "<div class=\"slide\" data-slide=\"{number}\"><div class=\"slide-header\">{}</div>",
        page_label("slide.label", number)
    );
    let fragments: Vec<&str> = text
        .split(SENTENCE_TERMINALS)
        .map(str::trim)
        .filter(|fragment| !fragment.is_empty())
        .collect();

    if fragments.is_empty() {
        html.push_str(&format!(
            "<div class=\"slide-empty\">{}</div>",
            escape_html(&crate::i18n::t("slide.empty"))
        ));
    } else {
        html.push_str("<div class=\"slide-body\">");
        for (idx, fragment) in fragments.iter().enumerate() {
            let escaped = escape_html(fragment);
            if idx == 0 && fragment.chars().count() < SLIDE_TITLE_MAX_CHARS {
                html.push_str(&format!("<h4 class=\"slide-title\">{escaped}</h4>"));
            } else if idx > 0 && looks_like_item(fragment) {
                html.push_str(&format!("<div class=\"slide-item\">{escaped}</div>"));
            } else {
                html.push_str(&format!("<p>{escaped}</p>"));
            }
        }
        html.push_str("</div>");
    }
    html.push_str("</div>");
    html
}

fn render_error_slide_html(number: usize, detail: &str) -> String {
    format!(
        "<div class=\"slide slide-error\" data-slide=\"{number}\"><div class=\"slide-header\">{}</div><p><strong>{}</strong></p><p class=\"slide-error-detail\">{}</p></div>",
        page_label("slide.label", number),
        escape_html(&crate::i18n::t("slide.failed")),
        escape_html(detail)
    )
}

fn looks_like_item(fragment: &str) -> bool {
    let starts_with_marker = fragment
        .chars()
        .next()
        .map(|ch| ch.is_ascii_digit() || ITEM_MARKERS.contains(&ch))
        .unwrap_or(false);
    starts_with_marker || fragment.contains(':') || fragment.contains('：')
}
