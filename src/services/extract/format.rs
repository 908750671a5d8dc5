// 展示层包装：为各格式的正文套上容器与内嵌样式，并生成占位/错误片段。
use super::dispatch::DocumentFormat;
use crate::i18n;
use std::collections::HashMap;

const PDF_STYLE: &str = ".pdf-content{font-family:sans-serif;line-height:1.6}\
.pdf-page{margin:0 0 24px;padding:16px;border:1px solid #e5e7eb;border-radius:6px}\
.pdf-page-header{font-size:12px;color:#6b7280;margin-bottom:8px}\
.pdf-text{margin-right:4px}";

const DOCX_STYLE: &str = ".docx-content{font-family:sans-serif;line-height:1.7}\
.docx-content table{border-collapse:collapse;margin:12px 0}\
.docx-content td{border:1px solid #d1d5db;padding:4px 8px}";

const PPTX_STYLE: &str = ".pptx-content{font-family:sans-serif}\
.slide{margin:0 0 20px;padding:20px;border:1px solid #e5e7eb;border-radius:8px;background:#fafafa}\
.slide-header{font-size:12px;color:#6b7280;margin-bottom:10px}\
.slide-item{padding-left:12px;border-left:3px solid #3b82f6;margin:6px 0}\
.slide-empty{color:#9ca3af;font-style:italic}\
.slide-error{background:#fef2f2;border-color:#fca5a5;color:#b91c1c}";

const NOTICE_STYLE: &str = ".doc-notice{padding:24px;border-radius:8px;font-family:sans-serif}\
.doc-placeholder{background:#f9fafb;border:1px dashed #d1d5db;color:#4b5563}\
.doc-error{background:#fef2f2;border:1px solid #fca5a5;color:#991b1b}";

pub fn escape_html(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '"' => output.push_str("&quot;"),
            '\'' => output.push_str("&#39;"),
            _ => output.push(ch),
        }
    }
    output
}

/// 按格式包裹解析后的正文片段。
pub fn wrap_document(format: DocumentFormat, body: &str) -> String {
    let (class, style) = match format {
        DocumentFormat::Pdf => ("pdf-content", PDF_STYLE),
        DocumentFormat::Docx => ("docx-content", DOCX_STYLE),
        DocumentFormat::Pptx => ("pptx-content", PPTX_STYLE),
        DocumentFormat::Doc | DocumentFormat::Ppt => ("legacy-content", ""),
    };
    format!("<style>{style}</style><div class=\"document-content {class}\">{body}</div>")
}

/// “仍在加载/格式说明”占位，附带导致降级的原因。
pub fn placeholder_html(filename: &str, reason: Option<&str>) -> String {
    let mut html = format!("<style>{NOTICE_STYLE}</style>");
    html.push_str("<div class=\"doc-notice doc-placeholder\">");
    html.push_str(&format!("<h3>{}</h3>", escape_html(&i18n::t("placeholder.title"))));
    html.push_str(&format!(
        "<p>{}</p>",
        escape_html(&i18n::t_with_params(
            "placeholder.body",
            &filename_params(filename)
        ))
    ));
    html.push_str(&format!(
        "<p>{}</p>",
        escape_html(&i18n::t("placeholder.formats"))
    ));
    if let Some(reason) = reason.map(str::trim).filter(|value| !value.is_empty()) {
        let params = HashMap::from([("reason".to_string(), reason.to_string())]);
        html.push_str(&format!(
            "<p class=\"doc-reason\">{}</p>",
            escape_html(&i18n::t_with_params("placeholder.reason", &params))
        ));
    }
    html.push_str("</div>");
    html
}

/// 最低保真度的错误块：文件名、错误信息与排查建议。
pub fn error_html(filename: &str, message: &str) -> String {
    let mut html = format!("<style>{NOTICE_STYLE}</style>");
    html.push_str("<div class=\"doc-notice doc-error\">");
    html.push_str(&format!("<h3>{}</h3>", escape_html(&i18n::t("error.title"))));
    html.push_str(&format!(
        "<p>{}</p>",
        escape_html(&i18n::t_with_params("error.file", &filename_params(filename)))
    ));
    html.push_str(&format!(
        "<p class=\"doc-error-message\">{}</p>",
        escape_html(message)
    ));
    html.push_str(&format!("<p>{}</p><ul>", escape_html(&i18n::t("error.causes"))));
    for key in [
        "error.cause_missing",
        "error.cause_unsupported",
        "error.cause_corrupted",
        "error.cause_network",
    ] {
        html.push_str(&format!("<li>{}</li>", escape_html(&i18n::t(key))));
    }
    html.push_str("</ul></div>");
    html
}

pub fn page_label(key: &str, number: usize) -> String {
    let params = HashMap::from([("number".to_string(), number.to_string())]);
    escape_html(&i18n::t_with_params(key, &params))
}

fn filename_params(filename: &str) -> HashMap<String, String> {
    HashMap::from([("filename".to_string(), filename.to_string())])
}
