// 静态兜底内容：实时解析不可用时，按文件名返回预置的标题与 HTML。
use crate::config::FallbackDocumentConfig;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackDocument {
    pub title: String,
    pub content: String,
}

/// 构造后只读；配置中的条目覆盖同名内置条目。
#[derive(Debug, Clone, Default)]
pub struct FallbackLibrary {
    entries: HashMap<String, FallbackDocument>,
}

const BUILTIN_DOCUMENTS: &[(&str, &str, &str)] = &[
    (
        "员工手册.pdf",
        "员工手册",
        "<div class=\"fallback-content\"><h2>员工手册</h2>\
<p>本手册介绍公司的基本制度、考勤规则与福利政策。</p>\
<ul><li>工作时间：周一至周五 9:00-18:00</li><li>年假：入职满一年享有 5 天带薪年假</li>\
<li>报销：费用发生后 30 天内提交申请</li></ul></div>",
    ),
    (
        "产品介绍.pptx",
        "产品介绍",
        "<div class=\"fallback-content\"><h2>产品介绍</h2>\
<p>文档门户用于统一预览 PDF、Word 与 PowerPoint 文件。</p>\
<ul><li>多来源加载：远程地址、本地上传目录与用户选择的文件</li>\
<li>解析失败时自动降级为预置内容或提示信息</li></ul></div>",
    ),
    (
        "项目周报.docx",
        "项目周报",
        "<div class=\"fallback-content\"><h2>项目周报</h2>\
<p>本周完成文档解析管线的缓存与降级逻辑，下周计划接入更多文档来源。</p></div>",
    ),
];

impl FallbackLibrary {
    pub fn builtin() -> Self {
        let entries = BUILTIN_DOCUMENTS
            .iter()
            .map(|(filename, title, content)| {
                (
                    filename.to_string(),
                    FallbackDocument {
                        title: title.to_string(),
                        content: content.to_string(),
                    },
                )
            })
            .collect();
        Self { entries }
    }

    pub fn from_config(documents: &[FallbackDocumentConfig]) -> Self {
        let mut library = Self::builtin();
        for document in documents {
            let filename = document.filename.trim();
            if filename.is_empty() {
                continue;
            }
            let title = if document.title.trim().is_empty() {
                super::types::filename_stem(filename)
            } else {
                document.title.trim().to_string()
            };
            library.entries.insert(
                filename.to_string(),
                FallbackDocument {
                    title,
                    content: document.content.clone(),
                },
            );
        }
        library
    }

    pub fn get(&self, filename: &str) -> Option<&FallbackDocument> {
        self.entries.get(filename)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_entries_present() {
        let library = FallbackLibrary::builtin();
        assert_eq!(library.len(), BUILTIN_DOCUMENTS.len());
        let doc = library.get("员工手册.pdf").unwrap();
        assert_eq!(doc.title, "员工手册");
        assert!(doc.content.contains("fallback-content"));
        assert!(library.get("unknown.pdf").is_none());
    }

    #[test]
    fn test_config_overrides_builtin() {
        let library = FallbackLibrary::from_config(&[
            FallbackDocumentConfig {
                filename: "员工手册.pdf".to_string(),
                title: "新版手册".to_string(),
                content: "<p>v2</p>".to_string(),
            },
            FallbackDocumentConfig {
                filename: "faq.docx".to_string(),
                title: String::new(),
                content: "<p>faq</p>".to_string(),
            },
            FallbackDocumentConfig {
                filename: "  ".to_string(),
                title: "ignored".to_string(),
                content: String::new(),
            },
        ]);
        assert_eq!(library.len(), BUILTIN_DOCUMENTS.len() + 1);
        assert_eq!(library.get("员工手册.pdf").unwrap().content, "<p>v2</p>");
        assert_eq!(library.get("faq.docx").unwrap().title, "faq");
    }
}
