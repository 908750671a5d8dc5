use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// docportal CLI（命令行）
///
/// Extract text and HTML from PDF/DOCX/PPTX documents.
/// 从 PDF/DOCX/PPTX 文档中提取文字与 HTML。
#[derive(Debug, Parser)]
#[command(author, version, bin_name = "docportal-cli")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Args)]
pub struct GlobalArgs {
    /// Base config path / 基础配置路径（默认 config/docportal.yaml）。
    #[arg(long = "config", global = true)]
    pub config_path: Option<PathBuf>,

    /// Language override (e.g. zh-CN / en-US) / 语言覆盖。
    #[arg(long = "lang", alias = "language", global = true)]
    pub language: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Extract documents by filename / 按文件名提取文档内容。
    Extract(ExtractCommand),

    /// List parser availability per format / 列出各格式解析器状态。
    Formats,
}

#[derive(Debug, Args)]
pub struct ExtractCommand {
    /// Filenames to extract / 待提取的文件名。
    #[arg(value_name = "FILENAME", required = true)]
    pub filenames: Vec<String>,

    /// Print the full outcome as JSON / 以 JSON 输出完整结果。
    #[arg(long, default_value_t = false, conflicts_with = "html")]
    pub json: bool,

    /// Print the rendered HTML / 输出渲染后的 HTML。
    #[arg(long, default_value_t = false)]
    pub html: bool,

    /// Select a local file (repeatable), enables file-protocol mode / 选择本地文件（可重复），启用文件协议模式。
    #[arg(long = "pick", value_name = "PATH")]
    pub picks: Vec<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_accepts_picks_and_globals() {
        let cli = Cli::try_parse_from([
            "docportal-cli",
            "extract",
            "deck.pptx",
            "--pick",
            "/tmp/deck.pptx",
            "--lang",
            "en-US",
            "--json",
        ])
        .unwrap();
        assert_eq!(cli.global.language.as_deref(), Some("en-US"));
        match cli.command {
            Command::Extract(cmd) => {
                assert_eq!(cmd.filenames, vec!["deck.pptx"]);
                assert_eq!(cmd.picks, vec![PathBuf::from("/tmp/deck.pptx")]);
                assert!(cmd.json);
                assert!(!cmd.html);
            }
            Command::Formats => panic!("expected extract"),
        }
    }

    #[test]
    fn extract_requires_filename_and_rejects_json_with_html() {
        assert!(Cli::try_parse_from(["docportal-cli", "extract"]).is_err());
        assert!(
            Cli::try_parse_from(["docportal-cli", "extract", "a.pdf", "--json", "--html"]).is_err()
        );
        assert!(Cli::try_parse_from(["docportal-cli", "formats"]).is_ok());
    }
}
