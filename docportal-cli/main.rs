mod args;

use anyhow::{anyhow, Context, Result};
use args::{Cli, Command, ExtractCommand, GlobalArgs};
use bytes::Bytes;
use clap::Parser;
use docportal::config::{load_config, load_config_from, Config};
use docportal::extract::{
    DocumentExtractor, DocumentFormat, ExtractionOutcome, ParserRegistry, PickedFiles,
};
use docportal::i18n;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_tracing();
    let cli = Cli::parse();
    let config = resolve_config(&cli.global);

    match cli.command {
        Command::Extract(cmd) => handle_extract(config, cmd).await,
        Command::Formats => {
            handle_formats(&config);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn resolve_config(global: &GlobalArgs) -> Config {
    let config = match global.config_path.as_deref() {
        Some(path) => load_config_from(path, None),
        None => load_config(),
    };
    let language = global
        .language
        .clone()
        .unwrap_or_else(|| config.i18n.default_language.clone());
    i18n::configure_i18n(
        Some(language),
        Some(config.i18n.supported_languages.clone()),
    );
    config
}

async fn handle_extract(mut config: Config, cmd: ExtractCommand) -> Result<ExitCode> {
    let picked_files = Arc::new(PickedFiles::new());
    if !cmd.picks.is_empty() {
        // 选择了本地文件即视为文件协议模式。
        config.sources.file_protocol_mode = true;
        for path in &cmd.picks {
            let (filename, data) = read_pick(path).await?;
            picked_files.insert(filename, data);
        }
    }
    let extractor = DocumentExtractor::from_config(&config, picked_files);

    let mut all_succeeded = true;
    let mut outcomes = Vec::with_capacity(cmd.filenames.len());
    for filename in &cmd.filenames {
        let outcome = extractor.extract(filename).await;
        all_succeeded &= outcome.success;
        outcomes.push((filename.as_str(), outcome));
    }

    if cmd.json {
        let payload = if outcomes.len() == 1 {
            serde_json::to_string_pretty(&outcomes[0].1)?
        } else {
            let list: Vec<&ExtractionOutcome> = outcomes.iter().map(|(_, item)| item).collect();
            serde_json::to_string_pretty(&list)?
        };
        println!("{payload}");
    } else {
        for (filename, outcome) in &outcomes {
            print_outcome(filename, outcome, cmd.html);
        }
    }

    Ok(if all_succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn read_pick(path: &Path) -> Result<(String, Bytes)> {
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow!("invalid file path: {}", path.display()))?
        .to_string();
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok((filename, Bytes::from(data)))
}

fn print_outcome(filename: &str, outcome: &ExtractionOutcome, html: bool) {
    let mut header = format!("== {filename} [{}] {}", outcome.source.as_str(), outcome.title);
    if let Some(pages) = outcome.page_count {
        header.push_str(&format!(" ({pages} pages)"));
    }
    println!("{header}");
    if html {
        println!("{}", outcome.html_content);
    } else if let Some(text) = outcome.text_content.as_deref() {
        println!("{text}");
    } else if let Some(error) = outcome.error.as_deref() {
        println!("{error}");
    }
    println!();
}

fn handle_formats(config: &Config) {
    let registry = ParserRegistry::bootstrap(&config.formats);
    for format in DocumentFormat::ALL {
        let status = registry
            .resolve(&format!("document.{}", format.extension()))
            .and_then(|parser| parser.ensure_ready());
        match status {
            Ok(()) => println!("{format}\tready"),
            Err(err) => println!("{format}\t{err}"),
        }
    }
}
