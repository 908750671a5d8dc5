mod common;

use anyhow::{Context, Result};
use axum::extract::{Path as AxumPath, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use bytes::Bytes;
use docportal::config::{Config, SourcesConfig};
use docportal::extract::{
    DocumentExtractor, DocumentLoader, ExtractError, OutcomeSource, PickedFiles, SourceChain,
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

type Documents = Arc<HashMap<String, Vec<u8>>>;

async fn serve_document(
    State(documents): State<Documents>,
    AxumPath(name): AxumPath<String>,
) -> Response {
    match documents.get(&name) {
        Some(data) => (StatusCode::OK, data.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn spawn_remote(documents: &[(&str, Vec<u8>)]) -> Result<SocketAddr> {
    let documents: Documents = Arc::new(
        documents
            .iter()
            .map(|(name, data)| (name.to_string(), data.clone()))
            .collect(),
    );
    let router = Router::new()
        .route("/docs/{name}", get(serve_document))
        .with_state(documents);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .context("bind test listener")?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    Ok(addr)
}

fn sources(remote: Option<SocketAddr>, uploads_dir: &std::path::Path) -> SourcesConfig {
    SourcesConfig {
        remote_base_url: remote
            .map(|addr| format!("http://{addr}/docs"))
            .unwrap_or_default(),
        uploads_dir: uploads_dir.to_string_lossy().to_string(),
        file_protocol_mode: false,
        timeout_s: Some(5),
    }
}

#[tokio::test]
async fn remote_source_decodes_single_path_segment() -> Result<()> {
    let addr = spawn_remote(&[("quarter one.pdf", b"%PDF-remote".to_vec())]).await?;
    let uploads = tempfile::tempdir()?;
    let chain = SourceChain::from_config(
        &sources(Some(addr), uploads.path()),
        Arc::new(PickedFiles::new()),
    );
    assert_eq!(chain.source_names(), vec!["remote", "uploads"]);

    let bytes = chain.load("quarter one.pdf").await?;
    assert_eq!(bytes, Bytes::from_static(b"%PDF-remote"));
    Ok(())
}

#[tokio::test]
async fn remote_miss_falls_through_to_uploads() -> Result<()> {
    let addr = spawn_remote(&[]).await?;
    let uploads = tempfile::tempdir()?;
    std::fs::write(uploads.path().join("local.pdf"), b"%PDF-local")?;
    let chain = SourceChain::from_config(
        &sources(Some(addr), uploads.path()),
        Arc::new(PickedFiles::new()),
    );

    assert_eq!(
        chain.load("local.pdf").await?,
        Bytes::from_static(b"%PDF-local")
    );

    match chain.load("nowhere.pdf").await {
        Err(ExtractError::Load(err)) => {
            assert_eq!(err.filename, "nowhere.pdf");
            let names: Vec<&str> = err.attempts.iter().map(|a| a.source.as_str()).collect();
            assert_eq!(names, vec!["remote", "uploads"]);
            assert!(err.attempts[0].reason.contains("HTTP 404"), "{err}");
        }
        other => panic!("unexpected result: {:?}", other.map(|b| b.len())),
    }
    Ok(())
}

#[tokio::test]
async fn file_protocol_mode_only_uses_picked_files() -> Result<()> {
    let uploads = tempfile::tempdir()?;
    std::fs::write(uploads.path().join("on-disk.pdf"), b"%PDF-disk")?;
    let picked = Arc::new(PickedFiles::new());
    picked.insert("chosen.pdf", Bytes::from_static(b"%PDF-picked"));

    let mut config = sources(None, uploads.path());
    config.file_protocol_mode = true;
    let chain = SourceChain::from_config(&config, picked);
    assert_eq!(chain.source_names(), vec!["picked_files"]);

    assert_eq!(
        chain.load("chosen.pdf").await?,
        Bytes::from_static(b"%PDF-picked")
    );
    let err = chain
        .load("on-disk.pdf")
        .await
        .err()
        .context("on-disk file must not be read in file-protocol mode")?;
    assert!(err.to_string().contains("select the file first"), "{err}");
    Ok(())
}

#[tokio::test]
async fn extractor_parses_remote_deck() -> Result<()> {
    let deck = common::pptx_with_slides(&["Roadmap", "Milestones: Q3"]);
    let addr = spawn_remote(&[("roadmap.pptx", deck)]).await?;
    let uploads = tempfile::tempdir()?;
    let config = Config {
        sources: sources(Some(addr), uploads.path()),
        ..Config::default()
    };
    let extractor = DocumentExtractor::from_config(&config, Arc::new(PickedFiles::new()));

    let outcome = extractor.extract("roadmap.pptx").await;
    assert!(outcome.success, "{:?}", outcome.error);
    assert_eq!(outcome.source, OutcomeSource::RealFile);
    assert_eq!(outcome.page_count, Some(2));
    assert_eq!(
        outcome.text_content.as_deref(),
        Some("Roadmap\n\nMilestones: Q3")
    );
    assert_eq!(outcome.title, "Roadmap");
    Ok(())
}
