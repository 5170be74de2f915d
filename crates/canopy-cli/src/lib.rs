//!
//! Canopy CLI - renders screen documents from the command line
//!
//! `canopy render screen.json --url-param id=42` decodes the document,
//! runs a render session until every data source has settled and prints
//! the resolved tree as an outline (or JSON with `--json`).
//! `canopy check screen.yaml` only decodes and validates.

use canopy_core::{fold_tree, DataScope, RenderSession, SessionConfig, ViewId};
use canopy_dsl::{decode_and_validate_json, decode_and_validate_yaml, Header, ScreenDocument};
use canopy_stdlib::{OutlineRenderer, ReqwestTransport};
use clap::{Args, Parser as ClapParser, Subcommand};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

pub mod config;
pub mod error;
pub mod logging;

pub use config::CliConfig;
pub use error::{CliError, CliResult};

/// Command-line interface
#[derive(ClapParser, Debug)]
#[command(name = "canopy")]
#[command(about = "Render Canopy screen documents")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Emit JSON logs
    #[arg(long, global = true)]
    pub log_json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render a screen, waiting for its data sources to settle
    Render(RenderArgs),
    /// Decode and validate a screen without fetching anything
    Check {
        /// Path to a .json, .yaml or .yml document
        file: PathBuf,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct RenderArgs {
    /// Path to a .json, .yaml or .yml document
    pub file: PathBuf,

    /// Deep-link parameter, repeatable
    #[arg(long = "url-param", value_name = "KEY=VALUE")]
    pub url_params: Vec<String>,

    /// Host-supplied value (JSON, or a plain string), repeatable
    #[arg(long = "user-info", value_name = "KEY=JSON")]
    pub user_info: Vec<String>,

    /// Initial data payload of the screen
    #[arg(long, value_name = "JSON")]
    pub data: Option<String>,

    /// Header added to every data source request, repeatable
    #[arg(long = "header", value_name = "KEY=VALUE")]
    pub headers: Vec<String>,

    /// Current page of a carousel instance (`node` or `node#index`), repeatable
    #[arg(long = "page", value_name = "VIEW=INDEX")]
    pub pages: Vec<String>,

    /// Print the render tree as JSON instead of an outline
    #[arg(long)]
    pub json: bool,

    /// Override CANOPY_SETTLE_TIMEOUT_MS
    #[arg(long, value_name = "MS")]
    pub settle_timeout_ms: Option<u64>,
}

/// Split a `key=value` argument
pub fn parse_key_value(arg: &str) -> CliResult<(String, String)> {
    match arg.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(CliError::InvalidKeyValue(arg.to_string())),
    }
}

/// Build the base scope of the screen from the render arguments
pub fn build_scope(args: &RenderArgs) -> CliResult<DataScope> {
    let data = match &args.data {
        Some(raw) => serde_json::from_str(raw).map_err(|e| CliError::InvalidData(e.to_string()))?,
        None => Value::Null,
    };

    let mut scope = DataScope::from_data(data);
    for arg in &args.url_params {
        let (key, value) = parse_key_value(arg)?;
        scope = scope.with_url_parameter(key, value);
    }
    for arg in &args.user_info {
        let (key, raw) = parse_key_value(arg)?;
        let value = serde_json::from_str(&raw).unwrap_or(Value::String(raw));
        scope = scope.with_user_info(key, value);
    }
    Ok(scope)
}

fn parse_page(arg: &str) -> CliResult<(ViewId, usize)> {
    let (view, index) = parse_key_value(arg)?;
    let view_id = view.parse::<ViewId>().map_err(CliError::InvalidViewId)?;
    let page = index
        .parse::<usize>()
        .map_err(|_| CliError::InvalidViewId(format!("invalid page index in '{}'", arg)))?;
    Ok((view_id, page))
}

/// Read, decode and validate a document, choosing the format by extension
pub async fn load_document(path: &Path) -> CliResult<ScreenDocument> {
    let contents = tokio::fs::read_to_string(path).await.map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let document = match path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml") | Some("yml") => decode_and_validate_yaml(&contents)?,
        Some("json") | None => decode_and_validate_json(&contents)?,
        Some(other) => return Err(CliError::UnsupportedFormat(other.to_string())),
    };

    Ok(document)
}

fn diagnostic_lines(document: &ScreenDocument) -> Vec<String> {
    document
        .diagnostics
        .iter()
        .map(|d| format!("! dropped {} [{}]: {}", d.path, d.error.error_code(), d.error))
        .collect()
}

/// Render a document to quiescence and format the result
pub async fn render(args: &RenderArgs, config: &CliConfig) -> CliResult<String> {
    let document = load_document(&args.file).await?;
    let diagnostics = diagnostic_lines(&document);
    let scope = build_scope(args)?;

    let default_headers = args
        .headers
        .iter()
        .map(|arg| parse_key_value(arg).map(|(key, value)| Header::new(key, value)))
        .collect::<CliResult<Vec<_>>>()?;
    let pages = args.pages.iter().map(|arg| parse_page(arg)).collect::<CliResult<Vec<_>>>()?;

    let transport = ReqwestTransport::from_config(&config.transport_config())?;
    let session_config = SessionConfig {
        default_headers,
        ..SessionConfig::default()
    };
    let mut session = RenderSession::with_config(document, Arc::new(transport), scope, session_config);

    for (view_id, page) in pages {
        session.page_changed(view_id, page);
    }

    let settle_timeout = args
        .settle_timeout_ms
        .map(std::time::Duration::from_millis)
        .unwrap_or_else(|| config.settle_timeout());
    let tree = session.settle(settle_timeout).await?;
    info!("Rendered {} nodes from {}", tree.root.count(), args.file.display());

    if args.json {
        return Ok(tree.to_json()?);
    }

    let mut lines = vec![fold_tree(&mut OutlineRenderer::new(), &tree.root)];
    lines.extend(diagnostics);
    Ok(lines.join("\n"))
}

/// Decode and validate a document and summarize it
pub async fn check(path: &Path) -> CliResult<String> {
    let document = load_document(path).await?;

    let mut lines = vec![format!(
        "{}: {} nodes, {} dropped",
        path.display(),
        document.root.count(),
        document.diagnostics.len()
    )];
    lines.extend(diagnostic_lines(&document));
    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_key_value() {
        assert_eq!(parse_key_value("id=42").unwrap(), ("id".to_string(), "42".to_string()));
        assert_eq!(parse_key_value("q=a=b").unwrap(), ("q".to_string(), "a=b".to_string()));
        assert_eq!(parse_key_value("empty=").unwrap(), ("empty".to_string(), String::new()));
        assert!(matches!(parse_key_value("novalue"), Err(CliError::InvalidKeyValue(_))));
        assert!(matches!(parse_key_value("=x"), Err(CliError::InvalidKeyValue(_))));
    }

    #[test]
    fn test_build_scope() {
        let args = RenderArgs {
            data: Some(r#"{"id": "42"}"#.to_string()),
            url_params: vec!["category=shoes".to_string()],
            user_info: vec!["age=42".to_string(), "name=Ada".to_string(), "tags=[\"a\"]".to_string()],
            ..RenderArgs::default()
        };

        let scope = build_scope(&args).unwrap();
        assert_eq!(scope.data, json!({"id": "42"}));
        assert_eq!(scope.url_parameters.get("category").map(String::as_str), Some("shoes"));
        assert_eq!(scope.user_info.get("age"), Some(&json!(42)));
        assert_eq!(scope.user_info.get("name"), Some(&json!("Ada")));
        assert_eq!(scope.user_info.get("tags"), Some(&json!(["a"])));
    }

    #[test]
    fn test_invalid_initial_data() {
        let args = RenderArgs {
            data: Some("{not json".to_string()),
            ..RenderArgs::default()
        };
        assert!(matches!(build_scope(&args), Err(CliError::InvalidData(_))));
    }

    #[test]
    fn test_parse_page() {
        assert_eq!(parse_page("hero=2").unwrap(), (ViewId::root("hero"), 2));
        assert_eq!(parse_page("hero#1=3").unwrap(), (ViewId::new("hero", Some(1)), 3));
        assert!(matches!(parse_page("hero=x"), Err(CliError::InvalidViewId(_))));
        assert!(matches!(parse_page("#1=0"), Err(CliError::InvalidViewId(_))));
    }

    #[test]
    fn test_cli_parses_render_flags() {
        let cli = Cli::try_parse_from([
            "canopy",
            "render",
            "screen.json",
            "--url-param",
            "id=42",
            "--url-param",
            "lang=en",
            "--header",
            "X-Client=canopy",
            "--json",
            "--log-json",
        ])
        .unwrap();

        assert!(cli.log_json);
        match cli.command {
            Commands::Render(args) => {
                assert_eq!(args.file, PathBuf::from("screen.json"));
                assert_eq!(args.url_params, vec!["id=42", "lang=en"]);
                assert_eq!(args.headers, vec!["X-Client=canopy"]);
                assert!(args.json);
                assert_eq!(args.settle_timeout_ms, None);
            }
            other => panic!("Expected render command, got {:?}", other),
        }
    }
}
