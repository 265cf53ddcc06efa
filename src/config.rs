use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::{env, fmt, path::PathBuf};

const DEFAULT_IMAGE_FOLDER: &str = "inspection-images";
const DEFAULT_GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";
const DEFAULT_LOGIN_BASE_URL: &str = "https://login.microsoftonline.com";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub cors_origin: String,
    pub max_upload_bytes: usize,
    pub graph: GraphSettings,
}

/// Credentials and target identifiers for the Graph API.
///
/// Every identifier is optional at startup; calls that need a missing one
/// fail when they are made.
#[derive(Clone, Default)]
pub struct GraphSettings {
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub site_id: Option<String>,
    pub list_id: Option<String>,
    pub drive_id: Option<String>,
    pub image_folder: String,
    pub graph_base_url: String,
    pub login_base_url: String,
}

impl fmt::Debug for GraphSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphSettings")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("site_id", &self.site_id)
            .field("list_id", &self.list_id)
            .field("drive_id", &self.drive_id)
            .field("image_folder", &self.image_folder)
            .field("graph_base_url", &self.graph_base_url)
            .field("login_base_url", &self.login_base_url)
            .finish()
    }
}

impl GraphSettings {
    /// Names of identity settings that are not set.
    pub fn missing_identity(&self) -> Vec<&'static str> {
        missing(&[
            ("TENANT_ID", &self.tenant_id),
            ("CLIENT_ID", &self.client_id),
            ("CLIENT_SECRET", &self.client_secret),
        ])
    }

    /// Names of SharePoint target settings that are not set.
    pub fn missing_storage(&self) -> Vec<&'static str> {
        missing(&[
            ("SHAREPOINT_SITE_ID", &self.site_id),
            ("SHAREPOINT_LIST_ID", &self.list_id),
            ("SHAREPOINT_DRIVE_ID", &self.drive_id),
        ])
    }
}

fn missing(entries: &[(&'static str, &Option<String>)]) -> Vec<&'static str> {
    entries
        .iter()
        .filter(|(_, value)| value.is_none())
        .map(|(name, _)| *name)
        .collect()
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Inspection photo logging API for SharePoint")]
pub struct Args {
    /// Host to bind to (overrides INSPECTION_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides INSPECTION_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Allowed browser origin (overrides INSPECTION_CORS_ORIGIN)
    #[arg(long)]
    pub cors_origin: Option<String>,

    /// Folder in the document library that receives images (overrides IMAGE_FOLDER_PATH)
    #[arg(long)]
    pub image_folder: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Submit one inspection to a running server
    Submit(SubmitArgs),
    /// Look up the SharePoint site, list and drive ids for the environment
    Resolve(ResolveArgs),
}

#[derive(ClapArgs, Debug)]
pub struct SubmitArgs {
    /// Base URL of the inspection server
    #[arg(long, default_value = "http://localhost:4000")]
    pub server_url: String,

    #[arg(long, default_value = "")]
    pub product_name: String,

    #[arg(long, default_value = "")]
    pub inspector: String,

    #[arg(long, default_value = "")]
    pub note: String,

    /// Raw DataMatrix payload; fills the product name when it is empty
    #[arg(long)]
    pub datamatrix: Option<String>,

    /// Read the DataMatrix payload from a keyboard-wedge scanner on stdin
    #[arg(long, conflicts_with = "datamatrix")]
    pub scan: bool,

    #[arg(long)]
    pub front: Option<PathBuf>,

    #[arg(long)]
    pub back: Option<PathBuf>,

    #[arg(long)]
    pub side: Option<PathBuf>,
}

#[derive(ClapArgs, Debug)]
pub struct ResolveArgs {
    /// SharePoint host, e.g. contoso.sharepoint.com
    #[arg(long)]
    pub site_host: String,

    /// Site path on that host, e.g. /sites/QA
    #[arg(long)]
    pub site_path: String,

    /// List name or display name
    #[arg(long)]
    pub list: Option<String>,

    /// Document library name
    #[arg(long)]
    pub drive: Option<String>,
}

/// The task this process runs, carrying only the configuration that task reads.
#[derive(Debug)]
pub enum Launch {
    Serve(AppConfig),
    Submit(SubmitArgs),
    Resolve(GraphSettings, ResolveArgs),
}

impl Launch {
    /// Parse CLI args once and resolve the environment for the chosen task.
    pub fn from_env_and_args() -> Result<Self> {
        Self::from_args(Args::parse(), |key| env::var(key).ok())
    }

    pub fn from_args(mut args: Args, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        match args.command.take() {
            Some(Command::Submit(submit)) => Ok(Launch::Submit(submit)),
            Some(Command::Resolve(resolve)) => Ok(Launch::Resolve(
                GraphSettings::resolve(args.image_folder, &lookup),
                resolve,
            )),
            None => AppConfig::resolve(args, lookup).map(Launch::Serve),
        }
    }
}

/// Environment value with empty strings treated as unset.
fn non_empty(lookup: &dyn Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key).filter(|v| !v.trim().is_empty())
}

impl GraphSettings {
    /// Graph credentials and targets from `lookup`; `image_folder` overrides IMAGE_FOLDER_PATH.
    pub fn resolve(image_folder: Option<String>, lookup: &dyn Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| non_empty(lookup, key);
        Self {
            tenant_id: var("TENANT_ID"),
            client_id: var("CLIENT_ID"),
            client_secret: var("CLIENT_SECRET"),
            site_id: var("SHAREPOINT_SITE_ID"),
            list_id: var("SHAREPOINT_LIST_ID"),
            drive_id: var("SHAREPOINT_DRIVE_ID"),
            image_folder: image_folder
                .or_else(|| var("IMAGE_FOLDER_PATH"))
                .unwrap_or_else(|| DEFAULT_IMAGE_FOLDER.into()),
            graph_base_url: var("GRAPH_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GRAPH_BASE_URL.into()),
            login_base_url: var("LOGIN_BASE_URL")
                .unwrap_or_else(|| DEFAULT_LOGIN_BASE_URL.into()),
        }
    }
}

impl AppConfig {
    /// Merge CLI arguments over values from `lookup` over defaults.
    pub fn resolve(args: Args, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| non_empty(&lookup, key);

        let env_port = match var("INSPECTION_PORT") {
            Some(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing INSPECTION_PORT value `{}`", value))?,
            None => 4000,
        };
        let max_upload_bytes = match var("INSPECTION_MAX_UPLOAD_BYTES") {
            Some(value) => value
                .parse::<usize>()
                .with_context(|| format!("parsing INSPECTION_MAX_UPLOAD_BYTES value `{}`", value))?,
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        let graph = GraphSettings::resolve(args.image_folder, &lookup);

        // --- Merge ---
        Ok(Self {
            host: args
                .host
                .or_else(|| var("INSPECTION_HOST"))
                .unwrap_or_else(|| "0.0.0.0".into()),
            port: args.port.unwrap_or(env_port),
            cors_origin: args
                .cors_origin
                .or_else(|| var("INSPECTION_CORS_ORIGIN"))
                .unwrap_or_else(|| "http://localhost:3000".into()),
            max_upload_bytes,
            graph,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Log missing Graph settings. Startup continues; the affected calls fail per request.
    pub fn warn_missing(&self) {
        let identity = self.graph.missing_identity();
        if !identity.is_empty() {
            tracing::warn!(missing = ?identity, "Azure AD credentials are not configured");
        }
        let storage = self.graph.missing_storage();
        if !storage.is_empty() {
            tracing::warn!(missing = ?storage, "SharePoint site/list/drive ids are not configured");
        }
    }
}
