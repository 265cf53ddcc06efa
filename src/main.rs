use anyhow::{Context, Result, bail};
use std::io::ErrorKind;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod client;
mod config;
mod errors;
mod handlers;
mod models;
mod routes;
mod services;

use client::{
    form::{ImageFile, InspectionForm},
    scanner::{StdinScanner, scan_blocking},
    submission::SubmissionClient,
};
use config::{AppConfig, GraphSettings, Launch, ResolveArgs, SubmitArgs};
use models::inspection::Side;
use services::{graph_service::GraphService, inspection_service::InspectionService};

#[tokio::main]
async fn main() -> Result<()> {
    // --- Environment file, if present ---
    dotenvy::dotenv().ok();

    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // --- Parse subcommand + the config it needs ---
    match Launch::from_env_and_args()? {
        Launch::Serve(cfg) => serve(cfg).await,
        Launch::Submit(args) => submit(args).await,
        Launch::Resolve(graph, args) => resolve(graph, args).await,
    }
}

async fn serve(cfg: AppConfig) -> Result<()> {
    tracing::info!("Starting inspection-log with config: {:?}", cfg);
    cfg.warn_missing();

    // --- Initialize core service ---
    let graph = GraphService::new(reqwest::Client::new(), cfg.graph.clone());
    let inspections = InspectionService::new(graph);

    // --- Build router ---
    let app = routes::routes::app(inspections, &cfg)?;

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build a form from CLI arguments and send it to a running server.
async fn submit(args: SubmitArgs) -> Result<()> {
    let mut form = InspectionForm::default();
    form.product_name = args.product_name;
    form.inspector = args.inspector;
    form.note = args.note;

    if args.scan {
        eprintln!("Scan the DataMatrix code...");
        let payload = scan_blocking(StdinScanner::stdin)
            .await
            .context("reading scan")?;
        form.apply_scan(&payload);
    } else if let Some(raw) = args.datamatrix {
        form.datamatrix = raw;
        form.datamatrix_blurred();
    }

    for (side, path) in [
        (Side::Front, args.front),
        (Side::Back, args.back),
        (Side::Side, args.side),
    ] {
        if let Some(path) = path {
            let image = ImageFile::from_path(&path)
                .await
                .with_context(|| format!("reading {} image {}", side, path.display()))?;
            form.set_image(side, Some(image));
        }
    }

    let client = SubmissionClient::new(reqwest::Client::new(), args.server_url);
    match client.submit(&mut form).await? {
        Some(saved) => println!("{}", serde_json::to_string_pretty(&saved)?),
        None => println!("saved"),
    }
    Ok(())
}

/// Print the SharePoint ids to put in the environment.
async fn resolve(graph: GraphSettings, args: ResolveArgs) -> Result<()> {
    let graph = GraphService::new(reqwest::Client::new(), graph);

    let Some(site_id) = graph.site_id(&args.site_host, &args.site_path).await? else {
        bail!("site {}{} not found", args.site_host, args.site_path);
    };
    println!("SHAREPOINT_SITE_ID={}", site_id);

    if let Some(name) = &args.list {
        match graph.list_id_by_name(&site_id, name).await? {
            Some(id) => println!("SHAREPOINT_LIST_ID={}", id),
            None => tracing::warn!(list = %name, "No list with that name on the site"),
        }
    }
    if let Some(name) = &args.drive {
        match graph.drive_id_by_name(&site_id, name).await? {
            Some(id) => println!("SHAREPOINT_DRIVE_ID={}", id),
            None => tracing::warn!(drive = %name, "No document library with that name on the site"),
        }
    }
    Ok(())
}
