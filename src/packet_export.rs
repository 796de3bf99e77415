// CLI utility to upload a capture and export one page of decoded packets
// Usage: packet_export <capture> [--proto P] [--search S] [--page N] [--format csv|json] [--output FILE]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;

use signaltrace::config::ClientConfig;
use signaltrace::export::{export_csv, write_csv};
use signaltrace::packets::{count_caption, PacketRow, PacketTable};
use signaltrace::query::build_packet_query;
use signaltrace::session::Session;
use signaltrace::view_state::ViewState;
use signaltrace::{CaptureBackend, ClientError, HttpBackend};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Csv,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "packet_export", about = "Upload a capture and export decoded packets")]
struct Args {
    /// .pcap, .pcapng or tshark JSON capture
    capture: PathBuf,

    /// Backend base URL (overrides SIGNALTRACE_URL)
    #[arg(long)]
    url: Option<String>,

    /// Only packets carrying this protocol
    #[arg(long, default_value = "")]
    proto: String,

    /// Free-text search (IMSI, MSISDN, operation, ...)
    #[arg(long, default_value = "")]
    search: String,

    /// Zero-based page index
    #[arg(long, default_value_t = 0)]
    page: u64,

    #[arg(long, value_enum, default_value_t = Format::Csv)]
    format: Format,

    /// Write here instead of stdout
    #[arg(long, short)]
    output: Option<PathBuf>,
}

fn render_json(rows: &[PacketRow]) -> Result<String> {
    serde_json::to_string_pretty(rows).context("Failed to serialize rows")
}

async fn run(args: Args) -> Result<()> {
    let mut config = ClientConfig::from_env().context("Invalid configuration")?;
    if let Some(url) = args.url {
        config = config.with_base_url(url);
    }
    let backend = HttpBackend::connect(&config).context("Failed to build HTTP client")?;

    let filename = args
        .capture
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .context("Capture path has no file name")?;
    let data = tokio::fs::read(&args.capture)
        .await
        .with_context(|| format!("Failed to read {}", args.capture.display()))?;

    let upload = match backend.upload(&filename, data).await {
        Ok(upload) => upload,
        Err(err @ ClientError::DecoderMissing { .. }) => {
            anyhow::bail!("{}", err.to_toast().message);
        }
        Err(err) => return Err(err).context("Upload failed"),
    };
    let session = Session::from_upload(upload, &filename);
    info!("{}", session.caption());

    let mut state = ViewState::new();
    state.set_proto(&args.proto);
    state.set_search(&args.search);
    state.set_page(args.page);

    let query = build_packet_query(&state, session.key(), config.page_size);
    let page = backend
        .packets(&query)
        .await
        .context("Failed to fetch packets")?;
    let table = PacketTable::build(&page, args.page, config.page_size);
    info!(
        "{}, {}",
        count_caption(table.total, state.proto()),
        table.pagination.label()
    );

    match (args.format, args.output) {
        (Format::Csv, Some(path)) => write_csv(&path, &table.rows)?,
        (Format::Csv, None) => println!("{}", export_csv(&table.rows)),
        (Format::Json, Some(path)) => {
            std::fs::write(&path, render_json(&table.rows)?)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Exported {} rows to {}", table.rows.len(), path.display());
        }
        (Format::Json, None) => println!("{}", render_json(&table.rows)?),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays clean for the export
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    run(Args::parse()).await
}
