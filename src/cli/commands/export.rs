use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use serde_json::json;

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::database::DatabaseManager;
use crate::services::{ExportService, UserService};
use crate::types::Bulan;

#[derive(Args, Debug)]
pub struct ExportArgs {
    #[arg(long, help = "Month name or number; whole year when omitted")]
    pub bulan: Option<String>,
    #[arg(long)]
    pub tahun: i32,
    #[arg(long, help = "Clinic username; all clinics when omitted")]
    pub username: Option<String>,
    #[arg(long, short)]
    pub output: PathBuf,
}

pub async fn handle(args: ExportArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let bulan = args
        .bulan
        .as_deref()
        .map(str::parse::<Bulan>)
        .transpose()
        .map_err(anyhow::Error::msg)?;

    let pool = DatabaseManager::pool().await?;
    let user_id = match &args.username {
        Some(username) => Some(UserService::new(pool.clone()).find_by_username(username).await?.id),
        None => None,
    };

    let file = ExportService::new(pool).laporan_workbook(user_id, bulan, args.tahun).await?;
    tokio::fs::write(&args.output, &file.bytes)
        .await
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    output_success(
        output_format,
        &format!("Wrote {} ({} bytes)", args.output.display(), file.bytes.len()),
        Some(json!({
            "path": args.output.display().to_string(),
            "filename": file.filename,
            "bytes": file.bytes.len(),
        })),
    )
}
