use anyhow::Context;
use serde_json::json;

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::database::DatabaseManager;
use crate::services::MasterDataService;

pub async fn migrate(output_format: OutputFormat) -> anyhow::Result<()> {
    DatabaseManager::migrate().await.context("Failed to apply migrations")?;
    output_success(output_format, "Migrations applied", None)
}

pub async fn seed(output_format: OutputFormat) -> anyhow::Result<()> {
    let pool = DatabaseManager::pool().await?;
    let (satuan, sumber_anggaran) = MasterDataService::new(pool)
        .seed_defaults()
        .await
        .context("Failed to seed master data")?;

    output_success(
        output_format,
        &format!("Seeded {} satuan and {} sumber anggaran", satuan, sumber_anggaran),
        Some(json!({ "satuan": satuan, "sumber_anggaran": sumber_anggaran })),
    )
}
