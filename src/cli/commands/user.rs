use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::database::DatabaseManager;
use crate::services::user::NewUser;
use crate::services::UserService;
use crate::types::Role;

#[derive(Subcommand)]
pub enum UserCommands {
    #[command(about = "Create an account")]
    Create {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        #[arg(long, default_value = "puskesmas", help = "admin or puskesmas")]
        role: String,
        #[arg(long)]
        nama: Option<String>,
        #[arg(long)]
        nama_puskesmas: Option<String>,
        #[arg(long)]
        kecamatan: Option<String>,
        #[arg(long)]
        wilayah: Option<String>,
    },

    #[command(about = "Set a new password for an account")]
    ResetPassword {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
}

pub async fn handle(cmd: UserCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let pool = DatabaseManager::pool().await?;
    let users = UserService::new(pool);

    match cmd {
        UserCommands::Create {
            username,
            password,
            role,
            nama,
            nama_puskesmas,
            kecamatan,
            wilayah,
        } => {
            let role: Role = role.parse().map_err(anyhow::Error::msg)?;
            let user = users
                .create(NewUser {
                    username,
                    password,
                    role,
                    nama,
                    nama_puskesmas,
                    kecamatan,
                    wilayah,
                })
                .await?;

            output_success(
                output_format,
                &format!("Created {} account '{}'", user.role, user.username),
                Some(json!({ "user": user })),
            )
        }
        UserCommands::ResetPassword { username, password } => {
            let user = users.find_by_username(&username).await?;
            users.reset_password(user.id, &password).await?;
            output_success(
                output_format,
                &format!("Password reset for '{}'", user.username),
                Some(json!({ "id": user.id })),
            )
        }
    }
}
