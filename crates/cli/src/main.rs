use anyhow::Context;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use clap::{Parser, Subcommand};
use fm_core::{
    constants::PROVISIONED_COLLECTIONS, CoreConfig, FilesService, StatsService, Stores,
    UploadRequest, UploadService, UserService,
};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "fm")]
#[command(about = "Files manager operator CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show whether the document store and the cache are reachable
    Status,
    /// Count stored users and files
    Stats,
    /// Create the users and files collections if they are missing
    EnsureCollections,
    /// Create a user
    CreateUser {
        email: String,
        password: String,
    },
    /// Upload a local file
    Upload {
        /// Path of the file to upload (ignored for folders)
        path: PathBuf,
        /// Stored name (defaults to the file name)
        #[arg(long)]
        name: Option<String>,
        /// file, folder or image
        #[arg(long = "type", default_value = "file")]
        file_type: String,
        /// Parent folder id (defaults to the root)
        #[arg(long)]
        parent_id: Option<String>,
        /// Make the upload public
        #[arg(long)]
        public: bool,
        /// Owner user id
        #[arg(long)]
        owner: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("fm_core=warn".parse()?))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let cfg = CoreConfig::from_lookup(|key| std::env::var(key).ok())?;
    let stores = Stores::connect(&cfg);

    match cli.command {
        Commands::Status => {
            // Status reports whatever setup reached, so a failed store is not an error here.
            let _ = stores.ready().await;
            let status = StatsService::new(stores.db.clone(), stores.cache.clone()).status();
            println!("db: {}", status.db);
            println!("redis: {}", status.redis);
        }
        Commands::Stats => {
            stores.db.ready().await.context("document store unavailable")?;
            let stats = StatsService::new(stores.db.clone(), stores.cache.clone())
                .stats()
                .await?;
            println!("users: {}", stats.users);
            println!("files: {}", stats.files);
        }
        Commands::EnsureCollections => {
            stores.db.ready().await.context("document store unavailable")?;
            let created = stores.db.ensure_collections(PROVISIONED_COLLECTIONS).await?;
            if created.is_empty() {
                println!("All collections already exist.");
            } else {
                for name in created {
                    println!("Created collection: {}", name);
                }
            }
        }
        Commands::CreateUser { email, password } => {
            stores.db.ready().await.context("document store unavailable")?;
            let user = UserService::new(stores.db.clone())
                .create_user(Some(email), Some(password))
                .await?;
            println!("Created user {} with ID: {}", user.email, user.id);
        }
        Commands::Upload {
            path,
            name,
            file_type,
            parent_id,
            public,
            owner,
        } => {
            let data = if file_type == "folder" {
                None
            } else {
                let bytes = std::fs::read(&path)
                    .with_context(|| format!("cannot read {}", path.display()))?;
                Some(STANDARD.encode(bytes))
            };
            let name = name.or_else(|| {
                path.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
            });

            stores.db.ready().await.context("document store unavailable")?;
            let storage = FilesService::new(cfg.folder_path())?;
            let record = UploadService::new(stores.db.clone(), storage)
                .upload(UploadRequest {
                    name,
                    file_type: Some(file_type),
                    parent_id,
                    is_public: Some(public),
                    data,
                    owner_id: owner,
                })
                .await?;
            println!("Stored {} {} with ID: {}", record.file_type, record.name, record.id);
        }
    }

    Ok(())
}
