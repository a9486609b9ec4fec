use anyhow::{bail, Context, Result};
use arrow::array::Array;
use bytes::Bytes;
use clap::{Parser, Subcommand};
use std::{fs, path::PathBuf, sync::Arc};
use tabular_etl::{
    backup::{backup_raw_data, ProjectPaths},
    config::ServiceConfig,
    logging,
    process::codec::{decode, decoded_schema, total_rows},
    storage::StorageProvider,
    transform::{convert, InvocationRequest, ResponseBody, TransformStep},
    warehouse::Warehouse,
};
use tracing::info;

#[derive(Parser, Debug)]
#[command(about = "CSV to Parquet ETL utilities")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one transform invocation against the configured storage backend
    Transform {
        /// Bucket holding the CSV object
        #[arg(long)]
        source_bucket: String,

        /// Bucket receiving the Parquet object
        #[arg(long)]
        destination_bucket: String,

        /// Key of the CSV object
        #[arg(long)]
        object_key: String,
    },

    /// Convert a local CSV file into `<out_dir>/tables/<name>/<name>.parquet`
    Convert {
        /// CSV file to convert
        file: PathBuf,

        /// Output root (defaults to the project's processed directory)
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },

    /// Copy a raw file into the backup and raw data directories
    Backup {
        /// File to back up
        file: PathBuf,

        #[arg(long)]
        backup_dir: Option<PathBuf>,

        #[arg(long)]
        raw_data_dir: Option<PathBuf>,
    },

    /// Print schema, row count and null counts of a Parquet file
    Inspect {
        file: PathBuf,
    },

    /// Load a sales CSV into the warehouse and run the post-load checks
    Warehouse {
        /// Sales CSV to load (not needed with --check-only)
        file: Option<PathBuf>,

        /// Connection string (defaults to DATABASE_URL)
        #[arg(long)]
        database_url: Option<String>,

        /// Skip loading and only run the checks
        #[arg(long)]
        check_only: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = ServiceConfig::from_env()?;
    logging::init(&config.log_level);

    match args.command {
        Command::Transform {
            source_bucket,
            destination_bucket,
            object_key,
        } => {
            let store = Arc::new(StorageProvider::new(config.storage.clone()));
            let step = TransformStep::new(store, config.encode.clone());
            let request = InvocationRequest::new(source_bucket, destination_bucket, object_key);
            let response = step.handle(&request).await;
            println!("{}", serde_json::to_string_pretty(&response)?);
            if let ResponseBody::Failure(failure) = response.body {
                bail!("transform failed: {}", failure.error);
            }
        }

        Command::Convert { file, out_dir } => {
            let out_dir = out_dir.unwrap_or_else(|| ProjectPaths::default().processed_dir);
            let data = fs::read(&file).with_context(|| format!("reading {}", file.display()))?;
            let name = file
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .context("input path has no file name")?;

            let converted = convert(&data, &name, &config.encode)?;
            let out_path = out_dir.join(&converted.output_key);
            if let Some(parent) = out_path.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
            fs::write(&out_path, &converted.encoded)
                .with_context(|| format!("writing {}", out_path.display()))?;
            info!(
                rows = converted.rows,
                nulls = converted.quality.total_nulls(),
                "wrote {}",
                out_path.display()
            );
        }

        Command::Backup {
            file,
            backup_dir,
            raw_data_dir,
        } => {
            let defaults = ProjectPaths::default();
            let paths = ProjectPaths {
                backup_dir: backup_dir.unwrap_or(defaults.backup_dir),
                raw_data_dir: raw_data_dir.unwrap_or(defaults.raw_data_dir),
                processed_dir: defaults.processed_dir,
            };
            match backup_raw_data(&file, &paths)? {
                Some(outcome) => {
                    println!("Backup created: {}", outcome.backup_path.display());
                    println!("Data copied to: {}", outcome.raw_data_path.display());
                }
                None => bail!("source file not found: {}", file.display()),
            }
        }

        Command::Inspect { file } => {
            let data = fs::read(&file).with_context(|| format!("reading {}", file.display()))?;
            let batches = decode(Bytes::from(data))?;

            println!("=== Parquet File: {} ===", file.display());
            println!("Total rows: {}", total_rows(&batches));
            let Some(schema) = decoded_schema(&batches) else {
                println!("(no row data)");
                return Ok(());
            };
            for (idx, field) in schema.fields().iter().enumerate() {
                let nulls: usize = batches.iter().map(|b| b.column(idx).null_count()).sum();
                println!(
                    "- {:<30} | {:<28} | nulls: {}",
                    field.name(),
                    format!("{:?}", field.data_type()),
                    nulls
                );
            }
        }

        Command::Warehouse {
            file,
            database_url,
            check_only,
        } => {
            let url = database_url.unwrap_or(config.database_url);
            let warehouse = Warehouse::connect(&url).await?;
            warehouse.ensure_schema().await?;
            if !check_only {
                let file = file.context("a sales CSV is required unless --check-only is set")?;
                let data = fs::read(&file).with_context(|| format!("reading {}", file.display()))?;
                for report in warehouse.run(&data).await? {
                    println!("{}: SUCCESS - {} records", report.step, report.records);
                }
            }
            let checks = warehouse.check().await?;
            println!("{}", serde_json::to_string_pretty(&checks)?);
            if !checks.passed() {
                bail!("warehouse checks failed");
            }
        }
    }

    Ok(())
}
