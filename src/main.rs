#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::uninlined_format_args,
    clippy::cast_precision_loss,
    clippy::significant_drop_tightening
)]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ftp_gateway::config::Config;
use ftp_gateway::server::{self, AppState};
use ftp_gateway::{path, FileGateway, FtpGateway, FtpSessionFactory};
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Helper function to ensure config has password, prompting if needed
fn ensure_password(config: &mut Config) -> Result<()> {
    if config.password.is_none() {
        let password = rpassword::prompt_password("Password (hidden): ")
            .context("reading password from the terminal")?;
        config.password = Some(password);
    }
    Ok(())
}

fn setup_logging(debug: bool) -> Result<()> {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info,suppaftp=warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .try_init()?;
    Ok(())
}

fn byte_bar(len: Option<u64>, message: String) -> Result<ProgressBar> {
    let bar = match len {
        Some(len) => {
            let bar = ProgressBar::new(len);
            bar.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}")?
                    .progress_chars("#>-"),
            );
            bar
        }
        None => {
            let bar = ProgressBar::new_spinner();
            bar.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} [{elapsed_precise}] {bytes} {msg}")?,
            );
            bar
        }
    };
    bar.set_message(message);
    Ok(bar)
}

#[derive(Parser)]
#[command(author, version, about = "HTTP gateway to a remote FTP server", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP gateway
    Serve {
        /// Address to listen on
        #[arg(short, long)]
        bind: Option<SocketAddr>,
    },

    /// Upload a local file to the server
    Upload {
        /// Local file
        file: PathBuf,

        /// Destination path on the server
        remote_path: String,
    },

    /// Download a file from the server
    Download {
        /// Remote directory
        directory: String,

        /// Remote file name
        filename: String,

        /// Local destination directory
        #[arg(short, long, default_value = ".")]
        dest: PathBuf,

        /// Read the whole file into memory before writing it
        #[arg(long)]
        buffered: bool,
    },

    /// List files (or directories) on the server
    Ls {
        /// Directory to list
        directory: Option<String>,

        /// List directories instead of files
        #[arg(long)]
        dirs: bool,
    },

    /// Create a directory on the server
    Mkdir {
        name: String,
    },

    /// Check that a directory can be entered
    Cd {
        name: String,
    },

    /// Delete a file on the server
    Rm {
        directory: String,
        filename: String,
    },

    /// Check whether a slash-delimited path exists
    Exists {
        path: String,
    },

    /// Configure server settings
    Config {
        /// FTP host
        #[arg(long)]
        host: Option<String>,

        /// FTP port
        #[arg(long)]
        port: Option<u16>,

        /// Username
        #[arg(long)]
        username: Option<String>,

        /// Password (only kept for this invocation, never saved)
        #[arg(long)]
        password: Option<String>,
    },
}

fn connect(config: &mut Config) -> Result<FtpGateway<FtpSessionFactory>> {
    if !config.is_configured() {
        config.interactive_setup()?;
    }
    ensure_password(config)?;
    let settings = config.settings()?;
    Ok(FtpGateway::new(FtpSessionFactory::new(settings)))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.debug)?;

    let mut config = Config::load()?;

    match cli.command {
        Commands::Serve { bind } => {
            let bind = match bind {
                Some(bind) => bind,
                None => config
                    .bind
                    .parse()
                    .with_context(|| format!("invalid bind address: {}", config.bind))?,
            };
            let gateway = connect(&mut config)?;
            server::serve(bind, AppState::new(gateway)).await?;
        }
        Commands::Upload { file, remote_path } => {
            let gateway = connect(&mut config)?;
            let len = std::fs::metadata(&file)
                .with_context(|| format!("File not found: {:?}", file))?
                .len();
            let source = std::fs::File::open(&file)?;
            let bar = byte_bar(Some(len), format!("Uploading {}", remote_path))?;

            let written = gateway
                .upload(Box::new(bar.wrap_read(source)), &remote_path)
                .await?;
            bar.finish_and_clear();

            println!(
                "Uploaded {:?} to {} ({})",
                file,
                remote_path,
                human_bytes::human_bytes(written as f64)
            );
        }
        Commands::Download {
            directory,
            filename,
            dest,
            buffered,
        } => {
            let gateway = connect(&mut config)?;
            let local_name = path::file_name(&filename).unwrap_or("file");
            let local_path = dest.join(local_name);
            let remote_path = path::join(&directory, &filename);

            let written = if buffered {
                let data = gateway.download_buffered(&directory, &filename).await?;
                tokio::fs::write(&local_path, &data).await?;
                data.len() as u64
            } else {
                let mut stream = gateway.download_streamed(&directory, &filename).await?;
                let mut file = tokio::fs::File::create(&local_path).await?;
                let bar = byte_bar(None, format!("Downloading {}", remote_path))?;

                while let Some(chunk) = stream.next().await {
                    let chunk = chunk?;
                    file.write_all(&chunk).await?;
                    bar.inc(chunk.len() as u64);
                }
                file.flush().await?;
                bar.finish_and_clear();
                bar.position()
            };

            println!(
                "Downloaded {} to {:?} ({})",
                remote_path,
                local_path,
                human_bytes::human_bytes(written as f64)
            );
        }
        Commands::Ls { directory, dirs } => {
            let gateway = connect(&mut config)?;
            let names = if dirs {
                gateway.list_directories(directory.as_deref()).await?
            } else {
                gateway
                    .list_files(directory.as_deref().unwrap_or("."))
                    .await?
            };
            for name in names {
                println!("{}", name);
            }
        }
        Commands::Mkdir { name } => {
            connect(&mut config)?.make_directory(&name).await?;
            println!("New Working Directory: {}", name);
        }
        Commands::Cd { name } => {
            connect(&mut config)?.change_directory(&name).await?;
            println!("Using new working directory for operations.");
        }
        Commands::Rm {
            directory,
            filename,
        } => {
            if connect(&mut config)?.delete(&directory, &filename).await? {
                println!("File deleted successfully.");
            } else {
                println!("File not found or could not be deleted.");
                std::process::exit(1);
            }
        }
        Commands::Exists { path } => {
            let exists = connect(&mut config)?.path_exists(&path).await?;
            println!("{}", exists);
            if !exists {
                std::process::exit(1);
            }
        }
        Commands::Config {
            host,
            port,
            username,
            password,
        } => {
            // If no arguments provided, run interactive setup
            if host.is_none() && port.is_none() && username.is_none() && password.is_none() {
                config.interactive_setup()?;
            } else {
                // Update only the provided fields
                if let Some(host) = host {
                    config.host = host;
                }
                if let Some(port) = port {
                    config.port = port;
                }
                if let Some(username) = username {
                    config.username = username;
                }
                if let Some(password) = password {
                    config.password = Some(password);
                }
                config.configured = true;

                config.save()?;
                println!("Configuration saved successfully!");
            }
        }
    }

    Ok(())
}
