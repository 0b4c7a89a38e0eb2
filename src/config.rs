use crate::client::FtpSettings;
use anyhow::{anyhow, bail, Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_HOST: &str = "FTP_GATEWAY_HOST";
pub const ENV_PORT: &str = "FTP_GATEWAY_PORT";
pub const ENV_USERNAME: &str = "FTP_GATEWAY_USERNAME";
pub const ENV_PASSWORD: &str = "FTP_GATEWAY_PASSWORD";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default)]
    pub configured: bool,
}

fn default_port() -> u16 {
    21
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_idle_timeout() -> u64 {
    60
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_port(),
            username: String::new(),
            password: None,
            connect_timeout_secs: default_connect_timeout(),
            idle_timeout_secs: default_idle_timeout(),
            bind: default_bind(),
            configured: false,
        }
    }
}

impl Config {
    /// Reads the config file, then applies `FTP_GATEWAY_*` overrides.
    pub fn load() -> Result<Self> {
        let mut config = match Self::config_path() {
            Some(path) => Self::load_from(&path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        match Self::config_path() {
            Some(path) => self.save_to(&path),
            None => Ok(()),
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "ftpgateway", "ftp-gateway")
            .map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Applies environment overrides through `lookup`.
    pub fn apply_env<L>(&mut self, lookup: L) -> Result<()>
    where
        L: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(ENV_HOST) {
            self.host = host;
        }
        if let Some(port) = lookup(ENV_PORT) {
            self.port = port
                .parse()
                .with_context(|| format!("{ENV_PORT} is not a valid port: {port}"))?;
        }
        if let Some(username) = lookup(ENV_USERNAME) {
            self.username = username;
        }
        if let Some(password) = lookup(ENV_PASSWORD) {
            self.password = Some(password);
        }
        if !self.host.is_empty() && !self.username.is_empty() {
            self.configured = true;
        }
        Ok(())
    }

    pub fn is_configured(&self) -> bool {
        self.configured && !self.host.is_empty() && !self.username.is_empty()
    }

    /// Freezes the connection parameters for the lifetime of the process.
    pub fn settings(&self) -> Result<FtpSettings> {
        if self.host.is_empty() {
            bail!("FTP host not configured");
        }
        if self.username.is_empty() {
            bail!("FTP username not configured");
        }
        if self.port == 0 {
            bail!("FTP port must be non-zero");
        }
        let password = self
            .password
            .clone()
            .ok_or_else(|| anyhow!("Password not configured"))?;

        Ok(FtpSettings {
            host: self.host.clone(),
            port: self.port,
            username: self.username.clone(),
            password,
            connect_timeout: Duration::from_secs(self.connect_timeout_secs.max(1)),
            idle_timeout: Duration::from_secs(self.idle_timeout_secs.max(1)),
        })
    }

    pub fn interactive_setup(&mut self) -> Result<()> {
        println!("\nFTP gateway setup");
        println!("-----------------");
        println!("Let's configure the remote FTP server:\n");

        self.host = prompt("FTP host: ")?;

        let port = prompt(&format!("Port [default: {}]: ", self.port))?;
        if !port.is_empty() {
            self.port = port
                .parse()
                .with_context(|| format!("not a valid port: {port}"))?;
        }

        self.username = prompt("Username: ")?;

        // Get password with hidden input
        self.password = Some(rpassword::prompt_password("Password: ").unwrap_or_default());

        self.configured = true;

        println!("\nConfiguration complete!");
        println!("Your settings have been saved to: {:?}", Self::config_path());
        println!("The password is not stored; set {ENV_PASSWORD} or enter it when asked.\n");

        self.save()?;
        Ok(())
    }
}

fn prompt(label: &str) -> Result<String> {
    print!("{label}");
    io::stdout().flush()?;
    let mut value = String::new();
    io::stdin().read_line(&mut value)?;
    Ok(value.trim().to_string())
}
