use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use web::ThumbnailMode;

fn default_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".drivepicz")
}

fn default_config_path() -> PathBuf {
    default_dir().join("config")
}

/// A strictly positive integer that fits `T`; anything else is logged and
/// treated as unset.
fn positive_int<T: TryFrom<i64>>(cfg: &config::Config, key: &str) -> Option<T> {
    let value = cfg.get_int(key).ok()?;
    match T::try_from(value) {
        Ok(v) if value > 0 => Some(v),
        _ => {
            tracing::warn!(target: "config", key, value, "Ignoring out-of-range value");
            None
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub listen_addr: String,
    pub public_url: String,
    pub secure_cookies: bool,
    pub thumbnail_size: u32,
    pub thumbnail_mode: ThumbnailMode,
    pub request_timeout_secs: u64,
    pub data_path: PathBuf,
    pub server_url: String,
}

#[derive(Debug, Default)]
pub struct AppConfigOverrides {
    pub log_level: Option<String>,
    pub listen_addr: Option<String>,
    pub public_url: Option<String>,
    pub thumbnail_mode: Option<ThumbnailMode>,
    pub data_path: Option<PathBuf>,
    pub server_url: Option<String>,
    pub secure_cookies: bool,
}

impl AppConfig {
    pub fn load_from(path: Option<PathBuf>) -> Self {
        let path = path.unwrap_or_else(default_config_path);
        let cfg = config::Config::builder()
            .add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(false),
            )
            .build()
            .unwrap_or_default();

        let log_level = cfg
            .get_string("log_level")
            .unwrap_or_else(|_| "info".to_string());
        let listen_addr = cfg
            .get_string("listen_addr")
            .unwrap_or_else(|_| "127.0.0.1:3000".to_string());
        let public_url = cfg
            .get_string("public_url")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());
        let secure_cookies = cfg.get_bool("secure_cookies").unwrap_or(false);
        let thumbnail_size = positive_int(&cfg, "thumbnail_size").unwrap_or(1600);
        let thumbnail_mode = cfg
            .get_string("thumbnail_mode")
            .ok()
            .and_then(|m| match m.parse() {
                Ok(mode) => Some(mode),
                Err(e) => {
                    tracing::warn!(target: "config", error = %e, "Ignoring thumbnail_mode");
                    None
                }
            })
            .unwrap_or_default();
        let request_timeout_secs = positive_int(&cfg, "request_timeout_secs").unwrap_or(30);
        let data_path = cfg
            .get_string("data_path")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_dir());
        let server_url = cfg
            .get_string("server_url")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        Self {
            log_level,
            listen_addr,
            public_url,
            secure_cookies,
            thumbnail_size,
            thumbnail_mode,
            request_timeout_secs,
            data_path,
            server_url,
        }
    }

    pub fn apply_overrides(mut self, ov: &AppConfigOverrides) -> Self {
        if let Some(l) = &ov.log_level {
            self.log_level = l.clone();
        }
        if let Some(a) = &ov.listen_addr {
            self.listen_addr = a.clone();
        }
        if let Some(u) = &ov.public_url {
            self.public_url = u.clone();
        }
        if let Some(m) = ov.thumbnail_mode {
            self.thumbnail_mode = m;
        }
        if let Some(p) = &ov.data_path {
            self.data_path = p.clone();
        }
        if let Some(s) = &ov.server_url {
            self.server_url = s.clone();
        }
        if ov.secure_cookies {
            self.secure_cookies = true;
        }
        self
    }

    pub fn save_to(&self, path: Option<PathBuf>) -> std::io::Result<()> {
        let path = path.unwrap_or_else(default_config_path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = toml::to_string(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(path, data)
    }

    pub fn web_settings(&self) -> web::WebSettings {
        web::WebSettings {
            public_url: self.public_url.clone(),
            secure_cookies: self.secure_cookies,
            thumbnail_size: self.thumbnail_size,
            thumbnail_mode: self.thumbnail_mode,
            request_timeout: std::time::Duration::from_secs(self.request_timeout_secs),
            ..web::WebSettings::default()
        }
    }

    pub fn local_store_path(&self) -> PathBuf {
        self.data_path.join("local.sqlite")
    }
}
