use std::{
    env, fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use crate::{errors::Error, Result};

/// Where the singleton payload record lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PayloadBackend {
    /// Single-row table inside the registry database.
    Sqlite,
    /// Stand-alone JSON file, rewritten on every save.
    Json,
}

impl FromStr for PayloadBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" | "db" => Ok(Self::Sqlite),
            "json" | "file" => Ok(Self::Json),
            other => Err(Error::Config(format!(
                "RELAY_PAYLOAD_BACKEND must be `sqlite` or `json`, got `{other}`"
            ))),
        }
    }
}

/// Typed configuration, assembled once at startup and passed down explicitly.
#[derive(Clone, Debug)]
pub struct Config {
    pub telegram_bot_token: String,

    // Storage
    pub data_dir: PathBuf,
    pub db_file: PathBuf,
    pub payload_file: PathBuf,
    pub payload_backend: PayloadBackend,

    // Broadcast
    pub broadcast_text: String,
    pub broadcast_concurrency: usize,

    // Polling
    pub drop_pending_updates: bool,
}

impl Config {
    /// Read `.env` (without overriding the environment) and then the environment.
    ///
    /// Call before spawning threads: `.env` entries go through `env::set_var`.
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let telegram_bot_token = env_str("TELEGRAM_BOT_TOKEN").unwrap_or_default();
        if telegram_bot_token.trim().is_empty() {
            return Err(Error::Config(
                "TELEGRAM_BOT_TOKEN environment variable is required".to_string(),
            ));
        }

        let data_dir = env_path("RELAY_DATA_DIR").unwrap_or_else(|| PathBuf::from("/data"));
        ensure_dir(&data_dir)?;

        let db_file = env_path("RELAY_DB_FILE").unwrap_or_else(|| data_dir.join("devices.db"));
        let payload_file =
            env_path("RELAY_PAYLOAD_FILE").unwrap_or_else(|| data_dir.join("device_data.json"));
        let payload_backend = match env_str("RELAY_PAYLOAD_BACKEND").and_then(non_empty) {
            Some(v) => v.parse()?,
            None => PayloadBackend::Sqlite,
        };

        let broadcast_text = env_str("RELAY_BROADCAST_TEXT")
            .and_then(non_empty)
            .unwrap_or_else(|| "hello".to_string());
        let broadcast_concurrency = env_usize("RELAY_BROADCAST_CONCURRENCY")
            .unwrap_or(8)
            .max(1);

        let drop_pending_updates = env_bool("RELAY_DROP_PENDING_UPDATES").unwrap_or(true);

        Ok(Self {
            telegram_bot_token,
            data_dir,
            db_file,
            payload_file,
            payload_backend,
            broadcast_text,
            broadcast_concurrency,
            drop_pending_updates,
        })
    }

    /// Token prefix that is safe to print in startup logs.
    pub fn token_hint(&self) -> String {
        let prefix: String = self.telegram_bot_token.chars().take(10).collect();
        format!("{prefix}...")
    }
}

fn ensure_dir(dir: &Path) -> Result<()> {
    if dir.exists() && !dir.is_dir() {
        return Err(Error::InvalidPath {
            path: dir.to_path_buf(),
            reason: "data dir exists but is not a directory".to_string(),
        });
    }
    fs::create_dir_all(dir)?;
    Ok(())
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let Some((key, val)) = parse_dotenv_line(raw) else {
            continue;
        };
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv_line(raw: &str) -> Option<(String, String)> {
    let line = raw.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let (k, v) = line.split_once('=')?;
    let key = k.trim().trim_start_matches("export ").trim();
    if key.is_empty() {
        return None;
    }

    let mut val = v.trim().to_string();
    // Strip optional surrounding quotes.
    if val.len() >= 2
        && ((val.starts_with('"') && val.ends_with('"'))
            || (val.starts_with('\'') && val.ends_with('\'')))
    {
        val = val[1..val.len() - 1].to_string();
    }

    Some((key.to_string(), val))
}

fn env_bool(key: &str) -> Option<bool> {
    env_str(key).map(|s| {
        matches!(
            s.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn env_usize(key: &str) -> Option<usize> {
    env_str(key).and_then(|s| s.trim().parse::<usize>().ok())
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var_os(key)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_backend_parses_known_names() {
        assert_eq!(
            "sqlite".parse::<PayloadBackend>().unwrap(),
            PayloadBackend::Sqlite
        );
        assert_eq!(
            " JSON ".parse::<PayloadBackend>().unwrap(),
            PayloadBackend::Json
        );
        assert!("redis".parse::<PayloadBackend>().is_err());
    }

    #[test]
    fn dotenv_lines_strip_quotes_and_comments() {
        assert_eq!(parse_dotenv_line("# comment"), None);
        assert_eq!(parse_dotenv_line("   "), None);
        assert_eq!(parse_dotenv_line("NOVALUE"), None);
        assert_eq!(
            parse_dotenv_line("TELEGRAM_BOT_TOKEN=\"abc:def\""),
            Some(("TELEGRAM_BOT_TOKEN".to_string(), "abc:def".to_string()))
        );
        assert_eq!(
            parse_dotenv_line("export RELAY_DATA_DIR = '/tmp/relay'"),
            Some(("RELAY_DATA_DIR".to_string(), "/tmp/relay".to_string()))
        );
    }

    #[test]
    fn token_hint_only_shows_prefix() {
        let cfg = Config {
            telegram_bot_token: "1234567890:SECRET".to_string(),
            data_dir: "/tmp".into(),
            db_file: "/tmp/devices.db".into(),
            payload_file: "/tmp/device_data.json".into(),
            payload_backend: PayloadBackend::Sqlite,
            broadcast_text: "hello".to_string(),
            broadcast_concurrency: 8,
            drop_pending_updates: true,
        };
        assert_eq!(cfg.token_hint(), "1234567890...");
    }
}
