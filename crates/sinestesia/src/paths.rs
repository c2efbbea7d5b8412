use std::env;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use directories_next::ProjectDirs;

pub const ENV_CONFIG_DIR: &str = "SINESTESIA_CONFIG_DIR";
pub const ENV_SHARE_DIR: &str = "SINESTESIA_SHARE_DIR";

const QUALIFIER: &str = "org";
const ORGANISATION: &str = "Sinestesia";
const APPLICATION: &str = "Sinestesia";
const CONFIG_FILE: &str = "sinestesia.toml";

#[derive(Debug, Clone)]
pub struct AppPaths {
    config_dir: PathBuf,
    share_dir: PathBuf,
}

impl AppPaths {
    pub fn discover() -> Result<Self> {
        let config_dir = match env_override(ENV_CONFIG_DIR) {
            Some(dir) => dir,
            None => ProjectDirs::from(QUALIFIER, ORGANISATION, APPLICATION)
                .ok_or_else(|| anyhow!("failed to determine user directories"))?
                .config_dir()
                .to_path_buf(),
        };
        let share_dir = match env_override(ENV_SHARE_DIR) {
            Some(dir) => dir,
            None => env::current_dir().context("failed to resolve working directory")?,
        };

        Ok(Self {
            config_dir,
            share_dir,
        })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Root that built-in presets resolve their `shaders/...` paths against.
    pub fn share_dir(&self) -> &Path {
        &self.share_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }
}

#[cfg(test)]
impl AppPaths {
    pub fn from_raw(config_dir: PathBuf, share_dir: PathBuf) -> Self {
        Self {
            config_dir,
            share_dir,
        }
    }
}

fn env_override(name: &str) -> Option<PathBuf> {
    match env::var_os(name) {
        Some(value) if !value.is_empty() => Some(PathBuf::from(value)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_file_lives_in_config_dir() {
        let paths = AppPaths::from_raw(PathBuf::from("/etc/sin"), PathBuf::from("/usr/share"));
        assert_eq!(paths.config_file(), PathBuf::from("/etc/sin/sinestesia.toml"));
        assert_eq!(paths.share_dir(), Path::new("/usr/share"));
    }
}
