use std::env;
use std::ffi::OsString;
use std::fmt::Display;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DirError {
    #[error("Directory not found: {0}")]
    DirNotFound(String),
}

pub type DirResult<T> = Result<T, DirError>;

/// Application name used to namespace directories.
pub static APP_NAME: &str = "literate-git";

/// Name of the configuration file inside the config directory.
pub static CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirType {
    Config,
}

impl Display for DirType {
    /// Pretty-print the default directory path hint for this dir type.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DirType::Config => write!(f, "~/.config/")?,
        };
        write!(f, "{}", APP_NAME)
    }
}

impl DirType {
    /// XDG environment variable key for this directory type.
    fn xdg_key(&self) -> &'static str {
        match self {
            DirType::Config => "XDG_CONFIG_HOME",
        }
    }

    /// Relative default path under HOME when XDG is not set.
    fn rel_path(&self) -> &'static str {
        match self {
            DirType::Config => ".config",
        }
    }

    /// Resolve the directory path from XDG or fallback environment hints.
    pub fn get_dir(&self) -> DirResult<PathBuf> {
        let home = env::var_os("HOME").or_else(|| env::var_os("USERPROFILE"));
        self.resolve(env::var_os(self.xdg_key()), home)
    }

    /// Resolve the directory from explicit XDG and home values.
    ///
    /// Empty values are ignored, matching how the XDG base directory
    /// specification treats unset variables.
    pub fn resolve(&self, xdg: Option<OsString>, home: Option<OsString>) -> DirResult<PathBuf> {
        if let Some(dir) = xdg.filter(|d| !d.is_empty()) {
            Ok(PathBuf::from(dir).join(APP_NAME))
        } else if let Some(home) = home.filter(|h| !h.is_empty()) {
            Ok(PathBuf::from(home).join(self.rel_path()).join(APP_NAME))
        } else {
            Err(DirError::DirNotFound(self.to_string()))
        }
    }
}

/// Default location of the configuration file.
pub fn default_config_file() -> DirResult<PathBuf> {
    Ok(DirType::Config.get_dir()?.join(CONFIG_FILE_NAME))
}
