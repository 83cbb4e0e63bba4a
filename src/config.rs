use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use literate_git_dirs::default_config_file;
use serde::Deserialize;
use tokio::fs;
use tracing::{debug, info};

use crate::render::{TemplateUrls, UrlStrategy};
use crate::{AppError, AppResult};

/// Names that always resolve, whatever the config says.
pub const BUILTIN_STRATEGIES: [&str; 3] = ["example", "example-query", "none"];

/// User configuration read from `config.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Named URL strategies usable as `URL_STRATEGY_REF`.
    #[serde(default)]
    pub url_strategies: BTreeMap<String, TemplateUrls>,
}

fn config_error(path: &Path, reason: impl ToString) -> AppError {
    AppError::Config {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

fn strategy_error(reference: &str, reason: impl ToString) -> AppError {
    AppError::LinkStrategyResolution {
        reference: reference.to_string(),
        reason: reason.to_string(),
    }
}

impl Config {
    /// Load the config from `explicit`, or from the default location.
    ///
    /// A missing default file yields the empty config; a missing explicit
    /// file is an error.
    #[tracing::instrument(name = "Loading config", level = "debug")]
    pub async fn load(explicit: Option<&Path>) -> AppResult<Self> {
        let path: PathBuf = match explicit {
            Some(path) => path.to_path_buf(),
            None => match default_config_file() {
                Ok(path) => path,
                Err(e) => {
                    debug!("No config directory ({e}); using defaults");
                    return Ok(Self::default());
                }
            },
        };

        let data = match fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound && explicit.is_none() => {
                debug!("No config at {}; using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => return Err(config_error(&path, e)),
        };
        let config: Self = serde_json::from_slice(&data).map_err(|e| config_error(&path, e))?;
        debug!(
            "Loaded {} URL strategies from {}",
            config.url_strategies.len(),
            path.display()
        );
        Ok(config)
    }

    /// Turn a `URL_STRATEGY_REF` into a strategy.
    ///
    /// Built-in names win, then strategies named in this config, then a
    /// path to a JSON file holding a single strategy.
    #[tracing::instrument(name = "Resolving URL strategy", level = "debug", skip(self))]
    pub async fn url_strategy(&self, reference: &str) -> AppResult<Box<dyn UrlStrategy>> {
        let urls = match reference {
            "example" => TemplateUrls::example(),
            "example-query" => TemplateUrls::example_query(),
            "none" => TemplateUrls::default(),
            name if self.url_strategies.contains_key(name) => {
                self.url_strategies[name].clone()
            }
            path => {
                let data = match fs::read(path).await {
                    Ok(data) => data,
                    Err(e) if e.kind() == ErrorKind::NotFound => {
                        return Err(strategy_error(
                            reference,
                            format!(
                                "Not one of {}, not configured, and no such file.",
                                BUILTIN_STRATEGIES.join(", ")
                            ),
                        ));
                    }
                    Err(e) => return Err(strategy_error(reference, e)),
                };
                info!("Using URL strategy from {path}");
                serde_json::from_slice(&data).map_err(|e| strategy_error(reference, e))?
            }
        };
        Ok(Box::new(urls))
    }
}
