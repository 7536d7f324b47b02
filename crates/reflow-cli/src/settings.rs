use std::path::{Path, PathBuf};

use reflow::{PageFailurePolicy, ReflowConfig};

use crate::prelude::*;

/// Threshold overrides. Each one wins over the config file.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct Tuning {
    /// Y distance under which fragments are tied and ordered by X
    #[clap(long, env = "REFLOW_Y_LINE_EPSILON", global = true)]
    pub y_line_epsilon: Option<f64>,

    /// Y distance under which a fragment joins the current line
    #[clap(long, env = "REFLOW_LINE_GROUP_EPSILON", global = true)]
    pub line_group_epsilon: Option<f64>,

    /// Gap, in multiples of the line height, that starts a new paragraph
    #[clap(long, env = "REFLOW_PARAGRAPH_FACTOR", global = true)]
    pub paragraph_factor: Option<f64>,

    /// Font height assumed when a fragment has none
    #[clap(long, env = "REFLOW_DEFAULT_FONT_HEIGHT", global = true)]
    pub default_font_height: Option<f64>,

    /// What to do with a page that cannot be read: abort or substitute
    #[clap(long = "on-page-error", env = "REFLOW_ON_PAGE_ERROR", global = true)]
    pub page_failure: Option<PageFailurePolicy>,
}

impl Tuning {
    fn apply(&self, config: &mut ReflowConfig) {
        if let Some(v) = self.y_line_epsilon {
            config.y_line_epsilon = v;
        }
        if let Some(v) = self.line_group_epsilon {
            config.line_group_epsilon = v;
        }
        if let Some(v) = self.paragraph_factor {
            config.paragraph_factor = v;
        }
        if let Some(v) = self.default_font_height {
            config.default_font_height = v;
        }
        if let Some(policy) = self.page_failure {
            config.page_failure = policy;
        }
    }
}

fn load_file(path: &Path) -> Result<ReflowConfig, Error> {
    let raw = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    ReflowConfig::from_toml_str(&raw).map_err(|e| Error::ConfigInvalid {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Defaults, then the config file, then individual flags.
pub fn resolve(file: Option<&PathBuf>, tuning: &Tuning) -> Result<ReflowConfig> {
    let mut config = match file {
        Some(path) => load_file(path)?,
        None => ReflowConfig::default(),
    };

    tuning.apply(&mut config);
    config.validate()?;

    log::debug!("effective config: {:?}", config);
    Ok(config)
}
