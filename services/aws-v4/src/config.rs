use crate::constants::*;
use handsign_core::{Context, Error, Result};
use ini::Ini;
use log::debug;

/// Where to sign for and which shared files to read.
///
/// Every field left unset is resolved from the environment by
/// [`Config::from_env`] and from the shared config file by
/// [`Config::from_profile`].
#[derive(Clone, Debug, Default)]
pub struct Config {
    /// Region to sign for, see [`Config::region`].
    pub region: Option<String>,
    /// Profile selected in the shared files, `default` when unset.
    pub profile: Option<String>,
    /// Path of the shared config file, `~/.aws/config` when unset.
    pub config_file: Option<String>,
    /// Path of the shared credentials file, `~/.aws/credentials` when unset.
    pub shared_credentials_file: Option<String>,
}

impl Config {
    /// Set the region explicitly.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Set the profile explicitly.
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    /// Fill unset fields from `AWS_REGION`, `AWS_DEFAULT_REGION`,
    /// `AWS_PROFILE`, `AWS_CONFIG_FILE` and `AWS_SHARED_CREDENTIALS_FILE`.
    pub fn from_env(mut self, ctx: &Context) -> Self {
        if self.region.is_none() {
            self.region = ctx
                .env_var(AWS_REGION)
                .or_else(|| ctx.env_var(AWS_DEFAULT_REGION))
                .filter(|v| !v.is_empty());
        }
        if self.profile.is_none() {
            self.profile = ctx.env_var(AWS_PROFILE);
        }
        if self.config_file.is_none() {
            self.config_file = ctx.env_var(AWS_CONFIG_FILE);
        }
        if self.shared_credentials_file.is_none() {
            self.shared_credentials_file = ctx.env_var(AWS_SHARED_CREDENTIALS_FILE);
        }
        self
    }

    /// Fill `region` from the selected profile of the shared config file.
    ///
    /// A missing file changes nothing; a file that does not parse is
    /// `ConfigInvalid`.
    pub async fn from_profile(mut self, ctx: &Context) -> Result<Self> {
        if self.region.is_some() {
            return Ok(self);
        }

        let Some(conf) = load_ini(ctx, self.config_file()).await? else {
            return Ok(self);
        };
        let section = config_section_name(self.profile());
        self.region = conf
            .section(Some(section.as_str()))
            .and_then(|props| props.get("region"))
            .map(str::to_string);
        if let Some(region) = &self.region {
            debug!("region {region} loaded from profile {}", self.profile());
        }
        Ok(self)
    }

    /// The resolved region, `us-east-1` when nothing named one.
    pub fn region(&self) -> &str {
        self.region.as_deref().unwrap_or(DEFAULT_REGION)
    }

    /// The selected profile.
    pub fn profile(&self) -> &str {
        self.profile.as_deref().unwrap_or("default")
    }

    /// The shared config file path, before home expansion.
    pub fn config_file(&self) -> &str {
        self.config_file.as_deref().unwrap_or("~/.aws/config")
    }

    /// The shared credentials file path, before home expansion.
    pub fn shared_credentials_file(&self) -> &str {
        self.shared_credentials_file
            .as_deref()
            .unwrap_or("~/.aws/credentials")
    }
}

/// The config file names non-default profiles `[profile <name>]`.
pub(crate) fn config_section_name(profile: &str) -> String {
    match profile {
        "default" => "default".to_string(),
        x => format!("profile {x}"),
    }
}

/// Read and parse an INI file.
///
/// `Ok(None)` when the file can not be read, so a missing file is never
/// an error.
pub(crate) async fn load_ini(ctx: &Context, path: &str) -> Result<Option<Ini>> {
    let Some(expanded) = ctx.expand_home_dir(path) else {
        debug!("failed to expand homedir for path: {path}");
        return Ok(None);
    };

    let content = match ctx.file_read_as_string(&expanded).await {
        Ok(content) => content,
        Err(err) => {
            debug!("failed to read {expanded}: {err}");
            return Ok(None);
        }
    };

    let conf = Ini::load_from_str(&content).map_err(|e| {
        Error::config_invalid(format!("failed to parse {expanded}")).with_source(e)
    })?;
    Ok(Some(conf))
}
