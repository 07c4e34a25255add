use crate::config::{config_section_name, load_ini};
use crate::{Config, Credential};
use async_trait::async_trait;
use handsign_core::{Context, ProvideCredential, Result};
use ini::Properties;
use log::debug;

/// ProfileCredentialProvider loads credentials from the shared AWS files.
///
/// - `~/.aws/credentials` (or `AWS_SHARED_CREDENTIALS_FILE`), section `[<profile>]`
/// - `~/.aws/config` (or `AWS_CONFIG_FILE`), section `[default]` or `[profile <profile>]`
///
/// The credentials file is tried first. The profile is `AWS_PROFILE` when
/// set, then the one given with [`ProfileCredentialProvider::with_profile`],
/// then `default`.
#[derive(Debug, Default, Clone)]
pub struct ProfileCredentialProvider {
    config: Config,
}

impl ProfileCredentialProvider {
    /// Create a new ProfileCredentialProvider with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the profile name to use.
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.config.profile = Some(profile.into());
        self
    }

    /// Set the path to the config file.
    pub fn with_config_file(mut self, path: impl Into<String>) -> Self {
        self.config.config_file = Some(path.into());
        self
    }

    /// Set the path to the credentials file.
    pub fn with_credentials_file(mut self, path: impl Into<String>) -> Self {
        self.config.shared_credentials_file = Some(path.into());
        self
    }

    fn resolve(&self, ctx: &Context) -> Config {
        let mut config = self.config.clone();
        if let Some(profile) = ctx.env_var(crate::constants::AWS_PROFILE) {
            config.profile = Some(profile);
        }
        config.from_env(ctx)
    }
}

#[async_trait]
impl ProvideCredential for ProfileCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let config = self.resolve(ctx);
        let profile = config.profile();

        if let Some(conf) = load_ini(ctx, config.shared_credentials_file()).await? {
            match conf.section(Some(profile)).and_then(credential_from_props) {
                Some(cred) => return Ok(Some(cred)),
                None => debug!("profile {profile} has no credential in credentials file"),
            }
        }

        if let Some(conf) = load_ini(ctx, config.config_file()).await? {
            let section = config_section_name(profile);
            match conf.section(Some(section.as_str())).and_then(credential_from_props) {
                Some(cred) => return Ok(Some(cred)),
                None => debug!("section {section} has no credential in config file"),
            }
        }

        Ok(None)
    }
}

fn credential_from_props(props: &Properties) -> Option<Credential> {
    let ak = props.get("aws_access_key_id")?;
    let sk = props.get("aws_secret_access_key")?;

    let mut cred = Credential::new(ak, sk);
    cred.session_token = props.get("aws_session_token").map(str::to_string);
    Some(cred)
}
