#[macro_use]
extern crate tracing;

mod app_config;
mod args;

pub use app_config::get_config_dir;
pub use args::Args;
use color_eyre::Result;
use livetrack_obs_template::TemplateSpec;
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    collections::HashMap,
    path::{
        Path,
        PathBuf,
    },
    time::Duration,
};

/// Settings for the mailbox that receives the LiveTrack notification mails.
///
/// Only the session discovery reads these, the polling loop does not.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MailConfig {
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing)]
    pub password: String,
    pub host: String,
    pub port: u16,
    pub tls: bool,
    pub secure: bool,
    pub label: String,
    #[serde(default)]
    pub mark_seen: bool,
}

impl MailConfig {
    pub fn is_configured(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub provider_url: url::Url,
    #[serde(flatten)]
    pub mail: MailConfig,
    pub output_folder: PathBuf,
    #[serde(default)]
    pub output_templates: TemplateSpec,
    pub refresh_time_in_milliseconds: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share_url: Option<url::Url>,
    #[serde(default)]
    pub allow_overlapping_ticks: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_in_milliseconds: Option<u64>,
}

const DEFAULT_CONFIG: &str = include_str!("default-config.yaml");

impl Default for Config {
    fn default() -> Self {
        serde_yml::from_str(DEFAULT_CONFIG).expect("Failed to parse default config")
    }
}

/// Feeds the built-in scalar settings to the config builder. Templates are not
/// included, [`Config::new`] merges them over the defaults itself.
impl config::Source for Config {
    fn clone_into_box(&self) -> Box<dyn config::Source + Send + Sync> {
        Box::new((*self).clone())
    }

    fn collect(&self) -> Result<config::Map<String, config::Value>, config::ConfigError> {
        let mut cache = HashMap::<String, config::Value>::new();
        cache.insert("providerUrl".to_string(), self.provider_url.to_string().into());
        cache.insert("username".to_string(), self.mail.username.clone().into());
        cache.insert("password".to_string(), self.mail.password.clone().into());
        cache.insert("host".to_string(), self.mail.host.clone().into());
        cache.insert("port".to_string(), u64::from(self.mail.port).into());
        cache.insert("tls".to_string(), self.mail.tls.into());
        cache.insert("secure".to_string(), self.mail.secure.into());
        cache.insert("label".to_string(), self.mail.label.clone().into());
        cache.insert("markSeen".to_string(), self.mail.mark_seen.into());
        cache.insert(
            "outputFolder".to_string(),
            self.output_folder.display().to_string().into(),
        );
        cache.insert(
            "refreshTimeInMilliseconds".to_string(),
            self.refresh_time_in_milliseconds.into(),
        );
        cache.insert("allowOverlappingTicks".to_string(), self.allow_overlapping_ticks.into());
        if let Some(share_url) = &self.share_url {
            cache.insert("shareUrl".to_string(), share_url.to_string().into());
        }
        if let Some(timeout) = self.request_timeout_in_milliseconds {
            cache.insert("requestTimeoutInMilliseconds".to_string(), timeout.into());
        }
        Ok(cache)
    }
}

/// The YAML file layered over the built-in defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    pub path: PathBuf,
    /// Set for `--config`, loading fails if the file is absent.
    pub required: bool,
}

impl ConfigFile {
    /// `--config` if given, otherwise `config.yaml` inside `config_dir`.
    pub fn locate(args: &Args, config_dir: &Path) -> Self {
        match &args.config {
            Some(path) => Self {
                path: path.clone(),
                required: true,
            },
            None => Self {
                path: config_dir.join("config.yaml"),
                required: false,
            },
        }
    }

    /// The optional file is absent and only the defaults and flags apply.
    pub fn is_missing(&self) -> bool {
        !self.required && !self.path.is_file()
    }
}

impl Config {
    /// Layer the built-in defaults, the config file and the command line, in
    /// that order, then deep-merge the user's templates over the defaults.
    pub fn new(args: Args) -> Result<Self, config::ConfigError> {
        let defaults = Config::default();
        let file = ConfigFile::locate(&args, &get_config_dir());
        if file.is_missing() {
            warn!(
                path = %file.path.display(),
                "No config file found, running with the built-in defaults"
            );
        } else {
            debug!(path = %file.path.display(), required = file.required, "Loading configuration");
        }

        let cfg: Self = config::Config::builder()
            .add_source(defaults.clone())
            .add_source(
                config::File::from(file.path)
                    .format(config::FileFormat::Yaml)
                    .required(file.required),
            )
            .add_source(args)
            .build()?
            .try_deserialize()?;

        Ok(cfg.with_default_templates(defaults.output_templates))
    }

    fn with_default_templates(mut self, defaults: TemplateSpec) -> Self {
        let overrides = std::mem::take(&mut self.output_templates);
        self.output_templates = defaults.merged(overrides);
        self
    }

    /// Reject settings the poller cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.refresh_time_in_milliseconds == 0 {
            return Err(eyre::eyre!("refreshTimeInMilliseconds must be greater than zero"));
        }
        if self.output_folder.as_os_str().is_empty() {
            return Err(eyre::eyre!("outputFolder must not be empty"));
        }
        if !matches!(self.provider_url.scheme(), "http" | "https") {
            return Err(eyre::eyre!(
                "providerUrl must be an http(s) URL, got {}",
                self.provider_url
            ));
        }
        Ok(())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_time_in_milliseconds)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_in_milliseconds.map(Duration::from_millis)
    }
}
