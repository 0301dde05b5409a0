use clap::Parser;
use std::path::PathBuf;

/// Render a Garmin LiveTrack session into text files for OBS.
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version = version(), about, long_about = None)]
pub struct Args {
    /// Config file to load instead of `config.yaml` in the config directory.
    #[clap(long, short, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// LiveTrack share link to start polling right away,
    /// e.g. `https://livetrack.garmin.com/session/<id>/token/<token>`.
    #[clap(long, value_name = "URL")]
    pub share_url: Option<String>,

    /// Folder the rendered files are written to.
    #[clap(long, value_name = "DIR")]
    pub output_folder: Option<PathBuf>,

    /// Poll interval in milliseconds.
    #[clap(long = "refresh-time", value_name = "MS")]
    pub refresh_time_in_milliseconds: Option<u64>,

    /// Base URL of the LiveTrack service.
    #[clap(long, value_name = "URL")]
    pub provider_url: Option<String>,

    /// Start a poll even when the previous one has not finished yet.
    #[clap(long, action)]
    pub allow_overlapping_ticks: bool,

    /// Log at debug level.
    #[clap(long, short, action)]
    pub verbose: bool,
}

mod config_ext {
    use super::*;
    use config::{
        Map,
        Source,
        Value,
    };
    use std::collections::HashMap;

    impl Source for Args {
        fn clone_into_box(&self) -> Box<dyn Source + Send + Sync> {
            Box::new((*self).clone())
        }

        fn collect(&self) -> Result<Map<String, Value>, config::ConfigError> {
            let mut cache = HashMap::<String, Value>::new();
            if let Some(share_url) = &self.share_url {
                cache.insert("shareUrl".to_string(), share_url.clone().into());
            }
            if let Some(output_folder) = &self.output_folder {
                cache.insert("outputFolder".to_string(), output_folder.display().to_string().into());
            }
            if let Some(refresh) = self.refresh_time_in_milliseconds {
                cache.insert("refreshTimeInMilliseconds".to_string(), refresh.into());
            }
            if let Some(provider_url) = &self.provider_url {
                cache.insert("providerUrl".to_string(), provider_url.clone().into());
            }
            if self.allow_overlapping_ticks {
                cache.insert("allowOverlappingTicks".to_string(), true.into());
            }
            Ok(cache)
        }
    }
}

pub fn version() -> String {
    let author = clap::crate_authors!();
    let config_dir_path = crate::get_config_dir().display().to_string();

    format!(
        "{}

Authors: {author}

Config directory: {config_dir_path}",
        clap::crate_version!()
    )
}
