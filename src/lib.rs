#[macro_use]
extern crate tracing;

pub mod logging;

use color_eyre::Result;
use eyre::Context as _;
pub use livetrack_obs_config::{
    Args,
    Config,
};
use livetrack_obs_poller::{
    listen_stdin,
    session_channel,
    Poller,
    SessionCredentials,
};

/// Install the eyre report handler and a panic hook: a crash report file in
/// release builds, a full backtrace in debug builds.
pub fn init_errors() -> Result<()> {
    let (panic_hook, eyre_hook) = color_eyre::config::HookBuilder::default()
        .display_location_section(cfg!(debug_assertions))
        .into_hooks();
    eyre_hook.install()?;

    std::panic::set_hook(Box::new(move |panic_info| {
        error!("{}", panic_hook.panic_report(panic_info));

        #[cfg(not(debug_assertions))]
        {
            use human_panic::{
                handle_dump,
                print_msg,
                Metadata,
            };
            let metadata = Metadata::new(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
            let file_path = handle_dump(&metadata, panic_info);
            let _ = print_msg(file_path, &metadata);
        }

        #[cfg(debug_assertions)]
        better_panic::Settings::auto()
            .most_recent_first(false)
            .lineno_suffix(true)
            .verbosity(better_panic::Verbosity::Full)
            .create_panic_handler()(panic_info);

        std::process::exit(1);
    }));
    Ok(())
}

/// Load the configuration, start the session producers and poll until Ctrl-C.
pub async fn run(args: Args) -> Result<()> {
    info!(version = env!("CARGO_PKG_VERSION"), "Starting {}", env!("CARGO_PKG_NAME"));
    let config = Config::new(args).wrap_err("failed to load configuration")?;
    config.validate()?;

    if config.mail.is_configured() {
        info!(
            host = %config.mail.host,
            port = config.mail.port,
            label = %config.mail.label,
            "Mail settings found, share links are read from stdin"
        );
    }

    let initial = match &config.share_url {
        Some(share_url) => SessionCredentials::from_share_url(share_url.as_str())?,
        None => {
            info!("Paste a LiveTrack share link to start polling");
            SessionCredentials::default()
        }
    };
    let (sender, receiver) = session_channel(initial);
    let poller = Poller::from_config(&config, receiver)?;

    info!(
        output_folder = %config.output_folder.display(),
        templates = config.output_templates.leaf_count(),
        "Writing LiveTrack stats"
    );

    tokio::spawn(async move {
        if let Err(err) = listen_stdin(sender).await {
            error!("Stopped reading share links: {err:?}");
        }
    });

    tokio::select! {
        _ = poller.run() => {}
        signal = tokio::signal::ctrl_c() => {
            signal.wrap_err("failed to listen for Ctrl-C")?;
            info!("Shutting down");
        }
    }
    Ok(())
}
