use crate::{
    client::{
        trackpoints_url,
        HttpTelemetryClient,
        TelemetryClient,
    },
    output::{
        FileOutput,
        OutputSink,
        TRACKPOINTS_FILE,
    },
    session::SessionReceiver,
    trackpoint::{
        normalize,
        Trackpoint,
    },
};
use color_eyre::Result;
use eyre::{
    eyre,
    Context as _,
};
use livetrack_obs_config::Config;
use livetrack_obs_template::CompiledTemplates;
use std::{
    path::PathBuf,
    sync::{
        atomic::{
            AtomicBool,
            AtomicU32,
            Ordering,
        },
        Arc,
    },
    time::Duration,
};
use tokio::time::MissedTickBehavior;
use url::Url;

/// What a single poll ended with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// No session id and token yet.
    NotReady,
    /// The previous poll was still running.
    Skipped,
    /// The service answered with something other than 200.
    Rejected { status: u16, body: String },
    /// Payload and rendered templates were written.
    Written { files: Vec<PathBuf> },
}

/// Without `requestTimeoutInMilliseconds`, a fetch holding the in-flight
/// guard is given up after this many refresh intervals.
pub const STALLED_FETCH_INTERVALS: u32 = 3;

#[derive(Debug, Clone)]
pub struct PollSettings {
    pub provider_url: Url,
    pub interval: Duration,
    pub allow_overlapping_ticks: bool,
    /// Upper bound for a single fetch, `None` waits for as long as it takes.
    pub fetch_timeout: Option<Duration>,
}

impl From<&Config> for PollSettings {
    fn from(config: &Config) -> Self {
        let fetch_timeout = config.request_timeout().or_else(|| {
            (!config.allow_overlapping_ticks).then(|| config.refresh_interval() * STALLED_FETCH_INTERVALS)
        });
        Self {
            provider_url: config.provider_url.clone(),
            interval: config.refresh_interval(),
            allow_overlapping_ticks: config.allow_overlapping_ticks,
            fetch_timeout,
        }
    }
}

struct PollerInner {
    settings: PollSettings,
    templates: CompiledTemplates,
    session: SessionReceiver,
    client: Arc<dyn TelemetryClient>,
    sink: Arc<dyn OutputSink>,
    in_flight: AtomicBool,
    /// Ticks skipped in a row while one poll kept the guard.
    skipped: AtomicU32,
}

/// Fetches the latest trackpoint on a fixed interval and writes it out.
#[derive(Clone)]
pub struct Poller {
    inner: Arc<PollerInner>,
}

/// Clears the in-flight flag when a poll finishes, however it finishes.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Poller {
    pub fn new(
        settings: PollSettings,
        templates: CompiledTemplates,
        session: SessionReceiver,
        client: Arc<dyn TelemetryClient>,
        sink: Arc<dyn OutputSink>,
    ) -> Self {
        Self {
            inner: Arc::new(PollerInner {
                settings,
                templates,
                session,
                client,
                sink,
                in_flight: AtomicBool::new(false),
                skipped: AtomicU32::new(0),
            }),
        }
    }

    /// Poll the LiveTrack service over HTTP and write into `outputFolder`.
    ///
    /// Fails if a template does not compile.
    pub fn from_config(config: &Config, session: SessionReceiver) -> Result<Self> {
        let templates = CompiledTemplates::compile(&config.output_templates).context("invalid outputTemplates")?;
        let client = HttpTelemetryClient::new(config.request_timeout())?;
        let sink = FileOutput::new(&config.output_folder);

        Ok(Self::new(
            PollSettings::from(config),
            templates,
            session,
            Arc::new(client),
            Arc::new(sink),
        ))
    }

    /// Tick forever. Every tick runs in its own task so a slow or failing poll
    /// never holds up the timer.
    pub async fn run(self) {
        let mut interval = tokio::time::interval(self.inner.settings.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            interval_ms = self.inner.settings.interval.as_millis() as u64,
            provider = %self.inner.settings.provider_url,
            "Polling LiveTrack"
        );

        loop {
            interval.tick().await;
            let poller = self.clone();
            tokio::spawn(async move { poller.tick_and_log().await });
        }
    }

    async fn tick_and_log(&self) {
        match self.tick().await {
            Ok(TickOutcome::NotReady) => {
                warn!("No LiveTrack session id/token available yet, trying again on the next tick")
            }
            Ok(TickOutcome::Skipped) => match self.inner.skipped.load(Ordering::Relaxed) {
                0 | 1 => debug!("Previous poll still running, skipping this tick"),
                skipped => warn!(skipped, "Previous poll still running, skipped {skipped} ticks in a row"),
            },
            Ok(TickOutcome::Rejected { status, body }) => {
                warn!(
                    status,
                    "LiveTrack rejected the request, the share link may have expired: {body}"
                )
            }
            Ok(TickOutcome::Written { files }) => debug!(files = files.len(), "Wrote latest trackpoint"),
            Err(err) => error!("Poll failed: {err:?}"),
        }
    }

    /// Run one poll: check the session, fetch, normalize, render and write.
    #[instrument(level = "debug", skip(self))]
    pub async fn tick(&self) -> Result<TickOutcome> {
        let inner = &self.inner;
        let _guard = if inner.settings.allow_overlapping_ticks {
            None
        } else {
            if inner
                .in_flight
                .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
                .is_err()
            {
                inner.skipped.fetch_add(1, Ordering::Relaxed);
                return Ok(TickOutcome::Skipped);
            }
            inner.skipped.store(0, Ordering::Relaxed);
            Some(InFlight(&inner.in_flight))
        };

        let session_id = inner.session.borrow().ready().map(str::to_string);
        let Some(session_id) = session_id else {
            return Ok(TickOutcome::NotReady);
        };

        let url = trackpoints_url(
            &inner.settings.provider_url,
            &session_id,
            chrono::Utc::now().timestamp_millis(),
        )?;
        info!(%url, "Fetching trackpoints");
        let response = match inner.settings.fetch_timeout {
            Some(limit) => tokio::time::timeout(limit, inner.client.get(url))
                .await
                .map_err(|_| eyre!("no answer from LiveTrack within {limit:?}"))??,
            None => inner.client.get(url).await?,
        };
        if !response.is_ok() {
            return Ok(TickOutcome::Rejected {
                status: response.status,
                body: response.body,
            });
        }

        let payload: serde_json::Value =
            serde_json::from_str(&response.body).context("trackpoints response is not valid JSON")?;
        let normalized = normalize(&payload)?;
        let scope = normalized.latest.as_ref().map(Trackpoint::to_scope).transpose()?;
        if scope.is_none() {
            debug!("Session has no trackpoints yet");
        }

        let mut files = vec![inner.sink.write_json(TRACKPOINTS_FILE, &payload).await?];
        let rendered = inner.templates.render(scope.as_ref());
        files.extend(inner.sink.write_rendered(&rendered).await?);

        Ok(TickOutcome::Written { files })
    }
}
