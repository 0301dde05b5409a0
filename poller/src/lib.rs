//! Polls a Garmin LiveTrack session and turns its latest trackpoint into
//! text files.
//!
//! - **`session`**: the shared session id/token and the producers feeding it
//! - **`client`**: HTTP access to the trackpoints endpoint
//! - **`trackpoint`**: typed samples and the normalization of a response
//! - **`output`**: where the payload and rendered templates are written
//! - **`scheduler`**: the polling loop tying it all together

#[macro_use]
extern crate tracing;

pub mod client;
pub mod output;
pub mod scheduler;
pub mod session;
pub mod trackpoint;

pub use client::{
    HttpTelemetryClient,
    TelemetryClient,
    TelemetryResponse,
};
pub use output::{
    FileOutput,
    OutputSink,
};
pub use scheduler::{
    PollSettings,
    Poller,
    TickOutcome,
};
pub use session::{
    listen_stdin,
    session_channel,
    SessionCredentials,
    SessionReceiver,
    SessionSender,
};
pub use trackpoint::{
    normalize,
    Normalized,
    Trackpoint,
};
