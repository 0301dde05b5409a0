use eyre::{
    bail,
    Context as _,
    Result,
};
use tokio::{
    io::{
        AsyncBufRead,
        AsyncBufReadExt as _,
        BufReader,
    },
    sync::watch,
};

/// Session id and token of a LiveTrack share, as announced in the
/// notification mail.
///
/// Either part can be missing until a producer has seen a share link.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionCredentials {
    pub id: Option<String>,
    pub token: Option<String>,
}

impl SessionCredentials {
    pub fn new(id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            token: Some(token.into()),
        }
    }

    /// Parse a share link of the form
    /// `https://livetrack.garmin.com/session/<id>/token/<token>`.
    pub fn from_share_url(share_url: &str) -> Result<Self> {
        let url = url::Url::parse(share_url.trim()).with_context(|| format!("invalid share link {share_url:?}"))?;

        let path_segments: Vec<&str> = url
            .path_segments()
            .map(|segments| segments.filter(|segment| !segment.is_empty()).collect())
            .unwrap_or_default();

        match path_segments.as_slice() {
            ["session", id, "token", token, ..] => Ok(Self::new(*id, *token)),
            _ => bail!("{share_url:?} is not a LiveTrack share link"),
        }
    }

    /// The id, if both id and token are present and non-empty.
    pub fn ready(&self) -> Option<&str> {
        let id = self.id.as_deref().filter(|id| !id.is_empty())?;
        self.token.as_deref().filter(|token| !token.is_empty())?;
        Some(id)
    }
}

pub type SessionSender = watch::Sender<SessionCredentials>;
pub type SessionReceiver = watch::Receiver<SessionCredentials>;

/// Shared credential cell. Producers own the sender, the poller reads
/// snapshots from the receiver.
pub fn session_channel(initial: SessionCredentials) -> (SessionSender, SessionReceiver) {
    watch::channel(initial)
}

/// Replace the credentials with every share link typed or piped on stdin.
pub async fn listen_stdin(sender: SessionSender) -> Result<()> {
    listen_lines(BufReader::new(tokio::io::stdin()), &sender).await
}

/// Read share links line by line until the reader is exhausted or every
/// receiver is gone.
pub async fn listen_lines<R>(reader: R, sender: &SessionSender) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await.context("failed reading share links")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match SessionCredentials::from_share_url(line) {
            Ok(credentials) => {
                info!(id = credentials.id.as_deref().unwrap_or_default(), "Received new LiveTrack session");
                if sender.send(credentials).is_err() {
                    debug!("Poller is gone, no longer reading share links");
                    break;
                }
            }
            Err(err) => warn!("Ignoring input: {err}"),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_share_links() {
        assert_eq!(
            SessionCredentials::from_share_url("https://livetrack.garmin.com/session/abc-123/token/XYZ789").unwrap(),
            SessionCredentials::new("abc-123", "XYZ789")
        );
        assert_eq!(
            SessionCredentials::from_share_url(" https://livetrack.garmin.com/session/abc/token/xyz/?utm=mail\n")
                .unwrap(),
            SessionCredentials::new("abc", "xyz")
        );
    }

    #[test]
    fn rejects_other_links() {
        assert!(SessionCredentials::from_share_url("not a url").is_err());
        assert!(SessionCredentials::from_share_url("https://livetrack.garmin.com/session/abc").is_err());
        assert!(SessionCredentials::from_share_url("https://livetrack.garmin.com/m/abc/token/xyz").is_err());
    }

    #[test]
    fn ready_needs_both_parts() {
        assert_eq!(SessionCredentials::default().ready(), None);
        assert_eq!(
            SessionCredentials {
                id: Some("abc".to_string()),
                token: None,
            }
            .ready(),
            None
        );
        assert_eq!(SessionCredentials::new("abc", "").ready(), None);
        assert_eq!(SessionCredentials::new("", "xyz").ready(), None);
        assert_eq!(SessionCredentials::new("abc", "xyz").ready(), Some("abc"));
    }

    #[tokio::test]
    async fn latest_valid_line_wins() {
        let (sender, receiver) = session_channel(SessionCredentials::default());
        let input = b"https://livetrack.garmin.com/session/first/token/one\n\
                      garbage\n\
                      \n\
                      https://livetrack.garmin.com/session/second/token/two\n";

        listen_lines(BufReader::new(&input[..]), &sender).await.unwrap();

        assert_eq!(*receiver.borrow(), SessionCredentials::new("second", "two"));
    }
}
