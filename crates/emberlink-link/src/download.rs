//! Endpoint-to-host configuration download.

use crate::builder::{BuildStep, TreeBuilder};
use crate::error::SessionError;
use crate::progress::ProgressSink;
use crate::session::Session;
use emberlink_proto::{Packet, PacketKind, Panel};
use tokio_util::sync::CancellationToken;

/// How a download ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// End-of-transmission received; `None` means the endpoint held no
    /// configuration
    Complete(Option<Panel>),
    /// The caller cancelled mid-transfer; the session stays connected
    Cancelled,
    /// The endpoint went silent before end-of-transmission
    TimedOut,
}

/// Request the endpoint's stored configuration and rebuild it.
///
/// Sends a download request, then consumes configuration packets in
/// arrival order until end-of-transmission. Progress is reported per
/// stored unit; the total is unknown up front, so it is reported as 0.
///
/// # Errors
///
/// `SessionError::NotConnected` if the session is not connected;
/// `SessionError::Protocol` if the request goes unacknowledged or the
/// stream violates parent-before-child order; decode failures and
/// transport errors propagate from the session.
pub async fn download(
    session: &mut Session,
    cancel: &CancellationToken,
    progress: &dyn ProgressSink,
) -> Result<DownloadOutcome, SessionError> {
    if !session.is_connected() {
        return Err(SessionError::NotConnected);
    }

    let request = Packet::empty(PacketKind::DownloadRequest);
    match session.send_and_await_ack(&request, cancel).await {
        Ok(true) => {}
        Ok(false) => {
            return Err(SessionError::Protocol(
                "download request not acknowledged".into(),
            ))
        }
        Err(SessionError::Cancelled) => return Ok(DownloadOutcome::Cancelled),
        Err(e) => return Err(e),
    }

    let mut builder = TreeBuilder::new();
    let mut stored = 0usize;
    loop {
        let packet = match session.recv_packet(cancel).await {
            Ok(Some(packet)) => packet,
            Ok(None) => {
                tracing::warn!("download timed out after {stored} units");
                return Ok(DownloadOutcome::TimedOut);
            }
            Err(SessionError::Cancelled) => return Ok(DownloadOutcome::Cancelled),
            Err(e) => return Err(e),
        };

        match builder.apply(&packet)? {
            BuildStep::Stored(label) => {
                stored += 1;
                progress.report(stored, 0, &label);
                tracing::debug!("stored unit {stored}: {label}");
            }
            BuildStep::Finished => {
                tracing::info!("download complete, {stored} units");
                return Ok(DownloadOutcome::Complete(builder.finish()));
            }
            BuildStep::Ignored => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn download_requires_connection() {
        let mut session = Session::new();
        let cancel = CancellationToken::new();
        let err = download(&mut session, &cancel, &crate::progress::NullProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::NotConnected));
    }
}
