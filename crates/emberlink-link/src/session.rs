//! Transport session state machine.
//!
//! One session owns one link and carries exactly one upload or download
//! at a time. All waits are cooperative: drain the link, try to split a
//! frame out, sleep briefly, recheck, bounded by a wall-clock deadline.
//! That keeps every wait cancellable and never parks the caller's thread
//! on a blocking read.

use crate::error::SessionError;
use crate::link::Link;
use crate::stream::extract_frame;
use emberlink_proto::{Packet, PacketKind};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// How long the endpoint gets to answer the handshake
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_millis(5000);

/// How long the endpoint gets to acknowledge one packet
pub const ACK_TIMEOUT: Duration = Duration::from_millis(2000);

/// How long a download waits for each configuration packet
pub const RECEIVE_TIMEOUT: Duration = Duration::from_millis(5000);

/// Cadence of the cooperative receive poll
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Grace period after adopting a link, before the handshake; the embedded
/// endpoint needs a moment after the port opens
const SETTLE_DELAY: Duration = Duration::from_millis(100);

/// Pause after each write so the endpoint's receive buffer keeps up
const INTER_PACKET_DELAY: Duration = Duration::from_millis(10);

/// Session lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No link adopted
    Disconnected,
    /// Link adopted, handshake in flight
    Handshaking,
    /// Handshake acknowledged, transfers may run
    Connected,
    /// The link failed underneath an operation
    Faulted,
}

/// Session timeout configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Handshake ACK deadline
    pub handshake_timeout: Duration,
    /// Per-packet ACK deadline
    pub ack_timeout: Duration,
    /// Per-packet receive deadline during downloads
    pub receive_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            handshake_timeout: HANDSHAKE_TIMEOUT,
            ack_timeout: ACK_TIMEOUT,
            receive_timeout: RECEIVE_TIMEOUT,
        }
    }
}

/// A transport session over one exclusively owned link
pub struct Session {
    state: SessionState,
    config: SessionConfig,
    link: Option<Box<dyn Link>>,
    rx_buf: Vec<u8>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Create a disconnected session with default timeouts
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(SessionConfig::default())
    }

    /// Create a disconnected session with custom timeouts
    #[must_use]
    pub fn with_config(config: SessionConfig) -> Self {
        Self {
            state: SessionState::Disconnected,
            config,
            link: None,
            rx_buf: Vec::new(),
        }
    }

    /// Current lifecycle state
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether transfers may run
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state == SessionState::Connected
    }

    /// Adopt a link and perform the handshake.
    ///
    /// On success the session is `Connected`. On failure or timeout the
    /// link is closed and the session returns to `Disconnected`.
    ///
    /// # Errors
    ///
    /// `SessionError::HandshakeFailed` if the endpoint does not answer
    /// with ACK within the handshake deadline; `SessionError::Link` if
    /// the link fails outright.
    pub async fn connect(&mut self, link: Box<dyn Link>) -> Result<(), SessionError> {
        self.disconnect();
        self.link = Some(link);
        self.set_state(SessionState::Handshaking);

        tokio::time::sleep(SETTLE_DELAY).await;

        let result = async {
            self.write_frame(&Packet::empty(PacketKind::Handshake)).await?;
            self.await_ack(self.config.handshake_timeout, None).await
        }
        .await;

        match result {
            Ok(true) => {
                self.set_state(SessionState::Connected);
                tracing::debug!("handshake acknowledged");
                Ok(())
            }
            Ok(false) => {
                tracing::warn!("handshake not acknowledged");
                self.disconnect();
                Err(SessionError::HandshakeFailed)
            }
            Err(e) => {
                self.disconnect();
                Err(e)
            }
        }
    }

    /// Release the link. Idempotent; always ends `Disconnected`.
    pub fn disconnect(&mut self) {
        if let Some(mut link) = self.link.take() {
            link.close();
        }
        self.rx_buf.clear();
        self.set_state(SessionState::Disconnected);
    }

    /// Send one packet without waiting for acknowledgment.
    ///
    /// # Errors
    ///
    /// `SessionError::NotConnected` unless the session is `Connected`;
    /// `SessionError::Link` on a write failure (the session faults).
    pub async fn send_raw(&mut self, packet: &Packet) -> Result<(), SessionError> {
        if !self.is_connected() {
            return Err(SessionError::NotConnected);
        }
        self.write_frame(packet).await
    }

    /// Send one packet and wait for its acknowledgment.
    ///
    /// Returns `true` when the first decodable response is ACK, `false`
    /// on NACK or when the deadline elapses. No retry is attempted.
    ///
    /// # Errors
    ///
    /// `SessionError::Cancelled` if the token fires mid-wait;
    /// `SessionError::Protocol` if the endpoint answers with a packet
    /// that is neither ACK nor NACK; transport errors as for
    /// [`Session::send_raw`].
    pub async fn send_and_await_ack(
        &mut self,
        packet: &Packet,
        cancel: &CancellationToken,
    ) -> Result<bool, SessionError> {
        self.send_raw(packet).await?;
        self.await_ack(self.config.ack_timeout, Some(cancel)).await
    }

    /// Wait for the next complete packet from the endpoint.
    ///
    /// Returns `Ok(None)` when the receive deadline elapses.
    ///
    /// # Errors
    ///
    /// `SessionError::Cancelled` if the token fires mid-wait;
    /// `SessionError::Proto` if a frame arrives but fails to decode
    /// (malformed packets are fatal to a download);
    /// `SessionError::NotConnected` unless `Connected`.
    pub async fn recv_packet(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<Option<Packet>, SessionError> {
        if !self.is_connected() {
            return Err(SessionError::NotConnected);
        }

        let deadline = Instant::now() + self.config.receive_timeout;
        loop {
            if cancel.is_cancelled() {
                return Err(SessionError::Cancelled);
            }

            self.drain_link()?;
            if let Some(frame) = extract_frame(&mut self.rx_buf) {
                return Ok(Some(Packet::decode(&frame)?));
            }

            if Instant::now() >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Poll for an ACK/NACK answer until `timeout` elapses.
    ///
    /// Frames that fail to decode are skipped; line noise must not count
    /// as a verdict. A decodable packet of any other kind is a protocol
    /// violation in this position.
    async fn await_ack(
        &mut self,
        timeout: Duration,
        cancel: Option<&CancellationToken>,
    ) -> Result<bool, SessionError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(token) = cancel {
                if token.is_cancelled() {
                    return Err(SessionError::Cancelled);
                }
            }

            self.drain_link()?;
            while let Some(frame) = extract_frame(&mut self.rx_buf) {
                match Packet::decode(&frame) {
                    Ok(packet) => match packet.kind() {
                        Some(PacketKind::Ack) => return Ok(true),
                        Some(PacketKind::Nack) => return Ok(false),
                        _ => {
                            return Err(SessionError::Protocol(format!(
                                "expected ACK or NACK, got type 0x{:02X}",
                                packet.type_code()
                            )))
                        }
                    },
                    Err(e) => {
                        tracing::debug!("skipping undecodable frame while awaiting ACK: {e}");
                    }
                }
            }

            if Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn write_frame(&mut self, packet: &Packet) -> Result<(), SessionError> {
        let frame = packet.encode()?;
        let link = self.link.as_mut().ok_or(SessionError::NotConnected)?;
        if let Err(e) = link.send(&frame).await {
            self.set_state(SessionState::Faulted);
            return Err(e.into());
        }
        tokio::time::sleep(INTER_PACKET_DELAY).await;
        Ok(())
    }

    fn drain_link(&mut self) -> Result<(), SessionError> {
        let link = self.link.as_mut().ok_or(SessionError::NotConnected)?;
        match link.try_recv() {
            Ok(bytes) => {
                self.rx_buf.extend_from_slice(&bytes);
                Ok(())
            }
            Err(e) => {
                self.set_state(SessionState::Faulted);
                Err(e.into())
            }
        }
    }

    fn set_state(&mut self, new_state: SessionState) {
        if self.state != new_state {
            tracing::debug!("session state: {:?} -> {:?}", self.state, new_state);
            self.state = new_state;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::MemoryLink;

    async fn feed(peer: &mut MemoryLink, kind: PacketKind) {
        let frame = Packet::empty(kind).encode().unwrap();
        peer.send(&frame).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn handshake_success_connects() {
        let (host, mut peer) = MemoryLink::pair();
        feed(&mut peer, PacketKind::Ack).await;

        let mut session = Session::new();
        session.connect(Box::new(host)).await.unwrap();
        assert_eq!(session.state(), SessionState::Connected);

        // The handshake frame reached the peer.
        let mut seen = peer.try_recv().unwrap();
        let frame = extract_frame(&mut seen).unwrap();
        assert_eq!(
            Packet::decode(&frame).unwrap().kind(),
            Some(PacketKind::Handshake)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn handshake_timeout_disconnects() {
        let (host, _peer) = MemoryLink::pair();
        let mut session = Session::new();

        let err = session.connect(Box::new(host)).await.unwrap_err();
        assert!(matches!(err, SessionError::HandshakeFailed));
        assert_eq!(session.state(), SessionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn handshake_nack_disconnects() {
        let (host, mut peer) = MemoryLink::pair();
        feed(&mut peer, PacketKind::Nack).await;

        let mut session = Session::new();
        let err = session.connect(Box::new(host)).await.unwrap_err();
        assert!(matches!(err, SessionError::HandshakeFailed));
    }

    #[tokio::test]
    async fn send_raw_requires_connection() {
        let mut session = Session::new();
        let err = session
            .send_raw(&Packet::empty(PacketKind::Handshake))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::NotConnected));
    }

    #[tokio::test(start_paused = true)]
    async fn ack_and_nack_verdicts() {
        let (host, mut peer) = MemoryLink::pair();
        feed(&mut peer, PacketKind::Ack).await;
        let mut session = Session::new();
        session.connect(Box::new(host)).await.unwrap();

        let cancel = CancellationToken::new();
        feed(&mut peer, PacketKind::Ack).await;
        assert!(session
            .send_and_await_ack(&Packet::empty(PacketKind::EndTransmission), &cancel)
            .await
            .unwrap());

        feed(&mut peer, PacketKind::Nack).await;
        assert!(!session
            .send_and_await_ack(&Packet::empty(PacketKind::EndTransmission), &cancel)
            .await
            .unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn ack_wait_times_out_false() {
        let (host, mut peer) = MemoryLink::pair();
        feed(&mut peer, PacketKind::Ack).await;
        let mut session = Session::new();
        session.connect(Box::new(host)).await.unwrap();

        let cancel = CancellationToken::new();
        assert!(!session
            .send_and_await_ack(&Packet::empty(PacketKind::PanelConfig), &cancel)
            .await
            .unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_wait_reports_cancelled() {
        let (host, mut peer) = MemoryLink::pair();
        feed(&mut peer, PacketKind::Ack).await;
        let mut session = Session::new();
        session.connect(Box::new(host)).await.unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = session
            .send_and_await_ack(&Packet::empty(PacketKind::PanelConfig), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Cancelled));
        // Cancellation does not tear the session down.
        assert!(session.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn unexpected_packet_in_ack_position_is_protocol_error() {
        let (host, mut peer) = MemoryLink::pair();
        feed(&mut peer, PacketKind::Ack).await;
        let mut session = Session::new();
        session.connect(Box::new(host)).await.unwrap();

        feed(&mut peer, PacketKind::PanelConfig).await;
        let cancel = CancellationToken::new();
        let err = session
            .send_and_await_ack(&Packet::empty(PacketKind::LoopConfig), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Protocol(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_is_idempotent() {
        let (host, mut peer) = MemoryLink::pair();
        feed(&mut peer, PacketKind::Ack).await;
        let mut session = Session::new();
        session.connect(Box::new(host)).await.unwrap();

        session.disconnect();
        session.disconnect();
        assert_eq!(session.state(), SessionState::Disconnected);
    }
}
