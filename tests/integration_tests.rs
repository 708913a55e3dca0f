//! End-to-end transfers between a host session and the simulated
//! endpoint over an in-memory link: handshake, upload with per-unit
//! acknowledgment, store-and-replay download, cancellation, and the
//! not-connected guard.

use emberlink_integration_tests::{after_transfer, sample_site, CancelAfter, RecordingSink};
use emberlink_link::stream::extract_frame;
use emberlink_link::{
    count_units, download, upload, DownloadOutcome, Link, MemoryLink, NullProgress, Session,
    SessionConfig, UploadOutcome,
};
use emberlink_proto::{device_types, payload, Device, Packet, PacketKind};
use emberlink_sim::SimulatedPanel;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Adopt a fresh in-memory link served by `sim` and complete the
/// handshake.
async fn connect_to(sim: &SimulatedPanel) -> Session {
    let (host, peer) = MemoryLink::pair();
    sim.spawn(peer);
    let mut session = Session::new();
    session
        .connect(Box::new(host))
        .await
        .expect("handshake with simulated endpoint");
    session
}

// ============================================================================
// Upload
// ============================================================================

#[tokio::test(start_paused = true)]
async fn upload_stores_the_full_tree() {
    let site = sample_site();
    let sim = SimulatedPanel::new();
    let mut session = connect_to(&sim).await;

    let cancel = CancellationToken::new();
    let outcome = upload(&mut session, &site, &cancel, &NullProgress)
        .await
        .expect("upload");
    assert_eq!(outcome, UploadOutcome::Complete);
    assert_eq!(sim.stored_panel(), Some(after_transfer(&site)));
}

#[tokio::test(start_paused = true)]
async fn upload_acknowledges_every_unit() {
    let site = sample_site();
    assert_eq!(count_units(&site), 13);

    let sim = SimulatedPanel::new();
    let mut session = connect_to(&sim).await;

    let cancel = CancellationToken::new();
    let recorder = RecordingSink::new();
    let outcome = upload(&mut session, &site, &cancel, &recorder)
        .await
        .expect("upload");
    assert_eq!(outcome, UploadOutcome::Complete);

    // One report per unit plus the closing report.
    let events = recorder.events();
    assert_eq!(events.len(), 14);
    assert_eq!(events[0].0, 0);
    assert_eq!(events[0].1, 13);
    assert_eq!(events[13], (13, 13, "complete".to_string()));
}

#[tokio::test(start_paused = true)]
async fn cancelled_upload_leaves_transport_usable() {
    let site = sample_site();
    let sim = SimulatedPanel::new();
    let mut session = connect_to(&sim).await;

    let cancel = CancellationToken::new();
    let sink = CancelAfter::new(cancel.clone(), 5);
    let outcome = upload(&mut session, &site, &cancel, &sink)
        .await
        .expect("upload");
    assert_eq!(outcome, UploadOutcome::Cancelled);

    // No end-of-transmission, so nothing was committed.
    assert!(!sim.has_data());
    assert!(session.is_connected());

    // A fresh session against the same endpoint completes normally.
    let mut session = connect_to(&sim).await;
    let outcome = upload(&mut session, &site, &CancellationToken::new(), &NullProgress)
        .await
        .expect("upload");
    assert_eq!(outcome, UploadOutcome::Complete);
    assert_eq!(sim.stored_panel(), Some(after_transfer(&site)));
}

#[tokio::test]
async fn transfers_require_a_connected_session() {
    let mut session = Session::new();
    let cancel = CancellationToken::new();

    assert!(upload(&mut session, &sample_site(), &cancel, &NullProgress)
        .await
        .is_err());
    assert!(download(&mut session, &cancel, &NullProgress).await.is_err());
}

#[tokio::test(start_paused = true)]
async fn orphan_child_is_refused_over_the_wire() {
    let sim = SimulatedPanel::new();
    let mut session = connect_to(&sim).await;

    // A device packet with no panel or loop before it draws a NACK.
    let device = Device::default();
    let packet = Packet::new(
        PacketKind::DeviceConfig,
        payload::encode_device(1, 1, &device),
    );
    let acked = session
        .send_and_await_ack(&packet, &CancellationToken::new())
        .await
        .expect("ack wait");
    assert!(!acked);
}

// ============================================================================
// Download
// ============================================================================

#[tokio::test(start_paused = true)]
async fn download_replays_the_stored_tree() {
    let site = sample_site();
    let sim = SimulatedPanel::new();

    let mut session = connect_to(&sim).await;
    upload(&mut session, &site, &CancellationToken::new(), &NullProgress)
        .await
        .expect("upload");

    let outcome = download(&mut session, &CancellationToken::new(), &NullProgress)
        .await
        .expect("download");
    assert_eq!(outcome, DownloadOutcome::Complete(Some(after_transfer(&site))));
}

#[tokio::test(start_paused = true)]
async fn unknown_device_type_coerces_to_sentinel_after_transfer() {
    let mut site = sample_site();
    site.loops[0].devices[0].type_code = device_types::code_for_name("thermal imaging drone");
    assert_eq!(
        site.loops[0].devices[0].type_code,
        device_types::UNKNOWN_DEVICE_CODE
    );

    let sim = SimulatedPanel::new();
    let mut session = connect_to(&sim).await;
    upload(&mut session, &site, &CancellationToken::new(), &NullProgress)
        .await
        .expect("upload");

    let outcome = download(&mut session, &CancellationToken::new(), &NullProgress)
        .await
        .expect("download");
    let DownloadOutcome::Complete(Some(panel)) = outcome else {
        panic!("expected a stored tree, got {outcome:?}");
    };
    assert_eq!(
        device_types::name_for_code(panel.loops[0].devices[0].type_code),
        device_types::UNKNOWN_DEVICE_NAME
    );
}

#[tokio::test(start_paused = true)]
async fn download_of_empty_endpoint_yields_nothing() {
    let sim = SimulatedPanel::new();
    let mut session = connect_to(&sim).await;

    let outcome = download(&mut session, &CancellationToken::new(), &NullProgress)
        .await
        .expect("download");
    assert_eq!(outcome, DownloadOutcome::Complete(None));
}

#[tokio::test(start_paused = true)]
async fn reset_clears_the_endpoint() {
    let site = sample_site();
    let sim = SimulatedPanel::new();

    let mut session = connect_to(&sim).await;
    upload(&mut session, &site, &CancellationToken::new(), &NullProgress)
        .await
        .expect("upload");
    assert!(sim.has_data());

    sim.reset();

    let outcome = download(&mut session, &CancellationToken::new(), &NullProgress)
        .await
        .expect("download");
    assert_eq!(outcome, DownloadOutcome::Complete(None));
}

/// Serves the far end of `peer` with an endpoint that acknowledges the
/// handshake and the download request, then never sends another byte.
fn spawn_mute_endpoint(mut peer: MemoryLink) {
    tokio::spawn(async move {
        let mut buf = Vec::new();
        loop {
            match peer.try_recv() {
                Ok(bytes) => buf.extend_from_slice(&bytes),
                Err(_) => return,
            }
            while let Some(frame) = extract_frame(&mut buf) {
                let Ok(packet) = Packet::decode(&frame) else {
                    continue;
                };
                if matches!(
                    packet.kind(),
                    Some(PacketKind::Handshake | PacketKind::DownloadRequest)
                ) {
                    let ack = Packet::empty(PacketKind::Ack).encode().expect("encode ack");
                    if peer.send(&ack).await.is_err() {
                        return;
                    }
                }
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    });
}

#[tokio::test(start_paused = true)]
async fn download_times_out_when_endpoint_goes_silent() {
    let (host, peer) = MemoryLink::pair();
    spawn_mute_endpoint(peer);

    let mut session = Session::with_config(SessionConfig {
        receive_timeout: Duration::from_millis(200),
        ..SessionConfig::default()
    });
    session.connect(Box::new(host)).await.expect("handshake");

    let outcome = download(&mut session, &CancellationToken::new(), &NullProgress)
        .await
        .expect("download");
    assert_eq!(outcome, DownloadOutcome::TimedOut);
}

#[tokio::test(start_paused = true)]
async fn cancelled_download_leaves_transport_usable() {
    let site = sample_site();
    let sim = SimulatedPanel::new();
    let mut session = connect_to(&sim).await;
    upload(&mut session, &site, &CancellationToken::new(), &NullProgress)
        .await
        .expect("upload");

    let cancel = CancellationToken::new();
    let sink = CancelAfter::new(cancel.clone(), 1);
    let outcome = download(&mut session, &cancel, &sink)
        .await
        .expect("download");
    assert_eq!(outcome, DownloadOutcome::Cancelled);
    assert!(session.is_connected());

    // The endpoint still holds the tree; a fresh session retrieves it.
    let mut session = connect_to(&sim).await;
    let outcome = download(&mut session, &CancellationToken::new(), &NullProgress)
        .await
        .expect("download");
    assert_eq!(outcome, DownloadOutcome::Complete(Some(after_transfer(&site))));
}

#[tokio::test(start_paused = true)]
async fn second_upload_replaces_the_first() {
    let sim = SimulatedPanel::new();

    let mut first = sample_site();
    first.name = "Old Site".into();
    let mut session = connect_to(&sim).await;
    upload(&mut session, &first, &CancellationToken::new(), &NullProgress)
        .await
        .expect("upload");

    let mut second = sample_site();
    second.name = "New Site".into();
    upload(&mut session, &second, &CancellationToken::new(), &NullProgress)
        .await
        .expect("upload");

    assert_eq!(sim.stored_panel(), Some(after_transfer(&second)));
}
