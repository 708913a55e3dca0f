//! Frame extraction from an accumulating byte stream.
//!
//! A serial stream delivers bytes in arbitrary chunks; this module splits
//! complete frames back out. Bytes before a start marker are garbage from
//! line noise or a half-seen frame and are discarded; an implausible
//! header resyncs by dropping the false start marker and rescanning.

use emberlink_proto::{END_BYTE, FRAME_OVERHEAD, MAX_PAYLOAD, START_BYTE};

/// Split one complete frame off the front of `buf`, if present.
///
/// Consumed bytes (the frame plus any leading garbage) are removed from
/// `buf`. Returns `None` when no complete frame is available yet.
pub fn extract_frame(buf: &mut Vec<u8>) -> Option<Vec<u8>> {
    loop {
        // Drop garbage ahead of the start marker.
        match buf.iter().position(|&b| b == START_BYTE) {
            Some(0) => {}
            Some(start) => {
                buf.drain(..start);
            }
            None => {
                buf.clear();
                return None;
            }
        }

        if buf.len() < 4 {
            return None;
        }

        let declared = ((buf[2] as usize) << 8) | buf[3] as usize;
        if declared > MAX_PAYLOAD {
            // Not a real header; resync past this start marker.
            buf.drain(..1);
            continue;
        }

        let total = declared + FRAME_OVERHEAD;
        if buf.len() < total {
            return None;
        }

        if buf[total - 1] != END_BYTE {
            buf.drain(..1);
            continue;
        }

        let frame: Vec<u8> = buf.drain(..total).collect();
        return Some(frame);
    }
}
