//! Serial port link backend.
//!
//! Wire parameters for the physical endpoint: 115200 baud, 8 data bits,
//! no parity, one stop bit, no flow control. Reads are non-blocking via
//! `bytes_to_read`, matching the cooperative polling the session layer
//! expects.

use crate::error::LinkError;
use crate::link::Link;
use async_trait::async_trait;
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{Read, Write};
use std::time::Duration;

/// Serial line rate for the embedded endpoint
pub const BAUD_RATE: u32 = 115_200;

/// A link over a physical serial port
pub struct SerialLink {
    port: Option<Box<dyn SerialPort>>,
}

impl SerialLink {
    /// Open a serial port with the protocol's line parameters.
    ///
    /// # Errors
    ///
    /// Returns `LinkError::Serial` if the port cannot be opened.
    pub fn open(path: &str, baud: u32) -> Result<Self, LinkError> {
        let port = serialport::new(path, baud)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(Duration::from_millis(100))
            .open()?;
        Ok(Self { port: Some(port) })
    }

    /// Names of serial ports present on this machine
    #[must_use]
    pub fn available_ports() -> Vec<String> {
        serialport::available_ports()
            .map(|ports| {
                let mut names: Vec<String> =
                    ports.into_iter().map(|p| p.port_name).collect();
                names.sort();
                names
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl Link for SerialLink {
    async fn send(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        let port = self.port.as_mut().ok_or(LinkError::Closed)?;
        port.write_all(bytes)?;
        port.flush()?;
        Ok(())
    }

    fn try_recv(&mut self) -> Result<Vec<u8>, LinkError> {
        let port = self.port.as_mut().ok_or(LinkError::Closed)?;
        let pending = port.bytes_to_read()? as usize;
        if pending == 0 {
            return Ok(Vec::new());
        }
        let mut bytes = vec![0u8; pending];
        port.read_exact(&mut bytes)?;
        Ok(bytes)
    }

    fn close(&mut self) {
        self.port = None;
    }
}
