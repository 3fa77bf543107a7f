//! Bulk-transfer channel over an already-opened rusb device handle.

use std::time::Duration;

use rusb::{DeviceHandle, Direction, GlobalContext, TransferType, UsbContext};
use tracing::debug;

use crate::error::ChannelError;
use crate::types::DeviceInfo;
use crate::BulkChannel;

/// Timeout for a single 3-byte command write. Output transfers complete in
/// well under a frame; anything slower means the device is gone.
const WRITE_TIMEOUT: Duration = Duration::from_millis(1000);

/// [`BulkChannel`] over a claimed USB interface.
///
/// The caller supplies an opened handle (discovery and the permission
/// handshake happen upstream); construction resolves the bulk endpoint pair
/// of interface 0 by direction and claims the interface. The interface is
/// released on drop, the handle itself closes when the last owner drops it.
pub struct UsbBulkChannel<T: UsbContext = GlobalContext> {
    handle: DeviceHandle<T>,
    interface: u8,
    in_endpoint: u8,
    out_endpoint: u8,
    max_packet_size: usize,
    info: DeviceInfo,
}

impl<T: UsbContext> UsbBulkChannel<T> {
    /// Claim interface 0 of an opened device and resolve its endpoints.
    ///
    /// The endpoint pair may appear in either order in the descriptor; both
    /// are matched by direction, as the device does not guarantee one.
    pub fn claim(mut handle: DeviceHandle<T>) -> Result<Self, ChannelError> {
        let device = handle.device();
        let descriptor = device.device_descriptor()?;
        let config = device.active_config_descriptor()?;

        let interface = config
            .interfaces()
            .next()
            .ok_or(ChannelError::NoBulkEndpoints { interface: 0 })?;
        let interface_number = interface.number();
        let setting = interface
            .descriptors()
            .next()
            .ok_or(ChannelError::NoBulkEndpoints {
                interface: interface_number,
            })?;

        let mut in_endpoint = None;
        let mut out_endpoint = None;
        let mut max_packet_size = 0usize;
        for endpoint in setting.endpoint_descriptors() {
            if endpoint.transfer_type() != TransferType::Bulk {
                continue;
            }
            match endpoint.direction() {
                Direction::In => {
                    in_endpoint = Some(endpoint.address());
                    max_packet_size = endpoint.max_packet_size() as usize;
                }
                Direction::Out => out_endpoint = Some(endpoint.address()),
            }
        }
        let (in_endpoint, out_endpoint) = match (in_endpoint, out_endpoint) {
            (Some(i), Some(o)) => (i, o),
            _ => {
                return Err(ChannelError::NoBulkEndpoints {
                    interface: interface_number,
                })
            }
        };

        handle.claim_interface(interface_number)?;

        let info = DeviceInfo {
            vid: descriptor.vendor_id(),
            pid: descriptor.product_id(),
            manufacturer: handle.read_manufacturer_string_ascii(&descriptor).ok(),
            product: handle.read_product_string_ascii(&descriptor).ok(),
        };
        debug!(
            "claimed interface {interface_number} of {} (in=0x{in_endpoint:02X}, \
             out=0x{out_endpoint:02X}, max packet {max_packet_size})",
            info.name()
        );

        Ok(Self {
            handle,
            interface: interface_number,
            in_endpoint,
            out_endpoint,
            max_packet_size,
            info,
        })
    }
}

impl<T: UsbContext> BulkChannel for UsbBulkChannel<T> {
    fn write(&self, data: &[u8]) -> Result<(), ChannelError> {
        let written = self
            .handle
            .write_bulk(self.out_endpoint, data, WRITE_TIMEOUT)?;
        if written != data.len() {
            return Err(ChannelError::ShortWrite {
                written,
                expected: data.len(),
            });
        }
        Ok(())
    }

    fn read(&self, buf: &mut [u8], timeout: Duration) -> Result<usize, ChannelError> {
        match self.handle.read_bulk(self.in_endpoint, buf, timeout) {
            Ok(n) => Ok(n),
            Err(rusb::Error::Timeout) => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    fn max_packet_size(&self) -> usize {
        self.max_packet_size
    }

    fn device_info(&self) -> &DeviceInfo {
        &self.info
    }
}

impl<T: UsbContext> Drop for UsbBulkChannel<T> {
    fn drop(&mut self) {
        let _ = self.handle.release_interface(self.interface);
    }
}
