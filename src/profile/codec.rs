//! Fixed binary layout for stored curves.
//!
//! Wire format (all integers big-endian):
//! ```text
//! ┌─────────┬────────────┬──────────────────────────────────────┐
//! │ Ver (1B)│ Count (4B) │ Count × [ time (4B) temp (4B) fan (4B) ] │
//! └─────────┴────────────┴──────────────────────────────────────┘
//! ```
//!
//! The count is the only integrity check: a blob whose count is 0 or above
//! [`MAX_SETPOINTS`] is rejected and the target curve is left untouched.
//! There is no checksum.

use heapless::Vec;
use log::{debug, warn};

use super::{MAX_SETPOINTS, ProfileCurve, Setpoint};

/// Version tag written into byte 0.
pub const FORMAT_VERSION: u8 = 1;

/// Version byte plus the setpoint count.
pub const HEADER_LEN: usize = 5;

/// Bytes per encoded setpoint.
pub const SETPOINT_LEN: usize = 12;

/// Largest possible encoded curve.
pub const MAX_ENCODED_LEN: usize = HEADER_LEN + MAX_SETPOINTS * SETPOINT_LEN;

/// Encoded curve bytes.
pub type EncodedCurve = Vec<u8, MAX_ENCODED_LEN>;

/// Why a blob was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeError {
    /// Shorter than the header or than the count claims.
    Truncated,
    /// Count is 0 or above capacity.
    BadCount(u32),
}

impl ProfileCurve {
    /// Encode into the fixed binary layout.
    pub fn serialize(&self) -> EncodedCurve {
        let mut out = EncodedCurve::new();
        let count = self.setpoints.len().min(MAX_SETPOINTS);

        // Capacity is sized for the worst case, pushes cannot fail.
        let _ = out.push(self.version);
        let _ = out.extend_from_slice(&(count as u32).to_be_bytes());
        for sp in &self.setpoints[..count] {
            let _ = out.extend_from_slice(&sp.time_ms.to_be_bytes());
            let _ = out.extend_from_slice(&sp.temperature.to_be_bytes());
            let _ = out.extend_from_slice(&sp.fan_speed.to_be_bytes());
        }
        out
    }

    /// Replace this curve's setpoints with the ones encoded in `buf`.
    ///
    /// A rejected blob leaves the curve exactly as it was; compare
    /// [`setpoint_count`](Self::setpoint_count) before and after if the
    /// caller needs to know. The start origin is never touched.
    pub fn deserialize(&mut self, buf: &[u8]) {
        match decode(buf) {
            Ok((version, setpoints)) => {
                if version != FORMAT_VERSION {
                    debug!("profile codec: decoding unknown format version {}", version);
                }
                self.version = version;
                self.setpoints = setpoints;
            }
            Err(e) => warn!("profile codec: blob rejected ({:?}), curve unchanged", e),
        }
    }
}

fn decode(buf: &[u8]) -> Result<(u8, Vec<Setpoint, MAX_SETPOINTS>), DecodeError> {
    if buf.len() < HEADER_LEN {
        return Err(DecodeError::Truncated);
    }
    let version = buf[0];
    let count = read_u32(&buf[1..HEADER_LEN]);
    if count == 0 || count as usize > MAX_SETPOINTS {
        return Err(DecodeError::BadCount(count));
    }
    let body = &buf[HEADER_LEN..];
    if body.len() < count as usize * SETPOINT_LEN {
        return Err(DecodeError::Truncated);
    }

    let mut setpoints = Vec::new();
    for chunk in body.chunks_exact(SETPOINT_LEN).take(count as usize) {
        let sp = Setpoint::new(
            read_u32(&chunk[0..4]),
            read_u32(&chunk[4..8]),
            read_u32(&chunk[8..12]),
        );
        let _ = setpoints.push(sp);
    }
    Ok((version, setpoints))
}

fn read_u32(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}
