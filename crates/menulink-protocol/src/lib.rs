//! TagVal wire protocol for remote menu devices.
//!
//! The protocol frames short `key=value|` messages between control markers,
//! identified by a two character type code. This crate covers the byte-level
//! codec ([`TagValCodec`], [`FieldMap`], [`MessageWriter`]) and the typed
//! command layer ([`MenuCommand`]) on top of it. Session behavior lives in
//! `menulink-session`.

pub mod codec;
pub mod commands;
pub mod constants;
pub mod error;

pub use codec::{parse_frame, to_printable, FieldMap, MessageWriter, TagValCodec};
pub use commands::{
    AckStatus, ApiPlatform, BootItem, BootPayload, BootstrapMode, ButtonType, ChangeType,
    ChangeValue, Correlation, DialogMode, HeartbeatMode, MenuCommand,
};
pub use error::ProtocolError;

use crate::constants::DEFAULT_HEARTBEAT_MS;

/// Decode one extracted frame straight into a command.
///
/// Combines [`parse_frame`] and [`MenuCommand::decode`]; unknown type codes
/// yield `Ok(None)`.
pub fn decode_frame(frame: &str) -> Result<Option<MenuCommand>, ProtocolError> {
    let (type_code, fields) = parse_frame(frame)?;
    MenuCommand::decode(type_code, &fields)
}

/// Milliseconds of silence after which a peer is considered lost, for a
/// negotiated heartbeat interval.
pub fn heartbeat_timeout_ms(frequency: u32) -> u64 {
    let freq = if frequency == 0 { DEFAULT_HEARTBEAT_MS } else { frequency };
    freq as u64 * 3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_frame_convenience() {
        let cmd = decode_frame("BSBT=STOP|").unwrap();
        assert_eq!(cmd, Some(MenuCommand::Bootstrap(BootstrapMode::Stop)));
    }

    #[test]
    fn heartbeat_timeout_is_three_intervals() {
        assert_eq!(heartbeat_timeout_ms(1500), 4500);
        assert_eq!(heartbeat_timeout_ms(0), 4500);
    }
}
