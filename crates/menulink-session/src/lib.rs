//! Connection lifecycle and menu state management.
//!
//! This crate drives one link to a remote menu device: the
//! [`MenuController`] owns the synchronized menu tree and the connection
//! state machine, the [`Transport`] trait abstracts the link itself, and
//! [`PairingAttempt`] runs the one-off authentication handshake a device
//! requires before it accepts a new client identity.
//!
//! The whole crate is single threaded and tick driven; embed it by calling
//! [`MenuController::tick`] on a short interval from your own event loop.

pub mod controller;
pub mod pairing;
pub mod transport;

pub use controller::{
    ControllerState, DeviceInfo, DialogInfo, MenuComponent, MenuController, SessionConfig,
};
pub use pairing::PairingAttempt;
pub use transport::{Transport, TransportError, TransportEvent};
