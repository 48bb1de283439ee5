//! Session controller.
//!
//! Owns the menu tree, the connection state machine and the view component
//! registry for one device link. Everything is single threaded and
//! cooperative: the embedding application calls [`MenuController::tick`] on
//! a short interval and the controller drains transport events, runs the
//! heartbeat bookkeeping and delivers notifications from there. Handlers
//! never block and transports never call back in.

use std::collections::HashMap;

use menulink_model::{ItemData, MenuItem, MenuTree, ScrollPosition, ROOT_ID};
use menulink_protocol::constants::DEFAULT_HEARTBEAT_MS;
use menulink_protocol::{
    decode_frame, heartbeat_timeout_ms, to_printable, AckStatus, ApiPlatform, BootItem,
    BootPayload, BootstrapMode, ButtonType, ChangeType, ChangeValue, Correlation, DialogMode,
    HeartbeatMode, MenuCommand, TagValCodec,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::transport::{Transport, TransportError, TransportEvent};

// ============================================================================
// Configuration
// ============================================================================

/// Identity and timing configuration for a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Application name announced in join and pairing messages.
    pub app_name: String,
    /// Stable application uuid; devices remember paired uuids.
    pub app_uuid: String,
    /// Heartbeat interval offered until the device negotiates its own.
    pub heartbeat_frequency_ms: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            app_name: "menulink".to_string(),
            app_uuid: "00000000-0000-0000-0000-000000000000".to_string(),
            heartbeat_frequency_ms: DEFAULT_HEARTBEAT_MS,
        }
    }
}

/// Reconnect backoff while pairing; short, the user is watching a dialog.
pub const PAIRING_BACKOFF_MS: u64 = 4_000;
/// Reconnect backoff during normal operation.
pub const NORMAL_BACKOFF_MS: u64 = 8_000;

/// Component tick interval while connected.
const TICK_CONNECTED_MS: u64 = 100;
/// Component tick interval while disconnected.
const TICK_DISCONNECTED_MS: u64 = 1_000;

// ============================================================================
// Controller state
// ============================================================================

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    /// Not started, or explicitly stopped.
    Stopped,
    /// Started, waiting for the transport to connect.
    NotConnected,
    /// Link up, identity sent, waiting for bootstrap.
    Connected,
    /// Boot item stream in progress.
    Bootstrapping,
    /// Tree synchronized; normal operation.
    Ready,
    /// Pairing handshake accepted by the device.
    PairedOk,
    /// Device rejected the identity; terminal until a pairing retry.
    FailedAuthentication,
}

impl ControllerState {
    /// Human readable name, used for pairing progress text.
    pub fn nice_name(self) -> &'static str {
        match self {
            ControllerState::Stopped => "Stopped",
            ControllerState::NotConnected => "Waiting for connection",
            ControllerState::Connected => "Connected",
            ControllerState::Bootstrapping => "Receiving menu items",
            ControllerState::Ready => "Ready",
            ControllerState::PairedOk => "Pairing accepted",
            ControllerState::FailedAuthentication => "Authentication failed",
        }
    }

    fn is_connected_family(self) -> bool {
        matches!(
            self,
            ControllerState::Connected
                | ControllerState::Bootstrapping
                | ControllerState::Ready
                | ControllerState::PairedOk
        )
    }
}

/// Identity announced by the device in its join message.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceInfo {
    /// Device name.
    pub name: String,
    /// Device uuid.
    pub uuid: String,
    /// Device platform.
    pub platform: ApiPlatform,
    /// Version as major*100+minor.
    pub version: u32,
}

/// Last dialog update received from the device.
#[derive(Debug, Clone, PartialEq)]
pub struct DialogInfo {
    /// Whether the dialog is shown or hidden.
    pub mode: DialogMode,
    /// Title text.
    pub header: String,
    /// Body text.
    pub buffer: String,
    /// First button.
    pub button1: ButtonType,
    /// Second button.
    pub button2: ButtonType,
}

// ============================================================================
// View components
// ============================================================================

/// The notifications delivered toward the rendering layer.
///
/// Components own no wire knowledge; correlation matching for pending
/// requests is each component's own responsibility.
pub trait MenuComponent {
    /// The tree was rebuilt or structurally changed.
    fn structure_has_changed(&mut self, tree: &MenuTree);

    /// One item's value or metadata changed.
    fn item_has_updated(&mut self, item: &MenuItem);

    /// Periodic animation/refresh tick.
    fn tick(&mut self, now_ms: u64);

    /// An acknowledgment arrived; ignore correlations you did not mint.
    fn ack_received(&mut self, correlation: Correlation, status: AckStatus);
}

type DialogListener = Box<dyn FnMut(&DialogInfo)>;
type UnhandledHandler = Box<dyn FnMut(&MenuCommand)>;

// ============================================================================
// Controller
// ============================================================================

/// Session controller for one device link.
pub struct MenuController<T: Transport> {
    transport: T,
    config: SessionConfig,
    state: ControllerState,
    tree: MenuTree,
    codec: TagValCodec,
    components: HashMap<String, Box<dyn MenuComponent>>,

    // Correlation minting: random offset plus a monotonic counter, never 0.
    next_correlation: u32,

    pairing_mode: bool,
    heartbeat_frequency: u32,
    last_rx_ms: u64,
    last_tx_ms: u64,
    next_component_tick_ms: u64,

    device: Option<DeviceInfo>,
    dialog: Option<DialogInfo>,
    dialog_listener: Option<DialogListener>,
    unhandled_handler: Option<UnhandledHandler>,
}

impl<T: Transport> MenuController<T> {
    /// Create a controller over a transport. The session is stopped until
    /// [`start`](MenuController::start) is called.
    pub fn new(transport: T, config: SessionConfig) -> Self {
        let heartbeat_frequency = config.heartbeat_frequency_ms;
        MenuController {
            transport,
            config,
            state: ControllerState::Stopped,
            tree: MenuTree::new(),
            codec: TagValCodec::new(),
            components: HashMap::new(),
            next_correlation: rand::thread_rng().gen_range(1..=0xf_ffff),
            pairing_mode: false,
            heartbeat_frequency,
            last_rx_ms: 0,
            last_tx_ms: 0,
            next_component_tick_ms: 0,
            device: None,
            dialog: None,
            dialog_listener: None,
            unhandled_handler: None,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// The menu tree as last synchronized from the device.
    pub fn tree(&self) -> &MenuTree {
        &self.tree
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutable access to the underlying transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Identity of the connected device, once its join has arrived.
    pub fn device(&self) -> Option<&DeviceInfo> {
        self.device.as_ref()
    }

    /// Last dialog update, if a dialog is or was on screen.
    pub fn dialog(&self) -> Option<&DialogInfo> {
        self.dialog.as_ref()
    }

    /// Whether the next connection will send a pairing request instead of
    /// a join.
    pub fn pairing_mode(&self) -> bool {
        self.pairing_mode
    }

    /// Switch between pairing and normal join on the next connection.
    pub fn set_pairing_mode(&mut self, pairing: bool) {
        self.pairing_mode = pairing;
    }

    /// Register a view component for an item id. Last writer wins.
    pub fn register_component(&mut self, item_id: &str, component: Box<dyn MenuComponent>) {
        self.components.insert(item_id.to_string(), component);
    }

    /// Register a callback for dialog show/hide updates.
    pub fn set_dialog_listener(&mut self, listener: DialogListener) {
        self.dialog_listener = Some(listener);
    }

    /// Register a hook for inbound commands the controller does not consume.
    pub fn set_unhandled_handler(&mut self, handler: UnhandledHandler) {
        self.unhandled_handler = Some(handler);
    }

    /// Connected-device description, e.g. `"Tester V1.3 (Arduino)"`.
    pub fn menu_name(&self) -> String {
        match &self.device {
            Some(dev) => format!(
                "{} V{}.{} ({})",
                dev.name,
                dev.version / 100,
                dev.version % 100,
                dev.platform.description()
            ),
            None => "Unknown".to_string(),
        }
    }

    /// Begin a session. Valid from stopped or failed authentication.
    pub fn start(&mut self) -> Result<(), TransportError> {
        if self.state != ControllerState::Stopped
            && self.state != ControllerState::FailedAuthentication
        {
            return Ok(());
        }
        info!(transport = self.transport.name(), "session starting");
        self.state = ControllerState::NotConnected;
        self.transport.start()
    }

    /// End the session. Idempotent.
    pub fn stop(&mut self) {
        if self.state == ControllerState::Stopped {
            return;
        }
        info!(transport = self.transport.name(), "session stopping");
        self.transport.stop();
        self.state = ControllerState::Stopped;
        self.tree.empty_tree();
        self.codec.clear();
        self.components.clear();
        self.device = None;
    }

    /// Drive the session: drain transport events, run heartbeat and
    /// reconnect bookkeeping, then tick the registered components.
    pub fn tick(&mut self, now_ms: u64) {
        if self.state == ControllerState::Stopped {
            return;
        }

        while let Some(event) = self.transport.poll_event() {
            match event {
                TransportEvent::Connected => self.handle_connected(now_ms),
                TransportEvent::Disconnected => self.handle_disconnected(),
                TransportEvent::Data(data) => self.handle_data(&data, now_ms),
            }
        }

        if self.transport.is_connected() {
            let timeout = heartbeat_timeout_ms(self.heartbeat_frequency);
            if now_ms.saturating_sub(self.last_rx_ms) > timeout {
                warn!(silent_ms = now_ms - self.last_rx_ms, "heartbeat timeout, closing link");
                self.force_close();
            } else if now_ms.saturating_sub(self.last_tx_ms) > self.heartbeat_frequency as u64 {
                self.send_command(
                    MenuCommand::Heartbeat {
                        frequency: self.heartbeat_frequency,
                        mode: HeartbeatMode::Normal,
                    },
                    now_ms,
                );
            }
        } else if self.state != ControllerState::FailedAuthentication {
            let backoff = if self.pairing_mode { PAIRING_BACKOFF_MS } else { NORMAL_BACKOFF_MS };
            let due = match self.transport.last_disconnect_time() {
                Some(at) => now_ms.saturating_sub(at) > backoff,
                None => false,
            };
            if due {
                debug!("reconnect backoff elapsed, restarting transport");
                if let Err(err) = self.transport.start() {
                    warn!(%err, "transport restart failed");
                }
            }
        }

        if now_ms >= self.next_component_tick_ms {
            let interval = if self.transport.is_connected() {
                TICK_CONNECTED_MS
            } else {
                TICK_DISCONNECTED_MS
            };
            self.next_component_tick_ms = now_ms + interval;
            for component in self.components.values_mut() {
                component.tick(now_ms);
            }
        }
    }

    // ------------------------------------------------------------------
    // Connection lifecycle
    // ------------------------------------------------------------------

    fn handle_connected(&mut self, now_ms: u64) {
        info!(transport = self.transport.name(), "link up");
        self.state = ControllerState::Connected;
        self.last_rx_ms = now_ms;
        self.last_tx_ms = now_ms;
        self.codec.clear();
        self.tree.empty_tree();

        self.send_command(
            MenuCommand::Heartbeat {
                frequency: self.heartbeat_frequency,
                mode: HeartbeatMode::Start,
            },
            now_ms,
        );
        let identity = if self.pairing_mode {
            MenuCommand::Pairing {
                app_name: self.config.app_name.clone(),
                app_uuid: self.config.app_uuid.clone(),
            }
        } else {
            MenuCommand::Join {
                name: self.config.app_name.clone(),
                uuid: self.config.app_uuid.clone(),
                platform: ApiPlatform::JsApi,
                version: 100,
            }
        };
        self.send_command(identity, now_ms);
        self.notify_structure_changed();
    }

    fn handle_disconnected(&mut self) {
        if !self.state.is_connected_family() {
            return;
        }
        info!(transport = self.transport.name(), "link down");
        self.state = ControllerState::NotConnected;
        self.tree.empty_tree();
        self.codec.clear();
        // Clean-down: only the root registration survives a disconnect.
        self.components.retain(|id, _| id.as_str() == ROOT_ID);
        self.notify_structure_changed();
    }

    fn handle_data(&mut self, data: &[u8], now_ms: u64) {
        self.codec.push(data);
        while let Some(frame) = self.codec.next_frame() {
            self.last_rx_ms = now_ms;
            match decode_frame(&frame) {
                Ok(Some(cmd)) => self.dispatch(cmd),
                Ok(None) => {}
                Err(err) => {
                    // Isolated to this one message; the link stays open.
                    warn!(%err, frame = %to_printable(&frame), "discarding undecodable message");
                }
            }
        }
    }

    fn force_close(&mut self) {
        self.transport.close_connection();
        self.handle_disconnected();
    }

    // ------------------------------------------------------------------
    // Inbound dispatch
    // ------------------------------------------------------------------

    fn dispatch(&mut self, cmd: MenuCommand) {
        match cmd {
            MenuCommand::Heartbeat { frequency, mode } => {
                if frequency != 0 && frequency != self.heartbeat_frequency {
                    debug!(frequency, "device renegotiated heartbeat interval");
                    self.heartbeat_frequency = frequency;
                }
                if mode == HeartbeatMode::End {
                    info!("device announced shutdown");
                    self.force_close();
                }
            }
            MenuCommand::Join { name, uuid, platform, version } => {
                let dev = DeviceInfo { name, uuid, platform, version };
                info!(device = %dev.name, version = dev.version, "device joined");
                self.device = Some(dev);
            }
            MenuCommand::Bootstrap(BootstrapMode::Start) => {
                if self.state == ControllerState::Connected {
                    self.state = ControllerState::Bootstrapping;
                }
            }
            MenuCommand::Bootstrap(BootstrapMode::Stop) => {
                if self.state == ControllerState::Bootstrapping {
                    self.state = ControllerState::Ready;
                    self.notify_structure_changed();
                }
            }
            MenuCommand::BootItem(item) => self.apply_boot_item(item),
            MenuCommand::Ack { status, correlation } => {
                if correlation.is_none() {
                    self.handle_auth_ack(status);
                } else {
                    for component in self.components.values_mut() {
                        component.ack_received(correlation, status);
                    }
                }
            }
            MenuCommand::ItemChange { id, change, value, .. } => {
                self.apply_item_change(&id, change, &value);
            }
            MenuCommand::DialogUpdate { mode, header, buffer, button1, button2, .. } => {
                let info = DialogInfo { mode, header, buffer, button1, button2 };
                if let Some(listener) = self.dialog_listener.as_mut() {
                    listener(&info);
                }
                self.dialog = Some(info);
            }
            other @ MenuCommand::Pairing { .. } => {
                debug!("ignoring inbound pairing request");
                if let Some(handler) = self.unhandled_handler.as_mut() {
                    handler(&other);
                }
            }
        }
    }

    fn handle_auth_ack(&mut self, status: AckStatus) {
        // The zero-correlation ack answers the join/pairing handshake; once
        // past CONNECTED it carries no meaning and is ignored.
        if self.state != ControllerState::Connected {
            return;
        }
        if status.is_failure() {
            warn!(?status, "authentication rejected by device");
            self.state = ControllerState::FailedAuthentication;
            self.transport.close_connection();
        } else if self.pairing_mode {
            info!("pairing accepted");
            self.state = ControllerState::PairedOk;
        }
    }

    // ------------------------------------------------------------------
    // Tree updates
    // ------------------------------------------------------------------

    /// Insert a boot item, or refresh an existing one in place.
    fn apply_boot_item(&mut self, boot: BootItem) {
        if let Some(existing) = self.tree.item_mut(&boot.id) {
            // Refresh in place; submenu children are owned by the tree and
            // must not be reset by a re-delivered boot message.
            if !matches!(boot.payload, BootPayload::SubMenu) {
                existing.data = boot.payload.to_item_data();
            }
            existing.set_name(boot.name);
            existing.set_read_only(boot.read_only);
            existing.set_visible(boot.visible);
            existing.mark_changed();
            self.notify_item_updated(&boot.id);
            return;
        }

        let mut item = MenuItem::new(&boot.id, &boot.name, boot.payload.to_item_data());
        item.read_only = boot.read_only;
        item.visible = boot.visible;
        if !self.tree.add_item(&boot.parent_id, item) {
            warn!(id = %boot.id, "duplicate boot item ignored");
        }
        if self.state != ControllerState::Bootstrapping {
            self.notify_structure_changed();
        }
    }

    fn apply_item_change(&mut self, id: &str, change: ChangeType, value: &ChangeValue) {
        let Some(item) = self.tree.item_mut(id) else {
            debug!(id, "change for unknown item ignored");
            return;
        };
        match (value, &mut item.data) {
            (ChangeValue::List(rows), ItemData::List { values, number_of_items }) => {
                *values = rows.clone();
                *number_of_items = rows.len() as u32;
            }
            (ChangeValue::Text(text), data) => {
                if !apply_text_change(data, change, text) {
                    debug!(id, value = %text, "change did not apply");
                    return;
                }
            }
            (ChangeValue::List(_), _) => {
                debug!(id, "list change for non-list item ignored");
                return;
            }
        }
        item.mark_changed();
        self.notify_item_updated(id);
    }

    fn notify_structure_changed(&mut self) {
        let tree = &self.tree;
        for component in self.components.values_mut() {
            component.structure_has_changed(tree);
        }
    }

    fn notify_item_updated(&mut self, id: &str) {
        let Some(item) = self.tree.item(id) else {
            return;
        };
        if let Some(component) = self.components.get_mut(id) {
            component.item_has_updated(item);
        }
    }

    // ------------------------------------------------------------------
    // Outgoing updates
    // ------------------------------------------------------------------

    fn mint_correlation(&mut self) -> Correlation {
        self.next_correlation = self.next_correlation.wrapping_add(1);
        if self.next_correlation == 0 {
            self.next_correlation = 1;
        }
        Correlation(self.next_correlation)
    }

    /// Encode and send; a send failure is a channel fault and force-closes.
    fn send_command(&mut self, cmd: MenuCommand, now_ms: u64) -> bool {
        let raw = cmd.encode();
        match self.transport.send_message(&raw) {
            Ok(()) => {
                self.last_tx_ms = now_ms;
                true
            }
            Err(err) => {
                warn!(%err, "send failed, closing link");
                self.force_close();
                false
            }
        }
    }

    fn send_change(
        &mut self,
        id: &str,
        change: ChangeType,
        value: ChangeValue,
        now_ms: u64,
    ) -> Option<Correlation> {
        let correlation = self.mint_correlation();
        let cmd = MenuCommand::ItemChange {
            id: id.to_string(),
            change,
            value,
            correlation,
        };
        self.send_command(cmd, now_ms).then_some(correlation)
    }

    /// Send an absolute value replacement for any editable scalar item.
    ///
    /// The value must already be in wire form, normally produced by
    /// `menulink_model::wire_from_user`. Returns the minted correlation, or
    /// `None` if the item is unknown, not editable, or the send failed.
    pub fn send_absolute_update(
        &mut self,
        id: &str,
        wire_value: &str,
        now_ms: u64,
    ) -> Option<Correlation> {
        let item = self.tree.item(id)?;
        if matches!(
            item.data,
            ItemData::SubMenu { .. } | ItemData::Action | ItemData::List { .. }
        ) {
            return None;
        }
        self.send_change(id, ChangeType::Absolute, ChangeValue::Text(wire_value.to_string()), now_ms)
    }

    /// Send a signed delta for a numeric item (analog, enum or scroll
    /// choice). Returns `None` for any other kind.
    ///
    /// Scroll choices have no device-side delta: the local position is
    /// advanced by the amount and resubmitted as an absolute update.
    pub fn send_delta_update(&mut self, id: &str, amount: i64, now_ms: u64) -> Option<Correlation> {
        let item = self.tree.item_mut(id)?;
        let (change, value) = match &mut item.data {
            ItemData::ScrollChoice { value, .. } => {
                value.position += amount as i32;
                (ChangeType::Absolute, value.to_wire())
            }
            ItemData::Analog { .. } | ItemData::Enum { .. } => {
                (ChangeType::Delta, amount.to_string())
            }
            _ => return None,
        };
        self.send_change(id, change, ChangeValue::Text(value), now_ms)
    }

    /// Trigger an action item.
    pub fn send_actionable_update(&mut self, id: &str, now_ms: u64) -> Option<Correlation> {
        let item = self.tree.item(id)?;
        if !matches!(item.data, ItemData::Action | ItemData::SubMenu { .. }) {
            return None;
        }
        self.send_change(id, ChangeType::Absolute, ChangeValue::Text("1".to_string()), now_ms)
    }

    /// Report a row selection on a list item.
    pub fn send_list_response_update(
        &mut self,
        id: &str,
        row: u32,
        double_click: bool,
        now_ms: u64,
    ) -> Option<Correlation> {
        let item = self.tree.item(id)?;
        if !matches!(item.data, ItemData::List { .. }) {
            return None;
        }
        let value = format!("{}:{}", row, if double_click { 1 } else { 0 });
        self.send_change(id, ChangeType::ListSelection, ChangeValue::Text(value), now_ms)
    }

    /// Answer an on-device dialog with a button press.
    pub fn send_dialog_action(&mut self, button: ButtonType, now_ms: u64) -> Option<Correlation> {
        let correlation = self.mint_correlation();
        let cmd = MenuCommand::DialogUpdate {
            mode: DialogMode::Action,
            header: String::new(),
            buffer: String::new(),
            button1: button,
            button2: ButtonType::None,
            correlation,
        };
        self.send_command(cmd, now_ms).then_some(correlation)
    }
}

/// Apply a scalar change to item data. Returns false when the value does
/// not fit the item kind.
fn apply_text_change(data: &mut ItemData, change: ChangeType, text: &str) -> bool {
    let delta = change == ChangeType::Delta;
    match data {
        ItemData::Analog { value, .. } => {
            let Ok(n) = text.trim().parse::<i64>() else {
                return false;
            };
            *value = if delta { *value + n } else { n };
            true
        }
        ItemData::Enum { value, .. } => {
            let Ok(n) = text.trim().parse::<i64>() else {
                return false;
            };
            *value = if delta { *value + n } else { n };
            true
        }
        ItemData::Boolean { value, .. } => {
            *value = text == "1" || text.eq_ignore_ascii_case("true");
            true
        }
        ItemData::Float { value, .. } | ItemData::LargeNumber { value, .. } => {
            let Ok(n) = text.trim().parse::<f64>() else {
                return false;
            };
            *value = n;
            true
        }
        ItemData::Text { value, .. } | ItemData::Rgb { value, .. } => {
            *value = text.to_string();
            true
        }
        ItemData::ScrollChoice { value, .. } => {
            *value = ScrollPosition::from_wire(text);
            true
        }
        ItemData::SubMenu { .. } | ItemData::Action | ItemData::List { .. } => false,
    }
}
