//! End to end session tests over a scripted in-memory transport.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use menulink_model::{ItemData, MenuTree, ROOT_ID};
use menulink_protocol::{AckStatus, Correlation, MessageWriter};
use menulink_session::{
    ControllerState, MenuComponent, MenuController, PairingAttempt, SessionConfig, Transport,
    TransportError, TransportEvent,
};

// ============================================================================
// Scripted transport
// ============================================================================

#[derive(Default)]
struct MockTransport {
    events: VecDeque<TransportEvent>,
    sent: Vec<String>,
    started: bool,
    connected: bool,
    last_disconnect: Option<u64>,
    start_count: u32,
}

impl MockTransport {
    fn new() -> Self {
        MockTransport::default()
    }

    /// Queue one device-to-client frame as received data.
    fn receive(&mut self, frame: String) {
        self.receive_raw(frame.into_bytes());
    }

    fn receive_raw(&mut self, bytes: Vec<u8>) {
        self.events.push_back(TransportEvent::Data(bytes));
    }

    fn sent_type_codes(&self) -> Vec<String> {
        // Skip the two marker bytes; the next two chars are the type code.
        self.sent.iter().map(|raw| raw.chars().skip(2).take(2).collect()).collect()
    }
}

impl Transport for MockTransport {
    fn start(&mut self) -> Result<(), TransportError> {
        self.started = true;
        self.start_count += 1;
        if !self.connected {
            self.connected = true;
            self.events.push_back(TransportEvent::Connected);
        }
        Ok(())
    }

    fn stop(&mut self) {
        self.started = false;
        self.connected = false;
    }

    fn close_connection(&mut self) {
        if self.connected {
            self.connected = false;
            self.events.push_back(TransportEvent::Disconnected);
            self.last_disconnect = Some(0);
        }
    }

    fn send_message(&mut self, raw: &str) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        self.sent.push(raw.to_string());
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn last_disconnect_time(&self) -> Option<u64> {
        self.last_disconnect
    }

    fn poll_event(&mut self) -> Option<TransportEvent> {
        self.events.pop_front()
    }

    fn name(&self) -> &str {
        "mock"
    }
}

// ============================================================================
// Recording component
// ============================================================================

#[derive(Default)]
struct Recorded {
    structure_changes: u32,
    item_updates: Vec<String>,
    acks: Vec<(Correlation, AckStatus)>,
    ticks: u32,
}

struct RecordingComponent {
    log: Rc<RefCell<Recorded>>,
}

impl MenuComponent for RecordingComponent {
    fn structure_has_changed(&mut self, _tree: &MenuTree) {
        self.log.borrow_mut().structure_changes += 1;
    }

    fn item_has_updated(&mut self, item: &menulink_model::MenuItem) {
        self.log.borrow_mut().item_updates.push(item.id.clone());
    }

    fn tick(&mut self, _now_ms: u64) {
        self.log.borrow_mut().ticks += 1;
    }

    fn ack_received(&mut self, correlation: Correlation, status: AckStatus) {
        self.log.borrow_mut().acks.push((correlation, status));
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn controller() -> MenuController<MockTransport> {
    let config = SessionConfig {
        app_name: "test app".to_string(),
        app_uuid: "aaaa-bbbb".to_string(),
        heartbeat_frequency_ms: 1500,
    };
    MenuController::new(MockTransport::new(), config)
}

fn attach_recorder(
    controller: &mut MenuController<MockTransport>,
    item_id: &str,
) -> Rc<RefCell<Recorded>> {
    let log = Rc::new(RefCell::new(Recorded::default()));
    controller.register_component(item_id, Box::new(RecordingComponent { log: log.clone() }));
    log
}

fn bootstrap_start() -> String {
    MessageWriter::new("BS").field("BT", "START").finish()
}

fn bootstrap_stop() -> String {
    MessageWriter::new("BS").field("BT", "STOP").finish()
}

fn analog_boot(id: &str, name: &str, value: i64) -> String {
    MessageWriter::new("BA")
        .field("PI", "0")
        .field("ID", id)
        .field("NM", name)
        .field("RO", "0")
        .field("VI", "1")
        .field("AM", "255")
        .field("AO", "0")
        .field("AD", "1")
        .field("AU", "V")
        .field_i64("VC", value)
        .finish()
}

fn scroll_boot(id: &str, name: &str, position: i32) -> String {
    MessageWriter::new("BZ")
        .field("PI", "0")
        .field("ID", id)
        .field("NM", name)
        .field("RO", "0")
        .field("VI", "1")
        .field("NC", "10")
        .field("VC", &format!("{position}:Row"))
        .finish()
}

fn ack(status: i64, correlation: &str) -> String {
    MessageWriter::new("AK")
        .field_i64("ST", status)
        .field("CO", correlation)
        .finish()
}

/// Start a session and run the connect handshake plus a full bootstrap.
fn connect_and_bootstrap(ctrl: &mut MenuController<MockTransport>) {
    ctrl.start().unwrap();
    ctrl.tick(0);
    assert_eq!(ctrl.state(), ControllerState::Connected);

    ctrl.transport_mut().receive(bootstrap_start());
    ctrl.transport_mut().receive(analog_boot("11", "Voltage", 120));
    ctrl.transport_mut().receive(analog_boot("12", "Current", 5));
    ctrl.transport_mut().receive(bootstrap_stop());
    ctrl.tick(10);
    assert_eq!(ctrl.state(), ControllerState::Ready);
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn connect_sends_heartbeat_then_join() {
    let mut ctrl = controller();
    ctrl.start().unwrap();
    ctrl.tick(0);

    assert_eq!(ctrl.state(), ControllerState::Connected);
    let codes = ctrl.transport().sent_type_codes();
    assert_eq!(codes, vec!["HB", "NJ"]);
}

#[test]
fn bootstrap_builds_tree_with_one_notification() {
    let mut ctrl = controller();
    let log = attach_recorder(&mut ctrl, ROOT_ID);

    ctrl.start().unwrap();
    ctrl.tick(0);
    let after_connect = log.borrow().structure_changes;

    ctrl.transport_mut().receive(bootstrap_start());
    ctrl.transport_mut().receive(analog_boot("11", "Voltage", 120));
    ctrl.transport_mut().receive(analog_boot("12", "Current", 5));
    ctrl.tick(5);
    // No structural notifications while bootstrap is in progress.
    assert_eq!(log.borrow().structure_changes, after_connect);
    assert_eq!(ctrl.state(), ControllerState::Bootstrapping);

    ctrl.transport_mut().receive(bootstrap_stop());
    ctrl.tick(10);
    assert_eq!(ctrl.state(), ControllerState::Ready);
    assert_eq!(log.borrow().structure_changes, after_connect + 1);

    assert_eq!(ctrl.tree().children_of(ROOT_ID), ["11", "12"]);
    let item = ctrl.tree().item("11").unwrap();
    assert_eq!(item.name, "Voltage");
    assert!(matches!(item.data, ItemData::Analog { value: 120, .. }));
}

#[test]
fn redelivered_boot_item_updates_in_place() {
    let mut ctrl = controller();
    connect_and_bootstrap(&mut ctrl);

    ctrl.transport_mut().receive(analog_boot("11", "Voltage", 200));
    ctrl.tick(20);
    let item = ctrl.tree().item("11").unwrap();
    assert!(matches!(item.data, ItemData::Analog { value: 200, .. }));
    // Structure unchanged, no duplicate child.
    assert_eq!(ctrl.tree().children_of(ROOT_ID), ["11", "12"]);
}

#[test]
fn inbound_item_change_notifies_registered_component() {
    let mut ctrl = controller();
    connect_and_bootstrap(&mut ctrl);
    let log = attach_recorder(&mut ctrl, "11");

    let change = MessageWriter::new("VC")
        .field("TC", "1")
        .field("ID", "11")
        .field("VC", "42")
        .finish();
    ctrl.transport_mut().receive(change);
    ctrl.tick(20);

    let item = ctrl.tree().item("11").unwrap();
    assert!(matches!(item.data, ItemData::Analog { value: 42, .. }));
    assert_eq!(log.borrow().item_updates, ["11"]);
}

#[test]
fn heartbeat_sent_when_transmit_idle() {
    let mut ctrl = controller();
    connect_and_bootstrap(&mut ctrl);

    let before = ctrl.transport().sent.len();
    // Keep receive fresh so only the transmit side is idle.
    ctrl.transport_mut().receive(MessageWriter::new("HB").field("HB", "0").finish());
    ctrl.tick(1600);
    let codes = ctrl.transport().sent_type_codes();
    assert_eq!(codes.len(), before + 1);
    assert_eq!(codes.last().map(String::as_str), Some("HB"));
}

#[test]
fn silent_link_is_force_closed_after_three_intervals() {
    let mut ctrl = controller();
    connect_and_bootstrap(&mut ctrl);
    assert!(ctrl.transport().is_connected());

    // 1500ms interval, so 4500ms of silence is the limit.
    ctrl.tick(4400);
    assert!(ctrl.transport().is_connected());

    ctrl.tick(4600);
    assert!(!ctrl.transport().is_connected());
    assert_eq!(ctrl.state(), ControllerState::NotConnected);
}

#[test]
fn disconnect_keeps_only_root_registration() {
    let mut ctrl = controller();
    connect_and_bootstrap(&mut ctrl);
    let root_log = attach_recorder(&mut ctrl, ROOT_ID);
    let item_log = attach_recorder(&mut ctrl, "11");

    ctrl.tick(4600); // heartbeat timeout forces the close
    assert_eq!(ctrl.state(), ControllerState::NotConnected);
    assert!(ctrl.tree().item("11").is_none());
    assert_eq!(root_log.borrow().structure_changes, 1);

    // The non-root component was discarded and sees nothing further.
    let change = MessageWriter::new("VC")
        .field("TC", "1")
        .field("ID", "11")
        .field("VC", "1")
        .finish();
    ctrl.transport_mut().receive(change);
    ctrl.tick(4700);
    assert!(item_log.borrow().item_updates.is_empty());
}

#[test]
fn updates_mint_distinct_correlations_and_acks_fan_out() {
    let mut ctrl = controller();
    connect_and_bootstrap(&mut ctrl);
    let log = attach_recorder(&mut ctrl, "11");

    let c1 = ctrl.send_absolute_update("11", "50", 20).unwrap();
    let c2 = ctrl.send_absolute_update("12", "3", 21).unwrap();
    assert_ne!(c1, c2);
    assert!(!c1.is_none());

    ctrl.transport_mut().receive(ack(0, &c1.to_wire()));
    ctrl.tick(30);
    assert_eq!(log.borrow().acks, [(c1, AckStatus::Success)]);
}

#[test]
fn kind_mismatch_sends_nothing() {
    let mut ctrl = controller();
    connect_and_bootstrap(&mut ctrl);

    let before = ctrl.transport().sent.len();
    // Analog items take absolute and delta updates, not list responses.
    assert_eq!(ctrl.send_list_response_update("11", 0, false, 20), None);
    assert_eq!(ctrl.send_actionable_update("11", 20), None);
    assert_eq!(ctrl.send_absolute_update("no-such-item", "1", 20), None);
    assert_eq!(ctrl.transport().sent.len(), before);
}

#[test]
fn scroll_delta_advances_position_and_sends_absolute() {
    let mut ctrl = controller();
    ctrl.start().unwrap();
    ctrl.tick(0);
    ctrl.transport_mut().receive(bootstrap_start());
    ctrl.transport_mut().receive(scroll_boot("8", "Food", 3));
    ctrl.transport_mut().receive(bootstrap_stop());
    ctrl.tick(10);

    ctrl.send_delta_update("8", 1, 20).unwrap();
    let raw = ctrl.transport().sent.last().unwrap();
    assert!(raw.contains("TC=1"), "scroll delta must go out as an absolute change: {raw}");
    assert!(raw.contains("VC=4-"), "position 3 plus 1 resubmits as 4-: {raw}");

    let item = ctrl.tree().item("8").unwrap();
    assert!(matches!(&item.data, ItemData::ScrollChoice { value, .. } if value.position == 4));
}

#[test]
fn zero_correlation_ack_is_ignored_once_ready() {
    let mut ctrl = controller();
    connect_and_bootstrap(&mut ctrl);

    ctrl.transport_mut().receive(ack(1, "0"));
    ctrl.tick(20);
    assert_eq!(ctrl.state(), ControllerState::Ready);
    assert!(ctrl.transport().is_connected());
}

#[test]
fn auth_failure_ack_is_terminal() {
    let mut ctrl = controller();
    ctrl.start().unwrap();
    ctrl.tick(0);

    ctrl.transport_mut().receive(ack(1, "0"));
    ctrl.tick(5);
    assert_eq!(ctrl.state(), ControllerState::FailedAuthentication);
    assert!(!ctrl.transport().is_connected());

    // No reconnect attempts while authentication has failed.
    let starts = ctrl.transport().start_count;
    ctrl.tick(60_000);
    assert_eq!(ctrl.transport().start_count, starts);
}

#[test]
fn pairing_succeeds_on_zero_correlation_ack() {
    let mut ctrl = controller();
    let mut reports = Vec::new();
    let mut attempt = PairingAttempt::begin(&mut ctrl, 0).unwrap();

    assert_eq!(attempt.advance(&mut ctrl, 0, &mut |s| reports.push(s.to_string())), None);
    let codes = ctrl.transport().sent_type_codes();
    assert_eq!(codes, vec!["HB", "PR"]);

    ctrl.transport_mut().receive(ack(0, "0"));
    let outcome = attempt.advance(&mut ctrl, 500, &mut |s| reports.push(s.to_string()));
    assert_eq!(outcome, Some(true));
    assert!(!ctrl.pairing_mode());
    assert_eq!(ctrl.state(), ControllerState::Stopped);
    assert!(!reports.is_empty());
}

#[test]
fn pairing_rejection_resolves_false() {
    let mut ctrl = controller();
    let mut attempt = PairingAttempt::begin(&mut ctrl, 0).unwrap();
    attempt.advance(&mut ctrl, 0, &mut |_| {});

    ctrl.transport_mut().receive(ack(2, "0"));
    let outcome = attempt.advance(&mut ctrl, 500, &mut |_| {});
    assert_eq!(outcome, Some(false));
    assert!(!ctrl.pairing_mode());
}

#[test]
fn pairing_times_out_and_clears_mode() {
    let mut ctrl = controller();
    let mut attempt = PairingAttempt::begin(&mut ctrl, 0).unwrap();
    attempt.advance(&mut ctrl, 0, &mut |_| {});

    let outcome = attempt.advance(&mut ctrl, 60_000, &mut |_| {});
    assert_eq!(outcome, Some(false));
    assert!(!ctrl.pairing_mode());
    assert_eq!(ctrl.state(), ControllerState::Stopped);
}

#[test]
fn device_join_feeds_menu_name() {
    let mut ctrl = controller();
    ctrl.start().unwrap();
    ctrl.tick(0);

    let join = MessageWriter::new("NJ")
        .field("NM", "Tester")
        .field("UU", "dead-beef")
        .field("VE", "103")
        .field("PF", "0")
        .finish();
    ctrl.transport_mut().receive(join);
    ctrl.tick(5);
    assert_eq!(ctrl.menu_name(), "Tester V1.3 (Arduino)");
}

#[test]
fn dialog_updates_reach_the_listener() {
    let mut ctrl = controller();
    let shown = Rc::new(RefCell::new(Vec::new()));
    let sink = shown.clone();
    ctrl.set_dialog_listener(Box::new(move |dialog| {
        sink.borrow_mut().push(dialog.header.clone());
    }));
    connect_and_bootstrap(&mut ctrl);

    let dialog = MessageWriter::new("DM")
        .field("MO", "S")
        .field("HD", "Reset device?")
        .field("BU", "All settings will be lost")
        .field("B1", "0")
        .field("B2", "2")
        .finish();
    ctrl.transport_mut().receive(dialog);
    ctrl.tick(20);

    assert_eq!(*shown.borrow(), ["Reset device?"]);
    assert!(ctrl.dialog().is_some());
}

#[test]
fn garbled_frame_bytes_leave_link_open() {
    let mut ctrl = controller();
    connect_and_bootstrap(&mut ctrl);

    // A non-text byte where the type code belongs.
    ctrl.transport_mut().receive_raw(vec![0x01, 0x01, 0xff, b'A', 0x02]);
    ctrl.tick(20);
    assert!(ctrl.transport().is_connected());
    assert_eq!(ctrl.state(), ControllerState::Ready);
}

#[test]
fn undecodable_message_leaves_link_open() {
    let mut ctrl = controller();
    connect_and_bootstrap(&mut ctrl);

    // Heartbeat missing its required mode field.
    ctrl.transport_mut().receive(MessageWriter::new("HB").field("HF", "1500").finish());
    ctrl.tick(20);
    assert!(ctrl.transport().is_connected());
    assert_eq!(ctrl.state(), ControllerState::Ready);
}
