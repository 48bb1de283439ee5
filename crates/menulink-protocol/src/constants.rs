//! Protocol constants
//!
//! These constants define the framing bytes, message type codes and field
//! keys used by the TagVal encoding. Message type codes and field keys are
//! separate namespaces; both are two characters on the wire.

// ============================================================================
// Framing
// ============================================================================

/// Protocol identifier carried after the start marker.
pub const PROTOCOL_TAG_VAL: u8 = 0x01;
/// Byte marking the start of a framed message.
pub const TAG_START_OF_MSG: u8 = 0x01;
/// Byte marking the end of a framed message.
pub const TAG_END_OF_MSG: u8 = 0x02;
/// Separates a field key from its value.
pub const TAG_KEY_SEPARATOR: char = '=';
/// Terminates each field value.
pub const TAG_FIELD_TERMINATOR: char = '|';
/// Escape prefix; the following character is taken literally.
pub const TAG_ESCAPE: char = '\\';

/// Shortest decodable message: the two-character type code plus one byte.
pub const MIN_MESSAGE_LEN: usize = 3;

/// Heartbeat frequency assumed when the device does not negotiate one.
pub const DEFAULT_HEARTBEAT_MS: u32 = 1500;

// ============================================================================
// Message type codes
// ============================================================================

/// Join announcement, sent by both sides after connecting.
pub const MSG_JOIN: &str = "NJ";
/// Periodic liveness message.
pub const MSG_HEARTBEAT: &str = "HB";
/// Bootstrap start/stop bracket around the boot item stream.
pub const MSG_BOOTSTRAP: &str = "BS";
/// Acknowledgment of a request, matched by correlation id.
pub const MSG_ACKNOWLEDGEMENT: &str = "AK";
/// Pairing request carrying the client identity.
pub const MSG_PAIRING_REQUEST: &str = "PR";
/// Dialog show/hide/action update.
pub const MSG_DIALOG_UPDATE: &str = "DM";
/// Value change, in either direction.
pub const MSG_CHANGE_FIELD: &str = "VC";
/// Boot item: submenu.
pub const MSG_BOOT_SUBMENU: &str = "BM";
/// Boot item: analog value.
pub const MSG_BOOT_ANALOG: &str = "BA";
/// Boot item: boolean value.
pub const MSG_BOOT_BOOLEAN: &str = "BB";
/// Boot item: floating point value.
pub const MSG_BOOT_FLOAT: &str = "BF";
/// Boot item: enumeration.
pub const MSG_BOOT_ENUM: &str = "BE";
/// Boot item: action trigger.
pub const MSG_BOOT_ACTION: &str = "BC";
/// Boot item: RGB colour.
pub const MSG_BOOT_RGB: &str = "BK";
/// Boot item: scroll choice.
pub const MSG_BOOT_SCROLL_CHOICE: &str = "BZ";
/// Boot item: editable text.
pub const MSG_BOOT_TEXT: &str = "BT";
/// Boot item: editable large number.
pub const MSG_BOOT_LARGE_NUMBER: &str = "BN";
/// Boot item: runtime list.
pub const MSG_BOOT_LIST: &str = "BL";

// ============================================================================
// Field keys
// ============================================================================

/// Item id.
pub const KEY_ID: &str = "ID";
/// Display name / app name.
pub const KEY_NAME: &str = "NM";
/// Current value.
pub const KEY_CURRENT_VALUE: &str = "VC";
/// Visible flag (0/1).
pub const KEY_VISIBLE: &str = "VI";
/// Read-only flag (0/1).
pub const KEY_READ_ONLY: &str = "RO";
/// Parent submenu id in boot items.
pub const KEY_PARENT_ID: &str = "PI";
/// Client or device uuid.
pub const KEY_UUID: &str = "UU";
/// Version, encoded as major*100+minor.
pub const KEY_VERSION: &str = "VE";
/// API platform code.
pub const KEY_PLATFORM: &str = "PF";
/// Heartbeat mode.
pub const KEY_HEARTBEAT_MODE: &str = "HB";
/// Heartbeat frequency in milliseconds.
pub const KEY_HEARTBEAT_FREQ: &str = "HF";
/// Correlation id, lowercase hex; 0 means no acknowledgment expected.
pub const KEY_CORRELATION: &str = "CO";
/// Bootstrap bracket type, `START` or `STOP`.
pub const KEY_BOOT_TYPE: &str = "BT";
/// Acknowledgment status code.
pub const KEY_ACK_STATUS: &str = "ST";
/// Dialog mode, `S`/`H`/`A`.
pub const KEY_MODE: &str = "MO";
/// Dialog header text.
pub const KEY_HEADER: &str = "HD";
/// Dialog body text.
pub const KEY_BUFFER: &str = "BU";
/// Dialog button 1 type code.
pub const KEY_BUTTON1: &str = "B1";
/// Dialog button 2 type code.
pub const KEY_BUTTON2: &str = "B2";
/// Change type code on a value change.
pub const KEY_CHANGE_TYPE: &str = "TC";
/// Analog maximum wire value.
pub const KEY_ANALOG_MAX: &str = "AM";
/// Analog display offset.
pub const KEY_ANALOG_OFFSET: &str = "AO";
/// Analog display divisor.
pub const KEY_ANALOG_DIVISOR: &str = "AD";
/// Analog unit suffix.
pub const KEY_ANALOG_UNIT: &str = "AU";
/// Boolean naming style code.
pub const KEY_BOOLEAN_NAMING: &str = "BN";
/// Number of choices / list rows / scroll entries.
pub const KEY_NO_OF_CHOICES: &str = "NC";
/// Decimal places for float and large number items.
pub const KEY_DECIMAL_PLACES: &str = "FD";
/// Maximum text length, or digits allowed for large numbers.
pub const KEY_MAX_LENGTH: &str = "ML";
/// Text edit mode code.
pub const KEY_EDIT_MODE: &str = "EM";
/// Negative-allowed flag for large numbers.
pub const KEY_NEGATIVE_ALLOWED: &str = "NA";
/// Alpha channel flag for RGB items.
pub const KEY_ALPHA: &str = "RA";

/// Choice values are keyed `CA`, `CB`, ... in device order.
pub const PREFIX_CHOICE: char = 'C';
/// Choice names are keyed `cA`, `cB`, ... alongside the values.
pub const PREFIX_CHOICE_NAME: char = 'c';

/// Key for the nth choice value.
pub fn choice_key(index: usize) -> String {
    format!("{}{}", PREFIX_CHOICE, letter_for(index))
}

/// Key for the nth choice name.
pub fn choice_name_key(index: usize) -> String {
    format!("{}{}", PREFIX_CHOICE_NAME, letter_for(index))
}

fn letter_for(index: usize) -> char {
    char::from(b'A' + (index as u8 % 26))
}
