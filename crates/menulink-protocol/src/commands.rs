//! The typed command catalogue.
//!
//! Every message the protocol can carry decodes into one [`MenuCommand`]
//! variant; unknown type codes decode to `None` and are never an error.
//! Encoding covers the client-to-device kinds only — encoding an
//! inbound-only kind is a programming error and panics.

use menulink_model::{BooleanNaming, ItemData, ScrollPosition, TextEditMode};

use crate::codec::{FieldMap, MessageWriter};
use crate::constants::*;
use crate::error::ProtocolError;

// ============================================================================
// Small wire enums
// ============================================================================

/// Mode carried on a heartbeat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatMode {
    /// Routine liveness tick.
    Normal,
    /// First message after connecting.
    Start,
    /// Orderly shutdown notification.
    End,
}

impl HeartbeatMode {
    /// Decode from the wire code (unknown codes are treated as normal).
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => HeartbeatMode::Start,
            2 => HeartbeatMode::End,
            _ => HeartbeatMode::Normal,
        }
    }

    /// The wire code for this mode.
    pub fn code(self) -> i64 {
        match self {
            HeartbeatMode::Normal => 0,
            HeartbeatMode::Start => 1,
            HeartbeatMode::End => 2,
        }
    }
}

/// Whether a bootstrap message opens or closes the boot item stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapMode {
    /// Tree synchronization begins; boot items follow.
    Start,
    /// Tree synchronization complete.
    Stop,
}

/// Status of an acknowledgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckStatus {
    /// Succeeded with a caveat.
    Warning,
    /// Request accepted.
    Success,
    /// Value outside the accepted range.
    ValueRange,
    /// Item id not found.
    IdNotFound,
    /// Value rejected.
    InvalidValue,
    /// Any other device-reported code.
    Unknown(i64),
}

impl AckStatus {
    /// Decode from the wire code.
    pub fn from_code(code: i64) -> Self {
        match code {
            -1 => AckStatus::Warning,
            0 => AckStatus::Success,
            1 => AckStatus::ValueRange,
            2 => AckStatus::IdNotFound,
            3 => AckStatus::InvalidValue,
            other => AckStatus::Unknown(other),
        }
    }

    /// The wire code for this status.
    pub fn code(self) -> i64 {
        match self {
            AckStatus::Warning => -1,
            AckStatus::Success => 0,
            AckStatus::ValueRange => 1,
            AckStatus::IdNotFound => 2,
            AckStatus::InvalidValue => 3,
            AckStatus::Unknown(code) => code,
        }
    }

    /// Warnings count as success; only positive codes are failures.
    pub fn is_failure(self) -> bool {
        self.code() > 0
    }
}

/// Dialog update mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogMode {
    /// Show the dialog.
    Show,
    /// Hide the dialog.
    Hide,
    /// A dialog button was actioned.
    Action,
}

impl DialogMode {
    fn from_wire(value: &str) -> Self {
        match value {
            "S" => DialogMode::Show,
            "H" => DialogMode::Hide,
            _ => DialogMode::Action,
        }
    }

    fn to_wire(self) -> &'static str {
        match self {
            DialogMode::Show => "S",
            DialogMode::Hide => "H",
            DialogMode::Action => "A",
        }
    }
}

/// Dialog button type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonType {
    /// OK button.
    Ok,
    /// Accept button.
    Accept,
    /// Cancel button.
    Cancel,
    /// Close button.
    Close,
    /// No button in this slot.
    None,
}

impl ButtonType {
    /// Decode from the wire code (unknown codes mean no button).
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => ButtonType::Ok,
            1 => ButtonType::Accept,
            2 => ButtonType::Cancel,
            3 => ButtonType::Close,
            _ => ButtonType::None,
        }
    }

    /// The wire code for this button.
    pub fn code(self) -> i64 {
        match self {
            ButtonType::Ok => 0,
            ButtonType::Accept => 1,
            ButtonType::Cancel => 2,
            ButtonType::Close => 3,
            ButtonType::None => 4,
        }
    }
}

/// How a value change is to be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeType {
    /// Adjust a numeric value by a signed amount.
    Delta,
    /// Replace the value.
    Absolute,
    /// Replace an entire list value.
    AbsoluteList,
    /// Row selection on a list item (row index plus double-click flag).
    ListSelection,
}

impl ChangeType {
    /// Decode from the wire code.
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => ChangeType::Delta,
            2 => ChangeType::AbsoluteList,
            3 => ChangeType::ListSelection,
            _ => ChangeType::Absolute,
        }
    }

    /// The wire code for this change type.
    pub fn code(self) -> i64 {
        match self {
            ChangeType::Delta => 0,
            ChangeType::Absolute => 1,
            ChangeType::AbsoluteList => 2,
            ChangeType::ListSelection => 3,
        }
    }
}

/// Platform code announced in a join message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiPlatform {
    /// 8-bit Arduino device.
    Arduino,
    /// JVM based API.
    JavaApi,
    /// 32-bit Arduino device.
    Arduino32,
    /// .NET based API.
    DotNetApi,
    /// Browser / JavaScript API.
    JsApi,
    /// Any other platform code.
    Unknown(i64),
}

impl ApiPlatform {
    /// Decode from the wire code.
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => ApiPlatform::Arduino,
            1 => ApiPlatform::JavaApi,
            2 => ApiPlatform::Arduino32,
            3 => ApiPlatform::DotNetApi,
            4 => ApiPlatform::JsApi,
            other => ApiPlatform::Unknown(other),
        }
    }

    /// The wire code for this platform.
    pub fn code(self) -> i64 {
        match self {
            ApiPlatform::Arduino => 0,
            ApiPlatform::JavaApi => 1,
            ApiPlatform::Arduino32 => 2,
            ApiPlatform::DotNetApi => 3,
            ApiPlatform::JsApi => 4,
            ApiPlatform::Unknown(code) => code,
        }
    }

    /// Human readable platform name.
    pub fn description(self) -> &'static str {
        match self {
            ApiPlatform::Arduino | ApiPlatform::Arduino32 => "Arduino",
            ApiPlatform::JavaApi => "Java/PI",
            ApiPlatform::DotNetApi => ".NET",
            ApiPlatform::JsApi => "JS",
            ApiPlatform::Unknown(_) => "Unknown",
        }
    }
}

/// Token linking an outgoing change request to its acknowledgment.
///
/// Zero means "no acknowledgment expected"; real requests always carry a
/// non-zero token, sent as lowercase hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Correlation(pub u32);

impl Correlation {
    /// The "no acknowledgment expected" token.
    pub const NONE: Correlation = Correlation(0);

    /// Parse from the wire hex form; malformed input becomes zero.
    pub fn from_wire(value: &str) -> Self {
        Correlation(u32::from_str_radix(value.trim(), 16).unwrap_or(0))
    }

    /// Wire hex form.
    pub fn to_wire(self) -> String {
        format!("{:x}", self.0)
    }

    /// True for the zero token.
    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

// ============================================================================
// Boot items
// ============================================================================

/// Kind-specific payload of a boot item message.
#[derive(Debug, Clone, PartialEq)]
pub enum BootPayload {
    /// Submenu container.
    SubMenu,
    /// Analog item attributes and current wire value.
    Analog {
        /// Largest raw value the device accepts.
        max_value: i64,
        /// Display offset.
        offset: i64,
        /// Display divisor.
        divisor: i64,
        /// Unit suffix.
        unit_name: String,
        /// Current raw value.
        current: i64,
    },
    /// Boolean item.
    Boolean {
        /// Display naming style.
        naming: BooleanNaming,
        /// Current value.
        current: bool,
    },
    /// Float item.
    Float {
        /// Decimal places rendered.
        decimal_places: u32,
        /// Current value.
        current: f64,
    },
    /// Enumeration item.
    Enum {
        /// Choice labels in device order.
        choices: Vec<String>,
        /// Current choice index.
        current: i64,
    },
    /// Action trigger.
    Action,
    /// RGB colour item.
    Rgb {
        /// Whether the alpha channel is in use.
        alpha_channel: bool,
        /// Current colour string.
        current: String,
    },
    /// Scroll choice item.
    ScrollChoice {
        /// Number of entries held device-side.
        num_entries: i32,
        /// Current position and label.
        current: ScrollPosition,
    },
    /// Editable text item.
    Text {
        /// Maximum accepted length.
        max_length: u32,
        /// Validation mode.
        edit_mode: TextEditMode,
        /// Current text.
        current: String,
    },
    /// Large number item.
    LargeNumber {
        /// Total digits allowed.
        digits_allowed: u32,
        /// Decimal places.
        decimal_places: u32,
        /// Whether negatives are accepted.
        negative_allowed: bool,
        /// Current value.
        current: f64,
    },
    /// Runtime list item.
    List {
        /// Current display rows.
        rows: Vec<String>,
    },
}

impl BootPayload {
    /// Build fresh item data for a tree insert.
    pub fn to_item_data(&self) -> ItemData {
        match self {
            BootPayload::SubMenu => ItemData::SubMenu { children: Vec::new() },
            BootPayload::Analog { max_value, offset, divisor, unit_name, current } => {
                ItemData::Analog {
                    value: *current,
                    max_value: *max_value,
                    offset: *offset,
                    divisor: *divisor,
                    unit_name: unit_name.clone(),
                }
            }
            BootPayload::Boolean { naming, current } => {
                ItemData::Boolean { value: *current, naming: *naming }
            }
            BootPayload::Float { decimal_places, current } => {
                ItemData::Float { value: *current, decimal_places: *decimal_places }
            }
            BootPayload::Enum { choices, current } => {
                ItemData::Enum { value: *current, choices: choices.clone() }
            }
            BootPayload::Action => ItemData::Action,
            BootPayload::Rgb { alpha_channel, current } => {
                ItemData::Rgb { value: current.clone(), alpha_channel: *alpha_channel }
            }
            BootPayload::ScrollChoice { num_entries, current } => ItemData::ScrollChoice {
                value: current.clone(),
                num_entries: *num_entries,
            },
            BootPayload::Text { max_length, edit_mode, current } => ItemData::Text {
                value: current.clone(),
                max_length: *max_length,
                edit_mode: *edit_mode,
            },
            BootPayload::LargeNumber {
                digits_allowed,
                decimal_places,
                negative_allowed,
                current,
            } => ItemData::LargeNumber {
                value: *current,
                digits_allowed: *digits_allowed,
                decimal_places: *decimal_places,
                negative_allowed: *negative_allowed,
            },
            BootPayload::List { rows } => ItemData::List {
                values: rows.clone(),
                number_of_items: rows.len() as u32,
            },
        }
    }
}

/// One item delivered during bootstrap (or re-delivered later to update an
/// existing item in place).
#[derive(Debug, Clone, PartialEq)]
pub struct BootItem {
    /// Id of the submenu this item belongs to.
    pub parent_id: String,
    /// Item id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Read-only flag.
    pub read_only: bool,
    /// Visible flag.
    pub visible: bool,
    /// Kind-specific attributes and value.
    pub payload: BootPayload,
}

// ============================================================================
// Commands
// ============================================================================

/// Value carried by a change message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeValue {
    /// Scalar value in its wire text form.
    Text(String),
    /// Full list replacement.
    List(Vec<String>),
}

/// The closed set of protocol commands.
#[derive(Debug, Clone, PartialEq)]
pub enum MenuCommand {
    /// Identity announcement from either side.
    Join {
        /// Application or device name.
        name: String,
        /// Stable identity uuid.
        uuid: String,
        /// Platform code.
        platform: ApiPlatform,
        /// Version as major*100+minor.
        version: u32,
    },
    /// Periodic liveness message.
    Heartbeat {
        /// Negotiated interval in milliseconds.
        frequency: u32,
        /// Heartbeat mode.
        mode: HeartbeatMode,
    },
    /// Bootstrap bracket.
    Bootstrap(BootstrapMode),
    /// Acknowledgment of an earlier request.
    Ack {
        /// Outcome status.
        status: AckStatus,
        /// Correlation of the request, zero for the join/pairing handshake.
        correlation: Correlation,
    },
    /// Dialog show/hide/action.
    DialogUpdate {
        /// What happened to the dialog.
        mode: DialogMode,
        /// Title text.
        header: String,
        /// Body text.
        buffer: String,
        /// First button.
        button1: ButtonType,
        /// Second button.
        button2: ButtonType,
        /// Correlation for actions, zero otherwise.
        correlation: Correlation,
    },
    /// Value change in either direction.
    ItemChange {
        /// Target item id.
        id: String,
        /// How the value applies.
        change: ChangeType,
        /// The value.
        value: ChangeValue,
        /// Correlation minted by the requester.
        correlation: Correlation,
    },
    /// Pairing request carrying the client identity.
    Pairing {
        /// Application name.
        app_name: String,
        /// Application uuid.
        app_uuid: String,
    },
    /// One boot item, any kind.
    BootItem(BootItem),
}

impl MenuCommand {
    /// Decode a command from its type code and parsed fields.
    ///
    /// Unknown type codes yield `Ok(None)`; a missing required field or a
    /// malformed number is an error isolated to this one message.
    pub fn decode(type_code: &str, fields: &FieldMap) -> Result<Option<MenuCommand>, ProtocolError> {
        let cmd = match type_code {
            MSG_HEARTBEAT => MenuCommand::Heartbeat {
                frequency: fields.get_i64_or(KEY_HEARTBEAT_FREQ, DEFAULT_HEARTBEAT_MS as i64)
                    as u32,
                mode: HeartbeatMode::from_code(fields.get_i64(KEY_HEARTBEAT_MODE)?),
            },
            MSG_BOOTSTRAP => {
                if fields.get(KEY_BOOT_TYPE)? == "START" {
                    MenuCommand::Bootstrap(BootstrapMode::Start)
                } else {
                    MenuCommand::Bootstrap(BootstrapMode::Stop)
                }
            }
            MSG_ACKNOWLEDGEMENT => MenuCommand::Ack {
                status: AckStatus::from_code(fields.get_i64(KEY_ACK_STATUS)?),
                correlation: Correlation::from_wire(fields.get_or(KEY_CORRELATION, "0")),
            },
            MSG_DIALOG_UPDATE => MenuCommand::DialogUpdate {
                mode: DialogMode::from_wire(fields.get(KEY_MODE)?),
                header: fields.get_or(KEY_HEADER, "").to_string(),
                buffer: fields.get_or(KEY_BUFFER, "").to_string(),
                button1: ButtonType::from_code(fields.get_i64_or(KEY_BUTTON1, 0)),
                button2: ButtonType::from_code(fields.get_i64_or(KEY_BUTTON2, 0)),
                correlation: Correlation::from_wire(fields.get_or(KEY_CORRELATION, "0")),
            },
            MSG_JOIN => MenuCommand::Join {
                name: fields.get(KEY_NAME)?.to_string(),
                uuid: fields.get(KEY_UUID)?.to_string(),
                platform: ApiPlatform::from_code(fields.get_i64_or(KEY_PLATFORM, 0)),
                version: fields.get_i64(KEY_VERSION)? as u32,
            },
            MSG_CHANGE_FIELD => {
                let change = ChangeType::from_code(fields.get_i64(KEY_CHANGE_TYPE)?);
                let value = if change == ChangeType::AbsoluteList {
                    ChangeValue::List(decode_list_rows(fields))
                } else {
                    ChangeValue::Text(fields.get_or(KEY_CURRENT_VALUE, "").to_string())
                };
                MenuCommand::ItemChange {
                    id: fields.get(KEY_ID)?.to_string(),
                    change,
                    value,
                    correlation: Correlation::from_wire(fields.get_or(KEY_CORRELATION, "0")),
                }
            }
            MSG_PAIRING_REQUEST => MenuCommand::Pairing {
                app_name: fields.get(KEY_NAME)?.to_string(),
                app_uuid: fields.get(KEY_UUID)?.to_string(),
            },
            MSG_BOOT_SUBMENU => boot_item(fields, BootPayload::SubMenu)?,
            MSG_BOOT_ACTION => boot_item(fields, BootPayload::Action)?,
            MSG_BOOT_ANALOG => {
                let payload = BootPayload::Analog {
                    max_value: fields.get_i64(KEY_ANALOG_MAX)?,
                    offset: fields.get_i64(KEY_ANALOG_OFFSET)?,
                    divisor: fields.get_i64(KEY_ANALOG_DIVISOR)?,
                    unit_name: fields.get_or(KEY_ANALOG_UNIT, "").to_string(),
                    current: fields.get_i64(KEY_CURRENT_VALUE)?,
                };
                boot_item(fields, payload)?
            }
            MSG_BOOT_BOOLEAN => {
                let payload = BootPayload::Boolean {
                    naming: BooleanNaming::from_code(fields.get_i64(KEY_BOOLEAN_NAMING)?),
                    current: fields.get(KEY_CURRENT_VALUE)? == "1",
                };
                boot_item(fields, payload)?
            }
            MSG_BOOT_FLOAT => {
                let payload = BootPayload::Float {
                    decimal_places: fields.get_i64(KEY_DECIMAL_PLACES)? as u32,
                    current: fields.get_f64(KEY_CURRENT_VALUE)?,
                };
                boot_item(fields, payload)?
            }
            MSG_BOOT_ENUM => {
                let count = fields.get_i64(KEY_NO_OF_CHOICES)?.max(0) as usize;
                let choices = (0..count)
                    .map(|i| fields.get_or(&choice_key(i), "").to_string())
                    .collect();
                let payload = BootPayload::Enum {
                    choices,
                    current: fields.get_i64(KEY_CURRENT_VALUE)?,
                };
                boot_item(fields, payload)?
            }
            MSG_BOOT_RGB => {
                let payload = BootPayload::Rgb {
                    alpha_channel: fields.get_i64(KEY_ALPHA)? != 0,
                    current: fields.get_or(KEY_CURRENT_VALUE, "#ffffff").to_string(),
                };
                boot_item(fields, payload)?
            }
            MSG_BOOT_SCROLL_CHOICE => {
                let payload = BootPayload::ScrollChoice {
                    num_entries: fields.get_i64(KEY_NO_OF_CHOICES)? as i32,
                    current: ScrollPosition::from_wire(fields.get_or(KEY_CURRENT_VALUE, "")),
                };
                boot_item(fields, payload)?
            }
            MSG_BOOT_TEXT => {
                let payload = BootPayload::Text {
                    max_length: fields.get_i64(KEY_MAX_LENGTH)? as u32,
                    edit_mode: TextEditMode::from_code(fields.get_i64(KEY_EDIT_MODE)?),
                    current: fields.get_or(KEY_CURRENT_VALUE, "").to_string(),
                };
                boot_item(fields, payload)?
            }
            MSG_BOOT_LARGE_NUMBER => {
                let payload = BootPayload::LargeNumber {
                    digits_allowed: fields.get_i64(KEY_MAX_LENGTH)? as u32,
                    decimal_places: fields.get_i64(KEY_DECIMAL_PLACES)? as u32,
                    negative_allowed: fields.get_i64(KEY_NEGATIVE_ALLOWED)? > 0,
                    current: fields
                        .get_or(KEY_CURRENT_VALUE, "0")
                        .trim()
                        .parse()
                        .unwrap_or(0.0),
                };
                boot_item(fields, payload)?
            }
            MSG_BOOT_LIST => boot_item(fields, BootPayload::List { rows: decode_list_rows(fields) })?,
            other => {
                log::debug!("unknown message type code {other:?}, ignoring");
                return Ok(None);
            }
        };
        Ok(Some(cmd))
    }

    /// Encode an outgoing command to wire text.
    ///
    /// # Panics
    ///
    /// Panics when called on a kind that only ever travels device-to-client
    /// (bootstrap, acknowledgment, boot items); that is a programming error,
    /// not a runtime condition.
    pub fn encode(&self) -> String {
        match self {
            MenuCommand::Heartbeat { frequency, mode } => MessageWriter::new(MSG_HEARTBEAT)
                .field_i64(KEY_HEARTBEAT_MODE, mode.code())
                .field_i64(KEY_HEARTBEAT_FREQ, *frequency as i64)
                .finish(),
            MenuCommand::Join { name, uuid, platform, version } => MessageWriter::new(MSG_JOIN)
                .field(KEY_NAME, name)
                .field(KEY_UUID, uuid)
                .field_i64(KEY_VERSION, *version as i64)
                .field_i64(KEY_PLATFORM, platform.code())
                .finish(),
            MenuCommand::Pairing { app_name, app_uuid } => {
                MessageWriter::new(MSG_PAIRING_REQUEST)
                    .field(KEY_NAME, app_name)
                    .field(KEY_UUID, app_uuid)
                    .finish()
            }
            MenuCommand::ItemChange { id, change, value, correlation } => {
                let mut writer = MessageWriter::new(MSG_CHANGE_FIELD)
                    .field_i64(KEY_CHANGE_TYPE, change.code())
                    .field(KEY_ID, id)
                    .field(KEY_CORRELATION, &correlation.to_wire());
                match value {
                    ChangeValue::Text(text) => {
                        writer = writer.field(KEY_CURRENT_VALUE, text);
                    }
                    ChangeValue::List(rows) => {
                        writer = writer.field_i64(KEY_NO_OF_CHOICES, rows.len() as i64);
                        for (i, row) in rows.iter().enumerate() {
                            writer = writer
                                .field(&choice_name_key(i), "")
                                .field(&choice_key(i), row);
                        }
                    }
                }
                writer.finish()
            }
            MenuCommand::DialogUpdate { mode, header, buffer, button1, button2, correlation } => {
                MessageWriter::new(MSG_DIALOG_UPDATE)
                    .field(KEY_MODE, mode.to_wire())
                    .field(KEY_HEADER, header)
                    .field(KEY_BUFFER, buffer)
                    .field_i64(KEY_BUTTON1, button1.code())
                    .field_i64(KEY_BUTTON2, button2.code())
                    .field(KEY_CORRELATION, &correlation.to_wire())
                    .finish()
            }
            other => panic!("{} is not an outgoing command", other.type_name()),
        }
    }

    /// Short name of the command kind, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            MenuCommand::Join { .. } => "Join",
            MenuCommand::Heartbeat { .. } => "Heartbeat",
            MenuCommand::Bootstrap(_) => "Bootstrap",
            MenuCommand::Ack { .. } => "Ack",
            MenuCommand::DialogUpdate { .. } => "DialogUpdate",
            MenuCommand::ItemChange { .. } => "ItemChange",
            MenuCommand::Pairing { .. } => "Pairing",
            MenuCommand::BootItem(_) => "BootItem",
        }
    }
}

/// Decode the fields shared by every boot item kind.
fn boot_item(fields: &FieldMap, payload: BootPayload) -> Result<MenuCommand, ProtocolError> {
    Ok(MenuCommand::BootItem(BootItem {
        parent_id: fields.get(KEY_PARENT_ID)?.to_string(),
        id: fields.get(KEY_ID)?.to_string(),
        name: fields.get(KEY_NAME)?.to_string(),
        read_only: fields.get_i64(KEY_READ_ONLY)? != 0,
        visible: fields.get_i64(KEY_VISIBLE)? != 0,
        payload,
    }))
}

/// Read `NC` choice rows as "name value" pairs; the name slot may be empty.
fn decode_list_rows(fields: &FieldMap) -> Vec<String> {
    let count = fields.get_i64_or(KEY_NO_OF_CHOICES, 0).max(0) as usize;
    (0..count)
        .map(|i| {
            let name = fields.get_or(&choice_name_key(i), "");
            let value = fields.get_or(&choice_key(i), "");
            if name.is_empty() {
                value.to_string()
            } else {
                format!("{name} {value}")
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::parse_frame;

    fn decode_raw(raw: &str) -> Option<MenuCommand> {
        let mut codec = crate::codec::TagValCodec::new();
        codec.push(raw.as_bytes());
        let frame = codec.next_frame().expect("complete frame");
        let (ty, fields) = parse_frame(&frame).expect("parsable frame");
        MenuCommand::decode(ty, &fields).expect("decodable command")
    }

    #[test]
    fn heartbeat_round_trip() {
        let cmd = MenuCommand::Heartbeat { frequency: 1500, mode: HeartbeatMode::Start };
        assert_eq!(decode_raw(&cmd.encode()), Some(cmd));
    }

    #[test]
    fn heartbeat_frequency_defaults() {
        let frame = format!("{}HB=0|", MSG_HEARTBEAT);
        let (ty, fields) = parse_frame(&frame).unwrap();
        let cmd = MenuCommand::decode(ty, &fields).unwrap().unwrap();
        assert_eq!(
            cmd,
            MenuCommand::Heartbeat { frequency: 1500, mode: HeartbeatMode::Normal }
        );
    }

    #[test]
    fn heartbeat_missing_mode_is_error() {
        let (ty, fields) = parse_frame("HBHF=1500|").unwrap();
        assert_eq!(
            MenuCommand::decode(ty, &fields),
            Err(ProtocolError::KeyNotDefined(KEY_HEARTBEAT_MODE.to_string()))
        );
    }

    #[test]
    fn join_round_trip() {
        let cmd = MenuCommand::Join {
            name: "embedCTRL".to_string(),
            uuid: "11111111-2222-3333-4444-555555555555".to_string(),
            platform: ApiPlatform::JavaApi,
            version: 103,
        };
        assert_eq!(decode_raw(&cmd.encode()), Some(cmd));
    }

    #[test]
    fn pairing_round_trip() {
        let cmd = MenuCommand::Pairing {
            app_name: "my app".to_string(),
            app_uuid: "abc-def".to_string(),
        };
        assert_eq!(decode_raw(&cmd.encode()), Some(cmd));
    }

    #[test]
    fn item_change_round_trip_with_reserved_characters() {
        let cmd = MenuCommand::ItemChange {
            id: "22".to_string(),
            change: ChangeType::Absolute,
            value: ChangeValue::Text("weird|value=with\\escapes".to_string()),
            correlation: Correlation(0xbeef),
        };
        assert_eq!(decode_raw(&cmd.encode()), Some(cmd));
    }

    #[test]
    fn dialog_action_round_trip() {
        let cmd = MenuCommand::DialogUpdate {
            mode: DialogMode::Action,
            header: String::new(),
            buffer: String::new(),
            button1: ButtonType::Ok,
            button2: ButtonType::Ok,
            correlation: Correlation(42),
        };
        assert_eq!(decode_raw(&cmd.encode()), Some(cmd));
    }

    #[test]
    fn bootstrap_decodes_both_modes() {
        let (ty, fields) = parse_frame("BSBT=START|").unwrap();
        assert_eq!(
            MenuCommand::decode(ty, &fields).unwrap(),
            Some(MenuCommand::Bootstrap(BootstrapMode::Start))
        );
        let (ty, fields) = parse_frame("BSBT=STOP|").unwrap();
        assert_eq!(
            MenuCommand::decode(ty, &fields).unwrap(),
            Some(MenuCommand::Bootstrap(BootstrapMode::Stop))
        );
    }

    #[test]
    fn ack_correlation_defaults_to_zero() {
        let (ty, fields) = parse_frame("AKST=0|").unwrap();
        let cmd = MenuCommand::decode(ty, &fields).unwrap().unwrap();
        assert_eq!(
            cmd,
            MenuCommand::Ack { status: AckStatus::Success, correlation: Correlation::NONE }
        );
    }

    #[test]
    fn ack_parses_hex_correlation() {
        let (ty, fields) = parse_frame("AKST=1|CO=fe12|").unwrap();
        let cmd = MenuCommand::decode(ty, &fields).unwrap().unwrap();
        let MenuCommand::Ack { status, correlation } = cmd else {
            panic!("expected ack");
        };
        assert!(status.is_failure());
        assert_eq!(correlation, Correlation(0xfe12));
    }

    #[test]
    fn analog_boot_item_decodes() {
        let (ty, fields) =
            parse_frame("BAPI=0|ID=1|NM=Voltage|RO=0|VI=1|AM=255|AO=-128|AD=2|AU=V|VC=100|")
                .unwrap();
        let cmd = MenuCommand::decode(ty, &fields).unwrap().unwrap();
        let MenuCommand::BootItem(item) = cmd else {
            panic!("expected boot item");
        };
        assert_eq!(item.id, "1");
        assert_eq!(item.parent_id, "0");
        assert_eq!(item.name, "Voltage");
        assert!(item.visible);
        assert!(!item.read_only);
        assert_eq!(
            item.payload,
            BootPayload::Analog {
                max_value: 255,
                offset: -128,
                divisor: 2,
                unit_name: "V".to_string(),
                current: 100,
            }
        );
    }

    #[test]
    fn enum_boot_item_reads_lettered_choices() {
        let (ty, fields) =
            parse_frame("BEPI=0|ID=5|NM=Mode|RO=0|VI=1|NC=3|CA=Slow|CB=Medium|CC=Fast|VC=1|")
                .unwrap();
        let MenuCommand::BootItem(item) = MenuCommand::decode(ty, &fields).unwrap().unwrap()
        else {
            panic!("expected boot item");
        };
        assert_eq!(
            item.payload,
            BootPayload::Enum {
                choices: vec!["Slow".into(), "Medium".into(), "Fast".into()],
                current: 1,
            }
        );
    }

    #[test]
    fn scroll_choice_boot_decodes_current_value_field() {
        let (ty, fields) =
            parse_frame("BZPI=0|ID=8|NM=Food|RO=0|VI=1|NC=10|VC=3:Pasta|").unwrap();
        let MenuCommand::BootItem(item) = MenuCommand::decode(ty, &fields).unwrap().unwrap()
        else {
            panic!("expected boot item");
        };
        let BootPayload::ScrollChoice { num_entries, current } = item.payload else {
            panic!("expected scroll choice payload");
        };
        assert_eq!(num_entries, 10);
        assert_eq!(current.position, 3);
        assert_eq!(current.text, "Pasta");
    }

    #[test]
    fn list_boot_joins_name_and_value() {
        let (ty, fields) =
            parse_frame("BLPI=0|ID=9|NM=Log|RO=1|VI=1|NC=2|cA=line|CA=one|cB=line|CB=two|")
                .unwrap();
        let MenuCommand::BootItem(item) = MenuCommand::decode(ty, &fields).unwrap().unwrap()
        else {
            panic!("expected boot item");
        };
        assert_eq!(
            item.payload,
            BootPayload::List { rows: vec!["line one".into(), "line two".into()] }
        );
    }

    #[test]
    fn unknown_type_code_is_not_a_command() {
        let (ty, fields) = parse_frame("ZZAB=1|").unwrap();
        assert_eq!(MenuCommand::decode(ty, &fields), Ok(None));
    }

    #[test]
    fn absolute_list_change_round_trip() {
        let cmd = MenuCommand::ItemChange {
            id: "9".to_string(),
            change: ChangeType::AbsoluteList,
            value: ChangeValue::List(vec!["one".into(), "two".into()]),
            correlation: Correlation(7),
        };
        assert_eq!(decode_raw(&cmd.encode()), Some(cmd));
    }

    #[test]
    #[should_panic(expected = "not an outgoing command")]
    fn encoding_inbound_only_command_panics() {
        MenuCommand::Bootstrap(BootstrapMode::Start).encode();
    }
}
