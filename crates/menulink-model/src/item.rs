//! Menu item types.
//!
//! Every item a device can expose is one variant of [`ItemData`], carried
//! inside a [`MenuItem`] together with the state shared by all kinds (id,
//! display name, read-only/visible flags and the dirty-tracking flag).

/// Naming style used when a boolean item is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BooleanNaming {
    /// Render as `TRUE` / `FALSE`.
    #[default]
    TrueFalse,
    /// Render as `ON` / `OFF`.
    OnOff,
    /// Render as `YES` / `NO`.
    YesNo,
}

impl BooleanNaming {
    /// Decode from the wire code (unknown codes fall back to TRUE/FALSE).
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => BooleanNaming::OnOff,
            2 => BooleanNaming::YesNo,
            _ => BooleanNaming::TrueFalse,
        }
    }

    /// The wire code for this naming style.
    pub fn code(self) -> i64 {
        match self {
            BooleanNaming::TrueFalse => 0,
            BooleanNaming::OnOff => 1,
            BooleanNaming::YesNo => 2,
        }
    }
}

/// Edit mode of an editable text item. Determines the validation pattern
/// applied before a user value is sent back to the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextEditMode {
    /// Free text, bounded by the item's maximum length.
    #[default]
    PlainText,
    /// IPv4 dotted-quad address.
    IpAddress,
    /// 24 hour time, `HH:MM:SS`.
    Time24h,
    /// 12 hour time.
    Time12h,
    /// 24 hour time with hundredths of a second.
    Time24Hundreds,
    /// Date, `DD/MM/YYYY`.
    GregorianDate,
    /// Duration in seconds, time syntax.
    DurationSeconds,
    /// Duration with hundredths, time syntax.
    DurationHundreds,
    /// 24 hour time without seconds.
    Time24hHhmm,
    /// 12 hour time without seconds.
    Time12hHhmm,
}

impl TextEditMode {
    /// Decode from the wire code (unknown codes fall back to plain text).
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => TextEditMode::IpAddress,
            2 => TextEditMode::Time24h,
            3 => TextEditMode::Time12h,
            4 => TextEditMode::Time24Hundreds,
            5 => TextEditMode::GregorianDate,
            6 => TextEditMode::DurationSeconds,
            7 => TextEditMode::DurationHundreds,
            8 => TextEditMode::Time24hHhmm,
            9 => TextEditMode::Time12hHhmm,
            _ => TextEditMode::PlainText,
        }
    }

    /// True for any of the time-of-day or duration variants.
    pub fn is_time_based(self) -> bool {
        matches!(
            self,
            TextEditMode::Time24h
                | TextEditMode::Time12h
                | TextEditMode::Time24Hundreds
                | TextEditMode::DurationSeconds
                | TextEditMode::DurationHundreds
                | TextEditMode::Time24hHhmm
                | TextEditMode::Time12hHhmm
        )
    }
}

/// Current position and label of a scroll-choice item.
///
/// The label is server-authoritative: an absolute update sends only the
/// position back to the device.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScrollPosition {
    /// Zero-based position within the choices held on the device.
    pub position: i32,
    /// Display label for the current position.
    pub text: String,
}

impl ScrollPosition {
    /// Parse a wire value of the form `<pos>:<label>` (or `<pos>-<label>`).
    /// Malformed input yields position 0 with an empty label.
    pub fn from_wire(value: &str) -> Self {
        let (pos, text) = match value.split_once(':').or_else(|| value.split_once('-')) {
            Some((p, t)) => (p, t),
            None => return ScrollPosition::default(),
        };
        ScrollPosition {
            position: pos.trim().parse().unwrap_or(0),
            text: text.to_string(),
        }
    }

    /// Wire form of an absolute position update, `<pos>-`.
    pub fn to_wire(&self) -> String {
        format!("{}-", self.position)
    }
}

/// Kind-specific value and attributes of a menu item.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemData {
    /// Container of other items; children are item ids in insertion order.
    SubMenu {
        /// Ordered child item ids.
        children: Vec<String>,
    },
    /// Integer value scaled for display by offset/divisor.
    Analog {
        /// Raw wire value.
        value: i64,
        /// Largest raw value the device accepts.
        max_value: i64,
        /// Added to the raw value before display scaling.
        offset: i64,
        /// Display divisor; below 2 means no fractional part.
        divisor: i64,
        /// Unit suffix appended to the display text.
        unit_name: String,
    },
    /// Index into a fixed list of choices.
    Enum {
        /// Current choice index.
        value: i64,
        /// Choice labels in device order.
        choices: Vec<String>,
    },
    /// On/off style value.
    Boolean {
        /// Current value.
        value: bool,
        /// Display naming style.
        naming: BooleanNaming,
    },
    /// Read-mostly floating point value.
    Float {
        /// Current value.
        value: f64,
        /// Decimal places rendered.
        decimal_places: u32,
    },
    /// Editable large number.
    LargeNumber {
        /// Current value.
        value: f64,
        /// Total digits the device allows.
        digits_allowed: u32,
        /// Decimal places rendered and accepted.
        decimal_places: u32,
        /// Whether negative values are accepted.
        negative_allowed: bool,
    },
    /// Trigger-only item, no persistent value.
    Action,
    /// 32-bit colour held as a `#`-prefixed hex string.
    Rgb {
        /// Current colour, e.g. `#ffdd00` or `#ffdd00ff`.
        value: String,
        /// Whether the alpha channel is in use.
        alpha_channel: bool,
    },
    /// Position within a device-side list of choices.
    ScrollChoice {
        /// Current position and label.
        value: ScrollPosition,
        /// Number of entries the device holds.
        num_entries: i32,
    },
    /// Editable text with a mode-specific format.
    Text {
        /// Current text.
        value: String,
        /// Maximum text length the device accepts.
        max_length: u32,
        /// Validation mode.
        edit_mode: TextEditMode,
    },
    /// Device-populated list of display rows, read-only on the client.
    List {
        /// Current rows.
        values: Vec<String>,
        /// Row count reported at bootstrap.
        number_of_items: u32,
    },
}

impl ItemData {
    /// Short kind name, mainly for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            ItemData::SubMenu { .. } => "SubMenu",
            ItemData::Analog { .. } => "Analog",
            ItemData::Enum { .. } => "Enum",
            ItemData::Boolean { .. } => "Boolean",
            ItemData::Float { .. } => "Float",
            ItemData::LargeNumber { .. } => "LargeNumber",
            ItemData::Action => "Action",
            ItemData::Rgb { .. } => "Rgb",
            ItemData::ScrollChoice { .. } => "ScrollChoice",
            ItemData::Text { .. } => "Text",
            ItemData::List { .. } => "List",
        }
    }
}

/// A single node of the menu tree.
#[derive(Debug, Clone, PartialEq)]
pub struct MenuItem {
    /// Stable id, unique within a tree. Id `"0"` is reserved for the root.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Whether the device rejects changes to this item.
    pub read_only: bool,
    /// Whether the item should currently be shown.
    pub visible: bool,
    /// Dirty flag, set by any mutation and cleared by the consumer.
    pub changed: bool,
    /// Kind-specific value and attributes.
    pub data: ItemData,
}

impl MenuItem {
    /// Create a new item. Items start hidden and unchanged; bootstrap sets
    /// the real flags immediately after construction.
    pub fn new(id: impl Into<String>, name: impl Into<String>, data: ItemData) -> Self {
        MenuItem {
            id: id.into(),
            name: name.into(),
            read_only: false,
            visible: false,
            changed: false,
            data,
        }
    }

    /// Set the display name and mark the item changed.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.changed = true;
    }

    /// Set the read-only flag and mark the item changed.
    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
        self.changed = true;
    }

    /// Set the visible flag and mark the item changed.
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
        self.changed = true;
    }

    /// Mark the item as changed.
    pub fn mark_changed(&mut self) {
        self.changed = true;
    }

    /// Clear the changed flag.
    pub fn clear_changed(&mut self) {
        self.changed = false;
    }
}
