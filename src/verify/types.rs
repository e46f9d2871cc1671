use serde_json::Value;
use std::fmt;

/// A decoded payload plus whether the backend should consume the ticket.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerificationRequest {
    pub payload: String,
    /// Every scan at the door consumes the ticket unless told otherwise.
    pub mark_used: bool,
}

impl VerificationRequest {
    pub fn new(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
            mark_used: true,
        }
    }

    /// Check the ticket without consuming it.
    pub fn lookup_only(mut self) -> Self {
        self.mark_used = false;
        self
    }
}

/// Outcome of one verification round trip.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VerificationResult {
    pub approved: bool,
    /// Explanation when not approved, empty otherwise.
    pub reason: String,
    /// Display-only descriptors. Never used for pass/fail.
    pub meta: Option<VerificationMeta>,
}

impl VerificationResult {
    pub fn approved(meta: Option<VerificationMeta>) -> Self {
        Self {
            approved: true,
            reason: String::new(),
            meta,
        }
    }

    pub fn rejected(reason: impl Into<String>, meta: Option<VerificationMeta>) -> Self {
        Self {
            approved: false,
            reason: reason.into(),
            meta,
        }
    }
}

/// Identifier the backend may send as a number or a string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Identifier {
    Number(i64),
    Text(String),
}

impl Identifier {
    pub fn is_blank(&self) -> bool {
        matches!(self, Identifier::Text(text) if text.trim().is_empty())
    }

    /// Integral numbers (including `7.0`) become `Number`; any other scalar
    /// is kept as text. Arrays, objects and null are dropped.
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => match n.as_i64() {
                Some(n) => Some(Identifier::Number(n)),
                None => match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                        Some(Identifier::Number(f as i64))
                    }
                    _ => Some(Identifier::Text(n.to_string())),
                },
            },
            other => display_text(other).map(Identifier::Text),
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Number(n) => write!(f, "{}", n),
            Identifier::Text(text) => f.write_str(text),
        }
    }
}

/// Display-only descriptors attached to a verification result.
///
/// Read best-effort: a field of an unexpected shape is dropped on its own and
/// never affects the decision it is attached to.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VerificationMeta {
    pub ticket: Option<TicketMeta>,
    pub booking: Option<BookingMeta>,
    pub seat: Option<SeatMeta>,
}

impl VerificationMeta {
    /// Returns `None` unless `value` is a JSON object.
    pub fn from_value(value: &Value) -> Option<Self> {
        let fields = value.as_object()?;
        Some(Self {
            ticket: fields.get("ticket").and_then(TicketMeta::from_value),
            booking: fields.get("booking").and_then(BookingMeta::from_value),
            seat: fields.get("seat").and_then(SeatMeta::from_value),
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TicketMeta {
    pub ticket_id: Option<Identifier>,
    pub status: Option<String>,
}

impl TicketMeta {
    fn from_value(value: &Value) -> Option<Self> {
        let fields = value.as_object()?;
        Some(Self {
            ticket_id: identifier_field(fields, &["ticketId", "ticket_id"]),
            status: text_field(fields, &["status"]),
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BookingMeta {
    pub id: Option<Identifier>,
    pub status: Option<String>,
    pub payment_status: Option<String>,
}

impl BookingMeta {
    fn from_value(value: &Value) -> Option<Self> {
        let fields = value.as_object()?;
        Some(Self {
            id: identifier_field(fields, &["id"]),
            status: text_field(fields, &["status"]),
            payment_status: text_field(fields, &["payment_status", "paymentStatus"]),
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SeatMeta {
    /// Preformatted seat descriptor; wins over the parts below.
    pub label: Option<String>,
    pub section: Option<String>,
    pub row: Option<Identifier>,
    pub number: Option<Identifier>,
}

impl SeatMeta {
    /// A bare scalar (`"seat": "A12"`) is taken as the label.
    fn from_value(value: &Value) -> Option<Self> {
        let Some(fields) = value.as_object() else {
            return display_text(value).map(|label| Self {
                label: Some(label),
                ..Self::default()
            });
        };
        Some(Self {
            label: text_field(fields, &["label"]),
            section: text_field(fields, &["section"]),
            row: identifier_field(fields, &["row"]),
            number: identifier_field(fields, &["number", "seat_number", "seatNumber"]),
        })
    }
}

type Fields = serde_json::Map<String, Value>;

fn first_present<'a>(fields: &'a Fields, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| fields.get(*key))
        .find(|value| !value.is_null())
}

fn text_field(fields: &Fields, keys: &[&str]) -> Option<String> {
    first_present(fields, keys).and_then(display_text)
}

fn identifier_field(fields: &Fields, keys: &[&str]) -> Option<Identifier> {
    first_present(fields, keys).and_then(Identifier::from_value)
}

fn display_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
