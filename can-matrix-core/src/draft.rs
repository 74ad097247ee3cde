//! Draft messages authored by a user
//!
//! A draft is checked against the loaded sources before it is appended.
//! Every rule yields its own `Violation`; the caller decides whether any of
//! them should block the append.

use crate::extract;
use crate::network::{ByteOrder, ChoiceTable, Message, Signal};
use crate::source::Source;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::num::ParseIntError;

/// Largest 11-bit identifier
pub const MAX_STANDARD_ID: u32 = 0x7FF;
/// Largest 29-bit identifier
pub const MAX_EXTENDED_ID: u32 = 0x1FFF_FFFF;
/// Largest CAN-FD payload in bytes
pub const MAX_MESSAGE_LENGTH: usize = 64;

const DEFAULT_SCALE: f64 = 1.0;
const DEFAULT_OFFSET: f64 = 0.0;

/// A message definition pending validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftMessage {
    pub name: String,
    /// Frame id as text, `0x` prefix for hexadecimal
    pub id: String,
    /// Payload length in bytes
    pub length: usize,
    #[serde(default)]
    pub is_extended: bool,
    #[serde(default)]
    pub comment: Option<String>,
    /// Transmitting ECU
    pub sender: String,
    #[serde(default)]
    pub cycle_time: Option<u32>,
    #[serde(default)]
    pub signals: Vec<DraftSignal>,
}

/// A signal definition pending validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftSignal {
    pub name: String,
    pub start_bit: i64,
    pub length: i64,
    /// Defaults to 1.0 when unset
    #[serde(default)]
    pub scale: Option<f64>,
    /// Defaults to 0.0 when unset
    #[serde(default)]
    pub offset: Option<f64>,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub is_signed: bool,
    #[serde(default)]
    pub receivers: Vec<String>,
    #[serde(default)]
    pub byte_order: ByteOrder,
    #[serde(default)]
    pub minimum: Option<f64>,
    #[serde(default)]
    pub maximum: Option<f64>,
    #[serde(default)]
    pub initial: Option<f64>,
    #[serde(default)]
    pub invalid: Option<f64>,
    /// Value table text, e.g. `"0: Off, 1: On"`
    #[serde(default)]
    pub choices: String,
    #[serde(default)]
    pub comment: Option<String>,
}

impl DraftSignal {
    pub fn new(name: impl Into<String>, start_bit: i64, length: i64) -> Self {
        Self {
            name: name.into(),
            start_bit,
            length,
            scale: None,
            offset: None,
            unit: String::new(),
            is_signed: false,
            receivers: Vec::new(),
            byte_order: ByteOrder::LittleEndian,
            minimum: None,
            maximum: None,
            initial: None,
            invalid: None,
            choices: String::new(),
            comment: None,
        }
    }
}

/// One broken rule
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    EmptyMessageName,
    DuplicateMessageName { name: String },
    InvalidFrameId { text: String },
    FrameIdOutOfRange { frame_id: u32, is_extended: bool },
    InvalidMessageLength { length: usize },
    UnknownEcu { name: String },
    EmptySignalName { index: usize },
    DuplicateSignalName { name: String },
    SenderIsReceiver { signal: String, sender: String },
    NegativeStartBit { signal: String, start_bit: i64 },
    InvalidSignalLength { signal: String, length: i64 },
    BitRangeOverflow { signal: String, end_bit: i64, available_bits: i64 },
    MinAboveMax { signal: String, minimum: f64, maximum: f64 },
    InvalidChoiceTable { signal: String, reason: String },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::EmptyMessageName => write!(f, "message name is empty"),
            Violation::DuplicateMessageName { name } => {
                write!(f, "message {:?} already exists", name)
            }
            Violation::InvalidFrameId { text } => write!(f, "invalid frame id {:?}", text),
            Violation::FrameIdOutOfRange { frame_id, is_extended } => write!(
                f,
                "frame id 0x{:X} does not fit a {} identifier",
                frame_id,
                if *is_extended { "29-bit" } else { "11-bit" }
            ),
            Violation::InvalidMessageLength { length } => write!(
                f,
                "message length {} is outside 1..={} bytes",
                length, MAX_MESSAGE_LENGTH
            ),
            Violation::UnknownEcu { name } => write!(f, "unknown ECU {:?}", name),
            Violation::EmptySignalName { index } => write!(f, "signal #{} has no name", index),
            Violation::DuplicateSignalName { name } => {
                write!(f, "signal {:?} is defined more than once", name)
            }
            Violation::SenderIsReceiver { signal, sender } => write!(
                f,
                "signal {:?} lists the sender {:?} as a receiver",
                signal, sender
            ),
            Violation::NegativeStartBit { signal, start_bit } => {
                write!(f, "signal {:?} starts at negative bit {}", signal, start_bit)
            }
            Violation::InvalidSignalLength { signal, length } => {
                write!(f, "signal {:?} has invalid length {}", signal, length)
            }
            Violation::BitRangeOverflow { signal, end_bit, available_bits } => write!(
                f,
                "signal {:?} ends at bit {} but the message has {} bits",
                signal, end_bit, available_bits
            ),
            Violation::MinAboveMax { signal, minimum, maximum } => write!(
                f,
                "signal {:?} minimum {} is above maximum {}",
                signal, minimum, maximum
            ),
            Violation::InvalidChoiceTable { signal, reason } => {
                write!(f, "signal {:?} value table: {}", signal, reason)
            }
        }
    }
}

/// All violations found in one draft
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationResult {
    pub violations: Vec<Violation>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Violation> {
        self.violations.iter()
    }

    fn push(&mut self, violation: Violation) {
        self.violations.push(violation);
    }
}

/// Parse a frame id written in hexadecimal (`0x` prefix) or decimal
pub fn parse_frame_id(text: &str) -> Result<u32, ParseIntError> {
    let text = text.trim();
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => text.parse(),
    }
}

fn parse_raw_value(text: &str) -> Result<i64, ParseIntError> {
    let text = text.trim();
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let value = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        Some(hex) => i64::from_str_radix(hex, 16)?,
        None => digits.parse::<i64>()?,
    };
    Ok(if negative { -value } else { value })
}

/// Parse value-table text into a choice table
///
/// Entries are `raw: label` or `raw=label`, separated by commas, semicolons
/// or line breaks. Raw values may be decimal or `0x` hexadecimal. Blank text
/// is an empty table.
pub fn parse_choices(text: &str) -> Result<ChoiceTable, String> {
    let mut table = ChoiceTable::new();
    for entry in text.split([',', ';', '\n']) {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let (raw, label) = entry
            .split_once(':')
            .or_else(|| entry.split_once('='))
            .ok_or_else(|| format!("entry {:?} is not `raw: label`", entry))?;
        let raw = parse_raw_value(raw).map_err(|e| format!("raw value {:?}: {}", raw.trim(), e))?;
        let label = label.trim();
        if label.is_empty() {
            return Err(format!("raw value {} has an empty label", raw));
        }
        if table.label(raw).is_some() {
            return Err(format!("raw value {} is listed twice", raw));
        }
        table.push(raw, label);
    }
    Ok(table)
}

/// Check a draft against the current message names and ECU names
///
/// ECU membership is only checked when `ecu_names` is non-empty.
pub fn validate(
    existing_names: &BTreeSet<String>,
    ecu_names: &BTreeSet<String>,
    draft: &DraftMessage,
) -> ValidationResult {
    let mut result = ValidationResult::default();

    if draft.name.trim().is_empty() {
        result.push(Violation::EmptyMessageName);
    } else if existing_names.contains(&draft.name) {
        result.push(Violation::DuplicateMessageName {
            name: draft.name.clone(),
        });
    }

    match parse_frame_id(&draft.id) {
        Ok(frame_id) => {
            let limit = if draft.is_extended {
                MAX_EXTENDED_ID
            } else {
                MAX_STANDARD_ID
            };
            if frame_id > limit {
                result.push(Violation::FrameIdOutOfRange {
                    frame_id,
                    is_extended: draft.is_extended,
                });
            }
        }
        Err(_) => result.push(Violation::InvalidFrameId {
            text: draft.id.clone(),
        }),
    }

    if draft.length == 0 || draft.length > MAX_MESSAGE_LENGTH {
        result.push(Violation::InvalidMessageLength {
            length: draft.length,
        });
    }

    let check_ecu = |name: &str, result: &mut ValidationResult| {
        if !ecu_names.is_empty() && !ecu_names.contains(name) {
            result.push(Violation::UnknownEcu {
                name: name.to_string(),
            });
        }
    };

    check_ecu(draft.sender.as_str(), &mut result);

    let available_bits = i64::try_from(draft.length)
        .unwrap_or(i64::MAX)
        .saturating_mul(8);
    let mut seen = BTreeSet::new();
    let mut unknown_receivers = BTreeSet::new();

    for (index, signal) in draft.signals.iter().enumerate() {
        if signal.name.trim().is_empty() {
            result.push(Violation::EmptySignalName { index });
        } else if !seen.insert(signal.name.as_str()) {
            result.push(Violation::DuplicateSignalName {
                name: signal.name.clone(),
            });
        }

        if signal.receivers.iter().any(|r| *r == draft.sender) {
            result.push(Violation::SenderIsReceiver {
                signal: signal.name.clone(),
                sender: draft.sender.clone(),
            });
        }
        unknown_receivers.extend(signal.receivers.iter().map(String::as_str));

        if signal.start_bit < 0 {
            result.push(Violation::NegativeStartBit {
                signal: signal.name.clone(),
                start_bit: signal.start_bit,
            });
        }
        if signal.length < 1 {
            result.push(Violation::InvalidSignalLength {
                signal: signal.name.clone(),
                length: signal.length,
            });
        }
        if signal.start_bit >= 0 && signal.length >= 1 {
            let end_bit = signal.start_bit.saturating_add(signal.length);
            if end_bit > available_bits {
                result.push(Violation::BitRangeOverflow {
                    signal: signal.name.clone(),
                    end_bit,
                    available_bits,
                });
            }
        }

        if let (Some(minimum), Some(maximum)) = (signal.minimum, signal.maximum) {
            if minimum > maximum {
                result.push(Violation::MinAboveMax {
                    signal: signal.name.clone(),
                    minimum,
                    maximum,
                });
            }
        }

        if let Err(reason) = parse_choices(&signal.choices) {
            result.push(Violation::InvalidChoiceTable {
                signal: signal.name.clone(),
                reason,
            });
        }
    }

    for receiver in unknown_receivers {
        check_ecu(receiver, &mut result);
    }

    result
}

impl DraftMessage {
    /// Convert into a `Message`, applying the documented defaults
    ///
    /// Fails with the first violation that prevents conversion (unparsable
    /// id, negative bit numbers, bad value table). Run `validate` first to
    /// see every violation.
    pub fn to_message(&self) -> Result<Message, Violation> {
        let frame_id = parse_frame_id(&self.id).map_err(|_| Violation::InvalidFrameId {
            text: self.id.clone(),
        })?;

        let signals = self
            .signals
            .iter()
            .map(DraftSignal::to_signal)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Message {
            name: self.name.clone(),
            frame_id,
            length: self.length,
            is_extended: self.is_extended,
            senders: vec![self.sender.clone()],
            cycle_time: self.cycle_time,
            send_type: None,
            comment: self.comment.clone(),
            signals,
        })
    }
}

impl DraftSignal {
    fn to_signal(&self) -> Result<Signal, Violation> {
        let start_bit = u32::try_from(self.start_bit).map_err(|_| Violation::NegativeStartBit {
            signal: self.name.clone(),
            start_bit: self.start_bit,
        })?;
        let length = u32::try_from(self.length)
            .ok()
            .filter(|l| *l >= 1)
            .ok_or_else(|| Violation::InvalidSignalLength {
                signal: self.name.clone(),
                length: self.length,
            })?;
        let choices = parse_choices(&self.choices).map_err(|reason| {
            Violation::InvalidChoiceTable {
                signal: self.name.clone(),
                reason,
            }
        })?;

        Ok(Signal {
            name: self.name.clone(),
            start_bit,
            length,
            byte_order: self.byte_order,
            is_signed: self.is_signed,
            scale: self.scale.unwrap_or(DEFAULT_SCALE),
            offset: self.offset.unwrap_or(DEFAULT_OFFSET),
            minimum: self.minimum,
            maximum: self.maximum,
            raw_initial: self.initial,
            raw_invalid: self.invalid,
            unit: self.unit.clone(),
            choices,
            receivers: self.receivers.clone(),
            comment: self.comment.clone(),
        })
    }
}

/// Validate a draft against `source` and append it when no rule is broken
///
/// Returns the validation outcome; the source is untouched unless it is
/// valid.
pub fn append_if_valid(source: &mut Source, draft: &DraftMessage) -> ValidationResult {
    let existing = extract::source_message_names(source);
    let ecus = extract::source_ecu_names(source);
    let mut result = validate(&existing, &ecus, draft);

    if result.is_valid() {
        match draft.to_message() {
            Ok(message) => source.append_message(message),
            Err(violation) => result.push(violation),
        }
    }
    result
}
