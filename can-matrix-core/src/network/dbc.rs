//! DBC file loader
//!
//! Parses Vector DBC files with the `can-dbc` crate and converts them into
//! our `NetworkDatabase` model. The parser itself is a black box: a file
//! either yields a full object graph or fails outright.

use crate::network::model::{
    ByteOrder, ChoiceTable, Message, NetworkDatabase, Node, Signal,
};
use crate::types::{MatrixError, Result};
use can_dbc::{AttributeValue, AttributeValuedForObjectType, DBC};
use std::path::Path;

/// Bit 31 of a raw DBC message id marks a 29-bit extended frame
const EXTENDED_ID_FLAG: u32 = 0x8000_0000;
const EXTENDED_ID_MASK: u32 = 0x1FFF_FFFF;

const ATTR_CYCLE_TIME: &str = "GenMsgCycleTime";
const ATTR_SEND_TYPE: &str = "GenMsgSendType";
const ATTR_START_VALUE: &str = "GenSigStartValue";
const ATTR_INVALID_VALUE: &str = "GenSigInvalidValue";

/// Load a DBC file into a `NetworkDatabase` named after the file
pub fn load_dbc_file(path: &Path) -> Result<NetworkDatabase> {
    log::info!("Parsing DBC file: {:?}", path);

    let bytes = std::fs::read(path).map_err(|e| MatrixError::DbcParse {
        path: path.to_path_buf(),
        reason: format!("failed to read file: {}", e),
    })?;

    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown.dbc")
        .to_string();

    let db = parse_dbc(&name, &bytes).map_err(|reason| MatrixError::DbcParse {
        path: path.to_path_buf(),
        reason,
    })?;

    log::info!(
        "Parsed {} messages and {} nodes from {:?}",
        db.messages.len(),
        db.nodes.len(),
        path
    );

    Ok(db)
}

/// Parse DBC content held in memory
///
/// Non-UTF-8 content is decoded as Latin-1, which covers the Windows-1252
/// files most tools still emit.
pub fn parse_dbc(name: &str, bytes: &[u8]) -> std::result::Result<NetworkDatabase, String> {
    let content = match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            log::warn!("DBC file {} is not UTF-8, trying Latin-1 encoding", name);
            bytes.iter().map(|&b| b as char).collect()
        }
    };

    let dbc = DBC::from_slice(content.as_bytes()).map_err(|e| format!("{:?}", e))?;

    let nodes = dbc
        .nodes()
        .iter()
        .flat_map(|node| node.0.iter())
        .map(|name| Node::new(name.as_str()))
        .collect();

    let messages = dbc
        .messages()
        .iter()
        .map(|dbc_msg| convert_message(&dbc, dbc_msg))
        .collect();

    Ok(NetworkDatabase {
        name: name.to_string(),
        nodes,
        messages,
    })
}

/// Convert a can-dbc message to our Message
fn convert_message(dbc: &DBC, dbc_msg: &can_dbc::Message) -> Message {
    let raw_id = dbc_msg.message_id().0;
    let is_extended = raw_id & EXTENDED_ID_FLAG != 0;
    let frame_id = if is_extended {
        raw_id & EXTENDED_ID_MASK
    } else {
        raw_id
    };

    log::debug!("Converting message {} (ID 0x{:X})", dbc_msg.message_name(), frame_id);

    let senders = match dbc_msg.transmitter() {
        can_dbc::Transmitter::NodeName(name) => vec![name.to_string()],
        _ => Vec::new(),
    };

    let signals = dbc_msg
        .signals()
        .iter()
        .map(|dbc_sig| convert_signal(dbc, raw_id, dbc_sig))
        .collect();

    Message {
        name: dbc_msg.message_name().to_string(),
        frame_id,
        length: *dbc_msg.message_size() as usize,
        is_extended,
        senders,
        cycle_time: message_attribute(dbc, raw_id, ATTR_CYCLE_TIME)
            .and_then(attribute_as_f64)
            .map(|ms| ms as u32),
        send_type: message_attribute(dbc, raw_id, ATTR_SEND_TYPE).map(attribute_as_text),
        comment: dbc
            .message_comment(can_dbc::MessageId(raw_id))
            .map(str::to_string),
        signals,
    }
}

/// Convert a can-dbc signal to our Signal
fn convert_signal(dbc: &DBC, raw_id: u32, dbc_sig: &can_dbc::Signal) -> Signal {
    let name = dbc_sig.name();

    let byte_order = match *dbc_sig.byte_order() {
        can_dbc::ByteOrder::LittleEndian => ByteOrder::LittleEndian,
        can_dbc::ByteOrder::BigEndian => ByteOrder::BigEndian,
    };

    let choices = dbc
        .value_descriptions_for_signal(can_dbc::MessageId(raw_id), name)
        .map(|descriptions| {
            descriptions
                .iter()
                .map(|desc| (*desc.a() as i64, desc.b().to_string()))
                .collect::<Vec<_>>()
        })
        .map(ChoiceTable::from)
        .unwrap_or_default();

    Signal {
        name: name.to_string(),
        start_bit: *dbc_sig.start_bit() as u32,
        length: *dbc_sig.signal_size() as u32,
        byte_order,
        is_signed: matches!(*dbc_sig.value_type(), can_dbc::ValueType::Signed),
        scale: *dbc_sig.factor(),
        offset: *dbc_sig.offset(),
        minimum: Some(*dbc_sig.min()),
        maximum: Some(*dbc_sig.max()),
        raw_initial: signal_attribute(dbc, raw_id, name, ATTR_START_VALUE)
            .and_then(attribute_as_f64),
        raw_invalid: signal_attribute(dbc, raw_id, name, ATTR_INVALID_VALUE)
            .and_then(attribute_as_f64),
        unit: dbc_sig.unit().to_string(),
        choices,
        // Vector__XXX is the DBC placeholder for "no receiver"
        receivers: dbc_sig
            .receivers()
            .iter()
            .filter(|r| r.as_str() != "Vector__XXX")
            .cloned()
            .collect(),
        comment: dbc
            .signal_comment(can_dbc::MessageId(raw_id), name)
            .map(str::to_string),
    }
}

/// Message attribute value, falling back to the attribute default
fn message_attribute<'a>(dbc: &'a DBC, raw_id: u32, attribute: &str) -> Option<&'a AttributeValue> {
    dbc.attribute_values()
        .iter()
        .filter(|value| value.attribute_name() == attribute)
        .find_map(|value| match value.attribute_value() {
            AttributeValuedForObjectType::MessageDefinitionAttributeValue(id, Some(v))
                if id.0 == raw_id =>
            {
                Some(v)
            }
            _ => None,
        })
        .or_else(|| attribute_default(dbc, attribute))
}

/// Signal attribute value, falling back to the attribute default
fn signal_attribute<'a>(
    dbc: &'a DBC,
    raw_id: u32,
    signal: &str,
    attribute: &str,
) -> Option<&'a AttributeValue> {
    dbc.attribute_values()
        .iter()
        .filter(|value| value.attribute_name() == attribute)
        .find_map(|value| match value.attribute_value() {
            AttributeValuedForObjectType::SignalAttributeValue(id, name, v)
                if id.0 == raw_id && name == signal =>
            {
                Some(v)
            }
            _ => None,
        })
        .or_else(|| attribute_default(dbc, attribute))
}

fn attribute_default<'a>(dbc: &'a DBC, attribute: &str) -> Option<&'a AttributeValue> {
    dbc.attribute_defaults()
        .iter()
        .find(|default| default.attribute_name() == attribute)
        .map(|default| default.attribute_value())
}

fn attribute_as_f64(value: &AttributeValue) -> Option<f64> {
    match value {
        AttributeValue::AttributeValueU64(v) => Some(*v as f64),
        AttributeValue::AttributeValueI64(v) => Some(*v as f64),
        AttributeValue::AttributeValueF64(v) => Some(*v),
        AttributeValue::AttributeValueCharString(s) => s.trim().parse().ok(),
    }
}

fn attribute_as_text(value: &AttributeValue) -> String {
    match value {
        AttributeValue::AttributeValueU64(v) => v.to_string(),
        AttributeValue::AttributeValueI64(v) => v.to_string(),
        AttributeValue::AttributeValueF64(v) => v.to_string(),
        AttributeValue::AttributeValueCharString(s) => s.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const BODY_DBC: &str = r#"
VERSION ""

NS_ :
    CM_
    BA_DEF_
    BA_
    VAL_
    BA_DEF_DEF_

BS_:

BU_: BCM GW IPK

BO_ 291 Speed_Status: 8 BCM
 SG_ VehicleSpeed : 0|16@1+ (0.01,0) [0|320] "km/h" GW,IPK
 SG_ LampState : 16|2@1+ (1,0) [0|3] "" IPK

BO_ 2147484160 Diag_Ext: 8 GW
 SG_ DiagByte : 0|8@0- (1,-10) [-10|245] "" BCM

CM_ BO_ 291 "Vehicle speed frame";
CM_ SG_ 291 VehicleSpeed "Speed over ground";
BA_DEF_ BO_ "GenMsgCycleTime" INT 0 10000;
BA_DEF_ SG_ "GenSigStartValue" INT 0 65535;
BA_DEF_DEF_ "GenMsgCycleTime" 0;
BA_DEF_DEF_ "GenSigStartValue" 0;
BA_ "GenMsgCycleTime" BO_ 291 100;
BA_ "GenSigStartValue" SG_ 291 LampState 1;
VAL_ 291 LampState 0 "Off" 1 "On" ;
"#;

    fn write_dbc(content: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();
        temp_file.flush().unwrap();
        temp_file
    }

    #[test]
    fn test_parse_nodes_and_messages() {
        let db = parse_dbc("body.dbc", BODY_DBC.as_bytes()).unwrap();

        assert_eq!(db.name, "body.dbc");
        let nodes: Vec<_> = db.nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(nodes, vec!["BCM", "GW", "IPK"]);
        assert_eq!(db.messages.len(), 2);

        let msg = &db.messages[0];
        assert_eq!(msg.name, "Speed_Status");
        assert_eq!(msg.frame_id, 0x123);
        assert!(!msg.is_extended);
        assert_eq!(msg.length, 8);
        assert_eq!(msg.senders, vec!["BCM".to_string()]);
        assert_eq!(msg.comment.as_deref(), Some("Vehicle speed frame"));
        assert_eq!(msg.cycle_time, Some(100));

        let speed = &msg.signals[0];
        assert_eq!(speed.name, "VehicleSpeed");
        assert_eq!(speed.length, 16);
        assert_eq!(speed.scale, 0.01);
        assert_eq!(speed.unit, "km/h");
        assert_eq!(speed.maximum, Some(320.0));
        assert_eq!(speed.receivers, vec!["GW".to_string(), "IPK".to_string()]);
        assert_eq!(speed.comment.as_deref(), Some("Speed over ground"));
    }

    #[test]
    fn test_value_descriptions_and_start_value() {
        let db = parse_dbc("body.dbc", BODY_DBC.as_bytes()).unwrap();
        let lamp = db.messages[0]
            .signals
            .iter()
            .find(|s| s.name == "LampState")
            .unwrap();

        assert_eq!(lamp.choices.label(0), Some("Off"));
        assert_eq!(lamp.choices.label(1), Some("On"));
        assert_eq!(lamp.raw_initial, Some(1.0));
    }

    #[test]
    fn test_extended_id_and_signed_big_endian() {
        let db = parse_dbc("body.dbc", BODY_DBC.as_bytes()).unwrap();
        let diag = &db.messages[1];

        assert!(diag.is_extended);
        assert_eq!(diag.frame_id, 0x200);
        assert_eq!(diag.cycle_time, Some(0));

        let sig = &diag.signals[0];
        assert!(sig.is_signed);
        assert_eq!(sig.byte_order, ByteOrder::BigEndian);
        assert_eq!(sig.offset, -10.0);
        assert!(sig.choices.is_empty());
        assert_eq!(sig.comment, None);
    }

    #[test]
    fn test_load_dbc_file_uses_file_name() {
        let temp_file = write_dbc(BODY_DBC);
        let db = load_dbc_file(temp_file.path()).unwrap();

        let expected = temp_file
            .path()
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap()
            .to_string();
        assert_eq!(db.name, expected);
        assert_eq!(db.stats().num_signals, 3);
    }

    #[test]
    fn test_missing_file_is_parse_error() {
        let result = load_dbc_file(Path::new("/nonexistent/dir/none.dbc"));
        assert!(matches!(result, Err(MatrixError::DbcParse { .. })));
    }
}
