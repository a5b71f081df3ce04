//! Tagged-field protobuf message builder and decoder.
//!
//! The Play backend speaks binary protobuf, but the client only ever needs
//! "set field N to a typed value" and "get field N as a typed value". This
//! module provides exactly that, with no generated code and no schema files.
//! Field numbers live with the callers; this layer is pure wire format.

const WIRE_VARINT: u8 = 0;
const WIRE_FIXED64: u8 = 1;
const WIRE_BYTES: u8 = 2;
const WIRE_FIXED32: u8 = 5;

/// A single typed field value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Varint(u64),
    Fixed64(u64),
    /// Strings and nested messages share wire type 2. Decoded fields are kept
    /// as raw bytes and reinterpreted by the typed getters.
    Bytes(Vec<u8>),
    Message(Message),
}

/// An ordered set of `(field number, value)` pairs.
///
/// Repeated fields are expressed by adding the same field number more than
/// once; wire order is preserved on both encode and decode.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Message {
    fields: Vec<(u32, Value)>,
}

impl Message {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_varint(&mut self, num: u32, value: u64) {
        self.fields.push((num, Value::Varint(value)));
    }

    pub fn add_fixed64(&mut self, num: u32, value: u64) {
        self.fields.push((num, Value::Fixed64(value)));
    }

    pub fn add_string(&mut self, num: u32, value: &str) {
        self.fields.push((num, Value::Bytes(value.as_bytes().to_vec())));
    }

    pub fn add_message(&mut self, num: u32, value: Message) {
        self.fields.push((num, Value::Message(value)));
    }

    /// First nested message under `num`, if any.
    pub fn get(&self, num: u32) -> Option<Message> {
        self.values(num).find_map(|value| match value {
            Value::Message(message) => Some(message.clone()),
            Value::Bytes(buf) => Message::decode(buf),
            _ => None,
        })
    }

    /// Every nested message under `num`, in wire order.
    pub fn get_messages(&self, num: u32) -> Vec<Message> {
        self.values(num)
            .filter_map(|value| match value {
                Value::Message(message) => Some(message.clone()),
                Value::Bytes(buf) => Message::decode(buf),
                _ => None,
            })
            .collect()
    }

    pub fn get_varint(&self, num: u32) -> Option<u64> {
        self.values(num).find_map(|value| match value {
            Value::Varint(varint) => Some(*varint),
            _ => None,
        })
    }

    pub fn get_fixed64(&self, num: u32) -> Option<u64> {
        self.values(num).find_map(|value| match value {
            Value::Fixed64(fixed) => Some(*fixed),
            _ => None,
        })
    }

    pub fn get_string(&self, num: u32) -> Option<String> {
        self.values(num).find_map(|value| match value {
            Value::Bytes(buf) => String::from_utf8(buf.clone()).ok(),
            _ => None,
        })
    }

    fn values(&self, num: u32) -> impl Iterator<Item = &Value> {
        self.fields
            .iter()
            .filter(move |(field, _)| *field == num)
            .map(|(_, value)| value)
    }

    /// Serialize to protobuf wire format.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        for (num, value) in &self.fields {
            match value {
                Value::Varint(varint) => {
                    put_tag(&mut buf, *num, WIRE_VARINT);
                    put_varint(&mut buf, *varint);
                }
                Value::Fixed64(fixed) => {
                    put_tag(&mut buf, *num, WIRE_FIXED64);
                    buf.extend_from_slice(&fixed.to_le_bytes());
                }
                Value::Bytes(bytes) => {
                    put_tag(&mut buf, *num, WIRE_BYTES);
                    put_varint(&mut buf, bytes.len() as u64);
                    buf.extend_from_slice(bytes);
                }
                Value::Message(message) => {
                    let bytes = message.encode();
                    put_tag(&mut buf, *num, WIRE_BYTES);
                    put_varint(&mut buf, bytes.len() as u64);
                    buf.extend_from_slice(&bytes);
                }
            }
        }
        buf
    }

    /// Parse protobuf wire format. Returns `None` on truncated or malformed
    /// input. Unknown fixed32 fields are skipped; everything else is kept.
    pub fn decode(buf: &[u8]) -> Option<Message> {
        let mut message = Message::new();
        let mut pos = 0;
        while pos < buf.len() {
            let tag = take_varint(buf, &mut pos)?;
            let num = u32::try_from(tag >> 3).ok()?;
            if num == 0 {
                return None;
            }
            match (tag & 7) as u8 {
                WIRE_VARINT => {
                    let varint = take_varint(buf, &mut pos)?;
                    message.add_varint(num, varint);
                }
                WIRE_FIXED64 => {
                    let bytes = take_bytes(buf, &mut pos, 8)?;
                    message.add_fixed64(num, u64::from_le_bytes(bytes.try_into().ok()?));
                }
                WIRE_BYTES => {
                    let len = take_varint(buf, &mut pos)?;
                    let bytes = take_bytes(buf, &mut pos, usize::try_from(len).ok()?)?;
                    message.fields.push((num, Value::Bytes(bytes.to_vec())));
                }
                WIRE_FIXED32 => {
                    take_bytes(buf, &mut pos, 4)?;
                }
                _ => return None,
            }
        }
        Some(message)
    }
}

fn put_tag(buf: &mut Vec<u8>, num: u32, wire: u8) {
    put_varint(buf, (u64::from(num) << 3) | u64::from(wire));
}

fn put_varint(buf: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        buf.push(value as u8 | 0x80);
        value >>= 7;
    }
    buf.push(value as u8);
}

fn take_varint(buf: &[u8], pos: &mut usize) -> Option<u64> {
    let mut value: u64 = 0;
    for shift in (0..64).step_by(7) {
        let byte = *buf.get(*pos)?;
        *pos += 1;
        value |= u64::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            return Some(value);
        }
    }
    None
}

fn take_bytes<'a>(buf: &'a [u8], pos: &mut usize, len: usize) -> Option<&'a [u8]> {
    let bytes = buf.get(*pos..pos.checked_add(len)?)?;
    *pos += len;
    Some(bytes)
}

#[cfg(test)]
mod tests {
    use super::Message;

    #[test]
    fn varint_round_trip() {
        let mut message = Message::new();
        message.add_varint(1, 0);
        message.add_varint(2, 127);
        message.add_varint(3, 128);
        message.add_varint(4, 0x0003_0001);
        message.add_varint(5, u64::MAX);

        let decoded = Message::decode(&message.encode()).unwrap();
        assert_eq!(decoded.get_varint(1), Some(0));
        assert_eq!(decoded.get_varint(2), Some(127));
        assert_eq!(decoded.get_varint(3), Some(128));
        assert_eq!(decoded.get_varint(4), Some(0x0003_0001));
        assert_eq!(decoded.get_varint(5), Some(u64::MAX));
    }

    #[test]
    fn fixed64_round_trip() {
        let mut message = Message::new();
        message.add_fixed64(7, 0x3f1c_55a0_9e84_d210);

        let decoded = Message::decode(&message.encode()).unwrap();
        assert_eq!(decoded.get_fixed64(7), Some(0x3f1c_55a0_9e84_d210));
        assert_eq!(decoded.get_fixed64(8), None);
    }

    #[test]
    fn nested_messages() {
        let mut inner = Message::new();
        inner.add_string(1, "android.hardware.wifi");
        let mut outer = Message::new();
        outer.add_message(26, inner);
        outer.add_string(9, "global-miui11-empty.jar");

        let decoded = Message::decode(&outer.encode()).unwrap();
        assert_eq!(decoded.get_string(9).as_deref(), Some("global-miui11-empty.jar"));
        let nested = decoded.get(26).unwrap();
        assert_eq!(nested.get_string(1).as_deref(), Some("android.hardware.wifi"));
    }

    #[test]
    fn repeated_fields_preserve_order() {
        let mut message = Message::new();
        for name in ["base", "config.en", "config.xhdpi"] {
            let mut split = Message::new();
            split.add_string(1, name);
            message.add_message(15, split);
        }

        let decoded = Message::decode(&message.encode()).unwrap();
        let names: Vec<String> = decoded
            .get_messages(15)
            .iter()
            .filter_map(|split| split.get_string(1))
            .collect();
        assert_eq!(names, ["base", "config.en", "config.xhdpi"]);
    }

    #[test]
    fn truncated_input_is_rejected() {
        let mut message = Message::new();
        message.add_string(2, "org.videolan.vlc");
        let buf = message.encode();
        assert!(Message::decode(&buf[..buf.len() - 1]).is_none());
    }
}
