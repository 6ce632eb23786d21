//! A single typed key/value entry in a jmzk-Link's segment map. The key
//! range selects the wire encoding (§4.3): `[1,20]` one byte, `[21,40]`
//! big-endian u16, `[41,90]` big-endian u32, `[91,155]` length-prefixed
//! string, `[156,165]` a bare 16 bytes (UUID-sized), `[166,180]` a
//! length-prefixed binary blob.

use jmzk_chain_core::JmzkError;

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum SegmentValue {
    U8(u8),
    U16(u16),
    U32(u32),
    Str(String),
    Uuid([u8; 16]),
    Bytes(Vec<u8>),
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Segment {
    pub key: u8,
    pub value: SegmentValue,
}

impl Segment {
    pub fn new(key: u8, value: SegmentValue) -> Result<Self, JmzkError> {
        Self::validate_key_value(key, &value)?;
        Ok(Segment { key, value })
    }

    fn validate_key_value(key: u8, value: &SegmentValue) -> Result<(), JmzkError> {
        let ok = match key {
            1..=20 => matches!(value, SegmentValue::U8(_)),
            21..=40 => matches!(value, SegmentValue::U16(_)),
            41..=90 => matches!(value, SegmentValue::U32(_)),
            91..=155 => matches!(value, SegmentValue::Str(_)),
            156..=165 => matches!(value, SegmentValue::Uuid(_)),
            166..=180 => matches!(value, SegmentValue::Bytes(_)),
            _ => false,
        };
        if !ok {
            return Err(JmzkError::JmzkLinkException(format!(
                "segment key {key} does not match its value's wire type"
            )));
        }
        Ok(())
    }

    pub fn encode(&self, out: &mut Vec<u8>) -> Result<(), JmzkError> {
        out.push(self.key);
        match &self.value {
            SegmentValue::U8(v) => out.push(*v),
            SegmentValue::U16(v) => out.extend_from_slice(&v.to_be_bytes()),
            SegmentValue::U32(v) => out.extend_from_slice(&v.to_be_bytes()),
            SegmentValue::Str(s) => {
                if s.len() > 255 {
                    return Err(JmzkError::JmzkLinkException("segment string too long".into()));
                }
                out.push(s.len() as u8);
                out.extend_from_slice(s.as_bytes());
            }
            SegmentValue::Uuid(b) => out.extend_from_slice(b),
            SegmentValue::Bytes(b) => {
                if b.len() > 255 {
                    return Err(JmzkError::JmzkLinkException("segment blob too long".into()));
                }
                out.push(b.len() as u8);
                out.extend_from_slice(b);
            }
        }
        Ok(())
    }

    /// Well-known segment keys used by `everipass`/`everipay` (§4.11).
    pub const KEY_VERSION: u8 = 1;
    pub const KEY_TYPE: u8 = 2;
    pub const KEY_TIMESTAMP: u8 = 42;
    pub const KEY_MAX_PAY: u8 = 43;
    pub const KEY_SYMBOL_ID: u8 = 44;
    pub const KEY_DOMAIN: u8 = 91;
    pub const KEY_TOKEN: u8 = 92;
    pub const KEY_FIXED_AMOUNT_STR: u8 = 93;
    pub const KEY_MAX_PAY_STR: u8 = 94;
    pub const KEY_LINK_ID: u8 = 156;
    pub const KEY_FIXED_AMOUNT: u8 = 45;
}
