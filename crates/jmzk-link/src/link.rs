//! The jmzk-Link itself: header flags, an ordered segment map, and a set
//! of detached recoverable signatures (§4.3).

use std::collections::BTreeMap;

use jmzk_chain_core::{JmzkError, PublicKeyBytes, RecoverableSignature};
use jmzk_crypto::keypair::KeyPair;

use crate::base42;
use crate::segment::{Segment, SegmentValue};

const URI_SCHEMA: &str = "https://jmzk.li/";
const URI_SCHEMA2: &str = "jmzklink://";
const MAX_URI_LEN: usize = 400;
const MIN_URI_LEN: usize = 20;

pub const FLAG_VERSION1: u16 = 1 << 0;
pub const FLAG_EVERIPASS: u16 = 1 << 1;
pub const FLAG_EVERIPAY: u16 = 1 << 2;
pub const FLAG_DESTROY: u16 = 1 << 3;

#[derive(Clone, PartialEq, Debug, Default)]
pub struct JmzkLink {
    header: u16,
    segments: BTreeMap<u8, Segment>,
    signatures: Vec<RecoverableSignature>,
}

impl JmzkLink {
    pub fn new(header: u16) -> Self {
        JmzkLink { header, segments: BTreeMap::new(), signatures: Vec::new() }
    }

    pub fn header(&self) -> u16 {
        self.header
    }

    pub fn set_header(&mut self, header: u16) {
        self.header = header;
    }

    /// Replaces-or-inserts by key; the map stays in ascending-key order so
    /// the wire form and in-memory iteration order always agree.
    pub fn add_segment(&mut self, seg: Segment) {
        self.segments.insert(seg.key, seg);
    }

    pub fn remove_segment(&mut self, key: u8) {
        self.segments.remove(&key);
    }

    pub fn has_segment(&self, key: u8) -> bool {
        self.segments.contains_key(&key)
    }

    pub fn get_segment(&self, key: u8) -> Result<&Segment, JmzkError> {
        self.segments
            .get(&key)
            .ok_or_else(|| JmzkError::JmzkLinkException(format!("no segment for key {key}")))
    }

    pub fn signatures(&self) -> &[RecoverableSignature] {
        &self.signatures
    }

    pub fn clear_signatures(&mut self) {
        self.signatures.clear();
    }

    pub fn add_signature(&mut self, sig: RecoverableSignature) {
        self.signatures.push(sig);
    }

    pub fn sign(&mut self, keypair: &KeyPair) -> Result<(), JmzkError> {
        let digest = self.digest()?;
        let sig = keypair
            .sign_prehash(&digest)
            .map_err(|e| JmzkError::JmzkLinkException(e.to_string()))?;
        self.signatures.push(sig);
        Ok(())
    }

    fn encode_segments_bytes(&self) -> Result<Vec<u8>, JmzkError> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.header.to_be_bytes());
        for seg in self.segments.values() {
            seg.encode(&mut out)?;
        }
        Ok(out)
    }

    fn encode_signatures_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.signatures.len() * 65);
        for sig in &self.signatures {
            out.extend_from_slice(&sig.0);
        }
        out
    }

    /// `SHA-256` over the header + segment bytes only; signatures sign
    /// this, they are never folded into it themselves.
    pub fn digest(&self) -> Result<[u8; 32], JmzkError> {
        let bytes = self.encode_segments_bytes()?;
        Ok(jmzk_crypto::digest::sha256(&bytes))
    }

    /// Recover the public key behind each signature over this link's
    /// digest.
    pub fn restore_keys(&self) -> Result<Vec<PublicKeyBytes>, JmzkError> {
        let digest = self.digest()?;
        self.signatures
            .iter()
            .map(|sig| jmzk_crypto::recover_public_key(&digest, sig).map_err(|e| JmzkError::JmzkLinkException(e.to_string())))
            .collect()
    }

    pub fn to_uri_string(&self, with_prefix: bool) -> Result<String, JmzkError> {
        let mut out = String::new();
        if with_prefix {
            out.push_str(URI_SCHEMA);
        }
        out.push_str(&base42::encode(&self.encode_segments_bytes()?));
        if !self.signatures.is_empty() {
            out.push('_');
            out.push_str(&base42::encode(&self.encode_signatures_bytes()));
        }
        Ok(out)
    }

    pub fn parse(s: &str) -> Result<Self, JmzkError> {
        if s.len() >= MAX_URI_LEN {
            return Err(JmzkError::JmzkLinkException("link too long, max length 400".into()));
        }
        if s.len() <= MIN_URI_LEN {
            return Err(JmzkError::JmzkLinkException("link too short".into()));
        }

        let start = if s.starts_with(URI_SCHEMA) {
            URI_SCHEMA.len()
        } else if s.starts_with(URI_SCHEMA2) {
            URI_SCHEMA2.len()
        } else {
            0
        };

        let rest = &s[start..];
        let (segs_part, sigs_part) = match rest.find('_') {
            Some(idx) => (&rest[..idx], Some(&rest[idx + 1..])),
            None => (rest, None),
        };

        let segs_bytes = base42::decode(segs_part)?;
        let (header, segments) = parse_segments_bytes(&segs_bytes)?;

        let signatures = match sigs_part {
            Some(p) => parse_signatures_bytes(&base42::decode(p)?)?,
            None => Vec::new(),
        };

        Ok(JmzkLink { header, segments, signatures })
    }
}

fn parse_segments_bytes(b: &[u8]) -> Result<(u16, BTreeMap<u8, Segment>), JmzkError> {
    if b.len() < 3 {
        return Err(JmzkError::JmzkLinkException("segment bytes too short".into()));
    }
    let header = u16::from_be_bytes([b[0], b[1]]);

    let mut segments = BTreeMap::new();
    let mut i = 2usize;
    let mut last_key: Option<u8> = None;
    while i < b.len() {
        let key = b[i];
        if let Some(lk) = last_key {
            if key <= lk {
                return Err(JmzkError::JmzkLinkException("segments are not ordered by key".into()));
            }
        }
        last_key = Some(key);

        let value = match key {
            1..=20 => {
                require(b, i + 1)?;
                let v = SegmentValue::U8(b[i + 1]);
                i += 2;
                v
            }
            21..=40 => {
                require(b, i + 2)?;
                let v = SegmentValue::U16(u16::from_be_bytes([b[i + 1], b[i + 2]]));
                i += 3;
                v
            }
            41..=90 => {
                require(b, i + 4)?;
                let v = SegmentValue::U32(u32::from_be_bytes([b[i + 1], b[i + 2], b[i + 3], b[i + 4]]));
                i += 5;
                v
            }
            91..=155 => {
                require(b, i + 1)?;
                let len = b[i + 1] as usize;
                require(b, i + 1 + len)?;
                let s = String::from_utf8(b[i + 2..i + 2 + len].to_vec())
                    .map_err(|_| JmzkError::JmzkLinkException("invalid utf8 in segment string".into()))?;
                let v = SegmentValue::Str(s);
                i += 2 + len;
                v
            }
            156..=165 => {
                require(b, i + 16)?;
                let mut arr = [0u8; 16];
                arr.copy_from_slice(&b[i + 1..i + 17]);
                let v = SegmentValue::Uuid(arr);
                i += 17;
                v
            }
            166..=180 => {
                require(b, i + 1)?;
                let len = b[i + 1] as usize;
                require(b, i + 1 + len)?;
                let v = SegmentValue::Bytes(b[i + 2..i + 2 + len].to_vec());
                i += 2 + len;
                v
            }
            _ => return Err(JmzkError::JmzkLinkException(format!("invalid segment key type: {key}"))),
        };

        segments.insert(key, Segment { key, value });
    }

    Ok((header, segments))
}

fn require(b: &[u8], idx: usize) -> Result<(), JmzkError> {
    if b.len() > idx {
        Ok(())
    } else {
        Err(JmzkError::JmzkLinkException("truncated segment bytes".into()))
    }
}

fn parse_signatures_bytes(b: &[u8]) -> Result<Vec<RecoverableSignature>, JmzkError> {
    if b.is_empty() || b.len() % 65 != 0 {
        return Err(JmzkError::JmzkLinkException(
            "signature bytes must be a positive multiple of 65".into(),
        ));
    }
    let mut out = Vec::with_capacity(b.len() / 65);
    for chunk in b.chunks(65) {
        let mut arr = [0u8; 65];
        arr.copy_from_slice(chunk);
        out.push(RecoverableSignature(arr));
    }
    Ok(out)
}
