//! Minimal JUMBF (ISO/IEC 19566-5) box pack/unpack.
//!
//! The full JUMBF box model is out of scope here: trust stores, certificate
//! handling, and general asset I/O are external collaborators. This crate
//! only needs one shape: a superbox containing a description box that
//! labels the content as a C2PA manifest store, and a single content box
//! carrying the COSE_Sign1 bytes.

use crate::error::{Error, Result};

const SUPERBOX_TYPE: &[u8; 4] = b"jumb";
const DESC_BOX_TYPE: &[u8; 4] = b"jumd";
const CONTENT_BOX_TYPE: &[u8; 4] = b"c2cb";

/// C2PA manifest store UUID per the description box `jumd` payload
/// (ISO/IEC 19566-5).
pub const C2PA_MANIFEST_STORE_UUID: [u8; 16] = [
    0x63, 0x32, 0x70, 0x61, 0x00, 0x11, 0x00, 0x10, 0x80, 0x00, 0x00, 0xAA, 0x00, 0x38, 0x9B, 0x71,
];

fn box_with_header(box_type: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let size = (8 + payload.len()) as u32;
    let mut out = Vec::with_capacity(size as usize);
    out.extend_from_slice(&size.to_be_bytes());
    out.extend_from_slice(box_type);
    out.extend_from_slice(payload);
    out
}

/// Pack COSE_Sign1 bytes into a single-box JUMBF manifest store.
pub fn pack(cose_bytes: &[u8]) -> Vec<u8> {
    let mut desc_payload = Vec::with_capacity(16 + 1 + 5);
    desc_payload.extend_from_slice(&C2PA_MANIFEST_STORE_UUID);
    desc_payload.push(0x00); // toggles: no private fields, no requestable
    desc_payload.extend_from_slice(b"c2pa\0"); // label, NUL-terminated

    let desc_box = box_with_header(DESC_BOX_TYPE, &desc_payload);
    let content_box = box_with_header(CONTENT_BOX_TYPE, cose_bytes);

    let mut superbox_payload = Vec::with_capacity(desc_box.len() + content_box.len());
    superbox_payload.extend_from_slice(&desc_box);
    superbox_payload.extend_from_slice(&content_box);

    box_with_header(SUPERBOX_TYPE, &superbox_payload)
}

struct BoxHeader<'a> {
    box_type: &'a [u8],
    payload: &'a [u8],
    total_len: usize,
}

fn read_box(bytes: &[u8]) -> Result<BoxHeader<'_>> {
    if bytes.len() < 8 {
        return Err(Error::MalformedEnvelope(
            "JUMBF box too short for header".to_string(),
        ));
    }
    let size = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
    if size < 8 || size > bytes.len() {
        return Err(Error::MalformedEnvelope(format!(
            "JUMBF box declares size {size}, have {}",
            bytes.len()
        )));
    }
    Ok(BoxHeader {
        box_type: &bytes[4..8],
        payload: &bytes[8..size],
        total_len: size,
    })
}

/// Unpack a JUMBF manifest store and return the COSE_Sign1 bytes it carries.
pub fn unpack(bytes: &[u8]) -> Result<Vec<u8>> {
    let outer = read_box(bytes)?;
    if outer.box_type != SUPERBOX_TYPE {
        return Err(Error::MalformedEnvelope(
            "expected JUMBF superbox 'jumb'".to_string(),
        ));
    }

    let desc = read_box(outer.payload)?;
    if desc.box_type != DESC_BOX_TYPE {
        return Err(Error::MalformedEnvelope(
            "expected JUMBF description box 'jumd'".to_string(),
        ));
    }
    if desc.payload.len() < 16 || desc.payload[0..16] != C2PA_MANIFEST_STORE_UUID {
        return Err(Error::MalformedEnvelope(
            "JUMBF description box has unexpected UUID".to_string(),
        ));
    }

    let rest = &outer.payload[desc.total_len..];
    let content = read_box(rest)?;
    if content.box_type != CONTENT_BOX_TYPE {
        return Err(Error::MalformedEnvelope(
            "expected JUMBF content box 'c2cb'".to_string(),
        ));
    }
    Ok(content.payload.to_vec())
}
