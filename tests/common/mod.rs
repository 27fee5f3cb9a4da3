#![allow(dead_code)]

use aurora_rs::ResourceType;

fn put_u32(data: &mut Vec<u8>, value: usize) {
    data.extend_from_slice(&(value as u32).to_le_bytes());
}

fn put_resref(data: &mut Vec<u8>, name: &str) {
    let mut resref = [0u8; 16];
    resref[..name.len()].copy_from_slice(name.as_bytes());
    data.extend_from_slice(&resref);
}

/// A KEY file. `keys` holds name, kind, data file index and position inside that data file.
pub fn build_key(files: &[&str], keys: &[(&str, ResourceType, usize, usize)]) -> Vec<u8> {
    let offset_to_files = 64;
    let names_start = offset_to_files + files.len() * 12;
    let names_len: usize = files.iter().map(|f| f.len() + 1).sum();
    let offset_to_keys = names_start + names_len;

    let mut data = b"KEY V1  ".to_vec();
    for value in [files.len(), keys.len(), offset_to_files, offset_to_keys, 2003, 190] {
        put_u32(&mut data, value);
    }
    data.resize(offset_to_files, 0);

    let mut name_offset = names_start;
    for file in files {
        put_u32(&mut data, 0);
        put_u32(&mut data, name_offset);
        data.extend_from_slice(&((file.len() + 1) as u16).to_le_bytes());
        data.extend_from_slice(&1u16.to_le_bytes());
        name_offset += file.len() + 1;
    }
    for file in files {
        data.extend_from_slice(file.as_bytes());
        data.push(0);
    }
    for (name, kind, bif, index) in keys {
        put_resref(&mut data, name);
        data.extend_from_slice(&kind.id().to_le_bytes());
        put_u32(&mut data, (bif << 20) | index);
    }
    data
}

pub fn build_bif(payloads: &[(ResourceType, &[u8])]) -> Vec<u8> {
    let mut data = b"BIFFV1  ".to_vec();
    put_u32(&mut data, payloads.len());
    put_u32(&mut data, 0);
    put_u32(&mut data, 20);

    let mut offset = 20 + payloads.len() * 16;
    for (i, (kind, payload)) in payloads.iter().enumerate() {
        for value in [i, offset, payload.len(), kind.id() as usize] {
            put_u32(&mut data, value);
        }
        offset += payload.len();
    }
    for (_, payload) in payloads {
        data.extend_from_slice(payload);
    }
    data
}

/// An ERF style archive with the given eight byte signature, e.g. `b"MOD V1.0"`.
pub fn build_erf(signature: &[u8; 8], entries: &[(&str, ResourceType, &[u8])]) -> Vec<u8> {
    let offset_to_keys = 160;
    let offset_to_resources = offset_to_keys + entries.len() * 24;

    let mut data = signature.to_vec();
    for value in [0, 0, entries.len(), offset_to_keys, offset_to_keys, offset_to_resources, 103, 1] {
        put_u32(&mut data, value);
    }
    data.extend_from_slice(&u32::MAX.to_le_bytes());
    data.resize(offset_to_keys, 0);

    for (i, (name, kind, _)) in entries.iter().enumerate() {
        put_resref(&mut data, name);
        put_u32(&mut data, i);
        data.extend_from_slice(&kind.id().to_le_bytes());
        data.extend_from_slice(&[0, 0]);
    }
    let mut offset = offset_to_resources + entries.len() * 8;
    for (_, _, payload) in entries {
        put_u32(&mut data, offset);
        put_u32(&mut data, payload.len());
        offset += payload.len();
    }
    for (_, _, payload) in entries {
        data.extend_from_slice(payload);
    }
    data
}

pub fn build_rim(entries: &[(&str, ResourceType, &[u8])]) -> Vec<u8> {
    let offset_to_resources = 120;
    let mut data = b"RIM V1.0".to_vec();
    put_u32(&mut data, 0);
    put_u32(&mut data, entries.len());
    put_u32(&mut data, offset_to_resources);
    data.resize(offset_to_resources, 0);

    let mut offset = offset_to_resources + entries.len() * 32;
    for (i, (name, kind, payload)) in entries.iter().enumerate() {
        put_resref(&mut data, name);
        put_u32(&mut data, kind.id() as usize);
        put_u32(&mut data, i);
        put_u32(&mut data, offset);
        put_u32(&mut data, payload.len());
        offset += payload.len();
    }
    for (_, _, payload) in entries {
        data.extend_from_slice(payload);
    }
    data
}

/// A binary 2DA. Every cell is stored once, without interning.
pub fn build_2da(columns: &[&str], rows: &[&[&str]]) -> Vec<u8> {
    let mut data = b"2DA V2.b\n".to_vec();
    for column in columns {
        data.extend_from_slice(column.as_bytes());
        data.push(b'\t');
    }
    data.push(0);
    put_u32(&mut data, rows.len());
    for i in 0..rows.len() {
        data.extend_from_slice(i.to_string().as_bytes());
        data.push(b'\t');
    }

    let mut blob = vec![];
    for cell in rows.iter().flat_map(|row| row.iter()) {
        data.extend_from_slice(&(blob.len() as u16).to_le_bytes());
        blob.extend_from_slice(cell.as_bytes());
        blob.push(0);
    }
    data.extend_from_slice(&(blob.len() as u16).to_le_bytes());
    data.extend_from_slice(&blob);
    data
}
