//! Builds small ZIP images in memory for integration tests.
#![allow(dead_code)]

use std::io::Write;

use flate2::Compression;
use flate2::write::DeflateEncoder;

pub const SAMPLE: &[u8] = include_bytes!("../../assets/test.zip");
pub const SAMPLE_TEXT: &[u8] = b"Hello, ESP32!\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Stored,
    Deflate,
}

/// One entry as it will be written; the overrides let tests lie in the headers.
pub struct TestEntry {
    pub name: String,
    pub data: Vec<u8>,
    pub method: Method,
    pub flags: u16,
    pub method_id: Option<u16>,
    pub crc_override: Option<u32>,
    pub size_override: Option<u32>,
}

impl TestEntry {
    pub fn new(name: &str, data: &[u8], method: Method) -> Self {
        Self {
            name: name.to_string(),
            data: data.to_vec(),
            method,
            flags: 0,
            method_id: None,
            crc_override: None,
            size_override: None,
        }
    }

    pub fn flags(mut self, flags: u16) -> Self {
        self.flags = flags;
        self
    }

    pub fn method_id(mut self, id: u16) -> Self {
        self.method_id = Some(id);
        self
    }

    pub fn crc(mut self, crc: u32) -> Self {
        self.crc_override = Some(crc);
        self
    }

    pub fn declared_size(mut self, size: u32) -> Self {
        self.size_override = Some(size);
        self
    }
}

#[derive(Default)]
pub struct ZipBuilder {
    entries: Vec<TestEntry>,
    comment: Vec<u8>,
}

impl ZipBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stored(self, name: &str, data: &[u8]) -> Self {
        self.entry(TestEntry::new(name, data, Method::Stored))
    }

    pub fn deflated(self, name: &str, data: &[u8]) -> Self {
        self.entry(TestEntry::new(name, data, Method::Deflate))
    }

    pub fn entry(mut self, entry: TestEntry) -> Self {
        self.entries.push(entry);
        self
    }

    pub fn comment(mut self, comment: &[u8]) -> Self {
        self.comment = comment.to_vec();
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut zip = Vec::new();
        let mut central = Vec::new();

        for entry in &self.entries {
            let payload = match entry.method {
                Method::Stored => entry.data.clone(),
                Method::Deflate => deflate(&entry.data),
            };
            let method = entry.method_id.unwrap_or(match entry.method {
                Method::Stored => 0,
                Method::Deflate => 8,
            });
            let crc = entry
                .crc_override
                .unwrap_or_else(|| crc32fast::hash(&entry.data));
            let size = entry.size_override.unwrap_or(entry.data.len() as u32);
            let offset = zip.len() as u32;

            // local file header
            zip.extend_from_slice(b"PK\x03\x04");
            put_u16(&mut zip, 20);
            put_u16(&mut zip, entry.flags);
            put_u16(&mut zip, method);
            put_u16(&mut zip, 0x6000); // 12:00
            put_u16(&mut zip, 0x5953); // 2024-10-19
            put_u32(&mut zip, crc);
            put_u32(&mut zip, payload.len() as u32);
            put_u32(&mut zip, size);
            put_u16(&mut zip, entry.name.len() as u16);
            put_u16(&mut zip, 0);
            zip.extend_from_slice(entry.name.as_bytes());
            zip.extend_from_slice(&payload);

            // central directory header
            central.extend_from_slice(b"PK\x01\x02");
            put_u16(&mut central, 20);
            put_u16(&mut central, 20);
            put_u16(&mut central, entry.flags);
            put_u16(&mut central, method);
            put_u16(&mut central, 0x6000);
            put_u16(&mut central, 0x5953);
            put_u32(&mut central, crc);
            put_u32(&mut central, payload.len() as u32);
            put_u32(&mut central, size);
            put_u16(&mut central, entry.name.len() as u16);
            put_u16(&mut central, 0);
            put_u16(&mut central, 0);
            put_u16(&mut central, 0);
            put_u16(&mut central, 0);
            put_u32(&mut central, 0);
            put_u32(&mut central, offset);
            central.extend_from_slice(entry.name.as_bytes());
        }

        let cd_offset = zip.len() as u32;
        zip.extend_from_slice(&central);

        zip.extend_from_slice(b"PK\x05\x06");
        put_u16(&mut zip, 0);
        put_u16(&mut zip, 0);
        put_u16(&mut zip, self.entries.len() as u16);
        put_u16(&mut zip, self.entries.len() as u16);
        put_u32(&mut zip, central.len() as u32);
        put_u32(&mut zip, cd_offset);
        put_u16(&mut zip, self.comment.len() as u16);
        zip.extend_from_slice(&self.comment);
        zip
    }
}

/// Raw DEFLATE stream for `data`, as a ZIP writer would store it.
pub fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).expect("deflate into Vec");
    encoder.finish().expect("finish deflate stream")
}

/// Deterministic, mildly compressible bytes.
pub fn patterned(len: usize) -> Vec<u8> {
    let mut state = 0x2545_f491u32;
    (0..len)
        .map(|i| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            if i % 7 == 0 {
                (state & 0xff) as u8
            } else {
                b'a' + (i % 23) as u8
            }
        })
        .collect()
}

fn put_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn put_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}
