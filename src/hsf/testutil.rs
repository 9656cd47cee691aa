//! Assembles HSF images for tests.

use crate::data::ByteOrder;
use crate::data::parser_utils::ABSENT;
use crate::hsf::format::{HEADER_SIZE, SECTION_COUNT, Section};

/// Byte writer honouring the file's byte order.
pub struct Writer {
    order: ByteOrder,
    pub buf: Vec<u8>,
}

impl Writer {
    pub fn new(order: ByteOrder) -> Self {
        Self {
            order,
            buf: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    pub fn zeros(&mut self, n: usize) -> &mut Self {
        self.buf.resize(self.buf.len() + n, 0);
        self
    }

    pub fn u8(&mut self, v: u8) -> &mut Self {
        self.buf.push(v);
        self
    }

    pub fn u16(&mut self, v: u16) -> &mut Self {
        match self.order {
            ByteOrder::Big => self.bytes(&v.to_be_bytes()),
            ByteOrder::Little => self.bytes(&v.to_le_bytes()),
        }
    }

    pub fn i16(&mut self, v: i16) -> &mut Self {
        self.u16(v as u16)
    }

    pub fn u32(&mut self, v: u32) -> &mut Self {
        match self.order {
            ByteOrder::Big => self.bytes(&v.to_be_bytes()),
            ByteOrder::Little => self.bytes(&v.to_le_bytes()),
        }
    }

    pub fn i32(&mut self, v: i32) -> &mut Self {
        self.u32(v as u32)
    }

    pub fn f32(&mut self, v: f32) -> &mut Self {
        self.u32(v.to_bits())
    }

    pub fn absent(&mut self) -> &mut Self {
        self.u32(ABSENT)
    }

    pub fn transform(&mut self, pos: [f32; 3]) -> &mut Self {
        for v in pos {
            self.f32(v);
        }
        self.f32(0.0).f32(0.0).f32(0.0);
        self.f32(1.0).f32(1.0).f32(1.0)
    }
}

/// Object record fields; everything not set is absent or zero.
#[derive(Clone)]
pub struct ObjectSpec {
    pub name: u32,
    pub kind: u32,
    pub parent: u32,
    pub children_count: u32,
    pub children: u32,
    pub pos: [f32; 3],
    pub payload: [u32; 40],
    pub face: u32,
    pub vertex: u32,
    pub normal: u32,
    pub color: u32,
    pub texcoord: u32,
    pub material: u32,
    pub attribute: u32,
    pub vertex_shape_count: u32,
    pub vertex_shape: u32,
    pub cluster_count: u32,
    pub cluster: u32,
    pub envelope_count: u32,
    pub envelope: u32,
}

impl Default for ObjectSpec {
    fn default() -> Self {
        Self {
            name: 0,
            kind: 0,
            parent: ABSENT,
            children_count: 0,
            children: 0,
            pos: [0.0; 3],
            payload: [0; 40],
            face: ABSENT,
            vertex: ABSENT,
            normal: ABSENT,
            color: ABSENT,
            texcoord: ABSENT,
            material: ABSENT,
            attribute: ABSENT,
            vertex_shape_count: 0,
            vertex_shape: 0,
            cluster_count: 0,
            cluster: 0,
            envelope_count: 0,
            envelope: ABSENT,
        }
    }
}

impl ObjectSpec {
    pub fn write(&self, w: &mut Writer) {
        w.u32(self.name).u32(self.kind).u32(0).u32(0);
        w.u32(self.parent).u32(self.children_count).u32(self.children);
        w.transform(self.pos).transform(self.pos);
        for word in self.payload {
            w.u32(word);
        }
        w.u32(self.face)
            .u32(self.vertex)
            .u32(self.normal)
            .u32(self.color)
            .u32(self.texcoord)
            .u32(self.material)
            .u32(self.attribute);
        w.zeros(4);
        w.u32(self.vertex_shape_count).u32(self.vertex_shape);
        w.u32(self.cluster_count).u32(self.cluster);
        w.u32(self.envelope_count).u32(self.envelope);
        w.u32(0).u32(0);
    }
}

pub struct HsfBuilder {
    order: ByteOrder,
    version: [u8; 4],
    strings: Vec<u8>,
    symbols: Vec<u32>,
    sections: Vec<Option<(u32, Vec<u8>)>>,
}

impl HsfBuilder {
    pub fn new() -> Self {
        Self::with_order(ByteOrder::Big)
    }

    pub fn with_order(order: ByteOrder) -> Self {
        Self {
            order,
            version: *b"037\0",
            strings: Vec::new(),
            symbols: Vec::new(),
            sections: vec![None; SECTION_COUNT],
        }
    }

    pub fn writer(&self) -> Writer {
        Writer::new(self.order)
    }

    pub fn version(&mut self, version: [u8; 4]) -> &mut Self {
        self.version = version;
        self
    }

    /// Append a name to the string table and return its offset.
    pub fn name(&mut self, name: &str) -> u32 {
        self.raw_name(name.as_bytes())
    }

    pub fn raw_name(&mut self, name: &[u8]) -> u32 {
        let offset = self.strings.len() as u32;
        self.strings.extend_from_slice(name);
        self.strings.push(0);
        offset
    }

    /// Append symbol entries and return the index of the first one.
    pub fn symbols(&mut self, entries: &[u32]) -> u32 {
        let start = self.symbols.len() as u32;
        self.symbols.extend_from_slice(entries);
        start
    }

    /// Set a section's record array plus trailing payload.
    pub fn section(&mut self, section: Section, count: u32, body: Writer) -> &mut Self {
        self.sections[section as usize] = Some((count, body.buf));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut entries = [(0u32, 0u32); SECTION_COUNT];
        let mut body = vec![0u8; HEADER_SIZE];

        for section in Section::ALL {
            match section {
                Section::Symbol => {
                    entries[section as usize] = (body.len() as u32, self.symbols.len() as u32);
                    let mut w = self.writer();
                    for entry in &self.symbols {
                        w.u32(*entry);
                    }
                    body.extend_from_slice(&w.buf);
                }
                Section::String => {
                    entries[section as usize] = (body.len() as u32, self.strings.len() as u32);
                    body.extend_from_slice(&self.strings);
                }
                _ => {
                    if let Some((count, bytes)) = &self.sections[section as usize] {
                        entries[section as usize] = (body.len() as u32, *count);
                        body.extend_from_slice(bytes);
                    }
                }
            }
            while body.len() % 4 != 0 {
                body.push(0);
            }
        }

        let mut header = self.writer();
        header.bytes(b"HSFV").bytes(&self.version);
        for (offset, count) in entries {
            header.u32(offset).u32(count);
        }
        body[..HEADER_SIZE].copy_from_slice(&header.buf);
        body
    }
}
