//! Minimal protobuf wire-format writer
//!
//! Just enough of the encoding to emit an ONNX `ModelProto`: varint
//! fields, length-delimited strings/bytes/messages, and packed repeated
//! scalars. Field numbers are supplied by the caller from the schema.

const WIRE_VARINT: u8 = 0;
const WIRE_LEN: u8 = 2;

/// Append-only protobuf message writer
#[derive(Debug, Default)]
pub struct ProtoWriter {
    buf: Vec<u8>,
}

impl ProtoWriter {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Finished message bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    fn tag(&mut self, field: u32, wire_type: u8) {
        self.varint(((field as u64) << 3) | wire_type as u64);
    }

    fn varint(&mut self, mut value: u64) {
        loop {
            let byte = (value & 0x7f) as u8;
            value >>= 7;
            if value == 0 {
                self.buf.push(byte);
                break;
            }
            self.buf.push(byte | 0x80);
        }
    }

    /// Varint-encoded int64 field (negative values take ten bytes, as
    /// the wire format requires)
    pub fn int64(&mut self, field: u32, value: i64) {
        self.tag(field, WIRE_VARINT);
        self.varint(value as u64);
    }

    /// Length-delimited UTF-8 string field
    pub fn string(&mut self, field: u32, value: &str) {
        self.bytes(field, value.as_bytes());
    }

    /// Length-delimited bytes field
    pub fn bytes(&mut self, field: u32, value: &[u8]) {
        self.tag(field, WIRE_LEN);
        self.varint(value.len() as u64);
        self.buf.extend_from_slice(value);
    }

    /// Embedded message field
    pub fn message(&mut self, field: u32, body: ProtoWriter) {
        self.bytes(field, &body.buf);
    }

    /// Packed repeated int64 field; skipped when empty
    pub fn packed_int64s(&mut self, field: u32, values: &[i64]) {
        if values.is_empty() {
            return;
        }
        let mut packed = ProtoWriter::new();
        for &v in values {
            packed.varint(v as u64);
        }
        self.bytes(field, &packed.buf);
    }

    /// Packed repeated float field; skipped when empty
    pub fn packed_floats(&mut self, field: u32, values: &[f32]) {
        if values.is_empty() {
            return;
        }
        let mut packed = Vec::with_capacity(values.len() * 4);
        for &v in values {
            packed.extend_from_slice(&v.to_le_bytes());
        }
        self.bytes(field, &packed);
    }
}
