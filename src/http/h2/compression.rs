//! HPACK header compression (RFC 7541), encode side
//!
//! [`HeaderCompressionContext`] turns header lists into header block
//! fragments and keeps the dynamic table a peer's decoder would build from
//! them. Output is deterministic: the same sequence of header lists fed to a
//! fresh context always yields the same bytes. Strings are written as raw
//! octets, never Huffman-coded, so fragments can be sliced and inspected
//! byte by byte.

use bytes::{BufMut, Bytes, BytesMut};
use std::collections::VecDeque;

use super::settings::DEFAULT_HEADER_TABLE_SIZE;

/// Per-entry overhead counted by the table budget (RFC 7541 Section 4.1)
pub const ENTRY_OVERHEAD: usize = 32;

/// A single header name-value pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderField {
    pub name: Vec<u8>,
    pub value: Vec<u8>,
    /// Always encode as a never-indexed literal
    pub sensitive: bool,
}

impl HeaderField {
    pub fn new(name: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        HeaderField {
            name: name.into(),
            value: value.into(),
            sensitive: false,
        }
    }

    /// Field that must never enter a compression table
    pub fn sensitive(name: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        HeaderField {
            sensitive: true,
            ..HeaderField::new(name, value)
        }
    }

    /// Size of this field for dynamic table accounting
    pub fn size(&self) -> usize {
        entry_size(&self.name, &self.value)
    }
}

/// Ordered header list, duplicates allowed
pub type HeaderList = Vec<HeaderField>;

fn entry_size(name: &[u8], value: &[u8]) -> usize {
    name.len() + value.len() + ENTRY_OVERHEAD
}

/// HPACK static table (RFC 7541 Appendix A), indexed 1..=61
const STATIC_TABLE: [(&[u8], &[u8]); 61] = [
    (b":authority", b""),
    (b":method", b"GET"),
    (b":method", b"POST"),
    (b":path", b"/"),
    (b":path", b"/index.html"),
    (b":scheme", b"http"),
    (b":scheme", b"https"),
    (b":status", b"200"),
    (b":status", b"204"),
    (b":status", b"206"),
    (b":status", b"304"),
    (b":status", b"400"),
    (b":status", b"404"),
    (b":status", b"500"),
    (b"accept-charset", b""),
    (b"accept-encoding", b"gzip, deflate"),
    (b"accept-language", b""),
    (b"accept-ranges", b""),
    (b"accept", b""),
    (b"access-control-allow-origin", b""),
    (b"age", b""),
    (b"allow", b""),
    (b"authorization", b""),
    (b"cache-control", b""),
    (b"content-disposition", b""),
    (b"content-encoding", b""),
    (b"content-language", b""),
    (b"content-length", b""),
    (b"content-location", b""),
    (b"content-range", b""),
    (b"content-type", b""),
    (b"cookie", b""),
    (b"date", b""),
    (b"etag", b""),
    (b"expect", b""),
    (b"expires", b""),
    (b"from", b""),
    (b"host", b""),
    (b"if-match", b""),
    (b"if-modified-since", b""),
    (b"if-none-match", b""),
    (b"if-range", b""),
    (b"if-unmodified-since", b""),
    (b"last-modified", b""),
    (b"link", b""),
    (b"location", b""),
    (b"max-forwards", b""),
    (b"proxy-authenticate", b""),
    (b"proxy-authorization", b""),
    (b"range", b""),
    (b"referer", b""),
    (b"refresh", b""),
    (b"retry-after", b""),
    (b"server", b""),
    (b"set-cookie", b""),
    (b"strict-transport-security", b""),
    (b"transfer-encoding", b""),
    (b"user-agent", b""),
    (b"vary", b""),
    (b"via", b""),
    (b"www-authenticate", b""),
];

fn find_static(name: &[u8], value: &[u8]) -> Option<usize> {
    STATIC_TABLE
        .iter()
        .position(|(n, v)| *n == name && *v == value)
        .map(|i| i + 1)
}

fn find_static_name(name: &[u8]) -> Option<usize> {
    STATIC_TABLE
        .iter()
        .position(|(n, _)| *n == name)
        .map(|i| i + 1)
}

/// Entry of the dynamic table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableEntry {
    pub name: Vec<u8>,
    pub value: Vec<u8>,
}

impl TableEntry {
    pub fn size(&self) -> usize {
        entry_size(&self.name, &self.value)
    }
}

/// HPACK dynamic table (RFC 7541 Section 2.3.2)
///
/// Entries are stored newest first, so position `i` is HPACK index `62 + i`.
#[derive(Debug, Clone)]
pub struct DynamicTable {
    entries: VecDeque<TableEntry>,
    size: usize,
    max_size: usize,
}

impl DynamicTable {
    pub fn new(max_size: usize) -> Self {
        DynamicTable {
            entries: VecDeque::new(),
            size: 0,
            max_size,
        }
    }

    /// Insert a new entry, evicting the oldest ones until it fits
    ///
    /// An entry larger than the whole budget empties the table and is not
    /// added (RFC 7541 Section 4.4).
    pub fn insert(&mut self, name: Vec<u8>, value: Vec<u8>) {
        let entry = TableEntry { name, value };
        let entry_size = entry.size();

        if entry_size > self.max_size {
            self.entries.clear();
            self.size = 0;
            return;
        }

        self.evict_to(self.max_size - entry_size);
        self.entries.push_front(entry);
        self.size += entry_size;
    }

    /// Update the maximum table size, evicting entries as needed
    pub fn set_max_size(&mut self, max_size: usize) {
        self.max_size = max_size;
        self.evict_to(max_size);
    }

    fn evict_to(&mut self, budget: usize) {
        while self.size > budget {
            match self.entries.pop_back() {
                Some(evicted) => self.size -= evicted.size(),
                None => break,
            }
        }
    }

    /// Entries, newest first
    pub fn entries(&self) -> impl Iterator<Item = &TableEntry> {
        self.entries.iter()
    }

    /// Entry at a 0-based position (0 = newest)
    pub fn get(&self, index: usize) -> Option<&TableEntry> {
        self.entries.get(index)
    }

    /// Bytes currently accounted to the table
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn find(&self, name: &[u8], value: &[u8]) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.name == name && e.value == value)
            .map(|i| i + STATIC_TABLE.len() + 1)
    }

    fn find_name(&self, name: &[u8]) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.name == name)
            .map(|i| i + STATIC_TABLE.len() + 1)
    }
}

/// Literal representation (RFC 7541 Section 6.2)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Literal {
    IncrementalIndexing,
    WithoutIndexing,
    NeverIndexed,
}

impl Literal {
    /// (prefix bits, pattern) of the first octet
    fn prefix(self) -> (u8, u8) {
        match self {
            Literal::IncrementalIndexing => (6, 0x40),
            Literal::WithoutIndexing => (4, 0x00),
            Literal::NeverIndexed => (4, 0x10),
        }
    }
}

/// Stateful HPACK encoder
pub struct HeaderCompressionContext {
    table: DynamicTable,
    /// Smallest and final size since the last fragment, not yet signalled
    pending_update: Option<(usize, usize)>,
}

impl HeaderCompressionContext {
    /// Context with the default 4096-octet table
    pub fn new() -> Self {
        Self::with_max_table_size(DEFAULT_HEADER_TABLE_SIZE as usize)
    }

    pub fn with_max_table_size(max_size: usize) -> Self {
        HeaderCompressionContext {
            table: DynamicTable::new(max_size),
            pending_update: None,
        }
    }

    /// Encode a header list into a header block fragment
    pub fn compress(&mut self, headers: &[HeaderField]) -> Bytes {
        let mut buf = BytesMut::new();

        if let Some((smallest, last)) = self.pending_update.take() {
            if smallest < last {
                encode_integer(&mut buf, smallest, 5, 0x20);
            }
            encode_integer(&mut buf, last, 5, 0x20);
        }

        for field in headers {
            self.encode_field(field, &mut buf);
        }

        buf.freeze()
    }

    fn encode_field(&mut self, field: &HeaderField, buf: &mut BytesMut) {
        if field.sensitive {
            self.encode_literal(field, Literal::NeverIndexed, buf);
            return;
        }

        let exact =
            find_static(&field.name, &field.value).or_else(|| self.table.find(&field.name, &field.value));
        if let Some(index) = exact {
            // Indexed header field: 1xxxxxxx
            encode_integer(buf, index, 7, 0x80);
            return;
        }

        if field.size() > self.table.max_size() {
            self.encode_literal(field, Literal::WithoutIndexing, buf);
            return;
        }

        self.encode_literal(field, Literal::IncrementalIndexing, buf);
        self.table.insert(field.name.clone(), field.value.clone());
    }

    fn encode_literal(&self, field: &HeaderField, literal: Literal, buf: &mut BytesMut) {
        let (prefix_bits, pattern) = literal.prefix();
        let name_index =
            find_static_name(&field.name).or_else(|| self.table.find_name(&field.name));

        match name_index {
            Some(index) => encode_integer(buf, index, prefix_bits, pattern),
            None => {
                buf.put_u8(pattern);
                encode_string(buf, &field.name);
            }
        }
        encode_string(buf, &field.value);
    }

    /// Resize the dynamic table
    ///
    /// The change is announced by a dynamic table size update at the start
    /// of the next fragment.
    pub fn set_max_table_size(&mut self, max_size: usize) {
        self.table.set_max_size(max_size);
        self.pending_update = Some(match self.pending_update {
            Some((smallest, _)) => (smallest.min(max_size), max_size),
            None => (max_size, max_size),
        });
    }

    /// The dynamic table as the peer's decoder should see it
    pub fn table(&self) -> &DynamicTable {
        &self.table
    }
}

impl Default for HeaderCompressionContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Prefix integer (RFC 7541 Section 5.1)
pub fn encode_integer(buf: &mut BytesMut, value: usize, prefix_bits: u8, pattern: u8) {
    let max = (1usize << prefix_bits) - 1;
    if value < max {
        buf.put_u8(pattern | value as u8);
        return;
    }

    buf.put_u8(pattern | max as u8);
    let mut remaining = value - max;
    while remaining >= 128 {
        buf.put_u8(0x80 | (remaining & 0x7f) as u8);
        remaining >>= 7;
    }
    buf.put_u8(remaining as u8);
}

/// String literal with H = 0 (RFC 7541 Section 5.2)
fn encode_string(buf: &mut BytesMut, data: &[u8]) {
    encode_integer(buf, data.len(), 7, 0x00);
    buf.put_slice(data);
}

/// Header value of `len` repeated `x` characters
pub fn dummy_value(len: usize) -> String {
    "x".repeat(len)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(fragment: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
        hpack::Decoder::new().decode(fragment).unwrap()
    }

    #[test]
    fn test_integer_encoding() {
        // RFC 7541 C.1.1 - C.1.3
        let mut buf = BytesMut::new();
        encode_integer(&mut buf, 10, 5, 0);
        assert_eq!(&buf[..], &[0x0a]);

        let mut buf = BytesMut::new();
        encode_integer(&mut buf, 1337, 5, 0);
        assert_eq!(&buf[..], &[0x1f, 0x9a, 0x0a]);

        let mut buf = BytesMut::new();
        encode_integer(&mut buf, 42, 8, 0);
        assert_eq!(&buf[..], &[0x2a]);
    }

    #[test]
    fn test_static_exact_match_is_indexed() {
        let mut ctx = HeaderCompressionContext::new();
        let fragment = ctx.compress(&[
            HeaderField::new(":method", "GET"),
            HeaderField::new(":scheme", "http"),
            HeaderField::new(":path", "/"),
        ]);

        assert_eq!(&fragment[..], &[0x82, 0x86, 0x84]);
        assert!(ctx.table().is_empty());
    }

    #[test]
    fn test_rfc7541_c3_request_sequence() {
        // RFC 7541 C.3.1 and C.3.2, without Huffman coding
        let mut ctx = HeaderCompressionContext::new();
        let first = ctx.compress(&[
            HeaderField::new(":method", "GET"),
            HeaderField::new(":scheme", "http"),
            HeaderField::new(":path", "/"),
            HeaderField::new(":authority", "www.example.com"),
        ]);
        let mut expected = vec![0x82, 0x86, 0x84, 0x41, 0x0f];
        expected.extend_from_slice(b"www.example.com");
        assert_eq!(&first[..], &expected[..]);
        assert_eq!(ctx.table().size(), 57);

        let second = ctx.compress(&[
            HeaderField::new(":method", "GET"),
            HeaderField::new(":scheme", "http"),
            HeaderField::new(":path", "/"),
            HeaderField::new(":authority", "www.example.com"),
            HeaderField::new("cache-control", "no-cache"),
        ]);
        let mut expected = vec![0x82, 0x86, 0x84, 0xbe, 0x58, 0x08];
        expected.extend_from_slice(b"no-cache");
        assert_eq!(&second[..], &expected[..]);
        assert_eq!(ctx.table().size(), 110);
    }

    #[test]
    fn test_new_name_literal() {
        let mut ctx = HeaderCompressionContext::new();
        let fragment = ctx.compress(&[HeaderField::new("custom-key", "custom-header")]);

        let mut expected = vec![0x40, 0x0a];
        expected.extend_from_slice(b"custom-key");
        expected.push(0x0d);
        expected.extend_from_slice(b"custom-header");
        assert_eq!(&fragment[..], &expected[..]);
        assert_eq!(ctx.table().size(), 55);
    }

    #[test]
    fn test_sensitive_field_never_indexed() {
        let mut ctx = HeaderCompressionContext::new();
        let fragment = ctx.compress(&[HeaderField::sensitive("authorization", "secret")]);

        // 0001xxxx with the static name index 23 (15 + 8)
        assert_eq!(fragment[0], 0x1f);
        assert_eq!(fragment[1], 23 - 15);
        assert!(ctx.table().is_empty());

        // A sensitive field is never indexed even if it is in the table
        let fragment = ctx.compress(&[HeaderField::sensitive(":method", "GET")]);
        assert_eq!(fragment[0] & 0xf0, 0x10);
    }

    #[test]
    fn test_oversized_field_without_indexing() {
        let mut ctx = HeaderCompressionContext::new();
        let value = dummy_value(5000);
        let fragment = ctx.compress(&[HeaderField::new("x-large", value.clone())]);

        assert_eq!(fragment[0], 0x00);
        assert!(ctx.table().is_empty());
        assert_eq!(decode(&fragment), vec![(b"x-large".to_vec(), value.into_bytes())]);
    }

    #[test]
    fn test_dynamic_table_eviction() {
        let mut table = DynamicTable::new(100);
        table.insert(b"a".to_vec(), b"1".to_vec()); // 34
        table.insert(b"b".to_vec(), b"2".to_vec()); // 68
        table.insert(b"c".to_vec(), b"3".to_vec()); // 102 > 100, evicts "a"

        assert_eq!(table.len(), 2);
        assert_eq!(table.size(), 68);
        assert_eq!(table.get(0).unwrap().name, b"c");
        assert_eq!(table.get(1).unwrap().name, b"b");

        table.insert(b"big".to_vec(), vec![b'x'; 200]);
        assert!(table.is_empty());
        assert_eq!(table.size(), 0);
    }

    #[test]
    fn test_set_max_table_size_emits_update() {
        let mut ctx = HeaderCompressionContext::new();
        ctx.compress(&[HeaderField::new("x-a", "1"), HeaderField::new("x-b", "2")]);
        assert_eq!(ctx.table().len(), 2);

        ctx.set_max_table_size(0);
        ctx.set_max_table_size(40);
        assert!(ctx.table().is_empty());

        let fragment = ctx.compress(&[HeaderField::new(":method", "GET")]);
        // 0 then 40, both 001xxxxx
        assert_eq!(&fragment[..3], &[0x20, 0x3f, 0x09]);
        assert_eq!(fragment[3], 0x82);

        // Only the first fragment carries the update
        let fragment = ctx.compress(&[HeaderField::new(":method", "GET")]);
        assert_eq!(&fragment[..], &[0x82]);
    }

    #[test]
    fn test_dynamic_index_reuse() {
        let mut ctx = HeaderCompressionContext::new();
        let headers = [HeaderField::new("x-trace", "abc")];
        ctx.compress(&headers);

        let fragment = ctx.compress(&headers);
        assert_eq!(&fragment[..], &[0x80 | 62]);

        // Same name, new value: name comes from the dynamic table
        let fragment = ctx.compress(&[HeaderField::new("x-trace", "def")]);
        assert_eq!(fragment[0], 0x40 | 62);
        assert_eq!(ctx.table().get(0).unwrap().value, b"def");
    }

    #[test]
    fn test_output_decodes() {
        let headers = vec![
            HeaderField::new(":method", "POST"),
            HeaderField::new(":scheme", "https"),
            HeaderField::new(":path", "/upload"),
            HeaderField::new(":authority", "example.com:8443"),
            HeaderField::new("content-type", "text/plain"),
            HeaderField::new("x-dup", "1"),
            HeaderField::new("x-dup", "2"),
        ];

        let mut ctx = HeaderCompressionContext::new();
        let mut decoder = hpack::Decoder::new();
        for _ in 0..3 {
            let decoded = decoder.decode(&ctx.compress(&headers)).unwrap();
            let expected: Vec<(Vec<u8>, Vec<u8>)> = headers
                .iter()
                .map(|h| (h.name.clone(), h.value.clone()))
                .collect();
            assert_eq!(decoded, expected);
        }
    }
}
