use crate::size::rdata_wire_len;
use crate::{DNS_PACKET_HEADER_SIZE, DNS_PACKET_MAX_SIZE};
use bytes::{BufMut, Bytes, BytesMut};
use compact_str::CompactString;
use multicast_probe_domain::{DnsClass, DomainName, ProbeRecord, RecordData, RecordKey, RecordType};
use smallvec::SmallVec;

const QDCOUNT_OFFSET: usize = 4;
const NSCOUNT_OFFSET: usize = 8;

/// Top bit of the question class: requests a unicast response.
const CLASS_UNICAST_RESPONSE: u16 = 0x8000;

/// Top bit of a record class: the record set replaces cached entries.
const CLASS_CACHE_FLUSH: u16 = 0x8000;

/// Compression pointer tag and the encoded length of a pointer.
const NAME_POINTER_TAG: u16 = 0xC000;
const NAME_POINTER_LEN: usize = 2;

fn record_type_code(record_type: RecordType) -> u16 {
    match record_type {
        RecordType::A => 1,
        RecordType::PTR => 12,
        RecordType::TXT => 16,
        RecordType::AAAA => 28,
        RecordType::SRV => 33,
        RecordType::ANY => 255,
    }
}

fn class_code(class: DnsClass) -> u16 {
    match class {
        DnsClass::IN => 1,
        DnsClass::ANY => 255,
    }
}

/// An outgoing DNS query packet under construction.
///
/// The packet starts as a zeroed header (query opcode, id 0 as multicast
/// DNS requires) and grows by appending questions and records. Every append
/// checks the exact encoded size against the remaining budget first and
/// returns `false` without touching the buffer when it would not fit.
///
/// Owner names are compressed: appending a name that already appears as a
/// question or record owner emits a two-octet pointer instead. Names inside
/// rdata are always written in full.
pub struct ProbePacket {
    buf: BytesMut,
    max_size: usize,
    names: SmallVec<[(CompactString, u16); 8]>,
}

impl ProbePacket {
    pub fn new(max_size: usize) -> Self {
        let max_size = max_size.clamp(DNS_PACKET_HEADER_SIZE, DNS_PACKET_MAX_SIZE);
        let mut buf = BytesMut::with_capacity(max_size);
        buf.resize(DNS_PACKET_HEADER_SIZE, 0);
        Self {
            buf,
            max_size,
            names: SmallVec::new(),
        }
    }

    /// Octets still available before the size budget is exhausted.
    pub fn space(&self) -> usize {
        self.max_size.saturating_sub(self.buf.len())
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.len() <= DNS_PACKET_HEADER_SIZE
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }

    pub fn set_question_count(&mut self, count: u16) {
        self.set_u16(QDCOUNT_OFFSET, count);
    }

    pub fn set_authority_count(&mut self, count: u16) {
        self.set_u16(NSCOUNT_OFFSET, count);
    }

    /// Appends a question entry. `unicast_response` sets the QU class bit
    /// asking the responder to reply by unicast.
    pub fn append_question(&mut self, key: &RecordKey, unicast_response: bool) -> bool {
        let needed = self.encoded_name_len(key.name()) + 4;
        if needed > self.space() {
            return false;
        }

        self.put_name(key.name());
        self.buf.put_u16(record_type_code(key.record_type()));
        let mut class = class_code(key.class());
        if unicast_response {
            class |= CLASS_UNICAST_RESPONSE;
        }
        self.buf.put_u16(class);
        true
    }

    /// Appends a resource record. The section it lands in is a matter of
    /// the header counts; the encoding is the same for all of them.
    pub fn append_record(
        &mut self,
        record: &ProbeRecord,
        cache_flush: bool,
        ttl_override: Option<u32>,
    ) -> bool {
        let rdata_len = rdata_wire_len(record.data());
        if rdata_len > u16::MAX as usize {
            return false;
        }
        let needed = self.encoded_name_len(record.key().name()) + 10 + rdata_len;
        if needed > self.space() {
            return false;
        }

        self.put_name(record.key().name());
        self.buf
            .put_u16(record_type_code(record.key().record_type()));
        let mut class = class_code(record.key().class());
        if cache_flush {
            class |= CLASS_CACHE_FLUSH;
        }
        self.buf.put_u16(class);
        self.buf.put_u32(ttl_override.unwrap_or(record.ttl()));
        self.buf.put_u16(rdata_len as u16);

        let start = self.buf.len();
        self.put_rdata(record.data());
        debug_assert_eq!(self.buf.len() - start, rdata_len);
        true
    }

    fn set_u16(&mut self, offset: usize, value: u16) {
        self.buf[offset..offset + 2].copy_from_slice(&value.to_be_bytes());
    }

    /// Exact encoded length `put_name` would produce right now.
    fn encoded_name_len(&self, name: &DomainName) -> usize {
        if self.name_offset(name).is_some() {
            NAME_POINTER_LEN
        } else {
            name.as_str().len() + 2
        }
    }

    fn name_offset(&self, name: &DomainName) -> Option<u16> {
        self.names
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name.as_str()))
            .map(|(_, offset)| *offset)
    }

    fn put_name(&mut self, name: &DomainName) {
        if let Some(offset) = self.name_offset(name) {
            self.buf.put_u16(NAME_POINTER_TAG | offset);
            return;
        }

        // offsets stay pointable: the packet ceiling is far below 0x4000
        let offset = self.buf.len() as u16;
        self.put_raw_name(name);
        self.names.push((CompactString::from(name.as_str()), offset));
    }

    fn put_raw_name(&mut self, name: &DomainName) {
        for label in name.labels() {
            self.buf.put_u8(label.len() as u8);
            self.buf.put_slice(label.as_bytes());
        }
        self.buf.put_u8(0);
    }

    fn put_rdata(&mut self, data: &RecordData) {
        match data {
            RecordData::A(addr) => self.buf.put_slice(&addr.octets()),
            RecordData::AAAA(addr) => self.buf.put_slice(&addr.octets()),
            RecordData::PTR(target) => self.put_raw_name(target),
            RecordData::SRV {
                priority,
                weight,
                port,
                target,
            } => {
                self.buf.put_u16(*priority);
                self.buf.put_u16(*weight);
                self.buf.put_u16(*port);
                self.put_raw_name(target);
            }
            RecordData::TXT(strings) => {
                if strings.is_empty() {
                    self.buf.put_u8(0);
                } else {
                    for s in strings {
                        self.buf.put_u8(s.len() as u8);
                        self.buf.put_slice(s.as_bytes());
                    }
                }
            }
        }
    }
}
