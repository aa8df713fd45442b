pub mod header;
pub mod question;
pub mod record;

use crate::buffer::{BytePacketBuffer, DecodeError, EncodeError};
use std::net::Ipv4Addr;

#[derive(PartialEq, Eq, Debug, Clone, Hash, Copy)]
#[allow(clippy::upper_case_acronyms)]
pub enum QueryType {
    Unknown(u16),
    /// a host address
    A, // 1
    /// an authoritative name server
    NS, // 2
    /// mail exchange
    MX, // 15
    AAAA, // 28
}

impl QueryType {
    pub fn into_num(self) -> u16 {
        match self {
            QueryType::Unknown(x) => x,
            QueryType::A => 1,
            QueryType::NS => 2,
            QueryType::MX => 15,
            QueryType::AAAA => 28,
        }
    }

    pub fn from_num(num: u16) -> QueryType {
        match num {
            1 => QueryType::A,
            2 => QueryType::NS,
            15 => QueryType::MX,
            28 => QueryType::AAAA,
            _ => QueryType::Unknown(num),
        }
    }
}

/// A single section entry.
///
/// The wire form is decided by a one byte lookahead: a 0xC0 byte opens a
/// resource record with a compressed name, anything else is read as the
/// question form (name, type, class). Questions are expected to carry
/// uncompressed names only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Question(question::Question),
    Record(record::Record),
}

impl Entry {
    pub fn read(buffer: &mut BytePacketBuffer) -> Result<Self, DecodeError> {
        if buffer.peek()? == 0xC0 {
            record::Record::read(buffer).map(Self::Record)
        } else {
            question::Question::read(buffer).map(Self::Question)
        }
    }

    pub fn write(&self, buffer: &mut BytePacketBuffer) -> Result<(), EncodeError> {
        match self {
            Self::Question(inner) => inner.write(buffer),
            Self::Record(inner) => inner.write(buffer).map(|_| ()),
        }
    }

    pub fn record(&self) -> Option<&record::Record> {
        match self {
            Self::Record(inner) => Some(inner),
            Self::Question(_) => None,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct DnsPacket {
    pub header: header::Header,
    pub questions: Vec<Entry>,
    pub answers: Vec<Entry>,
    pub authorities: Vec<Entry>,
    pub resources: Vec<Entry>,
}

impl TryFrom<BytePacketBuffer> for DnsPacket {
    type Error = DecodeError;

    fn try_from(mut buffer: BytePacketBuffer) -> Result<Self, Self::Error> {
        let header = header::Header::read(&mut buffer)?;

        let mut questions = Vec::with_capacity(header.questions as usize);
        for _ in 0..header.questions {
            questions.push(Entry::read(&mut buffer)?);
        }

        let mut answers = Vec::with_capacity(header.answers as usize);
        for _ in 0..header.answers {
            answers.push(Entry::read(&mut buffer)?);
        }

        let mut authorities = Vec::with_capacity(header.authoritative_entries as usize);
        for _ in 0..header.authoritative_entries {
            authorities.push(Entry::read(&mut buffer)?);
        }

        let mut resources = Vec::with_capacity(header.resource_entries as usize);
        for _ in 0..header.resource_entries {
            resources.push(Entry::read(&mut buffer)?);
        }

        Ok(DnsPacket {
            header,
            questions,
            answers,
            authorities,
            resources,
        })
    }
}

impl DnsPacket {
    pub fn new(header: header::Header) -> Self {
        Self {
            header,
            ..Default::default()
        }
    }

    pub fn with_question(mut self, question: question::Question) -> Self {
        self.questions.push(Entry::Question(question));
        self
    }

    pub fn with_answer(mut self, record: record::Record) -> Self {
        self.answers.push(Entry::Record(record));
        self
    }

    pub fn with_authority(mut self, record: record::Record) -> Self {
        self.authorities.push(Entry::Record(record));
        self
    }

    pub fn with_resource(mut self, record: record::Record) -> Self {
        self.resources.push(Entry::Record(record));
        self
    }

    pub fn create_buffer(&mut self) -> Result<BytePacketBuffer, EncodeError> {
        let mut buffer = BytePacketBuffer::default();
        self.header.questions = self.questions.len() as u16;
        self.header.answers = self.answers.len() as u16;
        self.header.authoritative_entries = self.authorities.len() as u16;
        self.header.resource_entries = self.resources.len() as u16;

        self.header.write(&mut buffer)?;

        for question in &self.questions {
            question.write(&mut buffer)?;
        }
        for rec in &self.answers {
            rec.write(&mut buffer)?;
        }
        for rec in &self.authorities {
            rec.write(&mut buffer)?;
        }
        for rec in &self.resources {
            rec.write(&mut buffer)?;
        }

        Ok(buffer)
    }

    /// Address of the first A record glue in the additional section.
    pub fn glue(&self) -> Option<Ipv4Addr> {
        self.resources.iter().find_map(|entry| match entry.record() {
            Some(record::Record::A { addr, .. }) => Some(*addr),
            _ => None,
        })
    }

    /// Host of the first NS record in the authority section.
    pub fn referral(&self) -> Option<&str> {
        self.authorities
            .iter()
            .find_map(|entry| match entry.record() {
                Some(record::Record::NS { host, .. }) => Some(host.as_str()),
                _ => None,
            })
    }

    /// Address of the first A record in the answer section.
    pub fn answer_a(&self) -> Option<Ipv4Addr> {
        self.answers.iter().find_map(|entry| match entry.record() {
            Some(record::Record::A { addr, .. }) => Some(*addr),
            _ => None,
        })
    }

    /// Time to live of the first record in the answer section.
    pub fn answer_ttl(&self) -> Option<u32> {
        self.answers
            .iter()
            .find_map(Entry::record)
            .map(record::Record::ttl)
    }
}
