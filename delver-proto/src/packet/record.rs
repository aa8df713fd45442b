use super::QueryType;
use crate::buffer::{BytePacketBuffer, DecodeError, EncodeError};
use std::fmt::Display;
use std::net::{Ipv4Addr, Ipv6Addr};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[allow(clippy::upper_case_acronyms)]
pub enum Record {
    /// Anything that is not interpreted, OPT included. The rdata is kept
    /// as raw bytes.
    Unknown {
        domain: String,
        qtype: u16,
        class: u16,
        ttl: u32,
        data: Vec<u8>,
    }, // 0
    A {
        domain: String,
        addr: Ipv4Addr,
        ttl: u32,
    }, // 1
    NS {
        domain: String,
        host: String,
        ttl: u32,
    }, // 2
    MX {
        domain: String,
        priority: u16,
        host: String,
        ttl: u32,
    }, // 15
    AAAA {
        domain: String,
        addr: Ipv6Addr,
        ttl: u32,
    }, // 28
}

impl Record {
    pub fn ttl(&self) -> u32 {
        match self {
            Self::A { ttl, .. } => *ttl,
            Self::AAAA { ttl, .. } => *ttl,
            Self::MX { ttl, .. } => *ttl,
            Self::NS { ttl, .. } => *ttl,
            Self::Unknown { ttl, .. } => *ttl,
        }
    }

    pub fn read(buffer: &mut BytePacketBuffer) -> Result<Record, DecodeError> {
        // NAME a domain name to which this resource record pertains.
        let domain = buffer.read_qname()?;

        // TYPE two octets containing one of the RR type codes.
        // This field specifies the meaning of the data in the RDATA field.
        let qtype_num = buffer.read_u16()?;
        let qtype = QueryType::from_num(qtype_num);

        // CLASS two octets which specify the class of the data in the RDATA field.
        let class = buffer.read_u16()?;

        // TTL a 32 bit unsigned integer that specifies the time interval (in seconds)
        // that the resource record may be cached before it should be discarded.
        let ttl = buffer.read_u32()?;

        // RDLENGTH an unsigned 16 bit integer that specifies the length in octets of the RDATA field.
        let data_len = buffer.read_u16()?;

        match qtype {
            QueryType::A => {
                let raw_addr = buffer.read_u32()?;
                let addr = Ipv4Addr::new(
                    ((raw_addr >> 24) & 0xFF) as u8,
                    ((raw_addr >> 16) & 0xFF) as u8,
                    ((raw_addr >> 8) & 0xFF) as u8,
                    (raw_addr & 0xFF) as u8,
                );

                Ok(Record::A { domain, addr, ttl })
            }
            QueryType::AAAA => {
                let raw_addr1 = buffer.read_u32()?;
                let raw_addr2 = buffer.read_u32()?;
                let raw_addr3 = buffer.read_u32()?;
                let raw_addr4 = buffer.read_u32()?;
                let addr = Ipv6Addr::new(
                    ((raw_addr1 >> 16) & 0xFFFF) as u16,
                    (raw_addr1 & 0xFFFF) as u16,
                    ((raw_addr2 >> 16) & 0xFFFF) as u16,
                    (raw_addr2 & 0xFFFF) as u16,
                    ((raw_addr3 >> 16) & 0xFFFF) as u16,
                    (raw_addr3 & 0xFFFF) as u16,
                    ((raw_addr4 >> 16) & 0xFFFF) as u16,
                    (raw_addr4 & 0xFFFF) as u16,
                );

                Ok(Record::AAAA { domain, addr, ttl })
            }
            QueryType::NS => {
                let host = buffer.read_qname()?;

                Ok(Record::NS { domain, host, ttl })
            }
            QueryType::MX => {
                let priority = buffer.read_u16()?;
                let host = buffer.read_qname()?;

                Ok(Record::MX {
                    domain,
                    priority,
                    host,
                    ttl,
                })
            }
            QueryType::Unknown(_) => {
                let data = buffer.get_range(buffer.pos(), data_len as usize)?.to_vec();
                buffer.step(data_len as usize)?;

                Ok(Record::Unknown {
                    domain,
                    qtype: qtype_num,
                    class,
                    ttl,
                    data,
                })
            }
        }
    }

    pub fn write(&self, buffer: &mut BytePacketBuffer) -> Result<usize, EncodeError> {
        let start_pos = buffer.pos();

        match *self {
            Record::A {
                ref domain,
                ref addr,
                ttl,
            } => {
                buffer.write_qname(domain)?;
                buffer.write_u16(QueryType::A.into_num())?;
                buffer.write_u16(1)?;
                buffer.write_u32(ttl)?;
                buffer.write_u16(4)?;

                for octet in addr.octets() {
                    buffer.write_u8(octet)?;
                }
            }
            Record::NS {
                ref domain,
                ref host,
                ttl,
            } => {
                buffer.write_qname(domain)?;
                buffer.write_u16(QueryType::NS.into_num())?;
                buffer.write_u16(1)?;
                buffer.write_u32(ttl)?;

                let pos = buffer.pos();
                buffer.write_u16(0)?;

                buffer.write_qname(host)?;

                let size = buffer.pos() - (pos + 2);
                buffer.set_u16(pos, size as u16)?;
            }
            Record::MX {
                ref domain,
                priority,
                ref host,
                ttl,
            } => {
                buffer.write_qname(domain)?;
                buffer.write_u16(QueryType::MX.into_num())?;
                buffer.write_u16(1)?;
                buffer.write_u32(ttl)?;

                let pos = buffer.pos();
                buffer.write_u16(0)?;

                buffer.write_u16(priority)?;
                buffer.write_qname(host)?;

                let size = buffer.pos() - (pos + 2);
                buffer.set_u16(pos, size as u16)?;
            }
            Record::AAAA {
                ref domain,
                ref addr,
                ttl,
            } => {
                buffer.write_qname(domain)?;
                buffer.write_u16(QueryType::AAAA.into_num())?;
                buffer.write_u16(1)?;
                buffer.write_u32(ttl)?;
                buffer.write_u16(16)?;

                for segment in &addr.segments() {
                    buffer.write_u16(*segment)?;
                }
            }
            Record::Unknown {
                ref domain,
                qtype,
                class,
                ttl,
                ref data,
            } => {
                buffer.write_qname(domain)?;
                buffer.write_u16(qtype)?;
                buffer.write_u16(class)?;
                buffer.write_u32(ttl)?;
                buffer.write_u16(data.len() as u16)?;

                for b in data {
                    buffer.write_u8(*b)?;
                }
            }
        }

        Ok(buffer.pos() - start_pos)
    }
}

impl Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::A { domain, addr, .. } => write!(f, "{domain} A {addr}"),
            Self::AAAA { domain, addr, .. } => write!(f, "{domain} AAAA {addr}"),
            Self::NS { domain, host, .. } => write!(f, "{domain} NS {host}"),
            Self::MX {
                domain,
                priority,
                host,
                ..
            } => write!(f, "{domain} MX {priority} {host}"),
            Self::Unknown { domain, qtype, .. } => write!(f, "{domain} TYPE{qtype}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Record;
    use crate::buffer::BytePacketBuffer;
    use std::net::{Ipv4Addr, Ipv6Addr};

    fn roundtrip(record: Record) -> Record {
        let mut buffer = BytePacketBuffer::default();
        // names in resource records are compressed, write the domain once
        // so the record opens with a pointer like real responses do
        buffer.write_qname(domain_of(&record)).unwrap();
        record.write(&mut buffer).unwrap();

        buffer.pos = match domain_of(&record).len() {
            0 => 1,
            n => n + 2,
        };
        Record::read(&mut buffer).unwrap()
    }

    fn domain_of(record: &Record) -> &str {
        match record {
            Record::A { domain, .. }
            | Record::AAAA { domain, .. }
            | Record::NS { domain, .. }
            | Record::MX { domain, .. }
            | Record::Unknown { domain, .. } => domain,
        }
    }

    #[test]
    fn should_roundtrip_a_record() {
        let record = Record::A {
            domain: "example.com".into(),
            addr: Ipv4Addr::new(93, 184, 216, 34),
            ttl: 3600,
        };
        assert_eq!(roundtrip(record.clone()), record);
    }

    #[test]
    fn should_roundtrip_aaaa_record() {
        let record = Record::AAAA {
            domain: "example.com".into(),
            addr: Ipv6Addr::new(0x2606, 0x2800, 0x220, 0x1, 0x248, 0x1893, 0x25c8, 0x1946),
            ttl: 60,
        };
        assert_eq!(roundtrip(record.clone()), record);
    }

    #[test]
    fn should_roundtrip_mx_record() {
        let record = Record::MX {
            domain: "example.com".into(),
            priority: 10,
            host: "mail.example.org".into(),
            ttl: 300,
        };
        assert_eq!(roundtrip(record.clone()), record);
    }

    #[test]
    fn should_keep_opt_record_opaque() {
        let record = Record::Unknown {
            domain: "".into(),
            qtype: 41,
            class: 4096,
            ttl: 0,
            data: vec![0xDE, 0xAD, 0xBE, 0xEF],
        };
        let mut buffer = BytePacketBuffer::default();
        record.write(&mut buffer).unwrap();

        buffer.pos = 0;
        let read = Record::read(&mut buffer).unwrap();
        assert_eq!(read, record);
    }

    #[test]
    fn should_render_mx_with_preference() {
        let record = Record::MX {
            domain: "example.com".into(),
            priority: 10,
            host: "mail.example.com".into(),
            ttl: 300,
        };
        assert_eq!(record.to_string(), "example.com MX 10 mail.example.com");
    }
}
