use super::QueryType;
use crate::buffer::{BytePacketBuffer, DecodeError, EncodeError};

/// CLASS fields appear in questions and resource records.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DnsClass {
    /// IN - the Internet
    Internet, // 1
    Unknown(u16),
}

impl Default for DnsClass {
    fn default() -> Self {
        Self::Internet
    }
}

impl DnsClass {
    pub fn into_num(self) -> u16 {
        match self {
            Self::Internet => 1,
            Self::Unknown(code) => code,
        }
    }

    pub fn from_num(num: u16) -> Self {
        match num {
            1 => Self::Internet,
            other => Self::Unknown(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    /// QNAME a domain name represented as a sequence of labels,
    /// where each label consists of a length octet followed by that number of octets.
    /// The domain name terminates with the zero length octet for the null label of the root.
    /// Note that this field may be an odd number of octets; no padding is used.
    pub name: String,
    /// QTYPE a two octet code which specifies the type of the query.
    pub qtype: QueryType,
    /// QCLASS a two octet code that specifies the class of the query.
    /// For example, the QCLASS field is IN for the Internet.
    pub qclass: DnsClass,
}

impl Question {
    pub fn new(name: String, qtype: QueryType) -> Self {
        Self {
            name,
            qtype,
            qclass: Default::default(),
        }
    }

    pub fn read(buffer: &mut BytePacketBuffer) -> Result<Self, DecodeError> {
        let name = buffer.read_qname()?;
        let qtype = QueryType::from_num(buffer.read_u16()?);
        let qclass = DnsClass::from_num(buffer.read_u16()?);

        Ok(Self {
            name,
            qtype,
            qclass,
        })
    }

    pub fn write(&self, buffer: &mut BytePacketBuffer) -> Result<(), EncodeError> {
        if let QueryType::Unknown(code) = self.qtype {
            return Err(EncodeError::InvalidQueryType(code));
        }

        buffer.write_qname(&self.name)?;
        buffer.write_u16(self.qtype.into_num())?;
        buffer.write_u16(self.qclass.into_num())?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{DnsClass, Question};
    use crate::packet::QueryType;

    #[test]
    fn should_roundtrip_question() {
        for qtype in [QueryType::A, QueryType::AAAA, QueryType::NS, QueryType::MX] {
            let question = Question::new("mail.example.com".into(), qtype);
            let mut buffer = crate::buffer::BytePacketBuffer::default();
            question.write(&mut buffer).unwrap();

            buffer.pos = 0;
            let read = Question::read(&mut buffer).unwrap();
            assert_eq!(read.name, "mail.example.com");
            assert_eq!(read.qtype, qtype);
            assert_eq!(read.qclass, DnsClass::Internet);
        }
    }

    #[test]
    fn should_fail_write_unknown_qtype() {
        let question = Question::new("example.com".into(), QueryType::Unknown(41));
        let mut buffer = crate::buffer::BytePacketBuffer::default();
        let error = question.write(&mut buffer).unwrap_err();
        assert_eq!(error, crate::buffer::EncodeError::InvalidQueryType(41));
    }
}
