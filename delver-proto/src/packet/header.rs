use crate::buffer::{BytePacketBuffer, DecodeError, EncodeError};

/// The size of the fixed DNS message header.
pub const HEADER_SIZE: usize = 12;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ResponseCode {
    /// No error condition
    NoError, // 0
    /// Format error - The name server was unable to interpret the query.
    FormatError, // 1
    /// Server failure - The name server was unable to process this query due to a problem with the name server.
    ServerFailure, // 2
    /// Name Error - Meaningful only for responses from an authoritative name server,
    /// this code signifies that the domain name referenced in the query does not exist.
    NameError, // 3
    /// Not Implemented - The name server does not support the requested kind of query.
    NotImplemented, // 4
    /// Refused - The name server refuses to perform the specified operation for policy reasons.
    Refused, // 5
    Unknown(u8),
}

impl Default for ResponseCode {
    fn default() -> Self {
        Self::NoError
    }
}

impl ResponseCode {
    pub fn into_num(self) -> u8 {
        match self {
            Self::NoError => 0,
            Self::FormatError => 1,
            Self::ServerFailure => 2,
            Self::NameError => 3,
            Self::NotImplemented => 4,
            Self::Refused => 5,
            Self::Unknown(code) => code,
        }
    }

    pub fn from_num(num: u8) -> Self {
        match num {
            0 => Self::NoError,
            1 => Self::FormatError,
            2 => Self::ServerFailure,
            3 => Self::NameError,
            4 => Self::NotImplemented,
            5 => Self::Refused,
            other => Self::Unknown(other),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Header {
    /// A 16 bit identifier assigned by the program that
    /// generates any kind of query.  This identifier is copied
    /// the corresponding reply and can be used by the requester
    /// to match up replies to outstanding queries.
    pub id: u16, // 16 bits

    /// QR A one bit field that specifies whether this message is a query (0), or a response (1).
    pub response: bool, // 1 bit
    /// OPCODE A four bit field that specifies kind of query in this message.
    /// This value is set by the originator of a query and copied into the response.
    pub opcode: u8, // 4 bits
    /// AA Authoritative Answer - this bit is valid in responses,
    /// and specifies that the responding name server is an authority
    /// for the domain name in question section.
    pub authoritative_answer: bool, // 1 bit
    /// TC TrunCation - specifies that this message was truncated due to length greater
    /// than that permitted on the transmission channel.
    pub truncated_message: bool, // 1 bit
    /// RD Recursion Desired - this bit may be set in a query and is copied into the response.
    /// If RD is set, it directs the name server to pursue the query recursively.
    pub recursion_desired: bool, // 1 bit
    /// RA Recursion Available - this bit is set or cleared in a response,
    /// and denotes whether recursive query support is available in the name server.
    pub recursion_available: bool, // 1 bit
    /// Z Reserved for future use.  Must be zero in all queries and responses.
    pub z: u8, // 3 bits
    /// Response code - this 4 bit field is set as part of responses.
    pub response_code: ResponseCode, // 4 bits

    /// QDCOUNT the number of entries in the question section.
    pub questions: u16,
    /// ANCOUNT the number of resource records in the answer section.
    pub answers: u16,
    /// NSCOUNT the number of name server resource records in the authority records section.
    pub authoritative_entries: u16,
    /// ARCOUNT the number of resource records in the additional records section.
    pub resource_entries: u16,
}

impl Header {
    /// A standard query header: all flags zero, one question.
    pub fn question(id: u16) -> Self {
        Self {
            id,
            questions: 1,
            ..Default::default()
        }
    }

    pub fn response(id: u16) -> Self {
        Self {
            id,
            response: true,
            ..Default::default()
        }
    }
}

impl Header {
    /// Reads the first 12 bytes
    pub fn read(buffer: &mut BytePacketBuffer) -> Result<Self, DecodeError> {
        let id = buffer.read_u16()?;

        let head = buffer.read()?;
        let tail = buffer.read()?;

        Ok(Self {
            id,
            response: (head & (1 << 7)) > 0,
            opcode: (head >> 3) & 0x0F,
            authoritative_answer: (head & (1 << 2)) > 0,
            truncated_message: (head & (1 << 1)) > 0,
            recursion_desired: (head & (1 << 0)) > 0,
            recursion_available: (tail & (1 << 7)) > 0,
            z: (tail >> 4) & 0x07,
            response_code: ResponseCode::from_num(tail & 0x0F),
            questions: buffer.read_u16()?,
            answers: buffer.read_u16()?,
            authoritative_entries: buffer.read_u16()?,
            resource_entries: buffer.read_u16()?,
        })
    }

    pub fn write(&self, buffer: &mut BytePacketBuffer) -> Result<(), EncodeError> {
        buffer.write_u16(self.id)?;

        buffer.write_u8(
            (self.recursion_desired as u8)
                | ((self.truncated_message as u8) << 1)
                | ((self.authoritative_answer as u8) << 2)
                | ((self.opcode & 0x0F) << 3)
                | ((self.response as u8) << 7),
        )?;

        buffer.write_u8(
            self.response_code.into_num()
                | ((self.z & 0x07) << 4)
                | ((self.recursion_available as u8) << 7),
        )?;

        buffer.write_u16(self.questions)?;
        buffer.write_u16(self.answers)?;
        buffer.write_u16(self.authoritative_entries)?;
        buffer.write_u16(self.resource_entries)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Header, ResponseCode};

    #[test]
    fn should_roundtrip_query_header() {
        let header = Header::question(0x1234);
        let mut buffer = crate::buffer::BytePacketBuffer::default();
        header.write(&mut buffer).unwrap();
        assert_eq!(buffer.pos, super::HEADER_SIZE);
        assert_eq!(&buffer.buf[..4], &[0x12, 0x34, 0x00, 0x00]);
        assert_eq!(buffer.buf[5], 1);

        buffer.pos = 0;
        let read = Header::read(&mut buffer).unwrap();
        assert_eq!(read, header);
    }

    #[test]
    fn should_decompose_flags() {
        // QR=1, opcode=2, AA=1, TC=0, RD=1, RA=1, Z=5, RCODE=3
        let bytes = [0xAB, 0xCD, 0x95, 0xD3, 0, 1, 0, 2, 0, 3, 0, 4];
        let mut buffer = crate::buffer::BytePacketBuffer::default();
        buffer.buf[..bytes.len()].copy_from_slice(&bytes);
        buffer.len = bytes.len();

        let header = Header::read(&mut buffer).unwrap();
        assert_eq!(header.id, 0xABCD);
        assert!(header.response);
        assert_eq!(header.opcode, 2);
        assert!(header.authoritative_answer);
        assert!(!header.truncated_message);
        assert!(header.recursion_desired);
        assert!(header.recursion_available);
        assert_eq!(header.z, 5);
        assert_eq!(header.response_code, ResponseCode::NameError);
        assert_eq!(header.questions, 1);
        assert_eq!(header.answers, 2);
        assert_eq!(header.authoritative_entries, 3);
        assert_eq!(header.resource_entries, 4);
    }

    #[test]
    fn should_keep_unknown_response_code() {
        assert_eq!(ResponseCode::from_num(11), ResponseCode::Unknown(11));
        assert_eq!(ResponseCode::from_num(11).into_num(), 11);
    }

    #[test]
    fn should_fail_on_short_header() {
        let mut buffer = crate::buffer::BytePacketBuffer::default();
        buffer.len = 5;
        let error = Header::read(&mut buffer).unwrap_err();
        assert_eq!(error, crate::buffer::DecodeError::Truncated);
    }
}
