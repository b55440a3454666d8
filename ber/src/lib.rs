//! Basic Encoding Rules (BER) TLV layer.
//!
//! Parses raw bytes into a tree of tag-length-value elements and writes
//! such a tree back out with definite lengths. Higher layers (the
//! `attribute` crate) map these elements onto protocol structures.

use codec::decoder::{DecodableFrom, Decoder};
use codec::encoder::{EncodableTo, Encoder};
use nom::{IResult, Parser};

pub mod error;

use error::Error;

/// Bit 6 of the identifier octet marks a constructed encoding.
pub const TAG_CONSTRUCTED: u8 = 0x20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Boolean,
    Integer,
    OctetString,
    Null,
    Enumerated,
    Sequence,
    Set,
    Unimplemented(u8),
}

impl From<u8> for Tag {
    fn from(value: u8) -> Self {
        match value {
            0x01 => Self::Boolean,
            0x02 => Self::Integer,
            0x04 => Self::OctetString,
            0x05 => Self::Null,
            0x0a => Self::Enumerated,
            0x30 => Self::Sequence,
            0x31 => Self::Set,
            _ => Self::Unimplemented(value),
        }
    }
}

impl From<Tag> for u8 {
    fn from(tag: Tag) -> Self {
        match tag {
            Tag::Boolean => 0x01,
            Tag::Integer => 0x02,
            Tag::OctetString => 0x04,
            Tag::Null => 0x05,
            Tag::Enumerated => 0x0a,
            Tag::Sequence => 0x30,
            Tag::Set => 0x31,
            Tag::Unimplemented(value) => value,
        }
    }
}

/// One tag-length-value element.
///
/// Constructed elements hold their children as parsed TLVs; primitive
/// elements hold their content octets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tlv {
    tag: Tag,
    value: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Value {
    Constructed(Vec<Tlv>),
    Primitive(Vec<u8>),
}

impl Tlv {
    pub fn new_primitive(tag: Tag, data: Vec<u8>) -> Self {
        Tlv {
            tag,
            value: Value::Primitive(data),
        }
    }

    pub fn new_constructed(tag: Tag, tlvs: Vec<Tlv>) -> Self {
        Tlv {
            tag,
            value: Value::Constructed(tlvs),
        }
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }

    /// Content octets of a primitive element. `None` for constructed ones.
    pub fn data(&self) -> Option<&[u8]> {
        match &self.value {
            Value::Primitive(data) => Some(data),
            Value::Constructed(_) => None,
        }
    }

    /// Child elements of a constructed element. `None` for primitive ones.
    pub fn tlvs(&self) -> Option<&[Tlv]> {
        match &self.value {
            Value::Constructed(tlvs) => Some(tlvs),
            Value::Primitive(_) => None,
        }
    }

    fn parse(input: &[u8]) -> IResult<&[u8], Tlv> {
        let (input, raw) = nom::number::be_u8().parse(input)?;
        let (input, length) = parse_length(input)?;
        let (input, data) = nom::bytes::complete::take(length).parse(input)?;

        let tag = Tag::from(raw);
        if raw & TAG_CONSTRUCTED == TAG_CONSTRUCTED {
            // parse children recursively.
            let mut tlvs = Vec::new();
            let mut data = data;
            while !data.is_empty() {
                let (rest, tlv) = Self::parse(data)?;
                data = rest;
                tlvs.push(tlv);
            }
            return Ok((input, Tlv::new_constructed(tag, tlvs)));
        }

        Ok((input, Tlv::new_primitive(tag, data.to_vec())))
    }

    /// Total number of octets this element occupies once encoded.
    pub fn encoded_len(&self) -> usize {
        let content = self.content_len();
        1 + length_field_len(content) + content
    }

    fn content_len(&self) -> usize {
        match &self.value {
            Value::Primitive(data) => data.len(),
            Value::Constructed(tlvs) => tlvs.iter().map(Tlv::encoded_len).sum(),
        }
    }

    pub fn write(&self, buf: &mut Vec<u8>) {
        buf.push(u8::from(self.tag));
        write_length(buf, self.content_len());
        match &self.value {
            Value::Primitive(data) => buf.extend_from_slice(data),
            Value::Constructed(tlvs) => {
                for tlv in tlvs {
                    tlv.write(buf);
                }
            }
        }
    }
}

fn parse_length(input: &[u8]) -> IResult<&[u8], u64> {
    let (input, n) = nom::number::be_u8().parse(input)?;
    if n & 0x80 == 0x80 {
        // long form
        // First 1 bit is a marker for long form.
        // Other bits represent bytes length of the length field.
        let length = n & 0x7f;
        if length > 8 {
            // cannot fit in u64; a parse error, not a panic
            return Err(nom::Err::Error(nom::error::Error::new(
                input,
                nom::error::ErrorKind::TooLarge,
            )));
        }
        let (input, bs) = nom::bytes::complete::take(length).parse(input)?;
        let n = bs.iter().fold(0u64, |n, &b| (n << 8) | b as u64);
        return Ok((input, n));
    }
    // short form: 0-127
    Ok((input, n as u64))
}

fn write_length(buf: &mut Vec<u8>, length: usize) {
    if length < 0x80 {
        buf.push(length as u8);
        return;
    }
    let bytes = length.to_be_bytes();
    let skip = bytes.iter().take_while(|&&b| b == 0).count();
    buf.push(0x80 | (bytes.len() - skip) as u8);
    buf.extend_from_slice(&bytes[skip..]);
}

fn length_field_len(length: usize) -> usize {
    if length < 0x80 {
        return 1;
    }
    let skip = length.to_be_bytes().iter().take_while(|&&b| b == 0).count();
    1 + size_of::<usize>() - skip
}

/// A parsed BER message: the sequence of top-level TLV elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ber {
    tlvs: Vec<Tlv>,
}

impl Ber {
    pub fn new(tlvs: Vec<Tlv>) -> Self {
        Ber { tlvs }
    }

    pub fn tlvs(&self) -> &[Tlv] {
        &self.tlvs
    }
}

impl DecodableFrom<&[u8]> for Ber {}

impl Decoder<&[u8], Ber> for &[u8] {
    type Error = Error;

    fn decode(&self) -> Result<Ber, Error> {
        let mut input = *self;
        let mut tlvs = Vec::new();
        while !input.is_empty() {
            let (rest, tlv) = Tlv::parse(input).map_err(|e| match e {
                nom::Err::Incomplete(needed) => Error::ParserIncomplete(needed),
                nom::Err::Error(e) | nom::Err::Failure(e) => Error::Parser(e.code),
            })?;
            input = rest;
            tlvs.push(tlv);
        }
        Ok(Ber { tlvs })
    }
}

impl EncodableTo<Ber> for Vec<u8> {}

impl Encoder<Ber, Vec<u8>> for Ber {
    type Error = Error;

    fn encode(&self) -> Result<Vec<u8>, Error> {
        let mut buf = Vec::new();
        for tlv in &self.tlvs {
            tlv.write(&mut buf);
        }
        Ok(buf)
    }
}
