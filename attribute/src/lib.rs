//! Directory-protocol attribute: a named field plus an ordered list of
//! values, with canonical BER serialization.
//!
//! ```asn1
//! Attribute ::= SEQUENCE {
//!     type   OCTET STRING,
//!     values SET OF OCTET STRING   -- may be empty
//! }
//! ```
//!
//! Values are stored as raw byte buffers. The text view of the values is
//! derived on every read from the encoding policy selected by the type
//! name: a type carrying the `;binary` suffix projects its values as
//! base64, any other type projects them as UTF-8. On the wire a value is
//! always the raw bytes, never base64 text.

use std::cmp::Ordering;
use std::fmt;

use base64::{Engine, engine::general_purpose::STANDARD};
use ber::{Ber, Tag, Tlv};
use codec::decoder::{DecodableFrom, Decoder};
use codec::encoder::{EncodableTo, Encoder};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

pub mod error;

use error::{Error, Result};

/// Type name suffix selecting the base64 value projection.
const BINARY_SUFFIX: &str = ";binary";

/// A value handed to an attribute before storage normalization.
///
/// Text goes through the encoding policy of the owning attribute's type;
/// a buffer is stored as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    Text(String),
    Buffer(Vec<u8>),
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Text(value)
    }
}

impl From<Vec<u8>> for AttributeValue {
    fn from(value: Vec<u8>) -> Self {
        AttributeValue::Buffer(value)
    }
}

impl From<&[u8]> for AttributeValue {
    fn from(value: &[u8]) -> Self {
        AttributeValue::Buffer(value.to_vec())
    }
}

/// The attribute entity.
///
/// Raw byte buffers are the canonical storage; insertion order is
/// preserved through serialization and deserialization. The SET tag on
/// the wire does not make this a mathematical set: values are not
/// deduplicated or reordered.
#[derive(Debug, Clone)]
pub struct Attribute {
    attr_type: String,
    values: Vec<Vec<u8>>,
}

impl Attribute {
    /// Creates an attribute with no values.
    pub fn new(attr_type: impl Into<String>) -> Self {
        Attribute {
            attr_type: attr_type.into(),
            values: Vec::new(),
        }
    }

    /// Creates an attribute and stores the given values in order.
    pub fn with_values<I, V>(attr_type: impl Into<String>, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<AttributeValue>,
    {
        let mut attribute = Attribute::new(attr_type);
        attribute.add_values(values)?;
        Ok(attribute)
    }

    pub fn attr_type(&self) -> &str {
        &self.attr_type
    }

    /// Replaces the type name. The value storage is untouched; only the
    /// text projection of existing values may change.
    pub fn set_attr_type(&mut self, attr_type: impl Into<String>) {
        self.attr_type = attr_type.into();
    }

    /// Whether values of this attribute project as base64 text.
    pub fn is_binary(&self) -> bool {
        self.attr_type.ends_with(BINARY_SUFFIX)
    }

    /// Appends one value. A buffer is stored as-is; text is encoded per
    /// the current type's policy first.
    pub fn add_value(&mut self, value: impl Into<AttributeValue>) -> Result<()> {
        let raw = match value.into() {
            AttributeValue::Buffer(buf) => buf,
            AttributeValue::Text(text) => {
                if self.is_binary() {
                    STANDARD.decode(text.as_bytes()).map_err(Error::Base64Decode)?
                } else {
                    text.into_bytes()
                }
            }
        };
        self.values.push(raw);
        Ok(())
    }

    /// Appends every value in order. This is additive onto whatever is
    /// already stored; to replace values, build a fresh attribute.
    pub fn add_values<I, V>(&mut self, values: I) -> Result<()>
    where
        I: IntoIterator<Item = V>,
        V: Into<AttributeValue>,
    {
        for value in values {
            self.add_value(value)?;
        }
        Ok(())
    }

    /// Text projection of the stored values, recomputed from the current
    /// type's policy on every call.
    pub fn values(&self) -> Vec<String> {
        self.values.iter().map(|v| self.project(v)).collect()
    }

    /// The raw byte buffers, in storage order.
    pub fn buffers(&self) -> &[Vec<u8>] {
        &self.values
    }

    fn project(&self, raw: &[u8]) -> String {
        if self.is_binary() {
            STANDARD.encode(raw)
        } else {
            String::from_utf8_lossy(raw).into_owned()
        }
    }

    /// Serializes to BER bytes: `SEQUENCE { type, SET OF value }`.
    ///
    /// An attribute without values still carries an empty SET element.
    pub fn to_ber(&self) -> Result<Vec<u8>> {
        let tlv = self.encode()?;
        Ber::new(vec![tlv]).encode().map_err(Error::Ber)
    }

    /// Deserializes an attribute from BER bytes.
    ///
    /// Either fully succeeds or fails; a malformed or truncated input
    /// never yields a partially populated attribute.
    pub fn from_ber(input: &[u8]) -> Result<Attribute> {
        let ber: Ber = input.decode().map_err(Error::Ber)?;
        let tlv = ber
            .tlvs()
            .first()
            .ok_or_else(|| Error::InvalidAttribute("empty BER input".into()))?;
        tlv.decode()
    }

    /// Fans a plain object out into one attribute per key.
    ///
    /// Each key maps to a single value or an array of values; a value is
    /// text or a byte array. Key iteration order of the host map is used.
    pub fn from_object(object: &JsonValue) -> Result<Vec<Attribute>> {
        let Some(map) = object.as_object() else {
            return Err(Error::InvalidValue(
                "expected an object of attribute values".into(),
            ));
        };
        let mut attributes = Vec::with_capacity(map.len());
        for (attr_type, value) in map {
            let mut attribute = Attribute::new(attr_type);
            match value {
                JsonValue::Array(items) => {
                    for item in items {
                        attribute.add_value(plain_value(item)?)?;
                    }
                }
                other => attribute.add_value(plain_value(other)?)?,
            }
            attributes.push(attribute);
        }
        Ok(attributes)
    }

    /// Three-way comparison defining a strict total order: by type, then
    /// by value count, then by values pairwise in storage order.
    pub fn compare<A, B>(a: &A, b: &B) -> Ordering
    where
        A: AttributeLike + ?Sized,
        B: AttributeLike + ?Sized,
    {
        match a.attr_type().cmp(b.attr_type()) {
            Ordering::Equal => {}
            ord => return ord,
        }
        let a_values = a.values();
        let b_values = b.values();
        match a_values.len().cmp(&b_values.len()) {
            Ordering::Equal => {}
            ord => return ord,
        }
        for (x, y) in a_values.iter().zip(b_values.iter()) {
            match x.cmp(y) {
                Ordering::Equal => {}
                ord => return ord,
            }
        }
        Ordering::Equal
    }
}

/// Capability interface for attribute-like operands.
///
/// The comparator accepts anything exposing a text type and a text value
/// projection, not only the concrete [`Attribute`]. For externally
/// constructed plain data, see [`is_attribute`].
pub trait AttributeLike {
    fn attr_type(&self) -> &str;
    fn values(&self) -> Vec<String>;
}

impl AttributeLike for Attribute {
    fn attr_type(&self) -> &str {
        &self.attr_type
    }

    fn values(&self) -> Vec<String> {
        Attribute::values(self)
    }
}

impl Ord for Attribute {
    fn cmp(&self, other: &Self) -> Ordering {
        Attribute::compare(self, other)
    }
}

impl PartialOrd for Attribute {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Attribute {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Attribute {}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: [{}]", self.attr_type, self.values().join(", "))
    }
}

/// Structural shape check for externally constructed plain data.
///
/// Accepts an object with a text `type` field and a `values` array whose
/// every element is text or a byte array.
pub fn is_attribute(value: &JsonValue) -> bool {
    let Some(map) = value.as_object() else {
        return false;
    };
    if !map.get("type").is_some_and(JsonValue::is_string) {
        return false;
    }
    let Some(values) = map.get("values").and_then(JsonValue::as_array) else {
        return false;
    };
    values.iter().all(is_value_shape)
}

fn is_value_shape(value: &JsonValue) -> bool {
    match value {
        JsonValue::String(_) => true,
        JsonValue::Array(bytes) => bytes
            .iter()
            .all(|b| b.as_u64().is_some_and(|n| n <= u8::MAX as u64)),
        _ => false,
    }
}

fn plain_value(value: &JsonValue) -> Result<AttributeValue> {
    match value {
        JsonValue::String(text) => Ok(AttributeValue::Text(text.clone())),
        JsonValue::Array(bytes) => {
            let buf = bytes
                .iter()
                .map(|b| {
                    b.as_u64()
                        .and_then(|n| u8::try_from(n).ok())
                        .ok_or_else(|| Error::InvalidValue(format!("not an octet: {b}")))
                })
                .collect::<Result<Vec<u8>>>()?;
            Ok(AttributeValue::Buffer(buf))
        }
        other => Err(Error::InvalidValue(format!(
            "expected text or raw bytes, got {other}"
        ))),
    }
}

impl EncodableTo<Attribute> for Tlv {}

impl Encoder<Attribute, Tlv> for Attribute {
    type Error = Error;

    fn encode(&self) -> Result<Tlv> {
        let values = self
            .values
            .iter()
            .map(|v| Tlv::new_primitive(Tag::OctetString, v.clone()))
            .collect();
        Ok(Tlv::new_constructed(
            Tag::Sequence,
            vec![
                Tlv::new_primitive(Tag::OctetString, self.attr_type.clone().into_bytes()),
                Tlv::new_constructed(Tag::Set, values),
            ],
        ))
    }
}

impl DecodableFrom<Tlv> for Attribute {}

impl Decoder<Tlv, Attribute> for Tlv {
    type Error = Error;

    fn decode(&self) -> Result<Attribute> {
        if self.tag() != Tag::Sequence {
            return Err(Error::InvalidAttribute(
                "attribute must be a SEQUENCE".into(),
            ));
        }
        let elements = self.tlvs().unwrap_or_default();

        let Some(type_tlv) = elements.first() else {
            return Err(Error::InvalidAttribute("missing attribute type".into()));
        };
        if type_tlv.tag() != Tag::OctetString {
            return Err(Error::InvalidAttribute(
                "attribute type must be an OCTET STRING".into(),
            ));
        }
        let Some(type_data) = type_tlv.data() else {
            return Err(Error::InvalidAttribute(
                "attribute type must be a primitive element".into(),
            ));
        };
        let attr_type = String::from_utf8(type_data.to_vec()).map_err(Error::InvalidType)?;

        // A missing SET, or a second element that is not a SET, means an
        // attribute without values. Both shapes are valid on the wire.
        let mut values = Vec::new();
        if let Some(set) = elements.get(1).filter(|tlv| tlv.tag() == Tag::Set) {
            for value in set.tlvs().unwrap_or_default() {
                if value.tag() != Tag::OctetString {
                    return Err(Error::InvalidAttribute(
                        "attribute value must be an OCTET STRING".into(),
                    ));
                }
                values.push(value.data().unwrap_or_default().to_vec());
            }
        }

        Ok(Attribute { attr_type, values })
    }
}

impl Serialize for Attribute {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        // Always the text projection, never raw bytes.
        let mut state = serializer.serialize_struct("Attribute", 2)?;
        state.serialize_field("type", &self.attr_type)?;
        state.serialize_field("values", &self.values())?;
        state.end()
    }
}

impl<'de> Deserialize<'de> for Attribute {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Plain {
            #[serde(rename = "type")]
            attr_type: String,
            #[serde(default)]
            values: Vec<String>,
        }

        let plain = Plain::deserialize(deserializer)?;
        Attribute::with_values(plain.attr_type, plain.values).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[rstest]
    #[case("cn", vec!["foo"])]
    #[case("objectClass", vec!["top", "person", "organizationalPerson"])]
    #[case("sn", vec![])]
    #[case("description", vec!["", "second"])]
    fn test_ber_roundtrip(#[case] attr_type: &str, #[case] values: Vec<&str>) {
        let attribute = Attribute::with_values(attr_type, values.clone()).unwrap();

        let bytes = attribute.to_ber().unwrap();
        let decoded = Attribute::from_ber(&bytes).unwrap();

        assert_eq!(attr_type, decoded.attr_type());
        assert_eq!(values, decoded.values());
    }

    #[test]
    fn test_ber_roundtrip_binary_values() {
        let raw = vec![0x00, 0xff, 0x10, 0x80];
        let attribute = Attribute::with_values("userCertificate;binary", [raw.clone()]).unwrap();

        let bytes = attribute.to_ber().unwrap();
        let decoded = Attribute::from_ber(&bytes).unwrap();

        // the wire carries the decoded payload, not base64 text
        assert_eq!(&[raw], decoded.buffers());
        assert_eq!(attribute.values(), decoded.values());
    }

    #[test]
    fn test_empty_values_wire_shape() {
        let attribute = Attribute::new("sn");

        let bytes = attribute.to_ber().unwrap();
        // SEQUENCE { OCTET STRING "sn", SET {} }
        assert_eq!(vec![0x30, 0x06, 0x04, 0x02, 0x73, 0x6e, 0x31, 0x00], bytes);

        let decoded = Attribute::from_ber(&bytes).unwrap();
        assert_eq!("sn", decoded.attr_type());
        assert!(decoded.values().is_empty());
    }

    #[test]
    fn test_decode_sequence_without_set() {
        // SEQUENCE { OCTET STRING "cn" } with no SET element at all
        let bytes = vec![0x30, 0x04, 0x04, 0x02, 0x63, 0x6e];
        let decoded = Attribute::from_ber(&bytes).unwrap();
        assert_eq!("cn", decoded.attr_type());
        assert!(decoded.values().is_empty());
    }

    #[rstest]
    // SEQUENCE claims 12 content bytes but fewer follow
    #[case(vec![0x30, 0x0c, 0x04, 0x02, 0x73, 0x6e])]
    // not a SEQUENCE at the top
    #[case(vec![0x04, 0x02, 0x73, 0x6e])]
    // type is an INTEGER, not an OCTET STRING
    #[case(vec![0x30, 0x05, 0x02, 0x01, 0x05, 0x31, 0x00])]
    // SEQUENCE length field declares 9 octets of length
    #[case(vec![0x30, 0x89, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01])]
    // empty input
    #[case(vec![])]
    fn test_decode_malformed_input(#[case] bytes: Vec<u8>) {
        assert!(Attribute::from_ber(&bytes).is_err());
    }

    #[test]
    fn test_binary_policy() {
        let raw = vec![0xde, 0xad, 0xbe, 0xef];
        let mut attribute = Attribute::new("x;binary");
        attribute.add_value(raw.clone()).unwrap();

        // text projection is base64 of the stored bytes
        assert_eq!(vec![STANDARD.encode(&raw)], attribute.values());

        // base64 text decodes back to the exact original bytes
        let mut from_text = Attribute::new("x;binary");
        from_text.add_value(STANDARD.encode(&raw)).unwrap();
        assert_eq!(&[raw], from_text.buffers());
    }

    #[test]
    fn test_binary_policy_rejects_bad_base64() {
        let mut attribute = Attribute::new("x;binary");
        assert!(matches!(
            attribute.add_value("not base64 !!"),
            Err(Error::Base64Decode(_))
        ));
        assert!(attribute.buffers().is_empty());
    }

    #[test]
    fn test_add_values_is_additive() {
        let mut attribute = Attribute::new("cn");
        attribute.add_values(["a", "b"]).unwrap();
        attribute.add_value("c").unwrap();

        assert_eq!(vec!["a", "b", "c"], attribute.values());
    }

    #[test]
    fn test_projection_follows_type_mutation() {
        let mut attribute = Attribute::new("x");
        attribute.add_value("hi").unwrap();
        assert_eq!(vec!["hi"], attribute.values());

        // same storage, new policy
        attribute.set_attr_type("x;binary");
        assert_eq!(vec![STANDARD.encode(b"hi")], attribute.values());
    }

    #[rstest]
    #[case("a", vec!["v"], "a", vec!["v"], Ordering::Equal)]
    #[case("a", vec!["v"], "b", vec![], Ordering::Less)]
    #[case("b", vec![], "a", vec!["v"], Ordering::Greater)]
    #[case("a", vec!["v", "v"], "a", vec!["v"], Ordering::Greater)]
    #[case("a", vec!["v"], "a", vec!["w"], Ordering::Less)]
    #[case("a", vec!["x", "b"], "a", vec!["x", "a"], Ordering::Greater)]
    fn test_compare(
        #[case] a_type: &str,
        #[case] a_values: Vec<&str>,
        #[case] b_type: &str,
        #[case] b_values: Vec<&str>,
        #[case] expected: Ordering,
    ) {
        let a = Attribute::with_values(a_type, a_values).unwrap();
        let b = Attribute::with_values(b_type, b_values).unwrap();

        assert_eq!(expected, Attribute::compare(&a, &b));
        assert_eq!(expected, a.cmp(&b));
    }

    #[test]
    fn test_sorting_is_deterministic() {
        let mut attributes = vec![
            Attribute::with_values("sn", ["b"]).unwrap(),
            Attribute::with_values("cn", ["a", "b"]).unwrap(),
            Attribute::with_values("cn", ["a"]).unwrap(),
        ];
        attributes.sort();

        let types: Vec<_> = attributes.iter().map(|a| a.values().len()).collect();
        assert_eq!("cn", attributes[0].attr_type());
        assert_eq!(vec![1, 2, 1], types);
    }

    #[rstest]
    #[case(json!({"type": "cn", "values": ["x", [0, 255, 16]]}), true)]
    #[case(json!({"type": "cn", "values": []}), true)]
    #[case(json!({"type": "cn", "values": [42]}), false)]
    #[case(json!({"type": "cn", "values": [[300]]}), false)]
    #[case(json!({"type": 1, "values": ["x"]}), false)]
    #[case(json!({"values": ["x"]}), false)]
    #[case(json!({"type": "cn"}), false)]
    #[case(json!("cn"), false)]
    fn test_is_attribute(#[case] value: JsonValue, #[case] expected: bool) {
        assert_eq!(expected, is_attribute(&value));
    }

    #[test]
    fn test_serialized_attribute_satisfies_shape_predicate() {
        let attribute = Attribute::with_values("cn", ["foo"]).unwrap();
        let value = serde_json::to_value(&attribute).unwrap();
        assert!(is_attribute(&value));
    }

    #[test]
    fn test_from_object() {
        let object = json!({
            "cn": ["foo", "bar"],
            "sn": "baz",
            "jpegPhoto": [[0xff, 0xd8]],
        });

        let mut attributes = Attribute::from_object(&object).unwrap();
        attributes.sort();
        assert_eq!(3, attributes.len());

        assert_eq!("cn", attributes[0].attr_type());
        assert_eq!(vec!["foo", "bar"], attributes[0].values());
        assert_eq!("jpegPhoto", attributes[1].attr_type());
        assert_eq!(&[vec![0xff, 0xd8]], attributes[1].buffers());
        assert_eq!("sn", attributes[2].attr_type());
        assert_eq!(vec!["baz"], attributes[2].values());
    }

    #[rstest]
    #[case(json!({"cn": 42}))]
    #[case(json!({"cn": [true]}))]
    #[case(json!(["cn"]))]
    fn test_from_object_rejects_non_text_values(#[case] object: JsonValue) {
        assert!(Attribute::from_object(&object).is_err());
    }

    #[test]
    fn test_json_projection() {
        let attribute = Attribute::with_values("cn", ["foo", "bar"]).unwrap();
        let json = serde_json::to_string(&attribute).unwrap();
        assert_eq!(r#"{"type":"cn","values":["foo","bar"]}"#, json);

        let parsed: Attribute = serde_json::from_str(&json).unwrap();
        assert_eq!(attribute, parsed);
    }

    #[test]
    fn test_json_projection_without_values() {
        let parsed: Attribute = serde_json::from_str(r#"{"type":"dc"}"#).unwrap();
        assert_eq!("dc", parsed.attr_type());
        assert!(parsed.values().is_empty());
    }

    #[test]
    fn test_display() {
        let attribute = Attribute::with_values("cn", ["foo", "bar"]).unwrap();
        assert_eq!("cn: [foo, bar]", attribute.to_string());
    }
}
