//! Structured body codecs shared by both modifier variants.
//!
//! Decoding treats an empty body as `None` rather than an error: an absent
//! body is valid, absent data is not malformed data.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Error;

pub(crate) const MEDIA_JSON: &str = "application/json";
pub(crate) const MEDIA_XML: &str = "application/xml";

pub(crate) fn encode_json<T: Serialize + ?Sized>(value: &T) -> Result<Bytes, Error> {
    serde_json::to_vec(value)
        .map(Bytes::from)
        .map_err(Error::EncodeJson)
}

pub(crate) fn encode_xml<T: Serialize>(value: &T) -> Result<Bytes, Error> {
    quick_xml::se::to_string(value)
        .map(Bytes::from)
        .map_err(Error::EncodeXml)
}

pub(crate) fn decode_json<T: DeserializeOwned>(buf: &[u8]) -> Result<Option<T>, Error> {
    if buf.is_empty() {
        return Ok(None);
    }
    serde_json::from_slice(buf)
        .map(Some)
        .map_err(Error::DecodeJson)
}

pub(crate) fn decode_xml<T: DeserializeOwned>(buf: &[u8]) -> Result<Option<T>, Error> {
    if buf.is_empty() {
        return Ok(None);
    }
    quick_xml::de::from_reader(buf)
        .map(Some)
        .map_err(Error::DecodeXml)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Person {
        name: String,
    }

    #[test]
    fn test_json_round_trip() {
        let encoded = encode_json(&Person {
            name: "Rick".into(),
        })
        .unwrap();
        let decoded: Option<Person> = decode_json(&encoded).unwrap();
        assert_eq!(decoded.unwrap().name, "Rick");
    }

    #[test]
    fn test_xml_round_trip() {
        let encoded = encode_xml(&Person {
            name: "Rick".into(),
        })
        .unwrap();
        let decoded: Option<Person> = decode_xml(&encoded).unwrap();
        assert_eq!(decoded.unwrap().name, "Rick");
    }

    #[test]
    fn test_empty_body_decodes_as_none() {
        let decoded: Option<Person> = decode_json(b"").unwrap();
        assert!(decoded.is_none());
        let decoded: Option<Person> = decode_xml(b"").unwrap();
        assert!(decoded.is_none());
    }

    #[test]
    fn test_malformed_body_is_an_error() {
        let decoded: Result<Option<Person>, Error> = decode_json(b"/");
        assert!(matches!(decoded, Err(Error::DecodeJson(_))));
        let decoded: Result<Option<Person>, Error> = decode_xml(b"]]>");
        assert!(matches!(decoded, Err(Error::DecodeXml(_))));
    }
}
