//! Byte layouts of private and public keys.
//!
//! Encoding never fails. Decoding checks the total length and the size tag, and requires
//! the two to agree for public keys (the length alone selects the layout).

use crate::{
    gost::{Size, HEX_LENGTH, PRIVATE_KEY_LENGTH},
    Error,
};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use commonware_codec::{EncodeSize, Error as CodecError, FixedSize, Read, ReadExt, Write};
use commonware_utils::hex;
use std::{
    fmt::{Debug, Display},
    ops::Range,
};

const NAME: &str = "gost";
const CONTAINER: Range<usize> = 1..1 + HEX_LENGTH;
const PASSWORD: Range<usize> = 1 + HEX_LENGTH..PRIVATE_KEY_LENGTH;

fn check_hex(field: &[u8]) -> Result<(), Error> {
    if field.len() != HEX_LENGTH {
        return Err(Error::InvalidLength("64", field.len()));
    }
    if !field.iter().all(u8::is_ascii_hexdigit) {
        return Err(Error::InvalidHex);
    }
    Ok(())
}

/// Encoded private key: `tag ‖ container hex ‖ password hex`.
///
/// The record references a provider container; it holds no key material.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PrivateRecord {
    raw: [u8; PRIVATE_KEY_LENGTH],
}

impl PrivateRecord {
    /// Build a record from derived hex values.
    pub fn new(size: Size, container: &str, password: &str) -> Result<Self, Error> {
        check_hex(container.as_bytes())?;
        check_hex(password.as_bytes())?;
        let mut raw = [0u8; PRIVATE_KEY_LENGTH];
        let mut buf = &mut raw[..];
        buf.put_u8(size.tag());
        buf.put_slice(container.as_bytes());
        buf.put_slice(password.as_bytes());
        Ok(Self { raw })
    }

    /// Security level of the key.
    pub fn size(&self) -> Size {
        match self.raw[0] {
            80 => Size::K256,
            _ => Size::K512,
        }
    }

    /// Derived container name (hex).
    pub fn container(&self) -> &str {
        std::str::from_utf8(&self.raw[CONTAINER]).unwrap_or_default()
    }

    /// Derived container password (hex).
    pub fn password(&self) -> &str {
        std::str::from_utf8(&self.raw[PASSWORD]).unwrap_or_default()
    }

    /// Encode the record.
    pub fn encode(&self) -> [u8; PRIVATE_KEY_LENGTH] {
        self.raw
    }
}

impl TryFrom<&[u8]> for PrivateRecord {
    type Error = Error;
    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let raw: [u8; PRIVATE_KEY_LENGTH] = value
            .try_into()
            .map_err(|_| Error::InvalidLength("129", value.len()))?;
        Size::try_from(raw[0])?;
        check_hex(&raw[CONTAINER])?;
        check_hex(&raw[PASSWORD])?;
        Ok(Self { raw })
    }
}

impl TryFrom<&Vec<u8>> for PrivateRecord {
    type Error = Error;
    fn try_from(value: &Vec<u8>) -> Result<Self, Self::Error> {
        Self::try_from(value.as_slice())
    }
}

impl Write for PrivateRecord {
    fn write(&self, buf: &mut impl BufMut) {
        self.raw.write(buf);
    }
}

impl Read for PrivateRecord {
    type Cfg = ();

    fn read_cfg(buf: &mut impl Buf, _: &()) -> Result<Self, CodecError> {
        let raw = <[u8; PRIVATE_KEY_LENGTH]>::read(buf)?;
        Self::try_from(&raw[..]).map_err(|err| CodecError::Wrapped(NAME, err.into()))
    }
}

impl FixedSize for PrivateRecord {
    const SIZE: usize = PRIVATE_KEY_LENGTH;
}

impl AsRef<[u8]> for PrivateRecord {
    fn as_ref(&self) -> &[u8] {
        &self.raw
    }
}

impl Debug for PrivateRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.size(), self.container())
    }
}

/// Encoded public key: `tag ‖ raw provider key`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PublicRecord {
    raw: Bytes,
}

impl PublicRecord {
    /// Prefix a raw provider key with the size tag.
    pub fn new(size: Size, key: &[u8]) -> Result<Self, Error> {
        if key.len() + 1 != size.public_key_length() {
            let expected = match size {
                Size::K256 => "101",
                Size::K512 => "167",
            };
            return Err(Error::InvalidLength(expected, key.len()));
        }
        let mut buf = BytesMut::with_capacity(1 + key.len());
        buf.put_u8(size.tag());
        buf.put_slice(key);
        Self::try_from(buf.as_ref())
    }

    /// Security level of the key.
    pub fn size(&self) -> Size {
        match self.raw.len() {
            len if len == Size::K256.public_key_length() => Size::K256,
            _ => Size::K512,
        }
    }

    /// Raw provider key (without the tag).
    pub fn key(&self) -> &[u8] {
        &self.raw[1..]
    }

    /// Encode the record.
    pub fn encode(&self) -> Bytes {
        self.raw.clone()
    }
}

impl TryFrom<&[u8]> for PublicRecord {
    type Error = Error;
    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let size = Size::from_public_key_length(value.len())
            .ok_or(Error::InvalidLength("102 or 168", value.len()))?;
        let tag = value[0];
        if Size::try_from(tag)? != size {
            return Err(Error::InvalidSizeTag(tag));
        }
        Ok(Self {
            raw: Bytes::copy_from_slice(value),
        })
    }
}

impl TryFrom<&Vec<u8>> for PublicRecord {
    type Error = Error;
    fn try_from(value: &Vec<u8>) -> Result<Self, Self::Error> {
        Self::try_from(value.as_slice())
    }
}

impl Write for PublicRecord {
    fn write(&self, buf: &mut impl BufMut) {
        buf.put_slice(&self.raw);
    }
}

impl Read for PublicRecord {
    type Cfg = ();

    /// Reads the tag, then the raw key of the size it names.
    fn read_cfg(buf: &mut impl Buf, _: &()) -> Result<Self, CodecError> {
        let tag = u8::read(buf)?;
        let size = Size::try_from(tag).map_err(|err| CodecError::Wrapped(NAME, err.into()))?;
        let len = size.public_key_length();
        if buf.remaining() < len - 1 {
            return Err(CodecError::EndOfBuffer);
        }
        let mut raw = vec![0u8; len];
        raw[0] = tag;
        buf.copy_to_slice(&mut raw[1..]);
        Self::try_from(&raw[..]).map_err(|err| CodecError::Wrapped(NAME, err.into()))
    }
}

impl EncodeSize for PublicRecord {
    fn encode_size(&self) -> usize {
        self.raw.len()
    }
}

impl AsRef<[u8]> for PublicRecord {
    fn as_ref(&self) -> &[u8] {
        &self.raw
    }
}

impl Debug for PublicRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex(&self.raw))
    }
}

impl Display for PublicRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex(&self.raw))
    }
}
