//! Private keys, public keys, and signatures backed by a [Keystore].

use crate::{
    gost::{
        codec::{PrivateRecord, PublicRecord},
        derivation::resolve,
        Keystore, Size, KEY_TYPE, PRIVATE_KEY_LENGTH,
    },
    provider::{KeySpec, Provider},
    Digest, Error, Hasher,
};
use bytes::{Buf, BufMut, Bytes};
use commonware_codec::{EncodeSize, Error as CodecError, Read, Write};
use commonware_utils::hex;
use std::{
    fmt::{Debug, Display},
    hash::Hash,
    ops::Deref,
};
use tracing::warn;

/// A reference to a key pair held in a provider container.
///
/// Signing and public key export go through the provider on every call.
#[derive(Clone)]
pub struct PrivateKey<P: Provider> {
    record: PrivateRecord,
    keystore: Keystore<P>,
}

impl<P: Provider> PrivateKey<P> {
    pub(crate) fn new(record: PrivateRecord, keystore: Keystore<P>) -> Self {
        Self { record, keystore }
    }

    /// The encoded record of this key.
    pub fn record(&self) -> &PrivateRecord {
        &self.record
    }

    /// Security level of the key.
    pub fn size(&self) -> Size {
        self.record.size()
    }

    /// Encode the key.
    pub fn encode(&self) -> [u8; PRIVATE_KEY_LENGTH] {
        self.record.encode()
    }

    /// Algorithm name, e.g. `ГОСТ Р 34.10-2012 256`.
    pub fn type_name(&self) -> String {
        format!("{} {}", KEY_TYPE, self.size())
    }

    /// Export the public key of the `spec` key pair.
    pub fn public_key_for(&self, spec: KeySpec) -> Result<PublicKey<P>, Error> {
        self.keystore.derive_public_key(&self.record, spec)
    }

    /// Sign `msg` with the `spec` key pair.
    pub fn sign_with(&self, spec: KeySpec, msg: &[u8]) -> Result<Signature, Error> {
        self.keystore.sign(&self.record, spec, msg)
    }

    /// Bind the key to the `spec` key pair.
    pub fn bind(self, spec: KeySpec) -> Container<P> {
        Container { key: self, spec }
    }
}

impl<P: Provider> crate::Signer for PrivateKey<P> {
    type Signature = Signature;
    type PublicKey = PublicKey<P>;

    fn public_key(&self) -> Result<Self::PublicKey, Error> {
        self.public_key_for(KeySpec::Signature)
    }

    fn sign(&self, msg: &[u8]) -> Result<Self::Signature, Error> {
        self.sign_with(KeySpec::Signature, msg)
    }
}

impl<P: Provider> crate::PrivateKey for PrivateKey<P> {}

impl<P: Provider> PartialEq for PrivateKey<P> {
    fn eq(&self, other: &Self) -> bool {
        self.record == other.record
    }
}

impl<P: Provider> Eq for PrivateKey<P> {}

impl<P: Provider> AsRef<[u8]> for PrivateKey<P> {
    fn as_ref(&self) -> &[u8] {
        self.record.as_ref()
    }
}

impl<P: Provider> Display for PrivateKey<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Priv({}){{{} [REDACTED]}}",
            self.type_name(),
            resolve::<P::Hasher>(self.record.container())
        )
    }
}

impl<P: Provider> Debug for PrivateKey<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

/// A [PrivateKey] bound to one key pair of its container.
#[derive(Clone)]
pub struct Container<P: Provider> {
    key: PrivateKey<P>,
    spec: KeySpec,
}

impl<P: Provider> Container<P> {
    /// The unbound key.
    pub fn key(&self) -> &PrivateKey<P> {
        &self.key
    }

    /// Key pair used for signing and public key export.
    pub fn spec(&self) -> KeySpec {
        self.spec
    }
}

impl<P: Provider> crate::Signer for Container<P> {
    type Signature = Signature;
    type PublicKey = PublicKey<P>;

    fn public_key(&self) -> Result<Self::PublicKey, Error> {
        self.key.public_key_for(self.spec)
    }

    fn sign(&self, msg: &[u8]) -> Result<Self::Signature, Error> {
        self.key.sign_with(self.spec, msg)
    }
}

impl<P: Provider> crate::PrivateKey for Container<P> {}

impl<P: Provider> PartialEq for Container<P> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.spec == other.spec
    }
}

impl<P: Provider> AsRef<[u8]> for Container<P> {
    fn as_ref(&self) -> &[u8] {
        self.key.as_ref()
    }
}

impl<P: Provider> Debug for Container<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}/{:?}", self.key, self.spec)
    }
}

/// A public key exported from (and verified by) the provider.
///
/// Keys are identified by their address, the digest of the encoded key.
#[derive(Clone)]
pub struct PublicKey<P: Provider> {
    record: PublicRecord,
    address: Digest,
    keystore: Keystore<P>,
}

impl<P: Provider> PublicKey<P> {
    pub(crate) fn new(record: PublicRecord, keystore: Keystore<P>) -> Self {
        let address = P::Hasher::hash(record.as_ref());
        Self {
            record,
            address,
            keystore,
        }
    }

    /// The encoded record of this key.
    pub fn record(&self) -> &PublicRecord {
        &self.record
    }

    /// Security level of the key.
    pub fn size(&self) -> Size {
        self.record.size()
    }

    /// Encode the key.
    pub fn encode(&self) -> Bytes {
        self.record.encode()
    }

    /// Algorithm name, e.g. `ГОСТ Р 34.10-2012 256`.
    pub fn type_name(&self) -> String {
        format!("{} {}", KEY_TYPE, self.size())
    }
}

impl<P: Provider> crate::Verifier for PublicKey<P> {
    type Signature = Signature;

    fn verify(&self, msg: &[u8], sig: &Self::Signature) -> bool {
        match self.keystore.verify(&self.record, msg, sig) {
            Ok(valid) => valid,
            Err(err) => {
                warn!(address = %self.address, ?err, "verification not performed");
                false
            }
        }
    }
}

impl<P: Provider> crate::PublicKey for PublicKey<P> {
    fn address(&self) -> Digest {
        self.address
    }
}

impl<P: Provider> PartialEq for PublicKey<P> {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
    }
}

impl<P: Provider> Eq for PublicKey<P> {}

impl<P: Provider> Hash for PublicKey<P> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.address.hash(state);
    }
}

impl<P: Provider> AsRef<[u8]> for PublicKey<P> {
    fn as_ref(&self) -> &[u8] {
        self.record.as_ref()
    }
}

impl<P: Provider> Display for PublicKey<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Pub({}){{{}}}",
            self.type_name(),
            hex(self.record.as_ref()).to_uppercase()
        )
    }
}

impl<P: Provider> Debug for PublicKey<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

/// An opaque provider signature.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Signature(Bytes);

impl Signature {
    /// Wrap `bytes`, requiring the signature length of `size`.
    pub fn sized(size: Size, bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() != size.signature_length() {
            return Err(Error::InvalidSignatureLength(bytes.len()));
        }
        Ok(Self(Bytes::copy_from_slice(bytes)))
    }
}

impl crate::Signature for Signature {}

impl Write for Signature {
    fn write(&self, buf: &mut impl BufMut) {
        buf.put_slice(&self.0);
    }
}

impl Read for Signature {
    /// Signatures do not encode their length, so the reader names the key size.
    type Cfg = Size;

    fn read_cfg(buf: &mut impl Buf, size: &Size) -> Result<Self, CodecError> {
        let len = size.signature_length();
        if buf.remaining() < len {
            return Err(CodecError::EndOfBuffer);
        }
        Ok(Self(buf.copy_to_bytes(len)))
    }
}

impl EncodeSize for Signature {
    fn encode_size(&self) -> usize {
        self.0.len()
    }
}

impl From<Vec<u8>> for Signature {
    fn from(value: Vec<u8>) -> Self {
        Self(Bytes::from(value))
    }
}

impl AsRef<[u8]> for Signature {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Deref for Signature {
    type Target = [u8];
    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl Debug for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex(&self.0))
    }
}

impl Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex(&self.0))
    }
}
