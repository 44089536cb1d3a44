//! Turn a user-supplied container name and password into fixed-length provider secrets.
//!
//! Two modes are supported:
//! - [Mode::Strict] derives both values with HMAC. The password is keyed by the raw
//!   container name, so reusing a password across containers yields unrelated secrets.
//! - [Mode::Soft] keeps the user's values readable: inputs shorter than a digest are
//!   extended with `:` and a prefix of their own digest. The provider sees the original
//!   strings (see [resolve]).
//!
//! Either way, the derived values are exactly [HEX_LENGTH] hex characters.

use crate::{
    gost::{codec::PrivateRecord, Size, HEX_LENGTH},
    hash::DIGEST_LENGTH,
    provider::KeySpec,
    Error, Hasher,
};
use commonware_utils::{from_hex, hex};
use std::fmt::Debug;
use tracing::debug;
use zeroize::Zeroize;

/// Separator between a soft-derived value and its padding.
const SEPARATOR: u8 = b':';

/// Transformation applied to the user's secrets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    /// HMAC-based derivation.
    #[default]
    Strict,
    /// Salt-and-pad derivation.
    Soft,
}

/// Configuration of a key container, as supplied by a user.
///
/// The plaintext password is zeroized when the configuration is dropped.
#[derive(Clone)]
pub struct Config {
    /// Security level of the key.
    pub size: Size,

    /// Name of the container.
    pub container: String,

    /// Password protecting the container.
    pub password: String,

    /// Derivation applied to `container` and `password`.
    pub mode: Mode,

    /// Key pair used when the loaded key signs or exports its public key.
    ///
    /// Defaults to [KeySpec::Signature] when unset.
    pub key_spec: Option<KeySpec>,
}

impl Config {
    /// Create a configuration using [Mode::Strict].
    pub fn new(size: Size, container: &str, password: &str) -> Self {
        Self {
            size,
            container: container.to_string(),
            password: password.to_string(),
            mode: Mode::Strict,
            key_spec: None,
        }
    }

    /// Create a configuration using [Mode::Soft].
    pub fn soft(size: Size, container: &str, password: &str) -> Self {
        let mut config = Self::new(size, container, password);
        config.mode = Mode::Soft;
        config
    }

    /// Bind loaded keys to `spec`.
    pub fn with_key_spec(mut self, spec: KeySpec) -> Self {
        self.key_spec = Some(spec);
        self
    }

    /// Derive the provider identity described by this configuration.
    pub fn derive<H: Hasher>(&self) -> Result<Identity, Error> {
        let (container, password) =
            derive::<H>(self.size, &self.container, &self.password, self.mode)?;
        debug!(size = %self.size, mode = ?self.mode, %container, "derived identity");
        Ok(Identity {
            record: PrivateRecord::new(self.size, &container, &password)?,
            key_spec: self.key_spec.unwrap_or_default(),
        })
    }
}

impl Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("size", &self.size)
            .field("container", &self.container)
            .field("password", &"[REDACTED]")
            .field("mode", &self.mode)
            .field("key_spec", &self.key_spec)
            .finish()
    }
}

impl Drop for Config {
    fn drop(&mut self) {
        self.password.zeroize();
    }
}

/// A derived, immutable container identity.
#[derive(Clone, PartialEq, Eq)]
pub struct Identity {
    record: PrivateRecord,
    key_spec: KeySpec,
}

impl Identity {
    /// Security level of the key.
    pub fn size(&self) -> Size {
        self.record.size()
    }

    /// Derived container name (hex).
    pub fn container(&self) -> &str {
        self.record.container()
    }

    /// Derived container password (hex).
    pub fn password(&self) -> &str {
        self.record.password()
    }

    /// Key pair that loaded keys are bound to.
    pub fn key_spec(&self) -> KeySpec {
        self.key_spec
    }

    /// The private key record referencing this container.
    pub fn record(&self) -> &PrivateRecord {
        &self.record
    }
}

impl Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("size", &self.size())
            .field("container", &self.container())
            .field("key_spec", &self.key_spec)
            .finish_non_exhaustive()
    }
}

/// Derive the hex container name and password for `mode`.
pub fn derive<H: Hasher>(
    size: Size,
    container: &str,
    password: &str,
    mode: Mode,
) -> Result<(String, String), Error> {
    match mode {
        Mode::Strict => Ok(wrap::<H>(size, container, password)),
        Mode::Soft => Ok((salt::<H>(container)?, salt::<H>(password)?)),
    }
}

/// Derive both values with HMAC.
///
/// The container is keyed by its name over the size tag, and the password is keyed by
/// itself over the raw container name.
pub fn wrap<H: Hasher>(size: Size, container: &str, password: &str) -> (String, String) {
    let derived_container = H::mac(container.as_bytes(), &[size.tag()]);
    let derived_password = H::mac(password.as_bytes(), container.as_bytes());
    (hex(&derived_container), hex(&derived_password))
}

/// Pad `data` to a digest length with `:` and a prefix of its own digest, then hex encode it.
///
/// Values of exactly [DIGEST_LENGTH] bytes are encoded unpadded; longer values are rejected.
pub fn salt<H: Hasher>(data: &str) -> Result<String, Error> {
    let data = data.as_bytes();
    if data.len() > DIGEST_LENGTH {
        return Err(Error::InvalidSecretLength(data.len()));
    }
    let mut buf = Vec::with_capacity(DIGEST_LENGTH);
    buf.extend_from_slice(data);
    if buf.len() < DIGEST_LENGTH {
        let digest = H::hash(data);
        buf.push(SEPARATOR);
        let remaining = DIGEST_LENGTH - buf.len();
        buf.extend_from_slice(&digest[..remaining]);
    }
    Ok(hex(&buf))
}

/// Recover the value handed to the provider from a derived hex value.
///
/// Soft-derived values resolve to the original string. Anything else (HMAC output,
/// unpadded values, undecodable input) is passed to the provider as the hex text itself.
pub fn resolve<H: Hasher>(derived: &str) -> String {
    let Some(decoded) = from_hex(derived) else {
        return derived.to_string();
    };
    if decoded.len() != DIGEST_LENGTH {
        return derived.to_string();
    }
    for (i, _) in decoded.iter().enumerate().filter(|(_, b)| **b == SEPARATOR) {
        let (data, padding) = (&decoded[..i], &decoded[i + 1..]);
        if padding != &H::hash(data)[..padding.len()] {
            continue;
        }
        if let Ok(name) = std::str::from_utf8(data) {
            return name.to_string();
        }
    }
    derived.to_string()
}
