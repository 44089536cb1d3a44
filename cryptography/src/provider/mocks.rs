//! An in-memory provider for tests.
//!
//! Keys and signatures are derived deterministically from a per-container secret with the
//! Streebog digest. They are not GOST signatures, but they have the right lengths, only
//! verify against the key that produced them, and exercise every provider code path.

use crate::{
    gost::Size,
    provider::{self, Created, Failure, KeySpec},
    Hasher, Streebog256,
};
use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

/// First byte of every public key blob exported by the mock (`PUBLICKEYBLOB`).
pub const PUBLIC_KEY_BLOB: u8 = 0x06;

const NOT_FOUND: i32 = -1;
const WRONG_PIN: i32 = -2;
const NO_KEY: i32 = -3;
const BAD_KEY: i32 = -4;
const INJECTED: i32 = -100;

struct Entry {
    pin: String,
    secret: [u8; 32],
}

#[derive(Default)]
struct State {
    containers: HashMap<(Size, String), Entry>,
    keys: HashMap<Vec<u8>, [u8; 32]>,
    failing: HashSet<&'static str>,
    generated: u64,
}

impl State {
    fn check(&self, operation: &'static str) -> Result<(), Failure> {
        if self.failing.contains(operation) {
            return Err(Failure::new(operation, INJECTED));
        }
        Ok(())
    }
}

/// Expand `seed` into `len` bytes by hashing it with a running counter.
fn expand(seed: &[&[u8]], len: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(len);
    let mut counter = 0u32;
    let mut hasher = Streebog256::new();
    while out.len() < len {
        for part in seed {
            hasher.update(part);
        }
        hasher.update(&counter.to_be_bytes());
        let block = hasher.finalize();
        let take = (len - out.len()).min(block.len());
        out.extend_from_slice(&block[..take]);
        counter += 1;
    }
    out
}

fn public_blob(size: Size, secret: &[u8; 32]) -> Vec<u8> {
    let mut blob = vec![PUBLIC_KEY_BLOB];
    blob.extend(expand(&[&secret[..], &b"public"[..]], size.public_key_length() - 2));
    blob
}

fn signature(size: Size, secret: &[u8; 32], message: &[u8]) -> Vec<u8> {
    expand(&[&secret[..], &b"sign"[..], message], size.signature_length())
}

/// Deterministic in-memory provider.
///
/// Clones share the same container store and handle counter.
#[derive(Clone, Default)]
pub struct Provider {
    state: Arc<Mutex<State>>,
    open: Arc<AtomicUsize>,
}

impl Provider {
    /// Create an empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of container and key handles currently held by callers.
    pub fn open_handles(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }

    /// Make every subsequent call of `operation` fail until [Provider::recover] is called.
    ///
    /// Operations are `create_container`, `check_container`, `open_container`,
    /// `import_public_key`, `public_key`, `sign`, and `verify`.
    pub fn fail(&self, operation: &'static str) {
        self.state.lock().unwrap().failing.insert(operation);
    }

    /// Stop failing `operation`.
    pub fn recover(&self, operation: &'static str) {
        self.state.lock().unwrap().failing.remove(operation);
    }

    /// Delete a container, returning whether it existed.
    pub fn remove_container(&self, size: Size, name: &str) -> bool {
        let mut state = self.state.lock().unwrap();
        match state.containers.remove(&(size, name.to_string())) {
            Some(entry) => {
                let blob = public_blob(size, &entry.secret);
                state.keys.remove(&blob);
                true
            }
            None => false,
        }
    }

    /// Whether a container named `name` exists.
    pub fn contains(&self, size: Size, name: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .containers
            .contains_key(&(size, name.to_string()))
    }

    fn acquire(&self) -> Handle {
        self.open.fetch_add(1, Ordering::SeqCst);
        Handle {
            open: self.open.clone(),
        }
    }
}

/// Counts a live provider handle until dropped.
struct Handle {
    open: Arc<AtomicUsize>,
}

impl Drop for Handle {
    fn drop(&mut self) {
        self.open.fetch_sub(1, Ordering::SeqCst);
    }
}

impl provider::Provider for Provider {
    type Hasher = Streebog256;
    type Container = Container;
    type Key = Key;

    fn create_container(&self, size: Size, name: &str, pin: &str) -> Result<Created, Failure> {
        let mut state = self.state.lock().unwrap();
        state.check("create_container")?;
        let id = (size, name.to_string());
        if state.containers.contains_key(&id) {
            return Ok(Created::AlreadyExists);
        }
        state.generated += 1;
        let secret: [u8; 32] = expand(
            &[
                &[size.tag()][..],
                name.as_bytes(),
                &state.generated.to_be_bytes()[..],
            ],
            32,
        )
        .try_into()
        .unwrap();
        state.keys.insert(public_blob(size, &secret), secret);
        state.containers.insert(
            id,
            Entry {
                pin: pin.to_string(),
                secret,
            },
        );
        Ok(Created::New)
    }

    fn check_container(&self, size: Size, name: &str, pin: &str) -> Result<(), Failure> {
        let _handle = self.acquire();
        let state = self.state.lock().unwrap();
        state.check("check_container")?;
        match state.containers.get(&(size, name.to_string())) {
            Some(entry) if entry.pin == pin => Ok(()),
            Some(_) => Err(Failure::new("check_container", WRONG_PIN)),
            None => Err(Failure::new("check_container", NOT_FOUND)),
        }
    }

    fn open_container(
        &self,
        size: Size,
        name: &str,
        pin: &str,
        spec: KeySpec,
    ) -> Result<Self::Container, Failure> {
        let state = self.state.lock().unwrap();
        state.check("open_container")?;
        let entry = match state.containers.get(&(size, name.to_string())) {
            Some(entry) if entry.pin == pin => entry,
            Some(_) => return Err(Failure::new("open_container", WRONG_PIN)),
            None => return Err(Failure::new("open_container", NOT_FOUND)),
        };

        // Containers only hold a signature key pair.
        if spec != KeySpec::Signature {
            return Err(Failure::new("open_container", NO_KEY));
        }
        Ok(Container {
            size,
            secret: entry.secret,
            state: self.state.clone(),
            _handle: self.acquire(),
        })
    }

    fn import_public_key(&self, size: Size, raw: &[u8]) -> Result<Self::Key, Failure> {
        let state = self.state.lock().unwrap();
        state.check("import_public_key")?;
        if raw.len() != size.public_key_length() - 1 || raw.first() != Some(&PUBLIC_KEY_BLOB) {
            return Err(Failure::new("import_public_key", BAD_KEY));
        }
        Ok(Key {
            size,
            raw: raw.to_vec(),
            state: self.state.clone(),
            _handle: self.acquire(),
        })
    }
}

/// An open mock container.
pub struct Container {
    size: Size,
    secret: [u8; 32],
    state: Arc<Mutex<State>>,
    _handle: Handle,
}

impl provider::Container for Container {
    fn public_key(&self) -> Result<Vec<u8>, Failure> {
        self.state.lock().unwrap().check("public_key")?;
        Ok(public_blob(self.size, &self.secret))
    }

    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, Failure> {
        self.state.lock().unwrap().check("sign")?;
        Ok(signature(self.size, &self.secret, message))
    }
}

/// An imported mock public key.
pub struct Key {
    size: Size,
    raw: Vec<u8>,
    state: Arc<Mutex<State>>,
    _handle: Handle,
}

impl provider::Key for Key {
    fn verify(&self, message: &[u8], sig: &[u8]) -> Result<bool, Failure> {
        let state = self.state.lock().unwrap();
        state.check("verify")?;
        let Some(secret) = state.keys.get(&self.raw) else {
            return Ok(false);
        };
        Ok(signature(self.size, secret, message) == sig)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{Container as _, Key as _, Provider as _};

    #[test]
    fn test_handles_released() {
        let provider = Provider::new();
        provider.create_container(Size::K256, "alice", "pin").unwrap();
        {
            let container = provider
                .open_container(Size::K256, "alice", "pin", KeySpec::Signature)
                .unwrap();
            let blob = container.public_key().unwrap();
            let key = provider.import_public_key(Size::K256, &blob).unwrap();
            assert_eq!(provider.open_handles(), 2);
            let sig = container.sign(b"message").unwrap();
            assert!(key.verify(b"message", &sig).unwrap());
            assert!(!key.verify(b"other", &sig).unwrap());
        }
        assert_eq!(provider.open_handles(), 0);
    }

    #[test]
    fn test_lengths() {
        let provider = Provider::new();
        for size in [Size::K256, Size::K512] {
            provider.create_container(size, "bob", "pin").unwrap();
            let container = provider
                .open_container(size, "bob", "pin", KeySpec::Signature)
                .unwrap();
            assert_eq!(
                container.public_key().unwrap().len(),
                size.public_key_length() - 1
            );
            assert_eq!(
                container.sign(b"message").unwrap().len(),
                size.signature_length()
            );
        }
    }

    #[test]
    fn test_wrong_pin() {
        let provider = Provider::new();
        provider.create_container(Size::K256, "carol", "pin").unwrap();
        assert_eq!(
            provider.check_container(Size::K256, "carol", "nope"),
            Err(Failure::new("check_container", WRONG_PIN))
        );
        assert_eq!(
            provider.check_container(Size::K256, "dave", "pin"),
            Err(Failure::new("check_container", NOT_FOUND))
        );
        assert_eq!(provider.open_handles(), 0);
    }

    #[test]
    fn test_injected_failure() {
        let provider = Provider::new();
        provider.fail("create_container");
        assert!(provider.create_container(Size::K512, "erin", "pin").is_err());
        provider.recover("create_container");
        assert_eq!(
            provider.create_container(Size::K512, "erin", "pin"),
            Ok(Created::New)
        );
        assert_eq!(
            provider.create_container(Size::K512, "erin", "pin"),
            Ok(Created::AlreadyExists)
        );
    }
}
