//! Key generation, loading, signing, and verification through a [Provider].
//!
//! Every call opens the provider handles it needs and releases them before returning,
//! whether it succeeds or fails. Container names and passwords are resolved with
//! [resolve] before they reach the provider, so soft-derived containers carry the
//! user's original names.

use crate::{
    gost::{
        codec::{PrivateRecord, PublicRecord},
        derivation::{resolve, Identity},
        Container, PrivateKey, PublicKey, Signature,
    },
    provider::{Container as _, Created, Key as _, KeySpec, Provider},
    Error,
};
use tracing::{debug, warn};

/// Entry point for provider-backed keys.
///
/// Cloning is cheap: clones share the underlying provider.
#[derive(Clone)]
pub struct Keystore<P: Provider> {
    provider: P,
}

impl<P: Provider> Keystore<P> {
    /// Create a keystore backed by `provider`.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// The underlying provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Provider-side container name and password of `record`.
    fn names(record: &PrivateRecord) -> (String, String) {
        (
            resolve::<P::Hasher>(record.container()),
            resolve::<P::Hasher>(record.password()),
        )
    }

    /// Create the container described by `identity` and generate its key pair.
    ///
    /// An existing container is left untouched and reported as [Created::AlreadyExists].
    pub fn generate(&self, identity: &Identity) -> Result<Created, Error> {
        let (name, pin) = Self::names(identity.record());
        let created = self
            .provider
            .create_container(identity.size(), &name, &pin)
            .map_err(|failure| {
                warn!(size = %identity.size(), container = %name, %failure, "failed to create container");
                Error::Provider(failure)
            })?;
        debug!(size = %identity.size(), container = %name, ?created, "generated key");
        Ok(created)
    }

    /// Load the key of an existing container, bound to the identity's key pair.
    pub fn load(&self, identity: &Identity) -> Result<Container<P>, Error> {
        let record = identity.record().clone();
        self.check(&record).map_err(Error::KeyNotFound)?;
        Ok(PrivateKey::new(record, self.clone()).bind(identity.key_spec()))
    }

    /// Decode an encoded private key and confirm its container still exists.
    pub fn load_bytes(&self, bytes: &[u8]) -> Result<PrivateKey<P>, Error> {
        let record = PrivateRecord::try_from(bytes)?;
        self.check(&record).map_err(Error::ContainerNotFound)?;
        Ok(PrivateKey::new(record, self.clone()))
    }

    fn check(&self, record: &PrivateRecord) -> Result<(), crate::provider::Failure> {
        let (name, pin) = Self::names(record);
        self.provider
            .check_container(record.size(), &name, &pin)
            .inspect_err(|failure| {
                debug!(size = %record.size(), container = %name, %failure, "container check failed");
            })
    }

    /// Sign `message` with the `spec` key pair of the container referenced by `record`.
    ///
    /// The length of the returned signature is not validated.
    pub fn sign(
        &self,
        record: &PrivateRecord,
        spec: KeySpec,
        message: &[u8],
    ) -> Result<Signature, Error> {
        let (name, pin) = Self::names(record);
        let container = self
            .provider
            .open_container(record.size(), &name, &pin, spec)
            .map_err(Error::Signing)?;
        let signature = container.sign(message).map_err(|failure| {
            warn!(size = %record.size(), container = %name, %failure, "failed to sign");
            Error::Signing(failure)
        })?;
        Ok(Signature::from(signature))
    }

    /// Export the public key of the `spec` key pair of the container referenced by `record`.
    pub fn derive_public_key(
        &self,
        record: &PrivateRecord,
        spec: KeySpec,
    ) -> Result<PublicKey<P>, Error> {
        let (name, pin) = Self::names(record);
        let raw = {
            let container = self
                .provider
                .open_container(record.size(), &name, &pin, spec)
                .map_err(Error::Provider)?;
            container.public_key().map_err(Error::Provider)?
        };
        let public = PublicRecord::new(record.size(), &raw)?;
        Ok(PublicKey::new(public, self.clone()))
    }

    /// Decode an encoded public key and confirm the provider accepts it.
    pub fn load_public_key(&self, bytes: &[u8]) -> Result<PublicKey<P>, Error> {
        let record = PublicRecord::try_from(bytes)?;
        drop(
            self.provider
                .import_public_key(record.size(), record.key())
                .map_err(Error::InvalidPublicKey)?,
        );
        Ok(PublicKey::new(record, self.clone()))
    }

    /// Check `signature` over `message` against the key in `record`.
    ///
    /// Returns `Ok(false)` for a signature that does not verify and an error when the
    /// provider could not perform the check.
    pub fn verify(
        &self,
        record: &PublicRecord,
        message: &[u8],
        signature: &Signature,
    ) -> Result<bool, Error> {
        let key = self
            .provider
            .import_public_key(record.size(), record.key())
            .map_err(Error::Verification)?;
        key.verify(message, signature).map_err(Error::Verification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        gost::{
            derivation::{Config, Mode},
            Size,
        },
        provider::{mocks, Failure},
        PublicKey as _, Signer as _, Streebog256, Verifier as _,
    };
    use std::sync::{Arc, Mutex};
    use test_case::test_case;
    use tracing_subscriber::fmt::MakeWriter;

    fn setup(config: Config) -> (mocks::Provider, Keystore<mocks::Provider>, Identity) {
        let provider = mocks::Provider::new();
        let keystore = Keystore::new(provider.clone());
        let identity = config.derive::<Streebog256>().unwrap();
        (provider, keystore, identity)
    }

    #[test_case(Size::K256)]
    #[test_case(Size::K512)]
    fn test_generate_idempotent(size: Size) {
        let (provider, keystore, identity) = setup(Config::new(size, "alice", "pw123"));
        assert_eq!(keystore.generate(&identity), Ok(Created::New));
        assert_eq!(keystore.generate(&identity), Ok(Created::AlreadyExists));
        assert_eq!(
            keystore.generate(&identity).unwrap().fresh(),
            Err(Error::KeyAlreadyExists)
        );
        assert!(provider.contains(size, identity.container()));
    }

    #[test]
    fn test_generate_provider_failure() {
        let (provider, keystore, identity) = setup(Config::new(Size::K256, "alice", "pw123"));
        provider.fail("create_container");
        assert!(matches!(
            keystore.generate(&identity),
            Err(Error::Provider(Failure {
                operation: "create_container",
                ..
            }))
        ));
    }

    #[test]
    fn test_soft_uses_original_names() {
        let (provider, keystore, identity) = setup(Config::soft(Size::K256, "username", "pw"));
        keystore.generate(&identity).unwrap();
        assert!(provider.contains(Size::K256, "username"));
        assert!(!provider.contains(Size::K256, identity.container()));

        let signer = keystore.load(&identity).unwrap();
        let signature = signer.sign(b"message").unwrap();
        assert!(signer.public_key().unwrap().verify(b"message", &signature));
    }

    #[test]
    fn test_load_missing() {
        let (_, keystore, identity) = setup(Config::new(Size::K256, "alice", "pw123"));
        assert!(matches!(keystore.load(&identity), Err(Error::KeyNotFound(_))));
    }

    #[test]
    fn test_load_wrong_password() {
        let (_, keystore, identity) = setup(Config::new(Size::K256, "alice", "pw123"));
        keystore.generate(&identity).unwrap();
        let other = Config::new(Size::K256, "alice", "nope")
            .derive::<Streebog256>()
            .unwrap();
        assert!(matches!(keystore.load(&other), Err(Error::KeyNotFound(_))));
    }

    #[test]
    fn test_load_binds_key_spec() {
        let (_, keystore, identity) = setup(
            Config::new(Size::K256, "alice", "pw123").with_key_spec(KeySpec::Exchange),
        );
        keystore.generate(&identity).unwrap();
        let signer = keystore.load(&identity).unwrap();
        assert_eq!(signer.spec(), KeySpec::Exchange);
        assert!(matches!(signer.sign(b"message"), Err(Error::Signing(_))));
        assert!(matches!(signer.public_key(), Err(Error::Provider(_))));
    }

    #[test]
    fn test_load_bytes() {
        let (provider, keystore, identity) = setup(Config::new(Size::K512, "alice", "pw123"));
        keystore.generate(&identity).unwrap();
        let encoded = identity.record().encode();

        let key = keystore.load_bytes(&encoded).unwrap();
        assert_eq!(key.encode(), encoded);
        assert_eq!(key.size(), Size::K512);

        assert!(provider.remove_container(Size::K512, identity.container()));
        assert!(matches!(
            keystore.load_bytes(&encoded),
            Err(Error::ContainerNotFound(_))
        ));
    }

    #[test]
    fn test_load_bytes_malformed() {
        let (_, keystore, _) = setup(Config::new(Size::K256, "alice", "pw123"));
        assert_eq!(
            keystore.load_bytes(&[80u8; 10]).unwrap_err(),
            Error::InvalidLength("129", 10)
        );
    }

    #[test_case(Size::K256)]
    #[test_case(Size::K512)]
    fn test_public_key_round_trip(size: Size) {
        let (_, keystore, identity) = setup(Config::new(size, "alice", "pw123"));
        keystore.generate(&identity).unwrap();
        let public = keystore
            .derive_public_key(identity.record(), KeySpec::Signature)
            .unwrap();
        assert_eq!(public.as_ref().len(), size.public_key_length());

        let loaded = keystore.load_public_key(public.as_ref()).unwrap();
        assert_eq!(loaded.address(), public.address());
        assert_eq!(loaded.as_ref(), public.as_ref());
    }

    #[test]
    fn test_load_public_key_rejected() {
        let (provider, keystore, _) = setup(Config::new(Size::K256, "alice", "pw123"));

        // Well-formed record, but not a blob the provider accepts.
        let mut bytes = vec![0u8; 102];
        bytes[0] = Size::K256.tag();
        assert!(matches!(
            keystore.load_public_key(&bytes),
            Err(Error::InvalidPublicKey(_))
        ));

        // Structurally invalid.
        bytes[0] = Size::K512.tag();
        assert_eq!(
            keystore.load_public_key(&bytes).unwrap_err(),
            Error::InvalidSizeTag(81)
        );
        assert_eq!(provider.open_handles(), 0);
    }

    #[test]
    fn test_verify_error_distinct_from_invalid() {
        let (provider, keystore, identity) = setup(Config::new(Size::K256, "alice", "pw123"));
        keystore.generate(&identity).unwrap();
        let record = identity.record();
        let public = keystore
            .derive_public_key(record, KeySpec::Signature)
            .unwrap();
        let signature = keystore.sign(record, KeySpec::Signature, b"message").unwrap();

        assert_eq!(
            keystore.verify(public.record(), b"message", &signature),
            Ok(true)
        );
        assert_eq!(
            keystore.verify(public.record(), b"other", &signature),
            Ok(false)
        );

        provider.fail("verify");
        assert!(matches!(
            keystore.verify(public.record(), b"message", &signature),
            Err(Error::Verification(_))
        ));
        provider.recover("verify");

        provider.fail("import_public_key");
        assert!(matches!(
            keystore.verify(public.record(), b"message", &signature),
            Err(Error::Verification(_))
        ));
    }

    #[test]
    fn test_handles_released() {
        let (provider, keystore, identity) = setup(Config::new(Size::K256, "alice", "pw123"));
        keystore.generate(&identity).unwrap();
        let record = identity.record();

        let signer = keystore.load(&identity).unwrap();
        let public = signer.public_key().unwrap();
        let signature = signer.sign(b"message").unwrap();
        assert!(public.verify(b"message", &signature));
        keystore.load_public_key(public.as_ref()).unwrap();
        assert_eq!(provider.open_handles(), 0);

        for operation in ["sign", "public_key", "open_container", "verify", "import_public_key"] {
            provider.fail(operation);
            let _ = keystore.sign(record, KeySpec::Signature, b"message");
            let _ = keystore.derive_public_key(record, KeySpec::Signature);
            let _ = keystore.verify(public.record(), b"message", &signature);
            let _ = keystore.load_public_key(public.as_ref());
            assert_eq!(provider.open_handles(), 0, "{operation}");
            provider.recover(operation);
        }

        // Asking for a key pair the container lacks fails without leaking.
        assert!(matches!(
            keystore.sign(record, KeySpec::Exchange, b"message"),
            Err(Error::Signing(_))
        ));
        assert!(matches!(
            keystore.derive_public_key(record, KeySpec::Exchange),
            Err(Error::Provider(_))
        ));
        assert_eq!(provider.open_handles(), 0);
    }

    #[test]
    fn test_signing_failures() {
        let (provider, keystore, identity) = setup(Config::new(Size::K256, "alice", "pw123"));
        let record = identity.record();

        // Missing container.
        assert!(matches!(
            keystore.sign(record, KeySpec::Signature, b"message"),
            Err(Error::Signing(Failure {
                operation: "open_container",
                ..
            }))
        ));

        keystore.generate(&identity).unwrap();
        provider.fail("sign");
        assert!(matches!(
            keystore.sign(record, KeySpec::Signature, b"message"),
            Err(Error::Signing(Failure {
                operation: "sign",
                ..
            }))
        ));
    }

    /// Collects formatted log lines.
    #[derive(Clone, Default)]
    struct Logs(Arc<Mutex<Vec<u8>>>);

    impl Logs {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl std::io::Write for Logs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Logs {
        type Writer = Self;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test_case(Mode::Strict)]
    #[test_case(Mode::Soft)]
    fn test_logging_never_prints_password(mode: Mode) {
        let logs = Logs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(logs.clone())
            .finish();
        let mut config = Config::new(Size::K256, "username", "hunter2");
        config.mode = mode;

        let (identity, derived_password) = tracing::subscriber::with_default(subscriber, || {
            let (provider, keystore, identity) = setup(config);
            keystore.generate(&identity).unwrap();
            let signer = keystore.load(&identity).unwrap();
            let public = signer.public_key().unwrap();
            let signature = signer.sign(b"message").unwrap();

            // Failing paths log too.
            provider.fail("create_container");
            assert!(keystore.generate(&identity).is_err());
            provider.fail("verify");
            assert!(!public.verify(b"message", &signature));
            let other = Config::new(Size::K256, "username", "wrong")
                .derive::<Streebog256>()
                .unwrap();
            assert!(keystore.load(&other).is_err());

            let password = identity.password().to_string();
            (identity, password)
        });

        let logs = logs.contents();
        assert!(logs.contains("generated key"));
        assert!(logs.contains("failed to create container"));
        assert!(logs.contains("container check failed"));
        assert!(logs.contains("verification not performed"));
        assert!(!logs.contains("hunter2"));
        assert!(!logs.contains(&derived_password));
        assert!(!format!("{identity:?}").contains(&derived_password));
    }
}
