//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use cav_core::PrincipalId;
use cav_engine::{EngineConfig, VerificationEngine};
use cav_fhe::{Ebool, EncryptedHandle, MockCoprocessor};

pub type Engine = VerificationEngine<MockCoprocessor>;

/// Route engine events to the test writer. `RUST_LOG` selects the level.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

pub fn principal(name: &str) -> PrincipalId {
    PrincipalId::new(name).unwrap()
}

pub fn owner() -> PrincipalId {
    principal("registry")
}

/// A development engine owned by [`owner`].
pub fn engine() -> Engine {
    init_tracing();
    VerificationEngine::new(EngineConfig::development(), MockCoprocessor::new(), owner()).unwrap()
}

/// Encrypt `value` client-side for `engine` and submit it as `who`.
pub fn submit(engine: &mut Engine, who: &PrincipalId, value: u8) -> EncryptedHandle<cav_fhe::Euint8> {
    let input = MockCoprocessor::encrypt_input(&engine.context(), value);
    engine.submit(who, &input).unwrap()
}

/// Disclose `handle` to `who` and decrypt it with the test oracle.
pub fn reveal(engine: &mut Engine, who: &PrincipalId, handle: &EncryptedHandle<Ebool>) -> bool {
    let disclosure = engine.disclose(who, handle).unwrap();
    engine.coprocessor().decrypt_bool(&disclosure.handle).unwrap()
}
