//! Common test utilities, fixtures, and mocks
//! This module contains shared functionality used across different test categories

pub mod fixtures;

use std::sync::Arc;
use std::time::Duration;

use melody::commands::music::utils::music_manager::MusicManager;
use mocks::{FakeResolver, FakeTransport, ResolverHandle};

/// Resolve timeout used unless a test needs a shorter one.
pub const RESOLVE_TIMEOUT: Duration = Duration::from_secs(5);

/// A controller wired to fresh fakes, plus handles to inspect them.
pub struct Harness {
    pub manager: Arc<MusicManager<FakeTransport, ResolverHandle>>,
    pub transport: FakeTransport,
    pub resolver: FakeResolver,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_timeout(RESOLVE_TIMEOUT)
    }

    pub fn with_timeout(resolve_timeout: Duration) -> Self {
        crate::test_utils::init();

        let transport = FakeTransport::new();
        let resolver = FakeResolver::new();
        let manager = MusicManager::new(transport.clone(), resolver.handle(), resolve_timeout);

        Self {
            manager: Arc::new(manager),
            transport,
            resolver,
        }
    }
}
