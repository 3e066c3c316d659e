//! Common test infrastructure
//!
//! Fixtures plus fake enrichment and generation services. Tests should only
//! import from this module, not from internal submodules.

mod fake_services;
mod fixtures;

#[allow(unused_imports)]
pub use fake_services::{lenient_breaker, FakeServices, ENRICHMENT_PATH, GENEROUS_TAG_REPLY};
#[allow(unused_imports)]
pub use fixtures::{
    FailingInsertStore, NoTagsBackend, TestStore, LIBRARY_IMPORTABLE, LIBRARY_WITHOUT_COLLECTION, LIBRARY_XML,
    MALFORMED_LIBRARY,
};
