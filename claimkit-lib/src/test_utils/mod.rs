//! Shared test utilities: in-memory host, registry, DNS, and account
//! fixtures.
//!
//! Everything here runs fully in-process so protocol tests exercise real
//! signing, labeling, and encryption against deterministic storage.

mod fixtures;
mod mock;

pub use fixtures::{TestAccount, TestEnvironment};
pub use mock::{InMemoryRegistry, MockDnsResolver, MockFetcher, MockHost, MockStorageWriter};
