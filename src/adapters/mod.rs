// Adapters layer: concrete implementations of the domain ports (portal HTTP API, in-memory store, clock).

pub mod clock;
pub mod http;
pub mod memory;

pub use clock::SystemClock;
pub use http::HttpEventStore;
pub use memory::InMemoryEventStore;
