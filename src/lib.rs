//! Who Is The Spy - Client Library
//!
//! Re-exports the workspace members so the binaries (and any embedding
//! application) have a single dependency:
//!
//! - **spygame**: game models, REST client, topic conventions, utilities
//! - **topicsockets**: the topic-multiplexed realtime channel client

pub use spygame;
pub use topicsockets;
