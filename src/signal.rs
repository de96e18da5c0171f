//! # Signal abstraction — the typed event record flowing through the bus.
//!
//! A signal set is a **closed, user-defined enum** implementing [`Signal`].
//! Encoding the `(kind, payload)` pair as a sum type makes the payload shape
//! a function of the discriminant at compile time; the bus never needs a
//! runtime schema table.
//!
//! ## Example
//! ```rust
//! use tickbus::{random_id, Signal};
//!
//! #[derive(Clone)]
//! enum AppSignal {
//!     FileChanged { id: String, ts: u64, path: String },
//!     Heartbeat { id: String, ts: u64 },
//! }
//!
//! impl Signal for AppSignal {
//!     fn kind(&self) -> &str {
//!         match self {
//!             AppSignal::FileChanged { .. } => "file-changed",
//!             AppSignal::Heartbeat { .. } => "heartbeat",
//!         }
//!     }
//!     fn id(&self) -> &str {
//!         match self {
//!             AppSignal::FileChanged { id, .. } | AppSignal::Heartbeat { id, .. } => id,
//!         }
//!     }
//!     fn ts(&self) -> u64 {
//!         match self {
//!             AppSignal::FileChanged { ts, .. } | AppSignal::Heartbeat { ts, .. } => *ts,
//!         }
//!     }
//! }
//!
//! let hb = AppSignal::Heartbeat { id: random_id(), ts: 0 };
//! assert_eq!(hb.kind(), "heartbeat");
//! assert_eq!(hb.id().len(), 32);
//! ```

/// A typed event record flowing through the bus.
///
/// ## Invariants
/// - [`kind`](Signal::kind) is never empty and is drawn from a closed set —
///   the variants of the implementing enum.
/// - [`id`](Signal::id) uniquely identifies a signal across the lifetime of
///   a store; use [`random_id`] to produce one.
/// - The payload shape is a function of the variant (enforced by the type
///   system).
///
/// Signals are cloned on every handler invocation and on transport fan-out,
/// so keep payloads cheap to clone (or wrap large ones in `Arc`).
pub trait Signal: Clone + Send + Sync + 'static {
    /// Short string discriminator for this signal's variant.
    fn kind(&self) -> &str;

    /// Opaque unique identifier.
    fn id(&self) -> &str;

    /// Milliseconds since the epoch at production time.
    fn ts(&self) -> u64;

    /// Optional origin tag (the producing source's name).
    fn source(&self) -> Option<&str> {
        None
    }
}

/// Generates a random 128-bit signal id encoded as 32 lowercase hex chars.
///
/// ```rust
/// let a = tickbus::random_id();
/// let b = tickbus::random_id();
/// assert_eq!(a.len(), 32);
/// assert_ne!(a, b);
/// ```
pub fn random_id() -> String {
    format!("{:032x}", rand::random::<u128>())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_id_shape() {
        let id = random_id();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn random_id_unique() {
        let ids: std::collections::HashSet<_> = (0..64).map(|_| random_id()).collect();
        assert_eq!(ids.len(), 64);
    }
}
