//! flowsnap — suspend/resume codec for workflow process-instance state.
//!
//! A long-running workflow engine suspends an in-flight execution — a
//! tree of active node instances, pending timers, variable bindings, and
//! task assignments — to durable storage and later reconstructs a
//! behaviorally identical execution. This crate is that codec: a
//! bidirectional transform between the live runtime state and a compact,
//! versioned, self-describing envelope.
//!
//! # Architecture
//!
//! - [`value`] — pluggable, type-erased encoding of variable values via
//!   an ordered strategy registry.
//! - Variant dispatch — the closed set of node-instance kinds, each with
//!   a stable wire tag; four kinds nest a whole sub-scope and recurse.
//! - Composite contexts — deterministic (sorted) encoding of each
//!   scope's children, exclusive groups, variables, and loop counters.
//! - Envelope — header first, body last, so identity and lifecycle state
//!   decode without touching the body. Two encodings share one record
//!   model: compact binary and human-inspectable JSON.
//!
//! The codec is synchronous, does no I/O beyond its byte buffer, and
//! holds no shared mutable state; one [`CodecContext`] can serve many
//! threads encoding and decoding different instances concurrently.
//! Storage, transport, and the execution engine itself are the caller's
//! business.

mod context;
mod envelope;
mod error;
pub mod records;
mod types;
pub mod value;
mod variant;
mod wire;
mod workitem;

pub use envelope::{
    attach_to, read, read_header, snapshot_digest, write, CodecContext, FormatMode, InstanceShell,
};
pub use error::{CodecError, Result};
pub use types::{
    Attachment, Comment, Deadline, ExclusiveGroup, NodeInstance, NodeVariant, ProcessInstance,
    Reassignment, SlaBlock, Timestamp, Variable, WorkItemPayload, WorkflowContext, SLA_ABORTED,
    SLA_MET, SLA_NA, SLA_PENDING, SLA_VIOLATED, STATE_ABORTED, STATE_ACTIVE, STATE_CODES,
    STATE_COMPLETED, STATE_PENDING, STATE_SUSPENDED,
};
pub use value::{StrategyRegistry, ValueStrategy, VariableValue, NULL_TAG};
pub use variant::KNOWN_TAGS;

/// Leading bytes of every binary envelope.
pub const MAGIC: [u8; 4] = *b"FSNP";

/// Current envelope format version. Readers reject any other version;
/// forward compatibility is handled by versioning the envelope, never by
/// skipping unknown payloads.
pub const FORMAT_VERSION: u32 = 1;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_version_is_set() {
        assert_eq!(FORMAT_VERSION, 1);
        assert_eq!(&MAGIC, b"FSNP");
    }

    #[test]
    fn known_tags_cover_fourteen_kinds() {
        assert_eq!(KNOWN_TAGS.len(), 14);
    }
}
