//! Top-level envelope codec and round-trip driver.
//!
//! `write` walks a live [`ProcessInstance`] down through contexts, node
//! instances, and variable strategies into one contiguous byte buffer;
//! `read` performs the mirror walk. Both run to completion on the
//! calling thread, do no I/O beyond the buffer, and publish nothing on
//! error: `read` assembles the whole instance before returning it, and
//! [`attach_to`] swaps it into the engine-owned shell only once it is
//! complete.

use crate::context;
use crate::error::{CodecError, Result};
use crate::records::{EnvelopeRecord, HeaderRecord};
use crate::types::{ProcessInstance, WorkflowContext, STATE_CODES};
use crate::value::StrategyRegistry;
use sha2::{Digest, Sha256};
use tracing::debug;

// ─── Codec context ────────────────────────────────────────────

/// Output encoding of the envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormatMode {
    /// Compact length/tag-prefixed binary (the storage format).
    #[default]
    Binary,
    /// Pretty-printed JSON for human inspection and tooling.
    Json,
}

/// Everything the host injects for one codec call: the ordered variable
/// strategy list and the format mode. Built once at startup, read-only
/// afterwards; safe to share across threads encoding different
/// instances concurrently.
#[derive(Debug, Clone)]
pub struct CodecContext {
    pub strategies: StrategyRegistry,
    pub mode: FormatMode,
}

impl CodecContext {
    pub fn new(strategies: StrategyRegistry, mode: FormatMode) -> Self {
        Self { strategies, mode }
    }

    /// Built-in strategies, binary mode.
    pub fn standard() -> Self {
        Self::new(StrategyRegistry::standard(), FormatMode::Binary)
    }

    pub fn with_mode(mut self, mode: FormatMode) -> Self {
        self.mode = mode;
        self
    }
}

impl Default for CodecContext {
    fn default() -> Self {
        Self::standard()
    }
}

// ─── Write ────────────────────────────────────────────────────

/// Suspend: encode one live process instance into a self-describing
/// envelope.
pub fn write(ctx: &CodecContext, instance: &ProcessInstance) -> Result<Vec<u8>> {
    validate_identity(&instance.id, instance.state)?;

    let record = EnvelopeRecord {
        header: write_header(instance),
        root: context::write_context(&instance.root, &ctx.strategies)?,
    };

    let bytes = match ctx.mode {
        FormatMode::Binary => crate::wire::encode_envelope(&record)?,
        FormatMode::Json => serde_json::to_vec_pretty(&record)
            .map_err(|e| CodecError::MalformedEnvelope(format!("json encode failed: {e}")))?,
    };

    debug!(
        instance_id = %instance.id,
        mode = ?ctx.mode,
        bytes = bytes.len(),
        "process instance encoded"
    );
    Ok(bytes)
}

fn write_header(instance: &ProcessInstance) -> HeaderRecord {
    HeaderRecord {
        id: instance.id.clone(),
        process_id: instance.process_id.clone(),
        process_version: instance.process_version.clone(),
        state: instance.state,
        start_at: instance.start_at,
        description: instance.description.clone(),
        deployment_id: instance.deployment_id.clone(),
        business_key: instance.business_key.clone(),
        root_instance_id: instance.root_instance_id.clone(),
        parent_instance_id: instance.parent_instance_id.clone(),
        completed_node_ids: instance.completed_node_ids.clone(),
        sla: context::write_sla(&instance.sla),
        swimlanes: instance.swimlanes.clone(),
    }
}

// ─── Read ─────────────────────────────────────────────────────

/// Resume: decode an envelope into a fresh process instance. The caller
/// (the execution engine) owns pairing it with a runnable shell — see
/// [`attach_to`].
pub fn read(ctx: &CodecContext, bytes: &[u8]) -> Result<ProcessInstance> {
    let record = match ctx.mode {
        FormatMode::Binary => crate::wire::decode_envelope(bytes)?,
        FormatMode::Json => serde_json::from_slice(bytes).map_err(map_json_error)?,
    };

    validate_identity(&record.header.id, record.header.state)?;
    let root = context::read_context(record.root, &ctx.strategies)?;
    let instance = publish(record.header, root);

    debug!(
        instance_id = %instance.id,
        mode = ?ctx.mode,
        bytes = bytes.len(),
        "process instance decoded"
    );
    Ok(instance)
}

/// Decode identity, lifecycle, and SLA metadata only. The body is never
/// touched in binary mode, so this stays cheap on large snapshots.
pub fn read_header(ctx: &CodecContext, bytes: &[u8]) -> Result<HeaderRecord> {
    let header = match ctx.mode {
        FormatMode::Binary => crate::wire::decode_header(bytes)?,
        FormatMode::Json => {
            let record: EnvelopeRecord = serde_json::from_slice(bytes).map_err(map_json_error)?;
            record.header
        }
    };
    validate_identity(&header.id, header.state)?;
    Ok(header)
}

/// Final assembly, after every fallible step has succeeded.
fn publish(header: HeaderRecord, root: WorkflowContext) -> ProcessInstance {
    ProcessInstance {
        id: header.id,
        process_id: header.process_id,
        process_version: header.process_version,
        state: header.state,
        start_at: header.start_at,
        description: header.description,
        deployment_id: header.deployment_id,
        business_key: header.business_key,
        root_instance_id: header.root_instance_id,
        parent_instance_id: header.parent_instance_id,
        completed_node_ids: header.completed_node_ids,
        sla: context::read_sla(header.sla),
        swimlanes: header.swimlanes,
        root,
    }
}

fn validate_identity(id: &str, state: i32) -> Result<()> {
    if id.is_empty() {
        return Err(CodecError::MalformedEnvelope(
            "process instance id is empty".to_string(),
        ));
    }
    if !STATE_CODES.contains(&state) {
        return Err(CodecError::MalformedEnvelope(format!(
            "lifecycle state {state} outside the closed set {STATE_CODES:?}"
        )));
    }
    Ok(())
}

/// In JSON mode, serde reports an out-of-set variant tag as a data
/// error; surface it under the same taxonomy as the binary path.
fn map_json_error(err: serde_json::Error) -> CodecError {
    let msg = err.to_string();
    if msg.starts_with("unknown variant") {
        let tag = msg
            .split('`')
            .nth(1)
            .unwrap_or_default()
            .to_string();
        return CodecError::UnknownNodeInstanceVariant { tag };
    }
    CodecError::MalformedEnvelope(format!("json decode failed: {msg}"))
}

// ─── Shell attachment ─────────────────────────────────────────

/// The engine-owned runtime object a decoded snapshot is re-hydrated
/// into. The codec never constructs a runnable engine object itself; it
/// only populates a shell the engine already built for the right
/// process definition.
#[derive(Debug, Default)]
pub struct InstanceShell {
    process_id: String,
    attached: Option<ProcessInstance>,
}

impl InstanceShell {
    pub fn new(process_id: impl Into<String>) -> Self {
        Self {
            process_id: process_id.into(),
            attached: None,
        }
    }

    pub fn process_id(&self) -> &str {
        &self.process_id
    }

    pub fn attached(&self) -> Option<&ProcessInstance> {
        self.attached.as_ref()
    }

    pub fn detach(&mut self) -> Option<ProcessInstance> {
        self.attached.take()
    }
}

/// Reload-in-place: publish a fully decoded snapshot into an existing
/// shell. The swap is the last step, so a rejected snapshot leaves the
/// shell exactly as it was.
pub fn attach_to(shell: &mut InstanceShell, snapshot: ProcessInstance) -> Result<()> {
    if snapshot.process_id != shell.process_id {
        return Err(CodecError::MalformedEnvelope(format!(
            "snapshot is for process {:?}, shell expects {:?}",
            snapshot.process_id, shell.process_id
        )));
    }
    shell.attached = Some(snapshot);
    Ok(())
}

// ─── Digest ───────────────────────────────────────────────────

/// SHA-256 of an encoded envelope. Valid as a version/diff key because
/// encoding is deterministic for identical state.
pub fn snapshot_digest(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}
