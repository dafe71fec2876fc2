//! Compact binary encoding of envelope records.
//!
//! Wire discipline: little-endian fixed-width integers, u32
//! length-prefixed UTF-8 strings, u32 count-prefixed collections (a
//! zero count is distinct from absence), a presence byte in front of
//! every optional scalar, and an explicit tag string in front of every
//! polymorphic payload. All timestamps are i64 epoch milliseconds —
//! there is no narrower timestamp width anywhere in the format.
//!
//! The envelope is framed as magic + format version, then the header,
//! then the body, in that order, so administrative tooling can decode
//! identity and lifecycle state without touching the body.

use crate::error::{CodecError, Result};
use crate::records::{
    AttachmentRecord, CommentRecord, ContextRecord, EnvelopeRecord, GroupRecord, HeaderRecord,
    NodeInstanceRecord, ReassignmentRecord, SlaRecord, VariableRecord, VariantRecord,
    WorkItemRecord,
};
use crate::variant::{
    TAG_ASYNC_EVENT, TAG_COMPOSITE, TAG_DYNAMIC, TAG_EVENT, TAG_EVENT_SUB_PROCESS, TAG_FOR_EACH,
    TAG_HUMAN_TASK, TAG_JOIN, TAG_MILESTONE, TAG_RULE_SET, TAG_STATE, TAG_SUB_PROCESS, TAG_TIMER,
    TAG_WORK_ITEM,
};
use crate::{FORMAT_VERSION, MAGIC};
use std::collections::{BTreeMap, BTreeSet};

// ─── Primitive writer ─────────────────────────────────────────

#[derive(Default)]
struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_i64(&mut self, v: i64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_len(&mut self, len: usize) -> Result<()> {
        let len = u32::try_from(len).map_err(|_| {
            CodecError::MalformedEnvelope(format!("length {len} exceeds u32 prefix"))
        })?;
        self.write_u32(len);
        Ok(())
    }

    fn write_str(&mut self, s: &str) -> Result<()> {
        self.write_len(s.len())?;
        self.buf.extend_from_slice(s.as_bytes());
        Ok(())
    }

    fn write_bytes(&mut self, b: &[u8]) -> Result<()> {
        self.write_len(b.len())?;
        self.buf.extend_from_slice(b);
        Ok(())
    }

    fn write_opt_str(&mut self, s: &Option<String>) -> Result<()> {
        match s {
            Some(s) => {
                self.write_u8(1);
                self.write_str(s)
            }
            None => {
                self.write_u8(0);
                Ok(())
            }
        }
    }

    fn write_opt_i64(&mut self, v: Option<i64>) {
        match v {
            Some(v) => {
                self.write_u8(1);
                self.write_i64(v);
            }
            None => self.write_u8(0),
        }
    }

    fn write_opt_i32(&mut self, v: Option<i32>) {
        match v {
            Some(v) => {
                self.write_u8(1);
                self.write_i32(v);
            }
            None => self.write_u8(0),
        }
    }

    fn write_str_list(&mut self, items: &[String]) -> Result<()> {
        self.write_len(items.len())?;
        for item in items {
            self.write_str(item)?;
        }
        Ok(())
    }

    fn write_str_set(&mut self, items: &BTreeSet<String>) -> Result<()> {
        self.write_len(items.len())?;
        for item in items {
            self.write_str(item)?;
        }
        Ok(())
    }

    fn write_str_map(&mut self, map: &BTreeMap<String, String>) -> Result<()> {
        self.write_len(map.len())?;
        for (k, v) in map {
            self.write_str(k)?;
            self.write_str(v)?;
        }
        Ok(())
    }
}

// ─── Primitive reader ─────────────────────────────────────────

struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(n).ok_or_else(|| {
            CodecError::MalformedEnvelope("length prefix overflows buffer offset".to_string())
        })?;
        if end > self.buf.len() {
            return Err(CodecError::MalformedEnvelope(format!(
                "truncated: need {n} bytes at offset {}, have {}",
                self.pos,
                self.buf.len() - self.pos
            )));
        }
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn read_u32(&mut self) -> Result<u32> {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(raw))
    }

    fn read_i32(&mut self) -> Result<i32> {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(self.take(4)?);
        Ok(i32::from_le_bytes(raw))
    }

    fn read_i64(&mut self) -> Result<i64> {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(self.take(8)?);
        Ok(i64::from_le_bytes(raw))
    }

    fn read_len(&mut self) -> Result<usize> {
        Ok(self.read_u32()? as usize)
    }

    fn read_presence(&mut self) -> Result<bool> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            b => Err(CodecError::MalformedEnvelope(format!(
                "presence byte must be 0 or 1, got {b}"
            ))),
        }
    }

    fn read_str(&mut self) -> Result<String> {
        let len = self.read_len()?;
        let bytes = self.take(len)?;
        std::str::from_utf8(bytes)
            .map(str::to_string)
            .map_err(|e| CodecError::MalformedEnvelope(format!("invalid UTF-8 in string: {e}")))
    }

    fn read_bytes(&mut self) -> Result<Vec<u8>> {
        let len = self.read_len()?;
        Ok(self.take(len)?.to_vec())
    }

    fn read_opt_str(&mut self) -> Result<Option<String>> {
        Ok(if self.read_presence()? {
            Some(self.read_str()?)
        } else {
            None
        })
    }

    fn read_opt_i64(&mut self) -> Result<Option<i64>> {
        Ok(if self.read_presence()? {
            Some(self.read_i64()?)
        } else {
            None
        })
    }

    fn read_opt_i32(&mut self) -> Result<Option<i32>> {
        Ok(if self.read_presence()? {
            Some(self.read_i32()?)
        } else {
            None
        })
    }

    fn read_str_list(&mut self) -> Result<Vec<String>> {
        let len = self.read_len()?;
        let mut items = Vec::new();
        for _ in 0..len {
            items.push(self.read_str()?);
        }
        Ok(items)
    }

    fn read_str_set(&mut self) -> Result<BTreeSet<String>> {
        let len = self.read_len()?;
        let mut items = BTreeSet::new();
        for _ in 0..len {
            items.insert(self.read_str()?);
        }
        Ok(items)
    }

    fn read_str_map(&mut self) -> Result<BTreeMap<String, String>> {
        let len = self.read_len()?;
        let mut map = BTreeMap::new();
        for _ in 0..len {
            let k = self.read_str()?;
            let v = self.read_str()?;
            map.insert(k, v);
        }
        Ok(map)
    }

    fn expect_end(&self) -> Result<()> {
        if self.pos != self.buf.len() {
            return Err(CodecError::MalformedEnvelope(format!(
                "{} trailing bytes after envelope body",
                self.buf.len() - self.pos
            )));
        }
        Ok(())
    }
}

// ─── Envelope phases ──────────────────────────────────────────

/// Both sides walk the same fixed sequence; no interleaving. The phase
/// lives on the envelope writer/reader, so a stage invoked out of turn
/// is rejected instead of silently producing a misframed envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Header,
    Body,
    Done,
}

fn expect_phase(at: Phase, want: Phase, stage: &str) -> Result<()> {
    if at != want {
        return Err(CodecError::MalformedEnvelope(format!(
            "envelope {stage} out of order: at {at:?}, expected {want:?}"
        )));
    }
    Ok(())
}

// ─── Encode ───────────────────────────────────────────────────

/// Writes one envelope: preamble up front, then header, then body.
struct EnvelopeWriter {
    w: ByteWriter,
    phase: Phase,
}

impl EnvelopeWriter {
    fn new() -> Self {
        let mut w = ByteWriter::default();
        w.buf.extend_from_slice(&MAGIC);
        w.write_u32(FORMAT_VERSION);
        Self {
            w,
            phase: Phase::Idle,
        }
    }

    fn header(&mut self, h: &HeaderRecord) -> Result<()> {
        expect_phase(self.phase, Phase::Idle, "header write")?;
        write_header(&mut self.w, h)?;
        self.phase = Phase::Header;
        Ok(())
    }

    fn body(&mut self, root: &ContextRecord) -> Result<()> {
        expect_phase(self.phase, Phase::Header, "body write")?;
        write_context(&mut self.w, root)?;
        self.phase = Phase::Body;
        Ok(())
    }

    fn finish(self) -> Result<Vec<u8>> {
        expect_phase(self.phase, Phase::Body, "finish")?;
        Ok(self.w.buf)
    }
}

pub(crate) fn encode_envelope(record: &EnvelopeRecord) -> Result<Vec<u8>> {
    let mut w = EnvelopeWriter::new();
    w.header(&record.header)?;
    w.body(&record.root)?;
    w.finish()
}

fn write_header(w: &mut ByteWriter, h: &HeaderRecord) -> Result<()> {
    w.write_str(&h.id)?;
    w.write_str(&h.process_id)?;
    w.write_str(&h.process_version)?;
    w.write_i32(h.state);
    w.write_i64(h.start_at);
    w.write_opt_str(&h.description)?;
    w.write_opt_str(&h.deployment_id)?;
    w.write_opt_str(&h.business_key)?;
    w.write_str_list(&h.completed_node_ids)?;
    write_sla(w, &h.sla)?;
    w.write_opt_str(&h.root_instance_id)?;
    w.write_opt_str(&h.parent_instance_id)?;
    w.write_str_map(&h.swimlanes)
}

fn write_sla(w: &mut ByteWriter, sla: &SlaRecord) -> Result<()> {
    w.write_i32(sla.compliance);
    w.write_opt_i64(sla.due_at);
    w.write_opt_str(&sla.timer_id)
}

fn write_context(w: &mut ByteWriter, ctx: &ContextRecord) -> Result<()> {
    w.write_len(ctx.node_instances.len())?;
    for ni in &ctx.node_instances {
        write_node_instance(w, ni)?;
    }

    w.write_len(ctx.exclusive_groups.len())?;
    for group in &ctx.exclusive_groups {
        w.write_str_list(&group.node_instance_ids)?;
    }

    w.write_len(ctx.variables.len())?;
    for var in &ctx.variables {
        write_variable(w, var)?;
    }

    w.write_len(ctx.iteration_levels.len())?;
    for (scope, depth) in &ctx.iteration_levels {
        w.write_str(scope)?;
        w.write_u32(*depth);
    }
    Ok(())
}

fn write_node_instance(w: &mut ByteWriter, ni: &NodeInstanceRecord) -> Result<()> {
    w.write_str(&ni.id)?;
    w.write_str(&ni.node_id)?;
    w.write_u32(ni.level);
    w.write_opt_i64(ni.trigger_at);
    write_sla(w, &ni.sla)?;
    write_variant(w, &ni.variant)
}

fn write_variant(w: &mut ByteWriter, variant: &VariantRecord) -> Result<()> {
    w.write_str(variant.tag())?;
    match variant {
        VariantRecord::Timer { timer_id } => w.write_str(timer_id),
        VariantRecord::Join { triggers } => {
            w.write_len(triggers.len())?;
            for (branch, count) in triggers {
                w.write_str(branch)?;
                w.write_u32(*count);
            }
            Ok(())
        }
        VariantRecord::Event => Ok(()),
        VariantRecord::SubProcess { child_instance_id } => w.write_str(child_instance_id),
        VariantRecord::ForEach { context }
        | VariantRecord::Dynamic { context }
        | VariantRecord::Composite { context }
        | VariantRecord::EventSubProcess { context } => write_context(w, context),
        VariantRecord::WorkItem {
            work_item_id,
            timer_ids,
        } => {
            w.write_str(work_item_id)?;
            w.write_str_list(timer_ids)
        }
        VariantRecord::HumanTask { work_item } => write_work_item(w, work_item),
        VariantRecord::Milestone { timer_ids } | VariantRecord::State { timer_ids } => {
            w.write_str_list(timer_ids)
        }
        VariantRecord::RuleSet {
            rule_flow_group,
            timer_ids,
        } => {
            w.write_str(rule_flow_group)?;
            w.write_str_list(timer_ids)
        }
        VariantRecord::AsyncEvent { job_id } => w.write_str(job_id),
    }
}

fn write_variable(w: &mut ByteWriter, var: &VariableRecord) -> Result<()> {
    w.write_str(&var.name)?;
    w.write_str(&var.tag)?;
    w.write_bytes(&var.value)?;
    w.write_opt_str(&var.value_type)
}

fn write_work_item(w: &mut ByteWriter, wi: &WorkItemRecord) -> Result<()> {
    w.write_str(&wi.name)?;
    w.write_opt_str(&wi.description)?;
    w.write_opt_i32(wi.priority);
    w.write_opt_str(&wi.reference_name)?;
    w.write_opt_str(&wi.actual_owner)?;
    w.write_str_set(&wi.potential_users)?;
    w.write_str_set(&wi.potential_groups)?;
    w.write_str_set(&wi.admin_users)?;
    w.write_str_set(&wi.admin_groups)?;
    w.write_str_set(&wi.excluded_users)?;
    w.write_str_set(&wi.excluded_groups)?;
    w.write_i64(wi.started_at);
    w.write_opt_i64(wi.completed_at);

    w.write_len(wi.parameters.len())?;
    for var in &wi.parameters {
        write_variable(w, var)?;
    }
    w.write_len(wi.results.len())?;
    for var in &wi.results {
        write_variable(w, var)?;
    }

    w.write_len(wi.comments.len())?;
    for c in &wi.comments {
        w.write_str(&c.id)?;
        w.write_str(&c.author)?;
        w.write_str(&c.content)?;
        w.write_i64(c.updated_at);
    }
    w.write_len(wi.attachments.len())?;
    for a in &wi.attachments {
        w.write_str(&a.id)?;
        w.write_str(&a.author)?;
        w.write_str(&a.content)?;
        w.write_i64(a.updated_at);
    }

    write_deadline_family(w, &wi.start_deadlines, &wi.start_reassignments)?;
    write_deadline_family(w, &wi.completion_deadlines, &wi.completion_reassignments)
}

fn write_deadline_family(
    w: &mut ByteWriter,
    contents: &BTreeMap<String, BTreeMap<String, String>>,
    reassignments: &BTreeMap<String, ReassignmentRecord>,
) -> Result<()> {
    w.write_len(contents.len())?;
    for (key, content) in contents {
        w.write_str(key)?;
        w.write_str_map(content)?;
    }
    w.write_len(reassignments.len())?;
    for (key, re) in reassignments {
        w.write_str(key)?;
        w.write_str_set(&re.users)?;
        w.write_str_set(&re.groups)?;
    }
    Ok(())
}

// ─── Decode ───────────────────────────────────────────────────

/// Reads one envelope; the header must be consumed before the body,
/// since the body's byte offset is only known once the header has been
/// walked.
struct EnvelopeReader<'a> {
    r: ByteReader<'a>,
    phase: Phase,
}

impl<'a> EnvelopeReader<'a> {
    fn new(bytes: &'a [u8]) -> Result<Self> {
        let mut r = ByteReader::new(bytes);
        read_preamble(&mut r)?;
        Ok(Self {
            r,
            phase: Phase::Idle,
        })
    }

    fn header(&mut self) -> Result<HeaderRecord> {
        expect_phase(self.phase, Phase::Idle, "header read")?;
        let header = read_header(&mut self.r)?;
        self.phase = Phase::Header;
        Ok(header)
    }

    fn body(&mut self) -> Result<ContextRecord> {
        expect_phase(self.phase, Phase::Header, "body read")?;
        let root = read_context(&mut self.r)?;
        self.r.expect_end()?;
        self.phase = Phase::Done;
        Ok(root)
    }
}

pub(crate) fn decode_envelope(bytes: &[u8]) -> Result<EnvelopeRecord> {
    let mut r = EnvelopeReader::new(bytes)?;
    let header = r.header()?;
    let root = r.body()?;
    Ok(EnvelopeRecord { header, root })
}

/// Header-only decode for tooling that needs identity and state without
/// paying for the body.
pub(crate) fn decode_header(bytes: &[u8]) -> Result<HeaderRecord> {
    EnvelopeReader::new(bytes)?.header()
}

fn read_preamble(r: &mut ByteReader<'_>) -> Result<()> {
    let magic = r.take(4).map_err(|_| {
        CodecError::MalformedEnvelope("buffer too short for envelope magic".to_string())
    })?;
    if magic != MAGIC {
        return Err(CodecError::MalformedEnvelope(format!(
            "bad magic {magic:?}, expected {MAGIC:?}"
        )));
    }
    let version = r.read_u32()?;
    if version != FORMAT_VERSION {
        return Err(CodecError::MalformedEnvelope(format!(
            "format version {version} not supported (reader is at {FORMAT_VERSION})"
        )));
    }
    Ok(())
}

fn read_header(r: &mut ByteReader<'_>) -> Result<HeaderRecord> {
    Ok(HeaderRecord {
        id: r.read_str()?,
        process_id: r.read_str()?,
        process_version: r.read_str()?,
        state: r.read_i32()?,
        start_at: r.read_i64()?,
        description: r.read_opt_str()?,
        deployment_id: r.read_opt_str()?,
        business_key: r.read_opt_str()?,
        completed_node_ids: r.read_str_list()?,
        sla: read_sla(r)?,
        root_instance_id: r.read_opt_str()?,
        parent_instance_id: r.read_opt_str()?,
        swimlanes: r.read_str_map()?,
    })
}

fn read_sla(r: &mut ByteReader<'_>) -> Result<SlaRecord> {
    Ok(SlaRecord {
        compliance: r.read_i32()?,
        due_at: r.read_opt_i64()?,
        timer_id: r.read_opt_str()?,
    })
}

fn read_context(r: &mut ByteReader<'_>) -> Result<ContextRecord> {
    let n = r.read_len()?;
    let mut node_instances = Vec::new();
    for _ in 0..n {
        node_instances.push(read_node_instance(r)?);
    }

    let n = r.read_len()?;
    let mut exclusive_groups = Vec::new();
    for _ in 0..n {
        exclusive_groups.push(GroupRecord {
            node_instance_ids: r.read_str_list()?,
        });
    }

    let n = r.read_len()?;
    let mut variables = Vec::new();
    for _ in 0..n {
        variables.push(read_variable(r)?);
    }

    let n = r.read_len()?;
    let mut iteration_levels = BTreeMap::new();
    for _ in 0..n {
        let scope = r.read_str()?;
        let depth = r.read_u32()?;
        iteration_levels.insert(scope, depth);
    }

    Ok(ContextRecord {
        node_instances,
        exclusive_groups,
        variables,
        iteration_levels,
    })
}

fn read_node_instance(r: &mut ByteReader<'_>) -> Result<NodeInstanceRecord> {
    Ok(NodeInstanceRecord {
        id: r.read_str()?,
        node_id: r.read_str()?,
        level: r.read_u32()?,
        trigger_at: r.read_opt_i64()?,
        sla: read_sla(r)?,
        variant: read_variant(r)?,
    })
}

fn read_variant(r: &mut ByteReader<'_>) -> Result<VariantRecord> {
    let tag = r.read_str()?;
    Ok(match tag.as_str() {
        TAG_TIMER => VariantRecord::Timer {
            timer_id: r.read_str()?,
        },
        TAG_JOIN => {
            let n = r.read_len()?;
            let mut triggers = BTreeMap::new();
            for _ in 0..n {
                let branch = r.read_str()?;
                let count = r.read_u32()?;
                triggers.insert(branch, count);
            }
            VariantRecord::Join { triggers }
        }
        TAG_EVENT => VariantRecord::Event,
        TAG_SUB_PROCESS => VariantRecord::SubProcess {
            child_instance_id: r.read_str()?,
        },
        TAG_FOR_EACH => VariantRecord::ForEach {
            context: read_context(r)?,
        },
        TAG_DYNAMIC => VariantRecord::Dynamic {
            context: read_context(r)?,
        },
        TAG_COMPOSITE => VariantRecord::Composite {
            context: read_context(r)?,
        },
        TAG_WORK_ITEM => VariantRecord::WorkItem {
            work_item_id: r.read_str()?,
            timer_ids: r.read_str_list()?,
        },
        TAG_HUMAN_TASK => VariantRecord::HumanTask {
            work_item: read_work_item(r)?,
        },
        TAG_MILESTONE => VariantRecord::Milestone {
            timer_ids: r.read_str_list()?,
        },
        TAG_STATE => VariantRecord::State {
            timer_ids: r.read_str_list()?,
        },
        TAG_RULE_SET => VariantRecord::RuleSet {
            rule_flow_group: r.read_str()?,
            timer_ids: r.read_str_list()?,
        },
        TAG_ASYNC_EVENT => VariantRecord::AsyncEvent {
            job_id: r.read_str()?,
        },
        TAG_EVENT_SUB_PROCESS => VariantRecord::EventSubProcess {
            context: read_context(r)?,
        },
        _ => return Err(CodecError::UnknownNodeInstanceVariant { tag }),
    })
}

fn read_variable(r: &mut ByteReader<'_>) -> Result<VariableRecord> {
    Ok(VariableRecord {
        name: r.read_str()?,
        tag: r.read_str()?,
        value: r.read_bytes()?,
        value_type: r.read_opt_str()?,
    })
}

fn read_work_item(r: &mut ByteReader<'_>) -> Result<WorkItemRecord> {
    let name = r.read_str()?;
    let description = r.read_opt_str()?;
    let priority = r.read_opt_i32()?;
    let reference_name = r.read_opt_str()?;
    let actual_owner = r.read_opt_str()?;
    let potential_users = r.read_str_set()?;
    let potential_groups = r.read_str_set()?;
    let admin_users = r.read_str_set()?;
    let admin_groups = r.read_str_set()?;
    let excluded_users = r.read_str_set()?;
    let excluded_groups = r.read_str_set()?;
    let started_at = r.read_i64()?;
    let completed_at = r.read_opt_i64()?;

    let n = r.read_len()?;
    let mut parameters = Vec::new();
    for _ in 0..n {
        parameters.push(read_variable(r)?);
    }
    let n = r.read_len()?;
    let mut results = Vec::new();
    for _ in 0..n {
        results.push(read_variable(r)?);
    }

    let n = r.read_len()?;
    let mut comments = Vec::new();
    for _ in 0..n {
        comments.push(CommentRecord {
            id: r.read_str()?,
            author: r.read_str()?,
            content: r.read_str()?,
            updated_at: r.read_i64()?,
        });
    }
    let n = r.read_len()?;
    let mut attachments = Vec::new();
    for _ in 0..n {
        attachments.push(AttachmentRecord {
            id: r.read_str()?,
            author: r.read_str()?,
            content: r.read_str()?,
            updated_at: r.read_i64()?,
        });
    }

    let (start_deadlines, start_reassignments) = read_deadline_family(r)?;
    let (completion_deadlines, completion_reassignments) = read_deadline_family(r)?;

    Ok(WorkItemRecord {
        name,
        description,
        priority,
        reference_name,
        actual_owner,
        potential_users,
        potential_groups,
        admin_users,
        admin_groups,
        excluded_users,
        excluded_groups,
        started_at,
        completed_at,
        parameters,
        results,
        comments,
        attachments,
        start_deadlines,
        start_reassignments,
        completion_deadlines,
        completion_reassignments,
    })
}

type DeadlineFamily = (
    BTreeMap<String, BTreeMap<String, String>>,
    BTreeMap<String, ReassignmentRecord>,
);

fn read_deadline_family(r: &mut ByteReader<'_>) -> Result<DeadlineFamily> {
    let n = r.read_len()?;
    let mut contents = BTreeMap::new();
    for _ in 0..n {
        let key = r.read_str()?;
        let content = r.read_str_map()?;
        contents.insert(key, content);
    }
    let n = r.read_len()?;
    let mut reassignments = BTreeMap::new();
    for _ in 0..n {
        let key = r.read_str()?;
        let users = r.read_str_set()?;
        let groups = r.read_str_set()?;
        reassignments.insert(key, ReassignmentRecord { users, groups });
    }
    Ok((contents, reassignments))
}
