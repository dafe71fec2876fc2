//! Pluggable, type-erased encoding of variable values.
//!
//! Each strategy declares, via a predicate, which runtime value types it
//! accepts and which wire tag it owns. Strategies are probed in the order
//! they were registered; the first match wins on both the encode and
//! decode side. Encoding a value no strategy accepts is a fatal
//! configuration error, never a silent fallback.

use crate::error::{CodecError, Result};
use crate::records::VariableRecord;
use crate::types::Variable;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Reserved tag for a present-but-null value. Decoding it never reaches
/// a strategy; strategies must not claim it.
pub const NULL_TAG: &str = "";

// ─── Type-erased variable value ───────────────────────────────

/// A variable's runtime value: any `'static` payload, plus the Rust type
/// name captured at construction for write-side diagnostics.
pub struct VariableValue {
    inner: Box<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl VariableValue {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            inner: Box::new(value),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Runtime type name of the wrapped value (diagnostics only — never
    /// used for dispatch).
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref()
    }

    fn as_any(&self) -> &(dyn Any + Send + Sync) {
        &*self.inner
    }
}

impl fmt::Debug for VariableValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VariableValue({})", self.type_name)
    }
}

// ─── Strategy contract ────────────────────────────────────────

/// One pluggable encoder/decoder for a class of variable values.
pub trait ValueStrategy: Send + Sync {
    /// Stable wire tag this strategy owns. Written before the payload so
    /// decode can re-select the strategy without type information.
    fn tag(&self) -> &'static str;

    /// Whether this strategy encodes the given runtime value.
    fn accepts_value(&self, value: &(dyn Any + Send + Sync)) -> bool;

    /// Whether this strategy decodes payloads carrying the given tag.
    fn accepts_tag(&self, tag: &str) -> bool {
        tag == self.tag()
    }

    fn encode(&self, value: &(dyn Any + Send + Sync)) -> Result<Vec<u8>>;

    fn decode(&self, bytes: &[u8]) -> Result<VariableValue>;
}

// ─── Registry ─────────────────────────────────────────────────

/// Ordered strategy list, probed first-match. Configuration: built once
/// at startup, read-only afterwards, shareable across threads.
#[derive(Clone, Default)]
pub struct StrategyRegistry {
    strategies: Vec<Arc<dyn ValueStrategy>>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in strategies, in probe order: bool, i64, f64, string,
    /// bytes, then JSON as the structured catch-all.
    pub fn standard() -> Self {
        let mut reg = Self::new();
        reg.register(BoolStrategy);
        reg.register(I64Strategy);
        reg.register(F64Strategy);
        reg.register(StringStrategy);
        reg.register(BytesStrategy);
        reg.register(JsonStrategy);
        reg
    }

    /// Append a strategy. Earlier registrations win ties.
    pub fn register<S: ValueStrategy + 'static>(&mut self, strategy: S) {
        debug_assert!(strategy.tag() != NULL_TAG, "null tag is reserved");
        self.strategies.push(Arc::new(strategy));
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Encode one variable binding into its wire record. A `None` value
    /// becomes the reserved null tag with an empty payload.
    pub fn encode_variable(&self, variable: &Variable) -> Result<VariableRecord> {
        let Some(value) = &variable.value else {
            return Ok(VariableRecord {
                name: variable.name.clone(),
                tag: NULL_TAG.to_string(),
                value: Vec::new(),
                value_type: None,
            });
        };

        let strategy = self
            .strategies
            .iter()
            .find(|s| s.accepts_value(value.as_any()))
            .ok_or_else(|| CodecError::NoStrategyFound {
                variable: variable.name.clone(),
                value_type: value.type_name().to_string(),
            })?;

        Ok(VariableRecord {
            name: variable.name.clone(),
            tag: strategy.tag().to_string(),
            value: strategy.encode(value.as_any())?,
            value_type: Some(value.type_name().to_string()),
        })
    }

    /// Inverse of [`encode_variable`](Self::encode_variable).
    pub fn decode_variable(&self, record: &VariableRecord) -> Result<Variable> {
        if record.tag == NULL_TAG {
            return Ok(Variable::null(record.name.clone()));
        }

        let strategy = self
            .strategies
            .iter()
            .find(|s| s.accepts_tag(&record.tag))
            .ok_or_else(|| CodecError::NoStrategyFound {
                variable: record.name.clone(),
                value_type: record.tag.clone(),
            })?;

        Ok(Variable {
            name: record.name.clone(),
            value: Some(strategy.decode(&record.value)?),
        })
    }
}

impl fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tags: Vec<&str> = self.strategies.iter().map(|s| s.tag()).collect();
        f.debug_struct("StrategyRegistry").field("tags", &tags).finish()
    }
}

// ─── Built-in strategies ──────────────────────────────────────

fn expect_len(tag: &str, bytes: &[u8], len: usize) -> Result<()> {
    if bytes.len() != len {
        return Err(CodecError::MalformedEnvelope(format!(
            "{tag} payload must be {len} bytes, got {}",
            bytes.len()
        )));
    }
    Ok(())
}

fn downcast<'a, T: Any>(tag: &str, value: &'a (dyn Any + Send + Sync)) -> Result<&'a T> {
    value.downcast_ref::<T>().ok_or_else(|| {
        CodecError::MalformedEnvelope(format!("{tag} strategy invoked on a non-{tag} value"))
    })
}

pub struct BoolStrategy;

impl ValueStrategy for BoolStrategy {
    fn tag(&self) -> &'static str {
        "bool"
    }

    fn accepts_value(&self, value: &(dyn Any + Send + Sync)) -> bool {
        value.is::<bool>()
    }

    fn encode(&self, value: &(dyn Any + Send + Sync)) -> Result<Vec<u8>> {
        Ok(vec![u8::from(*downcast::<bool>("bool", value)?)])
    }

    fn decode(&self, bytes: &[u8]) -> Result<VariableValue> {
        expect_len("bool", bytes, 1)?;
        match bytes[0] {
            0 => Ok(VariableValue::new(false)),
            1 => Ok(VariableValue::new(true)),
            b => Err(CodecError::MalformedEnvelope(format!(
                "bool payload byte {b} is neither 0 nor 1"
            ))),
        }
    }
}

pub struct I64Strategy;

impl ValueStrategy for I64Strategy {
    fn tag(&self) -> &'static str {
        "i64"
    }

    fn accepts_value(&self, value: &(dyn Any + Send + Sync)) -> bool {
        value.is::<i64>()
    }

    fn encode(&self, value: &(dyn Any + Send + Sync)) -> Result<Vec<u8>> {
        Ok(downcast::<i64>("i64", value)?.to_le_bytes().to_vec())
    }

    fn decode(&self, bytes: &[u8]) -> Result<VariableValue> {
        expect_len("i64", bytes, 8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        Ok(VariableValue::new(i64::from_le_bytes(raw)))
    }
}

pub struct F64Strategy;

impl ValueStrategy for F64Strategy {
    fn tag(&self) -> &'static str {
        "f64"
    }

    fn accepts_value(&self, value: &(dyn Any + Send + Sync)) -> bool {
        value.is::<f64>()
    }

    fn encode(&self, value: &(dyn Any + Send + Sync)) -> Result<Vec<u8>> {
        Ok(downcast::<f64>("f64", value)?.to_le_bytes().to_vec())
    }

    fn decode(&self, bytes: &[u8]) -> Result<VariableValue> {
        expect_len("f64", bytes, 8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        Ok(VariableValue::new(f64::from_le_bytes(raw)))
    }
}

pub struct StringStrategy;

impl ValueStrategy for StringStrategy {
    fn tag(&self) -> &'static str {
        "string"
    }

    fn accepts_value(&self, value: &(dyn Any + Send + Sync)) -> bool {
        value.is::<String>()
    }

    fn encode(&self, value: &(dyn Any + Send + Sync)) -> Result<Vec<u8>> {
        Ok(downcast::<String>("string", value)?.as_bytes().to_vec())
    }

    fn decode(&self, bytes: &[u8]) -> Result<VariableValue> {
        let s = std::str::from_utf8(bytes).map_err(|e| {
            CodecError::MalformedEnvelope(format!("string payload is not UTF-8: {e}"))
        })?;
        Ok(VariableValue::new(s.to_string()))
    }
}

pub struct BytesStrategy;

impl ValueStrategy for BytesStrategy {
    fn tag(&self) -> &'static str {
        "bytes"
    }

    fn accepts_value(&self, value: &(dyn Any + Send + Sync)) -> bool {
        value.is::<Vec<u8>>()
    }

    fn encode(&self, value: &(dyn Any + Send + Sync)) -> Result<Vec<u8>> {
        Ok(downcast::<Vec<u8>>("bytes", value)?.clone())
    }

    fn decode(&self, bytes: &[u8]) -> Result<VariableValue> {
        Ok(VariableValue::new(bytes.to_vec()))
    }
}

/// Structured catch-all: any `serde_json::Value`. Map keys serialize in
/// BTreeMap order, so output stays deterministic.
pub struct JsonStrategy;

impl ValueStrategy for JsonStrategy {
    fn tag(&self) -> &'static str {
        "json"
    }

    fn accepts_value(&self, value: &(dyn Any + Send + Sync)) -> bool {
        value.is::<serde_json::Value>()
    }

    fn encode(&self, value: &(dyn Any + Send + Sync)) -> Result<Vec<u8>> {
        let json = downcast::<serde_json::Value>("json", value)?;
        serde_json::to_vec(json)
            .map_err(|e| CodecError::MalformedEnvelope(format!("json value encode failed: {e}")))
    }

    fn decode(&self, bytes: &[u8]) -> Result<VariableValue> {
        let json: serde_json::Value = serde_json::from_slice(bytes).map_err(|e| {
            CodecError::MalformedEnvelope(format!("json payload decode failed: {e}"))
        })?;
        Ok(VariableValue::new(json))
    }
}
