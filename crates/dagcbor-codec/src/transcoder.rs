//! Pooled encode, decode, and conversion against one rule set.

use std::any::{self, Any, TypeId};
use std::sync::OnceLock;

use dagcbor_types::Node;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, trace};

use crate::canonical;
use crate::config::CodecConfig;
use crate::error::{CodecError, CodecResult, RegistryError};
use crate::pool::Pool;
use crate::registry::{Registry, TypeRule};

struct Encoder {
    registry: Registry,
    buf: Vec<u8>,
}

impl Encoder {
    fn encode(&mut self, node: &Node) -> CodecResult<Vec<u8>> {
        self.buf.clear();
        canonical::encode_into(node, &mut self.buf)?;
        Ok(self.buf.clone())
    }

    fn encode_value(&mut self, value: &dyn Any) -> CodecResult<Vec<u8>> {
        let node = marshal(&self.registry, value)?;
        self.encode(&node)
    }
}

struct Decoder {
    scratch: Vec<u8>,
}

impl Decoder {
    fn decode(&mut self, bytes: &[u8]) -> CodecResult<Node> {
        canonical::decode_from(bytes, &mut self.scratch)
    }
}

struct Cloner {
    registry: Registry,
}

impl Cloner {
    fn unmarshal_into(&mut self, node: Node, slot: &mut dyn Any) -> CodecResult<()> {
        let type_id = (*slot).type_id();
        let rule = self
            .registry
            .rule_for(type_id)
            .ok_or_else(|| CodecError::Unregistered(format!("{type_id:?}")))?;
        rule.unmarshal_into(node, slot)
    }

    fn clone_into(&mut self, src: &dyn Any, dst: &mut dyn Any) -> CodecResult<()> {
        let node = marshal(&self.registry, src)?;
        self.unmarshal_into(node, dst)
    }
}

fn marshal(registry: &Registry, value: &dyn Any) -> CodecResult<Node> {
    let type_id = (*value).type_id();
    registry
        .rule_for(type_id)
        .ok_or_else(|| CodecError::Unregistered(format!("{type_id:?}")))?
        .marshal(value)
}

/// Canonical encoder and decoder for one rule set.
///
/// Holds a pool each of encoders, decoders, and cloners, sized by
/// [`CodecConfig::workers`]. Every method takes `&self` and may be called
/// from many threads at once; [`register`](Self::register) takes
/// `&mut self`, so no call can observe a half-rebuilt rule set.
#[derive(Debug)]
pub struct Transcoder {
    registry: Registry,
    config: CodecConfig,
    encoders: Pool<Encoder>,
    decoders: Pool<Decoder>,
    cloners: Pool<Cloner>,
}

impl Transcoder {
    /// Create a new transcoder over `registry`, sized by `config`.
    pub fn new(registry: Registry, config: CodecConfig) -> Self {
        let workers = config.workers;
        let scratch_size = config.scratch_size.max(64);
        let encoders = {
            let registry = registry.clone();
            Pool::new(workers, move || Encoder {
                registry: registry.clone(),
                buf: Vec::new(),
            })
        };
        let decoders = Pool::new(workers, move || Decoder {
            scratch: vec![0; scratch_size],
        });
        let cloners = {
            let registry = registry.clone();
            Pool::new(workers, move || Cloner {
                registry: registry.clone(),
            })
        };
        debug!(workers, rules = registry.len(), "transcoder pools ready");
        Self {
            registry,
            config,
            encoders,
            decoders,
            cloners,
        }
    }

    /// Create a new transcoder over `registry` with default sizing.
    pub fn with_registry(registry: Registry) -> Self {
        Self::new(registry, CodecConfig::default())
    }

    /// A process-wide transcoder with only the built-in rules.
    pub fn shared() -> &'static Transcoder {
        static SHARED: OnceLock<Transcoder> = OnceLock::new();
        SHARED.get_or_init(Transcoder::default)
    }

    /// The active rule set.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Pool and scratch sizing in effect.
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Add a rule, rebuilding the rule set and every pool. On conflict
    /// nothing changes.
    pub fn register(&mut self, rule: TypeRule) -> Result<(), RegistryError> {
        let mut builder = self.registry.to_builder();
        builder.register(rule)?;
        *self = Self::new(builder.build(), self.config.clone());
        Ok(())
    }

    /// Add a rule for `T` and rebuild the pools around the new rule set.
    pub fn register_type<T>(&mut self) -> Result<(), RegistryError>
    where
        T: Serialize + DeserializeOwned + Any + Send,
    {
        self.register(TypeRule::derived::<T>())
    }

    /// Canonical bytes of an object tree.
    pub fn encode(&self, node: &Node) -> CodecResult<Vec<u8>> {
        self.encoders.with(|e| e.encode(node))
    }

    /// Canonical bytes of any registered host value.
    pub fn encode_value(&self, value: &dyn Any) -> CodecResult<Vec<u8>> {
        self.encoders.with(|e| e.encode_value(value))
    }

    /// Decode exactly one canonical item from `bytes`.
    pub fn decode(&self, bytes: &[u8]) -> CodecResult<Node> {
        self.decoders
            .with(|d| d.decode(bytes))
            .inspect_err(|e| debug!(len = bytes.len(), error = %e, "cbor decode failed"))
    }

    /// Decode straight into a registered host type.
    pub fn decode_into<T: Any>(&self, bytes: &[u8]) -> CodecResult<T> {
        let node = self.decode(bytes)?;
        self.unmarshal(node)
    }

    /// Convert a host value to an object tree through its rule.
    pub fn marshal(&self, value: &dyn Any) -> CodecResult<Node> {
        marshal(&self.registry, value)
    }

    /// Convert an object tree to a `T` through its rule.
    pub fn unmarshal<T: Any>(&self, node: Node) -> CodecResult<T> {
        let rule = self
            .registry
            .rule_for(TypeId::of::<T>())
            .ok_or_else(|| CodecError::Unregistered(any::type_name::<T>().to_owned()))?;
        rule.unmarshal(node)?
            .downcast::<T>()
            .map(|value| *value)
            .map_err(|_| CodecError::TypeMismatch {
                expected: rule.type_name(),
            })
    }

    /// Overwrite `slot` with the value `node` describes, using the rule for
    /// the slot's concrete type.
    pub fn unmarshal_into(&self, node: Node, slot: &mut dyn Any) -> CodecResult<()> {
        self.cloners.with(|c| c.unmarshal_into(node, slot))
    }

    /// Deep copy `src` into `dst` through the object tree form.
    pub fn clone_into(&self, src: &dyn Any, dst: &mut dyn Any) -> CodecResult<()> {
        trace!("cloning through object tree");
        self.cloners.with(|c| c.clone_into(src, dst))
    }

    /// Decode then re-encode, yielding canonical bytes for any valid input.
    pub fn canonicalize(&self, bytes: &[u8]) -> CodecResult<Vec<u8>> {
        let node = self.decode(bytes)?;
        self.encode(&node)
    }
}

impl Default for Transcoder {
    fn default() -> Self {
        Self::new(Registry::default(), CodecConfig::default())
    }
}
