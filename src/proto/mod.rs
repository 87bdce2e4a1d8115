//! Declarative net description.
//!
//! A [`NetDescription`] is an ordered list of [`LayerEntry`] values wiring
//! named bottom (input) and top (output) blobs together. It round-trips
//! through JSON (text) and bincode (binary); both encodings decode to the
//! same in-memory structure.

mod builder;
mod io;

use serde::{Deserialize, Serialize};

use crate::layers::Activation;

pub use builder::NetDescriptionBuilder;

/// A complete net: a name plus layers in execution order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetDescription {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub layers: Vec<LayerEntry>,
}

impl NetDescription {
    /// Creates an empty description with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            layers: Vec::new(),
        }
    }

    /// Starts a chained builder for a description.
    pub fn builder(name: impl Into<String>) -> NetDescriptionBuilder {
        NetDescriptionBuilder::new(name)
    }

    /// Finds a layer entry by exact name.
    pub fn layer(&self, name: &str) -> Option<&LayerEntry> {
        self.layers.iter().find(|l| l.name == name)
    }
}

/// One computation node of the description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub layer_type: String,
    #[serde(default)]
    pub bottom: Vec<String>,
    #[serde(default)]
    pub top: Vec<String>,
    /// Explicit display names for the learnable blobs; empty means unnamed.
    #[serde(default)]
    pub param: Vec<String>,
    #[serde(default)]
    pub include: Vec<NetStateRule>,
    #[serde(default)]
    pub exclude: Vec<NetStateRule>,
    /// Learnable blobs (trained weights), in the layer's own order.
    #[serde(default)]
    pub blobs: Vec<BlobProto>,
    #[serde(default)]
    pub params: LayerParams,
}

impl LayerEntry {
    /// Creates an entry with the given name and type and no connections.
    pub fn new(name: impl Into<String>, layer_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            layer_type: layer_type.into(),
            ..Default::default()
        }
    }

    /// Sets the bottom blob names.
    pub fn with_bottom<S: Into<String>>(mut self, bottom: impl IntoIterator<Item = S>) -> Self {
        self.bottom = bottom.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the top blob names.
    pub fn with_top<S: Into<String>>(mut self, top: impl IntoIterator<Item = S>) -> Self {
        self.top = top.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the explicit parameter display names.
    pub fn with_param_names<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.param = names.into_iter().map(Into::into).collect();
        self
    }

    /// Adds an inclusion rule.
    pub fn include(mut self, rule: NetStateRule) -> Self {
        self.include.push(rule);
        self
    }

    /// Adds an exclusion rule.
    pub fn exclude(mut self, rule: NetStateRule) -> Self {
        self.exclude.push(rule);
        self
    }

    /// Sets the layer-specific payload.
    pub fn with_params(mut self, params: LayerParams) -> Self {
        self.params = params;
        self
    }

    /// Sets the learnable blobs.
    pub fn with_blobs(mut self, blobs: Vec<BlobProto>) -> Self {
        self.blobs = blobs;
        self
    }
}

/// Serialized form of a tensor buffer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlobProto {
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

impl BlobProto {
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> Self {
        Self { shape, data }
    }

    /// Number of elements implied by the shape.
    pub fn count(&self) -> usize {
        self.shape.iter().product()
    }
}

/// Whether the net is run for training or for testing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Phase {
    Train,
    #[default]
    Test,
}

/// The execution context layers are filtered against.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetState {
    pub phase: Phase,
    #[serde(default)]
    pub level: i32,
    #[serde(default)]
    pub stage: Vec<String>,
}

impl NetState {
    /// Creates a state for the given phase at level 0 with no stages.
    pub fn new(phase: Phase) -> Self {
        Self {
            phase,
            ..Default::default()
        }
    }

    /// Sets the level.
    pub fn level(mut self, level: i32) -> Self {
        self.level = level;
        self
    }

    /// Adds an active stage label.
    pub fn stage(mut self, stage: impl Into<String>) -> Self {
        self.stage.push(stage.into());
        self
    }
}

/// A condition on [`NetState`]. Unset fields are "don't care".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetStateRule {
    #[serde(default)]
    pub phase: Option<Phase>,
    #[serde(default)]
    pub min_level: Option<i32>,
    #[serde(default)]
    pub max_level: Option<i32>,
    /// Stages that must all be active.
    #[serde(default)]
    pub stage: Vec<String>,
    /// Stages of which none may be active.
    #[serde(default)]
    pub not_stage: Vec<String>,
}

impl NetStateRule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(mut self, phase: Phase) -> Self {
        self.phase = Some(phase);
        self
    }

    pub fn min_level(mut self, level: i32) -> Self {
        self.min_level = Some(level);
        self
    }

    pub fn max_level(mut self, level: i32) -> Self {
        self.max_level = Some(level);
        self
    }

    pub fn stage(mut self, stage: impl Into<String>) -> Self {
        self.stage.push(stage.into());
        self
    }

    pub fn not_stage(mut self, stage: impl Into<String>) -> Self {
        self.not_stage.push(stage.into());
        self
    }
}

/// Layer-specific configuration. Each layer kind reads its own section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerParams {
    #[serde(default)]
    pub input: Option<InputParams>,
    #[serde(default)]
    pub inner_product: Option<InnerProductParams>,
    #[serde(default)]
    pub activation: Option<Activation>,
    #[serde(default)]
    pub softmax: Option<AxisParams>,
    #[serde(default)]
    pub eltwise: Option<EltwiseParams>,
    #[serde(default)]
    pub concat: Option<AxisParams>,
    #[serde(default)]
    pub scale: Option<ScaleParams>,
}

/// Shapes of the tops produced by an `Input` layer, one per top.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputParams {
    pub shape: Vec<Vec<usize>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InnerProductParams {
    pub num_output: usize,
    #[serde(default = "default_true")]
    pub bias_term: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisParams {
    #[serde(default = "default_axis")]
    pub axis: usize,
}

impl Default for AxisParams {
    fn default() -> Self {
        Self { axis: 1 }
    }
}

/// Elementwise reduction applied across the bottoms of an `Eltwise` layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EltwiseOp {
    Prod,
    #[default]
    Sum,
    Max,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EltwiseParams {
    #[serde(default)]
    pub operation: EltwiseOp,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleParams {
    #[serde(default)]
    pub bias_term: bool,
}

fn default_true() -> bool {
    true
}

fn default_axis() -> usize {
    1
}
