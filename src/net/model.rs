//! Net - a named DAG of layers connected through named blobs.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;

use burn::tensor::backend::Backend;

use crate::config::NetConfig;
use crate::errors::NetError;
use crate::layers::{INPUT_LAYER_TYPE, Layer, LayerRegistry};
use crate::proto::{LayerEntry, NetDescription};

use super::blob::Blob;
use super::filter::filter_net;
use super::lifetime::LifetimeTracker;
use super::split::insert_splits;

/// Location of a learnable blob: owning layer and its index in that layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamRef {
    pub layer: usize,
    pub index: usize,
}

/// An assembled net: layers in execution order plus the blobs they share.
pub struct Net<B: Backend> {
    pub(super) name: String,
    pub(super) device: B::Device,
    pub(super) layers: Vec<Box<dyn Layer<B>>>,
    pub(super) layer_names: Vec<String>,
    pub(super) layer_names_index: HashMap<String, usize>,
    pub(super) blobs: Vec<Blob<B>>,
    pub(super) blob_names: Vec<String>,
    pub(super) blob_names_index: HashMap<String, usize>,
    pub(super) bottom_id_vecs: Vec<Vec<usize>>,
    pub(super) top_id_vecs: Vec<Vec<usize>>,
    pub(super) param_id_vecs: Vec<Vec<usize>>,
    pub(super) params: Vec<ParamRef>,
    pub(super) param_display_names: Vec<String>,
    pub(super) lifetimes: LifetimeTracker,
    pub(super) input_blob_ids: Vec<usize>,
    pub(super) output_blob_ids: Vec<usize>,
}

impl<B: Backend> fmt::Debug for Net<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Net")
            .field("name", &self.name)
            .field("layers", &self.layer_names)
            .field("blobs", &self.blob_names)
            .field("inputs", &self.input_blob_ids)
            .field("outputs", &self.output_blob_ids)
            .finish()
    }
}

impl<B: Backend> Net<B> {
    /// Filters the description against the configured state, inserts
    /// fan-out splits when enabled, then assembles the result.
    pub fn new(
        description: &NetDescription,
        registry: &LayerRegistry<B>,
        config: &NetConfig,
        device: &B::Device,
    ) -> Result<Self, NetError> {
        let filtered = filter_net(description, &config.state)?;
        let prepared = if config.insert_splits {
            insert_splits(&filtered)
        } else {
            filtered
        };
        Self::assemble(&prepared, registry, config, device)
    }

    /// Reads a description (text or binary, by extension) and builds a net from it.
    pub fn from_file(
        path: impl AsRef<Path>,
        registry: &LayerRegistry<B>,
        config: &NetConfig,
        device: &B::Device,
    ) -> Result<Self, NetError> {
        let description = NetDescription::read_from_file(path)?;
        Self::new(&description, registry, config, device)
    }

    /// Wires an already filtered description into a net, in declaration order.
    ///
    /// Every bottom must name a blob produced earlier and not yet consumed.
    /// A top that repeats the bottom at the same position is computed in
    /// place and reuses that blob; any other top must be a fresh name.
    pub fn assemble(
        description: &NetDescription,
        registry: &LayerRegistry<B>,
        config: &NetConfig,
        device: &B::Device,
    ) -> Result<Self, NetError> {
        let mut assembler = NetAssembler::new(description.name.clone(), device.clone());
        for entry in &description.layers {
            assembler.append_layer(entry, registry)?;
        }
        let mut net = assembler.finish(config.pin_input_blobs)?;
        net.mark_permanent_outputs(&config.permanent_outputs)?;

        log::info!(
            "Net '{}' assembled: {} layers, {} blobs, {} learnable params; outputs [{}]",
            net.name,
            net.layers.len(),
            net.blobs.len(),
            net.params.len(),
            net.output_blob_ids
                .iter()
                .map(|&id| net.blob_names[id].as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        log::info!("Memory required: {:.3} MB", net.memory_used_mb());
        Ok(net)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn device(&self) -> &B::Device {
        &self.device
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn layers(&self) -> &[Box<dyn Layer<B>>] {
        &self.layers
    }

    pub fn layer_names(&self) -> &[String] {
        &self.layer_names
    }

    pub fn blobs(&self) -> &[Blob<B>] {
        &self.blobs
    }

    pub fn blob_names(&self) -> &[String] {
        &self.blob_names
    }

    /// Blob ids read by a layer, in bottom order.
    pub fn bottom_ids(&self, layer_id: usize) -> &[usize] {
        &self.bottom_id_vecs[layer_id]
    }

    /// Blob ids written by a layer, in top order.
    pub fn top_ids(&self, layer_id: usize) -> &[usize] {
        &self.top_id_vecs[layer_id]
    }

    /// Ids of the input layer's tops.
    pub fn input_blob_ids(&self) -> &[usize] {
        &self.input_blob_ids
    }

    /// Ids of the blobs nothing consumes, in order of first production.
    pub fn output_blob_ids(&self) -> &[usize] {
        &self.output_blob_ids
    }

    pub fn output_blobs(&self) -> Vec<&Blob<B>> {
        self.output_blob_ids.iter().map(|&id| &self.blobs[id]).collect()
    }

    /// Index of the last layer that reads a blob, or `None` if the blob is
    /// kept for the whole pass.
    pub fn blob_last_use(&self, blob_id: usize) -> Option<usize> {
        self.lifetimes.last_use(blob_id)
    }

    pub fn is_blob_pinned(&self, blob_id: usize) -> bool {
        self.lifetimes.is_pinned(blob_id)
    }

    pub fn has_blob(&self, name: &str) -> bool {
        self.blob_names_index.contains_key(name)
    }

    pub fn blob_id(&self, name: &str) -> Option<usize> {
        self.blob_names_index.get(name).copied()
    }

    /// Looks a blob up by name; a miss is logged and yields `None`.
    pub fn blob_by_name(&self, name: &str) -> Option<&Blob<B>> {
        match self.blob_names_index.get(name) {
            Some(&id) => Some(&self.blobs[id]),
            None => {
                log::warn!("Unknown blob name {}", name);
                None
            }
        }
    }

    pub fn blob_by_name_mut(&mut self, name: &str) -> Option<&mut Blob<B>> {
        match self.blob_names_index.get(name) {
            Some(&id) => Some(&mut self.blobs[id]),
            None => {
                log::warn!("Unknown blob name {}", name);
                None
            }
        }
    }

    pub fn has_layer(&self, name: &str) -> bool {
        self.layer_names_index.contains_key(name)
    }

    /// Looks a layer up by name; a miss is logged and yields `None`.
    pub fn layer_by_name(&self, name: &str) -> Option<&dyn Layer<B>> {
        match self.layer_names_index.get(name) {
            Some(&id) => Some(self.layers[id].as_ref()),
            None => {
                log::warn!("Unknown layer name {}", name);
                None
            }
        }
    }

    /// Copies values into a blob's storage, typically an input blob before
    /// a forward pass. The value count must match the blob's shape.
    pub fn set_input(&mut self, name: &str, values: &[f32]) -> Result<(), NetError> {
        let device = self.device.clone();
        let blob = self
            .blob_by_name_mut(name)
            .ok_or_else(|| NetError::UnknownBlob {
                name: name.to_string(),
            })?;
        blob.set_data(values, &device)
    }

    /// Keeps the named blobs alive through every forward pass.
    pub fn mark_permanent_outputs<S: AsRef<str>>(&mut self, names: &[S]) -> Result<(), NetError> {
        for name in names {
            let name = name.as_ref();
            let id = self.blob_id(name).ok_or_else(|| NetError::UnknownBlob {
                name: name.to_string(),
            })?;
            self.lifetimes.pin(id);
            log::debug!("Pinned blob {}", name);
        }
        Ok(())
    }

    /// Learnable blobs in binding order, with their display names.
    pub fn params(&self) -> impl Iterator<Item = (&str, &Blob<B>)> + '_ {
        self.params
            .iter()
            .zip(&self.param_display_names)
            .map(move |(param, name)| (name.as_str(), &self.layers[param.layer].blobs()[param.index]))
    }

    pub fn param_refs(&self) -> &[ParamRef] {
        &self.params
    }

    pub fn param_display_names(&self) -> &[String] {
        &self.param_display_names
    }

    /// Global param ids owned by a layer.
    pub fn param_ids(&self, layer_id: usize) -> &[usize] {
        &self.param_id_vecs[layer_id]
    }

    /// Total number of learnable scalars.
    pub fn learnable_param_count(&self) -> usize {
        self.params().map(|(_, blob)| blob.count()).sum()
    }

    /// Storage implied by the activation and learnable blob shapes, in megabytes.
    pub fn memory_used_mb(&self) -> f64 {
        let activations: usize = self.blobs.iter().map(Blob::count).sum();
        let params: usize = self.params().map(|(_, blob)| blob.count()).sum();
        let elements = activations + params;
        (elements * std::mem::size_of::<f32>()) as f64 / (1024.0 * 1024.0)
    }

    /// Serializes every layer, learnable blobs included.
    pub fn to_description(&self) -> Result<NetDescription, NetError> {
        let layers = self
            .layers
            .iter()
            .map(|layer| layer.to_entry())
            .collect::<Result<Vec<LayerEntry>, _>>()?;
        Ok(NetDescription {
            name: self.name.clone(),
            layers,
        })
    }

    /// Writes the serialized net to disk (`.json` as text, otherwise binary).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), NetError> {
        self.to_description()?.write_to_file(path)
    }
}

/// Incremental wiring state used while a net is assembled.
struct NetAssembler<B: Backend> {
    net: Net<B>,
    available: HashSet<String>,
    production_order: Vec<String>,
    rebound_in_place: HashSet<usize>,
}

impl<B: Backend> NetAssembler<B> {
    fn new(name: String, device: B::Device) -> Self {
        Self {
            net: Net {
                name,
                device,
                layers: Vec::new(),
                layer_names: Vec::new(),
                layer_names_index: HashMap::new(),
                blobs: Vec::new(),
                blob_names: Vec::new(),
                blob_names_index: HashMap::new(),
                bottom_id_vecs: Vec::new(),
                top_id_vecs: Vec::new(),
                param_id_vecs: Vec::new(),
                params: Vec::new(),
                param_display_names: Vec::new(),
                lifetimes: LifetimeTracker::new(),
                input_blob_ids: Vec::new(),
                output_blob_ids: Vec::new(),
            },
            available: HashSet::new(),
            production_order: Vec::new(),
            rebound_in_place: HashSet::new(),
        }
    }

    fn append_layer(&mut self, entry: &LayerEntry, registry: &LayerRegistry<B>) -> Result<(), NetError> {
        let layer_id = self.net.layers.len();
        if self.net.layer_names_index.contains_key(&entry.name) {
            return Err(NetError::configuration(format!(
                "duplicate layer name '{}'",
                entry.name
            )));
        }
        let mut layer = registry.create(entry)?;
        log::debug!("Creating layer {}", entry.name);

        let bottom_ids = entry
            .bottom
            .iter()
            .enumerate()
            .map(|(index, name)| self.append_bottom(entry, index, name, layer_id))
            .collect::<Result<Vec<_>, _>>()?;
        let top_ids = entry
            .top
            .iter()
            .enumerate()
            .map(|(index, name)| self.append_top(entry, index, name, &bottom_ids, layer_id))
            .collect::<Result<Vec<_>, _>>()?;

        if layer_id == 0 && entry.layer_type == INPUT_LAYER_TYPE {
            self.net.input_blob_ids = top_ids.clone();
        }

        let bottom = gather(&self.net.blobs, &bottom_ids);
        let mut top = gather(&self.net.blobs, &top_ids);
        layer.setup(&bottom, &mut top, &self.net.device)?;
        for (&id, blob) in top_ids.iter().zip(top) {
            log::debug!("Top shape {}: {}", self.net.blob_names[id], blob.shape_string());
            self.net.blobs[id] = blob;
        }

        let mut param_ids = Vec::with_capacity(layer.blobs().len());
        for index in 0..layer.blobs().len() {
            let display_name = entry
                .param
                .get(index)
                .filter(|name| !name.is_empty())
                .cloned()
                .unwrap_or_else(|| format!("{}_{}", entry.name, index));
            param_ids.push(self.net.params.len());
            self.net.params.push(ParamRef {
                layer: layer_id,
                index,
            });
            self.net.param_display_names.push(display_name);
        }

        self.net.layers.push(layer);
        self.net.layer_names.push(entry.name.clone());
        self.net.layer_names_index.insert(entry.name.clone(), layer_id);
        self.net.bottom_id_vecs.push(bottom_ids);
        self.net.top_id_vecs.push(top_ids);
        self.net.param_id_vecs.push(param_ids);
        Ok(())
    }

    fn append_bottom(
        &mut self,
        entry: &LayerEntry,
        index: usize,
        name: &str,
        layer_id: usize,
    ) -> Result<usize, NetError> {
        if !self.available.remove(name) {
            return Err(NetError::UnknownBottom {
                blob: name.to_string(),
                layer: entry.name.clone(),
                index,
            });
        }
        let blob_id = self.net.blob_names_index[name];
        self.net.lifetimes.extend(blob_id, layer_id);
        log::debug!("{} <- {}", entry.name, name);
        Ok(blob_id)
    }

    fn append_top(
        &mut self,
        entry: &LayerEntry,
        index: usize,
        name: &str,
        bottom_ids: &[usize],
        layer_id: usize,
    ) -> Result<usize, NetError> {
        let blob_id = if entry.bottom.get(index).is_some_and(|bottom| bottom == name) {
            log::debug!("{} -> {} (in-place)", entry.name, name);
            let blob_id = bottom_ids[index];
            self.net.lifetimes.extend(blob_id, layer_id + 1);
            self.rebound_in_place.insert(blob_id);
            blob_id
        } else if self.net.blob_names_index.contains_key(name) {
            return Err(NetError::DuplicateProducer {
                blob: name.to_string(),
                layer: entry.name.clone(),
            });
        } else {
            log::debug!("{} -> {}", entry.name, name);
            let blob_id = self.net.lifetimes.track(layer_id);
            self.net.blobs.push(Blob::default());
            self.net.blob_names.push(name.to_string());
            self.net.blob_names_index.insert(name.to_string(), blob_id);
            self.production_order.push(name.to_string());
            blob_id
        };
        self.available.insert(name.to_string());
        Ok(blob_id)
    }

    fn finish(self, pin_input_blobs: bool) -> Result<Net<B>, NetError> {
        let Self {
            mut net,
            available,
            production_order,
            rebound_in_place,
        } = self;

        match net.layers.first() {
            Some(layer) if layer.type_tag() == INPUT_LAYER_TYPE => {}
            first => {
                return Err(NetError::MissingInputLayer {
                    expected: INPUT_LAYER_TYPE,
                    found: first.map(|layer| layer.type_tag().to_string()),
                });
            }
        }

        net.output_blob_ids = production_order
            .iter()
            .filter(|name| available.contains(*name))
            .map(|name| net.blob_names_index[name])
            .collect();

        if pin_input_blobs {
            for &id in &net.input_blob_ids {
                if !rebound_in_place.contains(&id) {
                    net.lifetimes.pin(id);
                }
            }
        }
        Ok(net)
    }
}

/// Clones the blobs at `ids`; tensor handles are shared, not copied.
pub(super) fn gather<B: Backend>(blobs: &[Blob<B>], ids: &[usize]) -> Vec<Blob<B>> {
    ids.iter().map(|&id| blobs[id].clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::Activation;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn assemble(description: &NetDescription) -> Result<Net<TestBackend>, NetError> {
        Net::assemble(
            description,
            &LayerRegistry::with_builtin(),
            &NetConfig::default(),
            &Default::default(),
        )
    }

    #[test]
    fn test_in_place_top_reuses_blob() {
        let description = NetDescription::builder("in_place")
            .input("data", vec![1, 4])
            .inner_product("fc", "data", "fc", 3)
            .activation("relu", "fc", "fc", Activation::Relu)
            .activation("sigmoid", "fc", "fc", Activation::Sigmoid)
            .build();
        let net = assemble(&description).unwrap();

        assert_eq!(net.blobs().len(), 2);
        assert_eq!(net.top_ids(2), &[1]);
        assert_eq!(net.top_ids(3), &[1]);
        assert_eq!(net.blob_last_use(1), Some(4));
        assert_eq!(net.output_blob_ids(), &[1]);
        assert_eq!(net.input_blob_ids(), &[0]);
        assert_eq!(net.blobs()[1].shape(), &[1, 3]);
    }

    #[test]
    fn test_duplicate_layer_name_is_rejected() {
        let description = NetDescription::builder("dup")
            .input("data", vec![1, 2])
            .inner_product("fc", "data", "a", 2)
            .inner_product("fc", "a", "b", 2)
            .build();
        assert!(matches!(
            assemble(&description),
            Err(NetError::Configuration { .. })
        ));
    }

    #[test]
    fn test_outputs_follow_first_production_order() {
        let description = NetDescription::builder("multi_out")
            .layer(
                LayerEntry::new("data", "Input")
                    .with_top(["z", "a"])
                    .with_params(crate::proto::LayerParams {
                        input: Some(crate::proto::InputParams {
                            shape: vec![vec![1, 2], vec![1, 2]],
                        }),
                        ..Default::default()
                    }),
            )
            .build();
        let net = assemble(&description).unwrap();
        let names: Vec<&str> = net
            .output_blob_ids()
            .iter()
            .map(|&id| net.blob_names()[id].as_str())
            .collect();
        assert_eq!(names, vec!["z", "a"]);
    }

    #[test]
    fn test_input_rebound_in_place_is_not_pinned() {
        let description = NetDescription::builder("rebound")
            .input("data", vec![1, 2])
            .activation("relu", "data", "data", Activation::Relu)
            .inner_product("fc", "data", "out", 1)
            .build();
        let net = assemble(&description).unwrap();
        assert!(!net.is_blob_pinned(0));
        assert_eq!(net.blob_last_use(0), Some(2));
    }

    #[test]
    fn test_debug_lists_layers() {
        let description = NetDescription::builder("dbg")
            .input("data", vec![1, 2])
            .build();
        let net = assemble(&description).unwrap();
        let debug = format!("{net:?}");
        assert!(debug.contains("dbg"));
        assert!(debug.contains("data"));
    }
}
