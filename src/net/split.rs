//! Fan-out insertion.
//!
//! Rewrites a description so that every blob read by more than one layer is
//! produced for each reader by a dedicated `Split` top. After this pass each
//! name has a single producer and a single consumer (in-place layers rebind
//! a name rather than consume it a second time).

use std::collections::HashMap;

use crate::layers::SPLIT_LAYER_TYPE;
use crate::proto::{LayerEntry, NetDescription};

/// (layer index, top index) of the layer output a name currently refers to.
type TopIdx = (usize, usize);

pub fn split_layer_name(layer_name: &str, blob_name: &str, top_index: usize) -> String {
    format!("{layer_name}_{blob_name}_{top_index}_split")
}

pub fn split_blob_name(layer_name: &str, blob_name: &str, top_index: usize, split_index: usize) -> String {
    format!("{layer_name}_{blob_name}_{top_index}_split_{split_index}")
}

/// Inserts `Split` layers after every top that feeds more than one bottom.
pub fn insert_splits(description: &NetDescription) -> NetDescription {
    let layers = &description.layers;

    let mut last_top: HashMap<&str, TopIdx> = HashMap::new();
    let mut bottom_source: HashMap<(usize, usize), TopIdx> = HashMap::new();
    let mut consumer_count: HashMap<TopIdx, usize> = HashMap::new();
    for (i, layer) in layers.iter().enumerate() {
        for (j, name) in layer.bottom.iter().enumerate() {
            // Names nobody produced are left for assembly to report.
            if let Some(&source) = last_top.get(name.as_str()) {
                bottom_source.insert((i, j), source);
                *consumer_count.entry(source).or_insert(0) += 1;
            }
        }
        for (j, name) in layer.top.iter().enumerate() {
            last_top.insert(name, (i, j));
        }
    }

    let mut result = NetDescription::new(description.name.clone());
    let mut renamed: HashMap<TopIdx, String> = HashMap::new();
    let mut next_split: HashMap<TopIdx, usize> = HashMap::new();
    let mut inserted = 0;

    for (i, layer) in layers.iter().enumerate() {
        let mut entry = layer.clone();

        for j in 0..entry.bottom.len() {
            let Some(&source) = bottom_source.get(&(i, j)) else {
                continue;
            };
            if consumer_count[&source] > 1 {
                let producer = &layers[source.0];
                let k = next_split.entry(source).or_insert(0);
                entry.bottom[j] = split_blob_name(&producer.name, &producer.top[source.1], source.1, *k);
                *k += 1;
            } else if let Some(name) = renamed.get(&source) {
                entry.bottom[j] = name.clone();
            }
        }

        // An in-place layer whose bottom was rewired keeps working in place.
        for j in 0..entry.top.len().min(entry.bottom.len()) {
            if layer.top[j] == layer.bottom[j] && entry.bottom[j] != layer.bottom[j] {
                entry.top[j] = entry.bottom[j].clone();
                renamed.insert((i, j), entry.top[j].clone());
            }
        }

        let splits: Vec<LayerEntry> = entry
            .top
            .iter()
            .enumerate()
            .filter_map(|(j, top)| {
                let count = consumer_count.get(&(i, j)).copied().unwrap_or(0);
                (count > 1).then(|| {
                    let blob_name = &layer.top[j];
                    LayerEntry::new(split_layer_name(&layer.name, blob_name, j), SPLIT_LAYER_TYPE)
                        .with_bottom([top.clone()])
                        .with_top((0..count).map(|k| split_blob_name(&layer.name, blob_name, j, k)))
                })
            })
            .collect();

        result.layers.push(entry);
        inserted += splits.len();
        result.layers.extend(splits);
    }

    if inserted > 0 {
        log::debug!("Inserted {} split layer(s) into net {}", inserted, description.name);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::Activation;
    use crate::proto::EltwiseOp;

    fn names(description: &NetDescription) -> Vec<&str> {
        description.layers.iter().map(|l| l.name.as_str()).collect()
    }

    #[test]
    fn test_single_consumers_are_untouched() {
        let description = NetDescription::builder("chain")
            .input("data", vec![1, 2])
            .inner_product("ip", "data", "ip", 2)
            .activation("relu", "ip", "ip", Activation::Relu)
            .softmax("prob", "ip", "prob")
            .build();

        assert_eq!(insert_splits(&description), description);
    }

    #[test]
    fn test_fan_out_gets_split() {
        let description = NetDescription::builder("branch")
            .input("data", vec![1, 2])
            .inner_product("a", "data", "a", 2)
            .inner_product("b", "data", "b", 2)
            .eltwise("sum", &["a", "b"], "sum", EltwiseOp::Sum)
            .build();

        let split = insert_splits(&description);

        assert_eq!(names(&split), ["data", "data_data_0_split", "a", "b", "sum"]);
        let splitter = &split.layers[1];
        assert_eq!(splitter.layer_type, "Split");
        assert_eq!(splitter.bottom, ["data"]);
        assert_eq!(splitter.top, ["data_data_0_split_0", "data_data_0_split_1"]);
        assert_eq!(split.layers[2].bottom, ["data_data_0_split_0"]);
        assert_eq!(split.layers[3].bottom, ["data_data_0_split_1"]);
    }

    #[test]
    fn test_in_place_consumer_of_split_blob_stays_in_place() {
        let description = NetDescription::builder("inplace")
            .input("data", vec![1, 2])
            .inner_product("ip", "data", "x", 2)
            .activation("relu", "x", "x", Activation::Relu)
            .inner_product("other", "x", "y", 2)
            .build();
        // "x" from "ip" is read by relu (in place) only; relu's x is read once.
        assert_eq!(insert_splits(&description), description);

        let description = NetDescription::builder("inplace")
            .input("data", vec![1, 2])
            .inner_product("ip", "data", "x", 2)
            .inner_product("side", "x", "s", 2)
            .activation("relu", "x", "x", Activation::Relu)
            .inner_product("after", "x", "y", 2)
            .build();

        let split = insert_splits(&description);

        assert_eq!(names(&split), ["data", "ip", "ip_x_0_split", "side", "relu", "after"]);
        assert_eq!(split.layers[3].bottom, ["ip_x_0_split_0"]);
        assert_eq!(split.layers[4].bottom, ["ip_x_0_split_1"]);
        assert_eq!(split.layers[4].top, ["ip_x_0_split_1"]);
        assert_eq!(split.layers[5].bottom, ["ip_x_0_split_1"]);
    }
}
