//! Text (JSON) and binary (bincode) encodings of a [`NetDescription`].

use std::fs;
use std::path::Path;

use super::NetDescription;
use crate::errors::NetError;

impl NetDescription {
    /// Parses the text encoding.
    pub fn from_json_str(json: &str) -> Result<Self, NetError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Produces the text encoding.
    pub fn to_json_string(&self) -> Result<String, NetError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses the binary encoding.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, NetError> {
        Ok(bincode::deserialize(bytes)?)
    }

    /// Produces the binary encoding.
    pub fn to_bytes(&self) -> Result<Vec<u8>, NetError> {
        Ok(bincode::serialize(self)?)
    }

    /// Reads a description file. `.json` files use the text encoding,
    /// anything else the binary one.
    pub fn read_from_file(path: impl AsRef<Path>) -> Result<Self, NetError> {
        let path = path.as_ref();
        if is_text(path) {
            Self::from_json_str(&fs::read_to_string(path)?)
        } else {
            Self::from_bytes(&fs::read(path)?)
        }
    }

    /// Writes a description file, picking the encoding like [`Self::read_from_file`].
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<(), NetError> {
        let path = path.as_ref();
        if is_text(path) {
            fs::write(path, self.to_json_string()?)?;
        } else {
            fs::write(path, self.to_bytes()?)?;
        }
        Ok(())
    }
}

fn is_text(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::Activation;
    use crate::proto::{BlobProto, NetStateRule, Phase};

    fn sample() -> NetDescription {
        NetDescription::builder("sample")
            .input("data", vec![2, 3])
            .inner_product("ip1", "data", "ip1", 4)
            .activation("relu1", "ip1", "ip1", Activation::Relu)
            .build()
    }

    #[test]
    fn test_text_and_binary_decode_identically() {
        let mut desc = sample();
        desc.layers[1].blobs = vec![BlobProto::new(vec![4, 3], vec![0.5; 12])];
        desc.layers[2].include = vec![NetStateRule::new().phase(Phase::Test).stage("deploy")];

        let from_text = NetDescription::from_json_str(&desc.to_json_string().unwrap()).unwrap();
        let from_binary = NetDescription::from_bytes(&desc.to_bytes().unwrap()).unwrap();

        assert_eq!(from_text, desc);
        assert_eq!(from_binary, desc);
    }

    #[test]
    fn test_minimal_json_uses_defaults() {
        let json = r#"{
            "name": "tiny",
            "layers": [
                {"name": "data", "type": "Input", "top": ["data"],
                 "params": {"input": {"shape": [[1, 2]]}}},
                {"name": "act", "type": "Activation", "bottom": ["data"], "top": ["data"],
                 "params": {"activation": "SIGMOID"}}
            ]
        }"#;

        let desc = NetDescription::from_json_str(json).unwrap();

        assert_eq!(desc.layers.len(), 2);
        assert!(desc.layers[0].bottom.is_empty());
        assert!(desc.layers[1].include.is_empty());
        assert_eq!(desc.layers[1].params.activation, Some(Activation::Sigmoid));
    }

    #[test]
    fn test_file_roundtrip_by_extension() {
        let desc = sample();
        let dir = std::env::temp_dir();
        let text_path = dir.join("instnet_proto_roundtrip.json");
        let binary_path = dir.join("instnet_proto_roundtrip.bin");

        desc.write_to_file(&text_path).unwrap();
        desc.write_to_file(&binary_path).unwrap();

        assert!(fs::read_to_string(&text_path).unwrap().contains("\"InnerProduct\""));
        assert_eq!(NetDescription::read_from_file(&text_path).unwrap(), desc);
        assert_eq!(NetDescription::read_from_file(&binary_path).unwrap(), desc);

        let _ = fs::remove_file(text_path);
        let _ = fs::remove_file(binary_path);
    }
}
