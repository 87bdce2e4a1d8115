//! Net assembly configuration.

use crate::proto::NetState;

/// Configuration for assembling a [`Net`](crate::net::Net).
#[derive(Debug, Clone)]
pub struct NetConfig {
    /// Execution context layers are filtered against.
    pub state: NetState,
    /// Whether to insert fan-out `Split` layers before assembly.
    pub insert_splits: bool,
    /// Whether the input layer's tops are kept alive for the whole forward pass.
    pub pin_input_blobs: bool,
    /// Blob names whose storage is never released by the executor.
    pub permanent_outputs: Vec<String>,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            state: NetState::default(),
            insert_splits: true,
            pin_input_blobs: true,
            permanent_outputs: Vec::new(),
        }
    }
}

impl NetConfig {
    /// Creates a new NetConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the execution state.
    pub fn state(mut self, state: NetState) -> Self {
        self.state = state;
        self
    }

    /// Sets whether splits are inserted automatically.
    pub fn insert_splits(mut self, insert: bool) -> Self {
        self.insert_splits = insert;
        self
    }

    /// Sets whether input blobs are pinned.
    pub fn pin_input_blobs(mut self, pin: bool) -> Self {
        self.pin_input_blobs = pin;
        self
    }

    /// Adds a blob name that must survive the forward pass.
    pub fn permanent_output(mut self, name: impl Into<String>) -> Self {
        self.permanent_outputs.push(name.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::Phase;

    #[test]
    fn test_default_config() {
        let config = NetConfig::default();
        assert_eq!(config.state.phase, Phase::Test);
        assert_eq!(config.state.level, 0);
        assert!(config.insert_splits);
        assert!(config.pin_input_blobs);
        assert!(config.permanent_outputs.is_empty());
    }

    #[test]
    fn test_config_builder() {
        let config = NetConfig::new()
            .state(NetState::new(Phase::Train).level(2).stage("deploy"))
            .insert_splits(false)
            .pin_input_blobs(false)
            .permanent_output("fc7");

        assert_eq!(config.state.phase, Phase::Train);
        assert_eq!(config.state.level, 2);
        assert_eq!(config.state.stage, ["deploy"]);
        assert!(!config.insert_splits);
        assert!(!config.pin_input_blobs);
        assert_eq!(config.permanent_outputs, ["fc7"]);
    }
}
