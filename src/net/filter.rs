//! Rule-based layer inclusion.

use crate::errors::NetError;
use crate::proto::{NetDescription, NetState, NetStateRule};

/// Returns whether `state` satisfies every dimension `rule` specifies.
pub fn state_meets_rule(state: &NetState, rule: &NetStateRule, layer_name: &str) -> bool {
    if let Some(phase) = rule.phase {
        if phase != state.phase {
            log::debug!(
                "The NetState phase ({:?}) differed from the phase ({:?}) specified by a rule in layer {}",
                state.phase,
                phase,
                layer_name
            );
            return false;
        }
    }
    if let Some(min_level) = rule.min_level {
        if state.level < min_level {
            log::debug!(
                "The NetState level ({}) is below the min_level ({}) specified by a rule in layer {}",
                state.level,
                min_level,
                layer_name
            );
            return false;
        }
    }
    if let Some(max_level) = rule.max_level {
        if state.level > max_level {
            log::debug!(
                "The NetState level ({}) is above the max_level ({}) specified by a rule in layer {}",
                state.level,
                max_level,
                layer_name
            );
            return false;
        }
    }
    if let Some(missing) = rule.stage.iter().find(|s| !state.stage.contains(*s)) {
        log::debug!(
            "The NetState did not contain stage '{}' specified by a rule in layer {}",
            missing,
            layer_name
        );
        return false;
    }
    if let Some(present) = rule.not_stage.iter().find(|s| state.stage.contains(*s)) {
        log::debug!(
            "The NetState contained a not_stage '{}' specified by a rule in layer {}",
            present,
            layer_name
        );
        return false;
    }
    true
}

/// Keeps the layers that are active under `state`, preserving their order.
///
/// A layer may carry inclusion rules or exclusion rules, never both. Without
/// rules it is active; with exclusion rules it is dropped when any rule is
/// met; with inclusion rules it is kept only when some rule is met.
pub fn filter_net(description: &NetDescription, state: &NetState) -> Result<NetDescription, NetError> {
    let mut filtered = NetDescription::new(description.name.clone());
    for layer in &description.layers {
        if !layer.include.is_empty() && !layer.exclude.is_empty() {
            return Err(NetError::configuration(format!(
                "layer '{}' specifies both include and exclude rules",
                layer.name
            )));
        }
        let included = if layer.include.is_empty() {
            !layer
                .exclude
                .iter()
                .any(|rule| state_meets_rule(state, rule, &layer.name))
        } else {
            layer
                .include
                .iter()
                .any(|rule| state_meets_rule(state, rule, &layer.name))
        };
        if included {
            filtered.layers.push(layer.clone());
        } else {
            log::debug!("Filtered out layer {}", layer.name);
        }
    }
    Ok(filtered)
}
