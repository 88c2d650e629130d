use log::*;
use order_sync_common::helpers::env_value;

const DEFAULT_COMMAND_BUFFER_SIZE: usize = 16;
const DEFAULT_HOOK_BUFFER_SIZE: usize = 32;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackerConfig {
    /// How many presentation commands (acknowledge, reconnect) may queue up before callers wait.
    pub command_buffer_size: usize,
    /// How many notifications may queue up for each hook before the tracker waits for it.
    pub hook_buffer_size: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self { command_buffer_size: DEFAULT_COMMAND_BUFFER_SIZE, hook_buffer_size: DEFAULT_HOOK_BUFFER_SIZE }
    }
}

impl TrackerConfig {
    pub fn from_env_or_default() -> Self {
        let command_buffer_size = buffer_size_from_env("OSE_COMMAND_BUFFER_SIZE", DEFAULT_COMMAND_BUFFER_SIZE);
        let hook_buffer_size = buffer_size_from_env("OSE_HOOK_BUFFER_SIZE", DEFAULT_HOOK_BUFFER_SIZE);
        Self { command_buffer_size, hook_buffer_size }
    }
}

fn buffer_size_from_env(name: &str, default: usize) -> usize {
    match env_value::<usize>(name) {
        Ok(Some(0)) => {
            error!("🪛️ {name} must be at least 1. Using the default, {default}, instead.");
            default
        },
        Ok(Some(size)) => size,
        Ok(None) => default,
        Err(s) => {
            error!("🪛️ {s} is not a valid value for {name}. Using the default, {default}, instead.");
            default
        },
    }
}
