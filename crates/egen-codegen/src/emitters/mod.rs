pub mod apis;
pub mod classes;
pub mod cpp;
pub mod dtypes;
pub mod funcs;
pub mod opcodes;
pub mod pybind;

use crate::traits::Plugin;

/// Every registered plugin, in canonical run order.
pub const PLUGIN_IDS: [&str; 4] = [
    opcodes::PLUGIN_ID,
    dtypes::PLUGIN_ID,
    apis::PLUGIN_ID,
    pybind::PLUGIN_ID,
];

/// Look up a plugin by identifier (case-insensitive).
pub fn create_plugin(id: &str) -> Option<Box<dyn Plugin>> {
    match id.trim().to_ascii_uppercase().as_str() {
        opcodes::PLUGIN_ID => Some(Box::new(opcodes::OpcodePlugin)),
        dtypes::PLUGIN_ID => Some(Box::new(dtypes::DtypePlugin)),
        apis::PLUGIN_ID => Some(Box::new(apis::ApiPlugin)),
        pybind::PLUGIN_ID => Some(Box::new(pybind::PybindPlugin)),
        _ => None,
    }
}

pub fn default_plugins() -> Vec<Box<dyn Plugin>> {
    PLUGIN_IDS.iter().filter_map(|id| create_plugin(id)).collect()
}
