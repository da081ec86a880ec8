use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::ChainNetwork;
use crate::Schema;

/// Workers deployed by the CLI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema, Schema)]
#[schema(version = 0)]
#[serde(deny_unknown_fields)]
pub struct WorkersConfigV0 {
    /// Deals created for workers, by worker name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deals: Option<IndexMap<String, DealV0>>,

    /// Workers deployed directly to hosts, by worker name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hosts: Option<IndexMap<String, HostV0>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DealV0 {
    pub definition: String,
    pub timestamp: String,
    pub deal_id_original: String,
    pub deal_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_network: Option<ChainNetwork>,
    pub chain_network_id: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct HostV0 {
    pub definition: String,
    pub timestamp: String,
    pub relay_id: String,
    pub dummy_deal_id: String,
    pub installation_spells: Vec<InstallationSpellV0>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct InstallationSpellV0 {
    pub host_id: String,
    pub spell_id: String,
    pub worker_id: String,
}
