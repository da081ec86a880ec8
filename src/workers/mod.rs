//! The workers config: deals and direct host deployments made by the CLI.
//!
//! Version 0 kept every record in one flat map per kind. Version 1 groups
//! deals by chain network and hosts by environment. Upgrading asks the
//! operator wherever a v0 record does not say where it belongs.

mod migrate;
pub mod v0;
pub mod v1;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub use v0::{DealV0, HostV0, InstallationSpellV0, WorkersConfigV0};
pub use v1::{DealV1, DealsByNetwork, HostV1, HostsByEnv, InstallationSpellV1, WorkersConfigV1};

use crate::{
    Choice, Migration, Versioned, VersionedConfig,
    error::Result,
    template::{TemplateContext, render_template},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ChainNetwork {
    Kras,
    Testnet,
    Stage,
    Local,
}

impl Choice for ChainNetwork {
    fn all() -> &'static [Self] {
        &[Self::Kras, Self::Testnet, Self::Stage, Self::Local]
    }

    fn as_str(&self) -> &'static str {
        match self {
            Self::Kras => "kras",
            Self::Testnet => "testnet",
            Self::Stage => "stage",
            Self::Local => "local",
        }
    }
}

/// Where a worker runs. `Custom` is any network not known to the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Kras,
    Testnet,
    Stage,
    Local,
    Custom,
}

impl Choice for Environment {
    fn all() -> &'static [Self] {
        &[
            Self::Kras,
            Self::Testnet,
            Self::Stage,
            Self::Local,
            Self::Custom,
        ]
    }

    fn as_str(&self) -> &'static str {
        match self {
            Self::Kras => "kras",
            Self::Testnet => "testnet",
            Self::Stage => "stage",
            Self::Local => "local",
            Self::Custom => "custom",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Versioned)]
pub enum WorkersDocument {
    V0(WorkersConfigV0),
    V1(WorkersConfigV1),
}

const DEALS_EXAMPLE: &str = r#"[deals.kras.my-worker]
definition = "bafkreigvy3k4racm6i6vvavtr5mdkllmfi2lfkmdk72gnzwk7zdnhajw4y"
timestamp = "2024-03-01T12:00:00.000Z"
dealIdOriginal = "0x1f2D73A0a4e0fb5e5a48dF0d5b2A7A7e1c7F1aD8"
dealId = "1f2d73a0a4e0fb5e5a48df0d5b2a7a7e1c7f1ad8"
chainNetwork = "kras"
chainNetworkId = 2358716091832359
"#;

const HOSTS_EXAMPLE: &str = r#"[hosts.custom.my-worker]
definition = "bafkreigvy3k4racm6i6vvavtr5mdkllmfi2lfkmdk72gnzwk7zdnhajw4y"
timestamp = "2024-03-01T12:00:00.000Z"
relayId = "12D3KooWEXNUbCXooUwHrHBbrmjsrpHXoEphPwbjQXEGyzbqKnE9"
dummyDealId = "my-worker_1709294400000"

[[hosts.custom.my-worker.installationSpells]]
hostId = "12D3KooWBM3SdXWqGaawQDGQ6JprtwswEg3FWGvGhmgmMez1vRbR"
spellId = "2b5bdbf1-3b3f-4c3e-9b0a-36d16b1f0c55"
workerId = "12D3KooWLyMHmjvNGnPsEqKvLAbNL2NXwxZWQrfo4MKhWcKX9y8U"
"#;

/// Deals and host deployments, stored in `workers.toml`.
pub struct WorkersConfig;

impl VersionedConfig for WorkersConfig {
    type Document = WorkersDocument;

    const TYPE_NAME: &'static str = "workers";
    const FILE_NAME: &'static str = "workers.toml";

    fn migrations() -> Vec<Box<dyn Migration<WorkersDocument>>> {
        vec![Box::new(migrate::WorkersV0ToV1)]
    }

    fn default_template(context: &TemplateContext) -> Result<String> {
        render_template(
            context,
            Self::TYPE_NAME,
            &WorkersConfigV1::default(),
            &[("deals", DEALS_EXAMPLE), ("hosts", HOSTS_EXAMPLE)],
        )
    }
}

crate::submit_config!(WorkersConfig);
