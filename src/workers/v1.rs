use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{
    ChainNetwork, Environment,
    v0::{DealV0, HostV0, InstallationSpellV0},
};
use crate::Schema;

/// Workers deployed by the CLI, grouped by where they run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema, Schema)]
#[schema(version = 1)]
#[serde(deny_unknown_fields)]
pub struct WorkersConfigV1 {
    /// Deals created for workers, by chain network and worker name.
    #[serde(default, skip_serializing_if = "no_deals")]
    pub deals: Option<DealsByNetwork>,

    /// Workers deployed directly to hosts, by environment and worker name.
    #[serde(default, skip_serializing_if = "no_hosts")]
    pub hosts: Option<HostsByEnv>,
}

fn no_deals(deals: &Option<DealsByNetwork>) -> bool {
    deals.as_ref().is_none_or(DealsByNetwork::is_empty)
}

fn no_hosts(hosts: &Option<HostsByEnv>) -> bool {
    hosts.as_ref().is_none_or(HostsByEnv::is_empty)
}

fn is_empty_group<R>(group: &Option<IndexMap<String, R>>) -> bool {
    group.as_ref().is_none_or(IndexMap::is_empty)
}

impl WorkersConfigV1 {
    /// Chain networks holding at least one deal.
    pub fn deal_networks(&self) -> impl Iterator<Item = ChainNetwork> + '_ {
        self.deals
            .iter()
            .flat_map(|deals| deals.iter().map(|(network, _)| network))
    }

    pub fn deal(&self, network: ChainNetwork, name: &str) -> Option<&DealV1> {
        self.deals.as_ref()?.get(network)?.get(name)
    }

    pub fn host(&self, env: Environment, name: &str) -> Option<&HostV1> {
        self.hosts.as_ref()?.get(env)?.get(name)
    }

    pub fn insert_deal(
        &mut self,
        network: ChainNetwork,
        name: impl Into<String>,
        deal: DealV1,
    ) -> Option<DealV1> {
        self.deals
            .get_or_insert_with(DealsByNetwork::default)
            .insert(network, name, deal)
    }

    pub fn insert_host(
        &mut self,
        env: Environment,
        name: impl Into<String>,
        host: HostV1,
    ) -> Option<HostV1> {
        self.hosts
            .get_or_insert_with(HostsByEnv::default)
            .insert(env, name, host)
    }

    pub fn remove_deal(&mut self, network: ChainNetwork, name: &str) -> Option<DealV1> {
        let deals = self.deals.as_mut()?;
        let removed = deals.remove(network, name);
        if deals.is_empty() {
            self.deals = None;
        }
        removed
    }

    pub fn remove_host(&mut self, env: Environment, name: &str) -> Option<HostV1> {
        let hosts = self.hosts.as_mut()?;
        let removed = hosts.remove(env, name);
        if hosts.is_empty() {
            self.hosts = None;
        }
        removed
    }
}

/// Declares a struct holding one optional record map per category.
///
/// Empty groups are never produced by its methods, are hidden by `get` and
/// `iter`, and are skipped when serializing.
macro_rules! grouped_records {
    (
        $(#[$meta:meta])*
        pub struct $name:ident<$category:ident, $record:ident> {
            $( $field:ident => $variant:ident, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
        #[serde(deny_unknown_fields)]
        pub struct $name {
            $(
                #[serde(default, skip_serializing_if = "is_empty_group")]
                pub $field: Option<IndexMap<String, $record>>,
            )+
        }

        impl $name {
            pub fn from_groups(
                groups: impl IntoIterator<Item = ($category, IndexMap<String, $record>)>,
            ) -> Self {
                let mut grouped = Self::default();
                for (category, records) in groups {
                    for (name, record) in records {
                        grouped.insert(category, name, record);
                    }
                }
                grouped
            }

            pub fn get(&self, category: $category) -> Option<&IndexMap<String, $record>> {
                let group = match category {
                    $( $category::$variant => self.$field.as_ref(), )+
                };
                group.filter(|records| !records.is_empty())
            }

            fn slot_mut(&mut self, category: $category) -> &mut Option<IndexMap<String, $record>> {
                match category {
                    $( $category::$variant => &mut self.$field, )+
                }
            }

            pub fn insert(
                &mut self,
                category: $category,
                name: impl Into<String>,
                record: $record,
            ) -> Option<$record> {
                self.slot_mut(category)
                    .get_or_insert_with(IndexMap::new)
                    .insert(name.into(), record)
            }

            /// Removes a record, dropping its group when it was the last one.
            pub fn remove(&mut self, category: $category, name: &str) -> Option<$record> {
                let slot = self.slot_mut(category);
                let removed = slot.as_mut()?.shift_remove(name);
                if slot.as_ref().is_some_and(IndexMap::is_empty) {
                    *slot = None;
                }
                removed
            }

            /// Non-empty groups in declaration order.
            pub fn iter(&self) -> impl Iterator<Item = ($category, &IndexMap<String, $record>)> + '_ {
                [$( ($category::$variant, self.$field.as_ref()), )+]
                    .into_iter()
                    .filter_map(|(category, records)| {
                        records
                            .filter(|records| !records.is_empty())
                            .map(|records| (category, records))
                    })
            }

            pub fn is_empty(&self) -> bool {
                self.iter().next().is_none()
            }

            /// Number of records across all groups.
            pub fn len(&self) -> usize {
                self.iter().map(|(_, records)| records.len()).sum()
            }
        }
    };
}

grouped_records! {
    /// Deals keyed by the chain network they were created on.
    pub struct DealsByNetwork<ChainNetwork, DealV1> {
        kras => Kras,
        testnet => Testnet,
        stage => Stage,
        local => Local,
    }
}

grouped_records! {
    /// Host deployments keyed by the environment they target.
    pub struct HostsByEnv<Environment, HostV1> {
        kras => Kras,
        testnet => Testnet,
        stage => Stage,
        local => Local,
        custom => Custom,
    }
}

/// A deal, stored under the chain network it was created on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DealV1 {
    pub definition: String,
    pub timestamp: String,
    pub deal_id_original: String,
    pub deal_id: String,
    /// Same as the group the deal is stored under once migrated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_network: Option<ChainNetwork>,
    pub chain_network_id: u64,
}

impl From<DealV0> for DealV1 {
    fn from(deal: DealV0) -> Self {
        Self {
            definition: deal.definition,
            timestamp: deal.timestamp,
            deal_id_original: deal.deal_id_original,
            deal_id: deal.deal_id,
            chain_network: deal.chain_network,
            chain_network_id: deal.chain_network_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct HostV1 {
    pub definition: String,
    pub timestamp: String,
    pub relay_id: String,
    pub dummy_deal_id: String,
    pub installation_spells: Vec<InstallationSpellV1>,
}

impl From<HostV0> for HostV1 {
    fn from(host: HostV0) -> Self {
        Self {
            definition: host.definition,
            timestamp: host.timestamp,
            relay_id: host.relay_id,
            dummy_deal_id: host.dummy_deal_id,
            installation_spells: host
                .installation_spells
                .into_iter()
                .map(InstallationSpellV1::from)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct InstallationSpellV1 {
    pub host_id: String,
    pub spell_id: String,
    pub worker_id: String,
}

impl From<InstallationSpellV0> for InstallationSpellV1 {
    fn from(spell: InstallationSpellV0) -> Self {
        Self {
            host_id: spell.host_id,
            spell_id: spell.spell_id,
            worker_id: spell.worker_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deal(id: &str) -> DealV1 {
        DealV1 {
            definition: "bafy".to_string(),
            timestamp: "2024-01-01T00:00:00.000Z".to_string(),
            deal_id_original: format!("0x{id}"),
            deal_id: id.to_string(),
            chain_network: None,
            chain_network_id: 31337,
        }
    }

    #[test]
    fn removing_the_last_record_drops_the_group() {
        let mut workers = WorkersConfigV1::default();
        workers.insert_deal(ChainNetwork::Local, "a", deal("1"));
        workers.insert_deal(ChainNetwork::Kras, "b", deal("2"));
        assert_eq!(
            workers.deal_networks().collect::<Vec<_>>(),
            [ChainNetwork::Kras, ChainNetwork::Local]
        );

        assert_eq!(workers.remove_deal(ChainNetwork::Kras, "b"), Some(deal("2")));
        let deals = workers.deals.as_ref().unwrap();
        assert!(deals.kras.is_none());
        assert_eq!(deals.len(), 1);

        workers.remove_deal(ChainNetwork::Local, "a");
        assert!(workers.deals.is_none());
    }

    #[test]
    fn empty_groups_are_not_serialized() {
        let mut workers = WorkersConfigV1::default();
        workers.insert_deal(ChainNetwork::Stage, "a", deal("1"));

        let text = toml::to_string(&workers).unwrap();
        let table: toml::Table = toml::from_str(&text).unwrap();
        assert_eq!(table.keys().collect::<Vec<_>>(), ["deals"]);
        let networks: Vec<_> = table["deals"].as_table().unwrap().keys().collect();
        assert_eq!(networks, ["stage"]);
    }

    #[test]
    fn empty_loaded_groups_are_hidden_and_dropped() {
        let workers: WorkersConfigV1 =
            toml::from_str("[hosts.custom]\n[deals.kras]\n").unwrap();
        let hosts = workers.hosts.as_ref().unwrap();
        assert!(hosts.get(Environment::Custom).is_none());
        assert!(hosts.is_empty());
        assert_eq!(workers.deal_networks().count(), 0);

        let text = toml::to_string(&workers).unwrap();
        let table: toml::Table = toml::from_str(&text).unwrap();
        assert!(table.is_empty(), "{text}");
    }
}
