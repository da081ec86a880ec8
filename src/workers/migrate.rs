use async_trait::async_trait;
use indexmap::IndexMap;
use tracing::debug;

use super::{
    ChainNetwork, Environment, WorkersDocument,
    v0::WorkersConfigV0,
    v1::{DealV1, DealsByNetwork, HostV1, HostsByEnv, WorkersConfigV1},
};
use crate::{
    Versioned,
    error::{Error, Result},
    migration::{Migration, MigrationContext, Resolution, partition_records},
};

/// Chain id of a local development network.
const LOCAL_CHAIN_ID: u64 = 31337;

/// Groups deals by chain network and hosts by environment.
///
/// Deals that recorded their network are moved without asking. Every other
/// record is put to the operator.
pub(super) struct WorkersV0ToV1;

#[async_trait]
impl Migration<WorkersDocument> for WorkersV0ToV1 {
    fn from_version(&self) -> u32 {
        0
    }

    async fn migrate(
        &self,
        document: WorkersDocument,
        context: &MigrationContext<'_>,
    ) -> Result<WorkersDocument> {
        let WorkersConfigV0 { deals, hosts } = match document {
            WorkersDocument::V0(workers) => workers,
            other => {
                return Err(Error::invalid_definition(
                    context.config,
                    format!("expected a v0 document, got v{}", other.version()),
                ));
            }
        };
        let path = context.path;

        let deals = partition_records(deals.unwrap_or_default(), context.prompt, |name, deal| {
            match deal.chain_network {
                Some(network) => Resolution::Known(network),
                None => Resolution::Ask {
                    question: format!(
                        "Deal {name} (deal id {}) in {} has no chain network. Which network was it created on?",
                        deal.deal_id,
                        path.display()
                    ),
                    suggested: (deal.chain_network_id == LOCAL_CHAIN_ID)
                        .then_some(ChainNetwork::Local),
                },
            }
        })
        .await?;

        // v0 hosts never recorded an environment
        let hosts = partition_records(hosts.unwrap_or_default(), context.prompt, |name, host| {
            Resolution::Ask {
                question: format!(
                    "Worker {name} (dummy deal id {}) in {} has no environment. Which environment was it deployed to?",
                    host.dummy_deal_id,
                    path.display()
                ),
                suggested: Some(Environment::Custom),
            }
        })
        .await?;

        let deals = DealsByNetwork::from_groups(deals.into_iter().map(|(network, deals)| {
            let deals = deals.into_iter().map(|(name, deal)| {
                let deal = DealV1 {
                    chain_network: Some(network),
                    ..DealV1::from(deal)
                };
                (name, deal)
            });
            (network, deals.collect::<IndexMap<_, _>>())
        }));
        let hosts = HostsByEnv::from_groups(hosts.into_iter().map(|(env, hosts)| {
            let hosts = hosts.into_iter().map(|(name, host)| (name, HostV1::from(host)));
            (env, hosts.collect::<IndexMap<_, _>>())
        }));

        debug!(
            config = context.config,
            deals = deals.len(),
            hosts = hosts.len(),
            "workers grouped"
        );

        Ok(WorkersDocument::V1(WorkersConfigV1 {
            deals: (!deals.is_empty()).then_some(deals),
            hosts: (!hosts.is_empty()).then_some(hosts),
        }))
    }
}

#[cfg(test)]
mod tests {
    use std::{path::Path, sync::Mutex};

    use crate::prompt::{NonInteractive, Prompt, Question};

    use super::*;
    use crate::workers::v0::{DealV0, HostV0, InstallationSpellV0};

    /// Answers questions in order and records them.
    struct Script {
        answers: Mutex<Vec<&'static str>>,
        asked: Mutex<Vec<Question>>,
    }

    impl Script {
        fn new(answers: &[&'static str]) -> Self {
            Self {
                answers: Mutex::new(answers.iter().rev().copied().collect()),
                asked: Mutex::default(),
            }
        }
    }

    #[async_trait]
    impl Prompt for Script {
        async fn select(&self, question: &Question) -> Result<String> {
            self.asked.lock().unwrap().push(question.clone());
            Ok(self.answers.lock().unwrap().pop().unwrap().to_string())
        }
    }

    fn deal(network: Option<ChainNetwork>, chain_id: u64) -> DealV0 {
        DealV0 {
            definition: "bafkreid".to_string(),
            timestamp: "2024-02-01T10:00:00.000Z".to_string(),
            deal_id_original: "0xABC".to_string(),
            deal_id: "abc".to_string(),
            chain_network: network,
            chain_network_id: chain_id,
        }
    }

    fn host(dummy_deal_id: &str) -> HostV0 {
        HostV0 {
            definition: "bafkreih".to_string(),
            timestamp: "2024-02-01T10:00:00.000Z".to_string(),
            relay_id: "12D3KooWrelay".to_string(),
            dummy_deal_id: dummy_deal_id.to_string(),
            installation_spells: vec![InstallationSpellV0 {
                host_id: "12D3KooWhost".to_string(),
                spell_id: "spell".to_string(),
                worker_id: "12D3KooWworker".to_string(),
            }],
        }
    }

    async fn migrate(workers: WorkersConfigV0, prompt: &dyn Prompt) -> Result<WorkersConfigV1> {
        let context = MigrationContext {
            config: "workers",
            path: Path::new("/project/.verconf/workers.toml"),
            prompt,
        };
        match WorkersV0ToV1.migrate(WorkersDocument::V0(workers), &context).await? {
            WorkersDocument::V1(workers) => Ok(workers),
            other => panic!("migrated to v{}", other.version()),
        }
    }

    #[tokio::test]
    async fn deals_with_a_network_are_not_asked_about() {
        let workers = WorkersConfigV0 {
            deals: Some(IndexMap::from([
                ("alice".to_string(), deal(Some(ChainNetwork::Kras), 1)),
                ("bob".to_string(), deal(None, LOCAL_CHAIN_ID)),
            ])),
            hosts: None,
        };

        let prompt = Script::new(&["stage"]);
        let migrated = migrate(workers, &prompt).await.unwrap();

        let asked = prompt.asked.lock().unwrap();
        assert_eq!(asked.len(), 1);
        assert!(asked[0].message.contains("bob"));
        assert!(asked[0].message.contains("/project/.verconf/workers.toml"));
        assert_eq!(asked[0].default.as_deref(), Some("local"));

        let alice = migrated.deal(ChainNetwork::Kras, "alice").unwrap();
        assert_eq!(alice.chain_network, Some(ChainNetwork::Kras));
        let bob = migrated.deal(ChainNetwork::Stage, "bob").unwrap();
        assert_eq!(bob.chain_network, Some(ChainNetwork::Stage));
        assert_eq!(bob.chain_network_id, LOCAL_CHAIN_ID);
        assert!(migrated.hosts.is_none());
    }

    #[tokio::test]
    async fn every_host_is_asked_about() {
        let workers = WorkersConfigV0 {
            deals: None,
            hosts: Some(IndexMap::from([
                ("w1".to_string(), host("w1_1")),
                ("w2".to_string(), host("w2_1")),
            ])),
        };

        let prompt = Script::new(&["custom", "kras"]);
        let migrated = migrate(workers, &prompt).await.unwrap();

        let asked = prompt.asked.lock().unwrap();
        assert_eq!(asked.len(), 2);
        assert!(asked[0].message.contains("w1_1"));
        assert_eq!(asked[0].default.as_deref(), Some("custom"));
        assert_eq!(asked[0].choices, ["kras", "testnet", "stage", "local", "custom"]);

        let hosts = migrated.hosts.unwrap();
        assert_eq!(hosts.custom.as_ref().unwrap().keys().collect::<Vec<_>>(), ["w1"]);
        assert_eq!(hosts.kras.as_ref().unwrap().keys().collect::<Vec<_>>(), ["w2"]);
        assert!(hosts.local.is_none());
        assert!(migrated.deals.is_none());
    }

    #[tokio::test]
    async fn unanswered_questions_fail_the_step() {
        let workers = WorkersConfigV0 {
            deals: None,
            hosts: Some(IndexMap::from([("w1".to_string(), host("w1_1"))])),
        };

        let err = migrate(workers, &NonInteractive).await.unwrap_err();
        assert!(matches!(err, Error::PromptUnavailable { .. }));
    }
}
