use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use super::provider::{ProviderConnector, ProviderProfile};
use super::remote::{RemoteApprovalConnector, RemoteWallet};
use super::{ConnectorContext, WalletConnector};
use crate::wallet::{ChainType, WalletType};

/// Builds a fresh connector for one wallet
pub type ConnectorFactory = Arc<dyn Fn(&ConnectorContext) -> Arc<dyn WalletConnector> + Send + Sync>;

struct Registration {
    chains: BTreeSet<ChainType>,
    factory: ConnectorFactory,
}

/// Collects wallet registrations before the chain index is derived
#[derive(Default)]
pub struct WalletRegistryBuilder {
    entries: HashMap<WalletType, Registration>,
}

impl WalletRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `wallet`, replacing an earlier registration of the same wallet
    pub fn register<F>(mut self, wallet: WalletType, chains: &[ChainType], factory: F) -> Self
    where
        F: Fn(&ConnectorContext) -> Arc<dyn WalletConnector> + Send + Sync + 'static,
    {
        self.entries.insert(
            wallet,
            Registration {
                chains: chains.iter().copied().collect(),
                factory: Arc::new(factory),
            },
        );
        self
    }

    pub fn build(self, ctx: ConnectorContext) -> WalletRegistry {
        let mut by_chain: BTreeMap<ChainType, BTreeSet<WalletType>> = BTreeMap::new();
        for (wallet, registration) in &self.entries {
            for chain in &registration.chains {
                by_chain.entry(*chain).or_default().insert(*wallet);
            }
        }

        WalletRegistry {
            ctx,
            entries: self.entries,
            by_chain,
        }
    }
}

/// Lookup from wallet to connector factory and from chain to the wallets supporting it.
///
/// The chain index is derived once in [`WalletRegistryBuilder::build`] and is
/// read-only afterwards.
pub struct WalletRegistry {
    ctx: ConnectorContext,
    entries: HashMap<WalletType, Registration>,
    by_chain: BTreeMap<ChainType, BTreeSet<WalletType>>,
}

impl WalletRegistry {
    pub fn builder() -> WalletRegistryBuilder {
        WalletRegistryBuilder::new()
    }

    /// Registry of every wallet this crate ships a connector for
    pub fn with_default_wallets(ctx: ConnectorContext) -> Self {
        use ChainType::*;

        let all = [Klaytn, KlaytnTestnet, Ethereum, Polygon];
        let klaytn = [Klaytn, KlaytnTestnet];

        let mut builder = Self::builder()
            .register(WalletType::Klip, &[Klaytn, Ethereum], |ctx| {
                Arc::new(RemoteApprovalConnector::new(RemoteWallet::Klip, ctx)) as Arc<dyn WalletConnector>
            })
            .register(WalletType::KaikasMobile, &klaytn, |ctx| {
                Arc::new(RemoteApprovalConnector::new(RemoteWallet::KaikasMobile, ctx)) as Arc<dyn WalletConnector>
            });

        let provider_wallets: [(WalletType, &[ChainType]); 6] = [
            (WalletType::Kaikas, &klaytn),
            (WalletType::Metamask, &all),
            (WalletType::Coinbase, &all),
            (WalletType::WalletConnect, &all),
            (WalletType::DcentEthereum, &[Ethereum, Polygon]),
            (WalletType::DcentKlaytn, &klaytn),
        ];
        for (wallet, chains) in provider_wallets {
            let Some(profile) = ProviderProfile::for_wallet(wallet) else {
                continue;
            };
            builder = builder.register(wallet, chains, move |ctx| {
                Arc::new(ProviderConnector::new(
                    profile.clone(),
                    ctx.provider(wallet),
                    ctx.encoder.clone(),
                )) as Arc<dyn WalletConnector>
            });
        }

        builder.build(ctx)
    }

    pub fn context(&self) -> &ConnectorContext {
        &self.ctx
    }

    /// A new connector for `wallet`, or `None` when it is not registered
    pub fn resolve(&self, wallet: WalletType) -> Option<Arc<dyn WalletConnector>> {
        self.entries
            .get(&wallet)
            .map(|registration| (registration.factory)(&self.ctx))
    }

    /// Wallets supporting `chain`, empty for an unknown chain
    pub fn chain_support(&self, chain: ChainType) -> BTreeSet<WalletType> {
        self.by_chain.get(&chain).cloned().unwrap_or_default()
    }

    /// Chains `wallet` was registered with
    pub fn supported_chains(&self, wallet: WalletType) -> BTreeSet<ChainType> {
        self.entries
            .get(&wallet)
            .map(|registration| registration.chains.clone())
            .unwrap_or_default()
    }

    pub fn wallets(&self) -> impl Iterator<Item = WalletType> + '_ {
        self.entries.keys().copied()
    }
}
