use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use wallet_connector::connector::remote::render_qr;
use wallet_connector::wallet::FileStore;
use wallet_connector::{
    ConnectorContext, EventBus, ManagerOptions, SessionStore, WalletManager, WalletRegistry,
    WalletType,
};

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

fn session_store() -> Result<SessionStore> {
    let dir = FileStore::default_path().context("no local data directory")?;
    let store = FileStore::new(&dir).with_context(|| format!("cannot open {}", dir.display()))?;
    Ok(SessionStore::new(Arc::new(store)))
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let mut args = std::env::args().skip(1);
    let options = match args.next() {
        Some(path) => ManagerOptions::load_from_file(&PathBuf::from(path)).await?,
        None => ManagerOptions::default(),
    };
    let wallet = match args.next() {
        Some(code) => WalletType::from_code(&code).ok_or_else(|| anyhow!("unknown wallet code {:?}", code))?,
        None => WalletType::Klip,
    };

    let registry = WalletRegistry::with_default_wallets(ConnectorContext::new(options.clone()));
    let events = EventBus::global();
    events.add_listener("log", |event_type, event| {
        if event_type.is_error() {
            warn!(?event_type, ?event, "wallet event");
        } else {
            info!(?event_type, ?event, "wallet event");
        }
    });

    let manager = WalletManager::initialize(options, registry, session_store()?, events)?;
    if manager.auto_connect().await {
        info!(address = ?manager.current_address(), "resumed previous session");
        return Ok(());
    }

    let connector = manager
        .registry()
        .resolve(wallet)
        .ok_or_else(|| anyhow!("{} is not registered", wallet))?;

    if let Some(link) = connector.dapp_link() {
        info!(%wallet, %link, "open the application in the wallet's browser");
    }

    if let Some(qr) = connector.as_qr() {
        qr.set_qr_code_callback(Arc::new(|uri: &str, valid_for: Option<u64>| {
            match render_qr(uri) {
                Ok(code) => println!("{}", code),
                Err(e) => error!("cannot render qr code: {}", e),
            }
            println!("{}", uri);
            if let Some(seconds) = valid_for {
                println!("valid for {} seconds", seconds);
            }
        }));
    }

    info!(%wallet, "waiting for wallet approval");
    if !connector.activate().await? {
        warn!(%wallet, "wallet did not approve the connection");
        return Ok(());
    }

    manager.adopt(Some(connector))?;
    manager.set_wallet_type(wallet);
    info!(address = ?manager.current_address(), chain = ?manager.chain_id(), "wallet connected");

    WalletManager::destroy();
    Ok(())
}
