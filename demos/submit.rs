use fabric_gateway::config::loader::load_config;
use fabric_gateway::events::{BlockEvent, CallbackResult, EventError};
use fabric_gateway::identity::IdentityContext;
use fabric_gateway::observability::logging;
use fabric_gateway::{ConnectOptions, Gateway, ListenerOptions, Wallet};
use std::path::PathBuf;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("gateway.toml"));
    let config = load_config(&path)?;
    logging::init(&config.options.observability);

    // FABRIC_GATEWAY_PRIVATE_KEY holds the hex-encoded signing key
    let wallet = Wallet::from_env()?;
    let identity = IdentityContext::new(&config.client.msp_id, Arc::new(wallet));
    let gateway = Gateway::from_config(&config, ConnectOptions::new(identity))?;

    let channel = config.channels.first().map(|c| c.name.clone()).unwrap_or_default();
    let network = gateway.get_network(&channel)?;

    // 1. Watch blocks as they are committed
    let blocks = network
        .add_block_listener(
            |event: Result<BlockEvent, EventError>| async move {
                match event {
                    Ok(block) => println!("Block {} committed", block.block_number()),
                    Err(e) => eprintln!("Block listener error: {}", e),
                }
                let result: CallbackResult = Ok(());
                result
            },
            ListenerOptions::default(),
        )
        .await?;

    // 2. Submit and wait for the commit
    let contract = network.get_contract("basic", None);
    println!("Submitting createAsset...");
    match contract.submit_transaction("createAsset", &["asset1", "blue", "5", "Tom", "300"]).await {
        Ok(_) => println!("Transaction committed"),
        Err(e) => eprintln!("Submit failed: {}", e),
    }

    // 3. Read it back
    let asset = contract.evaluate_transaction("readAsset", &["asset1"]).await?;
    println!("Asset: {}", String::from_utf8_lossy(&asset));

    network.remove_block_listener(&blocks);
    gateway.disconnect().await;
    Ok(())
}
