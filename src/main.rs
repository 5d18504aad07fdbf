//! Credential-swap demo.
//!
//! Wires a buyer and an issuer together over the in-memory mock channel
//! runtime, each behind its own [`Client`] dispatcher, and drives a single
//! honest swap end to end through the same proposal/update routing a real
//! runtime would use, for manual inspection of the session state machine's
//! logging.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use credswap_channel::mock::{MockResponder, PairedMockChannel};
use credswap_channel::{ChannelHandle, SessionResult, UpdateResponder};
use credswap_client::{ChannelProposalRequest, Client, ProposalAcceptor};
use credswap_core::{Address, ChannelParams, CredentialSigner, ProtocolConfig, U256};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// A [`ProposalAcceptor`] that just hands over an already-built handle,
/// standing in for the negotiation a real runtime would do before a channel
/// opens.
struct StaticAcceptor {
    handle: Arc<dyn ChannelHandle>,
}

#[async_trait]
impl ProposalAcceptor for StaticAcceptor {
    async fn accept(self: Box<Self>) -> SessionResult<Arc<dyn ChannelHandle>> {
        Ok(self.handle)
    }

    async fn reject(self: Box<Self>, _reason: String) -> SessionResult<()> {
        Ok(())
    }
}

/// Environment variable names.
mod env {
    pub const ISSUER_PRIVATE_KEY: &str = "CREDSWAP_ISSUER_PRIVATE_KEY";
}

#[tokio::main]
async fn main() -> Result<()> {
    print_banner();

    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,credswap_channel=debug,credswap_core=debug")),
        )
        .init();

    info!("Starting credential-swap demo");

    let signer = load_signer()?;
    run_demo(signer).await
}

fn load_signer() -> Result<CredentialSigner> {
    let key = std::env::var(env::ISSUER_PRIVATE_KEY).unwrap_or_else(|_| {
        // A well-known local test key, used only when no key is configured.
        "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80".to_string()
    });
    let private_key: alloy::signers::local::PrivateKeySigner = key.parse()?;
    Ok(CredentialSigner::new(private_key))
}

async fn run_demo(signer: CredentialSigner) -> Result<()> {
    let config = ProtocolConfig::default();

    let issuer_addr = signer.address();
    let buyer_addr = Address::repeat_byte(0x01);
    let params = ChannelParams {
        participants: vec![buyer_addr, issuer_addr],
        challenge_duration: config.challenge_duration_secs,
    };
    let balances = vec![U256::from(5_000_000u64), U256::ZERO];
    let (buyer_handle, issuer_handle) = PairedMockChannel::pair(params, balances);
    let issuer_handle: Arc<dyn ChannelHandle> = Arc::new(issuer_handle);

    // Each party runs its own dispatcher, as it would against a real runtime:
    // an inbound proposal is accepted into a session, then routed updates.
    let buyer_client = Client::new();
    let issuer_client = Client::new();

    let buyer_proposal = ChannelProposalRequest::new(
        issuer_addr,
        Box::new(StaticAcceptor {
            handle: Arc::new(buyer_handle),
        }),
    );
    let buyer = buyer_proposal
        .accept_with_config(buyer_client.registry(), config.clone())
        .await?;

    let issuer_proposal = ChannelProposalRequest::new(
        buyer_addr,
        Box::new(StaticAcceptor {
            handle: issuer_handle.clone(),
        }),
    );
    let issuer = issuer_proposal
        .accept_with_config(issuer_client.registry(), config)
        .await?;

    let price = U256::from(1_000_000u64);
    let doc = b"a verifiable credential document";

    let prev_state = issuer_handle.state();

    info!("Buyer requesting credential");
    let async_cred = buyer
        .request_credential(doc, price, issuer_addr)
        .await?;

    info!("Issuer observing offer and issuing credential");
    let responder: Arc<dyn UpdateResponder> = Arc::new(MockResponder::default());
    issuer_client.dispatch_update(issuer.id(), prev_state, issuer_handle.state(), responder);

    let cancel = CancellationToken::new();
    let request = issuer
        .next_credential_request(&cancel)
        .await?;
    request.issue_credential(&signer).await?;

    info!("Buyer awaiting issuer's signed certificate");
    let proposal = async_cred.r#await(&cancel).await?;
    proposal.responder.accept().await?;

    info!(signature = %hex::encode(proposal.signature), "Swap complete");

    buyer.close(&cancel).await?;
    issuer.close(&cancel).await?;

    info!("Demo finished");
    Ok(())
}

/// Print startup banner.
fn print_banner() {
    println!(
        r#"
    ╔═╗╦═╗╔═╗╔╦╗╔═╗╦ ╦╔═╗╔═╗
    ║  ╠╦╝║╣  ║║╚═╗║║║╠═╣╠═╝
    ╚═╝╩╚═╚═╝═╩╝╚═╝╚╩╝╩ ╩╩
    credential swap demo
    "#
    );
}
