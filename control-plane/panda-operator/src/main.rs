use envconfig::Envconfig;
use kube::Client;
use panda_operator::{
    config::OperatorConfig, controller::run_controller, init_tracing,
};
use tokio_util::sync::CancellationToken;
use tracing::info;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    init_tracing("info");

    let cfg = OperatorConfig::init_from_env()?.apply_profile_defaults();
    info!(?cfg, "Starting panda-operator");

    let client = Client::try_default().await?;

    // In-flight store round-trips observe this token; the controller itself
    // drains on the same signal.
    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            signal_token.cancel();
        }
    });

    run_controller(client, cfg, shutdown).await
}
