use actiond_core::config::Config;
use actiond_core::ActionRegistry;
use actiond_server::AppState;

pub fn run(config: &Config, listen: Option<&str>) -> anyhow::Result<()> {
    let listen = listen.unwrap_or(config.listen.as_str()).to_string();
    let registry = ActionRegistry::with_builtins()?;
    tracing::info!(
        actions = registry.len(),
        workers = config.dispatch.workers,
        "starting actions endpoint"
    );
    let state = AppState::from_config(config, registry);

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        tokio::select! {
            res = actiond_server::serve(state, &listen) => res,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down");
                Ok(())
            }
        }
    })
}
