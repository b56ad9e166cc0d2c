use std::sync::Arc;

use xtb_twtxt_cli::TwtxtCliRunner;

use xtb_core::{
    commands::Dispatcher,
    config::Config,
    twtxt::{Twtxt, TwtxtCliConfig},
};

#[tokio::main]
async fn main() -> Result<(), xtb_core::Error> {
    xtb_core::logging::init("xtb")?;

    let cfg = match Config::load() {
        Ok(cfg) => Arc::new(cfg),
        Err(e) => {
            tracing::error!(error = %e, "failed to load configuration");
            return Err(e);
        }
    };

    let twtxt = Arc::new(Twtxt::new(
        TwtxtCliConfig {
            program: cfg.twtxt_path.clone(),
            flavor: cfg.twtxt_flavor,
        },
        Arc::new(TwtxtCliRunner::new()),
    ));
    let dispatcher = Arc::new(Dispatcher::new(cfg.clone(), twtxt));

    if let Err(e) = xtb_xmpp::router::run(cfg, dispatcher).await {
        tracing::error!(error = %e, "xmpp bot stopped");
        return Err(xtb_core::Error::External(format!("xmpp bot failed: {e}")));
    }

    Ok(())
}
