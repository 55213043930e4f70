use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ocstats::config::{Config, Settings};
use ocstats::ui::App;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Config::parse_args();

    setup_logging(cli.debug);

    let mut settings =
        Settings::load(cli.config.as_ref()).context("could not load ocstats configuration")?;
    settings.merge_cli(&cli);
    settings.validate();

    info!(
        window_days = settings.ui.default_window_days,
        watch = settings.watch,
        pricing = settings.pricing.enabled,
        "starting ocstats"
    );

    let mut app = App::new(settings);
    app.run().await
}

/// `RUST_LOG` wins when set; otherwise log this crate at info, or at debug
/// with `--debug`.
fn setup_logging(debug: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if debug {
            EnvFilter::new("ocstats=debug")
        } else {
            EnvFilter::new("ocstats=info")
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}
