use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Installs the stderr subscriber.
///
/// `RUST_LOG` wins when set. Otherwise only warnings are shown, `-v` enables debug output for
/// rpcdeck and `-vv` enables trace output for everything.
pub fn init_logging(verbose: u8) -> anyhow::Result<()> {
    let default = match verbose {
        0 => "warn",
        1 => "warn,rpcdeck=debug,rpcdeck_core=debug",
        _ => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default))?;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr),
        )
        .try_init()?;

    Ok(())
}
