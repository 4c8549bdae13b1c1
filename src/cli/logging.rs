//! Log subscriber for the preview CLI
//!
//! Everything goes to stderr so stdout stays valid JSON.

use tracing_subscriber::EnvFilter;

/// `RUST_LOG` wins unless `--verbose` asks for debug output; the default is `warn`
pub fn init(verbose: bool, json: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if let Err(e) = result {
        eprintln!("logging already initialized: {e}");
    }
}
