use std::sync::Once;

use tracing::Level;
use tracing_subscriber::{
    filter::FilterFn, fmt::format::Format, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Log to stderr; stdout belongs to the map.
pub fn setup_logging(level: Level) {
    static LOGGING_SETUP: Once = Once::new();

    LOGGING_SETUP.call_once(|| {
        let filter = FilterFn::new(move |metadata| {
            metadata.module_path().unwrap_or_default().starts_with("trainmap")
                && *metadata.level() <= level
        });
        let layer = tracing_subscriber::fmt::layer()
            .event_format(Format::default().without_time())
            .with_writer(std::io::stderr)
            .with_ansi(false);
        tracing_subscriber::registry()
            .with(layer)
            .with(filter)
            .init();
        std::panic::set_hook(Box::new(|info| tracing::error!("{info}")));
    })
}
