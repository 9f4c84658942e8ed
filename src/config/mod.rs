//! Layered configuration.
//!
//! Sources, lowest priority first: built-in defaults, an optional
//! `config/default.{toml,yaml,json}` file relative to the working directory,
//! then `HIREBEAT__<SECTION>__<KEY>` environment variables.

mod settings;

use config::{Config, Environment, File};

use crate::utils::error::ChannelError;
use settings::PartialSettings;

pub use settings::{
    EndpointSettings, HeartbeatSettings, LoggingSettings, ReconnectSettings, Settings,
};

/// Load settings from the default file and environment, merged over
/// [`Settings::default`].
pub fn load_config() -> Result<Settings, ChannelError> {
    let builder = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(
            Environment::with_prefix("HIREBEAT")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

    let partial: PartialSettings = builder.build()?.try_deserialize()?;

    Ok(partial.merge_over(Settings::default()))
}
