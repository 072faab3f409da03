pub mod channels;
pub mod settings;

pub use channels::{load_channels_default, load_channels_from};
pub use settings::{DigestSettings, ProviderKind};
