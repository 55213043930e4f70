mod settings;

pub use settings::{Config, PricingSettings, Settings, UiSettings};
