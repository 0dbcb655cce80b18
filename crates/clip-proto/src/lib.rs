pub mod config;
pub mod platform;
pub mod protocol;

pub const APP_NAME: &str = "twitch-clip";
pub const APP_DISPLAY_NAME: &str = "Twitch Clip";
