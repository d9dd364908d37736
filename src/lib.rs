pub mod imap_probe;
pub mod logging;
pub mod onboarding;
pub mod settings;
pub mod web;
