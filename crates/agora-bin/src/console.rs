//! Banners for a terminal.

use agora_config_and_utils::notify::{Banner, BannerStyle, Notifier};

/// Prints banners to stderr.
///
/// The CLI is not interactive, so action banners are dismissed right away.
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn show(&self, banner: Banner) {
        eprintln!("{}", render(&banner));
        banner.dismiss();
    }
}

fn render(banner: &Banner) -> String {
    let tag = match banner.style {
        BannerStyle::Info => "info",
        BannerStyle::Success => "ok",
        BannerStyle::Error => "error",
    };
    match &banner.subtitle {
        Some(subtitle) => format!("[{}] {}: {}", tag, banner.title, subtitle),
        None => format!("[{}] {}", tag, banner.title),
    }
}
