use qrcode::render::unicode;
use qrcode::QrCode;

use crate::error::Result;

/// Device the approval link will be opened on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Platform {
    Ios,
    Android,
    #[default]
    Web,
}

pub(crate) fn klip_qr(request_key: &str) -> String {
    format!("https://klipwallet.com/?target=/a2a?request_key={}", request_key)
}

// Klip opens the same web link on every platform.
pub(crate) fn klip_deep_link(request_key: &str, _platform: Platform) -> String {
    klip_qr(request_key)
}

pub(crate) fn kaikas_mobile_qr(request_key: &str) -> String {
    format!("https://app.kaikas.io/a/{}", request_key)
}

pub(crate) fn kaikas_mobile_deep_link(request_key: &str, platform: Platform) -> String {
    match platform {
        Platform::Ios => format!("klutch://wallet/api?request_key={}", request_key),
        Platform::Android => format!(
            "intent://wallet/api?request_key={}#Intent;scheme=klutch;package=io.klutch.wallet;end",
            request_key
        ),
        Platform::Web => kaikas_mobile_qr(request_key),
    }
}

/// Render `payload` as a QR code printable on a terminal
pub fn render_qr(payload: &str) -> Result<String> {
    let code = QrCode::new(payload.as_bytes())?;
    Ok(code
        .render::<unicode::Dense1x2>()
        .dark_color(unicode::Dense1x2::Light)
        .light_color(unicode::Dense1x2::Dark)
        .build())
}
