use qrcode::render::unicode;
use qrcode::QrCode;
use vendabot_channels::ChannelManager;
use vendabot_core::{Config, Paths};

pub async fn status() -> anyhow::Result<()> {
    let paths = Paths::new();
    let config = Config::load_or_default(&paths)?;
    let manager = ChannelManager::new(config);

    println!("Channel Status");
    println!("==============");
    println!();

    for (name, enabled, info) in manager.get_status() {
        let status = if enabled { "✓" } else { "✗" };
        println!("{} {:<10} {}", status, name, info);
    }

    Ok(())
}

pub async fn login(channel: &str) -> anyhow::Result<()> {
    match channel {
        "whatsapp" => {
            let paths = Paths::new();
            let qr_path = paths.qr_code_file();

            if !qr_path.exists() {
                println!("No QR code available yet.");
                println!();
                println!("  1. Ensure the WhatsApp bridge is running");
                println!("  2. Run `vendabot serve` so the bridge connection is open");
                println!("  3. The QR payload will be saved to {}", qr_path.display());
                return Ok(());
            }

            let payload = std::fs::read_to_string(&qr_path)?;
            let payload = payload.trim();

            if payload.starts_with("data:image") {
                // The bridge sent a rendered PNG; nothing to re-encode here.
                println!("QR code image saved at {}", qr_path.display());
                println!("Decode the base64 payload to a .png and scan it with WhatsApp.");
            } else {
                let code = QrCode::new(payload.as_bytes())?;
                let rendered = code
                    .render::<unicode::Dense1x2>()
                    .dark_color(unicode::Dense1x2::Light)
                    .light_color(unicode::Dense1x2::Dark)
                    .build();
                println!("{}", rendered);
                println!();
                println!("Scan the QR code above with WhatsApp on your phone.");
            }
        }
        _ => {
            println!("Login not supported for channel: {}", channel);
            println!("Supported channels: whatsapp");
        }
    }

    Ok(())
}
