use std::error::Error;

use qartism::magic::{MagicBit, MagicTemplate};
use qartism::{encode_with_version, ECLevel, MaskPattern, ModuleType, SymbolLayout, Version};

// Dark ring around the symbol center
fn picture(x: usize, y: usize, w: usize) -> bool {
    let c = w as f32 / 2.0;
    let d = ((x as f32 + 0.5 - c).powi(2) + (y as f32 + 0.5 - c).powi(2)).sqrt();
    (w as f32 * 0.18..w as f32 * 0.34).contains(&d)
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_default_env().format_timestamp(None).format_target(false).init();

    let data = std::env::args().nth(1).unwrap_or_else(|| "https://example.com".to_string());
    let version = Version::new(6)?;
    let ecl = ECLevel::L;
    let mask = MaskPattern::new(0);

    let payload = encode_with_version(data.as_bytes(), version, ecl, None)?;
    let layout = SymbolLayout::get(version, ecl);

    // Data modules prefer the picture, ecc modules are pinned to it
    let w = layout.width();
    let mut template = MagicTemplate::new(layout);
    for y in 0..w {
        for x in 0..w {
            let dark = picture(x, y, w);
            match layout.cell(x, y).kind {
                ModuleType::Ecc => template.set(x, y, MagicBit::Fixed(dark)),
                _ => template.set(x, y, MagicBit::Free(dark)),
            }
        }
    }
    template.write_payload(&payload, mask)?;

    let (qr, reports) = template.render(mask, &mut rand::rng())?;
    for (i, r) in reports.iter().enumerate() {
        println!(
            "Block {i}: Free {}, Solved {}, Overflow {}, Targets {}, Unmet {}",
            r.free, r.solved, r.overflow, r.targets, r.unmet
        );
    }

    println!("{}", qr.to_str(1));

    let img = qr.to_image(8);
    img.save("magic_qr.png")?;
    println!("Magic QR code saved to: magic_qr.png");
    println!("QR metadata: {}", qr.metadata());

    Ok(())
}
