use std::time::Instant;

use rand::{rngs::StdRng, Rng, SeedableRng};
use rayon::prelude::*;

use qartism::magic::{MagicBit, MagicTemplate};
use qartism::{
    encode_with_version, ECLevel, MaskPattern, ModuleType, QRBuilder, SymbolLayout, Version,
};

const RUNS: u64 = 256;

fn random_template(layout: &'static SymbolLayout, rng: &mut StdRng) -> MagicTemplate {
    let w = layout.width();
    let mut tpl = MagicTemplate::new(layout);
    for y in 0..w {
        for x in 0..w {
            let v = rng.random::<bool>();
            match layout.cell(x, y).kind {
                ModuleType::Ecc => tpl.set(x, y, MagicBit::Fixed(v)),
                _ => tpl.set(x, y, MagicBit::Free(v)),
            }
        }
    }
    tpl
}

fn benchmark_magic(version: usize, ecl: ECLevel) {
    let version = Version::new(version).unwrap();
    let layout = SymbolLayout::get(version, ecl);
    let mask = MaskPattern::new(3);
    let payload = encode_with_version(b"https://example.com/magic", version, ecl, None).unwrap();

    let start = Instant::now();
    let runtimes = (0..RUNS)
        .into_par_iter()
        .map(|seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut tpl = random_template(layout, &mut rng);
            tpl.write_payload(&payload, mask).unwrap();

            let start = Instant::now();
            let (_qr, reports) = tpl.render(mask, &mut rng).unwrap();
            let unmet = reports.iter().map(|r| r.unmet).sum::<usize>();
            (start.elapsed().as_micros(), unmet)
        })
        .collect::<Vec<_>>();
    let total = start.elapsed();

    let avg = runtimes.iter().map(|r| r.0).sum::<u128>() / RUNS as u128;
    let unmet = runtimes.iter().map(|r| r.1).sum::<usize>();
    println!(
        "Version {:>2} {:?}: Avg solve {:>6}us, Unmet targets {:>5}, Wall {:?}",
        *version, ecl, avg, unmet, total
    );
}

fn benchmark_builder(version: usize, ecl: ECLevel) {
    let version = Version::new(version).unwrap();
    let data = "1234567890".repeat(20);

    let start = Instant::now();
    (0..RUNS).into_par_iter().for_each(|_| {
        QRBuilder::new(data.as_bytes()).version(version).ec_level(ecl).build().unwrap();
    });
    println!(
        "Version {:>2} {:?}: Avg build {:>6}us",
        *version,
        ecl,
        start.elapsed().as_micros() / RUNS as u128
    );
}

fn main() {
    println!("🚀 Running qartism Benchmark Suite");
    println!("==================================\n");

    let total_start = Instant::now();

    println!("✨ Constrained solving...");
    println!("-------------------------");
    for (v, ecl) in [(2, ECLevel::L), (6, ECLevel::L), (10, ECLevel::M), (20, ECLevel::Q)] {
        benchmark_magic(v, ecl);
    }

    println!("\n🧱 Plain building...");
    println!("--------------------");
    for (v, ecl) in [(5, ECLevel::L), (10, ECLevel::M), (20, ECLevel::Q), (40, ECLevel::H)] {
        benchmark_builder(v, ecl);
    }

    println!("\n✅ All benchmarks completed!");
    println!("Total time elapsed: {:?}", total_start.elapsed());
}
