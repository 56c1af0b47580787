use padshrink::{format_report, parse_arguments, run_profile, ALEXNET_LAYERS};
use std::time::Instant;

fn main() {
    env_logger::init();
    let start = Instant::now();

    let settings = match parse_arguments() {
        Ok(settings) => settings,
        Err(e) => e.exit(),
    };

    println!(
        "\nProfiling pad and shrink kernels, batch size: {}, padding: ({}, {})",
        settings.batch, settings.vpadding, settings.hpadding
    );

    let tuners = match run_profile(&settings, &ALEXNET_LAYERS) {
        Ok(tuners) => tuners,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    for best_of in &tuners {
        println!("\n{}", format_report(best_of));
    }
    println!("Total runtime: {:.2?}", start.elapsed());
}
