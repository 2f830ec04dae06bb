//! Human-readable text output

use crate::config::Config;
use crate::stats::RenderSummary;
use crate::util::time::{format_count, format_duration, format_pixel_rate, rate_per_sec};
use std::path::Path;

const RULE: &str = "═══════════════════════════════════════════════════════════";

/// Print the effective configuration before a run
pub fn print_configuration(config: &Config, mode: &str) {
    println!("Configuration ({} mode):", mode);
    println!("  Image:");
    println!("    Size: {}", config.image);
    println!("    Window: {}", config.window);
    println!("  Render:");
    println!("    Max iteration: {}", config.render.max_iteration);
    println!("    Bailout: {}", config.render.bailout);
    println!(
        "    Color depth: {} ({} gradient)",
        config.render.color_depth, config.render.gradient
    );
    println!("  Workers:");
    println!("    Units: {}", config.workers.count);
    match config.workers.threads {
        Some(threads) => println!("    Threads per unit: {}", threads),
        None => println!("    Threads per unit: auto"),
    }
    println!("  Output:");
    println!("    Image: {}", config.output.path.display());
    if let Some(ref json) = config.output.json_output {
        println!("    JSON report: {}", json.display());
    }
}

/// Print run results to console
pub fn print_results(summary: &RenderSummary, image_path: &Path) {
    println!("{}", RULE);
    println!("                    RENDER RESULTS");
    println!("{}", RULE);
    println!();
    print!("{}", format_results(summary));
    println!();
    println!("Image written to {}", image_path.display());
    println!("{}", RULE);
}

/// Totals plus the per-band table
pub fn format_results(summary: &RenderSummary) -> String {
    let wall = summary.wall_time();
    let mut out = String::new();

    out.push_str(&format!("Elapsed Time: {}\n", format_duration(wall)));
    out.push_str(&format!(
        "Pixels:       {} ({})\n",
        format_count(summary.total_pixels),
        format_pixel_rate(rate_per_sec(summary.total_pixels, wall))
    ));
    out.push_str(&format!(
        "Interior:     {} ({:.2}%)\n",
        format_count(summary.interior_pixels),
        summary.interior_fraction() * 100.0
    ));
    out.push_str(&format!(
        "Iterations:   {}\n",
        format_count(summary.total_iterations)
    ));
    out.push('\n');

    out.push_str("Bands:\n");
    out.push_str("  Worker  Rows             Time        Iterations\n");
    for band in &summary.bands {
        out.push_str(&format!(
            "  {:>6}  {:<15}  {:>10}  {:>16}\n",
            band.worker_id,
            format!("{}..{}", band.start_row, band.start_row + band.row_count),
            format_duration(band.elapsed()),
            format_count(band.total_iterations)
        ));
    }
    if let Some(slowest) = summary.slowest_band() {
        out.push_str(&format!(
            "  Slowest: worker {} (imbalance {:.2}x)\n",
            slowest.worker_id,
            summary.imbalance()
        ));
    }

    out
}
