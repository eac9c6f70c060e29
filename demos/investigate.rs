//! Investigation walkthrough against a running analysis engine
//!
//! Uploads a transaction CSV, prints the detected rings, opens the drawer on
//! the riskiest account and exports the result.
//!
//! Usage: cargo run --example investigate -- transactions.csv [console.toml]

use forensics_console::drawer::DrawerPhase;
use forensics_console::{logging, Console, ConsoleConfig, HttpAnalysisClient, UploadFile};
use std::path::Path;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let Some(csv_path) = args.next() else {
        eprintln!("usage: investigate <transactions.csv> [console.toml]");
        std::process::exit(2);
    };
    let config_path = args.next();

    let config = ConsoleConfig::load(config_path.as_deref().map(Path::new))?;
    logging::init(&config.log_level);

    println!("=== Forensics Console ===\n");
    println!("Engine: {}", config.api_base_url);

    let client = HttpAnalysisClient::new(config.api_base_url.clone(), config.request_timeout());
    let mut console = Console::new(Arc::new(client), config);

    // 1. Upload
    let file = UploadFile::from_path(&csv_path)?;
    println!("1. Uploading {} ({} bytes)", file.name(), file.len());
    console.submit_file(file)?;
    console.run_until_idle().await;

    if let Some(message) = console.session().error_message() {
        println!("   Analysis failed: {}", message);
        return Ok(());
    }
    let Some(analysis) = console.session().analysis() else {
        return Ok(());
    };

    let summary = analysis.summary();
    println!("   Accounts analyzed: {}", summary.total_accounts_analyzed);
    println!("   Rings detected: {}", summary.fraud_rings_detected);
    println!("   Processing time: {:.2}s", summary.processing_time_seconds);
    println!();

    // 2. Rings
    println!("2. {}", analysis.rings().badge());
    for row in analysis.rings().rows() {
        println!(
            "   {:<12} {:<10} {:>3} members  risk {:>5}  [{}]",
            row.ring_id,
            row.pattern_type,
            row.member_count,
            row.risk_display(),
            row.members_display()
        );
    }
    println!();

    // 3. Drill into the riskiest account
    let top = analysis
        .model()
        .nodes()
        .iter()
        .max_by(|a, b| a.risk.total_cmp(&b.risk))
        .map(|node| node.id.clone());

    if let Some(id) = top {
        println!("3. Investigating NODE_{}", id);
        console.select_node(&id)?;
        console.run_until_idle().await;

        let drawer = console.session().drawer();
        if let Some(context) = drawer.context() {
            println!("   Band: {}", context.band().headline());
            println!("   Risk: {:.1}", context.node.risk);
            println!(
                "   Ring: {}",
                context.node.ring_id.as_deref().unwrap_or("none")
            );
            let label = match drawer.phase() {
                DrawerPhase::Failed => "Explanation (unavailable)",
                _ => "Explanation",
            };
            println!("   {}: {}", label, context.explanation.text().unwrap_or(""));
        }
        println!();
    }

    // 4. Export
    let path = console.export()?;
    println!("4. Exported analysis to {}", path.display());

    Ok(())
}
