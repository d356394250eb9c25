use simulation::crash_and_recover;
use tracing_subscriber::EnvFilter;
pub mod simulation;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_target(false)
        .init();

    let rt = tokio::runtime::Runtime::new().unwrap();
    rt.block_on(async_main());
}

async fn async_main() {
    println!("\n\n╔════════════════════════════════════════════════════════════╗");
    println!("║            CLUSTER RECOVERY SIMULATIONS                     ║");
    println!("╚════════════════════════════════════════════════════════════╝");

    // Small cluster, one crashed member
    // Medium cluster, half of it crashed
    // Large cluster, every member crashed
    let runs = [(3, 200, 1), (8, 1000, 4), (16, 2000, 16)];

    for (members, writes, crashed) in runs {
        match crash_and_recover(members, writes, crashed).await {
            Ok(stats) => stats.print(),
            Err(e) => {
                eprintln!("Simulation failed: {}", e);
                std::process::exit(1);
            }
        }
    }

    println!("\n✓ All recovery simulations completed successfully!");
}
