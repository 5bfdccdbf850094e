use std::io::{self, BufRead, Write};

use clap::{Parser, Subcommand};

use disksim::config::{Policy, SimConfig};
use disksim::sim::{scenario, RunStats, Scenario, Simulator};
use disksim::trace::{ConsoleSink, NullSink};

#[derive(Parser)]
#[command(name = "disksim")]
#[command(about = "Deterministic block-I/O subsystem simulator with pluggable disk scheduling", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario
    Run {
        /// Scenario number (1-9, or 0 for the policy comparison);
        /// prompts interactively when omitted
        #[arg(short, long)]
        scenario: Option<u32>,

        /// Print final statistics as JSON
        #[arg(long)]
        json: bool,
    },
    /// Compare FIFO, LOOK and NLOOK on the same workload
    Compare,
    /// List available scenarios
    List,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Run { scenario, json }) => {
            let number = match scenario {
                Some(n) => n,
                None => prompt_scenario()?,
            };
            if number == 0 {
                compare()
            } else {
                run_scenario(number, json)
            }
        }
        Some(Commands::Compare) => compare(),
        Some(Commands::List) => {
            print_menu();
            Ok(())
        }
        None => {
            print_menu();
            let number = prompt_scenario()?;
            if number == 0 {
                compare()
            } else {
                run_scenario(number, false)
            }
        }
    }
}

fn print_menu() {
    println!("Available scenarios:");
    for sc in scenario::all() {
        println!("{}. {}", sc.number, sc.title);
    }
    println!("0. Compare FIFO, LOOK, and NLOOK in a complex situation");
    println!();
}

/// Reads a scenario choice from stdin. Anything unparsable runs the
/// default scenario 1.
fn prompt_scenario() -> anyhow::Result<u32> {
    print!("Select scenario (0-9): ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    println!();

    Ok(match line.trim().parse::<u32>() {
        Ok(n) if n <= 9 => n,
        _ => {
            println!("Invalid choice. Running default scenario...");
            1
        }
    })
}

fn run_scenario(number: u32, json: bool) -> anyhow::Result<()> {
    let Scenario {
        number,
        title,
        policy,
        config,
        processes,
    } = scenario::by_number(number);

    println!("{}", "=".repeat(70));
    println!("SCENARIO {number}: {title}");
    println!("{}", "=".repeat(70));
    println!();
    println!("Buffer cache LFU (3 segments)");
    println!("Device strategy {policy}");
    println!();

    let mut sim = Simulator::new(config, policy);
    for p in processes {
        sim.add_process(p);
    }

    let mut sink = ConsoleSink;
    let stats = sim.run(&mut sink)?;

    println!();
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        print_stats(&stats);
    }
    Ok(())
}

fn compare() -> anyhow::Result<()> {
    println!("{}", "=".repeat(70));
    println!("POLICY COMPARISON");
    println!("{}", "=".repeat(70));
    println!();

    let mut results = Vec::new();
    for policy in [Policy::Fifo, Policy::Look, Policy::Nlook] {
        print!("Testing {policy}... ");
        io::stdout().flush()?;

        let mut sim = Simulator::new(SimConfig::default(), policy);
        for p in scenario::comparison_processes() {
            sim.add_process(p);
        }
        let stats = sim.run(&mut NullSink)?;
        println!(
            "Done (Time: {} us, Seeks: {}, Seek Time: {:.2} ms)",
            stats.elapsed_us, stats.total_seeks, stats.seek_time_ms
        );
        results.push((policy, stats));
    }

    println!();
    println!(
        "{:<15} {:<20} {:<10} {:<15}",
        "Policy", "Total Time (us)", "Seeks", "Seek Time (ms)"
    );
    println!("{}", "-".repeat(70));
    for (policy, stats) in results {
        println!(
            "{:<15} {:<20} {:<10} {:<15.2}",
            policy.to_string(),
            stats.elapsed_us,
            stats.total_seeks,
            stats.seek_time_ms
        );
    }
    Ok(())
}

fn print_stats(stats: &RunStats) {
    println!("Total time:      {} us", stats.elapsed_us);
    println!("Total seeks:     {}", stats.total_seeks);
    println!("Total seek time: {:.2} ms", stats.seek_time_ms);
}
