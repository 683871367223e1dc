use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use console::style;
use devinfo_core::device::ErrorLog;
use devinfo_core::{DeviceRecord, Enumeration, Error, Inventory, platform};
use dialoguer::{Select, theme::ColorfulTheme};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{IsTerminal, stderr};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "devinfo")]
#[command(about = "Inspect the disks and partitions attached to this machine", version)]
struct Cli {
    /// Show debug messages (RUST_LOG takes precedence)
    #[arg(short = 'D', long, global = true)]
    debug: bool,

    /// Print JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every disk and partition
    List,
    /// Show everything known about one disk or partition
    Show {
        /// The device to show, e.g. disk0 or /dev/sda1. Asks when omitted.
        device: Option<String>,
    },
    /// Look up the block size of a disk or partition
    BlockSize {
        /// The device to query, e.g. disk0 or /dev/sda1
        #[arg(required = true)]
        device: String,
    },
}

fn init_logging(debug: bool) {
    let level = if debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

/// Runs one enumeration pass behind a spinner.
fn enumerate(inventory: &mut Inventory, quiet: bool) -> Result<&Enumeration> {
    let spinner = if quiet || !stderr().is_terminal() {
        ProgressBar::hidden()
    } else {
        ProgressBar::new_spinner()
    };
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.blue} {msg}")?);
    spinner.set_message("Querying disks...");
    spinner.enable_steady_tick(Duration::from_millis(100));

    let result = inventory.refresh();
    spinner.finish_and_clear();

    match result {
        Ok(found) => {
            for problem in found.disks.check_links() {
                log::debug!("inconsistent table: {problem}");
            }
            Ok(found)
        }
        Err(Error::NoDisksFound { errors }) => {
            print_problems(&errors);
            Err(anyhow!("No disks found."))
        }
        Err(e) => Err(e.into()),
    }
}

/// Prints the soft errors of a pass, if there were any.
fn print_problems(errors: &ErrorLog) {
    if errors.is_empty() {
        return;
    }
    eprintln!();
    eprintln!(
        "{} {} problem(s) while querying disks:",
        style("WARNING:").yellow().bold(),
        errors.len()
    );
    for problem in errors.iter() {
        eprintln!("  - {}", problem.trim_end());
    }
}

/// Finds a record by path or by bare name (`disk0` for `/dev/disk0`).
fn find<'a>(found: &'a Enumeration, device: &str) -> Result<&'a DeviceRecord> {
    found
        .disks
        .get(device)
        .or_else(|| found.disks.get(&format!("/dev/{device}")))
        .ok_or_else(|| anyhow!("No disk or partition named '{device}' was found."))
}

/// Presents an interactive menu for the user to select a device.
fn select_device<'a>(found: &'a Enumeration, prompt: &str) -> Result<&'a DeviceRecord> {
    let records: Vec<&DeviceRecord> = found.disks.iter().collect();
    let items: Vec<String> = records.iter().map(|r| r.to_string()).collect();

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .items(&items)
        .default(0)
        .interact()?;

    Ok(records[selection])
}

fn print_record(record: &DeviceRecord) {
    let partitions = if record.partitions.is_empty() {
        "None".to_string()
    } else {
        record.partitions.join(", ")
    };

    let rows = [
        ("Name", record.name.clone()),
        ("Type", record.kind.to_string()),
        ("Host device", record.host_device.clone()),
        ("Partitions", partitions),
        ("Vendor", record.vendor.clone()),
        ("Product", record.product.clone()),
        ("Capacity", record.capacity.clone()),
        ("Raw capacity", record.raw_capacity.clone()),
        ("Description", record.description.clone()),
        ("Flags", record.flags.clone()),
        ("Partitioning", record.partitioning.clone()),
        ("File system", record.file_system.clone()),
        ("UUID", record.uuid.clone()),
        ("ID", record.id.clone()),
        ("Boot record", record.boot_record.clone()),
        ("Boot record strings", record.boot_record_strings.clone()),
    ];

    println!("{}", style(&record.name).cyan().bold());
    for (label, value) in rows {
        println!("  {:<20} {}", format!("{label}:"), value);
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    if !cli.json && !platform::is_elevated() {
        eprintln!(
            "{} Not running as root; some disk details may be missing.",
            style("NOTE:").yellow().bold()
        );
    }

    let mut inventory = Inventory::for_host()?;

    match cli.command {
        Commands::List => {
            let found = enumerate(&mut inventory, cli.json)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(found)?);
                return Ok(());
            }

            println!(
                "Found {} disks and partitions on {}:",
                found.disks.len(),
                platform::host_os()
            );
            println!(
                "\n  {:<16} {:<10} {:>8}  {:<30} {}",
                "DEVICE", "TYPE", "SIZE", "MODEL", "DESCRIPTION"
            );
            println!("  {:-<16} {:-<10} {:->8}  {:-<30} {:-<20}", "", "", "", "", "");
            for device in found.disks.devices() {
                println!("  {}", style(device).bold());
                for name in &device.partitions {
                    if let Some(partition) = found.disks.get(name) {
                        println!("  {partition}");
                    }
                }
            }
            print_problems(&found.errors);
        }
        Commands::Show { device } => {
            let found = enumerate(&mut inventory, cli.json)?;
            let record = match device {
                Some(device) => find(found, &device)?,
                None => select_device(found, "Select the device to show")?,
            };

            if cli.json {
                println!("{}", serde_json::to_string_pretty(record)?);
            } else {
                print_record(record);
                print_problems(&found.errors);
            }
        }
        Commands::BlockSize { device } => {
            let block_size = inventory.block_size(&device)?;
            if cli.json {
                let value = serde_json::json!({ "device": device, "block_size": block_size });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                println!(
                    "Block size of {}: {} bytes",
                    style(&device).cyan(),
                    block_size
                );
            }
        }
    }

    Ok(())
}
