//! Ammeter Tester - Main CLI Application
//!
//! Samples each selected ammeter, prints a statistical summary per run and
//! recommends the most precise device.

use ammeter_tester::{
    app::TestFramework,
    cli::Cli,
    config::{display_config_summary, load_config, validate_config, EnvManager},
    error::{AppError, ErrorReporter, Result},
    output::OutputFormatterFactory,
    sampling::CancelToken,
    Config, BUILD_TIME, GIT_COMMIT, PKG_NAME, TARGET_TRIPLE, VERSION,
};
use clap::Parser;
use std::process;

#[tokio::main]
async fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panic: {}", panic_info);
        process::exit(1);
    }));

    let cli = Cli::parse();

    if let Err(message) = cli.validate() {
        eprintln!("Error: {}", message);
        process::exit(2);
    }

    let reporter = ErrorReporter::new(cli.use_colors(), cli.verbose);

    if let Err(e) = run_application(cli).await {
        reporter.report_error(&e);
        process::exit(e.exit_code());
    }
}

async fn run_application(cli: Cli) -> Result<()> {
    if cli.help_env {
        print!("{}", EnvManager::display_env_help());
        return Ok(());
    }

    if cli.debug {
        eprintln!("{} v{} ({} {}, built {})", PKG_NAME, VERSION, GIT_COMMIT, TARGET_TRIPLE, BUILD_TIME);
        eprintln!("{}", cli.get_config_summary());
    }

    let config = load_config(cli.clone())?;
    colored::control::set_override(config.enable_color);

    if cli.list_devices {
        print_devices(&config);
        return Ok(());
    }

    let formatter = OutputFormatterFactory::create_formatter(config.enable_color, config.verbose);

    for warning in validate_config(&config)? {
        eprintln!("{}", warning.format(config.enable_color));
    }

    if config.debug {
        eprintln!("\nConfiguration Summary:\n{}\n", display_config_summary(&config));
    }

    let device_types = if cli.devices.is_empty() {
        config.ammeters.device_types().map(str::to_string).collect()
    } else {
        cli.devices.clone()
    };
    if device_types.is_empty() {
        return Err(AppError::config("No ammeters configured"));
    }

    let cancel = CancelToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let framework = TestFramework::new(config);
    println!("{}", formatter.format_header(&format!("Ammeter Test v{}", VERSION))?);

    let mut runs = Vec::with_capacity(device_types.len());
    for device_type in &device_types {
        let sampling = framework.config().sampling();
        println!(
            "\nSampling {} ({} samples at {} Hz)...",
            device_type, sampling.measurements_count, sampling.sampling_frequency_hz
        );

        let run = framework.run_test(device_type, &cancel).await?;
        println!("{}", formatter.format_run_summary(&run, framework.show_histogram())?);
        runs.push(run);
    }

    if runs.len() >= 2 {
        let comparison = framework.compare_devices(&runs)?;
        println!("\n{}", formatter.format_comparison(&comparison)?);
        println!("\n{}", formatter.format_recommendation(&comparison)?);
    }

    if let Some(archive) = framework.archive() {
        println!("\n{}", formatter.format_success(&format!("Results saved under {}", archive.root().display()))?);
    }

    Ok(())
}

fn print_devices(config: &Config) {
    if config.ammeters.is_empty() {
        println!("No ammeters configured.");
        return;
    }

    println!("Configured ammeters:");
    for (name, device) in config.ammeters.iter() {
        println!("  {:<12} {:<21} {}", name, device.address(), device.command);
    }
}
