use std::sync::Arc;

use clap::Parser;
use lib::config::SimulationConfig;
use lib::driver::{demo_process_specs, SimulationDriver};
use lib::error::SimResult;
use lib::observer::{LogObserver, SimulationObserver};
use lib::output_log::create_scheduler_log_yaml_file;
use lib::process::ProcessSet;
use log::{error, info};

/// Application description and arguments definition using clap crate
#[derive(Parser)]
#[clap(
    name = "proc_mem_sim",
    version = "v1.0.0",
    about = "About:
    Admits processes by best-fit memory allocation and runs each admitted
    process to completion on a fixed pool of concurrent workers.
    Without a process file the built-in five-process demo is run."
)]
struct AppArg {
    ///Path to a process set yaml file.
    #[clap(short = 'f', long = "process_file_path", required = false)]
    process_file_path: Option<String>,
    ///Path to a simulation config yaml file.
    #[clap(short = 'g', long = "config_file_path", required = false)]
    config_file_path: Option<String>,
    ///Number of workers, overrides the config file.
    #[clap(short = 'w', long = "number_of_workers", required = false)]
    number_of_workers: Option<usize>,
    ///Milliseconds per tick, overrides the config file.
    #[clap(short = 't', long = "tick_millis", required = false)]
    tick_millis: Option<u64>,
    ///Path to output directory.
    #[clap(short = 'o', long = "output_dir_path", default_value = "../outputs")]
    output_dir_path: String,
}

fn run(arg: AppArg) -> SimResult<()> {
    let mut config = match &arg.config_file_path {
        Some(config_file_path) => SimulationConfig::from_yaml_file(config_file_path)?,
        None => SimulationConfig::default(),
    };
    if let Some(number_of_workers) = arg.number_of_workers {
        config.number_of_workers = number_of_workers;
    }
    if let Some(tick_millis) = arg.tick_millis {
        config.tick_millis = tick_millis;
    }

    let process_specs = match &arg.process_file_path {
        Some(process_file_path) => ProcessSet::from_yaml_file(process_file_path)?.processes,
        None => demo_process_specs(),
    };

    let observer: Arc<dyn SimulationObserver> = Arc::new(LogObserver);
    let mut driver = SimulationDriver::new(config, observer)?;
    let simulation_log = driver.run_batch(&process_specs);

    let file_path = create_scheduler_log_yaml_file(&arg.output_dir_path, "concurrent_worker_pool");
    simulation_log.dump_log_to_yaml(&file_path);
    info!(
        "{} of {} processes terminated ({:?}), log written to {}",
        simulation_log.terminated_count(),
        process_specs.len(),
        simulation_log.drain_result,
        file_path
    );
    Ok(())
}

/// Application main function
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let arg: AppArg = AppArg::parse();
    if let Err(err) = run(arg) {
        error!("{}", err);
        std::process::exit(1);
    }
}
