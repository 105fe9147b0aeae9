mod scripts;
mod settings;
mod simulation;
mod world_io;

use std::env;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use settings::{Settings, SETTINGS_PATH};
use simulation::Simulation;

const USAGE: &str = "Usage: voxmere_sim [--config <path>] [--load <world>] [--save <world>] [--ticks <n>] [--write-config]";

struct LaunchOptions {
    config_path: Option<PathBuf>,
    load_path: Option<PathBuf>,
    save_path: Option<PathBuf>,
    ticks: Option<u64>,
    write_config: bool,
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(filter)
        .try_init();

    let mut options = LaunchOptions {
        config_path: None,
        load_path: None,
        save_path: None,
        ticks: None,
        write_config: false,
    };

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "--load" | "--save" => {
                let Some(value) = args.next() else {
                    eprintln!("{arg} expects a path argument");
                    std::process::exit(2);
                };
                let path = Some(PathBuf::from(value));
                match arg.as_str() {
                    "--config" => options.config_path = path,
                    "--load" => options.load_path = path,
                    _ => options.save_path = path,
                }
            }
            "--ticks" => {
                let Some(value) = args.next() else {
                    eprintln!("--ticks expects a numeric argument");
                    std::process::exit(2);
                };
                match value.parse::<u64>() {
                    Ok(parsed) => options.ticks = Some(parsed),
                    Err(err) => {
                        eprintln!("invalid tick count '{value}': {err}");
                        std::process::exit(2);
                    }
                }
            }
            "--write-config" => options.write_config = true,
            "--help" | "-h" => {
                println!("{USAGE}");
                return;
            }
            other => {
                eprintln!("unknown argument: {other}");
                eprintln!("{USAGE}");
                std::process::exit(2);
            }
        }
    }

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    if let Err(err) = ctrlc::set_handler(move || {
        eprintln!("\nShutdown signal received, stopping simulation...");
        r.store(false, Ordering::SeqCst);
    }) {
        warn!("failed to set Ctrl+C handler: {err}");
    }

    if let Err(err) = run(options, running) {
        eprintln!("voxmere_sim failed: {err}");
        std::process::exit(1);
    }
}

fn run(options: LaunchOptions, running: Arc<AtomicBool>) -> io::Result<()> {
    let config_path = options
        .config_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(SETTINGS_PATH));
    let settings = if options.config_path.is_some() && !options.write_config {
        Settings::load(&config_path)?
    } else {
        Settings::load_or_default(&config_path)?
    };
    if options.write_config {
        settings.save(&config_path)?;
        info!("Wrote settings to {}", config_path.display());
        return Ok(());
    }

    let world = match &options.load_path {
        Some(path) => world_io::load_world(path, settings.mesh)?,
        None => world_io::create_world(&settings)?,
    };

    let mut sim = Simulation::new(world);
    let mut rng = settings
        .world
        .seed
        .map_or_else(fastrand::Rng::new, fastrand::Rng::with_seed);
    sim.spawn_row(
        settings.sim.spawn_x,
        settings.sim.spawn_z,
        settings.sim.creature_count,
        settings.sim.script,
        &mut rng,
    );

    let ticks = options.ticks.unwrap_or(settings.sim.ticks);
    let interval = Duration::from_millis(settings.sim.tick_interval_ms);
    info!(
        "Running {} with {} creatures",
        if ticks == 0 {
            "until interrupted".to_string()
        } else {
            format!("{ticks} ticks")
        },
        sim.creature_count()
    );

    while running.load(Ordering::SeqCst) && (ticks == 0 || sim.tick_count() < ticks) {
        let tick_start = Instant::now();
        let report = sim.tick();
        if report.alive == 0 {
            info!("All creatures died after {} ticks", report.tick);
            break;
        }

        let elapsed = tick_start.elapsed();
        if elapsed < interval {
            std::thread::sleep(interval - elapsed);
        }
    }

    let items_held: u32 = sim
        .creatures()
        .map(|(_, creature)| creature.inventory.snapshot().iter().map(|(_, n)| n).sum::<u32>())
        .sum();
    info!(
        "Stopped after {} ticks: {} creatures alive holding {} items",
        sim.tick_count(),
        sim.creature_count(),
        items_held
    );

    if let Some(path) = options.save_path.or(settings.sim.save_path) {
        world_io::save_world(sim.world(), &path, settings.sim.compression)?;
    }
    Ok(())
}
