use clap::Parser;
use log::{error, info};
use trackbridge::cli::Cli;
use trackbridge::config::ApplicationConfig;
use trackbridge::gpsd::source::{GpsdConnector, ReconnectingSource};
use trackbridge::logging::setup_logging;
use trackbridge::position::{PositionResponder, PositionStore, RenderRequest};
use trackbridge::rendezvous::{ensure_named_pipe, RendezvousWorker, DEFAULT_COOLDOWN};
use trackbridge::reporter::FixReporter;
use trackbridge::thread_manager::ThreadManager;
use trackbridge::transmitter::Transmitter;

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.logging_level);

    let application_config = match ApplicationConfig::construct_from_path(&cli.config_file) {
        Ok(config) => config,
        Err(e) => {
            error!("{e}. Exiting.");
            return std::process::ExitCode::FAILURE;
        }
    };

    match run(&cli, &application_config) {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}. Exiting.");
            std::process::ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli, config: &ApplicationConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!("Main: Application started.");

    let device_id = config.reporting.device_id()?;
    let transmitter = Transmitter::connect(&config.destination.host, config.destination.port)?;
    let position_store = PositionStore::new();

    let mut thread_manager = ThreadManager::new();

    if let Some(rendezvous) = &config.rendezvous {
        ensure_named_pipe(&rendezvous.path)?;

        let (request_sender, request_receiver): (
            crossbeam_channel::Sender<RenderRequest>,
            crossbeam_channel::Receiver<RenderRequest>,
        ) = crossbeam_channel::bounded(1);

        let (reply_sender, reply_receiver): (
            crossbeam_channel::Sender<String>,
            crossbeam_channel::Receiver<String>,
        ) = crossbeam_channel::bounded(1);

        let responder = PositionResponder::new(
            position_store.get_position_viewer(),
            request_receiver,
            reply_sender,
        );
        let worker = RendezvousWorker::new(
            rendezvous.path.clone(),
            request_sender,
            reply_receiver,
            DEFAULT_COOLDOWN,
        );

        thread_manager.add_task("position-responder", responder);
        thread_manager.add_task("rendezvous-worker", worker);
        info!(
            "Main: Serving position queries on {}.",
            rendezvous.path.display()
        );
    }

    let source = ReconnectingSource::new(
        GpsdConnector::new(config.gpsd.host.clone(), config.gpsd.port),
        config.gpsd.reconnect_delay(),
        thread_manager.shutdown_signal(),
    );
    let reporter = FixReporter::new(
        source,
        position_store,
        config.reporting.throttle_policy(),
        device_id,
        transmitter,
    );
    let reporter_task_id = thread_manager.add_task("fix-reporter", reporter);

    if let Some(duration) = cli.duration {
        std::thread::sleep(std::time::Duration::from_secs(duration));
        thread_manager.stop_all_tasks();
    }

    // Tasks blocked on the named pipe are not joined; they end with the process.
    thread_manager.wait_on_task_finish(reporter_task_id);

    info!("Main: Program finished.");
    Ok(())
}
