//! The claim server's entrypoint file.

use std::sync::Arc;
use std::time::Duration;

use cactus_claims::args::{self, Args};
use cactus_claims::config::Settings;
use cactus_claims::consts::messages;
use cactus_claims::player::UserCache;
use cactus_claims::{commands, fs_manager, logging, DataManager};
use log::{error, info, warn};

#[tokio::main]
async fn main() {
    let args = args::init();

    // This must executes as early as possible
    logging::init(args.log_level);
    info!("{}", *messages::SERVER_STARTING);

    let manager = match init(&args) {
        Ok(Some(manager)) => manager,
        Ok(None) => gracefully_exit(ExitCode::Success),
        Err(e) => {
            error!("Failed to start the server, error in initialization: {e}. \nExiting...");
            gracefully_exit(ExitCode::Failure);
        }
    };

    if let Err(e) = init_ctrlc_handler(Arc::clone(&manager)) {
        error!("Failed to install the Ctrl+C handler: {e}. \nExiting...");
        gracefully_exit(ExitCode::Failure);
    }

    start(Arc::clone(&manager)).await;

    match manager.shutdown() {
        Ok(()) => gracefully_exit(ExitCode::Success),
        Err(e) => {
            error!("Failed to save claims on shutdown: {e}");
            gracefully_exit(ExitCode::Failure);
        }
    }
}

/// Makes sure the settings and the data directory exist, then loads every claim. Returns
/// `None` when there is nothing left to do.
fn init(args: &Args) -> Result<Option<Arc<DataManager>>, Box<dyn std::error::Error>> {
    greet();

    fs_manager::init(&args.config)?;
    let settings = Settings::load(&args.config)?;

    if args.clean {
        fs_manager::clean_files(&settings)?;
        return Ok(None);
    }
    fs_manager::create_dirs(&settings)?;

    let users = UserCache::load(&args.usercache)?;
    info!("Loaded {} cached player name(s)", users.len());

    let manager = DataManager::load(settings).with_resolver(Arc::new(users));
    Ok(Some(Arc::new(manager)))
}

/// Serves console commands until `stop`, saving in the background.
async fn start(manager: Arc<DataManager>) {
    info!("{}", *messages::SERVER_STARTED);

    let period = manager.settings().autosave_seconds;
    if period > 0 {
        let autosave = Arc::clone(&manager);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(period));
            // The first tick completes immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                let manager = Arc::clone(&autosave);
                match tokio::task::spawn_blocking(move || manager.save()).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => warn!("Autosave failed: {e}"),
                    Err(e) => warn!("Autosave task failed: {e}"),
                }
            }
        });
    }

    commands::command_line::handle_input(manager).await;
}

/// Saves everything when the user executes CTRL + C.
fn init_ctrlc_handler(manager: Arc<DataManager>) -> Result<(), Box<dyn std::error::Error>> {
    ctrlc::set_handler(move || {
        info!("Received Ctrl+C, shutting down...");
        if let Err(e) = manager.shutdown() {
            error!("Failed to save claims: {e}");
        }
        gracefully_exit(ExitCode::CtrlC);
    })?;

    Ok(())
}

/// Prints the starting greetings
fn greet() {
    info!("{}", *messages::GREET);
}

/// Enum representing standardized server exit codes.
pub enum ExitCode {
    Success,
    Failure,
    CtrlC,
}

/// Gracefully exits the server with an exit code.
pub fn gracefully_exit(exit_code: ExitCode) -> ! {
    let numerical_exit_code: i32 = match exit_code {
        ExitCode::Success => {
            info!("{}", *messages::SERVER_SHUTDOWN_SUCCESS);
            0
        }
        ExitCode::Failure => {
            warn!("{}", *messages::SERVER_SHUTDOWN_ERROR);
            1
        }
        ExitCode::CtrlC => {
            info!("{}", *messages::SERVER_SHUTDOWN_CTRL_C);
            // 130 mean script terminated by Ctrl+C
            130
        }
    };

    std::process::exit(numerical_exit_code);
}
