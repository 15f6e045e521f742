//! This module is where we store constants, like file paths, storage magic numbers or the names
//! the claim system reserves.

/// Names and limits of the claim system itself.
pub mod claims {
    /// Reserved name addressing a world's global flags.
    pub const GLOBAL_REGION_NAME: &str = "__global__";
    pub const MAX_NAME_LENGTH: usize = 32;
}

/// Layout of the data directory and headers of the claim files.
pub mod storage {
    pub const WORLD_MAGIC: &[u8; 4] = b"RGN1";
    pub const PLAYER_MAGIC: &[u8; 4] = b"PLY1";
    /// Bumped whenever the payload layout changes.
    pub const FORMAT_VERSION: i32 = 1;

    pub const WORLDS_DIRECTORY: &str = "worlds";
    pub const WORLD_EXTENSION: &str = "dat";
    pub const PLAYERS_FILE: &str = "players.dat";
    pub const CORRUPT_EXTENSION: &str = "corrupt";
}

/// Server logging messages.
pub mod messages {

    use colored::*;
    use once_cell::sync::Lazy;

    pub static SERVER_STARTING: Lazy<String> = Lazy::new(|| {
        format!("Starting claim server version {}", env!("CARGO_PKG_VERSION"))
            .bold()
            .to_string()
    });

    pub static SERVER_STARTED: Lazy<String> =
        Lazy::new(|| "[ CLAIMS LOADED ]".bright_green().bold().to_string());

    pub static SERVER_SHUTDOWN_SUCCESS: Lazy<String> =
        Lazy::new(|| "[ SERVER SHUT DOWN ]".bright_red().bold().to_string());

    pub static SERVER_SHUTDOWN_ERROR: Lazy<String> = Lazy::new(|| {
        "[ SERVER SHUT DOWN WITH ERROR ]"
            .bright_red()
            .bold()
            .to_string()
    });

    pub static SERVER_SHUTDOWN_CTRL_C: Lazy<String> = Lazy::new(|| {
        "[ SERVER SHUT DOWN WITH CTRL+C ]"
            .bright_red()
            .bold()
            .to_string()
    });

    pub static GREET: Lazy<String> =
        Lazy::new(|| "Hello, world from Cactus claims!".green().bold().to_string());
}

/// Module used to store file paths relative to the server binary.
pub mod file_paths {
    /// claims.properties file, used to store claim settings.
    pub const PROPERTIES: &str = "claims.properties";
    pub const USERCACHE: &str = "usercache.json";
}

pub mod file_contents {
    use crate::time;

    /// Returns the default content of the 'claims.properties' file.
    pub fn claims_properties() -> String {
        const CLAIMS_PROPERTIES_INNER: &str = r#"starting-claim-blocks=100
min-claim-area=100
min-subdivision-area=9
min-side-length=3
lookup-scale=5
lookup-initial-capacity=64
expiration-days=60
overworld-floor=-64
world-height=320
nether-floor=0
nether-ceiling=128
data-directory=claims
autosave-seconds=300"#;

        format!(
            "# Claim settings\n# {}\n{}",
            time::get_formatted_time(),
            CLAIMS_PROPERTIES_INNER
        )
    }
}
