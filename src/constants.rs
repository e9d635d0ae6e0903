/// Defaults and well-known names shared across the pipeline stages

// Lookup service
pub const POKEAPI_BASE_URL: &str = "https://pokeapi.co/api/v2/pokemon";
pub const DEFAULT_LOOKUP_DELAY_MS: u64 = 200;
pub const DEFAULT_LOOKUP_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_USER_AGENT: &str = concat!("pokemon_etl/", env!("CARGO_PKG_VERSION"));

// Source file
pub const DEFAULT_SOURCE_PATH: &str = "data/pokemon.csv";
pub const DEFAULT_SOURCE_ENCODING: &str = "utf-16";
pub const DEFAULT_SOURCE_DELIMITER: char = '\t';

// Reader retry: 3 retries, 10s apart
pub const DEFAULT_READ_RETRIES: u32 = 3;
pub const DEFAULT_READ_RETRY_DELAY_SECS: u64 = 10;

// Destination
pub const DEFAULT_SQLITE_PATH: &str = "data/pokemon.db";
pub const DEFAULT_TABLE_PREFIX: &str = "pokemon";
pub const DEFAULT_RECORD_COUNT: usize = 898;

// Column names
pub const NAME_COLUMN: &str = "name";
pub const ALTERNATE_NAME_COLUMN: &str = "english_name";
pub const CAPTURE_RATE_COLUMN: &str = "capture_rate";
pub const SPRITE_URL_COLUMN: &str = "sprite_url";

// Stage names used in logs and retry messages
pub const STAGE_READ: &str = "read";
pub const STAGE_ENRICH: &str = "enrich";
pub const STAGE_CLEAN: &str = "clean";
pub const STAGE_SINK: &str = "sink";
