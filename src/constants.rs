//! Column names and defaults shared by the loader, the exporters and the CLI.

// Voter table columns
pub const VOTER_ID_COLUMN: &str = "Voter_ID";
pub const NAME_COLUMN: &str = "Name";
pub const ADDRESS_COLUMN: &str = "Address";
pub const CITY_COLUMN: &str = "City";
pub const STATE_COLUMN: &str = "State";
pub const ZIP_COLUMN: &str = "ZIP";

// Census table columns
pub const TOTAL_POPULATION_COLUMN: &str = "Total_Population";

pub const VOTER_REQUIRED_COLUMNS: [&str; 6] = [
    VOTER_ID_COLUMN,
    NAME_COLUMN,
    ADDRESS_COLUMN,
    CITY_COLUMN,
    STATE_COLUMN,
    ZIP_COLUMN,
];

pub const CENSUS_REQUIRED_COLUMNS: [&str; 7] = [
    ZIP_COLUMN,
    "White",
    "Black",
    "Hispanic",
    "Asian",
    "Other",
    TOTAL_POPULATION_COLUMN,
];

/// Table name recorded in the Parquet key-value metadata.
pub const PARQUET_TABLE_NAME: &str = "VoterDemographics";

pub const DEFAULT_CSV_OUTPUT: &str = "voter_demographics.csv";
pub const DEFAULT_PARQUET_OUTPUT: &str = "voter_demographics.parquet";

// Geocoder defaults (public Nominatim instance)
pub const DEFAULT_GEOCODER_ENDPOINT: &str = "https://nominatim.openstreetmap.org/search";
pub const DEFAULT_USER_AGENT: &str = "voter_geocoder";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 10;
pub const DEFAULT_REQUESTS_PER_MIN: u64 = 60;

// Retry policy. Attempts per address never exceed the maximum.
pub const MAX_GEOCODE_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 2_000;

pub const CONFIG_PATH_ENV: &str = "VOTER_DEMOGRAPHICS_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";
