use serde::Deserialize;
use std::env;
use std::path::PathBuf;

pub const DEFAULT_DB_PATH: &str = "data/lotto6.db";
pub const DEFAULT_IMPORT_DIR: &str = "./json_data";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database_url: String,
    pub import_dir: PathBuf,
}

pub fn load() -> Config {
    let database_url =
        env::var("LOTTO6_DB_PATH").unwrap_or_else(|_| DEFAULT_DB_PATH.to_string());
    let import_dir = env::var("LOTTO6_IMPORT_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_IMPORT_DIR));

    Config {
        database_url,
        import_dir,
    }
}
