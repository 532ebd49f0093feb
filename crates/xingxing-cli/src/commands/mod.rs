pub mod config;
pub mod med;
pub mod points;
pub mod task;

use xingxing_core::{Config, HabitDb};

/// Open the database and configuration from the data directory.
pub(crate) fn open() -> Result<(HabitDb, Config), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let db = HabitDb::open()?;
    Ok((db, config))
}

pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
