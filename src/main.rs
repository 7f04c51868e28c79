use std::io;

use log::info;
use miette::{IntoDiagnostic, Result};
use weatherdata::{Menu, MeasurementStore, QueryEngine, Settings};

fn main() -> Result<()> {
    env_logger::init();

    let mut settings = Settings::load()?;
    // The first argument overrides the configured data file.
    if let Some(path) = std::env::args_os().nth(1) {
        settings.data_file = path.into();
    }

    let store = MeasurementStore::load(&settings.data_file)?;
    if let (Ok(first), Ok(last)) = (store.first_key(), store.last_key()) {
        info!("Measurements cover {} to {}", first.date(), last.date());
    }

    let engine = QueryEngine::new(&store).with_readings_per_day(settings.readings_per_day);
    Menu::new(engine)
        .run(io::stdin().lock(), io::stdout().lock())
        .into_diagnostic()?;

    Ok(())
}
