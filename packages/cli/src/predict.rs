//! Single-click prediction and table listing.

use crime_predict_cli_utils::{MultiProgress, spinner};
use crime_predict_location_models::Coordinate;
use crime_predict_model::FeatureOverrides;
use crime_predict_pipeline::config::AppConfig;

/// Builds the pipeline from the environment, runs one click through it,
/// and prints the result.
///
/// # Errors
///
/// Returns an error if the coordinate is invalid, the pipeline cannot be
/// built, or the model fails. An unmapped location is not an error.
pub async fn run(
    multi: &MultiProgress,
    latitude: f64,
    longitude: f64,
    overrides: &FeatureOverrides,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let coordinate = Coordinate::new(latitude, longitude)?;
    let pipeline = AppConfig::from_env()?.build_pipeline()?;

    let bar = spinner(multi, &format!("Resolving {coordinate}..."));
    let result = pipeline.handle_click(coordinate, overrides).await;
    bar.finish_and_clear();
    let report = result?;
    log::debug!("Location outcome for {coordinate}: {:?}", report.outcome);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for line in report.lines() {
            println!("{line}");
        }
    }

    Ok(())
}

/// Prints the location code table in lookup order.
///
/// # Errors
///
/// Returns an error if the configured table file cannot be loaded.
pub fn list_codes() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;
    let table = config.load_table()?;

    println!("{} location code(s), {} matching:", table.len(), config.match_policy);
    for entry in table.entries() {
        println!("  {:<16} {}", entry.key, entry.code);
    }

    Ok(())
}
