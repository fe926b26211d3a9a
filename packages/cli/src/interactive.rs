//! Interactive menu shown when no subcommand is given.

use crime_predict_cli_utils::MultiProgress;
use crime_predict_model::FeatureOverrides;
use dialoguer::{Input, Select};

/// Top-level actions.
enum Action {
    Predict,
    Codes,
    Server,
}

impl Action {
    const ALL: &[Self] = &[Self::Predict, Self::Codes, Self::Server];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::Predict => "Predict for a coordinate",
            Self::Codes => "List location codes",
            Self::Server => "Start server",
        }
    }
}

/// New York City Hall; the map opens centered here.
const DEFAULT_LATITUDE: f64 = 40.7128;
const DEFAULT_LONGITUDE: f64 = -74.0060;

/// Prompts for an action and runs it.
///
/// # Errors
///
/// Returns an error if a prompt fails or the chosen action fails.
pub async fn run(multi: &MultiProgress) -> Result<(), Box<dyn std::error::Error>> {
    println!("NYC Crime Prediction");
    println!();

    let labels: Vec<&str> = Action::ALL.iter().map(Action::label).collect();

    let idx = Select::new()
        .with_prompt("What would you like to do?")
        .items(&labels)
        .default(0)
        .interact()?;

    match Action::ALL[idx] {
        Action::Predict => {
            let latitude: f64 = Input::new()
                .with_prompt("Latitude")
                .default(DEFAULT_LATITUDE)
                .interact_text()?;
            let longitude: f64 = Input::new()
                .with_prompt("Longitude")
                .default(DEFAULT_LONGITUDE)
                .interact_text()?;

            crate::predict::run(
                multi,
                latitude,
                longitude,
                &FeatureOverrides::default(),
                false,
            )
            .await?;
        }
        Action::Codes => crate::predict::list_codes()?,
        Action::Server => crate::serve_interactive().await?,
    }

    Ok(())
}
