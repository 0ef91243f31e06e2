//! Target a callable through a custom domain or the local emulator.
//! Set `FUNCTIONS_ORIGIN` to a custom domain, or `FUNCTIONS_EMULATOR_PORT` to use the emulator.

use firebase_functions_rs::app::{initialize_app, FirebaseAppSettings, FirebaseOptions};
use firebase_functions_rs::functions::{connect_functions_emulator, get_functions, FunctionsError};
use tokio_util::sync::CancellationToken;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let app = initialize_app(
        FirebaseOptions {
            project_id: Some("my-project".into()),
            ..Default::default()
        },
        Some(FirebaseAppSettings::default()),
    )
    .await?;

    // An identifier that parses as a URL selects a custom domain, anything else a region.
    let origin = std::env::var("FUNCTIONS_ORIGIN").ok();
    let functions = get_functions(Some(app), origin.as_deref()).await?;

    if let Ok(port) = std::env::var("FUNCTIONS_EMULATOR_PORT") {
        connect_functions_emulator(&functions, "127.0.0.1", port.parse()?);
    }

    let ping = functions.https_callable("ping")?;
    println!("Calling {}", ping.url()?);

    let token = CancellationToken::new();
    let watchdog = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
        watchdog.cancel();
    });

    match ping.call_with_cancellation("custom-domain", &token).await {
        Ok(response) => println!("Callable response: {}", response.data()),
        Err(FunctionsError::Cancelled { .. }) => println!("Gave up after 5 seconds"),
        Err(err) => println!("Callable failed with {}: {}", err.code_str(), err.message()),
    }

    Ok(())
}
