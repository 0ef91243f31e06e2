//! Minimal Functions example invoking a callable with a structured payload.
//! Provide your Firebase project ID and deploy a callable named `helloWorld` (or adjust the name).

use firebase_functions_rs::app::{initialize_app, FirebaseAppSettings, FirebaseOptions};
use firebase_functions_rs::functions::{get_functions, CallableValue};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let app = initialize_app(
        FirebaseOptions {
            project_id: Some("your-project-id".into()),
            ..Default::default()
        },
        Some(FirebaseAppSettings::default()),
    )
    .await?;

    // Default region is us-central1.
    let functions = get_functions(Some(app), None).await?;
    let hello = functions.https_callable("helloWorld")?;

    let payload = CallableValue::map([
        ("message", CallableValue::from("Hello from Rust!")),
        ("sentAt", CallableValue::Long(1_700_000_000_000)),
    ]);
    let response = hello.invoke(Some(payload)).await?;
    println!("Callable response: {}", response.data());

    Ok(())
}
