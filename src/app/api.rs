use std::sync::Arc;

use crate::app::constants::{APP_COMPONENT_NAME, DEFAULT_ENTRY_NAME};
use crate::app::errors::{AppError, AppResult};
use crate::app::logger::{self, LogCallback, LogLevel, LogOptions, LOGGER};
use crate::app::registry;
use crate::app::types::{FirebaseApp, FirebaseAppConfig, FirebaseAppSettings, FirebaseOptions};
use crate::component::types::{DynService, InstanceFactory};
use crate::component::{Component, ComponentContainer};

pub static SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

fn normalize_name(settings: &FirebaseAppSettings) -> AppResult<String> {
    let name = settings
        .name
        .clone()
        .unwrap_or_else(|| DEFAULT_ENTRY_NAME.to_string());
    if name.trim().is_empty() {
        return Err(AppError::BadAppName { app_name: name });
    }
    Ok(name)
}

fn options_are_defined(options: &FirebaseOptions) -> bool {
    options != &FirebaseOptions::default()
}

/// Creates (or returns the identical existing) app registered under the settings' name.
///
/// Re-initializing a name with different options or settings fails with
/// [`AppError::DuplicateApp`].
pub async fn initialize_app(
    options: FirebaseOptions,
    settings: Option<FirebaseAppSettings>,
) -> AppResult<FirebaseApp> {
    let settings = settings.unwrap_or_default();
    let name = normalize_name(&settings)?;
    if !options_are_defined(&options) {
        return Err(AppError::NoOptions);
    }

    let config = FirebaseAppConfig::new(
        name.clone(),
        settings.automatic_data_collection_enabled.unwrap_or(true),
    );

    let mut apps = registry::apps_guard();
    if let Some(existing) = apps.get(&name) {
        if options == existing.options() && config == existing.config() {
            return Ok(existing.clone());
        }
        return Err(AppError::DuplicateApp { app_name: name });
    }

    let container = ComponentContainer::new(name.clone());
    let app = FirebaseApp::new(options, config, container.clone());

    let app_for_factory = app.clone();
    let app_factory: InstanceFactory =
        Arc::new(move |_container, _options| Ok(Arc::new(app_for_factory.clone()) as DynService));
    let _ = container.add_component(Component::new(APP_COMPONENT_NAME, app_factory));

    let components: Vec<Component> = registry::registered_components_guard()
        .values()
        .cloned()
        .collect();
    for component in &components {
        registry::add_component(&app, component);
    }

    apps.insert(name.clone(), app.clone());
    LOGGER.debug(format!("Initialized Firebase App '{name}'"));
    Ok(app)
}

pub async fn get_app(name: Option<&str>) -> AppResult<FirebaseApp> {
    let lookup = name.unwrap_or(DEFAULT_ENTRY_NAME);
    registry::apps_guard()
        .get(lookup)
        .cloned()
        .ok_or_else(|| AppError::NoApp {
            app_name: lookup.to_string(),
        })
}

pub async fn get_apps() -> Vec<FirebaseApp> {
    registry::apps_guard().values().cloned().collect()
}

/// Removes the app from the registry, drops every service it created and marks it deleted.
///
/// Handles to the app (and services still holding one) observe [`FirebaseApp::is_deleted`].
pub async fn delete_app(app: &FirebaseApp) -> AppResult<()> {
    let name = app.name().to_string();
    let removed = registry::apps_guard().remove(&name);

    if removed.is_some() {
        let container = app.container();
        for provider in container.get_providers() {
            provider.delete();
        }
        container.detach_root_service();
        app.set_is_deleted(true);
        LOGGER.debug(format!("Deleted Firebase App '{name}'"));
    }

    Ok(())
}

pub fn on_log(callback: Option<LogCallback>, options: Option<LogOptions>) -> AppResult<()> {
    logger::set_user_log_handler(callback, options);
    Ok(())
}

pub fn set_log_level(level: LogLevel) {
    logger::set_log_level(level);
}
