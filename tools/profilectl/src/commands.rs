//! Command implementations

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use colored::*;
use powercalc_config::load_config_from_file;
use powercalc_profile::{
    DeviceIdentity, LibraryContext, PowerProfile, ProfileLibrary, VariableMapping,
};
use serde_json::{json, Map, Value};
use tracing::debug;

fn open_library(context: &LibraryContext) -> Result<Arc<ProfileLibrary>> {
    debug!("Opening profile library at {}", context.profile_dir().display());
    ProfileLibrary::factory(context).context("Failed to open profile library")
}

pub async fn manufacturers(context: &LibraryContext) -> Result<()> {
    let library = open_library(context)?;
    let manufacturers = library.manufacturers().await?;

    if manufacturers.is_empty() {
        println!("{}", "No manufacturers found".yellow());
        return Ok(());
    }
    for manufacturer in &manufacturers {
        println!("{}", manufacturer);
    }
    println!("\n{} manufacturers", manufacturers.len().to_string().bright_cyan());
    Ok(())
}

pub async fn models(
    context: &LibraryContext,
    manufacturer: &str,
    search: Option<&str>,
) -> Result<()> {
    let library = open_library(context)?;
    let models = match search {
        Some(search) => library.find_models(manufacturer, search).await?,
        None => library.models(manufacturer).await?,
    };

    if models.is_empty() {
        println!("{} {}", "No models found for".yellow(), manufacturer);
        return Ok(());
    }
    for model in &models {
        println!("{}", model);
    }
    println!("\n{} models", models.len().to_string().bright_cyan());
    Ok(())
}

pub async fn show(
    context: &LibraryContext,
    manufacturer: &str,
    model: &str,
    variables: &VariableMapping,
    as_json: bool,
) -> Result<()> {
    let library = open_library(context)?;
    let identity = DeviceIdentity::new(manufacturer, model)?;
    let profile = library.create_power_profile(&identity, variables).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&profile_json(&profile))?);
        return Ok(());
    }

    let schema = &profile.schema;
    println!("{} {}", "Profile".bright_cyan(), identity.to_string().bold());
    println!("  Name:        {}", schema.name());
    println!("  Strategy:    {}", schema.calculation_strategy());
    println!("  Device type: {}", schema.device_type());
    if let Some(standby) = schema.standby_power() {
        println!("  Standby:     {} W", standby);
    }
    if !schema.aliases().is_empty() {
        println!("  Aliases:     {}", schema.aliases().join(", "));
    }
    if schema.has_custom_fields() {
        println!("  Custom fields:");
        for field in schema.fields() {
            let bound = variables.get(&field.key).map(String::as_str).unwrap_or("-");
            println!(
                "    {} ({}, {} selector) = {}",
                field.key.bold(),
                field.name,
                field.selector.kind(),
                bound.green()
            );
        }
    }
    Ok(())
}

pub async fn validate(
    context: &LibraryContext,
    manufacturer: &str,
    model: &str,
    variables: &VariableMapping,
) -> Result<()> {
    let library = open_library(context)?;
    let identity = DeviceIdentity::new(manufacturer, model)?;
    let schema = library.get_profile(&identity).await?;

    match library.validate_variables(schema.raw(), variables) {
        Ok(()) => {
            println!("{} {}", "OK".green(), identity);
            Ok(())
        },
        Err(e) => {
            println!("{} {}: {}", "FAIL".red(), identity, e);
            bail!("variables do not match the profile's custom fields")
        },
    }
}

pub async fn check(config_file: &Path) -> Result<()> {
    let config = load_config_from_file(config_file)
        .with_context(|| format!("Failed to load {}", config_file.display()))?;
    let sensors = config.validate()?;

    let base = config_file.parent().unwrap_or_else(|| Path::new("."));
    let library = open_library(&config.library.to_context(base))?;

    let mut failures = 0usize;
    for sensor in &sensors {
        print!("  {:<40} ", sensor.entity_id);
        let Some(identity) = &sensor.identity else {
            println!("{}", "OK (no profile)".green());
            continue;
        };
        match library.create_power_profile(identity, &sensor.variables).await {
            Ok(profile) => println!(
                "{} {} ({})",
                "OK".green(),
                identity,
                profile.schema.calculation_strategy()
            ),
            Err(e) => {
                failures += 1;
                println!("{} {}", "FAIL".red(), e);
            },
        }
    }

    if failures > 0 {
        bail!("{} of {} sensors failed", failures, sensors.len());
    }
    println!("\n{} sensors checked", sensors.len().to_string().bright_cyan());
    Ok(())
}

fn profile_json(profile: &PowerProfile) -> Value {
    let schema = &profile.schema;
    let fields: Vec<Value> = schema
        .fields()
        .iter()
        .map(|field| {
            let mut selector = Map::new();
            selector.insert(
                field.selector.kind().to_string(),
                Value::Object(field.selector.options().clone()),
            );
            json!({
                "key": field.key,
                "name": field.name,
                "description": field.description,
                "selector": selector,
            })
        })
        .collect();

    json!({
        "manufacturer": profile.identity.manufacturer(),
        "model": profile.identity.model(),
        "name": schema.name(),
        "calculation_strategy": schema.calculation_strategy().as_str(),
        "device_type": schema.device_type(),
        "standby_power": schema.standby_power(),
        "fields": fields,
        "variables": profile.variables,
        "config": profile.config,
    })
}
