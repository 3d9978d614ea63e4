use crate::ConfigCmd;
use crate::context::CliContext;
use crate::output::print_json;
use anyhow::Result;
use anywhere_core::{AppConfig, BACKEND_URL_ENV};
use serde_json::json;
use std::process::ExitCode;

pub(crate) fn run_doctor(ctx: &CliContext) -> Result<ExitCode> {
    let backend = ctx.backend()?;
    let health = backend.health();
    let payload = json!({
        "base_url": ctx.cfg.backend.base_url,
        "timeout_seconds": ctx.cfg.backend.timeout_seconds,
        "reachable": health.is_ok(),
        "message": health.as_ref().ok(),
        "error": health.as_ref().err().map(|err| format!("{err:#}")),
    });
    if ctx.json {
        print_json(&payload)?;
    } else {
        match &health {
            Ok(message) => println!("backend: {} ok ({message})", ctx.cfg.backend.base_url),
            Err(err) => println!("backend: {} unreachable ({err:#})", ctx.cfg.backend.base_url),
        }
    }
    Ok(if health.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

pub(crate) fn run_config(ctx: &CliContext, cmd: ConfigCmd) -> Result<ExitCode> {
    match cmd {
        ConfigCmd::Show => {
            if ctx.json {
                print_json(&ctx.cfg)?;
            } else {
                println!("{}", serde_json::to_string_pretty(&ctx.cfg)?);
            }
        }
        ConfigCmd::Path => {
            let user = AppConfig::user_settings_path();
            let payload = json!({
                "legacy": AppConfig::legacy_toml_path(&ctx.cwd),
                "user": user,
                "project": AppConfig::project_settings_path(&ctx.cwd),
                "project_local": AppConfig::project_local_settings_path(&ctx.cwd),
                "env": BACKEND_URL_ENV,
            });
            if ctx.json {
                print_json(&payload)?;
            } else {
                println!(
                    "legacy: {}",
                    AppConfig::legacy_toml_path(&ctx.cwd).display()
                );
                if let Some(user) = user {
                    println!("user: {}", user.display());
                }
                println!(
                    "project: {}",
                    AppConfig::project_settings_path(&ctx.cwd).display()
                );
                println!(
                    "project_local: {}",
                    AppConfig::project_local_settings_path(&ctx.cwd).display()
                );
                println!("env: {BACKEND_URL_ENV}");
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
