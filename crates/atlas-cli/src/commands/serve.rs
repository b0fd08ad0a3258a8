//! Serve command - run the HTTP API.

use super::{runtime, AppContext};
use anyhow::{Context, Result};
use atlas_rag::QueryEngine;
use atlas_server::AppState;
use colored::Colorize;
use std::path::Path;

pub fn run(config_path: Option<&Path>, host: Option<String>, port: Option<u16>) -> Result<()> {
    let mut ctx = AppContext::load(config_path)?;
    if let Some(host) = host {
        ctx.config.server.host = host;
    }
    if let Some(port) = port {
        ctx.config.server.port = port;
    }

    let db = ctx.database()?;
    let engine = QueryEngine::from_config(&ctx.config, db).context("Failed to set up the query engine")?;

    println!(
        "{} http://{}:{}",
        "Serving Atlas API on".cyan().bold(),
        ctx.config.server.host,
        ctx.config.server.port
    );

    let state = AppState::new(engine, ctx.config);
    let rt = runtime()?;
    rt.block_on(atlas_server::serve(state))?;

    Ok(())
}
