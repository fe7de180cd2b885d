use std::env;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use sheets_api::client::{HttpSheetsClient, SheetsCreds};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::format;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, registry, EnvFilter};

pub fn init_from_env() -> Result<InitFromEnv> {
    let _ = dotenv();

    let creds =
        SheetsCreds::new(env::var("SHEETS_API_KEY").context("SHEETS_API_KEY must be set")?);

    let sheets = match env::var("SHEETS_BASE_URL") {
        Ok(base_url) => HttpSheetsClient::with_base_url(base_url, creds),
        Err(_) => HttpSheetsClient::new(creds),
    }?;

    Ok(InitFromEnv { sheets })
}

pub struct InitFromEnv {
    pub sheets: HttpSheetsClient,
}

pub fn db_url_from_env() -> Result<String> {
    env::var("DATABASE_URL").context("DATABASE_URL must be set")
}

pub fn init_tracing() {
    registry()
        .with(fmt::layer().event_format(format().pretty()))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env()
                .unwrap(),
        )
        .init();
}
