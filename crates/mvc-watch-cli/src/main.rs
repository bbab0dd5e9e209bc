use std::process;
use std::str::FromStr;
use std::time::Duration;

use chrono::Utc;
use clap::{Parser, ValueEnum};
use log::LevelFilter;
use mvc_watch::cache::{MemoryCache, MessageCache, RedisCache};
use mvc_watch::config::{load_credentials, load_settings};
use mvc_watch::job::run_once;
use mvc_watch::notifier::{Notifier, StdoutNotifier, TelegramNotifier};
use mvc_watch::scraper::WebScraper;
use mvc_watch::types::AppointmentType;

#[derive(Parser)]
#[command(name = "mvc-watch")]
#[command(
    about = "Check the NJ MVC portal once and notify when a desired appointment slot opens",
    long_about = None
)]
struct Cli {
    #[arg(
        short = 'l',
        long = "log-level",
        value_enum,
        default_value = "info",
        help = "Set the logging level"
    )]
    log_level: LogLevel,

    #[arg(
        short = 't',
        long = "appointment-type",
        default_value = "real-id",
        value_parser = parse_appointment_type,
        help = "Appointment type to query"
    )]
    appointment_type: AppointmentType,

    #[arg(
        long,
        help = "Print the message instead of sending it; uses an in-memory cache and needs no credentials"
    )]
    dry_run: bool,
}

#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

fn parse_appointment_type(s: &str) -> Result<AppointmentType, String> {
    AppointmentType::from_str(s).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level.clone().into())
        .init();

    let settings = load_settings().unwrap_or_else(|e| {
        log::error!("Invalid configuration: {}", e);
        process::exit(1);
    });

    let scraper = WebScraper::with_base_url(
        &settings.base_url,
        Duration::from_secs(settings.request_timeout_secs),
    )
    .unwrap_or_else(|e| {
        log::error!("Error creating scraper: {}", e);
        process::exit(1);
    });

    let (mut cache, notifier): (Box<dyn MessageCache>, Box<dyn Notifier>) = if cli.dry_run {
        log::warn!("Dry run: nothing will be sent or persisted");
        (Box::new(MemoryCache::new()), Box::new(StdoutNotifier))
    } else {
        let credentials = load_credentials().unwrap_or_else(|e| {
            log::error!("Invalid configuration: {}", e);
            process::exit(1);
        });

        let notifier = TelegramNotifier::new(
            &credentials.telegram_bot_token,
            &credentials.telegram_user_id,
        )
        .unwrap_or_else(|e| {
            log::error!("Error creating notifier: {}", e);
            process::exit(1);
        });

        let cache = RedisCache::new(&credentials.redis_url).unwrap_or_else(|e| {
            log::error!("Invalid cache URL: {}", e);
            process::exit(1);
        });

        (Box::new(cache), Box::new(notifier))
    };

    let result = run_once(
        &settings,
        cli.appointment_type,
        &scraper,
        &mut *cache,
        &*notifier,
        Utc::now(),
    )
    .await;

    cache.close().await;

    if let Err(e) = result {
        log::error!("{}: {}", e.kind(), e);
        process::exit(1);
    }
}
