use clap::Parser;
use sensor_routes::{
    config::DataConfig, predictions::time_grid::parse_time, route_service::RouteService,
    utility::init_tracing,
};

/// Prints the half-hour congestion of every sensor
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(flatten)]
    data: DataConfig,

    /// Prediction model, e.g. xgboost
    #[arg(short, long)]
    model: String,

    /// Time of day as HH:MM:SS
    #[arg(short, long)]
    time: String,

    /// Prediction date, defaults to the configured date
    #[arg(long)]
    date: Option<String>,
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();

    let service = RouteService::from_config(&args.data)?;
    let time = parse_time("time", &args.time)?;
    let snapshot = service.snapshot(&args.model, args.date.as_deref(), time)?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);

    Ok(())
}
