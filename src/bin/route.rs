use clap::Parser;
use sensor_routes::{
    config::DataConfig,
    route_service::{RouteRequest, RouteService},
    utility::init_tracing,
};

/// Compares the shortest and the fastest route between two points
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(flatten)]
    data: DataConfig,

    #[arg(long, allow_hyphen_values = true)]
    start_lat: f64,

    #[arg(long, allow_hyphen_values = true)]
    start_lon: f64,

    #[arg(long, allow_hyphen_values = true)]
    end_lat: f64,

    #[arg(long, allow_hyphen_values = true)]
    end_lon: f64,

    /// Prediction model, e.g. xgboost
    #[arg(short, long)]
    model: String,

    /// Departure time as HH:MM:SS
    #[arg(short, long, default_value = "08:00:00")]
    time: String,

    /// Prediction date, defaults to the configured date
    #[arg(long)]
    date: Option<String>,
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();

    let service = RouteService::from_config(&args.data)?;
    let request = RouteRequest {
        start_lat: args.start_lat,
        start_lon: args.start_lon,
        end_lat: args.end_lat,
        end_lon: args.end_lon,
        model: args.model,
        departure_time: args.time,
        date: args.date,
    };

    let comparison = service.compare_routes(&request)?;
    println!("{}", serde_json::to_string_pretty(&comparison)?);

    Ok(())
}
