use std::fmt;

use actix_web::{
    error::InternalError,
    http::StatusCode,
    web::{self, JsonConfig, QueryConfig},
    App, HttpResponse, HttpServer, ResponseError,
};
use clap::Parser;
use sensor_routes::{
    config::DataConfig,
    error::{ErrorBody, ErrorKind, TrafficError},
    graphs::SensorId,
    predictions::time_grid::parse_time,
    route_service::{RouteRequest, RouteService},
    utility::init_tracing,
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

/// HTTP API for route comparison and prediction lookups
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(flatten)]
    data: DataConfig,

    /// Address to listen on
    #[arg(long, env = "SENSOR_ROUTES_BIND", default_value = "127.0.0.1:8080")]
    bind: String,
}

#[derive(Debug)]
struct ApiError(TrafficError);

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self.0.kind() {
            ErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::StaleData => StatusCode::CONFLICT,
            ErrorKind::GraphLoad | ErrorKind::InvalidData | ErrorKind::Io => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody::from(&self.0))
    }
}

fn malformed_request(message: String) -> actix_web::Error {
    let body = ErrorBody {
        kind: ErrorKind::Validation,
        message,
        field: None,
    };
    InternalError::from_response("malformed request", HttpResponse::UnprocessableEntity().json(body)).into()
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();

    let service = RouteService::from_config(&args.data)?;
    info!("serving {} sensors on {}", service.graph().sensors().len(), args.bind);

    let service = web::Data::new(service);
    let json_config = JsonConfig::default().error_handler(|err, _req| malformed_request(err.to_string()));
    let query_config = QueryConfig::default().error_handler(|err, _req| malformed_request(err.to_string()));

    HttpServer::new(move || {
        App::new()
            .app_data(service.clone())
            .app_data(json_config.clone())
            .app_data(query_config.clone())
            .service(
                web::scope("/api/v1")
                    .route("/routes/optimize", web::post().to(optimize))
                    .route("/routes/nearest-detectors", web::post().to(nearest_detectors))
                    .route("/routes/graph-stats", web::get().to(graph_stats))
                    .route("/detectors/traffic", web::get().to(detector_traffic))
                    .route("/predictions", web::get().to(prediction))
                    .route("/predictions/available", web::get().to(available))
                    .route("/predictions/detectors", web::get().to(prediction_detectors))
                    .route("/predictions/range", web::get().to(prediction_range))
                    .route("/predictions/compare", web::get().to(compare_models))
                    .route("/predictions/clear-cache", web::post().to(clear_cache))
                    .route("/health", web::get().to(health)),
            )
    })
    .bind(args.bind.as_str())?
    .run()
    .await?;

    Ok(())
}

async fn optimize(
    service: web::Data<RouteService>,
    request: web::Json<RouteRequest>,
) -> actix_web::Result<HttpResponse> {
    let request = request.into_inner();
    let comparison = web::block(move || service.compare_routes(&request))
        .await?
        .map_err(ApiError)?;
    Ok(HttpResponse::Ok().json(comparison))
}

#[derive(Deserialize)]
struct NearestRequest {
    lat: f64,
    lon: f64,
    #[serde(default = "default_k")]
    k: usize,
}

fn default_k() -> usize {
    5
}

async fn nearest_detectors(
    service: web::Data<RouteService>,
    request: web::Json<NearestRequest>,
) -> actix_web::Result<HttpResponse> {
    let detectors = service
        .nearest_detectors(request.lat, request.lon, request.k)
        .map_err(ApiError)?;
    Ok(HttpResponse::Ok().json(json!({
        "query_point": { "lat": request.lat, "lon": request.lon },
        "detectors": detectors,
    })))
}

async fn graph_stats(service: web::Data<RouteService>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "graph": service.graph_stats(),
        "available_models": service.store().available_models(),
    }))
}

#[derive(Deserialize)]
struct SnapshotQuery {
    model: String,
    time: String,
    date: Option<String>,
}

async fn detector_traffic(
    service: web::Data<RouteService>,
    query: web::Query<SnapshotQuery>,
) -> actix_web::Result<HttpResponse> {
    let query = query.into_inner();
    let snapshot = web::block(move || {
        let time = parse_time("time", &query.time)?;
        service.snapshot(&query.model, query.date.as_deref(), time)
    })
    .await?
    .map_err(ApiError)?;
    Ok(HttpResponse::Ok().json(snapshot))
}

#[derive(Deserialize)]
struct PredictionQuery {
    detector_id: SensorId,
    model: String,
    date: Option<String>,
    time: String,
}

async fn prediction(
    service: web::Data<RouteService>,
    query: web::Query<PredictionQuery>,
) -> actix_web::Result<HttpResponse> {
    let query = query.into_inner();
    let record = web::block(move || {
        let time = parse_time("time", &query.time)?;
        service.prediction(query.detector_id, &query.model, query.date.as_deref(), time)
    })
    .await?
    .map_err(ApiError)?;
    Ok(HttpResponse::Ok().json(record))
}

async fn available(service: web::Data<RouteService>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "models": service.store().available_models(),
        "dates": service.store().available_dates(),
        "default_date": service.default_date(),
    }))
}

#[derive(Deserialize)]
struct TableQuery {
    model: String,
    date: Option<String>,
}

async fn prediction_detectors(
    service: web::Data<RouteService>,
    query: web::Query<TableQuery>,
) -> actix_web::Result<HttpResponse> {
    let query = query.into_inner();
    let date = query.date.unwrap_or_else(|| service.default_date().to_string());
    let detectors = web::block({
        let service = service.clone();
        let (model, date) = (query.model.clone(), date.clone());
        move || service.store().sensors(&model, &date)
    })
    .await?
    .map_err(ApiError)?;
    Ok(HttpResponse::Ok().json(json!({
        "model": query.model,
        "date": date,
        "count": detectors.len(),
        "detectors": detectors,
    })))
}

#[derive(Deserialize)]
struct RangeQuery {
    detector_id: SensorId,
    model: String,
    date: Option<String>,
    start_time: Option<String>,
    end_time: Option<String>,
}

async fn prediction_range(
    service: web::Data<RouteService>,
    query: web::Query<RangeQuery>,
) -> actix_web::Result<HttpResponse> {
    let query = query.into_inner();
    let records = web::block(move || {
        let start = query
            .start_time
            .as_deref()
            .map(|time| parse_time("start_time", time))
            .transpose()?;
        let end = query
            .end_time
            .as_deref()
            .map(|time| parse_time("end_time", time))
            .transpose()?;
        let date = query.date.unwrap_or_else(|| service.default_date().to_string());
        service
            .store()
            .get_range(query.detector_id, &query.model, &date, start, end)
    })
    .await?
    .map_err(ApiError)?;
    Ok(HttpResponse::Ok().json(records))
}

#[derive(Deserialize)]
struct CompareQuery {
    detector_id: SensorId,
    date: Option<String>,
    time: String,
    /// Comma separated model names.
    models: String,
}

async fn compare_models(
    service: web::Data<RouteService>,
    query: web::Query<CompareQuery>,
) -> actix_web::Result<HttpResponse> {
    let query = query.into_inner();
    let comparison = web::block(move || {
        let time = parse_time("time", &query.time)?;
        let models: Vec<String> = query
            .models
            .split(',')
            .map(str::trim)
            .filter(|model| !model.is_empty())
            .map(str::to_string)
            .collect();
        let date = query.date.unwrap_or_else(|| service.default_date().to_string());
        service.store().compare(query.detector_id, &date, time, &models)
    })
    .await?
    .map_err(ApiError)?;
    Ok(HttpResponse::Ok().json(comparison))
}

async fn clear_cache(service: web::Data<RouteService>) -> actix_web::Result<HttpResponse> {
    let service = service.clone();
    web::block(move || service.store().clear_cache()).await?;
    Ok(HttpResponse::Ok().json(json!({ "cleared": true })))
}

async fn health(service: web::Data<RouteService>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "detectors": service.graph().sensors().len(),
        "cached_tables": service.store().cached_entries(),
        "table_loads": service.store().load_count(),
    }))
}
