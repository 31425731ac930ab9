use actix_cors::Cors;
use actix_files::NamedFile;
use actix_web::{error, get, post, web, App, HttpRequest, HttpResponse, HttpServer, Result};
use regex::Regex;
use serde::Serialize;
use std::io::ErrorKind;
use std::sync::Arc;
use tokio::fs;
use tracing::{info, warn};

use crate::error::PipelineError;
use crate::format::AudioFormat;
use crate::models::ProcessRequest;
use crate::processor::Pipeline;

// Only names the allocator hands out are ever served.
const SERVED_FILE_PATTERN: &str =
    r"^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}(\.mp3|-looped\.(mp3|wav))$";

pub struct AppState {
    pipeline: Arc<Pipeline>,
    served_file: Regex,
}

impl AppState {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self {
            pipeline,
            served_file: Regex::new(SERVED_FILE_PATTERN).expect("served file pattern is valid"),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProcessResponse {
    message: String,
    format: AudioFormat,
    loops: u32,
    download_url: String,
}

fn base_url(data: &AppState, req: &HttpRequest) -> String {
    match &data.pipeline.config().public_url {
        Some(url) => url.clone(),
        None => {
            let info = req.connection_info();
            format!("{}://{}", info.scheme(), info.host())
        }
    }
}

#[post("/process-audio")]
async fn process_audio(
    data: web::Data<AppState>,
    req: HttpRequest,
    params: web::Json<ProcessRequest>,
) -> Result<HttpResponse, PipelineError> {
    let done = data.pipeline.run(params.into_inner()).await?;

    let response = ProcessResponse {
        message: format!("Successfully processed {} ({} loops)", done.format, done.loops),
        format: done.format,
        loops: done.loops,
        download_url: format!("{}/files/{}", base_url(&data, &req), done.file_name),
    };

    Ok(HttpResponse::Ok().json(response))
}

#[get("/files/{name}")]
async fn serve_file(
    data: web::Data<AppState>,
    req: HttpRequest,
    name: web::Path<String>,
) -> Result<HttpResponse> {
    let name = name.into_inner();

    if !data.served_file.is_match(&name) {
        return Ok(HttpResponse::NotFound().finish());
    }

    let path = data.pipeline.config().storage_root.join(&name);

    match NamedFile::open_async(&path).await {
        Ok(file) => Ok(file.into_response(&req)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(HttpResponse::NotFound().finish()),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "web: failed opening file");
            Err(error::ErrorInternalServerError("Failed to read file"))
        }
    }
}

/// Routes and extractor settings, shared by the server and tests.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        PipelineError::InputInvalid(format!("Invalid request body: {err}")).into()
    }))
    .service(process_audio)
    .service(serve_file);
}

fn cors() -> Cors {
    Cors::permissive()
}

pub async fn start_web_server(pipeline: Pipeline) -> std::io::Result<()> {
    let config = pipeline.config().clone();

    fs::create_dir_all(&config.storage_root).await?;

    let app_state = web::Data::new(AppState::new(Arc::new(pipeline)));

    info!(
        "Starting web server at {}:{}, storing files in {}",
        config.host,
        config.port,
        config.storage_root.display()
    );

    HttpServer::new(move || {
        App::new()
            .wrap(cors())
            .app_data(app_state.clone())
            .configure(routes)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
