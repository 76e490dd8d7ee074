use std::path::PathBuf;
use std::sync::RwLock;

use actix_web::middleware::Logger;
use actix_web::{delete, get, put, web, App, HttpResponse, HttpServer, Responder};
use log::{info, warn};
use serde::Deserialize;

use ngq_core::handle::{self, ModelHandle, QUERY_FAILURE};
use ngq_core::io::{get_filename, list_files, normalize_folder, read_bytes};
use ngq_core::Config;

/// Folder holding the binary models.
const DATA_DIR: &str = "./data";

/// Extension of binary model files.
const MODEL_EXTENSION: &str = "bin";

/// Struct representing query parameters for the `/v1/load_model` endpoint
#[derive(Deserialize)]
struct LoadQuery {
	name: Option<String>,
	check_consistency: Option<bool>,
	require_sentence_markers: Option<bool>,
}

impl LoadQuery {
	fn config(&self) -> Config {
		let default = Config::default();
		Config {
			check_consistency: self.check_consistency.unwrap_or(default.check_consistency),
			require_sentence_markers: self.require_sentence_markers.unwrap_or(default.require_sentence_markers),
			..default
		}
	}

	/// Path of the requested model, refusing anything that is not a plain
	/// file name.
	fn model_path(&self) -> Result<PathBuf, String> {
		let name = match &self.name {
			Some(s) if !s.trim().is_empty() => s.trim(),
			_ => return Err("Missing or empty model name".into()),
		};
		if name.contains(['/', '\\']) || name.contains("..") {
			return Err(format!("Invalid model name '{name}'"));
		}
		Ok(normalize_folder(DATA_DIR).join(format!("{name}.{MODEL_EXTENSION}")))
	}
}

/// Struct representing query parameters for the scoring endpoints
#[derive(Deserialize)]
struct ScoreQuery {
	text: Option<String>,
	null_context: Option<bool>,
}

#[derive(Default)]
struct SharedData {
	handle: Option<ModelHandle>,
	name: Option<String>,
}

type Shared = web::Data<RwLock<SharedData>>;

/// HTTP GET endpoint `/v1/models`
///
/// Lists the model names available under the data folder, one per line.
#[get("/v1/models")]
async fn get_models() -> impl Responder {
	match list_files(normalize_folder(DATA_DIR), MODEL_EXTENSION) {
		Ok(files) => {
			let names: Vec<String> = files.iter().filter_map(|f| get_filename(f).ok()).collect();
			HttpResponse::Ok().body(names.join("\n"))
		}
		Err(_) => HttpResponse::InternalServerError().body("Failed to list models"),
	}
}

/// HTTP PUT endpoint `/v1/load_model`
///
/// Loads `./data/<name>.bin`, replacing the current model on success.
#[put("/v1/load_model")]
async fn put_model(data: Shared, query: web::Query<LoadQuery>) -> impl Responder {
	let path = match query.model_path() {
		Ok(p) => p,
		Err(e) => return HttpResponse::BadRequest().body(e),
	};
	let bytes = match read_bytes(&path) {
		Ok(b) => b,
		Err(e) => return HttpResponse::NotFound().body(format!("Failed to read model: {e}")),
	};
	let new_handle = match handle::init_with_config(&bytes, &query.config()) {
		Ok(h) => h,
		Err(e) => return HttpResponse::UnprocessableEntity().body(format!("Failed to load model: {e}")),
	};

	let mut shared_data = match data.write() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	};
	if let Some(old) = shared_data.handle.replace(new_handle) {
		handle::teardown(old);
	}
	shared_data.name = query.name.as_ref().map(|s| s.trim().to_owned());
	info!("model {} loaded", path.display());

	HttpResponse::Ok().body("Model loaded successfully")
}

/// HTTP GET endpoint `/v1/loaded_model`
#[get("/v1/loaded_model")]
async fn get_loaded_model(data: Shared) -> impl Responder {
	let shared_data = match data.read() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	};
	match &shared_data.name {
		Some(name) => HttpResponse::Ok().body(name.clone()),
		None => HttpResponse::NotFound().body("No model loaded"),
	}
}

/// HTTP GET endpoint `/v1/score`
///
/// Returns the total log10 probability of `text`. Scored as a sentence
/// unless `null_context` is set.
#[get("/v1/score")]
async fn get_score(data: Shared, query: web::Query<ScoreQuery>) -> impl Responder {
	let text = query.text.as_deref().unwrap_or("");
	let shared_data = match data.read() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	};

	if query.null_context.unwrap_or(false) {
		return match &shared_data.handle {
			Some(h) => HttpResponse::Ok().body(h.model().score_sentence(text, false).total.to_string()),
			None => HttpResponse::Conflict().body("No model loaded"),
		};
	}

	match handle::query(shared_data.handle.as_ref(), text) {
		total if total == QUERY_FAILURE && shared_data.handle.is_none() => HttpResponse::Conflict().body("No model loaded"),
		total if total == QUERY_FAILURE => {
			warn!("scoring failed for {text:?}");
			HttpResponse::InternalServerError().body("Scoring failed")
		}
		total => HttpResponse::Ok().body(total.to_string()),
	}
}

/// HTTP GET endpoint `/v1/score_words`
///
/// Returns every word of `text` with its id, matched length and probability
/// as JSON.
#[get("/v1/score_words")]
async fn get_score_words(data: Shared, query: web::Query<ScoreQuery>) -> impl Responder {
	let text = query.text.as_deref().unwrap_or("");
	let shared_data = match data.read() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	};
	match &shared_data.handle {
		Some(h) => HttpResponse::Ok().json(h.model().score_sentence(text, !query.null_context.unwrap_or(false))),
		None => HttpResponse::Conflict().body("No model loaded"),
	}
}

/// HTTP DELETE endpoint `/v1/model`
///
/// Releases the loaded model.
#[delete("/v1/model")]
async fn delete_model(data: Shared) -> impl Responder {
	let mut shared_data = match data.write() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	};
	shared_data.name = None;
	match shared_data.handle.take() {
		Some(h) => {
			handle::teardown(h);
			HttpResponse::Ok().body("Model released")
		}
		None => HttpResponse::NotFound().body("No model loaded"),
	}
}

fn configure(cfg: &mut web::ServiceConfig) {
	cfg.service(get_models)
		.service(put_model)
		.service(get_loaded_model)
		.service(get_score)
		.service(get_score_words)
		.service(delete_model);
}

/// Main entry point for the server.
///
/// Starts an Actix-web HTTP server sharing at most one loaded model behind
/// a `RwLock`: scoring requests read it concurrently, loading and releasing
/// take it exclusively.
///
/// # Notes
/// - The server binds to 127.0.0.1:5000.
/// - Models are read from `./data/*.bin`.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
	env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

	let shared_model = web::Data::new(RwLock::new(SharedData::default()));

	HttpServer::new(move || {
		App::new()
			.wrap(Logger::default())
			.app_data(shared_model.clone())
			.configure(configure)
	})
		.bind(("127.0.0.1", 5000))?
		.run()
		.await
}

#[cfg(test)]
mod tests {
	use super::*;
	use actix_web::http::StatusCode;
	use actix_web::test::{call_service, init_service, TestRequest};

	fn shared() -> Shared {
		web::Data::new(RwLock::new(SharedData::default()))
	}

	#[actix_web::test]
	async fn nothing_is_loaded_at_start() {
		let app = init_service(App::new().app_data(shared()).configure(configure)).await;

		let req = TestRequest::get().uri("/v1/loaded_model").to_request();
		assert_eq!(call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

		let req = TestRequest::get().uri("/v1/score?text=a%20b").to_request();
		assert_eq!(call_service(&app, req).await.status(), StatusCode::CONFLICT);

		let req = TestRequest::get().uri("/v1/score?text=a&null_context=true").to_request();
		assert_eq!(call_service(&app, req).await.status(), StatusCode::CONFLICT);

		let req = TestRequest::get().uri("/v1/score_words?text=a").to_request();
		assert_eq!(call_service(&app, req).await.status(), StatusCode::CONFLICT);

		let req = TestRequest::delete().uri("/v1/model").to_request();
		assert_eq!(call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
	}

	#[actix_web::test]
	async fn load_rejects_bad_names() {
		let app = init_service(App::new().app_data(shared()).configure(configure)).await;

		let req = TestRequest::put().uri("/v1/load_model").to_request();
		assert_eq!(call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

		let req = TestRequest::put().uri("/v1/load_model?name=..%2Fsecret").to_request();
		assert_eq!(call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

		let req = TestRequest::put().uri("/v1/load_model?name=does-not-exist").to_request();
		assert_eq!(call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
	}

	#[test]
	fn load_query_maps_onto_config() {
		let query = LoadQuery {
			name: Some(" news ".into()),
			check_consistency: Some(true),
			require_sentence_markers: None,
		};
		let config = query.config();
		assert!(config.check_consistency);
		assert!(!config.require_sentence_markers);
		assert!(query.model_path().unwrap().ends_with("news.bin"));
	}
}
