//! The local/remote execution seam.
//!
//! Every data-loading entry point goes through an [`Executor`]: either the
//! call runs against the local database, or it is forwarded as an HTTP POST
//! to a backend service that performs the same logic server-side. The
//! variant is chosen once from configuration, with the dependency checks for
//! the chosen path applied before any network or database traffic. Exactly
//! one of the two paths executes per call.

use crate::config::{Config, ConfigError};
use crate::database::{State, StateError};
use crate::ingest::{self, IngestError};
use crate::registry;
use crate::vendors::{ProbeKey, ProbeReading, Vendor};
use crate::writer::{IfExists, WriteError};
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde_json::{json, Value as JsonValue};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum RouteError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Write(#[from] WriteError),
    #[error(transparent)]
    Ingest(#[from] IngestError),
    #[error("backend request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("backend returned {status} from /{endpoint}: {body}")]
    Backend {
        endpoint: String,
        status: StatusCode,
        body: String,
    },
}

/// Where data-loading calls execute.
#[derive(Debug)]
pub enum Executor {
    /// Run the loaders against the local database.
    Local(State),
    /// Forward each call to the backend service.
    Remote(RemoteBackend),
}

impl Executor {
    /// Builds the executor the configuration asks for, failing fast when the
    /// settings the chosen path depends on are absent.
    pub async fn from_config(config: &Config) -> Result<Self, RouteError> {
        if config.route_to_backend {
            let (backend_url, api_key) = config.check_routing_dependencies()?;
            Ok(Self::Remote(RemoteBackend::new(backend_url, api_key)))
        } else {
            let url = config.require_database_url()?;
            Ok(Self::Local(State::from_url(url).await?))
        }
    }

    /// Writes one candidate row to `table` under `if_exists`.
    pub async fn write_to_table(
        &self,
        table: &str,
        data: JsonValue,
        if_exists: IfExists,
    ) -> Result<(), RouteError> {
        match self {
            Self::Local(state) => {
                registry::write_to_table(state, table, data, if_exists).await?;
                Ok(())
            }
            Self::Remote(backend) => {
                let payload = json!({
                    "table": table,
                    "data": data,
                    "if_exists": if_exists,
                });
                backend.post_json("write_to_table", &payload).await
            }
        }
    }

    /// Loads one probe's metadata: the vendor-independent probe row plus the
    /// vendor metadata table row.
    pub async fn load_probe_metadata(
        &self,
        vendor: Vendor,
        probe_key: &ProbeKey,
        data: &JsonValue,
    ) -> Result<(), RouteError> {
        match self {
            Self::Local(state) => {
                ingest::load_probe_metadata(state, vendor, probe_key, data).await?;
                Ok(())
            }
            Self::Remote(backend) => {
                let payload = json!({
                    "vendor": vendor,
                    "probe_key": probe_key,
                    "data": data,
                });
                backend.post_json("load_probe_metadata", &payload).await
            }
        }
    }

    /// Loads a time series for one probe. The remote path ships the readings
    /// as a CSV file part; `chunk_size` only applies locally.
    pub async fn load_time_data(
        &self,
        probe_key: &ProbeKey,
        metric_type_name: Option<&str>,
        reference_uuid: Option<Uuid>,
        readings: &[ProbeReading],
        chunk_size: Option<usize>,
    ) -> Result<(), RouteError> {
        match self {
            Self::Local(state) => {
                ingest::load_time_data(
                    state,
                    probe_key,
                    metric_type_name,
                    reference_uuid,
                    readings,
                    chunk_size,
                )
                .await?;
                Ok(())
            }
            Self::Remote(backend) => {
                let mut form = Form::new().text("probe_key", serde_json::to_string(probe_key)?);
                if let Some(name) = metric_type_name {
                    form = form.text("metric_type", name.to_owned());
                }
                if let Some(uuid) = reference_uuid {
                    form = form.text("reference_uuid", uuid.to_string());
                }
                let file = Part::bytes(readings_csv(readings).into_bytes())
                    .file_name(format!("{probe_key}.csv"))
                    .mime_str("text/csv")?;
                form = form.part("file", file);

                backend.post_multipart("load_time_data", form).await
            }
        }
    }
}

/// The remote half of the seam: a reqwest client bound to the backend URL
/// and access key.
#[derive(Debug)]
pub struct RemoteBackend {
    client: reqwest::Client,
    backend_url: String,
    api_key: String,
}

impl RemoteBackend {
    pub fn new(backend_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            backend_url: backend_url.into(),
            api_key: api_key.into(),
        }
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{endpoint}", self.backend_url.trim_end_matches('/'))
    }

    async fn post_json(&self, endpoint: &str, payload: &JsonValue) -> Result<(), RouteError> {
        tracing::debug!(endpoint, "routing call to backend");
        let response = self
            .client
            .post(self.url(endpoint))
            .header("access-key", &self.api_key)
            .json(payload)
            .send()
            .await?;
        Self::ensure_success(endpoint, response).await
    }

    async fn post_multipart(&self, endpoint: &str, form: Form) -> Result<(), RouteError> {
        tracing::debug!(endpoint, "routing file upload to backend");
        let response = self
            .client
            .post(self.url(endpoint))
            .header("access-key", &self.api_key)
            .multipart(form)
            .send()
            .await?;
        Self::ensure_success(endpoint, response).await
    }

    async fn ensure_success(endpoint: &str, response: reqwest::Response) -> Result<(), RouteError> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(RouteError::Backend {
            endpoint: endpoint.to_owned(),
            status,
            body,
        })
    }
}

impl From<serde_json::Error> for RouteError {
    fn from(err: serde_json::Error) -> Self {
        Self::Write(WriteError::Serialization(err))
    }
}

fn readings_csv(readings: &[ProbeReading]) -> String {
    let mut csv = String::from("time,value\n");
    for reading in readings {
        csv.push_str(&reading.time.to_rfc3339());
        csv.push(',');
        csv.push_str(&reading.value.to_string());
        csv.push('\n');
    }
    csv
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use chrono::DateTime;
    use model::locations;
    use sea_orm::EntityTrait;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serves exactly one HTTP request with the given status and returns the
    /// raw request text. Accepting a single connection is what makes the
    /// "exactly one POST" assertions structural.
    async fn spawn_backend(status: u16) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 4096];

            let (header_end, content_length) = loop {
                let n = socket.read(&mut buf).await.unwrap();
                raw.extend_from_slice(&buf[..n]);
                if let Some(pos) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
                    let headers = String::from_utf8_lossy(&raw[..pos]).into_owned();
                    let content_length = headers
                        .lines()
                        .find_map(|line| {
                            let (name, value) = line.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    break (pos + 4, content_length);
                }
            };
            while raw.len() < header_end + content_length {
                let n = socket.read(&mut buf).await.unwrap();
                raw.extend_from_slice(&buf[..n]);
            }

            let body = r#"{"status":"success"}"#;
            let response = format!(
                "HTTP/1.1 {status} X\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();

            String::from_utf8_lossy(&raw).into_owned()
        });

        (format!("http://{addr}"), handle)
    }

    async fn remote_executor(backend_url: &str) -> Executor {
        let config = Config {
            route_to_backend: true,
            backend_url: Some(backend_url.to_owned()),
            api_key: Some("test-api-key".to_owned()),
            ..Config::default()
        };
        Executor::from_config(&config).await.unwrap()
    }

    fn sample_probe_key() -> ProbeKey {
        ProbeKey {
            probe_id: "1-1".to_owned(),
            ip_address: "192.168.1.100".to_owned(),
        }
    }

    #[tokio::test]
    async fn remote_write_posts_payload_with_access_key() {
        let (url, backend) = spawn_backend(200).await;
        let executor = remote_executor(&url).await;

        let data = json!({"name": "Test Location", "public": true});
        executor
            .write_to_table("locations", data.clone(), IfExists::Update)
            .await
            .unwrap();

        let raw = backend.await.unwrap();
        assert!(raw.starts_with("POST /write_to_table HTTP/1.1"));
        assert!(raw
            .lines()
            .any(|line| line.eq_ignore_ascii_case("access-key: test-api-key")));

        let (_, body) = raw.split_once("\r\n\r\n").unwrap();
        let payload: JsonValue = serde_json::from_str(body).unwrap();
        assert_eq!(
            payload,
            json!({"table": "locations", "data": data, "if_exists": "update"})
        );
    }

    #[tokio::test]
    async fn remote_probe_metadata_posts_vendor_and_key() {
        let (url, backend) = spawn_backend(200).await;
        let executor = remote_executor(&url).await;

        let data = json!({"probe_type": "PTP"});
        executor
            .load_probe_metadata(Vendor::Adva, &sample_probe_key(), &data)
            .await
            .unwrap();

        let raw = backend.await.unwrap();
        assert!(raw.starts_with("POST /load_probe_metadata HTTP/1.1"));

        let (_, body) = raw.split_once("\r\n\r\n").unwrap();
        let payload: JsonValue = serde_json::from_str(body).unwrap();
        assert_eq!(payload["vendor"], json!("ADVA"));
        assert_eq!(
            payload["probe_key"],
            json!({"probe_id": "1-1", "ip_address": "192.168.1.100"})
        );
        assert_eq!(payload["data"], data);
    }

    #[tokio::test]
    async fn remote_time_data_uploads_csv_part() {
        let (url, backend) = spawn_backend(200).await;
        let executor = remote_executor(&url).await;

        let readings = vec![
            ProbeReading {
                time: DateTime::parse_from_rfc3339("2024-03-20T10:00:00Z").unwrap(),
                value: 0.5,
            },
            ProbeReading {
                time: DateTime::parse_from_rfc3339("2024-03-20T10:00:01Z").unwrap(),
                value: -1.25,
            },
        ];
        executor
            .load_time_data(&sample_probe_key(), Some("PHASE"), None, &readings, None)
            .await
            .unwrap();

        let raw = backend.await.unwrap();
        assert!(raw.starts_with("POST /load_time_data HTTP/1.1"));
        assert!(raw.contains("multipart/form-data"));
        assert!(raw.contains("name=\"probe_key\""));
        assert!(raw.contains("name=\"metric_type\""));
        assert!(raw.contains("name=\"file\""));
        assert!(raw.contains("filename=\"192.168.1.100_1-1.csv\""));
        assert!(raw.contains("time,value\n2024-03-20T10:00:00+00:00,0.5\n"));
    }

    #[tokio::test]
    async fn remote_failure_status_surfaces() {
        let (url, backend) = spawn_backend(500).await;
        let executor = remote_executor(&url).await;

        let err = executor
            .write_to_table("locations", json!({"name": "x"}), IfExists::Update)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RouteError::Backend { ref endpoint, status, .. }
                if endpoint == "write_to_table" && status == StatusCode::INTERNAL_SERVER_ERROR
        ));

        backend.await.unwrap();
    }

    #[tokio::test]
    async fn local_executor_runs_against_the_database() {
        let executor = Executor::Local(State::for_test().await);

        executor
            .write_to_table(
                "locations",
                json!({"name": "Test Location", "public": true}),
                IfExists::Update,
            )
            .await
            .unwrap();

        let Executor::Local(state) = &executor else {
            unreachable!()
        };
        let rows = locations::Entity::find().all(&state.conn).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Test Location");
    }

    #[tokio::test]
    async fn routed_config_without_backend_vars_fails_before_any_call() {
        let config = Config {
            route_to_backend: true,
            ..Config::default()
        };
        let err = Executor::from_config(&config).await.unwrap_err();
        assert!(matches!(
            err,
            RouteError::Config(ConfigError::MissingRoutingVar(_))
        ));
    }

    #[tokio::test]
    async fn direct_config_without_database_url_fails_before_any_call() {
        let err = Executor::from_config(&Config::default()).await.unwrap_err();
        assert!(matches!(
            err,
            RouteError::Config(ConfigError::MissingDatabaseUrl)
        ));
    }
}
