//! TCP Server for gigstore
//!
//! This module implements a line-oriented TCP server. Each line a client
//! sends is one JSON request naming a statement surface call:
//!
//! ```text
//! {"op":"all","sql":"SELECT * FROM projects WHERE status = ?","params":["open"]}
//! ```
//!
//! and each reply is one JSON line with `"status":"ok"` or `"status":"error"`.

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use crate::database::Database;
use crate::error::{Error, Result};

/// Default server port
pub const DEFAULT_PORT: u16 = 3001;

/// Default document location
pub const DEFAULT_DATA_PATH: &str = "data.json";

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// JSON document backing the store
    pub data_path: PathBuf,
    /// Maximum concurrent connections
    pub max_connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            max_connections: 100,
        }
    }
}

impl ServerConfig {
    /// Create a new server config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the host address
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the port
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the data file
    pub fn data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_path = path.into();
        self
    }

    /// Set the connection limit
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Get the bind address as a string
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// One line of the wire protocol
#[derive(Debug, Deserialize)]
struct Request {
    op: Op,
    sql: String,
    #[serde(default)]
    params: Vec<Value>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Op {
    Get,
    All,
    Run,
    Exec,
}

/// gigstore TCP Server
pub struct Server {
    config: ServerConfig,
    database: Arc<Database>,
    active: Arc<AtomicUsize>,
}

impl Server {
    /// Create a server over the document named in the config
    pub fn new(config: ServerConfig) -> Self {
        let database = Arc::new(Database::open(&config.data_path));
        Self::with_database(config, database)
    }

    /// Create a server sharing an existing database
    pub fn with_database(config: ServerConfig, database: Arc<Database>) -> Self {
        Self {
            config,
            database,
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.database
    }

    /// Bind and serve until the process exits
    pub fn start(&self) -> Result<()> {
        let listener = TcpListener::bind(self.config.bind_address())?;
        info!(address = %self.config.bind_address(), "gigstore server listening");
        self.serve(listener)
    }

    /// Serve connections from an already-bound listener
    pub fn serve(&self, listener: TcpListener) -> Result<()> {
        for stream in listener.incoming() {
            match stream {
                Ok(mut stream) => {
                    if self.active.load(Ordering::SeqCst) >= self.config.max_connections {
                        warn!(limit = self.config.max_connections, "connection limit reached");
                        let reply = error_response("Too many connections");
                        let _ = send_response(&mut stream, &reply);
                        continue;
                    }

                    self.active.fetch_add(1, Ordering::SeqCst);
                    let database = Arc::clone(&self.database);
                    let active = Arc::clone(&self.active);
                    thread::spawn(move || {
                        if let Err(e) = handle_connection(stream, &database) {
                            error!(error = %e, "connection error");
                        }
                        active.fetch_sub(1, Ordering::SeqCst);
                    });
                }
                Err(e) => {
                    error!(error = %e, "failed to accept connection");
                }
            }
        }

        Ok(())
    }
}

/// Handle a client connection
fn handle_connection(stream: TcpStream, database: &Database) -> Result<()> {
    let peer_addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    info!(peer = %peer_addr, "client connected");

    let mut reader = BufReader::new(stream.try_clone()?);
    let mut writer = stream;

    let mut line = String::new();
    loop {
        line.clear();

        match reader.read_line(&mut line) {
            Ok(0) => {
                info!(peer = %peer_addr, "client disconnected");
                break;
            }
            Ok(_) => {
                let request = line.trim();

                if request.is_empty() {
                    continue;
                }

                if request.starts_with('.') {
                    match request {
                        ".quit" | ".exit" => {
                            send_response(&mut writer, &json!({"status": "ok", "message": "bye"}))?;
                            break;
                        }
                        ".collections" => {
                            let reply = json!({
                                "status": "ok",
                                "collections": database.collection_names(),
                            });
                            send_response(&mut writer, &reply)?;
                        }
                        ".health" => {
                            let reply = json!({
                                "status": "ok",
                                "records": database.record_count(),
                            });
                            send_response(&mut writer, &reply)?;
                        }
                        _ => {
                            let reply = error_response(&format!("Unknown command: {}", request));
                            send_response(&mut writer, &reply)?;
                        }
                    }
                    continue;
                }

                let reply = handle_request(database, request);
                send_response(&mut writer, &reply)?;
            }
            Err(e) => {
                warn!(peer = %peer_addr, error = %e, "read error");
                break;
            }
        }
    }

    Ok(())
}

/// Execute one JSON request line and build its reply
pub fn handle_request(database: &Database, line: &str) -> Value {
    let request: Request = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(e) => return error_response(&format!("Malformed request: {}", e)),
    };
    debug!(op = ?request.op, sql = %request.sql, "request");

    match request.op {
        Op::Get => json!({
            "status": "ok",
            "row": database.prepare(&request.sql).get(&request.params),
        }),
        Op::All => json!({
            "status": "ok",
            "rows": database.prepare(&request.sql).all(&request.params),
        }),
        Op::Run => match database.prepare(&request.sql).run(&request.params) {
            Ok(result) => json!({"status": "ok", "changes": result.changes}),
            Err(e) => storage_failure(e),
        },
        Op::Exec => match database.exec(&request.sql) {
            Ok(()) => json!({"status": "ok"}),
            Err(e) => storage_failure(e),
        },
    }
}

fn storage_failure(e: Error) -> Value {
    error!(error = %e, "statement failed to persist");
    error_response(&e.to_string())
}

fn error_response(message: &str) -> Value {
    json!({"status": "error", "message": message})
}

/// Send a response to the client
fn send_response(writer: &mut TcpStream, reply: &Value) -> Result<()> {
    let mut line = serde_json::to_string(reply)?;
    line.push('\n');
    writer.write_all(line.as_bytes())?;
    writer.flush()?;
    Ok(())
}

/// Simple client for testing
pub fn connect(host: &str, port: u16) -> Result<TcpStream> {
    let addr = format!("{}:{}", host, port);
    TcpStream::connect(&addr).map_err(Error::from)
}
