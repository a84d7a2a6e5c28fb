//! Minimal stdio language-server client: enough of the protocol to warm a
//! server up and ask it `textDocument/definition`.

use codegraph_api::Language;
use codegraph_plugin::FileSet;
use lsp_types::notification::{DidOpenTextDocument, Exit, Initialized, Notification};
use lsp_types::request::{GotoDefinition, Initialize, Request, Shutdown};
use lsp_types::{
    ClientCapabilities, DidOpenTextDocumentParams, GotoCapability, GotoDefinitionParams,
    GotoDefinitionResponse, InitializeParams, InitializedParams, Position,
    TextDocumentClientCapabilities, TextDocumentIdentifier, TextDocumentItem,
    TextDocumentPositionParams, Uri, WorkspaceFolder,
};
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt,
};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::runtime::Runtime;
use tracing::{debug, info, warn};

use super::{DefinitionLocation, DefinitionLookup, LookupError};
use crate::config::ServerCommand;

pub async fn write_message<W: AsyncWrite + Unpin>(
    writer: &mut W,
    message: &Value,
) -> Result<(), LookupError> {
    let body = serde_json::to_vec(message).map_err(|e| LookupError::Protocol(e.to_string()))?;
    let header = format!("Content-Length: {}\r\n\r\n", body.len());
    writer.write_all(header.as_bytes()).await?;
    writer.write_all(&body).await?;
    writer.flush().await?;
    Ok(())
}

pub async fn read_message<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<Value, LookupError> {
    let mut header = Vec::new();
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).await? == 0 {
            return Err(LookupError::Closed);
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        header.push(line.to_string());
    }

    let length = content_length(header.iter().map(String::as_str))?;
    let mut body = vec![0u8; length];
    reader.read_exact(&mut body).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::UnexpectedEof => LookupError::Closed,
        _ => LookupError::Io(e),
    })?;
    serde_json::from_slice(&body).map_err(|e| LookupError::Protocol(e.to_string()))
}

fn content_length<'a>(header: impl Iterator<Item = &'a str>) -> Result<usize, LookupError> {
    let mut length = None;
    for line in header {
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("Content-Length") {
                let parsed = value.trim().parse::<usize>().map_err(|e| {
                    LookupError::Protocol(format!("bad Content-Length '{}': {}", value.trim(), e))
                })?;
                length = Some(parsed);
            }
        }
    }
    length.ok_or_else(|| LookupError::Protocol("missing Content-Length header".to_string()))
}

/// Removes one whole frame from the front of `pending`, if it holds one.
fn take_frame(pending: &mut Vec<u8>) -> Result<Option<Value>, LookupError> {
    let Some(header_end) = pending.windows(4).position(|w| w == b"\r\n\r\n") else {
        return Ok(None);
    };
    let header = std::str::from_utf8(&pending[..header_end])
        .map_err(|e| LookupError::Protocol(format!("header is not UTF-8: {}", e)))?;
    let length = content_length(header.lines())?;
    let body_start = header_end + 4;
    if pending.len() < body_start + length {
        return Ok(None);
    }
    let frame: Vec<u8> = pending.drain(..body_start + length).collect();
    serde_json::from_slice(&frame[body_start..])
        .map(Some)
        .map_err(|e| LookupError::Protocol(e.to_string()))
}

pub fn path_to_uri(path: &Path) -> Result<Uri, LookupError> {
    let url = url::Url::from_file_path(path)
        .map_err(|_| LookupError::Protocol(format!("not an absolute path: {}", path.display())))?;
    url.as_str()
        .parse::<Uri>()
        .map_err(|e| LookupError::Protocol(format!("{}: {}", url, e)))
}

pub fn uri_to_path(uri: &Uri) -> Option<PathBuf> {
    url::Url::parse(uri.as_str()).ok()?.to_file_path().ok()
}

/// Flattens the three reply shapes a server may use. Non-file URIs are
/// dropped.
pub fn flatten_response(response: Option<GotoDefinitionResponse>) -> Vec<DefinitionLocation> {
    let pairs = match response {
        None => Vec::new(),
        Some(GotoDefinitionResponse::Scalar(location)) => vec![(location.uri, location.range)],
        Some(GotoDefinitionResponse::Array(locations)) => locations
            .into_iter()
            .map(|l| (l.uri, l.range))
            .collect(),
        Some(GotoDefinitionResponse::Link(links)) => links
            .into_iter()
            .map(|l| (l.target_uri, l.target_selection_range))
            .collect(),
    };
    pairs
        .into_iter()
        .filter_map(|(uri, range)| {
            Some(DefinitionLocation {
                path: uri_to_path(&uri)?,
                range,
            })
        })
        .collect()
}

/// JSON-RPC over a framed byte stream.
///
/// Reads go through `pending`, so a request dropped on timeout leaves any
/// partial frame behind for the next one. Its late reply is skipped by id.
pub struct Connection<W, R> {
    writer: W,
    reader: R,
    pending: Vec<u8>,
    /// Still set when a write was cut off; the outgoing stream is then
    /// unusable.
    writing: bool,
    next_id: i64,
}

impl<W, R> Connection<W, R>
where
    W: AsyncWrite + Unpin,
    R: AsyncRead + Unpin,
{
    pub fn new(writer: W, reader: R) -> Self {
        Self {
            writer,
            reader,
            pending: Vec::new(),
            writing: false,
            next_id: 0,
        }
    }

    async fn send_frame(&mut self, message: &Value) -> Result<(), LookupError> {
        if self.writing {
            return Err(LookupError::Closed);
        }
        self.writing = true;
        write_message(&mut self.writer, message).await?;
        self.writing = false;
        Ok(())
    }

    async fn receive(&mut self) -> Result<Value, LookupError> {
        let mut chunk = [0u8; 8192];
        loop {
            if let Some(message) = take_frame(&mut self.pending)? {
                return Ok(message);
            }
            let read = self.reader.read(&mut chunk).await?;
            if read == 0 {
                return Err(LookupError::Closed);
            }
            self.pending.extend_from_slice(&chunk[..read]);
        }
    }

    pub async fn notify<N: Notification>(&mut self, params: N::Params) -> Result<(), LookupError> {
        let message = json!({ "jsonrpc": "2.0", "method": N::METHOD, "params": params });
        self.send_frame(&message).await
    }

    /// Sends a request and waits for its reply. Server requests arriving in
    /// between are answered with empty results; notifications are skipped.
    pub async fn request<Q: Request>(&mut self, params: Q::Params) -> Result<Q::Result, LookupError> {
        self.next_id += 1;
        let id = self.next_id;
        let message = json!({ "jsonrpc": "2.0", "id": id, "method": Q::METHOD, "params": params });
        self.send_frame(&message).await?;

        loop {
            let incoming = self.receive().await?;
            let method = incoming.get("method").and_then(Value::as_str);
            match (incoming.get("id"), method) {
                (Some(server_id), Some(method)) => {
                    let server_id = server_id.clone();
                    self.answer(server_id, method, &incoming).await?;
                }
                (None, Some(method)) => debug!("Server notification {}", method),
                (Some(reply_id), None) if reply_id.as_i64() == Some(id) => {
                    if let Some(error) = incoming.get("error") {
                        return Err(LookupError::Protocol(format!("{} failed: {}", Q::METHOD, error)));
                    }
                    let result = incoming.get("result").cloned().unwrap_or(Value::Null);
                    return serde_json::from_value(result)
                        .map_err(|e| LookupError::Protocol(format!("{}: {}", Q::METHOD, e)));
                }
                _ => debug!("Dropping stale reply {:?}", incoming.get("id")),
            }
        }
    }

    async fn answer(&mut self, id: Value, method: &str, incoming: &Value) -> Result<(), LookupError> {
        let result = match method {
            "workspace/configuration" => {
                let items = incoming
                    .pointer("/params/items")
                    .and_then(Value::as_array)
                    .map_or(0, Vec::len);
                Value::Array(vec![Value::Null; items])
            }
            _ => Value::Null,
        };
        let reply = json!({ "jsonrpc": "2.0", "id": id, "result": result });
        self.send_frame(&reply).await
    }
}

type StdioConnection = Connection<ChildStdin, ChildStdout>;

/// A language server child process driven synchronously from the pipeline
/// through a private single-threaded runtime.
pub struct LspLookup {
    language: Language,
    command: String,
    timeout: Duration,
    runtime: Runtime,
    child: Child,
    connection: Option<StdioConnection>,
}

impl LspLookup {
    pub fn spawn(
        language: Language,
        server: &ServerCommand,
        root: &Path,
        timeout: Duration,
    ) -> Result<Self, LookupError> {
        let spawn_error = |reason: String| LookupError::Spawn {
            command: server.command.clone(),
            reason,
        };
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let mut child = {
            let _guard = runtime.enter();
            Command::new(&server.command)
                .args(&server.args)
                .current_dir(root)
                .stdin(Stdio::piped())
                .stdout(Stdio::piped())
                .stderr(Stdio::null())
                .kill_on_drop(true)
                .spawn()
                .map_err(|e| spawn_error(e.to_string()))?
        };
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| spawn_error("stdin was not captured".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| spawn_error("stdout was not captured".to_string()))?;

        info!("Started {} language server '{}'", language, server.command);
        Ok(Self {
            language,
            command: server.command.clone(),
            timeout,
            runtime,
            child,
            connection: Some(Connection::new(stdin, stdout)),
        })
    }

    fn timed_out(&self, method: &str) -> LookupError {
        LookupError::Timeout {
            method: method.to_string(),
            timeout_ms: self.timeout.as_millis() as u64,
        }
    }

    fn call<Q: Request>(&mut self, params: Q::Params) -> Result<Q::Result, LookupError> {
        let connection = self.connection.as_mut().ok_or(LookupError::Closed)?;
        let timeout = self.timeout;
        let outcome = self
            .runtime
            .block_on(async { tokio::time::timeout(timeout, connection.request::<Q>(params)).await });
        match outcome {
            Ok(Err(LookupError::Closed)) => {
                self.connection = None;
                Err(LookupError::Closed)
            }
            Ok(result) => result,
            Err(_) => {
                warn!(
                    "{} did not answer {} within {}ms",
                    self.command,
                    Q::METHOD,
                    timeout.as_millis()
                );
                Err(self.timed_out(Q::METHOD))
            }
        }
    }

    fn send<N: Notification>(&mut self, params: N::Params) -> Result<(), LookupError> {
        let connection = self.connection.as_mut().ok_or(LookupError::Closed)?;
        let timeout = self.timeout;
        self.runtime
            .block_on(async { tokio::time::timeout(timeout, connection.notify::<N>(params)).await })
            .map_err(|_| self.timed_out(N::METHOD))?
    }
}

impl DefinitionLookup for LspLookup {
    fn start(&mut self, root: &Path, files: &FileSet) -> Result<(), LookupError> {
        let root_uri = path_to_uri(root)?;
        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "root".to_string());

        #[allow(deprecated)]
        let params = InitializeParams {
            process_id: Some(std::process::id()),
            root_uri: Some(root_uri.clone()),
            workspace_folders: Some(vec![WorkspaceFolder {
                uri: root_uri,
                name,
            }]),
            capabilities: ClientCapabilities {
                text_document: Some(TextDocumentClientCapabilities {
                    definition: Some(GotoCapability {
                        dynamic_registration: Some(false),
                        link_support: Some(true),
                    }),
                    ..Default::default()
                }),
                ..Default::default()
            },
            ..Default::default()
        };
        let initialized = self.call::<Initialize>(params)?;
        if initialized.capabilities.definition_provider.is_none() {
            warn!("{} does not advertise go-to-definition", self.command);
        }
        self.send::<Initialized>(InitializedParams {})?;

        let language = self.language.clone();
        let mut opened = 0usize;
        for (_, file) in files.files().filter(|(_, f)| f.language == language) {
            let item = TextDocumentItem::new(
                path_to_uri(&file.path)?,
                language.as_str().to_string(),
                1,
                file.source.clone(),
            );
            self.send::<DidOpenTextDocument>(DidOpenTextDocumentParams {
                text_document: item,
            })?;
            opened += 1;
        }
        info!("Opened {} {} files in {}", opened, self.language, self.command);
        Ok(())
    }

    fn request_definition(
        &mut self,
        path: &Path,
        position: Position,
    ) -> Result<Vec<DefinitionLocation>, LookupError> {
        let params = GotoDefinitionParams {
            text_document_position_params: TextDocumentPositionParams::new(
                TextDocumentIdentifier::new(path_to_uri(path)?),
                position,
            ),
            work_done_progress_params: Default::default(),
            partial_result_params: Default::default(),
        };
        Ok(flatten_response(self.call::<GotoDefinition>(params)?))
    }

    fn shutdown(&mut self) {
        if self.connection.is_none() {
            return;
        }
        if let Err(e) = self.call::<Shutdown>(()) {
            debug!("{} did not shut down cleanly: {}", self.command, e);
        }
        let _ = self.send::<Exit>(());
        self.connection = None;
        if let Err(e) = self.child.start_kill() {
            debug!("{} already exited: {}", self.command, e);
        }
        info!("Stopped {} language server", self.language);
    }
}
