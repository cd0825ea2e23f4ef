//! A single logical connection to the RPC endpoint.
//!
//! Requests are strictly sequential: one frame out, then frames in until the
//! matching response. Frames for other ids are dropped. Every call takes `&mut self`, and the [`Rows`] and
//! [`ExecResult`] it returns borrow the connection, so a response is always
//! consumed before the next request goes out.
//!
//! If a call is abandoned after its request was written (the future is
//! dropped, or the configured timeout fires) the connection cannot tell
//! which response belongs to whom any more. It is marked invalid and every
//! later call fails with [`DriverError::InvalidConnection`].

mod statement;
mod transport;

pub use statement::Statement;
pub use transport::{Transport, WsTransport};

use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info, trace, warn, Instrument, Span};

use crate::config::{AuthMethod, ConnectionConfig, Credentials};
use crate::error::{DriverError, DriverResult};
use crate::protocol::{
    classify_response, decode_response, encode_request, ClassifiedResponse, RawResponse, Request,
    Vars,
};
use crate::result::ExecResult;
use crate::rows::Rows;

const BEGIN_SQL: &str = "BEGIN TRANSACTION;";
const COMMIT_SQL: &str = "COMMIT TRANSACTION;";
const CANCEL_SQL: &str = "CANCEL TRANSACTION;";

/// Bind positional arguments as `$_0`, `$_1`, ...
pub fn positional_vars(args: &[Value]) -> Vars {
    args.iter()
        .enumerate()
        .map(|(i, value)| (format!("_{}", i), value.clone()))
        .collect()
}

pub struct Connection<T: Transport = WsTransport> {
    transport: T,
    timeout: Option<Duration>,
    span: Span,
    /// Why the connection can no longer be used.
    invalid: Option<String>,
    closed: bool,
    in_transaction: bool,
    token: Option<String>,
}

impl Connection<WsTransport> {
    /// Open a WebSocket connection and log in.
    pub async fn connect(config: &ConnectionConfig) -> DriverResult<Self> {
        config.credentials.validate()?;

        let transport = WsTransport::connect(&config.endpoint)
            .instrument(config.span.clone())
            .await?;

        let mut conn = Connection::new(transport).with_span(config.span.clone());
        if let Some(timeout) = config.timeout {
            conn = conn.with_timeout(timeout);
        }

        conn.login(&config.credentials).await?;
        info!(parent: &conn.span, method = %config.credentials.method, "Connected");
        Ok(conn)
    }
}

impl<T: Transport> Connection<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            timeout: None,
            span: Span::none(),
            invalid: None,
            closed: false,
            in_transaction: false,
            token: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn is_valid(&self) -> bool {
        !self.closed && self.invalid.is_none()
    }

    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    /// Token returned by the last successful signin or authenticate.
    pub fn session_token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Send one request and classify its response.
    pub async fn call(&mut self, request: Request) -> DriverResult<ClassifiedResponse> {
        let span = self.span.clone();
        self.call_inner(request).instrument(span).await
    }

    async fn call_inner(&mut self, request: Request) -> DriverResult<ClassifiedResponse> {
        self.ensure_usable()?;

        let method = request.method;
        let frame = encode_request(&request)?;
        debug!(id = %request.id, method = %method, "Sending request");

        // Cleared once the response has been read in full.
        self.invalid = Some(format!("'{}' call {} was abandoned", method, request.id));

        if let Err(e) = self.transport.write_frame(frame).await {
            self.invalid = Some(e.to_string());
            return Err(e);
        }

        let read = read_response(&mut self.transport, &request.id);
        let outcome = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, read).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    warn!(id = %request.id, method = %method, "Timed out waiting for response");
                    self.invalid = Some(format!("'{}' call {} timed out", method, request.id));
                    return Err(DriverError::Timeout(limit));
                }
            },
            None => read.await,
        };

        match outcome {
            Ok(raw) => {
                self.invalid = None;
                let classified = classify_response(method, raw)?;
                trace!(method = %method, kind = classified.kind(), "Response classified");
                Ok(classified)
            }
            Err(e) if e.is_fatal_to_connection() => {
                warn!("Connection lost: {}", e);
                self.invalid = Some(e.to_string());
                Err(e)
            }
            Err(e) => {
                self.invalid = None;
                Err(e)
            }
        }
    }

    fn ensure_usable(&self) -> DriverResult<()> {
        if self.closed {
            return Err(DriverError::InvalidConnection(
                "connection is closed".to_string(),
            ));
        }
        match &self.invalid {
            Some(reason) => Err(DriverError::InvalidConnection(reason.clone())),
            None => Ok(()),
        }
    }

    /// Authenticate, then select namespace and database where the auth
    /// method expects it.
    pub async fn login(&mut self, credentials: &Credentials) -> DriverResult<()> {
        match credentials.method {
            AuthMethod::Anonymous => {}
            AuthMethod::Token => {
                let token = credentials
                    .token
                    .as_deref()
                    .ok_or_else(|| DriverError::Auth("Token auth requires a token".to_string()))?;
                self.call(Request::authenticate(token))
                    .await
                    .map_err(auth_error)?;
                self.token = Some(token.to_string());
            }
            AuthMethod::Root | AuthMethod::Database | AuthMethod::Record => {
                let response = self
                    .call(Request::signin(credentials))
                    .await
                    .map_err(auth_error)?;
                if let ClassifiedResponse::Scalar(Value::String(token)) = response {
                    self.token = Some(token);
                }
            }
        }

        let namespace = credentials.namespace.as_deref();
        let database = credentials.database.as_deref();
        if credentials.method.needs_use() && (namespace.is_some() || database.is_some()) {
            self.use_ns(namespace, database).await?;
        }

        debug!(parent: &self.span, method = %credentials.method, "Logged in");
        Ok(())
    }

    pub async fn use_ns(&mut self, namespace: Option<&str>, database: Option<&str>) -> DriverResult<()> {
        self.call(Request::use_ns(namespace, database)).await?;
        Ok(())
    }

    pub async fn invalidate(&mut self) -> DriverResult<()> {
        self.call(Request::invalidate()).await?;
        self.token = None;
        Ok(())
    }

    pub async fn version(&mut self) -> DriverResult<String> {
        match self.call(Request::version()).await? {
            ClassifiedResponse::Scalar(Value::String(version)) => Ok(version),
            other => Err(DriverError::Protocol(format!(
                "Expected a version string, got {}",
                other.kind()
            ))),
        }
    }

    pub async fn ping(&mut self) -> DriverResult<()> {
        self.version().await.map(|_| ())
    }

    /// Define a connection-scoped variable.
    pub async fn set(&mut self, name: &str, value: Value) -> DriverResult<()> {
        self.call(Request::let_var(name, value)).await?;
        Ok(())
    }

    pub async fn unset(&mut self, name: &str) -> DriverResult<()> {
        self.call(Request::unset(name)).await?;
        Ok(())
    }

    /// Run any request and read its response as rows.
    pub async fn fetch(&mut self, request: Request) -> DriverResult<Rows<'_>> {
        let response = self.call(request).await?;
        Ok(Rows::with_span(response, self.span.clone()))
    }

    /// Run any request and summarize its response as a write.
    pub async fn execute(&mut self, request: Request) -> DriverResult<ExecResult<'_>> {
        let response = self.call(request).await?;
        Ok(ExecResult::with_span(response, self.span.clone()))
    }

    pub async fn query(&mut self, sql: &str, vars: Vars) -> DriverResult<Rows<'_>> {
        self.fetch(Request::query(sql, vars)).await
    }

    pub async fn query_args(&mut self, sql: &str, args: &[Value]) -> DriverResult<Rows<'_>> {
        self.query(sql, positional_vars(args)).await
    }

    pub async fn exec(&mut self, sql: &str, vars: Vars) -> DriverResult<ExecResult<'_>> {
        self.execute(Request::query(sql, vars)).await
    }

    pub async fn exec_args(&mut self, sql: &str, args: &[Value]) -> DriverResult<ExecResult<'_>> {
        self.exec(sql, positional_vars(args)).await
    }

    pub fn prepare(&mut self, sql: &str) -> Statement<'_, T> {
        Statement::new(self, sql)
    }

    /// Begin a new transaction
    pub async fn begin(&mut self) -> DriverResult<()> {
        if self.in_transaction {
            return Err(DriverError::Transaction(
                "Transaction already active".to_string(),
            ));
        }
        self.run_control(BEGIN_SQL).await?;
        self.in_transaction = true;
        Ok(())
    }

    /// Commit the current transaction
    pub async fn commit(&mut self) -> DriverResult<()> {
        self.finish_transaction(COMMIT_SQL).await
    }

    /// Rollback the current transaction
    pub async fn rollback(&mut self) -> DriverResult<()> {
        self.finish_transaction(CANCEL_SQL).await
    }

    async fn finish_transaction(&mut self, sql: &str) -> DriverResult<()> {
        if !self.in_transaction {
            return Err(DriverError::Transaction("No active transaction".to_string()));
        }
        self.in_transaction = false;
        self.run_control(sql).await
    }

    async fn run_control(&mut self, sql: &str) -> DriverResult<()> {
        self.exec(sql, Vars::new()).await?.check()
    }

    pub async fn close(mut self) -> DriverResult<()> {
        self.closed = true;
        debug!(parent: &self.span, "Closing connection");
        self.transport.close().await
    }
}

async fn read_response<T: Transport>(transport: &mut T, id: &str) -> DriverResult<RawResponse> {
    loop {
        let frame = transport.read_frame().await?;
        let raw = decode_response(&frame)?;

        match raw.correlation_id() {
            Some(got) if got == id => return Ok(raw),
            // The pending response is still queued behind it.
            Some(got) => {
                warn!(expected = %id, got = %got, "Skipping response for another request");
            }
            None if raw.is_notification() => {
                debug!("Skipping live query notification");
            }
            // Errors for requests the server could not parse carry no id.
            None => return Ok(raw),
        }
    }
}

fn auth_error(err: DriverError) -> DriverError {
    match err {
        DriverError::Api { message, .. } => DriverError::Auth(message),
        other => other,
    }
}
