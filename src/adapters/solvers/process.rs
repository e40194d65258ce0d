//! Out-of-process solver backend.
//!
//! Speaks a line protocol over the child's stdin/stdout. Requests:
//!
//! ```text
//! model <name> <path>          -> ok
//! sat <full|partial> <set>     -> true | false
//! complete <set> <set>         -> <set> | none
//! enumerate <n>                -> <set>;<set>;... | none
//! bucket <k> <weights>         -> <set> | none
//! reset                        -> ok
//! ```
//!
//! A set is a comma-separated list of option names, `-` for the empty set.
//! Weights are `<set>=<weight>` pairs separated by `;`, `-` when empty. A
//! response line `error: <message>` fails the request with that message.

use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tracing::{debug, error};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{FeatureWeights, OptionSet, VariabilityModel};
use crate::domain::ports::{SatisfiabilityChecker, VariantGenerator};

const EMPTY_SET: &str = "-";
const NO_SOLUTION: &str = "none";
const ERROR_PREFIX: &str = "error:";

/// External solver process configuration.
#[derive(Debug, Clone)]
pub struct ProcessSolverConfig {
    /// Executable to spawn
    pub command: String,
    /// Arguments passed to the executable
    pub args: Vec<String>,
}

impl ProcessSolverConfig {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }
}

pub(crate) fn encode_set<'a, I>(options: I) -> String
where
    I: IntoIterator<Item = &'a String>,
{
    let names: Vec<&str> = options.into_iter().map(String::as_str).collect();
    if names.is_empty() {
        EMPTY_SET.to_string()
    } else {
        names.join(",")
    }
}

pub(crate) fn decode_set(raw: &str) -> OptionSet {
    let raw = raw.trim();
    if raw == EMPTY_SET {
        return OptionSet::new();
    }
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(ToString::to_string)
        .collect()
}

fn encode_weights(weights: &FeatureWeights) -> String {
    if weights.is_empty() {
        return EMPTY_SET.to_string();
    }
    weights
        .iter()
        .map(|(combination, weight)| format!("{}={weight}", encode_set(combination)))
        .collect::<Vec<_>>()
        .join(";")
}

/// A running solver process.
struct Session {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    stderr: Option<ChildStderr>,
}

impl Session {
    /// Send one request and read one response line.
    async fn request(&mut self, line: &str) -> DomainResult<String> {
        debug!(request = %line, "solver request");
        let written = async {
            self.stdin.write_all(line.as_bytes()).await?;
            self.stdin.write_all(b"\n").await?;
            self.stdin.flush().await
        }
        .await;
        if let Err(e) = written {
            return Err(self.failure(format!("failed to write request: {e}")).await);
        }

        let response = match self.stdout.next_line().await {
            Ok(Some(response)) => response,
            Ok(None) => return Err(self.failure("solver process closed its output").await),
            Err(e) => return Err(self.failure(format!("failed to read response: {e}")).await),
        };

        let response = response.trim().to_string();
        if let Some(message) = response.strip_prefix(ERROR_PREFIX) {
            return Err(self.failure(message.trim()).await);
        }
        Ok(response)
    }

    /// Kill the process and collect whatever it wrote to stderr.
    async fn failure(&mut self, message: impl Into<String>) -> DomainError {
        let message = message.into();
        let _ = self.child.start_kill();
        let mut diagnostics = String::new();
        if let Some(mut stderr) = self.stderr.take() {
            let _ = stderr.read_to_string(&mut diagnostics).await;
        }
        error!(%message, %diagnostics, "external solver failed");
        DomainError::Transport {
            message,
            diagnostics,
        }
    }
}

#[derive(Default)]
struct State {
    bound: Option<(String, String)>,
    session: Option<Session>,
}

/// Solver backend delegating to an external process.
pub struct ProcessSolver {
    config: ProcessSolverConfig,
    state: Mutex<State>,
}

impl ProcessSolver {
    pub fn new(config: ProcessSolverConfig) -> Self {
        Self {
            config,
            state: Mutex::new(State::default()),
        }
    }

    fn spawn(&self) -> DomainResult<Session> {
        let mut child = Command::new(&self.config.command)
            .args(&self.config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                DomainError::transport(format!(
                    "failed to spawn solver '{}': {e}",
                    self.config.command
                ))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| DomainError::transport("failed to capture solver stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DomainError::transport("failed to capture solver stdout"))?;
        let stderr = child.stderr.take();

        Ok(Session {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
            stderr,
        })
    }

    /// Send `line` for `model`, starting and binding the process on first use.
    async fn call(&self, model: &VariabilityModel, line: &str) -> DomainResult<String> {
        let mut state = self.state.lock().await;
        let key = model.cache_key();

        if let Some((bound_name, bound_key)) = &state.bound {
            if *bound_key != key {
                return Err(DomainError::ModelBinding {
                    bound: bound_name.clone(),
                    requested: model.name().to_string(),
                });
            }
        }

        if state.session.is_none() {
            let mut session = self.spawn()?;
            let path = model
                .path()
                .map_or_else(|| EMPTY_SET.to_string(), |p| p.display().to_string());
            let ack = session
                .request(&format!("model {} {path}", model.name()))
                .await?;
            if ack != "ok" {
                return Err(session
                    .failure(format!("unexpected response to model binding: {ack}"))
                    .await);
            }
            state.bound = Some((model.name().to_string(), key));
            state.session = Some(session);
        }

        let session = state
            .session
            .as_mut()
            .ok_or_else(|| DomainError::transport("solver session missing"))?;
        let result = session.request(line).await;
        if result.is_err() {
            state.session = None;
        }
        result
    }

    async fn malformed(&self, request: &str, response: &str) -> DomainError {
        let mut state = self.state.lock().await;
        let message = format!("malformed response to '{request}': {response}");
        match state.session.take() {
            Some(mut session) => session.failure(message).await,
            None => DomainError::transport(message),
        }
    }

    fn optional_set(response: &str) -> Option<OptionSet> {
        (response != NO_SOLUTION).then(|| decode_set(response))
    }
}

#[async_trait]
impl SatisfiabilityChecker for ProcessSolver {
    async fn is_satisfiable(
        &self,
        model: &VariabilityModel,
        selected: &OptionSet,
        partial: bool,
    ) -> DomainResult<bool> {
        let mode = if partial { "partial" } else { "full" };
        let request = format!("sat {mode} {}", encode_set(selected));
        let response = self.call(model, &request).await?;
        match response.as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(self.malformed(&request, other).await),
        }
    }
}

#[async_trait]
impl VariantGenerator for ProcessSolver {
    fn name(&self) -> &'static str {
        "process"
    }

    async fn find_minimal_completion(
        &self,
        model: &VariabilityModel,
        required: &OptionSet,
        avoid: &OptionSet,
    ) -> DomainResult<Option<OptionSet>> {
        let request = format!("complete {} {}", encode_set(required), encode_set(avoid));
        let response = self.call(model, &request).await?;
        Ok(Self::optional_set(&response))
    }

    async fn enumerate_up_to(
        &self,
        model: &VariabilityModel,
        n: i64,
    ) -> DomainResult<Vec<OptionSet>> {
        let response = self.call(model, &format!("enumerate {n}")).await?;
        if response == NO_SOLUTION || response.is_empty() {
            return Ok(Vec::new());
        }
        Ok(response.split(';').map(decode_set).collect())
    }

    async fn generate_bucket(
        &self,
        model: &VariabilityModel,
        selected_count: usize,
        weights: &FeatureWeights,
    ) -> DomainResult<Option<OptionSet>> {
        let request = format!("bucket {selected_count} {}", encode_weights(weights));
        let response = self.call(model, &request).await?;
        Ok(Self::optional_set(&response))
    }

    async fn reset_cache(&self) -> DomainResult<()> {
        let mut state = self.state.lock().await;
        // Nothing cached before the first request.
        let Some(session) = state.session.as_mut() else {
            return Ok(());
        };
        let err = match session.request("reset").await {
            Ok(ack) if ack == "ok" => return Ok(()),
            Ok(other) => {
                session
                    .failure(format!("malformed response to 'reset': {other}"))
                    .await
            }
            Err(e) => e,
        };
        state.session = None;
        Err(err)
    }
}
