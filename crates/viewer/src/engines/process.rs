//! An engine running as a child process.
//!
//! Requests are single lines on the child's stdin, `start <driver>
//! <strategy>` or `tick`. Every request is answered by exactly one line on
//! its stdout: a JSON snapshot, or `error <message>`.

use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use trainmap_core::engine::{EngineError, SimulationEngine};
use trainmap_network::RunConfig;

pub struct ProcessEngine {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    started: bool,
}

impl ProcessEngine {
    /// Spawn `command`, split on whitespace into program and arguments.
    pub fn spawn(command: &str) -> Result<Self, EngineError> {
        let mut parts = command.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| EngineError::Protocol("empty engine command".to_owned()))?;

        let mut child = Command::new(program)
            .args(parts)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()?;

        let stdin = child.stdin.take().ok_or(EngineError::Closed)?;
        let stdout = child.stdout.take().ok_or(EngineError::Closed)?;
        tracing::info!(command, pid = child.id(), "spawned engine");

        Ok(Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
            started: false,
        })
    }

    fn request(&mut self, line: &str) -> Result<String, EngineError> {
        writeln!(self.stdin, "{line}")?;
        self.stdin.flush()?;

        let mut response = String::new();
        if self.stdout.read_line(&mut response)? == 0 {
            return Err(EngineError::Closed);
        }

        let response = response.trim_end();
        match response.strip_prefix("error ") {
            Some(message) => Err(EngineError::Protocol(message.to_owned())),
            None => Ok(response.to_owned()),
        }
    }
}

impl SimulationEngine for ProcessEngine {
    fn initialize(&mut self, config: &RunConfig) -> Result<String, EngineError> {
        let snapshot = self.request(&format!(
            "start {} {}",
            config.driver_behavior, config.station_strategy
        ))?;
        self.started = true;
        Ok(snapshot)
    }

    fn step(&mut self) -> Result<String, EngineError> {
        if !self.started {
            return Err(EngineError::NotInitialized);
        }
        self.request("tick")
    }
}

impl Drop for ProcessEngine {
    fn drop(&mut self) {
        if let Err(error) = self.child.kill() {
            tracing::debug!(%error, "engine already exited");
        }
        let _ = self.child.wait();
    }
}
