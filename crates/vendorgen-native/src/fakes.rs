//! Scripted runner for tests
//!
//! `ScriptedRunner` satisfies [`CommandRunner`] without spawning anything:
//! each invocation is matched against registered responses and recorded, so
//! extraction and orchestration logic can be exercised against captured build
//! logs.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::invocation::Invocation;
use crate::runner::{CommandOutput, CommandRunner};
use crate::Result;

/// Side effect applied when a scripted response fires, e.g. populating the
/// directory a fake `git clone` was asked to create.
pub type Effect = Box<dyn Fn(&Invocation) -> std::io::Result<()> + Send + Sync>;

struct Response {
    program: String,
    prefix: Vec<String>,
    /// Only match invocations whose working directory ends with this.
    cwd: Option<PathBuf>,
    output: CommandOutput,
    effect: Option<Effect>,
}

impl Response {
    fn new(program: &str, prefix: &[&str], output: CommandOutput) -> Self {
        Self {
            program: program.to_string(),
            prefix: prefix.iter().map(|s| s.to_string()).collect(),
            cwd: None,
            output,
            effect: None,
        }
    }

    fn matches(&self, invocation: &Invocation) -> bool {
        let prefix: Vec<&str> = self.prefix.iter().map(String::as_str).collect();
        let in_dir = match (&self.cwd, &invocation.cwd) {
            (None, _) => true,
            (Some(want), Some(cwd)) => cwd.ends_with(want),
            (Some(_), None) => false,
        };
        in_dir && invocation.matches(&self.program, &prefix)
    }
}

/// In-memory [`CommandRunner`] answering from a script.
///
/// Responses registered later take precedence over earlier ones. Unmatched
/// invocations succeed with empty output unless the runner is [`strict`].
///
/// [`strict`]: ScriptedRunner::strict
#[derive(Default)]
pub struct ScriptedRunner {
    responses: Vec<Response>,
    strict: bool,
    calls: Mutex<Vec<Invocation>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail unmatched invocations with exit code 127.
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    /// Answer `program prefix...` with `output`.
    pub fn respond(mut self, program: &str, prefix: &[&str], output: CommandOutput) -> Self {
        self.responses.push(Response::new(program, prefix, output));
        self
    }

    /// Like [`respond`](Self::respond), but only for invocations running in
    /// a directory ending with `dir`.
    pub fn respond_in(
        mut self,
        dir: impl AsRef<Path>,
        program: &str,
        prefix: &[&str],
        output: CommandOutput,
    ) -> Self {
        let mut response = Response::new(program, prefix, output);
        response.cwd = Some(dir.as_ref().to_path_buf());
        self.responses.push(response);
        self
    }

    /// Answer `program prefix...` with `output` after running `effect`.
    pub fn respond_with<F>(
        mut self,
        program: &str,
        prefix: &[&str],
        output: CommandOutput,
        effect: F,
    ) -> Self
    where
        F: Fn(&Invocation) -> std::io::Result<()> + Send + Sync + 'static,
    {
        let mut response = Response::new(program, prefix, output);
        response.effect = Some(Box::new(effect));
        self.responses.push(response);
        self
    }

    /// Every invocation seen so far, in order.
    pub fn calls(&self) -> Vec<Invocation> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of recorded invocations matching `program prefix...`.
    pub fn count(&self, program: &str, prefix: &[&str]) -> usize {
        self.calls()
            .iter()
            .filter(|inv| inv.matches(program, prefix))
            .count()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(invocation.clone());

        match self.responses.iter().rev().find(|r| r.matches(invocation)) {
            Some(response) => {
                if let Some(effect) = &response.effect {
                    effect(invocation)?;
                }
                Ok(response.output.clone())
            }
            None if self.strict => Ok(CommandOutput::failed(
                127,
                format!("no scripted response for `{}`", invocation),
            )),
            None => Ok(CommandOutput::default()),
        }
    }
}
