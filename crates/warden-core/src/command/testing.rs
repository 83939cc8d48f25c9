//! Scripted in-memory client for exercising the state machine, dispatcher
//! and fetcher without a backend.

use std::collections::VecDeque;
use std::sync::Mutex;

use super::{CommandError, CommandId, CommandOutput, PrivilegedCommandClient};

#[derive(Default)]
pub(crate) struct ScriptedClient {
    responses: Mutex<VecDeque<Result<CommandOutput, CommandError>>>,
    calls: Mutex<Vec<(CommandId, Vec<String>)>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, exit_code: i32, stdout: &str, stderr: &str) -> &Self {
        self.responses.lock().unwrap().push_back(Ok(CommandOutput {
            exit_code,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        }));
        self
    }

    pub fn fail_with(&self, err: CommandError) -> &Self {
        self.responses.lock().unwrap().push_back(Err(err));
        self
    }

    pub fn calls(&self) -> Vec<(CommandId, Vec<String>)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn last_call(&self) -> Option<(CommandId, Vec<String>)> {
        self.calls.lock().unwrap().last().cloned()
    }
}

impl PrivilegedCommandClient for ScriptedClient {
    fn invoke(&self, command: CommandId, args: &[String]) -> Result<CommandOutput, CommandError> {
        self.calls.lock().unwrap().push((command, args.to_vec()));
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("no scripted response left for {command}"))
    }
}
