//! Console state management for Warden.
//!
//! `App` owns the operator's session context and the shared command client
//! wrappers. Every backend call runs on a blocking worker; list fetches,
//! admin commands and server operations report back through an MPSC channel
//! and are applied by the main loop, which keeps reading operator input in
//! the meantime. Login is the exception: it is awaited directly, since
//! nothing else can happen before it completes.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};

use anyhow::{anyhow, Result};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use warden_core::models::{EntryRef, Listing, ListingKind};
use warden_core::{
    AdminDispatcher, AuthController, Config, LoginOutcome, NewUser, OtpOutcome, PortalError, Privilege,
    PrivilegedCommandClient, ReadModelFetcher, ServerError, ServerSupervisor, Session, SessionContext,
    ShutdownOutcome,
};

use crate::input::{self, ConsoleCommand, ServerCommand, Target, HELP};
use crate::prompt::{parse_yes_no, InputReader, Prompt};
use crate::render;

// ============================================================================
// Constants
// ============================================================================

/// Buffer size for the background task message channel.
const CHANNEL_BUFFER_SIZE: usize = 32;

const PROMPT: &str = "warden> ";

/// Environment variable holding the default login username.
pub const USERNAME_ENV: &str = "WARDEN_USERNAME";

const LOCKED_OUT_MESSAGE: &str = "Maximum login attempts exceeded. Access denied.";
const READ_ONLY_MESSAGE: &str = "Root privileges required for user administration.";
const NO_LISTING_MESSAGE: &str = "No list loaded. Try 'users', 'sessions' or 'attempts'.";

// ============================================================================
// Background results
// ============================================================================

/// What to do after a successful admin command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Effect {
    /// Fetch the current listing again.
    Refresh,
    /// The operator's own session is gone.
    EndConsole,
}

#[derive(Debug)]
enum ServerEvent {
    Started(Result<u32, ServerError>),
    Stopped(Result<ShutdownOutcome, ServerError>),
    Killed(Result<(), ServerError>),
}

/// Results sent from blocking workers back to the main loop.
#[derive(Debug)]
enum TaskResult {
    Fetched(ListingKind, Result<Listing, PortalError>),
    Mutation {
        label: String,
        effect: Effect,
        result: Result<(), PortalError>,
    },
    Server(ServerEvent),
}

enum LoopEvent {
    Input(Result<Option<String>>),
    Task(TaskResult),
}

// ============================================================================
// Login
// ============================================================================

/// Where a single login round left the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginStep {
    Authenticated,
    /// A one-time code must be entered next.
    NeedCode,
    /// Back to the credentials prompt.
    Retry,
    LockedOut,
}

/// How the login phase ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginResult {
    Authenticated,
    LockedOut,
    /// Input closed before a login succeeded.
    Cancelled,
}

#[derive(Debug, Clone, Copy)]
enum TargetUse {
    Action,
    Logout,
}

// ============================================================================
// Main Application Struct
// ============================================================================

pub struct App<C> {
    config: Config,
    config_path: PathBuf,
    ctx: SessionContext,

    auth: Arc<Mutex<AuthController<C>>>,
    dispatcher: Arc<AdminDispatcher<C>>,
    fetcher: Arc<ReadModelFetcher<C>>,
    server: Arc<Mutex<ServerSupervisor>>,

    listing: Option<Listing>,
    query: String,

    tx: mpsc::Sender<TaskResult>,
    rx: mpsc::Receiver<TaskResult>,
    pending: usize,

    messages: Vec<String>,
    awaiting_force_stop: bool,
    session_revoked: bool,
    quitting: bool,
}

impl<C> App<C>
where
    C: PrivilegedCommandClient + Clone + 'static,
{
    pub fn new(config: Config, config_path: PathBuf, client: C) -> Result<Self> {
        let server = ServerSupervisor::new(
            config.interpreter(),
            config.resolved_app_root()?,
            config.server_entry()?,
        );
        debug!(entry = %server.entry().display(), "Server supervisor configured");

        let (tx, rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);

        Ok(Self {
            auth: Arc::new(Mutex::new(AuthController::new(client.clone()))),
            dispatcher: Arc::new(AdminDispatcher::new(client.clone())),
            fetcher: Arc::new(ReadModelFetcher::new(client)),
            server: Arc::new(Mutex::new(server)),
            config,
            config_path,
            ctx: SessionContext::new(),
            listing: None,
            query: String::new(),
            tx,
            rx,
            pending: 0,
            messages: Vec::new(),
            awaiting_force_stop: false,
            session_revoked: false,
            quitting: false,
        })
    }

    // =========================================================================
    // Login
    // =========================================================================

    /// Interactive login loop. Returns once authenticated, locked out, or
    /// when input ends.
    pub async fn login(&mut self, input: &mut InputReader) -> Result<LoginResult> {
        lock(&self.auth).begin();
        let default_username = std::env::var(USERNAME_ENV)
            .ok()
            .filter(|name| !name.trim().is_empty())
            .or_else(|| self.config.last_username.clone());

        loop {
            self.flush();
            let label = match &default_username {
                Some(name) => format!("Username [{}]: ", name),
                None => "Username: ".to_string(),
            };
            let Some(entered) = input.ask_line(&label).await? else {
                return Ok(LoginResult::Cancelled);
            };
            let username = match entered.trim() {
                "" => default_username.clone().unwrap_or_default(),
                name => name.to_string(),
            };
            let Some(password) = input.ask_secret("Password: ").await? else {
                return Ok(LoginResult::Cancelled);
            };

            let mut step = self.attempt_login(&username, &password).await?;
            while step == LoginStep::NeedCode {
                self.flush();
                let Some(code) = input.ask_line("Authentication code: ").await? else {
                    return Ok(LoginResult::Cancelled);
                };
                step = self.submit_otp(&username, &password, &code).await?;
            }

            self.flush();
            match step {
                LoginStep::Authenticated => return Ok(LoginResult::Authenticated),
                LoginStep::LockedOut => return Ok(LoginResult::LockedOut),
                LoginStep::Retry | LoginStep::NeedCode => {}
            }
        }
    }

    /// One primary login round.
    pub async fn attempt_login(&mut self, username: &str, password: &str) -> Result<LoginStep> {
        let auth = Arc::clone(&self.auth);
        let mut ctx = self.ctx.clone();
        let (user, pass) = (username.to_string(), password.to_string());
        let (ctx, result) = run_blocking(move || {
            let result = lock(&auth).login(&mut ctx, &user, &pass);
            (ctx, result)
        })
        .await?;
        self.ctx = ctx;

        let step = match result {
            Ok(LoginOutcome::Success(privilege)) => self.on_authenticated(username, privilege),
            Ok(LoginOutcome::NeedOtp) => {
                self.say("Two-factor authentication required.");
                LoginStep::NeedCode
            }
            Ok(LoginOutcome::NeedOtpEnrollment { payload }) => {
                self.say("Two-factor enrollment required. Add this to your authenticator app:");
                self.say(payload.trim_end());
                LoginStep::NeedCode
            }
            Ok(LoginOutcome::Failure { remaining, .. }) => {
                self.say(format!("Invalid credentials. {} attempt(s) remaining.", remaining));
                LoginStep::Retry
            }
            Ok(LoginOutcome::LockedOut) | Err(PortalError::LockedOut) => {
                self.say(LOCKED_OUT_MESSAGE);
                LoginStep::LockedOut
            }
            Err(e) => {
                warn!(error = %e, "Login error");
                self.say(format!("Error: {}", e));
                LoginStep::Retry
            }
        };
        Ok(step)
    }

    /// Verify a one-time code for the pending login.
    pub async fn submit_otp(&mut self, username: &str, password: &str, code: &str) -> Result<LoginStep> {
        let auth = Arc::clone(&self.auth);
        let mut ctx = self.ctx.clone();
        let (user, pass, otp) = (username.to_string(), password.to_string(), code.to_string());
        let (ctx, result) = run_blocking(move || {
            let result = lock(&auth).verify_otp(&mut ctx, &user, &pass, &otp);
            (ctx, result)
        })
        .await?;
        self.ctx = ctx;

        let step = match result {
            Ok(OtpOutcome::Success(privilege)) => self.on_authenticated(username, privilege),
            Ok(OtpOutcome::Rejected) => {
                self.say("Invalid 2FA code.");
                LoginStep::Retry
            }
            Err(PortalError::LockedOut) => {
                self.say(LOCKED_OUT_MESSAGE);
                LoginStep::LockedOut
            }
            Err(e) => {
                warn!(error = %e, "Code verification error");
                self.say(format!("Error: {}", e));
                LoginStep::Retry
            }
        };
        Ok(step)
    }

    fn on_authenticated(&mut self, username: &str, privilege: Privilege) -> LoginStep {
        self.remember_username(username.trim());
        match privilege {
            Privilege::Root => self.say("Login successful. Type 'help' for commands."),
            Privilege::Standard => {
                self.say("Login successful. You do not have developer/root privileges; only 'server', 'whoami' and 'quit' are available.")
            }
        }
        LoginStep::Authenticated
    }

    /// Persist the username only, so environment overrides never reach the file.
    fn remember_username(&mut self, username: &str) {
        self.config.last_username = Some(username.to_string());
        let mut stored = match Config::load_from(&self.config_path) {
            Ok(stored) => stored,
            Err(e) => {
                warn!(error = %e, "Not saving username, config file unreadable");
                return;
            }
        };
        stored.last_username = Some(username.to_string());
        if let Err(e) = stored.save_to(&self.config_path) {
            warn!(error = %e, "Failed to save config");
        }
    }

    // =========================================================================
    // Main loop
    // =========================================================================

    pub async fn run(&mut self, input: &mut InputReader) -> Result<()> {
        if self.ctx.is_root() {
            if let Err(e) = self.load_fresh(ListingKind::Users) {
                self.say(format!("Error: {}", e));
            }
        }

        while !self.quitting {
            self.flush();
            input.request(Prompt::Line(PROMPT.to_string()))?;

            let event = tokio::select! {
                line = input.next() => LoopEvent::Input(line),
                Some(result) = self.rx.recv() => LoopEvent::Task(result),
            };

            match event {
                LoopEvent::Input(line) => match line? {
                    Some(line) => self.handle_line(&line, input).await?,
                    None => self.quitting = true,
                },
                LoopEvent::Task(result) => self.apply(result),
            }
        }

        self.shutdown(input).await?;
        self.flush();
        Ok(())
    }

    pub async fn handle_line(&mut self, line: &str, input: &mut InputReader) -> Result<()> {
        if self.awaiting_force_stop {
            self.awaiting_force_stop = false;
            if parse_yes_no(Some(line), false) {
                self.server_force_stop();
            } else {
                self.say("Server left running.");
            }
            return Ok(());
        }

        let command = match input::parse(line) {
            Ok(Some(command)) => command,
            Ok(None) => return Ok(()),
            Err(message) => {
                self.say(message);
                return Ok(());
            }
        };

        if !self.ctx.is_root() && !command.allowed_for_standard() {
            self.say(READ_ONLY_MESSAGE);
            return Ok(());
        }

        self.dispatch(command, input).await
    }

    async fn dispatch(&mut self, command: ConsoleCommand, input: &mut InputReader) -> Result<()> {
        let outcome = match command {
            ConsoleCommand::Users => self.load_fresh(ListingKind::Users),
            ConsoleCommand::Sessions => self.load_fresh(ListingKind::Sessions),
            ConsoleCommand::Attempts => self.load_fresh(ListingKind::Attempts),
            ConsoleCommand::Refresh => match self.listing.as_ref().map(Listing::kind) {
                Some(kind) => self.load(kind),
                None => {
                    self.say(NO_LISTING_MESSAGE);
                    Ok(())
                }
            },
            ConsoleCommand::Find(query) => {
                self.query = query;
                self.show_listing();
                Ok(())
            }
            ConsoleCommand::Show(target) => {
                let text = match self.find_entry(&target) {
                    Ok(entry) => render::render_entry(entry),
                    Err(message) => message,
                };
                self.say(text);
                Ok(())
            }
            ConsoleCommand::Action(action, target) => match self.resolve(&target, TargetUse::Action) {
                Ok(user_id) => self.mutate(action.description(), Effect::Refresh, move |admin, session| {
                    admin.execute(session, action, &user_id)
                }),
                Err(message) => {
                    self.say(message);
                    Ok(())
                }
            },
            ConsoleCommand::Logout(target) => match self.resolve(&target, TargetUse::Logout) {
                Ok(user_id) => self.mutate("Logout", Effect::Refresh, move |admin, session| {
                    admin.logout_session(session, &user_id)
                }),
                Err(message) => {
                    self.say(message);
                    Ok(())
                }
            },
            ConsoleCommand::LogoutAll => {
                if input.confirm("Revoke every session, including this one?", false).await? {
                    self.mutate("Logout all", Effect::EndConsole, |admin, session| admin.logout_all(session))
                } else {
                    Ok(())
                }
            }
            ConsoleCommand::ClearAllAttempts => self.mutate("Clear all attempts", Effect::Refresh, |admin, session| {
                admin.clear_all_attempts(session)
            }),
            ConsoleCommand::CreateUser => match self.prompt_new_user(input).await? {
                Some(user) => {
                    let label = format!("Create user {}", user.username.trim());
                    self.mutate(label, Effect::Refresh, move |admin, session| admin.create_user(session, &user))
                }
                None => Ok(()),
            },
            ConsoleCommand::Server(ServerCommand::Start) => {
                self.server_start();
                Ok(())
            }
            ConsoleCommand::Server(ServerCommand::Stop) => {
                self.server_stop();
                Ok(())
            }
            ConsoleCommand::Server(ServerCommand::Status) => {
                self.server_status();
                Ok(())
            }
            ConsoleCommand::WhoAmI => {
                let text = match self.ctx.session() {
                    Some(session) => render::render_session(session, self.ctx.privilege()),
                    None => PortalError::NotAuthenticated.to_string(),
                };
                self.say(text);
                Ok(())
            }
            ConsoleCommand::Help => {
                self.say(HELP);
                Ok(())
            }
            ConsoleCommand::Quit => {
                self.quitting = true;
                Ok(())
            }
        };

        if let Err(e) = outcome {
            self.say(format!("Error: {}", e));
        }
        Ok(())
    }

    async fn prompt_new_user(&mut self, input: &mut InputReader) -> Result<Option<NewUser>> {
        let Some(username) = input.ask_line("New username: ").await? else {
            return Ok(None);
        };
        let Some(password) = input.ask_secret("New password: ").await? else {
            return Ok(None);
        };
        if username.trim().is_empty() || password.trim().is_empty() {
            self.say("Username and password are required.");
            return Ok(None);
        }

        let first_name = input.ask_line("First name (optional): ").await?;
        let last_name = input.ask_line("Last name (optional): ").await?;
        let dev_admin = input.confirm("Developer admin?", false).await?;
        let root_auth = input.confirm("Root access?", false).await?;
        let app_admin = input.confirm("App admin?", false).await?;

        let nonblank = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
        Ok(Some(NewUser {
            first_name: nonblank(first_name),
            last_name: nonblank(last_name),
            dev_admin,
            root_auth,
            app_admin,
            ..NewUser::new(username.trim(), password)
        }))
    }

    // =========================================================================
    // Background tasks
    // =========================================================================

    fn spawn_task<F>(&mut self, task: F)
    where
        F: FnOnce() -> TaskResult + Send + 'static,
    {
        let tx = self.tx.clone();
        self.pending += 1;
        tokio::task::spawn_blocking(move || {
            if tx.blocking_send(task()).is_err() {
                debug!("Console closed before task finished");
            }
        });
    }

    /// Fetch a listing, dropping any filter from the previous one.
    fn load_fresh(&mut self, kind: ListingKind) -> Result<(), PortalError> {
        self.query.clear();
        self.load(kind)
    }

    fn load(&mut self, kind: ListingKind) -> Result<(), PortalError> {
        let session = self.ctx.require_root()?.clone();
        let fetcher = Arc::clone(&self.fetcher);
        debug!(%kind, "Fetching listing");
        self.spawn_task(move || TaskResult::Fetched(kind, fetcher.fetch_listing(&session, kind)));
        Ok(())
    }

    fn mutate<F>(&mut self, label: impl Into<String>, effect: Effect, op: F) -> Result<(), PortalError>
    where
        F: FnOnce(&AdminDispatcher<C>, &Session) -> Result<(), PortalError> + Send + 'static,
    {
        let session = self.ctx.require_root()?.clone();
        let dispatcher = Arc::clone(&self.dispatcher);
        let label = label.into();
        self.spawn_task(move || TaskResult::Mutation {
            result: op(&dispatcher, &session),
            label,
            effect,
        });
        Ok(())
    }

    fn server_start(&mut self) {
        let server = Arc::clone(&self.server);
        self.spawn_task(move || TaskResult::Server(ServerEvent::Started(lock(&server).start())));
    }

    fn server_stop(&mut self) {
        let server = Arc::clone(&self.server);
        self.say("Stopping server...");
        self.spawn_task(move || TaskResult::Server(ServerEvent::Stopped(lock(&server).request_shutdown())));
    }

    fn server_force_stop(&mut self) {
        let server = Arc::clone(&self.server);
        self.spawn_task(move || TaskResult::Server(ServerEvent::Killed(lock(&server).force_stop())));
    }

    fn server_status(&mut self) {
        let status = match self.server.try_lock() {
            Ok(mut server) => describe_server(&mut server),
            Err(TryLockError::Poisoned(poisoned)) => describe_server(&mut poisoned.into_inner()),
            Err(TryLockError::WouldBlock) => "Server operation in progress.".to_string(),
        };
        self.say(status);
    }

    /// Apply one background result to the console state.
    fn apply(&mut self, result: TaskResult) {
        self.pending = self.pending.saturating_sub(1);

        match result {
            TaskResult::Fetched(_, Ok(listing)) => {
                self.listing = Some(listing);
                self.show_listing();
            }
            TaskResult::Fetched(kind, Err(e)) => {
                warn!(%kind, error = %e, "Fetch failed");
                self.say(format!("Error: {}", e));
            }
            TaskResult::Mutation { label, effect, result: Ok(()) } => {
                info!(%label, "Admin command succeeded");
                self.say(format!("{}: done.", label));
                match effect {
                    Effect::Refresh => {
                        if let Some(kind) = self.listing.as_ref().map(Listing::kind) {
                            if let Err(e) = self.load(kind) {
                                self.say(format!("Error: {}", e));
                            }
                        }
                    }
                    Effect::EndConsole => {
                        self.say("All sessions revoked. Closing the console.");
                        self.session_revoked = true;
                        self.quitting = true;
                    }
                }
            }
            TaskResult::Mutation { label, result: Err(e), .. } => {
                self.say(format!("{} failed: {}", label, e));
            }
            TaskResult::Server(ServerEvent::Started(Ok(pid))) => {
                self.say(format!("Server started (pid {}).", pid));
            }
            TaskResult::Server(ServerEvent::Started(Err(e))) => {
                self.say(format!("Error starting server: {}", e));
            }
            TaskResult::Server(ServerEvent::Stopped(Ok(ShutdownOutcome::Exited))) => {
                self.say("Server stopped.");
            }
            TaskResult::Server(ServerEvent::Stopped(Ok(ShutdownOutcome::StillRunning))) => {
                self.awaiting_force_stop = true;
                self.say("Server did not respond to shutdown request. Force termination? [y/N]");
            }
            TaskResult::Server(ServerEvent::Stopped(Err(e)) | ServerEvent::Killed(Err(e))) => {
                self.say(format!("Error stopping server: {}", e));
            }
            TaskResult::Server(ServerEvent::Killed(Ok(()))) => {
                self.say("Server terminated.");
            }
        }
    }

    /// Stop the server if it is running and revoke the operator's session.
    ///
    /// A server that ignores the shutdown request is only killed if the
    /// operator agrees; otherwise it is left running.
    pub async fn shutdown(&mut self, input: &mut InputReader) -> Result<()> {
        let server = Arc::clone(&self.server);
        let stopped = run_blocking(move || {
            let mut server = lock(&server);
            if !server.is_running() {
                return None;
            }
            Some(server.request_shutdown())
        })
        .await?;
        match stopped {
            Some(Ok(ShutdownOutcome::Exited)) => self.say("Server stopped."),
            Some(Ok(ShutdownOutcome::StillRunning) | Err(_)) => {
                self.say("Server did not respond to shutdown request.");
                self.flush();
                let server = Arc::clone(&self.server);
                if input.confirm("Force termination?", false).await? {
                    match run_blocking(move || lock(&server).force_stop()).await? {
                        Ok(()) => self.say("Server terminated."),
                        Err(e) => {
                            warn!(error = %e, "Failed to stop server");
                            self.say(format!("Error stopping server: {}", e));
                        }
                    }
                } else if let Some(pid) = lock(&server).detach() {
                    self.say(format!("Server left running (pid {}).", pid));
                }
            }
            None => {}
        }

        if self.session_revoked {
            return Ok(());
        }
        let Ok(session) = self.ctx.require_session().cloned() else {
            return Ok(());
        };
        let dispatcher = Arc::clone(&self.dispatcher);
        match run_blocking(move || dispatcher.logout_self(&session)).await? {
            Ok(()) => {
                self.session_revoked = true;
                info!("Own session revoked");
            }
            Err(e) => warn!(error = %e, "Failed to revoke own session"),
        }
        Ok(())
    }

    // =========================================================================
    // Listing helpers
    // =========================================================================

    fn show_listing(&mut self) {
        let Some(listing) = self.listing.as_ref() else {
            self.say(NO_LISTING_MESSAGE);
            return;
        };
        let rows: Vec<usize> = if self.query.trim().is_empty() {
            (0..listing.len()).collect()
        } else {
            listing.search(&self.query).into_iter().map(|(index, _)| index).collect()
        };
        let text = render::render_listing(listing, &rows);
        self.say(text);
    }

    fn find_entry(&self, target: &Target) -> Result<EntryRef<'_>, String> {
        let listing = self.listing.as_ref().ok_or_else(|| NO_LISTING_MESSAGE.to_string())?;
        match target {
            Target::Row(row) => listing
                .get(row - 1)
                .ok_or_else(|| format!("No row {} in the {} list.", row, listing.kind())),
            Target::Id(id) => listing
                .entries()
                .into_iter()
                .find(|entry| {
                    entry.action_target() == Some(id.as_str()) || entry.logout_target() == Some(id.as_str())
                })
                .ok_or_else(|| format!("No entry with id {} in the {} list.", id, listing.kind())),
        }
    }

    /// User id a command applies to.
    fn resolve(&self, target: &Target, usage: TargetUse) -> Result<String, String> {
        let row = match target {
            Target::Id(id) => return Ok(id.clone()),
            Target::Row(row) => *row,
        };
        let entry = self.find_entry(target)?;
        let id = match usage {
            TargetUse::Action => entry.action_target(),
            TargetUse::Logout => entry.logout_target(),
        };
        id.map(str::to_string).ok_or_else(|| match usage {
            TargetUse::Action => format!("Row {} is not a user. Run 'users' first.", row),
            TargetUse::Logout => format!("Row {} has no user to log out.", row),
        })
    }

    // =========================================================================
    // Output
    // =========================================================================

    fn say(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    pub fn take_messages(&mut self) -> Vec<String> {
        std::mem::take(&mut self.messages)
    }

    fn flush(&mut self) {
        for message in self.take_messages() {
            println!("{}", message);
        }
    }
}

fn describe_server(server: &mut ServerSupervisor) -> String {
    match server.pid() {
        Some(pid) => format!("Server running (pid {}).", pid),
        None => "Server stopped.".to_string(),
    }
}

/// Lock a mutex, recovering the data if a worker panicked while holding it.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| anyhow!("Background task failed: {}", e))
}
