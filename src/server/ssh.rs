//! SSH transport glue: accepts connections, authenticates, and on a `sftp` subsystem
//! request hands the channel off to [`super::sftp_handler::SftpConnectionHandler`].
//!
//! Grounded on the `SSHServer`/`SSHSession` split in the bnuystore SFTP front-end
//! (other_examples), adapted from its publickey-only auth to this engine's password-based
//! [`Authenticator`] and wired to the session lifecycle tracker.

use crate::auth::{Authenticator, User};
use crate::config::Config;
use crate::events::EventBus;
use crate::server::router::RequestContext;
use crate::server::sftp_handler::SftpConnectionHandler;
use crate::session::SessionManager;
use crate::store::ObjectStore;
use crate::upload::UploadClock;
use async_trait::async_trait;
use russh::server::{Auth, Handler, Msg, Server as RusshServerTrait, Session};
use russh::{Channel, ChannelId};
use ssh_key::private::PrivateKey;
use ssh_key::Algorithm;
use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use tracing_attributes::instrument;

#[derive(Debug, thiserror::Error)]
pub enum SshError {
    #[error("ssh transport error: {0}")]
    Russh(#[from] russh::Error),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("ssh key error: {0}")]
    Key(#[from] ssh_key::Error),
}

/// Loads the persisted ed25519 host key, generating and saving a fresh one on first boot.
pub fn load_or_generate_host_key(path: &str) -> Result<PrivateKey, SshError> {
    let path = Path::new(path);
    if path.exists() {
        debug!(?path, "loading existing host key");
        return Ok(PrivateKey::read_openssh_file(path)?);
    }
    info!(?path, "no host key found, generating a new ed25519 key");
    let key = PrivateKey::random(&mut rand::rngs::OsRng, Algorithm::Ed25519)?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    key.write_openssh_file(path, ssh_key::LineEnding::LF)?;
    Ok(key)
}

/// Shared state handed to every new connection's [`SshSession`].
pub struct SharedState {
    pub store: Arc<dyn ObjectStore>,
    pub authenticator: Arc<dyn Authenticator>,
    pub events: EventBus,
    pub upload_clock: Arc<UploadClock>,
    pub sessions: Arc<SessionManager>,
    pub config: Arc<Config>,
}

pub struct SshServer {
    pub state: Arc<SharedState>,
}

impl RusshServerTrait for SshServer {
    type Handler = SshSession;

    fn new_client(&mut self, client_addr: Option<SocketAddr>) -> SshSession {
        debug!(?client_addr, "accepted new SSH connection");
        SshSession {
            state: self.state.clone(),
            client_addr,
            user: None,
            open_channels: HashMap::new(),
        }
    }
}

pub struct SshSession {
    state: Arc<SharedState>,
    client_addr: Option<SocketAddr>,
    user: Option<User>,
    open_channels: HashMap<ChannelId, Channel<Msg>>,
}

impl std::fmt::Debug for SshSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SshSession(")?;
        match &self.user {
            Some(u) => write!(f, "{}", u.username)?,
            None => write!(f, "<unauthenticated>")?,
        }
        write!(f, "@{:?})", self.client_addr)
    }
}

#[async_trait]
impl Handler for SshSession {
    type Error = SshError;

    #[instrument(level = "debug", skip(self, password))]
    async fn auth_password(&mut self, user: &str, password: &str) -> Result<Auth, Self::Error> {
        match self.state.authenticator.authenticate(user, password).await {
            Ok(account) => {
                self.state.sessions.register(&account.username, crate::time::now_ms());
                self.user = Some(account);
                Ok(Auth::Accept)
            }
            Err(e) => {
                warn!(user, error = %e, "authentication failed");
                crate::metrics::inc_auth_failure();
                Ok(Auth::Reject { proceed_with_methods: None })
            }
        }
    }

    #[instrument(level = "trace", skip(self, channel, _session))]
    async fn channel_open_session(&mut self, channel: Channel<Msg>, _session: &mut Session) -> Result<bool, Self::Error> {
        self.open_channels.insert(channel.id(), channel);
        Ok(true)
    }

    #[instrument(level = "debug", skip(self, session))]
    async fn subsystem_request(&mut self, id: ChannelId, name: &str, session: &mut Session) -> Result<(), Self::Error> {
        let Some(user) = self.user.clone() else {
            session.channel_failure(id)?;
            error!("subsystem request on an unauthenticated channel");
            return Ok(());
        };

        if name != "sftp" {
            session.channel_failure(id)?;
            debug!(name, "rejecting unknown subsystem");
            return Ok(());
        }

        let Some(channel) = self.open_channels.remove(&id) else {
            session.channel_failure(id)?;
            return Ok(());
        };

        let username = user.username.clone();
        let ctx = RequestContext {
            store: self.state.store.clone(),
            events: self.state.events.clone(),
            upload_clock: self.state.upload_clock.clone(),
            sessions: self.state.sessions.clone(),
            user,
        };
        let connection = SftpConnectionHandler::new(ctx);
        let sessions = self.state.sessions.clone();
        let client_addr = self.client_addr;

        session.channel_success(id)?;
        tokio::spawn(async move {
            russh_sftp::server::run(channel.into_stream(), connection).await;
            debug!(username, ?client_addr, "sftp subsystem closed");
            sessions.end_session(&username, "client-closed");
        });
        Ok(())
    }
}
