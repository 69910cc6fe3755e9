//! Inbound connection handler.
//!
//! One [`Handler`] serves a listening port. Per accepted connection it runs
//! the pipeline: peek-classify, parse whichever handshake dressing the
//! client chose, authenticate by UUID, derive the session key, then loop
//! over encrypted frames — or hand anything unrecognized to the fallback
//! relay with its peeked bytes intact.

mod detect;
mod fallback;
mod handshake;

pub use detect::{classify, Classification};
pub use handshake::{ClientHandshake, ServerHandshake};

use std::sync::Arc;

use bytes::Bytes;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use uuid::Uuid;

use crate::config::{FallbackConfig, InboundConfig};
use crate::crypto::{derive_session_key, EphemeralSecret, PublicKey};
use crate::dispatch::{Destination, Dispatcher};
use crate::error::{Error, Result};
use crate::obfuscation::{
    apply_control_frame, write_frame_morphed, ProfileRegistry, TrafficProfile, DEFAULT_PROFILE,
};
use crate::session::{FrameType, Session};
use crate::user::{Account, User};
use crate::MIN_HANDSHAKE_PEEK;

use handshake::{
    content_length_from_line, decode_http_body, unix_now, write_forbidden, write_ok,
    MAGIC_FIXED_LEN,
};

/// The REFLEX inbound handler.
///
/// Cold state only: the accepted user set, the optional fallback target and
/// the profile registry, all fixed at construction. Everything per
/// connection lives on the [`process`](Handler::process) stack.
pub struct Handler {
    users: Vec<User>,
    fallback: Option<FallbackConfig>,
    profiles: ProfileRegistry,
    default_profile: Arc<TrafficProfile>,
}

impl Handler {
    /// Build a handler from its wire config.
    pub fn new(config: InboundConfig) -> Result<Self> {
        config.validate()?;

        let mut users = Vec::with_capacity(config.clients.len());
        for client in &config.clients {
            let id = Uuid::parse_str(&client.id)
                .map_err(|e| Error::config(format!("invalid client id {:?}: {e}", client.id)))?;
            users.push(User::reflex(id));
        }

        let profiles = ProfileRegistry::builtin();
        let profile_name = config.profile.as_deref().unwrap_or(DEFAULT_PROFILE);
        let default_profile = profiles
            .get(profile_name)
            .ok_or_else(|| Error::config(format!("unknown traffic profile {profile_name:?}")))?;

        Ok(Self {
            users,
            fallback: config.fallback,
            profiles,
            default_profile,
        })
    }

    /// The accepted users.
    pub fn users(&self) -> &[User] {
        &self.users
    }

    /// The handler's profile registry.
    pub fn profiles(&self) -> &ProfileRegistry {
        &self.profiles
    }

    /// Drive one accepted connection to completion.
    ///
    /// `dispatcher` carries DATA frames upstream; without one they are
    /// dropped. The connection is closed on every exit path.
    pub async fn process<S>(&self, stream: S, dispatcher: Option<Arc<dyn Dispatcher>>) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let mut reader = BufReader::new(stream);

        // Non-consuming peek: whatever one fill yields, capped at the
        // detection window. EOF before any bytes is a silent close.
        let classification = {
            let peeked = reader.fill_buf().await?;
            if peeked.is_empty() {
                return Ok(());
            }
            classify(&peeked[..peeked.len().min(MIN_HANDSHAKE_PEEK)])
        };

        match classification {
            Classification::Magic => self.handle_magic(reader, dispatcher).await,
            Classification::Http => self.handle_http(reader, dispatcher).await,
            Classification::Other => self.handle_fallback(reader).await,
        }
    }

    /// Binary path: magic, fixed block, then the length-prefixed policy.
    async fn handle_magic<S>(
        &self,
        mut reader: BufReader<S>,
        dispatcher: Option<Arc<dyn Dispatcher>>,
    ) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic).await?;

        let mut fixed = [0u8; MAGIC_FIXED_LEN];
        reader.read_exact(&mut fixed).await?;
        let (mut client_handshake, policy_len) = ClientHandshake::parse_fixed(&fixed);

        if policy_len > 0 {
            let mut policy = vec![0u8; policy_len];
            reader.read_exact(&mut policy).await?;
            client_handshake.policy_request = policy;
        }

        self.process_handshake(reader, dispatcher, client_handshake)
            .await
    }

    /// HTTP path: headers, Content-Length body, base64 JSON envelope.
    async fn handle_http<S>(
        &self,
        mut reader: BufReader<S>,
        dispatcher: Option<Arc<dyn Dispatcher>>,
    ) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let mut content_length: Option<usize> = None;
        let mut line = Vec::new();
        loop {
            line.clear();
            let n = reader.read_until(b'\n', &mut line).await?;
            if n == 0 {
                return Err(Error::ConnectionClosed);
            }
            if line == b"\r\n" {
                break;
            }
            if let Some(len) = content_length_from_line(&line) {
                content_length = Some(len);
            }
        }

        let content_length = match content_length {
            Some(len) if len > 0 => len,
            _ => return write_forbidden(&mut reader, "forbidden").await,
        };

        let mut body = vec![0u8; content_length];
        reader.read_exact(&mut body).await?;

        let client_handshake = match decode_http_body(&body)
            .and_then(|raw| ClientHandshake::from_bytes(&raw))
        {
            Ok(handshake) => handshake,
            Err(_) => return write_forbidden(&mut reader, "forbidden").await,
        };

        self.process_handshake(reader, dispatcher, client_handshake)
            .await
    }

    /// Shared tail of both handshake paths: freshness, key agreement,
    /// authentication, HTTP reply, session loop.
    async fn process_handshake<S>(
        &self,
        mut reader: BufReader<S>,
        dispatcher: Option<Arc<dyn Dispatcher>>,
        client_handshake: ClientHandshake,
    ) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        if !client_handshake.is_fresh(unix_now()) {
            return write_forbidden(&mut reader, "invalid timestamp").await;
        }

        let server_secret = EphemeralSecret::random();
        let server_public = PublicKey::from(&server_secret);
        let shared =
            server_secret.diffie_hellman(&PublicKey::from_bytes(client_handshake.public_key));
        let session_key = derive_session_key(&shared, &client_handshake.nonce);

        if self
            .authenticate(Uuid::from_bytes(client_handshake.user_id))
            .is_none()
        {
            return write_forbidden(&mut reader, "forbidden").await;
        }

        // Policy negotiation is a single echoed label; nothing granted yet.
        let reply = ServerHandshake::new(&server_public, None);
        write_ok(&mut reader, &reply).await?;

        let session = Session::from_key(session_key);
        self.run_session(reader, dispatcher, session).await
    }

    fn authenticate(&self, id: Uuid) -> Option<&User> {
        let candidate = Account::Reflex { id };
        self.users
            .iter()
            .find(|user| user.account.equals(&candidate))
    }

    /// Frame loop of an established session.
    async fn run_session<S>(
        &self,
        mut reader: BufReader<S>,
        dispatcher: Option<Arc<dyn Dispatcher>>,
        session: Session,
    ) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        loop {
            let frame = match session.read_frame(&mut reader).await {
                Ok(frame) => frame,
                Err(Error::ConnectionClosed) => return Ok(()),
                Err(e) => return Err(e),
            };

            match frame.frame_type {
                FrameType::Data => {
                    let Some(dispatcher) = dispatcher.as_deref() else {
                        continue;
                    };
                    // Fixed local destination; per-frame destination
                    // parsing is the extension point here.
                    let mut link = match dispatcher
                        .dispatch(Destination::new("127.0.0.1", 80))
                        .await
                    {
                        Ok(link) => link,
                        Err(_) => continue,
                    };
                    if link.write(vec![Bytes::from(frame.payload)]).await.is_err() {
                        continue;
                    }
                    let _ = link.close_write().await;
                    if let Ok(Some(upstream_reply)) = link.read().await {
                        if !upstream_reply.is_empty() {
                            write_frame_morphed(
                                &session,
                                &mut reader,
                                FrameType::Data,
                                &upstream_reply,
                                Some(self.default_profile.as_ref()),
                            )
                            .await?;
                        }
                    }
                }
                FrameType::PaddingCtrl | FrameType::TimingCtrl => {
                    apply_control_frame(&self.default_profile, frame.frame_type, &frame.payload);
                }
                FrameType::Unknown(_) => {}
            }
        }
    }

    /// OTHER traffic: splice to the fallback web server, or error out when
    /// none is configured.
    async fn handle_fallback<S>(&self, mut reader: BufReader<S>) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let Some(fallback) = self.fallback else {
            let _ = reader.shutdown().await;
            return Err(Error::NoFallback);
        };
        fallback::relay(reader, fallback.dest).await
    }
}
