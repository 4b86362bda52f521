//! TCP client for the RouterOS binary API.
//!
//! Each operation opens a fresh authenticated session: connect, log in,
//! run one command, drop the socket. RouterOS sessions are cheap and a
//! fresh socket sidesteps every class of stale-connection bug on flaky
//! WISP links. Connection establishment retries a configured number of
//! times with a fixed delay before the operation is reported unreachable.

use async_trait::async_trait;
use secrecy::ExposeSecret;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::protocol::{decode_length, length_tail_size, Reply, ReplyKind, Sentence};
use crate::config::RouterConfig;
use crate::domain::device::RouterDevice;
use crate::ports::{CommandResult, RouterClient, RouterError, RouterRow};

// A single reply word will never legitimately approach this.
const MAX_WORD_LEN: u32 = 1 << 20;

/// RouterOS API client over TCP.
pub struct RouterOsClient {
    config: RouterConfig,
}

impl RouterOsClient {
    pub fn new(config: RouterConfig) -> Self {
        Self { config }
    }

    /// Connects with retry, then authenticates (post-6.43 plain login).
    async fn open_session(&self, device: &RouterDevice) -> Result<TcpStream, RouterError> {
        let mut stream = self.connect_with_retry(device).await?;
        self.login(&mut stream, device).await?;
        Ok(stream)
    }

    async fn connect_with_retry(&self, device: &RouterDevice) -> Result<TcpStream, RouterError> {
        let endpoint = device.endpoint();
        let mut last_error = String::new();

        for attempt in 1..=self.config.connect_attempts {
            match timeout(self.config.connect_timeout(), TcpStream::connect(&endpoint)).await {
                Ok(Ok(stream)) => {
                    debug!(device = %device.name, %endpoint, attempt, "router connected");
                    return Ok(stream);
                }
                Ok(Err(e)) => {
                    last_error = e.to_string();
                }
                Err(_) => {
                    last_error = format!(
                        "connect timed out after {}s",
                        self.config.connect_timeout_secs
                    );
                }
            }

            warn!(
                device = %device.name,
                %endpoint,
                attempt,
                error = %last_error,
                "router connect attempt failed"
            );
            if attempt < self.config.connect_attempts {
                tokio::time::sleep(self.config.retry_delay()).await;
            }
        }

        Err(RouterError::Unreachable(format!(
            "{endpoint}: {last_error}"
        )))
    }

    async fn login(
        &self,
        stream: &mut TcpStream,
        device: &RouterDevice,
    ) -> Result<(), RouterError> {
        let password = device
            .password()
            .ok_or_else(|| RouterError::AuthFailed("device credential not loaded".to_string()))?;

        let sentence = Sentence::command("/login")
            .attribute("name", &device.username)
            .attribute("password", password.expose_secret());

        self.write_sentence(stream, &sentence).await?;
        let reply = self.read_reply(stream).await?;

        match reply.kind {
            ReplyKind::Done => Ok(()),
            ReplyKind::Trap | ReplyKind::Fatal => Err(RouterError::AuthFailed(
                reply
                    .message()
                    .unwrap_or("device rejected login")
                    .to_string(),
            )),
            ReplyKind::Re => Err(RouterError::ProtocolError(
                "unexpected data reply to login".to_string(),
            )),
        }
    }

    async fn write_sentence(
        &self,
        stream: &mut TcpStream,
        sentence: &Sentence,
    ) -> Result<(), RouterError> {
        let bytes = sentence.encode();
        timeout(self.config.connect_timeout(), stream.write_all(&bytes))
            .await
            .map_err(|_| RouterError::Timeout("write timed out".to_string()))?
            .map_err(|e| RouterError::Unreachable(e.to_string()))?;
        Ok(())
    }

    /// Reads one reply sentence.
    async fn read_reply(&self, stream: &mut TcpStream) -> Result<Reply, RouterError> {
        let mut words = Vec::new();
        loop {
            let word = self.read_word(stream).await?;
            match word {
                Some(w) => words.push(w),
                None => break,
            }
        }
        Reply::parse(&words)
    }

    /// Reads one word; `None` marks the end of the sentence.
    async fn read_word(&self, stream: &mut TcpStream) -> Result<Option<String>, RouterError> {
        let first = self.read_exact(stream, 1).await?[0];
        let tail_size = length_tail_size(first)?;
        let tail = self.read_exact(stream, tail_size).await?;
        let len = decode_length(first, &tail)?;

        if len == 0 {
            return Ok(None);
        }
        if len > MAX_WORD_LEN {
            return Err(RouterError::ProtocolError(format!(
                "reply word of {len} bytes exceeds limit"
            )));
        }

        let bytes = self.read_exact(stream, len as usize).await?;
        let word = String::from_utf8(bytes)
            .map_err(|_| RouterError::ProtocolError("reply word is not UTF-8".to_string()))?;
        Ok(Some(word))
    }

    async fn read_exact(
        &self,
        stream: &mut TcpStream,
        len: usize,
    ) -> Result<Vec<u8>, RouterError> {
        let mut buf = vec![0u8; len];
        timeout(self.config.connect_timeout(), stream.read_exact(&mut buf))
            .await
            .map_err(|_| RouterError::Timeout("read timed out".to_string()))?
            .map_err(|e| RouterError::Unreachable(e.to_string()))?;
        Ok(buf)
    }

    /// Sends a command and collects all reply sentences through `!done`.
    async fn run(
        &self,
        stream: &mut TcpStream,
        sentence: &Sentence,
    ) -> Result<(Vec<Reply>, Reply), RouterError> {
        self.write_sentence(stream, sentence).await?;

        let mut rows = Vec::new();
        loop {
            let reply = self.read_reply(stream).await?;
            match reply.kind {
                ReplyKind::Re => rows.push(reply),
                ReplyKind::Done => return Ok((rows, reply)),
                ReplyKind::Trap => {
                    // A trap is followed by !done; drain it so the error
                    // carries the trap's message, not a short-read.
                    let message = reply
                        .message()
                        .unwrap_or("device reported an error")
                        .to_string();
                    let _ = self.read_reply(stream).await;
                    return Err(RouterError::ProtocolError(message));
                }
                ReplyKind::Fatal => {
                    return Err(RouterError::Unreachable(
                        reply
                            .message()
                            .unwrap_or("device closed the session")
                            .to_string(),
                    ))
                }
            }
        }
    }
}

#[async_trait]
impl RouterClient for RouterOsClient {
    async fn query(
        &self,
        device: &RouterDevice,
        path: &str,
        filters: &[(String, String)],
        fields: &[&str],
    ) -> Result<Vec<RouterRow>, RouterError> {
        let mut sentence = Sentence::command(format!("{path}/print")).proplist(fields);
        for (key, value) in filters {
            sentence = sentence.filter(key, value);
        }

        let mut stream = self.open_session(device).await?;
        let (rows, _done) = self.run(&mut stream, &sentence).await?;

        Ok(rows
            .into_iter()
            .map(|reply| reply.attributes.into_iter().collect())
            .collect())
    }

    async fn execute(
        &self,
        device: &RouterDevice,
        path: &str,
        params: &[(String, String)],
    ) -> Result<CommandResult, RouterError> {
        let mut sentence = Sentence::command(path);
        for (key, value) in params {
            sentence = sentence.attribute(key, value);
        }

        let mut stream = self.open_session(device).await?;
        let (_rows, done) = self.run(&mut stream, &sentence).await?;

        Ok(CommandResult {
            provider_id: done.attributes.get("ret").cloned(),
        })
    }
}
