//! Optional mailbox-existence probe: HELO, MAIL FROM, RCPT TO, QUIT.
//! No message is ever sent.
use std::io;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeSettings {
    pub helo_domain: String,
    pub sender: String,
    pub port: u16,
    /// Deadline for the whole handshake.
    pub timeout: Duration,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            helo_domain: "harvester.localdomain".to_string(),
            sender: "probe@harvester.localdomain".to_string(),
            port: 25,
            timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("mail handshake timed out")]
    Timeout,
    #[error("mail handshake io error: {0}")]
    Io(#[from] io::Error),
    #[error("unexpected reply to {step}: {reply}")]
    Protocol { step: &'static str, reply: String },
}

/// The mail-handshake capability used by the validator.
#[async_trait::async_trait]
pub trait MailboxProber: Send + Sync {
    /// Whether `exchange` accepts `address` as a recipient.
    async fn probe(&self, exchange: &str, address: &str) -> Result<bool, ProbeError>;
}

#[derive(Debug, Clone)]
pub struct SmtpProber {
    settings: ProbeSettings,
}

impl SmtpProber {
    pub fn new(settings: ProbeSettings) -> Self {
        Self { settings }
    }

    async fn handshake(&self, exchange: &str, address: &str) -> Result<bool, ProbeError> {
        let stream = TcpStream::connect((exchange, self.settings.port)).await?;
        let (read_half, mut writer) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        expect(&mut reader, "greeting", 220).await?;
        send(&mut writer, &format!("HELO {}", self.settings.helo_domain)).await?;
        expect(&mut reader, "HELO", 250).await?;
        send(&mut writer, &format!("MAIL FROM:<{}>", self.settings.sender)).await?;
        expect(&mut reader, "MAIL FROM", 250).await?;
        send(&mut writer, &format!("RCPT TO:<{address}>")).await?;
        let (code, _) = read_reply(&mut reader).await?;

        // Best effort; the verdict is already known.
        let _ = send(&mut writer, "QUIT").await;
        Ok(matches!(code, 250 | 251))
    }
}

#[async_trait::async_trait]
impl MailboxProber for SmtpProber {
    async fn probe(&self, exchange: &str, address: &str) -> Result<bool, ProbeError> {
        tokio::time::timeout(self.settings.timeout, self.handshake(exchange, address))
            .await
            .map_err(|_| ProbeError::Timeout)?
    }
}

async fn send<W: AsyncWrite + Unpin>(writer: &mut W, command: &str) -> Result<(), ProbeError> {
    writer.write_all(command.as_bytes()).await?;
    writer.write_all(b"\r\n").await?;
    writer.flush().await?;
    Ok(())
}

async fn expect<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    step: &'static str,
    code: u16,
) -> Result<(), ProbeError> {
    let (got, text) = read_reply(reader).await?;
    if got == code {
        Ok(())
    } else {
        Err(ProbeError::Protocol { step, reply: text })
    }
}

/// Read one possibly multi-line reply; returns its code and last line.
async fn read_reply<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<(u16, String), ProbeError> {
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).await? == 0 {
            return Err(ProbeError::Protocol {
                step: "reply",
                reply: "connection closed".to_string(),
            });
        }
        let line = line.trim_end().to_string();
        // "250-..." continues, "250 ..." or bare "250" ends the reply.
        if line.as_bytes().get(3) == Some(&b'-') {
            continue;
        }
        let code = line
            .get(..3)
            .and_then(|digits| digits.parse::<u16>().ok())
            .ok_or_else(|| ProbeError::Protocol {
                step: "reply",
                reply: line.clone(),
            })?;
        return Ok((code, line));
    }
}
