//! 驱动认证状态机的输入端。

use std::io;

use secrecy::SecretString;

use super::{AuthSession, Notice, Prompt, Step};
use crate::crypto::SessionKey;
use crate::error::{Result, VaultError};

pub trait Prompter {
    fn read_secret(&mut self, prompt: Prompt) -> io::Result<SecretString>;
    fn notify(&mut self, notice: &Notice);
}

/// 终端输入，不回显
#[derive(Debug, Default)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn read_secret(&mut self, prompt: Prompt) -> io::Result<SecretString> {
        rpassword::prompt_password(prompt.label()).map(SecretString::from)
    }

    fn notify(&mut self, notice: &Notice) {
        println!("{notice}");
    }
}

/// 反复读取输入直到认证成功或失败
pub fn run_interactive<P: Prompter>(
    session: &mut AuthSession<'_>,
    prompter: &mut P,
) -> Result<SessionKey> {
    while let Some(prompt) = session.prompt() {
        let input = prompter.read_secret(prompt)?;
        match session.advance(input)? {
            Step::Continue { notice, .. } => {
                if let Some(notice) = notice {
                    prompter.notify(&notice);
                }
            }
            Step::Authenticated(key) => return Ok(key),
            Step::Failed => break,
        }
    }

    Err(VaultError::AuthenticationFailed)
}
