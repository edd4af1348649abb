//! 认证会话状态机
//!
//! 状态流转：
//!
//! ```text
//! [首次运行] SetupNew ⇄ SetupConfirm ──┐
//!                                      ▼
//!            AwaitingMasterSecret → AwaitingTotpCode → Authenticated
//!                     ▲                   │
//!                     └──── 失败（扣一次）─┘        尝试用尽 → Failed
//! ```
//!
//! 一次尝试 = 主密码校验 + TOTP 校验；任一步失败（含非法输入）都消耗一次机会，
//! 并回到主密码步骤。`advance` 是唯一的状态转移入口，便于测试直接喂输入。
//!
//! 设置流程不限次数，只有校验通过后才会哈希并落盘主密码。

pub mod prompt;

use std::fmt;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use tracing::{info, warn};

use crate::breach::{BreachCheck, BreachStatus};
use crate::config::{MAX_ATTEMPTS, MAX_MASTER_SECRET_LEN, MIN_MASTER_SECRET_LEN};
use crate::crypto::{MasterSecretRecord, PersistentSalt, SessionKey};
use crate::error::{Result, VaultError};
use crate::sanitize::sanitize;
use crate::totp::{self, Clock, DIGITS, TotpSecret};

pub use prompt::{Prompter, TerminalPrompter, run_interactive};

/// 当前等待的输入
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt {
    NewMasterSecret,
    ConfirmMasterSecret,
    MasterSecret,
    TotpCode,
}

impl Prompt {
    pub fn label(self) -> &'static str {
        match self {
            Self::NewMasterSecret => "New master password: ",
            Self::ConfirmMasterSecret => "Re-enter the master password to confirm: ",
            Self::MasterSecret => "Master password: ",
            Self::TotpCode => "Current TOTP code: ",
        }
    }
}

/// 反馈给操作者的提示
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    TooShort,
    Breached(u64),
    BreachLookupFailed,
    Mismatch,
    InvalidInput(String),
    MasterSecretSaved,
    WrongMasterSecret { attempts_left: u8 },
    WrongTotpCode { attempts_left: u8 },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort => write!(
                f,
                "The password must be at least {MIN_MASTER_SECRET_LEN} characters. Try again."
            ),
            Self::Breached(n) => write!(
                f,
                "This password appeared in {n} known breaches. Choose a stronger one."
            ),
            Self::BreachLookupFailed => {
                f.write_str("Could not check the password against known breaches. Try again.")
            }
            Self::Mismatch => f.write_str("The passwords do not match. Try again."),
            Self::InvalidInput(reason) => write!(f, "Invalid input: {reason}"),
            Self::MasterSecretSaved => f.write_str("Master password saved."),
            Self::WrongMasterSecret { attempts_left } => {
                write!(f, "Incorrect password. {attempts_left} attempt(s) left.")
            }
            Self::WrongTotpCode { attempts_left } => {
                write!(f, "Invalid TOTP code. {attempts_left} attempt(s) left.")
            }
        }
    }
}

/// 一次 `advance` 的结果
#[derive(Debug)]
pub enum Step {
    Continue {
        prompt: Prompt,
        notice: Option<Notice>,
    },
    /// 认证通过，会话密钥已派生
    Authenticated(SessionKey),
    /// 尝试次数用尽，不得继续加载凭据
    Failed,
}

/// 一次尝试失败的原因
enum AttemptFailure {
    InvalidInput(String),
    WrongMasterSecret,
    WrongTotpCode,
}

enum State {
    SetupNew,
    SetupConfirm { candidate: SecretString },
    AwaitingMasterSecret,
    AwaitingTotpCode { verified: SecretString },
    Authenticated,
    Failed,
}

pub struct AuthSession<'a> {
    state: State,
    master: Option<MasterSecretRecord>,
    master_path: PathBuf,
    totp: &'a TotpSecret,
    salt: &'a PersistentSalt,
    breach: &'a dyn BreachCheck,
    clock: &'a dyn Clock,
    attempts_left: u8,
}

impl<'a> AuthSession<'a> {
    /// 读取主密码记录；不存在则进入设置流程
    pub fn new(
        master_path: &Path,
        totp: &'a TotpSecret,
        salt: &'a PersistentSalt,
        breach: &'a dyn BreachCheck,
        clock: &'a dyn Clock,
    ) -> Result<Self> {
        let master = MasterSecretRecord::load(master_path)?;
        let state = if master.is_some() {
            State::AwaitingMasterSecret
        } else {
            info!("no master password found, entering setup");
            State::SetupNew
        };

        Ok(Self {
            state,
            master,
            master_path: master_path.to_path_buf(),
            totp,
            salt,
            breach,
            clock,
            attempts_left: MAX_ATTEMPTS,
        })
    }

    /// 下一步需要的输入；会话结束时返回 `None`
    pub fn prompt(&self) -> Option<Prompt> {
        match self.state {
            State::SetupNew => Some(Prompt::NewMasterSecret),
            State::SetupConfirm { .. } => Some(Prompt::ConfirmMasterSecret),
            State::AwaitingMasterSecret => Some(Prompt::MasterSecret),
            State::AwaitingTotpCode { .. } => Some(Prompt::TotpCode),
            State::Authenticated | State::Failed => None,
        }
    }

    pub fn attempts_left(&self) -> u8 {
        self.attempts_left
    }

    pub fn is_setup(&self) -> bool {
        matches!(self.state, State::SetupNew | State::SetupConfirm { .. })
    }

    /// 状态转移
    pub fn advance(&mut self, input: SecretString) -> Result<Step> {
        match std::mem::replace(&mut self.state, State::Failed) {
            State::SetupNew => Ok(self.on_new_secret(input)),
            State::SetupConfirm { candidate } => self.on_confirm(candidate, input),
            State::AwaitingMasterSecret => Ok(self.on_master_secret(input)),
            State::AwaitingTotpCode { verified } => Ok(self.on_totp_code(verified, input)),
            State::Authenticated => {
                self.state = State::Authenticated;
                Err(VaultError::InvalidInput("authentication already completed".into()))
            }
            State::Failed => Err(VaultError::AuthenticationFailed),
        }
    }

    fn on_new_secret(&mut self, input: SecretString) -> Step {
        self.state = State::SetupNew;

        let candidate = match sanitize(input.expose_secret(), MAX_MASTER_SECRET_LEN, false) {
            Ok(c) => SecretString::from(c),
            Err(e) => return setup_notice(Notice::InvalidInput(reason(&e))),
        };

        if candidate.expose_secret().chars().count() < MIN_MASTER_SECRET_LEN {
            return setup_notice(Notice::TooShort);
        }

        match self.breach.check(candidate.expose_secret()) {
            BreachStatus::Pwned(n) => setup_notice(Notice::Breached(n)),
            BreachStatus::Unknown => setup_notice(Notice::BreachLookupFailed),
            BreachStatus::Clean => {
                self.state = State::SetupConfirm { candidate };
                Step::Continue {
                    prompt: Prompt::ConfirmMasterSecret,
                    notice: None,
                }
            }
        }
    }

    fn on_confirm(&mut self, candidate: SecretString, input: SecretString) -> Result<Step> {
        self.state = State::SetupNew;

        let confirmed = sanitize(input.expose_secret(), MAX_MASTER_SECRET_LEN, false)
            .map(SecretString::from)
            .ok();
        let matches = confirmed
            .as_ref()
            .is_some_and(|c| c.expose_secret() == candidate.expose_secret());
        if !matches {
            return Ok(setup_notice(Notice::Mismatch));
        }

        let record = MasterSecretRecord::create(candidate.expose_secret())?;
        record.store(&self.master_path)?;
        self.master = Some(record);
        self.state = State::AwaitingMasterSecret;

        Ok(Step::Continue {
            prompt: Prompt::MasterSecret,
            notice: Some(Notice::MasterSecretSaved),
        })
    }

    fn on_master_secret(&mut self, input: SecretString) -> Step {
        let candidate = match sanitize(input.expose_secret(), MAX_MASTER_SECRET_LEN, false) {
            Ok(c) => SecretString::from(c),
            Err(e) => return self.consume_attempt(AttemptFailure::InvalidInput(reason(&e))),
        };

        let verified = self
            .master
            .as_ref()
            .is_some_and(|record| record.verify(candidate.expose_secret()));
        if !verified {
            return self.consume_attempt(AttemptFailure::WrongMasterSecret);
        }

        self.state = State::AwaitingTotpCode {
            verified: candidate,
        };
        Step::Continue {
            prompt: Prompt::TotpCode,
            notice: None,
        }
    }

    fn on_totp_code(&mut self, verified: SecretString, input: SecretString) -> Step {
        let code = match sanitize(input.expose_secret(), DIGITS, true) {
            Ok(c) => c,
            Err(e) => return self.consume_attempt(AttemptFailure::InvalidInput(reason(&e))),
        };

        if !totp::validate_code(self.totp, &code, self.clock.unix_time()) {
            return self.consume_attempt(AttemptFailure::WrongTotpCode);
        }

        let key = SessionKey::install(verified.expose_secret(), self.salt);
        drop(verified);
        self.state = State::Authenticated;
        info!("authentication succeeded");

        Step::Authenticated(key)
    }

    /// 扣除一次尝试；用尽则进入 Failed，否则回到主密码步骤
    fn consume_attempt(&mut self, failure: AttemptFailure) -> Step {
        self.attempts_left = self.attempts_left.saturating_sub(1);
        warn!(attempts_left = self.attempts_left, "authentication attempt failed");

        if self.attempts_left == 0 {
            self.state = State::Failed;
            return Step::Failed;
        }

        self.state = State::AwaitingMasterSecret;
        let attempts_left = self.attempts_left;
        let notice = match failure {
            AttemptFailure::InvalidInput(msg) => Notice::InvalidInput(msg),
            AttemptFailure::WrongMasterSecret => Notice::WrongMasterSecret { attempts_left },
            AttemptFailure::WrongTotpCode => Notice::WrongTotpCode { attempts_left },
        };
        Step::Continue {
            prompt: Prompt::MasterSecret,
            notice: Some(notice),
        }
    }
}

fn setup_notice(notice: Notice) -> Step {
    Step::Continue {
        prompt: Prompt::NewMasterSecret,
        notice: Some(notice),
    }
}

fn reason(err: &VaultError) -> String {
    match err {
        VaultError::InvalidInput(msg) => msg.clone(),
        other => other.to_string(),
    }
}
