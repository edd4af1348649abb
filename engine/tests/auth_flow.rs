//! 首次设置 → 认证 → 保存 → 再次认证 → 加载 的端到端流程

use std::collections::VecDeque;
use std::io;

use secrecy::SecretString;
use tempfile::tempdir;

use credvault::auth::{self, AuthSession, Notice, Prompt, Prompter};
use credvault::breach::{BreachCheck, BreachStatus};
use credvault::crypto::get_or_create_persistent_salt;
use credvault::totp::{self, Clock, compute_code, time_counter};
use credvault::{CredentialStore, TotpSecret, Vault, VaultError, VaultPaths};

const NOW: u64 = 1_650_000_000;

struct FixedClock;

impl Clock for FixedClock {
    fn unix_time(&self) -> u64 {
        NOW
    }
}

struct NeverBreached;

impl BreachCheck for NeverBreached {
    fn check(&self, _secret: &str) -> BreachStatus {
        BreachStatus::Clean
    }
}

/// 按顺序返回预设输入，并记录收到的提示
struct Scripted {
    inputs: VecDeque<String>,
    prompts: Vec<Prompt>,
    notices: Vec<Notice>,
}

impl Scripted {
    fn new(inputs: &[&str]) -> Self {
        Self {
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            prompts: Vec::new(),
            notices: Vec::new(),
        }
    }
}

impl Prompter for Scripted {
    fn read_secret(&mut self, prompt: Prompt) -> io::Result<SecretString> {
        self.prompts.push(prompt);
        self.inputs
            .pop_front()
            .map(SecretString::from)
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "script exhausted"))
    }

    fn notify(&mut self, notice: &Notice) {
        self.notices.push(notice.clone());
    }
}

fn code_now(secret: &TotpSecret) -> String {
    compute_code(secret, time_counter(NOW)).expect("code")
}

#[test]
fn first_run_then_second_run_reads_saved_credentials() {
    let temp_dir = tempdir().expect("create temp dir");
    let paths = VaultPaths::new(temp_dir.path());

    let salt = get_or_create_persistent_salt(&paths.salt).expect("salt");
    let totp_secret = totp::load_or_create_secret(&paths.totp_secret).expect("totp secret");
    let code = code_now(&totp_secret);

    // 首次运行：设置主密码后立即认证
    {
        let mut session =
            AuthSession::new(&paths.master_secret, &totp_secret, &salt, &NeverBreached, &FixedClock)
                .expect("session");
        let mut script = Scripted::new(&[
            "first-run-master",
            "first-run-master",
            "first-run-master",
            code.as_str(),
        ]);
        let key = auth::run_interactive(&mut session, &mut script).expect("authenticate");

        assert_eq!(
            script.prompts,
            [
                Prompt::NewMasterSecret,
                Prompt::ConfirmMasterSecret,
                Prompt::MasterSecret,
                Prompt::TotpCode
            ]
        );
        assert_eq!(script.notices, [Notice::MasterSecretSaved]);

        let mut vault = Vault::open(&key, CredentialStore::from_paths(&paths)).expect("open vault");
        vault.add("ExampleMail", "alice", "p@ss").expect("add");
        vault.save().expect("save");
    }

    // 第二次运行：重新加载 salt / TOTP 密钥，直接认证
    let salt = get_or_create_persistent_salt(&paths.salt).expect("salt");
    let totp_secret = totp::load_or_create_secret(&paths.totp_secret).expect("totp secret");
    let mut session =
        AuthSession::new(&paths.master_secret, &totp_secret, &salt, &NeverBreached, &FixedClock)
            .expect("session");
    let code = code_now(&totp_secret);
    let mut script = Scripted::new(&["first-run-master", code.as_str()]);
    let key = auth::run_interactive(&mut session, &mut script).expect("authenticate");

    let vault = Vault::open(&key, CredentialStore::from_paths(&paths)).expect("open vault");
    assert_eq!(vault.len(), 1);
    assert_eq!(
        key.decrypt(&vault.records()[0].encrypted_secret).expect("decrypt").as_str(),
        "p@ss"
    );
}

#[test]
fn exhausted_attempts_surface_as_fatal_error() {
    let temp_dir = tempdir().expect("create temp dir");
    let paths = VaultPaths::new(temp_dir.path());
    credvault::MasterSecretRecord::create("the-real-master")
        .expect("hash")
        .store(&paths.master_secret)
        .expect("store");

    let salt = get_or_create_persistent_salt(&paths.salt).expect("salt");
    let totp_secret = totp::load_or_create_secret(&paths.totp_secret).expect("totp secret");
    let mut session =
        AuthSession::new(&paths.master_secret, &totp_secret, &salt, &NeverBreached, &FixedClock)
            .expect("session");

    let mut script = Scripted::new(&["guess-1", "guess-2", "guess-3", "the-real-master"]);
    let result = auth::run_interactive(&mut session, &mut script);

    assert!(matches!(result, Err(VaultError::AuthenticationFailed)));
    // 第四个输入不会被读取
    assert_eq!(script.prompts.len(), 3);
    assert_eq!(script.inputs.len(), 1);
}
