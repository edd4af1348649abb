//! credvault 命令行入口
//!
//! 流程：
//! 1. 加载（或创建）salt 与 TOTP 密钥，展示验证器配置信息
//! 2. 认证：主密码 + TOTP，最多 3 次
//! 3. 加载凭据，进入交互菜单
//! 4. 选择「保存并退出」时加密落盘
//!
//! 会话密钥由 `SessionKey` 持有，main 返回（含出错）时自动清零；
//! 被 SIGINT / SIGTERM 打断时由信号处理线程清零。

use std::io::{self, BufRead, Write};

use anyhow::{Context, anyhow};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use zeroize::Zeroizing;

use credvault::auth::{self, AuthSession, TerminalPrompter};
use credvault::breach::{BreachCheck, BreachChecker, BreachStatus, HttpRangeSource};
use credvault::config::Config;
use credvault::crypto::{MasterSecretRecord, get_or_create_persistent_salt};
use credvault::generator::{CharClasses, MIN_GENERATED_LEN, generate_password};
use credvault::shutdown::install_signal_handler;
use credvault::store::CredentialStore;
use credvault::totp::{self, SystemClock};
use credvault::vault::Vault;

fn main() -> anyhow::Result<()> {
    let cfg = Config::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(cfg.log_level()))
        .with_writer(io::stderr)
        .init();

    std::fs::create_dir_all(&cfg.data_dir)
        .with_context(|| format!("cannot create data dir {}", cfg.data_dir.display()))?;
    let paths = cfg.paths();

    let salt = get_or_create_persistent_salt(&paths.salt).context("loading encryption salt")?;
    let totp_secret = totp::load_or_create_secret(&paths.totp_secret).context("loading TOTP secret")?;

    println!("\nTwo-factor authentication is enabled.");
    println!("Add this secret to your authenticator app if it is not registered yet:");
    println!("{}", totp_secret.to_base32());
    println!("Or scan a QR code built from this URI:");
    println!("{}", totp::provisioning_uri(&totp_secret, &cfg.account, &cfg.issuer));

    let breach = BreachChecker::new(HttpRangeSource::new(&cfg.breach_endpoint, cfg.breach_timeout())?);

    let key = {
        let mut session =
            AuthSession::new(&paths.master_secret, &totp_secret, &salt, &breach, &SystemClock)?;
        auth::run_interactive(&mut session, &mut TerminalPrompter).context("authentication failed")?
    };
    println!("Authentication successful.");
    install_signal_handler(key.wipe_handle()).context("installing signal handler")?;

    let master = MasterSecretRecord::load(&paths.master_secret)?
        .ok_or_else(|| anyhow!("master password record disappeared"))?;

    let mut vault = Vault::open(&key, CredentialStore::from_paths(&paths))
        .context("loading credentials")?;
    info!(count = vault.len(), "vault opened");

    let mut input = io::stdin().lock();
    run_menu(&mut vault, &master, &breach, &mut input)
}

fn run_menu(
    vault: &mut Vault<'_>,
    master: &MasterSecretRecord,
    breach: &dyn BreachCheck,
    input: &mut impl BufRead,
) -> anyhow::Result<()> {
    loop {
        println!("\n=== Credential Manager ===");
        println!("1. List all credentials");
        println!("2. Add a new credential");
        println!("3. Delete a credential");
        println!("4. Reveal a password");
        println!("5. Check stored passwords for breaches");
        println!("6. Save and exit");

        // EOF 视同保存退出
        let Some(choice) = ask(input, "Choose an option: ")? else {
            return save_and_exit(vault);
        };

        match choice.as_str() {
            "1" => list(vault),
            "2" => add(vault, breach, input)?,
            "3" => remove(vault, input)?,
            "4" => reveal(vault, master, input)?,
            "5" => audit(vault, breach),
            "6" => return save_and_exit(vault),
            _ => println!("Invalid option. Try again."),
        }
    }
}

fn ask(input: &mut impl BufRead, label: &str) -> io::Result<Option<String>> {
    print!("{label}");
    io::stdout().flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_owned()))
}

fn ask_yes_no(input: &mut impl BufRead, label: &str) -> io::Result<Option<bool>> {
    loop {
        match ask(input, &format!("{label} (y/n): "))?.as_deref() {
            None => return Ok(None),
            Some("y" | "Y") => return Ok(Some(true)),
            Some("n" | "N") => return Ok(Some(false)),
            Some(_) => println!("Please answer 'y' or 'n'."),
        }
    }
}

fn ask_index(vault: &Vault<'_>, input: &mut impl BufRead, label: &str) -> io::Result<Option<usize>> {
    let Some(answer) = ask(input, label)? else {
        return Ok(None);
    };
    match answer.parse::<usize>() {
        Ok(n) if (1..=vault.len()).contains(&n) => Ok(Some(n - 1)),
        _ => {
            println!("Invalid index.");
            Ok(None)
        }
    }
}

fn list(vault: &Vault<'_>) {
    if vault.is_empty() {
        println!("No credentials stored.");
        return;
    }
    println!("Stored credentials:");
    for (i, record) in vault.records().iter().enumerate() {
        println!("{}. {record}", i + 1);
    }
}

fn add(vault: &mut Vault<'_>, breach: &dyn BreachCheck, input: &mut impl BufRead) -> anyhow::Result<()> {
    let Some(service) = ask(input, "Service name: ")? else {
        return Ok(());
    };
    let Some(username) = ask(input, "Username: ")? else {
        return Ok(());
    };
    let Some(generate) = ask_yes_no(input, "Generate a strong password?")? else {
        return Ok(());
    };

    let secret = if generate {
        let Some(classes) = ask_classes(input)? else {
            return Ok(());
        };
        let length = loop {
            let Some(answer) = ask(input, &format!("Password length (minimum {MIN_GENERATED_LEN}): "))? else {
                return Ok(());
            };
            match answer.parse::<usize>() {
                Ok(n) => break n,
                Err(_) => println!("Please enter a number."),
            }
        };
        match generate_password(length, classes, breach) {
            Ok(p) => Zeroizing::new(p),
            Err(e) => {
                println!("{e}");
                return Ok(());
            }
        }
    } else {
        Zeroizing::new(rpassword::prompt_password("Password: ")?)
    };

    match vault.add(&service, &username, &secret) {
        Ok(_) => println!("Credential added."),
        Err(e) => println!("{e}"),
    }
    Ok(())
}

fn ask_classes(input: &mut impl BufRead) -> io::Result<Option<CharClasses>> {
    let mut answers = [false; 4];
    let labels = [
        "Include uppercase letters?",
        "Include lowercase letters?",
        "Include digits?",
        "Include symbols?",
    ];
    for (answer, label) in answers.iter_mut().zip(labels) {
        let Some(yes) = ask_yes_no(input, label)? else {
            return Ok(None);
        };
        *answer = yes;
    }
    let [uppercase, lowercase, digits, symbols] = answers;
    Ok(Some(CharClasses {
        uppercase,
        lowercase,
        digits,
        symbols,
    }))
}

fn remove(vault: &mut Vault<'_>, input: &mut impl BufRead) -> anyhow::Result<()> {
    list(vault);
    if vault.is_empty() {
        return Ok(());
    }
    if let Some(index) = ask_index(vault, input, "Number to delete: ")? {
        let removed = vault.remove(index)?;
        println!("Removed: {}", removed.service);
    }
    Ok(())
}

fn reveal(vault: &Vault<'_>, master: &MasterSecretRecord, input: &mut impl BufRead) -> anyhow::Result<()> {
    list(vault);
    if vault.is_empty() {
        return Ok(());
    }
    let Some(index) = ask_index(vault, input, "Number to reveal: ")? else {
        return Ok(());
    };

    let confirmation = Zeroizing::new(rpassword::prompt_password(
        "Re-enter the master password to confirm: ",
    )?);
    match vault.reveal(index, &confirmation, master) {
        Ok(secret) => println!(
            "Password for {}: {}",
            vault.records()[index].service,
            secret.as_str()
        ),
        Err(e) => println!("Access denied: {e}"),
    }
    Ok(())
}

fn audit(vault: &Vault<'_>, breach: &dyn BreachCheck) {
    if vault.is_empty() {
        println!("No credentials stored.");
        return;
    }
    println!("Checking all stored passwords against known breaches...");

    let mut any_compromised = false;
    for finding in vault.audit(breach) {
        match finding.status {
            Some(BreachStatus::Pwned(n)) => {
                any_compromised = true;
                println!(
                    "WARNING: the password for '{}' (username: {}) appeared {n} times in breaches!",
                    finding.service, finding.username
                );
            }
            Some(BreachStatus::Unknown) => {
                println!("Could not check the password for '{}'.", finding.service);
            }
            Some(BreachStatus::Clean) => {}
            None => println!("Could not decrypt the password for '{}'.", finding.service),
        }
    }

    if !any_compromised {
        println!("No compromised passwords found.");
    }
}

fn save_and_exit(vault: &Vault<'_>) -> anyhow::Result<()> {
    let saved = vault.save().context("saving credentials")?;
    println!("{saved} credential(s) saved. Exiting...");
    Ok(())
}
