use crate::{
    Error,
    Result,
};
use eth_keystore::decrypt_key;
use ethers::signers::LocalWallet;
use rpassword::prompt_password;
use std::{
    fs,
    io::{
        self,
        BufRead,
        Write,
    },
    path::{
        Path,
        PathBuf,
    },
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WalletDescriptor {
    pub name: String,
    pub path: PathBuf,
}

impl WalletDescriptor {
    pub fn new(name: impl Into<String>, path: PathBuf) -> Self {
        Self {
            name: name.into(),
            path,
        }
    }
}

/// Interactive approvals a locally held wallet needs from its user.
pub trait Prompt: Send + Sync {
    /// `Ok(None)` means the user declined.
    fn password(&self, message: &str) -> io::Result<Option<String>>;

    fn confirm(&self, message: &str) -> io::Result<bool>;
}

/// Prompts on the controlling terminal.
#[derive(Clone, Copy, Debug, Default)]
pub struct StdinPrompt;

impl Prompt for StdinPrompt {
    fn password(&self, message: &str) -> io::Result<Option<String>> {
        let password = prompt_password(message)?;
        if password.is_empty() {
            return Ok(None);
        }
        Ok(Some(password))
    }

    fn confirm(&self, message: &str) -> io::Result<bool> {
        let mut stdout = io::stdout();
        write!(stdout, "{message} [y/N] ")?;
        stdout.flush()?;
        let mut answer = String::new();
        io::stdin().lock().read_line(&mut answer)?;
        Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
    }
}

pub fn default_wallet_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME")
        .map_err(|_| Error::Config("HOME environment variable not set".to_string()))?;
    Ok(PathBuf::from(home).join(".foundry").join("keystores"))
}

pub fn resolve_wallet_dir(dir: Option<&str>) -> Result<PathBuf> {
    match dir {
        Some(raw) => {
            let expanded = shellexpand::tilde(raw);
            Ok(PathBuf::from(expanded.into_owned()))
        }
        None => default_wallet_dir(),
    }
}

pub fn list_wallets(dir: &Path) -> Result<Vec<WalletDescriptor>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut wallets = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            tracing::warn!(?path, "skipping keystore with non UTF-8 name");
            continue;
        };
        if name.starts_with('.') {
            continue;
        }
        wallets.push(WalletDescriptor::new(name.to_owned(), path.clone()));
    }
    wallets.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(wallets)
}

pub fn find_wallet(dir: &Path, name: &str) -> Result<WalletDescriptor> {
    let wallets = list_wallets(dir)?;
    wallets.into_iter().find(|w| w.name == name).ok_or_else(|| {
        Error::Keystore(format!(
            "wallet '{name}' not found in {}",
            dir.to_string_lossy()
        ))
    })
}

/// Decrypts the keystore behind `descriptor`. A declined password prompt is a
/// user rejection, a wrong password is a keystore error.
pub fn unlock_wallet(
    descriptor: &WalletDescriptor,
    prompt: &dyn Prompt,
) -> Result<LocalWallet> {
    let message = format!("Enter password for wallet '{}': ", descriptor.name);
    let password = prompt.password(&message)?.ok_or(Error::UserRejected)?;
    decrypt_wallet(descriptor, &password)
}

pub fn decrypt_wallet(descriptor: &WalletDescriptor, password: &str) -> Result<LocalWallet> {
    let secret = decrypt_key(&descriptor.path, password.as_bytes()).map_err(|_| {
        Error::Keystore(format!("invalid password for wallet '{}'", descriptor.name))
    })?;
    LocalWallet::from_bytes(&secret).map_err(|e| {
        Error::Keystore(format!(
            "wallet '{}' contained unsupported key material: {e}",
            descriptor.name
        ))
    })
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use ethers::signers::Signer;
    use tempdir::TempDir;

    struct ScriptedPrompt(Option<&'static str>);

    impl Prompt for ScriptedPrompt {
        fn password(&self, _message: &str) -> io::Result<Option<String>> {
            Ok(self.0.map(str::to_string))
        }

        fn confirm(&self, _message: &str) -> io::Result<bool> {
            Ok(self.0.is_some())
        }
    }

    const SECRET: [u8; 32] = [7u8; 32];

    fn write_keystore(dir: &Path, name: &str, password: &str) -> WalletDescriptor {
        let mut rng = ethers::core::rand::thread_rng();
        eth_keystore::encrypt_key(dir, &mut rng, SECRET, password, Some(name)).unwrap();
        WalletDescriptor::new(name, dir.join(name))
    }

    #[test]
    fn list_wallets__sorted_and_skips_hidden() {
        let dir = TempDir::new("keystores").unwrap();
        fs::write(dir.path().join("bob"), "{}").unwrap();
        fs::write(dir.path().join("alice"), "{}").unwrap();
        fs::write(dir.path().join(".DS_Store"), "").unwrap();

        let names: Vec<String> = list_wallets(dir.path())
            .unwrap()
            .into_iter()
            .map(|w| w.name)
            .collect();

        assert_eq!(names, vec!["alice".to_string(), "bob".to_string()]);
    }

    #[test]
    fn find_wallet__missing_name_is_keystore_error() {
        let dir = TempDir::new("keystores").unwrap();
        assert!(matches!(
            find_wallet(dir.path(), "nobody"),
            Err(Error::Keystore(_))
        ));
    }

    #[test]
    fn unlock_wallet__declined_prompt_is_user_rejection() {
        let dir = TempDir::new("keystores").unwrap();
        let descriptor = write_keystore(dir.path(), "player", "hunter2");

        let result = unlock_wallet(&descriptor, &ScriptedPrompt(None));

        assert!(matches!(result, Err(Error::UserRejected)));
    }

    #[test]
    fn unlock_wallet__decrypts_with_right_password() {
        let dir = TempDir::new("keystores").unwrap();
        let descriptor = write_keystore(dir.path(), "player", "hunter2");

        let wrong = unlock_wallet(&descriptor, &ScriptedPrompt(Some("nope")));
        let right = unlock_wallet(&descriptor, &ScriptedPrompt(Some("hunter2"))).unwrap();

        let expected = LocalWallet::from_bytes(&SECRET).unwrap();
        assert!(matches!(wrong, Err(Error::Keystore(_))));
        assert_eq!(right.address(), expected.address());
    }
}
