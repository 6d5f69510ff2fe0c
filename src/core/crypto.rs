//! 加解密 - 使用 PEM 或 OpenSSH 格式的 RSA 密钥保护备份内容
//!
//! 每次调用都会重新从磁盘加载密钥。OpenSSH 公钥通过 `ssh-keygen` 转换为 PEM。

use base64::{engine::general_purpose::STANDARD, Engine as _};
use regex::Regex;
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::{Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::debug;

static OPENSSH_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*ssh-[a-z0-9]+ \S+").expect("valid regex"));
static PEM_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"-----BEGIN ([A-Z ]*)KEY-----[\s\S]*?-----END [A-Z ]*KEY-----").expect("valid regex")
});

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Key file not found: {}", .0.display())]
    KeyFileNotFound(PathBuf),
    #[error("Key file format not supported: {}", .0.display())]
    UnsupportedKeyFormat(PathBuf),
    #[error("Unable to convert key file {}: {status}", .path.display())]
    KeyConversionFailed { path: PathBuf, status: String },
    #[error("Unable to parse key: {0}")]
    InvalidKey(String),
    #[error("Not a public key")]
    NotAPublicKey,
    #[error("Not a private key")]
    NotAPrivateKey,
    #[error("Invalid cipher text: {0}")]
    InvalidCiphertext(String),
    #[error("Encryption failed: {0}")]
    Encryption(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type CryptoResult<T> = Result<T, CryptoError>;

/// 外部密钥转换工具的执行结果
#[derive(Debug, Clone)]
pub struct Conversion {
    /// 退出码，被信号终止时为 None
    pub status: Option<i32>,
    pub stdout: String,
}

/// OpenSSH 公钥 -> PEM 转换
pub trait KeyConverter: Send + Sync {
    fn convert(&self, key_file: &Path) -> std::io::Result<Conversion>;
}

/// 调用 `ssh-keygen -f <path> -e -m pem`
#[derive(Debug, Clone, Default)]
pub struct SshKeygen;

impl KeyConverter for SshKeygen {
    fn convert(&self, key_file: &Path) -> std::io::Result<Conversion> {
        let output = Command::new("ssh-keygen")
            .arg("-f")
            .arg(key_file)
            .args(["-e", "-m", "pem"])
            .output()?;
        Ok(Conversion {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        })
    }
}

/// 已加载的 RSA 密钥，角色由 PEM 头决定
enum LoadedKey {
    Public(RsaPublicKey),
    Private(RsaPrivateKey),
}

/// 密钥文件的格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFormat {
    OpenSsh,
    Pem,
}

/// 根据内容识别密钥格式
pub fn detect_format(content: &str) -> Option<KeyFormat> {
    if OPENSSH_KEY.is_match(content) {
        Some(KeyFormat::OpenSsh)
    } else if PEM_BLOCK.is_match(content) {
        Some(KeyFormat::Pem)
    } else {
        None
    }
}

pub struct Crypto {
    converter: Box<dyn KeyConverter>,
}

impl Default for Crypto {
    fn default() -> Self {
        Self::new()
    }
}

impl Crypto {
    pub fn new() -> Self {
        Self::with_converter(SshKeygen)
    }

    pub fn with_converter(converter: impl KeyConverter + 'static) -> Self {
        Self {
            converter: Box::new(converter),
        }
    }

    /// 使用公钥加密，返回 base64 编码的密文
    pub fn encrypt(&self, plaintext: &[u8], key_file: &Path) -> CryptoResult<String> {
        let key = match self.load_key(key_file)? {
            LoadedKey::Public(key) => key,
            LoadedKey::Private(_) => return Err(CryptoError::NotAPublicKey),
        };

        let cipher = key
            .encrypt(&mut rand::thread_rng(), Pkcs1v15Encrypt, plaintext)
            .map_err(|e| CryptoError::Encryption(e.to_string()))?;
        Ok(STANDARD.encode(cipher))
    }

    /// 使用私钥解密 base64 编码的密文
    pub fn decrypt(&self, ciphertext: &str, key_file: &Path) -> CryptoResult<Vec<u8>> {
        let key = match self.load_key(key_file)? {
            LoadedKey::Private(key) => key,
            LoadedKey::Public(_) => return Err(CryptoError::NotAPrivateKey),
        };

        // 兼容带换行的 base64
        let compact: String = ciphertext.chars().filter(|c| !c.is_whitespace()).collect();
        let cipher = STANDARD
            .decode(compact)
            .map_err(|e| CryptoError::InvalidCiphertext(e.to_string()))?;

        key.decrypt(Pkcs1v15Encrypt, &cipher)
            .map_err(|e| CryptoError::InvalidCiphertext(e.to_string()))
    }

    fn load_key(&self, key_file: &Path) -> CryptoResult<LoadedKey> {
        let pem = self.read_pem(key_file)?;
        parse_pem(&pem)
    }

    /// 读取密钥文件并统一为 PEM 文本
    fn read_pem(&self, key_file: &Path) -> CryptoResult<String> {
        if !key_file.is_file() {
            return Err(CryptoError::KeyFileNotFound(key_file.to_path_buf()));
        }

        let content = fs::read_to_string(key_file)?;
        match detect_format(&content) {
            Some(KeyFormat::OpenSsh) => {
                debug!("Converting OpenSSH key {}", key_file.display());
                let conversion = self.converter.convert(key_file).map_err(|e| {
                    CryptoError::KeyConversionFailed {
                        path: key_file.to_path_buf(),
                        status: e.to_string(),
                    }
                })?;
                match conversion.status {
                    Some(0) => Ok(conversion.stdout),
                    status => Err(CryptoError::KeyConversionFailed {
                        path: key_file.to_path_buf(),
                        status: status
                            .map(|code| format!("exit code {}", code))
                            .unwrap_or_else(|| "terminated by signal".to_string()),
                    }),
                }
            }
            Some(KeyFormat::Pem) => Ok(content),
            None => Err(CryptoError::UnsupportedKeyFormat(key_file.to_path_buf())),
        }
    }
}

/// 只解析第一个 PEM 块，块前后的其他文本忽略
fn parse_pem(content: &str) -> CryptoResult<LoadedKey> {
    let captures = PEM_BLOCK
        .captures(content)
        .ok_or_else(|| CryptoError::InvalidKey("no PEM block found".to_string()))?;
    let pem = captures.get(0).map_or("", |m| m.as_str());
    let label = captures.get(1).map_or("", |m| m.as_str().trim());
    let invalid = |e: &dyn std::fmt::Display| CryptoError::InvalidKey(e.to_string());

    match label {
        "RSA PUBLIC" => RsaPublicKey::from_pkcs1_pem(pem)
            .map(LoadedKey::Public)
            .map_err(|e| invalid(&e)),
        "PUBLIC" => RsaPublicKey::from_public_key_pem(pem)
            .map(LoadedKey::Public)
            .map_err(|e| invalid(&e)),
        "RSA PRIVATE" => RsaPrivateKey::from_pkcs1_pem(pem)
            .map(LoadedKey::Private)
            .map_err(|e| invalid(&e)),
        "PRIVATE" => RsaPrivateKey::from_pkcs8_pem(pem)
            .map(LoadedKey::Private)
            .map_err(|e| invalid(&e)),
        other => Err(CryptoError::InvalidKey(format!(
            "unsupported PEM block: {} KEY",
            other
        ))),
    }
}
