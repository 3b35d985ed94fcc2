//! CLI 配置管理
//!
//! 优先级（高到低）：命令行参数、环境变量、配置文件、默认值。
//!
//! 配置文件按以下顺序查找，找到第一个即停止：
//! 1. `--config` 指定的路径
//! 2. `VMC_CONFIG` 环境变量指定的路径
//! 3. `./vmc.toml`
//! 4. `~/.config/vmc/config.toml`
//!
//! 支持 TOML / YAML / JSON，按扩展名选择解析器。

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use vmc_client::{ClientConfig, TaskWaitConfig, DEFAULT_API_PORT};

/// CLI 配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CliConfig {
    /// 管理节点地址
    #[serde(default)]
    pub host: String,

    /// 管理 API 端口
    #[serde(default = "default_port")]
    pub port: u16,

    /// 用户名
    #[serde(default)]
    pub username: Option<String>,

    /// 密码
    #[serde(default)]
    pub password: Option<String>,

    /// 认证域
    #[serde(default = "default_realm")]
    pub realm: String,

    /// 跳过 TLS 证书校验
    #[serde(default)]
    pub insecure: bool,

    /// 单次请求超时（秒）
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// 任务等待参数
    #[serde(default)]
    pub wait: TaskWaitConfig,
}

fn default_port() -> u16 {
    DEFAULT_API_PORT
}

fn default_realm() -> String {
    "local".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_port(),
            username: None,
            password: None,
            realm: default_realm(),
            insecure: false,
            timeout: default_timeout(),
            wait: TaskWaitConfig::default(),
        }
    }
}

impl CliConfig {
    /// 用户级配置文件路径
    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("无法获取用户主目录")?;
        Ok(home.join(".config").join("vmc").join("config.toml"))
    }

    /// 加载配置：默认值 → 配置文件 → 环境变量
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match Self::find_config_file(explicit)? {
            Some(path) => {
                tracing::debug!("加载配置文件: {:?}", path);
                Self::load_from_file(&path)?
            }
            None => {
                tracing::debug!("未找到配置文件，使用默认配置");
                Self::default()
            }
        };

        config.apply_env_vars()?;
        Ok(config)
    }

    /// 从指定文件加载配置
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("读取配置文件失败: {:?}", path))?;

        let config = match path.extension().and_then(|s| s.to_str()) {
            Some("toml") => toml::from_str(&content)
                .with_context(|| format!("解析 TOML 配置失败: {:?}", path))?,
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)
                .with_context(|| format!("解析 YAML 配置失败: {:?}", path))?,
            Some("json") => serde_json::from_str(&content)
                .with_context(|| format!("解析 JSON 配置失败: {:?}", path))?,
            _ => anyhow::bail!("不支持的配置文件格式: {:?}", path),
        };

        Ok(config)
    }

    /// 查找配置文件
    ///
    /// 显式指定（参数或 `VMC_CONFIG`）的文件不存在时报错，默认位置不存在时忽略。
    fn find_config_file(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        let named = explicit
            .map(Path::to_path_buf)
            .or_else(|| env::var("VMC_CONFIG").ok().map(PathBuf::from));

        if let Some(path) = named {
            if !path.exists() {
                anyhow::bail!("配置文件不存在: {:?}", path);
            }
            return Ok(Some(path));
        }

        let local = PathBuf::from("./vmc.toml");
        if local.exists() {
            return Ok(Some(local));
        }

        if let Ok(path) = Self::config_path() {
            if path.exists() {
                return Ok(Some(path));
            }
        }

        Ok(None)
    }

    /// 从进程环境变量覆盖
    fn apply_env_vars(&mut self) -> Result<()> {
        self.apply_overrides(|key| env::var(key).ok())
    }

    /// 按 `lookup` 提供的变量覆盖配置
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("VMC_HOST") {
            self.host = host;
        }
        if let Some(port) = lookup("VMC_PORT") {
            self.port = port
                .trim()
                .parse()
                .with_context(|| format!("VMC_PORT 无效: {}", port))?;
        }
        if let Some(username) = lookup("VMC_USERNAME") {
            self.username = Some(username);
        }
        if let Some(password) = lookup("VMC_PASSWORD") {
            self.password = Some(password);
        }
        if let Some(realm) = lookup("VMC_REALM") {
            self.realm = realm;
        }
        if let Some(insecure) = lookup("VMC_INSECURE") {
            self.insecure = parse_bool(&insecure)
                .with_context(|| format!("VMC_INSECURE 无效: {}", insecure))?;
        }
        if let Some(timeout) = lookup("VMC_TIMEOUT") {
            self.timeout = timeout
                .trim()
                .parse()
                .with_context(|| format!("VMC_TIMEOUT 无效: {}", timeout))?;
        }

        Ok(())
    }

    /// 命令行参数覆盖
    pub fn apply_flags(&mut self, host: Option<String>, port: Option<u16>, insecure: bool) {
        if let Some(host) = host {
            self.host = host;
        }
        if let Some(port) = port {
            self.port = port;
        }
        if insecure {
            self.insecure = true;
        }
    }

    /// 验证配置
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            anyhow::bail!("未配置管理节点地址，请使用 --host、VMC_HOST 或配置文件");
        }
        if self.port == 0 {
            anyhow::bail!("端口不能为 0");
        }
        if self.timeout == 0 {
            anyhow::bail!("请求超时不能为 0");
        }
        Ok(())
    }

    /// 转换为客户端配置
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(self.host.trim(), self.port)
            .with_insecure_tls(self.insecure)
            .with_request_timeout(self.timeout)
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => anyhow::bail!("无法识别的布尔值: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn write_temp(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = CliConfig::default();
        assert_eq!(config.port, 443);
        assert_eq!(config.realm, "local");
        assert_eq!(config.timeout, 30);
        assert!(!config.insecure);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_toml() {
        let file = write_temp(
            ".toml",
            r#"
host = "mgmt.lab"
username = "admin"
password = "s3cret"

[wait]
poll_interval = 250
"#,
        );

        let config = CliConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.host, "mgmt.lab");
        assert_eq!(config.port, 443);
        assert_eq!(config.username.as_deref(), Some("admin"));
        assert_eq!(config.wait.poll_interval, 250);
        assert_eq!(config.wait.retry.max_attempts, 3);
    }

    #[test]
    fn test_load_yaml_and_json() {
        let yaml = write_temp(".yaml", "host: 10.0.0.5\nport: 8080\nrealm: ldap\n");
        let config = CliConfig::load_from_file(yaml.path()).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.realm, "ldap");

        let json = write_temp(".json", r#"{"host": "10.0.0.6", "insecure": true}"#);
        let config = CliConfig::load_from_file(json.path()).unwrap();
        assert_eq!(config.host, "10.0.0.6");
        assert!(config.insecure);
    }

    #[test]
    fn test_unsupported_extension() {
        let file = write_temp(".ini", "host=x");
        assert!(CliConfig::load_from_file(file.path()).is_err());
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let result = CliConfig::load(Some(Path::new("/nonexistent/vmc.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = CliConfig {
            host: "from-file".into(),
            ..Default::default()
        };

        config
            .apply_overrides(lookup_from(&[
                ("VMC_HOST", "from-env"),
                ("VMC_PORT", "8443"),
                ("VMC_USERNAME", "ops"),
                ("VMC_INSECURE", "yes"),
                ("VMC_TIMEOUT", "5"),
            ]))
            .unwrap();

        assert_eq!(config.host, "from-env");
        assert_eq!(config.port, 8443);
        assert_eq!(config.username.as_deref(), Some("ops"));
        assert!(config.insecure);
        assert_eq!(config.timeout, 5);
    }

    #[test]
    fn test_invalid_env_value() {
        let mut config = CliConfig::default();
        assert!(config
            .apply_overrides(lookup_from(&[("VMC_PORT", "abc")]))
            .is_err());
        assert!(config
            .apply_overrides(lookup_from(&[("VMC_INSECURE", "maybe")]))
            .is_err());
    }

    #[test]
    fn test_flags_override_env() {
        let mut config = CliConfig::default();
        config
            .apply_overrides(lookup_from(&[("VMC_HOST", "from-env"), ("VMC_PORT", "9000")]))
            .unwrap();
        config.apply_flags(Some("from-flag".into()), None, true);

        assert_eq!(config.host, "from-flag");
        assert_eq!(config.port, 9000);
        assert!(config.insecure);
    }

    #[test]
    fn test_validate() {
        let mut config = CliConfig {
            host: "mgmt.lab".into(),
            ..Default::default()
        };
        assert!(config.validate().is_ok());

        config.port = 0;
        assert!(config.validate().is_err());

        config.port = 443;
        config.host = "  ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_client_config() {
        let config = CliConfig {
            host: "mgmt.lab".into(),
            insecure: true,
            timeout: 12,
            ..Default::default()
        };
        let client = config.client_config();
        assert_eq!(client.base_url(), "https://mgmt.lab:443/api");
        assert!(client.insecure_tls);
        assert_eq!(client.request_timeout, 12);
    }
}
