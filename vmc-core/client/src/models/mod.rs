//! 资源数据模型
//!
//! 服务端部分字段的类型并不稳定（同一个字段有时是字符串、有时是数字、有时缺失），
//! 这些字段统一解析为 [`FlexValue`]，由访问方法负责解释。

use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

// ============================================
// 宽松字段
// ============================================

/// 字符串 | 数字 | 缺失
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FlexValue {
    /// 字段缺失或为 null
    #[default]
    Absent,
    Text(String),
    Integer(i64),
    Float(f64),
}

impl FlexValue {
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// 整数值；数字字符串和整数值的浮点数也会被接受
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            Self::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl fmt::Display for FlexValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => f.write_str("-"),
            Self::Text(s) => f.write_str(s),
            Self::Integer(n) => write!(f, "{}", n),
            Self::Float(v) => write!(f, "{}", v),
        }
    }
}

impl Serialize for FlexValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Absent => serializer.serialize_none(),
            Self::Text(s) => serializer.serialize_str(s),
            Self::Integer(n) => serializer.serialize_i64(*n),
            Self::Float(v) => serializer.serialize_f64(*v),
        }
    }
}

impl<'de> Deserialize<'de> for FlexValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::Null => Self::Absent,
            Value::String(s) if s.is_empty() => Self::Absent,
            Value::String(s) => Self::Text(s),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Integer(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::Bool(b) => Self::Text(b.to_string()),
            other => Self::Text(other.to_string()),
        })
    }
}

// ============================================
// 主机
// ============================================

/// 主机信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Host {
    /// 主机 ID
    pub id: String,

    /// 主机名称
    #[serde(default)]
    pub name: String,

    /// 管理地址
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    /// 所属集群
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster: Option<String>,

    /// 状态
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    /// 证书过期时间：RFC 3339 字符串、Unix 时间戳或缺失
    #[serde(default, skip_serializing_if = "FlexValue::is_absent")]
    pub cert_expiration: FlexValue,
}

impl Host {
    /// 解释证书过期时间
    ///
    /// 数字按 Unix 时间戳处理，超过 10^12 的视为毫秒。
    pub fn cert_expires_at(&self) -> Option<DateTime<Utc>> {
        match &self.cert_expiration {
            FlexValue::Text(s) => DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
                .or_else(|| s.trim().parse::<i64>().ok().and_then(timestamp_to_utc)),
            value => value.as_i64().and_then(timestamp_to_utc),
        }
    }
}

fn timestamp_to_utc(raw: i64) -> Option<DateTime<Utc>> {
    if raw.abs() >= 1_000_000_000_000 {
        Utc.timestamp_millis_opt(raw).single()
    } else {
        Utc.timestamp_opt(raw, 0).single()
    }
}

/// 加入集群的请求路径形式
///
/// 服务端存在两种调用形式，必须由调用方按目标服务端版本明确选择。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinRoute {
    /// `POST /api/host/{host}/join/{cluster}`
    ClusterInPath,
    /// `POST /api/host/{host}/join`，请求体 `{"clusterId": ...}`
    ClusterInBody,
}

/// 加入集群请求体
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinClusterRequest {
    pub cluster_id: String,
}

// ============================================
// 用户
// ============================================

/// 用户信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// 用户名
    pub name: String,

    /// 认证域
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realm: Option<String>,

    /// 邮箱
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// 组织单位：名称、数字编号或缺失
    #[serde(default, skip_serializing_if = "FlexValue::is_absent")]
    pub organizational_unit: FlexValue,
}
