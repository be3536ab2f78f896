//! Date source nodes bound at the `date` namespace

use chrono::{FixedOffset, Local, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Deserialize;
use std::str::FromStr;

use crate::error::NodeError;
use crate::node::{Factory, Node, NodeCore, Requires};

/// Capability of the node bound at the `date` namespace
pub trait DateSource: Send + Sync {
    /// The current business date as this source sees it
    fn today(&self) -> NaiveDate;
}

/// Configuration for [`FixedDate`]
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FixedDateConfig {
    /// `YYYY-MM-DD`
    pub date: NaiveDate,
}

/// Always reports the configured date
pub struct FixedDate {
    core: NodeCore,
    date: NaiveDate,
}

impl DateSource for FixedDate {
    fn today(&self) -> NaiveDate {
        self.date
    }
}

#[async_trait::async_trait]
impl Node for FixedDate {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    async fn setup(&self) -> Result<(), NodeError> {
        self.log()?.debug(format!("Fixed date {}", self.date));
        Ok(())
    }
}

impl Factory for FixedDate {
    const NAMESPACE: &'static str = "date";
    type Config = FixedDateConfig;

    fn requires() -> Requires {
        Requires::logged()
    }

    fn new(config: FixedDateConfig) -> Result<Self, NodeError> {
        Ok(Self {
            core: NodeCore::new(),
            date: config.date,
        })
    }
}

/// Timezone in which [`SystemDate`] reads the wall clock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timezone {
    Utc,
    Local,
    Fixed(FixedOffset),
    /// An IANA zone such as `America/New_York`
    Named(Tz),
}

impl FromStr for Timezone {
    type Err = NodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.to_ascii_lowercase().as_str() {
            "utc" | "z" => return Ok(Timezone::Utc),
            "local" => return Ok(Timezone::Local),
            _ => {}
        }
        if let Ok(offset) = FixedOffset::from_str(s) {
            return Ok(Timezone::Fixed(offset));
        }
        Tz::from_str(s).map(Timezone::Named).map_err(|_| {
            NodeError::Config(format!(
                "Unknown timezone '{}' (expected utc, local, an offset like +02:00 or an IANA name)",
                s
            ))
        })
    }
}

fn default_timezone() -> String {
    "America/New_York".to_string()
}

/// Configuration for [`SystemDate`]
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SystemDateConfig {
    /// `utc`, `local`, a fixed offset such as `-05:00` or an IANA zone name
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

/// Reports today's date from the system clock
pub struct SystemDate {
    core: NodeCore,
    timezone: Timezone,
}

impl SystemDate {
    pub fn timezone(&self) -> Timezone {
        self.timezone
    }
}

impl DateSource for SystemDate {
    fn today(&self) -> NaiveDate {
        match self.timezone {
            Timezone::Utc => Utc::now().date_naive(),
            Timezone::Local => Local::now().date_naive(),
            Timezone::Fixed(offset) => Utc::now().with_timezone(&offset).date_naive(),
            Timezone::Named(tz) => Utc::now().with_timezone(&tz).date_naive(),
        }
    }
}

impl Node for SystemDate {
    fn core(&self) -> &NodeCore {
        &self.core
    }
}

impl Factory for SystemDate {
    const NAMESPACE: &'static str = "date";
    type Config = SystemDateConfig;

    fn requires() -> Requires {
        Requires::logged()
    }

    fn new(config: SystemDateConfig) -> Result<Self, NodeError> {
        Ok(Self {
            core: NodeCore::new(),
            timezone: config.timezone.parse()?,
        })
    }
}
