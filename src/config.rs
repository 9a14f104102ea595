use std::time::Duration;

use serde_derive::Deserialize;

use crate::advertisement;
use crate::beacon::{BeaconIdentity, InvalidIdentity};
use crate::presence;
use crate::scanner::MatchPolicy;

#[derive(Deserialize, Debug, Clone)]
pub struct AppConfig {
    pub mqtt: MqttConfig,
    pub beacon: BeaconConfig,
    pub scan: Option<ScanConfig>,
    pub advertise: Option<AdvertiseConfig>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct MqttConfig {
    pub host: String,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub publisher_id: Option<String>,
    pub topic_path: Option<String>,
    pub keep_alive_seconds: Option<u64>,
}

/// The beacon identity this instance broadcasts or watches for.
#[derive(Deserialize, Debug, Clone)]
pub struct BeaconConfig {
    pub uuid: String,
    pub major: u32,
    pub minor: u32,
    /// Human-readable name used in log lines and MQTT announcements.
    pub name: Option<String>,
}

impl BeaconConfig {
    pub fn identity(&self) -> Result<BeaconIdentity, InvalidIdentity> {
        BeaconIdentity::parse(&self.uuid, self.major, self.minor)
    }

    pub fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.uuid.clone())
    }
}

#[derive(Deserialize, Debug, Clone)]
pub enum Manufacturer {
    Apple,
    RadiusNetworks,
}

impl Manufacturer {
    /// https://bitbucket.org/bluetooth-SIG/public/src/main/assigned_numbers/company_identifiers/company_identifiers.yaml
    pub fn company_ids(&self) -> Vec<u16> {
        match self {
            Manufacturer::Apple => vec![0x004C],
            Manufacturer::RadiusNetworks => vec![0x0118],
        }
    }
}

#[derive(Deserialize, Debug, Default, Clone)]
pub struct ScanConfig {
    /// Consecutive missed cycles tolerated before the beacon is declared
    /// absent.
    pub grace_period: Option<u32>,
    pub scan_cycle_ms: Option<u64>,
    pub manufacturer: Option<Manufacturer>,
    /// Raw company id override; takes precedence over `manufacturer`.
    pub manufacturer_code: Option<u16>,
    /// Require major/minor to match too, instead of the UUID alone.
    pub match_major_minor: Option<bool>,
}

impl ScanConfig {
    pub fn grace_period(&self) -> u32 {
        self.grace_period.unwrap_or(presence::DEFAULT_GRACE_PERIOD)
    }

    pub fn scan_cycle(&self) -> Duration {
        Duration::from_millis(self.scan_cycle_ms.unwrap_or(1100))
    }

    pub fn company_ids(&self) -> Vec<u16> {
        match self.manufacturer_code {
            Some(code) => vec![code],
            None => self
                .manufacturer
                .clone()
                .unwrap_or(Manufacturer::Apple)
                .company_ids(),
        }
    }

    pub fn match_policy(&self) -> MatchPolicy {
        if self.match_major_minor.unwrap_or(false) {
            MatchPolicy::FullIdentity
        } else {
            MatchPolicy::UuidOnly
        }
    }
}

#[derive(Deserialize, Debug, Default, Clone)]
pub struct AdvertiseConfig {
    pub manufacturer: Option<Manufacturer>,
    pub manufacturer_code: Option<u16>,
    pub calibrated_power: Option<i8>,
    /// Local name attached to the outer advertisement, if any.
    pub local_name: Option<String>,
}

impl AdvertiseConfig {
    pub fn manufacturer_code(&self) -> u16 {
        self.manufacturer_code.unwrap_or_else(|| {
            self.manufacturer
                .clone()
                .unwrap_or(Manufacturer::Apple)
                .company_ids()[0]
        })
    }

    pub fn calibrated_power(&self) -> i8 {
        self.calibrated_power
            .unwrap_or(advertisement::DEFAULT_CALIBRATED_POWER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config() {
        let config_str = r#"
            [mqtt]
            host = "localhost"
            port = 1883
            username = "user"
            password = "pass"

            [beacon]
            uuid = "2f234454-cf6d-4a0f-adf2-f4911ba9ffa6"
            major = 1
            minor = 7
            name = "Gallery 3 east wall"

            [scan]
            grace_period = 5
            scan_cycle_ms = 1500

            [advertise]
            manufacturer = "RadiusNetworks"
        "#;
        let config: AppConfig = toml::de::from_str(config_str).unwrap();
        assert!(config.mqtt.host == "localhost");

        let identity = config.beacon.identity().unwrap();
        assert_eq!(identity.major, 1);
        assert_eq!(identity.minor, 7);
        assert_eq!(config.beacon.display_name(), "Gallery 3 east wall");

        let scan = config.scan.unwrap();
        assert_eq!(scan.grace_period(), 5);
        assert_eq!(scan.scan_cycle(), Duration::from_millis(1500));
        assert_eq!(scan.company_ids(), vec![0x004C]);
        assert_eq!(scan.match_policy(), MatchPolicy::UuidOnly);

        assert_eq!(config.advertise.unwrap().manufacturer_code(), 0x0118);
    }

    #[test]
    fn test_config_defaults() {
        let config_str = r#"
            [mqtt]
            host = "localhost"

            [beacon]
            uuid = "2f234454-cf6d-4a0f-adf2-f4911ba9ffa6"
            major = 0
            minor = 0
        "#;
        let config: AppConfig = toml::de::from_str(config_str).unwrap();
        assert!(config.scan.is_none());

        let scan = ScanConfig::default();
        assert_eq!(scan.grace_period(), 10);
        assert_eq!(scan.scan_cycle(), Duration::from_millis(1100));
        assert_eq!(scan.company_ids(), vec![0x004C]);

        let advertise = AdvertiseConfig::default();
        assert_eq!(advertise.manufacturer_code(), 0x004C);
        assert_eq!(advertise.calibrated_power(), -59);

        // display name falls back to the uuid text
        assert_eq!(
            config.beacon.display_name(),
            "2f234454-cf6d-4a0f-adf2-f4911ba9ffa6"
        );
    }

    #[test]
    fn test_config_overrides() {
        let config_str = r#"
            [mqtt]
            host = "localhost"

            [beacon]
            uuid = "2f234454-cf6d-4a0f-adf2-f4911ba9ffa6"
            major = 1
            minor = 2

            [scan]
            manufacturer = "Apple"
            manufacturer_code = 0x0118
            match_major_minor = true
        "#;
        let config: AppConfig = toml::de::from_str(config_str).unwrap();
        let scan = config.scan.unwrap();
        // the raw code wins over the manufacturer name
        assert_eq!(scan.company_ids(), vec![0x0118]);
        assert_eq!(scan.match_policy(), MatchPolicy::FullIdentity);
    }

    #[test]
    fn test_config_rejects_bad_identity() {
        let config_str = r#"
            [mqtt]
            host = "localhost"

            [beacon]
            uuid = "2f234454-cf6d-4a0f-adf2-f4911ba9ffa6"
            major = 100000
            minor = 0
        "#;
        let config: AppConfig = toml::de::from_str(config_str).unwrap();
        assert!(config.beacon.identity().is_err());
    }
}
