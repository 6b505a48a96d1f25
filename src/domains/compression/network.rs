//! Network condition sources.
//!
//! A host platform exposes its connection details through a [`NetworkMonitor`];
//! [`get_network_info`] turns whatever it reports into a [`NetworkInfo`] snapshot.

use serde::{Deserialize, Serialize};
use std::env;
use std::sync::RwLock;

use super::types::{parse_flag, EffectiveType, NetworkInfo};

/// Raw connection fields as a platform reports them; any of them may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionSnapshot {
    #[serde(default)]
    pub effective_type: Option<String>,
    #[serde(default)]
    pub save_data: Option<bool>,
    #[serde(default)]
    pub downlink: Option<f64>,
    #[serde(default)]
    pub rtt: Option<f64>,
}

/// Source of connection details
pub trait NetworkMonitor: Send + Sync {
    /// `None` when the platform has no network-information API at all.
    fn connection(&self) -> Option<ConnectionSnapshot>;
}

/// Normalize the monitor's current snapshot.
pub fn get_network_info(monitor: Option<&dyn NetworkMonitor>) -> NetworkInfo {
    match monitor.and_then(|m| m.connection()) {
        Some(snapshot) => snapshot.into(),
        None => NetworkInfo::default(),
    }
}

impl From<ConnectionSnapshot> for NetworkInfo {
    fn from(snapshot: ConnectionSnapshot) -> Self {
        Self {
            effective_type: snapshot
                .effective_type
                .as_deref()
                .map(EffectiveType::parse_lenient)
                .unwrap_or_default(),
            save_data: snapshot.save_data.unwrap_or(false),
            downlink: snapshot.downlink.filter(|v| v.is_finite()),
            rtt: snapshot.rtt.filter(|v| v.is_finite()),
        }
    }
}

/// Platform without a network-information API.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoNetworkApi;

impl NetworkMonitor for NoNetworkApi {
    fn connection(&self) -> Option<ConnectionSnapshot> {
        None
    }
}

/// Snapshot pushed in by the host, e.g. from a connectivity listener.
#[derive(Debug, Default)]
pub struct StaticNetworkMonitor {
    snapshot: RwLock<Option<ConnectionSnapshot>>,
}

impl StaticNetworkMonitor {
    pub fn new(snapshot: Option<ConnectionSnapshot>) -> Self {
        Self {
            snapshot: RwLock::new(snapshot),
        }
    }

    pub fn update(&self, snapshot: Option<ConnectionSnapshot>) {
        match self.snapshot.write() {
            Ok(mut guard) => *guard = snapshot,
            Err(poisoned) => *poisoned.into_inner() = snapshot,
        }
    }
}

impl NetworkMonitor for StaticNetworkMonitor {
    fn connection(&self) -> Option<ConnectionSnapshot> {
        match self.snapshot.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

/// Reads `UPLOAD_NETWORK_EFFECTIVE_TYPE`, `UPLOAD_NETWORK_SAVE_DATA`,
/// `UPLOAD_NETWORK_DOWNLINK` and `UPLOAD_NETWORK_RTT`.
///
/// Reports no API when none of them is set.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvNetworkMonitor;

impl NetworkMonitor for EnvNetworkMonitor {
    fn connection(&self) -> Option<ConnectionSnapshot> {
        let effective_type = env::var("UPLOAD_NETWORK_EFFECTIVE_TYPE").ok();
        let save_data = env::var("UPLOAD_NETWORK_SAVE_DATA").ok();
        let downlink = env::var("UPLOAD_NETWORK_DOWNLINK").ok();
        let rtt = env::var("UPLOAD_NETWORK_RTT").ok();

        if effective_type.is_none() && save_data.is_none() && downlink.is_none() && rtt.is_none() {
            return None;
        }

        Some(ConnectionSnapshot {
            effective_type,
            save_data: save_data.as_deref().and_then(parse_flag),
            downlink: downlink.and_then(|val| val.trim().parse::<f64>().ok()),
            rtt: rtt.and_then(|val| val.trim().parse::<f64>().ok()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::compression::ENV_LOCK;

    const NETWORK_VARS: [&str; 4] = [
        "UPLOAD_NETWORK_EFFECTIVE_TYPE",
        "UPLOAD_NETWORK_SAVE_DATA",
        "UPLOAD_NETWORK_DOWNLINK",
        "UPLOAD_NETWORK_RTT",
    ];

    fn clear_network_vars() {
        for var in NETWORK_VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_missing_api_yields_empty_info() {
        assert_eq!(get_network_info(None), NetworkInfo::default());
        assert_eq!(get_network_info(Some(&NoNetworkApi)), NetworkInfo::default());
    }

    #[test]
    fn test_snapshot_normalization() {
        let monitor = StaticNetworkMonitor::new(Some(ConnectionSnapshot {
            effective_type: Some("3g".to_string()),
            save_data: None,
            downlink: Some(1.5),
            rtt: Some(f64::NAN),
        }));

        let info = get_network_info(Some(&monitor));
        assert_eq!(info.effective_type, EffectiveType::ThreeG);
        assert!(!info.save_data);
        assert_eq!(info.downlink, Some(1.5));
        assert_eq!(info.rtt, None);
    }

    #[test]
    fn test_unknown_effective_type() {
        let monitor = StaticNetworkMonitor::new(Some(ConnectionSnapshot {
            effective_type: Some("wifi".to_string()),
            save_data: Some(true),
            ..ConnectionSnapshot::default()
        }));

        let info = get_network_info(Some(&monitor));
        assert_eq!(info.effective_type, EffectiveType::Unknown);
        assert!(info.save_data);
    }

    #[test]
    fn test_static_monitor_update() {
        let monitor = StaticNetworkMonitor::default();
        assert!(monitor.connection().is_none());

        monitor.update(Some(ConnectionSnapshot {
            effective_type: Some("4g".to_string()),
            ..ConnectionSnapshot::default()
        }));
        assert_eq!(get_network_info(Some(&monitor)).effective_type, EffectiveType::FourG);

        monitor.update(None);
        assert_eq!(get_network_info(Some(&monitor)), NetworkInfo::default());
    }

    #[test]
    fn test_env_monitor_without_vars_has_no_api() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_network_vars();

        assert!(EnvNetworkMonitor.connection().is_none());
        assert_eq!(get_network_info(Some(&EnvNetworkMonitor)), NetworkInfo::default());
    }

    #[test]
    fn test_env_monitor_reads_vars() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_network_vars();
        env::set_var("UPLOAD_NETWORK_EFFECTIVE_TYPE", "slow-2g");
        env::set_var("UPLOAD_NETWORK_SAVE_DATA", "yes");
        env::set_var("UPLOAD_NETWORK_DOWNLINK", " 0.25 ");
        env::set_var("UPLOAD_NETWORK_RTT", "fast");

        let info = get_network_info(Some(&EnvNetworkMonitor));
        clear_network_vars();

        assert_eq!(info.effective_type, EffectiveType::Slow2g);
        assert!(info.save_data);
        assert_eq!(info.downlink, Some(0.25));
        assert_eq!(info.rtt, None);
    }

    #[test]
    fn test_env_monitor_single_var_is_enough() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_network_vars();
        env::set_var("UPLOAD_NETWORK_SAVE_DATA", "1");

        let snapshot = EnvNetworkMonitor.connection();
        clear_network_vars();

        let snapshot = snapshot.unwrap();
        assert_eq!(snapshot.effective_type, None);
        assert_eq!(snapshot.save_data, Some(true));
    }
}
