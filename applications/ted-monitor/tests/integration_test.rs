
use pretty_assertions::assert_eq;
use serial_test::serial;
use std::time::Duration;
use ted_monitor::models::{ct_indices, DashData, MtuType, Rate, SpyderData, SystemOverview, SystemSettings};
use ted_monitor::{AppError, Config, WireFormat};
use test_helpers::*;

fn write_config(name: &str, contents: &str) -> std::path::PathBuf {
    let path = std::env::temp_dir().join(format!("ted-{}-{}.yaml", name, std::process::id()));
    std::fs::write(&path, contents).unwrap();
    path
}

/// Test configuration loading
#[tokio::test]
#[serial]
async fn test_config_loading() {
    let path = write_config(
        "config",
        r#"
ted:
  hostname: "ted-ecc.local"
  port: 8080

monitor:
  refresh_interval_secs: 30
  output_dir: "/tmp/ted"
  fade_start_percent: 60
  solar_max_watts: 5000
"#,
    );

    let original = std::env::var("TED_HOSTNAME").ok();
    std::env::remove_var("TED_HOSTNAME");

    let config = Config::load(&path).unwrap();
    let settings = config.monitor_settings();

    if let Some(val) = original {
        std::env::set_var("TED_HOSTNAME", val);
    }

    assert_eq!(settings.hostname, "ted-ecc.local");
    assert_eq!(settings.port, 8080);
    assert_eq!(settings.request_timeout, Duration::from_secs(10));
    assert_eq!(settings.refresh_interval, Duration::from_secs(30));
    assert_eq!(settings.fade_point, Some(0.6));
    assert_eq!(settings.solar_max_watts, Some(5000));
    assert_eq!(settings.currency_symbol, "$");
    assert!(!settings.debug);

    std::fs::remove_file(&path).ok();
}

/// TED_HOSTNAME wins over the file
#[tokio::test]
#[serial]
async fn test_config_env_override() {
    let path = write_config("override", "ted:\n  hostname: \"from-file\"\n");

    std::env::set_var("TED_HOSTNAME", "from-env");
    let config = Config::load(&path);
    std::env::remove_var("TED_HOSTNAME");

    let config = config.unwrap();
    assert_eq!(config.ted.hostname, "from-env");
    assert_eq!(config.monitor.refresh_interval_secs, 10);

    std::fs::remove_file(&path).ok();
}

#[tokio::test]
#[serial]
async fn test_config_placeholders() {
    let path = write_config("placeholders", "ted:\n  hostname: \"${TED_TEST_ECC}\"\n");

    std::env::remove_var("TED_HOSTNAME");
    std::env::set_var("TED_TEST_ECC", "10.0.0.12");
    let config = Config::load(&path);
    std::env::remove_var("TED_TEST_ECC");

    assert_eq!(config.unwrap().ted.hostname, "10.0.0.12");
    std::fs::remove_file(&path).ok();
}

#[tokio::test]
#[serial]
async fn test_config_rejects_zero_interval() {
    let path = write_config(
        "zero-interval",
        "ted:\n  hostname: \"ted\"\nmonitor:\n  refresh_interval_secs: 0\n",
    );

    std::env::remove_var("TED_HOSTNAME");
    let result = Config::load(&path);
    assert!(matches!(result, Err(AppError::Config(_))));

    std::fs::remove_file(&path).ok();
}

#[test]
fn test_decode_system_settings() {
    let settings: SystemSettings = WireFormat::Xml.decode(SETTINGS_XML).unwrap();

    assert_eq!(settings.mtu_count, 2);
    assert_eq!(settings.carbon_cost, 1400);
    assert_eq!(settings.mtu_type(0), Some(MtuType::Net));
    assert_eq!(settings.mtu_type(1), Some(MtuType::Generation));
    assert_eq!(settings.generation_slot(), Some(1));

    assert_eq!(settings.mtus.mtu.len(), 4);
    assert_eq!(settings.mtu(0).unwrap().description, "Grid");
    assert!(settings.mtu(1).unwrap().is_present());
    assert!(!settings.mtu(2).unwrap().is_present());

    let spyders = &settings.spyders.spyder;
    assert_eq!(spyders.len(), 2);
    assert!(spyders[0].is_enabled());
    assert!(spyders[1].is_secondary());
    assert_eq!(spyders[0].cts.len(), 3);
    assert_eq!(spyders[0].groups.len(), 3);
    assert_eq!(spyders[0].groups[0].cts(), vec![0, 1]);
    assert_eq!(ct_indices(spyders[0].groups[1].use_ct), vec![2]);
    assert_eq!(settings.group_description(1, 0), Some("Pool pump"));
}

#[test]
fn test_decode_usage_payloads() {
    let rate: Rate = WireFormat::Xml.decode(RATE_XML).unwrap();
    assert_eq!(rate.current_rate, 1200);
    assert_eq!(rate.days_left_in_billing_cycle, 12);

    let spyders: SpyderData = WireFormat::Xml
        .decode(&spyder_xml(&[&[(1500, 1500, 30_000)], &[(7, 8, 9)]]))
        .unwrap();
    assert_eq!(spyders.group(0, 0).unwrap().now, 1500);
    assert_eq!(spyders.group(1, 0).unwrap().month_to_date, 9);
    assert!(spyders.group(1, 1).is_none());

    let overview: SystemOverview = WireFormat::Xml.decode(&overview_xml(&[3200, -2000])).unwrap();
    assert_eq!(overview.mtu(0).unwrap().value, 3200);
    assert_eq!(overview.mtu(1).unwrap().value, -2000);
    assert_eq!(overview.mtu(1).unwrap().phase_voltage.b, 1201);
    assert!(overview.mtu(2).is_none());
    assert_eq!(overview.slots().filter(Option::is_some).count(), 2);

    let dash: DashData = WireFormat::Xml.decode(&dash_xml(1200, 21_500, 345_678, 912_345)).unwrap();
    assert_eq!(dash.now, 1200);
    assert_eq!(dash.projected, 912_345);
    assert_eq!(dash.voltage, 1215);
}

#[test]
fn test_unknown_mtu_type_falls_back_to_net() {
    let xml = SETTINGS_XML.replace("<MTUType2>2</MTUType2>", "<MTUType2>9</MTUType2>");
    let settings: SystemSettings = WireFormat::Xml.decode(&xml).unwrap();
    assert_eq!(settings.mtu_type(1), Some(MtuType::Net));
    assert_eq!(settings.generation_slot(), None);
}
