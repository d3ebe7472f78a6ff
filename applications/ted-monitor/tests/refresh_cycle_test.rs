
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use ted_monitor::models::EnergyScope;
use ted_monitor::{AppError, CycleReport, MacroKind, Scheduler, SnapshotStore, StoreState};
use test_helpers::*;
use tokio::sync::watch;

fn read_macro(dir: &std::path::Path, kind: MacroKind) -> String {
    std::fs::read_to_string(dir.join(format!("{}.ted", kind.name()))).unwrap()
}

fn scheduler(transport: &ScriptedTransport, dir: std::path::PathBuf) -> Scheduler<ScriptedTransport> {
    Scheduler::new(gateway(transport), Arc::new(SnapshotStore::new()), &settings(dir))
}

#[tokio::test]
async fn test_full_cycle_writes_every_macro() {
    let dir = output_dir("full-cycle");
    let transport = ScriptedTransport::ted();
    let scheduler = scheduler(&transport, dir.clone());

    assert_eq!(scheduler.store().state(), StoreState::Cold);
    let report = scheduler.run_cycle().await.unwrap();

    assert_eq!(
        report,
        CycleReport {
            cycle: 1,
            fields_refreshed: 5,
            circuit_rows: 4,
            dashboard_rows: 2,
            files_written: 5,
        }
    );
    assert_eq!(scheduler.store().state(), StoreState::Warm);
    assert!(scheduler.gateway().last_error().is_none());

    let htol = read_macro(&dir, MacroKind::SpyderHighToLow);
    let dryer = htol.find(">Dryer<").unwrap();
    let pool = htol.find(">Pool pump<").unwrap();
    let oven = htol.find(">oven<").unwrap();
    assert!(dryer < pool && pool < oven);
    assert!(!htol.contains("Spare"));
    assert!(htol.contains("1.500 <span class=\"normal ted-unit\">kW</span>"));

    let atoz = read_macro(&dir, MacroKind::SpyderAlphabetical);
    let dryer = atoz.find(">Dryer<").unwrap();
    let oven = atoz.find(">oven<").unwrap();
    let pool = atoz.find(">Pool pump<").unwrap();
    assert!(dryer < oven && oven < pool);

    let dashboard = read_macro(&dir, MacroKind::Dashboard);
    assert!(dashboard.contains("⚡️</td><td class=\"ted-overview-description\">Grid"));
    assert!(dashboard.contains("☀️</td><td class=\"ted-overview-description\">Solar"));
    assert!(dashboard.contains("3.200 <span"));
    assert!(dashboard.contains("2.000 <span"));
    assert!(dashboard.contains("$0.38"));
    assert!(dashboard.contains("$0.24"));
    assert!(!dashboard.contains("MTU3"));

    let summary = read_macro(&dir, MacroKind::Summary);
    assert!(summary.contains("1.200 <span class=\"ted-unit\">kW</span>"));
    assert!(summary.contains("21.500 <span class=\"ted-unit\">kWh</span>"));
    assert!(summary.contains("345.7 <span"));
    assert!(summary.contains("912.3 <span"));

    let solar = read_macro(&dir, MacroKind::SolarNow);
    assert!(solar.contains("rotate(72deg)"));
    assert!(solar.contains("2.000 <span class=\"ted-unit\">kW</span>"));

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_failed_category_keeps_previous_values() {
    let dir = output_dir("stale");
    let transport = ScriptedTransport::ted();
    let scheduler = scheduler(&transport, dir.clone());
    scheduler.run_cycle().await.unwrap();

    transport.fail("SystemOverview.xml?T=1");
    transport.set("SystemOverview.xml?T=0", &overview_xml(&[9999, -4000, 0, 0]));
    transport.set(
        "SpyderData.xml?T=0",
        &spyder_xml(&[&[(100, 1500, 30_000), (3000, 4000, 9000), (0, 0, 0)], &[(750, 2500, 40_000)]]),
    );

    let report = scheduler.run_cycle().await.unwrap();
    assert_eq!(report.cycle, 2);
    assert_eq!(report.fields_refreshed, 4);
    assert_eq!(report.dashboard_rows, 2);

    let error = scheduler.gateway().last_error().unwrap();
    assert_eq!(error.resource, "SystemOverview.xml");
    assert_eq!(error.status, None);

    // Power half succeeded, but the pair is only replaced as a whole.
    let dashboard = read_macro(&dir, MacroKind::Dashboard);
    assert!(dashboard.contains("3.200 <span"));
    assert!(!dashboard.contains("9.999"));

    let htol = read_macro(&dir, MacroKind::SpyderHighToLow);
    assert!(htol.find(">oven<").unwrap() < htol.find(">Dryer<").unwrap());

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_first_cycle_without_overview_renders_empty_dashboard() {
    let dir = output_dir("no-overview");
    let transport = ScriptedTransport::ted();
    transport.fail("SystemOverview.xml");
    let scheduler = scheduler(&transport, dir.clone());

    let report = scheduler.run_cycle().await.unwrap();
    assert_eq!(report.fields_refreshed, 4);
    assert_eq!(report.dashboard_rows, 0);
    assert_eq!(report.circuit_rows, 4);
    // solar-now has no reading to show
    assert_eq!(report.files_written, 4);

    let dashboard = read_macro(&dir, MacroKind::Dashboard);
    assert!(dashboard.contains("<tbody class=\"ted-dashboard-table-body\"></tbody>"));
    assert!(!dir.join("solar-now.ted").exists());

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_missing_settings_skips_tables_but_keeps_old_files() {
    let dir = output_dir("no-settings");
    std::fs::write(dir.join("spyder-htol.ted"), "previous").unwrap();

    let transport = ScriptedTransport::ted();
    transport.fail("SystemSettings.xml");
    let scheduler = scheduler(&transport, dir.clone());

    let report = scheduler.run_cycle().await.unwrap();
    assert_eq!(report.fields_refreshed, 4);
    assert_eq!(report.circuit_rows, 0);
    assert_eq!(report.files_written, 1);

    assert_eq!(read_macro(&dir, MacroKind::SpyderHighToLow), "previous");
    assert!(read_macro(&dir, MacroKind::Summary).contains("Energy Summary"));

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_rejected_request_records_status() {
    let dir = output_dir("rejected");
    let transport = ScriptedTransport::ted();
    transport.set("DashData.xml?T=1", "<DashData><Now>not a number</Now></DashData>");
    let scheduler = scheduler(&transport, dir.clone());

    let report = scheduler.run_cycle().await.unwrap();
    assert_eq!(report.fields_refreshed, 4);

    let error = scheduler.gateway().last_error().unwrap();
    assert_eq!(error.resource, "DashData.xml");
    assert_eq!(error.status, Some(200));

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_probe_reports_unreachable_device() {
    let transport = ScriptedTransport::ted();
    transport.fail("SystemSettings.xml");
    let gateway = gateway(&transport);

    match gateway.probe().await {
        Err(AppError::Unreachable(message)) => {
            assert!(message.contains("SystemSettings.xml"));
            assert!(message.contains("connection refused"));
        }
        other => panic!("expected Unreachable, got {:?}", other.map(|s| s.mtu_count)),
    }

    transport.recover("SystemSettings.xml");
    let settings = gateway.probe().await.unwrap();
    assert_eq!(settings.spyders.spyder.len(), 2);
}

#[tokio::test]
async fn test_usage_queries_are_memoized_per_selector() {
    let dir = output_dir("memo");
    let transport = ScriptedTransport::ted();
    let scheduler = scheduler(&transport, dir.clone());

    scheduler.run_cycle().await.unwrap();
    scheduler.run_cycle().await.unwrap();
    assert_eq!(scheduler.gateway().args_cache().len(), 2);

    let requests = transport.requests();
    assert_eq!(requests.len(), 16);
    assert_eq!(requests.iter().filter(|r| *r == "SpyderData.xml?D=0&T=1").count(), 2);
    assert_eq!(requests.iter().filter(|r| *r == "DashData.xml?D=0&T=0").count(), 2);
    assert!(requests
        .iter()
        .filter(|r| r.starts_with("SystemSettings.xml") || r.starts_with("Rate.xml"))
        .all(|r| r.contains("?U=")));

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_dashboard_records_are_tagged() {
    let transport = ScriptedTransport::ted();
    let gateway = gateway(&transport);

    let dash = gateway.get_dashboard(true, EnergyScope::Mtu, None).await;
    // The scripted device answers by resource and T only.
    let dash = dash.unwrap();
    assert!(dash.cost);
    assert_eq!(dash.scope, EnergyScope::Mtu);
    assert_eq!(dash.now, 14);
    assert!(transport
        .requests()
        .contains(&"DashData.xml?D=255&M=1&T=1".to_string()));
}

#[tokio::test]
async fn test_scheduler_runs_until_shutdown() {
    let dir = output_dir("run-loop");
    let transport = ScriptedTransport::ted();
    let store = Arc::new(SnapshotStore::new());
    let scheduler = Scheduler::new(gateway(&transport), store.clone(), &settings(dir.clone()));

    let (tx, rx) = watch::channel(false);
    let handle = tokio::spawn(scheduler.run(rx));

    // The first tick fires immediately; summary is the last file written.
    tokio::time::timeout(Duration::from_secs(5), async {
        while !dir.join("summary.ted").exists() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
    assert_eq!(store.current().cycle, 1);

    tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(store.current().cycle, 1);

    std::fs::remove_dir_all(&dir).ok();
}
