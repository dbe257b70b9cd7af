//! Command handlers.
//!
//! Each handler maps one parsed command onto store/registry state and
//! returns a `Response` value; protocol failures (bad mac, conflicts,
//! persistence errors) are response statuses, never Rust errors.

use netwarden_core::command::CommandKind;
use netwarden_core::response::Response;
use netwarden_core::types::{parse_ipv4, AllowlistEntry, MacAddr};

use crate::context::ServerContext;

/// Execute one parsed command against the shared state.
pub fn dispatch(context: &ServerContext, kind: CommandKind, args: &[&str]) -> Response {
    match kind {
        CommandKind::List => list(context),
        CommandKind::Allowlist => allowlist(context),
        CommandKind::Add => add(context, args),
        CommandKind::Del => del(context, args),
        CommandKind::Status => status(context),
        CommandKind::Quit => Response::success("Goodbye"),
    }
}

/// Devices currently visible on the network.
fn list(context: &ServerContext) -> Response {
    let devices = context.registry.all();
    Response::success(format!("{} device(s) found", devices.len())).with_devices(devices)
}

/// Allowlist entries rendered as device records.
fn allowlist(context: &ServerContext) -> Response {
    let devices: Vec<_> = context
        .store
        .list()
        .iter()
        .map(AllowlistEntry::to_record)
        .collect();
    Response::success(format!("{} allowlisted device(s)", devices.len())).with_devices(devices)
}

fn add(context: &ServerContext, args: &[&str]) -> Response {
    let mac: MacAddr = match args[0].parse() {
        Ok(mac) => mac,
        Err(err) => return Response::error(err.to_string()),
    };
    let hostname = args.get(1).copied();
    let ip = match args.get(2) {
        Some(raw) => match parse_ipv4(raw) {
            Ok(ip) => Some(ip),
            Err(err) => return Response::error(err.to_string()),
        },
        None => None,
    };

    match context.store.add(AllowlistEntry::new(mac, hostname, ip)) {
        Ok(true) => {
            context.registry.reclassify();
            Response::success(format!("Device added: {mac}"))
        }
        Ok(false) => {
            Response::device_already_exists(format!("Device already in allowlist: {mac}"))
        }
        Err(err) => {
            tracing::error!(mac = %mac, error = %err, "Allowlist add failed");
            Response::error(format!("Could not persist allowlist: {err}"))
        }
    }
}

fn del(context: &ServerContext, args: &[&str]) -> Response {
    let mac: MacAddr = match args[0].parse() {
        Ok(mac) => mac,
        Err(err) => return Response::error(err.to_string()),
    };

    match context.store.remove(&mac) {
        Ok(true) => {
            context.registry.reclassify();
            Response::success(format!("Device removed: {mac}"))
        }
        Ok(false) => Response::device_not_found(format!("Device not in allowlist: {mac}")),
        Err(err) => {
            tracing::error!(mac = %mac, error = %err, "Allowlist remove failed");
            Response::error(format!("Could not persist allowlist: {err}"))
        }
    }
}

fn status(context: &ServerContext) -> Response {
    Response::success("Server operational").with_data(context.status_summary())
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;
    use std::sync::Arc;

    use netwarden_core::config::WardenConfig;
    use netwarden_core::response::Status;
    use netwarden_discover::registry::DeviceRegistry;
    use netwarden_discover::Observation;
    use netwarden_store::AllowlistStore;

    use super::*;

    fn test_context() -> (ServerContext, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let (store, _) = AllowlistStore::open(dir.path().join("allowlist.txt")).unwrap();
        let store = Arc::new(store);
        let registry = Arc::new(DeviceRegistry::new(Arc::clone(&store), false));
        (
            ServerContext::new(WardenConfig::default(), store, registry),
            dir,
        )
    }

    #[test]
    fn add_allowlist_del_del_scenario() {
        let (context, _dir) = test_context();
        let args = ["00:11:22:33:44:55", "TestDevice", "192.168.1.50"];

        let added = dispatch(&context, CommandKind::Add, &args);
        assert_eq!(added.status, Status::Success);

        let listed = dispatch(&context, CommandKind::Allowlist, &[]);
        assert_eq!(listed.devices.len(), 1);
        assert_eq!(listed.devices[0].mac.to_string(), "00:11:22:33:44:55");
        assert_eq!(listed.devices[0].hostname, "TestDevice");
        assert!(listed.devices[0].known);

        let removed = dispatch(&context, CommandKind::Del, &["00:11:22:33:44:55"]);
        assert_eq!(removed.status, Status::Success);

        let again = dispatch(&context, CommandKind::Del, &["00:11:22:33:44:55"]);
        assert_eq!(again.status, Status::DeviceNotFound);
    }

    #[test]
    fn add_rejects_malformed_mac_and_leaves_store_unchanged() {
        let (context, _dir) = test_context();

        let response = dispatch(&context, CommandKind::Add, &["not-a-mac"]);
        assert_eq!(response.status, Status::Error);
        assert!(response.message.contains("Invalid MAC address"));
        assert!(context.store.is_empty());
    }

    #[test]
    fn add_rejects_malformed_ip() {
        let (context, _dir) = test_context();

        let response = dispatch(
            &context,
            CommandKind::Add,
            &["00:11:22:33:44:55", "printer", "999.1.2.3"],
        );
        assert_eq!(response.status, Status::Error);
        assert!(response.message.contains("Invalid IPv4 address"));
        assert!(context.store.is_empty());
    }

    #[test]
    fn duplicate_add_reports_conflict() {
        let (context, _dir) = test_context();
        let args = ["AA:BB:CC:DD:EE:FF"];

        assert_eq!(
            dispatch(&context, CommandKind::Add, &args).status,
            Status::Success
        );
        assert_eq!(
            dispatch(&context, CommandKind::Add, &args).status,
            Status::DeviceAlreadyExists
        );
        assert_eq!(context.store.len(), 1);
    }

    #[test]
    fn add_reclassifies_registry_records() {
        let (context, _dir) = test_context();
        let obs = Observation {
            mac: "AA:BB:CC:DD:EE:01".parse().unwrap(),
            ip: Ipv4Addr::new(192, 168, 1, 40),
            hostname: "camera".to_string(),
        };
        context.registry.upsert(&obs);
        assert!(!context.registry.get(&obs.mac).unwrap().known);

        dispatch(&context, CommandKind::Add, &["AA:BB:CC:DD:EE:01"]);
        assert!(context.registry.get(&obs.mac).unwrap().known);

        dispatch(&context, CommandKind::Del, &["AA:BB:CC:DD:EE:01"]);
        assert!(!context.registry.get(&obs.mac).unwrap().known);
    }

    #[test]
    fn list_reflects_registry_contents() {
        let (context, _dir) = test_context();
        assert_eq!(dispatch(&context, CommandKind::List, &[]).devices.len(), 0);

        context.registry.upsert(&Observation {
            mac: "AA:BB:CC:DD:EE:02".parse().unwrap(),
            ip: Ipv4Addr::new(192, 168, 1, 41),
            hostname: "printer".to_string(),
        });

        let response = dispatch(&context, CommandKind::List, &[]);
        assert_eq!(response.status, Status::Success);
        assert_eq!(response.devices.len(), 1);
        assert_eq!(response.message, "1 device(s) found");
    }

    #[test]
    fn status_reports_counts_without_rows() {
        let (context, _dir) = test_context();
        dispatch(&context, CommandKind::Add, &["AA:BB:CC:DD:EE:03"]);

        let response = dispatch(&context, CommandKind::Status, &[]);
        assert_eq!(response.status, Status::Success);
        assert!(response.devices.is_empty());

        let data = response.data.unwrap();
        assert!(data.contains("allowlist=1"));
        assert!(data.contains("uptime="));
    }

    #[test]
    fn quit_says_goodbye() {
        let (context, _dir) = test_context();
        let response = dispatch(&context, CommandKind::Quit, &[]);
        assert_eq!(response.status, Status::Success);
        assert_eq!(response.message, "Goodbye");
    }
}
