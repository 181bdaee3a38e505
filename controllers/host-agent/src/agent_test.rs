#[cfg(test)]
mod tests {
    use crate::agent::Agent;
    use crate::session::Session;
    use crate::test_utils::*;
    use inventory_client::MockInventoryClient;
    use inventory_types::{ErrorKind, Host, RpcMethod};
    use std::sync::Arc;

    const MAC: &str = "08:00:27:aa:00:01";
    const NEIGHBOURS: &str = "lldpcli -f keyvalue show neighbors details";
    const TOR: &str = "lldp.eno2.chassis.mac=3c:fd:fe:00:00:01\nlldp.eno2.port.ifname=Ethernet7\n";

    struct Fixture {
        host: FakeHost,
        client: MockInventoryClient,
        runner: ScriptedRunner,
        record: Host,
    }

    impl Fixture {
        fn new() -> Self {
            let host = FakeHost::new();
            host.port("eno1", MAC, "0000:00:03.0", true);
            host.cpu(0, 0, 0, "0,1");
            host.cpu(1, 0, 0, "0,1");
            host.node(0, 8_388_608, 4_194_304);
            // configured hosts skip pre-configuration LLDP discovery
            host.flag("initial_config_complete");

            let client = MockInventoryClient::new();
            let record = Host::new(MAC);
            client.add_host(record.clone());
            Self {
                host,
                client,
                runner: ScriptedRunner::new(),
                record,
            }
        }

        fn agent(&self) -> Agent {
            self.agent_with(self.host.config())
        }

        fn agent_with(&self, config: crate::config::AgentConfig) -> Agent {
            Agent::new(
                Arc::new(config),
                Arc::new(self.client.clone()),
                Arc::new(self.runner.clone()),
            )
        }
    }

    #[tokio::test]
    async fn test_unknown_host_waits_for_next_audit() {
        let f = Fixture::new();
        f.client.remove_host(f.record.uuid);
        let mut session = Session::default();

        f.agent().audit(&mut session).await;
        assert!(session.host.is_none());
        assert_eq!(f.client.calls(), vec![RpcMethod::GetHostByMacs]);
    }

    #[tokio::test]
    async fn test_full_report_once_then_recurring() {
        let f = Fixture::new();
        let agent = f.agent();
        let mut session = Session::default();

        agent.audit(&mut session).await;
        assert_eq!(session.host_uuid(), Some(f.record.uuid));
        assert!(session.registered);
        for method in [
            RpcMethod::PortUpdateByHost,
            RpcMethod::PciDeviceUpdateByHost,
            RpcMethod::NumasUpdateByHost,
            RpcMethod::CpusUpdateByHost,
            RpcMethod::MemoryUpdateByHost,
            RpcMethod::LldpAgentUpdateByHost,
            RpcMethod::LldpNeighbourUpdateByHost,
        ] {
            assert_eq!(f.client.call_count(method), 1, "{method}");
        }
        assert_eq!(f.client.last_fact_count(RpcMethod::CpusUpdateByHost), Some(2));

        // audits 2..=4 send nothing, audit 5 is a recurring report
        for _ in 2..=5 {
            agent.audit(&mut session).await;
        }
        assert_eq!(f.client.call_count(RpcMethod::GetHostByMacs), 1);
        assert_eq!(f.client.call_count(RpcMethod::CpusUpdateByHost), 1);
        assert_eq!(f.client.call_count(RpcMethod::PortUpdateByHost), 1);
        assert_eq!(f.client.call_count(RpcMethod::MemoryUpdateByHost), 2);
        assert_eq!(f.client.call_count(RpcMethod::LldpNeighbourUpdateByHost), 2);
        assert_eq!(f.client.call_count(RpcMethod::PlatformUpdateByHost), 1);
    }

    #[tokio::test]
    async fn test_lookup_timeout_is_soft() {
        let f = Fixture::new();
        let agent = f.agent();
        let mut session = Session::default();
        f.client.fail_next(RpcMethod::GetHostByMacs, ErrorKind::Timeout);

        agent.audit(&mut session).await;
        assert!(session.host.is_none());
        agent.audit(&mut session).await;
        assert!(session.registered);
    }

    #[tokio::test]
    async fn test_internal_failure_forces_full_resend() {
        let f = Fixture::new();
        let agent = f.agent();
        let mut session = Session::default();
        agent.audit(&mut session).await;

        // audit 5 is recurring; the reconciler fails the memory update
        for _ in 2..=4 {
            agent.audit(&mut session).await;
        }
        f.client.fail_next(RpcMethod::MemoryUpdateByHost, ErrorKind::Internal);
        agent.audit(&mut session).await;
        assert!(session.resend_required);

        agent.audit(&mut session).await;
        assert!(!session.resend_required);
        assert_eq!(f.client.call_count(RpcMethod::PortUpdateByHost), 2);
        assert_eq!(f.client.call_count(RpcMethod::CpusUpdateByHost), 2);
    }

    #[tokio::test]
    async fn test_timeout_during_full_report_retries_it() {
        let f = Fixture::new();
        let agent = f.agent();
        let mut session = Session::default();
        f.client.fail_next(RpcMethod::CpusUpdateByHost, ErrorKind::Timeout);

        agent.audit(&mut session).await;
        assert!(!session.registered);
        assert!(session.host.is_some());

        agent.audit(&mut session).await;
        assert!(session.registered);
        assert_eq!(f.client.call_count(RpcMethod::GetHostByMacs), 1);
        assert_eq!(f.client.call_count(RpcMethod::CpusUpdateByHost), 2);
    }

    #[tokio::test]
    async fn test_deleted_host_is_rediscovered() {
        let f = Fixture::new();
        let agent = f.agent();
        let mut session = Session::default();
        agent.audit(&mut session).await;
        assert!(session.registered);

        f.client.remove_host(f.record.uuid);
        session.resend_required = true;
        agent.audit(&mut session).await;
        assert!(session.host.is_none());
        assert!(!session.registered);

        let replacement = Host::new(MAC);
        f.client.add_host(replacement.clone());
        agent.audit(&mut session).await;
        assert_eq!(session.host_uuid(), Some(replacement.uuid));
        assert!(session.registered);
        assert_eq!(f.client.call_count(RpcMethod::GetHostByMacs), 2);
    }

    #[tokio::test]
    async fn test_platform_ready_reported_once() {
        let f = Fixture::new();
        let agent = f.agent();
        let mut session = Session::default();
        agent.audit(&mut session).await;
        assert_eq!(f.client.call_count(RpcMethod::PlatformUpdateByHost), 0);

        f.host.flag("platform_ready");
        agent.audit(&mut session).await;
        agent.audit(&mut session).await;
        assert_eq!(f.client.call_count(RpcMethod::PlatformUpdateByHost), 1);
        assert!(f.client.last_platform_report().is_some_and(|r| r.first_report));
        assert!(session.platform_ready_reported);
    }

    #[tokio::test]
    async fn test_subfunctions_reported_and_config_notified() {
        let f = Fixture::new();
        let mut config = f.host.config();
        config.subfunctions = Some("controller,worker".to_string());
        let agent = f.agent_with(config);
        let mut session = Session::default();

        agent.audit(&mut session).await;
        agent.audit(&mut session).await;
        assert_eq!(f.client.call_count(RpcMethod::SubfunctionsUpdateByHost), 1);
        assert_eq!(f.client.call_count(RpcMethod::NotifySubfunctionsConfig), 0);
        assert_eq!(
            f.client.host(f.record.uuid).and_then(|h| h.subfunctions).as_deref(),
            Some("controller,worker")
        );

        f.host.flag("worker_config_complete");
        agent.audit(&mut session).await;
        agent.audit(&mut session).await;
        assert_eq!(f.client.call_count(RpcMethod::NotifySubfunctionsConfig), 1);
    }

    #[tokio::test]
    async fn test_ttys_dcd_applied_once_under_lock() {
        let f = Fixture::new();
        let agent = f.agent();
        let mut session = Session::default();
        let mut record = f.record.clone();
        record.ttys_dcd = Some(true);
        f.client.add_host(record);

        agent.audit(&mut session).await;
        agent.audit(&mut session).await;
        let stty: Vec<String> = f
            .runner
            .calls()
            .into_iter()
            .filter(|c| c.starts_with("stty"))
            .collect();
        assert_eq!(stty, vec!["stty -F /dev/ttyS0 -clocal".to_string()]);
        assert_eq!(session.ttys_dcd, Some(true));
        assert!(f.host.path("run/network-config.lock").exists());
    }

    #[tokio::test]
    async fn test_failed_stty_retried_next_audit() {
        let f = Fixture::new();
        let agent = f.agent();
        let mut session = Session::default();
        let mut record = f.record.clone();
        record.ttys_dcd = Some(false);
        f.client.add_host(record);
        f.runner.fail("stty -F /dev/ttyS0 clocal");

        agent.audit(&mut session).await;
        assert_eq!(session.ttys_dcd, None);
        assert!(session.host.is_some());
    }

    #[tokio::test]
    async fn test_unconfigured_host_runs_lldp_discovery_once() {
        let f = Fixture::new();
        std::fs::remove_file(f.host.path("flags/initial_config_complete")).unwrap();
        f.host.port("eno2", "08:00:27:aa:00:02", "0000:00:04.0", false);
        let agent = f.agent();
        let mut session = Session::default();

        agent.audit(&mut session).await;
        agent.audit(&mut session).await;
        let raised = f
            .runner
            .calls()
            .iter()
            .filter(|c| c.as_str() == "ip link set dev eno2 up")
            .count();
        assert_eq!(raised, 1);
        assert!(session.lldp_discovered);
    }

    #[tokio::test]
    async fn test_neighbours_heard_during_discovery_are_reported() {
        let f = Fixture::new();
        std::fs::remove_file(f.host.path("flags/initial_config_complete")).unwrap();
        f.host.port("eno2", "08:00:27:aa:00:02", "0000:00:04.0", false);
        // the switch is only heard while eno2 is raised
        f.runner.respond_once(NEIGHBOURS, TOR);
        let agent = f.agent();
        let mut session = Session::default();

        agent.audit(&mut session).await;
        let calls = f.runner.calls();
        let down = calls.iter().position(|c| c == "ip link set dev eno2 down");
        let last_poll = calls.iter().rposition(|c| c == NEIGHBOURS);
        assert!(matches!((down, last_poll), (Some(d), Some(p)) if d < p));
        assert_eq!(f.client.last_fact_count(RpcMethod::LldpNeighbourUpdateByHost), Some(1));
        assert!(session.lldp_discovered);
        assert!(session.lldp_discovery.is_none());
    }

    #[tokio::test]
    async fn test_discovery_kept_until_full_report_accepted() {
        let f = Fixture::new();
        std::fs::remove_file(f.host.path("flags/initial_config_complete")).unwrap();
        f.host.port("eno2", "08:00:27:aa:00:02", "0000:00:04.0", false);
        f.runner.respond_once(NEIGHBOURS, TOR);
        f.client.fail_next(RpcMethod::CpusUpdateByHost, ErrorKind::Timeout);
        let agent = f.agent();
        let mut session = Session::default();

        agent.audit(&mut session).await;
        assert!(!session.lldp_discovered);
        assert!(session.lldp_discovery.is_some());
        assert_eq!(f.client.call_count(RpcMethod::LldpNeighbourUpdateByHost), 0);

        agent.audit(&mut session).await;
        assert!(session.lldp_discovered);
        assert_eq!(f.client.last_fact_count(RpcMethod::LldpNeighbourUpdateByHost), Some(1));
        let raised = f
            .runner
            .calls()
            .iter()
            .filter(|c| c.as_str() == "ip link set dev eno2 up")
            .count();
        assert_eq!(raised, 1);
    }
}
