// Copyright (c) 2026 Dokku MCP contributors
// SPDX-License-Identifier: AGPL-3.0

mod support;

use std::time::Duration;

use dokku_mcp_core::application::command_gateway::GatewayError;
use dokku_mcp_core::domain::application::{Application, ApplicationState};
use dokku_mcp_core::domain::config::SecurityConfig;
use dokku_mcp_core::domain::error::DomainError;
use dokku_mcp_core::domain::events::ApplicationEvent;
use dokku_mcp_core::domain::policy::ClientContext;
use dokku_mcp_core::domain::process::ProcessType;
use dokku_mcp_core::domain::shared::{ApplicationName, GitRef};
use dokku_mcp_core::infrastructure::rate_limiter::RateLimiter;

use support::{args, harness, harness_full, harness_with, permissive_security};

fn client() -> ClientContext {
    ClientContext::new("c1")
}

#[test]
fn test_create_deploy_complete_then_drain() {
    let mut app = Application::create("web-1").unwrap();
    app.deploy(Some(GitRef::new("main").unwrap()), None).unwrap();
    app.complete_deployment();

    assert_eq!(app.state(), ApplicationState::Running);
    assert_eq!(app.deployment_info().deployment_count(), 1);

    let events = app.drain_events();
    assert_eq!(events.len(), 2);
    assert!(matches!(events[0], ApplicationEvent::ApplicationCreated { .. }));
    assert!(matches!(
        &events[1],
        ApplicationEvent::ApplicationDeployed { git_ref, .. } if git_ref == "main"
    ));
    assert!(app.drain_events().is_empty());
}

#[tokio::test]
async fn test_service_create_publishes_event_and_runs_remote_command() {
    let h = harness();
    let mut events = h.events.subscribe();

    let info = h.service.create_application(&client(), "Web-1").await.unwrap();
    assert_eq!(info.name, "web-1");
    assert_eq!(info.state, ApplicationState::Exists);

    assert_eq!(h.executor.calls(), vec![("apps:create".to_string(), args(&["web-1"]))]);
    let event = events.recv().await.unwrap();
    assert_eq!(event.event_type(), "application_created");

    let err = h.service.create_application(&client(), "web-1").await.unwrap_err();
    assert!(matches!(err, GatewayError::Domain(DomainError::AlreadyExists(_))));
    assert_eq!(h.executor.calls().len(), 1);
}

#[tokio::test]
async fn test_invalid_input_is_rejected_before_remote_call() {
    let h = harness();
    assert!(matches!(
        h.service.create_application(&client(), "-bad-").await,
        Err(GatewayError::Domain(DomainError::Validation(_)))
    ));

    h.service.create_application(&client(), "web-1").await.unwrap();
    assert!(matches!(
        h.service.scale(&client(), "web-1", "web", -1).await,
        Err(GatewayError::Domain(DomainError::Validation(_)))
    ));
    assert!(matches!(
        h.service.add_domain(&client(), "web-1", "not a domain").await,
        Err(GatewayError::Domain(DomainError::Validation(_)))
    ));
    assert!(matches!(
        h.service.scale(&client(), "ghost", "web", 1).await,
        Err(GatewayError::Domain(DomainError::NotFound(_)))
    ));
    assert_eq!(h.executor.commands(), vec!["apps:create"]);
}

#[tokio::test]
async fn test_deploy_success_and_remote_failure() {
    let h = harness();
    h.service.create_application(&client(), "web-1").await.unwrap();

    let status = h
        .service
        .deploy(&client(), "web-1", "https://github.com/acme/web.git", "main", None)
        .await
        .unwrap();
    assert_eq!(status.state, ApplicationState::Running);
    assert_eq!(
        h.executor.calls().last().unwrap(),
        &(
            "git:sync".to_string(),
            args(&["--build", "web-1", "https://github.com/acme/web.git", "main"])
        )
    );

    let mut app_events = h.events.subscribe_application(ApplicationName::new("web-1").unwrap());
    h.executor.fail("git:sync", 1, "build failed: missing Procfile");
    let err = h
        .service
        .deploy(&client(), "web-1", "https://github.com/acme/web.git", "v2", None)
        .await
        .unwrap_err();
    assert!(err.is_remote_failure());

    let status = h.service.application_status("web-1").await.unwrap();
    assert_eq!(status.state, ApplicationState::Error);
    assert!(status.is_deployed);

    assert_eq!(app_events.recv().await.unwrap().event_type(), "application_deployed");
    assert_eq!(
        app_events.recv().await.unwrap().event_type(),
        "application_deployment_failed"
    );
}

#[tokio::test]
async fn test_policy_denial_leaves_aggregate_untouched() {
    let h = harness_with(
        SecurityConfig::default(),
        RateLimiter::new(100, Duration::from_secs(60), Duration::from_secs(60)),
    );
    h.service.create_application(&client(), "web-1").await.unwrap();
    h.service.add_domain(&client(), "web-1", "web.example.com").await.unwrap();
    let before = h.service.application_status("web-1").await.unwrap();

    // The default blacklist contains "remove".
    let err = h.service.remove_domain(&client(), "web-1", "web.example.com").await.unwrap_err();
    assert!(matches!(err, GatewayError::PolicyDenied(_)));

    let after = h.service.application_status("web-1").await.unwrap();
    assert_eq!(after, before);
}

#[tokio::test]
async fn test_domain_lifecycle_and_scaling() {
    let h = harness();
    h.service.create_application(&client(), "web-1").await.unwrap();

    h.service.add_domain(&client(), "web-1", "web.example.com").await.unwrap();
    let err = h.service.add_domain(&client(), "web-1", "web.example.com").await.unwrap_err();
    assert!(matches!(err, GatewayError::Domain(DomainError::AlreadyExists(_))));

    let status = h.service.remove_domain(&client(), "web-1", "web.example.com").await.unwrap();
    assert!(status.domains.is_empty());
    let err = h.service.remove_domain(&client(), "web-1", "web.example.com").await.unwrap_err();
    assert!(matches!(err, GatewayError::Domain(DomainError::NotFound(_))));

    h.service.scale(&client(), "web-1", "worker", 3).await.unwrap();
    assert_eq!(
        h.executor.calls().last().unwrap().1,
        args(&["web-1", "worker=3"])
    );

    h.service.set_buildpack(&client(), "web-1", "heroku/nodejs").await.unwrap();
    h.service
        .set_environment_variable(&client(), "web-1", "NODE_ENV", "production")
        .await
        .unwrap();
    assert_eq!(
        h.executor.calls().last().unwrap(),
        &("config:set".to_string(), args(&["web-1", "NODE_ENV=production"]))
    );
}

#[tokio::test]
async fn test_every_mutation_is_audited() {
    let h = harness();
    h.service.create_application(&client(), "web-1").await.unwrap();
    let _ = h.service.scale(&client(), "web-1", "web", -5).await;

    let operations: Vec<_> = h
        .audit
        .records()
        .into_iter()
        .map(|r| (r.operation, r.success))
        .collect();
    assert_eq!(
        operations,
        vec![
            ("apps:create".to_string(), true),
            ("create_application".to_string(), true),
            ("scale".to_string(), false),
        ]
    );
}

#[tokio::test]
async fn test_import_and_fleet_summary() {
    let h = harness();
    h.executor.respond(
        "apps:list",
        Ok(dokku_mcp_core::application::CommandOutput::success(
            "=====> My Apps\napi\nweb-1\n\n",
        )),
    );
    h.service.create_application(&client(), "web-1").await.unwrap();

    let imported = h.service.import_applications(&client()).await.unwrap();
    assert_eq!(imported, vec!["api".to_string()]);

    h.service
        .deploy(&client(), "web-1", "https://github.com/acme/web.git", "main", None)
        .await
        .unwrap();

    let summary = h.service.fleet_summary().await.unwrap();
    assert_eq!(summary.total_apps, 2);
    assert_eq!(summary.running_apps, 1);
    assert_eq!(summary.stopped_apps, 1);
    assert_eq!(summary.deployed_apps, 1);

    let listed = h.service.list_applications().await.unwrap();
    assert_eq!(listed.count, 2);
    assert_eq!(listed.applications[0].name, "api");
}

#[tokio::test]
async fn test_scale_change_reported_in_event() {
    let h = harness();
    h.service.create_application(&client(), "web-1").await.unwrap();
    let mut events = h.events.subscribe();

    h.service.scale(&client(), "web-1", "web", 2).await.unwrap();
    h.service.scale(&client(), "web-1", "web", 5).await.unwrap();

    let _first = events.recv().await.unwrap();
    match events.recv().await.unwrap() {
        ApplicationEvent::ApplicationScaled { process_type, old_scale, new_scale, .. } => {
            assert_eq!(process_type, ProcessType::web().value());
            assert_eq!((old_scale, new_scale), (2, 5));
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[tokio::test]
async fn test_concurrent_operations_on_one_app_are_serialized() {
    let h = harness();
    h.service.create_application(&client(), "web-1").await.unwrap();
    h.executor.delay_all(Duration::from_millis(20));

    let (c1, c2) = (client(), client());
    let (a, b) = tokio::join!(
        h.service.add_domain(&c1, "web-1", "x.example.com"),
        h.service.add_domain(&c2, "web-1", "x.example.com"),
    );
    let (ok, err) = match (a, b) {
        (Ok(status), Err(e)) | (Err(e), Ok(status)) => (status, e),
        other => panic!("expected one success and one failure, got {:?}", other),
    };
    assert_eq!(ok.domains, vec!["x.example.com".to_string()]);
    assert!(matches!(err, GatewayError::Domain(DomainError::AlreadyExists(_))));

    let remote_adds = h.executor.commands().iter().filter(|c| *c == "domains:add").count();
    assert_eq!(remote_adds, 1);
}

#[tokio::test]
async fn test_timed_out_deploy_leaves_application_unchanged() {
    let limiter = RateLimiter::new(1000, Duration::from_secs(60), Duration::from_secs(60));
    let h = harness_full(permissive_security(), limiter, Duration::from_millis(50));
    h.service.create_application(&client(), "web-1").await.unwrap();
    let before = h.service.application_status("web-1").await.unwrap();
    let mut events = h.events.subscribe();

    h.executor.delay_all(Duration::from_secs(5));
    let err = h
        .service
        .deploy(&client(), "web-1", "https://github.com/acme/web.git", "main", None)
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Timeout(timeout) if timeout == Duration::from_millis(50)));

    let after = h.service.application_status("web-1").await.unwrap();
    assert_eq!(after, before);
    assert!(events.try_recv().is_err());

    // The lock is released, so the next operation on the app goes through.
    h.executor.delay_all(Duration::ZERO);
    h.service.scale(&client(), "web-1", "web", 2).await.unwrap();
}
