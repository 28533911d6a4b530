use super::*;
use crate::component::{Component, ShutdownScope};
use crate::error::ServiceError;
use crate::Orchestrator;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn scope() -> ShutdownScope {
    ShutdownScope::new(Duration::from_secs(5))
}

#[tokio::test]
async fn test_lifecycle_startup_hooks_run_in_order_and_stop_at_first_error() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let (c1, c2, c3) = (calls.clone(), calls.clone(), calls.clone());

    let component = LifecycleComponent::new("hooks")
        .on_startup(move || {
            let calls = c1.clone();
            async move {
                calls.lock().push("first");
                Ok(())
            }
        })
        .on_startup(move || {
            let calls = c2.clone();
            async move {
                calls.lock().push("second");
                Err(ServiceError::component("hooks", "no database"))
            }
        })
        .on_startup(move || {
            let calls = c3.clone();
            async move {
                calls.lock().push("third");
                Ok(())
            }
        });

    let err = component.startup().await.unwrap_err();

    assert_eq!(err.to_string(), "Component error in hooks: no database");
    assert_eq!(*calls.lock(), vec!["first", "second"]);
}

#[tokio::test]
async fn test_lifecycle_without_run_idles_until_closed() {
    let component = Arc::new(LifecycleComponent::new("idle"));
    let runner = Arc::clone(&component);
    let run = tokio::spawn(async move { runner.run().await });

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!run.is_finished());

    component.close(&scope()).await.unwrap();
    let result = tokio::time::timeout(Duration::from_secs(1), run)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_lifecycle_run_sees_stop_signal() {
    let component = Arc::new(LifecycleComponent::new("worker").on_run(|stop| async move {
        stop.wait().await;
        Err(ServiceError::component("worker", "stopped"))
    }));
    let runner = Arc::clone(&component);
    let run = tokio::spawn(async move { runner.run().await });

    component.close(&scope()).await.unwrap();
    let result = run.await.unwrap();

    assert_eq!(result.unwrap_err().to_string(), "Component error in worker: stopped");
}

#[tokio::test]
async fn test_lifecycle_cleanup_returns_first_error() {
    let cleaned = Arc::new(AtomicUsize::new(0));
    let (a, b) = (cleaned.clone(), cleaned.clone());

    let component = LifecycleComponent::new("cleanup")
        .on_close(move |_scope| {
            let cleaned = a.clone();
            async move {
                cleaned.fetch_add(1, Ordering::SeqCst);
                Err(ServiceError::component("cleanup", "flush failed"))
            }
        })
        .on_close(move |_scope| {
            let cleaned = b.clone();
            async move {
                cleaned.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

    let err = component.close(&scope()).await.unwrap_err();

    assert_eq!(err.to_string(), "Component error in cleanup: flush failed");
    assert_eq!(cleaned.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_cron_rejects_zero_interval() {
    let component = CronComponent::new(vec![ScheduledJob::new("spin", Duration::ZERO, || async {
        Ok(())
    })]);

    let err = component.startup().await.unwrap_err();

    assert!(err.to_string().contains("spin"));
}

#[tokio::test]
async fn test_cron_runs_jobs_until_closed_and_survives_failures() {
    let ticks = Arc::new(AtomicUsize::new(0));
    let counter = ticks.clone();

    let component = Arc::new(CronComponent::new(vec![
        ScheduledJob::new("count", Duration::from_millis(10), move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }),
        ScheduledJob::new("broken", Duration::from_millis(10), || async {
            Err(ServiceError::component("broken", "always fails"))
        }),
    ]));
    component.startup().await.unwrap();

    let runner = Arc::clone(&component);
    let run = tokio::spawn(async move { runner.run().await });

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!run.is_finished());
    assert!(ticks.load(Ordering::SeqCst) >= 2);

    component.close(&scope()).await.unwrap();
    assert!(run.await.unwrap().is_ok());
}

#[tokio::test]
async fn test_cron_panicking_job_keeps_firing() {
    let fired = Arc::new(AtomicUsize::new(0));
    let counter = fired.clone();

    let component = Arc::new(CronComponent::new(vec![ScheduledJob::new(
        "explodes",
        Duration::from_millis(10),
        move || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    panic!("first run blew up");
                }
                Ok(())
            }
        },
    )]));
    component.startup().await.unwrap();

    let runner = Arc::clone(&component);
    let run = tokio::spawn(async move { runner.run().await });

    tokio::time::sleep(Duration::from_millis(120)).await;
    assert!(!run.is_finished());
    assert!(fired.load(Ordering::SeqCst) >= 2);

    component.close(&scope()).await.unwrap();
    assert!(run.await.unwrap().is_ok());
}

#[tokio::test]
async fn test_cron_close_before_run_returns_immediately() {
    let component = CronComponent::new(Vec::new());

    let closed = tokio::time::timeout(Duration::from_secs(1), component.close(&scope())).await;

    assert!(matches!(closed, Ok(Ok(()))));
}

#[tokio::test]
async fn test_queue_first_handler_result_ends_run() {
    let component = QueueComponent::new(vec![
        handler(|ctx: QueueContext| async move {
            ctx.stopped().await;
            Ok(())
        }),
        handler(|_ctx: QueueContext| async move {
            Err(ServiceError::component("consumer", "broker gone"))
        }),
    ]);

    let result = tokio::time::timeout(Duration::from_secs(1), component.run())
        .await
        .unwrap();

    assert_eq!(result.unwrap_err().to_string(), "Component error in consumer: broker gone");
}

#[tokio::test]
async fn test_queue_reported_errors_do_not_end_run() {
    let component = QueueComponent::new(vec![handler(|ctx: QueueContext| async move {
        for i in 0..20 {
            ctx.report(ServiceError::component("consumer", format!("bad message {}", i)))
                .await;
        }
        ctx.stopped().await;
        Ok(())
    })]);
    let component = Arc::new(component);

    let runner = Arc::clone(&component);
    let run = tokio::spawn(async move { runner.run().await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!run.is_finished());

    component.close(&scope()).await.unwrap();
    let result = tokio::time::timeout(Duration::from_secs(1), run)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_queue_close_stops_handlers_and_calls_close_fn() {
    let closed = Arc::new(AtomicUsize::new(0));
    let counter = closed.clone();

    let component = Arc::new(
        QueueComponent::new(vec![handler(|ctx: QueueContext| async move {
            ctx.stopped().await;
            assert!(ctx.is_stopped());
            Ok(())
        })])
        .with_close(move |_scope| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }),
    );

    let runner = Arc::clone(&component);
    let run = tokio::spawn(async move { runner.run().await });
    tokio::time::sleep(Duration::from_millis(20)).await;

    component.close(&scope()).await.unwrap();

    assert!(run.await.unwrap().is_ok());
    assert_eq!(closed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_queue_handler_failure_drives_orchestrator_shutdown() {
    let cleaned = Arc::new(AtomicUsize::new(0));
    let counter = cleaned.clone();

    let orchestrator = Orchestrator::builder()
        .component(LifecycleComponent::new("cache").on_close(move |_scope| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }))
        .component(QueueComponent::new(vec![handler(|_ctx: QueueContext| async move {
            Err(ServiceError::component("consumer", "db down"))
        })]))
        .shutdown_timeout(Duration::from_secs(1))
        .build();

    let err = orchestrator
        .launch_until(std::future::pending::<String>())
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Component error in consumer: db down");
    assert_eq!(cleaned.load(Ordering::SeqCst), 1);
}

#[cfg(feature = "http")]
mod http_endpoints {
    use super::*;
    use crate::config::{CorsConfig, EndpointConfig, ServerConfig};
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::routing::get;
    use axum::Router;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tower::ServiceExt;

    async fn get_body(router: Router, uri: &str) -> (StatusCode, String) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    fn loopback_server() -> ServerConfig {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            ..ServerConfig::default()
        }
    }

    #[tokio::test]
    async fn test_healthz_without_providers_answers_ok() {
        let (status, body) = get_body(HealthChecker::new(Vec::new()).router(), "/healthz").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "OK");
    }

    #[tokio::test]
    async fn test_healthz_reports_failing_provider() {
        let checker = HealthChecker::new(vec![
            Provider::from_fn("database", || async { Ok(()) }),
            Provider::from_fn("broker", || async {
                Err(ServiceError::component("broker", "unreachable"))
            }),
        ]);

        let (status, body) = get_body(checker.router(), "/healthz").await;
        let response: HealthzResponse = serde_json::from_str(&body).unwrap();

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(!response.healthy);
        assert_eq!(
            response.services,
            vec![
                ServiceStatus {
                    name: "database".to_string(),
                    healthy: true,
                    error_message: None,
                },
                ServiceStatus {
                    name: "broker".to_string(),
                    healthy: false,
                    error_message: Some("Component error in broker: unreachable".to_string()),
                },
            ]
        );
        assert!(!body.contains("\"error_message\":null"));
    }

    #[tokio::test]
    async fn test_healthz_all_healthy_is_200() {
        let checker = HealthChecker::new(vec![Provider::from_fn("database", || async { Ok(()) })]);

        let (status, body) = get_body(checker.router(), "/healthz").await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("\"healthy\":true"));
    }

    #[tokio::test]
    async fn test_liveliness_always_ok() {
        let checker = HealthChecker::new(vec![Provider::from_fn("broker", || async {
            Err(ServiceError::component("broker", "unreachable"))
        })]);

        let (status, body) = get_body(checker.router(), "/liveliness").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "OK");
    }

    #[tokio::test]
    async fn test_cors_preflight_allows_configured_origin() {
        let config = ServerConfig {
            cors: Some(CorsConfig {
                allowed_origins: vec!["https://example.com".to_string()],
                allow_credentials: true,
                allowed_headers: vec!["authorization".to_string()],
            }),
            ..ServerConfig::default()
        };
        let router = super::super::http::build_router(
            Router::new().route("/hello", get(|| async { "hello" })),
            &config,
        )
        .unwrap();

        let response = router
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/hello")
                    .header(header::ORIGIN, "https://example.com")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "https://example.com"
        );
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_CREDENTIALS],
            "true"
        );
    }

    #[tokio::test]
    async fn test_cors_wildcard_with_credentials_is_rejected() {
        let config = ServerConfig {
            cors: Some(CorsConfig {
                allowed_origins: vec!["*".to_string()],
                allow_credentials: true,
                allowed_headers: Vec::new(),
            }),
            ..ServerConfig::default()
        };

        assert!(HttpComponent::new(Router::new(), &config).is_err());
    }

    #[tokio::test]
    async fn test_http_component_serves_over_loopback() {
        let router = Router::new().route("/hello", get(|| async { "hello world" }));
        let component = Arc::new(HttpComponent::new(router, &loopback_server()).unwrap());

        component.startup().await.unwrap();
        let addr = component.local_addr().unwrap();

        let runner = Arc::clone(&component);
        let run = tokio::spawn(async move { runner.run().await });

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /hello HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();

        assert!(response.starts_with("HTTP/1.1 200 OK"), "{}", response);
        assert!(response.ends_with("hello world"));

        component.close(&scope()).await.unwrap();
        let served = tokio::time::timeout(Duration::from_secs(1), run)
            .await
            .unwrap()
            .unwrap();
        assert!(served.is_ok());
    }

    #[tokio::test]
    async fn test_close_racing_serve_waits_for_drain() {
        for _ in 0..20 {
            let router = Router::new().route("/hello", get(|| async { "hello" }));
            let component = Arc::new(HttpComponent::new(router, &loopback_server()).unwrap());
            component.startup().await.unwrap();

            let runner = Arc::clone(&component);
            let run = tokio::spawn(async move { runner.run().await });
            tokio::task::yield_now().await;

            component.close(&scope()).await.unwrap();
            let served = tokio::time::timeout(Duration::from_secs(1), run)
                .await
                .unwrap()
                .unwrap();
            assert!(served.is_ok());
        }
    }

    #[tokio::test]
    async fn test_http_component_reports_bind_failure() {
        let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = ServerConfig {
            port: taken.local_addr().unwrap().port(),
            ..loopback_server()
        };
        let component = HttpComponent::new(Router::new(), &config).unwrap();

        let err = component.startup().await.unwrap_err();

        assert!(err.to_string().starts_with("Component error in http: failed to bind"));
    }

    #[tokio::test]
    async fn test_disabled_server_idles_until_closed() {
        let config = ServerConfig {
            enabled: false,
            ..loopback_server()
        };
        let component = Arc::new(HttpComponent::new(Router::new(), &config).unwrap());

        component.startup().await.unwrap();
        assert!(component.local_addr().is_none());

        let runner = Arc::clone(&component);
        let run = tokio::spawn(async move { runner.run().await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!run.is_finished());

        component.close(&scope()).await.unwrap();
        assert!(run.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_healthz_component_binds_and_closes() {
        let config = EndpointConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            ..EndpointConfig::healthz()
        };
        let component = Arc::new(HealthzComponent::new(Vec::new(), &config));

        assert_eq!(component.name(), "healthz");
        component.startup().await.unwrap();
        assert!(component.local_addr().is_some());

        let runner = Arc::clone(&component);
        let run = tokio::spawn(async move { runner.run().await });
        tokio::time::sleep(Duration::from_millis(20)).await;

        component.close(&scope()).await.unwrap();
        assert!(run.await.unwrap().is_ok());
    }

    #[cfg(feature = "metrics")]
    #[tokio::test]
    async fn test_metrics_renders_registry() {
        let registry = prometheus::Registry::new();
        let requests = prometheus::IntCounter::new("demo_requests_total", "Demo requests").unwrap();
        registry.register(Box::new(requests.clone())).unwrap();
        requests.inc_by(3);

        let router = metrics_router(registry.clone()).unwrap();
        let response = router
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            prometheus::TEXT_FORMAT
        );
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(body.contains("demo_requests_total 3"));
        assert!(body.contains("metricz_scrapes_total 1"));

        // The scrape counter can only be registered once per registry.
        assert!(metrics_router(registry).is_err());
    }

    #[cfg(feature = "metrics")]
    #[tokio::test]
    async fn test_metricz_component_is_named() {
        let component =
            MetriczComponent::new(prometheus::Registry::new(), &EndpointConfig::metricz()).unwrap();

        assert_eq!(component.name(), "metricz");
        assert!(component.local_addr().is_none());
    }
}
