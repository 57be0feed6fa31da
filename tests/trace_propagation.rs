use std::time::{Duration, Instant};

use stayfinder_rs::connection::{dial, DialSettings};
use stayfinder_rs::dispatch::Role;
use stayfinder_rs::proto::geo::geo_server::GeoServer;
use stayfinder_rs::proto::search::{search_client::SearchClient, NearbyRequest};
use stayfinder_rs::test_support::fixture_config;
use stayfinder_rs::trace::{decode_grpc_timeout, MemoryReporter, SpanKind};
use tonic::service::Routes;

mod support;

use support::{memory_tracer, spawn_grpc, spawn_role, wait_for_spans, FakeGeo, SlowGeo};

fn union_square(in_date: &str) -> NearbyRequest {
    NearbyRequest {
        lat: 37.7879,
        lon: -122.4075,
        in_date: in_date.to_string(),
        out_date: "2015-04-10".to_string(),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn search_call_forms_one_trace_across_three_hops() -> anyhow::Result<()> {
    let reporter = MemoryReporter::default();
    let mut config = fixture_config();
    let (geo, _) = spawn_role(Role::Geo, config.clone(), memory_tracer("geo", &reporter)).await?;
    let (rate, _) = spawn_role(Role::Rate, config.clone(), memory_tracer("rate", &reporter)).await?;
    config.dependents.geo = geo.to_string();
    config.dependents.rate = rate.to_string();
    let (search, _) =
        spawn_role(Role::Search, config, memory_tracer("search", &reporter)).await?;

    let client_tracer = memory_tracer("client", &reporter);
    let connection = dial(
        Role::Search,
        &search.to_string(),
        &client_tracer,
        &DialSettings::default(),
    )
    .await?;
    let hotel_ids = SearchClient::new(connection)
        .nearby(union_square("2015-04-09"))
        .await?
        .into_inner()
        .hotel_ids;
    assert_eq!(hotel_ids, vec!["1", "3", "2"]);

    let spans = wait_for_spans(&reporter, 6).await;
    assert_eq!(spans.len(), 6);

    let root = spans
        .iter()
        .find(|span| span.service == "client")
        .expect("client span");
    assert_eq!(root.kind, SpanKind::Client);
    assert_eq!(root.context.parent_span_id, None);
    assert!(spans
        .iter()
        .all(|span| span.context.trace_id == root.context.trace_id));

    let search_server = spans
        .iter()
        .find(|span| span.service == "search" && span.kind == SpanKind::Server)
        .expect("search server span");
    assert_eq!(search_server.context.parent_span_id, Some(root.context.span_id));

    let search_clients: Vec<_> = spans
        .iter()
        .filter(|span| span.service == "search" && span.kind == SpanKind::Client)
        .collect();
    assert_eq!(search_clients.len(), 2);
    for client in &search_clients {
        assert_eq!(client.context.parent_span_id, Some(search_server.context.span_id));
    }

    for leaf in ["geo", "rate"] {
        let server = spans
            .iter()
            .find(|span| span.service == leaf)
            .expect("leaf server span");
        assert!(search_clients
            .iter()
            .any(|client| Some(client.context.span_id) == server.context.parent_span_id));
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn dependent_error_tags_spans_and_surfaces_once() -> anyhow::Result<()> {
    let reporter = MemoryReporter::default();
    let mut config = fixture_config();
    let (rate, _) = spawn_role(Role::Rate, config.clone(), memory_tracer("rate", &reporter)).await?;
    let (geo, _) = spawn_role(Role::Geo, config.clone(), memory_tracer("geo", &reporter)).await?;
    config.dependents.geo = geo.to_string();
    config.dependents.rate = rate.to_string();
    let (search, _) =
        spawn_role(Role::Search, config, memory_tracer("search", &reporter)).await?;

    let mut client = SearchClient::connect(format!("http://{search}")).await?;
    let status = client
        .nearby(NearbyRequest {
            lat: 91.0,
            ..union_square("2015-04-09")
        })
        .await
        .unwrap_err();
    assert_eq!(status.code(), tonic::Code::Unavailable);
    assert!(status.message().starts_with("geo: invalid location"));

    let spans = wait_for_spans(&reporter, 3).await;
    let geo_client = spans
        .iter()
        .find(|span| span.service == "search" && span.kind == SpanKind::Client)
        .expect("geo client span");
    assert!(geo_client.error.is_some());
    assert!(!spans.iter().any(|span| span.service == "rate"));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn inbound_deadline_flows_to_outbound_calls() -> anyhow::Result<()> {
    let reporter = MemoryReporter::default();
    let geo = FakeGeo {
        hotel_ids: vec!["1".to_string()],
        ..FakeGeo::default()
    };
    let (geo_addr, _) = spawn_grpc(Routes::new(GeoServer::new(geo.clone()))).await?;

    let mut config = fixture_config();
    let (rate, _) = spawn_role(Role::Rate, config.clone(), memory_tracer("rate", &reporter)).await?;
    config.dependents.geo = geo_addr.to_string();
    config.dependents.rate = rate.to_string();
    let (search, _) =
        spawn_role(Role::Search, config, memory_tracer("search", &reporter)).await?;

    let mut client = SearchClient::connect(format!("http://{search}")).await?;

    let mut request = tonic::Request::new(union_square("2015-04-09"));
    request.set_timeout(Duration::from_secs(3));
    let hotel_ids = client.nearby(request).await?.into_inner().hotel_ids;
    assert_eq!(hotel_ids, vec!["1"]);

    client.nearby(union_square("2015-04-09")).await?;

    let timeouts = geo.timeouts.lock().clone();
    assert_eq!(timeouts.len(), 2);
    let propagated = timeouts[0]
        .as_deref()
        .and_then(decode_grpc_timeout)
        .expect("grpc-timeout on outbound call");
    assert!(propagated <= Duration::from_secs(3));
    assert!(propagated > Duration::from_secs(1));
    assert_eq!(timeouts[1], None);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn expired_deadline_cancels_in_flight_outbound_call() -> anyhow::Result<()> {
    let reporter = MemoryReporter::default();
    let geo = SlowGeo {
        delay: Duration::from_secs(5),
    };
    let (geo_addr, _) = spawn_grpc(Routes::new(GeoServer::new(geo))).await?;

    let mut config = fixture_config();
    let (rate, _) = spawn_role(
        Role::Rate,
        config.clone(),
        memory_tracer("rate", &MemoryReporter::default()),
    )
    .await?;
    config.dependents.geo = geo_addr.to_string();
    config.dependents.rate = rate.to_string();
    let (search, _) =
        spawn_role(Role::Search, config, memory_tracer("search", &reporter)).await?;

    let mut client = SearchClient::connect(format!("http://{search}")).await?;
    let mut request = tonic::Request::new(union_square("2015-04-09"));
    request.set_timeout(Duration::from_millis(200));

    let started = Instant::now();
    let status = client.nearby(request).await.unwrap_err();
    assert!(
        matches!(
            status.code(),
            tonic::Code::Cancelled | tonic::Code::DeadlineExceeded
        ),
        "{status:?}"
    );
    assert!(started.elapsed() < Duration::from_secs(1));

    let spans = wait_for_spans(&reporter, 2).await;
    assert_eq!(spans.len(), 2);
    for kind in [SpanKind::Server, SpanKind::Client] {
        let span = spans
            .iter()
            .find(|span| span.kind == kind)
            .expect("search span");
        assert_eq!(span.service, "search");
        assert_eq!(span.error.as_deref(), Some("cancelled"));
    }
    Ok(())
}
