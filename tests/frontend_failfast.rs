use std::sync::atomic::Ordering;

use stayfinder_rs::dispatch::Role;
use stayfinder_rs::proto::profile::profile_server::ProfileServer;
use stayfinder_rs::proto::search::search_server::SearchServer;
use stayfinder_rs::test_support::fixture_config;
use stayfinder_rs::trace::MemoryReporter;
use tonic::service::Routes;

mod support;

use support::{memory_tracer, spawn_grpc, spawn_role, FakeProfile, FakeSearch};

async fn spawn_frontend(
    search: FakeSearch,
    profile: FakeProfile,
) -> anyhow::Result<std::net::SocketAddr> {
    let (search_addr, _) = spawn_grpc(Routes::new(SearchServer::new(search))).await?;
    let (profile_addr, _) = spawn_grpc(Routes::new(ProfileServer::new(profile))).await?;

    let mut config = fixture_config();
    config.dependents.search = search_addr.to_string();
    config.dependents.profile = profile_addr.to_string();
    let reporter = MemoryReporter::default();
    let (addr, _) = spawn_role(Role::Frontend, config, memory_tracer("frontend", &reporter)).await?;
    Ok(addr)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn missing_out_date_is_400_without_dependent_calls() -> anyhow::Result<()> {
    let search = FakeSearch::default();
    let profile = FakeProfile::default();
    let addr = spawn_frontend(search.clone(), profile.clone()).await?;

    for query in ["inDate=2015-04-09", "outDate=2015-04-10", "", "inDate=&outDate="] {
        let response = reqwest::get(format!("http://{addr}/hotels?{query}")).await?;
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST, "{query}");
        assert_eq!(response.text().await?, "Please specify inDate/outDate params");
    }

    assert_eq!(search.calls.load(Ordering::SeqCst), 0);
    assert_eq!(profile.calls.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn search_failure_is_500_and_profile_never_called() -> anyhow::Result<()> {
    let search = FakeSearch {
        failure: Some("geo: index offline".to_string()),
        ..FakeSearch::default()
    };
    let profile = FakeProfile::default();
    let addr = spawn_frontend(search.clone(), profile.clone()).await?;

    let response =
        reqwest::get(format!("http://{addr}/hotels?inDate=2015-04-09&outDate=2015-04-10")).await?;
    assert_eq!(response.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.text().await?.contains("index offline"));

    assert_eq!(search.calls.load(Ordering::SeqCst), 1);
    assert_eq!(profile.calls.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn success_calls_each_dependent_once() -> anyhow::Result<()> {
    let search = FakeSearch {
        hotel_ids: vec!["1".to_string()],
        ..FakeSearch::default()
    };
    let profile = FakeProfile::default();
    let addr = spawn_frontend(search.clone(), profile.clone()).await?;

    let response =
        reqwest::get(format!("http://{addr}/hotels?inDate=2015-04-09&outDate=2015-04-10")).await?;
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["type"], "FeatureCollection");
    assert_eq!(body["features"].as_array().map(Vec::len), Some(0));

    assert_eq!(search.calls.load(Ordering::SeqCst), 1);
    assert_eq!(profile.calls.load(Ordering::SeqCst), 1);
    Ok(())
}
