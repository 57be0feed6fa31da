use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::service::Routes;
use tonic::transport::Server;
use tonic::{Request, Response, Status};

use stayfinder_rs::config::StayConfig;
use stayfinder_rs::dispatch::{Role, Unresolved};
use stayfinder_rs::proto::geo::{geo_server, NearbyRequest, NearbyResponse};
use stayfinder_rs::proto::profile::{
    profile_server, GetProfilesRequest, GetProfilesResponse,
};
use stayfinder_rs::proto::search::{self, search_server, SearchResponse};
use stayfinder_rs::test_support::fixture_config;
use stayfinder_rs::trace::{FinishedSpan, MemoryReporter, Sampler, Tracer};

#[allow(dead_code)]
pub fn memory_tracer(service: &str, reporter: &MemoryReporter) -> Tracer {
    Tracer::new(service, Sampler::Always, Arc::new(reporter.clone()))
}

/// Wire and serve `role` on an ephemeral loopback port.
#[allow(dead_code)]
pub async fn spawn_role(
    role: Role,
    config: StayConfig,
    tracer: Tracer,
) -> anyhow::Result<(SocketAddr, JoinHandle<()>)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let service = Unresolved::new(role, config)
        .with_tracer(tracer)
        .wire()
        .await?
        .into_service()?;
    let handle = tokio::spawn(async move {
        service
            .serve(listener, std::future::pending())
            .await
            .expect("role server");
    });
    Ok((addr, handle))
}

/// Every role of the fleet, each reporting into `reporter`.
#[allow(dead_code)]
pub struct Fleet {
    pub geo: SocketAddr,
    pub rate: SocketAddr,
    pub profile: SocketAddr,
    pub search: SocketAddr,
    pub frontend: SocketAddr,
    handles: Vec<JoinHandle<()>>,
}

impl Drop for Fleet {
    fn drop(&mut self) {
        for handle in &self.handles {
            handle.abort();
        }
    }
}

#[allow(dead_code)]
pub async fn spawn_fleet(reporter: &MemoryReporter) -> anyhow::Result<Fleet> {
    let mut config = fixture_config();
    let mut handles = Vec::new();

    let (geo, handle) = spawn_role(Role::Geo, config.clone(), memory_tracer("geo", reporter)).await?;
    handles.push(handle);
    let (rate, handle) =
        spawn_role(Role::Rate, config.clone(), memory_tracer("rate", reporter)).await?;
    handles.push(handle);
    let (profile, handle) =
        spawn_role(Role::Profile, config.clone(), memory_tracer("profile", reporter)).await?;
    handles.push(handle);

    config.dependents.geo = geo.to_string();
    config.dependents.rate = rate.to_string();
    config.dependents.profile = profile.to_string();
    let (search, handle) =
        spawn_role(Role::Search, config.clone(), memory_tracer("search", reporter)).await?;
    handles.push(handle);

    config.dependents.search = search.to_string();
    let (frontend, handle) =
        spawn_role(Role::Frontend, config, memory_tracer("frontend", reporter)).await?;
    handles.push(handle);

    Ok(Fleet {
        geo,
        rate,
        profile,
        search,
        frontend,
        handles,
    })
}

/// Wait until `reporter` holds at least `count` spans.
#[allow(dead_code)]
pub async fn wait_for_spans(reporter: &MemoryReporter, count: usize) -> Vec<FinishedSpan> {
    for _ in 0..100 {
        let spans = reporter.spans();
        if spans.len() >= count {
            return spans;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    reporter.spans()
}

/// Serve plain tonic routes (no trace layer) on an ephemeral port.
#[allow(dead_code)]
pub async fn spawn_grpc(routes: Routes) -> anyhow::Result<(SocketAddr, JoinHandle<()>)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let handle = tokio::spawn(async move {
        Server::builder()
            .add_routes(routes)
            .serve_with_incoming(TcpListenerStream::new(listener))
            .await
            .expect("fake server");
    });
    Ok((addr, handle))
}

/// Search stand-in that counts calls and either fails or answers fixed ids.
#[derive(Debug, Clone, Default)]
pub struct FakeSearch {
    pub calls: Arc<AtomicUsize>,
    pub failure: Option<String>,
    pub hotel_ids: Vec<String>,
}

#[tonic::async_trait]
impl search_server::Search for FakeSearch {
    async fn nearby(
        &self,
        _request: Request<search::NearbyRequest>,
    ) -> Result<Response<SearchResponse>, Status> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some(message) => Err(Status::unavailable(message.clone())),
            None => Ok(Response::new(SearchResponse {
                hotel_ids: self.hotel_ids.clone(),
            })),
        }
    }
}

/// Profile stand-in that counts calls and knows no hotels.
#[derive(Debug, Clone, Default)]
pub struct FakeProfile {
    pub calls: Arc<AtomicUsize>,
}

#[tonic::async_trait]
impl profile_server::Profile for FakeProfile {
    async fn get_profiles(
        &self,
        _request: Request<GetProfilesRequest>,
    ) -> Result<Response<GetProfilesResponse>, Status> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Response::new(GetProfilesResponse { hotels: Vec::new() }))
    }
}

/// Geo stand-in that records the `grpc-timeout` each call arrived with.
#[derive(Debug, Clone, Default)]
pub struct FakeGeo {
    pub timeouts: Arc<Mutex<Vec<Option<String>>>>,
    pub hotel_ids: Vec<String>,
}

#[tonic::async_trait]
impl geo_server::Geo for FakeGeo {
    async fn nearby(
        &self,
        request: Request<NearbyRequest>,
    ) -> Result<Response<NearbyResponse>, Status> {
        let timeout = request
            .metadata()
            .get("grpc-timeout")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        self.timeouts.lock().push(timeout);
        Ok(Response::new(NearbyResponse {
            hotel_ids: self.hotel_ids.clone(),
        }))
    }
}

/// Geo stand-in that answers only after `delay`.
#[derive(Debug, Clone)]
pub struct SlowGeo {
    pub delay: Duration,
}

#[tonic::async_trait]
impl geo_server::Geo for SlowGeo {
    async fn nearby(
        &self,
        _request: Request<NearbyRequest>,
    ) -> Result<Response<NearbyResponse>, Status> {
        tokio::time::sleep(self.delay).await;
        Ok(Response::new(NearbyResponse {
            hotel_ids: Vec::new(),
        }))
    }
}
